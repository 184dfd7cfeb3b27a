// Comparative ranking: one model call orders every analyzed candidate of a job.
// Runs on demand or from the ranking queue after an analysis is stored.

pub mod handlers;
pub mod prompts;
pub mod queue;
pub mod ranker;
pub mod service;
pub mod worker;
