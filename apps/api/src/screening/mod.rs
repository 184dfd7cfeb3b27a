// Application scoring: structure → consolidate → analyze → guard → persist.
// The pipeline module sequences the steps; everything else is a pure step or
// a single model call.

pub mod analyzer;
pub mod consolidator;
pub mod guardrail;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod resume_parser;
pub mod schema;
pub mod signatures;
