pub mod analysis;
pub mod candidate;
pub mod job;
pub mod ranking;
pub mod resume;
