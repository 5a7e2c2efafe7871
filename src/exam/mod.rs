//! The exam session progression engine.

pub mod grader;
pub mod lifecycle;
pub mod shuffle;
pub mod status;

pub use lifecycle::ProgressEngine;
