//! arvtrain-core: grading, distractors, curriculum progression and the trainer.
//!
//! This crate holds the assessment engine: pure grading primitives, the
//! per-attempt session state, the curriculum state machine and the traits
//! through which the trainer reaches its data source, progress store and
//! result sink.

pub mod aggregate;
pub mod categorical;
pub mod comps;
pub mod curriculum;
pub mod distractor;
pub mod engine;
pub mod error;
pub mod grade;
pub mod model;
pub mod parser;
pub mod progression;
pub mod report;
pub mod session;
pub mod traits;
