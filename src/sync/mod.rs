//! Synchronization core: reconciliation, fetch pipeline, control engine

pub mod engine;
pub mod pipeline;
pub mod reconcile;

pub use engine::{Command, Engine, Outcome, PlaylistVerb};
pub use pipeline::{FetchHandle, FetchPipeline, PipelineOutcome, ProgressSnapshot, WorkItem};
pub use reconcile::{Classification, classify, worklist};
