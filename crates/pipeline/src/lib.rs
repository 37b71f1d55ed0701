//! Wallpaper generation pipeline.
//!
//! Turns a validated [`GenerationRequest`] into a stored final artifact:
//! one synthesis call in single-stage mode, or generate -> crop to 9:16 ->
//! refine in the default two-stage mode. Progress checkpoints are pushed
//! to a [`ProgressSink`]; the job's terminal status is not the pipeline's
//! concern.
//!
//! [`GenerationRequest`]: muralist_core::request::GenerationRequest

pub mod error;
pub mod generation;
pub mod progress;

pub use error::{PipelineError, Stage};
pub use generation::{GenerationPipeline, PipelineMode};
pub use progress::ProgressSink;
