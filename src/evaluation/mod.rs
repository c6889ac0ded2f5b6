//! The evaluation pipeline and its error taxonomy.

mod error;
mod pipeline;
mod staged;

pub use error::EvaluationError;
pub use pipeline::{EvaluationOutcome, EvaluationPipeline};
pub use staged::StagedAudio;
