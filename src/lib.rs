//! Heart-sound evaluation: audio in, cardiac risk tier out.
/// Decoding, mel spectrogram, rasterization and tensor preprocessing.
pub mod analysis;
/// Application directory resolution.
pub mod app_dirs;
/// Classifier model, labels and model lifecycle.
pub mod classifier;
/// The evaluation pipeline and its errors.
pub mod evaluation;
/// Logging setup.
pub mod logging;
/// Evaluation records and persistence seam.
pub mod records;
/// Label to clinical risk tier mapping.
pub mod risk;
/// Service configuration.
pub mod settings;
/// Synthetic phonocardiogram generator.
pub mod synth;
/// Upload validation and staging.
pub mod upload;

pub use classifier::{Classifier, ClassifierState, Label};
pub use evaluation::{EvaluationError, EvaluationOutcome, EvaluationPipeline, StagedAudio};
pub use risk::RiskTier;
