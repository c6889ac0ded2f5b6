use std::path::PathBuf;

use thiserror::Error;

use crate::classifier::ClassifierError;

/// Terminal failure of one evaluation. No variant ever carries a partial
/// result or a fallback risk tier.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvaluationError {
    /// The staged file could not be opened or decoded as WAV/MP3.
    #[error("Unsupported audio format for {path}: {reason}")]
    UnsupportedAudioFormat {
        /// Staged file that failed to decode.
        path: PathBuf,
        /// Decoder diagnostic.
        reason: String,
    },
    /// The staged file decoded to zero samples.
    #[error("Audio file {path} contains no samples")]
    EmptyAudio {
        /// Staged file that was empty.
        path: PathBuf,
    },
    /// The mel transform could not be computed or rendered.
    #[error("Spectrogram computation failed: {reason}")]
    SpectrogramComputation {
        /// Why the transform failed.
        reason: String,
    },
    /// The raster buffer is not a decodable image.
    #[error("Spectrogram image could not be decoded: {reason}")]
    ImageDecode {
        /// Image decoder diagnostic.
        reason: String,
    },
    /// The classifier model is missing or failed to load at start-up.
    #[error("Classifier model unavailable: {reason}")]
    ModelUnavailable {
        /// Recorded load failure.
        reason: String,
    },
    /// Inference failed unexpectedly.
    #[error("Classification failed: {reason}")]
    Classification {
        /// Inference diagnostic.
        reason: String,
    },
}

impl EvaluationError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedAudioFormat { .. } => "unsupported_audio_format",
            Self::EmptyAudio { .. } => "empty_audio",
            Self::SpectrogramComputation { .. } => "spectrogram_computation",
            Self::ImageDecode { .. } => "image_decode",
            Self::ModelUnavailable { .. } => "model_unavailable",
            Self::Classification { .. } => "classification",
        }
    }

    /// True when the failure points at a broken deployment rather than at
    /// the submitted recording.
    pub fn is_deployment_fault(&self) -> bool {
        matches!(self, Self::ModelUnavailable { .. })
    }
}

impl From<ClassifierError> for EvaluationError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::Unavailable(reason) => Self::ModelUnavailable { reason },
            ClassifierError::Inference(reason) => Self::Classification { reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_errors_map_onto_taxonomy() {
        let unavailable: EvaluationError = ClassifierError::Unavailable("gone".into()).into();
        assert_eq!(
            unavailable,
            EvaluationError::ModelUnavailable {
                reason: "gone".into()
            }
        );
        assert!(unavailable.is_deployment_fault());
        let inference: EvaluationError = ClassifierError::Inference("nan".into()).into();
        assert_eq!(inference.code(), "classification");
        assert!(!inference.is_deployment_fault());
    }

    #[test]
    fn messages_are_user_displayable() {
        let err = EvaluationError::EmptyAudio {
            path: PathBuf::from("upload.wav"),
        };
        assert_eq!(err.to_string(), "Audio file upload.wav contains no samples");
        assert_eq!(err.code(), "empty_audio");
    }
}
