//! Cardiac classifier: the label set, the model seam and the process-wide
//! model lifecycle.

mod cnn;
mod lifecycle;

use std::fmt;
use std::sync::OnceLock;

use serde::Serialize;
use thiserror::Error;

use crate::analysis::ClassifierInput;

pub use cnn::{CardiacCnn, CardiacCnnModel, FLATTENED_FEATURES};
pub use lifecycle::{Classifier, ClassifierState, ModelLoader};

/// Classifier output classes, in model output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Label {
    A,
    B,
    #[serde(rename = "C_D")]
    CD,
}

impl Label {
    /// Number of classes the model distributes probability over.
    pub const COUNT: usize = 3;

    /// Map an output index to its label.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::A),
            1 => Some(Self::B),
            2 => Some(Self::CD),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::CD => 2,
        }
    }

    /// Raw label string as reported to callers.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::CD => "C_D",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arg-max label and its probability.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassificationResult {
    pub label: Label,
    /// Probability of `label`, in `[0, 1]`.
    pub confidence: f32,
}

impl ClassificationResult {
    /// Pick the most probable class from a model output distribution.
    pub fn from_distribution(probabilities: &[f32]) -> Result<Self, ClassifierError> {
        if probabilities.len() != Label::COUNT {
            return Err(ClassifierError::Inference(format!(
                "model returned {} outputs, expected {}",
                probabilities.len(),
                Label::COUNT
            )));
        }
        if let Some(bad) = probabilities.iter().find(|p| !p.is_finite()) {
            return Err(ClassifierError::Inference(format!(
                "model returned non-finite probability {bad}"
            )));
        }
        let (index, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (idx, p)| {
                if p > best.1 { (idx, p) } else { best }
            });
        let label = Label::from_index(index)
            .ok_or_else(|| ClassifierError::Inference(format!("no label for index {index}")))?;
        Ok(Self {
            label,
            confidence: confidence.clamp(0.0, 1.0),
        })
    }
}

/// Errors raised by the classifier.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClassifierError {
    /// The model failed to load once and will not be retried.
    #[error("Classifier model unavailable: {0}")]
    Unavailable(String),
    /// Forward inference failed or produced an unusable distribution.
    #[error("Classifier inference failed: {0}")]
    Inference(String),
}

/// Anything that maps a preprocessed spectrogram to a class distribution.
pub trait CardiacModel: Send {
    /// Return one probability per [`Label`], in [`Label::index`] order.
    fn predict(&mut self, input: &ClassifierInput) -> Result<Vec<f32>, ClassifierError>;
}

static GLOBAL_CLASSIFIER: OnceLock<Classifier> = OnceLock::new();

/// Install the process-wide classifier. Hands the classifier back if one
/// was already installed.
pub fn install_global(classifier: Classifier) -> Result<(), Classifier> {
    GLOBAL_CLASSIFIER.set(classifier)
}

/// The process-wide classifier, if one was installed.
pub fn global() -> Option<&'static Classifier> {
    GLOBAL_CLASSIFIER.get()
}
