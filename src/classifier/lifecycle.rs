use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock, PoisonError};

use tracing::{error, info};

use super::cnn::CardiacCnnModel;
use super::{CardiacModel, ClassificationResult, ClassifierError};
use crate::analysis::ClassifierInput;

/// Produces the model on first use. Called at most once per [`Classifier`].
pub type ModelLoader =
    Box<dyn Fn() -> Result<Box<dyn CardiacModel>, ClassifierError> + Send + Sync>;

/// Observable lifecycle of a [`Classifier`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassifierState {
    /// No load attempted yet.
    Unloaded,
    /// Model loaded; inference calls are served.
    Loaded,
    /// The single load attempt failed; terminal.
    Unavailable,
}

type LoadedModel = Result<Mutex<Box<dyn CardiacModel>>, String>;

/// Owns the model and serializes inference through a mutex.
pub struct Classifier {
    loader: ModelLoader,
    model: OnceLock<LoadedModel>,
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Classifier {
    /// Lazily load [`CardiacCnnModel`] weights from `path`.
    pub fn from_model_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::with_loader(move || {
            CardiacCnnModel::load(&path).map(|model| Box::new(model) as Box<dyn CardiacModel>)
        })
    }

    /// Use any model source, e.g. an in-process stub.
    pub fn with_loader<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Box<dyn CardiacModel>, ClassifierError> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            model: OnceLock::new(),
        }
    }

    /// Run the single load attempt now instead of on first inference.
    pub fn preload(&self) -> ClassifierState {
        let _ = self.ensure_loaded();
        self.state()
    }

    pub fn state(&self) -> ClassifierState {
        match self.model.get() {
            None => ClassifierState::Unloaded,
            Some(Ok(_)) => ClassifierState::Loaded,
            Some(Err(_)) => ClassifierState::Unavailable,
        }
    }

    /// Why the load failed, once the classifier is [`ClassifierState::Unavailable`].
    pub fn unavailable_reason(&self) -> Option<&str> {
        match self.model.get() {
            Some(Err(reason)) => Some(reason.as_str()),
            _ => None,
        }
    }

    /// Load if needed, failing fast when the model is unavailable.
    pub fn ensure_ready(&self) -> Result<(), ClassifierError> {
        self.ensure_loaded()
            .map(|_| ())
            .map_err(|reason| ClassifierError::Unavailable(reason.to_string()))
    }

    /// Run inference and pick the arg-max label.
    pub fn classify(&self, input: &ClassifierInput) -> Result<ClassificationResult, ClassifierError> {
        let model = self
            .ensure_loaded()
            .map_err(|reason| ClassifierError::Unavailable(reason.to_string()))?;
        let probabilities = {
            // Recover the model after an earlier inference panic.
            let mut guard = model.lock().unwrap_or_else(PoisonError::into_inner);
            catch_unwind(AssertUnwindSafe(|| guard.predict(input))).map_err(|payload| {
                let reason = panic_message(payload.as_ref());
                error!("Model panicked during inference: {reason}");
                ClassifierError::Inference(format!("model panicked: {reason}"))
            })??
        };
        ClassificationResult::from_distribution(&probabilities)
    }

    fn ensure_loaded(&self) -> Result<&Mutex<Box<dyn CardiacModel>>, &str> {
        self.model
            .get_or_init(|| match (self.loader)() {
                Ok(model) => {
                    info!("Classifier model loaded");
                    Ok(Mutex::new(model))
                }
                Err(err) => {
                    error!("Classifier model failed to load; evaluations are disabled: {err}");
                    Err(err.to_string())
                }
            })
            .as_ref()
            .map_err(String::as_str)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|msg| msg.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
