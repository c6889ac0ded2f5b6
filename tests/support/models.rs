use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use vetcardio::analysis::ClassifierInput;
use vetcardio::classifier::{CardiacModel, Classifier, ClassifierError};

/// Always returns the same distribution.
pub struct FixedModel(pub Vec<f32>);

impl CardiacModel for FixedModel {
    fn predict(&mut self, _input: &ClassifierInput) -> Result<Vec<f32>, ClassifierError> {
        Ok(self.0.clone())
    }
}

/// Answers C_D for inputs whose tensor mean equals `murmur_mean`, A otherwise.
pub struct MeanMatchModel {
    pub murmur_mean: f32,
}

impl CardiacModel for MeanMatchModel {
    fn predict(&mut self, input: &ClassifierInput) -> Result<Vec<f32>, ClassifierError> {
        if input.mean() == self.murmur_mean {
            Ok(vec![0.05, 0.15, 0.8])
        } else {
            Ok(vec![0.9, 0.06, 0.04])
        }
    }
}

/// Panics on its first call, then answers C_D.
pub struct PanicsOnceModel {
    calls: usize,
}

impl CardiacModel for PanicsOnceModel {
    fn predict(&mut self, _input: &ClassifierInput) -> Result<Vec<f32>, ClassifierError> {
        self.calls += 1;
        if self.calls == 1 {
            panic!("tensor shape mismatch in dense layer");
        }
        Ok(vec![0.1, 0.2, 0.7])
    }
}

pub fn panics_once_classifier() -> Classifier {
    Classifier::with_loader(|| Ok(Box::new(PanicsOnceModel { calls: 0 }) as Box<dyn CardiacModel>))
}

pub fn mean_match_classifier(murmur_mean: f32) -> Classifier {
    Classifier::with_loader(move || {
        Ok(Box::new(MeanMatchModel { murmur_mean }) as Box<dyn CardiacModel>)
    })
}

pub fn fixed_classifier(probabilities: Vec<f32>) -> Classifier {
    Classifier::with_loader(move || {
        Ok(Box::new(FixedModel(probabilities.clone())) as Box<dyn CardiacModel>)
    })
}

/// A classifier whose single load attempt fails, plus a counter of attempts.
pub fn broken_classifier() -> (Classifier, Arc<AtomicUsize>) {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let classifier = Classifier::with_loader(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(ClassifierError::Unavailable(
            "weights file is corrupt".to_string(),
        ))
    });
    (classifier, attempts)
}
