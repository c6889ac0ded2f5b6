use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use super::{EvaluationError, StagedAudio};
use crate::analysis::{generate_spectrogram, load_waveform, preprocess_image};
use crate::classifier::{Classifier, Label};
use crate::risk::RiskTier;
use crate::settings::{AppSettings, ConfigError};
use crate::upload::{UploadError, stage_upload};

/// Result handed to the persistence collaborator.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvaluationOutcome {
    pub risk_tier: RiskTier,
    pub raw_label: Label,
    pub confidence: f32,
    pub summary: String,
}

impl EvaluationOutcome {
    fn from_label(label: Label, confidence: f32) -> Self {
        let risk_tier = RiskTier::from_label(label);
        Self {
            risk_tier,
            raw_label: label,
            confidence,
            summary: risk_tier.summary(),
        }
    }
}

/// Runs decode, spectrogram, preprocessing, inference and risk mapping for
/// one staged recording at a time. Holds no per-request state, so a single
/// pipeline can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct EvaluationPipeline<'a> {
    classifier: &'a Classifier,
    staging_dir: PathBuf,
    max_upload_bytes: u64,
}

impl<'a> EvaluationPipeline<'a> {
    pub fn new(classifier: &'a Classifier, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            classifier,
            staging_dir: staging_dir.into(),
            max_upload_bytes: u64::MAX,
        }
    }

    /// Pipeline using the configured staging directory and upload limit.
    pub fn from_settings(
        classifier: &'a Classifier,
        settings: &AppSettings,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(classifier, settings.resolved_staging_dir()?)
            .with_max_upload_bytes(settings.max_upload_bytes))
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Evaluate a staged recording. The file is deleted before this returns,
    /// on success and on every failure.
    pub fn evaluate(&self, audio: StagedAudio) -> Result<EvaluationOutcome, EvaluationError> {
        let span = info_span!("evaluation", request = %Uuid::new_v4().simple());
        let _entered = span.enter();
        let started = Instant::now();
        let result = self.run_stages(audio.path());
        drop(audio);
        match &result {
            Ok(outcome) => info!(
                "Evaluation finished: label {} -> {:?} ({:.3}) in {} ms",
                outcome.raw_label,
                outcome.risk_tier,
                outcome.confidence,
                started.elapsed().as_millis()
            ),
            Err(err @ EvaluationError::ModelUnavailable { .. }) => {
                error!("Evaluation rejected, classifier unavailable: {err}")
            }
            Err(err) => warn!("Evaluation failed [{}]: {err}", err.code()),
        }
        result
    }

    /// Take ownership of the file at `path` and evaluate it.
    pub fn evaluate_path(&self, path: impl Into<PathBuf>) -> Result<EvaluationOutcome, EvaluationError> {
        self.evaluate(StagedAudio::adopt(path))
    }

    /// Gate, stage and evaluate raw upload bytes.
    pub fn evaluate_upload(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<EvaluationOutcome, UploadError> {
        let staged = stage_upload(&self.staging_dir, file_name, bytes, self.max_upload_bytes)?;
        Ok(self.evaluate(staged)?)
    }

    fn run_stages(&self, path: &Path) -> Result<EvaluationOutcome, EvaluationError> {
        // Refuse before decoding anything when the deployment has no model.
        self.classifier.ensure_ready()?;

        let stage = Instant::now();
        let waveform = load_waveform(path)?;
        debug!(
            "Decoded {:.2} s of audio in {} ms",
            waveform.duration_seconds(),
            stage.elapsed().as_millis()
        );

        let stage = Instant::now();
        let image = generate_spectrogram(&waveform)?;
        drop(waveform);
        debug!("Rendered spectrogram in {} ms", stage.elapsed().as_millis());

        let stage = Instant::now();
        let input = preprocess_image(&image)?;
        drop(image);
        debug!("Preprocessed image in {} ms", stage.elapsed().as_millis());

        let stage = Instant::now();
        let result = self
            .classifier
            .classify(&input)
            .map_err(EvaluationError::from)?;
        debug!("Classified in {} ms", stage.elapsed().as_millis());

        Ok(EvaluationOutcome::from_label(result.label, result.confidence))
    }
}
