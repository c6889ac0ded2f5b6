//! Evaluation records and the persistence seam they are handed to.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::classifier::Label;
use crate::evaluation::EvaluationOutcome;
use crate::risk::RiskTier;

/// One stored cardiac evaluation for an animal.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvaluationRecord {
    pub id: Uuid,
    pub animal_id: String,
    pub risk_tier: RiskTier,
    pub raw_label: Label,
    pub confidence: f32,
    pub summary: String,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

impl EvaluationRecord {
    /// Build a record from a finished evaluation. The tier is copied from
    /// the outcome, which derived it from `raw_label`.
    pub fn from_outcome(animal_id: impl Into<String>, outcome: &EvaluationOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            animal_id: animal_id.into(),
            risk_tier: outcome.risk_tier,
            raw_label: outcome.raw_label,
            confidence: outcome.confidence,
            summary: outcome.summary.clone(),
            recorded_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Errors raised by record sinks.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The animal identifier is blank.
    #[error("Evaluation record has no animal id")]
    MissingAnimalId,
    /// The backing store refused the record.
    #[error("Failed to store evaluation record: {0}")]
    Store(String),
}

/// Where finished evaluations are persisted.
pub trait EvaluationSink: Send + Sync {
    fn store(&self, record: EvaluationRecord) -> Result<(), RecordError>;
}

/// In-process sink keeping each animal's history in insertion order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<HashMap<String, Vec<EvaluationRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored evaluations for `animal_id`, oldest first.
    pub fn history(&self, animal_id: &str) -> Vec<EvaluationRecord> {
        self.records
            .lock()
            .map(|records| records.get(animal_id).cloned().unwrap_or_default())
            .unwrap_or_default()
    }
}

impl EvaluationSink for MemorySink {
    fn store(&self, record: EvaluationRecord) -> Result<(), RecordError> {
        if record.animal_id.trim().is_empty() {
            return Err(RecordError::MissingAnimalId);
        }
        let mut records = self
            .records
            .lock()
            .map_err(|_| RecordError::Store("record store lock poisoned".to_string()))?;
        records
            .entry(record.animal_id.clone())
            .or_default()
            .push(record);
        Ok(())
    }
}
