//! Clinical risk tiers derived from classifier labels.

use serde::Serialize;

use crate::classifier::Label;

/// Clinical severity bucket attached to an evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum RiskTier {
    Normal,
    ModerateRisk,
    HighRisk,
}

impl RiskTier {
    /// Every label maps to exactly one tier; a new [`Label`] variant fails
    /// to compile here until it is given one.
    pub fn from_label(label: Label) -> Self {
        match label {
            Label::A => Self::Normal,
            Label::B => Self::ModerateRisk,
            Label::CD => Self::HighRisk,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::ModerateRisk => "Moderate Risk",
            Self::HighRisk => "High Risk",
        }
    }

    /// Recommended months until the next cardiac evaluation.
    pub fn follow_up_months(self) -> u32 {
        match self {
            Self::Normal => 12,
            Self::ModerateRisk => 3,
            Self::HighRisk => 1,
        }
    }

    /// Clinical summary text for the evaluation record.
    pub fn summary(self) -> String {
        match self {
            Self::Normal => format!(
                "No abnormal heart sounds detected. Routine re-evaluation in {} months.",
                self.follow_up_months()
            ),
            Self::ModerateRisk => format!(
                "Possible murmur detected. Schedule a follow-up auscultation within {} months.",
                self.follow_up_months()
            ),
            Self::HighRisk => format!(
                "Abnormal heart sounds consistent with cardiac disease. Refer for echocardiography and re-evaluate within {} month.",
                self.follow_up_months()
            ),
        }
    }
}
