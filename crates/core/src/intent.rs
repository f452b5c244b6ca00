//! Intent categories: which prompt template and formatting rules apply to a turn.

use serde::{Deserialize, Serialize};

/// Classification bucket for a user utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    /// "What is my prescription?"
    PrescriptionLookup,
    /// "How should I take my medication?"
    AdherenceAdvice,
    /// Anything else.
    GeneralQuestion,
}

impl IntentCategory {
    /// Whether answering this intent needs the user's stored prescription.
    pub fn needs_prescription(self) -> bool {
        matches!(self, Self::PrescriptionLookup | Self::AdherenceAdvice)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PrescriptionLookup => "prescription_lookup",
            Self::AdherenceAdvice => "adherence_advice",
            Self::GeneralQuestion => "general_question",
        }
    }
}

impl std::fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_prescription_intents_need_a_record() {
        assert!(IntentCategory::PrescriptionLookup.needs_prescription());
        assert!(IntentCategory::AdherenceAdvice.needs_prescription());
        assert!(!IntentCategory::GeneralQuestion.needs_prescription());
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&IntentCategory::AdherenceAdvice).unwrap();
        assert_eq!(json, "\"adherence_advice\"");
        assert_eq!(IntentCategory::AdherenceAdvice.to_string(), "adherence_advice");
    }
}
