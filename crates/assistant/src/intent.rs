//! Intent classification.
//!
//! Rules are evaluated in precedence order; the first rule whose patterns
//! all match wins. An utterance matching no rule is a general question.

use regex_lite::Regex;
use rxpilot_core::intent::IntentCategory;
use std::sync::LazyLock;

/// "my prescription", "my medications", "my rx", ...
static PRESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bmy\s+(?:prescriptions?|medications?|medicines?|rx)\b")
        .expect("valid prescription pattern")
});

/// "how to take", "how should I follow", "advice on taking", ...
static ADVICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bhow\s+(?:to|should\s+i)\s+(?:take|follow|use)\b|\badvice\s+(?:on|for)\s+(?:taking|following)\b",
    )
    .expect("valid advice pattern")
});

/// A category and the patterns that must all match to select it.
pub struct IntentRule {
    pub category: IntentCategory,
    pub requires: &'static [&'static LazyLock<Regex>],
}

impl IntentRule {
    fn matches(&self, utterance: &str) -> bool {
        self.requires.iter().all(|re| re.is_match(utterance))
    }
}

static RULES: [IntentRule; 2] = [
    IntentRule {
        category: IntentCategory::AdherenceAdvice,
        requires: &[&PRESCRIPTION, &ADVICE],
    },
    IntentRule {
        category: IntentCategory::PrescriptionLookup,
        requires: &[&PRESCRIPTION],
    },
];

#[derive(Clone, Copy)]
pub struct IntentClassifier {
    rules: &'static [IntentRule],
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self { rules: &RULES }
    }
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure and total: every utterance gets exactly one category.
    pub fn classify(&self, utterance: &str) -> IntentCategory {
        self.rules
            .iter()
            .find(|rule| rule.matches(utterance))
            .map(|rule| rule.category)
            .unwrap_or(IntentCategory::GeneralQuestion)
    }
}
