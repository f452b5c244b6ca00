//! Deterministic text-to-markup formatting of model replies.
//!
//! A reply is passed through an ordered list of independent rewrite rules.
//! Each rule reads the previous output and produces a new string; a rule
//! with nothing to match returns its input unchanged. Which rules run is
//! decided by a single table keyed by intent.
//!
//! Output is not HTML-escaped; callers decide how to render it.

use regex_lite::{Captures, Regex};
use rxpilot_core::intent::IntentCategory;
use std::sync::LazyLock;

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid bold pattern"));

static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\n]+?)\*").expect("valid italic pattern"));

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(#{1,3})[ \t]+(.+?)[ \t]*$").expect("valid heading pattern"));

static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*- (.+)$").expect("valid list item pattern"));

// Markers are found anywhere on a line, including inside markup written by
// earlier rules; the whole line becomes the callout.
static WARNING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^.*\bWARNING:.*$").expect("valid warning pattern"));

static IMPORTANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^.*\bImportant:.*$").expect("valid important pattern"));

static PRESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^.*\bPRESCRIPTION\b.*$").expect("valid prescription pattern"));

static ADVICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^.*\bADVICE\b.*$").expect("valid advice pattern"));

const CALLOUT_OPEN: &str = "<div class=\"callout";

/// Literal markers the model is asked to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Warning,
    Important,
    Prescription,
    Advice,
}

impl Marker {
    fn class(self) -> &'static str {
        match self {
            Self::Warning => "callout callout-warning",
            Self::Important => "callout callout-important",
            Self::Prescription => "callout callout-prescription",
            Self::Advice => "callout callout-advice",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Self::Warning => &WARNING,
            Self::Important => &IMPORTANT,
            Self::Prescription => &PRESCRIPTION,
            Self::Advice => &ADVICE,
        }
    }
}

/// One rewrite step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteRule {
    Bold,
    Italic,
    Heading { class: &'static str },
    ListItem,
    Callout(Marker),
    LineBreak,
}

impl RewriteRule {
    pub fn apply(&self, input: &str) -> String {
        match *self {
            Self::Bold => BOLD.replace_all(input, "<strong>$1</strong>").into_owned(),
            Self::Italic => ITALIC.replace_all(input, "<em>$1</em>").into_owned(),
            Self::Heading { class } => HEADING
                .replace_all(input, |caps: &Captures| {
                    let level = caps[1].len();
                    format!("<h{level} class=\"{class}\">{}</h{level}>", &caps[2])
                })
                .into_owned(),
            Self::ListItem => LIST_ITEM.replace_all(input, "<li>$1</li>").into_owned(),
            Self::Callout(marker) => marker
                .pattern()
                .replace_all(input, |caps: &Captures| {
                    let line = &caps[0];
                    // One callout per line: the first marker rule to claim it wins.
                    if line.trim_start().starts_with(CALLOUT_OPEN) {
                        line.to_string()
                    } else {
                        format!("<div class=\"{}\">{line}</div>", marker.class())
                    }
                })
                .into_owned(),
            Self::LineBreak => input.replace("\r\n", "\n").replace('\n', "<br/>"),
        }
    }
}

const GENERAL_RULES: &[RewriteRule] = &[
    RewriteRule::Bold,
    RewriteRule::Heading {
        class: "heading-general",
    },
    RewriteRule::ListItem,
    RewriteRule::Callout(Marker::Warning),
    RewriteRule::Callout(Marker::Important),
    RewriteRule::LineBreak,
];

const LOOKUP_RULES: &[RewriteRule] = &[
    RewriteRule::Bold,
    RewriteRule::Italic,
    RewriteRule::Heading {
        class: "heading-prescription",
    },
    RewriteRule::ListItem,
    RewriteRule::Callout(Marker::Warning),
    RewriteRule::Callout(Marker::Important),
    RewriteRule::Callout(Marker::Prescription),
    RewriteRule::LineBreak,
];

const ADVICE_RULES: &[RewriteRule] = &[
    RewriteRule::Bold,
    RewriteRule::Italic,
    RewriteRule::Heading {
        class: "heading-advice",
    },
    RewriteRule::ListItem,
    RewriteRule::Callout(Marker::Warning),
    RewriteRule::Callout(Marker::Important),
    RewriteRule::Callout(Marker::Advice),
    RewriteRule::LineBreak,
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseFormatter;

impl ResponseFormatter {
    pub fn new() -> Self {
        Self
    }

    /// The ordered rule set for `category`.
    pub fn rules(category: IntentCategory) -> &'static [RewriteRule] {
        match category {
            IntentCategory::GeneralQuestion => GENERAL_RULES,
            IntentCategory::PrescriptionLookup => LOOKUP_RULES,
            IntentCategory::AdherenceAdvice => ADVICE_RULES,
        }
    }

    pub fn format(&self, category: IntentCategory, text: &str) -> String {
        Self::rules(category)
            .iter()
            .fold(text.replace("\r\n", "\n"), |acc, rule| rule.apply(&acc))
    }
}
