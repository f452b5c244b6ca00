//! Prompt composition.
//!
//! Each intent has a fixed system instruction. Prescription intents get the
//! stored text interpolated into the user turn; without a record they fall
//! back to the general prompt.

use rxpilot_core::intent::IntentCategory;
use rxpilot_core::message::Message;
use rxpilot_core::prescription::PrescriptionRecord;
use rxpilot_core::provider::{GenerationParams, ModelRequest};

/// Opening exchange every interactive request is primed with.
pub const GREETING_PROMPT: &str = "HELLO";
pub const GREETING_REPLY: &str = "Hello there! How can I assist you today?";

const GENERAL_INSTRUCTION: &str = "You are a careful, friendly medical information assistant. \
Answer general health questions in plain language. \
Structure longer answers with `## ` headings and `- ` bullet points, and put key terms in **bold**. \
Start any line about a serious risk or a reason to seek urgent care with `WARNING:`. \
Start any line the reader must not miss with `Important:`. \
You cannot see the user's prescriptions; never invent one.";

const LOOKUP_INSTRUCTION: &str = "You are a medical assistant helping a patient read their own prescription. \
The prescription text was extracted by OCR and may contain recognition errors. \
Begin your answer with a line starting with `PRESCRIPTION` followed by a one-sentence summary, \
then list each medication as a `- ` bullet with its strength and schedule. \
Put medication names in **bold** and dosing times in *italics*. \
Start a line with `Important:` for anything illegible or ambiguous, and with `WARNING:` for a dangerous dose or combination. \
Describe only what the prescription says.";

const ADVICE_INSTRUCTION: &str = "You are an experienced community pharmacist advising a patient on how to take the medicines in their prescription. \
Begin your answer with a line starting with `ADVICE` followed by a one-sentence summary. \
Under a `## ` heading per medication, give practical `- ` bullets on timing, food, missed doses and storage. \
Put medication names in **bold** and timings in *italics*. \
Start a line with `WARNING:` for interactions or side effects that need a doctor, and with `Important:` for reminders. \
Never change a prescribed dose.";

const GENERAL_SUFFIX: &str = "Please keep the answer concise and call out any safety concerns.";

/// A composed request and the intent whose template it used.
///
/// `intent` differs from the classified category when a prescription
/// intent had to fall back to the general prompt.
#[derive(Debug, Clone)]
pub struct ComposedTurn {
    pub intent: IntentCategory,
    pub request: ModelRequest,
}

#[derive(Debug, Clone)]
pub struct PromptComposer {
    model: String,
    params: GenerationParams,
}

impl PromptComposer {
    pub fn new(model: impl Into<String>, params: GenerationParams) -> Self {
        Self {
            model: model.into(),
            params,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The fixed system instruction for `category`.
    pub fn instruction(category: IntentCategory) -> &'static str {
        match category {
            IntentCategory::PrescriptionLookup => LOOKUP_INSTRUCTION,
            IntentCategory::AdherenceAdvice => ADVICE_INSTRUCTION,
            IntentCategory::GeneralQuestion => GENERAL_INSTRUCTION,
        }
    }

    pub fn compose(
        &self,
        category: IntentCategory,
        utterance: &str,
        prescription: Option<&PrescriptionRecord>,
    ) -> ComposedTurn {
        let (intent, user_turn) = match (category, prescription) {
            (IntentCategory::GeneralQuestion, _) | (_, None) => (
                IntentCategory::GeneralQuestion,
                format!("{utterance}\n\n{GENERAL_SUFFIX}"),
            ),
            (category, Some(record)) => (
                category,
                format!(
                    "Here is my most recent prescription:\n\"\"\"\n{}\n\"\"\"\n\n{utterance}",
                    record.cleaned_text.trim()
                ),
            ),
        };

        let messages = vec![
            Message::user(GREETING_PROMPT),
            Message::assistant(GREETING_REPLY),
            Message::user(user_turn),
        ];

        let request = ModelRequest::new(&self.model, messages)
            .with_system_instruction(Self::instruction(intent))
            .with_params(self.params.clone());

        ComposedTurn { intent, request }
    }
}
