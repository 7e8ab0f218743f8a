//! Prompt composition: system instruction, model selection, and turn layout.
//!
//! Everything here is a pure function of its inputs. Equal mode sets always
//! produce byte-identical system instructions.

use chat_provider::{
    Attachment, CompletionRequest, Message, ModelVariant, Part, ProviderProfile, ReasoningBudget,
    Turn,
};

use crate::modes::{ModeFlag, ModeSet};

pub use session_store::derive_title;

pub const BASE_INSTRUCTION: &str = "You are an expert pair programmer. Answer questions about code precisely, show corrected code in fenced blocks with a language tag, and say so plainly when the provided context is not enough to answer.";

const ANALYSIS_BLOCK: &str = "Analysis mode: before answering, walk through the relevant code path step by step. Call out correctness bugs, unhandled edge cases, and security issues, each with the line or construct it concerns.";

const OPTIMIZATION_BLOCK: &str = "Optimization mode: look for concrete performance and resource improvements. State the current cost, the proposed change, and the expected effect, and keep behavior identical unless asked otherwise.";

/// Declared composition order: blocks are appended in this sequence.
const MODE_BLOCKS: [(ModeFlag, &str); 2] = [
    (ModeFlag::Analyze, ANALYSIS_BLOCK),
    (ModeFlag::Optimize, OPTIMIZATION_BLOCK),
];

/// Default budget for deep-reasoning requests.
pub const DEFAULT_REASONING_BUDGET: u32 = 24_576;

/// Model ids and reasoning budget a conversation dispatches with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    pub default_model: String,
    pub deep_model: String,
    pub reasoning_budget: ReasoningBudget,
}

impl ModelCatalog {
    #[must_use]
    pub fn from_profile(profile: &ProviderProfile, reasoning_budget: ReasoningBudget) -> Self {
        Self {
            default_model: profile.default_model.clone(),
            deep_model: profile.deep_model.clone(),
            reasoning_budget,
        }
    }

    #[must_use]
    pub fn model_for(&self, variant: ModelVariant) -> &str {
        match variant {
            ModelVariant::Default => &self.default_model,
            ModelVariant::DeepReasoning => &self.deep_model,
        }
    }
}

/// Resolves the base persona, falling back to [`BASE_INSTRUCTION`] when blank.
#[must_use]
pub fn sanitize_base_instruction(raw: Option<String>) -> String {
    let Some(value) = raw else {
        return BASE_INSTRUCTION.to_string();
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        BASE_INSTRUCTION.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Builds the system instruction for `modes` on top of `base`.
#[must_use]
pub fn system_instruction(base: &str, modes: ModeSet) -> String {
    let mut sections = vec![base.to_string()];

    for (flag, block) in MODE_BLOCKS {
        if modes.is_active(flag) {
            sections.push(block.to_string());
        }
    }

    // Any appended block triggers the directive, which names every active mode.
    if sections.len() > 1 {
        let named: Vec<&str> = modes.active().map(ModeFlag::label).collect();
        sections.push(joint_directive(&named));
    }

    sections.join("\n\n")
}

fn joint_directive(labels: &[&str]) -> String {
    let listed = match labels {
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
        [] => String::new(),
    };
    format!(
        "Active modes: {listed}. Honor every active mode together in a single coherent answer."
    )
}

#[must_use]
pub fn model_variant(modes: ModeSet) -> ModelVariant {
    if modes.deep_think {
        ModelVariant::DeepReasoning
    } else {
        ModelVariant::Default
    }
}

/// Re-expresses prior messages as model-facing turns, dropping placeholders.
#[must_use]
pub fn history_turns(history: &[Message]) -> Vec<Turn> {
    history
        .iter()
        .filter(|message| !message.is_placeholder())
        .filter_map(|message| {
            let parts = turn_parts(&message.content, &message.attachments);
            (!parts.is_empty()).then(|| Turn {
                role: message.role,
                parts,
            })
        })
        .collect()
}

/// Text first (when non-blank), then attachments in staging order.
#[must_use]
pub fn turn_parts(text: &str, attachments: &[Attachment]) -> Vec<Part> {
    let mut parts = Vec::with_capacity(attachments.len() + 1);
    if !text.trim().is_empty() {
        parts.push(Part::text(text));
    }
    parts.extend(attachments.iter().map(Part::from));
    parts
}

/// Composes one completion request.
///
/// # Panics
///
/// Panics when the new turn has neither text nor attachments. Callers reject
/// empty input before composing.
#[must_use]
pub fn compose(
    base: &str,
    history: &[Message],
    text: &str,
    attachments: &[Attachment],
    modes: ModeSet,
    catalog: &ModelCatalog,
) -> CompletionRequest {
    let new_turn = turn_parts(text, attachments);
    assert!(
        !new_turn.is_empty(),
        "composed turn must carry text or at least one attachment"
    );

    let variant = model_variant(modes);
    CompletionRequest {
        model: catalog.model_for(variant).to_string(),
        system_instruction: system_instruction(base, modes),
        history: history_turns(history),
        new_turn,
        reasoning_budget: (variant == ModelVariant::DeepReasoning)
            .then_some(catalog.reasoning_budget),
    }
}
