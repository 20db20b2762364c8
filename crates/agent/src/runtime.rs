use anyhow::Result;
use tablesafe_core::menu::MenuIndex;
use tablesafe_core::validation::{ValidationError, ValidationResult};
use tracing::{info, warn};
use uuid::Uuid;

use crate::classifier::TopicVerdict;
use crate::guardrails::GuardrailManager;
use crate::llm::{ChatClient, ChatTurn};

pub const OFF_TOPIC_REPLY: &str = "I can only help with menu ordering and food-related questions. \
     How can I help you with the menu today?";
pub const CLARIFY_REPLY: &str = "Could you be more specific about what you'd like to order or know \
     about the menu?";
pub const LOW_CONFIDENCE_REPLY: &str = "I'm not confident in the accuracy of my response regarding \
     prices or details. Let me double-check the menu.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    Passed,
    Corrected,
    Clarify,
    BlockedInput,
    BlockedCritical,
    BlockedLowConfidence,
}

impl Disposition {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::BlockedInput | Self::BlockedCritical | Self::BlockedLowConfidence)
    }
}

#[derive(Clone, Debug)]
pub struct TurnOutcome {
    pub reply: String,
    pub disposition: Disposition,
    pub verdict: Option<TopicVerdict>,
    pub score: Option<f32>,
    pub errors: Vec<ValidationError>,
}

/// Running tally of topic verdicts across all guarded turns.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConversationSummary {
    pub total_turns: usize,
    pub on_topic: usize,
    pub off_topic: usize,
    pub clarify: usize,
}

impl ConversationSummary {
    pub fn on_topic_rate(&self) -> f64 {
        rate(self.on_topic, self.total_turns)
    }

    pub fn off_topic_rate(&self) -> f64 {
        rate(self.off_topic, self.total_turns)
    }

    pub fn clarify_rate(&self) -> f64 {
        rate(self.clarify, self.total_turns)
    }
}

fn rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Drives one guarded conversation: input checks, model call, output
/// checks, and the severity policy over the validation result.
pub struct ChatRuntime {
    guardrails: GuardrailManager,
    client: Box<dyn ChatClient>,
    system_prompt: String,
    history: Vec<ChatTurn>,
    session_id: String,
    summary: ConversationSummary,
}

impl ChatRuntime {
    pub fn new(guardrails: GuardrailManager, client: Box<dyn ChatClient>) -> Self {
        let system_prompt = system_prompt(guardrails.menu_index());
        Self {
            guardrails,
            client,
            system_prompt,
            history: Vec::new(),
            session_id: Uuid::new_v4().to_string(),
            summary: ConversationSummary::default(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn summary(&self) -> ConversationSummary {
        self.summary
    }

    pub fn guardrails(&self) -> &GuardrailManager {
        &self.guardrails
    }

    pub async fn handle_turn(&mut self, user_input: &str) -> Result<TurnOutcome> {
        let input = self.guardrails.check_input(user_input, &self.session_id).await?;

        self.summary.total_turns += 1;
        match input.verdict {
            TopicVerdict::OnTopic => self.summary.on_topic += 1,
            TopicVerdict::Clarify => self.summary.clarify += 1,
            TopicVerdict::OffTopic => self.summary.off_topic += 1,
        }

        if input.is_blocked {
            return Ok(TurnOutcome {
                reply: OFF_TOPIC_REPLY.to_string(),
                disposition: Disposition::BlockedInput,
                verdict: Some(input.verdict),
                score: Some(input.score),
                errors: Vec::new(),
            });
        }

        if input.verdict == TopicVerdict::Clarify {
            return Ok(TurnOutcome {
                reply: CLARIFY_REPLY.to_string(),
                disposition: Disposition::Clarify,
                verdict: Some(input.verdict),
                score: Some(input.score),
                errors: Vec::new(),
            });
        }

        self.history.push(ChatTurn::user(user_input));
        let candidate = self.client.chat(&self.system_prompt, &self.history).await?;
        self.history.push(ChatTurn::assistant(candidate.clone()));

        let validation = self.guardrails.check_output(&candidate, &self.session_id);
        let (reply, disposition) = apply_severity_policy(&candidate, &validation);

        match disposition {
            Disposition::BlockedCritical => warn!(
                event_name = "runtime.critical_block",
                session_id = %self.session_id,
                errors = validation.errors.len(),
                "candidate response blocked for safety"
            ),
            Disposition::Corrected => info!(
                event_name = "runtime.auto_corrected",
                session_id = %self.session_id,
                errors = validation.errors.len(),
                "candidate response auto-corrected"
            ),
            _ => {}
        }

        Ok(TurnOutcome {
            reply,
            disposition,
            verdict: Some(input.verdict),
            score: Some(input.score),
            errors: validation.errors,
        })
    }

    /// Raw model output with every guardrail bypassed. Demo-only path
    /// for comparing against the guarded pipeline.
    pub async fn handle_turn_baseline(&mut self, user_input: &str) -> Result<String> {
        self.history.push(ChatTurn::user(user_input));
        let candidate = self.client.chat(&self.system_prompt, &self.history).await?;
        self.history.push(ChatTurn::assistant(candidate.clone()));
        Ok(candidate)
    }

    /// Discards history and session constraints, then issues a fresh
    /// session id.
    pub fn reset(&mut self) {
        self.history.clear();
        self.guardrails.reset_session(&self.session_id);
        self.session_id = Uuid::new_v4().to_string();
        self.summary = ConversationSummary::default();
    }
}

/// Block on any critical finding; otherwise apply every available
/// correction, falling back to a low-confidence block when none exists.
fn apply_severity_policy(candidate: &str, validation: &ValidationResult) -> (String, Disposition) {
    if validation.has_critical() {
        let warnings: Vec<String> = validation
            .critical_errors()
            .map(|error| format!("SAFETY WARNING: {}", error.message))
            .collect();
        let reply = format!(
            "I need to verify my information for your safety.\n{}\nPlease let me try again. \
             What would you like to know?",
            warnings.join("\n")
        );
        return (reply, Disposition::BlockedCritical);
    }

    if !validation.is_valid() {
        let mut corrected = candidate.to_string();
        let mut applied = false;
        for error in &validation.errors {
            if let Some(correction) = &error.correction {
                // Plain substring replacement: an identical span elsewhere
                // in the response is rewritten too.
                corrected = corrected.replace(&correction.original, &correction.corrected);
                applied = true;
            }
        }
        return if applied {
            (corrected, Disposition::Corrected)
        } else {
            (LOW_CONFIDENCE_REPLY.to_string(), Disposition::BlockedLowConfidence)
        };
    }

    (candidate.to_string(), Disposition::Passed)
}

fn system_prompt(index: &MenuIndex) -> String {
    let mut menu_lines = String::new();
    for (_, dish) in index.entries() {
        let allergens = if dish.allergens.is_empty() {
            "none".to_string()
        } else {
            dish.allergens.iter().map(|a| a.as_str()).collect::<Vec<_>>().join(", ")
        };
        menu_lines.push_str(&format!(
            "- {}: ${:.2} | allergens: {} | vegetarian: {} | spicy: {}\n",
            dish.name,
            dish.price,
            allergens,
            if dish.vegetarian { "yes" } else { "no" },
            if dish.spicy { "yes" } else { "no" },
        ));
    }

    format!(
        "You are a helpful restaurant ordering assistant designed for visually impaired users. \
         You help users browse the menu, understand dishes, check prices, handle dietary \
         restrictions, and place orders.\n\nMENU:\n{menu_lines}\n\
         IMPORTANT INSTRUCTIONS:\n\
         1. ONLY provide information from the menu above. Never make up dishes, prices, or \
         allergen information.\n\
         2. If asked about a dish not on the menu, clearly state it's not available.\n\
         3. Be precise about prices - use the exact prices from the menu.\n\
         4. Take allergies and dietary restrictions VERY seriously - always provide accurate \
         allergen information.\n\
         5. Keep responses SHORT (1-3 sentences), put the most important information first, and \
         use simple, direct language; users will hear responses read aloud."
    )
}
