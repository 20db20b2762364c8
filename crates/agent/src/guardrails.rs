use std::sync::Arc;

use anyhow::Result;
use dashmap::DashMap;
use tablesafe_core::allergens::AllergenSet;
use tablesafe_core::audit::{AuditRecord, AuditSink};
use tablesafe_core::constraints::ConstraintExtractor;
use tablesafe_core::menu::MenuIndex;
use tablesafe_core::validation::{Severity, ValidationResult, Validator};
use tablesafe_core::validators::{AllergenValidator, PriceValidator};
use tracing::{debug, warn};

use crate::classifier::{TopicClassifier, TopicVerdict};

#[derive(Clone, Debug, Default)]
struct SessionState {
    constraints: AllergenSet,
}

/// Outcome of the input-side checks for one user turn.
#[derive(Clone, Debug, PartialEq)]
pub struct InputCheck {
    pub is_blocked: bool,
    pub block_reason: Option<&'static str>,
    pub verdict: TopicVerdict,
    pub score: f32,
}

/// Sequences the guardrail pipeline and owns per-session state.
///
/// Sessions are created lazily on first reference and destroyed only
/// by `reset_session`. The session map is sharded so calls on distinct
/// session ids do not contend; calls on the same id serialize their
/// constraint read-modify-write.
pub struct GuardrailManager {
    menu_index: MenuIndex,
    extractor: ConstraintExtractor,
    classifier: TopicClassifier,
    // Fixed call order: price first, then allergen.
    validators: Vec<Box<dyn Validator>>,
    sessions: DashMap<String, SessionState>,
    audit: Arc<dyn AuditSink>,
}

impl GuardrailManager {
    pub fn new(menu_index: MenuIndex, classifier: TopicClassifier, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            menu_index,
            extractor: ConstraintExtractor::new(),
            classifier,
            validators: vec![Box::new(PriceValidator::new()), Box::new(AllergenValidator::new())],
            sessions: DashMap::new(),
            audit,
        }
    }

    /// Topic-checks the input and, unless it is off-topic, folds any
    /// newly stated allergen constraints into the session.
    pub async fn check_input(&self, text: &str, session_id: &str) -> Result<InputCheck> {
        let (verdict, score) = self.classifier.classify(text).await?;

        if verdict == TopicVerdict::OffTopic {
            warn!(
                event_name = "guardrails.input_blocked",
                session_id,
                score,
                "off-topic input blocked"
            );
            self.audit.record(AuditRecord::input_blocked(verdict.as_str(), score, text, session_id));
            return Ok(InputCheck {
                is_blocked: true,
                block_reason: Some("off_topic"),
                verdict,
                score,
            });
        }

        let mut session = self.sessions.entry(session_id.to_string()).or_default();
        let updated = self.extractor.extract(text, &session.constraints);
        if updated != session.constraints {
            debug!(
                event_name = "guardrails.constraints_updated",
                session_id,
                constraints = ?updated,
                "session constraints extended"
            );
            session.constraints = updated;
        }

        Ok(InputCheck { is_blocked: false, block_reason: None, verdict, score })
    }

    /// Runs every output validator against the session's current
    /// constraint snapshot and audits each finding.
    pub fn check_output(&self, text: &str, session_id: &str) -> ValidationResult {
        let constraints =
            self.sessions.entry(session_id.to_string()).or_default().constraints.clone();

        let mut errors = Vec::new();
        for validator in &self.validators {
            errors.extend(validator.validate(text, &self.menu_index, &constraints));
        }

        for error in &errors {
            let record = if error.severity == Severity::Critical {
                AuditRecord::critical_block(error, session_id)
            } else {
                AuditRecord::output_error(error, session_id, text)
            };
            self.audit.record(record);
        }

        ValidationResult { errors }
    }

    pub fn session_constraints(&self, session_id: &str) -> AllergenSet {
        self.sessions
            .get(session_id)
            .map(|session| session.constraints.clone())
            .unwrap_or_default()
    }

    pub fn reset_session(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    pub fn menu_index(&self) -> &MenuIndex {
        &self.menu_index
    }
}
