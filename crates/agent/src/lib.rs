//! Guardrail orchestration for the restaurant-ordering assistant.
//!
//! This crate wires the deterministic checks from `tablesafe-core`
//! into a per-turn pipeline around an external language model:
//!
//! 1. **Topic classification** (`classifier`) - embedding similarity
//!    against on-topic prototypes, banded into on-topic / clarify /
//!    off-topic.
//! 2. **Constraint tracking** (`guardrails`) - session-scoped allergen
//!    constraints accumulated from user text.
//! 3. **Output validation** (`guardrails`) - price and allergen
//!    validators over the candidate response, audited per finding.
//! 4. **Severity policy** (`runtime`) - block criticals, auto-correct
//!    factual errors, pass clean responses through.
//!
//! # Safety Principle
//!
//! The LLM is strictly a text producer. It never decides what is safe:
//! safety-critical findings always block, and no auto-correction is
//! ever attempted for them.

pub mod classifier;
pub mod embeddings;
pub mod guardrails;
pub mod llm;
pub mod runtime;
