use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tablesafe_core::config::GuardrailConfig;
use tracing::info;

use crate::embeddings::{cosine_similarity, EmbeddingClient};

/// Utterances that represent the ordering domain. User input is scored
/// by its best cosine similarity against these.
pub const ON_TOPIC_PROTOTYPES: [&str; 28] = [
    // Menu inquiry
    "What dishes are on the menu?",
    "Show me the menu.",
    "What kind of food is available here?",
    "What do you have?",
    // Recommendation
    "Can you recommend something to eat?",
    "What's the most popular item?",
    "Help me choose what to order.",
    "What would you recommend?",
    "I need help ordering.",
    // Price
    "How much is the pasta?",
    "Which dishes are under ten dollars?",
    "What's the cheapest dish?",
    "How much does that cost?",
    // Allergy
    "I'm allergic to peanuts.",
    "Which dishes are nut-free?",
    "Is this gluten-free?",
    "Does this contain dairy?",
    // Dietary preferences
    "I'm vegetarian.",
    "Show me something spicy.",
    "Give me something not too spicy.",
    "Do you have vegan options?",
    // Comparison
    "Which is better, the beef burger or the chicken burger?",
    "Compare the spicy tofu and the mild one.",
    // Order management and confirmation
    "I want the pizza.",
    "I'll take that.",
    "That sounds great.",
    "I'd like to order.",
    "Can I get the burger?",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicVerdict {
    OnTopic,
    Clarify,
    OffTopic,
}

impl TopicVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnTopic => "on_topic",
            Self::Clarify => "clarify",
            Self::OffTopic => "off_topic",
        }
    }
}

impl fmt::Display for TopicVerdict {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Similarity bands. `offtopic` must stay strictly below `clarify`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    offtopic: f32,
    clarify: f32,
}

impl Thresholds {
    pub fn new(offtopic: f32, clarify: f32) -> Result<Self> {
        if offtopic >= clarify {
            bail!("off-topic threshold {offtopic} must be below clarify threshold {clarify}");
        }
        Ok(Self { offtopic, clarify })
    }

    pub fn from_config(config: &GuardrailConfig) -> Result<Self> {
        Self::new(config.threshold_offtopic, config.threshold_clarify)
    }

    pub fn band(&self, score: f32) -> TopicVerdict {
        if score < self.offtopic {
            TopicVerdict::OffTopic
        } else if score < self.clarify {
            TopicVerdict::Clarify
        } else {
            TopicVerdict::OnTopic
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { offtopic: 0.40, clarify: 0.48 }
    }
}

/// Scores user input for relevance to the ordering domain.
///
/// Prototype embeddings are computed once at construction and shared
/// read-only afterwards; only the input text is embedded per call.
pub struct TopicClassifier {
    client: Arc<dyn EmbeddingClient>,
    thresholds: Thresholds,
    prototype_embeddings: Vec<Vec<f32>>,
}

impl TopicClassifier {
    /// Fails when the embedding backend is unreachable. Callers must
    /// treat that as fatal rather than running without topic checks.
    pub async fn new(client: Arc<dyn EmbeddingClient>, thresholds: Thresholds) -> Result<Self> {
        let mut prototype_embeddings = Vec::with_capacity(ON_TOPIC_PROTOTYPES.len());
        for prototype in ON_TOPIC_PROTOTYPES {
            let embedding = client
                .embed(prototype)
                .await
                .with_context(|| format!("could not embed prototype `{prototype}`"))?;
            prototype_embeddings.push(embedding);
        }

        info!(
            event_name = "classifier.ready",
            prototypes = prototype_embeddings.len(),
            "topic classifier prototype embeddings cached"
        );
        Ok(Self { client, thresholds, prototype_embeddings })
    }

    pub async fn classify(&self, text: &str) -> Result<(TopicVerdict, f32)> {
        let embedding = self.client.embed(text).await.context("could not embed user input")?;

        let score = self
            .prototype_embeddings
            .iter()
            .map(|prototype| cosine_similarity(&embedding, prototype))
            .fold(f32::MIN, f32::max);

        Ok((self.thresholds.band(score), score))
    }
}
