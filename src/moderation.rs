//! Content moderation gate
//!
//! Every non-command user message passes through [`ModerationGate::check`]
//! before it can reach the conversation history. The gate fails closed:
//! when the moderation service cannot give an answer, the message is
//! rejected with reason "moderation unavailable".

mod openai;

pub use openai::OpenAiModerationService;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Typed classification returned by a moderation service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Service-level verdict across all categories
    pub flagged: bool,
    /// Per-category flags, already thresholded by the service
    pub categories: BTreeMap<String, bool>,
    pub scores: BTreeMap<String, f64>,
}

impl Classification {
    /// Names of categories the service flagged
    pub fn flagged_categories(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .filter(|(_, flagged)| **flagged)
            .map(|(name, _)| name.as_str())
    }

    /// Highest per-category score, 0 when the service sent none
    pub fn top_score(&self) -> f64 {
        self.scores.values().copied().fold(0.0, f64::max)
    }
}

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("moderation request timed out: {0}")]
    Timeout(String),
    #[error("moderation service unreachable: {0}")]
    Network(String),
    #[error("moderation service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed moderation response: {0}")]
    Malformed(String),
}

/// External content classifier
#[async_trait]
pub trait ModerationService: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification, ModerationError>;
}

/// Outcome of a moderation check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(Rejection),
}

/// Why a message was not forwarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Nothing but whitespace; never sent to the service
    EmptyInput,
    /// One or more categories of concern were flagged
    Flagged { categories: Vec<String> },
    /// The service failed; treated as a rejection
    Unavailable,
}

impl Rejection {
    pub fn reason(&self) -> String {
        match self {
            Rejection::EmptyInput => "message is empty".to_string(),
            Rejection::Flagged { categories } => {
                format!("flagged for {}", categories.join(", "))
            }
            Rejection::Unavailable => "moderation unavailable".to_string(),
        }
    }
}

/// Which categories count as a violation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPolicy {
    /// Category prefixes of concern; empty means every category
    concerns: Vec<String>,
}

impl CategoryPolicy {
    pub fn new(concerns: Vec<String>) -> Self {
        Self {
            concerns: concerns.into_iter().map(|c| c.to_lowercase()).collect(),
        }
    }

    /// `self-harm` covers `self-harm/intent` and `self-harm/instructions`
    fn covers(&self, category: &str) -> bool {
        if self.concerns.is_empty() {
            return true;
        }
        let category = category.to_lowercase();
        self.concerns.iter().any(|concern| {
            category == *concern
                || category
                    .strip_prefix(concern.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Flagged categories of concern in a classification
    pub fn violations(&self, classification: &Classification) -> Vec<String> {
        let mut violations: Vec<String> = classification
            .flagged_categories()
            .filter(|category| self.covers(category))
            .map(str::to_string)
            .collect();

        // Overall flag without per-category detail still counts when every category is of concern
        if violations.is_empty() && classification.flagged && self.concerns.is_empty() {
            violations.push("unspecified".to_string());
        }
        violations
    }
}

/// Gate in front of the conversation history
pub struct ModerationGate {
    service: Arc<dyn ModerationService>,
    policy: CategoryPolicy,
}

impl ModerationGate {
    pub fn new(service: Arc<dyn ModerationService>, policy: CategoryPolicy) -> Self {
        Self { service, policy }
    }

    pub async fn check(&self, text: &str) -> Verdict {
        if text.trim().is_empty() {
            return Verdict::Rejected(Rejection::EmptyInput);
        }

        match self.service.classify(text).await {
            Ok(classification) => {
                let violations = self.policy.violations(&classification);
                if violations.is_empty() {
                    tracing::debug!(
                        chars = text.len(),
                        top_score = classification.top_score(),
                        "Message passed moderation"
                    );
                    Verdict::Accepted
                } else {
                    tracing::warn!(categories = %violations.join(", "), "Content flagged");
                    Verdict::Rejected(Rejection::Flagged {
                        categories: violations,
                    })
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Content moderation failed, rejecting message");
                Verdict::Rejected(Rejection::Unavailable)
            }
        }
    }
}
