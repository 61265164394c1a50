//! Moderations endpoint client (Azure `OpenAI` and `OpenAI`)

use super::{Classification, ModerationError, ModerationService};
use crate::config::ServiceTarget;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub struct OpenAiModerationService {
    client: Client,
    api_key: String,
    target: ServiceTarget,
    url: String,
}

impl OpenAiModerationService {
    pub fn new(
        api_key: String,
        target: ServiceTarget,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        let url = target.moderation_url();

        Ok(Self {
            client,
            api_key,
            target,
            url,
        })
    }
}

#[async_trait]
impl ModerationService for OpenAiModerationService {
    async fn classify(&self, text: &str) -> Result<Classification, ModerationError> {
        let (auth_name, auth_value) = self.target.auth_header(&self.api_key);

        let response = self
            .client
            .post(&self.url)
            .header(auth_name, auth_value)
            .json(&ModerationRequest { input: text })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModerationError::Timeout(e.to_string())
                } else {
                    ModerationError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ModerationError::Network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(ModerationError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        parse_classification(&body)
    }
}

/// Map a moderation response body onto a typed classification
fn parse_classification(body: &str) -> Result<Classification, ModerationError> {
    let response: ModerationResponse =
        serde_json::from_str(body).map_err(|e| ModerationError::Malformed(e.to_string()))?;

    let result = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| ModerationError::Malformed("no results in response".to_string()))?;

    Ok(Classification {
        flagged: result.flagged,
        categories: result
            .categories
            .into_iter()
            .map(|(name, flag)| (name, flag.unwrap_or(false)))
            .collect(),
        scores: result
            .category_scores
            .into_iter()
            .filter_map(|(name, score)| score.map(|s| (name, s)))
            .collect(),
    })
}

// Moderations API types

#[derive(Debug, Serialize)]
struct ModerationRequest<'a> {
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
struct ModerationResult {
    flagged: bool,
    #[serde(default)]
    categories: BTreeMap<String, Option<bool>>,
    #[serde(default)]
    category_scores: BTreeMap<String, Option<f64>>,
}
