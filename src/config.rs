//! Environment-driven configuration
//!
//! Credentials and endpoint selection follow the `OPENAI_*` variables the
//! assistant has always used; everything else is namespaced `WAYFARER_*`.

use crate::llm::Sampling;
use crate::system_prompt::TRAVEL_PERSONA;
use std::fmt;
use std::num::{NonZeroU64, NonZeroUsize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_API_VERSION: &str = "2024-06-01";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_MODERATION_MODEL: &str = "omni-moderation-latest";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("OPENAI_DEPLOYED_MODEL must be set when OPENAI_API_ENDPOINT points at an Azure resource")]
    MissingDeployment,
    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which hosted service the assistant talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceTarget {
    /// Azure `OpenAI` resource with a named deployment
    Azure {
        endpoint: String,
        deployment: String,
        api_version: String,
    },
    /// Public `OpenAI` API
    OpenAi { model: String },
}

impl ServiceTarget {
    pub fn chat_url(&self) -> String {
        match self {
            ServiceTarget::Azure {
                endpoint,
                deployment,
                api_version,
            } => format!(
                "{}/openai/deployments/{deployment}/chat/completions?api-version={api_version}",
                endpoint.trim_end_matches('/')
            ),
            ServiceTarget::OpenAi { .. } => format!("{OPENAI_BASE_URL}/chat/completions"),
        }
    }

    pub fn moderation_url(&self) -> String {
        match self {
            ServiceTarget::Azure {
                endpoint,
                api_version,
                ..
            } => format!(
                "{}/openai/moderations?api-version={api_version}",
                endpoint.trim_end_matches('/')
            ),
            ServiceTarget::OpenAi { .. } => format!("{OPENAI_BASE_URL}/moderations"),
        }
    }

    /// Deployment or model name, sent as `model` in request bodies
    pub fn model_name(&self) -> &str {
        match self {
            ServiceTarget::Azure { deployment, .. } => deployment,
            ServiceTarget::OpenAi { model } => model,
        }
    }

    /// Authentication header for this target
    pub fn auth_header(&self, api_key: &str) -> (&'static str, String) {
        match self {
            ServiceTarget::Azure { .. } => ("api-key", api_key.to_string()),
            ServiceTarget::OpenAi { .. } => ("Authorization", format!("Bearer {api_key}")),
        }
    }
}

/// Complete runtime configuration
#[derive(Clone)]
pub struct ChatConfig {
    pub api_key: String,
    pub target: ServiceTarget,
    pub sampling: Sampling,
    pub max_history: NonZeroUsize,
    pub completion_timeout: Duration,
    pub moderation_timeout: Duration,
    /// Key and target for the moderations endpoint; the chat ones unless overridden
    pub moderation_api_key: String,
    pub moderation_target: ServiceTarget,
    /// Categories of concern; empty means every category counts
    pub moderation_categories: Vec<String>,
    /// Persona system message; `None` disables it
    pub system_prompt: Option<String>,
    pub transcript_path: PathBuf,
    pub log_path: PathBuf,
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("api_key", &"<redacted>")
            .field("target", &self.target)
            .field("sampling", &self.sampling)
            .field("max_history", &self.max_history)
            .field("completion_timeout", &self.completion_timeout)
            .field("moderation_timeout", &self.moderation_timeout)
            .field("moderation_target", &self.moderation_target)
            .field("moderation_categories", &self.moderation_categories)
            .field("system_prompt", &self.system_prompt.as_ref().map(String::len))
            .field("transcript_path", &self.transcript_path)
            .field("log_path", &self.log_path)
            .finish()
    }
}

impl ChatConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup (the environment in production)
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values are treated as unset
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        let target = match get("OPENAI_API_ENDPOINT") {
            Some(endpoint) => ServiceTarget::Azure {
                endpoint: endpoint.trim().to_string(),
                deployment: get("OPENAI_DEPLOYED_MODEL").ok_or(ConfigError::MissingDeployment)?,
                api_version: get("OPENAI_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            },
            None => ServiceTarget::OpenAi {
                model: get("OPENAI_DEPLOYED_MODEL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            },
        };

        let defaults = Sampling::default();
        let temperature: f32 = parse_var(&get, "WAYFARER_TEMPERATURE", defaults.temperature)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Invalid {
                var: "WAYFARER_TEMPERATURE",
                value: temperature.to_string(),
                reason: "must be between 0 and 2".to_string(),
            });
        }
        let sampling = Sampling {
            max_tokens: parse_var(&get, "WAYFARER_MAX_TOKENS", defaults.max_tokens)?,
            temperature,
            ..defaults
        };

        let max_history: NonZeroUsize = parse_var(
            &get,
            "WAYFARER_MAX_HISTORY",
            NonZeroUsize::new(20).unwrap_or(NonZeroUsize::MIN),
        )?;

        let completion_timeout = timeout_var(&get, "WAYFARER_COMPLETION_TIMEOUT_SECS", 30)?;
        let moderation_timeout = timeout_var(&get, "WAYFARER_MODERATION_TIMEOUT_SECS", 10)?;

        // Azure resources rarely serve /openai/moderations; a dedicated key routes
        // moderation to the public OpenAI endpoint instead
        let (moderation_api_key, moderation_target) = match get("WAYFARER_MODERATION_API_KEY") {
            Some(key) => (
                key.trim().to_string(),
                ServiceTarget::OpenAi {
                    model: OPENAI_MODERATION_MODEL.to_string(),
                },
            ),
            None => (api_key.clone(), target.clone()),
        };

        let moderation_categories = get("WAYFARER_MODERATION_CATEGORIES")
            .map(|list| {
                list.split(',')
                    .map(|c| c.trim().to_lowercase())
                    .filter(|c| !c.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        // An explicitly empty persona disables the system message, so read it raw
        let system_prompt = match lookup("WAYFARER_SYSTEM_PROMPT") {
            Some(prompt) if prompt.trim().is_empty() => None,
            Some(prompt) => Some(prompt.trim().to_string()),
            None => Some(TRAVEL_PERSONA.to_string()),
        };

        Ok(Self {
            api_key,
            target,
            sampling,
            max_history,
            completion_timeout,
            moderation_timeout,
            moderation_api_key,
            moderation_target,
            moderation_categories,
            system_prompt,
            transcript_path: get("WAYFARER_TRANSCRIPT_PATH")
                .map_or_else(|| PathBuf::from("conversation_log.txt"), PathBuf::from),
            log_path: get("WAYFARER_LOG_PATH")
                .map_or_else(|| PathBuf::from("chatbot.log"), PathBuf::from),
        })
    }
}

/// Whole seconds, zero rejected
fn timeout_var<G>(get: &G, var: &'static str, default_secs: u64) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let default = NonZeroU64::new(default_secs).unwrap_or(NonZeroU64::MIN);
    let secs: NonZeroU64 = parse_var(get, var, default)?;
    Ok(Duration::from_secs(secs.get()))
}

fn parse_var<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw,
            reason: e.to_string(),
        }),
    }
}
