//! Runtime configuration read from the environment.

use std::time::Duration;

use thiserror::Error;

use crate::tracker::DEFAULT_SAMPLE_SIZE;

/// Upper bound on listings sampled per storefront.
pub const MAX_SAMPLE_SIZE: usize = 20;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}' ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Remote assistant settings; present only when an endpoint and key are set.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
    pub max_tokens: u32,
}

/// On-device automation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AutomationConfig {
    pub enabled: bool,
    pub device_serial: Option<String>,
    pub step_timeout: Duration,
    /// Pause between screens while driving the storefront app.
    pub ui_wait: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Listings per storefront considered by `decide`.
    pub results_per_storefront: usize,
    pub assistant: Option<AssistantConfig>,
    pub automation: AutomationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            results_per_storefront: DEFAULT_SAMPLE_SIZE,
            assistant: None,
            automation: AutomationConfig {
                enabled: false,
                device_serial: None,
                step_timeout: Duration::from_secs(10),
                ui_wait: Duration::from_millis(1000),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let results_per_storefront = match get("SHOPPER_RESULTS_PER_STOREFRONT") {
            Some(raw) => parse_sample_size(&raw)?,
            None => DEFAULT_SAMPLE_SIZE,
        };

        let assistant = match (
            get("SHOPPER_ASSISTANT_ENDPOINT"),
            get("SHOPPER_ASSISTANT_API_KEY"),
        ) {
            (Some(endpoint), Some(api_key)) => Some(AssistantConfig {
                endpoint,
                api_key,
                timeout: Duration::from_secs(parse_u64(
                    "SHOPPER_ASSISTANT_TIMEOUT_SECS",
                    get("SHOPPER_ASSISTANT_TIMEOUT_SECS"),
                    15,
                )?),
                max_tokens: parse_u64(
                    "SHOPPER_ASSISTANT_MAX_TOKENS",
                    get("SHOPPER_ASSISTANT_MAX_TOKENS"),
                    400,
                )? as u32,
            }),
            _ => None,
        };

        let automation = AutomationConfig {
            enabled: get("SHOPPER_AUTOMATION")
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
            device_serial: get("SHOPPER_DEVICE_SERIAL"),
            step_timeout: Duration::from_secs(parse_u64(
                "SHOPPER_STEP_TIMEOUT_SECS",
                get("SHOPPER_STEP_TIMEOUT_SECS"),
                10,
            )?),
            ui_wait: Duration::from_millis(parse_u64(
                "SHOPPER_UI_WAIT_MS",
                get("SHOPPER_UI_WAIT_MS"),
                1000,
            )?),
        };

        Ok(Self {
            results_per_storefront,
            assistant,
            automation,
        })
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// At least one; anything above [`MAX_SAMPLE_SIZE`] is capped.
fn parse_sample_size(raw: &str) -> Result<usize, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        name: "SHOPPER_RESULTS_PER_STOREFRONT",
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let n: usize = raw.trim().parse().map_err(|_| invalid("not a number"))?;
    if n < 1 {
        return Err(invalid("must be at least 1"));
    }
    Ok(n.min(MAX_SAMPLE_SIZE))
}

fn parse_u64(name: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidValue {
            name,
            value: raw,
            reason: "expected a positive integer".to_string(),
        }),
        Ok(n) => Ok(n),
    }
}
