//! Budget parsing.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Errors produced while turning a budget into a number.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BudgetError {
    #[error("No budget provided")]
    Empty,

    #[error("Could not parse budget from '{0}'")]
    Unparseable(String),

    #[error("Budget must be positive (got {0})")]
    NotPositive(f64),
}

fn strict_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*([0-9]+(?:\.[0-9]+)?)\s*([kKmM])?\s*$").expect("budget pattern is valid")
    })
}

/// Parse a user-supplied budget string into a positive amount.
///
/// Accepts `"14,999"`, `"14999"`, `"15k"`, `"2.5M"` and, through the lenient
/// path, decorated input such as `"₹14,999"` or `"Rs 900/-"`.
pub fn parse_budget(raw: &str) -> Result<f64, BudgetError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BudgetError::Empty);
    }

    let without_commas = trimmed.replace(',', "");
    let value = match strict_pattern().captures(&without_commas) {
        Some(caps) => {
            let number: f64 = caps[1]
                .parse()
                .map_err(|_| BudgetError::Unparseable(raw.to_string()))?;
            let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
                Some(ref s) if s == "k" => 1_000.0,
                Some(ref s) if s == "m" => 1_000_000.0,
                _ => 1.0,
            };
            number * multiplier
        }
        None => {
            let cleaned: String = trimmed
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if cleaned.is_empty() {
                return Err(BudgetError::Unparseable(raw.to_string()));
            }
            cleaned
                .parse::<f64>()
                .map_err(|_| BudgetError::Unparseable(raw.to_string()))?
        }
    };

    if !value.is_finite() {
        return Err(BudgetError::Unparseable(raw.to_string()));
    }
    if value <= 0.0 {
        return Err(BudgetError::NotPositive(value));
    }
    Ok(value)
}

/// A budget as it arrives from a caller: free text typed by an operator, or a
/// number some other layer already computed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BudgetInput {
    Amount(f64),
    Text(String),
}

impl BudgetInput {
    /// Resolve to a strictly positive amount.
    pub fn resolve(&self) -> Result<f64, BudgetError> {
        match self {
            Self::Amount(value) if value.is_finite() && *value > 0.0 => Ok(*value),
            Self::Amount(value) if value.is_finite() => Err(BudgetError::NotPositive(*value)),
            Self::Amount(value) => Err(BudgetError::Unparseable(value.to_string())),
            Self::Text(text) => parse_budget(text),
        }
    }
}

impl From<f64> for BudgetInput {
    fn from(value: f64) -> Self {
        Self::Amount(value)
    }
}

impl From<&str> for BudgetInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for BudgetInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
