use thiserror::Error;

use crate::budget::BudgetError;

/// Failures reported by the tracker. None of them leave the tracker in a
/// state that rejects further listings or decisions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    #[error("Could not parse budget: {0}")]
    InvalidBudget(#[from] BudgetError),

    #[error("No collected items.")]
    NoListings,

    #[error("No candidates available after filtering failed items.")]
    NoCandidates,

    #[error("STOP: Cheapest found {price} on {storefront} exceeds budget {budget}.")]
    BudgetExceeded {
        storefront: String,
        price: f64,
        budget: f64,
    },

    #[error("{0}")]
    MissingInput(String),
}

impl TrackerError {
    /// Stable machine-readable code for the error payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidBudget(_) => "invalid_budget",
            Self::NoListings => "no_listings",
            Self::NoCandidates => "no_candidates",
            Self::BudgetExceeded { .. } => "budget_exceeded",
            Self::MissingInput(_) => "missing_input",
        }
    }
}
