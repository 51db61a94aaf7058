//! Budget module - turning operator input into a spending ceiling.
//!
//! # Key Concepts
//! - Parsing: strict `<number>[k|m]` pattern first, lenient digit stripping second
//! - BudgetInput: a budget that arrives either as text or as an already numeric value

mod parse;

pub use parse::{parse_budget, BudgetError, BudgetInput};
