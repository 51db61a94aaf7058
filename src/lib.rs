//! Price tracking and purchase decisions for a shopping agent.
//!
//! The agent browses storefront apps, reports every listing it sees through
//! the [`tools`], and asks the [`tracker`] which listing to buy. Budgets are
//! parsed leniently by [`budget`]; [`automation`] and [`llm`] are optional
//! helpers for driving the device and reaching a remote assistant.

pub mod automation;
pub mod budget;
pub mod config;
pub mod llm;
pub mod tools;
pub mod tracker;
