//! Price tracker tools - the agent-facing side of the ledger and decision engine.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{error_payload, SharedTracker, Tool};
use crate::budget::BudgetInput;
use crate::tracker::Observation;

fn parse_args<T: for<'de> Deserialize<'de>>(args: Value) -> anyhow::Result<T> {
    // a bare call with no arguments deserializes like an empty object
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| anyhow::anyhow!("Invalid arguments: {}", e))
}

/// Blank text budgets count as "no budget".
fn present_budget(budget: Option<BudgetInput>) -> Option<BudgetInput> {
    budget.filter(|b| !matches!(b, BudgetInput::Text(t) if t.trim().is_empty()))
}

/// Tool that records one observed listing.
pub struct LogPrice {
    tracker: SharedTracker,
}

impl LogPrice {
    pub fn new(tracker: SharedTracker) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl Tool for LogPrice {
    fn name(&self) -> &str {
        "log_price"
    }

    fn description(&self) -> &str {
        "Save a product seen in a storefront's search results. Pass the raw price text as shown (e.g. '₹14,999'), the rating (e.g. '4.3') and the product title. Sponsored results are skipped."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "app_name": {
                    "type": "string",
                    "description": "Storefront the product was seen in, e.g. 'Amazon' or 'Flipkart'."
                },
                "price_text": {
                    "type": ["string", "number"],
                    "description": "Price exactly as displayed, currency symbols included."
                },
                "rating": {
                    "type": ["string", "number"],
                    "description": "Rating as displayed, e.g. '4.3'."
                },
                "title": {
                    "type": "string",
                    "description": "Product title as displayed."
                }
            },
            "required": ["app_name"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let obs: Observation = parse_args(args)?;
        tracing::info!(
            storefront = %obs.storefront,
            title = ?obs.title,
            price = ?obs.price_text,
            "log_price called"
        );

        if obs.is_sponsored() {
            tracing::debug!(storefront = %obs.storefront, "Skipping sponsored listing");
            return Ok("skipped_sponsored".to_string());
        }

        let mut tracker = self.tracker.lock().await;
        match tracker.record_listing(&obs) {
            Ok(summary) => Ok(summary),
            Err(e) => {
                tracing::warn!("log_price rejected: {}", e);
                Ok(error_payload(&e))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct DecideArgs {
    #[serde(default)]
    budget: Option<BudgetInput>,
}

/// Tool that picks the storefront and listing to buy.
pub struct CompareAndDecide {
    tracker: SharedTracker,
}

impl CompareAndDecide {
    pub fn new(tracker: SharedTracker) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl Tool for CompareAndDecide {
    fn name(&self) -> &str {
        "compare_and_decide"
    }

    fn description(&self) -> &str {
        "Compare the logged products and decide which storefront and product to buy. Prefers the lowest price within budget and falls back to a rating/price score. Returns the choice or an error."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "budget": {
                    "type": ["string", "number"],
                    "description": "Maximum budget, e.g. '15000', '15k' or '₹14,999'."
                }
            },
            "required": ["budget"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let args: DecideArgs = parse_args(args)?;
        let budget = args.budget.unwrap_or_else(|| BudgetInput::Text(String::new()));
        tracing::debug!(?budget, "compare_and_decide called");

        let tracker = self.tracker.lock().await;
        match tracker.decide(budget) {
            Ok(decision) => {
                tracing::info!(
                    storefront = %decision.storefront,
                    title = %decision.title,
                    "{}",
                    decision.reason
                );
                Ok(serde_json::to_string(&decision)?)
            }
            Err(e) => {
                tracing::warn!("No decision: {}", e);
                Ok(error_payload(&e))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct FailedOpenArgs {
    #[serde(default, alias = "app_name")]
    storefront: String,
    #[serde(default, alias = "identifier")]
    title: Option<String>,
    #[serde(default)]
    budget: Option<BudgetInput>,
}

/// Tool that records a product that could not be opened.
pub struct MarkFailedOpen {
    tracker: SharedTracker,
}

impl MarkFailedOpen {
    pub fn new(tracker: SharedTracker) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl Tool for MarkFailedOpen {
    fn name(&self) -> &str {
        "mark_failed_open"
    }

    fn description(&self) -> &str {
        "Record that a product could not be opened so it is never chosen again in this run."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "app_name": {
                    "type": "string",
                    "description": "Storefront where opening failed."
                },
                "identifier": {
                    "type": "string",
                    "description": "Title of the product that failed to open."
                }
            },
            "required": ["app_name", "identifier"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let args: FailedOpenArgs = parse_args(args)?;
        let mut tracker = self.tracker.lock().await;
        let message = tracker
            .mark_failed_open(&args.storefront, args.title.as_deref())
            .unwrap_or_else(|e| e.to_string());
        tracing::info!("{}", message);
        Ok(message)
    }
}

/// Tool that tells the agent whether a product is still worth opening.
pub struct ShouldTry {
    tracker: SharedTracker,
}

impl ShouldTry {
    pub fn new(tracker: SharedTracker) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl Tool for ShouldTry {
    fn name(&self) -> &str {
        "should_try"
    }

    fn description(&self) -> &str {
        "Check whether a product should be tried. Returns false for products that already failed to open."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "identifier": {
                    "type": "string",
                    "description": "Product title to check."
                }
            }
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let args: FailedOpenArgs = parse_args(args)?;
        let tracker = self.tracker.lock().await;
        Ok(json!(tracker.should_try(args.title.as_deref())).to_string())
    }
}

/// Tool that marks the current choice as failed and returns the next best one.
pub struct NextCandidate {
    tracker: SharedTracker,
}

impl NextCandidate {
    pub fn new(tracker: SharedTracker) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl Tool for NextCandidate {
    fn name(&self) -> &str {
        "next_candidate"
    }

    fn description(&self) -> &str {
        "After a product failed to open, mark it failed and get the next best candidate from everything logged so far."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "app_name": {
                    "type": "string",
                    "description": "Storefront where opening failed."
                },
                "identifier": {
                    "type": "string",
                    "description": "Title of the product that failed to open."
                },
                "budget": {
                    "type": ["string", "number"],
                    "description": "Optional budget; candidates within it are preferred."
                }
            },
            "required": ["identifier"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let args: FailedOpenArgs = parse_args(args)?;
        let mut tracker = self.tracker.lock().await;
        match tracker.next_candidate(
            &args.storefront,
            args.title.as_deref(),
            present_budget(args.budget),
        ) {
            Ok(decision) => {
                tracing::info!(
                    storefront = %decision.storefront,
                    title = %decision.title,
                    excluded = tracker.failed_opens().len(),
                    "Next candidate selected"
                );
                Ok(serde_json::to_string(&decision)?)
            }
            Err(e) => {
                tracing::warn!("No next candidate: {}", e);
                Ok(error_payload(&e))
            }
        }
    }
}

/// Tool that returns everything logged so far, grouped by storefront.
pub struct CollectedItems {
    tracker: SharedTracker,
}

impl CollectedItems {
    pub fn new(tracker: SharedTracker) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl Tool for CollectedItems {
    fn name(&self) -> &str {
        "collected_items"
    }

    fn description(&self) -> &str {
        "List every logged product per storefront, in the order they were logged."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<String> {
        let tracker = self.tracker.lock().await;
        let ledger = tracker.ledger();
        let storefronts: Vec<Value> = ledger
            .iter()
            .map(|(name, items)| {
                json!({
                    "storefront": name,
                    "best_price": ledger.best_price(name),
                    "count": items.len(),
                    "items": items,
                })
            })
            .collect();
        Ok(json!({
            "storefronts": storefronts,
            "failed_opens": tracker.failed_opens().len(),
        })
        .to_string())
    }
}

#[derive(Debug, Deserialize)]
struct BestPriceArgs {
    #[serde(alias = "app_name")]
    storefront: String,
}

/// Tool that returns the lowest price logged for a storefront.
pub struct BestPrice {
    tracker: SharedTracker,
}

impl BestPrice {
    pub fn new(tracker: SharedTracker) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl Tool for BestPrice {
    fn name(&self) -> &str {
        "best_price"
    }

    fn description(&self) -> &str {
        "Lowest price logged so far for a storefront, or null if none was parseable."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "app_name": {
                    "type": "string",
                    "description": "Storefront to look up."
                }
            },
            "required": ["app_name"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let args: BestPriceArgs = parse_args(args)?;
        let tracker = self.tracker.lock().await;
        Ok(json!({
            "storefront": args.storefront,
            "best_price": tracker.best_price(&args.storefront),
        })
        .to_string())
    }
}
