//! Tool system for the shopping agent.
//!
//! Tools are how the agent talks to the price tracker: it reports listings,
//! asks for a decision, and reports listings that failed to open. Optional
//! tools reach out to a remote assistant or drive the device.

mod assist;
mod cart;
mod shopping;

pub use assist::AskAssistant;
pub use cart::PrepareCart;
pub use shopping::{
    BestPrice, CollectedItems, CompareAndDecide, LogPrice, MarkFailedOpen, NextCandidate,
    ShouldTry,
};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::automation::DeviceDriver;
use crate::llm::LlmClient;
use crate::tracker::{PriceTracker, TrackerError};

/// Tracker shared by every tool. The mutex serializes all access.
pub type SharedTracker = Arc<Mutex<PriceTracker>>;

/// Information about a tool for display purposes.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Tool definition as advertised to the agent.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Trait for implementing tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool.
    fn name(&self) -> &str;

    /// A description of what this tool does.
    fn description(&self) -> &str;

    /// JSON schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    ///
    /// Domain failures come back as `Ok` with an `{"error": ...}` payload;
    /// `Err` is reserved for arguments that could not be understood.
    async fn execute(&self, args: Value) -> anyhow::Result<String>;
}

/// Render a tracker failure as the payload the agent receives.
pub(crate) fn error_payload(err: &TrackerError) -> String {
    serde_json::json!({
        "error": err.to_string(),
        "kind": err.kind(),
    })
    .to_string()
}

/// Registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a registry with the tracker tools and an unconfigured assistant.
    pub fn new(tracker: SharedTracker) -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };

        // Ingestion
        registry.register(Arc::new(LogPrice::new(tracker.clone())));
        registry.register(Arc::new(CollectedItems::new(tracker.clone())));
        registry.register(Arc::new(BestPrice::new(tracker.clone())));

        // Decisions
        registry.register(Arc::new(CompareAndDecide::new(tracker.clone())));
        registry.register(Arc::new(NextCandidate::new(tracker.clone())));

        // Open failures
        registry.register(Arc::new(MarkFailedOpen::new(tracker.clone())));
        registry.register(Arc::new(ShouldTry::new(tracker)));

        registry.register(Arc::new(AskAssistant::new(None)));

        registry
    }

    /// Replace the assistant tool with one backed by `llm`.
    pub fn with_assistant(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.register(Arc::new(AskAssistant::new(Some(llm))));
        self
    }

    /// Add the on-device `prepare_cart` tool.
    pub fn with_device(mut self, driver: Arc<dyn DeviceDriver>, wait: Duration) -> Self {
        self.register(Arc::new(PrepareCart::new(driver, wait)));
        self
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// List all available tools.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .values()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    /// Tool definitions sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.parameters_schema(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool by name.
    pub async fn execute(&self, name: &str, args: Value) -> anyhow::Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {}", name))?;

        tool.execute(args).await
    }
}
