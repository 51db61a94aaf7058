//! MCP server for the shopping tools.
//!
//! Exposes the price tracker (plus the optional assistant and on-device cart
//! tools) to an agent over stdio using JSON-RPC 2.0. Logs go to stderr so
//! stdout carries protocol messages only.

use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use smart_shopper::automation::AdbDriver;
use smart_shopper::config::Config;
use smart_shopper::llm::HttpLlmClient;
use smart_shopper::tools::ToolRegistry;
use smart_shopper::tracker::PriceTracker;

// =============================================================================
// JSON-RPC Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

// =============================================================================
// MCP Types
// =============================================================================

#[derive(Debug, Serialize)]
struct ToolResult {
    content: Vec<ToolContent>,
    #[serde(rename = "isError")]
    is_error: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ToolResult {
    fn text(text: String, is_error: bool) -> Self {
        Self {
            content: vec![ToolContent::Text { text }],
            is_error,
        }
    }
}

// =============================================================================
// Setup
// =============================================================================

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        EnvFilter::new(level)
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

fn build_registry(config: &Config) -> anyhow::Result<ToolRegistry> {
    let tracker = PriceTracker::with_sample_size(config.results_per_storefront);
    let mut registry = ToolRegistry::new(Arc::new(Mutex::new(tracker)));

    if let Some(assistant) = &config.assistant {
        let client = HttpLlmClient::new(assistant)?;
        tracing::info!(endpoint = %assistant.endpoint, "Assistant enabled");
        registry = registry.with_assistant(Arc::new(client));
    }

    if config.automation.enabled {
        let driver = AdbDriver::new(&config.automation);
        tracing::info!(serial = ?config.automation.device_serial, "Device automation enabled");
        registry = registry.with_device(Arc::new(driver), config.automation.ui_wait);
    }

    Ok(registry)
}

// =============================================================================
// Request handling
// =============================================================================

fn execute_tool(
    runtime: &tokio::runtime::Runtime,
    registry: &ToolRegistry,
    name: &str,
    args: Value,
) -> ToolResult {
    match runtime.block_on(registry.execute(name, args)) {
        Ok(text) => ToolResult::text(text, false),
        Err(e) => {
            tracing::warn!(tool = %name, "Tool call failed: {:#}", e);
            ToolResult::text(format!("Tool error: {}", e), true)
        }
    }
}

fn handle_request(
    request: &JsonRpcRequest,
    runtime: &tokio::runtime::Runtime,
    registry: &ToolRegistry,
) -> Option<JsonRpcResponse> {
    match request.method.as_str() {
        "initialize" => Some(JsonRpcResponse::success(
            request.id.clone(),
            json!({
                "protocolVersion": "2024-11-05",
                "serverInfo": {
                    "name": "shopper-mcp",
                    "version": env!("CARGO_PKG_VERSION"),
                },
                "capabilities": {
                    "tools": {
                        "listChanged": false
                    }
                }
            }),
        )),
        "notifications/initialized" | "initialized" => None,
        "tools/list" => Some(JsonRpcResponse::success(
            request.id.clone(),
            json!({ "tools": registry.definitions() }),
        )),
        "tools/call" => {
            let name = request
                .params
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            let args = request
                .params
                .get("arguments")
                .cloned()
                .unwrap_or(json!({}));
            let result = execute_tool(runtime, registry, name, args);
            Some(JsonRpcResponse::success(request.id.clone(), json!(result)))
        }
        _ => Some(JsonRpcResponse::error(
            request.id.clone(),
            -32601,
            format!("Method not found: {}", request.method),
        )),
    }
}

fn write_response(stdout: &mut impl Write, response: &JsonRpcResponse) {
    match serde_json::to_string(response) {
        Ok(line) => {
            let _ = writeln!(stdout, "{}", line);
            let _ = stdout.flush();
        }
        Err(e) => tracing::error!("Failed to serialize response: {}", e),
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let config = Config::from_env().context("Invalid configuration")?;
    tracing::info!(
        results_per_storefront = config.results_per_storefront,
        "Starting shopper MCP server"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;

    let registry = build_registry(&config)?;

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let reader = BufReader::new(stdin.lock());

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };

        if line.trim().is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                write_response(
                    &mut stdout,
                    &JsonRpcResponse::error(Value::Null, -32700, e.to_string()),
                );
                continue;
            }
        };

        if let Some(response) = handle_request(&request, &runtime, &registry) {
            write_response(&mut stdout, &response);
        }
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}
