use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::Tool;
use crate::llm::LlmClient;

#[derive(Debug, Deserialize)]
struct AskArgs {
    prompt: String,
}

/// Tool that forwards a free-form question to the remote assistant.
pub struct AskAssistant {
    llm: Option<Arc<dyn LlmClient>>,
}

impl AskAssistant {
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Tool for AskAssistant {
    fn name(&self) -> &str {
        "ask_assistant"
    }

    fn description(&self) -> &str {
        "Ask the remote assistant a question, e.g. to help read a cluttered search result. Returns plain text."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "The question to ask."
                }
            },
            "required": ["prompt"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let args: AskArgs =
            serde_json::from_value(args).map_err(|e| anyhow::anyhow!("Invalid arguments: {}", e))?;

        let Some(llm) = &self.llm else {
            return Ok("Assistant is not configured.".to_string());
        };

        match llm.ask(&args.prompt).await {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::warn!("Assistant call failed: {:#}", e);
                Ok(format!("Assistant error: {:#}", e))
            }
        }
    }
}
