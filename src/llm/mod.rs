//! LLM client module for free-form assistance during a shopping run.
//!
//! The agent may ask a remote model for help (e.g. reading an odd price
//! label). This module provides a trait-based abstraction over that call,
//! with a plain JSON-over-HTTP endpoint as the implementation.

mod http;

pub use http::HttpLlmClient;

use async_trait::async_trait;
use serde_json::Value;

/// Trait for LLM clients.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a prompt and return the model's text.
    async fn ask(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Pull the generated text out of a loosely specified response body.
///
/// Looks at `text`, `output`, `response`, then `choices[0].text|message|content`;
/// non-string values are rendered as JSON, and if nothing matches the whole
/// body is returned.
pub fn extract_text(body: &Value) -> String {
    let Some(obj) = body.as_object() else {
        return render(body);
    };

    let direct = ["text", "output", "response"]
        .iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| is_present(v));
    if let Some(v) = direct {
        return render(v);
    }

    let from_choice = obj
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|first| {
            ["text", "message", "content"]
                .iter()
                .filter_map(|k| first.get(*k))
                .find(|v| is_present(v))
        });
    match from_choice {
        Some(v) => render(v),
        None => body.to_string(),
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_direct_fields() {
        assert_eq!(extract_text(&json!({"text": "hello"})), "hello");
        assert_eq!(extract_text(&json!({"text": "", "output": "out"})), "out");
        assert_eq!(extract_text(&json!({"response": "resp"})), "resp");
    }

    #[test]
    fn test_extract_from_choices() {
        assert_eq!(extract_text(&json!({"choices": [{"text": "first"}]})), "first");
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "hi"}}]});
        assert_eq!(
            extract_text(&body),
            json!({"role": "assistant", "content": "hi"}).to_string()
        );
    }

    #[test]
    fn test_extract_falls_back_to_body() {
        let body = json!({"id": 7});
        assert_eq!(extract_text(&body), body.to_string());
        assert_eq!(extract_text(&json!("plain")), "plain");
    }
}
