use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::Tool;
use crate::automation::{prepare_cart, DeviceDriver};
use crate::tracker::unescape_html;

#[derive(Debug, Deserialize)]
struct CartArgs {
    #[serde(alias = "app_name")]
    storefront: String,
    #[serde(default, alias = "identifier")]
    title: Option<String>,
}

/// Tool that adds the chosen listing to the storefront's cart on the device.
pub struct PrepareCart {
    driver: Arc<dyn DeviceDriver>,
    wait: Duration,
}

impl PrepareCart {
    pub fn new(driver: Arc<dyn DeviceDriver>, wait: Duration) -> Self {
        Self { driver, wait }
    }
}

#[async_trait]
impl Tool for PrepareCart {
    fn name(&self) -> &str {
        "prepare_cart"
    }

    fn description(&self) -> &str {
        "Open the storefront app on the device, search for the chosen product and add the first result to the cart. Reports every step."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "app_name": {
                    "type": "string",
                    "description": "Storefront returned by compare_and_decide."
                },
                "title": {
                    "type": "string",
                    "description": "Product title returned by compare_and_decide."
                }
            },
            "required": ["app_name", "title"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let args: CartArgs =
            serde_json::from_value(args).map_err(|e| anyhow::anyhow!("Invalid arguments: {}", e))?;

        // decisions hand back the escaped form; the device needs the visible text
        let title = match args.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => unescape_html(t),
            _ => return Ok(json!({"error": "No product title provided."}).to_string()),
        };

        tracing::info!(storefront = %args.storefront, title = %title, "Preparing cart");
        let outcome = prepare_cart(self.driver.as_ref(), &args.storefront, &title, self.wait).await;
        if !outcome.added {
            tracing::warn!(storefront = %args.storefront, "Item was not added to the cart");
        }
        Ok(serde_json::to_string(&outcome)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::{Selector, StepOutcome};
    use crate::tracker::escape_html;
    use std::sync::Mutex;

    struct AlwaysOk;

    #[async_trait]
    impl DeviceDriver for AlwaysOk {
        async fn launch_app(&self, package: &str) -> StepOutcome {
            StepOutcome::ok(package)
        }
        async fn tap_first(&self, _selectors: &[Selector]) -> StepOutcome {
            StepOutcome::ok("tapped")
        }
        async fn type_text(&self, text: &str) -> StepOutcome {
            StepOutcome::ok(text)
        }
        async fn press_enter(&self) -> StepOutcome {
            StepOutcome::ok("enter")
        }
    }

    #[derive(Default)]
    struct RecordingDriver {
        typed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DeviceDriver for RecordingDriver {
        async fn launch_app(&self, package: &str) -> StepOutcome {
            StepOutcome::ok(package)
        }
        async fn tap_first(&self, _selectors: &[Selector]) -> StepOutcome {
            StepOutcome::ok("tapped")
        }
        async fn type_text(&self, text: &str) -> StepOutcome {
            self.typed.lock().unwrap().push(text.to_string());
            StepOutcome::ok(text)
        }
        async fn press_enter(&self) -> StepOutcome {
            StepOutcome::ok("enter")
        }
    }

    #[tokio::test]
    async fn test_prepare_cart_tool() {
        let tool = PrepareCart::new(Arc::new(AlwaysOk), Duration::ZERO);

        let out = tool
            .execute(json!({"app_name": "flipkart", "title": "Steel Kettle"}))
            .await
            .unwrap();
        let payload: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(payload["added"], true);
        assert_eq!(payload["steps"][0][0], "launch");
        assert_eq!(payload["steps"][0][1]["detail"], "com.flipkart.android");

        let out = tool.execute(json!({"app_name": "flipkart", "title": "  "})).await.unwrap();
        assert!(out.contains("No product title provided."));
    }

    #[tokio::test]
    async fn test_prepare_cart_types_unescaped_title() {
        let driver = Arc::new(RecordingDriver::default());
        let tool = PrepareCart::new(driver.clone(), Duration::ZERO);
        let title = "Salt & Pepper Grinder (Black, 2 pcs)";

        tool.execute(json!({"app_name": "amazon", "title": escape_html(title)}))
            .await
            .unwrap();

        assert_eq!(driver.typed.lock().unwrap().as_slice(), &[title.to_string()]);
    }
}
