//! On-device automation used to put the chosen listing into a cart.
//!
//! Every step reports a [`StepOutcome`] instead of raising; `prepare_cart`
//! walks the steps in order and keeps going after a failed step, so the
//! caller sees exactly which parts of the flow worked.

mod adb;

pub use adb::{parse_hierarchy, AdbDriver, UiNode};

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

/// Result of one automation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub ok: bool,
    pub detail: String,
}

impl StepOutcome {
    pub fn ok(detail: impl Into<String>) -> Self {
        Self {
            ok: true,
            detail: detail.into(),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: detail.into(),
        }
    }
}

/// How to find an element on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Full-match regex against the resource id.
    ResourceId(String),
    /// Full-match regex against the visible text.
    Text(String),
    ClassName(String),
}

/// Operations a device backend must provide.
#[async_trait]
pub trait DeviceDriver: Send + Sync {
    async fn launch_app(&self, package: &str) -> StepOutcome;

    /// Tap the first element matching the earliest selector that matches anything.
    async fn tap_first(&self, selectors: &[Selector]) -> StepOutcome;

    async fn type_text(&self, text: &str) -> StepOutcome;

    async fn press_enter(&self) -> StepOutcome;
}

/// Outcome of the whole add-to-cart flow.
#[derive(Debug, Clone, Serialize)]
pub struct CartOutcome {
    pub added: bool,
    pub steps: Vec<(String, StepOutcome)>,
}

/// Android packages for a storefront, tried in order.
pub fn storefront_packages(storefront: &str) -> &'static [&'static str] {
    match storefront.trim().to_lowercase().as_str() {
        "amazon" => &[
            "com.amazon.mShop.android.shopping",
            "in.amazon.mShop.android.shopping",
        ],
        "flipkart" => &["com.flipkart.android"],
        _ => &[],
    }
}

fn search_selectors() -> Vec<Selector> {
    vec![
        Selector::ResourceId(".*search.*".to_string()),
        Selector::Text("(?i)search".to_string()),
    ]
}

fn result_selectors() -> Vec<Selector> {
    vec![
        Selector::ResourceId(".*result.*".to_string()),
        Selector::ClassName("android.widget.FrameLayout".to_string()),
    ]
}

fn add_to_cart_selectors() -> Vec<Selector> {
    vec![
        Selector::Text("(?i)add to cart".to_string()),
        Selector::ResourceId(".*add_to_cart.*".to_string()),
    ]
}

/// Open the storefront app, search for `title`, open the first result and
/// press "add to cart". `wait` is the pause given to the UI between screens.
pub async fn prepare_cart(
    driver: &dyn DeviceDriver,
    storefront: &str,
    title: &str,
    wait: Duration,
) -> CartOutcome {
    let mut steps = Vec::new();

    let packages = storefront_packages(storefront);
    let mut launch = StepOutcome::failed(format!("No known app for storefront '{}'", storefront));
    for package in packages {
        launch = driver.launch_app(package).await;
        if launch.ok {
            break;
        }
    }
    steps.push(("launch".to_string(), launch));
    tokio::time::sleep(wait).await;

    steps.push(("focus_search".to_string(), driver.tap_first(&search_selectors()).await));
    steps.push(("type_query".to_string(), driver.type_text(title).await));
    steps.push(("submit".to_string(), driver.press_enter().await));
    tokio::time::sleep(wait).await;

    steps.push(("open_result".to_string(), driver.tap_first(&result_selectors()).await));
    tokio::time::sleep(wait.mul_f32(0.6)).await;

    let add = driver.tap_first(&add_to_cart_selectors()).await;
    let added = add.ok;
    steps.push(("add_to_cart".to_string(), add));

    for (name, outcome) in &steps {
        tracing::debug!(step = %name, ok = outcome.ok, detail = %outcome.detail, "Cart step");
    }

    CartOutcome { added, steps }
}
