//! `adb`-backed device driver.
//!
//! Element lookup works on the XML hierarchy printed by
//! `uiautomator dump /dev/tty`; taps go through `input tap` at the centre of
//! the matched node's bounds.

use std::process::Output;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;

use super::{DeviceDriver, Selector, StepOutcome};
use crate::config::AutomationConfig;

/// One element of a UI hierarchy dump.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UiNode {
    pub resource_id: String,
    pub text: String,
    pub class: String,
    pub bounds: (i32, i32, i32, i32),
}

impl UiNode {
    pub fn center(&self) -> (i32, i32) {
        let (x1, y1, x2, y2) = self.bounds;
        ((x1 + x2) / 2, (y1 + y2) / 2)
    }
}

fn node_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<node\b[^>]*>").expect("node pattern is valid"))
}

fn attr_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"([\w-]+)="([^"]*)""#).expect("attribute pattern is valid"))
}

fn bounds_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\[(-?\d+),(-?\d+)\]\[(-?\d+),(-?\d+)\]$").expect("bounds pattern is valid")
    })
}

fn parse_bounds(raw: &str) -> Option<(i32, i32, i32, i32)> {
    let caps = bounds_pattern().captures(raw)?;
    Some((
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
        caps[4].parse().ok()?,
    ))
}

/// Nodes of a hierarchy dump in document order. Nodes without parseable
/// bounds cannot be tapped and are skipped.
pub fn parse_hierarchy(xml: &str) -> Vec<UiNode> {
    node_pattern()
        .find_iter(xml)
        .filter_map(|m| {
            let mut node = UiNode::default();
            let mut bounds = None;
            for caps in attr_pattern().captures_iter(m.as_str()) {
                let value = caps[2].to_string();
                match &caps[1] {
                    "resource-id" => node.resource_id = value,
                    "text" => node.text = value,
                    "class" => node.class = value,
                    "bounds" => bounds = parse_bounds(&value),
                    _ => {}
                }
            }
            node.bounds = bounds?;
            Some(node)
        })
        .collect()
}

fn full_match(pattern: &str) -> anyhow::Result<Regex> {
    Regex::new(&format!("^(?:{})$", pattern))
        .with_context(|| format!("Invalid selector pattern: {}", pattern))
}

/// First node matched by the earliest selector that matches anything.
pub(crate) fn find_node<'a>(
    nodes: &'a [UiNode],
    selectors: &[Selector],
) -> anyhow::Result<Option<(&'a UiNode, &'a str)>> {
    for selector in selectors {
        let found = match selector {
            Selector::ResourceId(pattern) => {
                let re = full_match(pattern)?;
                nodes.iter().find(|n| re.is_match(&n.resource_id))
            }
            Selector::Text(pattern) => {
                let re = full_match(pattern)?;
                nodes.iter().find(|n| re.is_match(&n.text))
            }
            Selector::ClassName(class) => nodes.iter().find(|n| &n.class == class),
        };
        if let Some(node) = found {
            let label = if node.text.is_empty() {
                node.resource_id.as_str()
            } else {
                node.text.as_str()
            };
            return Ok(Some((node, label)));
        }
    }
    Ok(None)
}

/// Characters the device shell would otherwise interpret.
const SHELL_SPECIAL: &[char] = &[
    '\\', '&', ';', '(', ')', '\'', '"', '|', '<', '>', '`', '$', '*', '?', '[', ']', '{',
    '}', '~', '#', '!',
];

/// Text as `adb shell input text` expects it: no `%`, spaces as `%s`, shell
/// metacharacters backslash-escaped.
fn encode_input_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '%' => {}
            ' ' => out.push_str("%s"),
            c if SHELL_SPECIAL.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Device driver that shells out to `adb`.
pub struct AdbDriver {
    serial: Option<String>,
    step_timeout: Duration,
}

impl AdbDriver {
    pub fn new(config: &AutomationConfig) -> Self {
        Self {
            serial: config.device_serial.clone(),
            step_timeout: config.step_timeout,
        }
    }

    async fn adb(&self, args: &[&str]) -> anyhow::Result<Output> {
        let mut cmd = Command::new("adb");
        if let Some(serial) = &self.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd.args(args).kill_on_drop(true);

        let output = tokio::time::timeout(self.step_timeout, cmd.output())
            .await
            .map_err(|_| anyhow!("adb {} timed out after {:?}", args.join(" "), self.step_timeout))?
            .context("Failed to run adb")?;

        if !output.status.success() {
            bail!(
                "adb {} exited with {}: {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output)
    }

    async fn try_launch(&self, package: &str) -> anyhow::Result<String> {
        let output = self
            .adb(&[
                "shell",
                "monkey",
                "-p",
                package,
                "-c",
                "android.intent.category.LAUNCHER",
                "1",
            ])
            .await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.contains("No activities found") {
            bail!("{} is not installed", package);
        }
        Ok(format!("Started {}", package))
    }

    async fn dump_hierarchy(&self) -> anyhow::Result<Vec<UiNode>> {
        let output = self.adb(&["exec-out", "uiautomator", "dump", "/dev/tty"]).await?;
        Ok(parse_hierarchy(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn try_tap(&self, selectors: &[Selector]) -> anyhow::Result<String> {
        let nodes = self.dump_hierarchy().await?;
        let (node, label) = find_node(&nodes, selectors)?
            .ok_or_else(|| anyhow!("No element matched {:?}", selectors))?;
        let (x, y) = node.center();
        self.adb(&["shell", "input", "tap", &x.to_string(), &y.to_string()])
            .await?;
        Ok(format!("Tapped '{}' at ({}, {})", label, x, y))
    }
}

fn outcome(result: anyhow::Result<String>) -> StepOutcome {
    match result {
        Ok(detail) => StepOutcome::ok(detail),
        Err(e) => StepOutcome::failed(format!("{:#}", e)),
    }
}

#[async_trait]
impl DeviceDriver for AdbDriver {
    async fn launch_app(&self, package: &str) -> StepOutcome {
        outcome(self.try_launch(package).await)
    }

    async fn tap_first(&self, selectors: &[Selector]) -> StepOutcome {
        outcome(self.try_tap(selectors).await)
    }

    async fn type_text(&self, text: &str) -> StepOutcome {
        let encoded = encode_input_text(text);
        let result = self
            .adb(&["shell", "input", "text", &encoded])
            .await
            .map(|_| format!("Typed '{}'", text));
        outcome(result)
    }

    async fn press_enter(&self) -> StepOutcome {
        let result = self
            .adb(&["shell", "input", "keyevent", "66"])
            .await
            .map(|_| "Pressed enter".to_string());
        outcome(result)
    }
}
