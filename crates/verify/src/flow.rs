//! Declarative verification flows
//!
//! A flow is a named, strictly ordered list of browser steps. Flows are
//! constructed in code (see [`crate::flows`]) or parsed from YAML files.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{VerifyError, VerifyResult};

/// A complete verification flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    /// Unique name for this flow
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering flows
    #[serde(default)]
    pub tags: Vec<String>,

    /// Viewport size for the browser
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    /// Steps to execute in order
    pub steps: Vec<Step>,
}

fn default_viewport() -> Viewport {
    Viewport { width: 1280, height: 720 }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// How an element is located on the page.
///
/// Mirrors the locator strategies the chat console is driven by: stable
/// test identifiers (`data-testid`), visible text, or a raw CSS selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    TestId(String),
    Text(String),
    Css(String),
}

impl Target {
    /// Playwright locator expression for this target.
    pub fn locator_js(&self) -> String {
        match self {
            Target::TestId(id) => format!("page.getByTestId({})", js_str(id)),
            Target::Text(text) => format!("page.getByText({})", js_str(text)),
            Target::Css(sel) => format!("page.locator({})", js_str(sel)),
        }
    }

    /// CSS selector for this target, when one can be derived.
    ///
    /// Text targets have no CSS equivalent and return `None`; steps that
    /// need to read element state (value assertions) require a
    /// CSS-resolvable target, enforced by [`Flow::validate`].
    pub fn css_selector(&self) -> Option<String> {
        match self {
            Target::TestId(id) => Some(format!("[data-testid=\"{}\"]", id)),
            Target::Css(sel) => Some(sel.clone()),
            Target::Text(_) => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Target::TestId(id) => format!("test_id={}", id),
            Target::Text(text) => format!("text={}", text),
            Target::Css(sel) => format!("css={}", sel),
        }
    }
}

/// Encode a string as a JavaScript string literal.
///
/// JSON string encoding is valid JavaScript, so selector and value text is
/// never interpolated raw into the generated script.
pub(crate) fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| String::from("\"\""))
}

/// A single step in a flow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Navigate to a path relative to the base URL
    Navigate {
        #[serde(default = "default_path")]
        path: String,
        /// Optionally wait for an element to be visible after the load
        #[serde(default)]
        wait_for: Option<Target>,
    },

    /// Set an input element's value
    Fill {
        target: Target,
        value: String,
    },

    /// Click an element
    Click {
        target: Target,
    },

    /// Wait for an element to become visible within a bounded time
    WaitVisible {
        target: Target,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },

    /// Assert an element's value equals an exact string (whitespace included)
    ExpectValue {
        target: Target,
        value: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },

    /// Capture a screenshot to `<screenshot-dir>/<name>.png`
    Screenshot {
        name: String,
        #[serde(default)]
        full_page: bool,
    },
}

fn default_path() -> String {
    "/".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Step {
    /// Short display name, used in progress lines and reports.
    pub fn name(&self) -> String {
        match self {
            Step::Navigate { path, .. } => format!("navigate:{}", path),
            Step::Fill { target, .. } => format!("fill:{}", target.describe()),
            Step::Click { target } => format!("click:{}", target.describe()),
            Step::WaitVisible { target, .. } => format!("wait_visible:{}", target.describe()),
            Step::ExpectValue { target, .. } => format!("expect_value:{}", target.describe()),
            Step::Screenshot { name, .. } => format!("screenshot:{}", name),
        }
    }

    /// Map a step failure onto the error taxonomy.
    pub fn classify_failure(&self, detail: &str) -> VerifyError {
        let what = format!("{} - {}", self.name(), detail);
        match self {
            Step::Navigate { .. } => VerifyError::Navigation(what),
            Step::Fill { .. } | Step::Click { .. } => VerifyError::ElementNotFound(what),
            Step::WaitVisible { .. } => VerifyError::AssertionTimeout(what),
            Step::ExpectValue { .. } => VerifyError::AssertionFailed(what),
            Step::Screenshot { .. } => VerifyError::Artifact(what),
        }
    }
}

impl Flow {
    /// Parse a flow from a YAML string
    pub fn from_yaml(yaml: &str) -> VerifyResult<Self> {
        serde_yaml::from_str(yaml).map_err(VerifyError::from)
    }

    /// Parse a flow from a YAML file
    pub fn from_file(path: &Path) -> VerifyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load all flows from a directory (recursively, `*.yaml` / `*.yml`)
    pub fn load_dir(dir: &Path) -> VerifyResult<Vec<Self>> {
        let mut flows = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            let flow = Self::from_file(entry.path())?;
            flows.push(flow);
        }

        Ok(flows)
    }

    /// Filter flows by tag
    pub fn filter_by_tag<'a>(flows: &'a [Self], tag: &str) -> Vec<&'a Self> {
        flows.iter().filter(|f| f.tags.iter().any(|t| t == tag)).collect()
    }

    /// Names of all screenshots this flow captures, in step order.
    pub fn screenshot_names(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|s| match s {
                Step::Screenshot { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Check the flow is well-formed before it is rendered into a script.
    pub fn validate(&self) -> VerifyResult<()> {
        if self.name.is_empty() {
            return self.invalid("flow name must not be empty");
        }
        if self.steps.is_empty() {
            return self.invalid("flow has no steps");
        }

        let mut seen_screenshots = Vec::new();
        for step in &self.steps {
            match step {
                Step::ExpectValue { target, .. } => {
                    if target.css_selector().is_none() {
                        return self.invalid(&format!(
                            "expect_value requires a test_id or css target, got {}",
                            target.describe()
                        ));
                    }
                }
                Step::Screenshot { name, .. } => {
                    if !is_safe_artifact_name(name) {
                        return self.invalid(&format!("screenshot name '{}' is not a safe file name", name));
                    }
                    if seen_screenshots.contains(&name.as_str()) {
                        return self.invalid(&format!("duplicate screenshot name '{}'", name));
                    }
                    seen_screenshots.push(name.as_str());
                }
                _ => {}
            }

            if let Some(Target::TestId(id)) = step_target(step) {
                if id.contains('"') || id.contains('\\') {
                    return self.invalid(&format!("test id '{}' contains selector metacharacters", id));
                }
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: &str) -> VerifyResult<()> {
        Err(VerifyError::InvalidFlow {
            flow: self.name.clone(),
            reason: reason.to_string(),
        })
    }
}

fn step_target(step: &Step) -> Option<&Target> {
    match step {
        Step::Navigate { wait_for, .. } => wait_for.as_ref(),
        Step::Fill { target, .. }
        | Step::Click { target }
        | Step::WaitVisible { target, .. }
        | Step::ExpectValue { target, .. } => Some(target),
        Step::Screenshot { .. } => None,
    }
}

/// Screenshot names become file names; keep them to one path component.
fn is_safe_artifact_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_parse_simple_flow() {
        let yaml = r#"
name: tagging-smoke
description: Tag a document from the picker
tags:
  - tagging
  - smoke
steps:
  - action: navigate
    path: /
  - action: fill
    target:
      test_id: multimodal-input
    value: "@"
  - action: screenshot
    name: tagging-open
"#;
        let flow = Flow::from_yaml(yaml).unwrap();
        assert_eq!(flow.name, "tagging-smoke");
        assert_eq!(flow.steps.len(), 3);
        assert_eq!(flow.viewport.width, 1280);
        assert!(flow.validate().is_ok());
    }

    #[test]
    fn test_parse_expect_value_flow() {
        let yaml = r#"
name: tagging-value
viewport:
  width: 1920
  height: 1080
steps:
  - action: expect_value
    target:
      test_id: multimodal-input
    value: " @Monet "
    timeout_ms: 2000
"#;
        let flow = Flow::from_yaml(yaml).unwrap();
        assert_eq!(flow.viewport.width, 1920);
        match &flow.steps[0] {
            Step::ExpectValue { value, timeout_ms, .. } => {
                assert_eq!(value, " @Monet ");
                assert_eq!(*timeout_ms, 2000);
            }
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn test_target_css_selector() {
        assert_eq!(
            Target::TestId("multimodal-input".into()).css_selector().as_deref(),
            Some("[data-testid=\"multimodal-input\"]")
        );
        assert_eq!(Target::Css("#chat".into()).css_selector().as_deref(), Some("#chat"));
        assert_eq!(Target::Text("Monet".into()).css_selector(), None);
    }

    #[test]
    fn test_js_str_escapes() {
        assert_eq!(js_str(" @Monet "), "\" @Monet \"");
        assert_eq!(js_str("a'b"), "\"a'b\"");
        assert_eq!(js_str("a\"b\\c\n"), "\"a\\\"b\\\\c\\n\"");
    }

    fn flow_with(steps: Vec<Step>) -> Flow {
        Flow {
            name: "t".into(),
            description: String::new(),
            tags: vec![],
            viewport: default_viewport(),
            steps,
        }
    }

    #[test]
    fn test_validate_rejects_empty_flow() {
        assert!(flow_with(vec![]).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_text_value_assertion() {
        let flow = flow_with(vec![Step::ExpectValue {
            target: Target::Text("Monet".into()),
            value: " @Monet ".into(),
            timeout_ms: 5000,
        }]);
        let err = flow.validate().unwrap_err();
        assert!(err.to_string().contains("expect_value"));
    }

    #[test]
    fn test_validate_rejects_duplicate_screenshots() {
        let flow = flow_with(vec![
            Step::Screenshot { name: "final".into(), full_page: false },
            Step::Screenshot { name: "final".into(), full_page: true },
        ]);
        assert!(flow.validate().is_err());
    }

    #[test_case("context-tracker", true; "kebab name")]
    #[test_case("shot_01.final", true; "dots and underscores")]
    #[test_case("", false; "empty")]
    #[test_case("..", false; "parent dir")]
    #[test_case("a/b", false; "path separator")]
    #[test_case("a b", false; "whitespace")]
    fn test_safe_artifact_names(name: &str, ok: bool) {
        assert_eq!(is_safe_artifact_name(name), ok);
    }

    #[test]
    fn test_filter_by_tag() {
        let mut a = flow_with(vec![Step::Navigate { path: "/".into(), wait_for: None }]);
        a.tags = vec!["smoke".into()];
        let b = flow_with(vec![Step::Navigate { path: "/".into(), wait_for: None }]);
        let flows = vec![a, b];
        assert_eq!(Flow::filter_by_tag(&flows, "smoke").len(), 1);
    }
}
