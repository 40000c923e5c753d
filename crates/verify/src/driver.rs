//! Playwright script generation and execution
//!
//! A whole flow is rendered into one self-contained Node script and run in
//! a single browser session, so page state carries across steps (the
//! tagging flow fills, waits, clicks, and asserts against the same input).
//! The script prints one prefixed JSON progress line per step; the Rust
//! side parses those back into per-step results. The browser is closed in
//! the script's `finally`, on success and on failure alike.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command as TokioCommand;
use tracing::debug;

use crate::error::{VerifyError, VerifyResult};
use crate::flow::{js_str, Flow, Step};

/// Prefix marking machine-readable progress lines in script output.
const PROGRESS_PREFIX: &str = "CHATVERIFY ";

/// Bounded wait for fill/click actions.
const ACTION_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

/// Result of executing a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step: usize,
    pub name: String,
    pub ok: bool,
    pub duration_ms: u64,
    #[serde(default)]
    pub error: Option<String>,
}

/// Configuration for the Playwright driver
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Base URL of the target server
    pub base_url: String,

    /// Directory screenshots are written to
    pub screenshot_dir: PathBuf,

    /// Browser engine
    pub browser: BrowserKind,

    /// Run without a visible window
    pub headless: bool,

    /// Overall bound on one flow's script execution
    pub run_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            screenshot_dir: PathBuf::from("verify-results/screenshots"),
            browser: BrowserKind::Chromium,
            headless: true,
            run_timeout: Duration::from_secs(60),
        }
    }
}

/// Playwright driver for verification flows
pub struct Driver {
    base_url: String,
    screenshot_dir: PathBuf,
    browser: BrowserKind,
    headless: bool,
    run_timeout: Duration,
}

impl Driver {
    /// Create a driver and prepare the screenshot directory.
    ///
    /// The screenshot directory is made absolute up front: the generated
    /// script runs with a temp dir as its working directory.
    pub fn new(config: DriverConfig) -> VerifyResult<Self> {
        let screenshot_dir = if config.screenshot_dir.is_absolute() {
            config.screenshot_dir
        } else {
            std::env::current_dir()?.join(config.screenshot_dir)
        };
        std::fs::create_dir_all(&screenshot_dir)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            screenshot_dir,
            browser: config.browser,
            headless: config.headless,
            run_timeout: config.run_timeout,
        })
    }

    /// Check that Playwright is available via npx.
    pub fn ensure_installed() -> VerifyResult<()> {
        let status = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(VerifyError::PlaywrightNotFound),
        }
    }

    pub fn screenshot_dir(&self) -> &std::path::Path {
        &self.screenshot_dir
    }

    /// Absolute path a named screenshot is captured to.
    pub fn screenshot_path(&self, name: &str) -> PathBuf {
        self.screenshot_dir.join(format!("{}.png", name))
    }

    /// Render a flow into a self-contained Playwright script.
    pub fn build_script(&self, flow: &Flow) -> String {
        let mut script = String::new();

        script.push_str(&format!(
            r#"const {{ chromium, firefox, webkit }} = require('playwright');

const report = (entry) => {{
  console.log('{prefix}' + JSON.stringify(entry));
}};

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  try {{
"#,
            prefix = PROGRESS_PREFIX,
            browser = self.browser.as_str(),
            headless = self.headless,
            width = flow.viewport.width,
            height = flow.viewport.height,
        ));

        for (index, step) in flow.steps.iter().enumerate() {
            let name = js_str(&step.name());
            let body = self.step_js(step);

            script.push_str(&format!(
                r#"
    {{
      const t0 = Date.now();
      try {{
{body}
        report({{ step: {index}, name: {name}, ok: true, duration_ms: Date.now() - t0 }});
      }} catch (err) {{
        report({{ step: {index}, name: {name}, ok: false, duration_ms: Date.now() - t0, error: String((err && err.message) || err) }});
        process.exitCode = 1;
        return;
      }}
    }}
"#,
            ));
        }

        script.push_str(
            r#"  } finally {
    await browser.close();
  }
})();
"#,
        );

        script
    }

    /// JavaScript body for one step, indented for the step wrapper.
    fn step_js(&self, step: &Step) -> String {
        match step {
            Step::Navigate { path, wait_for } => {
                let url = js_str(&format!("{}/{}", self.base_url, path.trim_start_matches('/')));
                let mut js = format!("        await page.goto({}, {{ waitUntil: 'load' }});", url);
                if let Some(target) = wait_for {
                    js.push_str(&format!(
                        "\n        await {}.waitFor({{ state: 'visible', timeout: {} }});",
                        target.locator_js(),
                        ACTION_TIMEOUT_MS
                    ));
                }
                js
            }
            Step::Fill { target, value } => format!(
                "        await {}.fill({}, {{ timeout: {} }});",
                target.locator_js(),
                js_str(value),
                ACTION_TIMEOUT_MS
            ),
            Step::Click { target } => format!(
                "        await {}.click({{ timeout: {} }});",
                target.locator_js(),
                ACTION_TIMEOUT_MS
            ),
            Step::WaitVisible { target, timeout_ms } => format!(
                "        await {}.waitFor({{ state: 'visible', timeout: {} }});",
                target.locator_js(),
                timeout_ms
            ),
            Step::ExpectValue { target, value, timeout_ms } => {
                // Validation guarantees a CSS-resolvable target here.
                let sel = match target.css_selector() {
                    Some(sel) => js_str(&sel),
                    None => return "        throw new Error('expect_value requires a css-resolvable target');".to_string(),
                };
                let expected = js_str(value);
                format!(
                    r#"        const sel = {sel};
        const expected = {expected};
        try {{
          await page.waitForFunction((args) => {{
            const el = document.querySelector(args.sel);
            if (!el) return false;
            const v = ('value' in el) ? el.value : el.textContent;
            return v === args.expected;
          }}, {{ sel, expected }}, {{ timeout: {timeout_ms} }});
        }} catch (err) {{
          const actual = await page.evaluate((s) => {{
            const el = document.querySelector(s);
            if (!el) return null;
            return ('value' in el) ? el.value : el.textContent;
          }}, sel);
          throw new Error('value mismatch: expected ' + JSON.stringify(expected) + ', actual ' + JSON.stringify(actual));
        }}"#,
                )
            }
            Step::Screenshot { name, full_page } => format!(
                "        await page.screenshot({{ path: {}, fullPage: {} }});",
                js_str(&self.screenshot_path(name).to_string_lossy()),
                full_page
            ),
        }
    }

    /// Run a flow to completion and return per-step results.
    ///
    /// Step failures come back as an `ok: false` entry (later steps never
    /// run); harness-level failures (node missing, timeout, garbled
    /// output) are errors.
    pub async fn run_flow(&self, flow: &Flow) -> VerifyResult<Vec<StepResult>> {
        flow.validate()?;

        let script = self.build_script(flow);
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("flow.js");
        std::fs::write(&script_path, &script)?;

        debug!("Running flow '{}' via {}", flow.name, script_path.display());

        let output = tokio::time::timeout(
            self.run_timeout,
            TokioCommand::new("node")
                .arg(&script_path)
                .current_dir(temp_dir.path())
                .output(),
        )
        .await
        .map_err(|_| {
            VerifyError::Driver(format!(
                "flow '{}' exceeded the {}s run bound",
                flow.name,
                self.run_timeout.as_secs()
            ))
        })??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let results = parse_progress(&stdout)?;

        if results.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VerifyError::Driver(format!(
                "flow '{}' produced no progress output\nstdout: {}\nstderr: {}",
                flow.name, stdout, stderr
            )));
        }

        let failed = results.iter().any(|r| !r.ok);
        if !failed && results.len() != flow.steps.len() {
            return Err(VerifyError::Driver(format!(
                "flow '{}' reported {} of {} steps",
                flow.name,
                results.len(),
                flow.steps.len()
            )));
        }

        Ok(results)
    }
}

/// Parse prefixed JSON progress lines out of script output.
fn parse_progress(stdout: &str) -> VerifyResult<Vec<StepResult>> {
    let mut results = Vec::new();

    for line in stdout.lines() {
        if let Some(json) = line.trim().strip_prefix(PROGRESS_PREFIX) {
            results.push(serde_json::from_str::<StepResult>(json)?);
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{Target, Viewport};
    use crate::flows;

    fn test_driver() -> (Driver, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let driver = Driver::new(DriverConfig {
            base_url: "http://localhost:3000".into(),
            screenshot_dir: dir.path().join("shots"),
            ..Default::default()
        })
        .unwrap();
        (driver, dir)
    }

    #[test]
    fn test_script_drives_tagging_flow_in_order() {
        let (driver, _dir) = test_driver();
        let script = driver.build_script(&flows::document_tagging());

        let fragments = [
            "await page.goto(\"http://localhost:3000/\", { waitUntil: 'load' });",
            "await page.getByTestId(\"multimodal-input\").fill(\"@\",",
            "await page.getByTestId(\"document-tagging\").waitFor({ state: 'visible',",
            "await page.getByText(\"Monet\").click(",
            "await page.waitForFunction(",
            "await page.screenshot(",
        ];

        let mut last = 0;
        for fragment in fragments {
            let at = script[last..]
                .find(fragment)
                .unwrap_or_else(|| panic!("missing or out of order: {}", fragment));
            last += at + fragment.len();
        }
    }

    #[test]
    fn test_script_closes_browser_in_finally() {
        let (driver, _dir) = test_driver();
        let script = driver.build_script(&flows::context_tracker());

        let finally_at = script.find("} finally {").expect("finally block");
        let close_at = script.find("await browser.close();").expect("close call");
        assert!(close_at > finally_at);
    }

    #[test]
    fn test_script_embeds_exact_expected_value() {
        let (driver, _dir) = test_driver();
        let script = driver.build_script(&flows::document_tagging());

        assert!(script.contains("const expected = \" @Monet \";"));
        assert!(script.contains("[data-testid=\\\"multimodal-input\\\"]"));
    }

    #[test]
    fn test_script_encodes_step_strings() {
        let (driver, _dir) = test_driver();
        let flow = Flow {
            name: "escape".into(),
            description: String::new(),
            tags: vec![],
            viewport: Viewport { width: 800, height: 600 },
            steps: vec![Step::Fill {
                target: Target::TestId("multimodal-input".into()),
                value: "he said \"hi\"\nback\\slash".into(),
            }],
        };

        let script = driver.build_script(&flow);
        assert!(script.contains("\"he said \\\"hi\\\"\\nback\\\\slash\""));
        assert!(!script.contains("he said \"hi\"\nback"));
    }

    #[test]
    fn test_script_respects_headed_mode_and_viewport() {
        let dir = tempfile::tempdir().unwrap();
        let driver = Driver::new(DriverConfig {
            screenshot_dir: dir.path().join("shots"),
            headless: false,
            browser: BrowserKind::Firefox,
            ..Default::default()
        })
        .unwrap();

        let mut flow = flows::context_tracker();
        flow.viewport = Viewport { width: 1920, height: 1080 };
        let script = driver.build_script(&flow);

        assert!(script.contains("firefox.launch({ headless: false })"));
        assert!(script.contains("viewport: { width: 1920, height: 1080 }"));
    }

    #[test]
    fn test_screenshot_path_is_absolute() {
        let (driver, _dir) = test_driver();
        let path = driver.screenshot_path("context-tracker");
        assert!(path.is_absolute());
        assert!(path.to_string_lossy().ends_with("context-tracker.png"));
    }

    #[test]
    fn test_parse_progress_lines() {
        let stdout = concat!(
            "unrelated noise\n",
            "CHATVERIFY {\"step\":0,\"name\":\"navigate:/\",\"ok\":true,\"duration_ms\":812}\n",
            "more noise\n",
            "CHATVERIFY {\"step\":1,\"name\":\"wait_visible:test_id=document-tagging\",\"ok\":false,\"duration_ms\":5003,\"error\":\"Timeout 5000ms exceeded\"}\n",
        );

        let results = parse_progress(stdout).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].ok);
        assert!(!results[1].ok);
        assert_eq!(results[1].step, 1);
        assert!(results[1].error.as_deref().unwrap().contains("Timeout"));
    }

    #[test]
    fn test_parse_progress_rejects_garbled_line() {
        assert!(parse_progress("CHATVERIFY {not json}\n").is_err());
    }

    #[test]
    fn test_step_failure_classification() {
        let nav = Step::Navigate { path: "/".into(), wait_for: None };
        let wait = Step::WaitVisible {
            target: Target::TestId("document-tagging".into()),
            timeout_ms: 5000,
        };
        let expect = Step::ExpectValue {
            target: Target::TestId("multimodal-input".into()),
            value: " @Monet ".into(),
            timeout_ms: 5000,
        };

        assert!(matches!(nav.classify_failure("refused"), VerifyError::Navigation(_)));
        assert!(matches!(wait.classify_failure("timeout"), VerifyError::AssertionTimeout(_)));
        let err = expect.classify_failure("value mismatch: expected \" @Monet \", actual \"@Monet\"");
        match err {
            VerifyError::AssertionFailed(msg) => {
                assert!(msg.contains(" @Monet "));
                assert!(msg.contains("@Monet"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}