//! Verification orchestration
//!
//! The [`Verifier`] ties the pieces together: probe the target server,
//! run each flow in its own browser session, validate the screenshots the
//! flow declared, and write a machine-readable report. Flows run strictly
//! sequentially; within a flow the first failing step aborts the rest of
//! that flow, but the remaining flows still run — they are independent
//! verifications, not stages of one pipeline.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::artifact::{self, ArtifactInfo};
use crate::driver::{BrowserKind, Driver, DriverConfig, StepResult};
use crate::error::VerifyResult;
use crate::flow::Flow;
use crate::probe::{self, ProbeConfig};

/// Result of running a single flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub artifacts: Vec<ArtifactInfo>,
    pub error: Option<String>,
}

/// Result of running a set of flows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub finished_at: String,
    pub results: Vec<FlowResult>,
}

/// Configuration for the verifier
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Base URL of the target server
    pub base_url: String,

    /// Directory screenshots are written to
    pub screenshot_dir: PathBuf,

    /// Directory the results report is written to
    pub output_dir: PathBuf,

    /// Browser engine
    pub browser: BrowserKind,

    /// Run without a visible window
    pub headless: bool,

    /// Readiness probe settings
    pub probe: ProbeConfig,

    /// Overall bound on one flow's script execution
    pub run_timeout: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            screenshot_dir: PathBuf::from("verify-results/screenshots"),
            output_dir: PathBuf::from("verify-results"),
            browser: BrowserKind::default(),
            headless: true,
            probe: ProbeConfig::default(),
            run_timeout: Duration::from_secs(60),
        }
    }
}

/// Main verification runner
pub struct Verifier {
    config: VerifierConfig,
}

impl Verifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    /// Run a set of flows against the target server.
    pub async fn run(&self, flows: &[Flow]) -> VerifyResult<SuiteResult> {
        for flow in flows {
            flow.validate()?;
        }

        Driver::ensure_installed()?;
        probe::wait_for_ready(&self.config.base_url, &self.config.probe).await?;

        let driver = Driver::new(DriverConfig {
            base_url: self.config.base_url.clone(),
            screenshot_dir: self.config.screenshot_dir.clone(),
            browser: self.config.browser,
            headless: self.config.headless,
            run_timeout: self.config.run_timeout,
        })?;

        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        info!("Running {} flow(s) against {}", flows.len(), self.config.base_url);

        for flow in flows {
            match self.run_flow(&driver, flow).await {
                Ok(result) => {
                    if result.success {
                        passed += 1;
                        info!("✓ {} ({} ms)", result.name, result.duration_ms);
                    } else {
                        failed += 1;
                        error!("✗ {} - {}", result.name, result.error.as_deref().unwrap_or("unknown error"));
                    }
                    results.push(result);
                }
                Err(e) => {
                    failed += 1;
                    error!("✗ {} - {}", flow.name, e);
                    results.push(FlowResult {
                        name: flow.name.clone(),
                        success: false,
                        duration_ms: 0,
                        steps: vec![],
                        artifacts: vec![],
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!("Verification: {} passed, {} failed ({} ms)", passed, failed, duration_ms);

        Ok(SuiteResult {
            total: flows.len(),
            passed,
            failed,
            duration_ms,
            finished_at: chrono::Utc::now().to_rfc3339(),
            results,
        })
    }

    /// Run one flow and validate its artifacts.
    async fn run_flow(&self, driver: &Driver, flow: &Flow) -> VerifyResult<FlowResult> {
        let start = Instant::now();
        debug!("Running flow: {}", flow.name);

        let steps = driver.run_flow(flow).await?;

        let mut flow_error = None;
        if let Some(failure) = steps.iter().find(|s| !s.ok) {
            let detail = failure.error.as_deref().unwrap_or("no error detail");
            flow_error = flow
                .steps
                .get(failure.step)
                .map(|step| step.classify_failure(detail).to_string())
                .or_else(|| Some(detail.to_string()));
        }

        // Screenshots only count when every step ran; a flow that failed
        // early never reached its capture step.
        let mut artifacts = Vec::new();
        if flow_error.is_none() {
            for name in flow.screenshot_names() {
                match artifact::validate(name, &driver.screenshot_path(name)) {
                    Ok(info) => artifacts.push(info),
                    Err(e) => {
                        flow_error = Some(e.to_string());
                        break;
                    }
                }
            }
        }

        Ok(FlowResult {
            name: flow.name.clone(),
            success: flow_error.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            artifacts,
            error: flow_error,
        })
    }

    /// Write the suite result to `<output-dir>/results.json`.
    pub fn write_report(&self, suite: &SuiteResult) -> VerifyResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("results.json");
        let json = serde_json::to_string_pretty(suite)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_targets_local_chat() {
        let config = VerifierConfig::default();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert!(config.headless);
    }

    #[test]
    fn test_write_report_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let verifier = Verifier::new(VerifierConfig {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        });

        let suite = SuiteResult {
            total: 2,
            passed: 1,
            failed: 1,
            duration_ms: 1234,
            finished_at: "2026-08-07T00:00:00+00:00".to_string(),
            results: vec![FlowResult {
                name: "document-tagging".into(),
                success: false,
                duration_ms: 900,
                steps: vec![StepResult {
                    step: 0,
                    name: "navigate:/".into(),
                    ok: true,
                    duration_ms: 500,
                    error: None,
                }],
                artifacts: vec![],
                error: Some("assertion failed".into()),
            }],
        };

        let path = verifier.write_report(&suite).unwrap();
        let loaded: SuiteResult =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.total, 2);
        assert_eq!(loaded.results[0].name, "document-tagging");
        assert_eq!(loaded.results[0].steps.len(), 1);
    }

    #[test]
    fn test_write_report_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let verifier = Verifier::new(VerifierConfig {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        });

        let mut suite = SuiteResult {
            total: 0,
            passed: 0,
            failed: 0,
            duration_ms: 0,
            finished_at: String::new(),
            results: vec![],
        };

        verifier.write_report(&suite).unwrap();
        suite.total = 5;
        let path = verifier.write_report(&suite).unwrap();

        let loaded: SuiteResult =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.total, 5);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
