//! chatverify — Playwright-driven UI verification for the chat console
//!
//! This crate turns the "navigate → act → assert → screenshot" pattern
//! into declarative flows run against an already-running chat server:
//! - Renders each flow into one self-contained Playwright script and runs
//!   it in a single browser session via `node`
//! - Probes the target server before launching a browser
//! - Validates captured screenshots and writes a JSON report
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    Verifier (Rust)                         │
//! ├────────────────────────────────────────────────────────────┤
//! │  probe::wait_for_ready(base_url)                           │
//! │  Driver                                                    │
//! │    ├── build_script(flow) -> Node/Playwright script        │
//! │    └── run_flow(flow)     -> Vec<StepResult>               │
//! │  artifact::validate(name) -> ArtifactInfo                  │
//! │  write_report()           -> results.json                  │
//! ├────────────────────────────────────────────────────────────┤
//! │  Flow (code or YAML)                                       │
//! │    └── steps: [Step]                                       │
//! │          ├── navigate     { path, wait_for? }              │
//! │          ├── fill         { target, value }                │
//! │          ├── click        { target }                       │
//! │          ├── wait_visible { target, timeout_ms }           │
//! │          ├── expect_value { target, value, timeout_ms }    │
//! │          └── screenshot   { name, full_page? }             │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The browser is closed inside the generated script's `finally`, so
//! teardown runs on every exit path, assertion failures included.

pub mod artifact;
pub mod driver;
pub mod error;
pub mod flow;
pub mod flows;
pub mod probe;
pub mod runner;

pub use artifact::ArtifactInfo;
pub use driver::{BrowserKind, Driver, DriverConfig, StepResult};
pub use error::{VerifyError, VerifyResult};
pub use flow::{Flow, Step, Target, Viewport};
pub use probe::ProbeConfig;
pub use runner::{FlowResult, SuiteResult, Verifier, VerifierConfig};
