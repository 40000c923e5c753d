//! chatverify CLI entry point
//!
//! Runs the built-in verification flows (or a directory of YAML flows)
//! against a running chat server. Exit code 0 when every flow passed,
//! 1 when any verification failed, 2 on harness errors.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use chatverify::{flows, BrowserKind, Flow, ProbeConfig, Verifier, VerifierConfig, VerifyError, VerifyResult};

#[derive(Parser, Debug)]
#[command(name = "chatverify")]
#[command(about = "UI verification flows for the chat console")]
struct Args {
    /// Base URL of the running chat server
    #[arg(long, default_value = "http://localhost:3000")]
    base_url: String,

    /// Directory of YAML flows to run instead of the built-ins
    #[arg(long)]
    flows: Option<PathBuf>,

    /// Run only the flow with this name
    #[arg(short, long)]
    flow: Option<String>,

    /// Run only flows carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// List available flows and exit
    #[arg(long)]
    list: bool,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long, default_value = "chromium")]
    browser: String,

    /// Run with a visible browser window
    #[arg(long)]
    headed: bool,

    /// Directory screenshots are written to
    #[arg(long, default_value = "verify-results/screenshots")]
    screenshot_dir: PathBuf,

    /// Output directory for the results report
    #[arg(short, long, default_value = "verify-results")]
    output: PathBuf,

    /// Seconds to wait for the target server to respond
    #[arg(long, default_value = "10")]
    probe_timeout: u64,

    /// Overall bound in seconds on one flow's browser run
    #[arg(long, default_value = "60")]
    run_timeout: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("info".parse().expect("valid directive")),
        )
        .init();

    let args = Args::parse();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let result = rt.block_on(run(args));

    match result {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn run(args: Args) -> VerifyResult<bool> {
    let all_flows = match &args.flows {
        Some(dir) => Flow::load_dir(dir)?,
        None => flows::builtin(),
    };

    if args.list {
        for flow in &all_flows {
            println!("{} - {}", flow.name, flow.description);
        }
        return Ok(true);
    }

    let selected: Vec<Flow> = match (&args.flow, &args.tag) {
        (Some(name), _) => {
            let flow = all_flows
                .into_iter()
                .find(|f| f.name == *name)
                .ok_or_else(|| VerifyError::FlowNotFound(name.clone()))?;
            vec![flow]
        }
        (None, Some(tag)) => Flow::filter_by_tag(&all_flows, tag).into_iter().cloned().collect(),
        (None, None) => all_flows,
    };

    if selected.is_empty() {
        return Err(VerifyError::FlowNotFound(
            args.tag.unwrap_or_else(|| "no flows selected".to_string()),
        ));
    }

    let browser = match args.browser.as_str() {
        "firefox" => BrowserKind::Firefox,
        "webkit" => BrowserKind::Webkit,
        _ => BrowserKind::Chromium,
    };

    let verifier = Verifier::new(VerifierConfig {
        base_url: args.base_url,
        screenshot_dir: args.screenshot_dir,
        output_dir: args.output,
        browser,
        headless: !args.headed,
        probe: ProbeConfig {
            timeout: Duration::from_secs(args.probe_timeout),
            ..Default::default()
        },
        run_timeout: Duration::from_secs(args.run_timeout),
    });

    let suite = verifier.run(&selected).await?;
    verifier.write_report(&suite)?;

    Ok(suite.failed == 0)
}
