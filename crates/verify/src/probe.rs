//! Target server readiness probe
//!
//! The chat console is an external collaborator assumed to be running;
//! this harness never owns its lifecycle. Before a browser is launched
//! the base URL is polled within a bounded window so an unreachable
//! server fails fast instead of burning the navigation timeout.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{VerifyError, VerifyResult};

/// Configuration for the readiness probe
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Total window to wait for the server
    pub timeout: Duration,

    /// Delay between attempts
    pub interval: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            interval: Duration::from_millis(250),
        }
    }
}

/// Wait for the target server to respond at its base URL.
///
/// Any HTTP response counts as reachable; the page contract itself is
/// checked by the browser steps, not here.
pub async fn wait_for_ready(base_url: &str, config: &ProbeConfig) -> VerifyResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = std::time::Instant::now();
    let mut attempts = 0;

    while start.elapsed() < config.timeout {
        attempts += 1;

        match client.get(base_url).send().await {
            Ok(resp) => {
                if !resp.status().is_success() {
                    warn!("Target responded with {}", resp.status());
                }
                return Ok(());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for target server at {}...", base_url);
                }
                // Connection refused is the expected shape while unreachable
                if !e.is_connect() && !e.is_timeout() {
                    warn!("Probe error: {}", e);
                }
            }
        }

        sleep(config.interval).await;
    }

    Err(VerifyError::ServerUnreachable {
        url: base_url.to_string(),
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_port() -> u16 {
        use std::net::TcpListener;

        TcpListener::bind("127.0.0.1:0")
            .expect("bind to find free port")
            .local_addr()
            .expect("local addr")
            .port()
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_within_window() {
        let url = format!("http://127.0.0.1:{}", free_port());
        let config = ProbeConfig {
            timeout: Duration::from_millis(600),
            interval: Duration::from_millis(100),
        };

        let start = std::time::Instant::now();
        let err = wait_for_ready(&url, &config).await.unwrap_err();
        assert!(start.elapsed() < Duration::from_secs(5));

        match err {
            VerifyError::ServerUnreachable { attempts, url: reported } => {
                assert!(attempts >= 1);
                assert_eq!(reported, url);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ready_server_passes() {
        use axum::{routing::get, Router};

        let app = Router::new().route("/", get(|| async { "ok" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let url = format!("http://{}", addr);
        wait_for_ready(&url, &ProbeConfig::default()).await.unwrap();
    }
}
