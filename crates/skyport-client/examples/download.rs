//! Progressive download against a configured Skyport service.
//!
//! Usage: download <config.toml> <service-path>
//!
//! Prompts on the terminal if the service needs consent: the
//! authorization URL is printed for the user to open in a browser, and
//! the authorization code is read back from stdin.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use bytes::Bytes;
use skyport_auth::consent::{ConsentOutcome, ConsentRequest, ConsentUi};
use skyport_client::{
    Client, ClientConfig, OperationError, OperationInfo, OperationObserver, OperationRequest,
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Consent surface for a terminal session: print the URL, read the code.
struct TerminalConsent;

impl ConsentUi for TerminalConsent {
    fn present<'a>(
        &'a self,
        request: &'a ConsentRequest,
    ) -> Pin<Box<dyn Future<Output = ConsentOutcome> + Send + 'a>> {
        Box::pin(async move {
            println!("Open this URL and approve access:\n  {}", request.authorize_url);
            println!("Paste the authorization code (empty to cancel):");
            let mut code = String::new();
            match std::io::stdin().read_line(&mut code) {
                Ok(_) => {
                    let code = code.trim().to_owned();
                    if code.is_empty() {
                        ConsentOutcome::Cancelled
                    } else {
                        ConsentOutcome::Granted { code }
                    }
                }
                Err(e) => ConsentOutcome::Failed(format!("reading code: {e}")),
            }
        })
    }
}

/// Prints progress and the terminal outcome.
struct PrintingObserver {
    received: AtomicU64,
    done: tokio::sync::Notify,
}

impl OperationObserver for PrintingObserver {
    fn on_progress(&self, _operation: &OperationInfo, chunk: &Bytes) {
        let total = self
            .received
            .fetch_add(chunk.len() as u64, Ordering::Relaxed)
            + chunk.len() as u64;
        eprint!("\rreceived {total} bytes");
    }

    fn on_completed(&self, operation: &OperationInfo, _body: Bytes) {
        eprintln!();
        info!(operation_id = %operation.id, "download completed");
        self.done.notify_one();
    }

    fn on_failed(&self, operation: &OperationInfo, error: OperationError) {
        eprintln!();
        tracing::error!(operation_id = %operation.id, error = %error, "download failed");
        self.done.notify_one();
    }

    fn on_cancelled(&self, operation: &OperationInfo) {
        eprintln!();
        info!(operation_id = %operation.id, "download cancelled");
        self.done.notify_one();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let (config_path, path) = match (args.get(1), args.get(2)) {
        (Some(config_path), Some(path)) => (config_path.clone(), path.clone()),
        _ => anyhow::bail!("usage: download <config.toml> <service-path>"),
    };

    let config = ClientConfig::load(config_path.as_ref())
        .with_context(|| format!("failed to load config from {config_path}"))?;
    let client = Client::with_http_transport(config, Arc::new(TerminalConsent))?;

    if client.restore_session().await? {
        info!("restored persisted credential");
    }

    let observer = Arc::new(PrintingObserver {
        received: AtomicU64::new(0),
        done: tokio::sync::Notify::new(),
    });
    let handle = client.execute(
        OperationRequest::get(path).progressive(),
        observer.clone(),
    );

    observer.done.notified().await;
    handle.wait().await;
    Ok(())
}
