//! # batchfetch
//!
//! Concurrent batch fetcher for JSON resources and their dependent sub-resources.
//!
//! A fixed pool of workers takes addresses from a queue. For every address the
//! primary resource and its dependent list (`<address>/comments`) are fetched
//! concurrently, each under its own deadline. Per-item failures are recorded on
//! the item and never abort the batch, and a shared cancellation token stops the
//! whole batch early while still returning one outcome per address.
//!
//! ## Quick Start
//!
//! ```no_run
//! use batchfetch::{BatchFetcher, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         workers: 4,
//!         ..Default::default()
//!     };
//!     let fetcher = BatchFetcher::new(config)?;
//!
//!     let results = fetcher
//!         .run([
//!             "https://jsonplaceholder.typicode.com/posts/1",
//!             "https://jsonplaceholder.typicode.com/posts/2",
//!         ])
//!         .await?;
//!
//!     print!("{}", batchfetch::report::render_text(&results));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Fetch operations
pub mod fetch;
/// Worker pool and dispatcher
pub mod pipeline;
/// Report rendering
pub mod report;
/// Address list reader
pub mod source;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, FetchConfig, ReportFormat};
pub use error::{Error, FetchError, FetchErrorKind, Result};
pub use fetch::{HttpFetcher, ResourceFetcher};
pub use pipeline::BatchFetcher;
pub use types::{Comment, Event, Post, ResourceDescriptor, WorkerId};

use tokio_util::sync::CancellationToken;

/// Cancel `token` when the process receives a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Returns early without cancelling if the token is cancelled by someone else.
///
/// # Example
///
/// ```no_run
/// use batchfetch::{BatchFetcher, Config, cancel_on_signal};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let fetcher = BatchFetcher::new(Config::default())?;
///     tokio::spawn(cancel_on_signal(fetcher.cancel_token()));
///
///     let results = fetcher.run(["https://example.com/posts/1"]).await?;
///     println!("{} outcomes", results.len());
///     Ok(())
/// }
/// ```
pub async fn cancel_on_signal(token: CancellationToken) {
    tokio::select! {
        _ = token.cancelled() => {}
        _ = wait_for_signal() => {
            tracing::warn!("cancelling in-flight work");
            token.cancel();
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments; fall back to ctrl_c then
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            let name = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            };
            tracing::info!(signal = name, "received termination signal");
        }
        (Ok(mut only), Err(e)) | (Err(e), Ok(mut only)) => {
            tracing::warn!(error = %e, "could not register every signal handler");
            only.recv().await;
            tracing::info!("received termination signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "could not register signal handlers, using ctrl_c");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_on_signal_returns_when_token_cancelled_elsewhere() {
        let token = CancellationToken::new();
        let handle = tokio::spawn(cancel_on_signal(token.clone()));

        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("signal watcher should stop once the token is cancelled")
            .unwrap();
    }
}
