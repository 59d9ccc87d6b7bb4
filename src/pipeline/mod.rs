//! Batch pipeline: dispatcher, worker pool and item tasks.
//!
//! - [`worker_pool`] - workers pulling descriptors from the shared inbound queue
//! - [`item_task`] - concurrent primary/dependent fetch and merge for one descriptor
//!
//! [`BatchFetcher::run`] is the dispatcher: it sizes both queues to the batch,
//! feeds every descriptor in, and receives exactly one outcome per descriptor.

mod item_task;
mod worker_pool;


use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::{HttpFetcher, ResourceFetcher};
use crate::types::{Event, ResourceDescriptor, WorkerId};

use item_task::ItemTaskContext;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Batch fetcher instance (cloneable - all fields are Arc-wrapped or cheap handles)
#[derive(Clone)]
pub struct BatchFetcher {
    /// Configuration (wrapped in Arc for sharing across tasks)
    config: Arc<Config>,
    /// Fetch implementation shared by every item task
    fetcher: Arc<dyn ResourceFetcher>,
    /// Event broadcast channel sender (multiple subscribers supported)
    event_tx: broadcast::Sender<Event>,
    /// Cancels every run of this fetcher, current and future
    cancel_token: CancellationToken,
}

impl BatchFetcher {
    /// Create a batch fetcher backed by an [`HttpFetcher`] built from `config.fetch`.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the HTTP client cannot be created
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let fetcher = HttpFetcher::new(&config.fetch)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Create a batch fetcher around any [`ResourceFetcher`].
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config: Arc::new(config),
            fetcher,
            event_tx,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Subscribe to pipeline events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Token that cancels all work of this fetcher when fired.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Cancel all in-progress and future runs.
    ///
    /// Runs still return one outcome per submitted item; items not yet fetched
    /// come back unsuccessful.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Configuration this fetcher was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch every address and return one descriptor per address.
    ///
    /// Outcomes are returned in completion order, not submission order.
    /// Per-item fetch failures are recorded on the descriptors and never fail
    /// the run.
    ///
    /// # Errors
    /// - [`Error::Config`] if the batch is non-empty and no workers are configured
    /// - [`Error::WorkerLost`] if the pool stopped before every item produced an outcome
    pub async fn run<I, S>(&self, addresses: I) -> Result<Vec<ResourceDescriptor>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let descriptors: Vec<ResourceDescriptor> = addresses
            .into_iter()
            .map(ResourceDescriptor::new)
            .collect();
        let total = descriptors.len();

        if total == 0 {
            tracing::info!("no addresses to fetch");
            return Ok(Vec::new());
        }
        let workers = self.config.workers;
        if workers == 0 {
            return Err(Error::config(
                "workers",
                format!("no workers configured to process {total} items"),
            ));
        }

        // Per-run token: the deadline cancels this run only, while cancelling
        // the fetcher still reaches it through the parent.
        let run_token = self.cancel_token.child_token();
        let deadline_timer = self.config.deadline.map(|deadline| {
            let token = run_token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                tracing::warn!(
                    deadline_secs = deadline.as_secs_f64(),
                    "batch deadline reached, cancelling"
                );
                token.cancel();
            })
        });

        // Both queues hold the whole batch so neither side ever blocks on a full queue
        let (inbound_tx, inbound_rx) = mpsc::channel(total);
        let (outbound_tx, mut outbound_rx) = mpsc::channel(total);

        let template = ItemTaskContext {
            worker: WorkerId(0),
            fetcher: Arc::clone(&self.fetcher),
            event_tx: self.event_tx.clone(),
            cancel_token: run_token.clone(),
            abort_on_cancel: self.config.fetch.abort_on_cancel,
        };
        let handles = worker_pool::spawn_workers(
            workers,
            &template,
            Arc::new(Mutex::new(inbound_rx)),
            outbound_tx,
        );
        tracing::info!(workers, items = total, "dispatching batch");

        for descriptor in descriptors {
            if inbound_tx.send(descriptor).await.is_err() {
                tracing::error!("inbound queue closed while dispatching");
                break;
            }
        }
        drop(inbound_tx);

        let mut results = Vec::with_capacity(total);
        while results.len() < total {
            match outbound_rx.recv().await {
                Some(descriptor) => results.push(descriptor),
                None => break,
            }
        }

        if let Some(timer) = deadline_timer {
            timer.abort();
        }
        for joined in futures::future::join_all(handles).await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "worker task failed");
            }
        }

        if results.len() < total {
            return Err(Error::WorkerLost {
                expected: total,
                received: results.len(),
            });
        }

        let succeeded = results.iter().filter(|d| d.succeeded()).count();
        let cancelled = run_token.is_cancelled();
        tracing::info!(total, succeeded, cancelled, "batch completed");
        self.event_tx
            .send(Event::BatchCompleted {
                total,
                succeeded,
                cancelled,
            })
            .ok();

        Ok(results)
    }
}
