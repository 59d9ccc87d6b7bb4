//! Item task: both fetches for one descriptor, run concurrently and merged.

use std::sync::Arc;

use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::fetch::ResourceFetcher;
use crate::types::{Comment, Event, Post, ResourceDescriptor, WorkerId};

/// Shared state for the item tasks run by one worker.
#[derive(Clone)]
pub(crate) struct ItemTaskContext {
    pub(crate) worker: WorkerId,
    pub(crate) fetcher: Arc<dyn ResourceFetcher>,
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    pub(crate) cancel_token: CancellationToken,
    pub(crate) abort_on_cancel: bool,
}

/// How an item task ended. Both variants carry the descriptor to forward.
#[derive(Debug)]
pub(crate) enum ItemOutcome {
    /// Both fetches reported and were merged
    Completed(ResourceDescriptor),
    /// The batch was cancelled first; the descriptor is unmodified
    Cancelled(ResourceDescriptor),
}

/// Run the primary and dependent fetches for `descriptor` and merge their results.
///
/// Returns as soon as both fetches report or the cancellation token fires,
/// whichever comes first. Fetches that had both finished when the token fired
/// are still merged. Fetches abandoned on cancellation keep running in the
/// background (bounded by their own deadline) unless `abort_on_cancel` is set.
pub(crate) async fn run_item_task(
    ctx: &ItemTaskContext,
    mut descriptor: ResourceDescriptor,
) -> ItemOutcome {
    if ctx.cancel_token.is_cancelled() {
        return ItemOutcome::Cancelled(descriptor);
    }

    let mut primary = tokio::spawn({
        let fetcher = Arc::clone(&ctx.fetcher);
        let address = descriptor.address().to_string();
        async move { fetcher.fetch_primary(&address).await }
    });
    let mut dependent = tokio::spawn({
        let fetcher = Arc::clone(&ctx.fetcher);
        let address = descriptor.address().to_string();
        async move { fetcher.fetch_dependent(&address).await }
    });

    let joined = tokio::select! {
        biased;
        _ = ctx.cancel_token.cancelled() => None,
        results = async { tokio::join!(&mut primary, &mut dependent) } => Some(results),
    };

    let (primary_result, dependent_result) = match joined {
        Some(results) => results,
        // Both fetches already finished; their results are ready without waiting
        None if primary.is_finished() && dependent.is_finished() => {
            tokio::join!(&mut primary, &mut dependent)
        }
        None => {
            if ctx.abort_on_cancel {
                primary.abort();
                dependent.abort();
            }
            return ItemOutcome::Cancelled(descriptor);
        }
    };

    merge(
        ctx,
        &mut descriptor,
        flatten(primary_result),
        flatten(dependent_result),
    );
    ItemOutcome::Completed(descriptor)
}

/// Apply fetch results to the descriptor.
///
/// A dependent failure is reported but never undoes a successful primary fetch.
/// A primary failure leaves the descriptor untouched whatever the dependent did.
fn merge(
    ctx: &ItemTaskContext,
    descriptor: &mut ResourceDescriptor,
    primary: Result<Post, String>,
    dependent: Result<Vec<Comment>, String>,
) {
    match primary {
        Ok(post) => {
            descriptor.record_post(post);
            match dependent {
                Ok(comments) => descriptor.attach_comments(comments),
                Err(error) => {
                    tracing::warn!(
                        worker_id = ctx.worker.get(),
                        address = %descriptor.address(),
                        error = %error,
                        "dependent fetch failed"
                    );
                    ctx.event_tx
                        .send(Event::DependentFailed {
                            worker: ctx.worker,
                            address: descriptor.address().to_string(),
                            error,
                        })
                        .ok();
                }
            }
        }
        Err(error) => {
            tracing::warn!(
                worker_id = ctx.worker.get(),
                address = %descriptor.address(),
                error = %error,
                "primary fetch failed"
            );
        }
    }
}

/// Collapse a spawned fetch's result; a panicked fetch counts as a failed one.
fn flatten<T>(result: Result<Result<T, FetchError>, JoinError>) -> Result<T, String> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("fetch task failed: {e}")),
    }
}
