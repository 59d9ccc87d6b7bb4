//! Worker pool: N workers draining a shared inbound queue into an outbound queue.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::types::{Event, ResourceDescriptor, WorkerId};

use super::item_task::{ItemOutcome, ItemTaskContext, run_item_task};

/// Receiving half of the inbound queue, shared by every worker.
pub(crate) type SharedInbound = Arc<Mutex<mpsc::Receiver<ResourceDescriptor>>>;

/// Spawn `count` workers, numbered from 1.
///
/// Each worker gets its own clone of `outbound`; the original is dropped here so
/// the outbound queue closes once the last worker stops.
pub(crate) fn spawn_workers(
    count: usize,
    template: &ItemTaskContext,
    inbound: SharedInbound,
    outbound: mpsc::Sender<ResourceDescriptor>,
) -> Vec<tokio::task::JoinHandle<()>> {
    (1..=count)
        .map(|id| {
            let ctx = ItemTaskContext {
                worker: WorkerId(id),
                ..template.clone()
            };
            tokio::spawn(run_worker(ctx, Arc::clone(&inbound), outbound.clone()))
        })
        .collect()
}

/// Worker loop: Idle → Fetching → Idle … until the inbound queue is closed and drained.
async fn run_worker(
    ctx: ItemTaskContext,
    inbound: SharedInbound,
    outbound: mpsc::Sender<ResourceDescriptor>,
) {
    let worker_id = ctx.worker.get();
    tracing::debug!(worker_id, "worker started");

    loop {
        let next = {
            let mut rx = inbound.lock().await;
            rx.recv().await
        };
        let Some(descriptor) = next else {
            break;
        };

        let address = descriptor.address().to_string();
        tracing::info!(worker_id, address = %address, "worker started working on item");
        ctx.event_tx
            .send(Event::ItemStarted {
                worker: ctx.worker,
                address: address.clone(),
            })
            .ok();

        let descriptor = match run_item_task(&ctx, descriptor).await {
            ItemOutcome::Completed(descriptor) => {
                tracing::info!(
                    worker_id,
                    address = %address,
                    succeeded = descriptor.succeeded(),
                    "worker finished working on item"
                );
                ctx.event_tx
                    .send(Event::ItemCompleted {
                        worker: ctx.worker,
                        address,
                        succeeded: descriptor.succeeded(),
                        with_comments: descriptor.comments().is_some(),
                    })
                    .ok();
                descriptor
            }
            ItemOutcome::Cancelled(descriptor) => {
                tracing::info!(worker_id, address = %address, "worker cancelled while working on item");
                ctx.event_tx
                    .send(Event::ItemCancelled {
                        worker: ctx.worker,
                        address,
                    })
                    .ok();
                descriptor
            }
        };

        if outbound.send(descriptor).await.is_err() {
            tracing::warn!(worker_id, "outbound queue closed, stopping worker");
            break;
        }
    }

    tracing::debug!(worker_id, "worker stopped");
}
