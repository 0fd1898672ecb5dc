// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded delivery queue.
//!
//! The pipeline never awaits a webhook endpoint. Deliveries go into a bounded
//! channel; a dispatcher task takes each one, waits for a concurrency permit,
//! and spawns the HTTP call. A full queue drops the delivery with a warning.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use hookwire_config::model::DeliveryConfig;
use hookwire_core::{WebhookDelivery, WebhookSink};

/// Sending side of the delivery queue. Cheap to clone.
#[derive(Clone)]
pub struct DeliveryQueue {
    tx: mpsc::Sender<WebhookDelivery>,
    pending: Arc<AtomicUsize>,
}

impl DeliveryQueue {
    /// Starts the dispatcher task and returns the queue plus its handle.
    pub fn start(sink: Arc<dyn WebhookSink>, config: &DeliveryConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let pending = Arc::new(AtomicUsize::new(0));
        let permits = Arc::new(Semaphore::new(config.max_in_flight.max(1)));
        let handle = tokio::spawn(run_dispatcher(rx, sink, permits, pending.clone()));
        (Self { tx, pending }, handle)
    }

    /// Queues a delivery without waiting. Returns `false` if it was dropped.
    pub fn enqueue(&self, delivery: WebhookDelivery) -> bool {
        let tenant = delivery.tenant;
        let event_type = delivery.event_type;
        self.pending.fetch_add(1, Ordering::SeqCst);
        match self.tx.try_send(delivery) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                warn!(tenant_id = %tenant, %event_type, "delivery queue full, dropping webhook");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                warn!(tenant_id = %tenant, %event_type, "delivery queue closed, dropping webhook");
                false
            }
        }
    }

    /// Deliveries queued or in flight.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Waits until nothing is queued or in flight. Returns `false` on timeout.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let drained = tokio::time::timeout(timeout, async {
            while self.pending() > 0 {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .is_ok();
        if !drained {
            warn!(pending = self.pending(), "delivery queue did not drain before timeout");
        }
        drained
    }
}

async fn run_dispatcher(
    mut rx: mpsc::Receiver<WebhookDelivery>,
    sink: Arc<dyn WebhookSink>,
    permits: Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
) {
    while let Some(delivery) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let sink = sink.clone();
        let pending = pending.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let tenant = delivery.tenant;
            let event_type = delivery.event_type;
            let url = delivery.url.clone();
            match sink.deliver(delivery).await {
                Ok(()) => info!(tenant_id = %tenant, %event_type, %url, "webhook sent"),
                Err(e) => warn!(tenant_id = %tenant, %event_type, %url, error = %e, "webhook delivery failed"),
            }
            pending.fetch_sub(1, Ordering::SeqCst);
        });
    }
    info!("delivery dispatcher stopped");
}
