//! Pipeline consumers and the worker loop that drives them.
//!
//! Each consumer owns one queue. The worker delivers messages with manual
//! settlement: a consumer returning `Ok` acks, returning `Err` nacks and
//! the broker dead-letters the message. Benign races (entity already
//! processed, prerequisite not yet met) are `Ok` no-ops, never errors.

mod application_screen;
mod candidate_score;
mod interview_evaluate;
mod notification;
mod resume_parse;

pub use application_screen::ApplicationScreenConsumer;
pub use candidate_score::CandidateScoreConsumer;
pub use interview_evaluate::InterviewEvaluateConsumer;
pub use notification::NotificationConsumer;
pub use resume_parse::ResumeParseConsumer;

use crate::broker::{Broker, Delivery};
use crate::error::HirestreamError;
use crate::events::EventEnvelope;
use async_trait::async_trait;
use metrics::counter;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Failure that sends the message to the dead-letter queue.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ConsumeError {
    pub message: String,
}

impl ConsumeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<HirestreamError> for ConsumeError {
    fn from(error: HirestreamError) -> Self {
        Self::new(error.to_string())
    }
}

pub type ConsumeResult = std::result::Result<(), ConsumeError>;

/// A queue consumer.
#[async_trait]
pub trait EventConsumer: Send + Sync {
    /// The queue this consumer reads from.
    fn queue(&self) -> &'static str;

    /// Process one envelope. `Ok` acks, `Err` dead-letters.
    async fn consume(&self, envelope: &EventEnvelope) -> ConsumeResult;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Worker
// ═══════════════════════════════════════════════════════════════════════════════

/// Drives one consumer against the broker with bounded concurrency.
pub struct ConsumerWorker {
    broker: Arc<Broker>,
    consumer: Arc<dyn EventConsumer>,
    concurrency: usize,
}

impl ConsumerWorker {
    pub fn new(broker: Arc<Broker>, consumer: Arc<dyn EventConsumer>, concurrency: usize) -> Self {
        Self {
            broker,
            consumer,
            concurrency: concurrency.max(1),
        }
    }

    /// Start the worker loop on the runtime.
    pub fn spawn(self) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            self.broker,
            self.consumer,
            self.concurrency,
            shutdown_rx,
        ));
        WorkerHandle {
            shutdown: shutdown_tx,
            handle,
        }
    }
}

/// Handle to a running worker.
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal shutdown and wait for the loop to exit. In-flight handlers
    /// run to completion and settle their messages before this returns.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

async fn run_loop(
    broker: Arc<Broker>,
    consumer: Arc<dyn EventConsumer>,
    concurrency: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let queue = consumer.queue();
    let semaphore = Arc::new(Semaphore::new(concurrency));
    info!(queue, concurrency, "consumer started");

    loop {
        // take a slot before pulling work so in-flight stays bounded
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };

        tokio::select! {
            changed = shutdown.changed() => {
                drop(permit);
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            delivery = broker.recv(queue) => {
                match delivery {
                    Ok(delivery) => {
                        let broker = broker.clone();
                        let consumer = consumer.clone();
                        tokio::spawn(async move {
                            process(broker, consumer, delivery).await;
                            drop(permit);
                        });
                    }
                    Err(err) => {
                        drop(permit);
                        err.log();
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    }
                }
            }
        }
    }

    // handler tasks hold permits; reclaiming all of them drains in-flight
    // work before the loop reports stopped
    let _ = semaphore.acquire_many(concurrency as u32).await;
    info!(queue, "consumer stopped");
}

async fn process(broker: Arc<Broker>, consumer: Arc<dyn EventConsumer>, delivery: Delivery) {
    let queue = consumer.queue();

    let envelope = match delivery.envelope() {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(queue, error = %err, "undecodable message, dead-lettering");
            if let Err(err) = broker.nack(&delivery).await {
                err.log();
            }
            return;
        }
    };

    match consumer.consume(&envelope).await {
        Ok(()) => {
            if let Err(err) = broker.ack(&delivery).await {
                err.log();
            }
            counter!("hirestream_consumed_total", "queue" => queue, "outcome" => "ok")
                .increment(1);
        }
        Err(err) => {
            warn!(
                queue,
                event_id = %envelope.event_id,
                error = %err,
                "consumer failed, dead-lettering"
            );
            if let Err(err) = broker.nack(&delivery).await {
                err.log();
            }
            counter!("hirestream_consumed_total", "queue" => queue, "outcome" => "dead_lettered")
                .increment(1);
        }
    }
}
