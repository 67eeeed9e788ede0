//! Event producer with publish retries.

use super::{Broker, HIRING_EXCHANGE};
use crate::config::ProducerConfig;
use crate::error::Result;
use crate::events::{EventEnvelope, EventId, HiringEvent};
use crate::retry::{BackoffStrategy, RetryPolicy};
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, warn};

/// Publishes pipeline events to the hiring exchange, retrying transient
/// failures with exponential backoff before giving up.
#[derive(Debug, Clone)]
pub struct EventProducer {
    broker: Arc<Broker>,
    policy: RetryPolicy,
}

impl EventProducer {
    pub fn new(broker: Arc<Broker>, config: &ProducerConfig) -> Self {
        Self {
            broker,
            policy: RetryPolicy {
                max_attempts: config.max_attempts,
                backoff: BackoffStrategy::Exponential {
                    initial_delay_ms: config.initial_delay_ms,
                    max_delay_ms: config.max_delay_ms,
                    multiplier: config.multiplier,
                },
            },
        }
    }

    /// Publish an event under its own routing key.
    ///
    /// Returns the event id on success. All attempts exhausted surfaces
    /// the last publish error to the caller.
    pub async fn publish(&self, event: HiringEvent) -> Result<EventId> {
        self.publish_envelope(EventEnvelope::new(event)).await
    }

    /// Publish a pre-built envelope (for correlation ids).
    pub async fn publish_envelope(&self, envelope: EventEnvelope) -> Result<EventId> {
        let routing_key = envelope.routing_key();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self
                .broker
                .publish(HIRING_EXCHANGE, routing_key, &envelope)
                .await
            {
                Ok(()) => {
                    debug!(
                        event_id = %envelope.event_id,
                        routing_key,
                        attempt,
                        "event published"
                    );
                    counter!(
                        "hirestream_events_published_total",
                        "routing_key" => routing_key.to_string(),
                    )
                    .increment(1);
                    return Ok(envelope.event_id);
                }
                Err(err) if self.policy.should_retry(attempt) => {
                    let delay = self.policy.next_retry_delay(attempt - 1);
                    warn!(
                        event_id = %envelope.event_id,
                        routing_key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "publish failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    counter!(
                        "hirestream_events_publish_failures_total",
                        "routing_key" => routing_key.to_string(),
                    )
                    .increment(1);
                    err.log();
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{declare_topology, CANDIDATE_SCORE_QUEUE};
    use crate::config::BrokerConfig;
    use crate::domain::{CandidateId, ResumeId};
    use crate::error::ErrorCode;
    use std::time::Duration;

    fn fast_producer(broker: Arc<Broker>) -> EventProducer {
        EventProducer::new(
            broker,
            &ProducerConfig {
                max_attempts: 3,
                initial_delay_ms: 1,
                multiplier: 2.0,
                max_delay_ms: 4,
            },
        )
    }

    fn score_event() -> HiringEvent {
        HiringEvent::CandidateScoreRequested {
            resume_id: ResumeId::new(),
            candidate_id: CandidateId::new(),
            job_id: None,
        }
    }

    #[tokio::test]
    async fn test_publish_routes_by_event_kind() {
        let broker = Arc::new(Broker::new(Duration::from_millis(1)));
        declare_topology(&broker, &BrokerConfig::default())
            .await
            .unwrap();
        let producer = fast_producer(broker.clone());

        producer.publish(score_event()).await.unwrap();
        assert_eq!(broker.stats(CANDIDATE_SCORE_QUEUE).await.unwrap().depth, 1);
    }

    #[tokio::test]
    async fn test_publish_fails_after_exhausting_retries() {
        // no topology declared: every attempt hits an unknown exchange
        let broker = Arc::new(Broker::new(Duration::from_millis(1)));
        let producer = fast_producer(broker);

        let err = producer.publish(score_event()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ExchangeNotFound);
    }
}
