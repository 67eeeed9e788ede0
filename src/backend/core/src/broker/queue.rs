//! In-process topic broker with durable-queue semantics.
//!
//! Exchanges route by topic pattern (`*` matches one word, `#` matches any
//! tail), queues hold messages until they are explicitly acked, and nacked
//! messages are forwarded to the queue's dead-letter target exactly once.

use crate::error::{ErrorCode, HirestreamError, Result};
use crate::events::EventEnvelope;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

// ═══════════════════════════════════════════════════════════════════════════════
// Topic Matching
// ═══════════════════════════════════════════════════════════════════════════════

/// AMQP-style topic match: `*` matches exactly one word, `#` matches zero
/// or more words. Words are separated by `.`.
pub fn match_topic(pattern: &str, routing_key: &str) -> bool {
    fn matches(pattern: &[&str], key: &[&str]) -> bool {
        match (pattern.first(), key.first()) {
            (None, None) => true,
            (Some(&"#"), _) => {
                // `#` consumes zero words, or one word and stays
                matches(&pattern[1..], key)
                    || (!key.is_empty() && matches(pattern, &key[1..]))
            }
            (Some(&"*"), Some(_)) => matches(&pattern[1..], &key[1..]),
            (Some(p), Some(k)) if p == k => matches(&pattern[1..], &key[1..]),
            _ => false,
        }
    }

    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    matches(&pattern, &key)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Queue Configuration
// ═══════════════════════════════════════════════════════════════════════════════

/// Dead-letter target for a queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterSpec {
    pub exchange: String,
    pub routing_key: String,
}

/// Per-queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueOptions {
    /// Declared durable. In-process queues do not survive restarts, but
    /// the flag is kept so topology declarations carry their intent.
    pub durable: bool,
    /// Maximum pending messages before publishes are rejected.
    pub max_depth: usize,
    /// Where nacked messages go. `None` drops them.
    pub dead_letter: Option<DeadLetterSpec>,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            durable: true,
            max_depth: 10_000,
            dead_letter: None,
        }
    }
}

impl QueueOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_dead_letter(
        mut self,
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Self {
        self.dead_letter = Some(DeadLetterSpec {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
        });
        self
    }
}

/// Point-in-time counters for a queue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStats {
    /// Messages waiting to be delivered.
    pub depth: usize,
    /// Delivered but not yet acked or nacked.
    pub in_flight: usize,
    pub total_published: u64,
    pub total_acked: u64,
    pub total_dead_lettered: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Messages and Deliveries
// ═══════════════════════════════════════════════════════════════════════════════

/// A message sitting in a queue: the routing key it arrived under plus the
/// serialized envelope.
#[derive(Debug, Clone)]
struct Message {
    routing_key: String,
    body: serde_json::Value,
}

/// A message handed to a consumer. Must be settled with
/// [`Broker::ack`] or [`Broker::nack`].
#[derive(Debug, Clone)]
pub struct Delivery {
    pub tag: u64,
    pub queue: String,
    pub routing_key: String,
    pub body: serde_json::Value,
}

impl Delivery {
    /// Deserialize the wire body back into a typed envelope.
    pub fn envelope(&self) -> Result<EventEnvelope> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Broker
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct Binding {
    queue: String,
    pattern: String,
}

#[derive(Debug, Default)]
struct QueueState {
    options: QueueOptions,
    messages: VecDeque<Message>,
    unacked: HashMap<u64, Message>,
    published: u64,
    acked: u64,
    dead_lettered: u64,
}

#[derive(Debug, Default)]
struct BrokerState {
    exchanges: HashMap<String, Vec<Binding>>,
    queues: HashMap<String, QueueState>,
}

/// The in-process message broker.
#[derive(Debug)]
pub struct Broker {
    state: Mutex<BrokerState>,
    next_tag: AtomicU64,
    poll_interval: Duration,
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(Duration::from_millis(25))
    }
}

impl Broker {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            state: Mutex::new(BrokerState::default()),
            next_tag: AtomicU64::new(1),
            poll_interval,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Topology
    // ─────────────────────────────────────────────────────────────────────────

    /// Declare a topic exchange. Idempotent.
    pub async fn declare_exchange(&self, name: impl Into<String>) {
        let mut state = self.state.lock().await;
        state.exchanges.entry(name.into()).or_default();
    }

    /// Declare a queue. Idempotent; redeclaring keeps existing messages
    /// and replaces the options.
    pub async fn declare_queue(&self, name: impl Into<String>, options: QueueOptions) {
        let mut state = self.state.lock().await;
        state.queues.entry(name.into()).or_default().options = options;
    }

    /// Bind a queue to an exchange with a topic pattern.
    pub async fn bind(
        &self,
        queue: impl Into<String>,
        exchange: &str,
        pattern: impl Into<String>,
    ) -> Result<()> {
        let queue = queue.into();
        let mut state = self.state.lock().await;
        if !state.queues.contains_key(&queue) {
            return Err(HirestreamError::new(
                ErrorCode::QueueNotFound,
                format!("Cannot bind unknown queue: {}", queue),
            ));
        }
        let bindings = state.exchanges.get_mut(exchange).ok_or_else(|| {
            HirestreamError::new(
                ErrorCode::ExchangeNotFound,
                format!("Cannot bind to unknown exchange: {}", exchange),
            )
        })?;
        bindings.push(Binding {
            queue,
            pattern: pattern.into(),
        });
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Publishing
    // ─────────────────────────────────────────────────────────────────────────

    /// Publish an envelope to an exchange under a routing key.
    ///
    /// Messages that match no binding are dropped, as a topic exchange
    /// would. Publishing to an unknown exchange or into a full queue is an
    /// error.
    pub async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        envelope: &EventEnvelope,
    ) -> Result<()> {
        let body = serde_json::to_value(envelope)?;
        let mut state = self.state.lock().await;
        let delivered = route_message(&mut state, exchange, routing_key, body)?;
        if delivered == 0 {
            warn!(exchange, routing_key, "message matched no binding, dropped");
        }
        counter!("hirestream_broker_published_total", "routing_key" => routing_key.to_string())
            .increment(1);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Consuming
    // ─────────────────────────────────────────────────────────────────────────

    /// Take the next message from a queue without waiting.
    ///
    /// The message moves to the in-flight set until it is settled.
    pub async fn try_dequeue(&self, queue: &str) -> Result<Option<Delivery>> {
        let mut state = self.state.lock().await;
        let queue_state = state.queues.get_mut(queue).ok_or_else(|| {
            HirestreamError::new(
                ErrorCode::QueueNotFound,
                format!("Unknown queue: {}", queue),
            )
        })?;

        let Some(message) = queue_state.messages.pop_front() else {
            return Ok(None);
        };

        let tag = self.next_tag.fetch_add(1, Ordering::Relaxed);
        let delivery = Delivery {
            tag,
            queue: queue.to_string(),
            routing_key: message.routing_key.clone(),
            body: message.body.clone(),
        };
        queue_state.unacked.insert(tag, message);
        Ok(Some(delivery))
    }

    /// Wait for the next message on a queue.
    pub async fn recv(&self, queue: &str) -> Result<Delivery> {
        loop {
            if let Some(delivery) = self.try_dequeue(queue).await? {
                return Ok(delivery);
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Acknowledge a delivery, removing it permanently.
    pub async fn ack(&self, delivery: &Delivery) -> Result<()> {
        let mut state = self.state.lock().await;
        let queue_state = state.queues.get_mut(&delivery.queue).ok_or_else(|| {
            HirestreamError::new(
                ErrorCode::QueueNotFound,
                format!("Unknown queue: {}", delivery.queue),
            )
        })?;
        if queue_state.unacked.remove(&delivery.tag).is_none() {
            return Err(HirestreamError::internal(format!(
                "unknown delivery tag {} on queue {}",
                delivery.tag, delivery.queue
            )));
        }
        queue_state.acked += 1;
        counter!("hirestream_broker_acked_total", "queue" => delivery.queue.clone()).increment(1);
        Ok(())
    }

    /// Reject a delivery without requeueing.
    ///
    /// The message is forwarded to the queue's dead-letter target, or
    /// dropped if the queue has none. Either way it will not be delivered
    /// from this queue again.
    pub async fn nack(&self, delivery: &Delivery) -> Result<()> {
        let mut state = self.state.lock().await;
        let queue_state = state.queues.get_mut(&delivery.queue).ok_or_else(|| {
            HirestreamError::new(
                ErrorCode::QueueNotFound,
                format!("Unknown queue: {}", delivery.queue),
            )
        })?;
        let Some(message) = queue_state.unacked.remove(&delivery.tag) else {
            return Err(HirestreamError::internal(format!(
                "unknown delivery tag {} on queue {}",
                delivery.tag, delivery.queue
            )));
        };
        queue_state.dead_lettered += 1;
        let dead_letter = queue_state.options.dead_letter.clone();

        match dead_letter {
            Some(spec) => {
                debug!(
                    queue = %delivery.queue,
                    dlx = %spec.exchange,
                    "dead-lettering rejected message"
                );
                // Routed under the DLX spec, not the original key.
                route_message(&mut state, &spec.exchange, &spec.routing_key, message.body)?;
            }
            None => {
                warn!(queue = %delivery.queue, "rejected message dropped (no dead-letter target)");
            }
        }
        counter!("hirestream_broker_dead_lettered_total", "queue" => delivery.queue.clone())
            .increment(1);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Introspection
    // ─────────────────────────────────────────────────────────────────────────

    /// Current counters for a queue.
    pub async fn stats(&self, queue: &str) -> Result<QueueStats> {
        let state = self.state.lock().await;
        let queue_state = state.queues.get(queue).ok_or_else(|| {
            HirestreamError::new(
                ErrorCode::QueueNotFound,
                format!("Unknown queue: {}", queue),
            )
        })?;
        Ok(QueueStats {
            depth: queue_state.messages.len(),
            in_flight: queue_state.unacked.len(),
            total_published: queue_state.published,
            total_acked: queue_state.acked,
            total_dead_lettered: queue_state.dead_lettered,
        })
    }

    /// Wait until a queue has no pending or in-flight messages.
    ///
    /// Returns `false` on timeout. Mostly useful in tests and shutdown
    /// paths.
    pub async fn wait_until_idle(&self, queue: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            match self.stats(queue).await {
                Ok(stats) if stats.depth == 0 && stats.in_flight == 0 => return true,
                _ if Instant::now() >= deadline => return false,
                _ => sleep(self.poll_interval).await,
            }
        }
    }
}

/// Route a message through an exchange into every matching queue.
///
/// Free function so dead-lettering can reuse it while the state lock is
/// already held.
fn route_message(
    state: &mut BrokerState,
    exchange: &str,
    routing_key: &str,
    body: serde_json::Value,
) -> Result<usize> {
    let bindings = state.exchanges.get(exchange).ok_or_else(|| {
        HirestreamError::new(
            ErrorCode::ExchangeNotFound,
            format!("Unknown exchange: {}", exchange),
        )
    })?;

    let targets: Vec<String> = bindings
        .iter()
        .filter(|b| match_topic(&b.pattern, routing_key))
        .map(|b| b.queue.clone())
        .collect();

    let mut delivered = 0;
    for queue in targets {
        let Some(queue_state) = state.queues.get_mut(&queue) else {
            continue;
        };
        if queue_state.messages.len() >= queue_state.options.max_depth {
            return Err(HirestreamError::publish_failed(
                routing_key,
                format!("queue {} is full", queue),
            ));
        }
        queue_state.messages.push_back(Message {
            routing_key: routing_key.to_string(),
            body: body.clone(),
        });
        queue_state.published += 1;
        delivered += 1;
    }
    Ok(delivered)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CandidateId, ResumeId};
    use crate::events::HiringEvent;

    fn envelope() -> EventEnvelope {
        EventEnvelope::new(HiringEvent::ResumeParseRequested {
            resume_id: ResumeId::new(),
            candidate_id: CandidateId::new(),
            file_ref: "resumes/test.pdf".to_string(),
        })
    }

    #[test]
    fn test_match_topic_exact() {
        assert!(match_topic("resume.parse", "resume.parse"));
        assert!(!match_topic("resume.parse", "resume.score"));
        assert!(!match_topic("resume.parse", "resume.parse.extra"));
    }

    #[test]
    fn test_match_topic_star() {
        assert!(match_topic("notification.*", "notification.send"));
        assert!(!match_topic("notification.*", "notification"));
        assert!(!match_topic("notification.*", "notification.send.extra"));
    }

    #[test]
    fn test_match_topic_hash() {
        assert!(match_topic("notification.#", "notification.send"));
        assert!(match_topic("notification.#", "notification.send.email"));
        assert!(match_topic("notification.#", "notification"));
        assert!(match_topic("#", "anything.at.all"));
        assert!(!match_topic("notification.#", "resume.parse"));
    }

    #[tokio::test]
    async fn test_publish_and_consume() {
        let broker = Broker::default();
        broker.declare_exchange("x").await;
        broker.declare_queue("q", QueueOptions::default()).await;
        broker.bind("q", "x", "resume.parse").await.unwrap();

        broker.publish("x", "resume.parse", &envelope()).await.unwrap();

        let delivery = broker.try_dequeue("q").await.unwrap().unwrap();
        assert_eq!(delivery.routing_key, "resume.parse");
        assert!(delivery.envelope().is_ok());

        // delivered but unsettled: in flight, not pending
        let stats = broker.stats("q").await.unwrap();
        assert_eq!(stats.depth, 0);
        assert_eq!(stats.in_flight, 1);

        broker.ack(&delivery).await.unwrap();
        let stats = broker.stats("q").await.unwrap();
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.total_acked, 1);
    }

    #[tokio::test]
    async fn test_publish_unknown_exchange_fails() {
        let broker = Broker::default();
        let err = broker.publish("missing", "k", &envelope()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ExchangeNotFound);
    }

    #[tokio::test]
    async fn test_unroutable_message_is_dropped() {
        let broker = Broker::default();
        broker.declare_exchange("x").await;
        broker.declare_queue("q", QueueOptions::default()).await;
        broker.bind("q", "x", "resume.parse").await.unwrap();

        broker.publish("x", "unrelated.key", &envelope()).await.unwrap();
        assert!(broker.try_dequeue("q").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_nack_dead_letters_exactly_once() {
        let broker = Broker::default();
        broker.declare_exchange("x").await;
        broker.declare_exchange("dlx").await;
        broker
            .declare_queue("q", QueueOptions::default().with_dead_letter("dlx", "q"))
            .await;
        broker.declare_queue("q.dlq", QueueOptions::default()).await;
        broker.bind("q", "x", "work").await.unwrap();
        broker.bind("q.dlq", "dlx", "q").await.unwrap();

        broker.publish("x", "work", &envelope()).await.unwrap();
        let delivery = broker.try_dequeue("q").await.unwrap().unwrap();
        broker.nack(&delivery).await.unwrap();

        // gone from the work queue, present once in the DLQ
        let stats = broker.stats("q").await.unwrap();
        assert_eq!(stats.depth, 0);
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.total_dead_lettered, 1);

        let dlq_stats = broker.stats("q.dlq").await.unwrap();
        assert_eq!(dlq_stats.depth, 1);

        // settling twice is an error
        assert!(broker.nack(&delivery).await.is_err());
        assert_eq!(broker.stats("q.dlq").await.unwrap().depth, 1);
    }

    #[tokio::test]
    async fn test_nack_without_dead_letter_drops() {
        let broker = Broker::default();
        broker.declare_exchange("x").await;
        broker.declare_queue("q", QueueOptions::default()).await;
        broker.bind("q", "x", "work").await.unwrap();

        broker.publish("x", "work", &envelope()).await.unwrap();
        let delivery = broker.try_dequeue("q").await.unwrap().unwrap();
        broker.nack(&delivery).await.unwrap();

        let stats = broker.stats("q").await.unwrap();
        assert_eq!(stats.depth, 0);
        assert_eq!(stats.in_flight, 0);
    }

    #[tokio::test]
    async fn test_queue_full_rejects_publish() {
        let broker = Broker::default();
        broker.declare_exchange("x").await;
        broker
            .declare_queue("q", QueueOptions::default().with_max_depth(1))
            .await;
        broker.bind("q", "x", "work").await.unwrap();

        broker.publish("x", "work", &envelope()).await.unwrap();
        let err = broker.publish("x", "work", &envelope()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PublishFailed);
    }

    #[tokio::test]
    async fn test_fanout_to_multiple_matching_queues() {
        let broker = Broker::default();
        broker.declare_exchange("x").await;
        broker.declare_queue("a", QueueOptions::default()).await;
        broker.declare_queue("b", QueueOptions::default()).await;
        broker.bind("a", "x", "event.#").await.unwrap();
        broker.bind("b", "x", "event.one").await.unwrap();

        broker.publish("x", "event.one", &envelope()).await.unwrap();
        assert_eq!(broker.stats("a").await.unwrap().depth, 1);
        assert_eq!(broker.stats("b").await.unwrap().depth, 1);
    }
}
