//! Messaging layer: in-process topic broker, pipeline topology, and the
//! retrying event producer.

mod producer;
mod queue;

pub use producer::EventProducer;
pub use queue::{
    match_topic, Broker, DeadLetterSpec, Delivery, QueueOptions, QueueStats,
};

use crate::config::BrokerConfig;
use crate::error::Result;
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// Topology
// ═══════════════════════════════════════════════════════════════════════════════

/// Main exchange all pipeline events flow through.
pub const HIRING_EXCHANGE: &str = "hiring.exchange";
/// Dead-letter exchange; each work queue's DLQ is bound here by queue name.
pub const HIRING_DLX: &str = "hiring.dlx";

pub const RESUME_PARSE_QUEUE: &str = "resume.parse";
pub const RESUME_PARSE_DLQ: &str = "resume.parse.dlq";
pub const CANDIDATE_SCORE_QUEUE: &str = "candidate.score";
pub const CANDIDATE_SCORE_DLQ: &str = "candidate.score.dlq";
pub const APPLICATION_SCREEN_QUEUE: &str = "application.screen";
pub const APPLICATION_SCREEN_DLQ: &str = "application.screen.dlq";
pub const INTERVIEW_EVALUATE_QUEUE: &str = "interview.evaluate";
pub const INTERVIEW_EVALUATE_DLQ: &str = "interview.evaluate.dlq";

/// Notification queue. Receives everything under `notification.#` and has
/// no DLQ: a lost notification is not worth quarantining.
pub const NOTIFICATION_QUEUE: &str = "notification";
pub const NOTIFICATION_BINDING: &str = "notification.#";

/// The four work queues, each bound by its own name as routing key.
const WORK_QUEUES: [&str; 4] = [
    RESUME_PARSE_QUEUE,
    CANDIDATE_SCORE_QUEUE,
    APPLICATION_SCREEN_QUEUE,
    INTERVIEW_EVALUATE_QUEUE,
];

/// Create a broker and declare the full pipeline topology on it.
pub async fn build_broker(config: &BrokerConfig) -> Result<Broker> {
    let broker = Broker::new(Duration::from_millis(config.poll_interval_ms));
    declare_topology(&broker, config).await?;
    Ok(broker)
}

/// Declare exchanges, queues, DLQs, and bindings.
pub async fn declare_topology(broker: &Broker, config: &BrokerConfig) -> Result<()> {
    broker.declare_exchange(HIRING_EXCHANGE).await;
    broker.declare_exchange(HIRING_DLX).await;

    for queue in WORK_QUEUES {
        let dlq = format!("{}.dlq", queue);
        broker
            .declare_queue(
                queue,
                QueueOptions::default()
                    .with_max_depth(config.max_queue_depth)
                    .with_dead_letter(HIRING_DLX, queue),
            )
            .await;
        broker
            .declare_queue(
                dlq.clone(),
                QueueOptions::default().with_max_depth(config.max_queue_depth),
            )
            .await;
        // work queue bound by its own name, DLQ bound on the DLX
        broker.bind(queue, HIRING_EXCHANGE, queue).await?;
        broker.bind(dlq, HIRING_DLX, queue).await?;
    }

    broker
        .declare_queue(
            NOTIFICATION_QUEUE,
            QueueOptions::default().with_max_depth(config.max_queue_depth),
        )
        .await;
    broker
        .bind(NOTIFICATION_QUEUE, HIRING_EXCHANGE, NOTIFICATION_BINDING)
        .await?;

    Ok(())
}
