//! Notification consumer.
//!
//! Terminal consumer of the notification catch-all binding. Delivery to an
//! actual mail or chat channel sits behind this seam; for now the consumer
//! records the notification and acks.

use super::{ConsumeError, ConsumeResult, EventConsumer};
use crate::broker::NOTIFICATION_QUEUE;
use crate::events::{EventEnvelope, HiringEvent};
use async_trait::async_trait;
use metrics::counter;
use tracing::info;

#[derive(Default)]
pub struct NotificationConsumer;

impl NotificationConsumer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventConsumer for NotificationConsumer {
    fn queue(&self) -> &'static str {
        NOTIFICATION_QUEUE
    }

    async fn consume(&self, envelope: &EventEnvelope) -> ConsumeResult {
        let HiringEvent::NotificationRequested {
            recipient,
            notification_type,
            subject,
            ..
        } = &envelope.event
        else {
            return Err(ConsumeError::new(format!(
                "unexpected event on notification queue: {}",
                envelope.event.event_type()
            )));
        };

        info!(
            recipient = %recipient,
            notification_type = %notification_type,
            subject = %subject,
            "notification dispatched"
        );
        counter!(
            "hirestream_notifications_total",
            "notification_type" => notification_type.clone(),
        )
        .increment(1);
        Ok(())
    }
}
