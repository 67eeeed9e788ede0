//! Interview answer evaluation consumer.

use super::{ConsumeError, ConsumeResult, EventConsumer};
use crate::ai::AiGateway;
use crate::broker::INTERVIEW_EVALUATE_QUEUE;
use crate::error::ErrorCode;
use crate::events::{EventEnvelope, HiringEvent};
use crate::store::HiringStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub struct InterviewEvaluateConsumer {
    store: Arc<dyn HiringStore>,
    gateway: Arc<AiGateway>,
}

impl InterviewEvaluateConsumer {
    pub fn new(store: Arc<dyn HiringStore>, gateway: Arc<AiGateway>) -> Self {
        Self { store, gateway }
    }
}

#[async_trait]
impl EventConsumer for InterviewEvaluateConsumer {
    fn queue(&self) -> &'static str {
        INTERVIEW_EVALUATE_QUEUE
    }

    async fn consume(&self, envelope: &EventEnvelope) -> ConsumeResult {
        let (interview_id, question_id, response_id, answer_text) = match &envelope.event {
            HiringEvent::InterviewEvaluateRequested {
                interview_id,
                question_id,
                response_id,
                answer_text,
            } => (*interview_id, *question_id, *response_id, answer_text),
            other => {
                return Err(ConsumeError::new(format!(
                    "unexpected event on interview evaluate queue: {}",
                    other.event_type()
                )))
            }
        };

        // The response may have been deleted since submission; nothing left
        // to evaluate, so the message is consumed.
        let mut response = match self.store.response(response_id).await {
            Ok(response) => response,
            Err(err) if err.code() == ErrorCode::RecordNotFound => {
                warn!(response_id = %response_id, "response gone, skipping evaluation");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        if response.is_evaluated() {
            return Ok(());
        }

        let interview = self.store.interview(interview_id).await?;
        let question = self.store.question(question_id).await?;
        let application = self.store.application(interview.application_id).await?;
        let job = self.store.job(application.job_id).await?;

        let evaluation = self
            .gateway
            .evaluate_answer(&question, answer_text, &job)
            .await;
        response.record_evaluation(evaluation.score, evaluation.feedback);
        self.store.update_response(response).await?;

        info!(
            response_id = %response_id,
            interview_id = %interview_id,
            score = evaluation.score,
            "answer evaluated"
        );
        Ok(())
    }
}
