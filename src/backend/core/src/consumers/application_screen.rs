//! Application screening consumer.
//!
//! Runs the AI screen and match score for a new application, buckets the
//! application by score, and notifies the recruiter. A degraded screen
//! yields a zero score and lands in the rejected bucket with explicit
//! deferred-screening notes, which a recruiter can override.

use super::{ConsumeError, ConsumeResult, EventConsumer};
use crate::ai::{AiGateway, CandidateScore, ParsedResume, ScreeningResult};
use crate::broker::{EventProducer, APPLICATION_SCREEN_QUEUE};
use crate::domain::ApplicationStatus;
use crate::error::HirestreamError;
use crate::events::{EventEnvelope, HiringEvent};
use crate::store::HiringStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub struct ApplicationScreenConsumer {
    store: Arc<dyn HiringStore>,
    gateway: Arc<AiGateway>,
    producer: EventProducer,
}

impl ApplicationScreenConsumer {
    pub fn new(
        store: Arc<dyn HiringStore>,
        gateway: Arc<AiGateway>,
        producer: EventProducer,
    ) -> Self {
        Self {
            store,
            gateway,
            producer,
        }
    }

    fn notes(score: &CandidateScore, screen: &ScreeningResult) -> String {
        format!(
            "Score: {:.0}/100\nQualified: {}\nRed Flags: {}\nMissing: {}\nReasoning: {}",
            score.score,
            if screen.qualified { "yes" } else { "no" },
            join_or_none(&screen.red_flags),
            join_or_none(&screen.missing_requirements),
            score.reasoning,
        )
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join("; ")
    }
}

#[async_trait]
impl EventConsumer for ApplicationScreenConsumer {
    fn queue(&self) -> &'static str {
        APPLICATION_SCREEN_QUEUE
    }

    async fn consume(&self, envelope: &EventEnvelope) -> ConsumeResult {
        let (application_id, job_id, resume_id) = match &envelope.event {
            HiringEvent::ApplicationScreenRequested {
                application_id,
                job_id,
                resume_id,
                ..
            } => (*application_id, *job_id, *resume_id),
            other => {
                return Err(ConsumeError::new(format!(
                    "unexpected event on application screen queue: {}",
                    other.event_type()
                )))
            }
        };

        let mut application = self.store.application(application_id).await?;
        let resume = self.store.resume(resume_id).await?;
        let job = self.store.job(job_id).await?;

        // Screening can race parsing; the resume parse path has no hook to
        // re-request it, so the safe move is keeping the application in
        // Applied and letting a recruiter or resubmit retrigger.
        if !resume.is_parsed() {
            warn!(
                application_id = %application_id,
                resume_id = %resume_id,
                "resume not parsed yet, screening skipped"
            );
            return Ok(());
        }

        let parsed: ParsedResume = {
            let data = resume
                .parsed_data
                .clone()
                .ok_or_else(|| HirestreamError::internal("parsed resume missing parsed data"))?;
            serde_json::from_value(data).map_err(HirestreamError::from)?
        };

        let screen = self.gateway.screen_candidate(&parsed, &job).await;
        let score = self.gateway.score_candidate(&parsed, &job).await;

        application.ai_match_score = Some(score.score);
        application.screening_notes = Some(Self::notes(&score, &screen));
        let status = ApplicationStatus::from_screen_score(score.score);
        application.set_status(status);
        self.store.update_application(application).await?;

        // A failed publish fails the whole consumption so the message
        // dead-letters; the persisted screening result is overwritten on
        // redelivery.
        self.producer
            .publish(HiringEvent::NotificationRequested {
                recipient: job.recruiter_email.clone(),
                notification_type: "APPLICATION_SCREENED".to_string(),
                subject: format!("Application screened for {}", job.title),
                body: format!(
                    "Candidate scored {:.0}/100 and was moved to {:?}.",
                    score.score, status
                ),
            })
            .await?;

        info!(
            application_id = %application_id,
            score = score.score,
            status = ?status,
            "application screened"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::StubProvider;
    use crate::ai::AiProvider;
    use crate::broker::{declare_topology, Broker, NOTIFICATION_QUEUE};
    use crate::config::{AiConfig, BrokerConfig, ProducerConfig};
    use crate::domain::{Application, CandidateId, Job, JobDraft, JobStatus, ParseStatus, Resume};
    use crate::store::InMemoryStore;
    use std::time::Duration;

    async fn fixture(
        score: f32,
    ) -> (
        ApplicationScreenConsumer,
        Arc<InMemoryStore>,
        Arc<Broker>,
        EventEnvelope,
    ) {
        let broker = Arc::new(Broker::new(Duration::from_millis(2)));
        declare_topology(&broker, &BrokerConfig::default())
            .await
            .unwrap();
        let store = Arc::new(InMemoryStore::new());

        let provider = Arc::new(StubProvider::with_score(score));
        let mut resume = Resume::new(CandidateId::new(), "resumes/a.pdf", Some("text".into()));
        resume.set_parse_status(ParseStatus::Processing).unwrap();
        resume.parsed_data =
            Some(serde_json::to_value(provider.parse_resume("text").await.unwrap()).unwrap());
        resume.set_parse_status(ParseStatus::Completed).unwrap();

        let mut job = Job::new(JobDraft {
            title: "Platform Engineer".to_string(),
            description: "Own the event pipeline".to_string(),
            must_have: vec!["Rust".to_string()],
            nice_to_have: vec![],
            recruiter_email: "recruiter@example.com".to_string(),
        });
        job.set_status(JobStatus::Active).unwrap();

        let application = Application::new(job.id, resume.candidate_id, resume.id);
        let envelope = EventEnvelope::new(HiringEvent::ApplicationScreenRequested {
            application_id: application.id,
            job_id: job.id,
            candidate_id: resume.candidate_id,
            resume_id: resume.id,
        });

        store.insert_resume(resume).await.unwrap();
        store.insert_job(job).await.unwrap();
        store.insert_application(application).await.unwrap();

        let consumer = ApplicationScreenConsumer::new(
            store.clone(),
            Arc::new(AiGateway::new(provider, &AiConfig::default())),
            EventProducer::new(broker.clone(), &ProducerConfig::default()),
        );
        (consumer, store, broker, envelope)
    }

    async fn screened_status(score: f32) -> ApplicationStatus {
        let (consumer, store, _broker, envelope) = fixture(score).await;
        consumer.consume(&envelope).await.unwrap();
        let id = match envelope.event {
            HiringEvent::ApplicationScreenRequested { application_id, .. } => application_id,
            _ => unreachable!(),
        };
        store.application(id).await.unwrap().status
    }

    #[tokio::test]
    async fn test_score_buckets() {
        assert_eq!(screened_status(85.0).await, ApplicationStatus::Shortlisted);
        assert_eq!(screened_status(70.0).await, ApplicationStatus::Shortlisted);
        assert_eq!(screened_status(55.0).await, ApplicationStatus::Screening);
        assert_eq!(screened_status(40.0).await, ApplicationStatus::Screening);
        assert_eq!(screened_status(12.0).await, ApplicationStatus::Rejected);
    }

    #[tokio::test]
    async fn test_failed_notification_publish_fails_consumption() {
        // No topology declared, so the notification publish cannot route
        // and the consumption must error (nack path) instead of acking.
        let broker = Arc::new(Broker::new(Duration::from_millis(2)));
        let store = Arc::new(InMemoryStore::new());

        let provider = Arc::new(StubProvider::with_score(85.0));
        let mut resume = Resume::new(CandidateId::new(), "resumes/a.pdf", Some("text".into()));
        resume.set_parse_status(ParseStatus::Processing).unwrap();
        resume.parsed_data =
            Some(serde_json::to_value(provider.parse_resume("text").await.unwrap()).unwrap());
        resume.set_parse_status(ParseStatus::Completed).unwrap();

        let mut job = Job::new(JobDraft {
            title: "Platform Engineer".to_string(),
            description: "Own the event pipeline".to_string(),
            must_have: vec!["Rust".to_string()],
            nice_to_have: vec![],
            recruiter_email: "recruiter@example.com".to_string(),
        });
        job.set_status(JobStatus::Active).unwrap();

        let application = Application::new(job.id, resume.candidate_id, resume.id);
        let envelope = EventEnvelope::new(HiringEvent::ApplicationScreenRequested {
            application_id: application.id,
            job_id: job.id,
            candidate_id: resume.candidate_id,
            resume_id: resume.id,
        });

        store.insert_resume(resume).await.unwrap();
        store.insert_job(job).await.unwrap();
        store.insert_application(application).await.unwrap();

        let producer = EventProducer::new(
            broker.clone(),
            &ProducerConfig {
                max_attempts: 2,
                initial_delay_ms: 1,
                multiplier: 2.0,
                max_delay_ms: 4,
            },
        );
        let consumer = ApplicationScreenConsumer::new(
            store,
            Arc::new(AiGateway::new(provider, &AiConfig::default())),
            producer,
        );

        assert!(consumer.consume(&envelope).await.is_err());
    }

    #[tokio::test]
    async fn test_screen_notifies_recruiter() {
        let (consumer, store, broker, envelope) = fixture(85.0).await;
        consumer.consume(&envelope).await.unwrap();

        assert_eq!(broker.stats(NOTIFICATION_QUEUE).await.unwrap().depth, 1);
        let id = match envelope.event {
            HiringEvent::ApplicationScreenRequested { application_id, .. } => application_id,
            _ => unreachable!(),
        };
        let application = store.application(id).await.unwrap();
        assert_eq!(application.ai_match_score, Some(85.0));
        assert!(application
            .screening_notes
            .as_deref()
            .unwrap()
            .contains("Score: 85/100"));
    }
}
