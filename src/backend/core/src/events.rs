//! Typed pipeline events and the envelope they travel in.
//!
//! Every message on the broker is an [`EventEnvelope`] wrapping one
//! [`HiringEvent`] variant. The variant determines the routing key, so
//! producers cannot publish an event under the wrong key.

use crate::domain::{ApplicationId, CandidateId, InterviewId, JobId, QuestionId, ResponseId, ResumeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a published event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The pipeline's event vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HiringEvent {
    /// A resume was uploaded (or resubmitted) and needs parsing.
    ResumeParseRequested {
        resume_id: ResumeId,
        candidate_id: CandidateId,
        file_ref: String,
    },
    /// A parsed resume should be scored, either against one job or
    /// against the active job pool when `job_id` is absent.
    CandidateScoreRequested {
        resume_id: ResumeId,
        candidate_id: CandidateId,
        #[serde(skip_serializing_if = "Option::is_none")]
        job_id: Option<JobId>,
    },
    /// An application was submitted and needs AI screening.
    ApplicationScreenRequested {
        application_id: ApplicationId,
        job_id: JobId,
        candidate_id: CandidateId,
        resume_id: ResumeId,
    },
    /// A specific interview answer needs evaluation. The answer travels in
    /// the payload so the consumer evaluates exactly what was submitted.
    InterviewEvaluateRequested {
        interview_id: InterviewId,
        question_id: QuestionId,
        response_id: ResponseId,
        answer_text: String,
    },
    /// A notification should be delivered to a recipient.
    NotificationRequested {
        recipient: String,
        notification_type: String,
        subject: String,
        body: String,
    },
}

impl HiringEvent {
    /// The routing key this event is published under.
    pub fn routing_key(&self) -> &'static str {
        match self {
            Self::ResumeParseRequested { .. } => "resume.parse",
            Self::CandidateScoreRequested { .. } => "candidate.score",
            Self::ApplicationScreenRequested { .. } => "application.screen",
            Self::InterviewEvaluateRequested { .. } => "interview.evaluate",
            Self::NotificationRequested { .. } => "notification.send",
        }
    }

    /// Short name for logging and metrics labels.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ResumeParseRequested { .. } => "resume_parse_requested",
            Self::CandidateScoreRequested { .. } => "candidate_score_requested",
            Self::ApplicationScreenRequested { .. } => "application_screen_requested",
            Self::InterviewEvaluateRequested { .. } => "interview_evaluate_requested",
            Self::NotificationRequested { .. } => "notification_requested",
        }
    }
}

/// Wire envelope around a [`HiringEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,
    pub occurred_at: DateTime<Utc>,
    /// Correlates events spawned by the same external trigger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub event: HiringEvent,
}

impl EventEnvelope {
    pub fn new(event: HiringEvent) -> Self {
        Self {
            event_id: EventId::new(),
            occurred_at: Utc::now(),
            correlation_id: None,
            event,
        }
    }

    pub fn with_correlation(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn routing_key(&self) -> &'static str {
        self.event.routing_key()
    }
}
