//! Job posting entity and lifecycle.

use super::JobId;
use crate::error::{HirestreamError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a job posting: `Draft -> Active -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Draft,
    Active,
    Closed,
}

impl JobStatus {
    pub fn can_transition_to(&self, to: JobStatus) -> bool {
        matches!(
            (self, to),
            (Self::Draft, Self::Active) | (Self::Active, Self::Closed) | (Self::Draft, Self::Closed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

/// Input for creating a job posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDraft {
    pub title: String,
    pub description: String,
    pub must_have: Vec<String>,
    pub nice_to_have: Vec<String>,
    /// Recruiter to notify when applications are screened.
    pub recruiter_email: String,
}

/// A job posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub description: String,
    pub must_have: Vec<String>,
    pub nice_to_have: Vec<String>,
    pub recruiter_email: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(draft: JobDraft) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            title: draft.title,
            description: draft.description,
            must_have: draft.must_have,
            nice_to_have: draft.nice_to_have,
            recruiter_email: draft.recruiter_email,
            status: JobStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, to: JobStatus) -> Result<()> {
        if !self.status.can_transition_to(to) {
            return Err(HirestreamError::invalid_transition("job", self.status, to));
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Text used for embedding generation and AI prompts.
    pub fn full_text(&self) -> String {
        let mut text = format!("{}\n{}", self.title, self.description);
        if !self.must_have.is_empty() {
            text.push_str("\nRequired: ");
            text.push_str(&self.must_have.join(", "));
        }
        if !self.nice_to_have.is_empty() {
            text.push_str("\nPreferred: ");
            text.push_str(&self.nice_to_have.join(", "));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> JobDraft {
        JobDraft {
            title: "Backend Engineer".to_string(),
            description: "Builds services".to_string(),
            must_have: vec!["Rust".to_string()],
            nice_to_have: vec!["Postgres".to_string()],
            recruiter_email: "recruiter@example.com".to_string(),
        }
    }

    #[test]
    fn test_job_lifecycle() {
        let mut job = Job::new(draft());
        assert_eq!(job.status, JobStatus::Draft);
        job.set_status(JobStatus::Active).unwrap();
        job.set_status(JobStatus::Closed).unwrap();
        assert!(job.set_status(JobStatus::Active).is_err());
    }

    #[test]
    fn test_full_text_includes_requirements() {
        let job = Job::new(draft());
        let text = job.full_text();
        assert!(text.contains("Backend Engineer"));
        assert!(text.contains("Required: Rust"));
        assert!(text.contains("Preferred: Postgres"));
    }
}
