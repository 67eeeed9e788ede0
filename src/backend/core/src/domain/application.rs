//! Application entity and the deterministic screening buckets.

use super::{ApplicationId, CandidateId, JobId, ResumeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an application.
///
/// The screening consumer assigns `Shortlisted` / `Screening` / `Rejected`
/// from the AI match score. Later stages are set manually by recruiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Screening,
    Shortlisted,
    Interview,
    Rejected,
    Offered,
}

impl ApplicationStatus {
    /// Deterministic bucket for an AI screening score (0-100).
    ///
    /// `>= 70` shortlists, `>= 40` keeps the application in screening for
    /// human review, anything lower rejects.
    pub fn from_screen_score(score: f32) -> Self {
        if score >= 70.0 {
            Self::Shortlisted
        } else if score >= 40.0 {
            Self::Screening
        } else {
            Self::Rejected
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Applied => "applied",
            Self::Screening => "screening",
            Self::Shortlisted => "shortlisted",
            Self::Interview => "interview",
            Self::Rejected => "rejected",
            Self::Offered => "offered",
        };
        write!(f, "{}", s)
    }
}

/// A candidate's application to a job.
///
/// At most one application may exist per `(job, candidate)` pair; the
/// store enforces this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub candidate_id: CandidateId,
    pub resume_id: ResumeId,
    pub status: ApplicationStatus,
    /// Screening match score (0-100), set by the screening consumer.
    pub ai_match_score: Option<f32>,
    /// Human-readable screening summary.
    pub screening_notes: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn new(job_id: JobId, candidate_id: CandidateId, resume_id: ResumeId) -> Self {
        let now = Utc::now();
        Self {
            id: ApplicationId::new(),
            job_id,
            candidate_id,
            resume_id,
            status: ApplicationStatus::Applied,
            ai_match_score: None,
            screening_notes: None,
            applied_at: now,
            updated_at: now,
        }
    }

    /// Manual status change (recruiter action). Not validated against the
    /// screening buckets: recruiters may override the automatic decision.
    pub fn set_status(&mut self, to: ApplicationStatus) {
        self.status = to;
        self.updated_at = Utc::now();
    }
}
