//! Resume entity and its parse state machine.

use super::{CandidateId, ResumeId};
use crate::error::{HirestreamError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of the asynchronous resume parse.
///
/// `Pending -> Processing -> Completed | Failed`. A failed parse may be
/// resubmitted, which moves it back through `Processing`. `Completed` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ParseStatus {
    /// Whether a transition from `self` to `to` is legal.
    pub fn can_transition_to(&self, to: ParseStatus) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
                // resubmission of a failed parse
                | (Self::Failed, Self::Processing)
        )
    }

    /// Whether this status is terminal for automatic processing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for ParseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// An uploaded resume and everything the pipeline has derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resume {
    pub id: ResumeId,
    pub candidate_id: CandidateId,
    /// Opaque reference to the uploaded file (object key, path, ...).
    pub file_ref: String,
    /// Extracted plain text, if extraction has run (or was supplied upfront).
    pub raw_text: Option<String>,
    pub parse_status: ParseStatus,
    /// Structured data produced by the AI parse, stored as JSON.
    pub parsed_data: Option<serde_json::Value>,
    pub skills: Vec<String>,
    pub experience_summary: Option<String>,
    /// Best match score seen so far (0-100).
    pub ai_score: Option<f32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resume {
    pub fn new(candidate_id: CandidateId, file_ref: impl Into<String>, raw_text: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ResumeId::new(),
            candidate_id,
            file_ref: file_ref.into(),
            raw_text,
            parse_status: ParseStatus::Pending,
            parsed_data: None,
            skills: Vec::new(),
            experience_summary: None,
            ai_score: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the parse state machine, rejecting illegal transitions.
    pub fn set_parse_status(&mut self, to: ParseStatus) -> Result<()> {
        if !self.parse_status.can_transition_to(to) {
            return Err(HirestreamError::invalid_transition(
                "resume parse",
                self.parse_status,
                to,
            ));
        }
        self.parse_status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Whether AI-derived data is available for downstream consumers.
    pub fn is_parsed(&self) -> bool {
        self.parsed_data.is_some()
    }
}
