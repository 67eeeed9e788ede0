//! Interview session, generated questions, and candidate responses.

use super::{ApplicationId, InterviewId, QuestionId, ResponseId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    InProgress,
    Completed,
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        };
        write!(f, "{}", s)
    }
}

/// An AI-conducted interview session for an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interview {
    pub id: InterviewId,
    pub application_id: ApplicationId,
    /// Kind of interview ("technical", "behavioral", ...). Free-form,
    /// passed through to question generation.
    pub interview_type: String,
    pub status: InterviewStatus,
    /// Average answer score (0-10), set on completion.
    pub overall_score: Option<f32>,
    /// AI-generated hiring recommendation, set on completion.
    pub recommendation: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Interview {
    pub fn new(application_id: ApplicationId, interview_type: impl Into<String>) -> Self {
        Self {
            id: InterviewId::new(),
            application_id,
            interview_type: interview_type.into(),
            status: InterviewStatus::InProgress,
            overall_score: None,
            recommendation: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// A question generated for an interview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub id: QuestionId,
    pub interview_id: InterviewId,
    pub text: String,
    pub category: String,
    /// 1 (easy) to 5 (hard).
    pub difficulty: u8,
    /// Position within the interview, starting at 0.
    pub order_index: u32,
}

impl InterviewQuestion {
    pub fn new(
        interview_id: InterviewId,
        text: impl Into<String>,
        category: impl Into<String>,
        difficulty: u8,
        order_index: u32,
    ) -> Self {
        Self {
            id: QuestionId::new(),
            interview_id,
            text: text.into(),
            category: category.into(),
            difficulty,
            order_index,
        }
    }
}

/// A candidate's answer to an interview question.
///
/// `score` and `feedback` stay empty until the evaluation consumer has
/// processed the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewResponse {
    pub id: ResponseId,
    pub question_id: QuestionId,
    pub answer_text: String,
    /// Answer score (0-10), set asynchronously.
    pub score: Option<f32>,
    pub feedback: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub evaluated_at: Option<DateTime<Utc>>,
}

impl InterviewResponse {
    pub fn new(question_id: QuestionId, answer_text: impl Into<String>) -> Self {
        Self {
            id: ResponseId::new(),
            question_id,
            answer_text: answer_text.into(),
            score: None,
            feedback: None,
            submitted_at: Utc::now(),
            evaluated_at: None,
        }
    }

    pub fn is_evaluated(&self) -> bool {
        self.score.is_some()
    }

    pub fn record_evaluation(&mut self, score: f32, feedback: impl Into<String>) {
        self.score = Some(score);
        self.feedback = Some(feedback.into());
        self.evaluated_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_evaluation() {
        let mut response = InterviewResponse::new(QuestionId::new(), "I would use a hash map");
        assert!(!response.is_evaluated());

        response.record_evaluation(7.5, "Good instinct, missing complexity analysis");
        assert!(response.is_evaluated());
        assert_eq!(response.score, Some(7.5));
        assert!(response.evaluated_at.is_some());
    }
}
