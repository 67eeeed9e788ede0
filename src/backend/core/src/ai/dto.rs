//! Data transfer objects exchanged with the AI provider.
//!
//! Degradable operations have an `unavailable()` constructor: the neutral
//! value the gateway substitutes when the provider cannot be reached.

use serde::{Deserialize, Serialize};

/// Structured resume data extracted by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedResume {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub summary: String,
}

impl ParsedResume {
    /// Degraded parse: placeholder data marking the resume for re-parse.
    pub fn unavailable() -> Self {
        Self {
            name: "Unknown".to_string(),
            email: None,
            phone: None,
            skills: Vec::new(),
            experience: Vec::new(),
            education: Vec::new(),
            summary: "AI temporarily unavailable, queued for retry".to_string(),
        }
    }

    /// Whether this is the degraded placeholder rather than a real parse.
    pub fn is_degraded(&self) -> bool {
        self.name == "Unknown" && self.skills.is_empty() && self.summary.contains("unavailable")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub company: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years: Option<f32>,
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    pub institution: String,
    pub degree: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Fit score of a candidate against a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    /// 0-100.
    pub score: f32,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub reasoning: String,
}

impl CandidateScore {
    /// Degraded score: zero with explicit unavailable reasoning, so
    /// downstream readers can tell it apart from a genuine zero.
    pub fn unavailable() -> Self {
        Self {
            score: 0.0,
            strengths: Vec::new(),
            gaps: Vec::new(),
            reasoning: "Scoring deferred, AI service unavailable".to_string(),
        }
    }
}

/// Screening verdict for an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub qualified: bool,
    pub red_flags: Vec<String>,
    pub missing_requirements: Vec<String>,
}

impl ScreeningResult {
    pub fn unavailable() -> Self {
        Self {
            qualified: false,
            red_flags: Vec::new(),
            missing_requirements: vec!["Screening deferred, AI service unavailable".to_string()],
        }
    }
}

/// Evaluation of one interview answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEvaluation {
    /// 0-10.
    pub score: f32,
    pub feedback: String,
}

impl AnswerEvaluation {
    pub fn unavailable() -> Self {
        Self {
            score: 0.0,
            feedback: "AI temporarily unavailable, evaluation pending".to_string(),
        }
    }
}

/// A batch of generated interview questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestions {
    pub questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub text: String,
    pub category: String,
    /// 1 (easy) to 5 (hard).
    pub difficulty: u8,
}

/// Overall interview summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewSummary {
    /// 0-10.
    pub overall_score: f32,
    pub recommendation: String,
    pub key_strengths: Vec<String>,
    pub areas_of_concern: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_parse_is_recognizable() {
        assert!(ParsedResume::unavailable().is_degraded());

        let real = ParsedResume {
            name: "Ada".to_string(),
            email: None,
            phone: None,
            skills: vec!["Rust".to_string()],
            experience: Vec::new(),
            education: Vec::new(),
            summary: "Engineer".to_string(),
        };
        assert!(!real.is_degraded());
    }

    #[test]
    fn test_degraded_score_is_explicit() {
        let score = CandidateScore::unavailable();
        assert_eq!(score.score, 0.0);
        assert!(score.reasoning.contains("unavailable"));
    }
}
