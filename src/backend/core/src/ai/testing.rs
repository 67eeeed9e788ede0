//! Deterministic [`AiProvider`] for tests and local demos.

use super::{
    AiProvider, AnswerEvaluation, CandidateScore, EducationEntry, ExperienceEntry,
    GeneratedQuestion, GeneratedQuestions, InterviewSummary, ParsedResume, ScreeningResult,
};
use crate::domain::{InterviewQuestion, Job};
use crate::error::{HirestreamError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

/// Scripted provider. Returns fixed, deterministic values, with switches to
/// simulate outages and steer the match score mid-test.
pub struct StubProvider {
    fail: Mutex<bool>,
    score: Mutex<f32>,
    embedding: Mutex<Vec<f32>>,
    calls: AtomicU32,
}

impl StubProvider {
    /// A provider that always answers, scoring every candidate 75/100.
    pub fn healthy() -> Self {
        Self::with_score(75.0)
    }

    pub fn with_score(score: f32) -> Self {
        Self {
            fail: Mutex::new(false),
            score: Mutex::new(score),
            embedding: Mutex::new(vec![1.0, 0.0, 0.0, 0.0]),
            calls: AtomicU32::new(0),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    pub fn set_score(&self, score: f32) {
        *self.score.lock() = score;
    }

    pub fn set_embedding(&self, embedding: Vec<f32>) {
        *self.embedding.lock() = embedding;
    }

    /// Total provider invocations across all operations.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn guard(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail.lock() {
            Err(HirestreamError::internal("stub provider outage"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AiProvider for StubProvider {
    async fn parse_resume(&self, raw_text: &str) -> Result<ParsedResume> {
        self.guard()?;
        Ok(ParsedResume {
            name: "Alex Doe".to_string(),
            email: Some("alex@example.com".to_string()),
            phone: None,
            skills: vec!["Rust".to_string(), "Distributed Systems".to_string()],
            experience: vec![ExperienceEntry {
                company: "Example Corp".to_string(),
                title: "Software Engineer".to_string(),
                years: Some(4.0),
                highlights: vec!["Built the billing pipeline".to_string()],
            }],
            education: vec![EducationEntry {
                institution: "State University".to_string(),
                degree: "BSc".to_string(),
                field: Some("Computer Science".to_string()),
            }],
            summary: format!("Engineer with {} chars of resume text", raw_text.len()),
        })
    }

    async fn generate_embedding(&self, _text: &str) -> Result<Vec<f32>> {
        self.guard()?;
        Ok(self.embedding.lock().clone())
    }

    async fn score_candidate(&self, _resume: &ParsedResume, job: &Job) -> Result<CandidateScore> {
        self.guard()?;
        Ok(CandidateScore {
            score: *self.score.lock(),
            strengths: vec!["Relevant systems background".to_string()],
            gaps: vec![],
            reasoning: format!("Skills align with {}", job.title),
        })
    }

    async fn screen_candidate(&self, _resume: &ParsedResume, _job: &Job) -> Result<ScreeningResult> {
        self.guard()?;
        let score = *self.score.lock();
        Ok(ScreeningResult {
            qualified: score >= 70.0,
            red_flags: vec![],
            missing_requirements: vec![],
        })
    }

    async fn evaluate_answer(
        &self,
        _question: &InterviewQuestion,
        _answer: &str,
        _job: &Job,
    ) -> Result<AnswerEvaluation> {
        self.guard()?;
        Ok(AnswerEvaluation {
            score: (*self.score.lock() / 10.0).clamp(0.0, 10.0),
            feedback: "Clear and well structured answer".to_string(),
        })
    }

    async fn generate_questions(
        &self,
        job: &Job,
        interview_type: &str,
    ) -> Result<GeneratedQuestions> {
        self.guard()?;
        Ok(GeneratedQuestions {
            questions: vec![
                GeneratedQuestion {
                    text: format!("Describe a system you built relevant to {}", job.title),
                    category: interview_type.to_string(),
                    difficulty: 2,
                },
                GeneratedQuestion {
                    text: "How do you handle backpressure in async pipelines?".to_string(),
                    category: interview_type.to_string(),
                    difficulty: 3,
                },
                GeneratedQuestion {
                    text: "Tell me about a disagreement with a teammate.".to_string(),
                    category: "behavioral".to_string(),
                    difficulty: 1,
                },
            ],
        })
    }

    async fn summarize_interview(&self, _transcript: &str, job: &Job) -> Result<InterviewSummary> {
        self.guard()?;
        let score = (*self.score.lock() / 10.0).clamp(0.0, 10.0);
        Ok(InterviewSummary {
            overall_score: score,
            recommendation: if score >= 7.0 {
                "Hire".to_string()
            } else {
                "No hire".to_string()
            },
            key_strengths: vec![format!("Good fit for {}", job.title)],
            areas_of_concern: vec![],
        })
    }
}
