//! AI provider seam and the resilience gateway in front of it.
//!
//! All AI calls go through [`AiGateway`], which wraps the provider with
//! retries and a circuit breaker. Operations fall in two groups:
//!
//! - **Degrading** (parse, embed, score, screen, evaluate): on provider
//!   failure the gateway returns a neutral fallback value so the pipeline
//!   keeps moving. Degraded values are explicit, never silent zeros.
//! - **Blocking** (question generation, interview summary): these gate a
//!   user-facing flow that is meaningless without real output, so failures
//!   propagate as [`ErrorCode::AiUnavailable`] with a retry hint.

mod circuit_breaker;
mod dto;
pub mod testing;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerMetrics, CircuitState};
pub use dto::{
    AnswerEvaluation, CandidateScore, EducationEntry, ExperienceEntry, GeneratedQuestion,
    GeneratedQuestions, InterviewSummary, ParsedResume, ScreeningResult,
};

use crate::config::AiConfig;
use crate::domain::{InterviewQuestion, Job};
use crate::error::{HirestreamError, Result};
use crate::retry::{BackoffStrategy, RetryPolicy};
use async_trait::async_trait;
use metrics::counter;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

// ═══════════════════════════════════════════════════════════════════════════════
// Provider Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// The raw AI provider. Implementations talk to an actual model; tests use
/// scripted fakes.
#[async_trait]
pub trait AiProvider: Send + Sync {
    async fn parse_resume(&self, raw_text: &str) -> Result<ParsedResume>;

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>>;

    async fn score_candidate(&self, resume: &ParsedResume, job: &Job) -> Result<CandidateScore>;

    async fn screen_candidate(&self, resume: &ParsedResume, job: &Job) -> Result<ScreeningResult>;

    async fn evaluate_answer(
        &self,
        question: &InterviewQuestion,
        answer: &str,
        job: &Job,
    ) -> Result<AnswerEvaluation>;

    async fn generate_questions(
        &self,
        job: &Job,
        interview_type: &str,
    ) -> Result<GeneratedQuestions>;

    async fn summarize_interview(&self, transcript: &str, job: &Job) -> Result<InterviewSummary>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Gateway
// ═══════════════════════════════════════════════════════════════════════════════

/// Resilience wrapper around the AI provider.
pub struct AiGateway {
    provider: Arc<dyn AiProvider>,
    breaker: CircuitBreaker,
    policy: RetryPolicy,
    retry_hint_secs: u64,
    max_embedding_chars: usize,
}

impl AiGateway {
    pub fn new(provider: Arc<dyn AiProvider>, config: &AiConfig) -> Self {
        Self {
            provider,
            breaker: CircuitBreaker::new(config.breaker_threshold)
                .with_recovery_timeout(Duration::from_secs(config.breaker_recovery_secs)),
            policy: RetryPolicy {
                max_attempts: config.max_attempts,
                backoff: BackoffStrategy::Exponential {
                    initial_delay_ms: config.initial_delay_ms,
                    max_delay_ms: config.initial_delay_ms * 8,
                    multiplier: 2.0,
                },
            },
            retry_hint_secs: config.retry_hint_secs,
            max_embedding_chars: config.max_embedding_chars,
        }
    }

    /// Current breaker state, for health reporting.
    pub fn breaker_metrics(&self) -> CircuitBreakerMetrics {
        self.breaker.metrics()
    }

    /// Run a provider call through the breaker and retry policy.
    async fn execute<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            if !self.breaker.can_execute() {
                counter!("hirestream_ai_short_circuited_total", "operation" => operation)
                    .increment(1);
                return Err(HirestreamError::ai_unavailable(
                    operation,
                    self.retry_hint_secs,
                ));
            }

            attempt += 1;
            match call().await {
                Ok(value) => {
                    self.breaker.record_success();
                    counter!("hirestream_ai_calls_total", "operation" => operation, "outcome" => "ok")
                        .increment(1);
                    return Ok(value);
                }
                Err(err) if self.policy.should_retry(attempt) => {
                    self.breaker.record_failure();
                    let delay = self.policy.next_retry_delay(attempt - 1);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "AI call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    self.breaker.record_failure();
                    counter!("hirestream_ai_calls_total", "operation" => operation, "outcome" => "error")
                        .increment(1);
                    return Err(HirestreamError::ai_unavailable(
                        operation,
                        self.retry_hint_secs,
                    )
                    .with_source(err));
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Degrading operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Parse a resume. Degrades to a placeholder parse.
    pub async fn parse_resume(&self, raw_text: &str) -> ParsedResume {
        match self
            .execute("parse_resume", || self.provider.parse_resume(raw_text))
            .await
        {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, "resume parse degraded to placeholder");
                ParsedResume::unavailable()
            }
        }
    }

    /// Embed a text, truncated to the configured character limit.
    /// Degrades to an empty vector, which marks the embedding as pending.
    pub async fn generate_embedding(&self, text: &str) -> Vec<f32> {
        let truncated: String = text.chars().take(self.max_embedding_chars).collect();
        match self
            .execute("generate_embedding", || {
                self.provider.generate_embedding(&truncated)
            })
            .await
        {
            Ok(embedding) => embedding,
            Err(err) => {
                warn!(error = %err, "embedding degraded to empty vector");
                Vec::new()
            }
        }
    }

    /// Score a candidate against a job. Degrades to a zero score with
    /// explicit unavailable reasoning.
    pub async fn score_candidate(&self, resume: &ParsedResume, job: &Job) -> CandidateScore {
        match self
            .execute("score_candidate", || {
                self.provider.score_candidate(resume, job)
            })
            .await
        {
            Ok(score) => score,
            Err(err) => {
                warn!(error = %err, job_id = %job.id, "scoring degraded to fallback");
                CandidateScore::unavailable()
            }
        }
    }

    /// Screen an application. Degrades to not-qualified with an explicit
    /// deferral marker.
    pub async fn screen_candidate(&self, resume: &ParsedResume, job: &Job) -> ScreeningResult {
        match self
            .execute("screen_candidate", || {
                self.provider.screen_candidate(resume, job)
            })
            .await
        {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, job_id = %job.id, "screening degraded to fallback");
                ScreeningResult::unavailable()
            }
        }
    }

    /// Evaluate an interview answer. Degrades to a zero score with pending
    /// feedback.
    pub async fn evaluate_answer(
        &self,
        question: &InterviewQuestion,
        answer: &str,
        job: &Job,
    ) -> AnswerEvaluation {
        match self
            .execute("evaluate_answer", || {
                self.provider.evaluate_answer(question, answer, job)
            })
            .await
        {
            Ok(evaluation) => evaluation,
            Err(err) => {
                warn!(error = %err, question_id = %question.id, "answer evaluation degraded");
                AnswerEvaluation::unavailable()
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Blocking operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Generate interview questions. No fallback: an interview cannot start
    /// without real questions.
    pub async fn generate_questions(
        &self,
        job: &Job,
        interview_type: &str,
    ) -> Result<GeneratedQuestions> {
        self.execute("generate_questions", || {
            self.provider.generate_questions(job, interview_type)
        })
        .await
    }

    /// Summarize a completed interview. No fallback.
    pub async fn summarize_interview(
        &self,
        transcript: &str,
        job: &Job,
    ) -> Result<InterviewSummary> {
        self.execute("summarize_interview", || {
            self.provider.summarize_interview(transcript, job)
        })
        .await
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobDraft;
    use crate::error::ErrorCode;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Provider whose failure behavior can be flipped per test.
    struct ScriptedProvider {
        fail: Mutex<bool>,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(fail: bool) -> Self {
            Self {
                fail: Mutex::new(fail),
                calls: AtomicU32::new(0),
            }
        }

        fn check(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if *self.fail.lock() {
                Err(HirestreamError::internal("provider offline"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl AiProvider for ScriptedProvider {
        async fn parse_resume(&self, _raw_text: &str) -> Result<ParsedResume> {
            self.check()?;
            Ok(ParsedResume {
                name: "Ada Lovelace".to_string(),
                email: Some("ada@example.com".to_string()),
                phone: None,
                skills: vec!["Rust".to_string()],
                experience: Vec::new(),
                education: Vec::new(),
                summary: "Engineer".to_string(),
            })
        }

        async fn generate_embedding(&self, _text: &str) -> Result<Vec<f32>> {
            self.check()?;
            Ok(vec![1.0, 0.0, 0.0])
        }

        async fn score_candidate(
            &self,
            _resume: &ParsedResume,
            _job: &Job,
        ) -> Result<CandidateScore> {
            self.check()?;
            Ok(CandidateScore {
                score: 82.0,
                strengths: vec!["Rust".to_string()],
                gaps: Vec::new(),
                reasoning: "Strong fit".to_string(),
            })
        }

        async fn screen_candidate(
            &self,
            _resume: &ParsedResume,
            _job: &Job,
        ) -> Result<ScreeningResult> {
            self.check()?;
            Ok(ScreeningResult {
                qualified: true,
                red_flags: Vec::new(),
                missing_requirements: Vec::new(),
            })
        }

        async fn evaluate_answer(
            &self,
            _question: &InterviewQuestion,
            _answer: &str,
            _job: &Job,
        ) -> Result<AnswerEvaluation> {
            self.check()?;
            Ok(AnswerEvaluation {
                score: 8.0,
                feedback: "Solid".to_string(),
            })
        }

        async fn generate_questions(
            &self,
            _job: &Job,
            _interview_type: &str,
        ) -> Result<GeneratedQuestions> {
            self.check()?;
            Ok(GeneratedQuestions {
                questions: vec![GeneratedQuestion {
                    text: "Explain ownership".to_string(),
                    category: "technical".to_string(),
                    difficulty: 3,
                }],
            })
        }

        async fn summarize_interview(
            &self,
            _transcript: &str,
            _job: &Job,
        ) -> Result<InterviewSummary> {
            self.check()?;
            Ok(InterviewSummary {
                overall_score: 8.0,
                recommendation: "Hire".to_string(),
                key_strengths: Vec::new(),
                areas_of_concern: Vec::new(),
            })
        }
    }

    fn fast_config() -> AiConfig {
        AiConfig {
            max_attempts: 2,
            initial_delay_ms: 1,
            breaker_threshold: 3,
            breaker_recovery_secs: 60,
            retry_hint_secs: 30,
            max_embedding_chars: 8_000,
        }
    }

    fn job() -> Job {
        Job::new(JobDraft {
            title: "Engineer".to_string(),
            description: "Builds things".to_string(),
            must_have: Vec::new(),
            nice_to_have: Vec::new(),
            recruiter_email: "r@example.com".to_string(),
        })
    }

    #[tokio::test]
    async fn test_degrading_operations_fall_back() {
        let provider = Arc::new(ScriptedProvider::new(true));
        let gateway = AiGateway::new(provider, &fast_config());

        let parsed = gateway.parse_resume("text").await;
        assert!(parsed.is_degraded());

        let embedding = gateway.generate_embedding("text").await;
        assert!(embedding.is_empty());
    }

    #[tokio::test]
    async fn test_degraded_score_is_explicit_zero() {
        let provider = Arc::new(ScriptedProvider::new(true));
        let gateway = AiGateway::new(provider, &fast_config());

        let score = gateway
            .score_candidate(&ParsedResume::unavailable(), &job())
            .await;
        assert_eq!(score.score, 0.0);
        assert!(score.reasoning.contains("unavailable"));
    }

    #[tokio::test]
    async fn test_blocking_operations_propagate_with_retry_hint() {
        let provider = Arc::new(ScriptedProvider::new(true));
        let gateway = AiGateway::new(provider, &fast_config());

        let err = gateway.generate_questions(&job(), "technical").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AiUnavailable);
        assert_eq!(err.retry_after_secs(), Some(30));

        let err = gateway.summarize_interview("transcript", &job()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AiUnavailable);
    }

    #[tokio::test]
    async fn test_open_breaker_short_circuits_without_calling_provider() {
        let provider = Arc::new(ScriptedProvider::new(true));
        let gateway = AiGateway::new(provider.clone(), &fast_config());

        // threshold is 3: two failed parse attempts plus one more trip it
        let _ = gateway.parse_resume("a").await;
        let _ = gateway.parse_resume("b").await;
        assert_eq!(gateway.breaker_metrics().state, CircuitState::Open);

        let calls_before = provider.calls.load(Ordering::SeqCst);
        let parsed = gateway.parse_resume("c").await;
        assert!(parsed.is_degraded());
        // short-circuited: provider was never invoked
        assert_eq!(provider.calls.load(Ordering::SeqCst), calls_before);
    }

    #[tokio::test]
    async fn test_healthy_provider_passes_through() {
        let provider = Arc::new(ScriptedProvider::new(false));
        let gateway = AiGateway::new(provider, &fast_config());

        let parsed = gateway.parse_resume("text").await;
        assert_eq!(parsed.name, "Ada Lovelace");

        let questions = gateway.generate_questions(&job(), "technical").await.unwrap();
        assert_eq!(questions.questions.len(), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failure() {
        let provider = Arc::new(ScriptedProvider::new(true));
        let gateway = AiGateway::new(provider.clone(), &fast_config());

        // flip provider healthy after the first attempt has been scheduled;
        // retry happens after a 1ms delay, so flip immediately
        *provider.fail.lock() = false;
        let score = gateway
            .score_candidate(&ParsedResume::unavailable(), &job())
            .await;
        assert_eq!(score.score, 82.0);
    }
}
