//! The hiring pipeline facade.
//!
//! [`HiringPipeline`] wires the broker, store, AI gateway, vector store,
//! and cache together, exposes the synchronous entrypoints (upload, job
//! management, apply, interviews, matching), and spawns the consumer
//! workers that drive the async stages.

use crate::ai::{AiGateway, AiProvider};
use crate::broker::{build_broker, Broker, EventProducer};
use crate::cache::{RegionCache, RECOMMENDED_JOBS_REGION, TOP_CANDIDATES_REGION};
use crate::config::Config;
use crate::consumers::{
    ApplicationScreenConsumer, CandidateScoreConsumer, ConsumerWorker, EventConsumer,
    InterviewEvaluateConsumer, NotificationConsumer, ResumeParseConsumer, WorkerHandle,
};
use crate::domain::{
    Application, ApplicationId, CandidateId, Interview, InterviewId, InterviewQuestion,
    InterviewResponse, InterviewStatus, Job, JobDraft, JobId, JobStatus, ParseStatus, QuestionId,
    ResponseId, Resume, ResumeId,
};
use crate::error::{HirestreamError, Result};
use crate::events::{EventId, HiringEvent};
use crate::extract::TextExtractor;
use crate::store::{HiringStore, InMemoryStore};
use crate::vector::{CandidateMatch, JobMatch, VectorStore};
use chrono::Utc;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct HiringPipeline {
    config: Config,
    broker: Arc<Broker>,
    producer: EventProducer,
    store: Arc<dyn HiringStore>,
    gateway: Arc<AiGateway>,
    vectors: Arc<VectorStore>,
    cache: Arc<RegionCache>,
    extractor: Arc<dyn TextExtractor>,
}

impl HiringPipeline {
    /// Build the pipeline with an in-memory store and declared topology.
    pub async fn new(
        config: Config,
        provider: Arc<dyn AiProvider>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Result<Self> {
        let broker = Arc::new(build_broker(&config.broker).await?);
        let producer = EventProducer::new(broker.clone(), &config.producer);
        Ok(Self {
            producer,
            store: Arc::new(InMemoryStore::new()),
            gateway: Arc::new(AiGateway::new(provider, &config.ai)),
            vectors: Arc::new(VectorStore::new(config.vector.dimension)),
            cache: Arc::new(RegionCache::new(&config.cache)),
            extractor,
            broker,
            config,
        })
    }

    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    pub fn store(&self) -> &Arc<dyn HiringStore> {
        &self.store
    }

    pub fn gateway(&self) -> &Arc<AiGateway> {
        &self.gateway
    }

    pub fn vectors(&self) -> &Arc<VectorStore> {
        &self.vectors
    }

    pub fn cache(&self) -> &Arc<RegionCache> {
        &self.cache
    }

    /// Spawn one worker per queue with the configured concurrency.
    pub fn spawn_consumers(&self) -> Vec<WorkerHandle> {
        let consumers: Vec<(Arc<dyn EventConsumer>, usize)> = vec![
            (
                Arc::new(ResumeParseConsumer::new(
                    self.store.clone(),
                    self.gateway.clone(),
                    self.vectors.clone(),
                    self.cache.clone(),
                    self.extractor.clone(),
                    self.producer.clone(),
                )),
                self.config.consumers.resume_parse,
            ),
            (
                Arc::new(CandidateScoreConsumer::new(
                    self.store.clone(),
                    self.gateway.clone(),
                    self.cache.clone(),
                    &self.config.vector,
                    &self.config.cache,
                )),
                self.config.consumers.candidate_score,
            ),
            (
                Arc::new(ApplicationScreenConsumer::new(
                    self.store.clone(),
                    self.gateway.clone(),
                    self.producer.clone(),
                )),
                self.config.consumers.application_screen,
            ),
            (
                Arc::new(InterviewEvaluateConsumer::new(
                    self.store.clone(),
                    self.gateway.clone(),
                )),
                self.config.consumers.interview_evaluate,
            ),
            (
                Arc::new(NotificationConsumer::new()),
                self.config.consumers.notification,
            ),
        ];

        consumers
            .into_iter()
            .map(|(consumer, concurrency)| {
                ConsumerWorker::new(self.broker.clone(), consumer, concurrency).spawn()
            })
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resumes
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a resume and request parsing.
    ///
    /// The resume row is written first; if the parse request cannot be
    /// published the error surfaces and [`Self::resubmit_parse`] re-requests.
    pub async fn upload_resume(
        &self,
        candidate_id: CandidateId,
        file_ref: impl Into<String>,
        raw_text: Option<String>,
    ) -> Result<ResumeId> {
        let resume = Resume::new(candidate_id, file_ref, raw_text);
        let resume_id = resume.id;
        let file_ref = resume.file_ref.clone();
        self.store.insert_resume(resume).await?;

        self.producer
            .publish(HiringEvent::ResumeParseRequested {
                resume_id,
                candidate_id,
                file_ref,
            })
            .await?;

        info!(resume_id = %resume_id, candidate_id = %candidate_id, "resume uploaded");
        Ok(resume_id)
    }

    /// Re-request parsing for a resume whose parse never ran or failed.
    pub async fn resubmit_parse(&self, resume_id: ResumeId) -> Result<EventId> {
        let resume = self.store.resume(resume_id).await?;
        match resume.parse_status {
            ParseStatus::Pending | ParseStatus::Failed => {}
            ParseStatus::Processing => {
                return Err(HirestreamError::validation("parse already in progress")
                    .with_context("resume_id", resume_id.to_string()));
            }
            ParseStatus::Completed => {
                return Err(HirestreamError::validation("resume already parsed")
                    .with_context("resume_id", resume_id.to_string()));
            }
        }
        self.producer
            .publish(HiringEvent::ResumeParseRequested {
                resume_id,
                candidate_id: resume.candidate_id,
                file_ref: resume.file_ref,
            })
            .await
    }

    pub async fn parse_status(&self, resume_id: ResumeId) -> Result<ParseStatus> {
        Ok(self.store.resume(resume_id).await?.parse_status)
    }

    pub async fn resume(&self, resume_id: ResumeId) -> Result<Resume> {
        self.store.resume(resume_id).await
    }

    /// Explicitly request (re)scoring of a resume, optionally against one job.
    pub async fn request_scoring(
        &self,
        candidate_id: CandidateId,
        resume_id: ResumeId,
        job_id: Option<JobId>,
    ) -> Result<EventId> {
        self.producer
            .publish(HiringEvent::CandidateScoreRequested {
                resume_id,
                candidate_id,
                job_id,
            })
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Jobs
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a job in draft. The embedding is computed up front, best
    /// effort; a degraded embedding is retried when the job goes active.
    pub async fn create_job(&self, draft: JobDraft) -> Result<Job> {
        let job = Job::new(draft);
        self.embed_job(&job).await;
        self.store.insert_job(job.clone()).await?;
        info!(job_id = %job.id, title = %job.title, "job created");
        Ok(job)
    }

    /// Replace a job's fields and refresh its embedding.
    pub async fn update_job(&self, mut job: Job) -> Result<()> {
        job.updated_at = Utc::now();
        self.store.update_job(job.clone()).await?;
        self.embed_job(&job).await;
        self.cache.clear_region(TOP_CANDIDATES_REGION);
        self.cache.clear_region(RECOMMENDED_JOBS_REGION);
        Ok(())
    }

    pub async fn set_job_status(&self, job_id: JobId, status: JobStatus) -> Result<()> {
        let mut job = self.store.job(job_id).await?;
        job.set_status(status)?;
        self.store.update_job(job.clone()).await?;

        // an activating job must be matchable
        if status == JobStatus::Active && !self.vectors.has_job_embedding(job_id) {
            self.embed_job(&job).await;
        }
        self.cache.clear_region(RECOMMENDED_JOBS_REGION);
        Ok(())
    }

    pub async fn job(&self, job_id: JobId) -> Result<Job> {
        self.store.job(job_id).await
    }

    async fn embed_job(&self, job: &Job) {
        let embedding = self.gateway.generate_embedding(&job.full_text()).await;
        if embedding.is_empty() {
            warn!(job_id = %job.id, "job embedding unavailable, matching deferred");
            return;
        }
        if let Err(err) = self.vectors.store_job_embedding(job.id, embedding) {
            err.log();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Applications
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply a candidate's resume to a job and request screening.
    ///
    /// One application per (job, candidate) pair; a second apply surfaces
    /// [`crate::error::ErrorCode::DuplicateRecord`].
    pub async fn apply(
        &self,
        job_id: JobId,
        candidate_id: CandidateId,
        resume_id: ResumeId,
    ) -> Result<ApplicationId> {
        let job = self.store.job(job_id).await?;
        if job.status != JobStatus::Active {
            return Err(
                HirestreamError::validation("job is not accepting applications")
                    .with_context("job_id", job_id.to_string()),
            );
        }
        // the resume must exist, parsed or not
        self.store.resume(resume_id).await?;

        let application = Application::new(job_id, candidate_id, resume_id);
        let application_id = application.id;
        self.store.insert_application(application).await?;

        self.producer
            .publish(HiringEvent::ApplicationScreenRequested {
                application_id,
                job_id,
                candidate_id,
                resume_id,
            })
            .await?;

        info!(application_id = %application_id, job_id = %job_id, "application submitted");
        Ok(application_id)
    }

    pub async fn application(&self, application_id: ApplicationId) -> Result<Application> {
        self.store.application(application_id).await
    }

    /// Recruiter override of an application's status. Unvalidated on
    /// purpose: a recruiter can always pull someone out of the rejected
    /// bucket.
    pub async fn override_application_status(
        &self,
        application_id: ApplicationId,
        status: crate::domain::ApplicationStatus,
    ) -> Result<()> {
        let mut application = self.store.application(application_id).await?;
        application.set_status(status);
        self.store.update_application(application).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Interviews
    // ─────────────────────────────────────────────────────────────────────────

    /// Start an interview for an application.
    ///
    /// Question generation has no fallback; when the AI provider is down
    /// this fails with a retry hint and no interview is created.
    pub async fn start_interview(
        &self,
        application_id: ApplicationId,
        interview_type: impl Into<String>,
    ) -> Result<(Interview, Vec<InterviewQuestion>)> {
        let interview_type = interview_type.into();
        let mut application = self.store.application(application_id).await?;
        let job = self.store.job(application.job_id).await?;

        let generated = self.gateway.generate_questions(&job, &interview_type).await?;

        let interview = Interview::new(application_id, interview_type);
        self.store.insert_interview(interview.clone()).await?;

        let mut questions = Vec::with_capacity(generated.questions.len());
        for (index, generated) in generated.questions.into_iter().enumerate() {
            let question = InterviewQuestion::new(
                interview.id,
                generated.text,
                generated.category,
                generated.difficulty,
                index as u32,
            );
            self.store.insert_question(question.clone()).await?;
            questions.push(question);
        }

        application.set_status(crate::domain::ApplicationStatus::Interview);
        self.store.update_application(application).await?;

        info!(
            interview_id = %interview.id,
            application_id = %application_id,
            questions = questions.len(),
            "interview started"
        );
        Ok((interview, questions))
    }

    /// Record an answer and queue its evaluation.
    pub async fn submit_answer(
        &self,
        interview_id: InterviewId,
        question_id: QuestionId,
        answer_text: impl Into<String>,
    ) -> Result<ResponseId> {
        let interview = self.store.interview(interview_id).await?;
        if interview.status != InterviewStatus::InProgress {
            return Err(HirestreamError::validation("interview is not in progress")
                .with_context("interview_id", interview_id.to_string()));
        }
        let question = self.store.question(question_id).await?;
        if question.interview_id != interview_id {
            return Err(
                HirestreamError::validation("question belongs to a different interview")
                    .with_context("question_id", question_id.to_string()),
            );
        }

        let response = InterviewResponse::new(question_id, answer_text);
        let response_id = response.id;
        let answer_text = response.answer_text.clone();
        self.store.insert_response(response).await?;

        self.producer
            .publish(HiringEvent::InterviewEvaluateRequested {
                interview_id,
                question_id,
                response_id,
                answer_text,
            })
            .await?;

        debug!(response_id = %response_id, interview_id = %interview_id, "answer submitted");
        Ok(response_id)
    }

    /// Close an interview: summarize the transcript and record the overall
    /// score and recommendation. No fallback; the provider must be up.
    pub async fn complete_interview(&self, interview_id: InterviewId) -> Result<Interview> {
        let mut interview = self.store.interview(interview_id).await?;
        if interview.status == InterviewStatus::Completed {
            return Err(HirestreamError::invalid_transition(
                "interview",
                InterviewStatus::Completed,
                InterviewStatus::Completed,
            ));
        }
        let application = self.store.application(interview.application_id).await?;
        let job = self.store.job(application.job_id).await?;

        let transcript = self.transcript(interview_id).await?;
        let summary = self.gateway.summarize_interview(&transcript, &job).await?;

        interview.status = InterviewStatus::Completed;
        interview.overall_score = Some(summary.overall_score);
        interview.recommendation = Some(summary.recommendation);
        interview.completed_at = Some(Utc::now());
        self.store.update_interview(interview.clone()).await?;

        info!(
            interview_id = %interview_id,
            score = summary.overall_score,
            "interview completed"
        );
        Ok(interview)
    }

    async fn transcript(&self, interview_id: InterviewId) -> Result<String> {
        let questions = self.store.questions_for_interview(interview_id).await?;
        let mut transcript = String::new();
        for question in &questions {
            let _ = writeln!(transcript, "Q: {}", question.text);
            let responses = self.store.responses_for_question(question.id).await?;
            match responses.last() {
                Some(response) => {
                    let _ = writeln!(transcript, "A: {}", response.answer_text);
                    if let Some(score) = response.score {
                        let _ = writeln!(transcript, "(scored {:.1}/10)", score);
                    }
                }
                None => {
                    let _ = writeln!(transcript, "A: (not answered)");
                }
            }
        }
        Ok(transcript)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Matching
    // ─────────────────────────────────────────────────────────────────────────

    /// Best-matching candidates for a job, by embedding similarity.
    pub async fn top_candidates(&self, job_id: JobId, limit: usize) -> Result<Vec<CandidateMatch>> {
        let key = format!("job:{}:top:{}", job_id, limit);
        if let Some(matches) = self.cache.get(TOP_CANDIDATES_REGION, &key) {
            return Ok(matches);
        }
        let matches = self.vectors.find_matching_candidates(job_id, limit)?;
        if let Err(err) = self.cache.put(TOP_CANDIDATES_REGION, key, &matches, None) {
            err.log();
        }
        Ok(matches)
    }

    /// Active jobs ranked for a candidate's most recent parsed resume.
    pub async fn recommended_jobs(
        &self,
        candidate_id: CandidateId,
        limit: usize,
    ) -> Result<Vec<JobMatch>> {
        let key = format!("candidate:{}:rec:{}", candidate_id, limit);
        if let Some(matches) = self.cache.get(RECOMMENDED_JOBS_REGION, &key) {
            return Ok(matches);
        }

        let resume_id = self
            .store
            .resumes_for_candidate(candidate_id)
            .await?
            .into_iter()
            .rev()
            .find(|resume| self.vectors.has_resume_embedding(resume.id))
            .map(|resume| resume.id)
            .ok_or_else(|| {
                HirestreamError::ai_unavailable("job_matching", 30).with_internal_message(format!(
                    "candidate {} has no embedded resume yet",
                    candidate_id
                ))
            })?;

        let active: Vec<JobId> = self
            .store
            .jobs_by_status(JobStatus::Active)
            .await?
            .into_iter()
            .map(|job| job.id)
            .collect();

        let matches = self.vectors.find_matching_jobs(resume_id, &active, limit)?;
        if let Err(err) = self.cache.put(RECOMMENDED_JOBS_REGION, key, &matches, None) {
            err.log();
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::StubProvider;
    use crate::error::ErrorCode;
    use crate::extract::InMemoryExtractor;

    fn draft() -> JobDraft {
        JobDraft {
            title: "Backend Engineer".to_string(),
            description: "Event pipeline work".to_string(),
            must_have: vec!["Rust".to_string()],
            nice_to_have: vec!["Kafka".to_string()],
            recruiter_email: "recruiter@example.com".to_string(),
        }
    }

    async fn pipeline(provider: Arc<StubProvider>) -> HiringPipeline {
        HiringPipeline::new(
            Config::default(),
            provider,
            Arc::new(InMemoryExtractor::new()),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_apply_requires_active_job() {
        let pipeline = pipeline(Arc::new(StubProvider::healthy())).await;
        let job = pipeline.create_job(draft()).await.unwrap();
        let candidate_id = CandidateId::new();
        let resume_id = pipeline
            .upload_resume(candidate_id, "resumes/a.pdf", Some("text".into()))
            .await
            .unwrap();

        let err = pipeline
            .apply(job.id, candidate_id, resume_id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_duplicate_application_rejected() {
        let pipeline = pipeline(Arc::new(StubProvider::healthy())).await;
        let job = pipeline.create_job(draft()).await.unwrap();
        pipeline
            .set_job_status(job.id, JobStatus::Active)
            .await
            .unwrap();
        let candidate_id = CandidateId::new();
        let resume_id = pipeline
            .upload_resume(candidate_id, "resumes/a.pdf", Some("text".into()))
            .await
            .unwrap();

        pipeline.apply(job.id, candidate_id, resume_id).await.unwrap();
        let err = pipeline
            .apply(job.id, candidate_id, resume_id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateRecord);
    }

    #[tokio::test]
    async fn test_resubmit_rules() {
        let pipeline = pipeline(Arc::new(StubProvider::healthy())).await;
        let candidate_id = CandidateId::new();
        let resume_id = pipeline
            .upload_resume(candidate_id, "resumes/a.pdf", Some("text".into()))
            .await
            .unwrap();

        // still pending (no consumers running): resubmit allowed
        pipeline.resubmit_parse(resume_id).await.unwrap();

        let mut resume = pipeline.resume(resume_id).await.unwrap();
        resume.set_parse_status(ParseStatus::Processing).unwrap();
        resume.set_parse_status(ParseStatus::Completed).unwrap();
        pipeline.store().update_resume(resume).await.unwrap();

        let err = pipeline.resubmit_parse(resume_id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_start_interview_blocks_when_provider_down() {
        let provider = Arc::new(StubProvider::healthy());
        let pipeline = pipeline(provider.clone()).await;
        let job = pipeline.create_job(draft()).await.unwrap();
        pipeline
            .set_job_status(job.id, JobStatus::Active)
            .await
            .unwrap();
        let candidate_id = CandidateId::new();
        let resume_id = pipeline
            .upload_resume(candidate_id, "resumes/a.pdf", Some("text".into()))
            .await
            .unwrap();
        let application_id = pipeline.apply(job.id, candidate_id, resume_id).await.unwrap();

        provider.set_fail(true);
        let err = pipeline
            .start_interview(application_id, "technical")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AiUnavailable);
        assert!(err.retry_after_secs().is_some());
    }
}
