//! Candidate scoring consumer.
//!
//! Scores a parsed resume against one job, or against the most recent
//! active jobs when no job is named. Scores land in the cache with a long
//! TTL and the best one is stored on the resume.

use super::{ConsumeError, ConsumeResult, EventConsumer};
use crate::ai::{AiGateway, ParsedResume};
use crate::broker::CANDIDATE_SCORE_QUEUE;
use crate::cache::{score_key, RegionCache, SCORES_REGION};
use crate::config::{CacheConfig, VectorConfig};
use crate::domain::{Job, JobStatus, Resume};
use crate::error::{HirestreamError, Result};
use crate::events::{EventEnvelope, HiringEvent};
use crate::store::HiringStore;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct CandidateScoreConsumer {
    store: Arc<dyn HiringStore>,
    gateway: Arc<AiGateway>,
    cache: Arc<RegionCache>,
    score_job_limit: usize,
    score_ttl: Duration,
}

impl CandidateScoreConsumer {
    pub fn new(
        store: Arc<dyn HiringStore>,
        gateway: Arc<AiGateway>,
        cache: Arc<RegionCache>,
        vector_config: &VectorConfig,
        cache_config: &CacheConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            cache,
            score_job_limit: vector_config.score_job_limit,
            score_ttl: Duration::from_secs(cache_config.score_ttl_secs),
        }
    }

    fn parsed_resume(resume: &Resume) -> Result<ParsedResume> {
        let data = resume
            .parsed_data
            .clone()
            .ok_or_else(|| HirestreamError::internal("parsed resume missing parsed data"))?;
        Ok(serde_json::from_value(data)?)
    }

    async fn score_against(&self, resume: &Resume, parsed: &ParsedResume, job: &Job) -> f32 {
        let result = self.gateway.score_candidate(parsed, job).await;
        if let Err(err) = self.cache.put(
            SCORES_REGION,
            score_key(resume.candidate_id, job.id),
            &result,
            Some(self.score_ttl),
        ) {
            err.log();
        }
        result.score
    }
}

#[async_trait]
impl EventConsumer for CandidateScoreConsumer {
    fn queue(&self) -> &'static str {
        CANDIDATE_SCORE_QUEUE
    }

    async fn consume(&self, envelope: &EventEnvelope) -> ConsumeResult {
        let (resume_id, job_id) = match &envelope.event {
            HiringEvent::CandidateScoreRequested {
                resume_id, job_id, ..
            } => (*resume_id, *job_id),
            other => {
                return Err(ConsumeError::new(format!(
                    "unexpected event on candidate score queue: {}",
                    other.event_type()
                )))
            }
        };

        let mut resume = self.store.resume(resume_id).await?;

        // Scoring can race parsing. Acking the unparsed case keeps the queue
        // clean; the parse completion re-requests scoring.
        if !resume.is_parsed() {
            warn!(resume_id = %resume_id, "resume not parsed yet, skipping scoring");
            return Ok(());
        }
        let parsed = Self::parsed_resume(&resume)?;

        let best = match job_id {
            Some(job_id) => {
                let job = self.store.job(job_id).await?;
                self.score_against(&resume, &parsed, &job).await
            }
            None => {
                let jobs = self.store.jobs_by_status(JobStatus::Active).await?;
                let scores = join_all(
                    jobs.iter()
                        .take(self.score_job_limit)
                        .map(|job| self.score_against(&resume, &parsed, job)),
                )
                .await;
                // An empty active pool still stores a neutral zero score.
                scores.into_iter().fold(0.0, f32::max)
            }
        };

        resume.ai_score = Some(best);
        self.store.update_resume(resume).await?;
        info!(resume_id = %resume_id, score = best, "candidate scored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::StubProvider;
    use crate::ai::AiProvider;
    use crate::config::AiConfig;
    use crate::domain::{CandidateId, JobDraft, ParseStatus};
    use crate::store::InMemoryStore;

    fn job_draft(title: &str) -> JobDraft {
        JobDraft {
            title: title.to_string(),
            description: "Build pipeline services".to_string(),
            must_have: vec!["Rust".to_string()],
            nice_to_have: vec![],
            recruiter_email: "recruiter@example.com".to_string(),
        }
    }

    async fn parsed_resume(store: &InMemoryStore) -> Resume {
        let mut resume = Resume::new(CandidateId::new(), "resumes/a.pdf", Some("text".into()));
        resume.set_parse_status(ParseStatus::Processing).unwrap();
        resume.parsed_data = Some(
            serde_json::to_value(
                StubProvider::healthy()
                    .parse_resume("text")
                    .await
                    .unwrap(),
            )
            .unwrap(),
        );
        resume.set_parse_status(ParseStatus::Completed).unwrap();
        store.insert_resume(resume.clone()).await.unwrap();
        resume
    }

    fn consumer(
        store: Arc<InMemoryStore>,
        provider: Arc<StubProvider>,
    ) -> (CandidateScoreConsumer, Arc<RegionCache>) {
        let cache = Arc::new(RegionCache::new(&CacheConfig::default()));
        let consumer = CandidateScoreConsumer::new(
            store,
            Arc::new(AiGateway::new(provider, &AiConfig::default())),
            cache.clone(),
            &VectorConfig::default(),
            &CacheConfig::default(),
        );
        (consumer, cache)
    }

    #[tokio::test]
    async fn test_unparsed_resume_is_acked_without_scoring() {
        let store = Arc::new(InMemoryStore::new());
        let resume = Resume::new(CandidateId::new(), "resumes/a.pdf", Some("text".into()));
        let resume_id = resume.id;
        store.insert_resume(resume).await.unwrap();
        let provider = Arc::new(StubProvider::healthy());
        let (consumer, _cache) = consumer(store.clone(), provider.clone());

        let envelope = EventEnvelope::new(HiringEvent::CandidateScoreRequested {
            resume_id,
            candidate_id: CandidateId::new(),
            job_id: None,
        });
        consumer.consume(&envelope).await.unwrap();

        assert_eq!(provider.calls(), 0);
        assert!(store.resume(resume_id).await.unwrap().ai_score.is_none());
    }

    #[tokio::test]
    async fn test_targeted_scoring_caches_and_stores() {
        let store = Arc::new(InMemoryStore::new());
        let resume = parsed_resume(&store).await;
        let mut job = Job::new(job_draft("Backend Engineer"));
        job.set_status(JobStatus::Active).unwrap();
        let job_id = job.id;
        store.insert_job(job).await.unwrap();
        let (consumer, cache) = consumer(store.clone(), Arc::new(StubProvider::with_score(82.0)));

        let envelope = EventEnvelope::new(HiringEvent::CandidateScoreRequested {
            resume_id: resume.id,
            candidate_id: resume.candidate_id,
            job_id: Some(job_id),
        });
        consumer.consume(&envelope).await.unwrap();

        assert_eq!(store.resume(resume.id).await.unwrap().ai_score, Some(82.0));
        let cached: crate::ai::CandidateScore = cache
            .get(SCORES_REGION, &score_key(resume.candidate_id, job_id))
            .unwrap();
        assert_eq!(cached.score, 82.0);
    }

    #[tokio::test]
    async fn test_no_job_scoring_stores_best_across_active_jobs() {
        let store = Arc::new(InMemoryStore::new());
        let resume = parsed_resume(&store).await;
        for title in ["A", "B", "C"] {
            let mut job = Job::new(job_draft(title));
            job.set_status(JobStatus::Active).unwrap();
            store.insert_job(job).await.unwrap();
        }
        // drafts are not scored
        store.insert_job(Job::new(job_draft("Draft"))).await.unwrap();
        let provider = Arc::new(StubProvider::with_score(64.0));
        let (consumer, _cache) = consumer(store.clone(), provider.clone());

        let envelope = EventEnvelope::new(HiringEvent::CandidateScoreRequested {
            resume_id: resume.id,
            candidate_id: resume.candidate_id,
            job_id: None,
        });
        consumer.consume(&envelope).await.unwrap();

        assert_eq!(provider.calls(), 3);
        assert_eq!(store.resume(resume.id).await.unwrap().ai_score, Some(64.0));
    }

    #[tokio::test]
    async fn test_empty_active_pool_stores_zero_score() {
        let store = Arc::new(InMemoryStore::new());
        let resume = parsed_resume(&store).await;
        // only a draft, which the pool scoring ignores
        store.insert_job(Job::new(job_draft("Draft"))).await.unwrap();
        let provider = Arc::new(StubProvider::healthy());
        let (consumer, _cache) = consumer(store.clone(), provider.clone());

        let envelope = EventEnvelope::new(HiringEvent::CandidateScoreRequested {
            resume_id: resume.id,
            candidate_id: resume.candidate_id,
            job_id: None,
        });
        consumer.consume(&envelope).await.unwrap();

        assert_eq!(provider.calls(), 0);
        assert_eq!(store.resume(resume.id).await.unwrap().ai_score, Some(0.0));
    }
}
