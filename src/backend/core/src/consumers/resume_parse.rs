//! Resume parse consumer.
//!
//! Extracts text for the resume, runs AI parsing and embedding, then chains
//! a no-job scoring request so the candidate gets a baseline score. Parsing
//! degrades to a placeholder when the AI provider is down; the resume still
//! completes and a resubmit re-runs the whole thing.

use super::{ConsumeError, ConsumeResult, EventConsumer};
use crate::ai::AiGateway;
use crate::broker::{EventProducer, RESUME_PARSE_QUEUE};
use crate::cache::{RegionCache, RECOMMENDED_JOBS_REGION, TOP_CANDIDATES_REGION};
use crate::domain::{CandidateId, ParseStatus, ResumeId};
use crate::error::Result;
use crate::events::{EventEnvelope, HiringEvent};
use crate::extract::TextExtractor;
use crate::store::HiringStore;
use crate::vector::VectorStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ResumeParseConsumer {
    store: Arc<dyn HiringStore>,
    gateway: Arc<AiGateway>,
    vectors: Arc<VectorStore>,
    cache: Arc<RegionCache>,
    extractor: Arc<dyn TextExtractor>,
    producer: EventProducer,
}

impl ResumeParseConsumer {
    pub fn new(
        store: Arc<dyn HiringStore>,
        gateway: Arc<AiGateway>,
        vectors: Arc<VectorStore>,
        cache: Arc<RegionCache>,
        extractor: Arc<dyn TextExtractor>,
        producer: EventProducer,
    ) -> Self {
        Self {
            store,
            gateway,
            vectors,
            cache,
            extractor,
            producer,
        }
    }

    async fn parse(&self, resume_id: ResumeId, candidate_id: CandidateId) -> Result<()> {
        let mut resume = self.store.resume(resume_id).await?;

        resume.set_parse_status(ParseStatus::Processing)?;
        self.store.update_resume(resume.clone()).await?;

        let raw_text = match resume.raw_text.clone() {
            Some(text) => text,
            None => {
                let text = self.extractor.extract(&resume.file_ref).await?;
                resume.raw_text = Some(text.clone());
                text
            }
        };

        let parsed = self.gateway.parse_resume(&raw_text).await;
        resume.skills = parsed.skills.clone();
        resume.experience_summary = Some(parsed.summary.clone());
        resume.parsed_data = Some(serde_json::to_value(&parsed)?);

        // A degraded embedding is empty; leave the vector entry absent
        // rather than poison similarity search with a zero vector.
        let embedding = self.gateway.generate_embedding(&raw_text).await;
        if embedding.is_empty() {
            warn!(resume_id = %resume_id, "embedding unavailable, matching deferred");
        } else {
            self.vectors.store_resume_embedding(resume_id, embedding)?;
        }

        resume.set_parse_status(ParseStatus::Completed)?;
        self.store.update_resume(resume).await?;

        // match results may now be stale
        self.cache.clear_region(TOP_CANDIDATES_REGION);
        self.cache.clear_region(RECOMMENDED_JOBS_REGION);

        self.producer
            .publish(HiringEvent::CandidateScoreRequested {
                resume_id,
                candidate_id,
                job_id: None,
            })
            .await?;

        info!(resume_id = %resume_id, candidate_id = %candidate_id, "resume parsed");
        Ok(())
    }

    async fn mark_failed(&self, resume_id: ResumeId) {
        let result: Result<()> = async {
            let mut resume = self.store.resume(resume_id).await?;
            resume.set_parse_status(ParseStatus::Failed)?;
            self.store.update_resume(resume).await
        }
        .await;
        if let Err(err) = result {
            debug!(resume_id = %resume_id, error = %err, "could not mark resume failed");
        }
    }
}

#[async_trait]
impl EventConsumer for ResumeParseConsumer {
    fn queue(&self) -> &'static str {
        RESUME_PARSE_QUEUE
    }

    async fn consume(&self, envelope: &EventEnvelope) -> ConsumeResult {
        let (resume_id, candidate_id) = match &envelope.event {
            HiringEvent::ResumeParseRequested {
                resume_id,
                candidate_id,
                ..
            } => (*resume_id, *candidate_id),
            other => {
                return Err(ConsumeError::new(format!(
                    "unexpected event on resume parse queue: {}",
                    other.event_type()
                )))
            }
        };

        if let Err(err) = self.parse(resume_id, candidate_id).await {
            self.mark_failed(resume_id).await;
            return Err(err.into());
        }
        Ok(())
    }
}
