//! Cosine-similarity matching store for resume and job embeddings.
//!
//! Embeddings have a fixed dimension set at construction; storing a vector
//! of any other length is a configuration error. Matching returns results
//! ranked by similarity with a percentage rounded to one decimal, the way
//! recruiters see it.

use crate::domain::{JobId, ResumeId};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{HirestreamError, Result};

/// A candidate resume ranked against a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMatch {
    pub resume_id: ResumeId,
    /// Similarity as a percentage, one decimal (e.g. 87.3).
    pub similarity_pct: f32,
}

/// A job ranked against a resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMatch {
    pub job_id: JobId,
    pub similarity_pct: f32,
}

/// In-memory embedding store with cosine-similarity search.
pub struct VectorStore {
    dimension: usize,
    resumes: DashMap<ResumeId, Vec<f32>>,
    jobs: DashMap<JobId, Vec<f32>>,
}

impl VectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            resumes: DashMap::new(),
            jobs: DashMap::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(HirestreamError::configuration(format!(
                "embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                embedding.len()
            )));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    pub fn store_resume_embedding(&self, resume_id: ResumeId, embedding: Vec<f32>) -> Result<()> {
        self.check_dimension(&embedding)?;
        self.resumes.insert(resume_id, embedding);
        Ok(())
    }

    pub fn store_job_embedding(&self, job_id: JobId, embedding: Vec<f32>) -> Result<()> {
        self.check_dimension(&embedding)?;
        self.jobs.insert(job_id, embedding);
        Ok(())
    }

    pub fn has_resume_embedding(&self, resume_id: ResumeId) -> bool {
        self.resumes.contains_key(&resume_id)
    }

    pub fn has_job_embedding(&self, job_id: JobId) -> bool {
        self.jobs.contains_key(&job_id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Matching
    // ─────────────────────────────────────────────────────────────────────────

    /// Rank stored resumes against a job's embedding, best first.
    ///
    /// Resumes without an embedding are skipped. A job without an embedding
    /// cannot be matched yet; callers should retry after the embedding
    /// refresh lands.
    pub fn find_matching_candidates(
        &self,
        job_id: JobId,
        top_k: usize,
    ) -> Result<Vec<CandidateMatch>> {
        let job_embedding = self
            .jobs
            .get(&job_id)
            .ok_or_else(|| {
                HirestreamError::ai_unavailable("job_matching", 30).with_internal_message(format!(
                    "job {} has no embedding yet",
                    job_id
                ))
            })?
            .clone();

        let mut matches: Vec<CandidateMatch> = self
            .resumes
            .iter()
            .map(|entry| CandidateMatch {
                resume_id: *entry.key(),
                similarity_pct: similarity_pct(&job_embedding, entry.value()),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.similarity_pct
                .partial_cmp(&a.similarity_pct)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    /// Rank the given jobs against a resume's embedding, best first.
    ///
    /// `eligible_jobs` is the caller's filter, normally the active job ids;
    /// jobs in the list without an embedding are skipped.
    pub fn find_matching_jobs(
        &self,
        resume_id: ResumeId,
        eligible_jobs: &[JobId],
        top_k: usize,
    ) -> Result<Vec<JobMatch>> {
        let resume_embedding = self
            .resumes
            .get(&resume_id)
            .ok_or_else(|| {
                HirestreamError::ai_unavailable("job_matching", 30).with_internal_message(format!(
                    "resume {} has no embedding yet",
                    resume_id
                ))
            })?
            .clone();

        let mut matches: Vec<JobMatch> = eligible_jobs
            .iter()
            .filter_map(|job_id| {
                self.jobs.get(job_id).map(|embedding| JobMatch {
                    job_id: *job_id,
                    similarity_pct: similarity_pct(&resume_embedding, embedding.value()),
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.similarity_pct
                .partial_cmp(&a.similarity_pct)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);
        Ok(matches)
    }
}

/// Cosine similarity of two equal-length vectors, in [-1, 1].
/// Zero vectors have similarity 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Similarity as a percentage rounded to one decimal place.
fn similarity_pct(a: &[f32], b: &[f32]) -> f32 {
    let pct = cosine_similarity(a, b).max(0.0) * 100.0;
    (pct * 10.0).round() / 10.0
}
