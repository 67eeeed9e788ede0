//! Persistence seam for pipeline entities.
//!
//! [`HiringStore`] is the trait consumers and the pipeline facade talk to;
//! [`InMemoryStore`] is the bundled implementation. Updates are last-write
//! wins whole-entity replacements, matching how the consumers use them
//! (each entity is owned by one consumer at a time).

use crate::domain::{
    Application, ApplicationId, CandidateId, Interview, InterviewId, InterviewQuestion,
    InterviewResponse, Job, JobId, JobStatus, QuestionId, ResponseId, Resume, ResumeId,
};
use crate::error::{HirestreamError, Result};
use async_trait::async_trait;
use dashmap::DashMap;

/// Storage operations the pipeline needs.
#[async_trait]
pub trait HiringStore: Send + Sync {
    // ─── Resumes ─────────────────────────────────────────────────────────────
    async fn insert_resume(&self, resume: Resume) -> Result<()>;
    async fn resume(&self, id: ResumeId) -> Result<Resume>;
    async fn update_resume(&self, resume: Resume) -> Result<()>;
    async fn resumes_for_candidate(&self, candidate_id: CandidateId) -> Result<Vec<Resume>>;

    // ─── Jobs ────────────────────────────────────────────────────────────────
    async fn insert_job(&self, job: Job) -> Result<()>;
    async fn job(&self, id: JobId) -> Result<Job>;
    async fn update_job(&self, job: Job) -> Result<()>;
    async fn jobs_by_status(&self, status: JobStatus) -> Result<Vec<Job>>;

    // ─── Applications ────────────────────────────────────────────────────────
    /// Insert an application, enforcing one application per
    /// `(job, candidate)` pair.
    async fn insert_application(&self, application: Application) -> Result<()>;
    async fn application(&self, id: ApplicationId) -> Result<Application>;
    async fn update_application(&self, application: Application) -> Result<()>;

    // ─── Interviews ──────────────────────────────────────────────────────────
    async fn insert_interview(&self, interview: Interview) -> Result<()>;
    async fn interview(&self, id: InterviewId) -> Result<Interview>;
    async fn update_interview(&self, interview: Interview) -> Result<()>;

    async fn insert_question(&self, question: InterviewQuestion) -> Result<()>;
    async fn question(&self, id: QuestionId) -> Result<InterviewQuestion>;
    /// Questions for one interview, in presentation order.
    async fn questions_for_interview(
        &self,
        interview_id: InterviewId,
    ) -> Result<Vec<InterviewQuestion>>;

    async fn insert_response(&self, response: InterviewResponse) -> Result<()>;
    async fn response(&self, id: ResponseId) -> Result<InterviewResponse>;
    async fn update_response(&self, response: InterviewResponse) -> Result<()>;
    async fn responses_for_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Vec<InterviewResponse>>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// In-Memory Store
// ═══════════════════════════════════════════════════════════════════════════════

/// Concurrent in-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    resumes: DashMap<ResumeId, Resume>,
    jobs: DashMap<JobId, Job>,
    applications: DashMap<ApplicationId, Application>,
    /// Uniqueness index for `(job, candidate)` pairs.
    application_pairs: DashMap<(JobId, CandidateId), ApplicationId>,
    interviews: DashMap<InterviewId, Interview>,
    questions: DashMap<QuestionId, InterviewQuestion>,
    responses: DashMap<ResponseId, InterviewResponse>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HiringStore for InMemoryStore {
    // ─── Resumes ─────────────────────────────────────────────────────────────

    async fn insert_resume(&self, resume: Resume) -> Result<()> {
        self.resumes.insert(resume.id, resume);
        Ok(())
    }

    async fn resume(&self, id: ResumeId) -> Result<Resume> {
        self.resumes
            .get(&id)
            .map(|r| r.clone())
            .ok_or_else(|| HirestreamError::not_found("resume", id.to_string()))
    }

    async fn update_resume(&self, resume: Resume) -> Result<()> {
        if !self.resumes.contains_key(&resume.id) {
            return Err(HirestreamError::not_found("resume", resume.id.to_string()));
        }
        self.resumes.insert(resume.id, resume);
        Ok(())
    }

    async fn resumes_for_candidate(&self, candidate_id: CandidateId) -> Result<Vec<Resume>> {
        let mut resumes: Vec<Resume> = self
            .resumes
            .iter()
            .filter(|entry| entry.value().candidate_id == candidate_id)
            .map(|entry| entry.value().clone())
            .collect();
        resumes.sort_by_key(|r| r.created_at);
        Ok(resumes)
    }

    // ─── Jobs ────────────────────────────────────────────────────────────────

    async fn insert_job(&self, job: Job) -> Result<()> {
        self.jobs.insert(job.id, job);
        Ok(())
    }

    async fn job(&self, id: JobId) -> Result<Job> {
        self.jobs
            .get(&id)
            .map(|j| j.clone())
            .ok_or_else(|| HirestreamError::not_found("job", id.to_string()))
    }

    async fn update_job(&self, job: Job) -> Result<()> {
        if !self.jobs.contains_key(&job.id) {
            return Err(HirestreamError::not_found("job", job.id.to_string()));
        }
        self.jobs.insert(job.id, job);
        Ok(())
    }

    async fn jobs_by_status(&self, status: JobStatus) -> Result<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .jobs
            .iter()
            .filter(|entry| entry.value().status == status)
            .map(|entry| entry.value().clone())
            .collect();
        jobs.sort_by_key(|j| j.created_at);
        Ok(jobs)
    }

    // ─── Applications ────────────────────────────────────────────────────────

    async fn insert_application(&self, application: Application) -> Result<()> {
        let pair = (application.job_id, application.candidate_id);
        // entry API keeps the check-and-insert atomic under concurrency
        match self.application_pairs.entry(pair) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(HirestreamError::duplicate(
                    "application",
                    format!(
                        "candidate {} already applied to job {}",
                        application.candidate_id, application.job_id
                    ),
                ));
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(application.id);
            }
        }
        self.applications.insert(application.id, application);
        Ok(())
    }

    async fn application(&self, id: ApplicationId) -> Result<Application> {
        self.applications
            .get(&id)
            .map(|a| a.clone())
            .ok_or_else(|| HirestreamError::not_found("application", id.to_string()))
    }

    async fn update_application(&self, application: Application) -> Result<()> {
        if !self.applications.contains_key(&application.id) {
            return Err(HirestreamError::not_found(
                "application",
                application.id.to_string(),
            ));
        }
        self.applications.insert(application.id, application);
        Ok(())
    }

    // ─── Interviews ──────────────────────────────────────────────────────────

    async fn insert_interview(&self, interview: Interview) -> Result<()> {
        self.interviews.insert(interview.id, interview);
        Ok(())
    }

    async fn interview(&self, id: InterviewId) -> Result<Interview> {
        self.interviews
            .get(&id)
            .map(|i| i.clone())
            .ok_or_else(|| HirestreamError::not_found("interview", id.to_string()))
    }

    async fn update_interview(&self, interview: Interview) -> Result<()> {
        if !self.interviews.contains_key(&interview.id) {
            return Err(HirestreamError::not_found(
                "interview",
                interview.id.to_string(),
            ));
        }
        self.interviews.insert(interview.id, interview);
        Ok(())
    }

    async fn insert_question(&self, question: InterviewQuestion) -> Result<()> {
        self.questions.insert(question.id, question);
        Ok(())
    }

    async fn question(&self, id: QuestionId) -> Result<InterviewQuestion> {
        self.questions
            .get(&id)
            .map(|q| q.clone())
            .ok_or_else(|| HirestreamError::not_found("question", id.to_string()))
    }

    async fn questions_for_interview(
        &self,
        interview_id: InterviewId,
    ) -> Result<Vec<InterviewQuestion>> {
        let mut questions: Vec<InterviewQuestion> = self
            .questions
            .iter()
            .filter(|entry| entry.value().interview_id == interview_id)
            .map(|entry| entry.value().clone())
            .collect();
        questions.sort_by_key(|q| q.order_index);
        Ok(questions)
    }

    async fn insert_response(&self, response: InterviewResponse) -> Result<()> {
        self.responses.insert(response.id, response);
        Ok(())
    }

    async fn response(&self, id: ResponseId) -> Result<InterviewResponse> {
        self.responses
            .get(&id)
            .map(|r| r.clone())
            .ok_or_else(|| HirestreamError::not_found("response", id.to_string()))
    }

    async fn update_response(&self, response: InterviewResponse) -> Result<()> {
        if !self.responses.contains_key(&response.id) {
            return Err(HirestreamError::not_found(
                "response",
                response.id.to_string(),
            ));
        }
        self.responses.insert(response.id, response);
        Ok(())
    }

    async fn responses_for_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Vec<InterviewResponse>> {
        let mut responses: Vec<InterviewResponse> = self
            .responses
            .iter()
            .filter(|entry| entry.value().question_id == question_id)
            .map(|entry| entry.value().clone())
            .collect();
        responses.sort_by_key(|r| r.submitted_at);
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobDraft;
    use crate::error::ErrorCode;

    fn job() -> Job {
        Job::new(JobDraft {
            title: "Engineer".to_string(),
            description: "Builds".to_string(),
            must_have: Vec::new(),
            nice_to_have: Vec::new(),
            recruiter_email: "r@example.com".to_string(),
        })
    }

    #[tokio::test]
    async fn test_resume_crud() {
        let store = InMemoryStore::new();
        let mut resume = Resume::new(CandidateId::new(), "resumes/a.pdf", None);
        let id = resume.id;

        store.insert_resume(resume.clone()).await.unwrap();
        assert_eq!(store.resume(id).await.unwrap().file_ref, "resumes/a.pdf");

        resume.skills = vec!["Rust".to_string()];
        store.update_resume(resume).await.unwrap();
        assert_eq!(store.resume(id).await.unwrap().skills, vec!["Rust"]);

        let err = store.resume(ResumeId::new()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::RecordNotFound);
    }

    #[tokio::test]
    async fn test_application_uniqueness() {
        let store = InMemoryStore::new();
        let job_id = JobId::new();
        let candidate_id = CandidateId::new();
        let resume_id = ResumeId::new();

        store
            .insert_application(Application::new(job_id, candidate_id, resume_id))
            .await
            .unwrap();

        // same pair again, even with a different resume
        let err = store
            .insert_application(Application::new(job_id, candidate_id, ResumeId::new()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateRecord);

        // other candidate or other job is fine
        store
            .insert_application(Application::new(job_id, CandidateId::new(), resume_id))
            .await
            .unwrap();
        store
            .insert_application(Application::new(JobId::new(), candidate_id, resume_id))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_jobs_by_status() {
        let store = InMemoryStore::new();
        let mut active = job();
        active.set_status(JobStatus::Active).unwrap();
        let draft = job();

        store.insert_job(active.clone()).await.unwrap();
        store.insert_job(draft).await.unwrap();

        let jobs = store.jobs_by_status(JobStatus::Active).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, active.id);
    }

    #[tokio::test]
    async fn test_questions_ordered_by_index() {
        let store = InMemoryStore::new();
        let interview_id = InterviewId::new();
        for (index, text) in [(2_u32, "third"), (0, "first"), (1, "second")] {
            store
                .insert_question(InterviewQuestion::new(
                    interview_id,
                    text,
                    "technical",
                    3,
                    index,
                ))
                .await
                .unwrap();
        }

        let questions = store.questions_for_interview(interview_id).await.unwrap();
        let texts: Vec<&str> = questions.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_update_missing_entity_fails() {
        let store = InMemoryStore::new();
        let err = store.update_job(job()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::RecordNotFound);
    }
}
