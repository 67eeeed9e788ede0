//! Domain model for the hiring pipeline.
//!
//! Entities carry their own state machines: parse status on resumes,
//! lifecycle status on jobs and applications. Transition rules live next
//! to the types they govern.

mod application;
mod interview;
mod job;
mod resume;

pub use application::{Application, ApplicationStatus};
pub use interview::{Interview, InterviewQuestion, InterviewResponse, InterviewStatus};
pub use job::{Job, JobDraft, JobStatus};
pub use resume::{ParseStatus, Resume};

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Declares a Uuid-backed identifier newtype.
macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a candidate.
    CandidateId
);
entity_id!(
    /// Unique identifier for a resume.
    ResumeId
);
entity_id!(
    /// Unique identifier for a job posting.
    JobId
);
entity_id!(
    /// Unique identifier for an application.
    ApplicationId
);
entity_id!(
    /// Unique identifier for an interview session.
    InterviewId
);
entity_id!(
    /// Unique identifier for an interview question.
    QuestionId
);
entity_id!(
    /// Unique identifier for a candidate's answer to a question.
    ResponseId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(ResumeId::new(), ResumeId::new());
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn test_id_display_roundtrip() {
        let id = CandidateId::new();
        let parsed: Uuid = id.to_string().parse().unwrap();
        assert_eq!(CandidateId::from(parsed), id);
    }
}
