#![allow(clippy::result_large_err)]
//! # Hirestream Core
//!
//! Event-driven hiring pipeline engine.
//!
//! ## Architecture
//!
//! - **Broker**: In-process topic broker with manual acks and dead-letter queues
//! - **Pipeline**: The orchestration facade (upload, apply, interviews, matching)
//! - **Consumers**: One worker per queue driving the async pipeline stages
//! - **AI Gateway**: Retries and circuit breaking in front of the AI provider
//! - **Vector**: Embedding store with cosine-similarity matching
//! - **Cache**: Region cache for scores and match results

pub mod ai;
pub mod broker;
pub mod cache;
pub mod config;
pub mod consumers;
pub mod domain;
pub mod error;
pub mod events;
pub mod extract;
pub mod pipeline;
pub mod retry;
pub mod store;
pub mod telemetry;
pub mod vector;

pub use error::{ErrorCode, ErrorContext, ErrorDetails, ErrorSeverity, HirestreamError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{AiGateway, AiProvider, CandidateScore, ParsedResume, ScreeningResult};
    pub use crate::broker::{Broker, EventProducer, HIRING_DLX, HIRING_EXCHANGE};
    pub use crate::config::Config;
    pub use crate::consumers::{ConsumerWorker, EventConsumer, WorkerHandle};
    pub use crate::domain::{
        Application, ApplicationId, ApplicationStatus, CandidateId, Interview, InterviewId,
        InterviewQuestion, InterviewResponse, InterviewStatus, Job, JobDraft, JobId, JobStatus,
        ParseStatus, QuestionId, ResponseId, Resume, ResumeId,
    };
    pub use crate::error::{
        ErrorCode, ErrorContext, ErrorDetails, ErrorSeverity, HirestreamError, Result,
    };
    pub use crate::events::{EventEnvelope, EventId, HiringEvent};
    pub use crate::pipeline::HiringPipeline;
    pub use crate::store::{HiringStore, InMemoryStore};
    pub use crate::vector::{CandidateMatch, JobMatch, VectorStore};
}
