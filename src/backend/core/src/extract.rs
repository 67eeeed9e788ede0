//! Text extraction seam.
//!
//! Resumes are uploaded as opaque file references; when no plain text is
//! supplied with the upload, the parse consumer asks a [`TextExtractor`]
//! for it. Production deployments plug in a real document extractor here.

use crate::error::{HirestreamError, Result};
use async_trait::async_trait;
use dashmap::DashMap;

#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the plain text of the document behind `file_ref`.
    async fn extract(&self, file_ref: &str) -> Result<String>;
}

/// Extractor backed by an in-memory blob registry.
///
/// Uploads register their content under the file reference; extraction is
/// a lookup. Unknown references are an error, which sends the parse event
/// to the dead-letter queue rather than parsing nothing.
#[derive(Default)]
pub struct InMemoryExtractor {
    blobs: DashMap<String, String>,
}

impl InMemoryExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the content behind a file reference.
    pub fn put(&self, file_ref: impl Into<String>, content: impl Into<String>) {
        self.blobs.insert(file_ref.into(), content.into());
    }
}

#[async_trait]
impl TextExtractor for InMemoryExtractor {
    async fn extract(&self, file_ref: &str) -> Result<String> {
        self.blobs
            .get(file_ref)
            .map(|content| content.clone())
            .ok_or_else(|| HirestreamError::not_found("resume file", file_ref))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_extract_registered_content() {
        let extractor = InMemoryExtractor::new();
        extractor.put("resumes/a.pdf", "Jane Doe, Rust engineer");

        let text = extractor.extract("resumes/a.pdf").await.unwrap();
        assert_eq!(text, "Jane Doe, Rust engineer");
    }

    #[tokio::test]
    async fn test_unknown_file_ref_errors() {
        let extractor = InMemoryExtractor::new();
        let err = extractor.extract("resumes/missing.pdf").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::RecordNotFound);
    }
}
