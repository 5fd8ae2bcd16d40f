pub mod client;
pub mod error;
pub mod inference;
pub mod query;
pub mod summarize;

pub use client::ApiClient;
pub use error::{ ApiError, FailureKind };

use async_trait::async_trait;
use crate::models::api::{
    FeedbackRequest,
    QueryRequest,
    QueryResult,
    SummarizeRequest,
    SummarizeResult,
};

/// The backend as the session and summarizer see it.
#[async_trait]
pub trait LegalBackend: Send + Sync {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult, ApiError>;

    async fn feedback(&self, request: &FeedbackRequest) -> Result<(), ApiError>;

    async fn summarize(&self, request: &SummarizeRequest) -> Result<SummarizeResult, ApiError>;

    /// Base URL shown in user-facing error messages.
    fn endpoint(&self) -> String;
}

#[async_trait]
impl LegalBackend for ApiClient {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult, ApiError> {
        self.send_query(request).await
    }

    async fn feedback(&self, request: &FeedbackRequest) -> Result<(), ApiError> {
        self.send_feedback(request).await
    }

    async fn summarize(&self, request: &SummarizeRequest) -> Result<SummarizeResult, ApiError> {
        ApiClient::summarize(self, request).await
    }

    fn endpoint(&self) -> String {
        self.base_url().to_string()
    }
}
