#![allow(dead_code)]

use async_trait::async_trait;
use std::future::Future;
use std::sync::{ Arc, Mutex };
use std::time::Duration;
use tokio::sync::Notify;

use casecut_client::api::{ ApiError, LegalBackend };
use casecut_client::models::api::{
    FeedbackRequest,
    QueryRequest,
    QueryResult,
    SummarizeRequest,
    SummarizeResult,
};

pub const BACKEND_URL: &str = "http://localhost:8000";

/// Backend double that answers every call with a canned result and records
/// what it was asked.
pub struct FakeBackend {
    pub query_result: Result<QueryResult, ApiError>,
    pub summarize_result: Result<SummarizeResult, ApiError>,
    pub queries: Mutex<Vec<QueryRequest>>,
    pub feedback: Mutex<Vec<FeedbackRequest>>,
    pub summaries: Mutex<Vec<SummarizeRequest>>,
    /// When set, `query` waits for a notification before answering.
    pub gate: Option<Arc<Notify>>,
}

impl FakeBackend {
    pub fn answering(result: QueryResult) -> Self {
        Self::with(Ok(result))
    }

    pub fn failing(err: ApiError) -> Self {
        Self::with(Err(err))
    }

    fn with(query_result: Result<QueryResult, ApiError>) -> Self {
        Self {
            query_result,
            summarize_result: Ok(SummarizeResult {
                summary: "The appeal was dismissed.".into(),
                model_id: "casecut-legal".into(),
                mode: "summary".into(),
                provider: "local".into(),
            }),
            queries: Mutex::new(Vec::new()),
            feedback: Mutex::new(Vec::new()),
            summaries: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn summarizing(mut self, result: Result<SummarizeResult, ApiError>) -> Self {
        self.summarize_result = result;
        self
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl LegalBackend for FakeBackend {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult, ApiError> {
        self.queries.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.query_result.clone()
    }

    async fn feedback(&self, request: &FeedbackRequest) -> Result<(), ApiError> {
        self.feedback.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn summarize(&self, request: &SummarizeRequest) -> Result<SummarizeResult, ApiError> {
        self.summaries.lock().unwrap().push(request.clone());
        self.summarize_result.clone()
    }

    fn endpoint(&self) -> String {
        BACKEND_URL.to_string()
    }
}

pub fn network_error() -> ApiError {
    ApiError::Network {
        base_url: BACKEND_URL.to_string(),
        reason: "error sending request: connection refused".to_string(),
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool where F: FnMut() -> Fut, Fut: Future<Output = bool> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
