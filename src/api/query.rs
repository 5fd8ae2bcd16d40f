use log::error;
use super::client::{ decode_data, ApiClient };
use super::error::ApiError;
use crate::models::api::{ FeedbackRequest, QueryRequest, QueryResult };

const QUERY_ENDPOINT: &str = "/query";
const FEEDBACK_ENDPOINT: &str = "/feedback";

impl ApiClient {
    /// Run a research query through the backend's retrieval pipeline.
    pub async fn send_query(&self, request: &QueryRequest) -> Result<QueryResult, ApiError> {
        let data = self.post(QUERY_ENDPOINT, request).await?;
        decode_data(QUERY_ENDPOINT, data)
    }

    /// Record a thumbs up/down for an answer. The acknowledgement body is discarded.
    pub async fn send_feedback(&self, request: &FeedbackRequest) -> Result<(), ApiError> {
        self.post(FEEDBACK_ENDPOINT, request).await.map(|_| ()).map_err(|e| {
            error!("Feedback error: {}", e);
            e
        })
    }
}
