use super::client::{ decode_data, ApiClient };
use super::error::ApiError;
use crate::models::api::{ SummarizeInput, SummarizeRequest, SummarizeResult };

const SUMMARIZE_ENDPOINT: &str = "/summarize";

impl ApiClient {
    pub async fn summarize(&self, request: &SummarizeRequest) -> Result<SummarizeResult, ApiError> {
        let data = self.post(SUMMARIZE_ENDPOINT, request).await?;
        decode_data(SUMMARIZE_ENDPOINT, data)
    }

    pub async fn summarize_text(
        &self,
        text: &str,
        model_id: &str,
        mode: &str
    ) -> Result<SummarizeResult, ApiError> {
        self.summarize(&SummarizeRequest {
            input: SummarizeInput::Text { text: text.to_string() },
            model_id: model_id.to_string(),
            mode: mode.to_string(),
        }).await
    }

    /// Summarize a document the backend downloads from `file_url`.
    pub async fn summarize_file(
        &self,
        file_url: &str,
        model_id: &str,
        mode: &str
    ) -> Result<SummarizeResult, ApiError> {
        self.summarize(&SummarizeRequest {
            input: SummarizeInput::File { file_url: file_url.to_string() },
            model_id: model_id.to_string(),
            mode: mode.to_string(),
        }).await
    }
}
