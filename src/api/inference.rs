//! Direct summarization against the hosted inference API, bypassing the
//! backend. Only text input is supported; PDFs always go through `/summarize`.

use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;
use thiserror::Error;
use log::{ debug, error };

use crate::config::ClientConfig;

/// The hosted models reject longer inputs.
pub const MAX_INPUT_CHARS: usize = 4096;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("HF_API_TOKEN is not set. Add it to your .env file.")]
    MissingToken,
    #[error("Inference request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{0}")]
    Api(String),
    #[error("Inference response had no summary_text")]
    EmptyResponse,
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceParameters {
    max_length: u32,
    min_length: u32,
}

#[derive(Deserialize)]
struct InferenceOutput {
    summary_text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InferenceClient {
    http: HttpClient,
    base_url: String,
    token: Option<String>,
}

impl InferenceClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: config.inference_url.clone(),
            token: config.inference_token.clone(),
        }
    }

    pub async fn summarize(&self, hf_model: &str, text: &str) -> Result<String, InferenceError> {
        let token = self.token.as_deref().ok_or(InferenceError::MissingToken)?;
        let input: String = text.chars().take(MAX_INPUT_CHARS).collect();
        let url = format!("{}/{}", self.base_url, hf_model);
        debug!("-> POST {} ({} chars)", url, input.chars().count());

        let response = self.http
            .post(&url)
            .bearer_auth(token)
            .json(
                &(InferenceRequest {
                    inputs: &input,
                    parameters: InferenceParameters { max_length: 512, min_length: 50 },
                })
            )
            .send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.json::<JsonValue>().await.unwrap_or(JsonValue::Null);
            let message = body
                .get("error")
                .and_then(|e| e.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| "HuggingFace summarization failed".to_string());
            error!("Inference call to {} returned {}: {}", hf_model, status, message);
            return Err(InferenceError::Api(message));
        }

        let body: JsonValue = response.json().await?;
        extract_summary(body)
    }
}

/// The API answers with either a list of outputs or a single object.
fn extract_summary(body: JsonValue) -> Result<String, InferenceError> {
    let first = match body {
        JsonValue::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        JsonValue::Array(_) => {
            return Err(InferenceError::EmptyResponse);
        }
        other => other,
    };
    serde_json::from_value::<InferenceOutput>(first)
        .ok()
        .and_then(|o| o.summary_text)
        .ok_or(InferenceError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summary_is_read_from_list_or_object() {
        assert_eq!(extract_summary(json!([{"summary_text": "short"}])).unwrap(), "short");
        assert_eq!(extract_summary(json!({"summary_text": "single"})).unwrap(), "single");
        assert!(matches!(extract_summary(json!([])), Err(InferenceError::EmptyResponse)));
        assert!(matches!(extract_summary(json!({"generated_text": "x"})), Err(InferenceError::EmptyResponse)));
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_request() {
        let client = InferenceClient::new(&ClientConfig::default());
        let err = client.summarize("facebook/bart-large-cnn", "text").await.unwrap_err();
        assert!(matches!(err, InferenceError::MissingToken));
    }
}
