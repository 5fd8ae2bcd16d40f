use reqwest::{ Client as HttpClient, Method, StatusCode };
use serde::{ Deserialize, Serialize };
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use log::{ debug, error, info };

use super::error::ApiError;
use crate::config::ClientConfig;
use crate::models::api::HealthStatus;

#[derive(Deserialize, Debug, Default)]
struct Envelope {
    success: Option<bool>,
    #[serde(default)]
    data: Option<JsonValue>,
    #[serde(default)]
    error: Option<JsonValue>,
    #[serde(default)]
    detail: Option<JsonValue>,
}

#[derive(Deserialize, Debug, Default)]
struct ErrorDetail {
    message: Option<String>,
    hint: Option<String>,
}

impl Envelope {
    fn error_detail(&self) -> ErrorDetail {
        self.error
            .as_ref()
            .and_then(|e| serde_json::from_value::<ErrorDetail>(e.clone()).ok())
            .unwrap_or_default()
    }

    fn detail_message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Thin HTTP client for the CaseCut backend. Every call goes through
/// [`ApiClient::request`], which unwraps the `{success, data, error}` envelope.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    health_timeout: Duration,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: config.api_url.clone(),
            health_timeout: config.health_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, endpoint: &str) -> Result<JsonValue, ApiError> {
        self.request(Method::GET, endpoint, None).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B
    ) -> Result<JsonValue, ApiError> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Decode {
            endpoint: endpoint.to_string(),
            status: 0,
            reason: format!("could not encode request body: {}", e),
        })?;
        self.request(Method::POST, endpoint, Some(body)).await
    }

    /// Issue a request and return the envelope's `data` (JSON null when absent).
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<JsonValue>
    ) -> Result<JsonValue, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("-> {} {} {}", method, endpoint, body.as_ref().map(|b| b.to_string()).unwrap_or_default());

        let mut req = self.http.request(method.clone(), &url);
        if let Some(body) = &body {
            req = req.json(body);
        }

        let response = match req.send().await {
            Ok(r) => r,
            Err(e) => {
                error!("{} {} failed before a response arrived: {}", method, endpoint, e);
                return Err(self.network_error(&e));
            }
        };

        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                error!("{} {} body could not be read: {}", method, endpoint, e);
                return Err(self.network_error(&e));
            }
        };
        let payload = serde_json::from_slice::<JsonValue>(&bytes).ok();
        debug!("<- {} {} {}", status.as_u16(), endpoint, payload.as_ref().map(|p| p.to_string()).unwrap_or_default());

        decode_envelope(endpoint, status, payload)
    }

    /// Liveness probe. Never fails; any problem reads as disconnected.
    pub async fn health(&self) -> HealthStatus {
        let url = format!("{}/health", self.base_url);
        let response = match self.http.get(&url).timeout(self.health_timeout).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!("Health probe returned {}", r.status());
                return HealthStatus::disconnected();
            }
            Err(e) => {
                debug!("Health probe failed: {}", e);
                return HealthStatus::disconnected();
            }
        };

        match response.json::<JsonValue>().await {
            Ok(details) => {
                info!("Backend health: {}", details);
                HealthStatus { connected: true, details }
            }
            Err(_) => HealthStatus::disconnected(),
        }
    }

    fn network_error(&self, source: &reqwest::Error) -> ApiError {
        ApiError::Network {
            base_url: self.base_url.clone(),
            reason: source.to_string(),
        }
    }
}

fn decode_envelope(
    endpoint: &str,
    status: StatusCode,
    payload: Option<JsonValue>
) -> Result<JsonValue, ApiError> {
    let code = status.as_u16();
    let envelope = payload
        .as_ref()
        .and_then(|p| serde_json::from_value::<Envelope>(p.clone()).ok())
        .unwrap_or_default();

    if !status.is_success() {
        let detail = envelope.error_detail();
        let message = detail.message
            .clone()
            .or_else(|| envelope.detail_message())
            .unwrap_or_else(|| format!("Request failed with status {}", code));
        return Err(ApiError::Server { status: code, message, hint: detail.hint });
    }

    if payload.is_none() {
        return Err(ApiError::Decode {
            endpoint: endpoint.to_string(),
            status: code,
            reason: "response body is not JSON".to_string(),
        });
    }

    if envelope.success == Some(false) {
        let detail = envelope.error_detail();
        return Err(ApiError::Rejected {
            status: code,
            message: detail.message.unwrap_or_else(|| "Server returned an error".to_string()),
            hint: detail.hint,
        });
    }

    Ok(envelope.data.unwrap_or(JsonValue::Null))
}

/// Deserialize an envelope's `data` into the type a call site expects.
pub(crate) fn decode_data<T: DeserializeOwned>(endpoint: &str, data: JsonValue) -> Result<T, ApiError> {
    serde_json::from_value(data).map_err(|e| ApiError::Decode {
        endpoint: endpoint.to_string(),
        status: 200,
        reason: e.to_string(),
    })
}
