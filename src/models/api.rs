use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;
use super::chat::{ CaseCitation, UserRole };

pub const DEFAULT_RESULT_COUNT: u32 = 5;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub query: String,
    pub role: UserRole,
    pub topic: String,
    pub k: u32,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>, role: UserRole, topic: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            role,
            topic: topic.into(),
            k: DEFAULT_RESULT_COUNT,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub cases: Vec<CaseCitation>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub ranked: bool,
    #[serde(default)]
    pub total_retrieved: u64,
    #[serde(default)]
    pub llm_time_ms: u64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FeedbackRequest {
    pub query: String,
    /// 1 for thumbs up, -1 for thumbs down.
    pub rating: i8,
    pub role: UserRole,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SummarizeInput {
    Text {
        text: String,
    },
    File {
        file_url: String,
    },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SummarizeRequest {
    #[serde(flatten)]
    pub input: SummarizeInput,
    pub model_id: String,
    pub mode: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SummarizeResult {
    pub summary: String,
    #[serde(default)]
    pub model_id: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthStatus {
    pub connected: bool,
    pub details: JsonValue,
}

impl HealthStatus {
    pub fn disconnected() -> Self {
        Self { connected: false, details: JsonValue::Null }
    }
}
