use serde::{ Deserialize, Serialize };
use serde_json::{ Map, Value as JsonValue };
use std::fmt;
use std::str::FromStr;

pub const TITLE_MAX_CHARS: usize = 80;
pub const DEFAULT_CHAT_TITLE: &str = "New conversation";

/// Audience the backend tailors its answer for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Lawyer,
    Judge,
    Student,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::Lawyer, UserRole::Judge, UserRole::Student];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Lawyer => "lawyer",
            UserRole::Judge => "judge",
            UserRole::Student => "student",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            UserRole::Lawyer => "Detailed legal analysis",
            UserRole::Judge => "Judicial perspective",
            UserRole::Student => "Educational explanations",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseUserRoleError {
    message: String,
}

impl fmt::Display for ParseUserRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseUserRoleError {}

impl FromStr for UserRole {
    type Err = ParseUserRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lawyer" => Ok(UserRole::Lawyer),
            "judge" => Ok(UserRole::Judge),
            "student" => Ok(UserRole::Student),
            _ =>
                Err(ParseUserRoleError {
                    message: format!("Invalid role: '{}' (expected lawyer, judge or student)", s),
                }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A case citation exactly as the backend returned it. Fields the client does
/// not know about are kept in `extra` so the record round-trips untouched.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct CaseCitation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipc_sections: Option<Vec<JsonValue>>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl CaseCitation {
    /// Up to three IPC sections joined for display, `N/A` when there are none.
    pub fn sections_label(&self) -> String {
        let sections: Vec<String> = self.ipc_sections
            .iter()
            .flatten()
            .take(3)
            .map(|v| match v {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        if sections.is_empty() { "N/A".to_string() } else { sections.join(", ") }
    }

    pub fn excerpt(&self, max_chars: usize) -> String {
        let text = self.text.trim();
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        text.chars().take(max_chars).collect::<String>() + "…"
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub role: UserRole,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cases: Option<Vec<CaseCitation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub timestamp: i64,
}

/// A message before the store has assigned its id and timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct NewMessage {
    pub role: MessageRole,
    pub text: String,
    pub cases: Option<Vec<CaseCitation>>,
    pub model: Option<String>,
    /// Set on the first user message of a freshly created chat; the store
    /// derives the chat title from it.
    pub is_first_message: bool,
}

impl NewMessage {
    pub fn user(text: impl Into<String>, is_first_message: bool) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
            cases: None,
            model: None,
            is_first_message,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: text.into(),
            cases: None,
            model: None,
            is_first_message: false,
        }
    }

    pub fn with_cases(mut self, cases: Vec<CaseCitation>) -> Self {
        self.cases = Some(cases);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn into_message(self, id: String, timestamp: i64) -> ChatMessage {
        ChatMessage {
            id,
            role: self.role,
            text: self.text,
            cases: self.cases,
            model: self.model,
            timestamp,
        }
    }
}

/// Metadata written after a successful summarization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: String,
    pub file_name: String,
    pub file_url: String,
    pub user_id: String,
    pub model_used: String,
    pub summary_text: String,
    pub timestamp: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewSummary {
    pub file_name: String,
    pub file_url: String,
    pub model_used: String,
    pub summary_text: String,
}

/// First `TITLE_MAX_CHARS` characters of the text, or the default title.
pub fn derive_title(text: &str) -> String {
    let title: String = text.chars().take(TITLE_MAX_CHARS).collect();
    if title.trim().is_empty() {
        DEFAULT_CHAT_TITLE.to_string()
    } else {
        title
    }
}
