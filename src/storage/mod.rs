mod local;

pub use local::LocalBlobStorage;

use async_trait::async_trait;
use chrono::Utc;
use log::info;
use std::path::Path;
use thiserror::Error;

pub const PDF_MIME_TYPE: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),
}

/// A file picked by the user, read fully into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl LocalFile {
    pub async fn read(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Ok(Self {
            mime_type: mime_type_for(&name).to_string(),
            name,
            bytes,
        })
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == PDF_MIME_TYPE
    }
}

fn mime_type_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => PDF_MIME_TYPE,
        "txt" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Object storage for uploaded documents.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `bytes` under `key` and return a durable download URL.
    /// `on_progress(transferred, total)` is called as bytes are written.
    async fn upload(
        &self,
        key: &str,
        bytes: &[u8],
        on_progress: &mut (dyn FnMut(u64, u64) + Send)
    ) -> Result<String, StorageError>;
}

/// Whole-number percentage of `total` already transferred.
pub fn progress_percent(transferred: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = ((transferred.min(total) as f64) / (total as f64)) * 100.0;
    pct.round() as u8
}

pub fn pdf_key(user_id: &str, file_name: &str, unix_millis: i64) -> String {
    let safe_name: String = file_name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("pdfs/{}/{}_{}", user_id, unix_millis, safe_name)
}

/// Upload a PDF under `pdfs/{user_id}/{millis}_{name}` and return its URL.
/// `on_progress` receives 0-100.
pub async fn upload_pdf(
    storage: &dyn BlobStorage,
    user_id: &str,
    file: &LocalFile,
    mut on_progress: impl FnMut(u8) + Send
) -> Result<String, StorageError> {
    let key = pdf_key(user_id, &file.name, Utc::now().timestamp_millis());
    info!("Uploading {} ({} bytes) to {}", file.name, file.bytes.len(), key);
    let mut report = |transferred: u64, total: u64| on_progress(progress_percent(transferred, total));
    storage.upload(&key, &file.bytes, &mut report).await
}
