use log::{ error, info };
use std::sync::atomic::{ AtomicU8, Ordering };
use std::sync::Arc;
use thiserror::Error;

use crate::api::inference::{ InferenceClient, InferenceError };
use crate::api::{ ApiError, LegalBackend };
use crate::config::models::{ model_by_id, models_by_capability, Capability, ModelInfo, Provider };
use crate::history::{ HistoryStore, StoreError };
use crate::models::api::{ SummarizeInput, SummarizeRequest };
use crate::models::chat::NewSummary;
use crate::storage::{ upload_pdf, BlobStorage, LocalFile, StorageError };

/// Mode sent to `/summarize` for document summaries.
pub const SUMMARY_MODE: &str = "summary";
pub const TEXT_INPUT_NAME: &str = "Text input";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Text,
    Pdf,
}

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Upload failed: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error("Could not save summary: {0}")]
    Store(#[from] StoreError),
}

pub type ProgressListener = Arc<dyn Fn(u8) + Send + Sync>;

/// Document summarizer state: model choice, input, upload progress, result.
pub struct Summarizer {
    user_id: String,
    backend: Arc<dyn LegalBackend>,
    store: Arc<dyn HistoryStore>,
    storage: Arc<dyn BlobStorage>,
    inference: Option<InferenceClient>,
    progress_listener: Option<ProgressListener>,

    selected_model: String,
    mode: InputMode,
    text: String,
    file: Option<LocalFile>,
    upload_progress: Arc<AtomicU8>,
    summary: String,
    error: Option<String>,
    loading: bool,
}

impl Summarizer {
    pub fn new(
        user_id: impl Into<String>,
        backend: Arc<dyn LegalBackend>,
        store: Arc<dyn HistoryStore>,
        storage: Arc<dyn BlobStorage>
    ) -> Self {
        let selected_model = Self::models()
            .first()
            .map(|m| m.id.to_string())
            .unwrap_or_default();
        Self {
            user_id: user_id.into(),
            backend,
            store,
            storage,
            inference: None,
            progress_listener: None,
            selected_model,
            mode: InputMode::default(),
            text: String::new(),
            file: None,
            upload_progress: Arc::new(AtomicU8::new(0)),
            summary: String::new(),
            error: None,
            loading: false,
        }
    }

    /// Send text input for hosted models straight to the inference API.
    pub fn with_direct_inference(mut self, client: InferenceClient) -> Self {
        self.inference = Some(client);
        self
    }

    pub fn on_progress(&mut self, listener: ProgressListener) {
        self.progress_listener = Some(listener);
    }

    pub fn models() -> Vec<&'static ModelInfo> {
        models_by_capability(Capability::Summarize)
    }

    pub fn select_model(&mut self, model_id: &str) -> bool {
        if Self::models().iter().any(|m| m.id == model_id) {
            self.selected_model = model_id.to_string();
            self.error = None;
            true
        } else {
            self.error = Some(format!("Model \"{}\" not found", model_id));
            false
        }
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        self.mode = mode;
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Accept only PDFs; anything else keeps the current selection.
    pub fn select_file(&mut self, file: LocalFile) -> bool {
        if file.is_pdf() {
            self.file = Some(file);
            self.error = None;
            true
        } else {
            self.error = Some("Please select a valid PDF file".to_string());
            false
        }
    }

    pub fn reset(&mut self) {
        self.text.clear();
        self.file = None;
        self.summary.clear();
        self.error = None;
        self.upload_progress.store(0, Ordering::SeqCst);
    }

    pub fn selected_model(&self) -> &str {
        &self.selected_model
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn file(&self) -> Option<&LocalFile> {
        self.file.as_ref()
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn upload_progress(&self) -> u8 {
        self.upload_progress.load(Ordering::SeqCst)
    }

    /// Produce a summary for the current input. Failures land in [`Self::error`].
    pub async fn generate(&mut self) {
        self.loading = true;
        self.error = None;
        self.summary.clear();

        if let Err(e) = self.run().await {
            error!("Summarization error: {}", e);
            self.error = Some(e.to_string());
        }

        self.loading = false;
        self.upload_progress.store(0, Ordering::SeqCst);
    }

    async fn run(&mut self) -> Result<(), SummarizeError> {
        let model_id = self.selected_model.clone();
        let mut file_url = String::new();

        let summary = match self.mode {
            InputMode::Pdf => {
                let file = self.file
                    .as_ref()
                    .ok_or_else(|| SummarizeError::Invalid("Please select a PDF file".to_string()))?;
                let progress = Arc::clone(&self.upload_progress);
                let listener = self.progress_listener.clone();
                file_url = upload_pdf(self.storage.as_ref(), &self.user_id, file, move |pct| {
                    progress.store(pct, Ordering::SeqCst);
                    if let Some(listener) = &listener {
                        listener(pct);
                    }
                }).await?;
                self.summarize_via_backend(SummarizeInput::File { file_url: file_url.clone() }, &model_id).await?
            }
            InputMode::Text => {
                if self.text.trim().is_empty() {
                    return Err(SummarizeError::Invalid("Please enter text to summarize".to_string()));
                }
                match (&self.inference, model_by_id(&model_id)) {
                    (Some(client), Some(ModelInfo { provider: Provider::HuggingFace, hf_model: Some(repo), .. })) => {
                        info!("Summarizing {} chars directly with {}", self.text.len(), repo);
                        client.summarize(repo, &self.text).await?
                    }
                    _ => {
                        let input = SummarizeInput::Text { text: self.text.clone() };
                        self.summarize_via_backend(input, &model_id).await?
                    }
                }
            }
        };

        self.summary = summary.clone();

        let file_name = self.file
            .as_ref()
            .filter(|_| self.mode == InputMode::Pdf)
            .map(|f| f.name.clone())
            .unwrap_or_else(|| TEXT_INPUT_NAME.to_string());
        self.store.save_summary(&self.user_id, NewSummary {
            file_name,
            file_url,
            model_used: model_id,
            summary_text: summary,
        }).await?;
        Ok(())
    }

    async fn summarize_via_backend(
        &self,
        input: SummarizeInput,
        model_id: &str
    ) -> Result<String, SummarizeError> {
        let result = self.backend.summarize(
            &(SummarizeRequest {
                input,
                model_id: model_id.to_string(),
                mode: SUMMARY_MODE.to_string(),
            })
        ).await?;
        info!("Summary from provider {} ({} chars)", result.provider, result.summary.len());
        Ok(result.summary)
    }
}
