use async_trait::async_trait;
use log::debug;
use std::path::{ Component, Path, PathBuf };
use tokio::io::AsyncWriteExt;
use url::Url;

use super::{ BlobStorage, StorageError };

const CHUNK_SIZE: usize = 64 * 1024;

/// Stores blobs as files under a root directory and hands out `file://` URLs.
#[derive(Debug, Clone)]
pub struct LocalBlobStorage {
    root: PathBuf,
}

impl LocalBlobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = relative.components().all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn upload(
        &self,
        key: &str,
        bytes: &[u8],
        on_progress: &mut (dyn FnMut(u64, u64) + Send)
    ) -> Result<String, StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let total = bytes.len() as u64;
        let mut file = tokio::fs::File::create(&path).await?;
        let mut transferred = 0u64;
        for chunk in bytes.chunks(CHUNK_SIZE) {
            file.write_all(chunk).await?;
            transferred += chunk.len() as u64;
            on_progress(transferred, total);
        }
        file.flush().await?;
        if total == 0 {
            on_progress(0, 0);
        }

        let absolute = tokio::fs::canonicalize(&path).await?;
        let url = Url::from_file_path(&absolute).map_err(|_| StorageError::InvalidKey(key.to_string()))?;
        debug!("Stored {} bytes at {}", total, url);
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ upload_pdf, LocalFile, PDF_MIME_TYPE };
    use std::sync::{ Arc, Mutex };

    #[tokio::test]
    async fn upload_reports_progress_and_returns_a_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path());
        let file = LocalFile {
            name: "judgment.pdf".into(),
            mime_type: PDF_MIME_TYPE.into(),
            bytes: vec![7u8; CHUNK_SIZE * 2 + 10],
        };

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let url = upload_pdf(&storage, "u1", &file, move |pct| sink.lock().unwrap().push(pct)).await.unwrap();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 3);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last(), Some(&100));

        assert!(url.starts_with("file://"));
        assert!(url.ends_with("_judgment.pdf"));
        let stored = Url::parse(&url).unwrap().to_file_path().unwrap();
        assert!(stored.starts_with(dir.path().canonicalize().unwrap().join("pdfs").join("u1")));
        assert_eq!(std::fs::read(stored).unwrap().len(), file.bytes.len());
    }

    #[tokio::test]
    async fn empty_file_still_completes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path());
        let mut calls = Vec::new();
        let mut record = |t: u64, total: u64| calls.push((t, total));
        storage.upload("pdfs/u1/1_empty.pdf", &[], &mut record).await.unwrap();
        assert_eq!(calls, vec![(0, 0)]);
    }

    #[tokio::test]
    async fn escaping_keys_are_rejected() {
        let storage = LocalBlobStorage::new("/tmp/casecut-never-written");
        let mut ignore = |_: u64, _: u64| {};
        for key in ["../outside.pdf", "/abs/path.pdf", ""] {
            let err = storage.upload(key, b"%PDF-", &mut ignore).await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey(_)), "{key}");
        }
    }

    #[tokio::test]
    async fn local_file_read_detects_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();
        let file = LocalFile::read(&path).await.unwrap();
        assert_eq!(file.name, "order.pdf");
        assert!(file.is_pdf());
    }
}
