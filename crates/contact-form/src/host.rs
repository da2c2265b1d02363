//! Page host
//!
//! The environment the form runs in: it shows alerts, owns the clipboard and
//! receives exported documents.

use crate::snapshot::ExportedDocument;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::io;
use std::path::PathBuf;

#[async_trait]
pub trait PageHost: Send + Sync {
    /// Show a blocking message to the user
    async fn alert(&self, message: &str);

    /// Write plain text to the clipboard
    async fn copy_to_clipboard(&self, text: &str) -> io::Result<()>;

    /// Offer a generated document as a download
    async fn save_download(&self, document: &ExportedDocument) -> io::Result<()>;
}

/// Host that keeps everything in memory
#[derive(Debug, Default)]
pub struct RecordingHost {
    alerts: Mutex<Vec<String>>,
    clipboard: Mutex<Vec<String>>,
    downloads: Mutex<Vec<ExportedDocument>>,
}

impl RecordingHost {
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().clone()
    }

    /// Clipboard writes, oldest first
    pub fn clipboard(&self) -> Vec<String> {
        self.clipboard.lock().clone()
    }

    pub fn downloads(&self) -> Vec<ExportedDocument> {
        self.downloads.lock().clone()
    }
}

#[async_trait]
impl PageHost for RecordingHost {
    async fn alert(&self, message: &str) {
        self.alerts.lock().push(message.to_string());
    }

    async fn copy_to_clipboard(&self, text: &str) -> io::Result<()> {
        self.clipboard.lock().push(text.to_string());
        Ok(())
    }

    async fn save_download(&self, document: &ExportedDocument) -> io::Result<()> {
        self.downloads.lock().push(document.clone());
        Ok(())
    }
}

/// Host that saves downloads into a directory and prints alerts to stderr
#[derive(Debug)]
pub struct DirectoryHost {
    dir: PathBuf,
    clipboard: Mutex<Option<String>>,
}

impl DirectoryHost {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            clipboard: Mutex::new(None),
        }
    }

    /// Last text copied to the clipboard
    pub fn clipboard(&self) -> Option<String> {
        self.clipboard.lock().clone()
    }
}

#[async_trait]
impl PageHost for DirectoryHost {
    async fn alert(&self, message: &str) {
        eprintln!("{message}");
    }

    async fn copy_to_clipboard(&self, text: &str) -> io::Result<()> {
        *self.clipboard.lock() = Some(text.to_string());
        Ok(())
    }

    async fn save_download(&self, document: &ExportedDocument) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&document.file_name);
        tokio::fs::write(&path, &document.html).await?;
        tracing::info!(path = %path.display(), "document saved");
        Ok(())
    }
}
