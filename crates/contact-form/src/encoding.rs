//! File Encoding Pipeline
//!
//! Every selected file is read by its own task; the pipeline waits for all of
//! them before the snapshot document is generated. The first failed read
//! aborts the remaining tasks and fails the whole export.

use crate::error::FileReadFailure;
use crate::live::{FormSnapshot, SnapshotValue};
use crate::markup::Markup;
use async_trait::async_trait;
use base64::Engine;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

/// MIME type used when the source does not report one
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// A file picked by the user
#[async_trait]
pub trait FileSource: Send + Sync + fmt::Debug {
    fn file_name(&self) -> &str;

    /// Reported MIME type, if any
    fn mime_type(&self) -> Option<&str>;

    async fn read(&self) -> std::io::Result<Vec<u8>>;
}

/// Shared handle to a selected file
#[derive(Debug, Clone)]
pub struct SelectedFile(Arc<dyn FileSource>);

impl SelectedFile {
    pub fn new(source: impl FileSource + 'static) -> Self {
        Self(Arc::new(source))
    }

    pub fn file_name(&self) -> &str {
        self.0.file_name()
    }

    pub fn mime_type(&self) -> &str {
        self.0.mime_type().unwrap_or(FALLBACK_MIME)
    }

    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        self.0.read().await
    }
}

/// File held in memory
#[derive(Debug, Clone)]
pub struct MemoryFile {
    name: String,
    mime: Option<String>,
    bytes: Vec<u8>,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, mime: Option<&str>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            mime: mime.map(String::from),
            bytes: bytes.into(),
        }
    }
}

#[async_trait]
impl FileSource for MemoryFile {
    fn file_name(&self) -> &str {
        &self.name
    }

    fn mime_type(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    async fn read(&self) -> std::io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// File on disk; the MIME type is guessed from the extension.
#[derive(Debug, Clone)]
pub struct DiskFile {
    path: PathBuf,
    name: String,
    mime: Option<String>,
}

impl DiskFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = mime_guess::from_path(&path).first_raw().map(String::from);
        Self { path, name, mime }
    }
}

#[async_trait]
impl FileSource for DiskFile {
    fn file_name(&self) -> &str {
        &self.name
    }

    fn mime_type(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// Broad MIME category deciding how a file is embedded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Other,
}

impl MediaKind {
    pub fn of(mime: &str) -> Self {
        match mime.split('/').next().unwrap_or_default() {
            "image" => Self::Image,
            "video" => Self::Video,
            "audio" => Self::Audio,
            _ => Self::Other,
        }
    }
}

/// Self-describing base64 reference to a file's bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFileRef {
    pub file_name: String,
    pub mime: String,
    pub payload: String,
}

impl EncodedFileRef {
    pub fn encode(file_name: &str, mime: &str, bytes: &[u8]) -> Self {
        Self {
            file_name: file_name.to_string(),
            mime: mime.to_string(),
            payload: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// `<mime>;base64,<payload>`
    pub fn reference(&self) -> String {
        format!("{};base64,{}", self.mime, self.payload)
    }

    /// `data:<mime>;base64,<payload>`
    pub fn data_uri(&self) -> String {
        format!("data:{}", self.reference())
    }

    pub fn media_kind(&self) -> MediaKind {
        MediaKind::of(&self.mime)
    }
}

/// Snapshot value with every file encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedValue {
    Text(String),
    Choice(Vec<String>),
    /// References in read-completion order
    Files(Vec<EncodedFileRef>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub name: String,
    pub label: Markup,
    pub value: ResolvedValue,
}

/// Fully resolved form state, one entry per field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedForm {
    pub entries: Vec<ResolvedEntry>,
}

impl ResolvedForm {
    /// Number of embedded files
    pub fn file_count(&self) -> usize {
        self.entries
            .iter()
            .map(|e| match &e.value {
                ResolvedValue::Files(refs) => refs.len(),
                _ => 0,
            })
            .sum()
    }
}

/// Fan-out/fan-in over file reads
pub struct FileEncodingPipeline;

impl FileEncodingPipeline {
    /// Encode every selected file of the snapshot.
    ///
    /// Fields sharing a name are merged first, so files of an overwritten
    /// control are never read.
    pub async fn run(snapshot: FormSnapshot) -> Result<ResolvedForm, FileReadFailure> {
        let mut tasks = JoinSet::new();
        let mut entries = Vec::new();

        for (index, entry) in snapshot.merged_by_name().into_iter().enumerate() {
            let value = match entry.value {
                SnapshotValue::Text(text) => ResolvedValue::Text(text),
                SnapshotValue::Choice(values) => ResolvedValue::Choice(values),
                SnapshotValue::Files(files) => {
                    for file in files {
                        let field = entry.name.clone();
                        tasks.spawn(async move {
                            let bytes = file.read().await.map_err(|source| FileReadFailure::Read {
                                field: field.clone(),
                                file: file.file_name().to_string(),
                                source,
                            })?;
                            tracing::debug!(
                                field = %field,
                                file = file.file_name(),
                                mime = file.mime_type(),
                                bytes = bytes.len(),
                                "file encoded"
                            );
                            Ok::<_, FileReadFailure>((
                                index,
                                EncodedFileRef::encode(file.file_name(), file.mime_type(), &bytes),
                            ))
                        });
                    }
                    ResolvedValue::Files(Vec::new())
                }
            };
            entries.push(ResolvedEntry {
                name: entry.name,
                label: entry.label,
                value,
            });
        }

        // dropping the set on an early return aborts the outstanding reads
        while let Some(joined) = tasks.join_next().await {
            let (index, encoded) = joined??;
            if let Some(ResolvedEntry {
                value: ResolvedValue::Files(refs),
                ..
            }) = entries.get_mut(index)
            {
                refs.push(encoded);
            }
        }

        Ok(ResolvedForm { entries })
    }
}
