//! Contact Form Engine
//!
//! Renders a contact form from a declarative `config.json`, validates user
//! input, embeds uploaded files as data URIs and exports the completed form
//! as a single self-contained HTML document.
//!
//! # Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │    Config    │──▶│     Form     │──▶│   LiveForm   │
//! │    Loader    │   │  Synthesizer │   │   (state)    │
//! └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                              │ submit / download
//!                                       ┌──────▼───────┐
//!                                       │  Validation  │
//!                                       │    Engine    │
//!                                       └──────┬───────┘
//!                                              │ download
//! ┌──────────────┐   ┌──────────────┐   ┌──────▼───────┐
//! │   PageHost   │◀──│   Snapshot   │◀──│ File Encoding│
//! │    (save)    │   │   Generator  │   │   Pipeline   │
//! └──────────────┘   └──────────────┘   └──────────────┘
//! ```

#![warn(clippy::all)]

pub mod app;
pub mod config;
pub mod encoding;
pub mod error;
pub mod form;
pub mod host;
pub mod live;
pub mod markup;
pub mod page;
pub mod snapshot;
pub mod validation;

pub use app::{ContactForm, Startup, Submission, SubmittedValue};
pub use config::{Config, ConfigLoader, ConfigSource, Question, QuestionType, SelectOption};
pub use encoding::{
    DiskFile, EncodedFileRef, FileEncodingPipeline, FileSource, MediaKind, MemoryFile,
    ResolvedEntry, ResolvedForm, ResolvedValue, SelectedFile,
};
pub use error::{ConfigurationError, FileReadFailure, FormError, Result, ValidationFailure};
pub use form::{synthesize, Field, Form, FormEncoding, SubmissionTarget, Widget};
pub use host::{DirectoryHost, PageHost, RecordingHost};
pub use live::{FormSnapshot, Indicator, LiveForm, SnapshotEntry, SnapshotValue};
pub use markup::Markup;
pub use page::{PageRenderer, PageView};
pub use snapshot::{ExportedDocument, SnapshotGenerator, EXPORT_FILE_NAME};
pub use validation::{Intent, ValidationEngine};
