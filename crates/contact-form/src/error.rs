//! Error types for the contact form pipeline

use thiserror::Error;

/// Fatal problems with the configuration document.
///
/// Any of these replaces the whole page with an error message; no partial
/// form is ever rendered.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// Transport failure while fetching the document
    #[error("could not fetch configuration from {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// Non-success HTTP status
    #[error("configuration request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// Local file could not be read
    #[error("could not read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Payload is not a structurally valid configuration
    #[error("malformed configuration: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Required field absent or blank
    #[error("configuration is missing required field `{0}`")]
    MissingField(&'static str),

    /// Neither `email` nor `form_backend_url` set
    #[error("configuration must set `email` or `form_backend_url`")]
    MissingTarget,

    /// A selectbox question declared no options
    #[error("selectbox question `{0}` must have options")]
    EmptySelectbox(String),
}

/// One or more fields failed validation. Handled where detected: the user is
/// alerted and may retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationFailure {
    /// Message shown to the user
    pub message: String,
    /// Names of the offending fields, in form order
    pub fields: Vec<String>,
}

/// A file read failed during export; the whole download action is abandoned.
#[derive(Error, Debug)]
pub enum FileReadFailure {
    #[error("failed to read `{file}` for field `{field}`: {source}")]
    Read {
        field: String,
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("file read task did not complete: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

/// Contact form error type
#[derive(Error, Debug)]
pub enum FormError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error(transparent)]
    FileRead(#[from] FileReadFailure),

    #[error("no field named `{0}`")]
    UnknownField(String),

    #[error("field `{name}` does not accept {expected}")]
    WrongControl { name: String, expected: &'static str },

    #[error("option `{value}` of field `{name}` cannot be selected")]
    OptionUnavailable { name: String, value: String },

    #[error("form download is disabled")]
    DownloadDisabled,

    #[error("no email address to copy")]
    NothingToCopy,

    #[error("template error: {0}")]
    TemplateSyntax(#[from] handlebars::TemplateError),

    #[error("render error: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the contact form pipeline
pub type Result<T> = std::result::Result<T, FormError>;
