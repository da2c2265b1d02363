//! Form configuration
//!
//! The form is described by a `config.json` document fetched at page load
//! (or read from disk by the CLI). Loading fails fast: a configuration without
//! a title, a subject or any submission target never produces a form.

use crate::error::ConfigurationError;
use crate::markup::Markup;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

/// Fixed resource name of the configuration document
pub const CONFIG_RESOURCE: &str = "config.json";

pub const DEFAULT_SEND_BUTTON_TEXT: &str = "Send";
pub const DEFAULT_DOWNLOAD_BUTTON_TEXT: &str = "Download";
pub const DEFAULT_MISSING_FIELD_MESSAGE: &str = "Please fill out all required fields.";

/// Validated form configuration
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub title: String,
    pub subject: String,
    pub questions: Vec<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Markup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_backend_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_button_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_button_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_field_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_form_download: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_file_upload: Option<bool>,
}

/// `config.json` as written, before required fields are checked
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    title: Option<String>,
    subject: Option<String>,
    questions: Option<Vec<Question>>,
    #[serde(default)]
    instructions: Option<Markup>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    form_backend_url: Option<String>,
    #[serde(default)]
    send_button_text: Option<String>,
    #[serde(default)]
    download_button_text: Option<String>,
    #[serde(default)]
    missing_field_message: Option<String>,
    #[serde(default)]
    enable_form_download: Option<bool>,
    #[serde(default)]
    ignore_file_upload: Option<bool>,
}

/// One configured form field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Question {
    pub label: Markup,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SelectOption>>,
    /// Attribute overrides applied verbatim to the generated control
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Supported question types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    Date,
    DatetimeLocal,
    Email,
    File,
    Number,
    Selectbox,
    Tel,
    Text,
    Textarea,
    Time,
    Url,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::DatetimeLocal => "datetime-local",
            Self::Email => "email",
            Self::File => "file",
            Self::Number => "number",
            Self::Selectbox => "selectbox",
            Self::Tel => "tel",
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Time => "time",
            Self::Url => "url",
        }
    }
}

/// Selectbox option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

impl SelectOption {
    pub fn is_selected(&self) -> bool {
        self.selected.unwrap_or(false)
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.unwrap_or(false)
    }
}

impl Config {
    /// Parse and validate a JSON document
    pub fn from_json(text: &str) -> Result<Self, ConfigurationError> {
        let raw: RawConfig = serde_json::from_str(text)?;
        Self::validate(raw)
    }

    /// Validate an already-parsed JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigurationError> {
        let raw: RawConfig = serde_json::from_value(value)?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self, ConfigurationError> {
        let title = non_blank(raw.title).ok_or(ConfigurationError::MissingField("title"))?;
        let subject = non_blank(raw.subject).ok_or(ConfigurationError::MissingField("subject"))?;
        let questions = raw
            .questions
            .ok_or(ConfigurationError::MissingField("questions"))?;

        let email = non_blank(raw.email);
        let form_backend_url = non_blank(raw.form_backend_url);
        if email.is_none() && form_backend_url.is_none() {
            return Err(ConfigurationError::MissingTarget);
        }

        let mut seen = HashSet::new();
        for question in &questions {
            match (&question.kind, &question.options) {
                (QuestionType::Selectbox, None) => {
                    return Err(ConfigurationError::EmptySelectbox(question.name.clone()))
                }
                (QuestionType::Selectbox, Some(options)) if options.is_empty() => {
                    return Err(ConfigurationError::EmptySelectbox(question.name.clone()))
                }
                (QuestionType::Selectbox, Some(_)) | (_, None) => {}
                (kind, Some(_)) => {
                    tracing::warn!(
                        name = %question.name,
                        kind = kind.as_str(),
                        "options are only used by selectbox questions, ignoring"
                    );
                }
            }

            if !seen.insert(question.name.as_str()) {
                tracing::warn!(
                    name = %question.name,
                    "duplicate question name, later fields overwrite earlier ones"
                );
            }
        }

        Ok(Self {
            title,
            subject,
            questions,
            instructions: raw.instructions,
            email,
            form_backend_url,
            send_button_text: raw.send_button_text,
            download_button_text: raw.download_button_text,
            missing_field_message: raw.missing_field_message,
            enable_form_download: raw.enable_form_download,
            ignore_file_upload: raw.ignore_file_upload,
        })
    }

    pub fn downloads_enabled(&self) -> bool {
        self.enable_form_download.unwrap_or(false)
    }

    pub fn ignores_file_upload(&self) -> bool {
        self.ignore_file_upload.unwrap_or(false)
    }

    pub fn has_file_questions(&self) -> bool {
        self.questions.iter().any(|q| q.kind == QuestionType::File)
    }

    pub fn send_button_text(&self) -> &str {
        self.send_button_text
            .as_deref()
            .unwrap_or(DEFAULT_SEND_BUTTON_TEXT)
    }

    pub fn download_button_text(&self) -> &str {
        self.download_button_text
            .as_deref()
            .unwrap_or(DEFAULT_DOWNLOAD_BUTTON_TEXT)
    }

    pub fn missing_field_message(&self) -> &str {
        self.missing_field_message
            .as_deref()
            .unwrap_or(DEFAULT_MISSING_FIELD_MESSAGE)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Where the configuration document lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Url(Url),
    File(PathBuf),
}

impl ConfigSource {
    /// Resolve the fixed `config.json` resource against a page URL.
    pub fn relative_to(page: &Url) -> Self {
        match page.join(CONFIG_RESOURCE) {
            Ok(url) => Self::Url(url),
            Err(_) => Self::Url(page.clone()),
        }
    }

    /// Interpret a CLI argument: `http(s)://` locations are fetched, anything
    /// else is a path. Locations not naming a `.json` document get
    /// `config.json` appended.
    pub fn parse(location: &str) -> Self {
        match Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                if url.path().ends_with(".json") {
                    Self::Url(url)
                } else {
                    Self::relative_to(&url)
                }
            }
            _ => Self::File(PathBuf::from(location)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Url(url) => url.to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// Fetches and validates the configuration document
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    client: reqwest::Client,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Load and validate the configuration
    pub async fn load(&self, source: &ConfigSource) -> Result<Config, ConfigurationError> {
        let text = match source {
            ConfigSource::Url(url) => self.fetch(url).await?,
            ConfigSource::File(path) => read_file(path).await?,
        };
        let config = Config::from_json(&text)?;
        tracing::info!(
            source = %source.describe(),
            title = %config.title,
            questions = config.questions.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    async fn fetch(&self, url: &Url) -> Result<String, ConfigurationError> {
        let unreachable = |e: reqwest::Error| ConfigurationError::Unreachable {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(unreachable)?;

        if !resp.status().is_success() {
            return Err(ConfigurationError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        resp.text().await.map_err(unreachable)
    }
}

async fn read_file(path: &Path) -> Result<String, ConfigurationError> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| io_error(path, e))?;
    let path = if metadata.is_dir() {
        path.join(CONFIG_RESOURCE)
    } else {
        path.to_path_buf()
    };
    tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| io_error(&path, e))
}

fn io_error(path: &Path, source: std::io::Error) -> ConfigurationError {
    ConfigurationError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_config() -> serde_json::Value {
        json!({
            "title": "Testing",
            "subject": "Testing",
            "email": "foo@bar.com",
            "form_backend_url": "http://localhost:5000/submit",
            "enable_form_download": true,
            "ignore_file_upload": false,
            "questions": [],
        })
    }

    #[test]
    fn test_valid_config() {
        let config = Config::from_value(base_config()).unwrap();
        assert_eq!(config.title, "Testing");
        assert!(config.downloads_enabled());
        assert_eq!(config.send_button_text(), "Send");
        assert_eq!(config.missing_field_message(), DEFAULT_MISSING_FIELD_MESSAGE);
    }

    #[test]
    fn test_missing_title_and_subject() {
        for field in ["title", "subject"] {
            let mut value = base_config();
            value.as_object_mut().unwrap().remove(field);
            let err = Config::from_value(value).unwrap_err();
            assert!(matches!(err, ConfigurationError::MissingField(f) if f == field));
        }
    }

    #[test]
    fn test_blank_title_rejected() {
        let mut value = base_config();
        value["title"] = json!("   ");
        assert!(matches!(
            Config::from_value(value),
            Err(ConfigurationError::MissingField("title"))
        ));
    }

    #[test]
    fn test_missing_both_targets() {
        let mut value = base_config();
        let obj = value.as_object_mut().unwrap();
        obj.remove("email");
        obj.remove("form_backend_url");
        assert!(matches!(
            Config::from_value(value),
            Err(ConfigurationError::MissingTarget)
        ));
    }

    #[test]
    fn test_single_target_is_enough() {
        let mut value = base_config();
        value.as_object_mut().unwrap().remove("email");
        assert!(Config::from_value(value).is_ok());
    }

    #[test]
    fn test_question_types_and_labels() {
        let mut value = base_config();
        value["questions"] = json!([
            {"label": ["Pick", "<i>one</i>"], "name": "when", "type": "datetime-local",
             "required": false},
        ]);
        let config = Config::from_value(value).unwrap();
        assert_eq!(config.questions[0].kind, QuestionType::DatetimeLocal);
        assert_eq!(config.questions[0].label.as_str(), "Pick <i>one</i>");
    }

    #[test]
    fn test_unknown_type_rejected() {
        let mut value = base_config();
        value["questions"] = json!([
            {"label": "Q", "name": "q", "type": "color", "required": true},
        ]);
        assert!(matches!(
            Config::from_value(value),
            Err(ConfigurationError::Malformed(_))
        ));
    }

    #[test]
    fn test_selectbox_requires_options() {
        let mut value = base_config();
        value["questions"] = json!([
            {"label": "Q", "name": "q", "type": "selectbox", "required": true},
        ]);
        assert!(matches!(
            Config::from_value(value),
            Err(ConfigurationError::EmptySelectbox(name)) if name == "q"
        ));
    }

    #[test]
    fn test_misspelled_option_key_rejected() {
        let mut value = base_config();
        value["questions"] = json!([{
            "label": "Q", "name": "q", "type": "selectbox", "required": true,
            "options": [{"label": "Option 8", "value": "option8", "disbled": false}],
        }]);
        assert!(Config::from_value(value).is_err());
    }

    #[test]
    fn test_duplicate_names_allowed() {
        let mut value = base_config();
        value["questions"] = json!([
            {"label": "A", "name": "same", "type": "text", "required": false},
            {"label": "B", "name": "same", "type": "text", "required": false},
        ]);
        assert_eq!(Config::from_value(value).unwrap().questions.len(), 2);
    }

    #[test]
    fn test_source_parse() {
        assert_eq!(
            ConfigSource::parse("http://localhost:8080/"),
            ConfigSource::Url(Url::parse("http://localhost:8080/config.json").unwrap())
        );
        assert_eq!(
            ConfigSource::parse("https://example.com/forms/custom.json"),
            ConfigSource::Url(Url::parse("https://example.com/forms/custom.json").unwrap())
        );
        assert_eq!(
            ConfigSource::parse("site/config.json"),
            ConfigSource::File(PathBuf::from("site/config.json"))
        );
    }

    #[tokio::test]
    async fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_RESOURCE), base_config().to_string()).unwrap();

        let loader = ConfigLoader::new();
        let config = loader
            .load(&ConfigSource::File(dir.path().to_path_buf()))
            .await
            .unwrap();
        assert_eq!(config.subject, "Testing");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new();
        let err = loader
            .load(&ConfigSource::File(dir.path().join("nope.json")))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::Io { .. }));
    }

    #[tokio::test]
    async fn test_directory_without_config_names_resource() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new();
        let err = loader
            .load(&ConfigSource::File(dir.path().to_path_buf()))
            .await
            .unwrap_err();

        let expected = dir.path().join(CONFIG_RESOURCE).display().to_string();
        match err {
            ConfigurationError::Io { path, .. } => assert_eq!(path, expected),
            other => panic!("unexpected error: {other}"),
        }
    }
}
