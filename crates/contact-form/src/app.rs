//! Contact form application
//!
//! Owns one loaded form and drives the user actions: submit, download and
//! copy email. Every action starts from a fresh snapshot of the live form.

use crate::config::{Config, ConfigLoader, ConfigSource};
use crate::encoding::FileEncodingPipeline;
use crate::error::{ConfigurationError, FormError, Result};
use crate::form::{synthesize, Form, FormEncoding};
use crate::host::PageHost;
use crate::live::{FormSnapshot, LiveForm, SnapshotValue};
use crate::page::PageView;
use crate::snapshot::{ExportedDocument, SnapshotGenerator};
use crate::validation::{Intent, ValidationEngine};
use std::sync::Arc;

/// Confirmation shown after the email address is copied
pub const COPIED_MESSAGE: &str = "Email address copied to clipboard.";

/// Outcome of loading the configuration at page start
pub enum Startup {
    Ready(Box<ContactForm>),
    Failed {
        error: ConfigurationError,
        view: PageView,
    },
}

/// What the browser would send on submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub action: String,
    pub method: &'static str,
    pub encoding: FormEncoding,
    /// Name/value pairs in control order
    pub fields: Vec<(String, SubmittedValue)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmittedValue {
    Text(String),
    File { file_name: String, mime: String },
}

impl Submission {
    /// Values submitted under `name`
    pub fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SubmittedValue> + 'a {
        self.fields.iter().filter(move |(n, _)| n == name).map(|(_, v)| v)
    }
}

pub struct ContactForm {
    config: Config,
    form: Form,
    live: LiveForm,
    engine: ValidationEngine,
    generator: SnapshotGenerator,
    host: Arc<dyn PageHost>,
}

impl ContactForm {
    pub fn new(config: Config, host: Arc<dyn PageHost>) -> Result<Self> {
        let form = synthesize(&config);
        let live = LiveForm::new(&form);
        let engine = ValidationEngine::new(config.missing_field_message());
        Ok(Self {
            config,
            form,
            live,
            engine,
            generator: SnapshotGenerator::new()?,
            host,
        })
    }

    /// Load the configuration and build the form, or the error page when the
    /// configuration is unusable.
    pub async fn boot(
        loader: &ConfigLoader,
        source: &ConfigSource,
        host: Arc<dyn PageHost>,
    ) -> Result<Startup> {
        match loader.load(source).await {
            Ok(config) => Ok(Startup::Ready(Box::new(Self::new(config, host)?))),
            Err(error) => {
                tracing::error!(
                    source = %source.describe(),
                    error = %error,
                    "configuration failed to load"
                );
                let view = PageView::Error(error.to_string());
                Ok(Startup::Failed { error, view })
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn live(&self) -> &LiveForm {
        &self.live
    }

    /// Mutable access for user input
    pub fn live_mut(&mut self) -> &mut LiveForm {
        &mut self.live
    }

    pub fn page(&self) -> PageView {
        PageView::Form(Box::new(self.form.clone()))
    }

    /// Validate and build the submission payload
    pub async fn submit(&mut self) -> Result<Submission> {
        let snapshot = self
            .engine
            .run(&mut self.live, Intent::Submit, self.host.as_ref())
            .await?;
        let submission = self.submission(&snapshot);
        tracing::info!(
            action = %submission.action,
            enctype = submission.encoding.as_str(),
            fields = submission.fields.len(),
            "form submitted"
        );
        Ok(submission)
    }

    fn submission(&self, snapshot: &FormSnapshot) -> Submission {
        let drop_files = self.config.ignores_file_upload();
        let mut fields = Vec::new();
        for entry in snapshot.entries() {
            match &entry.value {
                SnapshotValue::Text(text) => {
                    fields.push((entry.name.clone(), SubmittedValue::Text(text.clone())));
                }
                SnapshotValue::Choice(values) => {
                    fields.extend(
                        values
                            .iter()
                            .map(|v| (entry.name.clone(), SubmittedValue::Text(v.clone()))),
                    );
                }
                SnapshotValue::Files(_) if drop_files => {}
                SnapshotValue::Files(files) => {
                    fields.extend(files.iter().map(|f| {
                        (
                            entry.name.clone(),
                            SubmittedValue::File {
                                file_name: f.file_name().to_string(),
                                mime: f.mime_type().to_string(),
                            },
                        )
                    }));
                }
            }
        }
        Submission {
            action: self.form.target.action(),
            method: "post",
            encoding: self.form.encoding,
            fields,
        }
    }

    /// Validate, encode every selected file and hand the response document to
    /// the host.
    pub async fn download(&mut self) -> Result<ExportedDocument> {
        if !self.form.download_button.visible {
            return Err(FormError::DownloadDisabled);
        }

        let snapshot = self
            .engine
            .run(&mut self.live, Intent::Download, self.host.as_ref())
            .await?;

        let resolved = match FileEncodingPipeline::run(snapshot).await {
            Ok(resolved) => resolved,
            Err(failure) => {
                tracing::error!(error = %failure, "download aborted");
                self.host.alert(&failure.to_string()).await;
                return Err(failure.into());
            }
        };

        let document = self.generator.render(&self.config.title, &resolved)?;
        self.host.save_download(&document).await?;
        tracing::info!(file = %document.file_name, "form exported");
        Ok(document)
    }

    /// Copy the configured email address, as a click on an email placeholder
    /// does.
    pub async fn copy_email(&self) -> Result<String> {
        let email = match (&self.form.email, self.form.email_placeholders) {
            (Some(email), n) if n > 0 => email.clone(),
            _ => return Err(FormError::NothingToCopy),
        };
        self.host.copy_to_clipboard(&email).await?;
        self.host.alert(COPIED_MESSAGE).await;
        Ok(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{MemoryFile, SelectedFile};
    use crate::host::RecordingHost;
    use crate::live::Indicator;
    use scraper::{ElementRef, Html, Selector};
    use serde_json::json;
    use std::io;

    fn config(extra: serde_json::Value) -> Config {
        let mut value = json!({
            "title": "Testing",
            "subject": "Testing",
            "email": "foo@bar.com",
            "form_backend_url": "http://localhost:5000/submit",
            "enable_form_download": true,
            "instructions": "Questions? Mail <span class=\"email-placeholder\">us</span>.",
            "questions": [
                {"label": "Name", "name": "name", "type": "text", "required": true},
                {"label": "Message", "name": "message", "type": "textarea", "required": true},
            ],
        });
        for (k, v) in extra.as_object().unwrap() {
            value[k] = v.clone();
        }
        Config::from_value(value).unwrap()
    }

    fn app(config: Config) -> (ContactForm, Arc<RecordingHost>) {
        let host = Arc::new(RecordingHost::default());
        (ContactForm::new(config, host.clone()).unwrap(), host)
    }

    fn value_after_label(html: &str, name: &str) -> String {
        let document = Html::parse_document(html);
        let selector = Selector::parse(&format!(r#"label[for="{name}"]"#)).unwrap();
        let label = document.select(&selector).next().unwrap();
        label.next_siblings().find_map(ElementRef::wrap).unwrap().inner_html()
    }

    #[tokio::test]
    async fn test_download_exports_answers() {
        let (mut app, host) = app(config(json!({})));
        app.live_mut().set_text("name", "Ada").unwrap();
        app.live_mut().set_text("message", "hello").unwrap();

        let doc = app.download().await.unwrap();
        assert_eq!(value_after_label(&doc.html, "message"), "hello");
        assert_eq!(host.downloads(), [doc]);
        assert!(host.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_missing_required_aborts_both_actions() {
        let (mut app, host) = app(config(json!({})));
        app.live_mut().set_text("name", "  ").unwrap();

        assert!(matches!(app.submit().await, Err(FormError::Validation(_))));
        assert!(matches!(app.download().await, Err(FormError::Validation(_))));
        assert_eq!(app.live().indicator("name"), Some(Indicator::Failing));
        assert_eq!(host.alerts().len(), 2);
        assert!(host.downloads().is_empty());
    }

    #[tokio::test]
    async fn test_download_disabled() {
        let (mut app, host) = app(config(json!({"enable_form_download": false})));
        app.live_mut().set_text("name", "Ada").unwrap();
        app.live_mut().set_text("message", "hello").unwrap();

        assert!(!app.form().download_button.visible);
        assert!(matches!(app.download().await, Err(FormError::DownloadDisabled)));
        assert!(host.downloads().is_empty());
    }

    #[tokio::test]
    async fn test_image_upload_embedded() {
        let questions = json!({"questions": [
            {"label": "Photo", "name": "photo", "type": "file", "required": true},
        ]});
        let (mut app, _host) = app(config(questions));
        app.live_mut()
            .attach_files(
                "photo",
                vec![SelectedFile::new(MemoryFile::new(
                    "cat.png",
                    Some("image/png"),
                    vec![1, 2, 3],
                ))],
            )
            .unwrap();

        let doc = app.download().await.unwrap();
        let document = Html::parse_document(&doc.html);
        let img = Selector::parse("img").unwrap();
        let src = document.select(&img).next().unwrap().value().attr("src").unwrap();
        assert!(src.starts_with("data:image/"));
    }

    #[derive(Debug)]
    struct Unreadable;

    #[async_trait::async_trait]
    impl crate::encoding::FileSource for Unreadable {
        fn file_name(&self) -> &str {
            "gone.pdf"
        }

        fn mime_type(&self) -> Option<&str> {
            Some("application/pdf")
        }

        async fn read(&self) -> io::Result<Vec<u8>> {
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
        }
    }

    #[tokio::test]
    async fn test_file_read_failure_fails_download() {
        let questions = json!({"questions": [
            {"label": "Resume", "name": "resume", "type": "file", "required": true},
        ]});
        let (mut app, host) = app(config(questions));
        app.live_mut()
            .attach_files("resume", vec![SelectedFile::new(Unreadable)])
            .unwrap();

        assert!(matches!(app.download().await, Err(FormError::FileRead(_))));
        assert!(host.downloads().is_empty());
        assert!(host.alerts()[0].contains("gone.pdf"));
    }

    #[tokio::test]
    async fn test_submission_payload() {
        let questions = json!({"questions": [
            {"label": "Name", "name": "name", "type": "text", "required": true},
            {"label": "Country", "name": "country", "type": "selectbox", "required": true,
             "options": [
                {"label": "--Select all that apply--", "value": "",
                 "selected": true, "disabled": true},
                {"label": "USA", "value": "USA"},
                {"label": "Canada", "value": "CAN"},
             ],
             "custom": {"multiple": true}},
            {"label": "Photo", "name": "photo", "type": "file", "required": false},
        ]});
        let (mut app, _host) = app(config(questions));
        app.live_mut().set_text("name", "Ada").unwrap();
        app.live_mut().choose("country", "USA").unwrap();
        app.live_mut().choose("country", "CAN").unwrap();
        app.live_mut()
            .attach_files("photo", vec![SelectedFile::new(MemoryFile::new("a.png", None, vec![0]))])
            .unwrap();

        let submission = app.submit().await.unwrap();
        assert_eq!(submission.action, "http://localhost:5000/submit");
        assert_eq!(submission.encoding, FormEncoding::Multipart);
        let countries: Vec<_> = submission.values("country").collect();
        assert_eq!(
            countries,
            [&SubmittedValue::Text("USA".into()), &SubmittedValue::Text("CAN".into())]
        );
        assert_eq!(
            submission.values("photo").next(),
            Some(&SubmittedValue::File {
                file_name: "a.png".into(),
                mime: "application/octet-stream".into()
            })
        );
    }

    #[tokio::test]
    async fn test_ignored_uploads_not_submitted() {
        let questions = json!({
            "ignore_file_upload": true,
            "questions": [{"label": "Photo", "name": "photo", "type": "file", "required": false}],
        });
        let (mut app, _host) = app(config(questions));
        app.live_mut()
            .attach_files("photo", vec![SelectedFile::new(MemoryFile::new("a.png", None, vec![0]))])
            .unwrap();

        let submission = app.submit().await.unwrap();
        assert_eq!(submission.encoding, FormEncoding::UrlEncoded);
        assert!(submission.fields.is_empty());
    }

    #[tokio::test]
    async fn test_copy_email() {
        let (form, host) = app(config(json!({})));
        assert_eq!(form.copy_email().await.unwrap(), "foo@bar.com");
        assert_eq!(host.clipboard(), ["foo@bar.com"]);
        assert_eq!(host.alerts(), [COPIED_MESSAGE]);

        let (form, _host) = app(config(json!({"instructions": "No placeholder here"})));
        assert!(matches!(form.copy_email().await, Err(FormError::NothingToCopy)));
    }

    #[tokio::test]
    async fn test_boot_failure_shows_error_page() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"subject": "s", "email": "a@b.c", "questions": []}"#,
        )
        .unwrap();

        let host = Arc::new(RecordingHost::default());
        let startup = ContactForm::boot(
            &ConfigLoader::new(),
            &ConfigSource::File(dir.path().to_path_buf()),
            host,
        )
        .await
        .unwrap();

        match startup {
            Startup::Failed { error, view } => {
                assert!(matches!(error, ConfigurationError::MissingField("title")));
                assert!(view.is_error());
            }
            Startup::Ready(_) => panic!("expected failure"),
        }
    }
}
