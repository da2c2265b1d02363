//! Form Synthesizer
//!
//! Turns the ordered `questions` of a [`Config`] into labelled controls, one
//! per question, followed by the send and download buttons.

use crate::config::{Config, Question, QuestionType, SelectOption};
use crate::markup::{escape, Markup};
use regex::Regex;
use std::fmt::Write;
use std::sync::OnceLock;

pub const FORM_ID: &str = "contact-form";
pub const SEND_BUTTON_ID: &str = "send_button";
pub const DOWNLOAD_BUTTON_ID: &str = "download_button";
/// Side-channel attribute carrying the plain label text
pub const LABEL_ATTRIBUTE: &str = "data-label";
/// Rows hint for multi-line controls
pub const TEXTAREA_ROWS: u32 = 4;
const EMAIL_PLACEHOLDER_CLASS: &str = "email-placeholder";

/// Synthesized form
#[derive(Debug, Clone)]
pub struct Form {
    pub title: String,
    pub instructions: Option<Markup>,
    pub target: SubmissionTarget,
    pub encoding: FormEncoding,
    pub fields: Vec<Field>,
    pub send_button: Button,
    pub download_button: Button,
    /// Email copied by the placeholders in the instructions
    pub email: Option<String>,
    /// Number of email placeholders found in the instructions
    pub email_placeholders: usize,
}

/// Where the form submits to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionTarget {
    Backend(String),
    Mailto { address: String, subject: String },
}

impl SubmissionTarget {
    /// Value of the form's `action` attribute
    pub fn action(&self) -> String {
        match self {
            Self::Backend(url) => url.clone(),
            Self::Mailto { address, subject } => {
                format!("mailto:{}?subject={}", address, urlencoding::encode(subject))
            }
        }
    }
}

/// Form `enctype`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEncoding {
    Multipart,
    UrlEncoded,
}

impl FormEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Multipart => "multipart/form-data",
            Self::UrlEncoded => "application/x-www-form-urlencoded",
        }
    }
}

/// Ordered attribute list; setting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.0 {
            if value.is_empty() {
                let _ = write!(out, " {}", escape(key));
            } else {
                let _ = write!(out, " {}=\"{}\"", escape(key), escape(value));
            }
        }
        out
    }
}

/// Control kind, selected by question type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Widget {
    /// Single-line `<input>` with the question type passed through
    Input(QuestionType),
    TextArea,
    Select(Vec<SelectOption>),
}

/// One labelled control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub kind: QuestionType,
    pub label: Markup,
    pub widget: Widget,
    pub attributes: Attributes,
}

impl Field {
    /// Submission key. Custom attributes may override it.
    pub fn name(&self) -> &str {
        self.attributes.get("name").unwrap_or_default()
    }

    /// Element id the label points at; falls back to the name.
    pub fn id(&self) -> &str {
        self.attributes.get("id").unwrap_or_else(|| self.name())
    }

    pub fn is_required(&self) -> bool {
        self.attributes.contains("required")
    }

    pub fn is_multiple(&self) -> bool {
        self.attributes.contains("multiple")
    }

    fn render(&self, out: &mut String) {
        let _ = writeln!(out, "<label for=\"{}\">{}</label>", escape(self.id()), self.label);
        let attrs = self.attributes.render();
        match &self.widget {
            Widget::Input(_) => {
                let _ = writeln!(out, "<input{attrs}>");
            }
            Widget::TextArea => {
                let _ = writeln!(out, "<textarea{attrs}></textarea>");
            }
            Widget::Select(options) => {
                let _ = writeln!(out, "<select{attrs}>");
                for option in options {
                    let _ = writeln!(
                        out,
                        "  <option value=\"{}\"{}{}>{}</option>",
                        escape(&option.value),
                        if option.is_selected() { " selected=\"selected\"" } else { "" },
                        if option.is_disabled() { " disabled" } else { "" },
                        escape(&option.label),
                    );
                }
                let _ = writeln!(out, "</select>");
            }
        }
        out.push_str("<br>\n");
    }
}

/// Send or download button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub id: &'static str,
    pub text: String,
    pub visible: bool,
}

/// Build the form for a configuration. Question order is preserved.
pub fn synthesize(config: &Config) -> Form {
    let fields: Vec<Field> = config.questions.iter().map(build_field).collect();

    let target = match (&config.form_backend_url, &config.email) {
        (Some(url), _) => SubmissionTarget::Backend(url.clone()),
        (None, Some(address)) => SubmissionTarget::Mailto {
            address: address.clone(),
            subject: config.subject.clone(),
        },
        // rejected by config validation
        (None, None) => SubmissionTarget::Backend(String::new()),
    };

    let encoding = if config.has_file_questions() && !config.ignores_file_upload() {
        FormEncoding::Multipart
    } else {
        FormEncoding::UrlEncoded
    };

    let (instructions, email_placeholders) = match (&config.instructions, &config.email) {
        (Some(markup), Some(email)) => {
            let (filled, count) = fill_email_placeholders(markup, email);
            (Some(filled), count)
        }
        (instructions, _) => (instructions.clone(), 0),
    };

    tracing::info!(
        title = %config.title,
        fields = fields.len(),
        action = %target.action(),
        enctype = encoding.as_str(),
        "form synthesized"
    );

    Form {
        title: config.title.clone(),
        instructions,
        target,
        encoding,
        fields,
        send_button: Button {
            id: SEND_BUTTON_ID,
            text: config.send_button_text().to_string(),
            visible: true,
        },
        download_button: Button {
            id: DOWNLOAD_BUTTON_ID,
            text: config.download_button_text().to_string(),
            visible: config.downloads_enabled(),
        },
        email: config.email.clone(),
        email_placeholders,
    }
}

fn build_field(question: &Question) -> Field {
    let (widget, mut attributes) = match question.kind {
        QuestionType::Textarea => textarea(),
        QuestionType::Selectbox => selectbox(question),
        QuestionType::Date
        | QuestionType::DatetimeLocal
        | QuestionType::Email
        | QuestionType::File
        | QuestionType::Number
        | QuestionType::Tel
        | QuestionType::Text
        | QuestionType::Time
        | QuestionType::Url => input(question.kind),
    };

    attributes.set("id", question.name.as_str());
    attributes.set("name", question.name.as_str());
    attributes.set(LABEL_ATTRIBUTE, question.label.plain_text());
    if question.required {
        attributes.set("required", "");
    }
    for (key, value) in question.custom.iter().flatten() {
        attributes.set(key.as_str(), attribute_value(value));
    }

    Field {
        kind: question.kind,
        label: question.label.clone(),
        widget,
        attributes,
    }
}

fn input(kind: QuestionType) -> (Widget, Attributes) {
    let mut attributes = Attributes::default();
    attributes.set("type", kind.as_str());
    (Widget::Input(kind), attributes)
}

fn textarea() -> (Widget, Attributes) {
    let mut attributes = Attributes::default();
    attributes.set("rows", TEXTAREA_ROWS.to_string());
    (Widget::TextArea, attributes)
}

fn selectbox(question: &Question) -> (Widget, Attributes) {
    let options = question.options.clone().unwrap_or_default();
    (Widget::Select(options), Attributes::default())
}

fn attribute_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Replace the text of every `email-placeholder` element with the address and
/// tag it for click-to-copy. The whole element content, nested markup
/// included, is replaced up to the element's own closing tag.
fn fill_email_placeholders(markup: &Markup, email: &str) -> (Markup, usize) {
    let source = markup.as_str();
    let email = escape(email);
    let mut out = String::with_capacity(source.len());
    let mut count = 0;
    let mut copied = 0;
    let mut search = 0;

    while let Some(caps) = tag_pattern().captures_at(source, search) {
        let Some(open) = caps.get(0) else { break };
        search = open.end();

        let (name, attrs) = (&caps[2], &caps[3]);
        if &caps[1] == "/" || attrs.trim_end().ends_with('/') || !has_placeholder_class(attrs) {
            continue;
        }
        let Some(close_end) = closing_tag_end(source, open.end(), name) else {
            continue;
        };

        out.push_str(&source[copied..open.start()]);
        let _ = write!(out, "<{name}{attrs} data-copy=\"{email}\">{email}</{name}>");
        copied = close_end;
        search = close_end;
        count += 1;
    }

    out.push_str(&source[copied..]);
    (Markup::trusted(out), count)
}

/// Opening or closing tag: slash, name, attribute text
fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9]*)((?:\s[^>]*)?)>").expect("valid tag pattern")
    })
}

/// Whether `class` lists the placeholder class as a whole token
fn has_placeholder_class(attrs: &str) -> bool {
    static CLASS: OnceLock<Regex> = OnceLock::new();
    let class = CLASS.get_or_init(|| {
        Regex::new(r#"(?i)(?:^|\s)class\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
            .expect("valid class pattern")
    });
    class.captures_iter(attrs).any(|caps| {
        caps.iter()
            .skip(1)
            .flatten()
            .any(|m| m.as_str().split_whitespace().any(|t| t == EMAIL_PLACEHOLDER_CLASS))
    })
}

/// End offset of the tag closing the `name` element opened before `from`,
/// skipping nested elements of the same name.
fn closing_tag_end(source: &str, from: usize, name: &str) -> Option<usize> {
    let mut depth = 0usize;
    for caps in tag_pattern().captures_iter(&source[from..]) {
        if !caps[2].eq_ignore_ascii_case(name) {
            continue;
        }
        let tag = caps.get(0)?;
        if &caps[1] == "/" {
            if depth == 0 {
                return Some(from + tag.end());
            }
            depth -= 1;
        } else if !caps[3].trim_end().ends_with('/') {
            depth += 1;
        }
    }
    None
}

impl Form {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().rev().find(|f| f.name() == name)
    }

    /// Render the `<form>` element
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "<form id=\"{}\" action=\"{}\" method=\"post\" enctype=\"{}\">",
            FORM_ID,
            escape(&self.target.action()),
            self.encoding.as_str(),
        );
        for field in &self.fields {
            field.render(&mut out);
        }
        let _ = writeln!(
            out,
            "<button id=\"{}\" type=\"submit\">{}</button>",
            self.send_button.id,
            escape(&self.send_button.text),
        );
        let _ = writeln!(
            out,
            "<button id=\"{}\" type=\"button\"{}>{}</button>",
            self.download_button.id,
            if self.download_button.visible { "" } else { " hidden disabled" },
            escape(&self.download_button.text),
        );
        out.push_str("</form>\n");
        out
    }
}
