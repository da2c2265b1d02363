//! Validation Engine
//!
//! Runs on submit intent and on download intent with the same policy: every
//! required control must have a non-blank effective value. All indicators
//! are refreshed on every pass.

use crate::config::QuestionType;
use crate::error::ValidationFailure;
use crate::host::PageHost;
use crate::live::{FormSnapshot, Indicator, LiveForm, SnapshotEntry, SnapshotValue};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;

/// Action that triggered validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Submit,
    Download,
}

/// Verdict for one control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldVerdict {
    pub name: String,
    pub indicator: Indicator,
}

/// Required-field validation
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    missing_field_message: String,
}

impl ValidationEngine {
    pub fn new(missing_field_message: impl Into<String>) -> Self {
        Self {
            missing_field_message: missing_field_message.into(),
        }
    }

    /// Verdicts for every entry of a snapshot, in form order
    pub fn evaluate(&self, snapshot: &FormSnapshot) -> Vec<FieldVerdict> {
        snapshot
            .entries()
            .iter()
            .map(|entry| FieldVerdict {
                name: entry.name.clone(),
                indicator: if entry.required && is_blank(&entry.value) {
                    Indicator::Failing
                } else {
                    Indicator::Neutral
                },
            })
            .collect()
    }

    /// Snapshot the form, validate it and update the indicators.
    ///
    /// On failure the user is alerted and the action must be abandoned. On
    /// submit intent, passing forms are additionally checked against the
    /// constraints native input types enforce.
    pub async fn run(
        &self,
        live: &mut LiveForm,
        intent: Intent,
        host: &dyn PageHost,
    ) -> Result<FormSnapshot, ValidationFailure> {
        let snapshot = live.snapshot();
        let verdicts = self.evaluate(&snapshot);
        let indicators: Vec<Indicator> = verdicts.iter().map(|v| v.indicator).collect();
        live.apply_indicators(&indicators);

        let failing: Vec<String> = verdicts
            .into_iter()
            .filter(|v| v.indicator == Indicator::Failing)
            .map(|v| v.name)
            .collect();

        if !failing.is_empty() {
            tracing::info!(?intent, fields = ?failing, "required fields missing");
            host.alert(&self.missing_field_message).await;
            return Err(ValidationFailure {
                message: self.missing_field_message.clone(),
                fields: failing,
            });
        }

        if intent == Intent::Submit {
            if let Some((entry, reason)) = snapshot
                .entries()
                .iter()
                .find_map(|e| native_violation(e).map(|r| (e, r)))
            {
                let message = format!("{}: {}", entry.label.plain_text(), reason);
                tracing::info!(name = %entry.name, reason, "native constraint failed");
                host.alert(&message).await;
                return Err(ValidationFailure {
                    message,
                    fields: vec![entry.name.clone()],
                });
            }
        }

        Ok(snapshot)
    }
}

/// Effective value is empty or whitespace-only. A selection containing the
/// empty value counts as empty.
pub fn is_blank(value: &SnapshotValue) -> bool {
    match value {
        SnapshotValue::Text(text) => text.trim().is_empty(),
        SnapshotValue::Choice(values) => {
            values.is_empty()
                || values.iter().any(|v| v.is_empty())
                || values.iter().all(|v| v.trim().is_empty())
        }
        SnapshotValue::Files(files) => files.is_empty(),
    }
}

/// Constraint a browser enforces for the input type, checked on non-empty
/// text values only.
fn native_violation(entry: &SnapshotEntry) -> Option<&'static str> {
    let SnapshotValue::Text(text) = &entry.value else {
        return None;
    };
    let value = text.trim();
    if value.is_empty() {
        return None;
    }

    let valid = match entry.kind {
        QuestionType::Email => email_pattern().is_match(value),
        QuestionType::Number => value.parse::<f64>().is_ok(),
        QuestionType::Url => url::Url::parse(value).is_ok(),
        QuestionType::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
        QuestionType::Time => ["%H:%M", "%H:%M:%S"]
            .iter()
            .any(|f| NaiveTime::parse_from_str(value, f).is_ok()),
        QuestionType::DatetimeLocal => ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"]
            .iter()
            .any(|f| NaiveDateTime::parse_from_str(value, f).is_ok()),
        QuestionType::File
        | QuestionType::Selectbox
        | QuestionType::Tel
        | QuestionType::Text
        | QuestionType::Textarea => true,
    };

    if valid {
        None
    } else {
        Some(match entry.kind {
            QuestionType::Email => "please enter an email address",
            QuestionType::Number => "please enter a number",
            QuestionType::Url => "please enter a URL",
            QuestionType::Date => "please enter a valid date",
            QuestionType::Time => "please enter a valid time",
            _ => "please enter a valid date and time",
        })
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("valid email pattern"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::form::synthesize;
    use crate::host::RecordingHost;
    use serde_json::json;

    fn live(questions: serde_json::Value) -> LiveForm {
        let config = Config::from_value(json!({
            "title": "Testing",
            "subject": "Testing",
            "email": "foo@bar.com",
            "questions": questions,
        }))
        .unwrap();
        LiveForm::new(&synthesize(&config))
    }

    fn engine() -> ValidationEngine {
        ValidationEngine::new("Please fill out all required fields.")
    }

    #[tokio::test]
    async fn test_whitespace_only_fails() {
        let host = RecordingHost::default();
        let mut form = live(json!([
            {"label": "Name", "name": "name", "type": "text", "required": true},
            {"label": "Notes", "name": "notes", "type": "textarea", "required": false},
        ]));
        form.set_text("name", "   \n").unwrap();

        for intent in [Intent::Submit, Intent::Download] {
            let err = engine().run(&mut form, intent, &host).await.unwrap_err();
            assert_eq!(err.fields, ["name"]);
        }
        assert_eq!(form.indicator("name"), Some(Indicator::Failing));
        assert_eq!(form.indicator("notes"), Some(Indicator::Neutral));
        assert_eq!(host.alerts(), ["Please fill out all required fields."; 2]);
    }

    #[tokio::test]
    async fn test_filling_clears_indicator() {
        let host = RecordingHost::default();
        let mut form = live(json!([
            {"label": "Name", "name": "name", "type": "text", "required": true},
        ]));
        assert!(engine().run(&mut form, Intent::Submit, &host).await.is_err());
        assert_eq!(form.indicator("name"), Some(Indicator::Failing));

        form.set_text("name", "Ada").unwrap();
        let snapshot = engine().run(&mut form, Intent::Submit, &host).await.unwrap();
        assert_eq!(form.indicator("name"), Some(Indicator::Neutral));
        assert_eq!(snapshot.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_placeholder_selection_counts_as_empty() {
        let host = RecordingHost::default();
        let mut form = live(json!([{
            "label": "Country", "name": "country", "type": "selectbox", "required": true,
            "options": [
                {"label": "--Select--", "value": "", "selected": true, "disabled": true},
                {"label": "USA", "value": "USA"},
            ],
            "custom": {"multiple": true},
        }]));
        assert!(engine().run(&mut form, Intent::Download, &host).await.is_err());

        form.choose("country", "USA").unwrap();
        assert!(engine().run(&mut form, Intent::Download, &host).await.is_ok());
    }

    #[tokio::test]
    async fn test_required_file_needs_selection() {
        let host = RecordingHost::default();
        let mut form = live(json!([
            {"label": "Upload", "name": "upload", "type": "file", "required": true},
        ]));
        let err = engine().run(&mut form, Intent::Download, &host).await.unwrap_err();
        assert_eq!(err.fields, ["upload"]);
    }

    #[tokio::test]
    async fn test_native_validity_on_submit_only() {
        let host = RecordingHost::default();
        let mut form = live(json!([
            {"label": "Email", "name": "email", "type": "email", "required": true},
        ]));
        form.set_text("email", "not-an-address").unwrap();

        let err = engine().run(&mut form, Intent::Submit, &host).await.unwrap_err();
        assert_eq!(err.fields, ["email"]);
        assert!(err.message.starts_with("Email:"));

        assert!(engine().run(&mut form, Intent::Download, &host).await.is_ok());

        form.set_text("email", "foo@bar.com").unwrap();
        assert!(engine().run(&mut form, Intent::Submit, &host).await.is_ok());
    }

    #[test]
    fn test_native_formats() {
        let entry = |kind, text: &str| SnapshotEntry {
            name: "f".into(),
            label: crate::markup::Markup::trusted("F"),
            kind,
            required: false,
            value: SnapshotValue::Text(text.into()),
        };
        assert!(native_violation(&entry(QuestionType::Number, "42")).is_none());
        assert!(native_violation(&entry(QuestionType::Number, "forty")).is_some());
        assert!(native_violation(&entry(QuestionType::Date, "2000-01-01")).is_none());
        assert!(native_violation(&entry(QuestionType::Time, "12:00")).is_none());
        let local = entry(QuestionType::DatetimeLocal, "2000-01-01T12:00");
        assert!(native_violation(&local).is_none());
        assert!(native_violation(&entry(QuestionType::Url, "http://example.com")).is_none());
        assert!(native_violation(&entry(QuestionType::Url, "example")).is_some());
        assert!(native_violation(&entry(QuestionType::Tel, "18005554444")).is_none());
    }
}
