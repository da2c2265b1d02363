//! Snapshot Generator
//!
//! Renders a resolved form into a standalone HTML document. Uploaded files
//! travel inside the document as data URIs, so the export needs no server.

use crate::encoding::{EncodedFileRef, MediaKind, ResolvedForm, ResolvedValue};
use crate::error::Result;
use crate::markup::escape;
use handlebars::Handlebars;
use serde::Serialize;

/// File name of every exported document
pub const EXPORT_FILE_NAME: &str = "contact_form_response.html";

/// Completed export, ready to hand to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDocument {
    pub file_name: String,
    pub html: String,
}

/// Response document renderer
pub struct SnapshotGenerator {
    handlebars: Handlebars<'static>,
}

#[derive(Serialize)]
struct DocumentData<'a> {
    title: &'a str,
    fields: Vec<FieldData>,
}

#[derive(Serialize)]
struct FieldData {
    name: String,
    label: String,
    value: String,
}

impl SnapshotGenerator {
    pub fn new() -> Result<Self> {
        let mut hb = Handlebars::new();
        hb.set_strict_mode(true);
        hb.register_template_string("response", RESPONSE_TEMPLATE)?;
        Ok(Self { handlebars: hb })
    }

    /// Render the response document for a resolved form
    pub fn render(&self, title: &str, form: &ResolvedForm) -> Result<ExportedDocument> {
        let fields = form
            .entries
            .iter()
            .map(|entry| FieldData {
                name: entry.name.clone(),
                label: entry.label.as_str().to_string(),
                value: value_markup(&entry.name, &entry.value),
            })
            .collect();

        let html = self.handlebars.render(
            "response",
            &DocumentData {
                title,
                fields,
            },
        )?;

        tracing::info!(
            fields = form.entries.len(),
            files = form.file_count(),
            bytes = html.len(),
            "response document generated"
        );

        Ok(ExportedDocument {
            file_name: EXPORT_FILE_NAME.to_string(),
            html,
        })
    }
}

/// Markup for one field value: plain values escaped, files embedded
pub fn value_markup(name: &str, value: &ResolvedValue) -> String {
    match value {
        ResolvedValue::Text(text) => escape(text),
        ResolvedValue::Choice(values) => escape(&values.join(", ")),
        ResolvedValue::Files(refs) => refs
            .iter()
            .map(|r| embed(name, r))
            .collect::<Vec<_>>()
            .join("<br>"),
    }
}

/// Element embedding one encoded file, chosen by its MIME type
pub fn embed(name: &str, file: &EncodedFileRef) -> String {
    let src = escape(&file.data_uri());
    let mime = escape(&file.mime);
    match file.media_kind() {
        MediaKind::Image => format!(r#"<img src="{src}" alt="{}">"#, escape(&file.file_name)),
        MediaKind::Video => format!(
            concat!(
                r#"<video controls><source src="{src}" type="{mime}">"#,
                "Your browser does not support the video tag.</video>"
            ),
            src = src,
            mime = mime,
        ),
        MediaKind::Audio => format!(
            concat!(
                r#"<audio controls><source src="{src}" type="{mime}">"#,
                "Your browser does not support the audio tag.</audio>"
            ),
            src = src,
            mime = mime,
        ),
        MediaKind::Other => format!(
            r#"<a href="{src}" download="{}">{}</a>"#,
            escape(&file.file_name),
            escape(name)
        ),
    }
}

const RESPONSE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Contact Form Response</title>
<style>
body {
  background-color: #1e1e1e; color: #e0e0e0;
  font-family: Arial, sans-serif; margin: 0; padding: 20px;
}
.container {
  width: 600px; margin: 0 auto; background-color: #2b2b2b;
  padding: 20px; border-radius: 8px;
}
h1, h2 { text-align: center; }
label { display: block; font-weight: bold; margin-top: 16px; }
p { margin: 4px 0 0 0; white-space: pre-wrap; word-wrap: break-word; }
img, video { max-width: 100%; }
a { color: #4ea1ff; }
</style>
</head>
<body>
<div class="container">
<h1>Contact Form Response</h1>
<h2>{{title}}</h2>
{{#each fields}}
<label for="{{name}}">{{{label}}}</label>
<p>{{{value}}}</p>
{{/each}}
</div>
</body>
</html>
"#;
