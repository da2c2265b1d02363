//! Export command
//!
//! Fills the form the way a user would, then runs the download action.

use super::load_config;
use crate::output::{self, OutputFormat};
use anyhow::{bail, Context};
use contact_form::{ConfigSource, ContactForm, DirectoryHost, DiskFile, SelectedFile, Widget};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Serialize)]
struct ExportSummary {
    path: PathBuf,
    bytes: usize,
}

/// Parse a `name=path` attachment argument
pub fn parse_attachment(arg: &str) -> Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got `{arg}`")),
    }
}

pub async fn handle(
    source: &ConfigSource,
    answers: Option<&Path>,
    files: Vec<(String, PathBuf)>,
    out_dir: &Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let config = load_config(source).await?;
    let answers = match answers {
        Some(path) => read_answers(path).await?,
        None => Map::new(),
    };

    let mut form = ContactForm::new(config, Arc::new(DirectoryHost::new(out_dir)))?;
    fill(&mut form, &answers)?;
    attach(&mut form, files)?;

    let document = form.download().await.context("export failed")?;
    let summary = ExportSummary {
        path: out_dir.join(&document.file_name),
        bytes: document.html.len(),
    };
    format.print(&summary, || {
        output::success(&format!("response written to {}", summary.path.display()));
        output::field("bytes", summary.bytes);
    });
    Ok(())
}

async fn read_answers(path: &Path) -> anyhow::Result<Map<String, Value>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading answers from {}", path.display()))?;
    match serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))? {
        Value::Object(map) => Ok(map),
        _ => bail!("answers must be a JSON object of field names to values"),
    }
}

/// Apply answers: selections are chosen option by option, everything else is
/// typed in.
fn fill(form: &mut ContactForm, answers: &Map<String, Value>) -> anyhow::Result<()> {
    for (name, value) in answers {
        let is_select = match form.form().field(name) {
            Some(field) => matches!(field.widget, Widget::Select(_)),
            None => bail!("unknown field `{name}` in answers"),
        };
        let values: Vec<String> = match value {
            Value::Array(items) => items.iter().map(plain).collect(),
            other => vec![plain(other)],
        };

        let live = form.live_mut();
        if is_select {
            for value in &values {
                live.choose(name, value)?;
            }
        } else {
            live.set_text(name, values.join(", "))?;
        }
    }
    Ok(())
}

fn attach(form: &mut ContactForm, files: Vec<(String, PathBuf)>) -> anyhow::Result<()> {
    let mut grouped: Vec<(String, Vec<SelectedFile>)> = Vec::new();
    for (name, path) in files {
        if !path.is_file() {
            bail!("attachment {} for `{name}` is not a file", path.display());
        }
        let file = SelectedFile::new(DiskFile::new(&path));
        match grouped.iter_mut().find(|(n, _)| *n == name) {
            Some((_, list)) => list.push(file),
            None => grouped.push((name, vec![file])),
        }
    }
    for (name, list) in grouped {
        form.live_mut().attach_files(&name, list)?;
    }
    Ok(())
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
