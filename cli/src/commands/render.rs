//! Render command

use crate::output;
use anyhow::Context;
use contact_form::{ConfigLoader, ConfigSource, ContactForm, PageRenderer, RecordingHost, Startup};
use std::path::Path;
use std::sync::Arc;

/// Write the page for `source`. A broken configuration still renders the
/// error page, then fails the command.
pub async fn handle(source: &ConfigSource, out: Option<&Path>) -> anyhow::Result<()> {
    let host = Arc::new(RecordingHost::default());
    let startup = ContactForm::boot(&ConfigLoader::new(), source, host).await?;
    let (view, failure) = match startup {
        Startup::Ready(form) => (form.page(), None),
        Startup::Failed { error, view } => (view, Some(error)),
    };

    let html = PageRenderer::new()?.render(&view)?;
    match out {
        Some(path) => {
            tokio::fs::write(path, &html)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            if failure.is_none() {
                output::success(&format!("page written to {}", path.display()));
            }
        }
        None => print!("{html}"),
    }

    match failure {
        Some(error) => Err(anyhow::Error::new(error).context("configuration is unusable")),
        None => Ok(()),
    }
}
