//! Check command

use super::load_config;
use crate::output::{self, OutputFormat};
use colored::Colorize;
use contact_form::{synthesize, ConfigSource};

pub async fn handle(source: &ConfigSource, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(source).await?;
    let form = synthesize(&config);

    format.print(&config, || {
        output::success(&format!("{} is a valid configuration", source.describe()));
        output::field("title", &config.title);
        output::field("action", form.target.action());
        output::field("enctype", form.encoding.as_str());
        output::field(
            "download",
            if form.download_button.visible { "enabled" } else { "disabled" },
        );
        output::field("questions", config.questions.len());
        for question in &config.questions {
            let required = if question.required {
                "required".yellow()
            } else {
                "optional".normal()
            };
            println!(
                "    {:<20} {:<16} {}",
                question.name.bold(),
                question.kind.as_str(),
                required
            );
        }
    });
    Ok(())
}
