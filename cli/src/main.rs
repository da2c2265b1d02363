//! Contact Form CLI
//!
//! Command-line interface for checking, rendering and exporting contact forms.
//!
//! # Usage
//!
//! ```bash
//! contact-form --config site/config.json check
//! contact-form --config https://example.com/ render --out index.html
//! contact-form export --answers answers.json --file resume=cv.pdf --out-dir out/
//! contact-form serve --bind 0.0.0.0:8080
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "contact-form")]
#[command(version)]
#[command(about = "Contact Form Command Line Interface", long_about = None)]
struct Cli {
    /// Configuration path or URL
    #[arg(long, short, env = "CONTACT_FORM_CONFIG", default_value = "config.json")]
    config: String,

    /// Output format
    #[arg(long, short, default_value = "text")]
    format: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the configuration
    Check,
    /// Write the form page
    Render {
        /// Output file; stdout when omitted
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Fill the form from answers and write the response document
    Export {
        /// JSON object of field name to value or list of values
        #[arg(long, short)]
        answers: Option<PathBuf>,
        /// File attachment as `name=path`, repeatable
        #[arg(
            long = "file",
            value_name = "NAME=PATH",
            value_parser = commands::export::parse_attachment
        )]
        files: Vec<(String, PathBuf)>,
        /// Directory receiving the document
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Run the reference server
    Serve {
        #[arg(long, env = "CONTACT_FORM_BIND", default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
        /// Largest accepted submission in bytes
        #[arg(
            long,
            env = "CONTACT_FORM_BODY_LIMIT",
            default_value_t = contact_form_api::DEFAULT_BODY_LIMIT
        )]
        body_limit: usize,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let source = contact_form::ConfigSource::parse(&cli.config);
    tracing::debug!(
        source = %source.describe(),
        "contact-form v{}",
        env!("CARGO_PKG_VERSION")
    );

    let result = match cli.command {
        Commands::Check => commands::check::handle(&source, cli.format).await,
        Commands::Render { out } => commands::render::handle(&source, out.as_deref()).await,
        Commands::Export { answers, files, out_dir } => {
            let answers = answers.as_deref();
            commands::export::handle(&source, answers, files, &out_dir, cli.format).await
        }
        Commands::Serve { bind, body_limit } => {
            commands::serve::handle(source, bind, body_limit).await
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
