mod config;
mod encoder;
mod errors;
mod form;
mod identity;
mod picker;
mod session;
mod submission;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::encoder::FsEncoder;
use crate::errors::Notice;
use crate::form::FormState;
use crate::identity::FileIdentityStore;
use crate::picker::PathSelector;
use crate::session::SessionManager;
use crate::submission::WebhookClient;

#[derive(Parser)]
#[command(name = "submitter")]
#[command(about = "Upload your resume and customize it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print this installation's session ID, creating it on first use
    Session,
    /// Send a resume with keywords and instructions to the rewrite webhook
    Submit {
        /// Resume file (PDF, DOC, or DOCX)
        #[arg(long)]
        resume: Option<PathBuf>,
        /// Keywords to include in the resume (comma-separated)
        #[arg(long, default_value = "")]
        keywords: String,
        /// Specific instructions or requirements
        #[arg(long, default_value = "")]
        instructions: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting resume submitter v{}", env!("CARGO_PKG_VERSION"));

    let store = FileIdentityStore::new(config.store_path.clone());
    info!("Identity store: {:?}", store.path());
    let mut sessions = SessionManager::new(Arc::new(store));
    let session_id = sessions.ensure_session_id().await;

    match cli.command {
        Commands::Session => {
            println!("{session_id}");
            if !sessions.is_persistent() {
                eprintln!("warning: session ID could not be saved and will change on next run");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Submit {
            resume,
            keywords,
            instructions,
        } => {
            let client = WebhookClient::new(config.webhook_url.clone(), config.request_timeout)
                .context("Failed to build HTTP client")?;
            info!("Webhook: {}", client.url());

            println!("Session ID: {session_id}");

            let mut form = FormState::new();
            form.set_keywords(keywords);
            form.set_instructions(instructions);

            if let Some(path) = resume {
                if let Err(e) = form.pick_resume(&PathSelector::new(path)).await {
                    show(&e.notice());
                    return Ok(ExitCode::FAILURE);
                }
            }
            if let Some(file) = form.resume() {
                println!("\u{2713} {} ({})", file.name, file.display_size());
            }
            println!("Keywords: {}", form.keywords().trim());
            if !form.instructions().trim().is_empty() {
                println!("Instructions: {}", form.instructions().trim());
            }

            println!("Submitting...");
            match form.submit(&session_id, &FsEncoder, &client).await {
                Ok(()) => {
                    show(&Notice::success());
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    show(&e.notice());
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

fn show(notice: &Notice) {
    println!("{}: {}", notice.title, notice.message);
}
