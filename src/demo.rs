use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use file_search_console::application::{
    CatalogService, ChatService, PollPolicy, Session, UploadService,
};
use file_search_console::infrastructure::{connect, AppConfig};

/// Command-line walkthrough of the file search workflow.
#[derive(Debug, Parser)]
#[command(name = "demo", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a store, upload one file into it and ask a question.
    Upload {
        /// File to import.
        file: PathBuf,
        #[arg(long, default_value = "demo-store")]
        store_name: String,
        /// Name shown in citations; defaults to the file name.
        #[arg(long)]
        display_name: Option<String>,
        /// Seconds between operation polls.
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
        poll_seconds: u64,
        #[arg(long, default_value = "Can you summarize this document?")]
        question: String,
    },
    /// Ask a question against the first store of the account.
    Ask { question: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "demo=info,file_search_console=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    let api = connect(&config)?;
    let catalog = Arc::new(CatalogService::new(
        api.clone(),
        config.cache_ttl(),
        config.config.pagination.page_size,
    ));
    let chat = ChatService::new(api.clone());
    let mut session = Session::new();

    let (store, question) = match cli.command {
        Command::Upload {
            file,
            store_name,
            display_name,
            poll_seconds,
            question,
        } => {
            let store = catalog.create_store(&store_name).await?;
            info!(store = %store.name, "store created");

            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("cannot read {}", file.display()))?;
            let display_name = match display_name {
                Some(name) => name,
                None => file
                    .file_name()
                    .and_then(|n| n.to_str())
                    .context("file has no usable name")?
                    .to_string(),
            };

            let timeout = config.config.upload.poll_policy().timeout;
            let uploads = UploadService::new(api, catalog.clone())
                .with_policy(PollPolicy::new(Duration::from_secs(poll_seconds), timeout));
            let operation = uploads.upload(&store.name, &bytes, &display_name).await?;
            info!(
                operation = %operation.name,
                document = operation.document_name.as_deref().unwrap_or("-"),
                "import finished"
            );
            (store.name, question)
        }
        Command::Ask { question } => {
            let store = catalog
                .list_stores()
                .await?
                .into_iter()
                .next()
                .context("no file search stores in this account")?;
            info!(store = %store.name, display_name = %store.display_name, "using first store");
            (store.name, question)
        }
    };

    let answer = chat.query(&mut session, &store, &question).await?;
    println!("{answer}");
    Ok(())
}
