use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use submit_store::constants::DEFAULT_STORAGE_DIR;
use submit_store::metadata::{self, MetadataRecord};
use submit_store::{max_upload_bytes_from_env_value, StoreConfig, SubmissionId, SubmissionStore};
use tokio::io::AsyncWriteExt;

#[derive(Parser)]
#[command(name = "submit")]
#[command(about = "Offline access to a submission store")]
struct Cli {
    /// Storage root holding `uploads/` and `metadata/`
    #[arg(long, env = "SUBMIT_STORAGE_DIR", default_value = DEFAULT_STORAGE_DIR)]
    storage_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all submissions
    List,
    /// Store a text submission
    Text {
        text: String,
        /// Metadata as a JSON object
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Store a file
    Add {
        path: PathBuf,
        /// Metadata as a JSON object
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Print a submission's metadata
    Show { id: String },
    /// Write a submission's content to stdout
    Cat { id: String },
    /// Merge keys into a submission's metadata
    Tag {
        id: String,
        /// Keys to merge, as a JSON object
        update: String,
    },
    /// Search metadata (case-insensitive substring)
    Search {
        query: String,
        /// Only compare this key
        #[arg(long)]
        field: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let max_upload_bytes =
        max_upload_bytes_from_env_value(std::env::var("SUBMIT_MAX_UPLOAD_BYTES").ok())?;
    let store = SubmissionStore::new(Arc::new(StoreConfig::new(
        cli.storage_dir,
        max_upload_bytes,
    )?));
    store.ensure_directories().await?;

    match cli.command {
        Commands::List => {
            let uploads = store.list().await?;
            if uploads.is_empty() {
                println!("No submissions found.");
            }
            for upload in uploads {
                let name = upload
                    .metadata
                    .as_ref()
                    .and_then(metadata::original_filename)
                    .unwrap_or("-");
                println!("{}\t{}", upload.id, name);
            }
        }
        Commands::Text { text, metadata } => {
            let receipt = store
                .submit_text(&text, parse_metadata(metadata.as_deref())?)
                .await?;
            println!("Stored text as {}", receipt.id);
        }
        Commands::Add { path, metadata } => {
            let content = tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let name = path.file_name().and_then(|n| n.to_str());
            let content_type = infer::get(&content).map(|kind| kind.mime_type());
            let record = parse_metadata(metadata.as_deref())?.unwrap_or_default();

            let receipt = store
                .submit_content(&content, name, content_type, Some(record))
                .await?;
            println!("Stored {} ({} bytes) as {}", path.display(), receipt.size, receipt.id);
        }
        Commands::Show { id } => {
            let id = SubmissionId::parse(&id)?;
            let record = store.get_metadata(&id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Cat { id } => {
            let id = SubmissionId::parse(&id)?;
            let content = store.get_content(&id).await?;
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&content).await?;
            stdout.flush().await?;
        }
        Commands::Tag { id, update } => {
            let id = SubmissionId::parse(&id)?;
            let update: Value =
                serde_json::from_str(&update).context("update must be valid JSON")?;
            let merged = store.update_metadata(&id, update).await?;
            println!("{}", serde_json::to_string_pretty(&merged)?);
        }
        Commands::Search { query, field } => {
            let hits = store.search(&query, field.as_deref()).await?;
            println!("{} match(es)", hits.len());
            for hit in hits {
                println!("{}\t{}", hit.id, Value::Object(hit.metadata));
            }
        }
    }

    Ok(())
}

/// Strict for the CLI: malformed metadata is reported instead of being dropped.
fn parse_metadata(raw: Option<&str>) -> anyhow::Result<Option<MetadataRecord>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match serde_json::from_str(raw).context("metadata must be valid JSON")? {
        Value::Object(map) => Ok(Some(map)),
        _ => anyhow::bail!("metadata must be a JSON object"),
    }
}
