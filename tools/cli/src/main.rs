//! JamTalk vault CLI - inspect and maintain the local encrypted store.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use jamtalk_common::Bucket;
use jamtalk_vault::{Storage, StorageConfig};

#[derive(Parser)]
#[command(name = "jamtalk-vault")]
#[command(about = "JamTalk - local encrypted storage maintenance")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Database file (default: <data dir>/jamtalk/vault.db).
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up a vault protecting the sensitive buckets with a PIN.
    Init,

    /// Show vault state and record counts.
    Status,

    /// Write a JSON value.
    Set {
        bucket: Bucket,
        key: String,
        /// Value as JSON, e.g. '{"name":"Ann"}'.
        value: String,
    },

    /// Print a value as JSON.
    Get { bucket: Bucket, key: String },

    /// Print every readable value in a bucket.
    List { bucket: Bucket },

    /// Delete a record.
    Remove { bucket: Bucket, key: String },

    /// Delete every record in a bucket.
    Clear { bucket: Bucket },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let storage = open_storage(cli.db)?;

    let result = match cli.command {
        Commands::Init => cmd_init(&storage).await,
        Commands::Status => cmd_status(&storage).await,
        Commands::Set { bucket, key, value } => cmd_set(&storage, bucket, &key, &value).await,
        Commands::Get { bucket, key } => cmd_get(&storage, bucket, &key).await,
        Commands::List { bucket } => cmd_list(&storage, bucket).await,
        Commands::Remove { bucket, key } => cmd_remove(&storage, bucket, &key).await,
        Commands::Clear { bucket } => cmd_clear(&storage, bucket).await,
    };

    storage.close().await.context("Failed to close storage")?;
    result
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jamtalk")
        .join("vault.db")
}

fn open_storage(db: Option<PathBuf>) -> Result<Storage> {
    let path = db.unwrap_or_else(default_db_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    info!(path = %path.display(), "Using database");
    Storage::open(&StorageConfig::sqlite(path)).context("Failed to open storage")
}

/// Prompt for the PIN securely.
fn prompt_pin(prompt: &str) -> Result<String> {
    rpassword::prompt_password(prompt).context("Failed to read PIN")
}

/// Unlock when the bucket is sensitive and a vault exists.
async fn unlock_for(storage: &Storage, bucket: Bucket) -> Result<()> {
    if !storage.policy().is_sensitive(bucket) || !storage.vault_configured().await? {
        return Ok(());
    }

    let pin = prompt_pin("Enter PIN: ")?;
    storage
        .unlock_with_stored_salt(&pin)
        .await
        .context("Failed to unlock vault")
}

fn report_auth_failures(storage: &Storage) {
    if storage.auth_failures() > 0 {
        eprintln!(
            "{} record(s) could not be decrypted: the vault may be corrupted or the PIN incorrect.",
            storage.auth_failures()
        );
    }
}

async fn cmd_init(storage: &Storage) -> Result<()> {
    if storage.vault_configured().await? {
        anyhow::bail!("A vault is already configured");
    }

    let pin = prompt_pin("Choose PIN: ")?;
    let confirm = prompt_pin("Confirm PIN: ")?;
    if pin != confirm {
        anyhow::bail!("PINs do not match");
    }
    if pin.is_empty() {
        anyhow::bail!("PIN cannot be empty");
    }

    storage
        .setup_vault(&pin)
        .await
        .context("Failed to set up vault")?;

    let sensitive: Vec<&str> = storage
        .policy()
        .sensitive_buckets()
        .map(|b| b.as_str())
        .collect();
    println!("Vault created. Encrypted buckets: {}", sensitive.join(", "));
    Ok(())
}

async fn cmd_status(storage: &Storage) -> Result<()> {
    match storage.vault_meta().await? {
        Some(meta) => {
            let created = meta
                .created_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "unknown".to_string());
            println!("Vault: configured, {:?} (created {})", storage.state(), created);
        }
        None => println!("Vault: not configured"),
    }

    println!("Records:");
    for bucket in Bucket::ALL {
        let marker = if storage.policy().is_sensitive(bucket) {
            " [encrypted]"
        } else {
            ""
        };
        println!("  {:<12} {}{}", bucket.as_str(), storage.count(bucket).await?, marker);
    }
    Ok(())
}

async fn cmd_set(storage: &Storage, bucket: Bucket, key: &str, value: &str) -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(value).context("Value is not valid JSON")?;

    unlock_for(storage, bucket).await?;
    storage
        .set_item(bucket, key, &value)
        .await
        .context("Failed to write record")?;

    println!("Stored {}/{}", bucket, key);
    Ok(())
}

async fn cmd_get(storage: &Storage, bucket: Bucket, key: &str) -> Result<()> {
    unlock_for(storage, bucket).await?;

    match storage.get_item::<serde_json::Value>(bucket, key).await? {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => {
            report_auth_failures(storage);
            anyhow::bail!("No readable record at {}/{}", bucket, key);
        }
    }
    Ok(())
}

async fn cmd_list(storage: &Storage, bucket: Bucket) -> Result<()> {
    unlock_for(storage, bucket).await?;

    let values: Vec<serde_json::Value> = storage.get_all(bucket).await?;
    if values.is_empty() {
        println!("Bucket {} has no readable records.", bucket);
    }
    for value in values {
        println!("{}", serde_json::to_string(&value)?);
    }

    report_auth_failures(storage);
    Ok(())
}

async fn cmd_remove(storage: &Storage, bucket: Bucket, key: &str) -> Result<()> {
    storage
        .remove_item(bucket, key)
        .await
        .context("Failed to remove record")?;
    println!("Removed {}/{}", bucket, key);
    Ok(())
}

async fn cmd_clear(storage: &Storage, bucket: Bucket) -> Result<()> {
    storage
        .clear_store(bucket)
        .await
        .context("Failed to clear bucket")?;
    println!("Cleared {}", bucket);
    Ok(())
}
