//! Seed CLI: writes a demo database or repairs relation counters in one.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use firebook_core::relation::{RelationConfig, reconcile};
use firebook_infra::JsonFileDocumentStore;

mod demo;

#[derive(Parser)]
#[command(name = "seed")]
#[command(about = "Manage the Firebook mock database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a demo database with users, posts and comments
    Init {
        /// Database file
        #[arg(long, env = "DB_PATH", default_value = "db.json")]
        db: PathBuf,

        /// Overwrite an existing database
        #[arg(long)]
        force: bool,
    },

    /// Recompute every relation counter from the live records
    Reconcile {
        /// Database file
        #[arg(long, env = "DB_PATH", default_value = "db.json")]
        db: PathBuf,

        /// Relations as `child:refField:parent:counterField`, comma separated
        #[arg(long, env = "RELATIONS")]
        relations: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Init { db, force } => init(&db, force).await,
        Command::Reconcile { db, relations } => {
            let relations = match relations {
                Some(list) => RelationConfig::parse_list(&list)?,
                None => vec![RelationConfig::post_comments()],
            };
            run_reconcile(&db, &relations).await
        }
    }
}

async fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if !force && tokio::fs::try_exists(path).await? {
        bail!("{} already exists, pass --force to overwrite", path.display());
    }

    let db = demo::demo_database()?;
    let bytes = serde_json::to_vec_pretty(&db)?;
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    info!(path = %path.display(), "Demo database written");
    Ok(())
}

async fn run_reconcile(path: &Path, relations: &[RelationConfig]) -> anyhow::Result<()> {
    if !tokio::fs::try_exists(path).await? {
        bail!("{} does not exist, run `seed init` first", path.display());
    }

    let store = JsonFileDocumentStore::open(path).await?;
    let report = reconcile(&store, relations).await?;

    for relation in relations {
        info!(relation = %relation, "Reconciled");
    }
    println!(
        "checked {} parent records, corrected {}",
        report.checked, report.corrected
    );
    Ok(())
}
