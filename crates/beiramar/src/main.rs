use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use beiramar_bucket::{BlobStore, LocalBlobStore, S3BlobStore, S3Config};
use beiramar_core::{JobConfig, JobResponse, RefinedJob, TrustedJob};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Beira Mar appointment and weather ETL", long_about = None)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean raw appointments and weather into the trusted tier
    Trusted,
    /// Join trusted appointments with weather into the refined tier
    Refined,
    /// Run the trusted job, then the refined job if it succeeded
    RunAll,
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// Blob store backend (falls back to BEIRAMAR_STORE, then s3)
    #[arg(long, value_enum, global = true)]
    store: Option<StoreKind>,
    /// Root directory for the local backend (falls back to BEIRAMAR_LOCAL_ROOT)
    #[arg(long, global = true)]
    local_root: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StoreKind {
    S3,
    Local,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    let config = JobConfig::from_env().context("invalid job configuration")?;
    let store = build_store(&cli.store).await?;
    let trigger = Value::Null;

    let responses = match cli.command {
        Command::Trusted => vec![run_trusted(&config, &store, &trigger).await],
        Command::Refined => vec![run_refined(&config, &store, &trigger).await],
        Command::RunAll => {
            let trusted = run_trusted(&config, &store, &trigger).await;
            if trusted.is_success() {
                vec![trusted, run_refined(&config, &store, &trigger).await]
            } else {
                warn!("trusted job failed; skipping refined job");
                vec![trusted]
            }
        }
    };

    let mut failed = false;
    for response in &responses {
        println!("{}", serde_json::to_string_pretty(response)?);
        failed |= !response.is_success();
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn run_trusted(config: &JobConfig, store: &Arc<dyn BlobStore>, trigger: &Value) -> JobResponse {
    let job = TrustedJob::new(config.clone(), store.clone());
    JobResponse::from_result(job.run(trigger).await)
}

async fn run_refined(config: &JobConfig, store: &Arc<dyn BlobStore>, trigger: &Value) -> JobResponse {
    let job = RefinedJob::new(config.clone(), store.clone());
    JobResponse::from_result(job.run(trigger).await)
}

async fn build_store(args: &StoreArgs) -> Result<Arc<dyn BlobStore>> {
    let kind = match args.store {
        Some(kind) => kind,
        None => match env::var("BEIRAMAR_STORE").ok().as_deref() {
            None | Some("s3") => StoreKind::S3,
            Some("local") => StoreKind::Local,
            Some(other) => bail!("unknown BEIRAMAR_STORE '{other}' (expected s3 or local)"),
        },
    };

    match kind {
        StoreKind::Local => {
            let root = args
                .local_root
                .clone()
                .or_else(|| env::var("BEIRAMAR_LOCAL_ROOT").ok())
                .unwrap_or_else(|| "./data".to_string());
            info!(root = %root, "using local blob store");
            let store: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(root));
            Ok(store)
        }
        StoreKind::S3 => {
            let config = s3_config_from_env();
            info!(region = %config.region, endpoint = ?config.endpoint, "using s3 blob store");
            let store = S3BlobStore::new(config)
                .await
                .context("failed to configure s3 blob store")?;
            let store: Arc<dyn BlobStore> = Arc::new(store);
            Ok(store)
        }
    }
}

fn s3_config_from_env() -> S3Config {
    let defaults = S3Config::default();
    S3Config {
        region: env::var("S3_REGION")
            .or_else(|_| env::var("AWS_REGION"))
            .unwrap_or(defaults.region),
        endpoint: env::var("S3_ENDPOINT_URL").ok(),
        access_key_id: env::var("S3_ACCESS_KEY_ID").ok(),
        secret_access_key: env::var("S3_SECRET_ACCESS_KEY").ok(),
        force_path_style: env::var("S3_FORCE_PATH_STYLE")
            .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE"))
            .unwrap_or(false),
    }
}
