//! Trigger an upload of a local file to an S3-compatible store.
//!
//! `generic` stores the file with one put request, `mpf` as a multipart
//! upload. Connection settings come from flags or the environment:
//!
//! ```text
//! S3_ENDPOINT=http://127.0.0.1:9000 S3_ACCESS_KEY=minioadmin S3_SECRET_KEY=minioadmin \
//!     S3_BUCKET=simulator cargo run --example simulate -- mpf --file 25mb.json
//! ```
use s3_file_upload::request::CompletedUpload;
use s3_file_upload::{ByteSize, FileUploader, SdkClient, StoreConfig, UploadBuilder};

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::{fmt, prelude::*};

#[derive(Debug, Parser)]
#[command(name = "simulate", about = "Upload a file to an S3-compatible store")]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,
    #[command(subcommand)]
    command: Sim,
}

#[derive(Debug, Subcommand)]
enum Sim {
    /// Upload the file with a single put request.
    Generic(FileArgs),
    /// Upload the file as a multipart upload.
    Mpf(FileArgs),
}

#[derive(Debug, Args)]
struct FileArgs {
    /// The file to upload.
    #[arg(long, default_value = "25mb.json")]
    file: PathBuf,
}

#[derive(Debug, Args)]
struct StoreArgs {
    #[arg(long, env = "S3_ENDPOINT", default_value = "http://127.0.0.1:9000")]
    endpoint: String,
    #[arg(long, env = "S3_REGION", default_value = "us-east-1")]
    region: String,
    #[arg(long, env = "S3_ACCESS_KEY", default_value = "")]
    access_key: String,
    #[arg(long, env = "S3_SECRET_KEY", default_value = "", hide_env_values = true)]
    secret_key: String,
    #[arg(long, env = "S3_BUCKET")]
    bucket: String,
    /// Key prefix of the uploaded objects.
    #[arg(long, env = "S3_DATA_PATH", default_value = "")]
    data_path: String,
    /// Part size of multipart uploads in MiB.
    #[arg(long, env = "S3_PART_MIB", default_value_t = 5)]
    part_mib: u64,
    /// Limit on part uploads in flight. 0 means no limit.
    #[arg(long, env = "S3_MAX_TASKS", default_value_t = 10)]
    max_tasks: usize,
}

impl StoreArgs {
    async fn uploader(&self) -> FileUploader {
        let config = StoreConfig {
            endpoint: self.endpoint.clone(),
            region: self.region.clone(),
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
        };
        let client = SdkClient::from_store_config(&config).await;

        UploadBuilder::new(client)
            .bucket(self.bucket.clone())
            .key_prefix(self.data_path.clone())
            .part_size(ByteSize::mib(self.part_mib))
            .max_active_tasks(self.max_tasks)
            .build()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse("s3_file_upload=debug")?;

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let cli = Cli::parse();
    let uploader = cli.store.uploader().await;

    let completed: CompletedUpload = match cli.command {
        Sim::Generic(args) => uploader.simple_upload(&args.file).await?,
        Sim::Mpf(args) => uploader.multipart_upload(&args.file).await?,
    };

    println!(
        "upload to {} finished, object etag: {}",
        completed.uri, completed.etag
    );
    Ok(())
}
