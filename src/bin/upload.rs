//! CLI for uploading files and directory trees to object-storage buckets.
//!
//! ```bash
//! bucket-up file  report.csv my-bucket --key reports/2024.csv --public
//! bucket-up dir   ./site my-bucket --prefix www/ --jobs 8
//! bucket-up list-buckets
//! ```

use anyhow::{bail, Context, Result};
use bucket_batch::{files_recursive, BatchUploader, S3Store, UploadConfig};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bucket-up", version, about = "Upload local files to object-storage buckets")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a single file
    File {
        local_file: PathBuf,
        bucket: String,
        /// Destination key (defaults to the file name)
        #[arg(long)]
        key: Option<String>,
        /// Make the uploaded object publicly readable
        #[arg(long)]
        public: bool,
    },
    /// Upload all files in a directory, recursively
    Dir {
        local_dir: PathBuf,
        bucket: String,
        /// Prefix prepended to every destination key
        #[arg(long, default_value = "")]
        prefix: String,
        /// Make uploaded objects publicly readable
        #[arg(long)]
        public: bool,
        /// Number of concurrent uploads
        #[arg(short, long)]
        jobs: Option<usize>,
    },
    /// List accessible buckets
    ListBuckets,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let store = S3Store::from_env().await;

    match cli.command {
        Command::File {
            local_file,
            bucket,
            key,
            public,
        } => {
            let mut config = UploadConfig::from_env();
            config.make_public = public;
            let uploader = BatchUploader::with_config(store, config);

            if !uploader.bucket_exists(&bucket).await? {
                bail!("bucket '{}' not found or not accessible", bucket);
            }
            uploader
                .upload_file(&bucket, &local_file, key.as_deref())
                .await
                .with_context(|| format!("failed to upload {}", local_file.display()))?;
            println!("Successfully uploaded: {}", local_file.display());
        }

        Command::Dir {
            local_dir,
            bucket,
            prefix,
            public,
            jobs,
        } => {
            let mut config = UploadConfig::from_env();
            config.key_prefix = prefix;
            config.make_public = public;
            if let Some(jobs) = jobs {
                if jobs == 0 {
                    bail!("--jobs must be at least 1");
                }
                config.concurrency = jobs;
            }
            let uploader = BatchUploader::with_config(store, config);

            // Walk once up front so the bar has a length.
            let n_files = files_recursive(&local_dir)?.len() as u64;
            let bar = ProgressBar::new(n_files);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
                    .progress_chars("=> "),
            );

            let bar2 = bar.clone();
            let result = uploader
                .upload_dir(&bucket, &local_dir, move |_| {
                    let bar = bar2.clone();
                    async move { bar.inc(1) }
                })
                .await?;
            bar.finish();

            println!("Upload complete:");
            println!("  Successful: {}", result.success_count);
            println!("  Failed: {}", result.failure_count);
            if !result.errors.is_empty() {
                println!("Errors:");
                for error in &result.errors {
                    println!("  - {}", error);
                }
            }
            if !result.all_succeeded() {
                std::process::exit(1);
            }
        }

        Command::ListBuckets => {
            let uploader = BatchUploader::new(store);
            let buckets = uploader.list_buckets().await?;
            if buckets.is_empty() {
                println!("No accessible buckets found");
            } else {
                println!("Accessible buckets:");
                for bucket in buckets {
                    println!("  - {}", bucket);
                }
            }
        }
    }
    Ok(())
}
