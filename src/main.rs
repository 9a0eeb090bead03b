//! dirsync: directory tree synchronization between local disk and an object bucket

use anyhow::{Context, Result};
use clap::Parser;
use dirsync::cli::{Args, Command};
use dirsync::{DirSync, SyncStats};
use object_bucket::MemoryBucket;
use tracing::{info, Level};

#[compio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging based on verbosity and quiet mode
    let level = if args.quiet {
        Level::ERROR
    } else {
        match args.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match run(&args).await {
        Ok(stats) => {
            info!("Sync completed successfully");
            info!("Files copied: {}", stats.files_copied);
            info!("Bytes copied: {}", stats.bytes_copied);
            info!(
                "Directories: {} created, {} already present",
                stats.directories_created, stats.directories_existing
            );
            info!("Duration: {:?}", stats.duration);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn run(args: &Args) -> Result<SyncStats> {
    args.validate().context("Invalid arguments")?;
    let settings = args.settings().context("Invalid configuration")?;

    info!("Starting dirsync v{}", env!("CARGO_PKG_VERSION"));
    info!("Bucket: {} ({})", settings.bucket(), settings.region());
    info!("Max in flight: {}", settings.max_in_flight());
    info!("Chunk size: {} KB", settings.chunk_size() / 1024);

    let write_options = args.write_options();
    let options = move |_: &str| write_options.clone();
    let (source, destination) = args.command.paths();

    let stats = match &args.command {
        Command::Copy { .. } => {
            // Local-only; the remote side is never touched
            let bucket = MemoryBucket::new(settings.bucket());
            DirSync::with_bucket(settings, bucket)
                .with_progress(args.progress)
                .copy_with(source, destination, &options)
                .await
        }
        Command::Upload { .. } => {
            DirSync::open_dir_bucket(settings, &args.bucket_root)
                .await?
                .with_progress(args.progress)
                .upload_with(source, destination, &options)
                .await
        }
        Command::Download { .. } => {
            DirSync::open_dir_bucket(settings, &args.bucket_root)
                .await?
                .with_progress(args.progress)
                .download_with(source, destination, &options)
                .await
        }
    };

    stats.with_context(|| format!("Failed to sync {source} to {destination}"))
}
