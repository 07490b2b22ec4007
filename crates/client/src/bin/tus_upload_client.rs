//! `tus-upload-client`: thin CLI wrapping the batch executor (§4.G.1).
//!
//! ```text
//! tus-upload-client --server http://localhost:8080/files file1.bin file2.bin
//! ```
//!
//! No argument-parsing crate is pulled in; the pack's own grounding source
//! for this binary (a minimal `reqwest`-based client) has none either, and
//! the option surface here is small enough that hand parsing stays readable.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use reqwest::Url;
use tus_client::batch::{BatchConfig, build_runtime, run_batch};
use tus_client::uploader::{Uploader, UploaderConfig};

#[cfg(feature = "store-sqlite")]
use tus_client::location::{sqlite::SqliteLocationStore, LocationStore};
#[cfg(not(feature = "store-sqlite"))]
use tus_client::location::{InMemoryLocationStore, LocationStore};

struct Args {
    server: Url,
    files: Vec<PathBuf>,
    uploader: UploaderConfig,
    batch: BatchConfig,
    #[cfg(feature = "store-sqlite")]
    db_path: String,
}

fn parse_args() -> Result<Args, String> {
    let mut server: Option<Url> = None;
    let mut files = Vec::new();
    let mut uploader = UploaderConfig::default();
    let mut batch = BatchConfig::default();
    #[cfg(feature = "store-sqlite")]
    let mut db_path = "tus-client.sqlite3".to_string();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--server" => {
                let value = args.next().ok_or("--server requires a value")?;
                server = Some(Url::parse(&value).map_err(|e| format!("invalid --server url: {e}"))?);
            }
            "--chunk-size" => {
                let value = args.next().ok_or("--chunk-size requires a value")?;
                uploader.chunk_size = value.parse().map_err(|_| "invalid --chunk-size")?;
            }
            "--max-concurrent" => {
                let value = args.next().ok_or("--max-concurrent requires a value")?;
                batch.max_concurrent = value.parse().map_err(|_| "invalid --max-concurrent")?;
            }
            "--thread-pool-size" => {
                let value = args.next().ok_or("--thread-pool-size requires a value")?;
                batch.thread_pool_size = value.parse().map_err(|_| "invalid --thread-pool-size")?;
            }
            "--max-attempts" => {
                let value = args.next().ok_or("--max-attempts requires a value")?;
                uploader.retry.max_attempts = value.parse().map_err(|_| "invalid --max-attempts")?;
            }
            "--initial-delay-ms" => {
                let value = args.next().ok_or("--initial-delay-ms requires a value")?;
                uploader.retry.initial_delay_ms =
                    value.parse().map_err(|_| "invalid --initial-delay-ms")?;
            }
            "--max-delay-ms" => {
                let value = args.next().ok_or("--max-delay-ms requires a value")?;
                uploader.retry.max_delay_ms = value.parse().map_err(|_| "invalid --max-delay-ms")?;
            }
            "--multiplier" => {
                let value = args.next().ok_or("--multiplier requires a value")?;
                uploader.retry.multiplier = value.parse().map_err(|_| "invalid --multiplier")?;
            }
            #[cfg(feature = "store-sqlite")]
            "--db" => {
                db_path = args.next().ok_or("--db requires a value")?;
            }
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown flag: {other}"));
            }
            other => files.push(PathBuf::from(other)),
        }
    }

    let server = server.ok_or("--server <url> is required")?;
    if files.is_empty() {
        return Err("at least one file path is required".to_string());
    }

    Ok(Args {
        server,
        files,
        uploader,
        batch,
        #[cfg(feature = "store-sqlite")]
        db_path,
    })
}

fn print_usage() {
    eprintln!(
        "usage: tus-upload-client --server <url> [options] <file>...\n\n\
         options:\n\
         \x20 --chunk-size <bytes>          default 3145728 (3 MiB)\n\
         \x20 --max-concurrent <n>          default 3\n\
         \x20 --thread-pool-size <n>        default 5\n\
         \x20 --max-attempts <n>            default 3\n\
         \x20 --initial-delay-ms <ms>       default 1000\n\
         \x20 --max-delay-ms <ms>           default 30000\n\
         \x20 --multiplier <f>              default 2.0\n\
         \x20 --db <path>                   sqlite location-cache path (store-sqlite builds only)"
    );
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("tus-upload-client: {err}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    let runtime = match build_runtime(&args.batch) {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("tus-upload-client: failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(args))
}

async fn run(args: Args) -> ExitCode {
    let location: Arc<dyn LocationStore> = match build_location_store(&args).await {
        Ok(store) => store,
        Err(err) => {
            eprintln!("tus-upload-client: {err}");
            return ExitCode::FAILURE;
        }
    };

    let uploader = Arc::new(Uploader::new(args.server, location, args.uploader));
    let (results, summary) = run_batch(uploader, args.files, args.batch).await;

    for result in &results {
        match &result.outcome {
            Ok(outcome) => {
                println!(
                    "COMPLETED {} -> {} ({} bytes)",
                    result.path.display(),
                    outcome.upload_url,
                    outcome.total_size
                );
            }
            Err(err) => {
                println!("FAILED {} ({err})", result.path.display());
            }
        }
    }
    println!(
        "summary: {} completed, {} failed",
        summary.completed, summary.failed
    );

    if summary.failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(feature = "store-sqlite")]
async fn build_location_store(args: &Args) -> Result<Arc<dyn LocationStore>, String> {
    let url = format!("sqlite://{}?mode=rwc", args.db_path);
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&url)
        .await
        .map_err(|e| format!("failed to open location db {}: {e}", args.db_path))?;
    let store = SqliteLocationStore::new(pool);
    store
        .migrate()
        .await
        .map_err(|e| format!("failed to migrate location db: {e}"))?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "store-sqlite"))]
async fn build_location_store(_args: &Args) -> Result<Arc<dyn LocationStore>, String> {
    Ok(Arc::new(InMemoryLocationStore::new()))
}
