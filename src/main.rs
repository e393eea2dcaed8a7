use collector_core::{CoreError, Credentials, ErrorReporter, RunConfig};
use reddit_client::RedditClient;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const ENV_FILES: [&str; 2] = ["reddit.env", ".env"];
const DEFAULT_LOG_FILTER: &str = "reddit_collector=info,reddit_client=info,collector_pipeline=info,collector_core=info";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Env files may set RUST_LOG, so they are read before the filter is built.
    let env_files: Vec<(&str, EnvFile)> = ENV_FILES
        .iter()
        .map(|file| (*file, load_env_file(Path::new(file))))
        .collect();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting Reddit collector");
    for (file, outcome) in &env_files {
        match outcome {
            EnvFile::Loaded => tracing::info!("Environment variables loaded from {}", file),
            EnvFile::Missing => tracing::info!("No {} found, using the process environment", file),
            EnvFile::Failed(e) => tracing::warn!("Could not load {}: {}", file, e),
        }
    }

    match collect().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ErrorReporter::new().report_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn collect() -> Result<(), CoreError> {
    let credentials = Credentials::from_env()?;
    let config = RunConfig::load()?;

    let mut client = RedditClient::connect(&credentials).await?;
    let outcome = collector_pipeline::run(&mut client, &config).await;
    client.log_api_summary();

    let summary = outcome?;
    tracing::info!(
        "Data saved successfully to {} ({} fetched, {} dropped as malformed, {} duplicates removed, {} written)",
        summary.output.display(),
        summary.fetched,
        summary.malformed,
        summary.duplicates,
        summary.written
    );
    Ok(())
}

#[derive(Debug)]
enum EnvFile {
    Loaded,
    Missing,
    Failed(dotenv::Error),
}

/// Fills the environment from an env file. Variables already set win.
fn load_env_file(path: &Path) -> EnvFile {
    if !path.exists() {
        return EnvFile::Missing;
    }
    match dotenv::from_path(path) {
        Ok(()) => EnvFile::Loaded,
        Err(e) => EnvFile::Failed(e),
    }
}
