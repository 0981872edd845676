//! artifact-agent: uploads build artifacts for a CI job.
//!
//! Configuration comes from ARTIFACT_AGENT_* environment variables (a `.env` file is
//! honoured) and command line flags. Exits non-zero on any error or failed artifact.

use std::process::ExitCode;

use artifact_cli::{failure_lines, init_tracing, upload, Cli, Commands};
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Upload(args) => {
            init_tracing(args.debug, args.debug_http, args.no_color);

            match upload(args).await {
                Ok(result) if result.is_success() => {
                    tracing::info!(
                        batch_id = %result.batch_id,
                        uploaded = result.uploaded_count(),
                        "Artifact upload complete"
                    );
                    ExitCode::SUCCESS
                }
                Ok(result) => {
                    for line in failure_lines(&result) {
                        eprintln!("Failed to upload {}", line);
                    }
                    eprintln!(
                        "Error: {} of {} artifacts failed to upload",
                        result.failures.len(),
                        result.artifacts.len()
                    );
                    ExitCode::FAILURE
                }
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}
