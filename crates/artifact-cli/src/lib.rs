//! artifact-agent command line
//!
//! Argument parsing, tracing setup and the `upload` command flow. `main.rs` only
//! wires these together and maps the outcome to an exit code.

use std::sync::Arc;

use anyhow::Context;
use artifact_api_client::ApiClient;
use artifact_core::{AgentConfig, ArtifactError, BatchResult, DestinationRouter, UploadBatch};
use artifact_storage::{create_uploader, UploaderContext};
use artifact_upload::{ContentTypeResolver, PathResolver, UploadOrchestrator};
use clap::{Args, Parser, Subcommand};

const UPLOAD_HELP: &str = "\
Make sure the pattern is surrounded by quotes. Otherwise the shell expands the
glob itself and hands over individual files, which is not supported.

Several patterns can be given at once, separated by ';'.

Artifacts go to the orchestration service unless a destination is given, either
as the second argument or in ARTIFACT_AGENT_UPLOAD_DESTINATION.

Examples:

   $ artifact-agent upload \"log/**/*.log\"

   Upload directly to Amazon S3:

   $ export ARTIFACT_AGENT_S3_ACCESS_KEY_ID=xxx
   $ export ARTIFACT_AGENT_S3_SECRET_ACCESS_KEY=yyy
   $ export ARTIFACT_AGENT_S3_DEFAULT_REGION=eu-central-1 # default is us-east-1
   $ export ARTIFACT_AGENT_S3_ACL=private # default is public-read
   $ artifact-agent upload \"log/**/*.log\" s3://name-of-your-s3-bucket/$ARTIFACT_AGENT_JOB_ID

   Assumed IAM roles need the session token as well:

   $ export ARTIFACT_AGENT_S3_SESSION_TOKEN=zzz

   Upload to Google Cloud Storage:

   $ export ARTIFACT_AGENT_GS_ACL=private
   $ artifact-agent upload \"log/**/*.log\" gs://name-of-your-gs-bucket/$ARTIFACT_AGENT_JOB_ID

   Upload to Artifactory:

   $ export ARTIFACT_AGENT_ARTIFACTORY_URL=http://my-artifactory-instance.com/artifactory
   $ export ARTIFACT_AGENT_ARTIFACTORY_USER=carol-danvers
   $ export ARTIFACT_AGENT_ARTIFACTORY_PASSWORD=xxx
   $ artifact-agent upload \"log/**/*.log\" rt://name-of-your-artifactory-repo/$ARTIFACT_AGENT_JOB_ID";

#[derive(Parser, Debug)]
#[command(name = "artifact-agent", version, about = "Build artifact agent")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload files to a job as artifacts
    #[command(after_long_help = UPLOAD_HELP)]
    Upload(UploadArgs),
}

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    /// Glob pattern of the files to upload, e.g. "log/**/*.log"
    pub pattern: String,

    /// s3://, gs:// or rt:// destination (default: the orchestration service)
    pub destination: Option<String>,

    /// Which job the artifacts are uploaded to
    #[arg(long, env = "ARTIFACT_AGENT_JOB_ID")]
    pub job: String,

    /// A specific Content-Type to set for the artifacts (otherwise detected)
    #[arg(long, env = "ARTIFACT_AGENT_ARTIFACT_CONTENT_TYPE")]
    pub content_type: Option<String>,

    /// ACL for objects uploaded to S3 (defaults to public-read)
    #[arg(long)]
    pub s3_acl: Option<String>,

    /// Follow symbolic links while resolving globs
    #[arg(long, env = "ARTIFACT_AGENT_ARTIFACT_SYMLINKS")]
    pub follow_symlinks: bool,

    /// Base URL of the orchestration service
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Access token used to talk to the orchestration service
    #[arg(long)]
    pub agent_access_token: Option<String>,

    /// Enable debug logging
    #[arg(long, env = "ARTIFACT_AGENT_DEBUG")]
    pub debug: bool,

    /// Log HTTP client internals as well
    #[arg(long, env = "ARTIFACT_AGENT_DEBUG_HTTP")]
    pub debug_http: bool,

    /// Disable ANSI colors in log output
    #[arg(long, env = "ARTIFACT_AGENT_NO_COLOR")]
    pub no_color: bool,
}

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(debug: bool, debug_http: bool) -> String {
    let level = if debug { "debug" } else { "info" };
    let http = if debug_http { "debug" } else { "warn" };
    format!("{level},reqwest={http},hyper={http},hyper_util={http}")
}

/// Initialize tracing for the CLI. `RUST_LOG` overrides the flags.
pub fn init_tracing(debug: bool, debug_http: bool, no_color: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(default_filter(debug, debug_http))
                }),
        )
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .init();
}

/// Apply command line overrides on top of the environment configuration.
pub fn apply_overrides(config: &mut AgentConfig, args: &UploadArgs) {
    if let Some(endpoint) = non_empty(&args.endpoint) {
        config.endpoint = endpoint;
    }
    if let Some(token) = non_empty(&args.agent_access_token) {
        config.access_token = Some(token);
    }
    if let Some(acl) = non_empty(&args.s3_acl) {
        config.s3.acl = acl;
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Attach the failing stage to a pipeline error for the one-line diagnostic.
fn at_stage(err: ArtifactError) -> anyhow::Error {
    let stage = err.stage();
    anyhow::Error::new(err).context(format!("{} failed", stage))
}

/// One line per failed artifact: display path and cause.
pub fn failure_lines(result: &BatchResult) -> Vec<String> {
    result
        .failures
        .iter()
        .map(|failure| match failure.error {
            ArtifactError::Upload { ref source, .. } => format!("{}: {}", failure.path, source),
            ref other => format!("{}: {}", failure.path, other),
        })
        .collect()
}

/// Run the `upload` command.
///
/// The destination is routed and the uploader constructed before any path is
/// resolved, so configuration mistakes fail fast without touching the filesystem
/// or the network.
pub async fn upload(args: UploadArgs) -> anyhow::Result<BatchResult> {
    let mut config = AgentConfig::from_env().map_err(at_stage)?;
    apply_overrides(&mut config, &args);
    config.validate().map_err(at_stage)?;

    let destination = DestinationRouter::new(config.upload_destination.clone())
        .route(args.destination.as_deref())
        .map_err(at_stage)?;

    let api_client = ApiClient::from_config(&config)
        .context("configure API client failed")?;

    let uploader = create_uploader(
        &destination,
        UploaderContext {
            config: &config,
            api_client: &api_client,
            job_id: &args.job,
        },
    )
    .map_err(at_stage)?;

    let resolver = PathResolver::current_dir(ContentTypeResolver::new(args.content_type.clone()))
        .map_err(at_stage)?
        .follow_symlinks(args.follow_symlinks);
    let artifacts = resolver.resolve(&args.pattern).map_err(at_stage)?;

    let batch = UploadBatch::new(args.job.clone(), destination.raw.clone(), artifacts)
        .with_pattern(args.pattern.clone());

    tracing::info!(
        files = batch.artifacts.len(),
        total_bytes = batch.total_size(),
        backend = %destination.kind,
        "Found files to upload"
    );

    let orchestrator = UploadOrchestrator::from_config(Arc::new(api_client), &config);
    let result = orchestrator.run(batch, uploader).await.map_err(at_stage)?;

    Ok(result)
}
