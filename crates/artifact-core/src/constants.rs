//! Defaults shared across crates.

/// Content type used when neither an override nor a known extension applies.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Number of artifacts uploaded concurrently unless configured otherwise.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 10;

/// Attempts per artifact (first try included) before it is marked failed.
pub const DEFAULT_UPLOAD_MAX_ATTEMPTS: u32 = 5;

pub const DEFAULT_RETRY_BASE_MS: u64 = 1_000;
pub const DEFAULT_RETRY_MAX_MS: u64 = 30_000;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_ENDPOINT: &str = "https://agent.example.com";

pub const DEFAULT_S3_REGION: &str = "us-east-1";
pub const DEFAULT_S3_ACL: &str = "public-read";

/// Separator accepted between several glob patterns in one argument.
pub const PATTERN_SEPARATOR: char = ';';
