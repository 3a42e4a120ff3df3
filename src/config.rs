//! CLI arguments and server configuration defaults.

use clap::Parser;
use shadow_rs::formatcp;

use crate::build;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

pub const API_TOKEN_HEADER: &str = "X-API-Token";
pub const DEFAULT_STORAGE_DIR: &str = "uploads";
pub const TEMP_FILE_PREFIX: &str = ".upload-";
pub const TEMP_FILE_SUFFIX: &str = ".part";
pub const DEFAULT_TEMP_TTL_SECS: u64 = 24 * 60 * 60;
pub const TEMP_CLEAN_INTERVAL_SECS: u64 = 900;

/// CLI arguments and environment configuration for the server.
#[derive(Parser, Debug)]
#[command(name = "lemonkeeper", version = VERSION_INFO, about = "Lemonkeeper file server")]
pub struct Args {
    #[arg(
        short = 's',
        long,
        env = "LEMON_STORAGE_DIR",
        default_value = DEFAULT_STORAGE_DIR,
        help = "Storage directory for uploaded files"
    )]
    pub storage_dir: String,
    #[arg(
        short = 't',
        long,
        env = "LEMON_API_TOKEN",
        help = "Shared secret expected in the X-API-Token header"
    )]
    pub api_token: String,
    #[arg(
        short = 'b',
        long,
        env = "LEMON_BIND",
        default_value = "0.0.0.0",
        help = "Bind address for HTTP"
    )]
    pub host: String,
    #[arg(
        short = 'p',
        long,
        env = "LEMON_HTTP_PORT",
        default_value_t = 8080,
        help = "HTTP port"
    )]
    pub port: u16,
    #[arg(long, env = "LEMON_CORS_ORIGINS", help = "Comma separated CORS origins")]
    pub cors_origins: Option<String>,
    #[arg(
        long,
        env = "LEMON_TEMP_TTL_SECS",
        default_value_t = DEFAULT_TEMP_TTL_SECS,
        help = "Upload temp cleanup threshold in seconds (0 to disable)"
    )]
    pub temp_ttl_secs: u64,
}
