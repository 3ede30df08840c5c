//! Command-line configuration.

use clap::Parser;
use monapi_core::config::{DEFAULT_IN_CHUNK_SIZE, DEFAULT_MAX_NESTING_DEPTH};
use monapi_core::ApiConfig;
use std::path::PathBuf;

/// Default database file.
pub const DEFAULT_DB_PATH: &str = "./monapi.db";

/// Run one monitoring API call against a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "monapi")]
#[command(version, about = "Run monitoring API calls", long_about = None)]
pub struct Args {
    /// API method, e.g. `proxy.get`.
    pub method: String,

    /// Call parameters as JSON.
    #[arg(default_value = "{}")]
    pub params: String,

    /// Path to the SQLite database.
    #[arg(short, long, env = "MONAPI_DB", default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,

    /// Id of the calling user.
    #[arg(short, long, env = "MONAPI_USER", default_value_t = 1)]
    pub user: u64,

    /// Create missing tables before the call.
    #[arg(long)]
    pub init_schema: bool,

    /// Ids per `IN (...)` block.
    #[arg(long, default_value_t = DEFAULT_IN_CHUNK_SIZE)]
    pub in_chunk_size: usize,

    /// Maximum depth of nested related-object calls.
    #[arg(long, default_value_t = DEFAULT_MAX_NESTING_DEPTH)]
    pub max_nesting_depth: usize,

    /// Do not log audit records.
    #[arg(long)]
    pub no_audit: bool,

    /// Pretty-print the result.
    #[arg(short, long)]
    pub pretty: bool,
}

impl Args {
    /// Service configuration from the command line.
    pub fn api_config(&self) -> ApiConfig {
        let config = ApiConfig::new()
            .with_in_chunk_size(self.in_chunk_size)
            .with_max_nesting_depth(self.max_nesting_depth);
        if self.no_audit {
            config.without_audit()
        } else {
            config
        }
    }
}
