//! monapi command-line client.
//!
//! Runs a single API call such as `proxy.get` against a SQLite database and
//! prints the JSON result. Failures print an error object with the API error
//! code and exit non-zero.

mod config;

use clap::Parser;
use config::Args;
use monapi_core::{ApiService, Catalog, SqliteStore, TracingAuditSink};
use serde_json::{json, Value as Json};
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
enum CliError {
    #[error("invalid params JSON: {0}")]
    Params(#[source] serde_json::Error),

    #[error(transparent)]
    Api(#[from] monapi_core::Error),

    #[error("cannot print result: {0}")]
    Output(#[source] serde_json::Error),
}

impl CliError {
    fn to_json(&self) -> Json {
        let kind = match self {
            CliError::Api(err) => err.kind(),
            CliError::Params(_) => monapi_proto::ErrorKind::InvalidParameter,
            CliError::Output(_) => monapi_proto::ErrorKind::Internal,
        };
        json!({"error": {"code": kind.code(), "message": self.to_string()}})
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "monapi_cli=info,monapi_core=warn,monapi::audit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            tracing::error!(method = %args.method, error = %e, "call failed");
            println!("{}", e.to_json());
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<String, CliError> {
    let params: Json = serde_json::from_str(&args.params).map_err(CliError::Params)?;

    tracing::debug!(db = %args.db.display(), "opening database");
    let store = SqliteStore::open(&args.db)?;
    if args.init_schema {
        store.install_schema()?;
        tracing::info!("schema installed");
    }

    let user = store.load_user(args.user)?;
    let catalog = Catalog::standard();
    let service = ApiService::new(&catalog, &store)
        .with_audit(&TracingAuditSink)
        .with_config(args.api_config());

    tracing::info!(method = %args.method, user = args.user, "calling");
    let result = service.call(&user, &args.method, &params)?;

    let output = if args.pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    };
    output.map_err(CliError::Output)
}
