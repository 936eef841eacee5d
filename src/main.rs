//! This file defines the h5nuvola binary entry point.

use h5nuvola::app;
use h5nuvola::cli;
use h5nuvola::metrics;
use h5nuvola::server;
use h5nuvola::tracing;

use std::process::ExitCode;
use ::tracing::{event, Level};

/// Application entry point
#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    tracing::init_tracing();
    event!(Level::DEBUG, "{:?}", args);
    if let Err(err) = metrics::register_metrics() {
        event!(Level::ERROR, "failed to register metrics: {}", err);
        return ExitCode::FAILURE;
    }
    let router = app::router(&args);
    match server::serve(&args.server, cli::DEFAULT_PORT, router).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            event!(Level::ERROR, "{}", err);
            ExitCode::FAILURE
        }
    }
}
