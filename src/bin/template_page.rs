//! This file defines the template-page binary entry point.
//!
//! Serves one of the static template pages at `/home`.

use h5nuvola::cli::PageArgs;
use h5nuvola::pages;
use h5nuvola::server;
use h5nuvola::tracing;

use clap::Parser;
use std::process::ExitCode;
use ::tracing::{event, Level};

/// Application entry point
#[tokio::main]
async fn main() -> ExitCode {
    let args = PageArgs::parse();
    tracing::init_tracing();
    event!(Level::DEBUG, "{:?}", args);
    let router = pages::router(args.page);
    match server::serve(&args.server, args.page.default_port(), router).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            event!(Level::ERROR, "{}", err);
            ExitCode::FAILURE
        }
    }
}
