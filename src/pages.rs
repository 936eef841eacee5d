//! Static template pages.
//!
//! Each page is a minimal web front-end: one `/home` route that renders a fixed template.

use axum::{response::Html, routing::get, Router};
use clap::ValueEnum;
use strum_macros::Display;
use tower_http::trace::TraceLayer;

/// The available template pages.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, ValueEnum)]
pub enum Page {
    A,
    B,
    C,
}

impl Page {
    /// Returns the HTML of the page's template.
    pub fn template(self) -> &'static str {
        match self {
            Self::A => include_str!("../templates/template-A.html"),
            Self::B => include_str!("../templates/template-B.html"),
            Self::C => include_str!("../templates/template-C.html"),
        }
    }

    /// Returns the port the page binds to unless told otherwise.
    pub fn default_port(self) -> u16 {
        match self {
            Self::A => 5000,
            Self::B => 5010,
            Self::C => 5020,
        }
    }
}

/// Returns a [axum::Router] serving `page` at `/home`.
pub fn router(page: Page) -> Router {
    Router::new()
        .route("/home", get(move || async move { Html(page.template()) }))
        .layer(TraceLayer::new_for_http())
}
