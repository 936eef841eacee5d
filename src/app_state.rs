use crate::browse::Lister;
use crate::cli::CommandLineArgs;
use crate::session::SessionCache;

use std::sync::Arc;

/// Shared application state passed to each request handler.
pub struct AppState {
    /// Files loaded so far.
    pub sessions: SessionCache,

    /// Remote file browser.
    pub lister: Lister,
}

impl AppState {
    /// Create and return an [AppState] configured from the command line.
    pub fn new(args: &CommandLineArgs) -> Self {
        Self {
            sessions: SessionCache::new(),
            lister: Lister::new(args.extensions.iter().cloned(), args.absolute_paths),
        }
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;
