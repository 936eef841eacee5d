//! Per-process cache of opened files.

use crate::container::{Container, ROOT};
use crate::error::NuvolaError;
use crate::hierarchy;
use crate::models::{Attribute, LoadResponse, Node};

use cached::{Cached, UnboundCache};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Metadata of one opened file
#[derive(Clone, Debug, PartialEq)]
pub struct FileSession {
    /// Path the file was opened with
    pub file_path: String,
    /// File name without its directory
    pub display_name: String,
    /// Attributes of the root group
    pub root_attributes: Vec<Attribute>,
    /// Immediate members of the root group
    pub root_items: Vec<Node>,
}

impl FileSession {
    /// Read the metadata of an open container.
    ///
    /// # Arguments
    ///
    /// * `file_path`: Path the container was opened with
    /// * `container`: The open container
    pub fn load<C: Container + ?Sized>(
        file_path: &str,
        container: &C,
    ) -> Result<Self, NuvolaError> {
        Ok(Self {
            file_path: file_path.to_string(),
            display_name: container.file_name(),
            root_attributes: container.attributes(ROOT)?,
            root_items: hierarchy::items(container, ROOT)?,
        })
    }

    /// Describe the root group as a node named after the file.
    pub fn root_properties(&self) -> Node {
        let mut root = Node::group(
            self.display_name.clone(),
            self.root_attributes.clone(),
            self.root_items.len(),
        );
        // The client always offers to expand the root.
        root.has_children = true;
        root
    }

    /// Build the response sent to the client when the file is loaded.
    pub fn to_response(&self) -> LoadResponse {
        LoadResponse {
            filepath: self.file_path.clone(),
            hf_name: self.display_name.clone(),
            hf_root_items: self.root_items.clone(),
            hf_new_items: [["0"]],
            root_properties: self.root_properties(),
        }
    }
}

/// Cache of [FileSession] objects keyed by file path
///
/// Entries live until they are invalidated or the process exits. Changes to a file after it was
/// first loaded are not picked up.
pub struct SessionCache {
    sessions: Mutex<UnboundCache<String, Arc<FileSession>>>,
}

impl SessionCache {
    /// Return an empty SessionCache.
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(UnboundCache::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, UnboundCache<String, Arc<FileSession>>> {
        // A panicking loader cannot leave a partial entry behind, so the cache is still usable.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the session for `file_path`, calling `load` if it is not cached.
    ///
    /// The lookup and the insertion happen under one lock, so concurrent first loads of a path
    /// call `load` exactly once. Errors from `load` are returned and nothing is cached.
    pub fn get_or_load<F>(&self, file_path: &str, load: F) -> Result<Arc<FileSession>, NuvolaError>
    where
        F: FnOnce() -> Result<FileSession, NuvolaError>,
    {
        let mut sessions = self.lock();
        let session =
            sessions.cache_try_get_or_set_with(file_path.to_string(), || load().map(Arc::new))?;
        Ok(session.clone())
    }

    /// Drop the session for `file_path`, returning it if it was cached.
    pub fn invalidate(&self, file_path: &str) -> Option<Arc<FileSession>> {
        self.lock().cache_remove(file_path)
    }

    /// Number of cached sessions.
    pub fn len(&self) -> usize {
        self.lock().cache_size()
    }

    /// Whether no session is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}
