//! Remote browsing of the server's filesystem.

use crate::error::NuvolaError;

use expanduser::expanduser;
use hashbrown::HashSet;
use std::ffi::OsString;
use std::path::Path;
use tracing::{event, Level};

/// Filter that accepts every path.
pub fn accept_all(_: &Path) -> bool {
    true
}

/// Contents of a directory, each list sorted by name
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Listing {
    /// Files with an allowed extension
    pub files: Vec<String>,
    /// Subdirectories
    pub dirs: Vec<String>,
}

/// Lists directories, keeping only files with an allowed extension
#[derive(Clone, Debug)]
pub struct Lister {
    /// Allowed extensions, including the leading dot
    extensions: HashSet<String>,
    /// Whether to return full paths rather than names
    absolute: bool,
}

impl Lister {
    /// Return a new Lister.
    ///
    /// # Arguments
    ///
    /// * `extensions`: Allowed file extensions, including the leading dot, e.g. `.h5`
    /// * `absolute`: Whether to return full paths rather than names relative to the directory
    pub fn new<I, S>(extensions: I, absolute: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
            absolute,
        }
    }

    /// Whether the name of a file has an allowed extension.
    fn allowed(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .map(|extension| {
                self.extensions
                    .contains(&format!(".{}", extension.to_string_lossy()))
            })
            .unwrap_or(false)
    }

    /// List the immediate contents of `directory`.
    ///
    /// A leading `~` is expanded to the user's home directory. Filters are passed the full path
    /// of each entry. Files must pass `file_filter` and have an allowed extension, directories
    /// must pass `dir_filter`. Entries are classified by following symbolic links. Entries whose
    /// names are not valid UTF-8 are skipped.
    ///
    /// # Arguments
    ///
    /// * `directory`: Directory to list
    /// * `file_filter`: Predicate for files
    /// * `dir_filter`: Predicate for directories
    pub fn list<F, D>(
        &self,
        directory: &str,
        file_filter: F,
        dir_filter: D,
    ) -> Result<Listing, NuvolaError>
    where
        F: Fn(&Path) -> bool,
        D: Fn(&Path) -> bool,
    {
        let read_error = |source| NuvolaError::ReadDirectory {
            path: directory.to_string(),
            source,
        };
        let root = expanduser(directory).map_err(read_error)?;
        let mut names: Vec<String> = std::fs::read_dir(&root)
            .and_then(|entries| {
                entries
                    .map(|entry| entry.map(|entry| entry.file_name()))
                    .collect::<Result<Vec<OsString>, _>>()
            })
            .map_err(read_error)?
            .into_iter()
            .filter_map(|name| {
                name.into_string()
                    .map_err(|name| {
                        event!(
                            Level::WARN,
                            "skipping non UTF-8 entry {:?} in {}",
                            name,
                            directory
                        )
                    })
                    .ok()
            })
            .collect();
        names.sort();

        let mut listing = Listing::default();
        for name in names {
            let full_path = root.join(&name);
            let entry = if self.absolute {
                full_path.to_string_lossy().into_owned()
            } else {
                name.clone()
            };
            if full_path.is_dir() {
                if dir_filter(&full_path) {
                    listing.dirs.push(entry);
                }
            } else if file_filter(&full_path) && self.allowed(&name) {
                listing.files.push(entry);
            }
        }
        Ok(listing)
    }
}

/// Escape text for inclusion in HTML.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render a listing of `directory` as a jQuery FileTree fragment.
pub fn file_tree_html(directory: &str, listing: &Listing) -> String {
    let mut html = vec![r#"<ul class="jqueryFileTree" style="display: none;">"#.to_string()];
    for dir in &listing.dirs {
        let path = Path::new(directory).join(dir);
        html.push(format!(
            r##"<li class="directory collapsed"><a href="#" rel="{}/">{}</a></li>"##,
            escape(&path.to_string_lossy()),
            escape(dir)
        ));
    }
    for file in &listing.files {
        let path = Path::new(directory).join(file);
        let extension = Path::new(file)
            .extension()
            .map(|extension| extension.to_string_lossy().into_owned())
            .unwrap_or_default();
        html.push(format!(
            r##"<li class="file ext_{}"><a href="#" rel="{}">{}</a></li>"##,
            escape(&extension),
            escape(&path.to_string_lossy()),
            escape(file)
        ));
    }
    html.push("</ul>".to_string());
    html.concat()
}
