//! Command Line Interface (CLI) arguments.

use crate::pages::Page;

use clap::{Args, Parser};

/// Default port of the h5nuvola viewer.
pub const DEFAULT_PORT: u16 = 5000;

/// Options shared by every web front-end in this crate.
#[derive(Clone, Debug, Args)]
pub struct ServerArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "127.0.0.1", env = "H5NUVOLA_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, env = "H5NUVOLA_PORT")]
    pub port: Option<u16>,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "H5NUVOLA_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/h5nuvola/certs/cert.pem",
        env = "H5NUVOLA_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/h5nuvola/certs/key.pem",
        env = "H5NUVOLA_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for requests to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "H5NUVOLA_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
}

/// h5nuvola command line interface
#[derive(Clone, Debug, Parser)]
#[command(version, about = "Web viewer for HDF5 files")]
pub struct CommandLineArgs {
    #[command(flatten)]
    pub server: ServerArgs,
    /// File extensions shown by the remote file browser
    #[arg(
        long,
        value_delimiter = ',',
        default_value = ".h5,.hdf5",
        env = "H5NUVOLA_EXTENSIONS"
    )]
    pub extensions: Vec<String>,
    /// Return absolute paths from the remote file browser rather than names
    #[arg(long, default_value_t = false, env = "H5NUVOLA_ABSOLUTE_PATHS")]
    pub absolute_paths: bool,
}

/// Template page command line interface
#[derive(Clone, Debug, Parser)]
#[command(version, about = "Serve one static template page")]
pub struct PageArgs {
    #[command(flatten)]
    pub server: ServerArgs,
    /// Which template page to serve
    #[arg(long, value_enum, default_value_t = Page::A)]
    pub page: Page,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
