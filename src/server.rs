//! Web server

use crate::cli::ServerArgs;
use crate::error::NuvolaError;

use std::{
    io::{Error, ErrorKind},
    net::SocketAddr,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use axum::Router;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use expanduser::expanduser;
use tokio::signal;
use tracing::{event, Level};

/// Returns the address to listen on.
///
/// # Arguments
///
/// * `args`: Server arguments
/// * `default_port`: Port to use when `args` does not name one
pub fn socket_addr(args: &ServerArgs, default_port: u16) -> Result<SocketAddr, NuvolaError> {
    let port = args.port.unwrap_or(default_port);
    SocketAddr::from_str(&format!("{}:{}", args.host, port)).map_err(|err| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("invalid host name, IP address or port number: {err}"),
        )
        .into()
    })
}

/// Expand `~` in a TLS file path and check that the file exists.
fn tls_file(path: &str, description: &str) -> Result<PathBuf, NuvolaError> {
    let abs_path = expanduser(path)?;
    if !abs_path.exists() {
        return Err(Error::new(
            ErrorKind::NotFound,
            format!(
                "TLS {} file expected at '{}' but not found",
                description,
                abs_path.display()
            ),
        )
        .into());
    }
    Ok(abs_path.canonicalize()?)
}

/// Serve a web front-end
///
/// Runs until a shutdown signal is received and in-flight requests complete.
///
/// # Arguments
///
/// * `args`: Server arguments
/// * `default_port`: Port to use when `args` does not name one
/// * `router`: The [axum::Router] to serve
pub async fn serve(args: &ServerArgs, default_port: u16, router: Router) -> Result<(), NuvolaError> {
    let addr = socket_addr(args, default_port)?;

    // Catch ctrl+c and try to shutdown gracefully
    let handle = Handle::new();
    tokio::spawn(shutdown_signal(
        handle.clone(),
        args.graceful_shutdown_timeout,
    ));

    if args.https {
        let abs_cert_file = tls_file(&args.cert_file, "certificate")?;
        let abs_key_file = tls_file(&args.key_file, "key")?;
        let tls_config = RustlsConfig::from_pem_file(abs_cert_file, abs_key_file).await?;
        event!(Level::INFO, "listening on https://{}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(router.into_make_service())
            .await?;
    } else {
        event!(Level::INFO, "listening on http://{}", addr);
        axum_server::bind(addr)
            .handle(handle)
            .serve(router.into_make_service())
            .await?;
    }
    Ok(())
}

/// Graceful shutdown handler
///
/// Installs signal handlers to catch Ctrl-C or SIGTERM and trigger a graceful shutdown.
async fn shutdown_signal(handle: Handle, timeout: u64) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            event!(Level::ERROR, "failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                event!(Level::ERROR, "failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    event!(Level::INFO, "signal received, starting graceful shutdown");
    // Force shutdown if graceful shutdown takes longer than the timeout
    handle.graceful_shutdown(Some(Duration::from_secs(timeout)));
}
