//! This crate provides h5nuvola, a web viewer for HDF5 files stored on the server. A browser
//! client browses the server's filesystem, opens an HDF5 file, expands its tree of groups and
//! datasets, and displays a selected dataset as a table, a set of curves or an image.
//!
//! The crate also provides three minimal template pages, each a web front-end serving one static
//! page.
//!
//! h5nuvola is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team, on top of the [hyper] HTTP library.
//! * [Serde](serde) performs serialisation of JSON response data.
//! * The [hdf5] crate binds the HDF5 C library, used to read containers.
//! * [ndarray] provides [NumPy](https://numpy.org)-like n-dimensional arrays holding dataset
//!   values.
//!
//! The HDF5 library is synchronous, so all container access runs on Tokio's blocking thread
//! pool. Opened files are summarised once and kept in a [session::SessionCache].

pub mod app;
pub mod app_state;
pub mod browse;
pub mod cli;
pub mod container;
pub mod error;
pub mod hierarchy;
pub mod metrics;
pub mod models;
pub mod pages;
pub mod render;
pub mod server;
pub mod session;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod validated_form;
