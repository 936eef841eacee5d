//! Error handling.

use axum::{
    extract::rejection::FormRejection,
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{event, Level};

/// h5nuvola error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum NuvolaError {
    /// Error opening an HDF5 container
    #[error("could not open file {path}")]
    OpenFile {
        path: String,
        #[source]
        source: hdf5::Error,
    },

    /// Error reading a directory for remote browsing
    #[error("could not load directory {path}")]
    ReadDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error reported by the HDF5 library after the container was opened
    #[error("error reading HDF5 container")]
    Hdf5(#[from] hdf5::Error),

    /// The requested node does not exist in the container
    #[error("node {path} not found")]
    NodeNotFound { path: String },

    /// The requested node is a group, but a dataset is required
    #[error("node {path} is not a dataset")]
    NotADataset { path: String },

    /// The dataset's element type cannot be materialised
    #[error("unsupported element type {dtype} for node {path}")]
    UnsupportedType { path: String, dtype: String },

    /// Error deserialising form data
    #[error("request data is not valid")]
    RequestDataFormRejection(#[from] FormRejection),

    /// Error validating request data (single error)
    #[error("request data is not valid")]
    RequestDataValidationSingle(#[from] validator::ValidationError),

    /// Error validating request data (multiple errors)
    #[error("request data is not valid")]
    RequestDataValidation(#[from] validator::ValidationErrors),

    /// A blocking task panicked or was cancelled
    #[error("error executing blocking task")]
    TaskJoin(#[from] JoinError),

    /// I/O error while serving
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IntoResponse for NuvolaError {
    /// Convert from a `NuvolaError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut causes = Vec::new();
        let mut current = error.source();
        while let Some(source) = current {
            causes.push(source.to_string());
            current = source.source();
        }
        // Remove duplicate entries.
        causes.dedup();
        let caused_by = (!causes.is_empty()).then_some(causes);
        ErrorBody { message, caused_by }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }
}

impl From<NuvolaError> for ErrorResponse {
    /// Convert from a `NuvolaError` into an `ErrorResponse`.
    fn from(error: NuvolaError) -> Self {
        let status = match &error {
            // Bad request
            NuvolaError::OpenFile { .. }
            | NuvolaError::ReadDirectory { .. }
            | NuvolaError::NotADataset { .. }
            | NuvolaError::UnsupportedType { .. }
            | NuvolaError::RequestDataFormRejection(_)
            | NuvolaError::RequestDataValidationSingle(_)
            | NuvolaError::RequestDataValidation(_) => StatusCode::BAD_REQUEST,

            // Not found
            NuvolaError::NodeNotFound { .. } => StatusCode::NOT_FOUND,

            // Internal server error
            NuvolaError::Hdf5(_) | NuvolaError::TaskJoin(_) | NuvolaError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let response = Self::new(status, &error);

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}
