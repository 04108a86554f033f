use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::path::PathBuf;

use crate::types::ErrorBody;

pub const INVALID_INPUT_MESSAGE: &str = "Invalid input values";
pub const PREDICTION_FAILED_MESSAGE: &str = "Prediction failed";

/// Failures inside the scaler or model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComputationError {
    #[error("{stage}: feature length mismatch: got {got}, expected {expected}")]
    WidthMismatch {
        stage: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{stage}: produced a non-finite value")]
    NonFinite { stage: &'static str },
}

/// Everything that can go wrong while serving one prediction request.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    /// A categorical field carried a label outside its table.
    #[error("{}", INVALID_INPUT_MESSAGE)]
    Validation,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not a valid {expected}: {value}")]
    InvalidNumber {
        field: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("field `{field}` is out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("request body rejected: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Computation(#[from] ComputationError),
}

impl PredictError {
    pub fn status(&self) -> StatusCode {
        match self {
            PredictError::Computation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Text placed in the `error` key of the response body.
    pub fn public_message(&self) -> String {
        match self {
            PredictError::Validation => INVALID_INPUT_MESSAGE.to_string(),
            PredictError::Computation(_) => PREDICTION_FAILED_MESSAGE.to_string(),
            other => format!("{}: {}", PREDICTION_FAILED_MESSAGE, other),
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("prediction failed: {}", self);
        } else {
            tracing::warn!("prediction rejected: {}", self);
        }
        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Fatal problems with the model/scaler artifacts; the server must not start.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid artifact {path}: {reason}")]
    InvalidArtifact { path: PathBuf, reason: String },

    #[error("{artifact} expects {got} features but schema {schema} produces {expected}")]
    WidthMismatch {
        artifact: &'static str,
        schema: crate::schema::SchemaVersion,
        expected: usize,
        got: usize,
    },

    #[error("{artifact} was trained for schema {declared} but the server is configured for {configured}")]
    SchemaMismatch {
        artifact: &'static str,
        declared: crate::schema::SchemaVersion,
        configured: crate::schema::SchemaVersion,
    },

    #[error("warmup prediction failed: {0}")]
    Warmup(#[source] ComputationError),
}
