use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::engine::PipelineError;
use crate::preferences::PreferenceError;
use crate::query::QueryError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Preference(#[from] PreferenceError),
    /// Request body could not be read, e.g. it is larger than the configured limit.
    #[error("{}", .0.body_text())]
    Body(#[from] BytesRejection),
    /// Query string does not fit the expected parameters, e.g. a repeated key.
    #[error("{}", .0.body_text())]
    QueryString(#[from] QueryRejection)
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Pipeline(PipelineError::Malformed(_)) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(PipelineError::ScorerUnavailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Pipeline(PipelineError::StoreUnavailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Query(QueryError::InvalidFilter(_)) => StatusCode::BAD_REQUEST,
            ApiError::Query(QueryError::StoreUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Preference(PreferenceError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Preference(_) => StatusCode::BAD_REQUEST,
            ApiError::Body(rejection) => rejection.status(),
            ApiError::QueryString(rejection) => rejection.status()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("Request failed: {self}");
        }

        let body = ErrorResponse {
            error: self.to_string()
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
