use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, message) = if let Some(code) = err.find::<ApiErrorCode>() {
        (code.clone(), code.to_string())
    } else if err.is_not_found() {
        (ApiErrorCode::NotFound, ApiErrorCode::NotFound.to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (ApiErrorCode::InvalidInput, e.to_string())
    } else if let Some(message) = malformed_request(&err) {
        (ApiErrorCode::InvalidInput, message)
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (ApiErrorCode::NotFound, ApiErrorCode::NotFound.to_string())
    } else {
        warn!("unhandled rejection: {:?}", err);
        (ApiErrorCode::InternalError, ApiErrorCode::InternalError.to_string())
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code.clone(), message));
    Ok(warp::reply::with_status(json, code.status()))
}

/// Rejections warp raises on a matched route whose request is unusable. They
/// must be checked before `MethodNotAllowed`, which every `or()` sibling with
/// another method contributes.
fn malformed_request(err: &Rejection) -> Option<String> {
    if let Some(e) = err.find::<reject::PayloadTooLarge>() {
        Some(e.to_string())
    } else if let Some(e) = err.find::<reject::UnsupportedMediaType>() {
        Some(e.to_string())
    } else if let Some(e) = err.find::<reject::LengthRequired>() {
        Some(e.to_string())
    } else if let Some(e) = err.find::<reject::InvalidHeader>() {
        Some(e.to_string())
    } else {
        err.find::<reject::InvalidQuery>().map(|e| e.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Request is malformed")]
    InvalidInput,
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Service temporarily unavailable")]
    Unavailable,
    #[error("Not found")]
    NotFound,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ApiErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidInput(_) => ApiErrorCode::InvalidInput,
            AuthError::Unauthenticated => ApiErrorCode::Unauthenticated,
            AuthError::StoreUnavailable(e) => {
                warn!("store unavailable: {}", e);
                ApiErrorCode::Unavailable
            }
            AuthError::SigningFailure(e) => ApiErrorCode::internal(e),
            AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}
