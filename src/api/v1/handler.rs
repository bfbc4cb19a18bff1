use super::error::*;
use crate::application_port::*;
use crate::domain_model::Subject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::HeaderValue;
use warp::http::header::SET_COOKIE;
use warp::hyper::body::Bytes;
use warp::reply::Response;
use warp::{Reply, reject};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

fn cookie(name: &str, value: &str, expires: DateTime<Utc>) -> Result<HeaderValue, ApiErrorCode> {
    let raw = format!(
        "{}={}; Path=/; Expires={}; HttpOnly; Secure; SameSite=Strict",
        name,
        value,
        expires.format("%a, %d %b %Y %H:%M:%S GMT")
    );
    HeaderValue::from_str(&raw).map_err(ApiErrorCode::internal)
}

/// Tells the browser to drop a cookie set by `pair_reply`.
fn expired_cookie(name: &str) -> Result<HeaderValue, ApiErrorCode> {
    let raw = format!(
        "{}=; Path=/; Max-Age=0; HttpOnly; Secure; SameSite=Strict",
        name
    );
    HeaderValue::from_str(&raw).map_err(ApiErrorCode::internal)
}

/// The pair goes out both in the JSON body and as HttpOnly cookies.
fn pair_reply(pair: TokenPair) -> Result<Response, ApiErrorCode> {
    let access = cookie(ACCESS_COOKIE, &pair.access_token.0, pair.access_token_expires_at)?;
    let refresh = cookie(
        REFRESH_COOKIE,
        &pair.refresh_token.0,
        pair.refresh_token_expires_at,
    )?;

    let mut response = warp::reply::json(&ApiResponse::ok(pair)).into_response();
    response.headers_mut().append(SET_COOKIE, access);
    response.headers_mut().append(SET_COOKIE, refresh);
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub guid: String,
}

pub async fn login(
    body: LoginRequest,
    token_service: Arc<dyn TokenService>,
) -> Result<Response, warp::Rejection> {
    let subject = Subject::new(body.guid)
        .map_err(AuthError::from)
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let pair = token_service
        .issue_pair(&subject)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    pair_reply(pair).map_err(reject::custom)
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Accepts the refresh token from the JSON body or, failing that, from the
/// refresh cookie. An empty body is allowed.
pub async fn refresh(
    body: Bytes,
    cookie: Option<String>,
    token_service: Arc<dyn TokenService>,
) -> Result<Response, warp::Rejection> {
    let request: RefreshRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|_| reject::custom(ApiErrorCode::InvalidInput))?
    };
    let presented = request.refresh_token.or(cookie);

    let pair = token_service
        .rotate_pair(presented.as_deref())
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    pair_reply(pair).map_err(reject::custom)
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse;

pub async fn logout(
    subject: Subject,
    token_service: Arc<dyn TokenService>,
) -> Result<Response, warp::Rejection> {
    token_service
        .revoke_subject(&subject)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let mut response = warp::reply::json(&ApiResponse::ok(LogoutResponse)).into_response();
    for name in [ACCESS_COOKIE, REFRESH_COOKIE] {
        let expired = expired_cookie(name).map_err(reject::custom)?;
        response.headers_mut().append(SET_COOKIE, expired);
    }
    Ok(response)
}

pub async fn health() -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&ApiResponse::ok("ok")))
}
