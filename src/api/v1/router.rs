use super::error::*;
use super::handler;
use crate::application_port::TokenService;
use crate::domain_model::Subject;
use futures_util::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use warp::hyper::body::{Buf, Bytes};
use warp::{Filter, http, reject};

/// Request bodies above this size are refused before they are buffered.
const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    token_service: Arc<dyn TokenService>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    // `guid` may come as a query parameter, a form field or a JSON body.
    let login_query = warp::query::<handler::LoginRequest>();
    let login_json = warp::body::content_length_limit(MAX_BODY_BYTES)
        .and(warp::body::json::<handler::LoginRequest>());
    let login_form = warp::body::content_length_limit(MAX_BODY_BYTES)
        .and(warp::body::form::<handler::LoginRequest>());
    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(login_query.or(login_json).unify().or(login_form).unify())
        .and(with(token_service.clone()))
        .and_then(handler::login);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(bounded_body(MAX_BODY_BYTES))
        .and(warp::cookie::optional::<String>(handler::REFRESH_COOKIE))
        .and(with(token_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::post()
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(with_verification(token_service.clone()))
        .and(with(token_service.clone()))
        .and_then(handler::logout);

    let health = warp::get()
        .and(warp::path("health"))
        .and(warp::path::end())
        .and_then(handler::health);

    login.or(refresh).or(logout).or(health)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Body of at most `limit` bytes. Unlike `content_length_limit` this admits
/// requests without a `Content-Length`, such as a cookie-only refresh, and
/// still stops reading a chunked body once it passes the limit.
fn bounded_body(limit: u64) -> impl Filter<Extract = (Bytes,), Error = warp::Rejection> + Clone {
    warp::header::optional::<u64>("content-length")
        .and_then(move |length: Option<u64>| async move {
            match length {
                Some(length) if length > limit => {
                    Err(reject::custom(ApiErrorCode::InvalidInput))
                }
                _ => Ok(()),
            }
        })
        .untuple_one()
        .and(warp::body::stream())
        .and_then(move |body| collect_body(body, limit))
}

async fn collect_body<S, B>(body: S, limit: u64) -> Result<Bytes, warp::Rejection>
where
    S: Stream<Item = Result<B, warp::Error>>,
    B: Buf,
{
    let mut body = Box::pin(body);
    let mut collected = Vec::new();
    while let Some(chunk) = body.next().await {
        let mut chunk = chunk.map_err(|_| reject::custom(ApiErrorCode::InvalidInput))?;
        if (collected.len() + chunk.remaining()) as u64 > limit {
            return Err(reject::custom(ApiErrorCode::InvalidInput));
        }
        while chunk.has_remaining() {
            let part = chunk.chunk();
            let read = part.len();
            collected.extend_from_slice(part);
            chunk.advance(read);
        }
    }
    Ok(Bytes::from(collected))
}

fn with_verification(
    token_service: Arc<dyn TokenService>,
) -> impl Filter<Extract = (Subject,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>(http::header::AUTHORIZATION.as_ref()).and_then(
        move |header: Option<String>| {
            let token_service = token_service.clone();
            async move {
                match header.as_deref().and_then(|h| h.strip_prefix("Bearer ")) {
                    Some(token) => token_service
                        .verify_access(token)
                        .await
                        .map_err(ApiErrorCode::from)
                        .map_err(reject::custom),
                    None => Err(reject::custom(ApiErrorCode::Unauthenticated)),
                }
            }
        },
    )
}
