use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::pin;
use std::sync::Arc;

use bytes::{Buf, BufMut};
use futures::{Stream, StreamExt};
use tracing::{Instrument, info, info_span, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use uuid::Uuid;
use warp::http::{HeaderName, HeaderValue, Method, StatusCode};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::error::ErrorEnvelope;
use crate::handlers::parse_event::{EventExtractionHandler, HandlerResponse, build_headers};

const MAX_BODY_BYTES: usize = 64 * 1024;
const MAX_DRAIN_BYTES: usize = 4 * MAX_BODY_BYTES;

pub fn init_logging() -> Result<(), String> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to set up logging: {}", e))
}

fn into_reply(response: HandlerResponse) -> Response {
    let mut reply = warp::reply::with_status(response.body.unwrap_or_default(), response.status)
        .into_response();
    let headers = reply.headers_mut();
    for (name, value) in build_headers() {
        if let Ok(name) = HeaderName::from_bytes(name.as_bytes()) {
            headers.insert(name, HeaderValue::from_static(value));
        }
    }
    reply
}

fn envelope_reply(status: StatusCode, message: &str) -> Response {
    into_reply(HandlerResponse {
        status,
        body: Some(ErrorEnvelope::message(message).to_json()),
    })
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if err.is_not_found() {
        return Ok(envelope_reply(StatusCode::NOT_FOUND, "Not found"));
    }
    Ok(envelope_reply(StatusCode::BAD_REQUEST, "Invalid request"))
}

#[derive(Debug)]
enum BodyError {
    TooLarge,
    Read(warp::Error),
}

/// Collects the request body, giving up as soon as it passes `limit` bytes.
async fn read_body<S, B>(mut body: S, limit: usize) -> Result<Vec<u8>, BodyError>
where
    S: Stream<Item = Result<B, warp::Error>> + Unpin,
    B: Buf,
{
    let mut collected = Vec::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(BodyError::Read)?;
        if collected.len() + chunk.remaining() > limit {
            return Err(BodyError::TooLarge);
        }
        collected.put(chunk);
    }
    Ok(collected)
}

/// Reads and discards up to `limit` bytes so the connection can be answered
/// cleanly. Nothing is buffered.
async fn drain_body<S, B>(mut body: S, limit: usize)
where
    S: Stream<Item = Result<B, warp::Error>> + Unpin,
    B: Buf,
{
    let mut seen = 0;
    while seen <= limit {
        match body.next().await {
            Some(Ok(chunk)) => seen += chunk.remaining(),
            _ => break,
        }
    }
}

async fn serve_request<S, B>(
    handler: Arc<EventExtractionHandler>,
    method: Method,
    content_length: Option<u64>,
    body: S,
) -> Result<Response, Infallible>
where
    S: Stream<Item = Result<B, warp::Error>>,
    B: Buf,
{
    let span = info_span!(
        "parse_event",
        request_id = %Uuid::new_v4(),
        method = %method
    );
    async move {
        info!("handling request");
        let mut body = pin!(body);

        if method != Method::POST {
            drain_body(&mut body, MAX_DRAIN_BYTES).await;
            let response = handler.handle(&method, &[]).await;
            info!(status = %response.status, "request complete");
            return Ok(into_reply(response));
        }

        let declared_too_large = content_length.is_some_and(|len| len > MAX_BODY_BYTES as u64);
        let read = if declared_too_large {
            Err(BodyError::TooLarge)
        } else {
            read_body(&mut body, MAX_BODY_BYTES).await
        };

        let response = match read {
            Ok(bytes) => handler.handle(&method, &bytes).await,
            Err(BodyError::TooLarge) => {
                drain_body(&mut body, MAX_DRAIN_BYTES).await;
                warn!(status = %StatusCode::PAYLOAD_TOO_LARGE, "request body over limit");
                return Ok(envelope_reply(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large"));
            }
            Err(BodyError::Read(e)) => {
                warn!(error = %e, "failed to read request body");
                return Ok(envelope_reply(StatusCode::BAD_REQUEST, "Invalid request"));
            }
        };
        info!(status = %response.status, "request complete");
        Ok(into_reply(response))
    }
    .instrument(span)
    .await
}

/// `/parse-event`, plus the `/api/parse-event` alias, for every method.
pub fn routes(
    handler: Arc<EventExtractionHandler>,
) -> impl Filter<Extract = (Response,), Error = Infallible> + Clone {
    let path = warp::path!("parse-event")
        .or(warp::path!("api" / "parse-event"))
        .unify();

    path.and(warp::any().map(move || handler.clone()))
        .and(warp::method())
        .and(warp::header::optional::<u64>("content-length"))
        .and(warp::body::stream())
        .and_then(serve_request)
        .recover(handle_rejection)
        .unify()
}

pub async fn run_api(handler: Arc<EventExtractionHandler>, addr: SocketAddr) {
    info!(%addr, "parse-event service listening");
    warp::serve(routes(handler)).run(addr).await;
}
