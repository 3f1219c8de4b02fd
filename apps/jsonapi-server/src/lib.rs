//! HTTP host for a [`JsonApi`]: every request under the router goes through
//! [`JsonApi::serve`], so routing, negotiation and error documents all come
//! from the library.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{self, StatusCode};
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::Router;
use jsonapi::response::body_bytes;
use jsonapi::{Error, JsonApi, JsonApiRequest};
use runtime::ServerConfig;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tracing::{debug, error, info};

pub mod request_id;
pub mod shutdown;

use request_id::XRequestId;

pub const BODY_LIMIT: usize = 16 * 1024 * 1024;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Router answering every path with the API.
pub fn router(api: Arc<JsonApi>) -> Router {
    let x_request_id = request_id::header();

    // Outermost first: SetRequestId -> PropagateRequestId -> Trace -> push_req_id_to_extensions -> Timeout -> BodyLimit
    Router::new()
        .fallback(handle)
        .with_state(api)
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(from_fn(request_id::push_req_id_to_extensions))
        .layer(request_id::trace_layer())
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, request_id::NanoId))
}

async fn handle(State(api): State<Arc<JsonApi>>, req: Request) -> Response {
    let rid = req
        .extensions()
        .get::<XRequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default();
    let (parts, body) = req.into_parts();

    let bytes = match to_bytes(body, BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let rejected = Error::bad_request(format!("Request body could not be read: {e}"));
            return into_axum(api.error_response(&rejected));
        }
    };
    let request = match JsonApiRequest::from_http(http::Request::from_parts(parts, bytes)) {
        Ok(request) => request,
        Err(e) => return into_axum(api.error_response(&e)),
    };

    let response = api.serve(&request);
    debug!(request_id = %rid, status = response.status().as_u16(), "served");
    into_axum(response)
}

fn into_axum(response: jsonapi::Response) -> Response {
    let body = match body_bytes(&response) {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "failed to serialize response document");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let (parts, _) = response.into_parts();
    Response::from_parts(parts, Body::from(body))
}

/// Bind `server.host:server.port`.
pub async fn bind(server: &ServerConfig) -> Result<TcpListener> {
    let addr: SocketAddr = format!("{}:{}", server.host, server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", server.host, server.port))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    Ok(listener)
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve_with_shutdown<F>(listener: TcpListener, api: JsonApi, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("HTTP server bound on {}", listener.local_addr()?);
    axum::serve(listener, router(Arc::new(api)))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;
    info!("HTTP server stopped");
    Ok(())
}

/// Serve until SIGINT/SIGTERM.
pub async fn serve(server: &ServerConfig, api: JsonApi) -> Result<()> {
    let listener = bind(server).await?;
    serve_with_shutdown(listener, api, async {
        match shutdown::wait_for_shutdown().await {
            Ok(()) => info!("shutdown signal received"),
            Err(e) => {
                error!(error = %e, "failed to listen for shutdown signals");
                std::future::pending::<()>().await;
            }
        }
    })
    .await
}
