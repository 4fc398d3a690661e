//! HTTP boundary
//!
//! `GET /` answers `OK` for load balancers. `POST /fps/license` takes an
//! SPC envelope and answers with the CKC envelope or a JSON error body.
//! Every license response carries `x-request-id`, the correlation id that
//! also tags the server log lines of that request.

use crate::envelope::{LicenseEnvelope, LicenseResponse};
use crate::error::LicenseError;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use fps_ksm::{new_correlation_id, Ksm, LicenseRequest};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
const TRANSFER_ENCODING_HEADER: &str = "content-transfer-encoding";

#[derive(Clone)]
pub struct AppState {
    ksm: Arc<Ksm>,
}

impl AppState {
    pub fn new(ksm: Ksm) -> Self {
        Self { ksm: Arc::new(ksm) }
    }
}

pub fn router(state: AppState) -> Router {
    let cors_layer = CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods([Method::GET, Method::HEAD, Method::POST])
        .allow_headers(cors::Any)
        .expose_headers([REQUEST_ID_HEADER]);

    Router::new()
        .route("/", get(health))
        .route("/fps/license", post(license))
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
}

/// Serve until `shutdown` resolves, then drain in-flight requests
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
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
    info!("shutdown signal received");
}

async fn health() -> &'static str {
    "OK"
}

async fn license(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let correlation_id = new_correlation_id();

    let mut response = match issue(&state, &headers, &body, &correlation_id).await {
        Ok(issued) => {
            ([(header::CONTENT_TYPE, issued.content_type)], issued.body).into_response()
        }
        Err(e) => error_response(&e, &correlation_id),
    };
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

async fn issue(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
    correlation_id: &str,
) -> Result<LicenseResponse, LicenseError> {
    let content_type = header_str(headers, header::CONTENT_TYPE.as_str());
    let transfer_encoding = header_str(headers, TRANSFER_ENCODING_HEADER);

    let mut envelope =
        LicenseEnvelope::parse(content_type, transfer_encoding, body).map_err(|e| {
            warn!(correlation_id, kind = "MalformedEnvelope", error = %e, "request rejected");
            LicenseError::from(e)
        })?;

    let spc = std::mem::take(&mut envelope.spc);
    let asset_id = envelope.asset_id.take();
    let ksm = state.ksm.clone();
    let id = correlation_id.to_string();

    // The engine is CPU bound; a dropped client just discards the result.
    let ckc = tokio::task::spawn_blocking(move || {
        let request = LicenseRequest::new(&spc, &id).with_asset_id(asset_id.as_deref());
        ksm.process_request(&request)
    })
    .await
    .map_err(|e| {
        error!(correlation_id, error = %e, "license worker failed");
        LicenseError::Internal(e.to_string())
    })??;

    Ok(envelope.respond(&ckc))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// JSON error body `{status, message, kind, correlationId}`
pub fn error_response(err: &LicenseError, correlation_id: &str) -> Response {
    let status =
        StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = serde_json::json!({
        "status": status.as_u16(),
        "message": err.public_message(),
        "kind": err.kind().as_str(),
        "correlationId": correlation_id,
    });
    (status, Json(body)).into_response()
}

fn panic_response(_: Box<dyn Any + Send + 'static>) -> Response<Body> {
    error!("request handler panicked");
    let correlation_id = new_correlation_id();
    let mut response = error_response(
        &LicenseError::Internal("handler panicked".into()),
        &correlation_id,
    );
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
