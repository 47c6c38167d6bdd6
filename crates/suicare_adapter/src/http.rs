#![forbid(unsafe_code)]

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use suicare_kernel_contracts::wire::{
    ErrorResponse, HealthResponse, SaltQuery, SALT_ROUTE, STORAGE_UNAVAILABLE_ERROR,
};
use tracing::{error, warn};

use crate::AdapterRuntime;

pub const BANNER: &str = "SuiCare Backend is Running (Auth Service Active)";

pub fn router(runtime: Arc<AdapterRuntime>) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/healthz", get(healthz))
        .route(SALT_ROUTE, get(get_salt))
        .layer(middleware::from_fn(cors))
        .with_state(runtime)
}

async fn banner() -> &'static str {
    BANNER
}

async fn get_salt(
    State(runtime): State<Arc<AdapterRuntime>>,
    query: Result<Query<SaltQuery>, QueryRejection>,
) -> Response {
    let sub = match query {
        Ok(Query(query)) => query.sub,
        Err(rejection) => {
            warn!(reason = %rejection, "unparseable salt query");
            None
        }
    };

    let outcome =
        tokio::task::spawn_blocking(move || runtime.run_salt_lookup(sub.as_deref())).await;
    match outcome {
        Ok(Ok(body)) => (StatusCode::OK, Json(body)).into_response(),
        Ok(Err(failure)) => {
            let status = StatusCode::from_u16(failure.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_server_error() {
                error!(detail = failure.detail(), "salt lookup failed");
            }
            (status, Json(ErrorResponse::new(failure.public_message()))).into_response()
        }
        Err(join_err) => {
            error!(error = %join_err, "salt lookup task aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(STORAGE_UNAVAILABLE_ERROR)),
            )
                .into_response()
        }
    }
}

async fn healthz(
    State(runtime): State<Arc<AdapterRuntime>>,
) -> (StatusCode, Json<HealthResponse>) {
    let report = tokio::task::spawn_blocking(move || runtime.health_report())
        .await
        .unwrap_or_else(|join_err| Err(join_err.to_string()));
    match report {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(reason) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(HealthResponse {
                status: "error".to_string(),
                outcome: "UNHEALTHY".to_string(),
                reason: Some(reason),
                subject_count: None,
            }),
        ),
    }
}

/// Any origin may call the auth service; the browser front end runs elsewhere.
async fn cors(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(response.headers_mut(), true);
        return response;
    }
    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut(), false);
    response
}

fn apply_cors_headers(headers: &mut HeaderMap, preflight: bool) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    if preflight {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        );
    }
}
