//! Maps the domain's `AinpError` onto the wire per spec §7: status codes
//! from `ErrorKind::http_status`, plus the handful of kind-specific headers
//! (`Retry-After`, `WWW-Authenticate`, `X-RateLimit-Degraded`) the HTTP
//! surface layers on top.
//!
//! `AinpError` lives in `ainp-core`, so this crate can't `impl IntoResponse`
//! for it directly (orphan rule) — `AppError` is a thin newtype wrapper
//! instead, following the same pattern `chronx_rpc::server` uses to map
//! domain errors to transport-level ones (there, `rpc_err` wraps an
//! `AinpError`-equivalent into a jsonrpsee `ErrorObject`; here it's an axum
//! `Response`).

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use ainp_core::AinpError;

pub struct AppError(pub AinpError);

impl From<AinpError> for AppError {
    fn from(e: AinpError) -> Self {
        AppError(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let kind = err.kind().as_str();

        let body = match &err {
            AinpError::PaymentRequired {
                request_id,
                amount_atomic,
                payment_url,
                expires_at,
            } => json!({
                "kind": kind,
                "message": err.to_string(),
                "request_id": request_id,
                "amount_atomic": amount_atomic,
                "payment_url": payment_url,
                "expires_at": expires_at,
            }),
            AinpError::Greylisted { retry_after_seconds } => json!({
                "kind": kind,
                "message": err.to_string(),
                "retry_after_seconds": retry_after_seconds,
            }),
            AinpError::RateLimitExceeded {
                retry_after_ms,
                degraded,
            } => json!({
                "kind": kind,
                "message": err.to_string(),
                "retry_after_ms": retry_after_ms,
                "degraded": degraded,
            }),
            AinpError::QuorumNotMet { have, need } => json!({
                "kind": kind,
                "message": err.to_string(),
                "have": have,
                "need": need,
            }),
            other => json!({
                "kind": kind,
                "message": other.to_string(),
            }),
        };

        let mut response = (status, Json(body)).into_response();
        let headers = response.headers_mut();

        match &err {
            AinpError::Greylisted { retry_after_seconds } => {
                if let Ok(v) = HeaderValue::from_str(&retry_after_seconds.to_string()) {
                    headers.insert("Retry-After", v);
                }
            }
            AinpError::RateLimitExceeded {
                retry_after_ms,
                degraded,
            } => {
                if let Ok(v) = HeaderValue::from_str(&retry_after_ms.to_string()) {
                    headers.insert("Retry-After", v);
                }
                if *degraded {
                    headers.insert("X-RateLimit-Degraded", HeaderValue::from_static("true"));
                }
            }
            AinpError::PaymentRequired { request_id, .. } => {
                let challenge = format!(r#"AINP-Pay realm="ainp", request_id="{request_id}""#);
                if let Ok(v) = HeaderValue::from_str(&challenge) {
                    headers.insert("WWW-Authenticate", v);
                }
            }
            _ => {}
        }

        response
    }
}

pub type AppResult<T> = Result<T, AppError>;
