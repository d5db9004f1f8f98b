//! Response construction.
//!
//! # Responsibilities
//! - Build the small set of response shapes the gateway sends
//! - Map store failures through the error translator
//! - Map access denials to their status codes

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::translate;
use crate::security::Denial;
use crate::store::StoreError;

pub const APPLICATION_JSON: &str = "application/json";

/// 200 with an empty body.
pub fn ok() -> Response {
    StatusCode::OK.into_response()
}

pub fn text(status: StatusCode, message: impl Into<String>) -> Response {
    (status, message.into()).into_response()
}

/// 200 with a JSON body.
pub fn json(body: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, APPLICATION_JSON)], body).into_response()
}

/// 200, JSON content type and the given length, no body (HEAD).
pub fn json_length(length: usize) -> Response {
    let mut response = StatusCode::OK.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    response
}

pub fn denied(denial: Denial) -> Response {
    text(denial.status(), denial.to_string())
}

pub fn store_error(err: &StoreError) -> Response {
    let translation = translate(err);
    (translation.status, translation.message).into_response()
}
