use serde::Serialize;
use thiserror::Error;

use crate::body::Body;
use crate::http::header::CONTENT_TYPE;
use crate::http::{HeaderValue, Method, Response, StatusCode};
use crate::response::{response_with_body, IntoResponse};

/// Failure raised while answering a request, by the router, a handler or an adapter.
///
/// The status code is fixed by the variant, and the response is always the JSON envelope
/// `{"error": {"status": <code>, "message": <display>}}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("no route for {0}")]
    NotFound(String),
    #[error("method {method} is not allowed, allowed: {allowed}")]
    MethodNotAllowed { method: Method, allowed: String },
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        AppError::NotFound(path.into())
    }

    pub fn method_not_allowed(method: &Method, allowed: &[Method]) -> Self {
        let mut names: Vec<&str> = allowed.iter().map(Method::as_str).collect();
        names.sort_unstable();
        AppError::MethodNotAllowed {
            method: method.clone(),
            allowed: names.join(", "),
        }
    }

    pub fn internal(error: impl Into<anyhow::Error>) -> Self {
        AppError::Internal(error.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    error: Detail<'a>,
}

#[derive(Serialize)]
struct Detail<'a> {
    status: u16,
    message: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        let envelope = Envelope {
            error: Detail {
                status: status.as_u16(),
                message: &message,
            },
        };
        let payload = serde_json::to_vec(&envelope).unwrap_or_default();

        let mut response = response_with_body(status, Body::from(payload));
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn envelope(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let payload = serde_json::from_slice(response.body().as_bytes()).expect("json envelope");
        (response.status(), payload)
    }

    #[test]
    fn bad_request_message_is_shown_verbatim() {
        let (status, payload) = envelope(AppError::bad_request("unable to infer event source"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["error"]["status"], 400);
        assert_eq!(payload["error"]["message"], "unable to infer event source");
    }

    #[test]
    fn allowed_methods_are_sorted() {
        let err = AppError::method_not_allowed(&Method::DELETE, &[Method::PUT, Method::GET]);
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            err.to_string(),
            "method DELETE is not allowed, allowed: GET, PUT"
        );
    }

    #[test]
    fn internal_error_includes_cause_chain() {
        let cause = anyhow::anyhow!("socket closed").context("loading settings");
        let (status, payload) = envelope(AppError::internal(cause));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            payload["error"]["message"],
            "internal error: loading settings: socket closed"
        );
    }

    #[test]
    fn not_found_names_the_path() {
        let (status, payload) = envelope(AppError::not_found("/nowhere"));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(payload["error"]["message"], "no route for /nowhere");
    }
}
