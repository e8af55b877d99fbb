use crate::body::Body;
use crate::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use crate::http::{HeaderValue, Response, StatusCode};

const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Turns a handler's success value into a response.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        response_with_body(StatusCode::NO_CONTENT, Body::empty())
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Text::new(self).into_response()
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Text::new(self).into_response()
    }
}

/// `200 OK` with a UTF-8 text body.
pub struct Text<T>(T);

impl<T> Text<T> {
    pub fn new(text: T) -> Self {
        Text(text)
    }
}

impl<T> IntoResponse for Text<T>
where
    T: Into<Body>,
{
    fn into_response(self) -> Response {
        response_with_body(StatusCode::OK, self.0.into())
    }
}

/// A response carrying `body`. Non-empty buffered bodies get `content-length` and a plain
/// text `content-type`, which callers replace when the payload is something else.
pub fn response_with_body(status: StatusCode, body: Body) -> Response {
    let length = match &body {
        Body::Once(bytes) if !bytes.is_empty() => Some(bytes.len()),
        _ => None,
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    if let Some(length) = length {
        let headers = response.headers_mut();
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(PLAIN_TEXT));
    }
    response
}
