//! `http` types specialised to [`Body`].

use std::future::Future;
use std::pin::Pin;

pub use http::header::{self, HeaderName};
pub use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};

use crate::body::Body;
use crate::error::AppError;

pub type Request = http::Request<Body>;
pub type Response = http::Response<Body>;

/// What an endpoint resolves to. Not `Send`: one warm process drives one invocation at a time.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response, AppError>>>>;

pub fn request_builder() -> http::request::Builder {
    http::Request::builder()
}

pub fn response_builder() -> http::response::Builder {
    http::Response::builder()
}
