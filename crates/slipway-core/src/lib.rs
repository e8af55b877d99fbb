//! The contract between a Slipway adapter and the application it hosts.
//!
//! An adapter builds an [`app::App`] once at cold start, feeds it one [`http::Request`] per
//! invocation through [`app::App::handle`], and turns the [`http::Response`] back into the
//! platform's reply. Everything else here exists so applications can be written against
//! that contract: a small router with middleware, typed request access, and a JSON error
//! envelope.

pub mod app;
pub mod body;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod manifest;
pub mod middleware;
pub mod params;
pub mod response;
pub mod router;
