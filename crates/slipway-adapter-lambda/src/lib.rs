//! Invocation adapter for AWS Lambda style platforms.
//!
//! Translates each platform event into a Slipway request, runs it through the hosted
//! application, and renders the response in the reply shape the event source expects.

pub mod config;
pub mod context;
pub mod event;
pub mod handler;
pub mod request;
pub mod response;
#[cfg(feature = "lambda")]
pub mod runtime;
pub mod setup;

/// Name of this adapter's table in `slipway.toml`.
pub const ADAPTER_NAME: &str = "lambda";

pub use config::{ConfigError, LambdaAdapterConfig, DEFAULT_TEXT_MIME_TYPES};
pub use context::{InvocationContext, LambdaRequestContext};
pub use event::{EventKind, InvocationEvent};
pub use handler::LambdaHandler;
pub use request::into_core_request;
pub use response::{build_reply, from_core_response, InvocationReply, ReplyShape};
#[cfg(feature = "lambda")]
pub use runtime::{init_logger, run_app, run_handler};
pub use setup::{build_handler, task_root, Setup, SetupError};
pub use slipway_core::app::SetupContext;
