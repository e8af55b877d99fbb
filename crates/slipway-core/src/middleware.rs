use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::endpoint::EndpointFn;
use crate::error::AppError;
use crate::http::Response;

/// Wraps every matched route. Layers run in registration order, outermost first, and may
/// answer without calling `next`.
#[async_trait(?Send)]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, ctx: RequestContext, next: Next<'_>) -> Result<Response, AppError>;
}

/// The layers still to run for this request, then the route's endpoint.
pub struct Next<'a> {
    layers: &'a [Arc<dyn Middleware>],
    endpoint: &'a EndpointFn,
}

impl<'a> Next<'a> {
    pub(crate) fn new(layers: &'a [Arc<dyn Middleware>], endpoint: &'a EndpointFn) -> Self {
        Self { layers, endpoint }
    }

    pub async fn run(self, ctx: RequestContext) -> Result<Response, AppError> {
        let Some((layer, rest)) = self.layers.split_first() else {
            return (self.endpoint)(ctx).await;
        };
        layer.handle(ctx, Next::new(rest, self.endpoint)).await
    }
}

/// One log record per routed request with its status and latency.
pub struct RequestLogger;

#[async_trait(?Send)]
impl Middleware for RequestLogger {
    async fn handle(&self, ctx: RequestContext, next: Next<'_>) -> Result<Response, AppError> {
        let method = ctx.request().method().clone();
        let path = ctx.request().uri().path().to_owned();
        let started = Instant::now();

        let outcome = next.run(ctx).await;
        let status = match &outcome {
            Ok(response) => response.status(),
            Err(err) => err.status(),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if status.is_server_error() {
            tracing::warn!(%method, %path, status = status.as_u16(), elapsed_ms, "request failed");
        } else {
            tracing::info!(%method, %path, status = status.as_u16(), elapsed_ms, "request served");
        }
        outcome
    }
}
