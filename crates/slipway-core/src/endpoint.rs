use std::future::Future;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::AppError;
use crate::http::HandlerFuture;
use crate::response::IntoResponse;

/// A route's handler with its return type erased.
pub type EndpointFn = dyn Fn(RequestContext) -> HandlerFuture + Send + Sync;
pub type Endpoint = Arc<EndpointFn>;

/// Anything the router accepts as a route handler: an async function or closure taking a
/// [`RequestContext`] and returning `Result<impl IntoResponse, AppError>`.
pub trait Handler: Send + Sync + 'static {
    fn into_endpoint(self) -> Endpoint;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, AppError>> + 'static,
    R: IntoResponse,
{
    fn into_endpoint(self) -> Endpoint {
        Arc::new(move |ctx| -> HandlerFuture {
            let pending = (self)(ctx);
            Box::pin(async move { pending.await.map(IntoResponse::into_response) })
        })
    }
}
