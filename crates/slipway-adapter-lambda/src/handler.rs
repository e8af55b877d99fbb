use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::executor::block_on;
use futures::FutureExt;
use serde_json::Value;
use slipway_core::app::App;
use slipway_core::error::AppError;
use slipway_core::response::IntoResponse;

use crate::config::LambdaAdapterConfig;
use crate::context::InvocationContext;
use crate::event::{EventKind, InvocationEvent};
use crate::request::into_core_request;
use crate::response::{build_reply, from_core_response, InvocationReply, ReplyShape};

/// Answers invocation events with a warm application.
///
/// Each call is independent: nothing is carried from one invocation to the next, so a
/// single handler can be shared by reference across the runtime loop.
pub struct LambdaHandler {
    app: Arc<App>,
    config: LambdaAdapterConfig,
}

impl LambdaHandler {
    pub fn new<A>(app: A, config: LambdaAdapterConfig) -> Self
    where
        A: Into<Arc<App>>,
    {
        Self {
            app: app.into(),
            config,
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn config(&self) -> &LambdaAdapterConfig {
        &self.config
    }

    /// Produce exactly one reply document for `event`.
    pub fn handle(&self, event: Value, context: InvocationContext) -> Value {
        let reply = self.handle_reply(event, context);
        serde_json::to_value(&reply).unwrap_or_else(|err| {
            log::error!("failed to serialize reply: {}", err);
            self.fallback_value(reply.shape(), err)
        })
    }

    /// 500 in the same reply shape, for when a reply document cannot be serialized.
    fn fallback_value(&self, shape: ReplyShape, err: serde_json::Error) -> Value {
        let reply = self.error_reply(AppError::internal(err), shape);
        serde_json::to_value(reply).unwrap_or(Value::Null)
    }

    pub fn handle_reply(&self, event: Value, context: InvocationContext) -> InvocationReply {
        log::debug!("invocation {} for {}", context.request_id, self.app.name());

        let hint = EventKind::infer(&event).unwrap_or_default();
        let event = match InvocationEvent::from_value(event) {
            Ok(event) => event,
            Err(err) => {
                log::warn!("rejecting invocation {}: {}", context.request_id, err);
                return self.error_reply(err, ReplyShape {
                    kind: hint,
                    multi_value_headers: false,
                });
            }
        };

        let shape = ReplyShape::for_event(&event);
        let request = match into_core_request(event, &context, &self.config) {
            Ok(request) => request,
            Err(err) => {
                log::warn!("rejecting invocation {}: {}", context.request_id, err);
                return self.error_reply(err, shape);
            }
        };

        let exchange = async {
            let response = self.app.handle(request).await;
            from_core_response(response, shape, &self.config).await
        };

        match block_on(AssertUnwindSafe(exchange).catch_unwind()) {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                log::error!("invocation {} failed: {}", context.request_id, err);
                self.error_reply(err, shape)
            }
            Err(payload) => {
                log::error!(
                    "invocation {} panicked: {}",
                    context.request_id,
                    panic_message(&*payload)
                );
                self.error_reply(
                    AppError::internal(anyhow::anyhow!("application panicked")),
                    shape,
                )
            }
        }
    }

    fn error_reply(&self, err: AppError, shape: ReplyShape) -> InvocationReply {
        let (parts, body) = err.into_response().into_parts();
        build_reply(
            parts.status,
            &parts.headers,
            body.as_bytes(),
            shape,
            &self.config,
        )
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;
    use serde_json::json;
    use slipway_core::context::RequestContext;
    use slipway_core::router::RouterService;

    fn handler() -> LambdaHandler {
        let router = RouterService::builder()
            .get("/", |_ctx: RequestContext| async move { Ok::<_, AppError>("root") })
            .get("/boom", |_ctx: RequestContext| async move {
                if true {
                    panic!("boom");
                }
                Ok::<_, AppError>("unreachable")
            })
            .build();
        LambdaHandler::new(App::new(router), LambdaAdapterConfig::default())
    }

    fn http_api(path: &str) -> Value {
        json!({
            "version": "2.0",
            "rawPath": path,
            "requestContext": {"http": {"method": "GET"}}
        })
    }

    #[test]
    fn routes_event_to_application() {
        let reply = handler().handle(http_api("/"), InvocationContext::new("req-1"));
        assert_eq!(reply["statusCode"], 200);
        assert_eq!(reply["body"], "root");
    }

    #[test]
    fn unknown_event_gets_rest_shaped_bad_request() {
        let reply = handler().handle_reply(json!({"foo": 1}), InvocationContext::default());
        let InvocationReply::RestApi(reply) = reply else {
            panic!("expected REST API reply");
        };
        assert_eq!(reply.status_code, 400);
        assert_eq!(reply.headers["content-type"], "application/json");
        let body: Value = serde_json::from_str(&reply.body).expect("json body");
        assert_eq!(body["error"]["message"], "unable to infer event source");
    }

    #[test]
    fn malformed_event_keeps_its_shape() {
        let event = json!({
            "version": "2.0",
            "requestContext": {"http": {"method": "GET"}}
        });
        let reply = handler().handle_reply(event, InvocationContext::default());
        assert!(matches!(reply, InvocationReply::HttpApi(_)));
        assert_eq!(reply.status_code(), 400);
    }

    #[test]
    fn panic_becomes_internal_error_and_handler_survives() {
        let handler = handler();
        let reply = handler.handle_reply(http_api("/boom"), InvocationContext::default());
        assert_eq!(reply.status_code(), 500);

        let reply = handler.handle_reply(http_api("/"), InvocationContext::default());
        assert_eq!(reply.status_code(), 200);
    }

    #[test]
    fn panic_message_reads_common_payloads() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*owned), "owned");
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        assert_eq!(panic_message(&*borrowed), "borrowed");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*other), "non-string panic payload");
    }

    #[test]
    fn serialization_fallback_keeps_event_shape() {
        let shape = ReplyShape {
            kind: EventKind::EdgeRequest,
            multi_value_headers: false,
        };
        let value = handler().fallback_value(shape, serde_json::Error::custom("unserializable"));
        assert_eq!(value["status"], "500");
        assert_eq!(value["statusDescription"], "Internal Server Error");
        assert!(value.get("statusCode").is_none());

        let shape = ReplyShape {
            kind: EventKind::LoadBalancer,
            multi_value_headers: true,
        };
        let value = handler().fallback_value(shape, serde_json::Error::custom("unserializable"));
        assert_eq!(value["statusCode"], 500);
        assert_eq!(value["statusDescription"], "500 Internal Server Error");
        assert!(value["multiValueHeaders"].is_object());
    }
}
