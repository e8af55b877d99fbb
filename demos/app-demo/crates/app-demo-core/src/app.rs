use slipway_core::app::{Hooks, SetupContext};
use slipway_core::middleware::RequestLogger;
use slipway_core::router::RouterService;

use crate::handlers::{echo, echo_json, fail, headers, root, stream};

pub struct DemoApp;

impl Hooks for DemoApp {
    fn routes(_ctx: &SetupContext) -> RouterService {
        build_router()
    }

    fn name() -> &'static str {
        "Slipway Demo"
    }
}

pub fn build_router() -> RouterService {
    RouterService::builder()
        .middleware(RequestLogger)
        .get("/", root)
        .get("/echo/{name}", echo)
        .post("/echo", echo_json)
        .get("/headers", headers)
        .get("/stream", stream)
        .get("/fail", fail)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use slipway_core::body::Body;
    use slipway_core::http::{request_builder, Method, StatusCode};

    fn get(path: &str) -> slipway_core::http::Request {
        request_builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())
            .expect("request")
    }

    #[test]
    fn build_app_uses_demo_name() {
        let app = DemoApp::build_app(&SetupContext::default()).expect("app");
        assert_eq!(app.name(), "Slipway Demo");
    }

    #[test]
    fn router_serves_registered_paths() {
        let app = DemoApp::build_app(&SetupContext::default()).expect("app");
        let response = block_on(app.handle(get("/echo/sam")));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_bytes(), b"Hello, sam!");

        let response = block_on(app.handle(get("/nowhere")));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
