use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use matchit::Router as PathTable;

use crate::context::RequestContext;
use crate::endpoint::{Endpoint, Handler};
use crate::error::AppError;
use crate::http::{Method, Request, Response};
use crate::middleware::{Middleware, Next};
use crate::params::PathParams;
use crate::response::IntoResponse;

type Methods = HashMap<Method, Endpoint>;

/// Collects routes and middleware. Templates use matchit syntax (`/items/{id}`,
/// `/assets/{*rest}`), and each template holds one endpoint per method.
#[derive(Default)]
pub struct RouterBuilder {
    templates: BTreeMap<String, Methods>,
    layers: Vec<Arc<dyn Middleware>>,
}

impl RouterBuilder {
    /// # Panics
    ///
    /// When `method` is already registered for `template`.
    pub fn route<H>(mut self, method: Method, template: &str, handler: H) -> Self
    where
        H: Handler,
    {
        let methods = self.templates.entry(template.to_owned()).or_default();
        if methods.insert(method.clone(), handler.into_endpoint()).is_some() {
            panic!("route {method} {template} registered twice");
        }
        self
    }

    pub fn get<H: Handler>(self, template: &str, handler: H) -> Self {
        self.route(Method::GET, template, handler)
    }

    pub fn post<H: Handler>(self, template: &str, handler: H) -> Self {
        self.route(Method::POST, template, handler)
    }

    pub fn middleware<M: Middleware>(mut self, layer: M) -> Self {
        self.layers.push(Arc::new(layer));
        self
    }

    /// # Panics
    ///
    /// When matchit rejects a template, for bad syntax or a conflict with another one.
    pub fn build(self) -> RouterService {
        let mut table = PathTable::new();
        for (template, methods) in self.templates {
            if let Err(err) = table.insert(template.as_str(), methods) {
                panic!("invalid route template {template}: {err}");
            }
        }
        RouterService {
            routes: Arc::new(Routes {
                table,
                layers: self.layers,
            }),
        }
    }
}

/// Frozen route table shared by every invocation of a warm process.
#[derive(Clone)]
pub struct RouterService {
    routes: Arc<Routes>,
}

impl RouterService {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Route `request` and answer it. Routing and handler errors come back as their error
    /// responses, so this never fails.
    pub async fn oneshot(&self, request: Request) -> Response {
        self.routes
            .dispatch(request)
            .await
            .unwrap_or_else(IntoResponse::into_response)
    }
}

struct Routes {
    table: PathTable<Methods>,
    layers: Vec<Arc<dyn Middleware>>,
}

impl Routes {
    async fn dispatch(&self, request: Request) -> Result<Response, AppError> {
        let path = request.uri().path();
        let matched = self.table.at(path).map_err(|_| AppError::not_found(path))?;
        let methods = matched.value;
        let Some(endpoint) = methods.get(request.method()) else {
            let allowed: Vec<Method> = methods.keys().cloned().collect();
            return Err(AppError::method_not_allowed(request.method(), &allowed));
        };
        let params: PathParams = matched.params.iter().collect();

        let ctx = RequestContext::new(request, params);
        Next::new(&self.layers, endpoint.as_ref()).run(ctx).await
    }
}
