use std::path::{Path, PathBuf};

use crate::http::{Request, Response};
use crate::router::RouterService;

const DEFAULT_APP_NAME: &str = "Slipway App";

/// What an application is told while it is being built at cold start.
#[derive(Clone, Debug, Default)]
pub struct SetupContext {
    base_path: Option<PathBuf>,
}

impl SetupContext {
    pub fn new(base_path: Option<PathBuf>) -> Self {
        Self { base_path }
    }

    /// Directory holding the application's own files, when the deployment names one.
    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    /// `relative` under the base path, or unchanged when there is none.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        match &self.base_path {
            Some(base) => base.join(relative),
            None => relative.as_ref().to_path_buf(),
        }
    }
}

/// A hosted application. Adapters only ever call [`App::handle`].
pub struct App {
    router: RouterService,
    name: String,
}

impl App {
    pub fn new(router: RouterService) -> Self {
        Self::with_name(router, DEFAULT_APP_NAME)
    }

    pub fn with_name(router: RouterService, name: impl Into<String>) -> Self {
        Self {
            router,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Answer one request. Failures are already rendered as error responses.
    pub async fn handle(&self, request: Request) -> Response {
        self.router.oneshot(request).await
    }
}

/// Entry points an application exposes so an adapter can build it at cold start.
pub trait Hooks {
    fn routes(ctx: &SetupContext) -> RouterService;

    fn name() -> &'static str {
        DEFAULT_APP_NAME
    }

    /// Build the application once per process. Override for fallible one-time work, such
    /// as reading files under [`SetupContext::base_path`], before the first request.
    fn build_app(ctx: &SetupContext) -> anyhow::Result<App>
    where
        Self: Sized,
    {
        Ok(App::with_name(Self::routes(ctx), Self::name()))
    }
}
