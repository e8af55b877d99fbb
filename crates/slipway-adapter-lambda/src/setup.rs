//! One-time cold start: build the hosted application before the first invocation.

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use slipway_core::app::{App, Hooks, SetupContext};
use slipway_core::manifest::Manifest;
use thiserror::Error;

use crate::config::{ConfigError, LambdaAdapterConfig};
use crate::handler::LambdaHandler;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("application root `{}` is not a directory", .0.display())]
    MissingRoot(PathBuf),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build application: {0:#}")]
    Factory(anyhow::Error),
}

/// Cold to warm transition for a single process.
///
/// The factory runs at most once successfully; a failed attempt leaves the setup cold so a
/// later call may retry.
pub struct Setup<F> {
    factory: F,
    context: SetupContext,
    app: OnceCell<Arc<App>>,
}

impl<F> Setup<F>
where
    F: Fn(&SetupContext) -> anyhow::Result<App>,
{
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            context: SetupContext::default(),
            app: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn with_base_path<P>(mut self, base_path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        self.context = SetupContext::new(Some(base_path.into()));
        self
    }

    pub fn context(&self) -> &SetupContext {
        &self.context
    }

    pub fn is_warm(&self) -> bool {
        self.app.get().is_some()
    }

    pub fn warm(&self) -> Result<Arc<App>, SetupError> {
        let app = self.app.get_or_try_init(|| {
            if let Some(base) = self.context.base_path() {
                if !base.is_dir() {
                    return Err(SetupError::MissingRoot(base.to_path_buf()));
                }
            }
            let app = (self.factory)(&self.context).map_err(SetupError::Factory)?;
            log::info!("cold start complete for {}", app.name());
            Ok(Arc::new(app))
        })?;
        Ok(Arc::clone(app))
    }
}

/// Directory the deployment package was unpacked into: `LAMBDA_TASK_ROOT` on the platform,
/// otherwise the directory of the running executable.
pub fn task_root() -> io::Result<PathBuf> {
    if let Some(root) = env::var_os("LAMBDA_TASK_ROOT") {
        return Ok(PathBuf::from(root));
    }
    let executable = env::current_exe()?;
    Ok(executable
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default())
}

/// Cold start for a [`Hooks`] application: read the adapter table, warm the application
/// with `[app].root` anchored at `package_dir`, and wrap it in a handler.
pub fn build_handler<A>(manifest: &Manifest, package_dir: &Path) -> Result<LambdaHandler, SetupError>
where
    A: Hooks,
{
    let config = LambdaAdapterConfig::from_manifest(manifest)?;
    let mut setup = Setup::new(A::build_app);
    if let Some(root) = manifest.app_root(package_dir) {
        setup = setup.with_base_path(root);
    }
    Ok(LambdaHandler::new(setup.warm()?, config))
}
