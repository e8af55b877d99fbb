use std::sync::Arc;

use anyhow::Context as _;
use lambda_runtime::{service_fn, LambdaEvent};
use log::LevelFilter;
use once_cell::sync::OnceCell;
use serde_json::Value;
use simple_logger::SimpleLogger;
use slipway_core::app::Hooks;
use slipway_core::manifest::Manifest;
use tokio::runtime::Builder as RuntimeBuilder;

use crate::handler::LambdaHandler;
use crate::setup::{build_handler, task_root};
use crate::ADAPTER_NAME;

static LOGGER: OnceCell<()> = OnceCell::new();

/// Install the process logger. Only the first call has any effect.
pub fn init_logger(level: LevelFilter) {
    LOGGER.get_or_init(|| {
        SimpleLogger::new().with_level(level).init().ok();
    });
}

/// Cold start and serve: load the manifest, build the application once, then hand every
/// invocation to a [`LambdaHandler`] until the platform stops the process.
pub fn run_app<A: Hooks>(manifest_src: &str) -> anyhow::Result<()> {
    let manifest = Manifest::parse(manifest_src).context("failed to load slipway manifest")?;
    init_logger(manifest.log_settings(ADAPTER_NAME).level_filter());

    let package_dir = task_root().context("failed to locate the deployment package")?;
    let handler = build_handler::<A>(&manifest, &package_dir)?;
    run_handler(handler)
}

/// Run the platform's event loop for an already-built handler.
pub fn run_handler(handler: LambdaHandler) -> anyhow::Result<()> {
    let runtime = RuntimeBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let handler = Arc::new(handler);
    runtime
        .block_on(lambda_runtime::run(service_fn(
            move |event: LambdaEvent<Value>| {
                let handler = Arc::clone(&handler);
                async move {
                    let reply = tokio::task::block_in_place(|| {
                        handler.handle(event.payload, event.context.into())
                    });
                    Ok::<Value, lambda_runtime::Error>(reply)
                }
            },
        )))
        .map_err(|err| anyhow::anyhow!(err))
        .context("lambda runtime stopped")
}
