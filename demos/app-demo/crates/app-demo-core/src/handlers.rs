use bytes::Bytes;
use futures::{stream, StreamExt};
use slipway_core::body::Body;
use slipway_core::context::RequestContext;
use slipway_core::error::AppError;
use slipway_core::http::{self, Response, StatusCode};
use slipway_core::response::Text;

#[derive(serde::Deserialize)]
pub(crate) struct EchoParams {
    pub(crate) name: String,
}

#[derive(serde::Deserialize)]
pub(crate) struct EchoBody {
    pub(crate) name: String,
}

pub(crate) async fn root(_ctx: RequestContext) -> Result<Text<&'static str>, AppError> {
    Ok(Text::new("Slipway Demo App"))
}

pub(crate) async fn echo(ctx: RequestContext) -> Result<Text<String>, AppError> {
    let params: EchoParams = ctx.path()?;
    Ok(Text::new(format!("Hello, {}!", params.name)))
}

pub(crate) async fn echo_json(ctx: RequestContext) -> Result<Text<String>, AppError> {
    let body: EchoBody = ctx.json()?;
    Ok(Text::new(format!("Hello, {}!", body.name)))
}

pub(crate) async fn headers(ctx: RequestContext) -> Result<Text<String>, AppError> {
    let ua = ctx.header("user-agent").unwrap_or("(unknown)");
    Ok(Text::new(format!("ua={}", ua)))
}

pub(crate) async fn stream(_ctx: RequestContext) -> Result<Response, AppError> {
    let body =
        Body::stream(stream::iter(0..5).map(|index| Bytes::from(format!("chunk {}\n", index))));

    http::response_builder()
        .status(StatusCode::OK)
        .header("content-type", "text/plain; charset=utf-8")
        .body(body)
        .map_err(AppError::internal)
}

pub(crate) async fn fail(_ctx: RequestContext) -> Result<Text<&'static str>, AppError> {
    Err(AppError::internal(anyhow::anyhow!("demo failure")))
}
