use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use slipway_core::error::AppError;
use slipway_core::http::header::{CONTENT_ENCODING, CONTENT_TYPE, SET_COOKIE};
use slipway_core::http::{HeaderMap, Response, StatusCode};

use crate::config::LambdaAdapterConfig;
use crate::event::{EdgeHeader, EventKind, InvocationEvent};

/// Content encodings whose bodies are always binary regardless of content type.
const BINARY_ENCODINGS: &[&str] = &["gzip", "deflate", "br"];

/// Which reply document to produce. Mirrors the event the reply answers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplyShape {
    pub kind: EventKind,
    /// Load balancer targets must answer in the header form they were sent.
    pub multi_value_headers: bool,
}

impl ReplyShape {
    pub fn for_event(event: &InvocationEvent) -> Self {
        Self {
            kind: event.kind(),
            multi_value_headers: event.uses_multi_value_headers(),
        }
    }
}

/// Reply document handed back to the platform, one variant per event source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum InvocationReply {
    RestApi(RestApiReply),
    HttpApi(HttpApiReply),
    LoadBalancer(LoadBalancerReply),
    Edge(EdgeReply),
}

impl InvocationReply {
    /// The shape this reply was rendered in.
    pub fn shape(&self) -> ReplyShape {
        let (kind, multi_value_headers) = match self {
            Self::RestApi(_) => (EventKind::RestApi, false),
            Self::HttpApi(_) => (EventKind::HttpApi, false),
            Self::LoadBalancer(reply) => {
                (EventKind::LoadBalancer, reply.multi_value_headers.is_some())
            }
            Self::Edge(_) => (EventKind::EdgeRequest, false),
        };
        ReplyShape {
            kind,
            multi_value_headers,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::RestApi(reply) => reply.status_code,
            Self::HttpApi(reply) => reply.status_code,
            Self::LoadBalancer(reply) => reply.status_code,
            Self::Edge(reply) => reply.status.parse().unwrap_or_default(),
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Self::RestApi(reply) => &reply.body,
            Self::HttpApi(reply) => &reply.body,
            Self::LoadBalancer(reply) => &reply.body,
            Self::Edge(reply) => &reply.body,
        }
    }

    pub fn is_base64_encoded(&self) -> bool {
        match self {
            Self::RestApi(reply) => reply.is_base64_encoded,
            Self::HttpApi(reply) => reply.is_base64_encoded,
            Self::LoadBalancer(reply) => reply.is_base64_encoded,
            Self::Edge(reply) => reply.body_encoding == "base64",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestApiReply {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub multi_value_headers: BTreeMap<String, Vec<String>>,
    pub body: String,
    pub is_base64_encoded: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpApiReply {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cookies: Vec<String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerReply {
    pub status_code: u16,
    pub status_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_value_headers: Option<BTreeMap<String, Vec<String>>>,
    pub body: String,
    pub is_base64_encoded: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeReply {
    pub status: String,
    pub status_description: String,
    pub headers: BTreeMap<String, Vec<EdgeHeader>>,
    pub body: String,
    pub body_encoding: String,
}

/// Collect the core response body and render it in the reply shape of the originating event.
pub async fn from_core_response(
    response: Response,
    shape: ReplyShape,
    config: &LambdaAdapterConfig,
) -> Result<InvocationReply, AppError> {
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.map_err(AppError::internal)?;
    Ok(build_reply(
        parts.status,
        &parts.headers,
        &bytes,
        shape,
        config,
    ))
}

/// Render an already-buffered response. Used directly for replies the adapter produces itself.
pub fn build_reply(
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
    shape: ReplyShape,
    config: &LambdaAdapterConfig,
) -> InvocationReply {
    let grouped = group_headers(headers, config);
    let (body, is_base64_encoded) = encode_body(headers, body, config);
    let status_code = status.as_u16();

    match shape.kind {
        EventKind::RestApi => {
            let mut single = BTreeMap::new();
            let mut multi = BTreeMap::new();
            for (name, mut values) in grouped {
                if values.len() == 1 {
                    single.insert(name, values.remove(0));
                } else {
                    multi.insert(name, values);
                }
            }
            InvocationReply::RestApi(RestApiReply {
                status_code,
                headers: single,
                multi_value_headers: multi,
                body,
                is_base64_encoded,
            })
        }
        EventKind::HttpApi => {
            let mut cookies = Vec::new();
            let mut joined = BTreeMap::new();
            for (name, values) in grouped {
                if name == SET_COOKIE.as_str() {
                    cookies.extend(values);
                } else {
                    joined.insert(name, values.join(", "));
                }
            }
            InvocationReply::HttpApi(HttpApiReply {
                status_code,
                headers: joined,
                cookies,
                body,
                is_base64_encoded,
            })
        }
        EventKind::LoadBalancer => {
            let (headers, multi_value_headers) = if shape.multi_value_headers {
                (None, Some(grouped))
            } else {
                (Some(single_valued(grouped)), None)
            };
            InvocationReply::LoadBalancer(LoadBalancerReply {
                status_code,
                status_description: status_line(status),
                headers,
                multi_value_headers,
                body,
                is_base64_encoded,
            })
        }
        EventKind::EdgeRequest => {
            let headers = grouped
                .into_iter()
                .map(|(name, values)| {
                    let entries = values
                        .into_iter()
                        .map(|value| EdgeHeader {
                            key: Some(name.clone()),
                            value,
                        })
                        .collect();
                    (name, entries)
                })
                .collect();
            InvocationReply::Edge(EdgeReply {
                status: status_code.to_string(),
                status_description: status.canonical_reason().unwrap_or_default().to_string(),
                headers,
                body,
                body_encoding: if is_base64_encoded { "base64" } else { "text" }.to_string(),
            })
        }
    }
}

fn group_headers(
    headers: &HeaderMap,
    config: &LambdaAdapterConfig,
) -> BTreeMap<String, Vec<String>> {
    let mut grouped = BTreeMap::new();
    for name in headers.keys() {
        if config.is_excluded_header(name.as_str()) {
            continue;
        }
        let values = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect();
        grouped.insert(name.as_str().to_string(), values);
    }
    grouped
}

/// Repeated values are comma-joined, except `set-cookie` which cannot be and keeps its last value.
fn single_valued(grouped: BTreeMap<String, Vec<String>>) -> BTreeMap<String, String> {
    grouped
        .into_iter()
        .map(|(name, mut values)| {
            let value = if name == SET_COOKIE.as_str() {
                values.pop().unwrap_or_default()
            } else {
                values.join(", ")
            };
            (name, value)
        })
        .collect()
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

fn encode_body(headers: &HeaderMap, body: &[u8], config: &LambdaAdapterConfig) -> (String, bool) {
    if body.is_empty() {
        return (String::new(), false);
    }

    let compressed = headers.get_all(CONTENT_ENCODING).iter().any(|value| {
        value.to_str().is_ok_and(|encodings| {
            encodings.split(',').any(|encoding| {
                let encoding = encoding.trim();
                BINARY_ENCODINGS
                    .iter()
                    .any(|binary| binary.eq_ignore_ascii_case(encoding))
            })
        })
    });
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if !compressed && config.is_text_content_type(content_type) {
        if let Ok(text) = std::str::from_utf8(body) {
            return (text.to_string(), false);
        }
    }
    (STANDARD.encode(body), true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::executor::block_on;
    use futures::stream;
    use serde_json::json;
    use slipway_core::body::Body;
    use slipway_core::http::response_builder;

    fn shape(kind: EventKind) -> ReplyShape {
        ReplyShape {
            kind,
            multi_value_headers: false,
        }
    }

    fn sample_response() -> Response {
        response_builder()
            .status(StatusCode::CREATED)
            .header("content-type", "application/json")
            .header("set-cookie", "a=1")
            .header("set-cookie", "b=2")
            .header("x-trace", "t-1")
            .body(Body::from(r#"{"ok":true}"#))
            .expect("response")
    }

    fn render(response: Response, shape: ReplyShape) -> InvocationReply {
        block_on(from_core_response(
            response,
            shape,
            &LambdaAdapterConfig::default(),
        ))
        .expect("reply")
    }

    #[test]
    fn rest_api_reply_splits_repeated_headers() {
        let reply = render(sample_response(), shape(EventKind::RestApi));
        let value = serde_json::to_value(&reply).expect("json");
        assert_eq!(
            value,
            json!({
                "statusCode": 201,
                "headers": {"content-type": "application/json", "x-trace": "t-1"},
                "multiValueHeaders": {"set-cookie": ["a=1", "b=2"]},
                "body": "{\"ok\":true}",
                "isBase64Encoded": false
            })
        );
    }

    #[test]
    fn http_api_reply_moves_cookies() {
        let reply = render(sample_response(), shape(EventKind::HttpApi));
        let InvocationReply::HttpApi(reply) = reply else {
            panic!("expected HTTP API reply");
        };
        assert_eq!(reply.cookies, vec!["a=1".to_string(), "b=2".to_string()]);
        assert!(!reply.headers.contains_key("set-cookie"));
        assert_eq!(reply.headers["x-trace"], "t-1");
    }

    #[test]
    fn load_balancer_reply_follows_request_header_mode() {
        let single = render(sample_response(), shape(EventKind::LoadBalancer));
        let value = serde_json::to_value(&single).expect("json");
        assert_eq!(value["statusDescription"], "201 Created");
        assert_eq!(value["headers"]["set-cookie"], "b=2");
        assert!(value.get("multiValueHeaders").is_none());

        let multi = render(
            sample_response(),
            ReplyShape {
                kind: EventKind::LoadBalancer,
                multi_value_headers: true,
            },
        );
        let value = serde_json::to_value(&multi).expect("json");
        assert_eq!(value["multiValueHeaders"]["set-cookie"], json!(["a=1", "b=2"]));
        assert!(value.get("headers").is_none());
    }

    #[test]
    fn edge_reply_uses_cloudfront_layout() {
        let reply = render(sample_response(), shape(EventKind::EdgeRequest));
        let value = serde_json::to_value(&reply).expect("json");
        assert_eq!(value["status"], "201");
        assert_eq!(value["statusDescription"], "Created");
        assert_eq!(value["bodyEncoding"], "text");
        assert_eq!(
            value["headers"]["x-trace"],
            json!([{"key": "x-trace", "value": "t-1"}])
        );
        assert_eq!(reply.status_code(), 201);
    }

    #[test]
    fn binary_and_compressed_bodies_are_base64() {
        let png = response_builder()
            .header("content-type", "image/png")
            .body(Body::from(vec![0x89, b'P', b'N', b'G']))
            .expect("response");
        let reply = render(png, shape(EventKind::RestApi));
        assert!(reply.is_base64_encoded());
        assert_eq!(reply.body(), STANDARD.encode([0x89, b'P', b'N', b'G']));

        let gzipped = response_builder()
            .header("content-type", "text/plain")
            .header("content-encoding", "gzip")
            .body(Body::from("not really gzip"))
            .expect("response");
        let reply = render(gzipped, shape(EventKind::HttpApi));
        assert!(reply.is_base64_encoded());
    }

    #[test]
    fn empty_body_is_plain_text() {
        let response = response_builder()
            .status(StatusCode::NO_CONTENT)
            .header("content-type", "image/png")
            .body(Body::empty())
            .expect("response");
        let reply = render(response, shape(EventKind::EdgeRequest));
        assert_eq!(reply.body(), "");
        assert!(!reply.is_base64_encoded());
    }

    #[test]
    fn streamed_body_is_collected() {
        let response = response_builder()
            .header("content-type", "text/plain")
            .body(Body::stream(stream::iter(vec![
                Bytes::from_static(b"hello "),
                Bytes::from_static(b"world"),
            ])))
            .expect("response");
        let reply = render(response, shape(EventKind::RestApi));
        assert_eq!(reply.body(), "hello world");
    }

    #[test]
    fn excluded_headers_are_dropped() {
        let config = LambdaAdapterConfig::default().with_exclude_headers(["X-Trace"]);
        let reply = block_on(from_core_response(
            sample_response(),
            shape(EventKind::RestApi),
            &config,
        ))
        .expect("reply");
        let InvocationReply::RestApi(reply) = reply else {
            panic!("expected REST API reply");
        };
        assert!(!reply.headers.contains_key("x-trace"));
        assert!(reply.headers.contains_key("content-type"));
    }

    #[test]
    fn invalid_utf8_under_text_type_falls_back_to_base64() {
        let response = response_builder()
            .header("content-type", "text/plain")
            .body(Body::from(vec![0xff, 0xfe]))
            .expect("response");
        let reply = render(response, shape(EventKind::RestApi));
        assert!(reply.is_base64_encoded());
    }

    #[test]
    fn edge_reply_marks_binary_body_as_base64() {
        let bytes = vec![0x1f, 0x8b, 0x08, 0x00];
        let response = response_builder()
            .header("content-type", "application/octet-stream")
            .body(Body::from(bytes.clone()))
            .expect("response");
        let reply = render(response, shape(EventKind::EdgeRequest));
        let value = serde_json::to_value(&reply).expect("json");
        assert_eq!(value["bodyEncoding"], "base64");
        assert_eq!(value["body"], STANDARD.encode(&bytes));
        assert!(reply.is_base64_encoded());
    }

    #[test]
    fn reply_reports_the_shape_it_was_rendered_in() {
        for kind in [
            EventKind::RestApi,
            EventKind::HttpApi,
            EventKind::LoadBalancer,
            EventKind::EdgeRequest,
        ] {
            assert_eq!(render(sample_response(), shape(kind)).shape(), shape(kind));
        }
        let multi = ReplyShape {
            kind: EventKind::LoadBalancer,
            multi_value_headers: true,
        };
        assert_eq!(render(sample_response(), multi).shape(), multi);
    }

    #[test]
    fn failing_stream_is_an_internal_error() {
        let response = response_builder()
            .body(Body::try_stream(stream::iter(vec![
                Ok(Bytes::from_static(b"half")),
                Err(std::io::Error::other("origin reset")),
            ])))
            .expect("response");
        let err = block_on(from_core_response(
            response,
            shape(EventKind::HttpApi),
            &LambdaAdapterConfig::default(),
        ))
        .expect_err("stream error");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
