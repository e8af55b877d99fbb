use std::collections::{BTreeMap, HashMap};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use slipway_core::body::Body;
use slipway_core::error::AppError;
use slipway_core::http::header::HOST;
use slipway_core::http::{request_builder, HeaderMap, HeaderName, HeaderValue, Method, Request, Uri};

use crate::config::LambdaAdapterConfig;
use crate::context::{InvocationContext, LambdaRequestContext};
use crate::event::{EventKind, InvocationEvent};

/// Characters a raw path may still carry that are not valid in a URI path.
const RAW_PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// REST API paths arrive decoded, so a literal `%` must be escaped as well.
const DECODED_PATH: &AsciiSet = &RAW_PATH.add(b'%');

/// Source-independent view of an invocation event before validation.
struct EventParts {
    kind: EventKind,
    method: String,
    path: String,
    path_is_decoded: bool,
    query: String,
    headers: Vec<(String, String)>,
    body: Option<String>,
    is_base64: bool,
    source_ip: Option<String>,
    stage: Option<String>,
}

impl EventParts {
    fn from_event(event: InvocationEvent, config: &LambdaAdapterConfig) -> Result<Self, AppError> {
        let kind = event.kind();
        let parts = match event {
            InvocationEvent::RestApi(event) => Self {
                kind,
                method: event.http_method,
                path: config.strip_base_path(&event.path),
                path_is_decoded: true,
                query: encode_query(
                    event.query_string_parameters,
                    event.multi_value_query_string_parameters,
                )?,
                headers: flatten_headers(Some(event.headers), Some(event.multi_value_headers)),
                body: event.body,
                is_base64: event.is_base64_encoded,
                source_ip: event.request_context.identity.source_ip,
                stage: event.request_context.stage,
            },
            InvocationEvent::HttpApi(event) => {
                let mut headers: Vec<(String, String)> = event.headers.into_iter().collect();
                if !event.cookies.is_empty() {
                    headers.push(("cookie".to_string(), event.cookies.join("; ")));
                }
                Self {
                    kind,
                    method: event.request_context.http.method,
                    path: event.raw_path,
                    path_is_decoded: false,
                    query: event.raw_query_string,
                    headers,
                    body: event.body,
                    is_base64: event.is_base64_encoded,
                    source_ip: event.request_context.http.source_ip,
                    stage: event.request_context.stage,
                }
            }
            InvocationEvent::LoadBalancer(event) => Self {
                kind,
                method: event.http_method,
                path: event.path,
                path_is_decoded: false,
                query: join_encoded_query(
                    event.query_string_parameters,
                    event.multi_value_query_string_parameters,
                ),
                headers: flatten_headers(event.headers, event.multi_value_headers),
                body: event.body,
                is_base64: event.is_base64_encoded,
                source_ip: None,
                stage: None,
            },
            InvocationEvent::EdgeRequest(request) => {
                let headers = request
                    .headers
                    .into_iter()
                    .flat_map(|(name, entries)| {
                        entries
                            .into_iter()
                            .map(move |entry| (name.clone(), entry.value))
                    })
                    .collect();
                let (body, is_base64) = match request.body {
                    Some(body) if !body.data.is_empty() => {
                        let is_base64 = body.encoding.eq_ignore_ascii_case("base64");
                        (Some(body.data), is_base64)
                    }
                    _ => (None, false),
                };
                Self {
                    kind,
                    method: request.method,
                    path: request.uri,
                    path_is_decoded: false,
                    query: request.querystring,
                    headers,
                    body,
                    is_base64,
                    source_ip: request.client_ip,
                    stage: None,
                }
            }
        };
        Ok(parts)
    }
}

/// Translate a decoded invocation event into a core request for the hosted application.
///
/// Malformed methods, headers, URIs and bodies are translation errors (`400 Bad Request`).
pub fn into_core_request(
    event: InvocationEvent,
    invocation: &InvocationContext,
    config: &LambdaAdapterConfig,
) -> Result<Request, AppError> {
    let parts = EventParts::from_event(event, config)?;

    let method = Method::from_bytes(parts.method.as_bytes())
        .map_err(|_| AppError::bad_request(format!("invalid request method `{}`", parts.method)))?;
    let headers = build_headers(parts.headers)?;
    let escape = if parts.path_is_decoded {
        DECODED_PATH
    } else {
        RAW_PATH
    };
    let uri = build_uri(&parts.path, escape, &parts.query, &headers)?;
    let body = decode_body(parts.body, parts.is_base64)?;

    let mut request = request_builder()
        .method(method)
        .uri(uri)
        .body(body)
        .map_err(AppError::internal)?;
    *request.headers_mut() = headers;

    LambdaRequestContext::insert(
        &mut request,
        LambdaRequestContext {
            kind: parts.kind,
            source_ip: parts.source_ip.and_then(|ip| ip.parse().ok()),
            stage: parts.stage,
            invocation: invocation.clone(),
        },
    );

    Ok(request)
}

fn build_headers(headers: Vec<(String, String)>) -> Result<HeaderMap, AppError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| AppError::bad_request(format!("invalid header name `{}`", name)))?;
        let header_value = HeaderValue::from_str(&value)
            .map_err(|_| AppError::bad_request(format!("invalid value for header `{}`", name)))?;
        map.append(header_name, header_value);
    }
    Ok(map)
}

fn build_uri(
    path: &str,
    escape: &'static AsciiSet,
    query: &str,
    headers: &HeaderMap,
) -> Result<Uri, AppError> {
    let mut target = String::new();
    if !path.starts_with('/') {
        target.push('/');
    }
    target.extend(utf8_percent_encode(path, escape));
    if !query.is_empty() {
        target.push('?');
        target.push_str(query);
    }

    let host = headers.get(HOST).and_then(|value| value.to_str().ok());
    let uri = match host {
        Some(host) if !host.is_empty() => {
            let scheme = headers
                .get("x-forwarded-proto")
                .and_then(|value| value.to_str().ok())
                .filter(|proto| !proto.is_empty())
                .unwrap_or("https");
            format!("{scheme}://{host}{target}")
        }
        _ => target,
    };

    uri.parse::<Uri>()
        .map_err(|err| AppError::bad_request(format!("invalid request URI: {}", err)))
}

fn decode_body(body: Option<String>, is_base64: bool) -> Result<Body, AppError> {
    match body {
        None => Ok(Body::empty()),
        Some(data) if is_base64 => STANDARD
            .decode(data.as_bytes())
            .map(Body::from)
            .map_err(|err| AppError::bad_request(format!("invalid base64 body: {}", err))),
        Some(data) => Ok(Body::from(data)),
    }
}

/// Multi-value headers win when both forms are present; they carry every repeated value.
fn flatten_headers(
    single: Option<HashMap<String, String>>,
    multi: Option<HashMap<String, Vec<String>>>,
) -> Vec<(String, String)> {
    match multi.filter(|multi| !multi.is_empty()) {
        Some(multi) => multi
            .into_iter()
            .flat_map(|(name, values)| values.into_iter().map(move |v| (name.clone(), v)))
            .collect(),
        None => single.unwrap_or_default().into_iter().collect(),
    }
}

/// REST API query parameters arrive decoded; re-encode them in key order.
fn encode_query(
    single: HashMap<String, String>,
    multi: HashMap<String, Vec<String>>,
) -> Result<String, AppError> {
    let pairs = query_pairs(single, multi);
    serde_urlencoded::to_string(&pairs).map_err(AppError::internal)
}

/// Load balancer query parameters arrive still percent-encoded; join them as they are.
fn join_encoded_query(single: HashMap<String, String>, multi: HashMap<String, Vec<String>>) -> String {
    query_pairs(single, multi)
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn query_pairs(
    single: HashMap<String, String>,
    multi: HashMap<String, Vec<String>>,
) -> Vec<(String, String)> {
    if multi.is_empty() {
        let sorted: BTreeMap<_, _> = single.into_iter().collect();
        return sorted.into_iter().collect();
    }
    let sorted: BTreeMap<_, _> = multi.into_iter().collect();
    sorted
        .into_iter()
        .flat_map(|(key, values)| values.into_iter().map(move |v| (key.clone(), v)))
        .collect()
}
