//! Invocation event shapes delivered by the platform.
//!
//! The platform hands the function a bare JSON document; the event source is inferred from its
//! shape and the document is then decoded into the matching typed event. API Gateway sends
//! `null` rather than omitting empty maps, so every optional collection tolerates both.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use slipway_core::error::AppError;

/// Event source an invocation came from. Decides both request parsing and reply shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// API Gateway REST API (payload format 1.0).
    #[default]
    RestApi,
    /// API Gateway HTTP API (payload format 2.0) and function URLs.
    HttpApi,
    /// Application Load Balancer target.
    LoadBalancer,
    /// CloudFront Lambda@Edge origin/viewer request.
    EdgeRequest,
}

impl EventKind {
    pub fn infer(event: &Value) -> Option<Self> {
        if event
            .pointer("/Records/0/cf")
            .is_some_and(Value::is_object)
        {
            return Some(Self::EdgeRequest);
        }

        let request_context = event.get("requestContext");
        if request_context
            .and_then(|ctx| ctx.get("elb"))
            .is_some_and(Value::is_object)
        {
            return Some(Self::LoadBalancer);
        }

        if event.get("version").and_then(Value::as_str) == Some("2.0")
            && request_context
                .and_then(|ctx| ctx.get("http"))
                .is_some_and(Value::is_object)
        {
            return Some(Self::HttpApi);
        }

        if event.get("resource").is_some() && event.get("httpMethod").is_some() {
            return Some(Self::RestApi);
        }

        None
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RestApi => "rest-api",
            Self::HttpApi => "http-api",
            Self::LoadBalancer => "load-balancer",
            Self::EdgeRequest => "edge-request",
        }
    }
}

/// A decoded invocation event.
#[derive(Clone, Debug)]
pub enum InvocationEvent {
    RestApi(RestApiEvent),
    HttpApi(HttpApiEvent),
    LoadBalancer(LoadBalancerEvent),
    EdgeRequest(EdgeRequest),
}

impl InvocationEvent {
    /// Infer the event source and decode the event. Failures are translation errors and map to
    /// `400 Bad Request`.
    pub fn from_value(event: Value) -> Result<Self, AppError> {
        let kind = EventKind::infer(&event)
            .ok_or_else(|| AppError::bad_request("unable to infer event source"))?;
        let invalid = |err: serde_json::Error| {
            AppError::bad_request(format!("malformed {} event: {}", kind.as_str(), err))
        };

        let event = match kind {
            EventKind::RestApi => Self::RestApi(serde_json::from_value(event).map_err(invalid)?),
            EventKind::HttpApi => Self::HttpApi(serde_json::from_value(event).map_err(invalid)?),
            EventKind::LoadBalancer => {
                Self::LoadBalancer(serde_json::from_value(event).map_err(invalid)?)
            }
            EventKind::EdgeRequest => {
                let edge: EdgeEvent = serde_json::from_value(event).map_err(invalid)?;
                let record = edge.records.into_iter().next().ok_or_else(|| {
                    AppError::bad_request("malformed edge-request event: no records")
                })?;
                Self::EdgeRequest(record.cf.request)
            }
        };
        Ok(event)
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::RestApi(_) => EventKind::RestApi,
            Self::HttpApi(_) => EventKind::HttpApi,
            Self::LoadBalancer(_) => EventKind::LoadBalancer,
            Self::EdgeRequest(_) => EventKind::EdgeRequest,
        }
    }

    /// Whether the load balancer delivered headers as `multiValueHeaders`, which obliges the
    /// reply to use the same form.
    pub fn uses_multi_value_headers(&self) -> bool {
        match self {
            Self::LoadBalancer(event) => event.multi_value_headers.is_some(),
            _ => false,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestApiEvent {
    pub resource: String,
    pub path: String,
    pub http_method: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: HashMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub multi_value_headers: HashMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub query_string_parameters: HashMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub multi_value_query_string_parameters: HashMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub request_context: RestApiRequestContext,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_base64_encoded: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestApiRequestContext {
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub identity: RestApiIdentity,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestApiIdentity {
    #[serde(default)]
    pub source_ip: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpApiEvent {
    pub raw_path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub raw_query_string: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cookies: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: HashMap<String, String>,
    pub request_context: HttpApiRequestContext,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_base64_encoded: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpApiRequestContext {
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    pub http: HttpApiDescription,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpApiDescription {
    pub method: String,
    #[serde(default)]
    pub source_ip: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerEvent {
    pub http_method: String,
    pub path: String,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub multi_value_headers: Option<HashMap<String, Vec<String>>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub query_string_parameters: HashMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub multi_value_query_string_parameters: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_base64_encoded: bool,
}

#[derive(Clone, Debug, Deserialize)]
struct EdgeEvent {
    #[serde(rename = "Records")]
    records: Vec<EdgeRecord>,
}

#[derive(Clone, Debug, Deserialize)]
struct EdgeRecord {
    cf: EdgeCf,
}

#[derive(Clone, Debug, Deserialize)]
struct EdgeCf {
    request: EdgeRequest,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRequest {
    pub method: String,
    pub uri: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub querystring: String,
    #[serde(default)]
    pub client_ip: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: HashMap<String, Vec<EdgeHeader>>,
    #[serde(default)]
    pub body: Option<EdgeBody>,
}

/// CloudFront header entry; the map key is the lowercased name, `key` the original casing.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct EdgeHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeBody {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub encoding: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub input_truncated: bool,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
