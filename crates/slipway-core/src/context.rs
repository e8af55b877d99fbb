use serde::de::DeserializeOwned;

use crate::body::Body;
use crate::error::AppError;
use crate::http::Request;
use crate::params::PathParams;

/// A matched request as a handler sees it.
pub struct RequestContext {
    request: Request,
    params: PathParams,
}

impl RequestContext {
    pub fn new(request: Request, params: PathParams) -> Self {
        Self { request, params }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    pub fn path_params(&self) -> &PathParams {
        &self.params
    }

    /// First value of header `name`, when it is visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.headers().get(name)?.to_str().ok()
    }

    pub fn path<T>(&self) -> Result<T, AppError>
    where
        T: DeserializeOwned,
    {
        self.params
            .deserialize()
            .map_err(|err| AppError::bad_request(format!("invalid path parameters: {err}")))
    }

    pub fn json<T>(&self) -> Result<T, AppError>
    where
        T: DeserializeOwned,
    {
        let Body::Once(bytes) = self.request.body() else {
            return Err(AppError::bad_request("JSON payload must be buffered"));
        };
        serde_json::from_slice(bytes)
            .map_err(|err| AppError::bad_request(format!("invalid JSON payload: {err}")))
    }
}
