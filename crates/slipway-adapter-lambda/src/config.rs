use slipway_core::manifest::Manifest;
use thiserror::Error;

use crate::ADAPTER_NAME;

/// Content types whose bodies are returned as text rather than base64. Matched as prefixes of
/// the response `content-type`, so `text/` covers every text subtype.
pub const DEFAULT_TEXT_MIME_TYPES: &[&str] = &[
    "text/",
    "application/json",
    "application/javascript",
    "application/xml",
    "application/vnd.api+json",
    "application/vnd.oai.openapi",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid base path `{0}`: must be a plain URL path")]
    InvalidBasePath(String),
}

/// Translation settings for the Lambda adapter, read from `[adapters.lambda]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LambdaAdapterConfig {
    base_path: String,
    text_mime_types: Vec<String>,
    exclude_headers: Vec<String>,
}

impl Default for LambdaAdapterConfig {
    fn default() -> Self {
        Self {
            base_path: "/".to_string(),
            text_mime_types: DEFAULT_TEXT_MIME_TYPES
                .iter()
                .map(|mime| mime.to_string())
                .collect(),
            exclude_headers: Vec::new(),
        }
    }
}

impl LambdaAdapterConfig {
    pub fn from_manifest(manifest: &Manifest) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(adapter) = manifest.adapter(ADAPTER_NAME) {
            if let Some(base_path) = &adapter.base_path {
                config = config.with_base_path(base_path)?;
            }
            config = config
                .with_text_mime_types(adapter.text_mime_types.iter().cloned())
                .with_exclude_headers(adapter.exclude_headers.iter().cloned());
        }
        Ok(config)
    }

    /// Set the REST API stage/custom-domain prefix to strip from request paths. A missing
    /// leading slash is added and trailing slashes are dropped.
    pub fn with_base_path(mut self, base_path: &str) -> Result<Self, ConfigError> {
        let trimmed = base_path.trim();
        if trimmed
            .chars()
            .any(|c| c == '?' || c == '#' || c.is_whitespace())
        {
            return Err(ConfigError::InvalidBasePath(base_path.to_string()));
        }
        let trimmed = trimmed.trim_matches('/');
        self.base_path = format!("/{trimmed}");
        Ok(self)
    }

    /// Add content types treated as text, on top of [`DEFAULT_TEXT_MIME_TYPES`].
    pub fn with_text_mime_types<I, S>(mut self, mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for mime in mime_types {
            let mime = mime.into().to_ascii_lowercase();
            if !self.text_mime_types.contains(&mime) {
                self.text_mime_types.push(mime);
            }
        }
        self
    }

    /// Response headers to drop from every reply. Names are compared case-insensitively.
    pub fn with_exclude_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_headers
            .extend(headers.into_iter().map(|h| h.into().to_ascii_lowercase()));
        self
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn text_mime_types(&self) -> &[String] {
        &self.text_mime_types
    }

    pub fn exclude_headers(&self) -> &[String] {
        &self.exclude_headers
    }

    /// Remove the base path from a REST API path. Paths outside the base path are untouched.
    pub fn strip_base_path(&self, path: &str) -> String {
        if self.base_path == "/" {
            return path.to_string();
        }
        match path.strip_prefix(self.base_path.as_str()) {
            Some("") => "/".to_string(),
            Some(rest) if rest.starts_with('/') => rest.to_string(),
            _ => path.to_string(),
        }
    }

    pub fn is_text_content_type(&self, content_type: &str) -> bool {
        let content_type = content_type.trim().to_ascii_lowercase();
        self.text_mime_types
            .iter()
            .any(|mime| content_type.starts_with(mime.as_str()))
    }

    pub fn is_excluded_header(&self, name: &str) -> bool {
        self.exclude_headers
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(name))
    }
}
