//! `slipway.toml`, the deployment manifest compiled into an adapter binary.
//!
//! ```toml
//! [app]
//! name = "demo"
//! root = "apps/backend"
//!
//! [adapters.lambda]
//! base_path = "/prod"
//! text_mime_types = ["application/vnd.custom+json"]
//! exclude_headers = ["x-internal"]
//!
//! [adapters.lambda.logging]
//! level = "debug"
//! ```
//!
//! A top-level `[logging.<adapter>]` table is read when the adapter's own `logging` table
//! is absent.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use serde::{de, Deserialize, Deserializer};
use thiserror::Error;
use validator::Validate;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("manifest failed validation: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct Manifest {
    #[serde(default)]
    #[validate(nested)]
    pub app: AppSection,
    #[serde(default)]
    #[validate(nested)]
    pub adapters: BTreeMap<String, AdapterSection>,
    #[serde(default)]
    pub logging: BTreeMap<String, LoggingSection>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct AppSection {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub name: Option<String>,
    /// Directory of the application's files. Relative roots are taken against the
    /// deployment package, never the working directory.
    #[serde(default)]
    #[validate(length(min = 1))]
    pub root: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct AdapterSection {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub base_path: Option<String>,
    #[serde(default)]
    pub text_mime_types: Vec<String>,
    #[serde(default)]
    pub exclude_headers: Vec<String>,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct LoggingSection {
    #[serde(default, deserialize_with = "level_name")]
    pub level: Option<LevelFilter>,
    #[serde(default)]
    pub echo_stdout: Option<bool>,
}

impl LoggingSection {
    fn is_empty(&self) -> bool {
        self.level.is_none() && self.echo_stdout.is_none()
    }
}

/// Effective logging for one adapter. Defaults to `info`, echoed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LevelFilter,
    pub echo_stdout: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            echo_stdout: true,
        }
    }
}

impl LogSettings {
    /// `echo_stdout = false` turns logging off whatever the level.
    pub fn level_filter(&self) -> LevelFilter {
        if self.echo_stdout {
            self.level
        } else {
            LevelFilter::Off
        }
    }
}

impl Manifest {
    pub fn parse(source: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(source)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// `[app].root` taken against `package_dir`. An absolute root is returned unchanged.
    pub fn app_root(&self, package_dir: &Path) -> Option<PathBuf> {
        self.app.root.as_deref().map(|root| package_dir.join(root))
    }

    /// The `[adapters.<name>]` table, matched case-insensitively.
    pub fn adapter(&self, name: &str) -> Option<&AdapterSection> {
        lookup(&self.adapters, name)
    }

    pub fn log_settings(&self, adapter: &str) -> LogSettings {
        let section = self
            .adapter(adapter)
            .map(|section| section.logging)
            .filter(|logging| !logging.is_empty())
            .or_else(|| lookup(&self.logging, adapter).copied())
            .unwrap_or_default();
        let defaults = LogSettings::default();
        LogSettings {
            level: section.level.unwrap_or(defaults.level),
            echo_stdout: section.echo_stdout.unwrap_or(defaults.echo_stdout),
        }
    }
}

fn lookup<'a, T>(tables: &'a BTreeMap<String, T>, name: &str) -> Option<&'a T> {
    tables
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, table)| table)
}

fn level_name<'de, D>(deserializer: D) -> Result<Option<LevelFilter>, D::Error>
where
    D: Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    name.trim().parse().map(Some).map_err(|_| {
        de::Error::custom(format!(
            "unknown log level `{name}`, expected off, error, warn, info, debug or trace"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPLOYMENT: &str = r#"
[app]
name = "orders"
root = "apps/backend"

[adapters.Lambda]
base_path = "/prod"
text_mime_types = ["application/vnd.orders+json"]
exclude_headers = ["X-Internal"]

[adapters.Lambda.logging]
level = "Debug"

[logging.lambda]
level = "error"
"#;

    #[test]
    fn reads_app_and_adapter_tables() {
        let manifest = Manifest::parse(DEPLOYMENT).expect("manifest");
        assert_eq!(manifest.app.name.as_deref(), Some("orders"));

        let lambda = manifest.adapter("lambda").expect("lambda table");
        assert_eq!(lambda.base_path.as_deref(), Some("/prod"));
        assert_eq!(lambda.text_mime_types, ["application/vnd.orders+json"]);
        assert_eq!(lambda.exclude_headers, ["X-Internal"]);
        assert!(manifest.adapter("cloudfront").is_none());
    }

    #[test]
    fn adapter_logging_table_wins() {
        let manifest = Manifest::parse(DEPLOYMENT).expect("manifest");
        let settings = manifest.log_settings("lambda");
        assert_eq!(settings.level, LevelFilter::Debug);
        assert_eq!(settings.level_filter(), LevelFilter::Debug);
    }

    #[test]
    fn top_level_logging_is_the_fallback() {
        let manifest = Manifest::parse("[logging.lambda]\nlevel = \"warn\"\necho_stdout = false\n")
            .expect("manifest");
        let settings = manifest.log_settings("LAMBDA");
        assert_eq!(settings.level, LevelFilter::Warn);
        assert!(!settings.echo_stdout);
        assert_eq!(settings.level_filter(), LevelFilter::Off);
    }

    #[test]
    fn empty_manifest_logs_at_info() {
        let manifest = Manifest::parse("").expect("manifest");
        assert_eq!(manifest.log_settings("lambda"), LogSettings::default());
        assert_eq!(manifest.log_settings("lambda").level_filter(), LevelFilter::Info);
    }

    #[test]
    fn unknown_level_is_a_parse_error() {
        let err = Manifest::parse("[logging.lambda]\nlevel = \"chatty\"\n").expect_err("level");
        assert!(matches!(err, ManifestError::Parse(_)));
        assert!(err.to_string().contains("unknown log level `chatty`"));
    }

    #[test]
    fn empty_strings_fail_validation() {
        let err = Manifest::parse("[app]\nroot = \"\"\n").expect_err("root");
        assert!(matches!(err, ManifestError::Invalid(_)));

        let err = Manifest::parse("[adapters.lambda]\nbase_path = \"\"\n").expect_err("base");
        assert!(matches!(err, ManifestError::Invalid(_)));
    }

    #[test]
    fn app_root_is_anchored_to_the_package() {
        let manifest = Manifest::parse(DEPLOYMENT).expect("manifest");
        assert_eq!(
            manifest.app_root(Path::new("/var/task")),
            Some(PathBuf::from("/var/task/apps/backend"))
        );

        let manifest = Manifest::parse("[app]\nroot = \"/opt/backend\"\n").expect("manifest");
        assert_eq!(
            manifest.app_root(Path::new("/var/task")),
            Some(PathBuf::from("/opt/backend"))
        );
        assert_eq!(Manifest::default().app_root(Path::new("/var/task")), None);
    }
}
