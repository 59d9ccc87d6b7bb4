//! Configuration types for batchfetch
//!
//! Values are layered, lowest priority first:
//! 1. built-in defaults,
//! 2. a YAML file (an explicit path, or `./configs/config.yaml` when present),
//! 3. `BATCHFETCH_*` environment variables,
//! 4. command-line flags (applied by the binary).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Config file read when no explicit path is given, if it exists
pub const DEFAULT_CONFIG_PATH: &str = "./configs/config.yaml";

/// Prefix of environment variables that override config values
pub const ENV_PREFIX: &str = "BATCHFETCH_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Report output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable two-section report
    #[default]
    Text,
    /// JSON array of descriptors
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(Error::config(
                "format",
                format!("unknown report format '{other}' (expected text or json)"),
            )),
        }
    }
}

/// Settings for individual fetch operations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Deadline for a single request, connect through body (default: 10 seconds)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Path segment appended to an address to reach its dependent resource (default: "comments")
    #[serde(default = "default_dependent_segment")]
    pub dependent_segment: String,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Abort in-flight fetches when the batch is cancelled (default: false)
    ///
    /// When false, a cancelled item task stops waiting but leaves its fetches
    /// running until they finish or hit `timeout`; their results are discarded.
    #[serde(default)]
    pub abort_on_cancel: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_fetch_timeout(),
            dependent_segment: default_dependent_segment(),
            user_agent: default_user_agent(),
            abort_on_cancel: false,
        }
    }
}

/// Main configuration for a batch run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Number of concurrent workers (default: 2)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Absolute path of the address list
    #[serde(default)]
    pub source: Option<PathBuf>,

    /// Upper wall-clock limit for the whole batch (None = unbounded)
    #[serde(default, with = "optional_duration_serde")]
    pub deadline: Option<Duration>,

    /// Log level used when RUST_LOG is not set (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Report output format
    #[serde(default)]
    pub format: ReportFormat,

    /// Fetch operation settings
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            source: None,
            deadline: None,
            log_level: default_log_level(),
            format: ReportFormat::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and process environment.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_PATH`] is
    /// read if present and defaults are used otherwise. The result is not
    /// validated: callers layer their own overrides on top and then call
    /// [`validate`](Self::validate) on the merged configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, std::env::vars())
    }

    /// Like [`load`](Self::load), with the environment supplied by the caller.
    pub fn load_with_env<I, K, V>(path: Option<&Path>, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_env(vars)?;
        Ok(config)
    }

    /// Parse a YAML config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(
                "config",
                format!("cannot read config file {}: {e}", path.display()),
            )
        })?;
        Self::from_yaml(&content)
    }

    /// Parse YAML config text. An empty document yields the defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply `BATCHFETCH_*` overrides from a set of environment variables.
    ///
    /// Unknown keys under the prefix are ignored; values that do not parse are
    /// configuration errors.
    pub fn apply_env<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref().trim();
            match name {
                "WORKERS" => self.workers = parse_env(name, value)?,
                "SOURCE" => self.source = Some(PathBuf::from(value)),
                "DEADLINE" => {
                    self.deadline = Some(Duration::from_secs(parse_env(name, value)?))
                }
                "LOG_LEVEL" => self.log_level = value.to_string(),
                "FORMAT" => self.format = value.parse()?,
                "FETCH_TIMEOUT" => {
                    self.fetch.timeout = Duration::from_secs(parse_env(name, value)?)
                }
                "FETCH_DEPENDENT_SEGMENT" => self.fetch.dependent_segment = value.to_string(),
                "FETCH_USER_AGENT" => self.fetch.user_agent = value.to_string(),
                "FETCH_ABORT_ON_CANCEL" => self.fetch.abort_on_cancel = parse_env(name, value)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Check values that cannot be expressed through types alone.
    ///
    /// The worker count is not checked here: zero workers is only an error once
    /// there is something to dispatch.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.timeout.is_zero() {
            return Err(Error::config("fetch.timeout", "timeout must be > 0"));
        }
        if self.fetch.dependent_segment.trim_matches('/').is_empty() {
            return Err(Error::config(
                "fetch.dependent_segment",
                "dependent segment must not be empty",
            ));
        }
        if let Some(source) = &self.source
            && !source.is_absolute()
        {
            return Err(Error::config(
                "source",
                format!("'{}' should be an absolute path to a file", source.display()),
            ));
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(Error::config(
                "log_level",
                format!(
                    "unknown log level '{}' (expected one of {})",
                    self.log_level,
                    LOG_LEVELS.join(", ")
                ),
            ));
        }
        Ok(())
    }
}

fn parse_env<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| {
        Error::config(
            name.to_ascii_lowercase(),
            format!("invalid value '{value}' for {ENV_PREFIX}{name}: {e}"),
        )
    })
}

fn default_workers() -> usize {
    2
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_dependent_segment() -> String {
    "comments".to_string()
}

fn default_user_agent() -> String {
    concat!("batchfetch/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_key(err: &Error) -> Option<&str> {
        match err {
            Error::Config { key, .. } => key.as_deref(),
            _ => None,
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();

        assert_eq!(config.workers, 2);
        assert_eq!(config.fetch.timeout, Duration::from_secs(10));
        assert_eq!(config.fetch.dependent_segment, "comments");
        assert!(!config.fetch.abort_on_cancel);
        assert!(config.fetch.user_agent.starts_with("batchfetch/"));
        assert_eq!(config.format, ReportFormat::Text);
        assert!(config.deadline.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn yaml_fills_missing_keys_with_defaults() {
        let config = Config::from_yaml(
            "workers: 8\nsource: /tmp/urls.txt\nfetch:\n  timeout: 3\n",
        )
        .unwrap();

        assert_eq!(config.workers, 8);
        assert_eq!(config.source.as_deref(), Some(Path::new("/tmp/urls.txt")));
        assert_eq!(config.fetch.timeout, Duration::from_secs(3));
        assert_eq!(config.fetch.dependent_segment, "comments");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn empty_yaml_is_default() {
        let config = Config::from_yaml("  \n").unwrap();
        assert_eq!(config.workers, 2);
    }

    #[test]
    fn yaml_rejects_negative_workers() {
        let err = Config::from_yaml("workers: -1\n").unwrap_err();
        assert!(matches!(err, Error::Yaml(_)), "got {err:?}");
    }

    #[test]
    fn from_file_reads_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "workers: 4\ndeadline: 30\nformat: json").unwrap();

        let config = Config::from_file(file.path()).unwrap();

        assert_eq!(config.workers, 4);
        assert_eq!(config.deadline, Some(Duration::from_secs(30)));
        assert_eq!(config.format, ReportFormat::Json);
    }

    #[test]
    fn from_file_missing_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(&dir.path().join("absent.yaml")).unwrap_err();

        assert_eq!(config_key(&err), Some("config"));
    }

    #[test]
    fn load_leaves_validation_to_the_caller() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "source: urls.txt\nworkers: 4").unwrap();

        let config =
            Config::load_with_env(Some(file.path()), [("BATCHFETCH_FETCH_TIMEOUT", "0")]).unwrap();

        assert_eq!(config.workers, 4);
        assert_eq!(config.source.as_deref(), Some(Path::new("urls.txt")));
        assert!(config.fetch.timeout.is_zero());
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_take_precedence() {
        let mut config = Config::from_yaml("workers: 8\n").unwrap();
        config
            .apply_env([
                ("BATCHFETCH_WORKERS", "3"),
                ("BATCHFETCH_FETCH_TIMEOUT", "5"),
                ("BATCHFETCH_FETCH_DEPENDENT_SEGMENT", "replies"),
                ("BATCHFETCH_FETCH_ABORT_ON_CANCEL", "true"),
                ("BATCHFETCH_FORMAT", "JSON"),
                ("HOME", "/root"),
            ])
            .unwrap();

        assert_eq!(config.workers, 3);
        assert_eq!(config.fetch.timeout, Duration::from_secs(5));
        assert_eq!(config.fetch.dependent_segment, "replies");
        assert!(config.fetch.abort_on_cancel);
        assert_eq!(config.format, ReportFormat::Json);
    }

    #[test]
    fn env_negative_workers_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env([("BATCHFETCH_WORKERS", "-1")])
            .unwrap_err();

        assert_eq!(config_key(&err), Some("workers"));
        assert_eq!(config.workers, 2, "failed override must not change the value");
    }

    #[test]
    fn validate_rejects_relative_source() {
        let config = Config {
            source: Some(PathBuf::from("urls.txt")),
            ..Config::default()
        };

        let err = config.validate().unwrap_err();
        assert_eq!(config_key(&err), Some("source"));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.fetch.timeout = Duration::ZERO;

        let err = config.validate().unwrap_err();
        assert_eq!(config_key(&err), Some("fetch.timeout"));
    }

    #[test]
    fn validate_rejects_unknown_log_level() {
        let config = Config {
            log_level: "verbose".to_string(),
            ..Config::default()
        };

        let err = config.validate().unwrap_err();
        assert_eq!(config_key(&err), Some("log_level"));
    }

    #[test]
    fn validate_accepts_zero_workers() {
        let config = Config {
            workers: 0,
            ..Config::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn report_format_parse() {
        assert_eq!("text".parse::<ReportFormat>().unwrap(), ReportFormat::Text);
        assert_eq!("Json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert!("xml".parse::<ReportFormat>().is_err());
    }
}
