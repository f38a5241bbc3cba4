//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.
//!
//! Binaries read the `EMR_*` variables themselves and hand the raw values to
//! [`CoreConfig::from_env_values`].

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_REST_ADDR, DEFAULT_SEARCH_DEBOUNCE_MS,
    DEFAULT_SEARCH_MIN_CHARS,
};
use crate::{EmrError, EmrResult};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Which implementations sit behind the auth and patient/doctor seams.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    /// Fixed demo accounts and seeded in-memory lists.
    #[default]
    Demo,
    /// The upstream EMR API at `EMR_API_BASE_URL`.
    Http,
}

impl FromStr for Backend {
    type Err = EmrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "demo" => Ok(Backend::Demo),
            "http" => Ok(Backend::Http),
            other => Err(EmrError::InvalidInput(format!(
                "EMR_BACKEND: expected demo or http, got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Demo => "demo",
            Backend::Http => "http",
        })
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    rest_addr: SocketAddr,
    api_base_url: String,
    http_timeout: Duration,
    search_debounce: Duration,
    search_min_chars: usize,
    terminology_path: Option<PathBuf>,
    backend: Backend,
    api_token: Option<String>,
}

/// Raw, unparsed configuration values as read from the environment.
#[derive(Clone, Debug, Default)]
pub struct EnvValues {
    pub rest_addr: Option<String>,
    pub api_base_url: Option<String>,
    pub http_timeout_secs: Option<String>,
    pub search_debounce_ms: Option<String>,
    pub search_min_chars: Option<String>,
    pub terminology_path: Option<String>,
    pub backend: Option<String>,
    pub api_token: Option<String>,
}

impl EnvValues {
    /// Read the `EMR_*` variables from the process environment.
    ///
    /// Call once at startup.
    pub fn from_process_env() -> Self {
        let var = |name: &str| std::env::var(name).ok();
        Self {
            rest_addr: var("EMR_REST_ADDR"),
            api_base_url: var("EMR_API_BASE_URL"),
            http_timeout_secs: var("EMR_HTTP_TIMEOUT_SECS"),
            search_debounce_ms: var("EMR_SEARCH_DEBOUNCE_MS"),
            search_min_chars: var("EMR_SEARCH_MIN_CHARS"),
            terminology_path: var("EMR_TERMINOLOGY_PATH"),
            backend: var("EMR_BACKEND"),
            api_token: var("EMR_API_TOKEN"),
        }
    }
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`EmrError::InvalidInput`] if the base URL is not an absolute `http(s)` URL or the
    /// HTTP timeout is zero.
    pub fn new(
        rest_addr: SocketAddr,
        api_base_url: String,
        http_timeout: Duration,
        search_debounce: Duration,
        search_min_chars: usize,
        terminology_path: Option<PathBuf>,
    ) -> EmrResult<Self> {
        let api_base_url = api_base_url.trim().trim_end_matches('/').to_owned();
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(EmrError::InvalidInput(format!(
                "api base url must start with http:// or https://, got {api_base_url:?}"
            )));
        }
        if http_timeout.is_zero() {
            return Err(EmrError::InvalidInput(
                "http timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            rest_addr,
            api_base_url,
            http_timeout,
            search_debounce,
            search_min_chars,
            terminology_path,
            backend: Backend::Demo,
            api_token: None,
        })
    }

    /// Build a configuration from raw environment values, applying defaults for absent ones.
    pub fn from_env_values(values: EnvValues) -> EmrResult<Self> {
        let rest_addr = values
            .rest_addr
            .as_deref()
            .unwrap_or(DEFAULT_REST_ADDR)
            .parse::<SocketAddr>()
            .map_err(|e| EmrError::InvalidInput(format!("EMR_REST_ADDR: {e}")))?;

        let http_timeout_secs = parse_number(
            "EMR_HTTP_TIMEOUT_SECS",
            values.http_timeout_secs,
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?;
        let search_debounce_ms = parse_number(
            "EMR_SEARCH_DEBOUNCE_MS",
            values.search_debounce_ms,
            DEFAULT_SEARCH_DEBOUNCE_MS,
        )?;
        let search_min_chars = parse_number(
            "EMR_SEARCH_MIN_CHARS",
            values.search_min_chars,
            DEFAULT_SEARCH_MIN_CHARS,
        )?;

        let terminology_path = values
            .terminology_path
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let backend = match values.backend.as_deref().map(str::trim) {
            None | Some("") => Backend::default(),
            Some(raw) => raw.parse()?,
        };
        let api_token = values.api_token.filter(|t| !t.trim().is_empty());

        let mut cfg = Self::new(
            rest_addr,
            values
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.into()),
            Duration::from_secs(http_timeout_secs),
            Duration::from_millis(search_debounce_ms),
            search_min_chars,
            terminology_path,
        )?
        .with_backend(backend);
        cfg.api_token = api_token;
        Ok(cfg)
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn rest_addr(&self) -> SocketAddr {
        self.rest_addr
    }

    /// Base URL with any trailing slash removed.
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }

    pub fn search_debounce(&self) -> Duration {
        self.search_debounce
    }

    pub fn search_min_chars(&self) -> usize {
        self.search_min_chars
    }

    pub fn terminology_path(&self) -> Option<&Path> {
        self.terminology_path.as_deref()
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Service token sent to the upstream API by the patient and doctor gateways.
    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            rest_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            api_base_url: DEFAULT_API_BASE_URL.into(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            search_min_chars: DEFAULT_SEARCH_MIN_CHARS,
            terminology_path: None,
            backend: Backend::Demo,
            api_token: None,
        }
    }
}

fn parse_number<T>(name: &str, value: Option<String>, default: T) -> EmrResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| EmrError::InvalidInput(format!("{name}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_when_env_is_empty() {
        let cfg = CoreConfig::from_env_values(EnvValues::default()).expect("defaults are valid");
        assert_eq!(cfg.rest_addr().to_string(), "0.0.0.0:3000");
        assert_eq!(cfg.api_base_url(), DEFAULT_API_BASE_URL);
        assert_eq!(cfg.http_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.search_debounce(), Duration::from_millis(300));
        assert_eq!(cfg.search_min_chars(), 2);
        assert!(cfg.terminology_path().is_none());
        assert_eq!(cfg.backend(), Backend::Demo);
        assert!(cfg.api_token().is_none());
    }

    #[test]
    fn test_backend_and_token_are_parsed() {
        let cfg = CoreConfig::from_env_values(EnvValues {
            backend: Some(" HTTP ".into()),
            api_token: Some("svc-token".into()),
            ..Default::default()
        })
        .expect("valid values");
        assert_eq!(cfg.backend(), Backend::Http);
        assert_eq!(cfg.api_token(), Some("svc-token"));

        let bad = CoreConfig::from_env_values(EnvValues {
            backend: Some("ldap".into()),
            ..Default::default()
        });
        assert!(matches!(bad, Err(EmrError::InvalidInput(msg)) if msg.contains("EMR_BACKEND")));
    }

    #[test]
    fn test_values_override_defaults_and_trailing_slash_is_removed() {
        let cfg = CoreConfig::from_env_values(EnvValues {
            rest_addr: Some("127.0.0.1:8080".into()),
            api_base_url: Some("https://emr.example.org/api/".into()),
            http_timeout_secs: Some("3".into()),
            search_debounce_ms: Some("50".into()),
            search_min_chars: Some(" 3 ".into()),
            terminology_path: Some("/etc/emr/terminology.yaml".into()),
            ..Default::default()
        })
        .expect("valid values");

        assert_eq!(cfg.rest_addr().port(), 8080);
        assert_eq!(cfg.api_base_url(), "https://emr.example.org/api");
        assert_eq!(cfg.http_timeout(), Duration::from_secs(3));
        assert_eq!(cfg.search_debounce(), Duration::from_millis(50));
        assert_eq!(cfg.search_min_chars(), 3);
        assert_eq!(
            cfg.terminology_path(),
            Some(Path::new("/etc/emr/terminology.yaml"))
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_addr = CoreConfig::from_env_values(EnvValues {
            rest_addr: Some("not-an-addr".into()),
            ..Default::default()
        });
        assert!(matches!(bad_addr, Err(EmrError::InvalidInput(msg)) if msg.contains("EMR_REST_ADDR")));

        let bad_timeout = CoreConfig::from_env_values(EnvValues {
            http_timeout_secs: Some("ten".into()),
            ..Default::default()
        });
        assert!(matches!(bad_timeout, Err(EmrError::InvalidInput(msg)) if msg.contains("EMR_HTTP_TIMEOUT_SECS")));

        let zero_timeout = CoreConfig::from_env_values(EnvValues {
            http_timeout_secs: Some("0".into()),
            ..Default::default()
        });
        assert!(matches!(zero_timeout, Err(EmrError::InvalidInput(_))));

        let bad_url = CoreConfig::from_env_values(EnvValues {
            api_base_url: Some("localhost:8000".into()),
            ..Default::default()
        });
        assert!(matches!(bad_url, Err(EmrError::InvalidInput(_))));
    }

    #[test]
    fn test_blank_terminology_path_is_ignored() {
        let cfg = CoreConfig::from_env_values(EnvValues {
            terminology_path: Some("   ".into()),
            ..Default::default()
        })
        .expect("valid values");
        assert!(cfg.terminology_path().is_none());
    }
}
