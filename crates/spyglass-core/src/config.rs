//! Configuration for the capture engine.
//!
//! This module provides the [`SpyglassConfig`] builder and, with the `env`
//! feature, loading of overrides from `SPYGLASS_*` environment variables.

use crate::error::{Result, SpyglassError};
use std::time::Duration;

/// Default number of entries retained.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default dashboard namespace.
pub const DEFAULT_PATH_PREFIX: &str = "/telescope";

/// Default largest body an adapter buffers for capture, in bytes.
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024;

/// Browser and tooling requests that are never captured.
pub const DEFAULT_NOISE_PATHS: &[&str] = &[
    "/.well-known/appspecific/com.chrome.devtools.json",
    "/favicon.ico",
    "/robots.txt",
    "/sitemap.xml",
    "/.well-known/",
    "/__webpack_hmr",
    "/hot-update.json",
];

/// Configuration for request and exception capture.
///
/// Use the builder pattern to customize behavior:
///
/// ```
/// use spyglass_core::SpyglassConfig;
/// use std::time::Duration;
///
/// let config = SpyglassConfig::new()
///     .max_entries(500)
///     .auto_clear_after(Some(Duration::from_secs(24 * 60 * 60)))
///     .capture_response_body(false)
///     .skip_path("/health");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SpyglassConfig {
    /// Whether capture is active at all. Default: true.
    pub(crate) enabled: bool,

    /// Maximum entries held by the store. Default: 100.
    pub(crate) max_entries: usize,

    /// Age after which entries are swept away. Default: disabled.
    pub(crate) auto_clear_after: Option<Duration>,

    /// Capture request bodies. Default: true.
    pub(crate) capture_request_body: bool,

    /// Capture response bodies. Default: true.
    pub(crate) capture_response_body: bool,

    /// Capture request and response headers. Default: true.
    pub(crate) capture_headers: bool,

    /// Capture query parameters. Default: true.
    pub(crate) capture_query: bool,

    /// Capture the client IP address. Default: true.
    pub(crate) capture_ip: bool,

    /// Capture the user agent. Default: true.
    pub(crate) capture_user_agent: bool,

    /// Dashboard namespace; requests under it are never captured.
    pub(crate) path_prefix: String,

    /// Path prefixes excluded from capture.
    pub(crate) skip_paths: Vec<String>,

    /// Largest body an adapter buffers for capture. Default: 64KB.
    pub(crate) max_body_size: usize,
}

impl Default for SpyglassConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SpyglassConfig {
    /// Create a new configuration with default values.
    ///
    /// Defaults:
    /// - Capture enabled, every toggle on
    /// - 100 entries retained, no auto-clear
    /// - Dashboard at "/telescope"
    /// - Browser noise paths skipped (favicon, robots.txt, devtools discovery, ...)
    pub fn new() -> Self {
        Self {
            enabled: true,
            max_entries: DEFAULT_MAX_ENTRIES,
            auto_clear_after: None,
            capture_request_body: true,
            capture_response_body: true,
            capture_headers: true,
            capture_query: true,
            capture_ip: true,
            capture_user_agent: true,
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
            skip_paths: DEFAULT_NOISE_PATHS.iter().map(|p| p.to_string()).collect(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Enable or disable capture entirely.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the maximum number of retained entries.
    ///
    /// Zero is raised to one; the store always holds at least the latest entry.
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    /// Clear entries older than `after`. `None` disables auto-clear.
    pub fn auto_clear_after(mut self, after: Option<Duration>) -> Self {
        self.auto_clear_after = after.filter(|d| !d.is_zero());
        self
    }

    /// Enable or disable request body capture.
    pub fn capture_request_body(mut self, capture: bool) -> Self {
        self.capture_request_body = capture;
        self
    }

    /// Enable or disable response body capture.
    pub fn capture_response_body(mut self, capture: bool) -> Self {
        self.capture_response_body = capture;
        self
    }

    /// Enable or disable header capture.
    pub fn capture_headers(mut self, capture: bool) -> Self {
        self.capture_headers = capture;
        self
    }

    /// Enable or disable query parameter capture.
    pub fn capture_query(mut self, capture: bool) -> Self {
        self.capture_query = capture;
        self
    }

    /// Enable or disable client IP capture.
    pub fn capture_ip(mut self, capture: bool) -> Self {
        self.capture_ip = capture;
        self
    }

    /// Enable or disable user agent capture.
    pub fn capture_user_agent(mut self, capture: bool) -> Self {
        self.capture_user_agent = capture;
        self
    }

    /// Set the dashboard namespace.
    ///
    /// A trailing slash is dropped; an empty prefix is rejected in favor of
    /// the default so the recorder can never capture its own API.
    pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        self.path_prefix = if trimmed.is_empty() {
            DEFAULT_PATH_PREFIX.to_string()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        };
        self
    }

    /// Add a path prefix to skip.
    pub fn skip_path(mut self, path: impl Into<String>) -> Self {
        self.skip_paths.push(path.into());
        self
    }

    /// Replace the skip list entirely, dropping the default noise paths.
    pub fn skip_paths(mut self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.skip_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Set the largest body an adapter buffers for capture.
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Whether capture is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Store capacity.
    pub fn max_entry_count(&self) -> usize {
        self.max_entries
    }

    /// Auto-clear age, if enabled.
    pub fn auto_clear_age(&self) -> Option<Duration> {
        self.auto_clear_after
    }

    /// Dashboard namespace.
    pub fn dashboard_prefix(&self) -> &str {
        &self.path_prefix
    }

    /// Largest body an adapter buffers for capture.
    pub fn body_size_limit(&self) -> usize {
        self.max_body_size
    }

    /// Whether request bodies are captured.
    pub fn captures_request_body(&self) -> bool {
        self.capture_request_body
    }

    /// Whether response bodies are captured.
    pub fn captures_response_body(&self) -> bool {
        self.capture_response_body
    }

    /// Check if `path` belongs to the dashboard namespace.
    pub fn is_dashboard_path(&self, path: &str) -> bool {
        match path.strip_prefix(self.path_prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
            None => false,
        }
    }

    /// Check if a path should be skipped.
    pub fn should_skip_path(&self, path: &str) -> bool {
        if self.is_dashboard_path(path) {
            return true;
        }
        self.skip_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Validate settings that the builder cannot enforce on its own.
    ///
    /// A dashboard prefix containing whitespace, `?` or `#` can never match a
    /// request path, so the API would be unreachable and its requests captured.
    pub fn validate(&self) -> Result<()> {
        let invalid = self
            .path_prefix
            .chars()
            .find(|c| c.is_whitespace() || matches!(*c, '?' | '#'));

        if let Some(c) = invalid {
            let message = format!("path_prefix contains {:?}: {}", c, self.path_prefix);
            return Err(SpyglassError::Config(message));
        }
        Ok(())
    }
}

#[cfg(feature = "env")]
mod env {
    use super::SpyglassConfig;
    use crate::error::Result;
    use serde::Deserialize;
    use std::time::Duration;

    /// Environment prefix for configuration overrides.
    pub const ENV_PREFIX: &str = "SPYGLASS_";

    /// Overrides read from `SPYGLASS_*` variables. Unset variables keep the
    /// builder defaults.
    #[derive(Debug, Default, Deserialize)]
    struct EnvOverrides {
        enabled: Option<bool>,
        max_entries: Option<usize>,
        auto_clear_after_ms: Option<u64>,
        capture_request_body: Option<bool>,
        capture_response_body: Option<bool>,
        capture_headers: Option<bool>,
        capture_query: Option<bool>,
        capture_ip: Option<bool>,
        capture_user_agent: Option<bool>,
        path_prefix: Option<String>,
        max_body_size: Option<usize>,
    }

    impl SpyglassConfig {
        /// Load configuration from the environment.
        ///
        /// A `.env` file in the working directory is loaded first (existing
        /// variables win), then `SPYGLASS_*` variables override the defaults:
        ///
        /// - `SPYGLASS_ENABLED`
        /// - `SPYGLASS_MAX_ENTRIES`
        /// - `SPYGLASS_AUTO_CLEAR_AFTER_MS`
        /// - `SPYGLASS_CAPTURE_REQUEST_BODY`, `SPYGLASS_CAPTURE_RESPONSE_BODY`,
        ///   `SPYGLASS_CAPTURE_HEADERS`, `SPYGLASS_CAPTURE_QUERY`,
        ///   `SPYGLASS_CAPTURE_IP`, `SPYGLASS_CAPTURE_USER_AGENT`
        /// - `SPYGLASS_PATH_PREFIX`
        /// - `SPYGLASS_MAX_BODY_SIZE`
        ///
        /// # Errors
        ///
        /// Returns a configuration error if a variable is set but cannot be parsed.
        pub fn from_env() -> Result<Self> {
            let _ = dotenvy::dotenv();
            Self::new().merge_env()
        }

        /// Apply `SPYGLASS_*` overrides on top of this configuration.
        pub fn merge_env(self) -> Result<Self> {
            let overrides: EnvOverrides = envy::prefixed(ENV_PREFIX).from_env()?;
            let config = overrides.apply(self);
            config.validate()?;
            Ok(config)
        }
    }

    impl EnvOverrides {
        fn apply(self, mut config: SpyglassConfig) -> SpyglassConfig {
            if let Some(enabled) = self.enabled {
                config = config.enabled(enabled);
            }
            if let Some(max) = self.max_entries {
                config = config.max_entries(max);
            }
            if let Some(ms) = self.auto_clear_after_ms {
                config = config.auto_clear_after(Some(Duration::from_millis(ms)));
            }
            if let Some(capture) = self.capture_request_body {
                config = config.capture_request_body(capture);
            }
            if let Some(capture) = self.capture_response_body {
                config = config.capture_response_body(capture);
            }
            if let Some(capture) = self.capture_headers {
                config = config.capture_headers(capture);
            }
            if let Some(capture) = self.capture_query {
                config = config.capture_query(capture);
            }
            if let Some(capture) = self.capture_ip {
                config = config.capture_ip(capture);
            }
            if let Some(capture) = self.capture_user_agent {
                config = config.capture_user_agent(capture);
            }
            if let Some(prefix) = self.path_prefix {
                config = config.path_prefix(prefix);
            }
            if let Some(size) = self.max_body_size {
                config = config.max_body_size(size);
            }
            config
        }
    }
}

#[cfg(feature = "env")]
pub use env::ENV_PREFIX;
