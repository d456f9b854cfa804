//! Normalization of raw capture inputs into detail records.
//!
//! Adapters hand over a [`RawRequest`] / [`RawResponse`] built from whatever
//! their framework exposes. The [`DetailExtractor`] applies the same
//! sanitization and defaulting rules on every capture path, so a request
//! recorded after a normal response looks the same as one recorded next to
//! an exception.

use crate::config::SpyglassConfig;
use crate::entry::{now_millis, ExceptionDetail, RequestDetail, ResponseDetail};
use crate::error::{Result, SpyglassError};
use crate::exception::{resolve_status_code, CapturedError};
use crate::sanitize::{sanitize_body, sanitize_headers};
use serde_json::Value;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::collections::HashMap;

const UNKNOWN: &str = "Unknown";

/// Turn a buffered HTTP body into a raw body value.
///
/// UTF-8 text is kept as a string for [`sanitize_body`] to parse. Binary
/// bodies are replaced by a short placeholder naming their size.
pub fn body_from_bytes(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => Some(Value::String(text.to_string())),
        Err(_) => {
            let placeholder = format!("<{} bytes of binary data>", bytes.len());
            Some(Value::String(placeholder))
        }
    }
}

/// Request information as delivered by a host adapter.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    /// HTTP method
    pub method: String,
    /// Request URL as received (path and query)
    pub url: String,
    /// Path without the query string, when the host exposes one
    pub path: Option<String>,
    /// Decoded query parameters
    pub query: HashMap<String, String>,
    /// Route parameters
    pub params: HashMap<String, String>,
    /// Headers in arrival order
    pub headers: Vec<(String, String)>,
    /// Parsed cookies
    pub cookies: HashMap<String, String>,
    /// Request body
    pub body: Option<Value>,
    /// Address of the direct peer
    pub remote_addr: Option<String>,
    /// Host name resolved by the framework
    pub hostname: Option<String>,
    /// Protocol resolved by the framework
    pub protocol: Option<String>,
}

impl RawRequest {
    /// Create a raw request with the required fields.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a route parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the direct peer address.
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// Set the host name.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Set the protocol.
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    /// Look up a header value (case-insensitive, first match).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Path used for exclusion checks: the explicit path, else the URL
    /// without its query string.
    pub fn effective_path(&self) -> &str {
        match self.path.as_deref() {
            Some(path) if !path.is_empty() => path,
            _ => self.url.split('?').next().unwrap_or(&self.url),
        }
    }

    /// Resolve the client IP.
    ///
    /// Priority: direct peer address, first `x-forwarded-for` entry,
    /// `x-real-ip`, then `"Unknown"`.
    pub fn client_ip(&self) -> String {
        non_empty(self.remote_addr.as_deref())
            .or_else(|| {
                self.header("x-forwarded-for")
                    .and_then(|v| non_empty(v.split(',').next()))
            })
            .or_else(|| non_empty(self.header("x-real-ip")))
            .unwrap_or(UNKNOWN)
            .to_string()
    }

    /// Resolve the user agent, `"Unknown"` when absent.
    pub fn user_agent(&self) -> String {
        non_empty(self.header("user-agent"))
            .unwrap_or(UNKNOWN)
            .to_string()
    }
}

/// Response information as delivered by a host adapter.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Reason phrase, if the framework exposes one
    pub status_message: Option<String>,
    /// Headers in emission order
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Option<Value>,
}

impl RawResponse {
    /// Create a raw response with a status code.
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            ..Default::default()
        }
    }

    /// Set the reason phrase.
    pub fn with_status_message(mut self, message: impl Into<String>) -> Self {
        self.status_message = Some(message.into());
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Which optional request/response fields are captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureToggles {
    /// Capture request bodies
    pub request_body: bool,
    /// Capture response bodies
    pub response_body: bool,
    /// Capture headers
    pub headers: bool,
    /// Capture query parameters
    pub query: bool,
    /// Capture the client IP
    pub ip: bool,
    /// Capture the user agent
    pub user_agent: bool,
}

impl Default for CaptureToggles {
    fn default() -> Self {
        Self {
            request_body: true,
            response_body: true,
            headers: true,
            query: true,
            ip: true,
            user_agent: true,
        }
    }
}

impl From<&SpyglassConfig> for CaptureToggles {
    fn from(config: &SpyglassConfig) -> Self {
        Self {
            request_body: config.capture_request_body,
            response_body: config.capture_response_body,
            headers: config.capture_headers,
            query: config.capture_query,
            ip: config.capture_ip,
            user_agent: config.capture_user_agent,
        }
    }
}

/// Builds detail records from raw inputs.
#[derive(Debug, Clone, Default)]
pub struct DetailExtractor {
    toggles: CaptureToggles,
}

impl DetailExtractor {
    /// Create an extractor with the given toggles.
    pub fn new(toggles: CaptureToggles) -> Self {
        Self { toggles }
    }

    /// Create an extractor from a configuration.
    pub fn from_config(config: &SpyglassConfig) -> Self {
        Self::new(CaptureToggles::from(config))
    }

    /// Build a [`RequestDetail`].
    ///
    /// # Errors
    ///
    /// Fails when the method or URL is missing; every other field has a default.
    pub fn extract_request_detail(&self, raw: &RawRequest) -> Result<RequestDetail> {
        let method = raw.method.trim();
        if method.is_empty() {
            return Err(SpyglassError::extraction("request has no method"));
        }
        if raw.url.is_empty() {
            return Err(SpyglassError::extraction("request has no url"));
        }

        let path = match raw.path.as_deref() {
            Some(path) if !path.is_empty() => path.to_string(),
            _ => raw.url.clone(),
        };

        let hostname = non_empty(raw.hostname.as_deref())
            .or_else(|| non_empty(raw.header("host")))
            .unwrap_or(UNKNOWN)
            .to_string();

        let protocol = non_empty(raw.protocol.as_deref())
            .unwrap_or("http")
            .to_string();

        Ok(RequestDetail {
            method: method.to_string(),
            url: raw.url.clone(),
            path,
            query: self.toggles.query.then(|| raw.query.clone()),
            params: raw.params.clone(),
            headers: self.headers(&raw.headers),
            cookies: raw.cookies.clone(),
            body: if self.toggles.request_body {
                raw.body.clone().and_then(sanitize_body)
            } else {
                None
            },
            ip: self.toggles.ip.then(|| raw.client_ip()),
            user_agent: self.toggles.user_agent.then(|| raw.user_agent()),
            referer: raw.header("referer").map(str::to_string),
            origin: raw.header("origin").map(str::to_string),
            hostname,
            protocol,
            timestamp: now_millis(),
        })
    }

    /// Build a [`ResponseDetail`].
    ///
    /// # Errors
    ///
    /// Fails when the status code is outside `100..=999`.
    pub fn extract_response_detail(
        &self,
        raw: &RawResponse,
        response_time_ms: u64,
    ) -> Result<ResponseDetail> {
        if !(100..=999).contains(&raw.status_code) {
            let message = format!("invalid status code {}", raw.status_code);
            return Err(SpyglassError::extraction(message));
        }

        let status_message = non_empty(raw.status_message.as_deref())
            .unwrap_or("OK")
            .to_string();

        Ok(ResponseDetail {
            status_code: raw.status_code,
            status_message,
            headers: self.headers(&raw.headers),
            body: if self.toggles.response_body {
                raw.body.clone().and_then(sanitize_body)
            } else {
                None
            },
            response_time: response_time_ms,
        })
    }

    /// Build an [`ExceptionDetail`]. Never fails.
    ///
    /// The message prefers a structured response payload over the raw error
    /// message. Errors without a stack get a `name: message` line, followed
    /// by the current call stack when backtraces are enabled through
    /// `RUST_BACKTRACE` or `RUST_LIB_BACKTRACE`.
    pub fn extract_exception_detail(
        &self,
        error: &dyn CapturedError,
        status_code: u16,
    ) -> ExceptionDetail {
        let name = error
            .name()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unknown Error".to_string());

        let message = error
            .response_message()
            .filter(|m| !m.is_empty())
            .or_else(|| error.message().filter(|m| !m.is_empty()))
            .unwrap_or_else(|| "Unknown Error".to_string());

        let stack = error
            .stack()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| synthesize_stack(&name, &message));

        ExceptionDetail {
            name,
            message,
            stack,
            status_code,
            timestamp: now_millis(),
        }
    }

    /// Resolve the status and build the exception detail in one step.
    pub fn extract_exception(&self, error: &dyn CapturedError) -> ExceptionDetail {
        self.extract_exception_detail(error, resolve_status_code(error))
    }

    fn headers(&self, headers: &[(String, String)]) -> Option<HashMap<String, String>> {
        self.toggles
            .headers
            .then(|| sanitize_headers(headers.iter().map(|(k, v)| (k, v))))
    }
}

fn synthesize_stack(name: &str, message: &str) -> String {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => format!("{}: {}\n{}", name, message, backtrace),
        _ => format!("{}: {}", name, message),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
