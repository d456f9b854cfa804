//! Data structures for captured requests and exceptions.
//!
//! An [`Entry`] is created exactly once by the
//! [`EventStore`](crate::EventStore) and never mutated afterwards. Callers
//! describe what they observed with an [`EntryDraft`], whose variants make
//! the request/response/exception combinations that may be stored explicit.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Kind of a stored observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A request that completed with a response.
    Request,
    /// An unhandled exception, optionally tied to a request.
    Exception,
}

/// One stored observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique identifier, assigned at insertion
    pub id: String,

    /// Entry kind
    #[serde(rename = "type")]
    pub kind: EntryKind,

    /// Insertion time in milliseconds since the Unix epoch
    #[serde(rename = "timestamp")]
    pub captured_at: u64,

    /// Request active when the observation was made
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestDetail>,

    /// Response, only for [`EntryKind::Request`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseDetail>,

    /// Exception, only for [`EntryKind::Exception`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionDetail>,
}

impl Entry {
    pub(crate) fn from_draft(id: String, captured_at: u64, draft: EntryDraft) -> Self {
        match draft {
            EntryDraft::Request { request, response } => Self {
                id,
                kind: EntryKind::Request,
                captured_at,
                request: Some(request),
                response: Some(response),
                exception: None,
            },
            EntryDraft::Exception { exception, request } => Self {
                id,
                kind: EntryKind::Exception,
                captured_at,
                request,
                response: None,
                exception: Some(exception),
            },
        }
    }

    /// Response time in milliseconds, for completed requests.
    pub fn response_time(&self) -> Option<u64> {
        self.response.as_ref().map(|r| r.response_time)
    }

    /// Request path, if a request was captured.
    pub fn path(&self) -> Option<&str> {
        self.request.as_ref().map(|r| r.path.as_str())
    }
}

/// An entry before the store has given it an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryDraft {
    /// A request that completed normally.
    Request {
        /// Captured request
        request: RequestDetail,
        /// Captured response
        response: ResponseDetail,
    },
    /// An exception, with the request it interrupted when there was one.
    Exception {
        /// Captured exception
        exception: ExceptionDetail,
        /// Request in flight, absent for exceptions raised outside a request
        request: Option<RequestDetail>,
    },
}

/// Normalized request information.
///
/// Optional collections are `None` when the matching capture toggle is off,
/// never an empty placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetail {
    /// HTTP method (GET, POST, etc.)
    pub method: String,

    /// Full request URL as received
    pub url: String,

    /// Request path (without query string)
    pub path: String,

    /// Query parameters
    pub query: Option<HashMap<String, String>>,

    /// Route parameters resolved by the host router
    pub params: HashMap<String, String>,

    /// Sanitized request headers
    pub headers: Option<HashMap<String, String>>,

    /// Request cookies
    pub cookies: HashMap<String, String>,

    /// Sanitized request body
    pub body: Option<Value>,

    /// Client IP address
    pub ip: Option<String>,

    /// Client user agent
    pub user_agent: Option<String>,

    /// Referer header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,

    /// Origin header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// Host name the request was addressed to
    pub hostname: String,

    /// Protocol (`http` or `https`)
    pub protocol: String,

    /// Extraction time in milliseconds since the Unix epoch
    pub timestamp: u64,
}

/// Normalized response information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDetail {
    /// HTTP status code
    pub status_code: u16,

    /// Reason phrase
    pub status_message: String,

    /// Sanitized response headers
    pub headers: Option<HashMap<String, String>>,

    /// Sanitized response body
    pub body: Option<Value>,

    /// Processing time in milliseconds
    pub response_time: u64,
}

/// Normalized exception information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetail {
    /// Exception name or type
    pub name: String,

    /// Exception message
    pub message: String,

    /// Stack trace text
    pub stack: String,

    /// HTTP status code resolved for the exception
    pub status_code: u16,

    /// Extraction time in milliseconds since the Unix epoch
    pub timestamp: u64,
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
