//! Flat view of entries for older dashboard clients.
//!
//! Older consumers read `status`, `duration` and friends from the top level
//! of an entry instead of the nested request/response/exception records.
//! [`LegacyEntry`] serializes the nested entry unchanged and adds those
//! aliases next to it.

use crate::entry::{Entry, EntryKind};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// An entry with the legacy top-level aliases added.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyEntry {
    /// The nested entry
    #[serde(flatten)]
    pub entry: Entry,

    /// Request method
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Request path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Response status, or the exception's resolved status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Response time in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,

    /// Exception message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Request headers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,

    /// Request body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    /// Exception stack
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl From<Entry> for LegacyEntry {
    fn from(entry: Entry) -> Self {
        let mut legacy = LegacyEntry {
            entry,
            method: None,
            path: None,
            status: None,
            duration: None,
            message: None,
            headers: None,
            body: None,
            stack: None,
        };

        match legacy.entry.kind {
            EntryKind::Request => {
                if let Some(request) = &legacy.entry.request {
                    legacy.method = Some(request.method.clone());
                    legacy.path = Some(request.path.clone());
                    legacy.headers = request.headers.clone();
                    legacy.body = request.body.clone();
                }
                if let Some(response) = &legacy.entry.response {
                    legacy.status = Some(response.status_code);
                    legacy.duration = Some(response.response_time);
                }
            }
            EntryKind::Exception => {
                if let Some(exception) = &legacy.entry.exception {
                    legacy.message = Some(exception.message.clone());
                    legacy.status = Some(exception.status_code);
                    legacy.stack = Some(exception.stack.clone());
                }
            }
        }

        legacy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryDraft, ExceptionDetail, RequestDetail, ResponseDetail};
    use serde_json::json;

    fn request_entry() -> Entry {
        Entry::from_draft(
            "r1".into(),
            10,
            EntryDraft::Request {
                request: RequestDetail {
                    method: "GET".into(),
                    url: "/users/42?x=1".into(),
                    path: "/users/42".into(),
                    query: None,
                    params: Default::default(),
                    headers: Some(HashMap::from([("accept".into(), "*/*".into())])),
                    cookies: Default::default(),
                    body: Some(json!({"q": 1})),
                    ip: Some("10.0.0.5".into()),
                    user_agent: None,
                    referer: None,
                    origin: None,
                    hostname: "localhost".into(),
                    protocol: "http".into(),
                    timestamp: 0,
                },
                response: ResponseDetail {
                    status_code: 200,
                    status_message: "OK".into(),
                    headers: None,
                    body: None,
                    response_time: 37,
                },
            },
        )
    }

    #[test]
    fn test_request_aliases() {
        let json = serde_json::to_value(LegacyEntry::from(request_entry())).unwrap();

        assert_eq!(json["id"], "r1");
        assert_eq!(json["type"], "request");
        assert_eq!(json["method"], "GET");
        assert_eq!(json["path"], "/users/42");
        assert_eq!(json["status"], 200);
        assert_eq!(json["duration"], 37);
        assert_eq!(json["headers"]["accept"], "*/*");
        assert_eq!(json["body"], json!({"q": 1}));
        assert_eq!(json["response"]["responseTime"], 37);
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_exception_aliases() {
        let entry = Entry::from_draft(
            "e1".into(),
            10,
            EntryDraft::Exception {
                exception: ExceptionDetail {
                    name: "Error".into(),
                    message: "boom".into(),
                    stack: "at handler".into(),
                    status_code: 503,
                    timestamp: 0,
                },
                request: None,
            },
        );
        let json = serde_json::to_value(LegacyEntry::from(entry)).unwrap();

        assert_eq!(json["type"], "exception");
        assert_eq!(json["message"], "boom");
        assert_eq!(json["status"], 503);
        assert_eq!(json["stack"], "at handler");
        assert!(json.get("method").is_none());
        assert!(json.get("duration").is_none());
    }
}
