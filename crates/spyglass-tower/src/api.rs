//! JSON query API over the captured entries.
//!
//! Routes, relative to `{path_prefix}/api`:
//!
//! | Method   | Path            | Response                                   |
//! |----------|-----------------|--------------------------------------------|
//! | `GET`    | `/entries`      | all entries, most recent first             |
//! | `GET`    | `/entries/{id}` | one entry, or 404                          |
//! | `DELETE` | `/entries`      | `{"message": "Entries cleared successfully"}` |
//! | `GET`    | `/stats`        | aggregate statistics                       |
//!
//! `GET /entries` and `GET /entries/{id}` accept `?format=legacy` to add the
//! flat top-level aliases older dashboards read.

use crate::raw::extract_query_params;
use bytes::Bytes;
use http::{header, Method, Response, StatusCode, Uri};
use http_body_util::Full;
use serde::Serialize;
use serde_json::json;
use spyglass_core::{Entry, EventStore, LegacyEntry};

/// Response type of the query API.
pub type ApiResponse = Response<Full<Bytes>>;

/// Answer a query API request, or return `None` if `uri` is not an API route.
pub fn handle_api_request(
    store: &EventStore,
    path_prefix: &str,
    method: &Method,
    uri: &Uri,
) -> Option<ApiResponse> {
    let base = format!("{}/api", path_prefix.trim_end_matches('/'));
    let route = uri.path().strip_prefix(base.as_str())?;
    let route = route.trim_end_matches('/');
    let legacy = wants_legacy(uri);

    let response = match (method, route) {
        (&Method::GET, "/entries") => {
            let entries = store.list();
            if legacy {
                json_response(StatusCode::OK, &to_legacy(entries))
            } else {
                json_response(StatusCode::OK, &entries)
            }
        }
        (&Method::DELETE, "/entries") => {
            store.clear();
            tracing::info!("Captured entries cleared");
            json_response(
                StatusCode::OK,
                &json!({ "message": "Entries cleared successfully" }),
            )
        }
        (&Method::GET, "/stats") => json_response(StatusCode::OK, &store.stats()),
        (&Method::GET, route) => {
            let id = route.strip_prefix("/entries/")?;
            if id.is_empty() || id.contains('/') {
                return None;
            }
            let id = urlencoding::decode(id).ok()?;
            match store.get(&id) {
                Some(entry) if legacy => json_response(StatusCode::OK, &LegacyEntry::from(entry)),
                Some(entry) => json_response(StatusCode::OK, &entry),
                None => json_response(
                    StatusCode::NOT_FOUND,
                    &json!({ "message": "Entry not found" }),
                ),
            }
        }
        _ => return None,
    };

    Some(response)
}

fn wants_legacy(uri: &Uri) -> bool {
    extract_query_params(uri)
        .get("format")
        .is_some_and(|format| format.eq_ignore_ascii_case("legacy"))
}

fn to_legacy(entries: Vec<Entry>) -> Vec<LegacyEntry> {
    entries.into_iter().map(LegacyEntry::from).collect()
}

fn json_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> ApiResponse {
    let (status, body) = match serde_json::to_vec(value) {
        Ok(body) => (status, body),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize API response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"message":"Internal Server Error"}"#.to_vec(),
            )
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}
