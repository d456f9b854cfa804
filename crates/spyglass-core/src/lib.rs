//! # spyglass-core
//!
//! Capture-and-retention engine for Spyglass, an in-process recorder of
//! HTTP requests and unhandled exceptions.
//!
//! A host adapter reports what it observes to the [`CaptureCoordinator`]:
//!
//! - a request that completed with a response ([`CaptureCoordinator::record_completed_request`])
//! - an exception, with or without an in-flight request ([`CaptureCoordinator::record_exception`])
//!
//! The coordinator normalizes and redacts the raw data with a
//! [`DetailExtractor`], then stores it in a bounded, most-recent-first
//! [`EventStore`]. A query layer reads entries and [`Stats`] back out.
//!
//! Capture never fails the request it observes. Excluded paths, disabled
//! capture and malformed inputs all end in `None` and a `tracing` event.
//!
//! ## Example
//!
//! ```
//! use spyglass_core::{CaptureCoordinator, RawRequest, RawResponse, SpyglassConfig};
//!
//! let coordinator = CaptureCoordinator::new(SpyglassConfig::new().max_entries(500));
//!
//! let started = coordinator.begin_request();
//! let request = RawRequest::new("GET", "/users/42").with_remote_addr("10.0.0.5");
//! let response = RawResponse::new(200);
//!
//! let entry = coordinator
//!     .record_completed_request(&request, &response, started)
//!     .expect("request was captured");
//!
//! assert_eq!(coordinator.store().get(&entry.id), Some(entry));
//! assert_eq!(coordinator.store().stats().requests, 1);
//! ```
//!
//! ## Features
//!
//! - `env` (default) - [`SpyglassConfig::from_env`] with `.env` file support

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod coordinator;
pub mod entry;
pub mod error;
pub mod exception;
pub mod expiry;
pub mod extract;
pub mod legacy;
pub mod sanitize;
pub mod stats;
pub mod store;

pub use config::SpyglassConfig;
pub use coordinator::{CaptureCoordinator, StartToken};
pub use entry::{Entry, EntryDraft, EntryKind, ExceptionDetail, RequestDetail, ResponseDetail};
pub use error::{Result, SpyglassError};
pub use exception::{CapturedError, ErrorValue, HttpError};
pub use expiry::AutoClearHandle;
pub use extract::{body_from_bytes, CaptureToggles, DetailExtractor, RawRequest, RawResponse};
pub use legacy::LegacyEntry;
pub use stats::Stats;
pub use store::EventStore;
