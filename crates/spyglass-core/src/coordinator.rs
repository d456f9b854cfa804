//! Capture entry points for host adapters.
//!
//! The coordinator is the only component adapters talk to while a request
//! is in flight. It applies the exclusion policy, asks the
//! [`DetailExtractor`] for normalized details and inserts the result into
//! the [`EventStore`]. It never fails the caller: every capture returns
//! `Option<Entry>` and problems are logged.

use crate::config::SpyglassConfig;
use crate::entry::{Entry, EntryDraft};
use crate::exception::CapturedError;
use crate::expiry::{spawn_auto_clear, AutoClearHandle};
use crate::extract::{DetailExtractor, RawRequest, RawResponse};
use crate::store::EventStore;
use std::sync::Arc;
use std::time::Instant;

/// Opaque token marking when a request started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StartToken(Instant);

impl StartToken {
    /// Token for the current instant.
    pub fn now() -> Self {
        Self(Instant::now())
    }

    /// Token for a specific instant.
    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    /// Whole milliseconds since the token was issued.
    pub fn elapsed_millis(&self) -> u64 {
        u64::try_from(self.0.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Orchestrates request and exception capture.
#[derive(Debug, Clone)]
pub struct CaptureCoordinator {
    config: Arc<SpyglassConfig>,
    store: Arc<EventStore>,
    extractor: DetailExtractor,
}

impl CaptureCoordinator {
    /// Create a coordinator with its own store sized from the configuration.
    pub fn new(config: SpyglassConfig) -> Self {
        let store = Arc::new(EventStore::new(config.max_entry_count()));
        Self::with_store(config, store)
    }

    /// Create a coordinator recording into an existing store.
    pub fn with_store(config: SpyglassConfig, store: Arc<EventStore>) -> Self {
        let extractor = DetailExtractor::from_config(&config);
        Self {
            config: Arc::new(config),
            store,
            extractor,
        }
    }

    /// Configuration in effect.
    pub fn config(&self) -> &SpyglassConfig {
        &self.config
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    /// Mark the start of a request.
    pub fn begin_request(&self) -> StartToken {
        StartToken::now()
    }

    /// Check if a request for `path` would be recorded.
    pub fn should_capture(&self, path: &str) -> bool {
        self.config.is_enabled() && !self.config.should_skip_path(path)
    }

    /// Record a request that completed with a response.
    ///
    /// Returns the stored entry, or `None` when the path is excluded,
    /// capture is disabled, or the inputs could not be extracted.
    pub fn record_completed_request(
        &self,
        request: &RawRequest,
        response: &RawResponse,
        started: StartToken,
    ) -> Option<Entry> {
        let path = request.effective_path();
        if !self.should_capture(path) {
            tracing::debug!(path = %path, "Skipping request capture");
            return None;
        }

        let elapsed = started.elapsed_millis();

        let request_detail = match self.extractor.extract_request_detail(request) {
            Ok(detail) => detail,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Dropping request capture");
                return None;
            }
        };

        let response_detail = match self.extractor.extract_response_detail(response, elapsed) {
            Ok(detail) => detail,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Dropping request capture");
                return None;
            }
        };

        let entry = self.store.insert(EntryDraft::Request {
            request: request_detail,
            response: response_detail,
        });

        tracing::debug!(
            id = %entry.id,
            method = %request.method,
            path = %path,
            status = response.status_code,
            duration_ms = elapsed,
            "Request captured"
        );

        Some(entry)
    }

    /// Record an exception, with the in-flight request when there is one.
    ///
    /// Recording is side-effect only; the caller still propagates the
    /// original error. If the request cannot be extracted the exception is
    /// recorded without it.
    pub fn record_exception(
        &self,
        request: Option<&RawRequest>,
        error: &dyn CapturedError,
    ) -> Option<Entry> {
        if !self.config.is_enabled() {
            return None;
        }

        if let Some(path) = request.map(RawRequest::effective_path) {
            if self.config.should_skip_path(path) {
                tracing::debug!(path = %path, "Skipping exception capture");
                return None;
            }
        }

        let request_detail = request.and_then(|raw| {
            self.extractor
                .extract_request_detail(raw)
                .map_err(|e| {
                    tracing::warn!(
                        path = %raw.effective_path(),
                        error = %e,
                        "Recording exception without request detail"
                    );
                })
                .ok()
        });

        let exception = self.extractor.extract_exception(error);

        let entry = self.store.insert(EntryDraft::Exception {
            exception,
            request: request_detail,
        });

        tracing::debug!(
            id = %entry.id,
            path = entry.path().unwrap_or("-"),
            "Exception captured"
        );

        Some(entry)
    }

    /// Start the auto-clear sweep if the configuration asks for one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_auto_clear(&self) -> Option<AutoClearHandle> {
        let max_age = self.config.auto_clear_age()?;
        if !self.config.is_enabled() {
            return None;
        }
        Some(spawn_auto_clear(self.store.clone(), max_age))
    }
}
