//! Tower middleware that records every request passing through it.

use crate::api::handle_api_request;
use crate::body::{box_body, buffer_body, BoxError, SpyglassBody};
use crate::raw::{raw_request, raw_response};
use bytes::Bytes;
use futures_util::FutureExt;
use http::{Request, Response};
use http_body::Body;
use spyglass_core::{
    body_from_bytes, CaptureCoordinator, ErrorValue, EventStore, HttpError, RawRequest,
    SpyglassConfig,
};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Request and exception capture middleware.
///
/// Wraps a service and records each request it handles. Requests under
/// `{path_prefix}/api` are answered by the query API instead of the inner
/// service.
///
/// # Example
///
/// ```ignore
/// use spyglass_core::SpyglassConfig;
/// use spyglass_tower::SpyglassLayer;
///
/// let spyglass = SpyglassLayer::with_config(
///     SpyglassConfig::new()
///         .max_entries(500)
///         .skip_path("/health"),
/// );
///
/// let app = tower::ServiceBuilder::new()
///     .layer(spyglass)
///     .service(router);
/// ```
#[derive(Debug, Clone)]
pub struct SpyglassLayer {
    coordinator: CaptureCoordinator,
    serve_api: bool,
}

impl SpyglassLayer {
    /// Create a layer with default configuration.
    pub fn new() -> Self {
        Self::with_config(SpyglassConfig::new())
    }

    /// Create a layer with custom configuration.
    pub fn with_config(config: SpyglassConfig) -> Self {
        Self::from_coordinator(CaptureCoordinator::new(config))
    }

    /// Create a layer recording through an existing coordinator.
    pub fn from_coordinator(coordinator: CaptureCoordinator) -> Self {
        if !coordinator.config().is_enabled() {
            tracing::info!("Spyglass disabled, requests pass through unrecorded");
        }
        Self {
            coordinator,
            serve_api: true,
        }
    }

    /// Enable or disable the built-in query API. Default: enabled.
    pub fn serve_api(mut self, serve: bool) -> Self {
        self.serve_api = serve;
        self
    }

    /// The coordinator used for capture.
    pub fn coordinator(&self) -> &CaptureCoordinator {
        &self.coordinator
    }

    /// The store entries are recorded into.
    pub fn store(&self) -> &Arc<EventStore> {
        self.coordinator.store()
    }
}

impl Default for SpyglassLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for SpyglassLayer {
    type Service = SpyglassService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SpyglassService {
            inner,
            coordinator: self.coordinator.clone(),
            serve_api: self.serve_api,
        }
    }
}

/// Service produced by [`SpyglassLayer`].
#[derive(Debug, Clone)]
pub struct SpyglassService<S> {
    inner: S,
    coordinator: CaptureCoordinator,
    serve_api: bool,
}

impl<S, B, ResBody> Service<Request<B>> for SpyglassService<S>
where
    S: Service<Request<SpyglassBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: fmt::Debug + fmt::Display + Send + 'static,
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
    ResBody: Body<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response<SpyglassBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        // The ready service is the one that must handle this request.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let coordinator = self.coordinator.clone();
        let serve_api = self.serve_api;

        Box::pin(async move {
            if serve_api && coordinator.config().is_enabled() {
                if let Some(response) = handle_api_request(
                    coordinator.store(),
                    coordinator.config().dashboard_prefix(),
                    req.method(),
                    req.uri(),
                ) {
                    return Ok(response.map(box_body));
                }
            }

            if !coordinator.should_capture(req.uri().path()) {
                return pass_through(inner, req).await;
            }

            capture(coordinator, inner, req).await
        })
    }
}

async fn pass_through<S, B, ResBody>(
    mut inner: S,
    req: Request<B>,
) -> Result<Response<SpyglassBody>, S::Error>
where
    S: Service<Request<SpyglassBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
    ResBody: Body<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    let response = call_inner(&mut inner, req.map(box_body)).await?;
    Ok(response.map(box_body))
}

async fn capture<S, B, ResBody>(
    coordinator: CaptureCoordinator,
    mut inner: S,
    req: Request<B>,
) -> Result<Response<SpyglassBody>, S::Error>
where
    S: Service<Request<SpyglassBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: fmt::Debug + fmt::Display,
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
    ResBody: Body<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    let config = coordinator.config();
    let limit = config.body_size_limit();
    let started = coordinator.begin_request();

    let (parts, body) = req.into_parts();
    let (body, captured) = buffer_body(body, limit, config.captures_request_body()).await;
    let raw = raw_request(&parts, captured.as_deref().and_then(body_from_bytes));
    let req = Request::from_parts(parts, body);

    // The outcome is scoped to this statement so the service error type is not
    // held across later awaits (keeps the future provably `Send`).
    let response = match AssertUnwindSafe(async move { call_inner(&mut inner, req).await })
        .catch_unwind()
        .await
    {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            coordinator.record_exception(Some(&raw), &ErrorValue::from_service_error(&err));
            return Err(err);
        }
        Err(panic) => {
            coordinator.record_exception(Some(&raw), &ErrorValue::from_panic(panic.as_ref()));
            std::panic::resume_unwind(panic);
        }
    };

    let (parts, body) = response.into_parts();

    if record_attached_error(&coordinator, &raw, &parts.extensions) {
        return Ok(Response::from_parts(parts, box_body(body)));
    }

    let (body, captured) = buffer_body(body, limit, config.captures_response_body()).await;
    let raw_res = raw_response(&parts, captured.as_deref().and_then(body_from_bytes));
    coordinator.record_completed_request(&raw, &raw_res, started);

    Ok(Response::from_parts(parts, body))
}

/// Call `inner`, boxing its future so `S::Future` does not appear in the
/// state of the enclosing async block (works around a rustc limitation
/// proving `Send` for projections through higher-ranked lifetimes).
type InnerFuture<R, E> = Pin<Box<dyn Future<Output = Result<R, E>> + Send>>;

fn call_inner<S, ResBody>(
    inner: &mut S,
    req: Request<SpyglassBody>,
) -> InnerFuture<Response<ResBody>, S::Error>
where
    S: Service<Request<SpyglassBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
{
    Box::pin(inner.call(req))
}

/// Record the error a host attached to its error response, if any.
fn record_attached_error(
    coordinator: &CaptureCoordinator,
    raw: &RawRequest,
    extensions: &http::Extensions,
) -> bool {
    if let Some(error) = extensions.get::<HttpError>() {
        coordinator.record_exception(Some(raw), error);
        return true;
    }
    if let Some(error) = extensions.get::<ErrorValue>() {
        coordinator.record_exception(Some(raw), error);
        return true;
    }
    false
}
