//! Body plumbing shared by the middleware and the query API.

use bytes::Bytes;
use http_body::{Body, Frame};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};

/// Boxed error type carried by [`SpyglassBody`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body type the middleware hands to the inner service and returns.
pub type SpyglassBody = UnsyncBoxBody<Bytes, BoxError>;

/// Box any body into a [`SpyglassBody`].
pub fn box_body<B>(body: B) -> SpyglassBody
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    body.map_err(|e| -> BoxError { e.into() }).boxed_unsync()
}

/// A complete in-memory body.
pub fn full_body(bytes: impl Into<Bytes>) -> SpyglassBody {
    Full::new(bytes.into())
        .map_err(|never| -> BoxError { match never {} })
        .boxed_unsync()
}

/// A body whose first frame is `error`.
pub(crate) fn error_body(error: BoxError) -> SpyglassBody {
    let frame: Result<Frame<Bytes>, BoxError> = Err(error);
    let frames = futures_util::stream::once(futures_util::future::ready(frame));
    StreamBody::new(frames).boxed_unsync()
}

/// Buffer `body` for capture when it is small enough.
///
/// Returns the body to forward and, if it was buffered, its bytes. Bodies
/// without a known upper size bound, or larger than `limit`, are forwarded
/// untouched. A read error is forwarded to the consumer instead of being
/// swallowed.
pub(crate) async fn buffer_body<B>(
    body: B,
    limit: usize,
    capture: bool,
) -> (SpyglassBody, Option<Bytes>)
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let fits = body
        .size_hint()
        .upper()
        .is_some_and(|upper| upper <= limit as u64);

    if !capture || !fits {
        return (box_body(body), None);
    }

    match body.collect().await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            (full_body(bytes.clone()), Some(bytes))
        }
        Err(e) => {
            let error: BoxError = e.into();
            tracing::debug!(error = %error, "Body read failed, forwarding error");
            (error_body(error), None)
        }
    }
}
