//! # spyglass-tower
//!
//! Tower middleware for Spyglass.
//!
//! [`SpyglassLayer`] times every request that passes through it, buffers
//! small request and response bodies, and records the exchange through a
//! [`CaptureCoordinator`](spyglass_core::CaptureCoordinator). Errors are
//! recorded as exception entries and still reach the caller unchanged:
//!
//! - an [`HttpError`](spyglass_core::HttpError) or
//!   [`ErrorValue`](spyglass_core::ErrorValue) found in the response extensions
//! - an `Err` returned by the inner service
//! - a panic in the inner service, which is resumed after recording
//!
//! The layer also serves the captured entries as JSON under
//! `{path_prefix}/api` (see [`api`]).
//!
//! ## Example
//!
//! ```ignore
//! use spyglass_core::SpyglassConfig;
//! use spyglass_tower::SpyglassLayer;
//! use tower::ServiceBuilder;
//!
//! let spyglass = SpyglassLayer::with_config(SpyglassConfig::from_env()?);
//! let _sweep = spyglass.coordinator().spawn_auto_clear();
//!
//! let service = ServiceBuilder::new()
//!     .layer(spyglass)
//!     .service(app);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod api;
pub mod body;
pub mod layer;
pub mod raw;

pub use api::{handle_api_request, ApiResponse};
pub use body::{box_body, full_body, BoxError, SpyglassBody};
pub use layer::{SpyglassLayer, SpyglassService};
pub use raw::{raw_request, raw_response, ClientAddr, RouteParams};
