//! Type-shape description and error types shared by the rest of the crate:
//! a type's JSON shape ([`ApiBody`]/[`ApiBodyInfo`]) and the error shape
//! every handler/hook converges on ([`ApiError`]). Route storage and
//! method/path dispatch live in [`crate::registry::RouteRegistry`] and
//! [`crate::dispatcher::Dispatcher`], which handle routes that can be
//! `http`, `sse` or `ws`, and the hook pipeline in [`crate::executor`].

mod info;
mod error;

pub use info::{ ApiBody, ApiBodyInfo, ApiBodyType };
pub use error::{ ApiError };

// Export these on top of the types, so that you don't need to
// import `bridge_core::api::ApiBody` AND `bridge_core::ApiBody` for
// instance:
pub use bridge_macros::{ ApiBody, ApiError };

// These are used in bridge_macros but are not expected to
// be made use of elsewhere and so are hidden from the docs:
#[doc(hidden)]
pub use info::{ ApiBodyStruct, ApiBodyStructInfo };
