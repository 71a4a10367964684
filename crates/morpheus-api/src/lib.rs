//! # morpheus-api
//!
//! Client library for the Morpheus cloud management REST API.
//!
//! Every call goes through one [`Dispatcher`], which applies the same policy
//! to all of them:
//! - call options merged over instance defaults (call wins)
//! - `Authorization: Bearer <token>` injected unless the caller set one
//! - default content type, timeout override, extra headers
//! - query parameters moved into the header bag's `params` slot
//! - SSL verification override
//! - dry run: return the assembled [`RequestDescriptor`] instead of sending
//!
//! Resource interfaces ([`ResourceInterface`] and the wrappers in
//! [`resources`]) are thin consumers that only decide URL, method and body.
//!
//! ```text
//! ┌─────────────────┐   RequestSpec   ┌────────────┐   HTTPS   ┌──────────┐
//! │ resource iface  │────────────────►│ Dispatcher │──────────►│ Morpheus │
//! └─────────────────┘                 └────────────┘           └──────────┘
//!                          Dispatch::WouldDispatch ◄── dry run
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dispatcher;
pub mod error;
pub mod options;
pub mod request;
pub mod resource;
pub mod resources;

pub use dispatcher::{ApiResponse, DEFAULT_TIMEOUT, Dispatch, Dispatcher, RawResponse};
pub use error::{Error, Result};
pub use options::CallOptions;
pub use request::{Headers, Method, Params, Payload, RequestDescriptor, RequestSpec};
pub use resource::{ListFilter, ResourceInterface, ResourceKind};
