//! Shared plumbing for the Catalogue Manager workspace.
//!
//! Two concerns live here because every other crate needs them:
//! logging bootstrap and the JSON-over-HTTP transport adapter used to
//! talk to the upstream services.

pub mod http;
pub mod logging;

pub use http::{Credentials, RestClient, TransportError};
