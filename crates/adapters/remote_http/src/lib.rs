//! # plughub-adapter-remote-http
//!
//! [`RemoteStateClient`](plughub_app::ports::RemoteStateClient) over HTTPS,
//! using [reqwest](https://docs.rs/reqwest).
//!
//! ## Wire format
//!
//! | Call | Request | Response |
//! |------|---------|----------|
//! | `POST {url}/get_state` | `{"key": "<api key>"}` | `{"state": "<snapshot json>"}` |
//! | `POST {url}/set_state` | `{"key": "<api key>", "state": "<snapshot json>"}` | `{"success": true}` |
//!
//! The snapshot travels as a JSON document embedded in a string; decoding it
//! is left to the core.
//!
//! ## Dependency rule
//! Depends on `plughub-app` (port traits) and `plughub-domain` only.

pub mod client;
pub mod error;

pub use client::{HttpRemoteClient, RemoteHttpConfig};
pub use error::HttpRemoteError;
