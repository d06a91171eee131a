//! # plughub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve the **JSON API** under `/api` (`/api/status`, `/api/state`,
//!   `/api/rules`, `/api/devices`) plus an open `/health` probe
//! - Gate `/api` behind an optional API key (`x-api-key` header or
//!   `Authorization: Bearer`)
//! - Map HTTP requests into [`GatewayService`](plughub_app::services::GatewayService)
//!   calls and their results back into JSON
//!
//! ## Dependency rule
//! Depends on `plughub-app` (for port traits and services) and `plughub-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod auth;
pub mod error;
pub mod router;
pub mod state;
