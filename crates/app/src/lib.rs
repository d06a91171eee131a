//! # plughub-app
//!
//! Application layer — use-cases, long-running core components, and **port
//! definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `RemoteStateClient` — fetch / apply device state on the remote controller
//!   - `ConfigStore` — durable device list and rule list
//! - Own the two cooperating core components:
//!   - `StateCache` — mirrors remote device state, refreshed periodically and
//!     on demand, reporting the outcome of the last refresh
//!   - `RuleScheduler` — evaluates time-triggered rules once per period and
//!     pushes their target state through the cache
//! - Provide the **driving/inbound** use-case struct `GatewayService`, which
//!   validates API input before it reaches the core
//! - Manage background task lifecycles (spawn, signal, join)
//!
//! ## Dependency rule
//! Depends on `plughub-domain` only (plus `tokio` for tasks, locks and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod ports;
pub mod rule_scheduler;
pub mod services;
pub mod state_cache;
pub mod task;
