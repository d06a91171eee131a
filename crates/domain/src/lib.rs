//! # plughub-domain
//!
//! Pure domain model for the plughub device gateway.
//!
//! ## Responsibilities
//! - Foundational types: device identifiers, error conventions, timestamps
//! - Define **Devices** (descriptive metadata owned by the configuration store)
//! - Define **State snapshots** (the on/off value of every known device) and
//!   the outcome of the last refresh against the remote controller
//! - Define **Rules** (time-triggered target snapshots, one-shot or repeating)
//!   including the due / stale / advance logic the scheduler applies
//! - Contain all invariant enforcement and boundary validation
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod device;
pub mod rule;
pub mod state;
