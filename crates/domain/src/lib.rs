//! # fissionbus-domain
//!
//! Pure domain model for the fissionbus publish/subscribe system.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions
//! - Define **Topics** (named channels)
//! - Define **Identity Keys** (how registrations are deduplicated)
//! - Define **Payloads** and **Messages** (what gets published and dispatched)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod key;
pub mod payload;
pub mod topic;
