//! # fissionbus-app
//!
//! Application layer — the dispatch engine and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** shared with adapters:
//!   - `Distribution` — a delivery strategy invoked on publish
//!   - `BusSubscriber` / `BusPublisher` — the event bus façade
//!   - `Registry` — create-if-absent keyed stores
//! - Bind published argument lists to typed handlers (`handler`)
//! - Provide the delivery strategies: sync, async and fan-out
//! - Provide the stores: `CenterRegistry`, `DistributorCache`, `TopicCenter`
//! - Provide the **in-process event bus** and the builder that wraps it in
//!   decorators (e.g. the RPC bridge adapter)
//!
//! ## Dependency rule
//! Depends on `fissionbus-domain` only (plus `tokio` for task spawning).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod builder;
pub mod center_registry;
pub mod distributions;
pub mod distributor_cache;
pub mod event_bus;
pub mod handler;
pub mod ports;
pub mod topic_center;
