//! Port definitions — traits that adapters implement or consume.
//!
//! Ports are the boundaries between the dispatch engine and the outside
//! world. They are defined here (in `app`) so that both the engine and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod distribution;
pub mod event_bus;
pub mod registry;

pub use distribution::{Distribution, DistributionFactory};
pub use event_bus::{BusPublisher, BusSubscriber, EventBus, SharedBus};
pub use registry::Registry;
