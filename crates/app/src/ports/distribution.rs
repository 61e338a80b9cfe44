//! Distribution port — a delivery strategy invoked on publish.

use std::sync::Arc;

use async_trait::async_trait;

use fissionbus_domain::error::BusError;
use fissionbus_domain::key::IdentityKey;
use fissionbus_domain::payload::Message;

/// Delivers a published [`Message`] to one or more targets.
///
/// A topic center holds one distribution per [`IdentityKey`]; the same
/// distribution object is shared by every topic the key is subscribed to.
#[async_trait]
pub trait Distribution: Send + Sync {
    /// The key this distribution is registered under.
    fn key(&self) -> &IdentityKey;

    /// Attach an extra invocation target.
    ///
    /// Composite distributions append `child` to the targets they dispatch
    /// to. Leaf distributions have nothing to attach to and ignore it.
    fn register(&self, child: Arc<dyn Distribution>) {
        let _ = child;
    }

    /// Deliver `message`.
    ///
    /// # Errors
    ///
    /// Returns the delivery failure, if the strategy observes one. Callers
    /// that broadcast treat this as best-effort and only log it.
    async fn dispatch(&self, message: &Message) -> Result<(), BusError>;

    /// Release any resource held by the distribution.
    ///
    /// Called once the distribution is evicted from the distributor cache.
    ///
    /// # Errors
    ///
    /// Returns an error if a held resource fails to shut down.
    fn close(&self) -> Result<(), BusError> {
        Ok(())
    }
}

/// Builds the distribution for a key the first time that key is seen.
pub type DistributionFactory = Box<dyn FnOnce(&IdentityKey) -> Arc<dyn Distribution> + Send>;
