//! Event bus port — the subscribe/publish façade.
//!
//! The in-process bus implements it, and so does every decorator wrapped
//! around it, which keeps a decorated bus indistinguishable from a local one.

use std::sync::Arc;

use async_trait::async_trait;

use fissionbus_domain::error::BusError;
use fissionbus_domain::key::IdentityKey;
use fissionbus_domain::payload::{Message, Payload};

use crate::handler::Callable;
use crate::ports::distribution::{Distribution, DistributionFactory};

/// Registration side of the bus.
#[async_trait]
pub trait BusSubscriber: Send + Sync {
    /// Subscribe `handler` to `topic`; each publish runs it on its own task.
    ///
    /// Subscribing a handler that is already registered adds another
    /// delivery to the existing registration instead of creating a second
    /// one.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration could not be recorded (e.g. a
    /// decorator failed to reach its peer).
    async fn subscribe(&self, topic: &str, handler: Callable) -> Result<IdentityKey, BusError>;

    /// Subscribe `handler` to `topic`; each publish runs it inline and
    /// blocks the publisher until it returns.
    ///
    /// # Errors
    ///
    /// Same as [`subscribe`](Self::subscribe).
    async fn subscribe_sync(&self, topic: &str, handler: Callable) -> Result<IdentityKey, BusError>;

    /// Register a caller-built distribution under an explicit `key`.
    ///
    /// `factory` only runs when no distribution is cached for `key` yet.
    /// Returns the distribution now registered under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyKey`](fissionbus_domain::error::ValidationError::EmptyKey)
    /// for an empty named key.
    async fn subscribe_with(
        &self,
        topic: &str,
        key: IdentityKey,
        factory: DistributionFactory,
    ) -> Result<Arc<dyn Distribution>, BusError>;

    /// Remove the registration for `key` from `topic`.
    ///
    /// Removing a key that is not registered is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if a decorator failed to propagate the removal.
    async fn unsubscribe(&self, topic: &str, key: &IdentityKey) -> Result<(), BusError>;
}

/// Publication side of the bus.
#[async_trait]
pub trait BusPublisher: Send + Sync {
    /// Hand `message` to every distribution registered on `topic`.
    ///
    /// Delivery failures are never reported to the caller.
    async fn deliver(&self, topic: &str, message: Message);

    /// Publish a locally produced payload to `topic`.
    async fn publish(&self, topic: &str, payload: Payload) {
        self.deliver(topic, Message::local(payload)).await;
    }
}

/// A complete bus: both halves of the façade.
pub trait EventBus: BusSubscriber + BusPublisher {}

impl<T: BusSubscriber + BusPublisher + ?Sized> EventBus for T {}

/// Shared handle to a (possibly decorated) bus.
pub type SharedBus = Arc<dyn EventBus>;
