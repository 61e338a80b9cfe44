//! In-process event bus backed by topic centers and a distributor cache.

use std::sync::Arc;

use async_trait::async_trait;

use fissionbus_domain::error::{BusError, ValidationError};
use fissionbus_domain::key::IdentityKey;
use fissionbus_domain::payload::Message;
use fissionbus_domain::topic::Topic;

use crate::center_registry::CenterRegistry;
use crate::distributions::{AsyncDistribution, FanoutDistribution, SyncDistribution};
use crate::distributor_cache::DistributorCache;
use crate::handler::Callable;
use crate::ports::{BusPublisher, BusSubscriber, Distribution, DistributionFactory};

/// In-process event bus.
///
/// Each bus owns its topic centers and its distributor cache; two buses
/// never see each other's registrations. Publishing to a topic nobody
/// subscribed to is a no-op.
#[derive(Default)]
pub struct InProcessEventBus {
    centers: CenterRegistry,
    distributors: DistributorCache,
}

impl InProcessEventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distributions currently registered on `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.centers.get(topic).map_or(0, |center| center.len())
    }

    /// Every topic referenced so far, sorted.
    #[must_use]
    pub fn topics(&self) -> Vec<Topic> {
        self.centers.topics()
    }

    /// Number of distributions held by the distributor cache.
    #[must_use]
    pub fn cached_distributions(&self) -> usize {
        self.distributors.len()
    }

    fn attach(&self, topic: &str, key: IdentityKey, distribution: Arc<dyn Distribution>) {
        let center = self.centers.center(topic);
        if center.add_distributor(key.clone(), distribution).is_some() {
            // already registered on this topic, the reference taken by the
            // caller is a duplicate
            self.distributors.release(&key);
        }
    }

    fn subscribe_child(
        &self,
        topic: &str,
        callable: &Callable,
        child: Arc<dyn Distribution>,
    ) -> IdentityKey {
        let key = callable.key();
        let fanout = self.distributors.acquire(&key, |key| {
            Arc::new(FanoutDistribution::new(key.clone())) as Arc<dyn Distribution>
        });
        fanout.register(child);
        self.attach(topic, key.clone(), fanout);
        key
    }
}

#[async_trait]
impl BusSubscriber for InProcessEventBus {
    #[tracing::instrument(skip(self, handler))]
    async fn subscribe(&self, topic: &str, handler: Callable) -> Result<IdentityKey, BusError> {
        let child = Arc::new(AsyncDistribution::new(handler.clone()));
        let key = self.subscribe_child(topic, &handler, child);
        tracing::debug!(%key, "subscribed");
        Ok(key)
    }

    #[tracing::instrument(skip(self, handler))]
    async fn subscribe_sync(
        &self,
        topic: &str,
        handler: Callable,
    ) -> Result<IdentityKey, BusError> {
        let child = Arc::new(SyncDistribution::new(handler.clone()));
        let key = self.subscribe_child(topic, &handler, child);
        tracing::debug!(%key, "subscribed (sync)");
        Ok(key)
    }

    #[tracing::instrument(skip(self, factory), fields(key = %key))]
    async fn subscribe_with(
        &self,
        topic: &str,
        key: IdentityKey,
        factory: DistributionFactory,
    ) -> Result<Arc<dyn Distribution>, BusError> {
        if matches!(&key, IdentityKey::Named(name) if name.is_empty()) {
            return Err(ValidationError::EmptyKey.into());
        }
        let distribution = self.distributors.acquire(&key, factory);
        self.attach(topic, key, Arc::clone(&distribution));
        tracing::debug!("subscribed custom distribution");
        Ok(distribution)
    }

    #[tracing::instrument(skip(self), fields(key = %key))]
    async fn unsubscribe(&self, topic: &str, key: &IdentityKey) -> Result<(), BusError> {
        let Some(center) = self.centers.get(topic) else {
            return Ok(());
        };
        if center.remove_distributor(key).is_some() {
            self.distributors.release(key);
            tracing::debug!("unsubscribed");
        }
        Ok(())
    }
}

#[async_trait]
impl BusPublisher for InProcessEventBus {
    #[tracing::instrument(skip(self, message), fields(args = message.payload().len()))]
    async fn deliver(&self, topic: &str, message: Message) {
        let center = self.centers.center(topic);
        center.fission(&message).await;
    }
}
