//! Per-topic store of distributions and the broadcast over them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use fissionbus_domain::key::IdentityKey;
use fissionbus_domain::payload::Message;
use fissionbus_domain::topic::Topic;

use crate::ports::Distribution;

/// The distributions subscribed to one topic, by key.
pub struct TopicCenter {
    topic: Topic,
    distributors: RwLock<HashMap<IdentityKey, Arc<dyn Distribution>>>,
}

impl TopicCenter {
    /// Create an empty center for `topic`.
    #[must_use]
    pub fn new(topic: Topic) -> Self {
        Self {
            topic,
            distributors: RwLock::new(HashMap::new()),
        }
    }

    /// The topic this center serves.
    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Register `distribution` under `key`, returning the one it replaced.
    pub fn add_distributor(
        &self,
        key: IdentityKey,
        distribution: Arc<dyn Distribution>,
    ) -> Option<Arc<dyn Distribution>> {
        self.distributors.write().insert(key, distribution)
    }

    /// Remove the distribution registered under `key`, if any.
    pub fn remove_distributor(&self, key: &IdentityKey) -> Option<Arc<dyn Distribution>> {
        self.distributors.write().remove(key)
    }

    /// Whether a distribution is registered under `key`.
    #[must_use]
    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.distributors.read().contains_key(key)
    }

    /// Number of registered distributions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.distributors.read().len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.distributors.read().is_empty()
    }

    /// Broadcast `message` to every registered distribution.
    ///
    /// Works on a snapshot taken under the read lock. A failing distribution
    /// is logged and skipped; it never stops delivery to the others.
    pub async fn fission(&self, message: &Message) {
        let snapshot: Vec<Arc<dyn Distribution>> =
            self.distributors.read().values().cloned().collect();
        for distribution in snapshot {
            if let Err(err) = distribution.dispatch(message).await {
                tracing::debug!(
                    %err,
                    topic = %self.topic,
                    key = %distribution.key(),
                    "distribution failed, skipping"
                );
            }
        }
    }
}
