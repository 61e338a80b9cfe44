//! Composite delivery to an ordered list of children.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use fissionbus_domain::error::BusError;
use fissionbus_domain::key::IdentityKey;
use fissionbus_domain::payload::Message;

use crate::ports::Distribution;

/// Holds any number of child distributions under one key.
///
/// Dispatch works on a snapshot of the children taken under the read lock,
/// so registrations racing with an in-flight dispatch only affect later
/// publishes. Children are dispatched one after the other in registration
/// order; sync children therefore block for all of them, async children
/// each return at once.
pub struct FanoutDistribution {
    key: IdentityKey,
    children: RwLock<Vec<Arc<dyn Distribution>>>,
}

impl FanoutDistribution {
    /// Create an empty fan-out for `key`.
    #[must_use]
    pub fn new(key: IdentityKey) -> Self {
        Self {
            key,
            children: RwLock::new(Vec::new()),
        }
    }

    /// Number of registered children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.read().len()
    }

    /// Whether no child has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.read().is_empty()
    }
}

#[async_trait]
impl Distribution for FanoutDistribution {
    fn key(&self) -> &IdentityKey {
        &self.key
    }

    fn register(&self, child: Arc<dyn Distribution>) {
        self.children.write().push(child);
    }

    async fn dispatch(&self, message: &Message) -> Result<(), BusError> {
        let children = self.children.read().clone();
        for child in children {
            if let Err(err) = child.dispatch(message).await {
                tracing::debug!(%err, key = %self.key, "fan-out child failed");
            }
        }
        Ok(())
    }

    fn close(&self) -> Result<(), BusError> {
        let children = std::mem::take(&mut *self.children.write());
        for child in children {
            if let Err(err) = child.close() {
                tracing::debug!(%err, key = %self.key, "failed to close fan-out child");
            }
        }
        Ok(())
    }
}
