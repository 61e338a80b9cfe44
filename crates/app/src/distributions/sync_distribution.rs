//! Inline delivery.

use async_trait::async_trait;

use fissionbus_domain::error::BusError;
use fissionbus_domain::key::IdentityKey;
use fissionbus_domain::payload::Message;

use crate::handler::Callable;
use crate::ports::Distribution;

/// Runs its handler on the dispatching task and returns once it completes.
pub struct SyncDistribution {
    key: IdentityKey,
    callable: Callable,
}

impl SyncDistribution {
    /// Wrap `callable`; the distribution is keyed by the callable's identity.
    #[must_use]
    pub fn new(callable: Callable) -> Self {
        Self {
            key: callable.key(),
            callable,
        }
    }
}

#[async_trait]
impl Distribution for SyncDistribution {
    fn key(&self) -> &IdentityKey {
        &self.key
    }

    async fn dispatch(&self, message: &Message) -> Result<(), BusError> {
        self.callable.invoke(message.payload())?;
        Ok(())
    }
}
