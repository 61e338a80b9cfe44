//! Detached delivery.

use async_trait::async_trait;

use fissionbus_domain::error::BusError;
use fissionbus_domain::key::IdentityKey;
use fissionbus_domain::payload::Message;

use crate::handler::Callable;
use crate::ports::Distribution;

/// Runs its handler on the blocking task pool and returns immediately.
///
/// The publisher never observes completion; binding failures are logged
/// from the task.
pub struct AsyncDistribution {
    key: IdentityKey,
    callable: Callable,
}

impl AsyncDistribution {
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
impl Distribution for AsyncDistribution {
    fn key(&self) -> &IdentityKey {
        &self.key
    }

    async fn dispatch(&self, message: &Message) -> Result<(), BusError> {
        let callable = self.callable.clone();
        let payload = message.payload().clone();
        tokio::task::spawn_blocking(move || {
            if let Err(err) = callable.invoke(&payload) {
                tracing::warn!(%err, handler = %callable.id(), "handler rejected published arguments");
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fissionbus_domain::payload;
    use std::time::{Duration, Instant};
    use tokio::sync::mpsc;

    #[tokio::test(flavor = "multi_thread")]
    async fn should_return_before_handler_completes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dist = AsyncDistribution::new(Callable::new(move |name: String| {
            std::thread::sleep(Duration::from_millis(200));
            let _ = tx.send(name);
        }));

        let started = Instant::now();
        dist.dispatch(&Message::local(payload!["jack"]))
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_millis(150));

        let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert_eq!(received.as_deref(), Some("jack"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn should_not_report_binding_error_to_publisher() {
        let dist = AsyncDistribution::new(Callable::new(|_: u32| {}));

        let result = dist.dispatch(&Message::local(payload!["jack"])).await;

        assert!(result.is_ok());
    }
}
