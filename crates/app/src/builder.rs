//! Construction of a bus wrapped in decorators.
//!
//! A decorator ("proxy") is any [`EventBus`](crate::ports::EventBus) that wraps another one, such as
//! the RPC bridge. The builder owns the innermost [`InProcessEventBus`] and
//! applies the registered [`ProxyCreator`]s in order: the first one wraps
//! the in-process bus, the next one wraps the result, and so on. Callers
//! talk to the outermost layer.

use std::sync::Arc;

use futures::future::BoxFuture;

use fissionbus_domain::error::BusError;

use crate::event_bus::InProcessEventBus;
use crate::ports::SharedBus;

/// Wraps a bus in a decorator. May perform I/O (e.g. bind a listener).
pub type ProxyCreator =
    Box<dyn FnOnce(SharedBus) -> BoxFuture<'static, Result<SharedBus, BusError>> + Send>;

/// Lift a synchronous, infallible decorator into a [`ProxyCreator`].
pub fn decorate<F>(wrap: F) -> ProxyCreator
where
    F: FnOnce(SharedBus) -> SharedBus + Send + 'static,
{
    Box::new(move |inner| Box::pin(async move { Ok(wrap(inner)) }))
}

/// Builder for a (possibly decorated) bus.
#[derive(Default)]
pub struct EventBusBuilder {
    proxies: Vec<ProxyCreator>,
}

impl EventBusBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a decorator around everything registered so far.
    #[must_use]
    pub fn with_proxy(mut self, proxy: ProxyCreator) -> Self {
        self.proxies.push(proxy);
        self
    }

    /// Build the in-process bus and apply every decorator.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a decorator; the layers built so
    /// far are dropped.
    pub async fn build(self) -> Result<SharedBus, BusError> {
        let mut bus: SharedBus = Arc::new(InProcessEventBus::new());
        for proxy in self.proxies {
            bus = proxy(bus).await?;
        }
        Ok(bus)
    }
}
