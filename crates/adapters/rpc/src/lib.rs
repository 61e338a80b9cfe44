//! # fissionbus-adapter-rpc
//!
//! RPC bridge adapter — mirrors subscriptions and relays publishes between
//! two fissionbus peers.
//!
//! ## Responsibilities
//! - Decorate a local bus with [`RpcBridge`]: every `subscribe` /
//!   `subscribe_sync` / `unsubscribe` is mirrored to the configured peer
//! - Serve the peer's calls (`RPCSubscribe`, `RPCSubscribeSync`,
//!   `RPCUnsubscribe`, `RPCPublish`) on a TCP or Unix socket
//! - Install one relay per topic on the local bus that forwards publishes
//!   to the subscribed peers
//!
//! ## Dependency rule
//! Depends on `fissionbus-app` and `fissionbus-domain`. The application
//! layer only sees the bridge through the `EventBus` port.

pub mod config;
pub mod endpoint;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod service;
pub mod transport;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use fissionbus_app::builder::ProxyCreator;
use fissionbus_app::handler::Callable;
use fissionbus_app::ports::{
    BusPublisher, BusSubscriber, Distribution, DistributionFactory, SharedBus,
};
use fissionbus_domain::error::BusError;
use fissionbus_domain::id::RelayHandle;
use fissionbus_domain::key::IdentityKey;
use fissionbus_domain::payload::Message;
use fissionbus_domain::topic::Topic;

use crate::config::BridgeConfig;
use crate::endpoint::Endpoint;
use crate::error::BridgeError;
use crate::protocol::{Reply, Request, SubArgs, SubReply, UnsubArgs};
use crate::service::RpcService;
use crate::transport::{Listener, RpcClient, RpcServer};

/// A bus that keeps a peer's view of its subscriptions in sync.
///
/// Subscribing to a topic asks the peer to relay that topic's publishes
/// here; unsubscribing withdraws the request. Publishing is purely local:
/// the payload reaches the peer through the relay the peer installed when
/// it subscribed. Without a configured peer the bridge only serves inbound
/// calls.
pub struct RpcBridge {
    inner: SharedBus,
    url: String,
    remote: Option<Endpoint>,
    client: RpcClient,
    handles: Mutex<HashMap<(Topic, IdentityKey), RelayHandle>>,
    service: Arc<RpcService>,
    _server: RpcServer,
}

impl RpcBridge {
    /// Bind the listener described by `config` and wrap `inner`.
    ///
    /// # Errors
    ///
    /// Returns a [`BridgeError`] if an endpoint URL is invalid or the
    /// listener cannot be bound.
    pub async fn start(inner: SharedBus, config: &BridgeConfig) -> Result<Self, BridgeError> {
        let listen: Endpoint = config.listen.parse()?;
        let remote = config
            .remote
            .as_deref()
            .map(str::parse::<Endpoint>)
            .transpose()?;
        let listener = Listener::bind(&listen).await?;
        let url = match &config.advertise {
            Some(advertise) => advertise.parse::<Endpoint>()?.to_string(),
            None => listener.local_endpoint()?.to_string(),
        };
        let client = RpcClient::new(config.call_timeout());
        let service = Arc::new(RpcService::new(Arc::clone(&inner), url.clone(), client));
        let server = RpcServer::spawn(listener, service.clone())?;
        tracing::info!(
            %listen,
            advertise = %url,
            remote = ?remote.as_ref().map(ToString::to_string),
            "rpc bridge started"
        );
        Ok(Self {
            inner,
            url,
            remote,
            client,
            handles: Mutex::new(HashMap::new()),
            service,
            _server: server,
        })
    }

    /// URL this bridge announces to its peer.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The peer subscriptions are mirrored to, if any.
    #[must_use]
    pub fn remote(&self) -> Option<&Endpoint> {
        self.remote.as_ref()
    }

    /// Number of remote subscribers the peer holds on `topic` here.
    pub async fn remote_subscribers(&self, topic: &str) -> usize {
        self.service.remote_subscribers(topic).await
    }

    /// Register `handler` locally after the peer agreed to relay `topic`.
    ///
    /// The handle table stays locked until the local registration is done,
    /// so a concurrent unsubscribe of the same key sees both or neither.
    async fn subscribe_mirrored(
        &self,
        topic: &str,
        handler: Callable,
        sync: bool,
    ) -> Result<IdentityKey, BusError> {
        let Some(remote) = &self.remote else {
            return self.subscribe_local(topic, handler, sync).await;
        };
        let mut handles = self.handles.lock().await;
        let slot = (Topic::from(topic), handler.key());
        let mirrored = if handles.contains_key(&slot) {
            None
        } else {
            Some(self.mirror_subscribe(remote, &slot.0, sync).await?)
        };
        let key = match self.subscribe_local(topic, handler, sync).await {
            Ok(key) => key,
            Err(err) => {
                if let Some(handle) = mirrored
                    && let Err(undo) = self.mirror_unsubscribe(remote, &slot.0, handle).await
                {
                    tracing::warn!(%undo, %handle, %remote, "failed to withdraw subscription");
                }
                return Err(err);
            }
        };
        if let Some(handle) = mirrored {
            handles.insert(slot, handle);
        }
        Ok(key)
    }

    async fn subscribe_local(
        &self,
        topic: &str,
        handler: Callable,
        sync: bool,
    ) -> Result<IdentityKey, BusError> {
        if sync {
            self.inner.subscribe_sync(topic, handler).await
        } else {
            self.inner.subscribe(topic, handler).await
        }
    }

    /// Withdraw the peer's relay for `key`, then drop the local registration,
    /// under the same handle table lock as [`Self::subscribe_mirrored`].
    async fn unsubscribe_mirrored(&self, topic: &str, key: &IdentityKey) -> Result<(), BusError> {
        let Some(remote) = &self.remote else {
            return self.inner.unsubscribe(topic, key).await;
        };
        let mut handles = self.handles.lock().await;
        let slot = (Topic::from(topic), key.clone());
        if let Some(handle) = handles.get(&slot).copied() {
            self.mirror_unsubscribe(remote, &slot.0, handle).await?;
            handles.remove(&slot);
        }
        self.inner.unsubscribe(topic, key).await
    }

    async fn mirror_subscribe(
        &self,
        remote: &Endpoint,
        topic: &Topic,
        sync: bool,
    ) -> Result<RelayHandle, BridgeError> {
        let args = SubArgs {
            remote_url: self.url.clone(),
            topic: topic.clone(),
        };
        let request = if sync {
            Request::SubscribeSync(args)
        } else {
            Request::Subscribe(args)
        };
        let Reply::Subscribed(SubReply { handle }) = self.client.call(remote, &request).await?
        else {
            return Err(BridgeError::UnexpectedReply {
                method: request.method(),
            });
        };
        tracing::debug!(%handle, %remote, "subscription mirrored");
        Ok(handle)
    }

    async fn mirror_unsubscribe(
        &self,
        remote: &Endpoint,
        topic: &Topic,
        handle: RelayHandle,
    ) -> Result<(), BridgeError> {
        let request = Request::Unsubscribe(UnsubArgs {
            topic: topic.clone(),
            handle: Some(handle),
        });
        match self.client.call(remote, &request).await? {
            Reply::Unsubscribed => {
                tracing::debug!(%handle, %remote, "unsubscription mirrored");
                Ok(())
            }
            _ => Err(BridgeError::UnexpectedReply {
                method: request.method(),
            }),
        }
    }
}

#[async_trait]
impl BusSubscriber for RpcBridge {
    #[tracing::instrument(skip(self, handler))]
    async fn subscribe(&self, topic: &str, handler: Callable) -> Result<IdentityKey, BusError> {
        self.subscribe_mirrored(topic, handler, false).await
    }

    #[tracing::instrument(skip(self, handler))]
    async fn subscribe_sync(
        &self,
        topic: &str,
        handler: Callable,
    ) -> Result<IdentityKey, BusError> {
        self.subscribe_mirrored(topic, handler, true).await
    }

    async fn subscribe_with(
        &self,
        topic: &str,
        key: IdentityKey,
        factory: DistributionFactory,
    ) -> Result<Arc<dyn Distribution>, BusError> {
        self.inner.subscribe_with(topic, key, factory).await
    }

    #[tracing::instrument(skip(self), fields(key = %key))]
    async fn unsubscribe(&self, topic: &str, key: &IdentityKey) -> Result<(), BusError> {
        self.unsubscribe_mirrored(topic, key).await
    }
}

#[async_trait]
impl BusPublisher for RpcBridge {
    async fn deliver(&self, topic: &str, message: Message) {
        self.inner.deliver(topic, message).await;
    }
}

/// Wrap the bus being built in an [`RpcBridge`] configured by `config`.
///
/// Meant for [`EventBusBuilder::with_proxy`](fissionbus_app::builder::EventBusBuilder::with_proxy).
#[must_use]
pub fn proxy_creator(config: BridgeConfig) -> ProxyCreator {
    Box::new(move |inner| {
        Box::pin(async move {
            let bridge = RpcBridge::start(inner, &config).await?;
            Ok::<SharedBus, BusError>(Arc::new(bridge))
        })
    })
}
