//! Inbound side of the bridge: the RPC methods a peer calls.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use fissionbus_app::ports::{Distribution, DistributionFactory, SharedBus};
use fissionbus_domain::error::BusError;
use fissionbus_domain::id::RelayHandle;
use fissionbus_domain::key::IdentityKey;
use fissionbus_domain::payload::Message;
use fissionbus_domain::topic::Topic;

use crate::endpoint::Endpoint;
use crate::error::BridgeError;
use crate::protocol::{PubArgs, Reply, Request, Response, SubArgs, SubReply, UnsubArgs};
use crate::relay::RelayDistribution;
use crate::transport::{RequestHandler, RpcClient};

/// Serves `RPCSubscribe`, `RPCSubscribeSync`, `RPCUnsubscribe` and
/// `RPCPublish` against a local bus.
///
/// Each topic a peer subscribes to gets one [`RelayDistribution`],
/// registered on the bus under [`IdentityKey::Relay`]. The relay is removed
/// from the bus once its last remote subscriber is gone.
pub struct RpcService {
    bus: SharedBus,
    local_url: String,
    client: RpcClient,
    relays: Mutex<HashMap<Topic, Arc<RelayDistribution>>>,
}

impl RpcService {
    /// Serve `bus`; relays announce themselves to peers as `local_url`.
    #[must_use]
    pub fn new(bus: SharedBus, local_url: impl Into<String>, client: RpcClient) -> Self {
        Self {
            bus,
            local_url: local_url.into(),
            client,
            relays: Mutex::new(HashMap::new()),
        }
    }

    /// Number of remote subscribers attached to `topic`.
    pub async fn remote_subscribers(&self, topic: &str) -> usize {
        self.relays
            .lock()
            .await
            .get(&Topic::from(topic))
            .map_or(0, |relay| relay.len())
    }

    /// Attach the caller to the relay of `args.topic`, installing the relay
    /// on the bus if this is the topic's first remote subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEndpoint`](fissionbus_domain::error::ValidationError::InvalidEndpoint)
    /// for an unusable `remote_url`, or the bus error if the relay cannot be
    /// installed.
    #[tracing::instrument(skip(self), fields(topic = %args.topic, remote = %args.remote_url))]
    pub async fn rpc_subscribe(&self, args: SubArgs) -> Result<SubReply, BusError> {
        let endpoint: Endpoint = args.remote_url.parse().map_err(BridgeError::from)?;
        let handle = RelayHandle::new();
        let mut relays = self.relays.lock().await;

        match relays.entry(args.topic.clone()) {
            Entry::Occupied(entry) => entry.get().attach(handle, endpoint),
            Entry::Vacant(entry) => {
                let relay = Arc::new(RelayDistribution::new(
                    args.topic.clone(),
                    self.local_url.clone(),
                    self.client,
                ));
                relay.attach(handle, endpoint);
                let installed: Arc<dyn Distribution> = relay.clone();
                let factory: DistributionFactory = Box::new(move |_| installed);
                self.bus
                    .subscribe_with(
                        args.topic.as_str(),
                        IdentityKey::Relay(args.topic.clone()),
                        factory,
                    )
                    .await?;
                entry.insert(relay);
                tracing::info!("relay installed");
            }
        }
        tracing::debug!(%handle, "remote subscriber attached");
        Ok(SubReply { handle })
    }

    /// Same as [`rpc_subscribe`](Self::rpc_subscribe).
    ///
    /// The blocking behaviour of a sync subscription lives on the
    /// subscriber's side; the relay is shared either way.
    ///
    /// # Errors
    ///
    /// Same as [`rpc_subscribe`](Self::rpc_subscribe).
    pub async fn rpc_subscribe_sync(&self, args: SubArgs) -> Result<SubReply, BusError> {
        self.rpc_subscribe(args).await
    }

    /// Detach `args.handle` (every subscriber when absent) from the relay
    /// of `args.topic`, removing the relay once nobody is left.
    ///
    /// Unknown topics and handles are ignored.
    ///
    /// # Errors
    ///
    /// Returns the bus error if the relay cannot be removed.
    #[tracing::instrument(skip(self), fields(topic = %args.topic))]
    pub async fn rpc_unsubscribe(&self, args: UnsubArgs) -> Result<(), BusError> {
        let mut relays = self.relays.lock().await;
        let Some(relay) = relays.get(&args.topic) else {
            return Ok(());
        };
        match args.handle {
            Some(handle) => {
                if !relay.detach(&handle) {
                    tracing::debug!(%handle, "unknown handle, ignoring");
                }
            }
            None => relay.clear(),
        }
        if relay.is_empty() {
            relays.remove(&args.topic);
            self.bus
                .unsubscribe(
                    args.topic.as_str(),
                    &IdentityKey::Relay(args.topic.clone()),
                )
                .await?;
            tracing::info!("relay removed");
        }
        Ok(())
    }

    /// Deliver a payload relayed by a peer into the local bus.
    pub async fn rpc_publish(&self, args: PubArgs) {
        let message = match args.origin {
            Some(origin) => Message::relayed(args.payload, origin),
            None => Message::local(args.payload),
        };
        self.bus.deliver(args.topic.as_str(), message).await;
    }
}

fn describe(err: &dyn Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[async_trait]
impl RequestHandler for RpcService {
    async fn handle(&self, request: Request) -> Response {
        let result = match request {
            Request::Subscribe(args) => self.rpc_subscribe(args).await.map(Reply::Subscribed),
            Request::SubscribeSync(args) => {
                self.rpc_subscribe_sync(args).await.map(Reply::Subscribed)
            }
            Request::Unsubscribe(args) => self
                .rpc_unsubscribe(args)
                .await
                .map(|()| Reply::Unsubscribed),
            Request::Publish(args) => {
                self.rpc_publish(args).await;
                Ok(Reply::Published)
            }
        };
        match result {
            Ok(reply) => Response::Ok(reply),
            Err(err) => {
                tracing::debug!(%err, "rpc call failed");
                Response::Error(describe(&err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fissionbus_app::event_bus::InProcessEventBus;
    use fissionbus_app::handler::Callable;
    use fissionbus_app::ports::BusSubscriber;
    use fissionbus_domain::error::ValidationError;
    use fissionbus_domain::payload;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn service() -> (Arc<InProcessEventBus>, RpcService) {
        let bus = Arc::new(InProcessEventBus::new());
        let service = RpcService::new(
            bus.clone(),
            "tcp://127.0.0.1:1",
            RpcClient::new(Duration::from_millis(200)),
        );
        (bus, service)
    }

    fn sub_args(topic: &str) -> SubArgs {
        SubArgs {
            remote_url: "tcp://127.0.0.1:2".to_string(),
            topic: Topic::from(topic),
        }
    }

    #[tokio::test]
    async fn should_install_single_relay_per_topic() {
        let (bus, service) = service();

        let first = service.rpc_subscribe(sub_args("T")).await.unwrap();
        let second = service.rpc_subscribe_sync(sub_args("T")).await.unwrap();

        assert_ne!(first.handle, second.handle);
        assert_eq!(bus.subscriber_count("T"), 1);
        assert_eq!(service.remote_subscribers("T").await, 2);
    }

    #[tokio::test]
    async fn should_keep_relay_until_last_subscriber_leaves() {
        let (bus, service) = service();
        let first = service.rpc_subscribe(sub_args("T")).await.unwrap();
        let second = service.rpc_subscribe(sub_args("T")).await.unwrap();

        service
            .rpc_unsubscribe(UnsubArgs {
                topic: Topic::from("T"),
                handle: Some(first.handle),
            })
            .await
            .unwrap();
        assert_eq!(bus.subscriber_count("T"), 1);

        service
            .rpc_unsubscribe(UnsubArgs {
                topic: Topic::from("T"),
                handle: Some(second.handle),
            })
            .await
            .unwrap();
        assert_eq!(bus.subscriber_count("T"), 0);
        assert_eq!(bus.cached_distributions(), 0);
    }

    #[tokio::test]
    async fn should_remove_every_subscriber_without_handle() {
        let (bus, service) = service();
        service.rpc_subscribe(sub_args("T")).await.unwrap();
        service.rpc_subscribe(sub_args("T")).await.unwrap();

        service
            .rpc_unsubscribe(UnsubArgs {
                topic: Topic::from("T"),
                handle: None,
            })
            .await
            .unwrap();

        assert_eq!(bus.subscriber_count("T"), 0);
        assert_eq!(service.remote_subscribers("T").await, 0);
    }

    #[tokio::test]
    async fn should_ignore_unknown_topic_and_handle() {
        let (bus, service) = service();
        service.rpc_subscribe(sub_args("T")).await.unwrap();

        service
            .rpc_unsubscribe(UnsubArgs {
                topic: Topic::from("other"),
                handle: None,
            })
            .await
            .unwrap();
        service
            .rpc_unsubscribe(UnsubArgs {
                topic: Topic::from("T"),
                handle: Some(RelayHandle::new()),
            })
            .await
            .unwrap();

        assert_eq!(bus.subscriber_count("T"), 1);
    }

    #[tokio::test]
    async fn should_reject_invalid_remote_url() {
        let (bus, service) = service();

        let result = service
            .rpc_subscribe(SubArgs {
                remote_url: "nowhere".to_string(),
                topic: Topic::from("T"),
            })
            .await;

        assert!(matches!(
            result,
            Err(BusError::Validation(ValidationError::InvalidEndpoint { .. }))
        ));
        assert_eq!(bus.subscriber_count("T"), 0);
    }

    #[tokio::test]
    async fn should_deliver_relayed_publish_to_local_subscribers() {
        let (bus, service) = service();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        bus.subscribe_sync(
            "T",
            Callable::new(move |_: String| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .await
        .unwrap();

        let response = service
            .handle(Request::Publish(PubArgs {
                topic: Topic::from("T"),
                payload: payload!["jack"],
                origin: Some("tcp://127.0.0.1:2".to_string()),
            }))
            .await;

        assert_eq!(response, Response::Ok(Reply::Published));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_answer_failures_with_error_response() {
        let (_bus, service) = service();

        let response = service
            .handle(Request::Subscribe(SubArgs {
                remote_url: "ftp://x".to_string(),
                topic: Topic::from("T"),
            }))
            .await;

        assert!(matches!(response, Response::Error(msg) if msg.contains("ftp://x")));
    }
}
