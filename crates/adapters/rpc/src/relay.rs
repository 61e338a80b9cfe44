//! The distribution that forwards a topic's publishes to remote peers.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use fissionbus_app::ports::Distribution;
use fissionbus_domain::error::BusError;
use fissionbus_domain::id::RelayHandle;
use fissionbus_domain::key::IdentityKey;
use fissionbus_domain::payload::Message;
use fissionbus_domain::topic::Topic;

use crate::endpoint::Endpoint;
use crate::error::BridgeError;
use crate::protocol::{PubArgs, Reply, Request};
use crate::transport::RpcClient;

/// Relays one topic to every peer subscribed to it through this bridge.
///
/// A peer may hold several handles on the same topic (one per local
/// subscriber) but receives a single `RPCPublish` per message. The peer a
/// message was relayed from is skipped, so two bridges subscribed to each
/// other do not bounce a payload back and forth.
pub struct RelayDistribution {
    key: IdentityKey,
    topic: Topic,
    local_url: String,
    client: RpcClient,
    subscribers: RwLock<HashMap<RelayHandle, Endpoint>>,
}

impl RelayDistribution {
    /// Create a relay for `topic`, announcing itself to peers as `local_url`.
    #[must_use]
    pub fn new(topic: Topic, local_url: impl Into<String>, client: RpcClient) -> Self {
        Self {
            key: IdentityKey::Relay(topic.clone()),
            topic,
            local_url: local_url.into(),
            client,
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Forward publishes to `endpoint` until `handle` is detached.
    pub fn attach(&self, handle: RelayHandle, endpoint: Endpoint) {
        self.subscribers.write().insert(handle, endpoint);
    }

    /// Stop forwarding on behalf of `handle`. Returns whether it was attached.
    pub fn detach(&self, handle: &RelayHandle) -> bool {
        self.subscribers.write().remove(handle).is_some()
    }

    /// Detach every subscriber.
    pub fn clear(&self) {
        self.subscribers.write().clear();
    }

    /// Number of attached handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// Distinct peers currently receiving this topic.
    #[must_use]
    pub fn peers(&self) -> BTreeSet<Endpoint> {
        self.subscribers.read().values().cloned().collect()
    }
}

#[async_trait]
impl Distribution for RelayDistribution {
    fn key(&self) -> &IdentityKey {
        &self.key
    }

    async fn dispatch(&self, message: &Message) -> Result<(), BusError> {
        let origin = message
            .origin()
            .and_then(|url| url.parse::<Endpoint>().ok());
        let request = Request::Publish(PubArgs {
            topic: self.topic.clone(),
            payload: message.payload().clone(),
            origin: Some(self.local_url.clone()),
        });

        let mut first_error = None;
        for peer in self.peers() {
            if origin.as_ref() == Some(&peer) {
                continue;
            }
            let result = match self.client.call(&peer, &request).await {
                Ok(Reply::Published) => Ok(()),
                Ok(_) => Err(BridgeError::UnexpectedReply {
                    method: request.method(),
                }),
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                tracing::warn!(%err, %peer, topic = %self.topic, "failed to relay publish");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    fn close(&self) -> Result<(), BusError> {
        self.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Response;
    use crate::transport::{Listener, RequestHandler, RpcServer};
    use fissionbus_domain::payload;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Sink {
        seen: mpsc::UnboundedSender<PubArgs>,
    }

    #[async_trait]
    impl RequestHandler for Sink {
        async fn handle(&self, request: Request) -> Response {
            match request {
                Request::Publish(args) => {
                    let _ = self.seen.send(args);
                    Response::Ok(Reply::Published)
                }
                other => Response::Error(format!("{} not supported", other.method())),
            }
        }
    }

    async fn peer() -> (RpcServer, mpsc::UnboundedReceiver<PubArgs>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = Listener::bind(&"tcp://127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let server = RpcServer::spawn(listener, Arc::new(Sink { seen: tx })).unwrap();
        (server, rx)
    }

    fn relay() -> RelayDistribution {
        RelayDistribution::new(
            Topic::from("T"),
            "tcp://127.0.0.1:1",
            RpcClient::new(Duration::from_secs(2)),
        )
    }

    #[tokio::test]
    async fn should_publish_once_per_peer() {
        let (server, mut rx) = peer().await;
        let relay = relay();
        relay.attach(RelayHandle::new(), server.endpoint().clone());
        relay.attach(RelayHandle::new(), server.endpoint().clone());

        relay
            .dispatch(&Message::local(payload!["jack"]))
            .await
            .unwrap();

        let args = rx.recv().await.unwrap();
        assert_eq!(args.topic, Topic::from("T"));
        assert_eq!(args.payload, payload!["jack"]);
        assert_eq!(args.origin.as_deref(), Some("tcp://127.0.0.1:1"));
        assert!(rx.try_recv().is_err());
        assert_eq!(relay.len(), 2);
        assert_eq!(relay.peers().len(), 1);
    }

    #[tokio::test]
    async fn should_skip_peer_the_message_came_from() {
        let (server, mut rx) = peer().await;
        let relay = relay();
        relay.attach(RelayHandle::new(), server.endpoint().clone());

        let message = Message::relayed(payload!["jack"], server.endpoint().to_string());
        relay.dispatch(&message).await.unwrap();

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_report_unreachable_peer() {
        let relay = relay();
        let (server, _rx) = peer().await;
        let gone = server.endpoint().clone();
        drop(server);
        tokio::task::yield_now().await;
        relay.attach(RelayHandle::new(), gone);

        let result = relay.dispatch(&Message::local(payload![])).await;

        assert!(matches!(result, Err(BusError::Transport(_))));
    }

    #[test]
    fn should_detach_handles_individually() {
        let relay = relay();
        let first = RelayHandle::new();
        let second = RelayHandle::new();
        relay.attach(first, "tcp://127.0.0.1:2".parse().unwrap());
        relay.attach(second, "tcp://127.0.0.1:2".parse().unwrap());

        assert!(relay.detach(&first));
        assert!(!relay.detach(&first));
        assert_eq!(relay.len(), 1);

        relay.close().unwrap();
        assert!(relay.is_empty());
    }

    #[test]
    fn should_use_relay_key_for_topic() {
        assert_eq!(relay().key(), &IdentityKey::Relay(Topic::from("T")));
    }
}
