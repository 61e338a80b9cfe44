//! Wire protocol between two bridges.
//!
//! Every frame on the connection carries one JSON document. A client sends
//! a [`Request`] and reads back exactly one [`Response`]; a connection may
//! carry any number of such exchanges in sequence.
//!
//! ```json
//! {"method": "RPCSubscribe", "params": {"remote_url": "tcp://127.0.0.1:7634", "topic": "main:calculator"}}
//! {"status": "ok", "body": {"reply": "subscribed", "handle": "6a0b…"}}
//! ```

use serde::{Deserialize, Serialize};

use fissionbus_domain::id::RelayHandle;
use fissionbus_domain::payload::Payload;
use fissionbus_domain::topic::Topic;

use crate::error::BridgeError;

/// Arguments of `RPCSubscribe` / `RPCSubscribeSync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubArgs {
    /// URL the subscribing bridge listens on; publishes are relayed there.
    pub remote_url: String,
    pub topic: Topic,
}

/// Reply to a subscribe: the handle to quote when unsubscribing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubReply {
    pub handle: RelayHandle,
}

/// Arguments of `RPCUnsubscribe`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsubArgs {
    pub topic: Topic,
    /// Subscriber to detach; every subscriber of the topic when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<RelayHandle>,
}

/// Arguments of `RPCPublish`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PubArgs {
    pub topic: Topic,
    pub payload: Payload,
    /// URL of the bridge that relayed the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

/// A call from one bridge to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum Request {
    #[serde(rename = "RPCSubscribe")]
    Subscribe(SubArgs),
    #[serde(rename = "RPCSubscribeSync")]
    SubscribeSync(SubArgs),
    #[serde(rename = "RPCUnsubscribe")]
    Unsubscribe(UnsubArgs),
    #[serde(rename = "RPCPublish")]
    Publish(PubArgs),
}

impl Request {
    /// Method name as it appears on the wire.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Subscribe(_) => "RPCSubscribe",
            Self::SubscribeSync(_) => "RPCSubscribeSync",
            Self::Unsubscribe(_) => "RPCUnsubscribe",
            Self::Publish(_) => "RPCPublish",
        }
    }
}

/// Successful result of a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum Reply {
    Subscribed(SubReply),
    Unsubscribed,
    Published,
}

/// What a server writes back for each request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "body", rename_all = "snake_case")]
pub enum Response {
    Ok(Reply),
    Error(String),
}

impl Response {
    /// Turn an error response into a [`BridgeError::Remote`].
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Remote`] carrying the peer's message.
    pub fn into_result(self) -> Result<Reply, BridgeError> {
        match self {
            Self::Ok(reply) => Ok(reply),
            Self::Error(message) => Err(BridgeError::Remote(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fissionbus_domain::payload;
    use serde_json::json;

    #[test]
    fn should_encode_subscribe_with_method_and_params() {
        let request = Request::Subscribe(SubArgs {
            remote_url: "tcp://127.0.0.1:7634".to_string(),
            topic: Topic::from("main:calculator"),
        });

        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "method": "RPCSubscribe",
                "params": {
                    "remote_url": "tcp://127.0.0.1:7634",
                    "topic": "main:calculator"
                }
            })
        );
        assert_eq!(request.method(), "RPCSubscribe");
    }

    #[test]
    fn should_encode_publish_payload_as_plain_array() {
        let request = Request::Publish(PubArgs {
            topic: Topic::from("T"),
            payload: payload!["jack", 42],
            origin: None,
        });

        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({"method": "RPCPublish", "params": {"topic": "T", "payload": ["jack", 42]}})
        );
    }

    #[test]
    fn should_decode_unsubscribe_without_handle() {
        let request: Request =
            serde_json::from_value(json!({"method": "RPCUnsubscribe", "params": {"topic": "T"}}))
                .unwrap();

        assert_eq!(
            request,
            Request::Unsubscribe(UnsubArgs {
                topic: Topic::from("T"),
                handle: None
            })
        );
    }

    #[test]
    fn should_reject_unknown_method() {
        let result = serde_json::from_value::<Request>(json!({"method": "RPCNope", "params": {}}));
        assert!(result.is_err());
    }

    #[test]
    fn should_encode_responses_with_status_and_body() {
        let handle = RelayHandle::new();
        let ok = Response::Ok(Reply::Subscribed(SubReply { handle }));
        let err = Response::Error("boom".to_string());

        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"status": "ok", "body": {"reply": "subscribed", "handle": handle}})
        );
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"status": "error", "body": "boom"})
        );
    }

    #[test]
    fn should_turn_error_response_into_remote_error() {
        let result = Response::Error("boom".to_string()).into_result();
        assert!(matches!(result, Err(BridgeError::Remote(msg)) if msg == "boom"));

        let reply = Response::Ok(Reply::Published).into_result().unwrap();
        assert_eq!(reply, Reply::Published);
    }
}
