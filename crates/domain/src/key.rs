//! Identity keys: how registrations are deduplicated and addressed.

use std::fmt;

use crate::id::HandlerId;
use crate::topic::Topic;

/// Uniquely names a registration within a topic and within the
/// distributor cache of a bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    /// A callable, identified by the id it was given when wrapped.
    Handler(HandlerId),
    /// An application-supplied key.
    Named(String),
    /// The per-topic relay installed by a network bridge.
    Relay(Topic),
}

impl IdentityKey {
    /// Build an application key.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl From<HandlerId> for IdentityKey {
    fn from(id: HandlerId) -> Self {
        Self::Handler(id)
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(id) => write!(f, "handler:{id}"),
            Self::Named(name) => write!(f, "named:{name}"),
            Self::Relay(topic) => write!(f, "relay:{topic}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_treat_same_handler_id_as_same_key() {
        let id = HandlerId::new();
        assert_eq!(IdentityKey::from(id), IdentityKey::Handler(id));
    }

    #[test]
    fn should_distinguish_named_key_from_relay_key_with_same_text() {
        let named = IdentityKey::named("greet");
        let relay = IdentityKey::Relay(Topic::from("greet"));
        assert_ne!(named, relay);
    }

    #[test]
    fn should_display_variant_prefix() {
        assert_eq!(IdentityKey::named("k1").to_string(), "named:k1");
        assert_eq!(
            IdentityKey::Relay(Topic::from("greet")).to_string(),
            "relay:greet"
        );
    }
}
