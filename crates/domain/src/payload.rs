//! Payloads and messages — what gets published and dispatched.
//!
//! A [`Payload`] is the ordered argument list of one publish. Values are
//! kept in their structural JSON form so the same payload can be handed to
//! any local handler or shipped across the network without a fixed schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[doc(hidden)]
pub use serde_json::json as __json;

/// Ordered argument list of a publish.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Vec<Value>);

impl Payload {
    /// Wrap an already-encoded argument list.
    #[must_use]
    pub fn new(args: Vec<Value>) -> Self {
        Self(args)
    }

    /// Encode a tuple of serializable arguments.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if one of the arguments cannot be
    /// represented structurally (e.g. a map with non-string keys).
    pub fn from_args(args: impl IntoPayload) -> Result<Self, serde_json::Error> {
        args.into_payload()
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload carries no argument at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Argument at `position`, if present.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&Value> {
        self.0.get(position)
    }

    /// All arguments in order.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.0
    }
}

impl From<Vec<Value>> for Payload {
    fn from(args: Vec<Value>) -> Self {
        Self(args)
    }
}

/// Conversion of a tuple of arguments into a [`Payload`].
pub trait IntoPayload {
    /// Encode every element in order.
    ///
    /// # Errors
    ///
    /// Returns the serializer error of the first element that fails.
    fn into_payload(self) -> Result<Payload, serde_json::Error>;
}

impl IntoPayload for Payload {
    fn into_payload(self) -> Result<Payload, serde_json::Error> {
        Ok(self)
    }
}

macro_rules! impl_into_payload {
    ($($ty:ident),*) => {
        impl<$($ty: Serialize),*> IntoPayload for ($($ty,)*) {
            #[allow(non_snake_case)]
            fn into_payload(self) -> Result<Payload, serde_json::Error> {
                let ($($ty,)*) = self;
                Ok(Payload::new(vec![$(serde_json::to_value($ty)?),*]))
            }
        }
    };
}

impl_into_payload!();
impl_into_payload!(A1);
impl_into_payload!(A1, A2);
impl_into_payload!(A1, A2, A3);
impl_into_payload!(A1, A2, A3, A4);
impl_into_payload!(A1, A2, A3, A4, A5);
impl_into_payload!(A1, A2, A3, A4, A5, A6);
impl_into_payload!(A1, A2, A3, A4, A5, A6, A7);
impl_into_payload!(A1, A2, A3, A4, A5, A6, A7, A8);

/// Build a [`Payload`] from JSON-like literals.
///
/// Each argument follows `serde_json::json!` syntax for a single token
/// tree, so `null`, literals, `[..]`, `{..}` and parenthesised
/// expressions are accepted:
///
/// ```
/// use fissionbus_domain::payload;
///
/// let name = "jack";
/// let p = payload!["hello", null, (name), { "age": 3 }];
/// assert_eq!(p.len(), 4);
/// ```
#[macro_export]
macro_rules! payload {
    () => {
        $crate::payload::Payload::default()
    };
    ($($arg:tt),+ $(,)?) => {
        $crate::payload::Payload::new(::std::vec![$($crate::payload::__json!($arg)),+])
    };
}

/// A payload on its way to the distributions of one topic.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    payload: Payload,
    origin: Option<String>,
}

impl Message {
    /// A message published by code running in this process.
    #[must_use]
    pub fn local(payload: Payload) -> Self {
        Self {
            payload,
            origin: None,
        }
    }

    /// A message that arrived from the peer listening on `origin`.
    #[must_use]
    pub fn relayed(payload: Payload, origin: impl Into<String>) -> Self {
        Self {
            payload,
            origin: Some(origin.into()),
        }
    }

    /// The published arguments.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// URL of the peer this message was relayed from, if any.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }
}

impl From<Payload> for Message {
    fn from(payload: Payload) -> Self {
        Self::local(payload)
    }
}
