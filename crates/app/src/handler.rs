//! Callable adapter. Binds a published argument list to a typed handler.
//!
//! Any `Fn(A1, .., An)` with up to eight parameters can be subscribed as
//! long as every parameter type is `DeserializeOwned + Default`. The
//! decoding step for each position is fixed when the handler is wrapped in
//! a [`Callable`]; at dispatch time the payload is bound position by
//! position:
//!
//! - a missing or `null` argument becomes the parameter's `Default` value;
//! - any other value is decoded into the parameter type;
//! - a value that does not decode, or a payload longer than the parameter
//!   list, fails with a [`BindingError`] and the handler is not called.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use fissionbus_domain::error::BindingError;
use fissionbus_domain::id::HandlerId;
use fissionbus_domain::key::IdentityKey;
use fissionbus_domain::payload::Payload;

/// A function that can be invoked with a bound [`Payload`].
///
/// Implemented for closures and functions of up to eight parameters; the
/// `Args` tuple only exists to tell the implementations apart.
pub trait Handler<Args>: Send + Sync + 'static {
    /// Bind `payload` to the parameters and run the handler.
    ///
    /// # Errors
    ///
    /// Returns a [`BindingError`] if `payload` does not fit the parameters;
    /// the handler is not run in that case.
    fn invoke(&self, payload: &Payload) -> Result<(), BindingError>;
}

/// Walks a payload position by position.
struct ArgBinder<'a> {
    args: &'a [Value],
    position: usize,
}

impl<'a> ArgBinder<'a> {
    fn new(payload: &'a Payload, arity: usize) -> Result<Self, BindingError> {
        if payload.len() > arity {
            return Err(BindingError::TooManyArguments {
                expected: arity,
                got: payload.len(),
            });
        }
        Ok(Self {
            args: payload.args(),
            position: 0,
        })
    }

    fn next<T: DeserializeOwned + Default>(&mut self) -> Result<T, BindingError> {
        let position = self.position;
        self.position += 1;
        match self.args.get(position) {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => <T as Deserialize>::deserialize(value)
                .map_err(|source| BindingError::Decode { position, source }),
        }
    }
}

macro_rules! impl_handler {
    ($arity:literal; $($ty:ident),*) => {
        impl<F, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) + Send + Sync + 'static,
            $($ty: DeserializeOwned + Default,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn invoke(&self, payload: &Payload) -> Result<(), BindingError> {
                let mut binder = ArgBinder::new(payload, $arity)?;
                $(let $ty = binder.next::<$ty>()?;)*
                self($($ty),*);
                Ok(())
            }
        }
    };
}

impl_handler!(0;);
impl_handler!(1; A1);
impl_handler!(2; A1, A2);
impl_handler!(3; A1, A2, A3);
impl_handler!(4; A1, A2, A3, A4);
impl_handler!(5; A1, A2, A3, A4, A5);
impl_handler!(6; A1, A2, A3, A4, A5, A6);
impl_handler!(7; A1, A2, A3, A4, A5, A6, A7);
impl_handler!(8; A1, A2, A3, A4, A5, A6, A7, A8);

type Invoke = dyn Fn(&Payload) -> Result<(), BindingError> + Send + Sync;

/// A type-erased handler with a stable identity.
///
/// Cloning a `Callable` keeps its [`HandlerId`], so every clone names the
/// same registration on the bus.
#[derive(Clone)]
pub struct Callable {
    id: HandlerId,
    invoke: Arc<Invoke>,
}

impl Callable {
    /// Wrap `handler`, giving it a fresh identity.
    pub fn new<H, Args>(handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        Self {
            id: HandlerId::new(),
            invoke: Arc::new(move |payload: &Payload| handler.invoke(payload)),
        }
    }

    /// Identity shared by all clones of this callable.
    #[must_use]
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Key the callable is registered under.
    #[must_use]
    pub fn key(&self) -> IdentityKey {
        IdentityKey::Handler(self.id)
    }

    /// Bind `payload` and run the handler on the current thread.
    ///
    /// # Errors
    ///
    /// Returns a [`BindingError`] if `payload` does not fit the handler.
    pub fn invoke(&self, payload: &Payload) -> Result<(), BindingError> {
        (self.invoke)(payload)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable").field("id", &self.id).finish_non_exhaustive()
    }
}

impl From<&Callable> for IdentityKey {
    fn from(callable: &Callable) -> Self {
        callable.key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fissionbus_domain::payload;
    use std::sync::Mutex;

    #[derive(Debug, Default, Clone, PartialEq, serde::Deserialize)]
    struct Greeting {
        name: String,
        times: u32,
    }

    type Seen<T> = Arc<Mutex<Vec<T>>>;

    fn recorder<T>() -> (Seen<T>, Seen<T>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (Arc::clone(&seen), seen)
    }

    #[test]
    fn should_invoke_handler_with_decoded_arguments() {
        let (seen, sink) = recorder();
        let callable = Callable::new(move |name: String, age: u32| {
            sink.lock().unwrap().push((name, age));
        });

        callable.invoke(&payload!["jack", 42]).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![("jack".to_string(), 42)]);
    }

    #[test]
    fn should_substitute_default_for_null_struct_argument() {
        let (seen, sink) = recorder();
        let callable = Callable::new(move |greeting: Greeting| {
            sink.lock().unwrap().push(greeting);
        });

        callable.invoke(&payload![null]).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![Greeting::default()]);
    }

    #[test]
    fn should_substitute_default_for_missing_trailing_argument() {
        let (seen, sink) = recorder();
        let callable = Callable::new(move |name: String, greeting: Greeting| {
            sink.lock().unwrap().push((name, greeting));
        });

        callable.invoke(&payload!["jack"]).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("jack".to_string(), Greeting::default())]
        );
    }

    #[test]
    fn should_decode_struct_argument() {
        let (seen, sink) = recorder();
        let callable = Callable::new(move |greeting: Greeting| {
            sink.lock().unwrap().push(greeting);
        });

        callable
            .invoke(&payload![{ "name": "jack", "times": 2 }])
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Greeting {
                name: "jack".to_string(),
                times: 2
            }]
        );
    }

    #[test]
    fn should_reject_argument_of_wrong_type_without_calling_handler() {
        let (seen, sink) = recorder::<u32>();
        let callable = Callable::new(move |n: u32| sink.lock().unwrap().push(n));

        let result = callable.invoke(&payload!["not a number"]);

        assert!(matches!(
            result,
            Err(BindingError::Decode { position: 0, .. })
        ));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn should_reject_more_arguments_than_parameters() {
        let callable = Callable::new(|_name: String| {});

        let result = callable.invoke(&payload!["a", "b"]);

        assert!(matches!(
            result,
            Err(BindingError::TooManyArguments {
                expected: 1,
                got: 2
            })
        ));
    }

    #[test]
    fn should_invoke_zero_argument_handler() {
        let (seen, sink) = recorder();
        let callable = Callable::new(move || sink.lock().unwrap().push(()));

        callable.invoke(&payload![]).unwrap();

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn should_share_identity_between_clones() {
        let callable = Callable::new(|_: String| {});
        let clone = callable.clone();
        assert_eq!(callable.key(), clone.key());
        assert_eq!(IdentityKey::from(&clone), IdentityKey::Handler(callable.id()));
    }

    #[test]
    fn should_give_distinct_identity_to_separately_wrapped_handlers() {
        let a = Callable::new(|_: String| {});
        let b = Callable::new(|_: String| {});
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn should_hand_each_invocation_its_own_copy() {
        let (seen, sink) = recorder();
        let callable = Callable::new(move |mut greeting: Greeting| {
            greeting.name.push_str("-changed");
            sink.lock().unwrap().push(greeting.name);
        });
        let payload = payload![{ "name": "jack", "times": 1 }];

        callable.invoke(&payload).unwrap();
        callable.invoke(&payload).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["jack-changed".to_string(), "jack-changed".to_string()]
        );
    }
}
