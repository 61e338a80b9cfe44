//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`BusError`]
//! via `From` when crossing a port boundary.

/// Top-level error returned by bus operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The caller passed an invalid argument; nothing was registered.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A published argument list does not fit a handler's parameters.
    #[error("argument binding error")]
    Binding(#[from] BindingError),

    /// A network or transport failure reported by an adapter.
    #[error("transport error")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Invalid input rejected before any state is created.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// A named subscription key was empty.
    #[error("subscription key must not be empty")]
    EmptyKey,

    /// An endpoint URL could not be understood.
    #[error("invalid endpoint `{url}`")]
    InvalidEndpoint { url: String },
}

/// Mismatch between a published argument list and a handler signature.
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    /// The value at `position` does not decode into the declared parameter type.
    #[error("argument {position} does not match the handler parameter type")]
    Decode {
        position: usize,
        #[source]
        source: serde_json::Error,
    },

    /// More arguments were published than the handler declares.
    #[error("handler takes {expected} argument(s) but {got} were published")]
    TooManyArguments { expected: usize, got: usize },
}
