// src/error.rs
//! Error handling for the whole crate.
//!
//! Only recoverable failures live here: bad arguments, bad configuration, failed
//! actor casts and calls made before the world is set up. Programmer errors such
//! as touching a disposed handle are not errors, they panic.

use std::fmt;
use thiserror::Error;

use crate::actor::ActorKind;

/// Main error type. `Send + Sync + 'static`, cheap to match on.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// An argument was outside its valid domain (e.g. a non-positive world scale).
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// An actor was wrapped as the wrong kind of handle.
    #[error("invalid cast: expected a {expected} actor, found a {found} actor")]
    ActorCast { expected: ActorKind, found: ActorKind },

    /// The handle does not name an actor registered with the world.
    #[error("unknown actor")]
    UnknownActor,

    /// The world was used before `setup` succeeded.
    #[error("world is not set up, call setup first")]
    NotSetUp,

    /// Configuration could not be parsed or failed validation.
    #[error("config error: {0}")]
    Config(String),

    /// Simple custom message.
    #[error("{0}")]
    Custom(String),

    /// Context chaining, like `.context()` in anyhow.
    #[error("{message}: {source}")]
    WithContext {
        message: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    #[inline]
    pub fn custom<S: Into<String>>(msg: S) -> Self {
        Self::Custom(msg.into())
    }

    /// Create a formatted custom error.
    #[inline]
    pub fn format(args: fmt::Arguments) -> Self {
        Self::Custom(fmt::format(args))
    }

    #[inline]
    pub fn invalid_argument<S: Into<String>>(name: &'static str, reason: S) -> Self {
        Self::InvalidArgument { name, reason: reason.into() }
    }

    /// Add context to any error.
    #[inline]
    pub fn context<C: Into<String>>(self, context: C) -> Self {
        Self::WithContext {
            message: context.into(),
            source: Box::new(self),
        }
    }

    #[inline]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self.root(), Error::InvalidArgument { .. })
    }

    #[inline]
    pub fn is_actor_cast(&self) -> bool {
        matches!(self.root(), Error::ActorCast { .. })
    }

    #[inline]
    pub fn is_not_set_up(&self) -> bool {
        matches!(self.root(), Error::NotSetUp)
    }

    /// The innermost error, skipping any context wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Convenient `Result` alias, use `crate::Result<T>` everywhere.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_root_kind() {
        let err = Error::invalid_argument("scale", "must be > 0").context("setting up world");
        assert!(err.is_invalid_argument());
        assert!(!err.is_actor_cast());
        assert_eq!(
            err.to_string(),
            "setting up world: invalid argument `scale`: must be > 0"
        );
    }

    #[test]
    fn cast_error_names_both_kinds() {
        let err = Error::ActorCast { expected: ActorKind::Static, found: ActorKind::Dynamic };
        assert_eq!(
            err.to_string(),
            "invalid cast: expected a static actor, found a dynamic actor"
        );
    }

    #[test]
    fn json_errors_become_config_errors() {
        let err: Error = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, Error::Config(_)));
    }
}
