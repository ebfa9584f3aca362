//! Handler registries and activators.
//!
//! A handler service owns a registry that maps concrete request types to
//! callables. Two registry shapes exist:
//!
//! - [`FireForgetManager`] for commands and events: callables return nothing
//!   but success or failure.
//! - [`RequestReplyManager`] for queries: callables produce a value, and the
//!   registry is keyed by the pair of request type and output type.
//!
//! Each manager has a write side ([`FireForgetRegistry`],
//! [`RequestReplyRegistry`]) used once while the handler is built, and a read
//! side ([`FireForgetActivator`], [`RequestReplyActivator`]) used by
//! dispatchers. Synchronous and asynchronous callables live in separate
//! tables: a synchronous dispatch never runs an asynchronous callable and
//! the reverse also holds.
//!
//! Build managers with [`HandlerFactory`]:
//!
//! ```
//! use courier_core::handler::{HandlerFactory, Outcome, RequestReplyActivatorExt, RequestReplyRegistry};
//! use courier_core::metadata::Metadata;
//! use courier_core::query::{AnyQuery, Query};
//! use courier_core::request::Request;
//!
//! #[derive(Clone, Debug)]
//! struct Balance {
//!     account: u64,
//!     metadata: Metadata,
//! }
//!
//! impl Request for Balance {
//!     fn metadata(&self) -> &Metadata {
//!         &self.metadata
//!     }
//!
//!     fn metadata_mut(&mut self) -> &mut Metadata {
//!         &mut self.metadata
//!     }
//! }
//!
//! impl Query for Balance {
//!     type Output = i64;
//! }
//!
//! let delegates = HandlerFactory::request_reply::<dyn AnyQuery>(|registry| {
//!     registry.register(|query: &Balance| Ok(query.account as i64 * 10));
//! });
//!
//! let query = Balance { account: 4, metadata: Metadata::new() };
//! assert_eq!(delegates.try_invoke::<i64>(&query).unwrap(), Outcome::Succeeded(40));
//! assert_eq!(delegates.try_invoke::<String>(&query).unwrap(), Outcome::Declined);
//! ```

mod fire_forget;
mod request_reply;

pub use fire_forget::{FireForgetActivator, FireForgetManager, FireForgetRegistry};
pub use request_reply::{
    ErasedResult, RequestReplyActivator, RequestReplyActivatorExt, RequestReplyManager,
    RequestReplyRegistry, downcast_result,
};

use crate::request::RequestKind;
use std::fmt;

/// A handler service contract, implemented for its trait object type.
///
/// `dyn CommandHandler` is the handler service for `dyn Command`, and so on.
/// The runtime resolves instances of a handler service from the
/// [`ServiceLocator`](crate::locator::ServiceLocator) by its `TypeId`.
pub trait HandlerService: Send + Sync + 'static {
    /// Service name used in errors and logs, e.g. `"CommandHandler"`.
    const NAME: &'static str;

    /// The request kind served by this handler service.
    type Kind: ?Sized + RequestKind;

    /// Registrations of this instance, for diagnostics.
    fn registrations(&self) -> Vec<Registration>;

    /// Type name of the concrete handler behind the service.
    fn handler_name(&self) -> &'static str;
}

/// Result of a request-reply invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T> {
    /// A callable handled the request and produced a value.
    Succeeded(T),
    /// No callable is registered for the request and output type.
    Declined,
}

impl<T> Outcome<T> {
    /// Whether a callable produced a value.
    #[must_use]
    pub const fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Whether no callable was registered.
    #[must_use]
    pub const fn is_declined(&self) -> bool {
        matches!(self, Self::Declined)
    }

    /// Converts into an `Option`, mapping `Declined` to `None`.
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Succeeded(value) => Some(value),
            Self::Declined => None,
        }
    }

    /// Maps the produced value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Succeeded(value) => Outcome::Succeeded(f(value)),
            Self::Declined => Outcome::Declined,
        }
    }
}

/// Whether a callable runs synchronously or returns a future.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Delivery {
    /// Synchronous callable.
    Sync,
    /// Asynchronous callable.
    Async,
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => f.write_str("sync"),
            Self::Async => f.write_str("async"),
        }
    }
}

/// One callable registered in a manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    /// Fully qualified name of the request type.
    pub request_type: &'static str,
    /// Fully qualified name of the output type, for request-reply callables.
    pub output_type: Option<&'static str>,
    /// Sync or async.
    pub delivery: Delivery,
}

/// Builds handler managers from a registration closure.
///
/// The closure runs once, against an empty manager, and the populated
/// manager is returned.
#[derive(Clone, Copy, Debug)]
pub struct HandlerFactory;

impl HandlerFactory {
    /// Builds a fire-and-forget manager for request kind `K`.
    pub fn fire_forget<K>(registrar: impl FnOnce(&mut FireForgetManager<K>)) -> FireForgetManager<K>
    where
        K: ?Sized + RequestKind,
    {
        let mut manager = FireForgetManager::new();
        registrar(&mut manager);
        manager
    }

    /// Builds a request-reply manager for request kind `K`.
    pub fn request_reply<K>(
        registrar: impl FnOnce(&mut RequestReplyManager<K>),
    ) -> RequestReplyManager<K>
    where
        K: ?Sized + RequestKind,
    {
        let mut manager = RequestReplyManager::new();
        registrar(&mut manager);
        manager
    }
}
