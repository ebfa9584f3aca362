//! # Courier Core
//!
//! Core traits and types for Courier, an in-process CQRS dispatch layer.
//!
//! This crate defines the vocabulary shared by every Courier component:
//! requests and their metadata, the handler registries that map request types
//! to callables, and the dispatch contracts implemented by `courier-runtime`.
//!
//! ## Core Concepts
//!
//! - **Request**: A message with a [`metadata::Metadata`] bag. Requests come in
//!   four kinds: [`command::Command`], [`domain::DomainEvent`],
//!   [`integration::IntegrationEvent`] and [`query::Query`]
//! - **Handler service**: An object (e.g. a [`command::CommandHandler`]) that
//!   exposes a registry of per-type callables through `delegates()`
//! - **Activator**: The read side of a registry; it finds the callable for the
//!   exact runtime type of a request and invokes it
//! - **Service locator**: Resolves every registered instance of a handler
//!   service, see [`locator::ServiceLocator`]
//! - **Dispatcher**: Routes a request to the first handler service instance
//!   that accepts it
//!
//! ## Dispatch Semantics
//!
//! Fire-and-forget requests (commands, domain events, integration events) are
//! delivered to the first handler instance whose registry holds a callable for
//! the request's exact type. Queries are answered by the first instance
//! holding a callable for the exact `(query type, output type)` pair. When no
//! instance accepts a request, dispatch fails with
//! [`error::DispatchError::OrphanedHandler`].
//!
//! ## Example
//!
//! ```
//! use courier_core::command::{Command, CommandHandler};
//! use courier_core::handler::{FireForgetActivator, FireForgetManager, FireForgetRegistry, HandlerFactory};
//! use courier_core::metadata::Metadata;
//! use courier_core::request::Request;
//!
//! #[derive(Clone, Debug)]
//! struct RenameAccount {
//!     name: String,
//!     metadata: Metadata,
//! }
//!
//! impl Request for RenameAccount {
//!     fn metadata(&self) -> &Metadata {
//!         &self.metadata
//!     }
//!
//!     fn metadata_mut(&mut self) -> &mut Metadata {
//!         &mut self.metadata
//!     }
//! }
//!
//! impl Command for RenameAccount {}
//!
//! struct AccountHandler {
//!     delegates: FireForgetManager<dyn Command>,
//! }
//!
//! impl AccountHandler {
//!     fn new() -> Self {
//!         let delegates = HandlerFactory::fire_forget::<dyn Command>(|registry| {
//!             registry.register(|command: &RenameAccount| {
//!                 assert!(!command.name.is_empty());
//!                 Ok(())
//!             });
//!         });
//!         Self { delegates }
//!     }
//! }
//!
//! impl CommandHandler for AccountHandler {
//!     fn delegates(&self) -> &dyn FireForgetActivator<dyn Command> {
//!         &self.delegates
//!     }
//! }
//!
//! let handler = AccountHandler::new();
//! let command = RenameAccount { name: "savings".into(), metadata: Metadata::new() };
//! assert!(handler.delegates().try_invoke(&command).unwrap());
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use tokio_util::sync::CancellationToken;

pub mod command;
pub mod domain;
pub mod error;
pub mod handler;
pub mod integration;
pub mod locator;
pub mod marshaller;
pub mod mediator;
pub mod metadata;
pub mod options;
pub mod query;
pub mod request;

/// Environment module - injected dependencies
///
/// Requests stamp timestamps through a [`Clock`](environment::Clock) so that
/// tests can pin time with a fixed implementation.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use courier_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = chrono::Utc::now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

/// Commonly used items, for glob import.
///
/// # Examples
///
/// ```
/// use courier_core::prelude::*;
///
/// #[derive(Debug)]
/// struct Ping {
///     metadata: Metadata,
/// }
///
/// impl Request for Ping {
///     fn metadata(&self) -> &Metadata {
///         &self.metadata
///     }
///
///     fn metadata_mut(&mut self) -> &mut Metadata {
///         &mut self.metadata
///     }
/// }
///
/// let ping = Ping { metadata: Metadata::new() };
/// assert!(ping.request_type_name().ends_with("Ping"));
/// assert!(ping.as_any().downcast_ref::<Ping>().is_some());
/// ```
pub mod prelude {
    pub use crate::command::{Command, CommandDispatcher, CommandHandler};
    pub use crate::domain::{
        AggregateRoot, DomainEvent, DomainEventDispatcher, DomainEventDispatcherExt,
        DomainEventHandler, DomainEvents,
    };
    pub use crate::environment::{Clock, SystemClock};
    pub use crate::error::{DispatchError, HandlerResult};
    pub use crate::handler::{
        FireForgetActivator, FireForgetManager, FireForgetRegistry, HandlerFactory, Outcome,
        RequestReplyActivator, RequestReplyActivatorExt, RequestReplyManager,
        RequestReplyRegistry,
    };
    pub use crate::integration::{
        IntegrationEvent, IntegrationEventDispatcher, IntegrationEventHandler,
    };
    pub use crate::locator::{ServiceLocator, ServiceLocatorExt, ServiceRegistry};
    pub use crate::mediator::Mediator;
    pub use crate::metadata::Metadata;
    pub use crate::options::AsyncOptions;
    pub use crate::query::{
        AnyQuery, Query, QueryDispatcher, QueryDispatcherExt, QueryHandler, QueryRegistryExt,
    };
    pub use crate::request::{Reflect, Request, RequestExt};
}
