//! Dispatchers backed by a [`ServiceLocator`].
//!
//! Each dispatcher holds a shared locator and nothing else, so it is cheap
//! to clone and safe to share across tasks.

use crate::dispatch;
use courier_core::command::{Command, CommandDispatcher, CommandHandler};
use courier_core::domain::{DomainEvent, DomainEventDispatcher, DomainEventHandler};
use courier_core::error::DispatchError;
use courier_core::handler::ErasedResult;
use courier_core::integration::{
    IntegrationEvent, IntegrationEventDispatcher, IntegrationEventHandler,
};
use courier_core::locator::ServiceLocator;
use courier_core::mediator::DispatchFuture;
use courier_core::options::AsyncOptions;
use courier_core::query::{AnyQuery, QueryDispatcher, QueryHandler};
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Commits commands to the [`CommandHandler`]s of a locator.
#[derive(Clone)]
pub struct LocatorCommandDispatcher {
    locator: Arc<dyn ServiceLocator>,
}

impl LocatorCommandDispatcher {
    /// Creates a dispatcher resolving handlers from `locator`.
    #[must_use]
    pub fn new(locator: Arc<dyn ServiceLocator>) -> Self {
        Self { locator }
    }
}

impl CommandDispatcher for LocatorCommandDispatcher {
    fn commit(&self, command: &dyn Command) -> Result<(), DispatchError> {
        dispatch::fire_and_forget::<dyn CommandHandler, _>(
            self.locator.as_ref(),
            command,
            |handler| handler.delegates(),
        )
    }

    fn commit_async<'a>(
        &'a self,
        command: &'a dyn Command,
        options: AsyncOptions,
    ) -> DispatchFuture<'a, ()> {
        dispatch::fire_and_forget_async::<dyn CommandHandler, _>(
            self.locator.as_ref(),
            command,
            |handler| handler.delegates(),
            options,
        )
    }
}

/// Raises domain events to the [`DomainEventHandler`]s of a locator.
#[derive(Clone)]
pub struct LocatorDomainEventDispatcher {
    locator: Arc<dyn ServiceLocator>,
}

impl LocatorDomainEventDispatcher {
    /// Creates a dispatcher resolving handlers from `locator`.
    #[must_use]
    pub fn new(locator: Arc<dyn ServiceLocator>) -> Self {
        Self { locator }
    }
}

impl DomainEventDispatcher for LocatorDomainEventDispatcher {
    fn raise(&self, event: &dyn DomainEvent) -> Result<(), DispatchError> {
        dispatch::fire_and_forget::<dyn DomainEventHandler, _>(
            self.locator.as_ref(),
            event,
            |handler| handler.delegates(),
        )
    }

    fn raise_async<'a>(
        &'a self,
        event: &'a dyn DomainEvent,
        options: AsyncOptions,
    ) -> DispatchFuture<'a, ()> {
        dispatch::fire_and_forget_async::<dyn DomainEventHandler, _>(
            self.locator.as_ref(),
            event,
            |handler| handler.delegates(),
            options,
        )
    }
}

/// Publishes integration events to the [`IntegrationEventHandler`]s of a
/// locator.
#[derive(Clone)]
pub struct LocatorIntegrationEventDispatcher {
    locator: Arc<dyn ServiceLocator>,
}

impl LocatorIntegrationEventDispatcher {
    /// Creates a dispatcher resolving handlers from `locator`.
    #[must_use]
    pub fn new(locator: Arc<dyn ServiceLocator>) -> Self {
        Self { locator }
    }
}

impl IntegrationEventDispatcher for LocatorIntegrationEventDispatcher {
    fn publish(&self, event: &dyn IntegrationEvent) -> Result<(), DispatchError> {
        dispatch::fire_and_forget::<dyn IntegrationEventHandler, _>(
            self.locator.as_ref(),
            event,
            |handler| handler.delegates(),
        )
    }

    fn publish_async<'a>(
        &'a self,
        event: &'a dyn IntegrationEvent,
        options: AsyncOptions,
    ) -> DispatchFuture<'a, ()> {
        dispatch::fire_and_forget_async::<dyn IntegrationEventHandler, _>(
            self.locator.as_ref(),
            event,
            |handler| handler.delegates(),
            options,
        )
    }
}

/// Answers queries with the [`QueryHandler`]s of a locator.
#[derive(Clone)]
pub struct LocatorQueryDispatcher {
    locator: Arc<dyn ServiceLocator>,
}

impl LocatorQueryDispatcher {
    /// Creates a dispatcher resolving handlers from `locator`.
    #[must_use]
    pub fn new(locator: Arc<dyn ServiceLocator>) -> Self {
        Self { locator }
    }
}

impl QueryDispatcher for LocatorQueryDispatcher {
    fn query_erased(
        &self,
        query: &dyn AnyQuery,
        output: TypeId,
    ) -> Result<ErasedResult, DispatchError> {
        dispatch::request_reply::<dyn QueryHandler, _>(
            self.locator.as_ref(),
            query,
            output,
            |handler| handler.delegates(),
        )
    }

    fn query_erased_async<'a>(
        &'a self,
        query: &'a dyn AnyQuery,
        output: TypeId,
        options: AsyncOptions,
    ) -> DispatchFuture<'a, ErasedResult> {
        dispatch::request_reply_async::<dyn QueryHandler, _>(
            self.locator.as_ref(),
            query,
            output,
            |handler| handler.delegates(),
            options,
        )
    }
}

macro_rules! impl_debug {
    ($($dispatcher:ident),+ $(,)?) => {
        $(
            impl fmt::Debug for $dispatcher {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_struct(stringify!($dispatcher)).finish_non_exhaustive()
                }
            }
        )+
    };
}

impl_debug!(
    LocatorCommandDispatcher,
    LocatorDomainEventDispatcher,
    LocatorIntegrationEventDispatcher,
    LocatorQueryDispatcher,
);
