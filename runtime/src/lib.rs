//! # Courier Runtime
//!
//! Runtime implementation for Courier.
//!
//! This crate turns the contracts of `courier-core` into working dispatch:
//! every dispatcher resolves handler services from a
//! [`ServiceLocator`](courier_core::locator::ServiceLocator) and hands the
//! request to the first handler whose registry accepts it.
//!
//! ## Core Components
//!
//! - **Dispatch algorithms** ([`dispatch`]): fire-and-forget and
//!   request-reply, synchronous and asynchronous
//! - **Dispatchers** ([`dispatchers`]): one per request kind, backed by a
//!   shared locator
//! - **Mediator** ([`CourierMediator`]): a single handle implementing every
//!   dispatch operation
//! - **Descriptor** ([`descriptor`]): startup report of registered handlers
//! - **Metrics** ([`metrics`]): dispatch counters and latencies
//!
//! ## Example
//!
//! ```ignore
//! use courier_core::locator::ServiceRegistry;
//! use courier_core::prelude::*;
//! use courier_runtime::CourierMediator;
//!
//! let registry = ServiceRegistry::new()
//!     .with_command_handler(AccountCommandHandler::new(store.clone()))
//!     .with_query_handler(AccountQueryHandler::new(store));
//!
//! let mediator = CourierMediator::from_locator(registry);
//! mediator.commit(&CreateAccount::new(1, "Ada", "ada@example.com"))?;
//! let account = mediator.query(&GetAccount::new(1))?;
//! ```

use courier_core::command::{Command, CommandDispatcher};
use courier_core::domain::{DomainEvent, DomainEventDispatcher};
use courier_core::error::DispatchError;
use courier_core::handler::ErasedResult;
use courier_core::integration::{IntegrationEvent, IntegrationEventDispatcher};
use courier_core::locator::{Service, ServiceLocator};
use courier_core::mediator::DispatchFuture;
use courier_core::options::AsyncOptions;
use courier_core::query::{AnyQuery, QueryDispatcher};
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Dispatch algorithms shared by every dispatcher
pub mod dispatch;

/// Locator-backed dispatchers, one per request kind
pub mod dispatchers;

/// Report of resolved handler services
pub mod descriptor;

/// Prometheus metrics for observability
pub mod metrics;

pub use descriptor::HandlerServicesDescriptor;
pub use dispatchers::{
    LocatorCommandDispatcher, LocatorDomainEventDispatcher, LocatorIntegrationEventDispatcher,
    LocatorQueryDispatcher,
};

/// Configuration for [`CourierMediator`] instances
///
/// # Example
///
/// ```
/// use courier_runtime::MediatorConfig;
///
/// let config = MediatorConfig::default().with_handler_services_descriptor(true);
/// assert!(config.include_handler_services_descriptor);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MediatorConfig {
    /// Log a [`HandlerServicesDescriptor`] when the mediator is built
    pub include_handler_services_descriptor: bool,
}

impl MediatorConfig {
    /// Enable or disable the startup descriptor
    #[must_use]
    pub const fn with_handler_services_descriptor(mut self, enabled: bool) -> Self {
        self.include_handler_services_descriptor = enabled;
        self
    }
}

/// The default [`Mediator`](courier_core::mediator::Mediator).
///
/// Composes the four locator-backed dispatchers over one shared
/// [`ServiceLocator`]. Cloning is cheap and clones share the locator.
#[derive(Clone)]
pub struct CourierMediator {
    locator: Arc<dyn ServiceLocator>,
    commands: LocatorCommandDispatcher,
    domain_events: LocatorDomainEventDispatcher,
    integration_events: LocatorIntegrationEventDispatcher,
    queries: LocatorQueryDispatcher,
}

impl CourierMediator {
    /// Creates a mediator with the default configuration.
    #[must_use]
    pub fn new(locator: Arc<dyn ServiceLocator>) -> Self {
        Self::with_config(locator, MediatorConfig::default())
    }

    /// Creates a mediator from an owned locator.
    #[must_use]
    pub fn from_locator(locator: impl ServiceLocator + 'static) -> Self {
        Self::new(Arc::new(locator))
    }

    /// Creates a mediator from a service-resolution function.
    #[must_use]
    pub fn from_fn<F>(resolver: F) -> Self
    where
        F: Fn(TypeId) -> Vec<Service> + Send + Sync + 'static,
    {
        Self::new(Arc::new(resolver))
    }

    /// Creates a mediator with a custom configuration.
    #[must_use]
    pub fn with_config(locator: Arc<dyn ServiceLocator>, config: MediatorConfig) -> Self {
        if config.include_handler_services_descriptor {
            let descriptor = HandlerServicesDescriptor::from_locator(locator.as_ref());
            tracing::info!(
                handlers = descriptor.handler_count(),
                registrations = descriptor.registration_count(),
                "Handler services discovered\n{descriptor}"
            );
        }

        Self {
            commands: LocatorCommandDispatcher::new(Arc::clone(&locator)),
            domain_events: LocatorDomainEventDispatcher::new(Arc::clone(&locator)),
            integration_events: LocatorIntegrationEventDispatcher::new(Arc::clone(&locator)),
            queries: LocatorQueryDispatcher::new(Arc::clone(&locator)),
            locator,
        }
    }

    /// Describes the handler services currently resolved by the locator.
    #[must_use]
    pub fn descriptor(&self) -> HandlerServicesDescriptor {
        HandlerServicesDescriptor::from_locator(self.locator.as_ref())
    }

    /// The shared locator.
    #[must_use]
    pub const fn locator(&self) -> &Arc<dyn ServiceLocator> {
        &self.locator
    }
}

impl fmt::Debug for CourierMediator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CourierMediator").finish_non_exhaustive()
    }
}

impl CommandDispatcher for CourierMediator {
    fn commit(&self, command: &dyn Command) -> Result<(), DispatchError> {
        self.commands.commit(command)
    }

    fn commit_async<'a>(
        &'a self,
        command: &'a dyn Command,
        options: AsyncOptions,
    ) -> DispatchFuture<'a, ()> {
        self.commands.commit_async(command, options)
    }
}

impl DomainEventDispatcher for CourierMediator {
    fn raise(&self, event: &dyn DomainEvent) -> Result<(), DispatchError> {
        self.domain_events.raise(event)
    }

    fn raise_async<'a>(
        &'a self,
        event: &'a dyn DomainEvent,
        options: AsyncOptions,
    ) -> DispatchFuture<'a, ()> {
        self.domain_events.raise_async(event, options)
    }
}

impl IntegrationEventDispatcher for CourierMediator {
    fn publish(&self, event: &dyn IntegrationEvent) -> Result<(), DispatchError> {
        self.integration_events.publish(event)
    }

    fn publish_async<'a>(
        &'a self,
        event: &'a dyn IntegrationEvent,
        options: AsyncOptions,
    ) -> DispatchFuture<'a, ()> {
        self.integration_events.publish_async(event, options)
    }
}

impl QueryDispatcher for CourierMediator {
    fn query_erased(
        &self,
        query: &dyn AnyQuery,
        output: TypeId,
    ) -> Result<ErasedResult, DispatchError> {
        self.queries.query_erased(query, output)
    }

    fn query_erased_async<'a>(
        &'a self,
        query: &'a dyn AnyQuery,
        output: TypeId,
        options: AsyncOptions,
    ) -> DispatchFuture<'a, ErasedResult> {
        self.queries.query_erased_async(query, output, options)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use courier_core::locator::ServiceRegistry;
    use courier_core::mediator::Mediator;
    use courier_core::query::QueryDispatcherExt;

    #[test]
    fn empty_locator_reports_nothing() {
        let mediator = CourierMediator::from_locator(ServiceRegistry::new());
        let descriptor = mediator.descriptor();

        assert_eq!(descriptor.handler_count(), 0);
        assert_eq!(descriptor.to_string(), "");
    }

    #[test]
    fn mediator_is_object_safe_and_shareable() {
        fn assert_send_sync<T: Send + Sync>(_: &T) {}

        let mediator: Arc<dyn Mediator> =
            Arc::new(CourierMediator::from_fn(|_| Vec::new()));
        assert_send_sync(&mediator);
    }

    #[test]
    fn config_builder() {
        let config = MediatorConfig::default();
        assert!(!config.include_handler_services_descriptor);
        assert!(
            config
                .with_handler_services_descriptor(true)
                .include_handler_services_descriptor
        );
    }

    #[tokio::test]
    async fn cancelled_query_is_not_orphaned() {
        #[derive(Debug, Default)]
        struct Ping {
            metadata: courier_core::metadata::Metadata,
        }

        impl courier_core::request::Request for Ping {
            fn metadata(&self) -> &courier_core::metadata::Metadata {
                &self.metadata
            }

            fn metadata_mut(&mut self) -> &mut courier_core::metadata::Metadata {
                &mut self.metadata
            }
        }

        impl courier_core::query::Query for Ping {
            type Output = u8;
        }

        let mediator = CourierMediator::from_locator(ServiceRegistry::new());
        let options = AsyncOptions::default();
        options.cancellation().cancel();

        let error = mediator
            .query_async(&Ping::default(), options)
            .await
            .unwrap_err();
        assert!(error.is_cancelled());

        let error = mediator.query(&Ping::default()).unwrap_err();
        assert!(error.is_orphaned());
        assert!(error.request_type().unwrap().ends_with("Ping"));
    }
}
