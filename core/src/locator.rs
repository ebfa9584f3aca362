//! Service location.
//!
//! Dispatchers never own handlers. They ask a [`ServiceLocator`] for every
//! instance of a handler service, identified by the `TypeId` of its trait
//! object type (`TypeId::of::<dyn CommandHandler>()`), and walk the instances
//! in the order the locator returns them.
//!
//! A resolved [`Service`] is an `Arc<dyn Any>` wrapping an `Arc<S>` for the
//! requested service type `S`. [`ServiceLocatorExt::services`] performs the
//! unwrapping, and [`ServiceRegistry`] is a ready-made locator that upholds
//! the wrapping contract.

use crate::command::CommandHandler;
use crate::domain::DomainEventHandler;
use crate::integration::IntegrationEventHandler;
use crate::query::QueryHandler;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A resolved service instance: an `Arc<S>` behind `dyn Any`.
pub type Service = Arc<dyn Any + Send + Sync>;

/// Resolves every registered instance of a service type.
///
/// Any `Fn(TypeId) -> Vec<Service>` is a locator, which makes it easy to
/// plug in an existing container:
///
/// ```
/// use courier_core::locator::{Service, ServiceLocator};
/// use std::any::TypeId;
///
/// let empty = |_: TypeId| -> Vec<Service> { Vec::new() };
/// assert!(empty.resolve(TypeId::of::<u8>()).is_empty());
/// ```
pub trait ServiceLocator: Send + Sync {
    /// Every instance registered for `service`, in resolution order.
    ///
    /// An unknown service resolves to an empty list.
    fn resolve(&self, service: TypeId) -> Vec<Service>;
}

impl<F> ServiceLocator for F
where
    F: Fn(TypeId) -> Vec<Service> + Send + Sync,
{
    fn resolve(&self, service: TypeId) -> Vec<Service> {
        self(service)
    }
}

/// Typed resolution on top of [`ServiceLocator`].
pub trait ServiceLocatorExt: ServiceLocator {
    /// Every instance of `S`, in resolution order.
    ///
    /// Entries that do not wrap an `Arc<S>` are skipped.
    fn services<S>(&self) -> Vec<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.resolve(TypeId::of::<S>())
            .into_iter()
            .filter_map(|service| service.downcast_ref::<Arc<S>>().cloned())
            .collect()
    }
}

impl<L: ServiceLocator + ?Sized> ServiceLocatorExt for L {}

/// An in-memory [`ServiceLocator`] built up front.
///
/// Instances resolve in registration order.
///
/// ```
/// use courier_core::command::{Command, CommandHandler};
/// use courier_core::handler::{FireForgetActivator, FireForgetManager};
/// use courier_core::locator::{ServiceLocatorExt, ServiceRegistry};
///
/// struct Noop(FireForgetManager<dyn Command>);
///
/// impl CommandHandler for Noop {
///     fn delegates(&self) -> &dyn FireForgetActivator<dyn Command> {
///         &self.0
///     }
/// }
///
/// let registry = ServiceRegistry::new()
///     .with_command_handler(Noop(FireForgetManager::new()))
///     .with_command_handler(Noop(FireForgetManager::new()));
///
/// assert_eq!(registry.services::<dyn CommandHandler>().len(), 2);
/// assert_eq!(registry.count::<dyn CommandHandler>(), 2);
/// ```
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<TypeId, Vec<Service>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an instance of service `S`.
    pub fn register<S>(&mut self, service: Arc<S>) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.services
            .entry(TypeId::of::<S>())
            .or_default()
            .push(Arc::new(service));
        self
    }

    /// Adds an instance of service `S`.
    #[must_use]
    pub fn with<S>(mut self, service: Arc<S>) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.register(service);
        self
    }

    /// Adds a command handler.
    #[must_use]
    pub fn with_command_handler(self, handler: impl CommandHandler + 'static) -> Self {
        self.with::<dyn CommandHandler>(Arc::new(handler))
    }

    /// Adds a domain event handler.
    #[must_use]
    pub fn with_domain_event_handler(self, handler: impl DomainEventHandler + 'static) -> Self {
        self.with::<dyn DomainEventHandler>(Arc::new(handler))
    }

    /// Adds an integration event handler.
    #[must_use]
    pub fn with_integration_event_handler(
        self,
        handler: impl IntegrationEventHandler + 'static,
    ) -> Self {
        self.with::<dyn IntegrationEventHandler>(Arc::new(handler))
    }

    /// Adds a query handler.
    #[must_use]
    pub fn with_query_handler(self, handler: impl QueryHandler + 'static) -> Self {
        self.with::<dyn QueryHandler>(Arc::new(handler))
    }

    /// Number of instances registered for `S`.
    #[must_use]
    pub fn count<S: ?Sized + 'static>(&self) -> usize {
        self.services.get(&TypeId::of::<S>()).map_or(0, Vec::len)
    }

    /// Total number of registered instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.values().map(Vec::len).sum()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.values().all(Vec::is_empty)
    }
}

impl ServiceLocator for ServiceRegistry {
    fn resolve(&self, service: TypeId) -> Vec<Service> {
        self.services.get(&service).cloned().unwrap_or_default()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.services.len())
            .field("instances", &self.len())
            .finish()
    }
}
