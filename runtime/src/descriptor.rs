//! A human-readable report of the handler services a locator resolves.
//!
//! Useful at startup to confirm that every handler was registered:
//!
//! ```text
//! Discovered 1 CommandHandler implementation(s) covering a total of 2 Command method(s)
//!
//! <AccountCommandHandler>
//! 	*CreateAccount (sync)
//! 	*UpdateAccount (async)
//! ```

use courier_core::command::CommandHandler;
use courier_core::domain::DomainEventHandler;
use courier_core::handler::{HandlerService, Registration};
use courier_core::integration::IntegrationEventHandler;
use courier_core::locator::{ServiceLocator, ServiceLocatorExt};
use courier_core::query::QueryHandler;
use courier_core::request::{RequestKind, short_type_name};
use std::fmt;

/// One resolved handler instance and its registrations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandlerDescription {
    /// Fully qualified type name of the handler.
    pub name: &'static str,
    /// Registered callables, in registration order.
    pub registrations: Vec<Registration>,
}

/// Every resolved instance of one handler service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceDescription {
    /// Handler service name, e.g. `CommandHandler`.
    pub service: &'static str,
    /// Request kind served, e.g. `Command`.
    pub kind: &'static str,
    /// Resolved instances, in resolution order.
    pub handlers: Vec<HandlerDescription>,
}

impl ServiceDescription {
    /// Describes every instance of `S` resolved by `locator`.
    #[must_use]
    pub fn describe<S>(locator: &dyn ServiceLocator) -> Self
    where
        S: ?Sized + HandlerService,
    {
        let handlers = locator
            .services::<S>()
            .iter()
            .map(|handler| HandlerDescription {
                name: handler.handler_name(),
                registrations: handler.registrations(),
            })
            .collect();

        Self {
            service: S::NAME,
            kind: <S::Kind as RequestKind>::NAME,
            handlers,
        }
    }

    /// Total number of registrations across all instances.
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.handlers
            .iter()
            .map(|handler| handler.registrations.len())
            .sum()
    }
}

/// Report of all four handler services.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandlerServicesDescriptor {
    services: Vec<ServiceDescription>,
}

impl HandlerServicesDescriptor {
    /// Builds the report from `locator`.
    #[must_use]
    pub fn from_locator(locator: &dyn ServiceLocator) -> Self {
        Self {
            services: vec![
                ServiceDescription::describe::<dyn CommandHandler>(locator),
                ServiceDescription::describe::<dyn DomainEventHandler>(locator),
                ServiceDescription::describe::<dyn IntegrationEventHandler>(locator),
                ServiceDescription::describe::<dyn QueryHandler>(locator),
            ],
        }
    }

    /// Per-service descriptions, including services without instances.
    #[must_use]
    pub fn services(&self) -> &[ServiceDescription] {
        &self.services
    }

    /// The description of the service named `service`.
    #[must_use]
    pub fn service(&self, service: &str) -> Option<&ServiceDescription> {
        self.services.iter().find(|s| s.service == service)
    }

    /// Total number of resolved handler instances.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.services.iter().map(|s| s.handlers.len()).sum()
    }

    /// Total number of registrations.
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.services
            .iter()
            .map(ServiceDescription::registration_count)
            .sum()
    }
}

impl fmt::Display for HandlerServicesDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for service in self.services.iter().filter(|s| !s.handlers.is_empty()) {
            if !first {
                writeln!(f)?;
            }
            first = false;

            writeln!(
                f,
                "Discovered {} {} implementation(s) covering a total of {} {} method(s)",
                service.handlers.len(),
                service.service,
                service.registration_count(),
                service.kind
            )?;

            for handler in &service.handlers {
                writeln!(f)?;
                writeln!(f, "<{}>", short_type_name(handler.name))?;
                for registration in &handler.registrations {
                    write!(f, "\t*{}", short_type_name(registration.request_type))?;
                    if let Some(output) = registration.output_type {
                        write!(f, " -> {}", short_type_name(output))?;
                    }
                    writeln!(f, " ({})", registration.delivery)?;
                }
            }
        }
        Ok(())
    }
}
