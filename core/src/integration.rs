//! Integration events: facts published for consumers outside the bounded
//! context.

use crate::error::DispatchError;
use crate::handler::{FireForgetActivator, HandlerService, Registration};
use crate::mediator::DispatchFuture;
use crate::options::AsyncOptions;
use crate::request::{Member, Request, RequestKind};

/// An event that crosses bounded-context boundaries.
///
/// New integration events are usually created with
/// [`Metadata::for_integration_event`](crate::metadata::Metadata::for_integration_event),
/// which stamps an event id, a timestamp and the member type.
pub trait IntegrationEvent: Request {}

impl RequestKind for dyn IntegrationEvent {
    const NAME: &'static str = "IntegrationEvent";
}

impl<T: IntegrationEvent> Member<dyn IntegrationEvent> for T {}

/// A handler service for integration events.
pub trait IntegrationEventHandler: Send + Sync {
    /// The registry of integration event callables.
    fn delegates(&self) -> &dyn FireForgetActivator<dyn IntegrationEvent>;

    /// Type name of the handler, for diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl HandlerService for dyn IntegrationEventHandler {
    const NAME: &'static str = "IntegrationEventHandler";
    type Kind = dyn IntegrationEvent;

    fn registrations(&self) -> Vec<Registration> {
        self.delegates().registrations()
    }

    fn handler_name(&self) -> &'static str {
        self.name()
    }
}

/// Publishes integration events to the first handler that accepts them.
pub trait IntegrationEventDispatcher: Send + Sync {
    /// Publishes `event` synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::OrphanedHandler`] when no handler accepts
    /// the event, or [`DispatchError::HandlerFailed`] when it fails.
    fn publish(&self, event: &dyn IntegrationEvent) -> Result<(), DispatchError>;

    /// Publishes `event` through the asynchronous callables.
    ///
    /// # Errors
    ///
    /// As [`publish`](Self::publish), plus [`DispatchError::Cancelled`].
    fn publish_async<'a>(
        &'a self,
        event: &'a dyn IntegrationEvent,
        options: AsyncOptions,
    ) -> DispatchFuture<'a, ()>;
}
