//! The mediator: one entry point for every dispatch operation.

use crate::command::CommandDispatcher;
use crate::domain::DomainEventDispatcher;
use crate::error::DispatchError;
use crate::integration::IntegrationEventDispatcher;
use crate::query::QueryDispatcher;
use futures::future::BoxFuture;

/// Future returned by the asynchronous dispatch operations.
pub type DispatchFuture<'a, T> = BoxFuture<'a, Result<T, DispatchError>>;

/// Commits commands, raises domain events, publishes integration events and
/// answers queries.
///
/// Implemented for every type that implements the four dispatcher traits,
/// so `Arc<dyn Mediator>` can be shared as the single application-facing
/// handle:
///
/// ```ignore
/// let mediator: Arc<dyn Mediator> = Arc::new(CourierMediator::new(locator));
/// mediator.commit(&CreateAccount::new(1, "Ada", "ada@example.com"))?;
/// let account = mediator.query(&GetAccount::new(1))?;
/// ```
pub trait Mediator:
    CommandDispatcher + DomainEventDispatcher + IntegrationEventDispatcher + QueryDispatcher
{
}

impl<T> Mediator for T where
    T: CommandDispatcher
        + DomainEventDispatcher
        + IntegrationEventDispatcher
        + QueryDispatcher
        + ?Sized
{
}
