//! Domain events: facts raised inside a bounded context.
//!
//! Aggregates collect the events they raise while handling a command and
//! hand them to a [`DomainEventDispatcher`] afterwards, either one at a time
//! or all at once through [`DomainEventDispatcherExt::raise_many`].

use crate::error::DispatchError;
use crate::handler::{FireForgetActivator, HandlerService, Registration};
use crate::mediator::DispatchFuture;
use crate::metadata::Metadata;
use crate::options::AsyncOptions;
use crate::request::{Member, Request, RequestKind};

/// An event raised by an aggregate.
pub trait DomainEvent: Request {}

impl RequestKind for dyn DomainEvent {
    const NAME: &'static str = "DomainEvent";
}

impl<T: DomainEvent> Member<dyn DomainEvent> for T {}

/// A handler service for domain events.
pub trait DomainEventHandler: Send + Sync {
    /// The registry of domain event callables.
    fn delegates(&self) -> &dyn FireForgetActivator<dyn DomainEvent>;

    /// Type name of the handler, for diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl HandlerService for dyn DomainEventHandler {
    const NAME: &'static str = "DomainEventHandler";
    type Kind = dyn DomainEvent;

    fn registrations(&self) -> Vec<Registration> {
        self.delegates().registrations()
    }

    fn handler_name(&self) -> &'static str {
        self.name()
    }
}

/// Raises domain events to the first handler that accepts them.
pub trait DomainEventDispatcher: Send + Sync {
    /// Raises `event` synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::OrphanedHandler`] when no handler accepts
    /// the event, or [`DispatchError::HandlerFailed`] when it fails.
    fn raise(&self, event: &dyn DomainEvent) -> Result<(), DispatchError>;

    /// Raises `event` through the asynchronous callables.
    ///
    /// # Errors
    ///
    /// As [`raise`](Self::raise), plus [`DispatchError::Cancelled`].
    fn raise_async<'a>(
        &'a self,
        event: &'a dyn DomainEvent,
        options: AsyncOptions,
    ) -> DispatchFuture<'a, ()>;
}

/// An aggregate that buffers the domain events it raises.
pub trait AggregateRoot: Send {
    /// Metadata of the aggregate, merged into each drained event.
    fn metadata(&self) -> &Metadata;

    /// Removes and returns the pending events, oldest first.
    fn take_events(&mut self) -> Vec<Box<dyn DomainEvent>>;
}

/// Ordered buffer of pending domain events, for embedding in aggregates.
#[derive(Debug, Default)]
pub struct DomainEvents {
    pending: Vec<Box<dyn DomainEvent>>,
}

impl DomainEvents {
    /// Creates an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Appends an event.
    pub fn push(&mut self, event: impl DomainEvent) {
        self.pending.push(Box::new(event));
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no events are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &dyn DomainEvent> {
        self.pending.iter().map(|event| &**event)
    }

    /// Drains every pending event.
    pub fn take(&mut self) -> Vec<Box<dyn DomainEvent>> {
        std::mem::take(&mut self.pending)
    }
}

/// Raising every pending event of an aggregate.
pub trait DomainEventDispatcherExt: DomainEventDispatcher {
    /// Drains `aggregate` and raises each event in order.
    ///
    /// The aggregate's metadata is merged into every event without
    /// overwriting entries the event already carries. Events are drained up
    /// front, so events after a failing one are discarded.
    ///
    /// # Errors
    ///
    /// Returns the first dispatch failure.
    fn raise_many<A>(&self, aggregate: &mut A) -> Result<(), DispatchError>
    where
        A: AggregateRoot + ?Sized,
    {
        let metadata = aggregate.metadata().clone();
        for mut event in aggregate.take_events() {
            event.metadata_mut().merge_missing(&metadata);
            self.raise(&*event)?;
        }
        Ok(())
    }

    /// Asynchronous counterpart of [`raise_many`](Self::raise_many).
    ///
    /// # Errors
    ///
    /// Returns the first dispatch failure, including
    /// [`DispatchError::Cancelled`].
    fn raise_many_async<'a, A>(
        &'a self,
        aggregate: &mut A,
        options: AsyncOptions,
    ) -> DispatchFuture<'a, ()>
    where
        A: AggregateRoot + ?Sized,
    {
        let metadata = aggregate.metadata().clone();
        let events = aggregate.take_events();
        Box::pin(async move {
            for mut event in events {
                event.metadata_mut().merge_missing(&metadata);
                self.raise_async(&*event, options.clone()).await?;
            }
            Ok(())
        })
    }
}

impl<D: DomainEventDispatcher + ?Sized> DomainEventDispatcherExt for D {}
