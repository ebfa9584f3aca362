//! Commands: requests that ask the system to change state.

use crate::error::DispatchError;
use crate::handler::{FireForgetActivator, HandlerService, Registration};
use crate::mediator::DispatchFuture;
use crate::options::AsyncOptions;
use crate::request::{Member, Request, RequestKind};

/// A request asking the system to change state.
///
/// Commands are delivered to exactly one handler and produce no reply.
pub trait Command: Request {}

impl RequestKind for dyn Command {
    const NAME: &'static str = "Command";
}

impl<T: Command> Member<dyn Command> for T {}

/// A handler service for commands.
///
/// Implementors own a [`FireForgetManager`](crate::handler::FireForgetManager)
/// built once at construction and expose it through `delegates()`.
pub trait CommandHandler: Send + Sync {
    /// The registry of command callables.
    fn delegates(&self) -> &dyn FireForgetActivator<dyn Command>;

    /// Type name of the handler, for diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl HandlerService for dyn CommandHandler {
    const NAME: &'static str = "CommandHandler";
    type Kind = dyn Command;

    fn registrations(&self) -> Vec<Registration> {
        self.delegates().registrations()
    }

    fn handler_name(&self) -> &'static str {
        self.name()
    }
}

/// Dispatches commands to the first command handler that accepts them.
pub trait CommandDispatcher: Send + Sync {
    /// Commits `command` synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::OrphanedHandler`] when no handler accepts
    /// the command, or [`DispatchError::HandlerFailed`] when it fails.
    fn commit(&self, command: &dyn Command) -> Result<(), DispatchError>;

    /// Commits `command` through the asynchronous callables.
    ///
    /// # Errors
    ///
    /// As [`commit`](Self::commit), plus [`DispatchError::Cancelled`].
    fn commit_async<'a>(
        &'a self,
        command: &'a dyn Command,
        options: AsyncOptions,
    ) -> DispatchFuture<'a, ()>;
}
