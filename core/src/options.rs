//! Options for asynchronous dispatch.

use crate::error::{DispatchError, HandlerResult};
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

/// Options for the `*_async` dispatch operations.
///
/// Carries the cancellation signal that is forwarded to asynchronous handler
/// callables. A cancelled dispatch fails with [`DispatchError::Cancelled`].
///
/// # Examples
///
/// ```
/// use courier_core::CancellationToken;
/// use courier_core::options::AsyncOptions;
///
/// let token = CancellationToken::new();
/// let options = AsyncOptions::default().with_cancellation(token.clone());
/// token.cancel();
/// assert!(options.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct AsyncOptions {
    cancellation: CancellationToken,
}

impl AsyncOptions {
    /// Options with a fresh, never-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `token` as the cancellation signal.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// The cancellation signal.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Fails with [`DispatchError::Cancelled`] if cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Cancelled`] when the token is cancelled.
    pub fn ensure_not_cancelled(&self) -> Result<(), DispatchError> {
        if self.is_cancelled() {
            Err(DispatchError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Drives `future` to completion unless `cancellation` fires first.
///
/// An already-cancelled token short-circuits without polling `future`.
///
/// # Errors
///
/// Returns [`DispatchError::Cancelled`] when the token fires, or
/// [`DispatchError::HandlerFailed`] when the future resolves to an error.
pub async fn run_cancellable<T>(
    future: BoxFuture<'_, HandlerResult<T>>,
    cancellation: &CancellationToken,
) -> Result<T, DispatchError> {
    if cancellation.is_cancelled() {
        return Err(DispatchError::Cancelled);
    }

    tokio::select! {
        biased;
        () = cancellation.cancelled() => Err(DispatchError::Cancelled),
        result = future => result.map_err(DispatchError::HandlerFailed),
    }
}
