//! Fire-and-forget registry and activator.

use super::{Delivery, Registration};
use crate::error::{DispatchError, HandlerResult};
use crate::options::run_cancellable;
use crate::request::{Member, RequestKind};
use futures::future::{self, BoxFuture};
use smallvec::SmallVec;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;

type SyncDelegate = Box<dyn Fn(&dyn Any) -> HandlerResult + Send + Sync>;
type AsyncDelegate =
    Box<dyn Fn(&dyn Any, CancellationToken) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Write side of a fire-and-forget handler registry.
///
/// Registering the same request type twice keeps both callables; they run
/// in registration order.
pub trait FireForgetRegistry<K: ?Sized + RequestKind> {
    /// Registers a synchronous callable for requests of exact type `T`.
    fn register<T, F>(&mut self, handler: F) -> &mut Self
    where
        T: Member<K>,
        F: Fn(&T) -> HandlerResult + Send + Sync + 'static;

    /// Registers an asynchronous callable for requests of exact type `T`.
    ///
    /// The callable receives its own copy of the request and the
    /// cancellation signal of the dispatch.
    fn register_async<T, F, Fut>(&mut self, handler: F) -> &mut Self
    where
        T: Member<K> + Clone,
        F: Fn(T, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static;
}

/// Read side of a fire-and-forget handler registry.
pub trait FireForgetActivator<K: ?Sized>: Send + Sync {
    /// Runs the synchronous callables registered for the exact runtime type
    /// of `request`.
    ///
    /// Returns `Ok(false)` when none is registered, in which case nothing ran.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::HandlerFailed`] with the first callable
    /// failure; later callables are not run.
    fn try_invoke(&self, request: &K) -> Result<bool, DispatchError>;

    /// Runs the asynchronous callables registered for the exact runtime type
    /// of `request`, one after another.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Cancelled`] when `cancellation` fires before
    /// or during a callable, or [`DispatchError::HandlerFailed`] with the
    /// first callable failure.
    fn try_invoke_async<'a>(
        &'a self,
        request: &'a K,
        cancellation: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<bool, DispatchError>>;

    /// Every registered callable, in registration order.
    fn registrations(&self) -> Vec<Registration>;
}

/// The fire-and-forget manager: a registry and activator for request kind `K`.
pub struct FireForgetManager<K: ?Sized> {
    sync: HashMap<TypeId, SmallVec<[SyncDelegate; 1]>>,
    asynchronous: HashMap<TypeId, SmallVec<[AsyncDelegate; 1]>>,
    registrations: Vec<Registration>,
    _kind: PhantomData<fn(&K)>,
}

impl<K: ?Sized + RequestKind> FireForgetManager<K> {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sync: HashMap::new(),
            asynchronous: HashMap::new(),
            registrations: Vec::new(),
            _kind: PhantomData,
        }
    }

    /// Total number of registered callables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl<K: ?Sized + RequestKind> Default for FireForgetManager<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ?Sized + RequestKind> fmt::Debug for FireForgetManager<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FireForgetManager")
            .field("kind", &K::NAME)
            .field("registrations", &self.registrations)
            .finish()
    }
}

fn type_mismatch<T>() -> anyhow::Error {
    anyhow::anyhow!(
        "delegate for {} received a request of another type",
        std::any::type_name::<T>()
    )
}

impl<K: ?Sized + RequestKind> FireForgetRegistry<K> for FireForgetManager<K> {
    fn register<T, F>(&mut self, handler: F) -> &mut Self
    where
        T: Member<K>,
        F: Fn(&T) -> HandlerResult + Send + Sync + 'static,
    {
        let delegate: SyncDelegate = Box::new(move |request: &dyn Any| -> HandlerResult {
            match request.downcast_ref::<T>() {
                Some(request) => handler(request),
                None => Err(type_mismatch::<T>()),
            }
        });

        self.sync
            .entry(TypeId::of::<T>())
            .or_default()
            .push(delegate);
        self.registrations.push(Registration {
            request_type: std::any::type_name::<T>(),
            output_type: None,
            delivery: Delivery::Sync,
        });
        self
    }

    fn register_async<T, F, Fut>(&mut self, handler: F) -> &mut Self
    where
        T: Member<K> + Clone,
        F: Fn(T, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let delegate: AsyncDelegate = Box::new(
            move |request: &dyn Any,
                  cancellation: CancellationToken|
                  -> BoxFuture<'static, HandlerResult> {
                match request.downcast_ref::<T>() {
                    Some(request) => Box::pin(handler(request.clone(), cancellation)),
                    None => Box::pin(future::ready(Err(type_mismatch::<T>()))),
                }
            },
        );

        self.asynchronous
            .entry(TypeId::of::<T>())
            .or_default()
            .push(delegate);
        self.registrations.push(Registration {
            request_type: std::any::type_name::<T>(),
            output_type: None,
            delivery: Delivery::Async,
        });
        self
    }
}

impl<K: ?Sized + RequestKind> FireForgetActivator<K> for FireForgetManager<K> {
    fn try_invoke(&self, request: &K) -> Result<bool, DispatchError> {
        let Some(delegates) = self.sync.get(&request.request_type_id()) else {
            return Ok(false);
        };

        for delegate in delegates {
            delegate(request.as_any()).map_err(DispatchError::HandlerFailed)?;
        }
        Ok(true)
    }

    fn try_invoke_async<'a>(
        &'a self,
        request: &'a K,
        cancellation: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<bool, DispatchError>> {
        Box::pin(async move {
            let Some(delegates) = self.asynchronous.get(&request.request_type_id()) else {
                return Ok(false);
            };

            for delegate in delegates {
                run_cancellable(delegate(request.as_any(), cancellation.clone()), cancellation)
                    .await?;
            }
            Ok(true)
        })
    }

    fn registrations(&self) -> Vec<Registration> {
        self.registrations.clone()
    }
}
