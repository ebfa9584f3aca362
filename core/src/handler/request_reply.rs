//! Request-reply registry and activator.

use super::{Delivery, Outcome, Registration};
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

/// A handler's result with its concrete type erased.
pub type ErasedResult = Box<dyn Any + Send>;

type SyncDelegate = Box<dyn Fn(&dyn Any) -> HandlerResult<ErasedResult> + Send + Sync>;
type AsyncDelegate = Box<
    dyn Fn(&dyn Any, CancellationToken) -> BoxFuture<'static, HandlerResult<ErasedResult>>
        + Send
        + Sync,
>;

/// Registry key: request type and output type.
type Key = (TypeId, TypeId);

/// Recovers the concrete value from an [`ErasedResult`].
///
/// # Errors
///
/// Returns [`DispatchError::ResultTypeMismatch`] when the value is not an `R`.
pub fn downcast_result<R: 'static>(value: ErasedResult) -> Result<R, DispatchError> {
    value
        .downcast::<R>()
        .map(|value| *value)
        .map_err(|_| DispatchError::ResultTypeMismatch {
            expected: std::any::type_name::<R>(),
        })
}

/// Write side of a request-reply handler registry.
pub trait RequestReplyRegistry<K: ?Sized + RequestKind> {
    /// Registers a synchronous callable answering requests of exact type `T`
    /// with a value of type `R`.
    fn register<T, R, F>(&mut self, handler: F) -> &mut Self
    where
        T: Member<K>,
        R: Send + 'static,
        F: Fn(&T) -> HandlerResult<R> + Send + Sync + 'static;

    /// Registers an asynchronous callable answering requests of exact type
    /// `T` with a value of type `R`.
    fn register_async<T, R, F, Fut>(&mut self, handler: F) -> &mut Self
    where
        T: Member<K> + Clone,
        R: Send + 'static,
        F: Fn(T, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<R>> + Send + 'static;
}

/// Read side of a request-reply handler registry, with the output type erased.
///
/// Use the typed methods of [`RequestReplyActivatorExt`].
pub trait RequestReplyActivator<K: ?Sized>: Send + Sync {
    /// Invokes the first synchronous callable registered for the exact
    /// runtime type of `request` and the output type `output`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::HandlerFailed`] when the callable fails.
    fn try_invoke_erased(
        &self,
        request: &K,
        output: TypeId,
    ) -> Result<Outcome<ErasedResult>, DispatchError>;

    /// Asynchronous counterpart of [`try_invoke_erased`](Self::try_invoke_erased).
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Cancelled`] or [`DispatchError::HandlerFailed`].
    fn try_invoke_erased_async<'a>(
        &'a self,
        request: &'a K,
        output: TypeId,
        cancellation: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Outcome<ErasedResult>, DispatchError>>;

    /// Every registered callable, in registration order.
    fn registrations(&self) -> Vec<Registration>;
}

/// Typed access to a [`RequestReplyActivator`].
pub trait RequestReplyActivatorExt<K: ?Sized>: RequestReplyActivator<K> {
    /// Invokes the synchronous callable producing an `R` for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::HandlerFailed`] when the callable fails.
    fn try_invoke<R: Send + 'static>(&self, request: &K) -> Result<Outcome<R>, DispatchError> {
        match self.try_invoke_erased(request, TypeId::of::<R>())? {
            Outcome::Succeeded(value) => downcast_result(value).map(Outcome::Succeeded),
            Outcome::Declined => Ok(Outcome::Declined),
        }
    }

    /// Invokes the asynchronous callable producing an `R` for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Cancelled`] or [`DispatchError::HandlerFailed`].
    fn try_invoke_async<'a, R: Send + 'static>(
        &'a self,
        request: &'a K,
        cancellation: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Outcome<R>, DispatchError>>
    where
        K: Sync,
    {
        Box::pin(async move {
            match self
                .try_invoke_erased_async(request, TypeId::of::<R>(), cancellation)
                .await?
            {
                Outcome::Succeeded(value) => downcast_result(value).map(Outcome::Succeeded),
                Outcome::Declined => Ok(Outcome::Declined),
            }
        })
    }
}

impl<K: ?Sized, A: RequestReplyActivator<K> + ?Sized> RequestReplyActivatorExt<K> for A {}

/// The request-reply manager: a registry and activator for request kind `K`.
///
/// When several callables share a `(request type, output type)` pair, the
/// first one registered answers.
pub struct RequestReplyManager<K: ?Sized> {
    sync: HashMap<Key, SmallVec<[SyncDelegate; 1]>>,
    asynchronous: HashMap<Key, SmallVec<[AsyncDelegate; 1]>>,
    registrations: Vec<Registration>,
    _kind: PhantomData<fn(&K)>,
}

impl<K: ?Sized + RequestKind> RequestReplyManager<K> {
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

    fn record<T, R>(&mut self, delivery: Delivery) {
        self.registrations.push(Registration {
            request_type: std::any::type_name::<T>(),
            output_type: Some(std::any::type_name::<R>()),
            delivery,
        });
    }
}

impl<K: ?Sized + RequestKind> Default for RequestReplyManager<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ?Sized + RequestKind> fmt::Debug for RequestReplyManager<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestReplyManager")
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

impl<K: ?Sized + RequestKind> RequestReplyRegistry<K> for RequestReplyManager<K> {
    fn register<T, R, F>(&mut self, handler: F) -> &mut Self
    where
        T: Member<K>,
        R: Send + 'static,
        F: Fn(&T) -> HandlerResult<R> + Send + Sync + 'static,
    {
        let delegate: SyncDelegate =
            Box::new(move |request: &dyn Any| -> HandlerResult<ErasedResult> {
                let request = request
                    .downcast_ref::<T>()
                    .ok_or_else(type_mismatch::<T>)?;
                handler(request).map(|value| Box::new(value) as ErasedResult)
            });

        self.sync
            .entry((TypeId::of::<T>(), TypeId::of::<R>()))
            .or_default()
            .push(delegate);
        self.record::<T, R>(Delivery::Sync);
        self
    }

    fn register_async<T, R, F, Fut>(&mut self, handler: F) -> &mut Self
    where
        T: Member<K> + Clone,
        R: Send + 'static,
        F: Fn(T, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<R>> + Send + 'static,
    {
        let delegate: AsyncDelegate = Box::new(
            move |request: &dyn Any,
                  cancellation: CancellationToken|
                  -> BoxFuture<'static, HandlerResult<ErasedResult>> {
                match request.downcast_ref::<T>() {
                    Some(request) => {
                        let reply = handler(request.clone(), cancellation);
                        Box::pin(async move {
                            reply.await.map(|value| Box::new(value) as ErasedResult)
                        })
                    }
                    None => Box::pin(future::ready(Err(type_mismatch::<T>()))),
                }
            },
        );

        self.asynchronous
            .entry((TypeId::of::<T>(), TypeId::of::<R>()))
            .or_default()
            .push(delegate);
        self.record::<T, R>(Delivery::Async);
        self
    }
}

impl<K: ?Sized + RequestKind> RequestReplyActivator<K> for RequestReplyManager<K> {
    fn try_invoke_erased(
        &self,
        request: &K,
        output: TypeId,
    ) -> Result<Outcome<ErasedResult>, DispatchError> {
        let Some(delegate) = self
            .sync
            .get(&(request.request_type_id(), output))
            .and_then(|delegates| delegates.first())
        else {
            return Ok(Outcome::Declined);
        };

        delegate(request.as_any())
            .map(Outcome::Succeeded)
            .map_err(DispatchError::HandlerFailed)
    }

    fn try_invoke_erased_async<'a>(
        &'a self,
        request: &'a K,
        output: TypeId,
        cancellation: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Outcome<ErasedResult>, DispatchError>> {
        Box::pin(async move {
            let Some(delegate) = self
                .asynchronous
                .get(&(request.request_type_id(), output))
                .and_then(|delegates| delegates.first())
            else {
                return Ok(Outcome::Declined);
            };

            run_cancellable(delegate(request.as_any(), cancellation.clone()), cancellation)
                .await
                .map(Outcome::Succeeded)
        })
    }

    fn registrations(&self) -> Vec<Registration> {
        self.registrations.clone()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::handler::HandlerFactory;
    use crate::metadata::Metadata;
    use crate::query::{AnyQuery, Query};
    use crate::request::Request;
    use std::time::Duration;

    #[derive(Clone, Debug, Default)]
    struct Lookup {
        id: u32,
        metadata: Metadata,
    }

    impl Request for Lookup {
        fn metadata(&self) -> &Metadata {
            &self.metadata
        }

        fn metadata_mut(&mut self) -> &mut Metadata {
            &mut self.metadata
        }
    }

    impl Query for Lookup {
        type Output = String;
    }

    fn lookup(id: u32) -> Lookup {
        Lookup {
            id,
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn answers_matching_output_type() {
        let manager = HandlerFactory::request_reply::<dyn AnyQuery>(|registry| {
            registry.register(|query: &Lookup| Ok(format!("account-{}", query.id)));
        });

        let outcome = manager.try_invoke::<String>(&lookup(3)).unwrap();
        assert_eq!(outcome, Outcome::Succeeded("account-3".to_owned()));
    }

    #[test]
    fn declines_other_output_types() {
        let manager = HandlerFactory::request_reply::<dyn AnyQuery>(|registry| {
            registry.register(|query: &Lookup| Ok(query.id));
        });

        assert_eq!(manager.try_invoke::<String>(&lookup(1)).unwrap(), Outcome::Declined);
        assert_eq!(manager.try_invoke::<u32>(&lookup(1)).unwrap(), Outcome::Succeeded(1));
    }

    #[test]
    fn first_registration_answers() {
        let manager = HandlerFactory::request_reply::<dyn AnyQuery>(|registry| {
            registry
                .register(|_: &Lookup| Ok("first".to_owned()))
                .register(|_: &Lookup| Ok("second".to_owned()));
        });

        assert_eq!(
            manager.try_invoke::<String>(&lookup(1)).unwrap(),
            Outcome::Succeeded("first".to_owned())
        );
        assert_eq!(manager.registrations().len(), 2);
    }

    #[test]
    fn handler_failure_is_reported() {
        let manager = HandlerFactory::request_reply::<dyn AnyQuery>(|registry| {
            registry.register(|_: &Lookup| -> HandlerResult<String> {
                Err(anyhow::anyhow!("not found"))
            });
        });

        let error = manager.try_invoke::<String>(&lookup(9)).unwrap_err();
        assert_eq!(error.to_string(), "Handler failed: not found");
    }

    #[test]
    fn downcast_reports_expected_type() {
        let error = downcast_result::<String>(Box::new(5_u8)).unwrap_err();
        assert!(matches!(
            error,
            DispatchError::ResultTypeMismatch { expected } if expected == "alloc::string::String"
        ));
    }

    #[tokio::test]
    async fn async_path_ignores_sync_callables() {
        let manager = HandlerFactory::request_reply::<dyn AnyQuery>(|registry| {
            registry
                .register(|_: &Lookup| Ok("sync".to_owned()))
                .register_async(|query: Lookup, _| async move { Ok(format!("async-{}", query.id)) });
        });
        let token = CancellationToken::new();

        assert_eq!(
            manager.try_invoke_async::<String>(&lookup(2), &token).await.unwrap(),
            Outcome::Succeeded("async-2".to_owned())
        );
        assert_eq!(
            manager.try_invoke::<String>(&lookup(2)).unwrap(),
            Outcome::Succeeded("sync".to_owned())
        );
    }

    #[tokio::test]
    async fn async_callable_observes_cancellation() {
        let manager = HandlerFactory::request_reply::<dyn AnyQuery>(|registry| {
            registry.register_async(|_: Lookup, cancellation: CancellationToken| async move {
                cancellation.cancelled().await;
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(String::new())
            });
        });
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let error = manager
            .try_invoke_async::<String>(&lookup(1), &token)
            .await
            .unwrap_err();
        assert!(error.is_cancelled());
    }
}
