//! Queries: requests that read state and produce a reply.
//!
//! A [`Query`] names its reply type through `Output`. Registries and
//! dispatchers work with the type-erased [`AnyQuery`] kind and match callables
//! on both the query type and the output type, so two callables for the same
//! query type that produce different outputs never collide.

use crate::error::{DispatchError, HandlerResult};
use crate::handler::{
    ErasedResult, HandlerService, Registration, RequestReplyActivator, RequestReplyRegistry,
    downcast_result,
};
use crate::mediator::DispatchFuture;
use crate::options::AsyncOptions;
use crate::request::{Member, Request, RequestKind};
use std::any::TypeId;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// A query with its reply type erased; the request kind served by query
/// handlers.
///
/// Implemented for every [`Query`].
pub trait AnyQuery: Request {}

/// A request that produces a reply of type `Output`.
pub trait Query: Request {
    /// The reply type.
    type Output: Send + 'static;
}

impl<Q: Query> AnyQuery for Q {}

impl RequestKind for dyn AnyQuery {
    const NAME: &'static str = "Query";
}

impl<T: AnyQuery> Member<dyn AnyQuery> for T {}

/// A handler service for queries.
pub trait QueryHandler: Send + Sync {
    /// The registry of query callables.
    fn delegates(&self) -> &dyn RequestReplyActivator<dyn AnyQuery>;

    /// Type name of the handler, for diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl HandlerService for dyn QueryHandler {
    const NAME: &'static str = "QueryHandler";
    type Kind = dyn AnyQuery;

    fn registrations(&self) -> Vec<Registration> {
        self.delegates().registrations()
    }

    fn handler_name(&self) -> &'static str {
        self.name()
    }
}

/// Registration of query callables keyed by the query's own `Output`.
///
/// [`RequestReplyRegistry::register`] accepts any reply type, and a callable
/// whose reply type differs from `Q::Output` is never reached by
/// [`QueryDispatcherExt::query`]. These methods fix the reply type to
/// `Q::Output` so the mismatch is a compile error.
///
/// # Examples
///
/// ```
/// use courier_core::handler::HandlerFactory;
/// use courier_core::query::{AnyQuery, QueryRegistryExt};
/// # use courier_core::metadata::Metadata;
/// # use courier_core::query::Query;
/// # use courier_core::request::Request;
/// # #[derive(Clone, Debug)]
/// # struct CountAccounts { metadata: Metadata }
/// # impl Request for CountAccounts {
/// #     fn metadata(&self) -> &Metadata { &self.metadata }
/// #     fn metadata_mut(&mut self) -> &mut Metadata { &mut self.metadata }
/// # }
/// # impl Query for CountAccounts { type Output = usize; }
///
/// let delegates = HandlerFactory::request_reply::<dyn AnyQuery>(|registry| {
///     registry.answer(|_: &CountAccounts| Ok(3));
/// });
/// assert_eq!(delegates.len(), 1);
/// ```
pub trait QueryRegistryExt: RequestReplyRegistry<dyn AnyQuery> {
    /// Registers a synchronous callable answering `Q` with `Q::Output`.
    fn answer<Q, F>(&mut self, handler: F) -> &mut Self
    where
        Q: Query,
        F: Fn(&Q) -> HandlerResult<Q::Output> + Send + Sync + 'static,
    {
        self.register::<Q, Q::Output, F>(handler)
    }

    /// Registers an asynchronous callable answering `Q` with `Q::Output`.
    fn answer_async<Q, F, Fut>(&mut self, handler: F) -> &mut Self
    where
        Q: Query + Clone,
        F: Fn(Q, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Q::Output>> + Send + 'static,
    {
        self.register_async::<Q, Q::Output, F, Fut>(handler)
    }
}

impl<T: RequestReplyRegistry<dyn AnyQuery> + ?Sized> QueryRegistryExt for T {}

/// Routes queries to the first query handler able to answer them.
///
/// This is the object-safe core; callers use [`QueryDispatcherExt`].
pub trait QueryDispatcher: Send + Sync {
    /// Answers `query` with a value whose type has the id `output`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::OrphanedHandler`] when no handler answers
    /// the query, or [`DispatchError::HandlerFailed`] when it fails.
    fn query_erased(
        &self,
        query: &dyn AnyQuery,
        output: TypeId,
    ) -> Result<ErasedResult, DispatchError>;

    /// Asynchronous counterpart of [`query_erased`](Self::query_erased).
    ///
    /// # Errors
    ///
    /// As [`query_erased`](Self::query_erased), plus
    /// [`DispatchError::Cancelled`].
    fn query_erased_async<'a>(
        &'a self,
        query: &'a dyn AnyQuery,
        output: TypeId,
        options: AsyncOptions,
    ) -> DispatchFuture<'a, ErasedResult>;
}

/// Typed query dispatch.
pub trait QueryDispatcherExt: QueryDispatcher {
    /// Answers `query` synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::OrphanedHandler`] when no handler answers
    /// the query, or [`DispatchError::HandlerFailed`] when it fails.
    fn query<Q: Query>(&self, query: &Q) -> Result<Q::Output, DispatchError> {
        downcast_result(self.query_erased(query, TypeId::of::<Q::Output>())?)
    }

    /// Answers `query` through the asynchronous callables.
    ///
    /// # Errors
    ///
    /// As [`query`](Self::query), plus [`DispatchError::Cancelled`].
    fn query_async<'a, Q: Query>(
        &'a self,
        query: &'a Q,
        options: AsyncOptions,
    ) -> DispatchFuture<'a, Q::Output> {
        Box::pin(async move {
            let reply = self
                .query_erased_async(query, TypeId::of::<Q::Output>(), options)
                .await?;
            downcast_result(reply)
        })
    }
}

impl<D: QueryDispatcher + ?Sized> QueryDispatcherExt for D {}
