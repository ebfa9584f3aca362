//! Dispatch algorithms shared by every dispatcher.
//!
//! Each function resolves all instances of a handler service `S` from a
//! [`ServiceLocator`], then offers the request to them one at a time through
//! the registry returned by `delegates`. The first instance that accepts the
//! request ends the walk. When none accepts it, the dispatch fails with
//! [`DispatchError::OrphanedHandler`] naming `S` and the concrete request
//! type.
//!
//! Resolution happens on every dispatch and nothing is cached, so a locator
//! that changes over time is honoured.

use crate::metrics::DispatchMetrics;
use courier_core::error::DispatchError;
use courier_core::handler::{
    Delivery, ErasedResult, FireForgetActivator, HandlerService, Outcome, RequestReplyActivator,
};
use courier_core::locator::{ServiceLocator, ServiceLocatorExt};
use courier_core::mediator::DispatchFuture;
use courier_core::options::AsyncOptions;
use courier_core::request::{Reflect, Request, RequestKind};
use std::any::TypeId;
use std::time::Instant;
use tracing::Instrument;

/// The orphaned-handler failure for `request` dispatched to service `S`.
#[must_use]
pub fn orphaned<S>(request: &S::Kind) -> DispatchError
where
    S: ?Sized + HandlerService,
{
    DispatchError::OrphanedHandler {
        handler_service: S::NAME,
        request_kind: <S::Kind as RequestKind>::NAME,
        request_type: request.request_type_name(),
    }
}

fn finish<T>(
    kind: &'static str,
    delivery: Delivery,
    started: Instant,
    result: Result<T, DispatchError>,
) -> Result<T, DispatchError> {
    if let Err(error) = &result {
        if error.is_orphaned() {
            tracing::warn!(%error, "No handler accepted the request");
        } else {
            tracing::debug!(%error, "Dispatch failed");
        }
    }
    DispatchMetrics::record(kind, delivery, started.elapsed(), result.as_ref().err());
    result
}

fn deliver<S, F>(
    locator: &dyn ServiceLocator,
    request: &S::Kind,
    delegates: &F,
) -> Result<(), DispatchError>
where
    S: ?Sized + HandlerService,
    F: Fn(&S) -> &dyn FireForgetActivator<S::Kind>,
{
    let handlers = locator.services::<S>();
    tracing::trace!(candidates = handlers.len(), "Resolved handler services");

    for handler in &handlers {
        if delegates(handler.as_ref()).try_invoke(request)? {
            tracing::debug!(handler = handler.handler_name(), "Request handled");
            return Ok(());
        }
        tracing::trace!(handler = handler.handler_name(), "Handler declined");
    }
    Err(orphaned::<S>(request))
}

fn answer<S, F>(
    locator: &dyn ServiceLocator,
    request: &S::Kind,
    output: TypeId,
    delegates: &F,
) -> Result<ErasedResult, DispatchError>
where
    S: ?Sized + HandlerService,
    F: Fn(&S) -> &dyn RequestReplyActivator<S::Kind>,
{
    let handlers = locator.services::<S>();
    tracing::trace!(candidates = handlers.len(), "Resolved handler services");

    for handler in &handlers {
        if let Outcome::Succeeded(reply) =
            delegates(handler.as_ref()).try_invoke_erased(request, output)?
        {
            tracing::debug!(handler = handler.handler_name(), "Request answered");
            return Ok(reply);
        }
        tracing::trace!(handler = handler.handler_name(), "Handler declined");
    }
    Err(orphaned::<S>(request))
}

/// Delivers `request` to the first instance of `S` whose synchronous
/// registry accepts it.
///
/// # Errors
///
/// Returns [`DispatchError::OrphanedHandler`] when no instance accepts the
/// request, or [`DispatchError::HandlerFailed`] when the accepting callable
/// fails.
#[tracing::instrument(
    level = "debug",
    name = "fire_and_forget",
    skip_all,
    fields(service = S::NAME, request = request.request_short_name())
)]
pub fn fire_and_forget<S, F>(
    locator: &dyn ServiceLocator,
    request: &S::Kind,
    delegates: F,
) -> Result<(), DispatchError>
where
    S: ?Sized + HandlerService,
    F: Fn(&S) -> &dyn FireForgetActivator<S::Kind>,
{
    let started = Instant::now();
    let result = deliver::<S, F>(locator, request, &delegates);
    finish(<S::Kind as RequestKind>::NAME, Delivery::Sync, started, result)
}

/// Delivers `request` to the first instance of `S` whose asynchronous
/// registry accepts it.
///
/// An already-cancelled dispatch fails before any service is resolved.
///
/// # Errors
///
/// The future resolves to [`DispatchError::Cancelled`],
/// [`DispatchError::OrphanedHandler`] or [`DispatchError::HandlerFailed`].
pub fn fire_and_forget_async<'a, S, F>(
    locator: &'a dyn ServiceLocator,
    request: &'a S::Kind,
    delegates: F,
    options: AsyncOptions,
) -> DispatchFuture<'a, ()>
where
    S: ?Sized + HandlerService,
    F: (Fn(&S) -> &dyn FireForgetActivator<S::Kind>) + Send + Sync + 'a,
{
    let span = tracing::debug_span!(
        "fire_and_forget_async",
        service = S::NAME,
        request = request.request_short_name()
    );

    Box::pin(
        async move {
            let started = Instant::now();
            let result = async {
                options.ensure_not_cancelled()?;
                let handlers = locator.services::<S>();
                tracing::trace!(candidates = handlers.len(), "Resolved handler services");

                for handler in &handlers {
                    let accepted = delegates(handler.as_ref())
                        .try_invoke_async(request, options.cancellation())
                        .await?;
                    if accepted {
                        tracing::debug!(handler = handler.handler_name(), "Request handled");
                        return Ok(());
                    }
                    tracing::trace!(handler = handler.handler_name(), "Handler declined");
                }
                Err(orphaned::<S>(request))
            }
            .await;

            finish(<S::Kind as RequestKind>::NAME, Delivery::Async, started, result)
        }
        .instrument(span),
    )
}

/// Answers `request` with the first instance of `S` whose synchronous
/// registry produces a value of the type identified by `output`.
///
/// # Errors
///
/// Returns [`DispatchError::OrphanedHandler`] when no instance answers, or
/// [`DispatchError::HandlerFailed`] when the answering callable fails.
#[tracing::instrument(
    level = "debug",
    name = "request_reply",
    skip_all,
    fields(service = S::NAME, request = request.request_short_name())
)]
pub fn request_reply<S, F>(
    locator: &dyn ServiceLocator,
    request: &S::Kind,
    output: TypeId,
    delegates: F,
) -> Result<ErasedResult, DispatchError>
where
    S: ?Sized + HandlerService,
    F: Fn(&S) -> &dyn RequestReplyActivator<S::Kind>,
{
    let started = Instant::now();
    let result = answer::<S, F>(locator, request, output, &delegates);
    finish(<S::Kind as RequestKind>::NAME, Delivery::Sync, started, result)
}

/// Answers `request` with the first instance of `S` whose asynchronous
/// registry produces a value of the type identified by `output`.
///
/// # Errors
///
/// The future resolves to [`DispatchError::Cancelled`],
/// [`DispatchError::OrphanedHandler`] or [`DispatchError::HandlerFailed`].
pub fn request_reply_async<'a, S, F>(
    locator: &'a dyn ServiceLocator,
    request: &'a S::Kind,
    output: TypeId,
    delegates: F,
    options: AsyncOptions,
) -> DispatchFuture<'a, ErasedResult>
where
    S: ?Sized + HandlerService,
    F: (Fn(&S) -> &dyn RequestReplyActivator<S::Kind>) + Send + Sync + 'a,
{
    let span = tracing::debug_span!(
        "request_reply_async",
        service = S::NAME,
        request = request.request_short_name()
    );

    Box::pin(
        async move {
            let started = Instant::now();
            let result = async {
                options.ensure_not_cancelled()?;
                let handlers = locator.services::<S>();
                tracing::trace!(candidates = handlers.len(), "Resolved handler services");

                for handler in &handlers {
                    let outcome = delegates(handler.as_ref())
                        .try_invoke_erased_async(request, output, options.cancellation())
                        .await?;
                    if let Outcome::Succeeded(reply) = outcome {
                        tracing::debug!(handler = handler.handler_name(), "Request answered");
                        return Ok(reply);
                    }
                    tracing::trace!(handler = handler.handler_name(), "Handler declined");
                }
                Err(orphaned::<S>(request))
            }
            .await;

            finish(<S::Kind as RequestKind>::NAME, Delivery::Async, started, result)
        }
        .instrument(span),
    )
}
