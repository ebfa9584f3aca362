//! Property tests for locator-backed dispatch
//!
//! Candidate handler instances are generated in bulk; each one either
//! accepts the `Ping` request or registers something unrelated, and every
//! invocation is logged by candidate index.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use courier_core::command::{Command, CommandDispatcher, CommandHandler};
use courier_core::error::HandlerResult;
use courier_core::handler::{
    FireForgetActivator, FireForgetManager, FireForgetRegistry, HandlerFactory,
    RequestReplyActivator, RequestReplyManager, RequestReplyRegistry,
};
use courier_core::locator::ServiceRegistry;
use courier_core::metadata::Metadata;
use courier_core::options::AsyncOptions;
use courier_core::query::{AnyQuery, QueryDispatcherExt, QueryHandler};
use courier_core::request::Request;
use courier_macros::{Command, Query};
use courier_runtime::CourierMediator;
use proptest::prelude::*;
use std::ops::Deref;
use std::sync::{Arc, Mutex};

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Command, Clone, Debug, Default)]
struct Ping {
    metadata: Metadata,
}

#[derive(Command, Clone, Debug, Default)]
struct Pong {
    metadata: Metadata,
}

/// Wraps a `Ping` and derefs to it; still a different type for routing.
#[derive(Command, Clone, Debug, Default)]
struct LoudPing {
    inner: Ping,
    metadata: Metadata,
}

impl Deref for LoudPing {
    type Target = Ping;

    fn deref(&self) -> &Ping {
        &self.inner
    }
}

#[derive(Query, Clone, Debug, Default)]
#[query(output = usize)]
struct Which {
    metadata: Metadata,
}

#[derive(Query, Clone, Debug, Default)]
#[query(output = String)]
struct Other {
    metadata: Metadata,
}

type Log = Arc<Mutex<Vec<usize>>>;

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<usize> {
    log.lock().unwrap().clone()
}

struct Candidate {
    delegates: FireForgetManager<dyn Command>,
}

impl Candidate {
    /// A candidate that accepts `Ping` when `accepts`, otherwise only `Pong`.
    fn new(index: usize, accepts: bool, log: &Log) -> Self {
        let log = Arc::clone(log);
        let delegates = HandlerFactory::fire_forget::<dyn Command>(|registry| {
            if accepts {
                registry.register(move |_: &Ping| {
                    log.lock().unwrap().push(index);
                    Ok(())
                });
            } else {
                registry.register(move |_: &Pong| {
                    log.lock().unwrap().push(index);
                    Ok(())
                });
            }
        });
        Self { delegates }
    }

    fn from_manager(delegates: FireForgetManager<dyn Command>) -> Self {
        Self { delegates }
    }
}

impl CommandHandler for Candidate {
    fn delegates(&self) -> &dyn FireForgetActivator<dyn Command> {
        &self.delegates
    }
}

struct QueryCandidate {
    delegates: RequestReplyManager<dyn AnyQuery>,
}

impl QueryCandidate {
    /// Answers `Which` with its own index when `accepts`, otherwise only
    /// answers `Other`.
    fn new(index: usize, accepts: bool, log: &Log) -> Self {
        let log = Arc::clone(log);
        let delegates = HandlerFactory::request_reply::<dyn AnyQuery>(|registry| {
            if accepts {
                registry.register(move |_: &Which| {
                    log.lock().unwrap().push(index);
                    Ok(index)
                });
            } else {
                registry.register(move |_: &Other| {
                    log.lock().unwrap().push(index);
                    Ok(index.to_string())
                });
            }
        });
        Self { delegates }
    }
}

impl QueryHandler for QueryCandidate {
    fn delegates(&self) -> &dyn RequestReplyActivator<dyn AnyQuery> {
        &self.delegates
    }
}

/// `count` candidates where exactly those at or after `first` accept.
fn command_mediator(count: usize, first: Option<usize>, log: &Log) -> CourierMediator {
    let registry = (0..count).fold(ServiceRegistry::new(), |registry, index| {
        let accepts = first.is_some_and(|first| index >= first);
        registry.with_command_handler(Candidate::new(index, accepts, log))
    });
    CourierMediator::from_locator(registry)
}

fn query_mediator(count: usize, first: usize, log: &Log) -> CourierMediator {
    let registry = (0..count).fold(ServiceRegistry::new(), |registry, index| {
        registry.with_query_handler(QueryCandidate::new(index, index >= first, log))
    });
    CourierMediator::from_locator(registry)
}

fn candidates_with_acceptor() -> impl Strategy<Value = (usize, usize)> {
    (1_usize..8).prop_flat_map(|count| (Just(count), 0..count))
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn first_accepting_instance_wins((count, first) in candidates_with_acceptor()) {
        let log = log();
        let mediator = command_mediator(count, Some(first), &log);

        mediator.commit(&Ping::default()).unwrap();

        prop_assert_eq!(entries(&log), vec![first]);
    }

    #[test]
    fn unmatched_request_is_orphaned_and_named(count in 0_usize..8) {
        let log = log();
        let mediator = command_mediator(count, None, &log);

        let error = mediator.commit(&Ping::default()).unwrap_err();

        prop_assert!(error.is_orphaned());
        prop_assert!(error.request_type().unwrap().ends_with("Ping"));
        prop_assert!(error.to_string().starts_with(
            "Unable to retrieve an CommandHandler for the specified Command:"
        ));
        prop_assert!(entries(&log).is_empty());
    }

    #[test]
    fn first_answering_query_instance_wins((count, first) in candidates_with_acceptor()) {
        let log = log();
        let mediator = query_mediator(count, first, &log);

        let answer = mediator.query(&Which::default()).unwrap();

        prop_assert_eq!(answer, first);
        prop_assert_eq!(entries(&log), vec![first]);
    }
}

#[test]
fn routing_uses_the_exact_runtime_type() {
    let log = log();
    let mediator = command_mediator(3, Some(0), &log);

    let loud = LoudPing::default();
    let error = mediator.commit(&loud).unwrap_err();

    assert!(error.request_type().unwrap().ends_with("LoudPing"));
    assert!(entries(&log).is_empty());

    // Through the trait object the concrete type is still what routes.
    let boxed: Box<dyn Command> = Box::new(Ping::default());
    mediator.commit(&*boxed).unwrap();
    assert_eq!(entries(&log), vec![0]);
    assert_eq!(loud.request_short_name(), "LoudPing");
    assert_eq!(loud.deref().request_short_name(), "Ping");
}

#[test]
fn duplicate_registrations_all_run_in_order() {
    let log = log();
    let first = Arc::clone(&log);
    let second = Arc::clone(&log);
    let delegates = HandlerFactory::fire_forget::<dyn Command>(|registry| {
        registry
            .register(move |_: &Ping| {
                first.lock().unwrap().push(1);
                Ok(())
            })
            .register(move |_: &Ping| {
                second.lock().unwrap().push(2);
                Ok(())
            });
    });
    assert_eq!(delegates.registrations().len(), 2);

    let mediator = CourierMediator::from_locator(
        ServiceRegistry::new().with_command_handler(Candidate::from_manager(delegates)),
    );
    mediator.commit(&Ping::default()).unwrap();
    mediator.commit(&Ping::default()).unwrap();

    assert_eq!(entries(&log), vec![1, 2, 1, 2]);
}

#[test]
fn failing_registration_stops_later_ones() {
    let log = log();
    let after = Arc::clone(&log);
    let delegates = HandlerFactory::fire_forget::<dyn Command>(|registry| {
        registry
            .register(|_: &Ping| Err(anyhow::anyhow!("ledger offline")))
            .register(move |_: &Ping| {
                after.lock().unwrap().push(2);
                Ok(())
            });
    });
    let mediator = CourierMediator::from_locator(
        ServiceRegistry::new().with_command_handler(Candidate::from_manager(delegates)),
    );

    let error = mediator.commit(&Ping::default()).unwrap_err();

    assert_eq!(
        error.handler_error().map(ToString::to_string).as_deref(),
        Some("ledger offline")
    );
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn sync_and_async_tables_are_independent() {
    let log = log();
    let sync_log = Arc::clone(&log);
    let sync_only = HandlerFactory::fire_forget::<dyn Command>(|registry| {
        registry.register(move |_: &Ping| {
            sync_log.lock().unwrap().push(1);
            Ok(())
        });
    });
    let async_log = Arc::clone(&log);
    let async_only = HandlerFactory::fire_forget::<dyn Command>(|registry| {
        registry.register_async(move |_: Pong, _| {
            let log = Arc::clone(&async_log);
            async move {
                log.lock().unwrap().push(2);
                HandlerResult::Ok(())
            }
        });
    });
    let mediator = CourierMediator::from_locator(
        ServiceRegistry::new()
            .with_command_handler(Candidate::from_manager(sync_only))
            .with_command_handler(Candidate::from_manager(async_only)),
    );

    let error = mediator
        .commit_async(&Ping::default(), AsyncOptions::default())
        .await
        .unwrap_err();
    assert!(error.is_orphaned());

    let error = mediator.commit(&Pong::default()).unwrap_err();
    assert!(error.is_orphaned());
    assert!(entries(&log).is_empty());

    mediator.commit(&Ping::default()).unwrap();
    mediator
        .commit_async(&Pong::default(), AsyncOptions::default())
        .await
        .unwrap();
    assert_eq!(entries(&log), vec![1, 2]);
}

#[tokio::test]
async fn async_query_ignores_sync_answers() {
    let log = log();
    let mediator = query_mediator(4, 2, &log);

    // Only sync callables are registered, so the async path finds nothing.
    let error = mediator
        .query_async(&Which::default(), AsyncOptions::default())
        .await
        .unwrap_err();

    assert!(error.is_orphaned());
    assert!(error.to_string().contains("QueryHandler"));
    assert!(entries(&log).is_empty());
}
