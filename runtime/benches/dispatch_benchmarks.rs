//! Dispatch Performance Benchmarks
//!
//! Measures the cost of the dispatch path on its own:
//! - Activator lookup and invocation (no locator)
//! - Mediator dispatch through a `ServiceRegistry`
//! - Candidate scanning when every resolved handler declines
//! - Async dispatch overhead
//!
//! Run with: `cargo bench`

#![allow(missing_docs)] // Benchmarks don't need extensive docs
#![allow(clippy::expect_used)] // Benchmarks can use expect for setup

use courier_core::command::{CommandDispatcher, CommandHandler};
use courier_core::handler::RequestReplyActivatorExt;
use courier_core::locator::ServiceRegistry;
use courier_core::options::AsyncOptions;
use courier_core::query::{QueryDispatcherExt, QueryHandler};
use courier_runtime::CourierMediator;
use courier_testing::fixtures::{
    AccountCommandHandler, AccountProjection, AccountQueryHandler, GetAccount, UpdateAccount,
};
use courier_testing::InMemoryTestStore;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

fn seeded_store() -> InMemoryTestStore {
    let store = InMemoryTestStore::new();
    store.add(AccountProjection {
        id: 1,
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
    });
    store
}

/// Benchmark the activators in isolation (no locator, no mediator)
fn benchmark_activator(c: &mut Criterion) {
    let mut group = c.benchmark_group("activator");
    group.throughput(Throughput::Elements(1));

    let command_handler = AccountCommandHandler::new(InMemoryTestStore::new());
    let query_handler = AccountQueryHandler::new(seeded_store());
    let update = UpdateAccount::new(1, "Grace");
    let query = GetAccount::new(1);

    group.bench_function("fire_forget_decline", |b| {
        b.iter(|| command_handler.delegates().try_invoke(black_box(&update)));
    });

    group.bench_function("request_reply_answer", |b| {
        b.iter(|| {
            query_handler
                .delegates()
                .try_invoke::<AccountProjection>(black_box(&query))
        });
    });

    group.finish();
}

/// Benchmark mediator dispatch (commands/sec, queries/sec)
fn benchmark_mediator(c: &mut Criterion) {
    let mut group = c.benchmark_group("mediator");
    group.throughput(Throughput::Elements(1));

    let mediator = CourierMediator::from_locator(
        ServiceRegistry::new()
            .with_command_handler(AccountCommandHandler::new(InMemoryTestStore::new()))
            .with_query_handler(AccountQueryHandler::new(seeded_store())),
    );
    let update = UpdateAccount::new(1, "Grace");
    let query = GetAccount::new(1);

    group.bench_function("commit_orphaned", |b| {
        b.iter(|| mediator.commit(black_box(&update)));
    });

    group.bench_function("query", |b| {
        b.iter(|| mediator.query(black_box(&query)));
    });

    group.finish();
}

/// Benchmark candidate scanning: every resolved handler declines
fn benchmark_candidate_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("candidate_scan");
    group.throughput(Throughput::Elements(1));

    for candidates in [1_usize, 4, 16, 64] {
        let registry = (0..candidates).fold(ServiceRegistry::new(), |registry, _| {
            registry.with_command_handler(AccountCommandHandler::new(InMemoryTestStore::new()))
        });
        let mediator = CourierMediator::from_locator(registry);
        let command = UpdateAccount::new(1, "Grace");

        group.bench_with_input(
            BenchmarkId::from_parameter(candidates),
            &candidates,
            |b, _| {
                b.iter(|| mediator.commit(black_box(&command)));
            },
        );
    }

    group.finish();
}

/// Benchmark async dispatch overhead
fn benchmark_async_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_dispatch");
    group.throughput(Throughput::Elements(1));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime");

    let mediator = CourierMediator::from_locator(
        ServiceRegistry::new().with_query_handler(AccountQueryHandler::new(seeded_store())),
    );
    let query = GetAccount::new(1);

    group.bench_function("query_async", |b| {
        b.to_async(&runtime).iter(|| async {
            let _ = mediator
                .query_async(black_box(&query), AsyncOptions::default())
                .await;
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_activator,
    benchmark_mediator,
    benchmark_candidate_scan,
    benchmark_async_dispatch
);
criterion_main!(benches);
