//! # Courier Testing
//!
//! Testing utilities and helpers for Courier.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`test_clock`])
//! - A shared in-memory store handlers can write to ([`InMemoryTestStore`])
//! - Account fixtures: requests, handlers and an aggregate ([`fixtures`])
//! - A Given-When-Then harness for dispatch ([`DispatchTest`])
//! - proptest strategies ([`properties`])
//!
//! ## Example
//!
//! ```
//! use courier_core::locator::ServiceRegistry;
//! use courier_testing::fixtures::{AccountCommandHandler, AccountProjection, CreateAccount};
//! use courier_testing::{DispatchTest, InMemoryTestStore};
//!
//! let store = InMemoryTestStore::new();
//! let registry =
//!     ServiceRegistry::new().with_command_handler(AccountCommandHandler::new(store.clone()));
//!
//! DispatchTest::new(registry)
//!     .when_command(CreateAccount::new(1, "Ada", "ada@example.com"))
//!     .then_ok()
//!     .run();
//!
//! assert_eq!(store.query_for::<AccountProjection>().len(), 1);
//! ```

use chrono::{DateTime, Utc};
use courier_core::environment::Clock;

pub mod fixtures;
pub mod store;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, so stamped metadata is reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use courier_testing::mocks::FixedClock;
    /// use courier_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }
}

/// proptest strategies for Courier fixtures.
pub mod properties {
    use crate::fixtures::{CreateAccount, GetAccount};
    use proptest::prelude::*;

    /// Capitalised account holder names.
    pub fn account_name() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{1,11}"
    }

    /// Well-formed email addresses.
    pub fn email() -> impl Strategy<Value = String> {
        ("[a-z]{1,8}", "[a-z]{2,8}").prop_map(|(user, domain)| format!("{user}@{domain}.test"))
    }

    /// `CreateAccount` commands with arbitrary ids.
    pub fn create_account() -> impl Strategy<Value = CreateAccount> {
        (any::<u64>(), account_name(), email())
            .prop_map(|(id, name, email)| CreateAccount::new(id, name, email))
    }

    /// `GetAccount` queries with arbitrary ids.
    pub fn get_account() -> impl Strategy<Value = GetAccount> {
        any::<u64>().prop_map(GetAccount::new)
    }
}

/// Installs a `tracing` subscriber that writes through the test harness.
///
/// Honours `RUST_LOG` and defaults to `debug`. Safe to call from every test;
/// only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use dispatch_test::DispatchTest;
pub use mocks::{FixedClock, test_clock};
pub use store::InMemoryTestStore;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }
}
