//! Account fixtures: one request of every kind and a handler for each.
//!
//! Every handler writes what it receives or produces into an
//! [`InMemoryTestStore`], so tests can observe dispatch from the outside.
//!
//! `UpdateAccount` is deliberately left without a handler.

use crate::store::InMemoryTestStore;
use courier_core::command::{Command, CommandHandler};
use courier_core::domain::{AggregateRoot, DomainEvent, DomainEventHandler, DomainEvents};
use courier_core::environment::Clock;
use courier_core::error::HandlerResult;
use courier_core::handler::{
    FireForgetActivator, FireForgetManager, FireForgetRegistry, HandlerFactory,
    RequestReplyActivator, RequestReplyManager,
};
use courier_core::integration::{IntegrationEvent, IntegrationEventHandler};
use courier_core::metadata::Metadata;
use courier_core::query::{AnyQuery, QueryHandler, QueryRegistryExt};
use courier_core::request::Request;
use courier_macros::{Command, DomainEvent, IntegrationEvent, Query};

/// Opens an account.
#[derive(Command, Clone, Debug)]
pub struct CreateAccount {
    /// Account id
    pub id: u64,
    /// Holder name
    pub name: String,
    /// Holder email
    pub email: String,
    metadata: Metadata,
}

impl CreateAccount {
    /// Create the command with empty metadata
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            metadata: Metadata::new(),
        }
    }
}

/// Renames an account. No fixture handler accepts it.
#[derive(Command, Clone, Debug)]
pub struct UpdateAccount {
    /// Account id
    pub id: u64,
    /// New holder name
    pub name: String,
    metadata: Metadata,
}

impl UpdateAccount {
    /// Create the command with empty metadata
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            metadata: Metadata::new(),
        }
    }
}

/// Raised by [`Account::create`].
#[derive(DomainEvent, Clone, Debug)]
pub struct AccountInitiated {
    /// Account id
    pub id: u64,
    /// Holder name
    pub name: String,
    /// Holder email
    pub email: String,
    metadata: Metadata,
}

/// Published to other services once an account exists.
#[derive(IntegrationEvent, Clone, Debug)]
pub struct AccountCreated {
    /// Account id
    pub id: u64,
    /// Holder name
    pub name: String,
    metadata: Metadata,
}

impl AccountCreated {
    /// Create the event, stamping id, timestamp and member type from `clock`
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>, clock: &dyn Clock) -> Self {
        Self {
            id,
            name: name.into(),
            metadata: Metadata::for_integration_event::<Self>(clock),
        }
    }
}

/// Looks an account up by id.
#[derive(Query, Clone, Debug)]
#[query(output = AccountProjection)]
pub struct GetAccount {
    /// Account id
    pub id: u64,
    metadata: Metadata,
}

impl GetAccount {
    /// Create the query with empty metadata
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self {
            id,
            metadata: Metadata::new(),
        }
    }
}

/// Read model written by [`AccountCommandHandler`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountProjection {
    /// Account id
    pub id: u64,
    /// Holder name
    pub name: String,
    /// Holder email
    pub email: String,
}

impl From<&CreateAccount> for AccountProjection {
    fn from(command: &CreateAccount) -> Self {
        Self {
            id: command.id,
            name: command.name.clone(),
            email: command.email.clone(),
        }
    }
}

/// Handles `CreateAccount`, synchronously and asynchronously, by storing
/// an [`AccountProjection`].
pub struct AccountCommandHandler {
    delegates: FireForgetManager<dyn Command>,
}

impl AccountCommandHandler {
    /// Create the handler writing into `store`
    #[must_use]
    pub fn new(store: InMemoryTestStore) -> Self {
        let sync_store = store.clone();
        let delegates = HandlerFactory::fire_forget::<dyn Command>(|registry| {
            registry
                .register(move |command: &CreateAccount| {
                    sync_store.add(AccountProjection::from(command));
                    Ok(())
                })
                .register_async(move |command: CreateAccount, _| {
                    let store = store.clone();
                    async move {
                        store.add(AccountProjection::from(&command));
                        HandlerResult::Ok(())
                    }
                });
        });
        Self { delegates }
    }
}

impl CommandHandler for AccountCommandHandler {
    fn delegates(&self) -> &dyn FireForgetActivator<dyn Command> {
        &self.delegates
    }
}

/// Records every `AccountInitiated` it receives.
pub struct AccountDomainEventHandler {
    delegates: FireForgetManager<dyn DomainEvent>,
}

impl AccountDomainEventHandler {
    /// Create the handler writing into `store`
    #[must_use]
    pub fn new(store: InMemoryTestStore) -> Self {
        let sync_store = store.clone();
        let delegates = HandlerFactory::fire_forget::<dyn DomainEvent>(|registry| {
            registry
                .register(move |event: &AccountInitiated| {
                    sync_store.add(event.clone());
                    Ok(())
                })
                .register_async(move |event: AccountInitiated, _| {
                    let store = store.clone();
                    async move {
                        store.add(event);
                        HandlerResult::Ok(())
                    }
                });
        });
        Self { delegates }
    }
}

impl DomainEventHandler for AccountDomainEventHandler {
    fn delegates(&self) -> &dyn FireForgetActivator<dyn DomainEvent> {
        &self.delegates
    }
}

/// Records every `AccountCreated` it receives.
pub struct AccountEventHandler {
    delegates: FireForgetManager<dyn IntegrationEvent>,
}

impl AccountEventHandler {
    /// Create the handler writing into `store`
    #[must_use]
    pub fn new(store: InMemoryTestStore) -> Self {
        let sync_store = store.clone();
        let delegates = HandlerFactory::fire_forget::<dyn IntegrationEvent>(|registry| {
            registry
                .register(move |event: &AccountCreated| {
                    sync_store.add(event.clone());
                    Ok(())
                })
                .register_async(move |event: AccountCreated, _| {
                    let store = store.clone();
                    async move {
                        store.add(event);
                        HandlerResult::Ok(())
                    }
                });
        });
        Self { delegates }
    }
}

impl IntegrationEventHandler for AccountEventHandler {
    fn delegates(&self) -> &dyn FireForgetActivator<dyn IntegrationEvent> {
        &self.delegates
    }
}

/// Answers `GetAccount` from the projections in the store.
///
/// Fails when the account does not exist.
pub struct AccountQueryHandler {
    delegates: RequestReplyManager<dyn AnyQuery>,
}

impl AccountQueryHandler {
    /// Create the handler reading from `store`
    #[must_use]
    pub fn new(store: InMemoryTestStore) -> Self {
        let sync_store = store.clone();
        let delegates = HandlerFactory::request_reply::<dyn AnyQuery>(|registry| {
            registry
                .answer(move |query: &GetAccount| find_account(&sync_store, query.id))
                .answer_async(move |query: GetAccount, _| {
                    let store = store.clone();
                    async move { find_account(&store, query.id) }
                });
        });
        Self { delegates }
    }
}

fn find_account(store: &InMemoryTestStore, id: u64) -> HandlerResult<AccountProjection> {
    store
        .find(|account: &AccountProjection| account.id == id)
        .ok_or_else(|| anyhow::anyhow!("account {id} not found"))
}

impl QueryHandler for AccountQueryHandler {
    fn delegates(&self) -> &dyn RequestReplyActivator<dyn AnyQuery> {
        &self.delegates
    }
}

/// Account aggregate buffering the domain events it raises.
#[derive(Debug)]
pub struct Account {
    /// Account id
    pub id: u64,
    /// Holder name
    pub name: String,
    /// Holder email
    pub email: String,
    metadata: Metadata,
    events: DomainEvents,
}

impl Account {
    /// Open an account from `command`, raising [`AccountInitiated`].
    ///
    /// The command's metadata becomes the aggregate's, so correlation
    /// entries flow into the raised events.
    #[must_use]
    pub fn create(command: &CreateAccount, clock: &dyn Clock) -> Self {
        let mut events = DomainEvents::new();
        events.push(AccountInitiated {
            id: command.id,
            name: command.name.clone(),
            email: command.email.clone(),
            metadata: Metadata::for_domain_event(clock),
        });

        Self {
            id: command.id,
            name: command.name.clone(),
            email: command.email.clone(),
            metadata: command.metadata().clone(),
            events,
        }
    }

    /// Number of events not yet raised
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }
}

impl AggregateRoot for Account {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn take_events(&mut self) -> Vec<Box<dyn DomainEvent>> {
        self.events.take()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::test_clock;
    use courier_core::handler::{Outcome, RequestReplyActivatorExt};
    use courier_core::request::RequestExt;

    #[test]
    fn test_command_handler_stores_projection() {
        let store = InMemoryTestStore::new();
        let handler = AccountCommandHandler::new(store.clone());

        let accepted = handler
            .delegates()
            .try_invoke(&CreateAccount::new(1, "Ada", "ada@example.com"))
            .unwrap();

        assert!(accepted);
        assert_eq!(
            store.query_for::<AccountProjection>(),
            vec![AccountProjection {
                id: 1,
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            }]
        );
    }

    #[test]
    fn test_command_handler_ignores_update() {
        let store = InMemoryTestStore::new();
        let handler = AccountCommandHandler::new(store.clone());

        let accepted = handler
            .delegates()
            .try_invoke(&UpdateAccount::new(1, "Grace"))
            .unwrap();

        assert!(!accepted);
        assert!(store.is_empty());
    }

    #[test]
    fn test_query_handler_fails_for_unknown_account() {
        let store = InMemoryTestStore::new();
        let handler = AccountQueryHandler::new(store.clone());

        let error = handler
            .delegates()
            .try_invoke::<AccountProjection>(&GetAccount::new(9))
            .unwrap_err();
        assert!(error.to_string().contains("account 9 not found"));

        store.add(AccountProjection {
            id: 9,
            name: "Linus".to_string(),
            email: "linus@example.com".to_string(),
        });
        let outcome = handler
            .delegates()
            .try_invoke::<AccountProjection>(&GetAccount::new(9))
            .unwrap();
        assert!(matches!(outcome, Outcome::Succeeded(account) if account.name == "Linus"));
    }

    #[test]
    fn test_account_raises_initiated_with_command_metadata() {
        let command = CreateAccount::new(3, "Ada", "ada@example.com").with_correlation_id("corr-3");
        let mut account = Account::create(&command, &test_clock());

        assert_eq!(account.pending_events(), 1);
        assert_eq!(account.metadata().get_str("correlationId"), Some("corr-3"));

        let events = account.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].request_short_name(), "AccountInitiated");
        assert!(events[0].event_id().is_some());
        assert_eq!(events[0].timestamp(), Some(test_clock().now()));
        assert_eq!(account.pending_events(), 0);
    }

    #[test]
    fn test_account_created_records_member_type() {
        let event = AccountCreated::new(4, "Ada", &test_clock());
        assert!(event.member_type().unwrap().ends_with("AccountCreated"));
        assert!(event.event_id().is_some());
    }
}
