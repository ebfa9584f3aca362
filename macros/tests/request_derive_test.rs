//! Tests for the request derive macros

#![allow(clippy::unwrap_used)]

use courier_core::command::Command;
use courier_core::domain::DomainEvent;
use courier_core::handler::{
    FireForgetActivator, FireForgetRegistry, HandlerFactory, Outcome, RequestReplyActivatorExt,
    RequestReplyRegistry,
};
use courier_core::integration::IntegrationEvent;
use courier_core::metadata::Metadata;
use courier_core::query::{AnyQuery, Query};
use courier_core::request::{Request, RequestExt};
use courier_macros::{Command, DomainEvent, IntegrationEvent, Query};
use std::any::TypeId;

#[derive(Command, Clone, Debug)]
struct RenameTodo {
    title: String,
    metadata: Metadata,
}

#[derive(DomainEvent, Clone, Debug)]
struct TodoRenamed {
    title: String,
    #[metadata]
    headers: Metadata,
}

#[derive(IntegrationEvent, Clone, Debug)]
struct TodoPublished {
    id: u32,
    metadata: Metadata,
}

#[derive(Query, Clone, Debug)]
#[query(output = Option<String>)]
struct FindTodo {
    id: u32,
    metadata: Metadata,
}

#[derive(Command, Clone, Debug)]
struct Wrapped<T: std::fmt::Debug + Send + Sync + 'static> {
    inner: T,
    metadata: Metadata,
}

fn is_command<T: Command>(_: &T) -> bool {
    true
}

fn is_domain_event<T: DomainEvent>(_: &T) -> bool {
    true
}

fn is_integration_event<T: IntegrationEvent>(_: &T) -> bool {
    true
}

#[test]
fn test_command_derive() {
    let command = RenameTodo {
        title: "Buy milk".to_string(),
        metadata: Metadata::new(),
    }
    .with_correlation_id("c-1");

    assert!(is_command(&command));
    assert_eq!(command.correlation_id(), Some("c-1"));
    assert_eq!(command.request_short_name(), "RenameTodo");
    assert_eq!(command.request_type_id(), TypeId::of::<RenameTodo>());
    assert_eq!(command.title, "Buy milk");
}

#[test]
fn test_marked_metadata_field() {
    let mut event = TodoRenamed {
        title: "Buy oat milk".to_string(),
        headers: Metadata::new(),
    };
    event.metadata_mut().insert("tenant", "acme").unwrap();

    assert!(is_domain_event(&event));
    assert_eq!(event.headers.get_str("tenant"), Some("acme"));
    assert_eq!(event.title, "Buy oat milk");
}

#[test]
fn test_integration_event_derive() {
    let event = TodoPublished {
        id: 7,
        metadata: Metadata::new(),
    }
    .with_member_type::<TodoPublished>();

    assert!(is_integration_event(&event));
    assert!(event.member_type().unwrap().ends_with("TodoPublished"));
    assert_eq!(event.id, 7);
}

#[test]
fn test_generic_command_derive() {
    let command = Wrapped {
        inner: 3_u8,
        metadata: Metadata::new(),
    };

    assert!(is_command(&command));
    assert_eq!(command.request_short_name(), "Wrapped<u8>");
    assert_eq!(command.inner, 3);
}

#[test]
fn test_query_output_type() {
    fn output_of<Q: Query>(_: &Q) -> TypeId {
        TypeId::of::<Q::Output>()
    }

    let query = FindTodo {
        id: 1,
        metadata: Metadata::new(),
    };
    assert_eq!(output_of(&query), TypeId::of::<Option<String>>());

    let delegates = HandlerFactory::request_reply::<dyn AnyQuery>(|registry| {
        registry.register(|query: &FindTodo| Ok((query.id == 1).then(|| "todo".to_string())));
    });
    assert_eq!(
        delegates.try_invoke::<Option<String>>(&query).unwrap(),
        Outcome::Succeeded(Some("todo".to_string()))
    );
}

#[test]
fn test_derived_commands_route_by_type() {
    let delegates = HandlerFactory::fire_forget::<dyn Command>(|registry| {
        registry.register(|_: &RenameTodo| Ok(()));
    });

    let rename = RenameTodo {
        title: String::new(),
        metadata: Metadata::new(),
    };
    let wrapped = Wrapped {
        inner: (),
        metadata: Metadata::new(),
    };

    let activator: &dyn FireForgetActivator<dyn Command> = &delegates;
    assert!(activator.try_invoke(&rename).unwrap());
    assert!(!activator.try_invoke(&wrapped).unwrap());
}
