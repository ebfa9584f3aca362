//! The request model shared by commands, events and queries.
//!
//! Every message Courier routes is a [`Request`]: a `'static` value that
//! carries a [`Metadata`] bag and can report its own concrete type at runtime.
//! Routing is always keyed by that concrete type, never by a supertype, so a
//! handler registered for `CreateAccount` is never offered any other request.
//!
//! Requests are grouped into kinds. A kind is a marker trait over `Request`
//! (for example [`Command`](crate::command::Command)), and the trait object of
//! that kind (`dyn Command`) implements [`RequestKind`]. Registries and
//! dispatchers are parameterised by the kind object type, which keeps a
//! command registry from ever accepting a query.

use crate::environment::Clock;
use crate::metadata::{Metadata, keys};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::any::{Any, TypeId};
use std::fmt::Debug;

/// Runtime type information for a request.
///
/// Implemented for every `'static` type, so it never needs a manual impl.
/// The methods go through the vtable when called on a trait object and
/// therefore describe the concrete type behind it.
pub trait Reflect: Any {
    /// The value as [`Any`], for downcasting to its concrete type.
    fn as_any(&self) -> &dyn Any;

    /// The fully qualified name of the concrete type.
    fn request_type_name(&self) -> &'static str;
}

impl<T: Any> Reflect for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn request_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A message with a metadata bag.
///
/// # Examples
///
/// ```
/// use courier_core::metadata::Metadata;
/// use courier_core::request::{Reflect, Request};
///
/// #[derive(Debug)]
/// struct Ping {
///     metadata: Metadata,
/// }
///
/// impl Request for Ping {
///     fn metadata(&self) -> &Metadata {
///         &self.metadata
///     }
///
///     fn metadata_mut(&mut self) -> &mut Metadata {
///         &mut self.metadata
///     }
/// }
///
/// let ping = Ping { metadata: Metadata::new() };
/// assert!(ping.request_type_name().ends_with("Ping"));
/// ```
pub trait Request: Reflect + Debug + Send + Sync + 'static {
    /// Metadata attached to this request.
    fn metadata(&self) -> &Metadata;

    /// Mutable access to the metadata attached to this request.
    fn metadata_mut(&mut self) -> &mut Metadata;

    /// The [`TypeId`] of the concrete request type.
    fn request_type_id(&self) -> TypeId {
        self.as_any().type_id()
    }

    /// The unqualified name of the concrete request type, e.g. `CreateAccount`.
    fn request_short_name(&self) -> &'static str {
        short_type_name(self.request_type_name())
    }
}

/// A request kind, implemented for the kind's trait object type.
///
/// `NAME` is the human-readable kind used in errors, logs and metric labels.
pub trait RequestKind: Request {
    /// Kind name, e.g. `"Command"`.
    const NAME: &'static str;
}

/// Marks `Self` as a request of kind `K`.
///
/// Blanket-implemented for every type that implements the kind trait, so
/// registries can require `T: Member<dyn Command>` for "any concrete command".
pub trait Member<K: ?Sized + RequestKind>: Request + Sized {}

/// Strips the module path and generic arguments' paths from a type name.
#[must_use]
pub fn short_type_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(index) => &full[index + 2..],
        None => full,
    }
}

/// Convenience accessors for the reserved metadata entries.
///
/// Getters are available on any request, including trait objects. The
/// consuming `with_*` setters are chainable at construction time:
///
/// ```
/// use courier_core::metadata::Metadata;
/// use courier_core::request::{Request, RequestExt};
///
/// #[derive(Debug)]
/// struct Ping {
///     metadata: Metadata,
/// }
///
/// impl Request for Ping {
///     fn metadata(&self) -> &Metadata {
///         &self.metadata
///     }
///
///     fn metadata_mut(&mut self) -> &mut Metadata {
///         &mut self.metadata
///     }
/// }
///
/// let ping = Ping { metadata: Metadata::new() }
///     .with_correlation_id("c-1")
///     .with_causation_id("c-0");
/// assert_eq!(ping.correlation_id(), Some("c-1"));
/// assert_eq!(ping.causation_id(), Some("c-0"));
/// ```
pub trait RequestExt: Request {
    /// The correlation id, if one was set.
    fn correlation_id(&self) -> Option<&str> {
        self.metadata().get_str(keys::CORRELATION_ID)
    }

    /// The causation id, if one was set.
    fn causation_id(&self) -> Option<&str> {
        self.metadata().get_str(keys::CAUSATION_ID)
    }

    /// The event id, if one was set.
    fn event_id(&self) -> Option<&str> {
        self.metadata().get_str(keys::EVENT_ID)
    }

    /// The member type recorded for integration events.
    fn member_type(&self) -> Option<&str> {
        self.metadata().get_str(keys::MEMBER_TYPE)
    }

    /// The timestamp, if one was set and parses as RFC 3339.
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.metadata().get_str(keys::TIMESTAMP)?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|at| at.with_timezone(&Utc))
    }

    /// Sets the correlation id.
    #[must_use]
    fn with_correlation_id(mut self, id: impl Into<String>) -> Self
    where
        Self: Sized,
    {
        self.metadata_mut()
            .set_reserved(keys::CORRELATION_ID, Value::String(id.into()));
        self
    }

    /// Sets the causation id.
    #[must_use]
    fn with_causation_id(mut self, id: impl Into<String>) -> Self
    where
        Self: Sized,
    {
        self.metadata_mut()
            .set_reserved(keys::CAUSATION_ID, Value::String(id.into()));
        self
    }

    /// Sets the event id.
    #[must_use]
    fn with_event_id(mut self, id: impl Into<String>) -> Self
    where
        Self: Sized,
    {
        self.metadata_mut()
            .set_reserved(keys::EVENT_ID, Value::String(id.into()));
        self
    }

    /// Sets the timestamp.
    #[must_use]
    fn with_timestamp(mut self, at: DateTime<Utc>) -> Self
    where
        Self: Sized,
    {
        self.metadata_mut().set_reserved(
            keys::TIMESTAMP,
            Value::String(at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );
        self
    }

    /// Stamps the timestamp from `clock`.
    #[must_use]
    fn with_timestamp_from(self, clock: &dyn Clock) -> Self
    where
        Self: Sized,
    {
        self.with_timestamp(clock.now())
    }

    /// Records `T` as the member type.
    #[must_use]
    fn with_member_type<T: ?Sized>(mut self) -> Self
    where
        Self: Sized,
    {
        self.metadata_mut().set_reserved(
            keys::MEMBER_TYPE,
            Value::String(std::any::type_name::<T>().to_owned()),
        );
        self
    }

    /// Copies every entry of `source`'s metadata that this request lacks.
    ///
    /// Existing entries are never overwritten.
    #[must_use]
    fn merge_metadata<S: Request + ?Sized>(mut self, source: &S) -> Self
    where
        Self: Sized,
    {
        self.metadata_mut().merge_missing(source.metadata());
        self
    }
}

impl<R: Request + ?Sized> RequestExt for R {}
