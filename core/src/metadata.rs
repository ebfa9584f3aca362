//! Request metadata.
//!
//! A [`Metadata`] bag is a string-keyed map of JSON values attached to every
//! request. A small set of keys is reserved for values that Courier and its
//! callers give a fixed meaning (see [`keys`]); those can only be written
//! through the typed setters on [`RequestExt`](crate::request::RequestExt) or
//! the event constructors below.

use crate::environment::Clock;
use crate::error::MetadataError;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::collections::hash_map;

/// Reserved metadata keys.
pub mod keys {
    /// Identifier shared by every request that belongs to one logical operation.
    pub const CORRELATION_ID: &str = "correlationId";
    /// Identifier of the request that caused this one.
    pub const CAUSATION_ID: &str = "causationId";
    /// Unique identifier of an event.
    pub const EVENT_ID: &str = "eventId";
    /// RFC 3339 timestamp of when the request was created.
    pub const TIMESTAMP: &str = "timestamp";
    /// Fully qualified type name of an integration event.
    pub const MEMBER_TYPE: &str = "memberType";

    /// All reserved keys.
    pub const RESERVED: [&str; 5] = [CORRELATION_ID, CAUSATION_ID, EVENT_ID, TIMESTAMP, MEMBER_TYPE];
}

/// String-keyed metadata attached to a request.
///
/// # Examples
///
/// ```
/// use courier_core::metadata::{Metadata, keys};
///
/// let mut metadata = Metadata::new();
/// metadata.insert("tenant", "acme").unwrap();
/// assert_eq!(metadata.get_str("tenant"), Some("acme"));
///
/// // Reserved keys are rejected by `insert`.
/// assert!(metadata.insert(keys::CORRELATION_ID, "c-1").is_err());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    entries: HashMap<String, Value>,
}

impl Metadata {
    /// Creates an empty metadata bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata for a new domain event: a fresh event id and a timestamp.
    #[must_use]
    pub fn for_domain_event(clock: &dyn Clock) -> Self {
        let mut metadata = Self::new();
        metadata.stamp_event(clock);
        metadata
    }

    /// Metadata for a new integration event of type `T`: a fresh event id,
    /// a timestamp and the member type.
    #[must_use]
    pub fn for_integration_event<T: ?Sized>(clock: &dyn Clock) -> Self {
        let mut metadata = Self::for_domain_event(clock);
        metadata.set_reserved(
            keys::MEMBER_TYPE,
            Value::String(std::any::type_name::<T>().to_owned()),
        );
        metadata
    }

    fn stamp_event(&mut self, clock: &dyn Clock) {
        let event_id = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = clock.now().to_rfc3339_opts(SecondsFormat::AutoSi, true);
        self.set_reserved(keys::EVENT_ID, Value::String(event_id));
        self.set_reserved(keys::TIMESTAMP, Value::String(timestamp));
    }

    /// Whether `key` is one of the reserved [`keys`].
    #[must_use]
    pub fn is_reserved(key: &str) -> bool {
        keys::RESERVED.contains(&key)
    }

    /// Inserts a caller-defined entry, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::ReservedKey`] when `key` is reserved.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, MetadataError> {
        let key = key.into();
        if Self::is_reserved(&key) {
            return Err(MetadataError::ReservedKey(key));
        }
        Ok(self.entries.insert(key, value.into()))
    }

    pub(crate) fn set_reserved(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_owned(), value);
    }

    /// The value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// The value stored under `key` when it is a string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    /// Removes and returns the value stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Whether an entry exists for `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all entries in arbitrary order.
    pub fn iter(&self) -> hash_map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    /// Copies every entry of `other` whose key is absent here.
    pub fn merge_missing(&mut self, other: &Self) {
        for (key, value) in &other.entries {
            self.entries
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

impl<'a> IntoIterator for &'a Metadata {
    type Item = (&'a String, &'a Value);
    type IntoIter = hash_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;

    struct Pinned(DateTime<Utc>);

    impl Clock for Pinned {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[test]
    fn insert_rejects_every_reserved_key() {
        let mut metadata = Metadata::new();
        for key in keys::RESERVED {
            assert_eq!(
                metadata.insert(key, "value"),
                Err(MetadataError::ReservedKey(key.to_owned()))
            );
        }
        assert!(metadata.is_empty());
    }

    #[test]
    fn insert_returns_previous_value() {
        let mut metadata = Metadata::new();
        assert_eq!(metadata.insert("tenant", "a").unwrap(), None);
        assert_eq!(
            metadata.insert("tenant", "b").unwrap(),
            Some(Value::from("a"))
        );
        assert_eq!(metadata.get_str("tenant"), Some("b"));
    }

    #[test]
    fn domain_event_metadata_has_id_and_timestamp() {
        let clock = Pinned(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let metadata = Metadata::for_domain_event(&clock);

        let event_id = metadata.get_str(keys::EVENT_ID).unwrap();
        assert_eq!(event_id.len(), 32);
        assert!(event_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(metadata.get_str(keys::TIMESTAMP), Some("2024-01-01T00:00:00Z"));
        assert!(!metadata.contains_key(keys::MEMBER_TYPE));
    }

    #[test]
    fn integration_event_metadata_records_member_type() {
        let clock = Pinned(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let metadata = Metadata::for_integration_event::<Pinned>(&clock);

        assert_eq!(
            metadata.get_str(keys::MEMBER_TYPE),
            Some(std::any::type_name::<Pinned>())
        );
        assert!(metadata.contains_key(keys::EVENT_ID));
    }

    #[test]
    fn event_ids_are_unique() {
        let clock = Pinned(Utc::now());
        let first = Metadata::for_domain_event(&clock);
        let second = Metadata::for_domain_event(&clock);
        assert_ne!(first.get(keys::EVENT_ID), second.get(keys::EVENT_ID));
    }

    #[test]
    fn serializes_as_a_plain_map() {
        let mut metadata = Metadata::new();
        metadata.insert("tenant", "acme").unwrap();

        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(json, r#"{"tenant":"acme"}"#);
        assert_eq!(serde_json::from_str::<Metadata>(&json).unwrap(), metadata);
    }

    proptest! {
        #[test]
        fn merge_missing_never_overwrites(
            ours in proptest::collection::hash_map("[a-z]{1,4}", any::<i64>(), 0..8),
            theirs in proptest::collection::hash_map("[a-z]{1,4}", any::<i64>(), 0..8),
        ) {
            let mut target = Metadata::new();
            for (key, value) in &ours {
                target.insert(key.clone(), *value).unwrap();
            }
            let mut source = Metadata::new();
            for (key, value) in &theirs {
                source.insert(key.clone(), *value).unwrap();
            }

            target.merge_missing(&source);

            for (key, value) in &ours {
                prop_assert_eq!(target.get(key), Some(&Value::from(*value)));
            }
            for key in theirs.keys() {
                prop_assert!(target.contains_key(key));
            }
        }
    }
}
