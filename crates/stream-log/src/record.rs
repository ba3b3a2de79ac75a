// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Record model for the activity stream.
//!
//! - [`EventArgs`]: ordered, key-unique arguments supplied by a connector
//! - [`LogRequest`]: a validated request to record one event
//! - [`NewRecord`]: a fully assembled record awaiting an id from storage
//! - [`EventRecord`]: a stored, immutable record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::LogError;
use crate::scope::{TenantGroupId, TenantId};

/// Key under which the actor snapshot is stored in a record's meta.
pub const ACTOR_META_KEY: &str = "actor_meta";

/// Storage-assigned identifier of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
	pub fn new(id: i64) -> Self {
		Self(id)
	}

	pub fn into_inner(self) -> i64 {
		self.0
	}
}

impl fmt::Display for RecordId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<i64> for RecordId {
	fn from(id: i64) -> Self {
		Self(id)
	}
}

/// Identity of the principal responsible for an event.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ActorId(i64);

impl ActorId {
	/// Unattributed events (cron, background work, anonymous requests).
	pub const SYSTEM: ActorId = ActorId(0);

	pub fn new(id: i64) -> Self {
		Self(id)
	}

	pub fn into_inner(self) -> i64 {
		self.0
	}

	pub fn is_system(&self) -> bool {
		self.0 == 0
	}
}

impl fmt::Display for ActorId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<i64> for ActorId {
	fn from(id: i64) -> Self {
		Self(id)
	}
}

/// Ordered event arguments with unique keys.
///
/// Order matters: unnumbered summary placeholders consume values in
/// insertion order. Inserting an existing key replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventArgs {
	entries: Vec<(String, Value)>,
}

impl EventArgs {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
		let key = key.into();
		let value = value.into();
		match self.entries.iter_mut().find(|(k, _)| *k == key) {
			Some((_, existing)) => *existing = value,
			None => self.entries.push((key, value)),
		}
	}

	pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.insert(key, value);
		self
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
	}

	pub fn contains_non_null(&self, key: &str) -> bool {
		self.get(key).is_some_and(|v| !v.is_null())
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn values(&self) -> impl Iterator<Item = &Value> {
		self.entries.iter().map(|(_, v)| v)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Converts into record meta, dropping null-valued entries.
	pub fn into_meta(self) -> Map<String, Value> {
		self.entries
			.into_iter()
			.filter(|(_, v)| !v.is_null())
			.collect()
	}
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for EventArgs {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut args = EventArgs::new();
		for (k, v) in iter {
			args.insert(k, v);
		}
		args
	}
}

/// A request to record one event, as issued by a connector.
#[derive(Debug, Clone)]
pub struct LogRequest {
	pub connector: String,
	pub message: String,
	pub args: EventArgs,
	pub object_id: Option<i64>,
	pub context: String,
	pub action: String,
	/// Responsible actor; `None` means the ambient authenticated caller.
	pub actor_id: Option<ActorId>,
}

impl LogRequest {
	pub fn builder(connector: impl Into<String>, action: impl Into<String>) -> LogRequestBuilder {
		LogRequestBuilder::new(connector, action)
	}

	/// Checks the fields every record needs.
	pub fn validate(&self) -> Result<(), LogError> {
		if self.connector.trim().is_empty() {
			return Err(LogError::InvalidRecord("connector must not be empty".into()));
		}
		if self.action.trim().is_empty() {
			return Err(LogError::InvalidRecord("action must not be empty".into()));
		}
		Ok(())
	}

	/// Whether the caller already supplied a prebuilt actor snapshot.
	pub fn has_actor_snapshot(&self) -> bool {
		self.args.contains_non_null(ACTOR_META_KEY)
	}
}

/// Fluent construction of a [`LogRequest`].
#[derive(Debug, Clone)]
pub struct LogRequestBuilder {
	connector: String,
	action: String,
	message: String,
	args: EventArgs,
	object_id: Option<i64>,
	context: Option<String>,
	actor_id: Option<ActorId>,
}

impl LogRequestBuilder {
	pub fn new(connector: impl Into<String>, action: impl Into<String>) -> Self {
		Self {
			connector: connector.into(),
			action: action.into(),
			message: String::new(),
			args: EventArgs::new(),
			object_id: None,
			context: None,
			actor_id: None,
		}
	}

	pub fn message(mut self, message: impl Into<String>) -> Self {
		self.message = message.into();
		self
	}

	pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.args.insert(key, value);
		self
	}

	pub fn args(mut self, args: EventArgs) -> Self {
		self.args = args;
		self
	}

	pub fn object_id(mut self, object_id: i64) -> Self {
		self.object_id = Some(object_id);
		self
	}

	/// Defaults to the connector name.
	pub fn context(mut self, context: impl Into<String>) -> Self {
		self.context = Some(context.into());
		self
	}

	pub fn actor(mut self, actor_id: ActorId) -> Self {
		self.actor_id = Some(actor_id);
		self
	}

	pub fn build(self) -> Result<LogRequest, LogError> {
		let request = LogRequest {
			context: self.context.unwrap_or_else(|| self.connector.clone()),
			connector: self.connector,
			message: self.message,
			args: self.args,
			object_id: self.object_id,
			action: self.action,
			actor_id: self.actor_id,
		};
		request.validate()?;
		Ok(request)
	}
}

/// A fully assembled record that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
	pub object_id: Option<i64>,
	pub tenant_group_id: TenantGroupId,
	pub tenant_id: TenantId,
	pub actor_id: ActorId,
	pub actor_role: Option<String>,
	pub created_at: DateTime<Utc>,
	pub summary: String,
	pub parent_id: Option<RecordId>,
	pub connector: String,
	pub context: String,
	pub action: String,
	pub meta: Map<String, Value>,
	pub source_ip: Option<String>,
}

impl NewRecord {
	/// Removes null-valued meta entries that transforms may have added.
	pub fn normalize_meta(&mut self) {
		self.meta.retain(|_, v| !v.is_null());
	}
}

/// A stored record. Records are append-only and never change once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
	pub id: RecordId,
	#[serde(flatten)]
	pub record: NewRecord,
}

impl EventRecord {
	pub fn new(id: RecordId, record: NewRecord) -> Self {
		Self { id, record }
	}

	pub fn actor_meta(&self) -> Option<&Value> {
		self.record.meta.get(ACTOR_META_KEY)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use serde_json::json;

	mod event_args {
		use super::*;

		#[test]
		fn preserves_insertion_order() {
			let args = EventArgs::new()
				.with("title", "Hello")
				.with("status", "publish")
				.with("id", 4);
			let values: Vec<&Value> = args.values().collect();
			assert_eq!(values, vec![&json!("Hello"), &json!("publish"), &json!(4)]);
		}

		#[test]
		fn reinsert_replaces_in_place() {
			let args = EventArgs::new()
				.with("a", 1)
				.with("b", 2)
				.with("a", 3);
			assert_eq!(args.len(), 2);
			let keys: Vec<&str> = args.iter().map(|(k, _)| k).collect();
			assert_eq!(keys, vec!["a", "b"]);
			assert_eq!(args.get("a"), Some(&json!(3)));
		}

		#[test]
		fn into_meta_drops_nulls() {
			let args = EventArgs::new()
				.with("kept", "yes")
				.with("dropped", Value::Null)
				.with("zero", 0);
			let meta = args.into_meta();
			assert_eq!(meta.len(), 2);
			assert!(!meta.contains_key("dropped"));
			assert_eq!(meta["zero"], json!(0));
		}

		#[test]
		fn null_actor_snapshot_does_not_count() {
			let args = EventArgs::new().with(ACTOR_META_KEY, Value::Null);
			assert!(!args.contains_non_null(ACTOR_META_KEY));
		}
	}

	mod log_request {
		use super::*;

		#[test]
		fn context_defaults_to_connector() {
			let request = LogRequest::builder("posts", "updated").build().unwrap();
			assert_eq!(request.context, "posts");
			assert!(request.actor_id.is_none());
			assert!(request.object_id.is_none());
		}

		#[test]
		fn rejects_empty_connector() {
			let err = LogRequest::builder("  ", "updated").build().unwrap_err();
			assert!(matches!(err, LogError::InvalidRecord(_)));
		}

		#[test]
		fn rejects_empty_action() {
			let err = LogRequest::builder("posts", "").build().unwrap_err();
			assert!(matches!(err, LogError::InvalidRecord(_)));
		}

		#[test]
		fn detects_prebuilt_actor_snapshot() {
			let request = LogRequest::builder("users", "login")
				.arg(ACTOR_META_KEY, json!({"login": "admin"}))
				.build()
				.unwrap();
			assert!(request.has_actor_snapshot());
		}
	}

	mod event_record {
		use super::*;

		fn sample() -> NewRecord {
			NewRecord {
				object_id: Some(12),
				tenant_group_id: 1,
				tenant_id: 3,
				actor_id: ActorId::new(7),
				actor_role: Some("editor".into()),
				created_at: Utc::now(),
				summary: "\"Hello\" post updated".into(),
				parent_id: None,
				connector: "posts".into(),
				context: "post".into(),
				action: "updated".into(),
				meta: Map::new(),
				source_ip: Some("10.0.0.1".into()),
			}
		}

		#[test]
		fn serializes_flat() {
			let record = EventRecord::new(RecordId::new(5), sample());
			let json = serde_json::to_value(&record).unwrap();
			assert_eq!(json["id"], json!(5));
			assert_eq!(json["connector"], json!("posts"));
			assert_eq!(json["actor_id"], json!(7));
		}

		#[test]
		fn normalize_meta_removes_nulls() {
			let mut record = sample();
			record.meta.insert("a".into(), Value::Null);
			record.meta.insert("b".into(), json!("x"));
			record.normalize_meta();
			assert_eq!(record.meta.len(), 1);
		}
	}

	proptest! {
		#[test]
		fn meta_never_contains_null(entries in proptest::collection::vec(("[a-z]{1,6}", proptest::option::of(any::<i64>())), 0..20)) {
			let args: EventArgs = entries
				.into_iter()
				.map(|(k, v)| (k, v.map(Value::from).unwrap_or(Value::Null)))
				.collect();
			let meta = args.into_meta();
			prop_assert!(meta.values().all(|v| !v.is_null()));
		}
	}
}
