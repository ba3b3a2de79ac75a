// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage boundary for records.
//!
//! Storage assigns ids, keeps records append-only and answers filtered
//! queries with optional aggregation buckets. [`memory::MemoryStorage`] is an
//! in-process implementation; the SQLite one lives in `stream-log-db`.

pub mod memory;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::record::{ActorId, EventRecord, NewRecord, RecordId};
use crate::scope::{TenantGroupId, TenantId};

pub use memory::MemoryStorage;

pub const DEFAULT_QUERY_LIMIT: i64 = 50;
pub const MAX_QUERY_LIMIT: i64 = 1000;

#[async_trait]
pub trait Storage: Send + Sync {
	/// Persists a record and returns its newly assigned id.
	async fn insert(&self, record: NewRecord) -> Result<RecordId, StorageError>;

	/// Returns matching records, newest first, with requested aggregations.
	async fn query(&self, query: &RecordQuery) -> Result<QueryResult, StorageError>;
}

/// Record property a query can aggregate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
	TenantId,
	Connector,
	Context,
	Action,
	ActorId,
}

impl Facet {
	pub fn column(&self) -> &'static str {
		match self {
			Facet::TenantId => "tenant_id",
			Facet::Connector => "connector",
			Facet::Context => "context",
			Facet::Action => "action",
			Facet::ActorId => "actor_id",
		}
	}

	pub fn all() -> &'static [Facet] {
		&[
			Facet::TenantId,
			Facet::Connector,
			Facet::Context,
			Facet::Action,
			Facet::ActorId,
		]
	}

	/// Bucket key of `record` for this facet.
	pub fn key_of(&self, record: &EventRecord) -> BucketKey {
		let r = &record.record;
		match self {
			Facet::TenantId => BucketKey::Int(r.tenant_id),
			Facet::Connector => BucketKey::Text(r.connector.clone()),
			Facet::Context => BucketKey::Text(r.context.clone()),
			Facet::Action => BucketKey::Text(r.action.clone()),
			Facet::ActorId => BucketKey::Int(r.actor_id.into_inner()),
		}
	}
}

impl fmt::Display for Facet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.column())
	}
}

impl std::str::FromStr for Facet {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Facet::all()
			.iter()
			.copied()
			.find(|f| f.column() == s)
			.ok_or_else(|| format!("unknown facet '{s}'"))
	}
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BucketKey {
	Int(i64),
	Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
	pub key: BucketKey,
	pub count: i64,
}

/// Property filter; every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
	pub tenant_group_id: Option<TenantGroupId>,
	pub tenant_id: Option<TenantId>,
	pub connector: Option<String>,
	pub context: Option<String>,
	pub action: Option<String>,
	pub actor_id: Option<ActorId>,
	pub object_id: Option<i64>,
	pub parent_id: Option<RecordId>,
	pub created_from: Option<DateTime<Utc>>,
	pub created_to: Option<DateTime<Utc>>,
	/// Case-insensitive substring of the summary.
	pub search: Option<String>,
}

impl RecordFilter {
	pub fn matches(&self, record: &EventRecord) -> bool {
		let r = &record.record;
		self.tenant_group_id.map_or(true, |v| r.tenant_group_id == v)
			&& self.tenant_id.map_or(true, |v| r.tenant_id == v)
			&& self.connector.as_deref().map_or(true, |v| r.connector == v)
			&& self.context.as_deref().map_or(true, |v| r.context == v)
			&& self.action.as_deref().map_or(true, |v| r.action == v)
			&& self.actor_id.map_or(true, |v| r.actor_id == v)
			&& self.object_id.map_or(true, |v| r.object_id == Some(v))
			&& self.parent_id.map_or(true, |v| r.parent_id == Some(v))
			&& self.created_from.map_or(true, |v| r.created_at >= v)
			&& self.created_to.map_or(true, |v| r.created_at <= v)
			&& self
				.search
				.as_deref()
				.map_or(true, |v| r.summary.to_lowercase().contains(&v.to_lowercase()))
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordQuery {
	pub filter: RecordFilter,
	pub aggregations: Vec<Facet>,
	pub limit: Option<i64>,
	pub offset: Option<i64>,
}

impl RecordQuery {
	pub fn new(filter: RecordFilter) -> Self {
		Self {
			filter,
			..Default::default()
		}
	}

	/// Adds an aggregation unless it is already requested.
	pub fn aggregate(&mut self, facet: Facet) {
		if !self.aggregations.contains(&facet) {
			self.aggregations.push(facet);
		}
	}

	pub fn effective_limit(&self) -> i64 {
		self.limit
			.unwrap_or(DEFAULT_QUERY_LIMIT)
			.clamp(1, MAX_QUERY_LIMIT)
	}

	pub fn effective_offset(&self) -> i64 {
		self.offset.unwrap_or(0).max(0)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
	pub records: Vec<EventRecord>,
	/// Matching records before pagination.
	pub total: i64,
	pub aggregations: BTreeMap<Facet, Vec<Bucket>>,
}

impl QueryResult {
	pub fn buckets(&self, facet: Facet) -> &[Bucket] {
		self.aggregations
			.get(&facet)
			.map(Vec::as_slice)
			.unwrap_or(&[])
	}

	pub fn has_bucket(&self, facet: Facet, key: &BucketKey) -> bool {
		self.buckets(facet).iter().any(|b| &b.key == key)
	}
}
