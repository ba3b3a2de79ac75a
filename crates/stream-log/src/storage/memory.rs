// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Bucket, BucketKey, QueryResult, RecordQuery, Storage};
use crate::error::StorageError;
use crate::record::{EventRecord, NewRecord, RecordId};

/// Append-only in-process storage.
///
/// Ids start at 1 and increase by one per insert.
#[derive(Debug, Default)]
pub struct MemoryStorage {
	records: RwLock<Vec<EventRecord>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.records.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.read().is_empty()
	}

	pub fn get(&self, id: RecordId) -> Option<EventRecord> {
		self.records.read().iter().find(|r| r.id == id).cloned()
	}
}

#[async_trait]
impl Storage for MemoryStorage {
	async fn insert(&self, record: NewRecord) -> Result<RecordId, StorageError> {
		let mut records = self.records.write();
		let id = RecordId::new(records.len() as i64 + 1);
		records.push(EventRecord::new(id, record));
		Ok(id)
	}

	async fn query(&self, query: &RecordQuery) -> Result<QueryResult, StorageError> {
		let records = self.records.read();
		let mut matching: Vec<&EventRecord> =
			records.iter().filter(|r| query.filter.matches(r)).collect();

		matching.sort_by(|a, b| {
			b.record
				.created_at
				.cmp(&a.record.created_at)
				.then_with(|| b.id.cmp(&a.id))
		});

		let mut aggregations = BTreeMap::new();
		for facet in &query.aggregations {
			let mut counts: BTreeMap<BucketKey, i64> = BTreeMap::new();
			for record in &matching {
				*counts.entry(facet.key_of(record)).or_default() += 1;
			}
			let buckets = counts
				.into_iter()
				.map(|(key, count)| Bucket { key, count })
				.collect();
			aggregations.insert(*facet, buckets);
		}

		let total = matching.len() as i64;
		let page = matching
			.into_iter()
			.skip(query.effective_offset() as usize)
			.take(query.effective_limit() as usize)
			.cloned()
			.collect();

		Ok(QueryResult {
			records: page,
			total,
			aggregations,
		})
	}
}
