// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool, SqliteRow};
use sqlx::Row;
use stream_log::{
	ActorId, Bucket, BucketKey, EventRecord, Facet, NewRecord, QueryResult, RecordFilter,
	RecordId, RecordQuery, Storage, StorageError,
};

use crate::error::{DbError, Result};

const RECORD_COLUMNS: &str = "id, object_id, tenant_group_id, tenant_id, actor_id, actor_role, \
	created_at, summary, parent_id, connector, context, action, source_ip";

enum Bind {
	Int(i64),
	Text(String),
}

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_all<'q>(mut query: SqliteQuery<'q>, binds: &[Bind]) -> SqliteQuery<'q> {
	for bind in binds {
		query = match bind {
			Bind::Int(v) => query.bind(*v),
			Bind::Text(v) => query.bind(v.clone()),
		};
	}
	query
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn format_timestamp(ts: DateTime<Utc>) -> String {
	ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(raw)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("invalid timestamp '{raw}': {e}")))
}

fn escape_like(s: &str) -> String {
	let mut out = String::with_capacity(s.len());
	for c in s.chars() {
		if matches!(c, '%' | '_' | '\\') {
			out.push('\\');
		}
		out.push(c);
	}
	out
}

fn where_clause(filter: &RecordFilter) -> (String, Vec<Bind>) {
	let mut conditions = vec!["1=1".to_string()];
	let mut binds = Vec::new();

	let mut int = |column: &str, value: Option<i64>| {
		if let Some(v) = value {
			conditions.push(format!("{column} = ?"));
			binds.push(Bind::Int(v));
		}
	};
	int("tenant_group_id", filter.tenant_group_id);
	int("tenant_id", filter.tenant_id);
	int("actor_id", filter.actor_id.map(ActorId::into_inner));
	int("object_id", filter.object_id);
	int("parent_id", filter.parent_id.map(RecordId::into_inner));

	for (column, value) in [
		("connector", &filter.connector),
		("context", &filter.context),
		("action", &filter.action),
	] {
		if let Some(v) = value {
			conditions.push(format!("{column} = ?"));
			binds.push(Bind::Text(v.clone()));
		}
	}

	if let Some(v) = filter.created_from {
		conditions.push("created_at >= ?".to_string());
		binds.push(Bind::Text(format_timestamp(v)));
	}
	if let Some(v) = filter.created_to {
		conditions.push("created_at <= ?".to_string());
		binds.push(Bind::Text(format_timestamp(v)));
	}
	if let Some(v) = &filter.search {
		conditions.push("summary LIKE ? ESCAPE '\\'".to_string());
		binds.push(Bind::Text(format!("%{}%", escape_like(v))));
	}

	(conditions.join(" AND "), binds)
}

fn record_from_row(row: &SqliteRow) -> Result<EventRecord> {
	let created_at: String = row.try_get("created_at")?;
	let parent_id: Option<i64> = row.try_get("parent_id")?;

	Ok(EventRecord::new(
		RecordId::new(row.try_get("id")?),
		NewRecord {
			object_id: row.try_get("object_id")?,
			tenant_group_id: row.try_get("tenant_group_id")?,
			tenant_id: row.try_get("tenant_id")?,
			actor_id: ActorId::new(row.try_get("actor_id")?),
			actor_role: row.try_get("actor_role")?,
			created_at: parse_timestamp(&created_at)?,
			summary: row.try_get("summary")?,
			parent_id: parent_id.map(RecordId::new),
			connector: row.try_get("connector")?,
			context: row.try_get("context")?,
			action: row.try_get("action")?,
			meta: Map::new(),
			source_ip: row.try_get("source_ip")?,
		},
	))
}

fn bucket_key(facet: Facet, row: &SqliteRow) -> Result<BucketKey> {
	Ok(match facet {
		Facet::TenantId | Facet::ActorId => BucketKey::Int(row.try_get("bucket")?),
		Facet::Connector | Facet::Context | Facet::Action => BucketKey::Text(row.try_get("bucket")?),
	})
}

/// Record storage in `stream_records`, with meta rows in `stream_meta`.
#[derive(Clone)]
pub struct SqliteStorage {
	pool: SqlitePool,
}

impl SqliteStorage {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, record), fields(connector = %record.connector, action = %record.action))]
	pub async fn insert_record(&self, record: &NewRecord) -> Result<RecordId> {
		let mut tx = self.pool.begin().await?;

		let result = sqlx::query(
			r#"
			INSERT INTO stream_records (
				object_id, tenant_group_id, tenant_id, actor_id, actor_role,
				created_at, summary, parent_id, connector, context, action, source_ip
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(record.object_id)
		.bind(record.tenant_group_id)
		.bind(record.tenant_id)
		.bind(record.actor_id.into_inner())
		.bind(record.actor_role.as_deref())
		.bind(format_timestamp(record.created_at))
		.bind(record.summary.as_str())
		.bind(record.parent_id.map(RecordId::into_inner))
		.bind(record.connector.as_str())
		.bind(record.context.as_str())
		.bind(record.action.as_str())
		.bind(record.source_ip.as_deref())
		.execute(&mut *tx)
		.await?;

		let id = result.last_insert_rowid();

		for (key, value) in &record.meta {
			if value.is_null() {
				continue;
			}
			let encoded = serde_json::to_string(value)?;
			sqlx::query("INSERT INTO stream_meta (record_id, meta_key, meta_value) VALUES (?, ?, ?)")
				.bind(id)
				.bind(key.as_str())
				.bind(encoded)
				.execute(&mut *tx)
				.await?;
		}

		tx.commit().await?;

		tracing::debug!(record_id = id, "record inserted");
		Ok(RecordId::new(id))
	}

	#[tracing::instrument(skip(self))]
	pub async fn query_records(&self, query: &RecordQuery) -> Result<QueryResult> {
		let (where_clause, binds) = where_clause(&query.filter);

		let count_sql = format!("SELECT COUNT(*) AS cnt FROM stream_records WHERE {where_clause}");
		let count_row = bind_all(sqlx::query(&count_sql), &binds)
			.fetch_one(&self.pool)
			.await?;
		let total: i64 = count_row.try_get("cnt")?;

		let data_sql = format!(
			"SELECT {RECORD_COLUMNS} FROM stream_records WHERE {where_clause} \
			 ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
		);
		let rows = bind_all(sqlx::query(&data_sql), &binds)
			.bind(query.effective_limit())
			.bind(query.effective_offset())
			.fetch_all(&self.pool)
			.await?;

		let mut records = rows
			.iter()
			.map(record_from_row)
			.collect::<Result<Vec<_>>>()?;

		let ids: Vec<i64> = records.iter().map(|r| r.id.into_inner()).collect();
		let mut meta = self.load_meta(&ids).await?;
		for record in &mut records {
			if let Some(m) = meta.remove(&record.id.into_inner()) {
				record.record.meta = m;
			}
		}

		let mut aggregations = BTreeMap::new();
		for facet in &query.aggregations {
			let column = facet.column();
			let agg_sql = format!(
				"SELECT {column} AS bucket, COUNT(*) AS cnt FROM stream_records \
				 WHERE {where_clause} GROUP BY {column} ORDER BY {column}"
			);
			let rows = bind_all(sqlx::query(&agg_sql), &binds)
				.fetch_all(&self.pool)
				.await?;
			let buckets = rows
				.iter()
				.map(|row| -> Result<Bucket> {
					Ok(Bucket {
						key: bucket_key(*facet, row)?,
						count: row.try_get("cnt")?,
					})
				})
				.collect::<Result<Vec<_>>>()?;
			aggregations.insert(*facet, buckets);
		}

		Ok(QueryResult {
			records,
			total,
			aggregations,
		})
	}

	async fn load_meta(&self, ids: &[i64]) -> Result<HashMap<i64, Map<String, Value>>> {
		let mut meta: HashMap<i64, Map<String, Value>> = HashMap::new();
		if ids.is_empty() {
			return Ok(meta);
		}

		let placeholders = vec!["?"; ids.len()].join(", ");
		let sql = format!(
			"SELECT record_id, meta_key, meta_value FROM stream_meta \
			 WHERE record_id IN ({placeholders}) ORDER BY meta_id"
		);
		let mut query = sqlx::query(&sql);
		for id in ids {
			query = query.bind(*id);
		}

		for row in query.fetch_all(&self.pool).await? {
			let record_id: i64 = row.try_get("record_id")?;
			let key: String = row.try_get("meta_key")?;
			let raw: String = row.try_get("meta_value")?;
			meta.entry(record_id)
				.or_default()
				.insert(key, serde_json::from_str(&raw)?);
		}
		Ok(meta)
	}
}

#[async_trait]
impl Storage for SqliteStorage {
	async fn insert(&self, record: NewRecord) -> std::result::Result<RecordId, StorageError> {
		self.insert_record(&record).await.map_err(|e| {
			tracing::warn!(error = %e, "record insert failed");
			StorageError::from(e)
		})
	}

	async fn query(&self, query: &RecordQuery) -> std::result::Result<QueryResult, StorageError> {
		self.query_records(query).await.map_err(StorageError::from)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;
	use chrono::Duration;
	use serde_json::json;

	fn record(tenant_id: i64, connector: &str, summary: &str) -> NewRecord {
		let mut meta = Map::new();
		meta.insert("post_title".into(), json!("Hello"));
		meta.insert(
			"actor_meta".into(),
			json!({"login": "admin", "display_name": "Admin", "email": "a@example.com"}),
		);
		NewRecord {
			object_id: Some(42),
			tenant_group_id: 1,
			tenant_id,
			actor_id: ActorId::new(1),
			actor_role: Some("administrator".into()),
			created_at: Utc::now(),
			summary: summary.into(),
			parent_id: None,
			connector: connector.into(),
			context: "post".into(),
			action: "updated".into(),
			meta,
			source_ip: Some("192.0.2.1".into()),
		}
	}

	async fn storage() -> SqliteStorage {
		SqliteStorage::new(create_test_pool().await)
	}

	#[tokio::test]
	async fn round_trip_preserves_fields() {
		let storage = storage().await;
		let mut written = record(3, "posts", "\"Hello\" post updated");
		written.parent_id = Some(RecordId::new(7));

		let id = storage.insert(written.clone()).await.unwrap();
		let result = storage.query(&RecordQuery::default()).await.unwrap();

		assert_eq!(result.total, 1);
		let read = &result.records[0];
		assert_eq!(read.id, id);
		assert_eq!(
			read.record.created_at.timestamp_micros(),
			written.created_at.timestamp_micros()
		);

		let mut expected = written;
		expected.created_at = read.record.created_at;
		assert_eq!(read.record, expected);
	}

	#[tokio::test]
	async fn ids_are_not_reused_after_delete() {
		let storage = storage().await;
		let first = storage.insert(record(1, "posts", "a")).await.unwrap();
		let second = storage.insert(record(1, "posts", "b")).await.unwrap();

		sqlx::query("DELETE FROM stream_records WHERE id = ?")
			.bind(second.into_inner())
			.execute(&storage.pool)
			.await
			.unwrap();

		let third = storage.insert(record(1, "posts", "c")).await.unwrap();
		assert!(third > second);
		assert!(second > first);
	}

	#[tokio::test]
	async fn filters_and_paginates_newest_first() {
		let storage = storage().await;
		let now = Utc::now();
		for (i, tenant) in [2, 3, 2, 2].into_iter().enumerate() {
			let mut r = record(tenant, "posts", &format!("record {i}"));
			r.created_at = now - Duration::minutes(10 - i as i64);
			storage.insert(r).await.unwrap();
		}

		let query = RecordQuery {
			filter: RecordFilter {
				tenant_group_id: Some(1),
				tenant_id: Some(2),
				..Default::default()
			},
			limit: Some(2),
			offset: Some(1),
			..Default::default()
		};
		let result = storage.query(&query).await.unwrap();

		assert_eq!(result.total, 3);
		let summaries: Vec<&str> = result
			.records
			.iter()
			.map(|r| r.record.summary.as_str())
			.collect();
		assert_eq!(summaries, vec!["record 2", "record 0"]);
	}

	#[tokio::test]
	async fn created_range_is_inclusive() {
		let storage = storage().await;
		let at = Utc::now() - Duration::hours(1);
		let mut r = record(1, "posts", "in range");
		r.created_at = at;
		storage.insert(r).await.unwrap();
		storage.insert(record(1, "posts", "later")).await.unwrap();

		let result = storage
			.query(&RecordQuery::new(RecordFilter {
				created_from: Some(at - Duration::minutes(1)),
				created_to: Some(at + Duration::minutes(1)),
				..Default::default()
			}))
			.await
			.unwrap();
		assert_eq!(result.total, 1);
		assert_eq!(result.records[0].record.summary, "in range");
	}

	#[tokio::test]
	async fn aggregates_over_all_matches() {
		let storage = storage().await;
		for (tenant, connector) in [(0, "users"), (2, "posts"), (2, "posts"), (3, "comments")] {
			storage.insert(record(tenant, connector, "x")).await.unwrap();
		}

		let mut query = RecordQuery::new(RecordFilter {
			tenant_group_id: Some(1),
			..Default::default()
		});
		query.limit = Some(1);
		query.aggregate(Facet::TenantId);
		query.aggregate(Facet::Connector);

		let result = storage.query(&query).await.unwrap();
		assert_eq!(result.records.len(), 1);
		assert_eq!(
			result.buckets(Facet::TenantId),
			&[
				Bucket {
					key: BucketKey::Int(0),
					count: 1
				},
				Bucket {
					key: BucketKey::Int(2),
					count: 2
				},
				Bucket {
					key: BucketKey::Int(3),
					count: 1
				},
			]
		);
		assert!(result.has_bucket(Facet::Connector, &BucketKey::Text("comments".into())));
		assert!(!result.has_bucket(Facet::Connector, &BucketKey::Text("media".into())));
	}

	#[tokio::test]
	async fn search_treats_wildcards_literally() {
		let storage = storage().await;
		storage.insert(record(1, "posts", "Discount 50% applied")).await.unwrap();
		storage.insert(record(1, "posts", "Discount 500 applied")).await.unwrap();

		let result = storage
			.query(&RecordQuery::new(RecordFilter {
				search: Some("50%".into()),
				..Default::default()
			}))
			.await
			.unwrap();
		assert_eq!(result.total, 1);
		assert_eq!(result.records[0].record.summary, "Discount 50% applied");

		let result = storage
			.query(&RecordQuery::new(RecordFilter {
				search: Some("DISCOUNT".into()),
				..Default::default()
			}))
			.await
			.unwrap();
		assert_eq!(result.total, 2);
	}

	#[tokio::test]
	async fn parent_links_are_queryable() {
		let storage = storage().await;
		let first = storage.insert(record(1, "posts", "first")).await.unwrap();
		let mut child = record(1, "posts", "second");
		child.parent_id = Some(first);
		let second = storage.insert(child).await.unwrap();

		let result = storage
			.query(&RecordQuery::new(RecordFilter {
				parent_id: Some(first),
				..Default::default()
			}))
			.await
			.unwrap();
		assert_eq!(result.total, 1);
		assert_eq!(result.records[0].id, second);
	}

	#[tokio::test]
	async fn null_meta_is_not_stored() {
		let storage = storage().await;
		let mut r = record(1, "posts", "x");
		r.meta.insert("gone".into(), Value::Null);
		storage.insert(r).await.unwrap();

		let result = storage.query(&RecordQuery::default()).await.unwrap();
		assert!(!result.records[0].record.meta.contains_key("gone"));
		assert_eq!(result.records[0].record.meta["post_title"], json!("Hello"));
	}

	#[test]
	fn like_escaping() {
		assert_eq!(escape_like("50%_a\\b"), "50\\%\\_a\\\\b");
	}
}
