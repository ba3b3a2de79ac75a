// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{
	SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use crate::error::DbError;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection limits for a stream database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
	pub max_connections: u32,
	/// How long a writer waits on another process's write lock before the
	/// insert fails as a transient `database is locked` error.
	pub busy_timeout: Duration,
}

impl Default for PoolSettings {
	fn default() -> Self {
		Self {
			max_connections: DEFAULT_MAX_CONNECTIONS,
			busy_timeout: DEFAULT_BUSY_TIMEOUT,
		}
	}
}

/// Opens the record store with default [`PoolSettings`].
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, DbError> {
	create_pool_with(database_url, &PoolSettings::default()).await
}

/// Opens the record store at `database_url` (e.g. `sqlite:./stream.db`),
/// creating the file if needed.
///
/// The journal is WAL so browsing reads proceed while a writer appends, and
/// foreign keys are on so meta rows cannot outlive their record.
///
/// # Errors
/// Returns `DbError::Internal` if the URL is not a SQLite URL, or the
/// underlying `sqlx` error if the file cannot be opened.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool_with(
	database_url: &str,
	settings: &PoolSettings,
) -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.foreign_keys(true)
		.busy_timeout(settings.busy_timeout)
		.create_if_missing(true);

	let pool = SqlitePoolOptions::new()
		.max_connections(settings.max_connections)
		.connect_with(options)
		.await?;

	tracing::debug!("stream database opened");
	Ok(pool)
}

const SCHEMA: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS stream_records (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		object_id INTEGER,
		tenant_group_id INTEGER NOT NULL,
		tenant_id INTEGER NOT NULL,
		actor_id INTEGER NOT NULL DEFAULT 0,
		actor_role TEXT,
		created_at TEXT NOT NULL,
		summary TEXT NOT NULL,
		parent_id INTEGER,
		connector TEXT NOT NULL,
		context TEXT NOT NULL,
		action TEXT NOT NULL,
		source_ip TEXT
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS stream_meta (
		meta_id INTEGER PRIMARY KEY AUTOINCREMENT,
		record_id INTEGER NOT NULL REFERENCES stream_records(id) ON DELETE CASCADE,
		meta_key TEXT NOT NULL,
		meta_value TEXT NOT NULL,
		UNIQUE (record_id, meta_key)
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_stream_records_scope ON stream_records(tenant_group_id, tenant_id)",
	"CREATE INDEX IF NOT EXISTS idx_stream_records_created_at ON stream_records(created_at)",
	"CREATE INDEX IF NOT EXISTS idx_stream_records_parent ON stream_records(parent_id)",
	"CREATE INDEX IF NOT EXISTS idx_stream_records_connector ON stream_records(connector, context, action)",
	r#"
	CREATE TABLE IF NOT EXISTS actors (
		id INTEGER PRIMARY KEY,
		login TEXT NOT NULL UNIQUE,
		email TEXT NOT NULL DEFAULT '',
		display_name TEXT NOT NULL DEFAULT ''
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS actor_roles (
		actor_id INTEGER NOT NULL REFERENCES actors(id) ON DELETE CASCADE,
		tenant_id INTEGER NOT NULL,
		position INTEGER NOT NULL,
		role TEXT NOT NULL,
		PRIMARY KEY (actor_id, tenant_id, role)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS role_labels (
		tenant_id INTEGER NOT NULL,
		role TEXT NOT NULL,
		label TEXT NOT NULL,
		PRIMARY KEY (tenant_id, role)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS tenants (
		id INTEGER PRIMARY KEY CHECK (id > 0),
		tenant_group_id INTEGER NOT NULL,
		name TEXT NOT NULL
	)
	"#,
];

/// Creates the activity stream tables if they do not exist yet.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for statement in SCHEMA {
		sqlx::query(statement).execute(pool).await?;
	}
	tracing::debug!(statements = SCHEMA.len(), "schema up to date");
	Ok(())
}
