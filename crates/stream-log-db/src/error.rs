// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use stream_log::{LookupError, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Internal: {0}")]
	Internal(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl DbError {
	/// Whether retrying the same operation later may succeed.
	pub fn is_transient(&self) -> bool {
		match self {
			DbError::Sqlx(e) => is_transient_error(e),
			_ => false,
		}
	}
}

impl From<DbError> for StorageError {
	fn from(e: DbError) -> Self {
		match e {
			DbError::Serialization(e) => StorageError::Serialization(e),
			e if e.is_transient() => StorageError::Transient(e.to_string()),
			e => StorageError::Permanent(e.to_string()),
		}
	}
}

impl From<DbError> for LookupError {
	fn from(e: DbError) -> Self {
		match e {
			DbError::NotFound(what) => LookupError::NotFound(what),
			e => LookupError::Backend(e.to_string()),
		}
	}
}

fn is_transient_error(e: &sqlx::Error) -> bool {
	match e {
		sqlx::Error::Io(_) => true,
		sqlx::Error::PoolTimedOut => true,
		sqlx::Error::PoolClosed => true,
		sqlx::Error::Database(db_err) => {
			let msg = db_err.message().to_lowercase();
			msg.contains("busy") || msg.contains("locked") || msg.contains("timeout")
		}
		_ => false,
	}
}
