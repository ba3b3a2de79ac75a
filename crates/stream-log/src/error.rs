// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type LogResult<T> = Result<T, LogError>;

/// Failures that abort a write.
///
/// Lookup failures while resolving the actor are not represented here: they
/// degrade to absent snapshot fields instead of failing the write.
#[derive(Error, Debug)]
pub enum LogError {
	#[error("invalid record: {0}")]
	InvalidRecord(String),

	#[error("summary format error: {0}")]
	Format(#[from] FormatError),

	#[error("storage error: {0}")]
	Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum StorageError {
	#[error("transient error: {0}")]
	Transient(String),

	#[error("permanent error: {0}")]
	Permanent(String),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Mismatch between a message template and its arguments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
	#[error("template references argument {position} but only {supplied} supplied")]
	MissingArgument { position: usize, supplied: usize },

	#[error("argument position must start at 1 (offset {offset})")]
	ZeroPosition { offset: usize },

	#[error("unknown conversion '{conversion}' at offset {offset}")]
	UnknownConversion { conversion: char, offset: usize },

	#[error("unterminated conversion at offset {offset}")]
	Unterminated { offset: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
	#[error("not found: {0}")]
	NotFound(String),

	#[error("lookup failed: {0}")]
	Backend(String),
}
