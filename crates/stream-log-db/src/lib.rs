// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for the activity stream.

pub mod directory;
pub mod error;
pub mod pool;
pub mod records;

#[cfg(test)]
pub(crate) mod testing;

pub use directory::SqliteDirectory;
pub use error::{DbError, Result};
pub use pool::{create_pool, create_pool_with, run_migrations, PoolSettings};
pub use records::SqliteStorage;
