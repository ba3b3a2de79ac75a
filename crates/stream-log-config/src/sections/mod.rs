// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections. Each has a fully resolved `*Config` and a partial
//! `*ConfigLayer` that sources produce and merge.

mod database;
mod facets;
mod logger;
mod logging;
mod scope;

pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use facets::{FacetsConfig, FacetsConfigLayer};
pub use logger::{LoggerConfig, LoggerConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use scope::{ScopeConfig, ScopeConfigLayer};
