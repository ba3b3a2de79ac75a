// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Multi-tenant activity stream.
//!
//! Records who did what, where and when across a single site or a network of
//! sites. Records are append-only, chained to the previous record written by
//! the same [`EventLogger`], and browsable through [`Storage::query`] with
//! tenant-aware facets from [`FacetAdapter`] in the aggregate scope.

pub mod actor;
pub mod chain;
pub mod error;
pub mod facet;
pub mod logger;
pub mod record;
pub mod scope;
pub mod storage;
pub mod summary;
pub mod tenant;
pub mod tenant_filter;
pub mod transform;

pub use actor::{
	ActorResolver, ActorSnapshot, AgentProvider, AutomationAgent, Identity, IdentityProvider,
	MemoryIdentityProvider, DEFAULT_AUTOMATION_DISPLAY_NAME,
};
pub use chain::SessionChain;
pub use error::{FormatError, LogError, LogResult, LookupError, StorageError};
pub use facet::{
	Column, FacetAdapter, FacetSettings, FilterDefinition, FilterItem, FilterSet, TenantLink,
	TENANT_COLUMN,
};
pub use logger::{EventLogger, Logger};
pub use record::{
	ActorId, EventArgs, EventRecord, LogRequest, LogRequestBuilder, NewRecord, RecordId,
	ACTOR_META_KEY,
};
pub use scope::{
	CallContext, ScopeContext, TenantGroupId, TenantId, AGGREGATE_TENANT_ID,
	DEFAULT_PRIMARY_TENANT_ID, SINGLE_SITE_GROUP_ID,
};
pub use storage::{
	Bucket, BucketKey, Facet, MemoryStorage, QueryResult, RecordFilter, RecordQuery, Storage,
	DEFAULT_QUERY_LIMIT, MAX_QUERY_LIMIT,
};
pub use tenant::{MemoryTenantDirectory, Tenant, TenantDirectory};
pub use tenant_filter::query_properties;
pub use transform::{Transform, Transforms};
