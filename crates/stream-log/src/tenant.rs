// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::LookupError;
use crate::scope::{TenantGroupId, TenantId, AGGREGATE_TENANT_ID};

/// A sub-tenant as listed by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
	pub id: TenantId,
	pub name: String,
}

impl Tenant {
	pub fn new(id: TenantId, name: impl Into<String>) -> Self {
		Self {
			id,
			name: name.into(),
		}
	}
}

/// Finds a tenant's display name in an already fetched list.
pub fn tenant_name(tenants: &[Tenant], id: TenantId) -> Option<&str> {
	tenants
		.iter()
		.find(|t| t.id == id)
		.map(|t| t.name.as_str())
}

#[async_trait]
pub trait TenantDirectory: Send + Sync {
	/// All sub-tenants of a grouping, in no particular order.
	async fn tenants(&self, group: TenantGroupId) -> Result<Vec<Tenant>, LookupError>;
}

#[derive(Debug, Default)]
pub struct MemoryTenantDirectory {
	tenants: RwLock<Vec<(TenantGroupId, Tenant)>>,
}

impl MemoryTenantDirectory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a tenant. Id 0 is reserved for the aggregate scope and ignored.
	pub fn add(&self, group: TenantGroupId, tenant: Tenant) {
		if tenant.id == AGGREGATE_TENANT_ID {
			tracing::warn!(group, "ignoring tenant with reserved id 0");
			return;
		}
		self.tenants.write().push((group, tenant));
	}
}

#[async_trait]
impl TenantDirectory for MemoryTenantDirectory {
	async fn tenants(&self, group: TenantGroupId) -> Result<Vec<Tenant>, LookupError> {
		Ok(self
			.tenants
			.read()
			.iter()
			.filter(|(g, _)| *g == group)
			.map(|(_, t)| t.clone())
			.collect())
	}
}
