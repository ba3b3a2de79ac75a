// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Explicit tenant scope and per-call context.
//!
//! Nothing in this crate reads ambient process state to find out where a call
//! is happening. Callers describe it with a [`ScopeContext`] (which tenant
//! grouping, which tenant, aggregate or not) wrapped in a [`CallContext`]
//! (who is calling, from where).

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::record::ActorId;

/// Top-level tenant grouping, e.g. a network of sites.
pub type TenantGroupId = i64;

/// Sub-tenant within a grouping, e.g. a single site.
pub type TenantId = i64;

/// Tenant id reserved for records written from the aggregate scope.
pub const AGGREGATE_TENANT_ID: TenantId = 0;

/// Tenant grouping used when the deployment is not a network.
pub const SINGLE_SITE_GROUP_ID: TenantGroupId = 1;

/// Main tenant of a grouping unless configured otherwise.
pub const DEFAULT_PRIMARY_TENANT_ID: TenantId = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeContext {
	pub tenant_group_id: TenantGroupId,
	pub tenant_id: TenantId,
	/// True when the caller operates across all tenants of the grouping
	/// (network administration).
	pub aggregate: bool,
	/// Tenant whose role assignments and role labels apply to the caller.
	/// In aggregate scope this is the grouping's primary tenant.
	pub directory_tenant_id: TenantId,
}

impl ScopeContext {
	/// Scope of a request made from within one tenant.
	///
	/// Tenant 0 is reserved, so asking for it yields the aggregate scope.
	pub fn tenant(tenant_group_id: TenantGroupId, tenant_id: TenantId) -> Self {
		if tenant_id == AGGREGATE_TENANT_ID {
			return Self::aggregate(tenant_group_id);
		}
		Self {
			tenant_group_id,
			tenant_id,
			aggregate: false,
			directory_tenant_id: tenant_id,
		}
	}

	/// Scope of a request made from the aggregate administration area.
	pub fn aggregate(tenant_group_id: TenantGroupId) -> Self {
		Self {
			tenant_group_id,
			tenant_id: AGGREGATE_TENANT_ID,
			aggregate: true,
			directory_tenant_id: DEFAULT_PRIMARY_TENANT_ID,
		}
	}

	/// Sets the grouping's primary tenant used for role lookups in aggregate
	/// scope. Ignored for tenant scopes and for the reserved id.
	pub fn with_primary_tenant(mut self, tenant_id: TenantId) -> Self {
		if self.aggregate && tenant_id != AGGREGATE_TENANT_ID {
			self.directory_tenant_id = tenant_id;
		}
		self
	}

	/// Scope of a deployment that is not a network.
	pub fn single_site() -> Self {
		Self::tenant(SINGLE_SITE_GROUP_ID, 1)
	}

	pub fn is_aggregate(&self) -> bool {
		self.aggregate
	}

	/// Tenant id a record written from this scope is stored under.
	pub fn logged_tenant_id(&self) -> TenantId {
		if self.aggregate {
			AGGREGATE_TENANT_ID
		} else {
			self.tenant_id
		}
	}
}

/// Everything the write path needs to know about the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
	pub scope: ScopeContext,
	/// Already authenticated caller, used when a request names no actor.
	pub actor_id: ActorId,
	/// Set when the call comes from a non-interactive tool (CLI, cron, import).
	pub automation: bool,
	/// Network address of the caller as reported by the transport.
	pub remote_addr: Option<String>,
}

impl CallContext {
	pub fn new(scope: ScopeContext, actor_id: ActorId) -> Self {
		Self {
			scope,
			actor_id,
			automation: false,
			remote_addr: None,
		}
	}

	pub fn automation(mut self, automation: bool) -> Self {
		self.automation = automation;
		self
	}

	pub fn remote_addr(mut self, addr: impl Into<String>) -> Self {
		self.remote_addr = Some(addr.into());
		self
	}

	/// Remote address, if it is a valid IPv4 or IPv6 literal.
	pub fn source_ip(&self) -> Option<String> {
		let addr = self.remote_addr.as_deref()?.trim();
		match addr.parse::<IpAddr>() {
			Ok(ip) => Some(ip.to_string()),
			Err(_) => {
				tracing::debug!(remote_addr = %addr, "discarding invalid remote address");
				None
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn aggregate_scope_logs_under_reserved_tenant() {
		let scope = ScopeContext::aggregate(4);
		assert!(scope.is_aggregate());
		assert_eq!(scope.logged_tenant_id(), AGGREGATE_TENANT_ID);
		assert_eq!(scope.tenant_group_id, 4);
	}

	#[test]
	fn tenant_scope_logs_under_own_tenant() {
		let scope = ScopeContext::tenant(4, 9);
		assert!(!scope.is_aggregate());
		assert_eq!(scope.logged_tenant_id(), 9);
	}

	#[test]
	fn reserved_tenant_id_yields_aggregate_scope() {
		let scope = ScopeContext::tenant(4, AGGREGATE_TENANT_ID);
		assert!(scope.is_aggregate());
		assert_eq!(scope, ScopeContext::aggregate(4));
	}

	#[test]
	fn aggregate_scope_reads_roles_from_primary_tenant() {
		assert_eq!(
			ScopeContext::aggregate(4).directory_tenant_id,
			DEFAULT_PRIMARY_TENANT_ID
		);
		let scope = ScopeContext::aggregate(4).with_primary_tenant(12);
		assert_eq!(scope.directory_tenant_id, 12);
		assert_eq!(scope.logged_tenant_id(), AGGREGATE_TENANT_ID);
		assert_eq!(scope.with_primary_tenant(0).directory_tenant_id, 12);
	}

	#[test]
	fn tenant_scope_reads_roles_from_own_tenant() {
		let scope = ScopeContext::tenant(4, 9).with_primary_tenant(12);
		assert_eq!(scope.directory_tenant_id, 9);
	}

	#[test]
	fn single_site_uses_group_one() {
		let scope = ScopeContext::single_site();
		assert_eq!(scope.tenant_group_id, SINGLE_SITE_GROUP_ID);
		assert_eq!(scope.tenant_id, 1);
	}

	#[test]
	fn source_ip_accepts_ip_literals() {
		let ctx = CallContext::new(ScopeContext::single_site(), ActorId::SYSTEM);
		assert_eq!(ctx.clone().remote_addr("192.168.0.10").source_ip(), Some("192.168.0.10".into()));
		assert_eq!(ctx.clone().remote_addr("::1").source_ip(), Some("::1".into()));
		assert_eq!(ctx.clone().remote_addr("not-an-ip").source_ip(), None);
		assert_eq!(ctx.remote_addr("10.0.0.1:8080").source_ip(), None);
	}

	#[test]
	fn source_ip_absent_without_remote_addr() {
		let ctx = CallContext::new(ScopeContext::single_site(), ActorId::new(1));
		assert_eq!(ctx.source_ip(), None);
	}
}
