// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Deployment scope: which tenant grouping this process writes to.

use serde::Deserialize;
use stream_log::{
	ScopeContext, TenantGroupId, TenantId, AGGREGATE_TENANT_ID, DEFAULT_PRIMARY_TENANT_ID,
	SINGLE_SITE_GROUP_ID,
};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeConfig {
	pub tenant_group_id: TenantGroupId,
	/// Whether the deployment is a network of tenants.
	pub multisite: bool,
	/// Main tenant of the grouping. Network-wide writes take the actor's
	/// roles from this tenant.
	pub primary_tenant_id: TenantId,
}

impl Default for ScopeConfig {
	fn default() -> Self {
		Self {
			tenant_group_id: SINGLE_SITE_GROUP_ID,
			multisite: false,
			primary_tenant_id: DEFAULT_PRIMARY_TENANT_ID,
		}
	}
}

impl ScopeConfig {
	/// Scope for a call targeting `tenant_id`, or the aggregate scope when
	/// none is given on a network.
	///
	/// Single-site deployments always resolve to the single-site scope. The
	/// reserved tenant id 0 names the network itself and resolves to the
	/// aggregate scope.
	pub fn context(&self, tenant_id: Option<TenantId>) -> ScopeContext {
		if !self.multisite {
			return ScopeContext::single_site();
		}
		match tenant_id {
			Some(id) if id != AGGREGATE_TENANT_ID => ScopeContext::tenant(self.tenant_group_id, id),
			_ => ScopeContext::aggregate(self.tenant_group_id)
				.with_primary_tenant(self.primary_tenant_id),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ScopeConfigLayer {
	#[serde(default)]
	pub tenant_group_id: Option<TenantGroupId>,
	#[serde(default)]
	pub multisite: Option<bool>,
	#[serde(default)]
	pub primary_tenant_id: Option<TenantId>,
}

impl ScopeConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.tenant_group_id.is_some() {
			self.tenant_group_id = other.tenant_group_id;
		}
		if other.multisite.is_some() {
			self.multisite = other.multisite;
		}
		if other.primary_tenant_id.is_some() {
			self.primary_tenant_id = other.primary_tenant_id;
		}
	}

	pub fn finalize(self) -> Result<ScopeConfig, ConfigError> {
		let multisite = self.multisite.unwrap_or(false);
		let primary_tenant_id = self.primary_tenant_id.unwrap_or(DEFAULT_PRIMARY_TENANT_ID);
		if primary_tenant_id <= AGGREGATE_TENANT_ID {
			return Err(ConfigError::Validation(format!(
				"scope.primary_tenant_id must be a positive tenant id, got {primary_tenant_id}"
			)));
		}

		Ok(ScopeConfig {
			tenant_group_id: if multisite {
				self.tenant_group_id.unwrap_or(SINGLE_SITE_GROUP_ID)
			} else {
				SINGLE_SITE_GROUP_ID
			},
			multisite,
			primary_tenant_id,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn network(group: TenantGroupId) -> ScopeConfig {
		ScopeConfigLayer {
			tenant_group_id: Some(group),
			multisite: Some(true),
			..Default::default()
		}
		.finalize()
		.unwrap()
	}

	#[test]
	fn single_site_pins_group_one() {
		let config = ScopeConfigLayer {
			tenant_group_id: Some(7),
			multisite: Some(false),
			..Default::default()
		}
		.finalize()
		.unwrap();
		assert_eq!(config.tenant_group_id, 1);
		assert_eq!(config.context(Some(5)), ScopeContext::single_site());
	}

	#[test]
	fn network_resolves_tenant_or_aggregate() {
		let config = network(7);
		assert_eq!(config.context(Some(5)), ScopeContext::tenant(7, 5));
		assert!(config.context(None).is_aggregate());
	}

	#[test]
	fn tenant_zero_resolves_to_aggregate_scope() {
		let scope = network(1).context(Some(AGGREGATE_TENANT_ID));
		assert!(scope.is_aggregate());
		assert_eq!(scope.logged_tenant_id(), AGGREGATE_TENANT_ID);
		assert_eq!(scope, network(1).context(None));
	}

	#[test]
	fn aggregate_scope_carries_primary_tenant() {
		let config = ScopeConfigLayer {
			tenant_group_id: Some(2),
			multisite: Some(true),
			primary_tenant_id: Some(14),
		}
		.finalize()
		.unwrap();
		assert_eq!(config.context(None).directory_tenant_id, 14);
		assert_eq!(config.context(Some(5)).directory_tenant_id, 5);
	}

	#[test]
	fn non_positive_primary_tenant_rejected() {
		for id in [0, -3] {
			let err = ScopeConfigLayer {
				primary_tenant_id: Some(id),
				..Default::default()
			}
			.finalize()
			.unwrap_err();
			assert!(matches!(err, ConfigError::Validation(_)));
		}
	}
}
