// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::scope::ScopeContext;
use crate::storage::RecordFilter;

/// Restricts a query to the caller's tenant scope.
///
/// The tenant grouping is always pinned. The sub-tenant is pinned only
/// outside the aggregate scope, where results must span every tenant.
pub fn query_properties(scope: &ScopeContext, mut filter: RecordFilter) -> RecordFilter {
	filter.tenant_group_id = Some(scope.tenant_group_id);
	if !scope.is_aggregate() {
		filter.tenant_id = Some(scope.tenant_id);
	}
	filter
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn aggregate_scope_spans_tenants() {
		let filter = query_properties(&ScopeContext::aggregate(2), RecordFilter::default());
		assert_eq!(filter.tenant_group_id, Some(2));
		assert_eq!(filter.tenant_id, None);
	}

	#[test]
	fn tenant_scope_pins_both() {
		let filter = query_properties(&ScopeContext::tenant(2, 7), RecordFilter::default());
		assert_eq!(filter.tenant_group_id, Some(2));
		assert_eq!(filter.tenant_id, Some(7));
	}

	#[test]
	fn caller_predicates_survive() {
		let base = RecordFilter {
			connector: Some("posts".into()),
			tenant_id: Some(99),
			..Default::default()
		};
		let filter = query_properties(&ScopeContext::tenant(1, 3), base);
		assert_eq!(filter.connector.as_deref(), Some("posts"));
		assert_eq!(filter.tenant_id, Some(3));
	}
}
