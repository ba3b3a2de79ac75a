// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tenant-aware augmentation of the record list view.
//!
//! Every augmentation is a no-op outside the aggregate scope. Inside it the
//! list gains a tenant aggregation, a tenant filter, and a tenant column.
//! Registered column and filter transforms run after the adapter's own
//! changes regardless of scope.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::record::EventRecord;
use crate::scope::{ScopeContext, TenantId, AGGREGATE_TENANT_ID};
use crate::storage::{BucketKey, Facet, QueryResult, RecordQuery};
use crate::tenant::{tenant_name, Tenant};
use crate::transform::Transforms;

pub const TENANT_COLUMN: &str = "tenant_id";
pub const DEFAULT_SCREEN_SUFFIX: &str = "-network";
pub const DEFAULT_AGGREGATE_LABEL: &str = "Network Admin";
pub const DEFAULT_FILTER_TITLE: &str = "sites";
pub const DEFAULT_COLUMN_LABEL: &str = "Site";
pub const DEFAULT_LARGE_DEPLOYMENT_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterItem {
	pub key: BucketKey,
	pub label: String,
	/// No records match this value.
	pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDefinition {
	pub title: String,
	pub items: Vec<FilterItem>,
}

/// Filter dropdowns by record property name.
pub type FilterSet = BTreeMap<String, FilterDefinition>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
	pub key: String,
	pub label: String,
}

impl Column {
	pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			label: label.into(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetSettings {
	pub screen_suffix: String,
	pub aggregate_label: String,
	pub filter_title: String,
	pub column_label: String,
	/// Tenant filter is omitted once the tenant count exceeds this.
	pub large_deployment_threshold: usize,
	/// Records view the tenant cell links to. `None` yields relative links.
	pub records_url: Option<Url>,
}

impl Default for FacetSettings {
	fn default() -> Self {
		Self {
			screen_suffix: DEFAULT_SCREEN_SUFFIX.to_string(),
			aggregate_label: DEFAULT_AGGREGATE_LABEL.to_string(),
			filter_title: DEFAULT_FILTER_TITLE.to_string(),
			column_label: DEFAULT_COLUMN_LABEL.to_string(),
			large_deployment_threshold: DEFAULT_LARGE_DEPLOYMENT_THRESHOLD,
			records_url: None,
		}
	}
}

/// Rendered tenant cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantLink {
	pub tenant_id: TenantId,
	pub label: String,
	pub href: String,
}

impl TenantLink {
	pub fn to_html(&self) -> String {
		format!(
			"<a href=\"{}\"><span>{}</span></a>",
			escape_html(&self.href),
			escape_html(&self.label)
		)
	}
}

impl fmt::Display for TenantLink {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_html())
	}
}

fn escape_html(s: &str) -> String {
	let mut out = String::with_capacity(s.len());
	for c in s.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#039;"),
			_ => out.push(c),
		}
	}
	out
}

#[derive(Debug, Default)]
pub struct FacetAdapter {
	settings: FacetSettings,
	column_transforms: Transforms<Vec<Column>>,
	filter_transforms: Transforms<FilterSet>,
}

impl FacetAdapter {
	pub fn new(settings: FacetSettings) -> Self {
		Self {
			settings,
			column_transforms: Transforms::new(),
			filter_transforms: Transforms::new(),
		}
	}

	pub fn settings(&self) -> &FacetSettings {
		&self.settings
	}

	pub fn on_columns<F>(&mut self, transform: F)
	where
		F: Fn(Vec<Column>) -> Vec<Column> + Send + Sync + 'static,
	{
		self.column_transforms.register(transform);
	}

	pub fn on_filters<F>(&mut self, transform: F)
	where
		F: Fn(FilterSet) -> FilterSet + Send + Sync + 'static,
	{
		self.filter_transforms.register(transform);
	}

	/// Suffixes the screen id once in the aggregate scope.
	pub fn screen_id(&self, scope: &ScopeContext, screen_id: &str) -> String {
		let suffix = self.settings.screen_suffix.as_str();
		if !scope.is_aggregate() || screen_id.is_empty() || screen_id.ends_with(suffix) {
			return screen_id.to_string();
		}
		format!("{screen_id}{suffix}")
	}

	pub fn query_args(&self, scope: &ScopeContext, mut query: RecordQuery) -> RecordQuery {
		if scope.is_aggregate() {
			query.aggregate(Facet::TenantId);
		}
		query
	}

	/// Adds the tenant filter, using the tenant buckets of `result` to
	/// disable tenants without records.
	pub fn filters(
		&self,
		scope: &ScopeContext,
		mut filters: FilterSet,
		tenants: &[Tenant],
		result: &QueryResult,
	) -> FilterSet {
		if scope.is_aggregate() {
			if tenants.len() > self.settings.large_deployment_threshold {
				tracing::debug!(
					tenants = tenants.len(),
					threshold = self.settings.large_deployment_threshold,
					"large deployment, omitting tenant filter"
				);
			} else {
				filters.insert(
					TENANT_COLUMN.to_string(),
					self.tenant_filter(tenants, result),
				);
			}
		}
		self.filter_transforms.apply(filters)
	}

	fn tenant_filter(&self, tenants: &[Tenant], result: &QueryResult) -> FilterDefinition {
		let has_records =
			|id: TenantId| result.has_bucket(Facet::TenantId, &BucketKey::Int(id));

		let mut items: Vec<FilterItem> = tenants
			.iter()
			.filter(|t| t.id != AGGREGATE_TENANT_ID)
			.map(|t| FilterItem {
				key: BucketKey::Int(t.id),
				label: t.name.clone(),
				disabled: !has_records(t.id),
			})
			.collect();
		items.sort_by(|a, b| {
			a.disabled
				.cmp(&b.disabled)
				.then_with(|| a.label.cmp(&b.label))
		});

		items.insert(
			0,
			FilterItem {
				key: BucketKey::Int(AGGREGATE_TENANT_ID),
				label: self.settings.aggregate_label.clone(),
				disabled: !has_records(AGGREGATE_TENANT_ID),
			},
		);

		FilterDefinition {
			title: self.settings.filter_title.clone(),
			items,
		}
	}

	/// Inserts the tenant column right before the trailing column.
	pub fn columns(&self, scope: &ScopeContext, mut columns: Vec<Column>) -> Vec<Column> {
		if scope.is_aggregate() && !columns.iter().any(|c| c.key == TENANT_COLUMN) {
			let at = columns.len().saturating_sub(1);
			columns.insert(
				at,
				Column::new(TENANT_COLUMN, self.settings.column_label.clone()),
			);
		}
		self.column_transforms.apply(columns)
	}

	/// Columns rendered by the default cell renderer.
	pub fn column_defaults(&self, scope: &ScopeContext, mut defaults: Vec<String>) -> Vec<String> {
		if scope.is_aggregate() && !defaults.iter().any(|c| c == TENANT_COLUMN) {
			defaults.push(TENANT_COLUMN.to_string());
		}
		defaults
	}

	/// Tenant cell of `record`, only rendered in aggregate scope.
	pub fn render_cell(
		&self,
		scope: &ScopeContext,
		record: &EventRecord,
		tenants: &[Tenant],
	) -> Option<TenantLink> {
		if !scope.is_aggregate() {
			return None;
		}

		let tenant_id = record.record.tenant_id;
		let label = if tenant_id == AGGREGATE_TENANT_ID {
			self.settings.aggregate_label.clone()
		} else {
			tenant_name(tenants, tenant_id)
				.map(String::from)
				.unwrap_or_else(|| format!("#{tenant_id}"))
		};

		Some(TenantLink {
			tenant_id,
			label,
			href: self.tenant_href(tenant_id),
		})
	}

	fn tenant_href(&self, tenant_id: TenantId) -> String {
		let value = tenant_id.to_string();
		match &self.settings.records_url {
			Some(base) => {
				let mut url = base.clone();
				let kept: Vec<(String, String)> = url
					.query_pairs()
					.filter(|(k, _)| k != TENANT_COLUMN)
					.map(|(k, v)| (k.into_owned(), v.into_owned()))
					.collect();
				url.query_pairs_mut()
					.clear()
					.extend_pairs(kept)
					.append_pair(TENANT_COLUMN, &value);
				url.to_string()
			}
			None => format!("?{TENANT_COLUMN}={value}"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::record::{ActorId, NewRecord, RecordId};
	use crate::storage::Bucket;
	use chrono::Utc;
	use proptest::prelude::*;
	use serde_json::Map;

	fn adapter() -> FacetAdapter {
		FacetAdapter::default()
	}

	fn network() -> ScopeContext {
		ScopeContext::aggregate(1)
	}

	fn site() -> ScopeContext {
		ScopeContext::tenant(1, 2)
	}

	fn tenant_buckets(ids: &[i64]) -> QueryResult {
		let mut result = QueryResult::default();
		result.aggregations.insert(
			Facet::TenantId,
			ids.iter()
				.map(|id| Bucket {
					key: BucketKey::Int(*id),
					count: 1,
				})
				.collect(),
		);
		result
	}

	fn record_on(tenant_id: TenantId) -> EventRecord {
		EventRecord::new(
			RecordId::new(1),
			NewRecord {
				object_id: None,
				tenant_group_id: 1,
				tenant_id,
				actor_id: ActorId::new(1),
				actor_role: None,
				created_at: Utc::now(),
				summary: String::new(),
				parent_id: None,
				connector: "posts".into(),
				context: "post".into(),
				action: "updated".into(),
				meta: Map::new(),
				source_ip: None,
			},
		)
	}

	fn keys(columns: &[Column]) -> Vec<&str> {
		columns.iter().map(|c| c.key.as_str()).collect()
	}

	mod screen_id {
		use super::*;

		#[test]
		fn suffixed_in_aggregate_scope() {
			assert_eq!(adapter().screen_id(&network(), "toplevel_page_stream"), "toplevel_page_stream-network");
		}

		#[test]
		fn untouched_in_tenant_scope() {
			assert_eq!(adapter().screen_id(&site(), "toplevel_page_stream"), "toplevel_page_stream");
		}

		#[test]
		fn empty_id_untouched() {
			assert_eq!(adapter().screen_id(&network(), ""), "");
		}
	}

	mod filters {
		use super::*;

		#[test]
		fn enabled_sort_before_disabled_then_by_label() {
			// A(2) "Zeta" and C(4) "Beta" have records, B(3) "Alpha" does not.
			let tenants = vec![
				Tenant::new(2, "Zeta"),
				Tenant::new(3, "Alpha"),
				Tenant::new(4, "Beta"),
			];
			let filters = adapter().filters(
				&network(),
				FilterSet::new(),
				&tenants,
				&tenant_buckets(&[2, 4]),
			);

			let items = &filters[TENANT_COLUMN].items;
			let order: Vec<(BucketKey, &str, bool)> = items
				.iter()
				.map(|i| (i.key.clone(), i.label.as_str(), i.disabled))
				.collect();
			assert_eq!(
				order,
				vec![
					(BucketKey::Int(0), "Network Admin", true),
					(BucketKey::Int(4), "Beta", false),
					(BucketKey::Int(2), "Zeta", false),
					(BucketKey::Int(3), "Alpha", true),
				]
			);
			assert_eq!(filters[TENANT_COLUMN].title, "sites");
		}

		#[test]
		fn aggregate_entry_enabled_with_records() {
			let filters = adapter().filters(
				&network(),
				FilterSet::new(),
				&[Tenant::new(2, "Blog")],
				&tenant_buckets(&[0]),
			);
			let first = &filters[TENANT_COLUMN].items[0];
			assert_eq!(first.key, BucketKey::Int(0));
			assert!(!first.disabled);
		}

		#[test]
		fn omitted_for_large_deployments() {
			let adapter = FacetAdapter::new(FacetSettings {
				large_deployment_threshold: 2,
				..Default::default()
			});
			let tenants: Vec<Tenant> = (1..=3).map(|id| Tenant::new(id, format!("t{id}"))).collect();

			let filters = adapter.filters(&network(), FilterSet::new(), &tenants, &tenant_buckets(&[1]));
			assert!(filters.is_empty());
		}

		#[test]
		fn threshold_is_inclusive() {
			let adapter = FacetAdapter::new(FacetSettings {
				large_deployment_threshold: 3,
				..Default::default()
			});
			let tenants: Vec<Tenant> = (1..=3).map(|id| Tenant::new(id, format!("t{id}"))).collect();

			let filters = adapter.filters(&network(), FilterSet::new(), &tenants, &tenant_buckets(&[1]));
			assert_eq!(filters[TENANT_COLUMN].items.len(), 4);
		}

		#[test]
		fn untouched_in_tenant_scope() {
			let filters = adapter().filters(
				&site(),
				FilterSet::new(),
				&[Tenant::new(2, "Blog")],
				&tenant_buckets(&[2]),
			);
			assert!(filters.is_empty());
		}

		#[test]
		fn transforms_run_after_augmentation() {
			let mut adapter = adapter();
			adapter.on_filters(|mut filters| {
				if let Some(tenants) = filters.get_mut(TENANT_COLUMN) {
					tenants.title = "networks".into();
				}
				filters
			});

			let filters = adapter.filters(
				&network(),
				FilterSet::new(),
				&[Tenant::new(2, "Blog")],
				&tenant_buckets(&[]),
			);
			assert_eq!(filters[TENANT_COLUMN].title, "networks");
		}
	}

	mod columns {
		use super::*;

		fn base() -> Vec<Column> {
			vec![
				Column::new("a", "A"),
				Column::new("b", "B"),
				Column::new("c", "C"),
			]
		}

		#[test]
		fn inserted_before_last() {
			let columns = adapter().columns(&network(), base());
			assert_eq!(keys(&columns), vec!["a", "b", TENANT_COLUMN, "c"]);
			assert_eq!(columns[2].label, "Site");
		}

		#[test]
		fn inserted_once() {
			let adapter = adapter();
			let once = adapter.columns(&network(), base());
			let twice = adapter.columns(&network(), once.clone());
			assert_eq!(once, twice);
		}

		#[test]
		fn empty_list_gets_only_tenant() {
			let columns = adapter().columns(&network(), Vec::new());
			assert_eq!(keys(&columns), vec![TENANT_COLUMN]);
		}

		#[test]
		fn untouched_in_tenant_scope() {
			assert_eq!(adapter().columns(&site(), base()), base());
		}

		#[test]
		fn transforms_see_tenant_column() {
			let mut adapter = adapter();
			adapter.on_columns(|mut columns| {
				columns.retain(|c| c.key != "b");
				columns
			});
			let columns = adapter.columns(&network(), base());
			assert_eq!(keys(&columns), vec!["a", TENANT_COLUMN, "c"]);
		}

		#[test]
		fn defaults_include_tenant_once() {
			let adapter = adapter();
			let defaults = adapter.column_defaults(&network(), vec!["date".into()]);
			let defaults = adapter.column_defaults(&network(), defaults);
			assert_eq!(defaults, vec!["date".to_string(), TENANT_COLUMN.to_string()]);
			assert_eq!(
				adapter.column_defaults(&site(), vec!["date".into()]),
				vec!["date".to_string()]
			);
		}
	}

	mod query_args {
		use super::*;

		#[test]
		fn adds_tenant_aggregation_once() {
			let adapter = adapter();
			let query = adapter.query_args(&network(), RecordQuery::default());
			let query = adapter.query_args(&network(), query);
			assert_eq!(query.aggregations, vec![Facet::TenantId]);
		}

		#[test]
		fn untouched_in_tenant_scope() {
			let query = adapter().query_args(&site(), RecordQuery::default());
			assert!(query.aggregations.is_empty());
		}
	}

	mod render_cell {
		use super::*;

		#[test]
		fn aggregate_records_use_aggregate_label() {
			let link = adapter().render_cell(&network(), &record_on(0), &[]).unwrap();
			assert_eq!(link.label, "Network Admin");
			assert_eq!(link.href, "?tenant_id=0");
		}

		#[test]
		fn known_tenant_uses_name_and_escapes() {
			let adapter = FacetAdapter::new(FacetSettings {
				records_url: Some(Url::parse("https://example.com/admin.php?page=stream").unwrap()),
				..Default::default()
			});
			let link = adapter
				.render_cell(&network(), &record_on(3), &[Tenant::new(3, "Tom & <Jerry>")])
				.unwrap();
			assert_eq!(link.href, "https://example.com/admin.php?page=stream&tenant_id=3");
			assert_eq!(
				link.to_html(),
				"<a href=\"https://example.com/admin.php?page=stream&amp;tenant_id=3\"><span>Tom &amp; &lt;Jerry&gt;</span></a>"
			);
		}

		#[test]
		fn replaces_existing_tenant_param() {
			let adapter = FacetAdapter::new(FacetSettings {
				records_url: Some(Url::parse("https://example.com/records?tenant_id=9").unwrap()),
				..Default::default()
			});
			let link = adapter.render_cell(&network(), &record_on(3), &[]).unwrap();
			assert_eq!(link.href, "https://example.com/records?tenant_id=3");
		}

		#[test]
		fn unknown_tenant_falls_back_to_id() {
			let link = adapter().render_cell(&network(), &record_on(42), &[]).unwrap();
			assert_eq!(link.label, "#42");
		}

		#[test]
		fn nothing_rendered_outside_aggregate_scope() {
			let tenants = [Tenant::new(2, "Blog")];
			assert_eq!(adapter().render_cell(&site(), &record_on(2), &tenants), None);
		}
	}

	proptest! {
		#[test]
		fn screen_id_is_idempotent(id in "[a-z_-]{0,24}", aggregate in any::<bool>()) {
			let scope = if aggregate { network() } else { site() };
			let adapter = adapter();
			let once = adapter.screen_id(&scope, &id);
			prop_assert_eq!(adapter.screen_id(&scope, &once), once);
		}

		#[test]
		fn tenant_column_is_second_to_last(n in 1usize..10) {
			let columns: Vec<Column> = (0..n).map(|i| Column::new(format!("c{i}"), "")).collect();
			let out = adapter().columns(&network(), columns.clone());
			prop_assert_eq!(out.len(), n + 1);
			prop_assert_eq!(out[n - 1].key.as_str(), TENANT_COLUMN);
			prop_assert_eq!(&out[n], &columns[n - 1]);
		}
	}
}
