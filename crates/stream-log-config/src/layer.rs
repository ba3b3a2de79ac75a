// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

use crate::sections::{
	DatabaseConfigLayer, FacetsConfigLayer, LoggerConfigLayer, LoggingConfigLayer,
	ScopeConfigLayer,
};

/// One source's partial view of the configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	#[serde(default)]
	pub scope: Option<ScopeConfigLayer>,
	#[serde(default)]
	pub logger: Option<LoggerConfigLayer>,
	#[serde(default)]
	pub facets: Option<FacetsConfigLayer>,
}

fn merge_section<T: Default>(target: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	if let Some(other) = other {
		merge(target.get_or_insert_with(T::default), other);
	}
}

impl StreamConfigLayer {
	/// Overlays `other` on top of `self`; set fields in `other` win.
	pub fn merge(&mut self, other: StreamConfigLayer) {
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_section(&mut self.scope, other.scope, ScopeConfigLayer::merge);
		merge_section(&mut self.logger, other.logger, LoggerConfigLayer::merge);
		merge_section(&mut self.facets, other.facets, FacetsConfigLayer::merge);
	}
}
