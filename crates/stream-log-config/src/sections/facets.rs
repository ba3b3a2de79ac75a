// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Network facets of the record list.

use serde::Deserialize;
use stream_log::facet::{
	DEFAULT_AGGREGATE_LABEL, DEFAULT_COLUMN_LABEL, DEFAULT_FILTER_TITLE,
	DEFAULT_LARGE_DEPLOYMENT_THRESHOLD,
};
use stream_log::FacetSettings;
use url::Url;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetsConfig {
	pub large_deployment_threshold: usize,
	pub aggregate_label: String,
	pub filter_title: String,
	pub column_label: String,
	pub records_url: Option<Url>,
}

impl Default for FacetsConfig {
	fn default() -> Self {
		Self {
			large_deployment_threshold: DEFAULT_LARGE_DEPLOYMENT_THRESHOLD,
			aggregate_label: DEFAULT_AGGREGATE_LABEL.to_string(),
			filter_title: DEFAULT_FILTER_TITLE.to_string(),
			column_label: DEFAULT_COLUMN_LABEL.to_string(),
			records_url: None,
		}
	}
}

impl FacetsConfig {
	pub fn settings(&self) -> FacetSettings {
		FacetSettings {
			aggregate_label: self.aggregate_label.clone(),
			filter_title: self.filter_title.clone(),
			column_label: self.column_label.clone(),
			large_deployment_threshold: self.large_deployment_threshold,
			records_url: self.records_url.clone(),
			..FacetSettings::default()
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FacetsConfigLayer {
	#[serde(default)]
	pub large_deployment_threshold: Option<usize>,
	#[serde(default)]
	pub aggregate_label: Option<String>,
	#[serde(default)]
	pub filter_title: Option<String>,
	#[serde(default)]
	pub column_label: Option<String>,
	#[serde(default)]
	pub records_url: Option<String>,
}

impl FacetsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.large_deployment_threshold.is_some() {
			self.large_deployment_threshold = other.large_deployment_threshold;
		}
		if other.aggregate_label.is_some() {
			self.aggregate_label = other.aggregate_label;
		}
		if other.filter_title.is_some() {
			self.filter_title = other.filter_title;
		}
		if other.column_label.is_some() {
			self.column_label = other.column_label;
		}
		if other.records_url.is_some() {
			self.records_url = other.records_url;
		}
	}

	pub fn finalize(self) -> Result<FacetsConfig, ConfigError> {
		let defaults = FacetsConfig::default();

		let large_deployment_threshold = self
			.large_deployment_threshold
			.unwrap_or(defaults.large_deployment_threshold);
		if large_deployment_threshold == 0 {
			return Err(ConfigError::Validation(
				"facets.large_deployment_threshold must be greater than zero".to_string(),
			));
		}

		let records_url = self
			.records_url
			.map(|raw| {
				Url::parse(&raw)
					.map_err(|e| ConfigError::invalid_value("facets.records_url", format!("'{raw}': {e}")))
			})
			.transpose()?;

		Ok(FacetsConfig {
			large_deployment_threshold,
			aggregate_label: self.aggregate_label.unwrap_or(defaults.aggregate_label),
			filter_title: self.filter_title.unwrap_or(defaults.filter_title),
			column_label: self.column_label.unwrap_or(defaults.column_label),
			records_url,
		})
	}
}
