// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the activity stream.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Validation of values the logger and facet adapter depend on
//! - Consistent environment variable naming (`STREAM_*`)
//!
//! # Usage
//!
//! ```ignore
//! use stream_log_config::load_config;
//!
//! let config = load_config()?;
//! println!("Recording to {}", config.database.url);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::StreamConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub scope: ScopeConfig,
	pub logger: LoggerConfig,
	pub facets: FacetsConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`STREAM_*`)
/// 2. Config file (`/etc/stream/stream.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<StreamConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from an explicitly named file, which must exist.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<StreamConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge the given sources in precedence order and finalize.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<StreamConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = StreamConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: StreamConfigLayer) -> Result<StreamConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize()?;
	let logging = layer.logging.unwrap_or_default().finalize();
	let scope = layer.scope.unwrap_or_default().finalize()?;
	let logger = layer.logger.unwrap_or_default().finalize();
	let facets = layer.facets.unwrap_or_default().finalize()?;

	info!(
		database = %database.url,
		tenant_group_id = scope.tenant_group_id,
		multisite = scope.multisite,
		primary_tenant_id = scope.primary_tenant_id,
		large_deployment_threshold = facets.large_deployment_threshold,
		"Stream configuration loaded"
	);

	Ok(StreamConfig {
		database,
		logging,
		scope,
		logger,
		facets,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	fn from_file(contents: &str) -> Result<StreamConfig, ConfigError> {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(contents.as_bytes()).unwrap();
		load_from_sources(vec![
			Box::new(TomlSource::new(file.path())),
			Box::new(DefaultsSource),
		])
	}

	#[test]
	fn defaults_only() {
		let config = load_from_sources(vec![Box::new(DefaultsSource)]).unwrap();
		assert_eq!(config.database.url, "sqlite:./stream.db");
		assert_eq!(config.scope.tenant_group_id, 1);
		assert!(!config.scope.multisite);
		assert_eq!(config.logger.automation_display_name, "Automation");
		assert_eq!(config.facets.large_deployment_threshold, 10_000);
	}

	#[test]
	fn file_overrides_defaults() {
		let config = from_file(
			r#"
			[database]
			url = "sqlite:/var/lib/stream/stream.db"

			[logging]
			level = "debug"
			format = "json"

			[scope]
			tenant_group_id = 2
			multisite = true
			primary_tenant_id = 6

			[logger]
			automation_display_name = "WP-CLI"

			[facets]
			large_deployment_threshold = 500
			records_url = "https://example.com/wp-admin/network/admin.php?page=wp_stream"
			"#,
		)
		.unwrap();

		assert_eq!(config.database.url, "sqlite:/var/lib/stream/stream.db");
		assert_eq!(config.logging.level, "debug");
		assert_eq!(config.logging.format, LogFormat::Json);
		assert_eq!(config.scope.tenant_group_id, 2);
		assert!(config.scope.multisite);
		assert_eq!(config.scope.primary_tenant_id, 6);
		assert_eq!(config.logger.automation_display_name, "WP-CLI");
		assert_eq!(config.facets.large_deployment_threshold, 500);
		assert!(config.facets.records_url.is_some());
	}

	#[test]
	fn explicit_file_must_exist() {
		let dir = tempfile::tempdir().unwrap();
		let err = load_config_with_file(dir.path().join("missing.toml")).unwrap_err();
		assert!(matches!(err, ConfigError::FileRead { .. }));
	}

	#[test]
	fn invalid_file_values_fail_validation() {
		let err = from_file("[facets]\nlarge_deployment_threshold = 0\n").unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn higher_precedence_source_wins_regardless_of_order() {
		struct Fixed(Precedence, &'static str);

		impl ConfigSource for Fixed {
			fn name(&self) -> &'static str {
				"fixed"
			}

			fn precedence(&self) -> Precedence {
				self.0
			}

			fn load(&self) -> Result<StreamConfigLayer, ConfigError> {
				Ok(StreamConfigLayer {
					database: Some(DatabaseConfigLayer {
						url: Some(self.1.to_string()),
						..Default::default()
					}),
					..Default::default()
				})
			}
		}

		let config = load_from_sources(vec![
			Box::new(Fixed(Precedence::Environment, "sqlite:env.db")),
			Box::new(Fixed(Precedence::ConfigFile, "sqlite:file.db")),
		])
		.unwrap();
		assert_eq!(config.database.url, "sqlite:env.db");
	}
}
