// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layer sources merged by [`crate::load_from_sources`].

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::StreamConfigLayer;
use crate::sections::{
	DatabaseConfigLayer, FacetsConfigLayer, LogFormat, LoggerConfigLayer, LoggingConfigLayer,
	ScopeConfigLayer,
};

/// Where a layer came from. Sources are merged in ascending order, so a
/// `STREAM_*` variable beats the config file, which beats built-in defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Produces one configuration layer.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<StreamConfigLayer, ConfigError>;
}

/// Empty layer; every section falls back to its built-in defaults when
/// finalized.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<StreamConfigLayer, ConfigError> {
		Ok(StreamConfigLayer::default())
	}
}

/// Location of the system-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/stream/stream.toml";

/// A `stream.toml` file.
///
/// The system file is optional; a file the operator names explicitly must
/// exist.
pub struct TomlSource {
	path: PathBuf,
	required: bool,
}

impl TomlSource {
	/// Optional file at `path`; a missing file contributes nothing.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: false,
		}
	}

	/// File at `path` that must exist.
	pub fn required(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: true,
		}
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"stream.toml"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<StreamConfigLayer, ConfigError> {
		let content = match std::fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound && !self.required => {
				debug!(path = %self.path.display(), "no config file, using defaults and environment");
				return Ok(StreamConfigLayer::default());
			}
			Err(e) => {
				return Err(ConfigError::FileRead {
					path: self.path.clone(),
					source: e,
				})
			}
		};

		let layer: StreamConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!(path = %self.path.display(), "parsed stream.toml");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: STREAM_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<StreamConfigLayer, ConfigError> {
		debug!("loading environment variables");
		layer_from(&Env(|name| std::env::var(name).ok()))
	}
}

/// Variable lookup, so tests need not touch the process environment.
struct Env<F: Fn(&str) -> Option<String>>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
	fn var(&self, name: &str) -> Option<String> {
		(self.0)(name).filter(|s| !s.is_empty())
	}

	fn bool(&self, name: &str) -> Option<bool> {
		self.var(name)
			.map(|v| v.eq_ignore_ascii_case("true") || v == "1")
	}

	fn parse<T: FromStr>(&self, name: &str, kind: &str) -> Result<Option<T>, ConfigError> {
		match self.var(name) {
			Some(v) => v.trim().parse().map(Some).map_err(|_| {
				ConfigError::invalid_value(name, format!("invalid {kind} value '{v}'"))
			}),
			None => Ok(None),
		}
	}
}

fn layer_from<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<StreamConfigLayer, ConfigError> {
	let format = match env.var("STREAM_LOG_FORMAT") {
		Some(v) => Some(
			LogFormat::from_str(&v)
				.map_err(|message| ConfigError::invalid_value("STREAM_LOG_FORMAT", message))?,
		),
		None => None,
	};

	Ok(StreamConfigLayer {
		database: Some(DatabaseConfigLayer {
			url: env.var("STREAM_DATABASE_URL"),
			max_connections: env.parse("STREAM_DATABASE_MAX_CONNECTIONS", "u32")?,
			busy_timeout_ms: env.parse("STREAM_DATABASE_BUSY_TIMEOUT_MS", "u64")?,
		}),
		logging: Some(LoggingConfigLayer {
			level: env.var("STREAM_LOG_LEVEL"),
			format,
		}),
		scope: Some(ScopeConfigLayer {
			tenant_group_id: env.parse("STREAM_TENANT_GROUP_ID", "i64")?,
			multisite: env.bool("STREAM_MULTISITE"),
			primary_tenant_id: env.parse("STREAM_PRIMARY_TENANT_ID", "i64")?,
		}),
		logger: Some(LoggerConfigLayer {
			automation_display_name: env.var("STREAM_AUTOMATION_DISPLAY_NAME"),
		}),
		facets: Some(FacetsConfigLayer {
			large_deployment_threshold: env.parse("STREAM_LARGE_DEPLOYMENT_THRESHOLD", "usize")?,
			aggregate_label: env.var("STREAM_AGGREGATE_LABEL"),
			records_url: env.var("STREAM_RECORDS_URL"),
			..Default::default()
		}),
	})
}
