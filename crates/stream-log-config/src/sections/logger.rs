// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;
use stream_log::DEFAULT_AUTOMATION_DISPLAY_NAME;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
	/// Display name recorded for nameless actors in automation calls.
	pub automation_display_name: String,
}

impl Default for LoggerConfig {
	fn default() -> Self {
		Self {
			automation_display_name: DEFAULT_AUTOMATION_DISPLAY_NAME.to_string(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LoggerConfigLayer {
	#[serde(default)]
	pub automation_display_name: Option<String>,
}

impl LoggerConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.automation_display_name.is_some() {
			self.automation_display_name = other.automation_display_name;
		}
	}

	pub fn finalize(self) -> LoggerConfig {
		LoggerConfig {
			automation_display_name: self
				.automation_display_name
				.unwrap_or_else(|| DEFAULT_AUTOMATION_DISPLAY_NAME.to_string()),
		}
	}
}
