// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access-control engine configuration.

use std::path::PathBuf;

use serde::Deserialize;

pub const DEFAULT_MAX_CONDITION_DEPTH: usize = 64;
pub const DEFAULT_ACCESS_REQUEST_HEADER: &str = "X-MBP-Access-Request";

/// Access-control configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessControlConfig {
	/// Deepest condition tree accepted when storing or evaluating policies.
	pub max_condition_depth: usize,
	/// Request header carrying the caller-supplied context attributes.
	pub access_request_header: String,
	/// Optional JSON file of policies loaded at startup.
	pub policy_file: Option<PathBuf>,
}

impl Default for AccessControlConfig {
	fn default() -> Self {
		AccessControlConfigLayer::default().finalize()
	}
}

/// Access-control configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessControlConfigLayer {
	#[serde(default)]
	pub max_condition_depth: Option<usize>,
	#[serde(default)]
	pub access_request_header: Option<String>,
	#[serde(default)]
	pub policy_file: Option<PathBuf>,
}

impl AccessControlConfigLayer {
	pub fn merge(&mut self, other: AccessControlConfigLayer) {
		if other.max_condition_depth.is_some() {
			self.max_condition_depth = other.max_condition_depth;
		}
		if other.access_request_header.is_some() {
			self.access_request_header = other.access_request_header;
		}
		if other.policy_file.is_some() {
			self.policy_file = other.policy_file;
		}
	}

	pub fn finalize(self) -> AccessControlConfig {
		AccessControlConfig {
			max_condition_depth: self.max_condition_depth.unwrap_or(DEFAULT_MAX_CONDITION_DEPTH),
			access_request_header: self
				.access_request_header
				.unwrap_or_else(|| DEFAULT_ACCESS_REQUEST_HEADER.to_string()),
			policy_file: self.policy_file,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = AccessControlConfigLayer::default().finalize();
		assert_eq!(config.max_condition_depth, 64);
		assert_eq!(config.access_request_header, "X-MBP-Access-Request");
		assert!(config.policy_file.is_none());
	}

	#[test]
	fn test_merge_overrides_only_set_fields() {
		let mut base = AccessControlConfigLayer {
			max_condition_depth: Some(16),
			access_request_header: Some("X-Context".to_string()),
			policy_file: None,
		};
		base.merge(AccessControlConfigLayer {
			max_condition_depth: Some(8),
			..Default::default()
		});

		let config = base.finalize();
		assert_eq!(config.max_condition_depth, 8);
		assert_eq!(config.access_request_header, "X-Context");
	}
}
