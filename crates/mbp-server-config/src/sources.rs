// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{AccessControlConfigLayer, LogFormat, LoggingConfigLayer};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/mbp/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: MBP_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		load_from(|name| std::env::var(name).ok())
	}
}

/// Builds a layer from a variable lookup; blank values count as unset.
fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<ServerConfigLayer, ConfigError> {
	let var = |name: &str| lookup(name).filter(|s| !s.trim().is_empty());

	let max_condition_depth = match var("MBP_SERVER_ACCESS_CONTROL_MAX_CONDITION_DEPTH") {
		Some(v) => Some(v.trim().parse::<usize>().map_err(|_| ConfigError::InvalidValue {
			key: "MBP_SERVER_ACCESS_CONTROL_MAX_CONDITION_DEPTH".to_string(),
			message: format!("invalid usize value '{v}'"),
		})?),
		None => None,
	};

	let format = match var("MBP_SERVER_LOG_FORMAT") {
		Some(v) => Some(v.parse::<LogFormat>().map_err(|message| ConfigError::InvalidValue {
			key: "MBP_SERVER_LOG_FORMAT".to_string(),
			message,
		})?),
		None => None,
	};

	Ok(ServerConfigLayer {
		access_control: Some(AccessControlConfigLayer {
			max_condition_depth,
			access_request_header: var("MBP_SERVER_ACCESS_CONTROL_REQUEST_HEADER"),
			policy_file: var("MBP_SERVER_ACCESS_CONTROL_POLICY_FILE").map(PathBuf::from),
		}),
		logging: Some(LoggingConfigLayer {
			level: var("MBP_SERVER_LOG_LEVEL"),
			format,
		}),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::io::Write;

	fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
		move |name: &str| map.get(name).cloned()
	}

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Environment > Precedence::ConfigFile);
		assert!(Precedence::ConfigFile > Precedence::Defaults);
	}

	#[test]
	fn test_defaults_source_returns_empty_layer() {
		let layer = DefaultsSource.load().unwrap();
		assert!(layer.access_control.is_none());
		assert!(layer.logging.is_none());
	}

	#[test]
	fn test_toml_source_missing_file_returns_empty() {
		let layer = TomlSource::new("/nonexistent/server.toml").load().unwrap();
		assert!(layer.access_control.is_none());
	}

	#[test]
	fn test_toml_source_parses_sections() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[access_control]
max_condition_depth = 12
policy_file = "/var/lib/mbp/policies.json"

[logging]
format = "json"
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		let access_control = layer.access_control.unwrap();
		assert_eq!(access_control.max_condition_depth, Some(12));
		assert_eq!(access_control.access_request_header, None);
		assert_eq!(
			access_control.policy_file,
			Some(PathBuf::from("/var/lib/mbp/policies.json"))
		);
		assert_eq!(layer.logging.unwrap().format, Some(LogFormat::Json));
	}

	#[test]
	fn test_toml_source_reports_parse_errors() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[access_control\nmax_condition_depth = ").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn test_env_values_are_parsed() {
		let layer = load_from(env(&[
			("MBP_SERVER_ACCESS_CONTROL_MAX_CONDITION_DEPTH", "32"),
			("MBP_SERVER_ACCESS_CONTROL_REQUEST_HEADER", "X-Context"),
			("MBP_SERVER_LOG_LEVEL", "debug"),
			("MBP_SERVER_LOG_FORMAT", ""),
		]))
		.unwrap();

		let access_control = layer.access_control.unwrap();
		assert_eq!(access_control.max_condition_depth, Some(32));
		assert_eq!(access_control.access_request_header.as_deref(), Some("X-Context"));
		let logging = layer.logging.unwrap();
		assert_eq!(logging.level.as_deref(), Some("debug"));
		assert_eq!(logging.format, None);
	}

	#[test]
	fn test_env_rejects_invalid_numbers() {
		let err = load_from(env(&[("MBP_SERVER_ACCESS_CONTROL_MAX_CONDITION_DEPTH", "deep")])).unwrap_err();
		assert!(err.to_string().contains("MBP_SERVER_ACCESS_CONTROL_MAX_CONDITION_DEPTH"));
	}
}
