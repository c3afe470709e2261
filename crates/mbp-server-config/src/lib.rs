// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the MBP access-control engine.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`MBP_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use mbp_server_config::load_config;
//!
//! let config = load_config()?;
//! let evaluator = ConditionEvaluator::new(config.access_control.max_condition_depth);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
	pub access_control: AccessControlConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`MBP_SERVER_*`)
/// 2. Config file (`/etc/mbp/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	];
	load_from_sources(sources)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(config_path: impl Into<std::path::PathBuf>) -> Result<ServerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	];
	load_from_sources(sources)
}

/// Merge `sources` in precedence order and finalize the result.
pub fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let access_control = layer.access_control.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&access_control)?;

	info!(
		max_condition_depth = access_control.max_condition_depth,
		access_request_header = %access_control.access_request_header,
		policy_file = ?access_control.policy_file,
		log_level = %logging.level,
		log_format = %logging.format,
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		access_control,
		logging,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(access_control: &AccessControlConfig) -> Result<(), ConfigError> {
	if access_control.max_condition_depth == 0 {
		return Err(ConfigError::Validation(
			"access_control.max_condition_depth must be at least 1".to_string(),
		));
	}

	if access_control.access_request_header.trim().is_empty() {
		return Err(ConfigError::Validation(
			"access_control.access_request_header must not be empty".to_string(),
		));
	}

	Ok(())
}
