// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `mbp-access`: access decisions against MBP policies from the command line.

mod fixture;
mod version;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mbp_server_auth::Policy;
use mbp_server_config::{LogFormat, LoggingConfig, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Evaluate MBP access-control policies offline.
#[derive(Parser, Debug)]
#[command(name = "mbp-access", about = "Evaluate MBP access-control policies", version)]
struct Args {
	/// Config file (defaults to /etc/mbp/server.toml)
	#[arg(long, global = true, env = "MBP_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Decide an authorization fixture and print the decision as JSON
	Evaluate {
		/// Fixture JSON file
		fixture: PathBuf,

		/// Shared policies JSON file (defaults to `access_control.policy_file`)
		#[arg(long)]
		policies: Option<PathBuf>,

		/// Access-request header value, replacing the fixture's context and headers
		#[arg(long)]
		context: Option<String>,
	},

	/// Validate a policies JSON file
	Check {
		/// Policies JSON file (a list of policies)
		policies: PathBuf,
	},

	/// Show version and build information
	Version,
}

fn main() -> ExitCode {
	match run(Args::parse()) {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:#}");
			ExitCode::from(2)
		}
	}
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
	if let Command::Version = args.command {
		println!("{}", version::format_version_info());
		return Ok(ExitCode::SUCCESS);
	}

	let config = match &args.config {
		Some(path) => mbp_server_config::load_config_with_file(path),
		None => mbp_server_config::load_config(),
	}
	.context("failed to load configuration")?;

	init_tracing(&config.logging);

	match args.command {
		Command::Evaluate {
			fixture,
			policies,
			context,
		} => evaluate(&config, fixture, policies, context),
		Command::Check { policies } => check(&config, policies),
		Command::Version => Ok(ExitCode::SUCCESS),
	}
}

/// Logs go to stderr so that stdout carries only the report.
fn init_tracing(logging: &LoggingConfig) {
	let registry = tracing_subscriber::registry().with(
		tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| logging.level.clone().into()),
	);

	match logging.format {
		LogFormat::Json => registry
			.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
			.init(),
		LogFormat::Pretty => registry
			.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
			.init(),
	}
}

fn evaluate(
	config: &ServerConfig,
	fixture_path: PathBuf,
	policies_path: Option<PathBuf>,
	context: Option<String>,
) -> anyhow::Result<ExitCode> {
	let mut fixture: fixture::Fixture = fixture::load_json(&fixture_path)?;
	if let Some(raw) = context {
		tracing::debug!("using context from command line");
		fixture.context = Some(serde_json::Value::String(raw));
	}

	let shared: Vec<Policy> = match policies_path.as_ref().or(config.access_control.policy_file.as_ref()) {
		Some(path) => fixture::load_json(path)?,
		None => Vec::new(),
	};

	let report = fixture::evaluate(fixture, shared, &config.access_control)?;
	tracing::info!(allowed = report.allowed, granted_by = ?report.granted_by, "decision");
	println!("{}", serde_json::to_string_pretty(&report)?);

	Ok(if report.allowed {
		ExitCode::SUCCESS
	} else {
		ExitCode::from(1)
	})
}

fn check(config: &ServerConfig, policies_path: PathBuf) -> anyhow::Result<ExitCode> {
	let policies: Vec<Policy> = fixture::load_json(&policies_path)?;
	let report = fixture::check_policies(&policies, config.access_control.max_condition_depth);

	for problem in &report.problems {
		eprintln!("{problem}");
	}
	println!(
		"{}: {} policies checked, {} problems",
		policies_path.display(),
		report.checked,
		report.problems.len()
	);

	Ok(if report.is_valid() {
		ExitCode::SUCCESS
	} else {
		ExitCode::from(1)
	})
}
