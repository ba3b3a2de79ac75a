// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `stream` binary: records events into and browses the activity stream.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use stream_log_config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Stream - multi-tenant activity log.
#[derive(Parser, Debug)]
#[command(name = "stream", about = "Record and browse the activity stream", version)]
struct Args {
	/// Config file to read instead of /etc/stream/stream.toml
	#[arg(long, short = 'c', env = "STREAM_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Record one event
	Log(commands::LogArgs),
	/// Query records as JSON
	Query(commands::QueryArgs),
	/// Show the record list with tenant facets applied
	Browse(commands::BrowseArgs),
	/// Manage actors, roles and tenants
	#[command(subcommand)]
	Directory(commands::DirectoryCommand),
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| logging.level.clone().into());
	let registry = tracing_subscriber::registry().with(filter);

	match logging.format {
		LogFormat::Json => registry
			.with(
				tracing_subscriber::fmt::layer()
					.json()
					.with_writer(std::io::stderr),
			)
			.init(),
		LogFormat::Plain => registry
			.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
			.init(),
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	// Load .env file if present
	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => stream_log_config::load_config_with_file(path)?,
		None => stream_log_config::load_config()?,
	};

	init_tracing(&config.logging);

	tracing::debug!(
		database = %config.database.url,
		multisite = config.scope.multisite,
		"starting stream"
	);

	let pool_settings = stream_log_db::PoolSettings {
		max_connections: config.database.max_connections,
		busy_timeout: Duration::from_millis(config.database.busy_timeout_ms),
	};
	let pool = stream_log_db::create_pool_with(&config.database.url, &pool_settings).await?;
	stream_log_db::run_migrations(&pool).await?;

	let app = commands::App::new(config, pool);
	match args.command {
		Command::Log(cmd) => app.log(cmd).await,
		Command::Query(cmd) => app.query(cmd).await,
		Command::Browse(cmd) => app.browse(cmd).await,
		Command::Directory(cmd) => app.directory(cmd).await,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	#[test]
	fn cli_definition_is_valid() {
		Args::command().debug_assert();
	}

	#[test]
	fn parses_log_invocation() {
		let args = Args::try_parse_from([
			"stream",
			"log",
			"--connector",
			"posts",
			"--action",
			"updated",
			"--message",
			"\"%s\" updated",
			"--arg",
			"post_title=Hello",
			"--tenant",
			"3",
		])
		.unwrap();

		match args.command {
			Command::Log(cmd) => {
				assert_eq!(cmd.connector, "posts");
				assert_eq!(cmd.tenant, Some(3));
				assert_eq!(cmd.args.len(), 1);
			}
			other => panic!("unexpected command: {other:?}"),
		}
	}
}
