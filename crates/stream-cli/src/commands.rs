// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::SqlitePool;
use stream_log::{
	query_properties, ActorId, ActorResolver, AutomationAgent, CallContext, Column, EventLogger,
	EventRecord, Facet, FacetAdapter, FilterSet, LogRequest, Logger, RecordFilter, RecordQuery,
	RecordId, ScopeContext, Storage, Tenant, TenantDirectory, TenantId, TenantLink,
};
use stream_log_config::StreamConfig;
use stream_log_db::{SqliteDirectory, SqliteStorage};

/// Agent string recorded for events logged from this binary.
const CLI_AGENT: &str = "cli";

#[derive(Args, Debug)]
pub struct LogArgs {
	#[arg(long)]
	pub connector: String,

	#[arg(long)]
	pub action: String,

	/// Summary template, e.g. `"%1$s" updated`
	#[arg(long, default_value = "")]
	pub message: String,

	/// Event argument as key=value; the value is read as JSON when it parses
	#[arg(long = "arg", value_name = "KEY=VALUE", value_parser = parse_arg)]
	pub args: Vec<(String, Value)>,

	#[arg(long)]
	pub object_id: Option<i64>,

	/// Defaults to the connector
	#[arg(long)]
	pub context: Option<String>,

	/// Acting user id; 0 records the event as performed by the system
	#[arg(long, default_value_t = 0)]
	pub actor: i64,

	/// Tenant the event happened in; omit or pass 0 for the network scope
	#[arg(long)]
	pub tenant: Option<TenantId>,

	#[arg(long)]
	pub remote_addr: Option<String>,
}

#[derive(Args, Debug)]
pub struct FilterArgs {
	/// Tenant to browse; omit for the network scope
	#[arg(long)]
	pub tenant: Option<TenantId>,

	#[arg(long)]
	pub connector: Option<String>,

	#[arg(long)]
	pub context: Option<String>,

	#[arg(long)]
	pub action: Option<String>,

	#[arg(long)]
	pub actor: Option<i64>,

	#[arg(long)]
	pub object_id: Option<i64>,

	#[arg(long)]
	pub parent: Option<i64>,

	/// RFC 3339 lower bound, inclusive
	#[arg(long)]
	pub since: Option<DateTime<Utc>>,

	/// RFC 3339 upper bound, inclusive
	#[arg(long)]
	pub until: Option<DateTime<Utc>>,

	/// Case-insensitive summary substring
	#[arg(long)]
	pub search: Option<String>,

	#[arg(long)]
	pub limit: Option<i64>,

	#[arg(long)]
	pub offset: Option<i64>,
}

impl FilterArgs {
	fn filter(&self) -> RecordFilter {
		RecordFilter {
			connector: self.connector.clone(),
			context: self.context.clone(),
			action: self.action.clone(),
			actor_id: self.actor.map(ActorId::new),
			object_id: self.object_id,
			parent_id: self.parent.map(RecordId::new),
			created_from: self.since,
			created_to: self.until,
			search: self.search.clone(),
			..Default::default()
		}
	}
}

#[derive(Args, Debug)]
pub struct QueryArgs {
	#[command(flatten)]
	pub filter: FilterArgs,

	/// Aggregate on a record property (tenant_id, connector, context, action, actor_id)
	#[arg(long = "facet")]
	pub facets: Vec<Facet>,
}

#[derive(Args, Debug)]
pub struct BrowseArgs {
	#[command(flatten)]
	pub filter: FilterArgs,

	/// Screen the list is shown on
	#[arg(long, default_value = "stream")]
	pub screen_id: String,
}

#[derive(Subcommand, Debug)]
pub enum DirectoryCommand {
	/// Register or rename a tenant in the configured group
	AddTenant {
		id: TenantId,
		name: String,
	},
	/// Register or update an actor, optionally assigning roles in a tenant
	AddActor {
		id: i64,
		login: String,
		#[arg(long, default_value = "")]
		email: String,
		#[arg(long)]
		display_name: Option<String>,
		#[arg(long)]
		tenant: Option<TenantId>,
		/// Roles in the tenant, primary first
		#[arg(long = "role", requires = "tenant")]
		roles: Vec<String>,
	},
	/// Set the display label of a role within a tenant
	DefineRole {
		tenant: TenantId,
		role: String,
		label: String,
	},
}

fn parse_arg(raw: &str) -> Result<(String, Value), String> {
	let (key, value) = raw
		.split_once('=')
		.ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
	if key.is_empty() {
		return Err(format!("empty key in '{raw}'"));
	}
	let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
	Ok((key.to_string(), value))
}

#[derive(Serialize)]
struct BrowseRow<'a> {
	#[serde(flatten)]
	record: &'a EventRecord,
	#[serde(skip_serializing_if = "Option::is_none")]
	tenant: Option<TenantLink>,
}

#[derive(Serialize)]
struct BrowseView<'a> {
	screen_id: String,
	total: i64,
	columns: Vec<Column>,
	column_defaults: Vec<String>,
	filters: FilterSet,
	rows: Vec<BrowseRow<'a>>,
}

pub struct App {
	config: StreamConfig,
	storage: Arc<SqliteStorage>,
	directory: Arc<SqliteDirectory>,
}

impl App {
	pub fn new(config: StreamConfig, pool: SqlitePool) -> Self {
		Self {
			config,
			storage: Arc::new(SqliteStorage::new(pool.clone())),
			directory: Arc::new(SqliteDirectory::new(pool)),
		}
	}

	fn scope(&self, tenant: Option<TenantId>) -> ScopeContext {
		self.config.scope.context(tenant)
	}

	fn logger(&self) -> EventLogger {
		let actors = ActorResolver::new(
			self.directory.clone(),
			Arc::new(AutomationAgent::new(CLI_AGENT)),
		)
		.with_automation_display_name(self.config.logger.automation_display_name.clone());
		EventLogger::new(self.storage.clone(), actors)
	}

	pub async fn log(&self, args: LogArgs) -> anyhow::Result<()> {
		let mut builder = LogRequest::builder(&args.connector, &args.action).message(args.message);
		for (key, value) in args.args {
			builder = builder.arg(key, value);
		}
		if let Some(object_id) = args.object_id {
			builder = builder.object_id(object_id);
		}
		if let Some(context) = args.context {
			builder = builder.context(context);
		}
		let request = builder.build()?;

		let mut ctx = CallContext::new(self.scope(args.tenant), ActorId::new(args.actor)).automation(true);
		if let Some(addr) = args.remote_addr {
			ctx = ctx.remote_addr(addr);
		}

		let id = self
			.logger()
			.log(&ctx, request)
			.await
			.context("failed to record event")?;
		println!("{}", serde_json::json!({ "id": id }));
		Ok(())
	}

	pub async fn query(&self, args: QueryArgs) -> anyhow::Result<()> {
		let scope = self.scope(args.filter.tenant);
		let mut query = RecordQuery::new(query_properties(&scope, args.filter.filter()));
		query.limit = args.filter.limit;
		query.offset = args.filter.offset;
		for facet in args.facets {
			query.aggregate(facet);
		}

		let result = self.storage.query(&query).await?;
		println!("{}", serde_json::to_string_pretty(&result)?);
		Ok(())
	}

	pub async fn browse(&self, args: BrowseArgs) -> anyhow::Result<()> {
		let scope = self.scope(args.filter.tenant);
		let adapter = FacetAdapter::new(self.config.facets.settings());

		let mut query = RecordQuery::new(query_properties(&scope, args.filter.filter()));
		query.limit = args.filter.limit;
		query.offset = args.filter.offset;
		let query = adapter.query_args(&scope, query);

		let result = self.storage.query(&query).await?;
		let tenants: Vec<Tenant> = if scope.is_aggregate() {
			self.directory.tenants(scope.tenant_group_id).await?
		} else {
			Vec::new()
		};

		let columns = adapter.columns(&scope, default_columns());
		let column_defaults = adapter.column_defaults(
			&scope,
			default_columns().into_iter().map(|c| c.key).collect(),
		);
		let rows = result
			.records
			.iter()
			.map(|record| BrowseRow {
				record,
				tenant: adapter.render_cell(&scope, record, &tenants),
			})
			.collect();

		let view = BrowseView {
			screen_id: adapter.screen_id(&scope, &args.screen_id),
			total: result.total,
			columns,
			column_defaults,
			filters: adapter.filters(&scope, FilterSet::new(), &tenants, &result),
			rows,
		};
		println!("{}", serde_json::to_string_pretty(&view)?);
		Ok(())
	}

	pub async fn directory(&self, cmd: DirectoryCommand) -> anyhow::Result<()> {
		match cmd {
			DirectoryCommand::AddTenant { id, name } => {
				self.directory
					.upsert_tenant(self.config.scope.tenant_group_id, &Tenant::new(id, name))
					.await
					.with_context(|| format!("failed to save tenant {id}"))?;
				tracing::info!(tenant_id = id, "tenant saved");
			}
			DirectoryCommand::AddActor {
				id,
				login,
				email,
				display_name,
				tenant,
				roles,
			} => {
				let actor = ActorId::new(id);
				let display_name = display_name.unwrap_or_else(|| login.clone());
				self.directory
					.upsert_actor(actor, &login, &email, &display_name)
					.await
					.with_context(|| format!("failed to save actor {id}"))?;
				if let Some(tenant) = tenant {
					let roles: Vec<&str> = roles.iter().map(String::as_str).collect();
					self.directory.set_roles(actor, tenant, &roles).await?;
				}
				tracing::info!(actor_id = id, "actor saved");
			}
			DirectoryCommand::DefineRole {
				tenant,
				role,
				label,
			} => {
				self.directory.define_role(tenant, &role, &label).await?;
				tracing::info!(tenant_id = tenant, role = %role, "role defined");
			}
		}
		Ok(())
	}
}

fn default_columns() -> Vec<Column> {
	vec![
		Column::new("date", "Date"),
		Column::new("summary", "Summary"),
		Column::new("user_id", "User"),
		Column::new("context", "Context"),
		Column::new("action", "Action"),
		Column::new("ip", "IP Address"),
	]
}
