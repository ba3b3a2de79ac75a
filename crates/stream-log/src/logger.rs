// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The write path.
//!
//! [`Logger`] is the capability the rest of an application depends on; the
//! implementation is picked once at startup and handed around as
//! `Arc<dyn Logger>`. [`EventLogger`] is the default one: it resolves the
//! actor, scopes the record to a tenant, renders the summary, chains the
//! record to the previous one written through the same instance and persists
//! it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, instrument, warn};

use crate::actor::ActorResolver;
use crate::chain::SessionChain;
use crate::error::{LogResult, StorageError};
use crate::record::{LogRequest, NewRecord, RecordId, ACTOR_META_KEY};
use crate::scope::{CallContext, TenantId};
use crate::storage::Storage;
use crate::summary;
use crate::transform::Transforms;

#[async_trait]
pub trait Logger: Send + Sync {
	/// Records one event and returns the id storage assigned to it.
	async fn log(&self, ctx: &CallContext, request: LogRequest) -> LogResult<RecordId>;
}

/// Default [`Logger`].
///
/// Each instance owns its session chain. Writers sharing an instance
/// concurrently may observe the same parent, so `parent_id` links can be
/// lost or point at a sibling rather than a predecessor.
pub struct EventLogger {
	storage: Arc<dyn Storage>,
	actors: ActorResolver,
	chain: SessionChain,
	tenant_id_transforms: Transforms<TenantId>,
	record_transforms: Transforms<NewRecord>,
}

impl EventLogger {
	pub fn new(storage: Arc<dyn Storage>, actors: ActorResolver) -> Self {
		Self {
			storage,
			actors,
			chain: SessionChain::new(),
			tenant_id_transforms: Transforms::new(),
			record_transforms: Transforms::new(),
		}
	}

	/// Registers an override for the tenant id records are logged under.
	pub fn on_tenant_id<F>(&mut self, transform: F)
	where
		F: Fn(TenantId) -> TenantId + Send + Sync + 'static,
	{
		self.tenant_id_transforms.register(transform);
	}

	/// Registers a transform applied to every record right before insert.
	pub fn on_record<F>(&mut self, transform: F)
	where
		F: Fn(NewRecord) -> NewRecord + Send + Sync + 'static,
	{
		self.record_transforms.register(transform);
	}

	/// Parent the next record written through this instance will get.
	pub fn session_parent(&self) -> Option<RecordId> {
		self.chain.parent()
	}

	#[instrument(
		skip(self, ctx, request),
		fields(connector = %request.connector, action = %request.action)
	)]
	pub async fn write(&self, ctx: &CallContext, request: LogRequest) -> LogResult<RecordId> {
		request.validate()?;

		let actor_id = request.actor_id.unwrap_or(ctx.actor_id);
		let identity = self.actors.lookup(&ctx.scope, actor_id).await;

		let mut args = request.args;
		if !args.contains_non_null(ACTOR_META_KEY) {
			let snapshot = self.actors.snapshot(ctx, identity.as_ref()).await;
			let snapshot = serde_json::to_value(snapshot).map_err(StorageError::from)?;
			args.insert(ACTOR_META_KEY, snapshot);
		}

		let values: Vec<&serde_json::Value> = args.values().collect();
		let summary = summary::render(&request.message, &values)?;

		let tenant_id = self
			.tenant_id_transforms
			.apply(ctx.scope.logged_tenant_id());

		let record = NewRecord {
			object_id: request.object_id,
			tenant_group_id: ctx.scope.tenant_group_id,
			tenant_id,
			actor_id,
			actor_role: identity
				.as_ref()
				.and_then(|i| i.primary_role())
				.map(String::from),
			created_at: Utc::now(),
			summary,
			parent_id: self.chain.parent(),
			connector: request.connector,
			context: request.context,
			action: request.action,
			meta: args.into_meta(),
			source_ip: ctx.source_ip(),
		};

		let mut record = self.record_transforms.apply(record);
		record.normalize_meta();

		let id = match self.storage.insert(record).await {
			Ok(id) => id,
			Err(e) => {
				warn!(error = %e, "failed to persist record");
				return Err(e.into());
			}
		};

		self.chain.advance(id);
		debug!(record_id = %id, tenant_id, "record persisted");
		Ok(id)
	}
}

#[async_trait]
impl Logger for EventLogger {
	async fn log(&self, ctx: &CallContext, request: LogRequest) -> LogResult<RecordId> {
		self.write(ctx, request).await
	}
}
