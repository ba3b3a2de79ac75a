// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Actor resolution: turning an actor id into the snapshot embedded in a
//! record's meta.
//!
//! Lookups never fail a write. An unknown actor or a flaky identity backend
//! yields a snapshot with empty fields, logged at `debug`/`warn`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LookupError;
use crate::record::ActorId;
use crate::scope::{CallContext, ScopeContext, TenantId};

/// Display name used for nameless actors acting through automation.
pub const DEFAULT_AUTOMATION_DISPLAY_NAME: &str = "Automation";

/// Denormalized view of the actor at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ActorSnapshot {
	pub email: String,
	pub display_name: String,
	pub login: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub role_label: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub agent: Option<String>,
}

/// An identity as known to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identity {
	pub id: ActorId,
	pub login: String,
	pub email: String,
	pub display_name: String,
	/// Role ids in the tenant, primary role first.
	pub roles: Vec<String>,
}

impl Identity {
	pub fn primary_role(&self) -> Option<&str> {
		self.roles.first().map(String::as_str)
	}
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
	/// Looks up an actor and its roles in the scope's directory tenant
	/// ([`ScopeContext::directory_tenant_id`]).
	async fn identity(&self, scope: &ScopeContext, actor: ActorId)
		-> Result<Identity, LookupError>;

	/// Display label of a role id in the scope's directory tenant.
	async fn role_label(&self, scope: &ScopeContext, role: &str) -> Result<String, LookupError>;
}

/// Describes the client environment of the current call.
pub trait AgentProvider: Send + Sync {
	fn agent(&self, ctx: &CallContext) -> Option<String>;
}

/// Reports `agent` for automation calls and nothing for interactive ones.
#[derive(Debug, Clone)]
pub struct AutomationAgent {
	agent: String,
}

impl AutomationAgent {
	pub fn new(agent: impl Into<String>) -> Self {
		Self {
			agent: agent.into(),
		}
	}
}

impl Default for AutomationAgent {
	fn default() -> Self {
		Self::new("automation")
	}
}

impl AgentProvider for AutomationAgent {
	fn agent(&self, ctx: &CallContext) -> Option<String> {
		ctx.automation.then(|| self.agent.clone())
	}
}

pub struct ActorResolver {
	identities: Arc<dyn IdentityProvider>,
	agent: Arc<dyn AgentProvider>,
	automation_display_name: String,
}

impl ActorResolver {
	pub fn new(identities: Arc<dyn IdentityProvider>, agent: Arc<dyn AgentProvider>) -> Self {
		Self {
			identities,
			agent,
			automation_display_name: DEFAULT_AUTOMATION_DISPLAY_NAME.to_string(),
		}
	}

	pub fn with_automation_display_name(mut self, name: impl Into<String>) -> Self {
		self.automation_display_name = name.into();
		self
	}

	/// Looks up an actor, degrading to `None` on any failure.
	pub async fn lookup(&self, scope: &ScopeContext, actor: ActorId) -> Option<Identity> {
		if actor.is_system() {
			return None;
		}

		match self.identities.identity(scope, actor).await {
			Ok(identity) => Some(identity),
			Err(LookupError::NotFound(what)) => {
				debug!(actor_id = %actor, %what, "actor not found, recording without identity");
				None
			}
			Err(e) => {
				warn!(actor_id = %actor, error = %e, "actor lookup failed, recording without identity");
				None
			}
		}
	}

	/// Builds the snapshot for an already looked-up identity.
	pub async fn snapshot(&self, ctx: &CallContext, identity: Option<&Identity>) -> ActorSnapshot {
		let role_label = match identity.and_then(Identity::primary_role) {
			Some(role) => self.role_label(&ctx.scope, role).await,
			None => None,
		};

		let mut display_name = identity
			.map(|i| i.display_name.clone())
			.unwrap_or_default();
		if display_name.is_empty() && ctx.automation {
			display_name = self.automation_display_name.clone();
		}

		ActorSnapshot {
			email: identity.map(|i| i.email.clone()).unwrap_or_default(),
			display_name,
			login: identity.map(|i| i.login.clone()).unwrap_or_default(),
			role_label,
			agent: self.agent.agent(ctx).filter(|a| !a.is_empty()),
		}
	}

	async fn role_label(&self, scope: &ScopeContext, role: &str) -> Option<String> {
		match self.identities.role_label(scope, role).await {
			Ok(label) => Some(label),
			Err(e) => {
				debug!(role, error = %e, "role label unavailable");
				None
			}
		}
	}
}

/// Identity provider backed by in-process maps.
///
/// Role labels are registered per tenant; actors carry one role list per
/// tenant.
#[derive(Debug, Default)]
pub struct MemoryIdentityProvider {
	actors: RwLock<HashMap<ActorId, MemoryActor>>,
	role_labels: RwLock<HashMap<(TenantId, String), String>>,
}

#[derive(Debug, Clone, Default)]
struct MemoryActor {
	login: String,
	email: String,
	display_name: String,
	roles: HashMap<TenantId, Vec<String>>,
}

impl MemoryIdentityProvider {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_actor(
		&self,
		id: ActorId,
		login: impl Into<String>,
		email: impl Into<String>,
		display_name: impl Into<String>,
	) {
		self.actors.write().insert(
			id,
			MemoryActor {
				login: login.into(),
				email: email.into(),
				display_name: display_name.into(),
				roles: HashMap::new(),
			},
		);
	}

	pub fn assign_roles(&self, id: ActorId, tenant_id: TenantId, roles: Vec<String>) {
		if let Some(actor) = self.actors.write().get_mut(&id) {
			actor.roles.insert(tenant_id, roles);
		}
	}

	pub fn define_role(&self, tenant_id: TenantId, role: impl Into<String>, label: impl Into<String>) {
		self.role_labels
			.write()
			.insert((tenant_id, role.into()), label.into());
	}
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
	async fn identity(
		&self,
		scope: &ScopeContext,
		actor: ActorId,
	) -> Result<Identity, LookupError> {
		let actors = self.actors.read();
		let found = actors
			.get(&actor)
			.ok_or_else(|| LookupError::NotFound(format!("actor {actor}")))?;

		Ok(Identity {
			id: actor,
			login: found.login.clone(),
			email: found.email.clone(),
			display_name: found.display_name.clone(),
			roles: found
				.roles
				.get(&scope.directory_tenant_id)
				.cloned()
				.unwrap_or_default(),
		})
	}

	async fn role_label(&self, scope: &ScopeContext, role: &str) -> Result<String, LookupError> {
		self.role_labels
			.read()
			.get(&(scope.directory_tenant_id, role.to_string()))
			.cloned()
			.ok_or_else(|| LookupError::NotFound(format!("role {role}")))
	}
}
