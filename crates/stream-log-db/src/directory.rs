// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePool, Row};
use stream_log::{
	ActorId, Identity, IdentityProvider, LookupError, ScopeContext, Tenant, TenantDirectory,
	TenantGroupId, TenantId,
};

use crate::error::{DbError, Result};

/// Actors, their per-tenant roles, role labels and tenants.
#[derive(Clone)]
pub struct SqliteDirectory {
	pool: SqlitePool,
}

impl SqliteDirectory {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_identity(&self, tenant_id: TenantId, actor: ActorId) -> Result<Identity> {
		let row = sqlx::query("SELECT id, login, email, display_name FROM actors WHERE id = ?")
			.bind(actor.into_inner())
			.fetch_optional(&self.pool)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("actor {actor}")))?;

		let roles: Vec<String> = sqlx::query(
			"SELECT role FROM actor_roles WHERE actor_id = ? AND tenant_id = ? ORDER BY position",
		)
		.bind(actor.into_inner())
		.bind(tenant_id)
		.fetch_all(&self.pool)
		.await?
		.iter()
		.map(|r| r.try_get("role"))
		.collect::<std::result::Result<_, _>>()?;

		Ok(Identity {
			id: ActorId::new(row.try_get("id")?),
			login: row.try_get("login")?,
			email: row.try_get("email")?,
			display_name: row.try_get("display_name")?,
			roles,
		})
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_role_label(&self, tenant_id: TenantId, role: &str) -> Result<String> {
		let row = sqlx::query("SELECT label FROM role_labels WHERE tenant_id = ? AND role = ?")
			.bind(tenant_id)
			.bind(role)
			.fetch_optional(&self.pool)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("role {role}")))?;
		Ok(row.try_get("label")?)
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_tenants(&self, group: TenantGroupId) -> Result<Vec<Tenant>> {
		let rows = sqlx::query("SELECT id, name FROM tenants WHERE tenant_group_id = ? ORDER BY id")
			.bind(group)
			.fetch_all(&self.pool)
			.await?;

		rows.iter()
			.map(|row| -> Result<Tenant> {
				Ok(Tenant::new(row.try_get("id")?, row.try_get::<String, _>("name")?))
			})
			.collect()
	}

	pub async fn upsert_actor(
		&self,
		actor: ActorId,
		login: &str,
		email: &str,
		display_name: &str,
	) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO actors (id, login, email, display_name) VALUES (?, ?, ?, ?)
			ON CONFLICT(id) DO UPDATE SET
				login = excluded.login,
				email = excluded.email,
				display_name = excluded.display_name
			"#,
		)
		.bind(actor.into_inner())
		.bind(login)
		.bind(email)
		.bind(display_name)
		.execute(&self.pool)
		.await?;
		Ok(())
	}

	/// Replaces the actor's roles within a tenant; the first role is primary.
	pub async fn set_roles(&self, actor: ActorId, tenant_id: TenantId, roles: &[&str]) -> Result<()> {
		let mut tx = self.pool.begin().await?;
		sqlx::query("DELETE FROM actor_roles WHERE actor_id = ? AND tenant_id = ?")
			.bind(actor.into_inner())
			.bind(tenant_id)
			.execute(&mut *tx)
			.await?;
		for (position, role) in roles.iter().enumerate() {
			sqlx::query(
				"INSERT INTO actor_roles (actor_id, tenant_id, position, role) VALUES (?, ?, ?, ?)",
			)
			.bind(actor.into_inner())
			.bind(tenant_id)
			.bind(position as i64)
			.bind(*role)
			.execute(&mut *tx)
			.await?;
		}
		tx.commit().await?;
		Ok(())
	}

	pub async fn define_role(&self, tenant_id: TenantId, role: &str, label: &str) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO role_labels (tenant_id, role, label) VALUES (?, ?, ?)
			ON CONFLICT(tenant_id, role) DO UPDATE SET label = excluded.label
			"#,
		)
		.bind(tenant_id)
		.bind(role)
		.bind(label)
		.execute(&self.pool)
		.await?;
		Ok(())
	}

	pub async fn upsert_tenant(&self, group: TenantGroupId, tenant: &Tenant) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO tenants (id, tenant_group_id, name) VALUES (?, ?, ?)
			ON CONFLICT(id) DO UPDATE SET
				tenant_group_id = excluded.tenant_group_id,
				name = excluded.name
			"#,
		)
		.bind(tenant.id)
		.bind(group)
		.bind(tenant.name.as_str())
		.execute(&self.pool)
		.await?;
		Ok(())
	}
}

#[async_trait]
impl IdentityProvider for SqliteDirectory {
	async fn identity(
		&self,
		scope: &ScopeContext,
		actor: ActorId,
	) -> std::result::Result<Identity, LookupError> {
		Ok(self.get_identity(scope.directory_tenant_id, actor).await?)
	}

	async fn role_label(
		&self,
		scope: &ScopeContext,
		role: &str,
	) -> std::result::Result<String, LookupError> {
		Ok(self.get_role_label(scope.directory_tenant_id, role).await?)
	}
}

#[async_trait]
impl TenantDirectory for SqliteDirectory {
	async fn tenants(&self, group: TenantGroupId) -> std::result::Result<Vec<Tenant>, LookupError> {
		Ok(self.list_tenants(group).await?)
	}
}
