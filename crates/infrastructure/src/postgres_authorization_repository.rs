use std::str::FromStr;

use async_trait::async_trait;

use rowguard_application::{
    CriteriaMatcher, FixtureRepository, ModelRepository, PermissionQuery, PermissionRepository,
    TargetRecordRepository, UserRepository,
};
use rowguard_core::{AppError, AppResult};
use rowguard_domain::{
    CrudAction, EmailAddress, ModelDescriptor, ModelId, Permission, PermissionId,
    PermissionInput, Record, Role, RoleId, User, UserId, WhereClause,
};

use serde_json::Value;
use sqlx::{FromRow, PgPool};

use crate::StructuredCriteriaMatcher;

mod fixtures;
mod permissions;
mod records;
mod users;

#[cfg(test)]
mod tests;

/// PostgreSQL-backed store for users, permission grants and records.
#[derive(Clone)]
pub struct PostgresAuthorizationRepository {
    pool: PgPool,
    matcher: StructuredCriteriaMatcher,
}

impl PostgresAuthorizationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            matcher: StructuredCriteriaMatcher::new(),
        }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    email: String,
    roles: Vec<String>,
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: String,
    model_id: String,
    action: String,
    where_clause: Option<Value>,
    attributes: Vec<String>,
    roles: Vec<String>,
}

#[derive(Debug, FromRow)]
struct ModelRow {
    id: String,
    global_id: String,
    supports_ownership: bool,
}

#[derive(Debug, FromRow)]
struct RecordRow {
    data: Value,
}

#[async_trait]
impl UserRepository for PostgresAuthorizationRepository {
    async fn find_user_with_roles(&self, user_id: &UserId) -> AppResult<Option<User>> {
        self.find_user_with_roles_impl(user_id).await
    }
}

#[async_trait]
impl PermissionRepository for PostgresAuthorizationRepository {
    async fn list_permissions(&self, query: &PermissionQuery) -> AppResult<Vec<Permission>> {
        self.list_permissions_impl(query).await
    }
}

#[async_trait]
impl TargetRecordRepository for PostgresAuthorizationRepository {
    async fn find_target_records(
        &self,
        model: &ModelDescriptor,
        criteria: Option<&WhereClause>,
    ) -> AppResult<Vec<Record>> {
        self.find_target_records_impl(model, criteria).await
    }
}

#[async_trait]
impl ModelRepository for PostgresAuthorizationRepository {
    async fn find_model(&self, model_id: &ModelId) -> AppResult<Option<ModelDescriptor>> {
        self.find_model_impl(model_id).await
    }

    async fn count_models(&self) -> AppResult<usize> {
        self.count_models_impl().await
    }
}

#[async_trait]
impl FixtureRepository for PostgresAuthorizationRepository {
    async fn save_model(&self, model: ModelDescriptor) -> AppResult<()> {
        self.save_model_impl(model).await
    }

    async fn save_role(&self, role: Role) -> AppResult<()> {
        self.save_role_impl(role).await
    }

    async fn save_user(&self, user: User) -> AppResult<()> {
        self.save_user_impl(user).await
    }

    async fn save_permission(&self, permission: Permission) -> AppResult<()> {
        self.save_permission_impl(permission).await
    }

    async fn save_record(&self, model_id: &ModelId, record: Record) -> AppResult<()> {
        self.save_record_impl(model_id, record).await
    }
}
