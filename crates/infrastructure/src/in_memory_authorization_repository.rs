use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use rowguard_application::{
    CriteriaMatcher, FixtureRepository, ModelRepository, PermissionQuery, PermissionRepository,
    TargetRecordRepository, UserRepository,
};
use rowguard_core::{AppError, AppResult};
use rowguard_domain::{
    ModelDescriptor, ModelId, Permission, PermissionId, Record, Role, RoleId, User, UserId,
    WhereClause,
};
use tokio::sync::RwLock;

use crate::StructuredCriteriaMatcher;


/// In-memory store for models, users, roles, permission grants and records.
#[derive(Debug, Default)]
pub struct InMemoryAuthorizationRepository {
    models: RwLock<HashMap<ModelId, ModelDescriptor>>,
    roles: RwLock<HashMap<RoleId, Role>>,
    users: RwLock<HashMap<UserId, User>>,
    permissions: RwLock<BTreeMap<PermissionId, Permission>>,
    records: RwLock<HashMap<ModelId, Vec<Record>>>,
    matcher: StructuredCriteriaMatcher,
}

impl InMemoryAuthorizationRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn ensure_model_exists(&self, model_id: &ModelId) -> AppResult<()> {
        if self.models.read().await.contains_key(model_id) {
            return Ok(());
        }

        Err(AppError::NotFound(format!("model '{model_id}' does not exist")))
    }

    async fn ensure_roles_exist<'a>(
        &self,
        roles: impl IntoIterator<Item = &'a RoleId>,
    ) -> AppResult<()> {
        let stored = self.roles.read().await;
        match roles.into_iter().find(|role_id| !stored.contains_key(*role_id)) {
            Some(missing) => Err(AppError::NotFound(format!("role '{missing}' does not exist"))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryAuthorizationRepository {
    async fn find_user_with_roles(&self, user_id: &UserId) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }
}

#[async_trait]
impl PermissionRepository for InMemoryAuthorizationRepository {
    async fn list_permissions(&self, query: &PermissionQuery) -> AppResult<Vec<Permission>> {
        Ok(self
            .permissions
            .read()
            .await
            .values()
            .filter(|permission| permission.applies_to(&query.model, query.action, &query.roles))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TargetRecordRepository for InMemoryAuthorizationRepository {
    async fn find_target_records(
        &self,
        model: &ModelDescriptor,
        criteria: Option<&WhereClause>,
    ) -> AppResult<Vec<Record>> {
        let records = self.records.read().await;
        let Some(stored) = records.get(model.id()) else {
            return Ok(Vec::new());
        };

        match criteria {
            Some(criteria) => Ok(self
                .matcher
                .filter(criteria, stored)?
                .into_iter()
                .cloned()
                .collect()),
            None => Ok(stored.clone()),
        }
    }
}

#[async_trait]
impl ModelRepository for InMemoryAuthorizationRepository {
    async fn find_model(&self, model_id: &ModelId) -> AppResult<Option<ModelDescriptor>> {
        Ok(self.models.read().await.get(model_id).cloned())
    }

    async fn count_models(&self) -> AppResult<usize> {
        Ok(self.models.read().await.len())
    }
}

#[async_trait]
impl FixtureRepository for InMemoryAuthorizationRepository {
    async fn save_model(&self, model: ModelDescriptor) -> AppResult<()> {
        let mut models = self.models.write().await;
        if models.contains_key(model.id()) {
            return Err(AppError::Conflict(format!(
                "model '{}' already exists",
                model.id()
            )));
        }

        models.insert(model.id().clone(), model);
        Ok(())
    }

    async fn save_role(&self, role: Role) -> AppResult<()> {
        let mut roles = self.roles.write().await;
        if roles.contains_key(role.id()) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.id()
            )));
        }

        roles.insert(role.id().clone(), role);
        Ok(())
    }

    async fn save_user(&self, user: User) -> AppResult<()> {
        self.ensure_roles_exist(user.roles()).await?;
        self.users.write().await.insert(user.id().clone(), user);
        Ok(())
    }

    async fn save_permission(&self, permission: Permission) -> AppResult<()> {
        self.ensure_model_exists(permission.model()).await?;
        self.ensure_roles_exist(permission.roles()).await?;

        let mut permissions = self.permissions.write().await;
        if permissions.contains_key(permission.id()) {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                permission.id()
            )));
        }

        permissions.insert(permission.id().clone(), permission);
        Ok(())
    }

    async fn save_record(&self, model_id: &ModelId, record: Record) -> AppResult<()> {
        self.ensure_model_exists(model_id).await?;
        self.records
            .write()
            .await
            .entry(model_id.clone())
            .or_default()
            .push(record);
        Ok(())
    }
}
