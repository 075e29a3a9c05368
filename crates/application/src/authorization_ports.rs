use std::collections::BTreeSet;

use async_trait::async_trait;
use rowguard_core::AppResult;
use rowguard_domain::{
    CrudAction, ModelDescriptor, ModelId, Permission, Record, Role, RoleId, User, UserId,
    WhereClause,
};

/// Permission-store query shape: grants for one model and action held by any
/// of the listed roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionQuery {
    /// Model the grants must apply to.
    pub model: ModelId,
    /// Action the grants must authorize.
    pub action: CrudAction,
    /// Roles of which at least one must hold the grant.
    pub roles: BTreeSet<RoleId>,
}

/// Repository port for user and role lookups.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user with its roles populated.
    async fn find_user_with_roles(&self, user_id: &UserId) -> AppResult<Option<User>>;
}

/// Repository port for permission grant lookups.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Lists grants matching the query.
    async fn list_permissions(&self, query: &PermissionQuery) -> AppResult<Vec<Permission>>;
}

/// Repository port returning the records an action would operate on.
#[async_trait]
pub trait TargetRecordRepository: Send + Sync {
    /// Finds records of the model selected by the optional criteria.
    async fn find_target_records(
        &self,
        model: &ModelDescriptor,
        criteria: Option<&WhereClause>,
    ) -> AppResult<Vec<Record>>;
}

/// Repository port for model descriptor lookups.
#[async_trait]
pub trait ModelRepository: Send + Sync {
    /// Finds a model descriptor by identifier.
    async fn find_model(&self, model_id: &ModelId) -> AppResult<Option<ModelDescriptor>>;

    /// Counts registered model descriptors.
    async fn count_models(&self) -> AppResult<usize>;
}

/// Write port used by hosts to install reference data and sample records.
#[async_trait]
pub trait FixtureRepository: Send + Sync {
    /// Registers a model descriptor.
    async fn save_model(&self, model: ModelDescriptor) -> AppResult<()>;

    /// Registers a role.
    async fn save_role(&self, role: Role) -> AppResult<()>;

    /// Registers a user with its role memberships.
    async fn save_user(&self, user: User) -> AppResult<()>;

    /// Registers a permission grant.
    async fn save_permission(&self, permission: Permission) -> AppResult<()>;

    /// Stores a record of a model.
    async fn save_record(&self, model_id: &ModelId, record: Record) -> AppResult<()>;
}

/// Evaluates where-clauses against records.
///
/// Implementations report evaluation failures as
/// [`rowguard_core::AppError::CriteriaEvaluation`].
pub trait CriteriaMatcher: Send + Sync {
    /// Returns the records matching the where-clause, in input order.
    fn filter<'a>(
        &self,
        where_clause: &WhereClause,
        records: &'a [Record],
    ) -> AppResult<Vec<&'a Record>>;

    /// Returns whether a single record matches the where-clause.
    fn matches(&self, where_clause: &WhereClause, record: &Record) -> AppResult<bool> {
        Ok(self
            .filter(where_clause, std::slice::from_ref(record))?
            .len()
            == 1)
    }
}
