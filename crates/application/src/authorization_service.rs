use std::sync::Arc;

use rowguard_core::{AppError, AppResult};
use rowguard_domain::{
    CrudAction, ModelDescriptor, Permission, Record, RequestedAttributes, User, UserId,
    WhereClause,
};
use tracing::{debug, warn};

use crate::{
    CriteriaMatcher, PermissionEvaluator, PermissionRepository, PermissionResolver,
    TargetRecordRepository, UserRepository, any_foreign, build_denial_message,
    supports_ownership,
};

mod access;


/// One authorization check: who performs which method on which records.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationRequest {
    /// HTTP-style method token, e.g. `PUT`.
    pub method: String,
    /// Model the records belong to.
    pub model: ModelDescriptor,
    /// Acting user.
    pub user: User,
    /// Candidate records the action targets.
    pub records: Vec<Record>,
    /// Attribute names read or written by the action.
    pub requested_attributes: RequestedAttributes,
}

/// Application service combining grant resolution, ownership and grant
/// evaluation into access decisions.
#[derive(Clone)]
pub struct AuthorizationService {
    resolver: PermissionResolver,
    evaluator: PermissionEvaluator,
    record_repository: Arc<dyn TargetRecordRepository>,
}

impl AuthorizationService {
    /// Creates a new authorization service from its collaborators.
    #[must_use]
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        permission_repository: Arc<dyn PermissionRepository>,
        record_repository: Arc<dyn TargetRecordRepository>,
        matcher: Arc<dyn CriteriaMatcher>,
    ) -> Self {
        Self {
            resolver: PermissionResolver::new(user_repository, permission_repository),
            evaluator: PermissionEvaluator::new(matcher),
            record_repository,
        }
    }

    /// Returns the grant resolver.
    #[must_use]
    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// Returns the grant evaluator.
    #[must_use]
    pub fn evaluator(&self) -> &PermissionEvaluator {
        &self.evaluator
    }
}
