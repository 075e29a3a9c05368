use std::collections::BTreeSet;
use std::sync::Arc;

use rowguard_core::{AppError, AppResult};
use rowguard_domain::{CrudAction, ModelDescriptor, Permission, User, UserId};
use tracing::debug;

use crate::{PermissionQuery, PermissionRepository, UserRepository};

/// Loads the permission grants that could authorize a request.
#[derive(Clone)]
pub struct PermissionResolver {
    user_repository: Arc<dyn UserRepository>,
    permission_repository: Arc<dyn PermissionRepository>,
}

impl PermissionResolver {
    /// Creates a resolver over user and permission stores.
    #[must_use]
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        permission_repository: Arc<dyn PermissionRepository>,
    ) -> Self {
        Self {
            user_repository,
            permission_repository,
        }
    }

    /// Resolves grants for a user performing an HTTP-style method on a model.
    ///
    /// The method is mapped before any store access; unmapped methods and
    /// unknown users fail with [`AppError::Resolution`].
    pub async fn resolve_grants(
        &self,
        user_id: &UserId,
        model: &ModelDescriptor,
        method: &str,
    ) -> AppResult<Vec<Permission>> {
        let action = CrudAction::from_http_method(method)?;
        self.resolve_grants_for_action(user_id, model, action).await
    }

    /// Resolves grants for a user performing a CRUD action on a model.
    pub async fn resolve_grants_for_action(
        &self,
        user_id: &UserId,
        model: &ModelDescriptor,
        action: CrudAction,
    ) -> AppResult<Vec<Permission>> {
        let user = self.load_user(user_id).await?;
        self.resolve_grants_for_user(&user, model, action).await
    }

    /// Loads a user with its roles populated.
    pub async fn load_user(&self, user_id: &UserId) -> AppResult<User> {
        self.user_repository
            .find_user_with_roles(user_id)
            .await?
            .ok_or_else(|| AppError::Resolution(format!("user '{user_id}' could not be found")))
    }

    async fn resolve_grants_for_user(
        &self,
        user: &User,
        model: &ModelDescriptor,
        action: CrudAction,
    ) -> AppResult<Vec<Permission>> {
        if user.roles().is_empty() {
            return Ok(Vec::new());
        }

        let query = PermissionQuery {
            model: model.id().clone(),
            action,
            roles: user.roles().clone(),
        };
        let permissions = self.permission_repository.list_permissions(&query).await?;

        let mut seen = BTreeSet::new();
        let grants: Vec<Permission> = permissions
            .into_iter()
            .filter(|permission| seen.insert(permission.id().clone()))
            .collect();

        debug!(
            user_id = %user.id(),
            model = %model.id(),
            action = %action,
            grant_count = grants.len(),
            "resolved permission grants"
        );

        Ok(grants)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Arc;

    use async_trait::async_trait;
    use rowguard_core::{AppError, AppResult};
    use rowguard_domain::{
        CrudAction, EmailAddress, ModelDescriptor, ModelId, Permission, PermissionId,
        PermissionInput, RoleId, User, UserId,
    };
    use tokio::sync::Mutex;

    use crate::{PermissionQuery, PermissionRepository, UserRepository};

    use super::PermissionResolver;

    struct FakeUserRepository {
        users: HashMap<UserId, User>,
    }

    #[async_trait]
    impl UserRepository for FakeUserRepository {
        async fn find_user_with_roles(&self, user_id: &UserId) -> AppResult<Option<User>> {
            Ok(self.users.get(user_id).cloned())
        }
    }

    #[derive(Default)]
    struct FakePermissionRepository {
        permissions: Vec<Permission>,
        queries: Mutex<Vec<PermissionQuery>>,
    }

    #[async_trait]
    impl PermissionRepository for FakePermissionRepository {
        async fn list_permissions(&self, query: &PermissionQuery) -> AppResult<Vec<Permission>> {
            self.queries.lock().await.push(query.clone());
            Ok(self
                .permissions
                .iter()
                .filter(|permission| {
                    permission.applies_to(&query.model, query.action, &query.roles)
                })
                .cloned()
                .collect())
        }
    }

    fn role(id: &str) -> RoleId {
        RoleId::new(id).unwrap_or_else(|error| panic!("bad role: {error}"))
    }

    fn model() -> ModelDescriptor {
        ModelId::new("article")
            .and_then(|id| ModelDescriptor::new(id, "Article", false))
            .unwrap_or_else(|error| panic!("bad model: {error}"))
    }

    fn permission(id: &str, action: CrudAction, roles: &[&str]) -> Permission {
        let (Ok(id), Ok(model)) = (PermissionId::new(id), ModelId::new("article")) else {
            panic!("fixture identifiers must be valid");
        };
        Permission::new(PermissionInput {
            id,
            model,
            action,
            roles: roles.iter().map(|value| role(value)).collect(),
            where_clause: None,
            attributes: BTreeSet::new(),
        })
        .unwrap_or_else(|error| panic!("bad permission: {error}"))
    }

    fn user(id: &str, roles: &[&str]) -> User {
        let (Ok(user_id), Ok(email)) = (UserId::new(id), EmailAddress::new("u@example.com"))
        else {
            panic!("fixture user must be valid");
        };
        User::new(user_id, email, roles.iter().map(|value| role(value)))
    }

    fn resolver(
        users: Vec<User>,
        permissions: Vec<Permission>,
    ) -> (PermissionResolver, Arc<FakePermissionRepository>) {
        let permission_repository = Arc::new(FakePermissionRepository {
            permissions,
            queries: Mutex::new(Vec::new()),
        });
        let user_repository = Arc::new(FakeUserRepository {
            users: users
                .into_iter()
                .map(|user| (user.id().clone(), user))
                .collect(),
        });

        (
            PermissionResolver::new(user_repository, permission_repository.clone()),
            permission_repository,
        )
    }

    #[tokio::test]
    async fn resolves_grants_for_intersecting_roles_and_mapped_action() {
        let alice = user("alice", &["editor"]);
        let (resolver, _) = resolver(
            vec![alice.clone()],
            vec![
                permission("p-update", CrudAction::Update, &["editor", "admin"]),
                permission("p-read", CrudAction::Read, &["editor"]),
                permission("p-admin", CrudAction::Update, &["admin"]),
            ],
        );

        let grants = resolver.resolve_grants(alice.id(), &model(), "PUT").await;
        let ids: Vec<String> = grants
            .unwrap_or_default()
            .iter()
            .map(|grant| grant.id().to_string())
            .collect();
        assert_eq!(ids, vec!["p-update".to_owned()]);
    }

    #[tokio::test]
    async fn deduplicates_grants_by_identity() {
        let alice = user("alice", &["editor", "reviewer"]);
        let duplicated = permission("p-read", CrudAction::Read, &["editor", "reviewer"]);
        let (resolver, _) = resolver(vec![alice.clone()], vec![duplicated.clone(), duplicated]);

        let grants = resolver.resolve_grants(alice.id(), &model(), "GET").await;
        assert_eq!(grants.map(|grants| grants.len()).ok(), Some(1));
    }

    #[tokio::test]
    async fn unmapped_method_is_rejected_before_lookup() {
        let alice = user("alice", &["editor"]);
        let (resolver, permission_repository) = resolver(vec![alice.clone()], Vec::new());

        let result = resolver.resolve_grants(alice.id(), &model(), "PATCH").await;
        assert!(matches!(result, Err(AppError::Resolution(_))));
        assert!(permission_repository.queries.lock().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_user_is_a_resolution_error() {
        let (resolver, _) = resolver(Vec::new(), Vec::new());
        let Ok(missing) = UserId::new("ghost") else {
            panic!("user id must be valid");
        };

        let result = resolver.resolve_grants(&missing, &model(), "GET").await;
        assert!(matches!(result, Err(AppError::Resolution(_))));
    }

    #[tokio::test]
    async fn query_carries_model_action_and_roles() {
        let alice = user("alice", &["editor", "reviewer"]);
        let (resolver, permission_repository) = resolver(vec![alice.clone()], Vec::new());

        let result = resolver.resolve_grants(alice.id(), &model(), "DELETE").await;
        assert!(result.is_ok());

        let queries = permission_repository.queries.lock().await;
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].model.as_str(), "article");
        assert_eq!(queries[0].action, CrudAction::Delete);
        assert_eq!(
            queries[0].roles,
            BTreeSet::from([role("editor"), role("reviewer")])
        );
    }
}
