use std::collections::BTreeSet;

use rowguard_application::{
    FixtureRepository, ModelRepository, PermissionQuery, PermissionRepository,
    TargetRecordRepository, UserRepository,
};
use rowguard_core::AppError;
use rowguard_domain::{
    CrudAction, EmailAddress, ModelDescriptor, ModelId, Permission, PermissionId,
    PermissionInput, Record, Role, RoleId, User, UserId, WhereClause,
};
use serde_json::json;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use super::PostgresAuthorizationRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres authorization tests: {error}");
    }

    Some(pool)
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", RoleId::generate())
}

fn model(id: &str, supports_ownership: bool) -> ModelDescriptor {
    ModelId::new(id)
        .and_then(|model_id| ModelDescriptor::new(model_id, "Article", supports_ownership))
        .unwrap_or_else(|error| panic!("bad model: {error}"))
}

async fn saved_role(repository: &PostgresAuthorizationRepository, name: &str) -> RoleId {
    let role_id = RoleId::generate();
    let role = Role::new(role_id.clone(), unique(name))
        .unwrap_or_else(|error| panic!("bad role: {error}"));
    assert!(repository.save_role(role).await.is_ok());
    role_id
}

async fn saved_user(repository: &PostgresAuthorizationRepository, roles: &[RoleId]) -> User {
    let user_id = UserId::generate();
    let email = EmailAddress::new(format!("{user_id}@example.com"))
        .unwrap_or_else(|error| panic!("bad email: {error}"));
    let user = User::new(user_id, email, roles.iter().cloned());
    assert!(repository.save_user(user.clone()).await.is_ok());
    user
}

#[tokio::test]
async fn users_round_trip_with_their_roles() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresAuthorizationRepository::new(pool);
    let editor = saved_role(&repository, "editor").await;
    let viewer = saved_role(&repository, "viewer").await;
    let user = saved_user(&repository, &[editor.clone(), viewer.clone()]).await;
    let roleless = saved_user(&repository, &[]).await;

    let Ok(Some(found)) = repository.find_user_with_roles(user.id()).await else {
        panic!("saved user must be found");
    };
    assert_eq!(found.roles(), &BTreeSet::from([editor, viewer]));
    assert_eq!(found.email(), user.email());

    let Ok(Some(found_roleless)) = repository.find_user_with_roles(roleless.id()).await else {
        panic!("roleless user must be found");
    };
    assert!(found_roleless.roles().is_empty());

    let missing = repository.find_user_with_roles(&UserId::generate()).await;
    assert!(matches!(missing, Ok(None)));
}

#[tokio::test]
async fn permissions_are_listed_for_model_action_and_roles() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresAuthorizationRepository::new(pool);
    let article = model(unique("article").as_str(), false);
    assert!(repository.save_model(article.clone()).await.is_ok());
    let editor = saved_role(&repository, "editor").await;
    let viewer = saved_role(&repository, "viewer").await;

    let clause = WhereClause::from_value(json!({ "status": { "in": ["draft", "review"] } }))
        .unwrap_or_else(|error| panic!("bad clause: {error}"));
    let permission = Permission::new(PermissionInput {
        id: PermissionId::generate(),
        model: article.id().clone(),
        action: CrudAction::Update,
        roles: BTreeSet::from([editor.clone()]),
        where_clause: Some(clause.clone()),
        attributes: BTreeSet::from(["title".to_owned(), "body".to_owned()]),
    })
    .unwrap_or_else(|error| panic!("bad permission: {error}"));
    assert!(repository.save_permission(permission.clone()).await.is_ok());
    let duplicate = repository.save_permission(permission.clone()).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let listed = repository
        .list_permissions(&PermissionQuery {
            model: article.id().clone(),
            action: CrudAction::Update,
            roles: BTreeSet::from([editor.clone(), viewer.clone()]),
        })
        .await
        .unwrap_or_else(|error| panic!("list failed: {error}"));
    assert_eq!(listed, vec![permission]);
    assert_eq!(listed[0].where_clause(), Some(&clause));

    let for_viewer = repository
        .list_permissions(&PermissionQuery {
            model: article.id().clone(),
            action: CrudAction::Update,
            roles: BTreeSet::from([viewer]),
        })
        .await;
    assert_eq!(for_viewer.map(|grants| grants.len()).ok(), Some(0));

    let other_action = repository
        .list_permissions(&PermissionQuery {
            model: article.id().clone(),
            action: CrudAction::Delete,
            roles: BTreeSet::from([editor]),
        })
        .await;
    assert_eq!(other_action.map(|grants| grants.len()).ok(), Some(0));
}

#[tokio::test]
async fn models_are_saved_once_and_records_filtered_by_criteria() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresAuthorizationRepository::new(pool);
    let article = model(unique("article").as_str(), true);
    assert!(repository.save_model(article.clone()).await.is_ok());

    let duplicate = repository.save_model(article.clone()).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let Ok(Some(found)) = repository.find_model(article.id()).await else {
        panic!("saved model must be found");
    };
    assert!(found.supports_ownership());
    assert!(matches!(repository.count_models().await, Ok(count) if count >= 1));

    for data in [
        json!({ "id": 1, "status": "draft", "owner": "alice" }),
        json!({ "id": 2, "status": "published", "owner": "bob" }),
        json!({ "id": 3, "status": "draft", "owner": "bob" }),
    ] {
        let record = Record::new(data).unwrap_or_else(|error| panic!("bad record: {error}"));
        assert!(repository.save_record(article.id(), record).await.is_ok());
    }

    let all = repository
        .find_target_records(&article, None)
        .await
        .unwrap_or_else(|error| panic!("lookup failed: {error}"));
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].field("id"), Some(&json!(1)));

    let drafts = WhereClause::from_value(json!({ "status": "draft" }))
        .unwrap_or_else(|error| panic!("bad clause: {error}"));
    let filtered = repository
        .find_target_records(&article, Some(&drafts))
        .await
        .unwrap_or_else(|error| panic!("lookup failed: {error}"));
    let ids: Vec<_> = filtered.iter().filter_map(|record| record.field("id")).collect();
    assert_eq!(ids, vec![&json!(1), &json!(3)]);
}
