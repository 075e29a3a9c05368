use std::collections::BTreeSet;
use std::path::Path;

use rowguard_application::{FixtureRepository, ModelRepository};
use rowguard_core::{AppError, AppResult};
use rowguard_domain::{
    CrudAction, EmailAddress, ModelDescriptor, ModelId, OWNER_FIELD, Permission, PermissionId,
    PermissionInput, Record, Role, RoleId, User, UserId, WhereClause,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

const ADMIN_ROLE: &str = "admin";
const REGISTERED_ROLE: &str = "registered";
const PUBLIC_ROLE: &str = "public";
const ADMIN_USER_ID: &str = "admin";
const ADMIN_EMAIL: &str = "admin@example.com";
const USER_MODEL: &str = "user";

/// Reference data installed into an empty store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FixtureDocument {
    pub models: Vec<ModelFixture>,
    pub roles: Vec<RoleFixture>,
    pub users: Vec<UserFixture>,
    pub permissions: Vec<PermissionFixture>,
    pub records: Vec<RecordFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelFixture {
    pub id: String,
    pub global_id: String,
    #[serde(default)]
    pub supports_ownership: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleFixture {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserFixture {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PermissionFixture {
    pub id: String,
    pub model: String,
    pub action: CrudAction,
    pub roles: Vec<String>,
    #[serde(default, rename = "where")]
    pub where_clause: Option<Value>,
    #[serde(default)]
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordFixture {
    pub model: String,
    pub data: Value,
}

impl FixtureDocument {
    /// Reads a fixture document from a JSON file.
    pub fn load(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|error| {
            AppError::Validation(format!(
                "failed to read fixtures '{}': {error}",
                path.display()
            ))
        })?;

        serde_json::from_str(raw.as_str()).map_err(|error| {
            AppError::Validation(format!(
                "invalid fixtures document '{}': {error}",
                path.display()
            ))
        })
    }

    /// Built-in fixtures: the admin/registered/public roles, the store's own
    /// models, blanket admin grants, registered read grants and an admin user
    /// owning their user record.
    #[must_use]
    pub fn defaults() -> Self {
        let models = [
            ("model", "Model", false),
            ("role", "Role", false),
            ("permission", "Permission", false),
            (USER_MODEL, "User", true),
        ];

        let mut permissions = Vec::new();
        for (model, _, _) in models {
            for action in CrudAction::all() {
                permissions.push(PermissionFixture {
                    id: format!("{ADMIN_ROLE}-{model}-{action}"),
                    model: model.to_owned(),
                    action: *action,
                    roles: vec![ADMIN_ROLE.to_owned()],
                    where_clause: None,
                    attributes: Vec::new(),
                });
            }
            permissions.push(PermissionFixture {
                id: format!("{REGISTERED_ROLE}-{model}-{}", CrudAction::Read),
                model: model.to_owned(),
                action: CrudAction::Read,
                roles: vec![REGISTERED_ROLE.to_owned()],
                where_clause: None,
                attributes: Vec::new(),
            });
        }

        Self {
            models: models
                .into_iter()
                .map(|(id, global_id, supports_ownership)| ModelFixture {
                    id: id.to_owned(),
                    global_id: global_id.to_owned(),
                    supports_ownership,
                })
                .collect(),
            roles: [ADMIN_ROLE, REGISTERED_ROLE, PUBLIC_ROLE]
                .into_iter()
                .map(|name| RoleFixture {
                    id: name.to_owned(),
                    name: name.to_owned(),
                })
                .collect(),
            users: vec![UserFixture {
                id: ADMIN_USER_ID.to_owned(),
                email: ADMIN_EMAIL.to_owned(),
                roles: vec![ADMIN_ROLE.to_owned(), REGISTERED_ROLE.to_owned()],
            }],
            permissions,
            records: vec![RecordFixture {
                model: USER_MODEL.to_owned(),
                data: json!({
                    "id": ADMIN_USER_ID,
                    "email": ADMIN_EMAIL,
                    OWNER_FIELD: ADMIN_USER_ID,
                }),
            }],
        }
    }
}

/// Installs the document when the store holds fewer models than it declares.
///
/// Models, roles and permissions already present are skipped and users are
/// overwritten, so an install interrupted halfway completes on the next run.
/// Returns whether an install ran.
pub async fn ensure_installed<S>(store: &S, document: &FixtureDocument) -> AppResult<bool>
where
    S: FixtureRepository + ModelRepository + ?Sized,
{
    let expected = document.models.len();
    let found = store.count_models().await?;
    if found >= expected {
        return Ok(false);
    }

    info!(expected, found, "installing fixtures");

    for model in &document.models {
        skip_existing(
            store
                .save_model(ModelDescriptor::new(
                    ModelId::new(model.id.as_str())?,
                    model.global_id.as_str(),
                    model.supports_ownership,
                )?)
                .await,
        )?;
    }

    for role in &document.roles {
        skip_existing(
            store
                .save_role(Role::new(RoleId::new(role.id.as_str())?, role.name.as_str())?)
                .await,
        )?;
    }

    for user in &document.users {
        let roles = role_ids(&user.roles)?;
        store
            .save_user(User::new(
                UserId::new(user.id.as_str())?,
                EmailAddress::new(user.email.as_str())?,
                roles,
            ))
            .await?;
    }

    for permission in &document.permissions {
        let permission = Permission::new(PermissionInput {
            id: PermissionId::new(permission.id.as_str())?,
            model: ModelId::new(permission.model.as_str())?,
            action: permission.action,
            roles: role_ids(&permission.roles)?,
            where_clause: permission
                .where_clause
                .clone()
                .map(WhereClause::from_value)
                .transpose()?,
            attributes: permission.attributes.iter().cloned().collect(),
        })?;
        skip_existing(store.save_permission(permission).await)?;
    }

    for record in &document.records {
        store
            .save_record(
                &ModelId::new(record.model.as_str())?,
                Record::new(record.data.clone())?,
            )
            .await?;
    }

    info!(
        models = document.models.len(),
        roles = document.roles.len(),
        users = document.users.len(),
        permissions = document.permissions.len(),
        records = document.records.len(),
        "fixtures installed"
    );

    Ok(true)
}

/// Entries left by an earlier partial install are kept as they are.
fn skip_existing(result: AppResult<()>) -> AppResult<()> {
    match result {
        Err(AppError::Conflict(message)) => {
            debug!(%message, "fixture entry already present");
            Ok(())
        }
        other => other,
    }
}

fn role_ids(values: &[String]) -> AppResult<BTreeSet<RoleId>> {
    values
        .iter()
        .map(|value| RoleId::new(value.as_str()))
        .collect()
}
