use std::collections::BTreeSet;
use std::str::FromStr;

use rowguard_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ModelId, RoleId, WhereClause};

/// CRUD action a permission grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrudAction {
    /// Record creation.
    Create,
    /// Record and list reads.
    Read,
    /// Record updates.
    Update,
    /// Record deletion.
    Delete,
}

impl CrudAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Returns all known actions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[CrudAction] = &[
            CrudAction::Create,
            CrudAction::Read,
            CrudAction::Update,
            CrudAction::Delete,
        ];

        ALL
    }

    /// Maps an HTTP method token onto the CRUD action it performs.
    ///
    /// Only `POST`, `GET`, `PUT` and `DELETE` have a mapping; any other token
    /// is rejected with [`AppError::Resolution`].
    pub fn from_http_method(method: &str) -> AppResult<Self> {
        match method {
            "POST" => Ok(Self::Create),
            "GET" => Ok(Self::Read),
            "PUT" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            _ => Err(AppError::Resolution(format!(
                "method '{method}' does not map to a CRUD action"
            ))),
        }
    }
}

impl FromStr for CrudAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::Validation(format!(
                "unknown crud action '{value}'"
            ))),
        }
    }
}

impl std::fmt::Display for CrudAction {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Identifier for a permission grant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionId(NonEmptyString);

impl PermissionId {
    /// Creates a permission identifier from an existing value.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        Ok(Self(NonEmptyString::new(value)?))
    }

    /// Creates a random permission identifier.
    #[must_use]
    pub fn generate() -> Self {
        match NonEmptyString::new(Uuid::new_v4().to_string()) {
            Ok(value) => Self(value),
            Err(_) => unreachable!("uuid strings are non-empty"),
        }
    }

    /// Returns the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for PermissionId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Input payload for creating a permission grant.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionInput {
    /// Grant identifier.
    pub id: PermissionId,
    /// Model the grant applies to.
    pub model: ModelId,
    /// Action the grant authorizes.
    pub action: CrudAction,
    /// Roles holding the grant.
    pub roles: BTreeSet<RoleId>,
    /// Optional record scope.
    pub where_clause: Option<WhereClause>,
    /// Attribute allow-list; empty means unrestricted.
    pub attributes: BTreeSet<String>,
}

/// Grant authorizing roles to perform an action on a model.
///
/// A grant without where-clause and without attribute whitelist is a blanket
/// grant for its model, action and roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    id: PermissionId,
    model: ModelId,
    action: CrudAction,
    roles: BTreeSet<RoleId>,
    where_clause: Option<WhereClause>,
    attributes: BTreeSet<String>,
}

impl Permission {
    /// Creates a validated permission grant.
    pub fn new(input: PermissionInput) -> AppResult<Self> {
        if input.roles.is_empty() {
            return Err(AppError::Validation(format!(
                "permission '{}' must be held by at least one role",
                input.id
            )));
        }

        if let Some(blank) = input
            .attributes
            .iter()
            .find(|attribute| attribute.trim().is_empty())
        {
            return Err(AppError::Validation(format!(
                "permission '{}' whitelist contains blank attribute '{blank}'",
                input.id
            )));
        }

        Ok(Self {
            id: input.id,
            model: input.model,
            action: input.action,
            roles: input.roles,
            where_clause: input.where_clause,
            attributes: input.attributes,
        })
    }

    /// Returns the grant identifier.
    #[must_use]
    pub fn id(&self) -> &PermissionId {
        &self.id
    }

    /// Returns the model the grant applies to.
    #[must_use]
    pub fn model(&self) -> &ModelId {
        &self.model
    }

    /// Returns the authorized action.
    #[must_use]
    pub fn action(&self) -> CrudAction {
        self.action
    }

    /// Returns the roles holding the grant.
    #[must_use]
    pub fn roles(&self) -> &BTreeSet<RoleId> {
        &self.roles
    }

    /// Returns the record scope, if any.
    #[must_use]
    pub fn where_clause(&self) -> Option<&WhereClause> {
        self.where_clause.as_ref()
    }

    /// Returns the attribute whitelist; empty means unrestricted.
    #[must_use]
    pub fn attributes(&self) -> &BTreeSet<String> {
        &self.attributes
    }

    /// Returns whether the grant restricts neither records nor attributes.
    #[must_use]
    pub fn is_blanket(&self) -> bool {
        self.where_clause.is_none() && self.attributes.is_empty()
    }

    /// Returns whether the grant applies to the model, action and any of the roles.
    #[must_use]
    pub fn applies_to(
        &self,
        model: &ModelId,
        action: CrudAction,
        roles: &BTreeSet<RoleId>,
    ) -> bool {
        &self.model == model
            && self.action == action
            && self.roles.iter().any(|role| roles.contains(role))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::str::FromStr;

    use rowguard_core::AppError;

    use super::{CrudAction, Permission, PermissionId, PermissionInput};
    use crate::{ModelId, RoleId};

    fn input(roles: &[&str], attributes: &[&str]) -> PermissionInput {
        let (Ok(id), Ok(model)) = (PermissionId::new("p1"), ModelId::new("article")) else {
            panic!("fixture identifiers must be valid");
        };

        PermissionInput {
            id,
            model,
            action: CrudAction::Update,
            roles: roles
                .iter()
                .filter_map(|role| RoleId::new(*role).ok())
                .collect(),
            where_clause: None,
            attributes: attributes.iter().map(|value| (*value).to_owned()).collect(),
        }
    }

    #[test]
    fn http_methods_map_to_crud_actions() {
        assert!(matches!(
            CrudAction::from_http_method("POST"),
            Ok(CrudAction::Create)
        ));
        assert!(matches!(
            CrudAction::from_http_method("GET"),
            Ok(CrudAction::Read)
        ));
        assert!(matches!(
            CrudAction::from_http_method("PUT"),
            Ok(CrudAction::Update)
        ));
        assert!(matches!(
            CrudAction::from_http_method("DELETE"),
            Ok(CrudAction::Delete)
        ));
    }

    #[test]
    fn unmapped_http_methods_are_resolution_errors() {
        for method in ["PATCH", "HEAD", "get", ""] {
            assert!(matches!(
                CrudAction::from_http_method(method),
                Err(AppError::Resolution(_))
            ));
        }
    }

    #[test]
    fn crud_action_roundtrip_storage_value() {
        for action in CrudAction::all() {
            assert_eq!(CrudAction::from_str(action.as_str()).ok(), Some(*action));
        }
        assert!(CrudAction::from_str("destroy").is_err());
    }

    #[test]
    fn permission_requires_a_role() {
        assert!(Permission::new(input(&[], &[])).is_err());
    }

    #[test]
    fn permission_rejects_blank_whitelist_entries() {
        assert!(Permission::new(input(&["editor"], &["title", " "])).is_err());
    }

    #[test]
    fn blanket_permission_applies_to_intersecting_roles() {
        let Ok(permission) = Permission::new(input(&["editor", "admin"], &[])) else {
            panic!("permission must be valid");
        };
        let (Ok(model), Ok(editor), Ok(viewer)) = (
            ModelId::new("article"),
            RoleId::new("editor"),
            RoleId::new("viewer"),
        ) else {
            panic!("fixture identifiers must be valid");
        };

        assert!(permission.is_blanket());
        assert!(permission.applies_to(&model, CrudAction::Update, &BTreeSet::from([editor])));
        assert!(!permission.applies_to(
            &model,
            CrudAction::Update,
            &BTreeSet::from([viewer.clone()])
        ));
        assert!(!permission.applies_to(&model, CrudAction::Read, &BTreeSet::from([viewer])));
    }
}
