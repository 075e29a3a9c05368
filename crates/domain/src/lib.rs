//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod criteria;
mod model;
mod record;
mod security;
mod user;

pub use criteria::{
    CriteriaGroup, CriteriaNode, CriteriaOperator, FieldCondition, LogicalMode, WhereClause,
};
pub use model::{ModelDescriptor, ModelId};
pub use record::{OWNER_FIELD, Record, RequestedAttributes};
pub use security::{CrudAction, Permission, PermissionId, PermissionInput};
pub use user::{EmailAddress, Role, RoleId, User, UserId};
