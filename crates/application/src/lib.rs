//! Application services and ports.

#![forbid(unsafe_code)]

mod attribute_filter;
mod authorization_ports;
mod authorization_service;
mod ownership;
mod permission_evaluator;
mod permission_resolver;

pub use attribute_filter::is_over_whitelist;
pub use authorization_ports::{
    CriteriaMatcher, FixtureRepository, ModelRepository, PermissionQuery, PermissionRepository,
    TargetRecordRepository, UserRepository,
};
pub use authorization_service::{AuthorizationRequest, AuthorizationService};
pub use ownership::{any_foreign, is_foreign, supports_ownership};
pub use permission_evaluator::{PermissionEvaluator, build_denial_message};
pub use permission_resolver::PermissionResolver;
