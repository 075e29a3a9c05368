use std::sync::Arc;

use rowguard_core::AppResult;
use rowguard_domain::{CrudAction, ModelDescriptor, Permission, Record, RequestedAttributes, User};

use crate::{CriteriaMatcher, is_over_whitelist};

/// Decides whether permission grants admit a set of records.
#[derive(Clone)]
pub struct PermissionEvaluator {
    matcher: Arc<dyn CriteriaMatcher>,
}

impl PermissionEvaluator {
    /// Creates an evaluator backed by a criteria matcher.
    #[must_use]
    pub fn new(matcher: Arc<dyn CriteriaMatcher>) -> Self {
        Self { matcher }
    }

    /// Returns whether every record is admitted by at least one grant.
    ///
    /// A grant admits a record when its where-clause (if any) matches the
    /// record and the requested attributes stay inside its whitelist. With no
    /// grants or no records there is nothing to restrict and the call admits.
    /// Matcher failures propagate unchanged.
    pub fn authorize(
        &self,
        records: &[Record],
        grants: &[Permission],
        requested: &RequestedAttributes,
    ) -> AppResult<bool> {
        if grants.is_empty() || records.is_empty() {
            return Ok(true);
        }

        for record in records {
            if !self.any_grant_admits(record, grants, requested)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn any_grant_admits(
        &self,
        record: &Record,
        grants: &[Permission],
        requested: &RequestedAttributes,
    ) -> AppResult<bool> {
        for grant in grants {
            if self.grant_admits(grant, record, requested)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn grant_admits(
        &self,
        grant: &Permission,
        record: &Record,
        requested: &RequestedAttributes,
    ) -> AppResult<bool> {
        if grant.is_blanket() {
            return Ok(true);
        }

        let matches_scope = match grant.where_clause() {
            Some(where_clause) => self.matcher.matches(where_clause, record)?,
            None => true,
        };

        Ok(matches_scope && !is_over_whitelist(requested, grant.attributes()))
    }
}

/// Formats the explanation reported when a user is denied an action.
#[must_use]
pub fn build_denial_message(user: &User, action: CrudAction, model: &ModelDescriptor) -> String {
    format!(
        "User {} is not permitted to {} {}",
        user.email(),
        action.as_str(),
        model.global_id()
    )
}
