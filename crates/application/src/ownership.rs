//! Row-level ownership checks.

use rowguard_domain::{ModelDescriptor, Record, User, UserId};

/// Returns whether records of the model carry an owner set at creation.
#[must_use]
pub fn supports_ownership(model: &ModelDescriptor) -> bool {
    model.supports_ownership()
}

/// Builds a predicate telling whether a record is NOT owned by `owner`.
///
/// Records without a usable owner value are foreign.
pub fn is_foreign(owner: &UserId) -> impl Fn(&Record) -> bool + '_ {
    move |record| record.owner().as_ref() != Some(owner)
}

/// Returns whether any record is foreign to the user.
#[must_use]
pub fn any_foreign(records: &[Record], user: &User) -> bool {
    records.iter().any(is_foreign(user.id()))
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use rowguard_domain::{EmailAddress, ModelDescriptor, ModelId, Record, User, UserId};

    use super::{any_foreign, is_foreign, supports_ownership};

    fn record(data: Value) -> Record {
        Record::new(data).unwrap_or_default()
    }

    fn user(id: &str) -> User {
        let (Ok(user_id), Ok(email)) = (UserId::new(id), EmailAddress::new("u@example.com"))
        else {
            panic!("fixture user must be valid");
        };
        User::new(user_id, email, [])
    }

    #[test]
    fn foreignness_compares_owner_identity() {
        let Ok(owner) = UserId::new("5") else {
            panic!("owner id must be valid");
        };
        let foreign = is_foreign(&owner);

        assert!(!foreign(&record(json!({ "owner": 5 }))));
        assert!(!foreign(&record(json!({ "owner": "5" }))));
        assert!(foreign(&record(json!({ "owner": 7 }))));
    }

    #[test]
    fn missing_or_null_owner_is_foreign() {
        let Ok(owner) = UserId::new("5") else {
            panic!("owner id must be valid");
        };
        let foreign = is_foreign(&owner);

        assert!(foreign(&record(json!({}))));
        assert!(foreign(&record(json!({ "owner": null }))));
        assert!(foreign(&record(json!({ "owner": { "id": 5 } }))));
    }

    #[test]
    fn any_foreign_vetoes_mixed_sets() {
        let owner = user("9");
        let own = record(json!({ "id": 1, "owner": 9 }));
        let other = record(json!({ "id": 2, "owner": 3 }));

        assert!(!any_foreign(&[], &owner));
        assert!(!any_foreign(std::slice::from_ref(&own), &owner));
        assert!(any_foreign(&[own, other], &owner));
    }

    #[test]
    fn ownership_support_follows_model_flag() {
        let Ok(model_id) = ModelId::new("article") else {
            panic!("model id must be valid");
        };
        let owned = ModelDescriptor::new(model_id.clone(), "Article", true);
        let shared = ModelDescriptor::new(model_id, "Article", false);

        assert!(owned.map(|model| supports_ownership(&model)).unwrap_or(false));
        assert!(!shared.map(|model| supports_ownership(&model)).unwrap_or(true));
    }
}
