use std::collections::BTreeSet;

use rowguard_domain::RequestedAttributes;

/// Returns whether the requested attributes reach outside the whitelist.
///
/// An empty request or an empty whitelist never over-reaches. Any requested
/// name absent from the whitelist voids the grant rather than being dropped.
#[must_use]
pub fn is_over_whitelist(requested: &RequestedAttributes, whitelist: &BTreeSet<String>) -> bool {
    if requested.is_empty() || whitelist.is_empty() {
        return false;
    }

    requested
        .iter()
        .any(|attribute| !whitelist.contains(attribute))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;
    use rowguard_domain::RequestedAttributes;
    use serde_json::json;

    use super::is_over_whitelist;

    fn whitelist(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    #[test]
    fn extra_attribute_over_reaches() {
        let requested = RequestedAttributes::from_value(&json!({ "a": 1, "b": 2 }));
        assert!(is_over_whitelist(&requested, &whitelist(&["a"])));
    }

    #[test]
    fn subset_of_whitelist_is_allowed() {
        let requested = RequestedAttributes::from_value(&json!({ "a": 1 }));
        assert!(!is_over_whitelist(&requested, &whitelist(&["a", "b"])));
    }

    #[test]
    fn empty_request_never_over_reaches() {
        let requested = RequestedAttributes::from_value(&json!({}));
        assert!(!is_over_whitelist(&requested, &whitelist(&["a"])));
    }

    #[test]
    fn empty_whitelist_is_unrestricted() {
        let requested = RequestedAttributes::from_value(&json!({ "a": 1 }));
        assert!(!is_over_whitelist(&requested, &whitelist(&[])));
    }

    proptest! {
        #[test]
        fn over_reach_iff_some_name_is_missing(
            requested in proptest::collection::btree_set("[a-e]", 0..5),
            allowed in proptest::collection::btree_set("[a-e]", 0..5),
        ) {
            let attributes: RequestedAttributes = requested.iter().cloned().collect();
            let expected = !requested.is_empty()
                && !allowed.is_empty()
                && !requested.is_subset(&allowed);
            prop_assert_eq!(is_over_whitelist(&attributes, &allowed), expected);
        }
    }
}
