use std::collections::BTreeSet;

use rowguard_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::UserId;

/// Field holding the owning user's identity on ownership-policy models.
pub const OWNER_FIELD: &str = "owner";

/// Target record being authorized: a map of field name to JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Creates a record from a JSON object value.
    pub fn new(data: Value) -> AppResult<Self> {
        match data {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(AppError::Validation(
                "record data must be a JSON object".to_owned(),
            )),
        }
    }

    /// Returns the value of a field when present.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns the owning user, if the record carries a usable owner value.
    #[must_use]
    pub fn owner(&self) -> Option<UserId> {
        self.field(OWNER_FIELD).and_then(UserId::from_field_value)
    }

    /// Returns all fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Attribute names a request reads or writes.
///
/// Built from a request field map; only the key set is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestedAttributes(BTreeSet<String>);

impl RequestedAttributes {
    /// Returns an empty attribute set.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Collects the keys of a request field map.
    #[must_use]
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        Self(fields.keys().cloned().collect())
    }

    /// Collects the keys of a JSON object value; non-objects yield no attributes.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        value
            .as_object()
            .map(Self::from_fields)
            .unwrap_or_default()
    }

    /// Returns whether no attribute was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates requested attribute names in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for RequestedAttributes {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
