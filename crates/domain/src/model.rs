use rowguard_core::{AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Identifier for a model descriptor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(NonEmptyString);

impl ModelId {
    /// Creates a model identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        Ok(Self(NonEmptyString::new(value)?))
    }

    /// Returns the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Metadata describing a model whose records are authorized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    id: ModelId,
    global_id: NonEmptyString,
    supports_ownership: bool,
}

impl ModelDescriptor {
    /// Creates a validated model descriptor.
    pub fn new(
        id: ModelId,
        global_id: impl Into<String>,
        supports_ownership: bool,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            global_id: NonEmptyString::new(global_id)?,
            supports_ownership,
        })
    }

    /// Returns the model identifier.
    #[must_use]
    pub fn id(&self) -> &ModelId {
        &self.id
    }

    /// Returns the display identity used in messages, e.g. `Article`.
    #[must_use]
    pub fn global_id(&self) -> &NonEmptyString {
        &self.global_id
    }

    /// Returns whether records carry an owner populated at creation.
    #[must_use]
    pub fn supports_ownership(&self) -> bool {
        self.supports_ownership
    }
}

#[cfg(test)]
mod tests {
    use super::{ModelDescriptor, ModelId};

    #[test]
    fn model_requires_global_id() {
        let Ok(model_id) = ModelId::new("article") else {
            panic!("model id must be valid");
        };
        assert!(ModelDescriptor::new(model_id, " ", false).is_err());
    }
}
