//! Identity provider settings consulted by transformers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// What transformers may ask about the identity provider that issued an
/// assertion.
pub trait IdentityProvider: Send + Sync {
    /// Returns the IdP's entity identifier.
    fn entity_id(&self) -> &str;

    /// Returns true if attribute values arrive as underscore-joined base64
    /// segments that must be decoded.
    fn requires_base64_decoded_attributes(&self) -> bool;
}

/// Serializable identity provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProviderConfig {
    /// Entity identifier of the IdP.
    pub entity_id: String,

    /// Whether attribute values are base64 encoded.
    #[serde(default)]
    pub base64_attributes: bool,

    /// Free-form settings.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub config: HashMap<String, String>,
}

impl IdentityProviderConfig {
    /// Creates settings for `entity_id` with decoding disabled.
    #[must_use]
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            base64_attributes: false,
            config: HashMap::new(),
        }
    }

    /// Sets whether attribute values are base64 encoded.
    #[must_use]
    pub const fn with_base64_attributes(mut self, enabled: bool) -> Self {
        self.base64_attributes = enabled;
        self
    }

    /// Sets a free-form value.
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Gets a free-form value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    /// Gets a free-form value as a boolean.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.config.get(key).and_then(|v| v.parse().ok())
    }
}

impl IdentityProvider for IdentityProviderConfig {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn requires_base64_decoded_attributes(&self) -> bool {
        self.base64_attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_with_defaults() {
        let config: IdentityProviderConfig =
            serde_json::from_str(r#"{"entityId":"https://idp.example.org"}"#).unwrap();
        assert_eq!(config.entity_id(), "https://idp.example.org");
        assert!(!config.requires_base64_decoded_attributes());
        assert!(config.config.is_empty());

        let config: IdentityProviderConfig = serde_json::from_str(
            r#"{"entityId":"https://idp","base64Attributes":true,"config":{"syncMode":"force","trust":"true"}}"#,
        )
        .unwrap();
        assert!(config.requires_base64_decoded_attributes());
        assert_eq!(config.get("syncMode"), Some("force"));
        assert_eq!(config.get_bool("trust"), Some(true));
        assert_eq!(config.get_bool("syncMode"), None);
    }

    #[test]
    fn serializes_camel_case() {
        let config = IdentityProviderConfig::new("https://idp").with_base64_attributes(true);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"entityId": "https://idp", "base64Attributes": true})
        );
    }
}
