//! Explicit configuration threaded through registration and introspection.

use serde::{Deserialize, Serialize};

use crate::naming;

/// How a field name becomes a column name when the annotation has no `name=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnNaming {
    /// `ProviderAPIKey` becomes `provider_api_key`.
    #[default]
    Snake,
    /// The field name is used as-is.
    Verbatim,
}

impl ColumnNaming {
    /// Applies the naming rule to a field name.
    #[must_use]
    pub fn apply(self, field_name: &str) -> String {
        match self {
            Self::Snake => naming::snake_case(field_name),
            Self::Verbatim => field_name.to_string(),
        }
    }
}

/// Settings shared by the table builder, the registry and the introspector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Annotation key used when rendering field tags (`pg:"..."`).
    pub tag_key: String,
    /// Schema (namespace) tables live in.
    pub search_path: String,
    /// Column naming rule for fields without `name=`.
    pub column_naming: ColumnNaming,
    /// Algorithm passed to `gen_salt` for SQL-side password hashing.
    pub crypt_algorithm: String,
    /// Name of the trigger function maintaining `updated_at` columns.
    pub set_timestamp_trigger: String,
    /// Column maintained by the set-timestamp trigger.
    pub updated_at_column: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tag_key: "pg".to_string(),
            search_path: "public".to_string(),
            column_naming: ColumnNaming::Snake,
            crypt_algorithm: "bf".to_string(),
            set_timestamp_trigger: "set_timestamp".to_string(),
            updated_at_column: "updated_at".to_string(),
        }
    }
}

impl Settings {
    /// Creates the default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the search path.
    #[must_use]
    pub fn with_search_path(mut self, search_path: impl Into<String>) -> Self {
        self.search_path = search_path.into();
        self
    }

    /// Sets the column naming rule.
    #[must_use]
    pub const fn with_column_naming(mut self, naming: ColumnNaming) -> Self {
        self.column_naming = naming;
        self
    }

    /// Parses settings from JSON. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.tag_key, "pg");
        assert_eq!(settings.search_path, "public");
        assert_eq!(settings.column_naming, ColumnNaming::Snake);
        assert_eq!(settings.crypt_algorithm, "bf");
    }

    #[test]
    fn test_from_json_partial() {
        let settings =
            Settings::from_json(r#"{"search_path": "app", "column_naming": "verbatim"}"#).unwrap();
        assert_eq!(settings.search_path, "app");
        assert_eq!(settings.column_naming, ColumnNaming::Verbatim);
        assert_eq!(settings.tag_key, "pg");
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(Settings::from_json("{not json").is_err());
    }

    #[test]
    fn test_column_naming() {
        assert_eq!(ColumnNaming::Snake.apply("CreatedAt"), "created_at");
        assert_eq!(ColumnNaming::Verbatim.apply("CreatedAt"), "CreatedAt");
    }
}
