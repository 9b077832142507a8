//! Scan configuration.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SchemaResult;
use crate::path_de;
use crate::scanner::naming::NamingStrategy;
use crate::schema::SchemaNode;
use crate::types::TypeRef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Deduplicate eligible types into components and refer to them with `$ref`.
    pub schema_references_enable: bool,
    /// Allow array-shaped schemas to be registered as components.
    pub array_references_enable: bool,
    /// Keep properties whose declaration sites are all non-public.
    pub private_properties_enable: bool,
    /// Scan methods in name order instead of declaration order.
    pub sorted_properties_enable: bool,
    pub property_naming_strategy: NamingStrategy,
    /// Drop properties whose type is missing from the index instead of typing them `object`.
    pub omit_unindexed_properties: bool,
    /// Type signature → predefined schema, registered before anything is scanned.
    pub schemas: IndexMap<String, serde_json::Value>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            schema_references_enable: true,
            array_references_enable: true,
            private_properties_enable: true,
            sorted_properties_enable: false,
            property_naming_strategy: NamingStrategy::Identity,
            omit_unindexed_properties: false,
            schemas: IndexMap::new(),
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(src: &str) -> SchemaResult<Self> {
        path_de::from_str_with_path(src)
    }

    pub fn load(path: &Path) -> SchemaResult<Self> {
        let bytes = std::fs::read(path)?;
        path_de::from_slice_with_path(&bytes)
    }

    pub fn with_schema_references(mut self, enable: bool) -> Self {
        self.schema_references_enable = enable;
        self
    }

    pub fn with_array_references(mut self, enable: bool) -> Self {
        self.array_references_enable = enable;
        self
    }

    pub fn with_private_properties(mut self, enable: bool) -> Self {
        self.private_properties_enable = enable;
        self
    }

    pub fn with_sorted_properties(mut self, enable: bool) -> Self {
        self.sorted_properties_enable = enable;
        self
    }

    pub fn with_naming_strategy(mut self, strategy: NamingStrategy) -> Self {
        self.property_naming_strategy = strategy;
        self
    }

    pub fn with_omit_unindexed_properties(mut self, enable: bool) -> Self {
        self.omit_unindexed_properties = enable;
        self
    }

    pub fn with_schema(mut self, signature: &str, schema: serde_json::Value) -> Self {
        self.schemas.insert(signature.to_string(), schema);
        self
    }

    /// Parsed `schemas` entries. Entries that do not parse are logged and skipped.
    pub fn predefined_schemas(&self) -> Vec<(TypeRef, SchemaNode)> {
        let mut out = Vec::with_capacity(self.schemas.len());
        for (signature, value) in &self.schemas {
            let ty = match signature.parse::<TypeRef>() {
                Ok(ty) => ty,
                Err(error) => {
                    tracing::warn!(%signature, %error, "skipping predefined schema");
                    continue;
                }
            };
            match path_de::from_value_with_path::<SchemaNode>(value.clone()) {
                Ok(node) => out.push((ty, node)),
                Err(error) => tracing::warn!(%signature, %error, "skipping predefined schema"),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_keys_take_defaults() {
        let config = ScanConfig::from_json_str(r#"{ "property_naming_strategy": "LOWER_CASE_WITH_UNDERSCORES" }"#).unwrap();
        assert!(config.schema_references_enable);
        assert!(config.private_properties_enable);
        assert_eq!(config.property_naming_strategy, NamingStrategy::LowerCaseWithUnderscores);
    }

    #[test]
    fn predefined_schemas_skip_bad_entries() {
        let config = ScanConfig::new()
            .with_schema("com.acme.Money", json!({ "type": "string", "format": "decimal" }))
            .with_schema("Broken<", json!({ "type": "string" }))
            .with_schema("com.acme.Other", json!({ "type": 7 }));
        let parsed = config.predefined_schemas();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].0, TypeRef::class("com.acme.Money"));
        assert_eq!(parsed[0].1.format.as_deref(), Some("decimal"));
    }
}
