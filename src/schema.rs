//! Schema output model.
//!
//! [`SchemaNode`] is the OpenAPI-flavoured JSON-schema node emitted for every type. While a scan
//! is running, nodes live in a [`SchemaArena`] and point at each other through link nodes
//! (`slot`), so a node can still be filled in after its parent has taken a reference to it. Once
//! the worklist drains, [`SchemaArena::materialize`] inlines every link into an owned tree.

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const COMPONENTS_PREFIX: &str = "#/components/schemas/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
}

impl SchemaType {
    pub fn parse(value: &str) -> Option<SchemaType> {
        match value.to_ascii_lowercase().as_str() {
            "object" => Some(SchemaType::Object),
            "array" => Some(SchemaType::Array),
            "string" => Some(SchemaType::String),
            "number" => Some(SchemaType::Number),
            "integer" => Some(SchemaType::Integer),
            "boolean" => Some(SchemaType::Boolean),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchemaNode {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, SchemaNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<SchemaNode>>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enumeration: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<SchemaNode>,

    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "bound::serialize")]
    pub minimum: Option<OrderedFloat<f64>>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "bound::serialize")]
    pub maximum: Option<OrderedFloat<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,

    /// Link to an arena node; only set on nodes built during a scan.
    #[serde(skip)]
    pub(crate) slot: Option<SchemaId>,
}

impl SchemaNode {
    pub fn of_type(schema_type: SchemaType) -> Self {
        SchemaNode { schema_type: Some(schema_type), ..SchemaNode::default() }
    }

    pub fn reference_to(name: &str) -> Self {
        SchemaNode { reference: Some(format!("{COMPONENTS_PREFIX}{name}")), ..SchemaNode::default() }
    }

    pub fn is_empty(&self) -> bool {
        *self == SchemaNode::default()
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Name of the component this node refers to, if it is a `$ref` into components.
    pub fn reference_name(&self) -> Option<&str> {
        self.reference.as_deref().and_then(|r| r.strip_prefix(COMPONENTS_PREFIX))
    }

    pub fn add_required(&mut self, name: &str) {
        if !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
    }

    /// Copy every attribute set on `other` onto `self`; `other` wins.
    pub fn overlay(&mut self, other: &SchemaNode) {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $( if other.$field.is_some() { self.$field = other.$field.clone(); } )*
            };
        }
        take!(
            reference, schema_type, format, title, description, items, additional_properties,
            minimum, maximum, exclusive_minimum, exclusive_maximum, min_length, max_length,
            min_items, max_items, min_properties, max_properties, pattern, unique_items,
            nullable, read_only, write_only, deprecated, default, example,
        );
        for (name, node) in &other.properties {
            self.properties.insert(name.clone(), node.clone());
        }
        for name in &other.required {
            self.add_required(name);
        }
        if !other.enumeration.is_empty() {
            self.enumeration = other.enumeration.clone();
        }
        if !other.all_of.is_empty() {
            self.all_of = other.all_of.clone();
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

mod bound {
    use ordered_float::OrderedFloat;
    use serde::Serializer;

    // Prefer emitting integers when exact.
    pub fn serialize<S: Serializer>(value: &Option<OrderedFloat<f64>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(n) if n.0.is_finite() && n.0.fract() == 0.0 && n.0 >= i64::MIN as f64 && n.0 <= i64::MAX as f64 => {
                s.serialize_i64(n.0 as i64)
            }
            Some(n) => s.serialize_f64(n.0),
            None => s.serialize_none(),
        }
    }
}

// ------------------------------- Arena ------------------------------------ //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaId(usize);

/// Nodes under construction for one scan.
#[derive(Debug, Default)]
pub struct SchemaArena {
    nodes: Vec<SchemaNode>,
}

impl SchemaArena {
    pub fn alloc(&mut self, node: SchemaNode) -> SchemaId {
        self.nodes.push(node);
        SchemaId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: SchemaId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: SchemaId) -> &mut SchemaNode {
        &mut self.nodes[id.0]
    }

    /// A placeholder that materializes to whatever `id` holds at the end of the scan.
    pub fn link(id: SchemaId) -> SchemaNode {
        SchemaNode { slot: Some(id), ..SchemaNode::default() }
    }

    pub fn materialize(&self, id: SchemaId) -> SchemaNode {
        let mut visiting = Vec::new();
        self.expand(id, &mut visiting)
    }

    fn expand(&self, id: SchemaId, visiting: &mut Vec<SchemaId>) -> SchemaNode {
        // links only ever point at freshly allocated children, never back up
        if visiting.contains(&id) {
            return SchemaNode::default();
        }
        visiting.push(id);
        let mut node = self.nodes[id.0].clone();
        self.resolve_links(&mut node, visiting);
        visiting.pop();
        node
    }

    fn resolve_links(&self, node: &mut SchemaNode, visiting: &mut Vec<SchemaId>) {
        if let Some(id) = node.slot.take() {
            *node = self.expand(id, visiting);
            return;
        }
        for child in node.properties.values_mut() {
            self.resolve_links(child, visiting);
        }
        if let Some(items) = node.items.as_deref_mut() {
            self.resolve_links(items, visiting);
        }
        if let Some(additional) = node.additional_properties.as_deref_mut() {
            self.resolve_links(additional, visiting);
        }
        for part in &mut node.all_of {
            self.resolve_links(part, visiting);
        }
    }
}

// ------------------------------- Document --------------------------------- //

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    pub schemas: IndexMap<String, SchemaNode>,
}

/// Output of one scan: the schema of each requested root plus the shared components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub roots: IndexMap<String, SchemaNode>,
    pub components: Components,
}

// ------------------------------- Tests ------------------------------------ //
