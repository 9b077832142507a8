//! Enum types become string schemas listing their constants.

use serde_json::Value;

use crate::annotation::{Annotated, names};
use crate::index::{ClassInfo, FieldInfo};
use crate::schema::{SchemaNode, SchemaType};

/// Constants are the static, non-synthetic fields typed as the enum itself, in declaration order.
pub fn constants(class: &ClassInfo) -> impl Iterator<Item = &FieldInfo> {
    class.fields.iter().filter(move |field| {
        field.modifiers.is_static
            && !field.modifiers.synthetic
            && !field.name.starts_with('$')
            && field.ty.name() == class.name
    })
}

/// Serialized name of a constant: an explicit JSON property name if present, else the constant name.
pub fn constant_name(field: &FieldInfo) -> &str {
    [names::JSON_PROPERTY, names::JSONB_PROPERTY]
        .iter()
        .find_map(|annotation| field.annotation(annotation).and_then(|a| a.string("value")))
        .unwrap_or(&field.name)
}

pub fn enum_schema(class: &ClassInfo) -> SchemaNode {
    let mut node = SchemaNode::of_type(SchemaType::String);
    node.enumeration = constants(class).map(|field| Value::String(constant_name(field).to_string())).collect();
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{ClassIndex, TypeIndex};
    use serde_json::json;

    #[test]
    fn constants_in_order_with_renames() {
        let src = json!({ "classes": [
            { "name": "com.acme.Color", "kind": "enum",
              "fields": [
                { "name": "RED", "type": "com.acme.Color", "modifiers": ["public", "static"] },
                { "name": "DARK_BLUE", "type": "com.acme.Color", "modifiers": ["public", "static"],
                  "annotations": [ { "name": "JsonProperty", "values": { "value": "dark-blue" } } ] },
                { "name": "$VALUES", "type": "com.acme.Color[]", "modifiers": ["private", "static", "synthetic"] },
                { "name": "code", "type": "int", "modifiers": ["private"] }
              ] }
        ]});
        let index = ClassIndex::from_json_str(&src.to_string()).unwrap();
        let color = index.class_by_name("com.acme.Color").unwrap();
        assert_eq!(
            enum_schema(color).to_json(),
            json!({ "type": "string", "enum": ["RED", "dark-blue"] })
        );
    }
}
