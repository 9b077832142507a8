//! Bean-validation constraints mapped onto schema attributes.
//!
//! Which constraints apply depends on the schema's `type`. A constraint never overwrites an
//! attribute that is already set (by the type or by an explicit `@Schema`), and reference nodes
//! are left alone.

use ordered_float::OrderedFloat;
use regex::Regex;

use crate::annotation::{Annotation, names};
use crate::index::Site;
use crate::schema::{SchemaNode, SchemaType};

const DEFAULT_GROUP: &str = "Default";

/// Whether any site carries a constraint annotation this module understands.
pub fn has_constraints(site: &Site<'_>) -> bool {
    const ALL: [&str; 14] = [
        names::DECIMAL_MAX,
        names::DECIMAL_MIN,
        names::DIGITS,
        names::MAX,
        names::MIN,
        names::NEGATIVE,
        names::NEGATIVE_OR_ZERO,
        names::NOT_BLANK,
        names::NOT_EMPTY,
        names::NOT_NULL,
        names::PATTERN,
        names::POSITIVE,
        names::POSITIVE_OR_ZERO,
        names::SIZE,
    ];
    ALL.iter().any(|name| site.has_annotation(name)) || requires_by_json_property(site)
}

/// Apply the constraints found on `site` to `schema`. Returns whether the property is required.
pub fn apply(site: &Site<'_>, schema: &mut SchemaNode) -> bool {
    let Some(schema_type) = schema.schema_type else {
        return false;
    };
    if schema.is_reference() {
        return false;
    }
    let c = Constraints { site };
    let mut required = false;
    match schema_type {
        SchemaType::Array => {
            required |= c.not_null(schema);
            required |= requires_by_json_property(site);
            c.size_array(schema);
            c.not_empty_array(schema);
        }
        SchemaType::Boolean => {
            required |= c.not_null(schema);
            required |= requires_by_json_property(site);
        }
        SchemaType::Integer | SchemaType::Number => {
            c.decimal_max(schema);
            c.decimal_min(schema);
            c.digits(schema);
            c.max(schema);
            c.min(schema);
            c.negative(schema);
            c.negative_or_zero(schema);
            required |= c.not_null(schema);
            required |= requires_by_json_property(site);
            c.positive(schema);
            c.positive_or_zero(schema);
        }
        SchemaType::Object => {
            required |= c.not_null(schema);
            required |= requires_by_json_property(site);
            c.size_object(schema);
            c.not_empty_object(schema);
        }
        SchemaType::String => {
            c.decimal_max(schema);
            c.decimal_min(schema);
            c.digits(schema);
            c.not_blank(schema);
            c.pattern(schema);
            required |= c.not_null(schema);
            required |= requires_by_json_property(site);
            c.size_string(schema);
            c.not_empty_string(schema);
        }
    }
    required
}

fn requires_by_json_property(site: &Site<'_>) -> bool {
    site.annotation(names::JSON_PROPERTY).and_then(|a| a.boolean("required")) == Some(true)
}

struct Constraints<'s, 'a> {
    site: &'s Site<'a>,
}

impl<'a> Constraints<'_, 'a> {
    /// The constraint, unless it is restricted to a validation group other than the default one.
    fn get(&self, name: &str) -> Option<&'a Annotation> {
        let constraint = self.site.annotation(name)?;
        let groups = constraint.strings("groups");
        match groups.as_slice() {
            [] => Some(constraint),
            [only] if crate::types::local_name(only) == DEFAULT_GROUP => Some(constraint),
            _ => None,
        }
    }

    fn decimal(&self, constraint: &Annotation) -> Option<OrderedFloat<f64>> {
        let raw = match constraint.value("value") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Some(OrderedFloat(value)),
            _ => {
                tracing::debug!(value = %raw, constraint = %constraint.name, "invalid constraint value");
                None
            }
        }
    }

    /// An integer member of `constraint`. A member that is present but not an integer is logged
    /// and treated as absent.
    fn integer(&self, constraint: &Annotation, key: &str) -> Option<i64> {
        let value = constraint.value(key)?;
        let parsed = constraint.integer(key);
        if parsed.is_none() {
            tracing::debug!(%value, key, constraint = %constraint.name, "invalid constraint value");
        }
        parsed
    }

    fn decimal_max(&self, schema: &mut SchemaNode) {
        let Some(constraint) = self.get(names::DECIMAL_MAX) else { return };
        if schema.maximum.is_some() {
            return;
        }
        if let Some(value) = self.decimal(constraint) {
            schema.maximum = Some(value);
            if schema.exclusive_maximum.is_none() && constraint.boolean("inclusive") == Some(false) {
                schema.exclusive_maximum = Some(true);
            }
        }
    }

    fn decimal_min(&self, schema: &mut SchemaNode) {
        let Some(constraint) = self.get(names::DECIMAL_MIN) else { return };
        if schema.minimum.is_some() {
            return;
        }
        if let Some(value) = self.decimal(constraint) {
            schema.minimum = Some(value);
            if schema.exclusive_minimum.is_none() && constraint.boolean("inclusive") == Some(false) {
                schema.exclusive_minimum = Some(true);
            }
        }
    }

    fn digits(&self, schema: &mut SchemaNode) {
        let Some(constraint) = self.get(names::DIGITS) else { return };
        if schema.pattern.is_some() {
            return;
        }
        let integer = constraint.integer("integer").unwrap_or(0);
        let fraction = constraint.integer("fraction").unwrap_or(0);
        let mut pattern = String::from("^");
        if integer > 0 {
            pattern.push_str(r"\d");
            if integer > 1 {
                pattern.push_str(&format!("{{1,{integer}}}"));
            }
        }
        if fraction > 0 {
            pattern.push_str(r"([.]\d");
            if fraction > 1 {
                pattern.push_str(&format!("{{1,{fraction}}}"));
            }
            pattern.push_str(")?");
        }
        pattern.push('$');
        schema.pattern = Some(pattern);
    }

    fn max(&self, schema: &mut SchemaNode) {
        let Some(constraint) = self.get(names::MAX) else { return };
        if schema.maximum.is_none() {
            if let Some(value) = self.integer(constraint, "value") {
                schema.maximum = Some(OrderedFloat(value as f64));
            }
        }
    }

    fn min(&self, schema: &mut SchemaNode) {
        let Some(constraint) = self.get(names::MIN) else { return };
        if schema.minimum.is_none() {
            if let Some(value) = self.integer(constraint, "value") {
                schema.minimum = Some(OrderedFloat(value as f64));
            }
        }
    }

    fn negative(&self, schema: &mut SchemaNode) {
        if self.get(names::NEGATIVE).is_some() && schema.maximum.is_none() {
            let exclusive = schema.exclusive_maximum == Some(true);
            schema.maximum = Some(OrderedFloat(if exclusive { 0.0 } else { -1.0 }));
        }
    }

    fn negative_or_zero(&self, schema: &mut SchemaNode) {
        if self.get(names::NEGATIVE_OR_ZERO).is_some() && schema.maximum.is_none() {
            let exclusive = schema.exclusive_maximum == Some(true);
            schema.maximum = Some(OrderedFloat(if exclusive { 1.0 } else { 0.0 }));
        }
    }

    fn positive(&self, schema: &mut SchemaNode) {
        if self.get(names::POSITIVE).is_some() && schema.minimum.is_none() {
            let exclusive = schema.exclusive_minimum == Some(true);
            schema.minimum = Some(OrderedFloat(if exclusive { 0.0 } else { 1.0 }));
        }
    }

    fn positive_or_zero(&self, schema: &mut SchemaNode) {
        if self.get(names::POSITIVE_OR_ZERO).is_some() && schema.minimum.is_none() {
            let exclusive = schema.exclusive_minimum == Some(true);
            schema.minimum = Some(OrderedFloat(if exclusive { -1.0 } else { 0.0 }));
        }
    }

    fn not_blank(&self, schema: &mut SchemaNode) {
        if self.get(names::NOT_BLANK).is_some() {
            schema.nullable.get_or_insert(false);
            schema.pattern.get_or_insert_with(|| r"\S".to_string());
        }
    }

    fn pattern(&self, schema: &mut SchemaNode) {
        let Some(constraint) = self.get(names::PATTERN) else { return };
        if schema.pattern.is_some() {
            return;
        }
        let Some(regexp) = constraint.string("regexp") else { return };
        match Regex::new(regexp) {
            Ok(_) => schema.pattern = Some(regexp.to_string()),
            Err(error) => tracing::debug!(%regexp, %error, "invalid constraint value"),
        }
    }

    fn not_null(&self, schema: &mut SchemaNode) -> bool {
        if self.get(names::NOT_NULL).is_none() {
            return false;
        }
        schema.nullable.get_or_insert(false);
        true
    }

    fn not_empty_array(&self, schema: &mut SchemaNode) {
        if self.get(names::NOT_EMPTY).is_some() {
            schema.min_items.get_or_insert(1);
        }
    }

    fn not_empty_object(&self, schema: &mut SchemaNode) {
        if schema.additional_properties.is_some() && self.get(names::NOT_EMPTY).is_some() {
            schema.min_properties.get_or_insert(1);
        }
    }

    fn not_empty_string(&self, schema: &mut SchemaNode) {
        if self.get(names::NOT_EMPTY).is_some() {
            schema.nullable.get_or_insert(false);
            schema.min_length.get_or_insert(1);
        }
    }

    fn size_bounds(&self) -> Option<(Option<u64>, Option<u64>)> {
        let constraint = self.get(names::SIZE)?;
        let bound = |key: &str| {
            let value = self.integer(constraint, key)?;
            let count = u64::try_from(value).ok();
            if count.is_none() {
                tracing::debug!(value, key, constraint = %constraint.name, "invalid constraint value");
            }
            count
        };
        Some((bound("min"), bound("max")))
    }

    fn size_array(&self, schema: &mut SchemaNode) {
        if let Some((min, max)) = self.size_bounds() {
            fill(&mut schema.min_items, min);
            fill(&mut schema.max_items, max);
        }
    }

    fn size_object(&self, schema: &mut SchemaNode) {
        if schema.additional_properties.is_none() {
            return;
        }
        if let Some((min, max)) = self.size_bounds() {
            fill(&mut schema.min_properties, min);
            fill(&mut schema.max_properties, max);
        }
    }

    fn size_string(&self, schema: &mut SchemaNode) {
        if let Some((min, max)) = self.size_bounds() {
            fill(&mut schema.min_length, min);
            fill(&mut schema.max_length, max);
        }
    }
}

fn fill(slot: &mut Option<u64>, value: Option<u64>) {
    if slot.is_none() {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{ClassInfo, FieldInfo};
    use crate::types::TypeRef;
    use serde_json::json;

    fn run(annotations: Vec<Annotation>, mut schema: SchemaNode) -> (serde_json::Value, bool) {
        let class = ClassInfo::new("com.acme.Bean");
        let field = FieldInfo {
            name: "f".into(),
            ty: TypeRef::class("java.lang.Object"),
            modifiers: Default::default(),
            annotations,
        };
        let required = apply(&Site::Field { declaring: &class, field: &field }, &mut schema);
        (schema.to_json(), required)
    }

    #[test]
    fn numeric_bounds() {
        let (out, required) = run(
            vec![
                Annotation::new(names::DECIMAL_MAX).with("value", "10.5").with("inclusive", false),
                Annotation::new(names::POSITIVE),
                Annotation::new(names::NOT_NULL),
            ],
            SchemaNode::of_type(SchemaType::Number),
        );
        assert_eq!(
            out,
            json!({ "type": "number", "maximum": 10.5, "exclusiveMaximum": true, "minimum": 1, "nullable": false })
        );
        assert!(required);
    }

    #[test]
    fn existing_attributes_are_kept_and_bad_decimals_skipped() {
        let mut schema = SchemaNode::of_type(SchemaType::Integer);
        schema.minimum = Some(OrderedFloat(5.0));
        let (out, _) = run(
            vec![
                Annotation::new(names::MIN).with("value", 1),
                Annotation::new(names::DECIMAL_MAX).with("value", "ten"),
            ],
            schema,
        );
        assert_eq!(out, json!({ "type": "integer", "minimum": 5 }));
    }

    #[test]
    fn non_integer_bounds_are_skipped() {
        let (numeric, _) = run(
            vec![Annotation::new(names::MAX).with("value", "ten"), Annotation::new(names::MIN).with("value", 1.5)],
            SchemaNode::of_type(SchemaType::Integer),
        );
        assert_eq!(numeric, json!({ "type": "integer" }));

        let (text, _) = run(
            vec![Annotation::new(names::SIZE).with("min", -1).with("max", "8")],
            SchemaNode::of_type(SchemaType::String),
        );
        assert_eq!(text, json!({ "type": "string" }));
    }

    #[test]
    fn string_constraints() {
        let (out, _) = run(
            vec![
                Annotation::new(names::DIGITS).with("integer", 5).with("fraction", 2),
                Annotation::new(names::SIZE).with("min", 2).with("max", 8),
                Annotation::new(names::NOT_EMPTY),
            ],
            SchemaNode::of_type(SchemaType::String),
        );
        assert_eq!(
            out,
            json!({
                "type": "string",
                "pattern": "^\\d{1,5}([.]\\d{1,2})?$",
                "minLength": 2,
                "maxLength": 8,
                "nullable": false
            })
        );
    }

    #[test]
    fn invalid_regex_is_dropped() {
        let (out, _) = run(
            vec![Annotation::new(names::PATTERN).with("regexp", "([a-z")],
            SchemaNode::of_type(SchemaType::String),
        );
        assert_eq!(out, json!({ "type": "string" }));
        let (out, _) = run(
            vec![Annotation::new(names::PATTERN).with("regexp", "^[a-z]+$")],
            SchemaNode::of_type(SchemaType::String),
        );
        assert_eq!(out, json!({ "type": "string", "pattern": "^[a-z]+$" }));
    }

    #[test]
    fn map_bounds_need_additional_properties() {
        let size = || vec![Annotation::new(names::SIZE).with("max", 3), Annotation::new(names::NOT_EMPTY)];
        let (plain, _) = run(size(), SchemaNode::of_type(SchemaType::Object));
        assert_eq!(plain, json!({ "type": "object" }));

        let mut map = SchemaNode::of_type(SchemaType::Object);
        map.additional_properties = Some(Box::new(SchemaNode::of_type(SchemaType::String)));
        let (out, _) = run(size(), map);
        assert_eq!(out["maxProperties"], json!(3));
        assert_eq!(out["minProperties"], json!(1));
    }

    #[test]
    fn non_default_groups_and_references_are_skipped() {
        let (out, required) = run(
            vec![Annotation::new(names::NOT_NULL).with("groups", json!(["com.acme.Create"]))],
            SchemaNode::of_type(SchemaType::String),
        );
        assert_eq!(out, json!({ "type": "string" }));
        assert!(!required);

        let (_, required) = run(
            vec![Annotation::new(names::NOT_NULL).with("groups", json!(["jakarta.validation.groups.Default"]))],
            SchemaNode::of_type(SchemaType::Boolean),
        );
        assert!(required);

        let mut reference = SchemaNode::reference_to("Money");
        reference.schema_type = Some(SchemaType::Object);
        let (_, required) = run(vec![Annotation::new(names::NOT_NULL)], reference);
        assert!(!required);
    }

    #[test]
    fn json_property_required() {
        let (_, required) = run(
            vec![Annotation::new(names::JSON_PROPERTY).with("required", true)],
            SchemaNode::of_type(SchemaType::Array),
        );
        assert!(required);
    }
}
