//! Per-entry and per-property processing: class-level `@Schema`, property registration and the
//! field-level attributes layered on top of a property's type schema.

use ordered_float::OrderedFloat;
use serde_json::Value;

use super::Scanner;
use super::deque::EntryId;
use super::resolver::Property;
use super::types::PropertyContext;
use crate::annotation::{Annotation, names};
use crate::index::{ClassInfo, Site, TypeIndex};
use crate::scanner::constraints;
use crate::schema::{SchemaArena, SchemaId, SchemaNode, SchemaType};
use crate::types::TypeRef;
use crate::well_known;

impl<'a, I: TypeIndex + ?Sized> Scanner<'a, I> {
    /// Fold the class-level `@Schema` of `class` into `schema`. Returns the class and type whose
    /// properties should be enumerated next, or `None` when the annotation turned the node into
    /// a scalar.
    pub(super) fn apply_class_schema(
        &mut self,
        class: &'a ClassInfo,
        ty: &TypeRef,
        schema: SchemaId,
    ) -> Option<(&'a ClassInfo, TypeRef)> {
        let index = self.index;
        let Some(annotation) = index.annotation(class, names::SCHEMA) else {
            return Some((class, ty.clone()));
        };
        let mut node = read_schema_annotation(annotation);
        node.overlay(self.arena.get(schema));
        *self.arena.get_mut(schema) = node;

        let Some(target) = implementation(annotation) else {
            return Some((class, ty.clone()));
        };
        if well_known::is_terminal(&target) {
            if let Some(format) = well_known::scalar_format(&target) {
                format.apply(self.arena.get_mut(schema));
            }
            return None;
        }
        match index.get_type(&target) {
            Some(replacement) => Some((replacement, target)),
            None => {
                tracing::warn!(class = %class.name, implementation = %target, "implementation type not found in index");
                Some((class, ty.clone()))
            }
        }
    }

    /// Build the schema of one property and attach it to the entry's node.
    pub(super) fn process_property(&mut self, entry: EntryId, property: &Property<'a>) {
        let site = property.best_site().copied();
        let annotation = site.as_ref().and_then(|s| s.annotation(names::SCHEMA));
        let leaf = annotation.and_then(implementation).unwrap_or_else(|| property.leaf().clone());

        let ctx = PropertyContext { entry, site, stack: property.stack() };
        let type_node = self.arena.alloc(SchemaNode::default());
        let effective = self.process_type(&ctx, &leaf, type_node);
        if self.config.omit_unindexed_properties && self.is_unindexed(&effective) {
            tracing::debug!(property = property.name(), ty = %effective, "omitting property of unindexed type");
            return;
        }

        let index = self.index;
        let type_shape = self.arena.get(type_node).schema_type;
        let reference = self.registry.check_registration(
            index,
            &unwrap_optional(&leaf),
            property.stack(),
            type_node,
            type_shape,
        );

        let mut field_schema = annotation.map(read_schema_annotation).unwrap_or_default();
        let mut required = annotation.and_then(|a| a.boolean("required")).unwrap_or(false);
        if well_known::is_optional(&leaf) {
            field_schema.nullable.get_or_insert(true);
        }
        if property.is_read_only() {
            field_schema.read_only.get_or_insert(true);
        }
        if property.is_write_only() {
            field_schema.write_only.get_or_insert(true);
        }

        let constrained: Vec<Site<'a>> =
            property.sites().map(|(_, site)| *site).filter(constraints::has_constraints).collect();
        let shape = type_shape.unwrap_or(SchemaType::Object);

        let schema = match reference {
            Some(reference) => {
                required |= constrain(&constrained, &mut field_schema, shape);
                if field_schema.is_empty() {
                    reference
                } else {
                    SchemaNode { all_of: vec![reference, field_schema], ..SchemaNode::default() }
                }
            }
            None => {
                let node = self.arena.get_mut(type_node);
                node.overlay(&field_schema);
                required |= constrain(&constrained, node, shape);
                SchemaArena::link(type_node)
            }
        };

        let parent = self.deque.get(entry).schema;
        let parent = self.arena.get_mut(parent);
        parent.properties.insert(property.name().to_string(), schema);
        if required {
            parent.add_required(property.name());
        }
    }
}

/// Apply the constraints of every site to `node`, reading it as `shape` when it has no type of
/// its own. Returns whether any site made the property required.
fn constrain(sites: &[Site<'_>], node: &mut SchemaNode, shape: SchemaType) -> bool {
    let explicit = node.schema_type;
    node.schema_type.get_or_insert(shape);
    let mut required = false;
    for site in sites {
        required |= constraints::apply(site, node);
    }
    if explicit.is_none() {
        node.schema_type = None;
    }
    required
}

/// `Optional<T>` registers as `T`.
fn unwrap_optional(ty: &TypeRef) -> TypeRef {
    if well_known::is_optional(ty) {
        ty.arguments().first().cloned().unwrap_or_else(TypeRef::object)
    } else {
        ty.clone()
    }
}

/// The `implementation` member of a `@Schema`, parsed. `Void` means "not set".
fn implementation(annotation: &Annotation) -> Option<TypeRef> {
    let signature = annotation.string("implementation")?;
    match signature.parse::<TypeRef>() {
        Ok(ty) if ty.local_name() == "Void" => None,
        Ok(ty) => Some(ty),
        Err(error) => {
            tracing::warn!(%signature, %error, "ignoring unparsable implementation type");
            None
        }
    }
}

/// Schema attributes set explicitly on a `@Schema` annotation.
pub(crate) fn read_schema_annotation(annotation: &Annotation) -> SchemaNode {
    let text = |key: &str| annotation.string(key).map(str::to_string);
    let count = |key: &str| annotation.integer(key).and_then(|n| u64::try_from(n).ok());
    SchemaNode {
        schema_type: annotation.string("type").and_then(SchemaType::parse),
        format: text("format"),
        title: text("title"),
        description: text("description"),
        pattern: text("pattern"),
        nullable: annotation.boolean("nullable"),
        read_only: annotation.boolean("readOnly"),
        write_only: annotation.boolean("writeOnly"),
        deprecated: annotation.boolean("deprecated"),
        example: annotation.value("example").cloned(),
        default: annotation.value("defaultValue").cloned(),
        minimum: bound(annotation, "minimum"),
        maximum: bound(annotation, "maximum"),
        exclusive_minimum: annotation.boolean("exclusiveMinimum"),
        exclusive_maximum: annotation.boolean("exclusiveMaximum"),
        min_length: count("minLength"),
        max_length: count("maxLength"),
        min_items: count("minItems"),
        max_items: count("maxItems"),
        min_properties: count("minProperties"),
        max_properties: count("maxProperties"),
        enumeration: annotation.strings("enumeration").into_iter().map(Value::String).collect(),
        ..SchemaNode::default()
    }
}

fn bound(annotation: &Annotation, key: &str) -> Option<OrderedFloat<f64>> {
    let parsed = match annotation.value(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => return None,
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|value| value.is_finite());
    if parsed.is_none() {
        tracing::debug!(key, "invalid schema bound");
    }
    parsed.map(OrderedFloat)
}
