//! Ordered chain of ignore rules, consulted for every declaration site of every property.
//!
//! Built-in rules come first in a fixed order; caller predicates are appended after them. The
//! first rule that says "ignore" wins.

use std::fmt;
use std::sync::Arc;

use crate::annotation::{Annotated, names};
use crate::index::{Site, TypeIndex};
use crate::scanner::deque::PathView;
use crate::scanner::naming;

/// Caller-supplied ignore predicate.
pub type IgnorePredicate = Arc<dyn Fn(&Site<'_>, &PathView<'_, '_>) -> bool + Send + Sync>;

#[derive(Clone)]
pub enum IgnoreRule {
    /// `@Schema(hidden = true)`.
    SchemaHidden,
    JsonbTransient,
    /// Property listed in `@JsonIgnoreProperties` on the class being scanned, any class between
    /// it and the declaring class, or on the property that referenced the current object.
    JsonIgnoreProperties,
    JsonIgnore,
    /// The site's declared type is annotated `@JsonIgnoreType`.
    JsonIgnoreType,
    /// `transient` fields.
    Transient,
    Custom(IgnorePredicate),
}

impl fmt::Debug for IgnoreRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreRule::SchemaHidden => f.write_str("SchemaHidden"),
            IgnoreRule::JsonbTransient => f.write_str("JsonbTransient"),
            IgnoreRule::JsonIgnoreProperties => f.write_str("JsonIgnoreProperties"),
            IgnoreRule::JsonIgnore => f.write_str("JsonIgnore"),
            IgnoreRule::JsonIgnoreType => f.write_str("JsonIgnoreType"),
            IgnoreRule::Transient => f.write_str("Transient"),
            IgnoreRule::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl IgnoreRule {
    fn applies<I: TypeIndex + ?Sized>(&self, index: &I, site: &Site<'_>, path: &PathView<'_, '_>) -> bool {
        match self {
            IgnoreRule::SchemaHidden => site
                .annotation(names::SCHEMA)
                .and_then(|a| a.boolean("hidden"))
                .unwrap_or(false),
            IgnoreRule::JsonbTransient => site.has_annotation(names::JSONB_TRANSIENT),
            IgnoreRule::JsonIgnoreProperties => listed_in_ignore_properties(index, site, path),
            IgnoreRule::JsonIgnore => site
                .annotation(names::JSON_IGNORE)
                .map(|a| a.boolean("value").unwrap_or(true))
                .unwrap_or(false),
            IgnoreRule::JsonIgnoreType => site
                .declared_type()
                .and_then(|ty| index.get_type(ty))
                .is_some_and(|class| {
                    index
                        .annotation(class, names::JSON_IGNORE_TYPE)
                        .map(|a| a.boolean("value").unwrap_or(true))
                        .unwrap_or(false)
                }),
            IgnoreRule::Transient => site.is_field() && site.modifiers().transient,
            IgnoreRule::Custom(predicate) => predicate(site, path),
        }
    }
}

fn property_name_of(site: &Site<'_>) -> String {
    match site {
        Site::Field { field, .. } => field.name.clone(),
        Site::Method { method, .. } => {
            naming::accessor_name(&method.name, true)
                .or_else(|| naming::mutator_name(&method.name))
                .unwrap_or_else(|| method.name.clone())
        }
    }
}

fn listed_in_ignore_properties<I: TypeIndex + ?Sized>(index: &I, site: &Site<'_>, path: &PathView<'_, '_>) -> bool {
    let property = property_name_of(site);
    let listed = |target: &dyn Annotated| {
        index
            .annotation(target, names::JSON_IGNORE_PROPERTIES)
            .is_some_and(|a| a.strings("value").iter().any(|n| *n == property))
    };

    let entry = path.entry();
    if let Some(reference) = &entry.reference {
        let annotations = reference.annotations();
        if annotations
            .iter()
            .any(|a| a.is(names::JSON_IGNORE_PROPERTIES) && a.strings("value").iter().any(|n| *n == property))
        {
            return true;
        }
    }

    // from the scanned class up to (and including) the declaring class
    let declaring = &site.declaring_class().name;
    let mut current = Some(entry.class);
    let mut hops = 0;
    while let Some(class) = current {
        if listed(class) {
            return true;
        }
        if class.name == *declaring || hops > 64 {
            break;
        }
        hops += 1;
        current = class.super_class.as_ref().and_then(|sup| index.get_type(sup));
    }
    false
}

/// Built-in rules plus any registered predicates, evaluated in order.
#[derive(Debug, Clone)]
pub struct IgnoreChain {
    rules: Vec<IgnoreRule>,
}

impl Default for IgnoreChain {
    fn default() -> Self {
        IgnoreChain {
            rules: vec![
                IgnoreRule::SchemaHidden,
                IgnoreRule::JsonbTransient,
                IgnoreRule::JsonIgnoreProperties,
                IgnoreRule::JsonIgnore,
                IgnoreRule::JsonIgnoreType,
                IgnoreRule::Transient,
            ],
        }
    }
}

impl IgnoreChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: IgnoreRule) {
        self.rules.push(rule);
    }

    pub fn push_predicate<F>(&mut self, predicate: F)
    where
        F: Fn(&Site<'_>, &PathView<'_, '_>) -> bool + Send + Sync + 'static,
    {
        self.rules.push(IgnoreRule::Custom(Arc::new(predicate)));
    }

    pub fn rules(&self) -> &[IgnoreRule] {
        &self.rules
    }

    pub fn is_ignored<I: TypeIndex + ?Sized>(&self, index: &I, site: &Site<'_>, path: &PathView<'_, '_>) -> bool {
        match self.rules.iter().find(|rule| rule.applies(index, site, path)) {
            Some(rule) => {
                tracing::trace!(site = site.name(), ?rule, "ignored");
                true
            }
            None => false,
        }
    }
}

/// A `@Schema` that does not hide the site overrides every ignore rule; `hidden` defaults to false.
pub fn is_unhidden(site: &Site<'_>) -> bool {
    site.annotation(names::SCHEMA).is_some_and(|a| a.boolean("hidden") != Some(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Annotation;
    use crate::index::{ClassIndex, ClassInfo};
    use crate::scanner::deque::ObjectDeque;
    use crate::schema::{SchemaArena, SchemaNode};
    use crate::types::TypeRef;
    use serde_json::json;

    fn index() -> ClassIndex {
        let src = json!({ "classes": [
            { "name": "com.acme.Base",
              "fields": [ { "name": "internal", "type": "String" } ] },
            { "name": "com.acme.Child", "super_class": "com.acme.Base",
              "annotations": [ { "name": "JsonIgnoreProperties", "values": { "value": ["internal"] } } ],
              "fields": [
                { "name": "cache", "type": "String", "modifiers": ["transient"] },
                { "name": "secret", "type": "String", "annotations": [ { "name": "JsonIgnore" } ] },
                { "name": "shown", "type": "String", "annotations": [ { "name": "JsonIgnore", "values": { "value": false } } ] },
                { "name": "audit", "type": "com.acme.Audit" }
              ] },
            { "name": "com.acme.Audit",
              "annotations": [ { "name": "com.fasterxml.jackson.annotation.JsonIgnoreType" } ] }
        ]});
        ClassIndex::from_json_str(&src.to_string()).unwrap()
    }

    fn field_site<'a>(class: &'a ClassInfo, name: &str) -> Site<'a> {
        let field = class.fields.iter().find(|f| f.name == name).unwrap();
        Site::Field { declaring: class, field }
    }

    #[test]
    fn builtin_rules() {
        let index = index();
        let child = index.class_by_name("com.acme.Child").unwrap();
        let base = index.class_by_name("com.acme.Base").unwrap();
        let mut arena = SchemaArena::default();
        let mut deque = ObjectDeque::new();
        let root = deque.root(child, TypeRef::class("com.acme.Child"), arena.alloc(SchemaNode::default()));
        let path = PathView::new(&deque, root);
        let chain = IgnoreChain::new();

        assert!(chain.is_ignored(&index, &field_site(child, "cache"), &path));
        assert!(chain.is_ignored(&index, &field_site(child, "secret"), &path));
        assert!(!chain.is_ignored(&index, &field_site(child, "shown"), &path));
        assert!(chain.is_ignored(&index, &field_site(child, "audit"), &path));
        // inherited property suppressed by the subclass annotation
        assert!(chain.is_ignored(&index, &field_site(base, "internal"), &path));
    }

    #[test]
    fn custom_predicates_run_after_builtins() {
        let index = index();
        let child = index.class_by_name("com.acme.Child").unwrap();
        let mut arena = SchemaArena::default();
        let mut deque = ObjectDeque::new();
        let root = deque.root(child, TypeRef::class("com.acme.Child"), arena.alloc(SchemaNode::default()));
        let path = PathView::new(&deque, root);

        let mut chain = IgnoreChain::new();
        assert!(!chain.is_ignored(&index, &field_site(child, "shown"), &path));
        chain.push_predicate(|site, path| site.name() == "shown" && path.depth() == 1);
        assert!(chain.is_ignored(&index, &field_site(child, "shown"), &path));
        assert_eq!(chain.rules().len(), 7);
    }

    #[test]
    fn schema_annotation_unhides_unless_hidden() {
        let class = ClassInfo::new("com.acme.X");
        let mut field = crate::index::FieldInfo {
            name: "x".into(),
            ty: TypeRef::class("java.lang.String"),
            modifiers: Default::default(),
            annotations: vec![Annotation::new(names::SCHEMA).with("hidden", false)],
        };
        assert!(is_unhidden(&Site::Field { declaring: &class, field: &field }));
        field.annotations = vec![Annotation::new(names::SCHEMA).with("description", "x")];
        assert!(is_unhidden(&Site::Field { declaring: &class, field: &field }));
        field.annotations = vec![Annotation::new(names::SCHEMA).with("hidden", true)];
        assert!(!is_unhidden(&Site::Field { declaring: &class, field: &field }));
        field.annotations.clear();
        assert!(!is_unhidden(&Site::Field { declaring: &class, field: &field }));
    }
}
