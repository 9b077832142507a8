//! Scan-scoped schema registry.
//!
//! Deduplicates schemas by structural type identity ([`TypeKey`]) and hands out `$ref` nodes
//! pointing at `#/components/schemas/{name}`. A registry belongs to exactly one scan; it is
//! created with the [`Scanner`](crate::scanner::Scanner) and dropped with it.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::annotation::names;
use crate::config::ScanConfig;
use crate::error::{SchemaError, SchemaResult};
use crate::index::TypeIndex;
use crate::schema::{SchemaId, SchemaNode, SchemaType};
use crate::substitution::SubstitutionStack;
use crate::types::{TypeKind, TypeRef};
use crate::well_known;

/// Structural identity of a type: name, arguments, wildcard bounds and variable identity.
/// Nothing attached to a particular use site takes part in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeKey(TypeRef);

impl TypeKey {
    pub fn new(ty: &TypeRef) -> Self {
        TypeKey(ty.clone())
    }

    pub fn ty(&self) -> &TypeRef {
        &self.0
    }

    /// `Pair<String, List<Integer>>` → `PairStringListInteger`.
    pub fn default_name(&self) -> String {
        let mut name = String::new();
        push_name(&mut name, &self.0);
        name
    }
}

fn push_name(out: &mut String, ty: &TypeRef) {
    match ty {
        TypeRef::Wildcard { extends: Some(bound), .. } if !bound.is_object() => {
            out.push_str("Extends");
            push_name(out, bound);
        }
        TypeRef::Wildcard { super_bound: Some(bound), .. } if !bound.is_object() => {
            out.push_str("Super");
            push_name(out, bound);
        }
        TypeRef::Wildcard { .. } => out.push_str(crate::types::local_name(well_known::OBJECT)),
        TypeRef::Array(component) => {
            push_name(out, component);
            out.push_str("Array");
        }
        TypeRef::Parameterized { arguments, .. } => {
            out.push_str(ty.local_name());
            for arg in arguments {
                push_name(out, arg);
            }
        }
        TypeRef::Primitive(_) | TypeRef::Class(_) | TypeRef::Variable { .. } => out.push_str(ty.local_name()),
    }
}

#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub name: String,
    /// Canonical node in the owning scan's arena.
    pub schema: SchemaId,
    reference: SchemaNode,
}

impl RegistryEntry {
    pub fn reference(&self) -> &SchemaNode {
        &self.reference
    }
}

#[derive(Debug)]
pub struct SchemaRegistry {
    entries: IndexMap<TypeKey, RegistryEntry>,
    names: HashSet<String>,
    enabled: bool,
    array_references: bool,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        SchemaRegistry::new()
    }
}

impl SchemaRegistry {
    pub fn new() -> Self {
        SchemaRegistry { entries: IndexMap::new(), names: HashSet::new(), enabled: true, array_references: true }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        SchemaRegistry {
            enabled: config.schema_references_enable,
            array_references: config.array_references_enable,
            ..SchemaRegistry::new()
        }
    }

    /// Whether `check_registration` deduplicates at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register `schema` for `ty`, replacing any earlier registration of the same key. The old
    /// name is released first, so a redefinition may keep it. Returns the `$ref` node.
    pub fn register(&mut self, ty: &TypeRef, schema: SchemaId, explicit_name: Option<&str>) -> SchemaNode {
        let key = TypeKey::new(ty);
        if let Some(previous) = self.entries.get(&key) {
            self.names.remove(&previous.name);
        }
        let base = explicit_name.map(str::to_string).unwrap_or_else(|| key.default_name());
        let name = self.unique_name(base);
        self.names.insert(name.clone());
        let reference = SchemaNode::reference_to(&name);
        tracing::debug!(ty = %ty, %name, "registered schema");
        self.entries.insert(key, RegistryEntry { name, schema, reference: reference.clone() });
        reference
    }

    /// `$ref` node for a registered type.
    pub fn lookup(&self, ty: &TypeRef) -> SchemaResult<SchemaNode> {
        self.entry(ty).map(|e| e.reference.clone())
    }

    /// Canonical arena node for a registered type.
    pub fn lookup_schema(&self, ty: &TypeRef) -> SchemaResult<SchemaId> {
        self.entry(ty).map(|e| e.schema)
    }

    pub fn has(&self, ty: &TypeRef) -> bool {
        self.entries.contains_key(&TypeKey::new(ty))
    }

    pub fn canonical(&self, ty: &TypeRef) -> Option<SchemaId> {
        self.entries.get(&TypeKey::new(ty)).map(|e| e.schema)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&TypeRef, &RegistryEntry)> {
        self.entries.iter().map(|(k, e)| (k.ty(), e))
    }

    fn entry(&self, ty: &TypeRef) -> SchemaResult<&RegistryEntry> {
        self.entries.get(&TypeKey::new(ty)).ok_or_else(|| SchemaError::not_registered(ty))
    }

    fn unique_name(&self, base: String) -> String {
        if !self.names.contains(&base) {
            return base;
        }
        let mut suffix = 1usize;
        loop {
            let candidate = format!("{base}{suffix}");
            if !self.names.contains(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Either a `$ref` to the (possibly newly created) entry for `ty`, or `None` when `ty` is not
    /// eligible and the candidate should be used inline.
    ///
    /// Eligible: class-like, parameterized, variable or wildcard references whose resolved
    /// identity is a non-terminal class present in the index. A new entry adopts `candidate` as
    /// its canonical node; an existing entry keeps whatever node registered it first.
    pub fn check_registration<I: TypeIndex + ?Sized>(
        &mut self,
        index: &I,
        ty: &TypeRef,
        stack: &SubstitutionStack,
        candidate: SchemaId,
        candidate_type: Option<SchemaType>,
    ) -> Option<SchemaNode> {
        if !self.enabled {
            return None;
        }
        if !matches!(ty.kind(), TypeKind::Class | TypeKind::Parameterized | TypeKind::Variable | TypeKind::Wildcard) {
            return None;
        }
        let resolved = stack.resolve(ty);
        if !matches!(resolved.kind(), TypeKind::Class | TypeKind::Parameterized) {
            return None;
        }
        // predefined schemas may name types the index does not know
        if let Some(entry) = self.entries.get(&TypeKey::new(&resolved)) {
            return Some(entry.reference.clone());
        }
        if well_known::is_terminal(&resolved) {
            return None;
        }
        let class = index.get_type(&resolved)?;
        if candidate_type == Some(SchemaType::Array) && !self.array_references {
            return None;
        }
        let explicit = index.annotation(class, names::SCHEMA).and_then(|a| a.string("name"));
        Some(self.register(&resolved, candidate, explicit))
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Annotation;
    use crate::index::{ClassIndex, ClassInfo};
    use crate::schema::SchemaArena;

    fn index(names: &[&str]) -> ClassIndex {
        ClassIndex::new(names.iter().map(|n| ClassInfo::new(n))).unwrap()
    }

    fn ty(src: &str) -> TypeRef {
        src.parse().unwrap()
    }

    #[test]
    fn default_names_follow_arguments() {
        assert_eq!(TypeKey::new(&ty("com.acme.Pair<String, Integer>")).default_name(), "PairStringInteger");
        assert_eq!(TypeKey::new(&ty("Box<? extends Number>")).default_name(), "BoxExtendsNumber");
        assert_eq!(TypeKey::new(&ty("Box<? super Integer>")).default_name(), "BoxSuperInteger");
        assert_eq!(TypeKey::new(&ty("Box<? extends Object>")).default_name(), "BoxObject");
        assert_eq!(TypeKey::new(&ty("Box<?>")).default_name(), "BoxObject");
        assert_eq!(TypeKey::new(&ty("Pair<String, List<Integer>>")).default_name(), "PairStringListInteger");
    }

    #[test]
    fn colliding_names_get_numeric_suffixes_in_order() {
        let index = index(&["a.X", "b.X", "c.X"]);
        let mut arena = SchemaArena::default();
        let mut registry = SchemaRegistry::new();
        let stack = SubstitutionStack::new();
        let names: Vec<String> = ["a.X", "b.X", "c.X"]
            .iter()
            .map(|n| {
                let id = arena.alloc(SchemaNode::default());
                let reference = registry.check_registration(&index, &ty(n), &stack, id, None).unwrap();
                reference.reference_name().unwrap().to_string()
            })
            .collect();
        assert_eq!(names, vec!["X", "X1", "X2"]);
    }

    #[test]
    fn dedup_is_idempotent() {
        let index = index(&["com.acme.Box"]);
        let mut arena = SchemaArena::default();
        let mut registry = SchemaRegistry::new();
        let stack = SubstitutionStack::new();
        let boxed = ty("com.acme.Box<String>");

        let first_node = arena.alloc(SchemaNode::default());
        let first = registry.check_registration(&index, &boxed, &stack, first_node, None);
        assert!(registry.has(&boxed));
        let second_node = arena.alloc(SchemaNode::default());
        let second = registry.check_registration(&index, &boxed, &stack, second_node, None);

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup_schema(&boxed).unwrap(), first_node, "first registration keeps the canonical node");
    }

    #[test]
    fn variables_register_under_their_resolved_identity() {
        let index = index(&["com.acme.Box"]);
        let mut arena = SchemaArena::default();
        let mut registry = SchemaRegistry::new();
        let mut stack = SubstitutionStack::new();
        stack.push([("T".to_string(), ty("com.acme.Box<String>"))].into_iter().collect());

        let id = arena.alloc(SchemaNode::default());
        registry.check_registration(&index, &TypeRef::variable("T"), &stack, id, None).unwrap();
        assert!(registry.has(&ty("com.acme.Box<String>")));
        assert!(!registry.has(&TypeRef::variable("T")));
    }

    #[test]
    fn ineligible_types_stay_inline() {
        let index = index(&["com.acme.Box"]);
        let mut arena = SchemaArena::default();
        let mut registry = SchemaRegistry::new();
        let stack = SubstitutionStack::new();
        let id = arena.alloc(SchemaNode::default());
        assert!(registry.check_registration(&index, &ty("com.acme.Box[]"), &stack, id, None).is_none());
        assert!(registry.check_registration(&index, &ty("String"), &stack, id, None).is_none());
        assert!(registry.check_registration(&index, &ty("com.acme.Unknown"), &stack, id, None).is_none());
        assert!(registry.check_registration(&index, &TypeRef::variable("T"), &stack, id, None).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn explicit_name_annotation_wins() {
        let mut class = ClassInfo::new("com.acme.Money");
        class.annotations.push(Annotation::new(names::SCHEMA).with("name", "Amount"));
        let index = ClassIndex::new([class]).unwrap();
        let mut arena = SchemaArena::default();
        let mut registry = SchemaRegistry::new();
        let id = arena.alloc(SchemaNode::default());
        let reference = registry
            .check_registration(&index, &ty("com.acme.Money"), &SubstitutionStack::new(), id, None)
            .unwrap();
        assert_eq!(reference.reference_name(), Some("Amount"));
    }

    #[test]
    fn register_replaces_and_may_reuse_the_name() {
        let mut arena = SchemaArena::default();
        let mut registry = SchemaRegistry::new();
        let money = ty("com.acme.Money");
        let first = arena.alloc(SchemaNode::default());
        let second = arena.alloc(SchemaNode::default());
        registry.register(&money, first, None);
        let again = registry.register(&money, second, None);
        assert_eq!(again.reference_name(), Some("Money"));
        assert_eq!(registry.lookup_schema(&money).unwrap(), second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_of_unregistered_type_fails() {
        let registry = SchemaRegistry::new();
        let err = registry.lookup(&ty("com.acme.Nope")).unwrap_err();
        assert!(matches!(err, SchemaError::NotRegistered { .. }));
    }

    #[test]
    fn disabled_registry_never_deduplicates() {
        let index = index(&["com.acme.Box"]);
        let mut arena = SchemaArena::default();
        let mut registry = SchemaRegistry::from_config(&ScanConfig::new().with_schema_references(false));
        let id = arena.alloc(SchemaNode::default());
        assert!(registry.check_registration(&index, &ty("com.acme.Box"), &SubstitutionStack::new(), id, None).is_none());
    }
}
