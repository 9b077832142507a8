//! Type graph → schema synthesis.
//!
//! A [`Scanner`] owns everything one scan mutates: the node arena, the registry, the worklist
//! and the ignore chain. Roots go in through [`Scanner::synthesize`]; each one is walked
//! depth-first until the worklist drains, then its node is materialized. Several roots may share
//! one scanner (and so one registry); [`synthesize_all`] runs independent scans in parallel.

pub mod constraints;
pub mod deque;
pub mod enums;
pub mod ignore;
pub mod naming;
pub mod resolver;
mod target;
mod types;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use rayon::prelude::*;

use crate::config::ScanConfig;
use crate::error::SchemaResult;
use crate::index::{ClassInfo, TypeIndex};
use crate::registry::SchemaRegistry;
use crate::schema::{Components, SchemaArena, SchemaDocument, SchemaNode, SchemaType};
use crate::substitution::SubstitutionStack;
use crate::types::TypeRef;
use crate::well_known;

use self::deque::{EntryId, ObjectDeque, PathView};
use self::ignore::{IgnoreChain, IgnoreRule};
use self::resolver::{Property, PropertyResolver};
use self::types::PropertyContext;

/// Stand-in class for roots that are containers rather than objects (`List<Foo>`, `Foo[]`):
/// their entry only anchors the path of whatever they hold.
static CONTAINER_ROOT: Lazy<ClassInfo> = Lazy::new(|| ClassInfo::new("<container>"));

pub struct Scanner<'a, I: TypeIndex + ?Sized> {
    index: &'a I,
    config: &'a ScanConfig,
    ignore: IgnoreChain,
    arena: SchemaArena,
    registry: SchemaRegistry,
    deque: ObjectDeque<'a>,
    roots: IndexMap<String, SchemaNode>,
}

impl<'a, I: TypeIndex + ?Sized> Scanner<'a, I> {
    /// A fresh scan. Predefined schemas from `config` are registered up front.
    pub fn new(index: &'a I, config: &'a ScanConfig) -> Self {
        let mut scanner = Scanner {
            index,
            config,
            ignore: IgnoreChain::default(),
            arena: SchemaArena::default(),
            registry: SchemaRegistry::from_config(config),
            deque: ObjectDeque::new(),
            roots: IndexMap::new(),
        };
        if scanner.registry.is_enabled() {
            for (ty, node) in config.predefined_schemas() {
                scanner.register(&ty, node);
            }
        }
        scanner
    }

    pub fn with_ignore_rule(mut self, rule: IgnoreRule) -> Self {
        self.ignore.push(rule);
        self
    }

    pub fn ignore_chain_mut(&mut self) -> &mut IgnoreChain {
        &mut self.ignore
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Register `schema` for `ty` directly, replacing any earlier registration.
    pub fn register(&mut self, ty: &TypeRef, schema: SchemaNode) -> SchemaNode {
        let id = self.arena.alloc(schema);
        self.registry.register(ty, id, None)
    }

    /// `$ref` node for an already registered type.
    pub fn lookup(&self, ty: &TypeRef) -> SchemaResult<SchemaNode> {
        self.registry.lookup(ty)
    }

    /// Schema of `root`. The result is also kept for [`into_document`](Self::into_document).
    pub fn synthesize(&mut self, root: &TypeRef) -> SchemaNode {
        tracing::debug!(%root, "synthesizing");
        let node = self.synthesize_root(root);
        self.roots.insert(root.to_string(), node.clone());
        node
    }

    /// Resolved properties of `ty`, as the scan would see them for a root of that type.
    pub fn properties(&mut self, ty: &TypeRef) -> Option<Vec<Property<'a>>> {
        let index = self.index;
        let class = index.get_type(ty)?;
        let schema = self.arena.alloc(SchemaNode::default());
        let entry = self.deque.root(class, ty.clone(), schema);
        Some(self.resolve_properties(entry, class, ty))
    }

    /// Every registered schema, by component name, in registration order.
    pub fn components(&self) -> IndexMap<String, SchemaNode> {
        self.registry
            .entries()
            .map(|(_, entry)| (entry.name.clone(), self.arena.materialize(entry.schema)))
            .collect()
    }

    pub fn into_document(self) -> SchemaDocument {
        let schemas = self.components();
        SchemaDocument { roots: self.roots, components: Components { schemas } }
    }

    fn synthesize_root(&mut self, root: &TypeRef) -> SchemaNode {
        let root = root.upper_bound();
        if well_known::is_terminal(&root) {
            let mut node = SchemaNode::default();
            if let Some(format) = well_known::scalar_format(&root) {
                format.apply(&mut node);
            }
            return node;
        }
        if let Some(canonical) = self.registry.canonical(&root) {
            return self.arena.materialize(canonical);
        }

        let index = self.index;
        let id = self.arena.alloc(SchemaNode::default());
        let stack = SubstitutionStack::new();
        match index.get_type(&root) {
            Some(class) if !self.is_container(&root) && !index.is_assignable_to(&root, well_known::ENUM) => {
                self.registry.check_registration(index, &root, &stack, id, Some(SchemaType::Object));
                let entry = self.deque.root(class, root.clone(), id);
                self.deque.push(entry);
            }
            _ => {
                let entry = self.deque.root(&CONTAINER_ROOT, root.clone(), id);
                let ctx = PropertyContext { entry, site: None, stack: &stack };
                self.process_type(&ctx, &root, id);
            }
        }
        self.depth_first_search();
        self.arena.materialize(id)
    }

    fn depth_first_search(&mut self) {
        while let Some(id) = self.deque.pop() {
            self.process_entry(id);
        }
    }

    fn process_entry(&mut self, id: EntryId) {
        let entry = self.deque.get(id).clone();
        // another node became canonical for this type after it was scheduled
        if self.registry.canonical(&entry.ty).is_some_and(|canonical| canonical != entry.schema) {
            return;
        }
        tracing::debug!(ty = %entry.ty, depth = PathView::new(&self.deque, id).depth(), "processing entry");

        let Some((class, ty)) = self.apply_class_schema(entry.class, &entry.ty, entry.schema) else {
            return;
        };
        let node = self.arena.get_mut(entry.schema);
        match node.schema_type {
            None => node.schema_type = Some(SchemaType::Object),
            Some(SchemaType::Object) => {}
            Some(_) => return,
        }

        for property in self.resolve_properties(id, class, &ty) {
            if !property.is_ignored() {
                self.process_property(id, &property);
            }
        }
    }

    fn resolve_properties(&self, entry: EntryId, class: &'a ClassInfo, ty: &TypeRef) -> Vec<Property<'a>> {
        let path = PathView::new(&self.deque, entry);
        PropertyResolver::new(self.index, self.config, &self.ignore, path).resolve(class, ty)
    }
}

/// One scan of `root` with a fresh registry.
pub fn synthesize<I: TypeIndex + ?Sized>(index: &I, config: &ScanConfig, root: &TypeRef) -> SchemaDocument {
    let mut scanner = Scanner::new(index, config);
    scanner.synthesize(root);
    scanner.into_document()
}

/// One independent scan per root, in parallel. Output order follows `roots`.
pub fn synthesize_all<I: TypeIndex + Sync + ?Sized>(
    index: &I,
    config: &ScanConfig,
    roots: &[TypeRef],
) -> Vec<SchemaDocument> {
    roots.par_iter().map(|root| synthesize(index, config, root)).collect()
}

// ------------------------------- Tests ------------------------------------ //
