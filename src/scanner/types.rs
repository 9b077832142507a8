//! Type dispatch: decides the shape of the node describing one declared type and schedules the
//! types that need their own traversal.

use super::Scanner;
use super::deque::EntryId;
use super::enums;
use crate::index::{Site, TypeIndex};
use crate::schema::{SchemaArena, SchemaId, SchemaNode, SchemaType};
use crate::substitution::SubstitutionStack;
use crate::types::{TypeKind, TypeRef};
use crate::well_known;

/// Where a type is being described: the entry owning the property, the property's declaration
/// site and the substitutions in effect for it.
pub(crate) struct PropertyContext<'p, 'a> {
    pub entry: EntryId,
    pub site: Option<Site<'a>>,
    pub stack: &'p SubstitutionStack,
}

impl<'a, I: TypeIndex + ?Sized> Scanner<'a, I> {
    /// Shape `node` after `ty`. Returns the type the node ended up describing, after wildcards,
    /// variables and `Optional` were looked through.
    pub(super) fn process_type(&mut self, ctx: &PropertyContext<'_, 'a>, ty: &TypeRef, node: SchemaId) -> TypeRef {
        let mut ty = ty.clone();
        loop {
            if well_known::is_terminal(&ty) {
                if let Some(format) = well_known::scalar_format(&ty) {
                    format.apply(self.arena.get_mut(node));
                }
                return ty;
            }
            match ty.kind() {
                TypeKind::Wildcard => ty = ty.upper_bound(),
                TypeKind::Variable => match ctx.stack.resolve(&ty) {
                    TypeRef::Variable { bound, .. } => {
                        self.unresolved_variable(bound.as_deref(), node);
                        return ty;
                    }
                    resolved => ty = resolved,
                },
                TypeKind::Array => {
                    self.process_array(ctx, &ty, node);
                    return ty;
                }
                _ if well_known::is_optional(&ty) => {
                    ty = ty.arguments().first().cloned().unwrap_or_else(TypeRef::object);
                }
                _ => break,
            }
        }

        let index = self.index;
        if index.is_assignable_to(&ty, well_known::ENUM) {
            if let Some(class) = index.get_type(&ty) {
                let mut schema = enums::enum_schema(class);
                schema.overlay(self.arena.get(node));
                *self.arena.get_mut(node) = schema;
            }
            return TypeRef::class("java.lang.String");
        }
        if let TypeRef::Parameterized { .. } = &ty {
            self.process_parameterized(ctx, &ty, node);
            return ty;
        }
        if self.is_collection(&ty) {
            let n = self.arena.get_mut(node);
            n.schema_type.get_or_insert(SchemaType::Array);
            n.items = Some(Box::default());
            if index.is_assignable_to(&ty, well_known::SET) {
                n.unique_items = Some(true);
            }
            return ty;
        }
        if ty.is_object() || index.is_assignable_to(&ty, well_known::MAP) {
            self.arena.get_mut(node).schema_type.get_or_insert(SchemaType::Object);
            return ty;
        }
        self.push_type(ctx, &ty, node);
        ty
    }

    fn process_array(&mut self, ctx: &PropertyContext<'_, 'a>, ty: &TypeRef, node: SchemaId) {
        let TypeRef::Array(component) = ty else {
            return;
        };
        let items = self.process_argument(ctx, component);
        let n = self.arena.get_mut(node);
        n.schema_type.get_or_insert(SchemaType::Array);
        n.items = Some(Box::new(items));
    }

    fn process_parameterized(&mut self, ctx: &PropertyContext<'_, 'a>, ty: &TypeRef, node: SchemaId) {
        let index = self.index;
        let argument = |i: usize| ty.arguments().get(i).cloned().unwrap_or_else(TypeRef::object);
        if self.is_collection(ty) {
            let items = self.process_argument(ctx, &argument(0));
            let n = self.arena.get_mut(node);
            n.schema_type.get_or_insert(SchemaType::Array);
            n.items = Some(Box::new(items));
            if index.is_assignable_to(ty, well_known::SET) {
                n.unique_items = Some(true);
            }
        } else if index.is_assignable_to(ty, well_known::MAP) {
            let values = self.process_argument(ctx, &argument(1));
            let n = self.arena.get_mut(node);
            n.schema_type.get_or_insert(SchemaType::Object);
            n.additional_properties = Some(Box::new(values));
        } else {
            self.push_type(ctx, ty, node);
        }
    }

    /// Describe a collection item, map value or array component in a node of its own and return
    /// what the container should embed: a `$ref` when the type registers, else a link.
    fn process_argument(&mut self, ctx: &PropertyContext<'_, 'a>, ty: &TypeRef) -> SchemaNode {
        let node = self.arena.alloc(SchemaNode::default());
        self.process_type(ctx, ty, node);
        let index = self.index;
        let shape = self.arena.get(node).schema_type;
        self.registry
            .check_registration(index, ty, ctx.stack, node, shape)
            .unwrap_or_else(|| SchemaArena::link(node))
    }

    /// Schedule a class-like type for traversal into `node`, or mark `node` as a cyclic stub
    /// when the type is already on the current path.
    fn push_type(&mut self, ctx: &PropertyContext<'_, 'a>, ty: &TypeRef, node: SchemaId) {
        let resolved = ctx.stack.resolve(ty);
        let index = self.index;
        let Some(class) = index.get_type(&resolved) else {
            tracing::warn!(ty = %resolved, "type not found in index");
            self.arena.get_mut(node).schema_type.get_or_insert(SchemaType::Object);
            return;
        };
        if self.deque.push_child(ctx.entry, ctx.site, class, resolved.clone(), node) {
            return;
        }
        tracing::debug!(ty = %resolved, "cyclic reference");
        let n = self.arena.get_mut(node);
        n.schema_type.get_or_insert(SchemaType::Object);
        n.description.get_or_insert_with(|| format!("Cyclic reference to {}", class.name));
    }

    /// A variable no frame binds: a terminal bound lends its scalar shape, anything else is an
    /// unconstrained object.
    fn unresolved_variable(&mut self, bound: Option<&TypeRef>, node: SchemaId) {
        let n = self.arena.get_mut(node);
        match bound.and_then(well_known::scalar_format) {
            Some(format) if format.is_terminal() => format.apply(n),
            _ => {
                n.schema_type.get_or_insert(SchemaType::Object);
            }
        }
    }

    pub(super) fn is_collection(&self, ty: &TypeRef) -> bool {
        self.index.is_assignable_to(ty, well_known::COLLECTION) || self.index.is_assignable_to(ty, well_known::ITERABLE)
    }

    /// Arrays, `Optional` and the collection and map families.
    pub(super) fn is_container(&self, ty: &TypeRef) -> bool {
        matches!(ty, TypeRef::Array(_))
            || well_known::is_optional(ty)
            || self.is_collection(ty)
            || self.index.is_assignable_to(ty, well_known::MAP)
    }

    /// A class-like type the index knows nothing about.
    pub(super) fn is_unindexed(&self, ty: &TypeRef) -> bool {
        matches!(ty.kind(), TypeKind::Class | TypeKind::Parameterized)
            && !ty.is_object()
            && !well_known::is_terminal(ty)
            && !self.index.contains(ty)
            && !self.is_container(ty)
    }
}
