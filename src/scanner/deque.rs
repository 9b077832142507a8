//! Traversal worklist.
//!
//! Path entries live in an arena and point at their enclosing entry by index, so the "path so
//! far" of any entry is a walk up `enclosing` links. The worklist itself is a LIFO stack of entry
//! ids: referenced sub-objects are finished before their siblings.

use crate::index::{ClassInfo, Site};
use crate::schema::SchemaId;
use crate::types::TypeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

#[derive(Debug, Clone)]
pub struct PathEntry<'a> {
    pub enclosing: Option<EntryId>,
    /// Declaration site of the property that led here; `None` for roots.
    pub reference: Option<Site<'a>>,
    pub class: &'a ClassInfo,
    pub ty: TypeRef,
    pub schema: SchemaId,
}

impl PathEntry<'_> {
    /// Same class and, when both sides are parameterized, either the same arguments or arguments
    /// that wrap this entry's own (`Wrap<List<T>>` below `Wrap<T>`). The latter would otherwise
    /// unroll forever.
    fn same_shape(&self, class: &ClassInfo, ty: &TypeRef) -> bool {
        if self.class.name != class.name {
            return false;
        }
        match (&self.ty, ty) {
            (TypeRef::Parameterized { arguments: a, .. }, TypeRef::Parameterized { arguments: b, .. }) => {
                a == b || (a.len() == b.len() && a.iter().zip(b).all(|(a, b)| encloses(b, a)))
            }
            _ => true,
        }
    }
}

/// Whether `needle` occurs anywhere inside `ty`, `ty` itself included.
fn encloses(ty: &TypeRef, needle: &TypeRef) -> bool {
    if ty == needle {
        return true;
    }
    match ty {
        TypeRef::Array(component) => encloses(component, needle),
        TypeRef::Parameterized { arguments, .. } => arguments.iter().any(|argument| encloses(argument, needle)),
        TypeRef::Wildcard { extends, super_bound } => {
            extends.iter().chain(super_bound).any(|bound| encloses(bound, needle))
        }
        _ => false,
    }
}

#[derive(Debug, Default)]
pub struct ObjectDeque<'a> {
    entries: Vec<PathEntry<'a>>,
    pending: Vec<EntryId>,
}

impl<'a> ObjectDeque<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a root entry. It is not scheduled; call [`push`](Self::push) for that.
    pub fn root(&mut self, class: &'a ClassInfo, ty: TypeRef, schema: SchemaId) -> EntryId {
        self.alloc(PathEntry { enclosing: None, reference: None, class, ty, schema })
    }

    pub fn push(&mut self, id: EntryId) {
        self.pending.push(id);
    }

    pub fn pop(&mut self) -> Option<EntryId> {
        self.pending.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn get(&self, id: EntryId) -> &PathEntry<'a> {
        &self.entries[id.0]
    }

    /// `id` itself, then each enclosing entry up to the root.
    pub fn path(&self, id: EntryId) -> impl Iterator<Item = &PathEntry<'a>> {
        std::iter::successors(Some(self.get(id)), |entry| entry.enclosing.map(|parent| self.get(parent)))
    }

    /// The entry on `parent`'s path (inclusive) with the same shape as `(class, ty)`, if any.
    pub fn find_cycle(&self, parent: EntryId, class: &ClassInfo, ty: &TypeRef) -> Option<&PathEntry<'a>> {
        self.path(parent).find(|entry| entry.same_shape(class, ty))
    }

    /// Schedule `(class, ty)` under `parent` unless it would close a cycle. Returns whether it
    /// was scheduled.
    pub fn push_child(
        &mut self,
        parent: EntryId,
        reference: Option<Site<'a>>,
        class: &'a ClassInfo,
        ty: TypeRef,
        schema: SchemaId,
    ) -> bool {
        if self.find_cycle(parent, class, &ty).is_some() {
            return false;
        }
        let id = self.alloc(PathEntry { enclosing: Some(parent), reference, class, ty, schema });
        self.push(id);
        true
    }

    fn alloc(&mut self, entry: PathEntry<'a>) -> EntryId {
        self.entries.push(entry);
        EntryId(self.entries.len() - 1)
    }
}

/// Read-only view of one entry's path, handed to ignore predicates.
#[derive(Debug, Clone, Copy)]
pub struct PathView<'d, 'a> {
    deque: &'d ObjectDeque<'a>,
    entry: EntryId,
}

impl<'d, 'a> PathView<'d, 'a> {
    pub fn new(deque: &'d ObjectDeque<'a>, entry: EntryId) -> Self {
        PathView { deque, entry }
    }

    pub fn entry(&self) -> &'d PathEntry<'a> {
        self.deque.get(self.entry)
    }

    pub fn entries(&self) -> impl Iterator<Item = &'d PathEntry<'a>> {
        self.deque.path(self.entry)
    }

    pub fn depth(&self) -> usize {
        self.entries().count()
    }
}
