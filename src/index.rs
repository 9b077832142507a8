//! Type Metadata Provider.
//!
//! The scanner only talks to [`TypeIndex`]. [`ClassIndex`] is the in-memory implementation,
//! loaded from JSON class descriptions:
//!
//! ```json
//! { "classes": [
//!   { "name": "com.acme.Pair", "type_parameters": ["A", "B"],
//!     "fields": [ { "name": "left", "type": "A" }, { "name": "right", "type": "B" } ] }
//! ] }
//! ```
//!
//! Bare names matching a declared type parameter are bound as type variables on load.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::annotation::{Annotated, Annotation};
use crate::error::SchemaResult;
use crate::path_de;
use crate::types::TypeRef;
use crate::well_known;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
    Enum,
    Record,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Modifiers {
    pub public: bool,
    pub protected: bool,
    pub private: bool,
    pub is_static: bool,
    pub transient: bool,
    pub synthetic: bool,
}

impl From<Vec<String>> for Modifiers {
    fn from(words: Vec<String>) -> Self {
        let mut m = Modifiers::default();
        for word in &words {
            match word.as_str() {
                "public" => m.public = true,
                "protected" => m.protected = true,
                "private" => m.private = true,
                "static" => m.is_static = true,
                "transient" => m.transient = true,
                "synthetic" => m.synthetic = true,
                _ => {} // final, abstract, ... carry no schema meaning
            }
        }
        m
    }
}

impl From<Modifiers> for Vec<String> {
    fn from(m: Modifiers) -> Self {
        [
            (m.public, "public"),
            (m.protected, "protected"),
            (m.private, "private"),
            (m.is_static, "static"),
            (m.transient, "transient"),
            (m.synthetic, "synthetic"),
        ]
        .into_iter()
        .filter(|(on, _)| *on)
        .map(|(_, word)| word.to_string())
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    /// `None` (or `void`) for methods returning nothing.
    #[serde(default)]
    pub return_type: Option<TypeRef>,
    #[serde(default)]
    pub parameters: Vec<TypeRef>,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl MethodInfo {
    pub fn returns_value(&self) -> bool {
        match &self.return_type {
            None => false,
            Some(TypeRef::Primitive(p)) => p != "void",
            Some(_) => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassInfo {
    pub name: String,
    pub kind: ClassKind,
    /// Declarations as written: `T`, `N extends Number`.
    pub type_parameters: Vec<String>,
    pub super_class: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub annotations: Vec<Annotation>,

    #[serde(skip)]
    variables: Vec<TypeRef>,
}

impl ClassInfo {
    pub fn new(name: &str) -> Self {
        ClassInfo { name: name.to_string(), ..ClassInfo::default() }
    }

    /// Declared type parameters as [`TypeRef::Variable`]s, in declaration order.
    pub fn type_variables(&self) -> &[TypeRef] {
        &self.variables
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    /// Parse the type-parameter declarations and rebind every member signature against them.
    fn bind(&mut self) -> SchemaResult<()> {
        self.variables = self
            .type_parameters
            .iter()
            .map(|p| TypeRef::parse_type_parameter(p))
            .collect::<SchemaResult<_>>()?;
        let vars = &self.variables;
        if vars.is_empty() {
            return Ok(());
        }
        if let Some(sup) = &mut self.super_class {
            *sup = sup.bind_variables(vars);
        }
        for iface in &mut self.interfaces {
            *iface = iface.bind_variables(vars);
        }
        for field in &mut self.fields {
            field.ty = field.ty.bind_variables(vars);
        }
        for method in &mut self.methods {
            if let Some(ret) = &mut method.return_type {
                *ret = ret.bind_variables(vars);
            }
            for param in &mut method.parameters {
                *param = param.bind_variables(vars);
            }
        }
        Ok(())
    }
}

impl Annotated for ClassInfo {
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

impl Annotated for FieldInfo {
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

impl Annotated for MethodInfo {
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

// ------------------------------- Provider --------------------------------- //

/// Read-only view of declared types. Implementations must be fully built before a scan starts.
pub trait TypeIndex {
    fn class_by_name(&self, name: &str) -> Option<&ClassInfo>;

    fn get_type(&self, ty: &TypeRef) -> Option<&ClassInfo> {
        match ty {
            TypeRef::Class(name) | TypeRef::Parameterized { name, .. } => self.class_by_name(name),
            _ => None,
        }
    }

    fn contains(&self, ty: &TypeRef) -> bool {
        self.get_type(ty).is_some()
    }

    /// Whether `ty` is `target` or reaches it through superclasses/interfaces, either declared in
    /// the index or known as a platform family (`java.util.ArrayList` → `java.util.Collection`).
    fn is_assignable_to(&self, ty: &TypeRef, target: &str) -> bool {
        match ty {
            TypeRef::Class(name) | TypeRef::Parameterized { name, .. } => {
                assignable(self, name, target, &mut Vec::new())
            }
            _ => false,
        }
    }

    fn annotation<'s>(&self, target: &'s dyn Annotated, name: &str) -> Option<&'s Annotation> {
        target.annotation(name)
    }
}

fn assignable<I: TypeIndex + ?Sized>(index: &I, name: &str, target: &str, seen: &mut Vec<String>) -> bool {
    if well_known::builtin_assignable(name, target) {
        return true;
    }
    if seen.iter().any(|s| s == name) {
        return false;
    }
    seen.push(name.to_string());
    let Some(class) = index.class_by_name(name) else {
        return false;
    };
    if target == well_known::ENUM && class.kind == ClassKind::Enum {
        return true;
    }
    class
        .super_class
        .iter()
        .chain(class.interfaces.iter())
        .any(|sup| assignable(index, sup.name(), target, seen))
}

#[derive(Debug, Deserialize)]
struct IndexFile {
    classes: Vec<ClassInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct ClassIndex {
    classes: IndexMap<String, ClassInfo>,
}

impl ClassIndex {
    pub fn new(classes: impl IntoIterator<Item = ClassInfo>) -> SchemaResult<Self> {
        let mut index = ClassIndex::default();
        for mut class in classes {
            class.bind()?;
            index.classes.insert(class.name.clone(), class);
        }
        Ok(index)
    }

    pub fn from_json_str(src: &str) -> SchemaResult<Self> {
        let file: IndexFile = path_de::from_str_with_path(src)?;
        Self::new(file.classes)
    }

    pub fn from_json_slice(bytes: &[u8]) -> SchemaResult<Self> {
        let file: IndexFile = path_de::from_slice_with_path(bytes)?;
        Self::new(file.classes)
    }

    /// Later definitions of the same class replace earlier ones.
    pub fn extend(&mut self, other: ClassIndex) {
        self.classes.extend(other.classes);
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl TypeIndex for ClassIndex {
    fn class_by_name(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }
}

// ------------------------------- Sites ------------------------------------ //

/// A declaration site of a property: one field or one method, with its declaring class.
#[derive(Debug, Clone, Copy)]
pub enum Site<'a> {
    Field { declaring: &'a ClassInfo, field: &'a FieldInfo },
    Method { declaring: &'a ClassInfo, method: &'a MethodInfo },
}

impl<'a> Site<'a> {
    pub fn declaring_class(&self) -> &'a ClassInfo {
        match self {
            Site::Field { declaring, .. } | Site::Method { declaring, .. } => declaring,
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            Site::Field { field, .. } => &field.name,
            Site::Method { method, .. } => &method.name,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match self {
            Site::Field { field, .. } => field.modifiers,
            Site::Method { method, .. } => method.modifiers,
        }
    }

    pub fn is_field(&self) -> bool {
        matches!(self, Site::Field { .. })
    }

    pub fn annotations(&self) -> &'a [Annotation] {
        match self {
            Site::Field { field, .. } => &field.annotations,
            Site::Method { method, .. } => &method.annotations,
        }
    }

    pub fn annotation(&self, name: &str) -> Option<&'a Annotation> {
        self.annotations().iter().find(|a| a.is(name))
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotation(name).is_some()
    }

    /// Field type, accessor return type or mutator parameter type.
    pub fn declared_type(&self) -> Option<&'a TypeRef> {
        match self {
            Site::Field { field, .. } => Some(&field.ty),
            Site::Method { method, .. } if method.returns_value() => method.return_type.as_ref(),
            Site::Method { method, .. } => method.parameters.first(),
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
