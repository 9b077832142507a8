//! Declared type references.
//!
//! A [`TypeRef`] is immutable input: it comes from the class index and is only ever cloned or
//! rebuilt by substitution. Positions in the index JSON are written as Java-like signatures
//! (`Map<String, List<? extends Item>>`, `T[]`), parsed here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};
use crate::well_known;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Primitive(String),
    Class(String),
    Array(Box<TypeRef>),
    Parameterized { name: String, arguments: Vec<TypeRef> },
    Variable { identifier: String, bound: Option<Box<TypeRef>> },
    Wildcard { extends: Option<Box<TypeRef>>, super_bound: Option<Box<TypeRef>> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Primitive,
    Class,
    Array,
    Parameterized,
    Variable,
    Wildcard,
}

const PRIMITIVES: [&str; 9] = ["boolean", "byte", "char", "short", "int", "long", "float", "double", "void"];

impl TypeRef {
    pub fn class(name: &str) -> Self {
        TypeRef::Class(name.to_string())
    }

    pub fn object() -> Self {
        TypeRef::Class(well_known::OBJECT.to_string())
    }

    pub fn parameterized(name: &str, arguments: Vec<TypeRef>) -> Self {
        TypeRef::Parameterized { name: name.to_string(), arguments }
    }

    pub fn variable(identifier: &str) -> Self {
        TypeRef::Variable { identifier: identifier.to_string(), bound: None }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            TypeRef::Primitive(_) => TypeKind::Primitive,
            TypeRef::Class(_) => TypeKind::Class,
            TypeRef::Array(_) => TypeKind::Array,
            TypeRef::Parameterized { .. } => TypeKind::Parameterized,
            TypeRef::Variable { .. } => TypeKind::Variable,
            TypeRef::Wildcard { .. } => TypeKind::Wildcard,
        }
    }

    /// Declared name. Arrays report their component's name, wildcards `?`.
    pub fn name(&self) -> &str {
        match self {
            TypeRef::Primitive(name) | TypeRef::Class(name) => name,
            TypeRef::Parameterized { name, .. } => name,
            TypeRef::Variable { identifier, .. } => identifier,
            TypeRef::Array(component) => component.name(),
            TypeRef::Wildcard { .. } => "?",
        }
    }

    /// Unqualified name: `com.acme.Outer$Inner` → `Inner`.
    pub fn local_name(&self) -> &str {
        local_name(self.name())
    }

    pub fn arguments(&self) -> &[TypeRef] {
        match self {
            TypeRef::Parameterized { arguments, .. } => arguments,
            _ => &[],
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, TypeRef::Class(name) if name == well_known::OBJECT)
    }

    /// `? extends X` → `X`; `?` and `? super X` → `Object`. Anything else is returned as is.
    pub fn upper_bound(&self) -> TypeRef {
        match self {
            TypeRef::Wildcard { extends: Some(bound), .. } => (**bound).clone(),
            TypeRef::Wildcard { .. } => TypeRef::object(),
            other => other.clone(),
        }
    }

    /// Rewrite bare class names matching one of `params` (declared type variables) into those
    /// variables.
    pub fn bind_variables(&self, params: &[TypeRef]) -> TypeRef {
        if params.is_empty() {
            return self.clone();
        }
        match self {
            TypeRef::Class(name) => params
                .iter()
                .find(|p| matches!(p, TypeRef::Variable { identifier, .. } if identifier == name))
                .cloned()
                .unwrap_or_else(|| self.clone()),
            TypeRef::Array(component) => TypeRef::Array(Box::new(component.bind_variables(params))),
            TypeRef::Parameterized { name, arguments } => TypeRef::Parameterized {
                name: name.clone(),
                arguments: arguments.iter().map(|a| a.bind_variables(params)).collect(),
            },
            TypeRef::Wildcard { extends, super_bound } => TypeRef::Wildcard {
                extends: extends.as_ref().map(|b| Box::new(b.bind_variables(params))),
                super_bound: super_bound.as_ref().map(|b| Box::new(b.bind_variables(params))),
            },
            TypeRef::Primitive(_) | TypeRef::Variable { .. } => self.clone(),
        }
    }

    /// Parse a type-parameter declaration: `T` or `T extends Number`.
    pub fn parse_type_parameter(src: &str) -> SchemaResult<TypeRef> {
        let mut parser = SignatureParser::new(src);
        parser.skip_ws();
        let identifier = parser.name()?;
        parser.skip_ws();
        let bound = if parser.keyword("extends") {
            Some(Box::new(parser.ty()?))
        } else {
            None
        };
        parser.finish()?;
        Ok(TypeRef::Variable { identifier, bound })
    }
}

pub fn local_name(name: &str) -> &str {
    let start = name.rfind(['.', '$']).map(|i| i + 1).unwrap_or(0);
    &name[start..]
}

// ------------------------------- Display ---------------------------------- //

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Primitive(name) | TypeRef::Class(name) => f.write_str(name),
            TypeRef::Array(component) => write!(f, "{component}[]"),
            TypeRef::Parameterized { name, arguments } => {
                write!(f, "{name}<")?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
            TypeRef::Variable { identifier, .. } => f.write_str(identifier),
            TypeRef::Wildcard { extends: Some(bound), .. } => write!(f, "? extends {bound}"),
            TypeRef::Wildcard { super_bound: Some(bound), .. } => write!(f, "? super {bound}"),
            TypeRef::Wildcard { .. } => f.write_str("?"),
        }
    }
}

impl From<TypeRef> for String {
    fn from(ty: TypeRef) -> String {
        ty.to_string()
    }
}

impl TryFrom<String> for TypeRef {
    type Error = SchemaError;
    fn try_from(src: String) -> SchemaResult<TypeRef> {
        src.parse()
    }
}

// ------------------------------- Parsing ---------------------------------- //

impl FromStr for TypeRef {
    type Err = SchemaError;

    fn from_str(src: &str) -> SchemaResult<TypeRef> {
        let mut parser = SignatureParser::new(src);
        let ty = parser.ty()?;
        parser.finish()?;
        Ok(ty)
    }
}

struct SignatureParser<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> SignatureParser<'s> {
    fn new(src: &'s str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn error(&self, reason: &str) -> SchemaError {
        SchemaError::signature(self.src, format!("{reason} at offset {}", self.pos))
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    /// Consume `word` only when it stands alone (`extends Foo`, not `extendsFoo`).
    fn keyword(&mut self, word: &str) -> bool {
        self.skip_ws();
        let rest = self.rest();
        let Some(after) = rest.strip_prefix(word) else {
            return false;
        };
        if after.chars().next().is_none_or(|c| !is_ident_char(c)) {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn name(&mut self) -> SchemaResult<String> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest.find(|c: char| !(is_ident_char(c) || c == '.')).unwrap_or(rest.len());
        let name = &rest[..len];
        if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit() || c == '.') || name.ends_with('.') {
            return Err(self.error("expected a type name"));
        }
        self.pos += len;
        Ok(name.to_string())
    }

    fn ty(&mut self) -> SchemaResult<TypeRef> {
        if self.eat("?") {
            if self.keyword("extends") {
                return Ok(TypeRef::Wildcard { extends: Some(Box::new(self.ty()?)), super_bound: None });
            }
            if self.keyword("super") {
                return Ok(TypeRef::Wildcard { extends: None, super_bound: Some(Box::new(self.ty()?)) });
            }
            return Ok(TypeRef::Wildcard { extends: None, super_bound: None });
        }

        let name = self.name()?;
        let mut ty = if self.eat("<") {
            let mut arguments = vec![self.ty()?];
            loop {
                if self.eat(",") {
                    arguments.push(self.ty()?);
                } else if self.eat(">") {
                    break;
                } else {
                    return Err(self.error("expected `,` or `>`"));
                }
            }
            TypeRef::Parameterized { name: canonical(name), arguments }
        } else if PRIMITIVES.contains(&name.as_str()) {
            TypeRef::Primitive(name)
        } else {
            TypeRef::Class(canonical(name))
        };

        while self.eat("[]") {
            ty = TypeRef::Array(Box::new(ty));
        }
        Ok(ty)
    }

    fn finish(&mut self) -> SchemaResult<()> {
        self.skip_ws();
        if self.pos == self.src.len() {
            Ok(())
        } else {
            Err(self.error("unexpected trailing input"))
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn canonical(name: String) -> String {
    match well_known::canonical_name(&name) {
        Some(full) => full.to_string(),
        None => name,
    }
}

// ------------------------------- Tests ------------------------------------ //
