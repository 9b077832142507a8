//! Generic type-variable substitution.
//!
//! Every parameterized level of an inheritance chain contributes one [`SubstitutionFrame`]
//! (declared variables → arguments as written by the subtype). Frames are pushed while walking
//! from the most-derived class upwards, so the frame pushed last belongs to the most ancestral
//! level seen so far and is the innermost one for properties declared there.

use indexmap::IndexMap;

use crate::types::TypeRef;

pub type SubstitutionFrame = IndexMap<String, TypeRef>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubstitutionStack {
    frames: Vec<SubstitutionFrame>,
}

impl SubstitutionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: SubstitutionFrame) {
        self.frames.push(frame);
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Resolve every variable in `ty` as far as the stack allows.
    ///
    /// A variable is looked up innermost first and the first frame containing it wins. Its
    /// substitute is then resolved against the frames outside the one that matched, which
    /// follows chains like `T → X → String` across levels. Unmatched variables stay abstract.
    /// A top-level wildcard resolves to its upper bound.
    pub fn resolve(&self, ty: &TypeRef) -> TypeRef {
        self.resolve_within(&ty.upper_bound(), self.frames.len()).upper_bound()
    }

    fn resolve_within(&self, ty: &TypeRef, depth: usize) -> TypeRef {
        match ty {
            TypeRef::Variable { identifier, .. } => {
                for i in (0..depth).rev() {
                    if let Some(substitute) = self.frames[i].get(identifier) {
                        return self.resolve_within(substitute, i);
                    }
                }
                ty.clone()
            }
            TypeRef::Parameterized { name, arguments } => TypeRef::Parameterized {
                name: name.clone(),
                arguments: arguments.iter().map(|a| self.resolve_within(a, depth)).collect(),
            },
            TypeRef::Array(component) => TypeRef::Array(Box::new(self.resolve_within(component, depth))),
            TypeRef::Wildcard { extends, super_bound } => TypeRef::Wildcard {
                extends: extends.as_ref().map(|b| Box::new(self.resolve_within(b, depth))),
                super_bound: super_bound.as_ref().map(|b| Box::new(self.resolve_within(b, depth))),
            },
            TypeRef::Primitive(_) | TypeRef::Class(_) => ty.clone(),
        }
    }
}

/// Frame binding `variables` (declared on a class) to `arguments` (as supplied by a subtype).
///
/// On a count mismatch only the positional overlap is bound.
pub fn build_frame(class_name: &str, variables: &[TypeRef], arguments: &[TypeRef]) -> SubstitutionFrame {
    if variables.len() != arguments.len() {
        tracing::error!(
            class = class_name,
            declared = variables.len(),
            supplied = arguments.len(),
            "type argument count does not match declared type variables"
        );
    }
    variables
        .iter()
        .zip(arguments)
        .filter_map(|(var, arg)| match var {
            TypeRef::Variable { identifier, .. } => Some((identifier.clone(), arg.clone())),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(pairs: &[(&str, TypeRef)]) -> SubstitutionFrame {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn innermost_frame_wins_for_shadowed_variable() {
        // Level3 extends Level2<Integer>; Level2<T> extends Level1<String>; Level1<T> { T value; }
        let mut stack = SubstitutionStack::new();
        stack.push(frame(&[("T", TypeRef::class("java.lang.Integer"))]));
        stack.push(frame(&[("T", TypeRef::class("java.lang.String"))]));
        assert_eq!(stack.resolve(&TypeRef::variable("T")), TypeRef::class("java.lang.String"));
    }

    #[test]
    fn chained_variables_resolve_through_outer_frames() {
        // Child<X> extends Base<List<X>>, used as Child<String>
        let mut stack = SubstitutionStack::new();
        stack.push(frame(&[("X", TypeRef::class("java.lang.String"))]));
        stack.push(frame(&[(
            "T",
            TypeRef::parameterized("java.util.List", vec![TypeRef::variable("X")]),
        )]));
        assert_eq!(
            stack.resolve(&TypeRef::variable("T")),
            TypeRef::parameterized("java.util.List", vec![TypeRef::class("java.lang.String")])
        );
    }

    #[test]
    fn unknown_variables_stay_abstract_and_wildcards_take_their_bound() {
        let stack = SubstitutionStack::new();
        assert_eq!(stack.resolve(&TypeRef::variable("Q")), TypeRef::variable("Q"));
        let wildcard: TypeRef = "? super Integer".parse().unwrap();
        assert!(stack.resolve(&wildcard).is_object());
    }

    #[test]
    fn count_mismatch_binds_positional_overlap() {
        let vars = vec![TypeRef::variable("K"), TypeRef::variable("V")];
        let frame = build_frame("com.acme.Table", &vars, &[TypeRef::class("java.lang.String")]);
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.get("K"), Some(&TypeRef::class("java.lang.String")));
    }
}
