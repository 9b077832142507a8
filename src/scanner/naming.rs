//! Property naming: the strategy applied to bean-derived names, and the fixed list of
//! annotation sources that may override a name outright.

use serde::{Deserialize, Serialize};

use crate::annotation::names;
use crate::index::Site;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamingStrategy {
    #[default]
    #[serde(rename = "IDENTITY")]
    Identity,
    #[serde(rename = "LOWER_CASE_WITH_DASHES")]
    LowerCaseWithDashes,
    #[serde(rename = "LOWER_CASE_WITH_UNDERSCORES")]
    LowerCaseWithUnderscores,
    #[serde(rename = "UPPER_CAMEL_CASE")]
    UpperCamelCase,
    #[serde(rename = "UPPER_CAMEL_CASE_WITH_SPACES")]
    UpperCamelCaseWithSpaces,
    /// Only changes how a deserializer matches names; output names are untouched.
    #[serde(rename = "CASE_INSENSITIVE")]
    CaseInsensitive,
}

impl NamingStrategy {
    /// Accepts the config identifiers and the usual per-class strategy names
    /// (`SnakeCaseStrategy`, `PropertyNamingStrategies$KebabCaseStrategy`, ...).
    pub fn from_identifier(value: &str) -> Option<NamingStrategy> {
        let local = crate::types::local_name(value);
        match local {
            "IDENTITY" | "LowerCamelCaseStrategy" => Some(NamingStrategy::Identity),
            "LOWER_CASE_WITH_DASHES" | "KebabCaseStrategy" => Some(NamingStrategy::LowerCaseWithDashes),
            "LOWER_CASE_WITH_UNDERSCORES" | "SnakeCaseStrategy" => Some(NamingStrategy::LowerCaseWithUnderscores),
            "UPPER_CAMEL_CASE" | "UpperCamelCaseStrategy" => Some(NamingStrategy::UpperCamelCase),
            "UPPER_CAMEL_CASE_WITH_SPACES" => Some(NamingStrategy::UpperCamelCaseWithSpaces),
            "CASE_INSENSITIVE" => Some(NamingStrategy::CaseInsensitive),
            _ => None,
        }
    }

    pub fn apply(&self, name: &str) -> String {
        match self {
            NamingStrategy::Identity | NamingStrategy::CaseInsensitive => name.to_string(),
            NamingStrategy::LowerCaseWithDashes => separate(name, '-', true),
            NamingStrategy::LowerCaseWithUnderscores => separate(name, '_', true),
            NamingStrategy::UpperCamelCase => capitalize(name),
            NamingStrategy::UpperCamelCaseWithSpaces => capitalize(&separate(name, ' ', false)),
        }
    }
}

/// Split before every uppercase character: `userId` → `user_id`.
fn separate(name: &str, separator: char, lowercase: bool) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_uppercase() {
            if !out.is_empty() {
                out.push(separator);
            }
            if lowercase {
                out.extend(c.to_lowercase());
            } else {
                out.push(c);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ------------------------------- Sources ---------------------------------- //

/// One way of reading an explicit name off a declaration site.
pub type NameSource = fn(&Site<'_>) -> Option<String>;

/// Fixed precedence: schema override, JSON-B, Jackson, XML element, XML attribute.
pub const NAME_SOURCES: [NameSource; 5] = [
    |site| member(site, names::SCHEMA, "name"),
    |site| member(site, names::JSONB_PROPERTY, "value"),
    |site| member(site, names::JSON_PROPERTY, "value"),
    |site| member(site, names::XML_ELEMENT, "name"),
    |site| member(site, names::XML_ATTRIBUTE, "name"),
];

/// Annotations that make a site preferable for reading metadata, highest first.
pub const SITE_PRIORITY: [&str; 5] =
    [names::SCHEMA, names::JSONB_PROPERTY, names::JSON_PROPERTY, names::XML_ELEMENT, names::XML_ATTRIBUTE];

fn member(site: &Site<'_>, annotation: &str, key: &str) -> Option<String> {
    site.annotation(annotation).and_then(|a| a.string(key)).map(str::to_string)
}

/// Output name of a property: the first explicit name found on `site`, otherwise the
/// bean-derived name run through `strategy`.
pub fn property_name(site: Option<&Site<'_>>, bean_name: &str, strategy: NamingStrategy) -> String {
    site.and_then(|site| NAME_SOURCES.iter().find_map(|source| source(site)))
        .unwrap_or_else(|| strategy.apply(bean_name))
}

/// `getName` → `name`; `isActive` → `active` when `boolean` is set.
pub fn accessor_name(method_name: &str, boolean: bool) -> Option<String> {
    strip_bean_prefix(method_name, "get").or_else(|| boolean.then(|| strip_bean_prefix(method_name, "is")).flatten())
}

/// `setName` → `name`.
pub fn mutator_name(method_name: &str) -> Option<String> {
    strip_bean_prefix(method_name, "set")
}

fn strip_bean_prefix(method_name: &str, prefix: &str) -> Option<String> {
    let rest = method_name.strip_prefix(prefix)?;
    let first = rest.chars().next()?;
    if first.is_lowercase() {
        return None;
    }
    Some(decapitalize(rest))
}

fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Annotation;
    use crate::index::{ClassInfo, FieldInfo};
    use crate::types::TypeRef;

    #[test]
    fn strategies() {
        assert_eq!(NamingStrategy::LowerCaseWithDashes.apply("userAccountId"), "user-account-id");
        assert_eq!(NamingStrategy::LowerCaseWithUnderscores.apply("userAccountId"), "user_account_id");
        assert_eq!(NamingStrategy::UpperCamelCase.apply("userAccountId"), "UserAccountId");
        assert_eq!(NamingStrategy::UpperCamelCaseWithSpaces.apply("userAccountId"), "User Account Id");
        assert_eq!(NamingStrategy::CaseInsensitive.apply("userAccountId"), "userAccountId");
    }

    #[test]
    fn strategy_identifiers() {
        assert_eq!(
            NamingStrategy::from_identifier("com.fasterxml.jackson.databind.PropertyNamingStrategies$SnakeCaseStrategy"),
            Some(NamingStrategy::LowerCaseWithUnderscores)
        );
        assert_eq!(NamingStrategy::from_identifier("UPPER_CAMEL_CASE"), Some(NamingStrategy::UpperCamelCase));
        assert_eq!(NamingStrategy::from_identifier("Nope"), None);
    }

    #[test]
    fn bean_names_follow_conventions() {
        assert_eq!(accessor_name("getName", false).as_deref(), Some("name"));
        assert_eq!(mutator_name("setName").as_deref(), Some("name"));
        assert_eq!(accessor_name("setName", false), None);
        assert_eq!(accessor_name("isActive", true).as_deref(), Some("active"));
        assert_eq!(accessor_name("isActive", false), None);
        assert_eq!(accessor_name("getaway", false), None);
        assert_eq!(accessor_name("get", false), None);
    }

    #[test]
    fn name_sources_are_ranked() {
        let class = ClassInfo::new("com.acme.Person");
        let field = FieldInfo {
            name: "fullName".into(),
            ty: TypeRef::class("java.lang.String"),
            modifiers: Default::default(),
            annotations: vec![
                Annotation::new(names::JSON_PROPERTY).with("value", "jackson_name"),
                Annotation::new(names::JSONB_PROPERTY).with("value", "jsonb_name"),
            ],
        };
        let site = Site::Field { declaring: &class, field: &field };
        assert_eq!(property_name(Some(&site), "fullName", NamingStrategy::Identity), "jsonb_name");
        assert_eq!(property_name(None, "fullName", NamingStrategy::LowerCaseWithDashes), "full-name");
    }
}
