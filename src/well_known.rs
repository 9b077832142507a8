//! Platform types the scanner understands without an index entry: scalar formats, the
//! collection/map families and the bare-name aliases accepted in signatures.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::schema::{SchemaNode, SchemaType};
use crate::types::TypeRef;

pub const OBJECT: &str = "java.lang.Object";
pub const ENUM: &str = "java.lang.Enum";
pub const ITERABLE: &str = "java.lang.Iterable";
pub const COLLECTION: &str = "java.util.Collection";
pub const SET: &str = "java.util.Set";
pub const MAP: &str = "java.util.Map";
pub const OPTIONAL: &str = "java.util.Optional";

const UUID_PATTERN: &str = "[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{12}";

/// Shape of a well-known type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarFormat {
    pub schema_type: SchemaType,
    pub format: Option<&'static str>,
    pub pattern: Option<&'static str>,
    /// Object/array shaped but never traversed (JSON-P containers).
    pub opaque: bool,
}

impl ScalarFormat {
    const fn of(schema_type: SchemaType) -> Self {
        ScalarFormat { schema_type, format: None, pattern: None, opaque: false }
    }

    const fn with_format(schema_type: SchemaType, format: &'static str) -> Self {
        ScalarFormat { schema_type, format: Some(format), pattern: None, opaque: false }
    }

    pub fn is_terminal(&self) -> bool {
        self.opaque || !matches!(self.schema_type, SchemaType::Object | SchemaType::Array)
    }

    /// Fill type, format and pattern on `node` where it has none yet.
    pub fn apply(&self, node: &mut SchemaNode) {
        if node.schema_type.is_none() {
            node.schema_type = Some(self.schema_type);
        }
        if node.format.is_none() {
            node.format = self.format.map(str::to_string);
        }
        if node.pattern.is_none() {
            node.pattern = self.pattern.map(str::to_string);
        }
    }
}

static SCALARS: Lazy<HashMap<&'static str, ScalarFormat>> = Lazy::new(|| {
    use SchemaType::*;
    let string = ScalarFormat::of(String);
    let byte = ScalarFormat::with_format(String, "byte");
    let mut m = HashMap::new();

    for name in ["java.lang.String", "java.lang.StringBuffer", "java.lang.StringBuilder", "java.lang.CharSequence"] {
        m.insert(name, string);
    }
    m.insert("java.net.URI", ScalarFormat::with_format(String, "uri"));
    m.insert("java.util.UUID", ScalarFormat { pattern: Some(UUID_PATTERN), ..ScalarFormat::with_format(String, "uuid") });

    for name in ["byte", "java.lang.Byte", "char", "java.lang.Character"] {
        m.insert(name, byte);
    }
    m.insert("java.io.InputStream", ScalarFormat::with_format(String, "binary"));

    m.insert("java.lang.Number", ScalarFormat::of(Number));
    m.insert("java.math.BigDecimal", ScalarFormat::of(Number));
    for name in ["double", "java.lang.Double"] {
        m.insert(name, ScalarFormat::with_format(Number, "double"));
    }
    for name in ["float", "java.lang.Float"] {
        m.insert(name, ScalarFormat::with_format(Number, "float"));
    }

    m.insert("java.math.BigInteger", ScalarFormat::of(Integer));
    for name in ["int", "java.lang.Integer"] {
        m.insert(name, ScalarFormat::with_format(Integer, "int32"));
    }
    for name in ["long", "java.lang.Long"] {
        m.insert(name, ScalarFormat::with_format(Integer, "int64"));
    }
    for name in ["short", "java.lang.Short"] {
        m.insert(name, ScalarFormat::of(Integer));
    }
    for name in ["boolean", "java.lang.Boolean"] {
        m.insert(name, ScalarFormat::of(Boolean));
    }

    for name in ["java.util.Date", "java.sql.Date", "java.time.LocalDate"] {
        m.insert(name, ScalarFormat::with_format(String, "date"));
    }
    for name in ["java.time.LocalDateTime", "java.time.ZonedDateTime", "java.time.OffsetDateTime", "java.time.Instant"] {
        m.insert(name, ScalarFormat::with_format(String, "date-time"));
    }
    for name in ["java.time.Duration", "java.time.Period"] {
        m.insert(name, ScalarFormat::with_format(String, "duration"));
    }
    m.insert("java.time.LocalTime", ScalarFormat::with_format(String, "local-time"));
    m.insert("java.time.OffsetTime", ScalarFormat::with_format(String, "time"));

    for name in ["jakarta.json.JsonArray", "javax.json.JsonArray"] {
        m.insert(name, ScalarFormat { opaque: true, ..ScalarFormat::of(Array) });
    }
    for name in ["jakarta.json.JsonObject", "javax.json.JsonObject"] {
        m.insert(name, ScalarFormat { opaque: true, ..ScalarFormat::of(Object) });
    }
    for name in ["jakarta.json.JsonNumber", "javax.json.JsonNumber"] {
        m.insert(name, ScalarFormat::of(Number));
    }
    for name in ["jakarta.json.JsonString", "javax.json.JsonString"] {
        m.insert(name, string);
    }
    m
});

const SET_TYPES: [&str; 6] = [
    SET,
    "java.util.HashSet",
    "java.util.LinkedHashSet",
    "java.util.SortedSet",
    "java.util.NavigableSet",
    "java.util.TreeSet",
];

static COLLECTION_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    let mut s: HashSet<&'static str> = [
        COLLECTION,
        "java.util.List",
        "java.util.ArrayList",
        "java.util.LinkedList",
        "java.util.Queue",
        "java.util.Deque",
        "java.util.ArrayDeque",
    ]
    .into_iter()
    .collect();
    s.extend(SET_TYPES);
    s
});

const MAP_TYPES: [&str; 7] = [
    MAP,
    "java.util.HashMap",
    "java.util.LinkedHashMap",
    "java.util.SortedMap",
    "java.util.NavigableMap",
    "java.util.TreeMap",
    "java.util.concurrent.ConcurrentHashMap",
];

/// Packages whose bare class names may be written without qualification in signatures.
const ALIASED_PACKAGES: [&str; 4] = ["java.lang.", "java.util.", "java.math.", "java.time."];

static ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let names = SCALARS
        .keys()
        .copied()
        .chain(COLLECTION_TYPES.iter().copied())
        .chain(MAP_TYPES)
        .chain([OBJECT, ENUM, ITERABLE, OPTIONAL]);
    let mut m = HashMap::new();
    for name in names {
        if name == "java.util.Date" {
            // ambiguous with java.sql.Date
            continue;
        }
        match ALIASED_PACKAGES.iter().find_map(|p| name.strip_prefix(p)) {
            Some(local) if !local.contains('.') => {
                m.insert(local, name);
            }
            _ => {}
        }
    }
    m
});

/// `String` → `java.lang.String`. Only bare names are aliased.
pub fn canonical_name(name: &str) -> Option<&'static str> {
    if name.contains('.') {
        return None;
    }
    ALIASES.get(name).copied()
}

pub fn scalar_format(ty: &TypeRef) -> Option<ScalarFormat> {
    match ty {
        TypeRef::Primitive(name) | TypeRef::Class(name) | TypeRef::Parameterized { name, .. } => {
            SCALARS.get(name.as_str()).copied()
        }
        TypeRef::Array(component) if matches!(&**component, TypeRef::Primitive(p) if p == "byte") => {
            Some(ScalarFormat::with_format(SchemaType::String, "binary"))
        }
        _ => None,
    }
}

/// Primitive-like: its schema never needs traversal.
pub fn is_terminal(ty: &TypeRef) -> bool {
    match ty {
        TypeRef::Primitive(_) => true,
        TypeRef::Variable { .. } | TypeRef::Wildcard { .. } => false,
        _ => scalar_format(ty).is_some_and(|f| f.is_terminal()),
    }
}

/// Platform classes are never scanned for properties.
pub fn is_platform(name: &str) -> bool {
    name.starts_with("java.") || name.starts_with("javax.") || name.starts_with("jakarta.")
}

pub fn is_optional(ty: &TypeRef) -> bool {
    matches!(ty, TypeRef::Class(_) | TypeRef::Parameterized { .. }) && ty.name() == OPTIONAL
}

/// Assignability among the built-in families, without consulting an index.
pub fn builtin_assignable(name: &str, target: &str) -> bool {
    if name == target || target == OBJECT {
        return true;
    }
    match target {
        COLLECTION | ITERABLE => COLLECTION_TYPES.contains(name),
        SET => SET_TYPES.contains(&name),
        MAP => MAP_TYPES.contains(&name),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_carry_openapi_formats() {
        let long = scalar_format(&TypeRef::class("java.lang.Long")).unwrap();
        assert_eq!((long.schema_type, long.format), (SchemaType::Integer, Some("int64")));
        let uuid = scalar_format(&TypeRef::class("java.util.UUID")).unwrap();
        assert_eq!(uuid.pattern, Some(UUID_PATTERN));
        let bytes: TypeRef = "byte[]".parse().unwrap();
        assert_eq!(scalar_format(&bytes).unwrap().format, Some("binary"));
    }

    #[test]
    fn opaque_containers_are_terminal_but_object_is_not() {
        assert!(is_terminal(&TypeRef::class("jakarta.json.JsonObject")));
        assert!(!is_terminal(&TypeRef::object()));
        assert!(!is_terminal(&TypeRef::class("com.acme.Widget")));
        assert!(is_terminal(&TypeRef::Primitive("int".into())));
    }

    #[test]
    fn aliases_cover_lang_and_collections_only_for_bare_names() {
        assert_eq!(canonical_name("String"), Some("java.lang.String"));
        assert_eq!(canonical_name("List"), Some("java.util.List"));
        assert_eq!(canonical_name("Date"), None);
        assert_eq!(canonical_name("com.acme.String"), None);
    }

    #[test]
    fn families() {
        assert!(builtin_assignable("java.util.TreeSet", SET));
        assert!(builtin_assignable("java.util.TreeSet", COLLECTION));
        assert!(builtin_assignable("java.util.HashMap", MAP));
        assert!(!builtin_assignable("java.util.HashMap", COLLECTION));
    }
}
