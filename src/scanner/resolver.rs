//! Property enumeration for one class: walks the inheritance chain from the class itself up to
//! the first platform or unknown ancestor, pairs fields with their accessors and mutators, decides
//! visibility and orders the result.

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::annotation::{Annotated, names};
use crate::config::ScanConfig;
use crate::index::{ClassInfo, ClassKind, FieldInfo, MethodInfo, Site, TypeIndex};
use crate::scanner::deque::PathView;
use crate::scanner::ignore::{self, IgnoreChain};
use crate::scanner::naming::{self, NamingStrategy, SITE_PRIORITY};
use crate::substitution::{SubstitutionStack, build_frame};
use crate::types::TypeRef;
use crate::well_known;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SiteSlot {
    Field,
    Accessor,
    Mutator,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Visibility {
    pub exposed: bool,
    pub ignored: bool,
    pub read_only: bool,
    pub write_only: bool,
}

/// One logical property: up to three declaration sites sharing a bean name, plus the
/// substitution stack in effect where it was first found.
#[derive(Debug, Clone)]
pub struct Property<'a> {
    bean_name: String,
    name: String,
    field: Option<Site<'a>>,
    accessor: Option<Site<'a>>,
    mutator: Option<Site<'a>>,
    leaf: TypeRef,
    stack: SubstitutionStack,
    level: usize,
    naming: NamingStrategy,
    visibility: Visibility,
}

impl<'a> Property<'a> {
    fn new(
        bean_name: String,
        slot: SiteSlot,
        site: Site<'a>,
        leaf: TypeRef,
        stack: SubstitutionStack,
        level: usize,
        naming: NamingStrategy,
    ) -> Self {
        let mut property = Property {
            name: bean_name.clone(),
            bean_name,
            field: None,
            accessor: None,
            mutator: None,
            leaf,
            stack,
            level,
            naming,
            visibility: Visibility::default(),
        };
        *property.slot_mut(slot) = Some(site);
        property
    }

    fn slot_mut(&mut self, slot: SiteSlot) -> &mut Option<Site<'a>> {
        match slot {
            SiteSlot::Field => &mut self.field,
            SiteSlot::Accessor => &mut self.accessor,
            SiteSlot::Mutator => &mut self.mutator,
        }
    }

    /// Name derived from the field or method name, before any override or strategy.
    pub fn bean_name(&self) -> &str {
        &self.bean_name
    }

    /// Output name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self) -> Option<&Site<'a>> {
        self.field.as_ref()
    }

    pub fn accessor(&self) -> Option<&Site<'a>> {
        self.accessor.as_ref()
    }

    pub fn mutator(&self) -> Option<&Site<'a>> {
        self.mutator.as_ref()
    }

    /// Declared type as written at the site that created the property.
    pub fn leaf(&self) -> &TypeRef {
        &self.leaf
    }

    pub fn stack(&self) -> &SubstitutionStack {
        &self.stack
    }

    pub fn resolved_type(&self) -> TypeRef {
        self.stack.resolve(&self.leaf)
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_ignored(&self) -> bool {
        self.visibility.ignored || (self.visibility.read_only && self.visibility.write_only)
    }

    pub fn is_read_only(&self) -> bool {
        self.visibility.read_only
    }

    pub fn is_write_only(&self) -> bool {
        self.visibility.write_only
    }

    /// Present sites in field, accessor, mutator order.
    pub fn sites(&self) -> impl Iterator<Item = (SiteSlot, &Site<'a>)> {
        [
            (SiteSlot::Field, self.field.as_ref()),
            (SiteSlot::Accessor, self.accessor.as_ref()),
            (SiteSlot::Mutator, self.mutator.as_ref()),
        ]
        .into_iter()
        .filter_map(|(slot, site)| site.map(|s| (slot, s)))
    }

    /// The site metadata is read from: the one carrying the highest-priority annotation, field
    /// before accessor before mutator on ties.
    pub fn best_site(&self) -> Option<&Site<'a>> {
        self.sites().min_by_key(|(slot, site)| (site_rank(site), *slot)).map(|(_, site)| site)
    }
}

fn site_rank(site: &Site<'_>) -> usize {
    SITE_PRIORITY
        .iter()
        .position(|name| site.has_annotation(name))
        .unwrap_or(SITE_PRIORITY.len())
}

// ------------------------------- Resolver --------------------------------- //

pub struct PropertyResolver<'s, 'a, I: TypeIndex + ?Sized> {
    index: &'a I,
    config: &'s ScanConfig,
    ignore: &'s IgnoreChain,
    path: PathView<'s, 'a>,
}

type Chain<'a> = Vec<(&'a ClassInfo, TypeRef)>;

impl<'s, 'a, I: TypeIndex + ?Sized> PropertyResolver<'s, 'a, I> {
    pub fn new(index: &'a I, config: &'s ScanConfig, ignore: &'s IgnoreChain, path: PathView<'s, 'a>) -> Self {
        PropertyResolver { index, config, ignore, path }
    }

    /// Ordered properties of `class`, used as `ty`. Ignored properties are included and flagged.
    pub fn resolve(&self, class: &'a ClassInfo, ty: &TypeRef) -> Vec<Property<'a>> {
        let chain = self.chain(class, ty);
        let mut stack = SubstitutionStack::new();
        let mut properties: IndexMap<String, Property<'a>> = IndexMap::new();

        for (level, (current, current_ty)) in chain.iter().enumerate() {
            let current: &'a ClassInfo = *current;
            if let TypeRef::Parameterized { arguments, .. } = current_ty {
                stack.push(build_frame(&current.name, current.type_variables(), arguments));
            }

            let mut fields: Vec<&'a FieldInfo> = current.fields.iter().collect();
            let mut methods: Vec<&'a MethodInfo> = current.methods.iter().collect();
            if self.config.sorted_properties_enable {
                fields.sort_by(|a, b| a.name.cmp(&b.name));
                methods.sort_by(|a, b| a.name.cmp(&b.name));
            }

            for field in fields {
                if field.modifiers.is_static || field.modifiers.synthetic {
                    continue;
                }
                self.scan_field(&mut properties, current, field, level, &stack);
            }
            for method in methods {
                self.scan_method(&mut properties, current, method, level, &stack);
            }
            for (iface, iface_stack) in self.interfaces(current, &stack) {
                for method in &iface.methods {
                    self.scan_method(&mut properties, iface, method, level, &iface_stack);
                }
            }
        }

        if !self.config.private_properties_enable {
            for property in properties.values_mut() {
                if !property.visibility.exposed && !property.sites().any(|(_, site)| site.modifiers().public) {
                    property.visibility.ignored = true;
                }
            }
        }

        let mut properties: Vec<Property<'a>> = properties.into_values().collect();
        for property in &mut properties {
            property.name = naming::property_name(property.best_site(), &property.bean_name, property.naming);
        }
        self.order(&chain, properties)
    }

    /// `class` first, then superclasses until a platform class or one missing from the index.
    fn chain(&self, class: &'a ClassInfo, ty: &TypeRef) -> Chain<'a> {
        let mut chain = vec![(class, ty.clone())];
        let mut current = class;
        while let Some(sup) = &current.super_class {
            if well_known::is_platform(sup.name()) {
                break;
            }
            let Some(next) = self.index.get_type(sup) else {
                break;
            };
            if chain.iter().any(|(c, _)| c.name == next.name) {
                break;
            }
            chain.push((next, sup.clone()));
            current = next;
        }
        chain
    }

    /// Every interface reachable from `class`, each with the stack extended by its own frame.
    fn interfaces(&self, class: &'a ClassInfo, stack: &SubstitutionStack) -> Vec<(&'a ClassInfo, SubstitutionStack)> {
        let mut out: Vec<(&'a ClassInfo, SubstitutionStack)> = Vec::new();
        let mut pending: Vec<(TypeRef, SubstitutionStack)> =
            class.interfaces.iter().map(|i| (i.clone(), stack.clone())).collect();
        while let Some((iface_ty, base)) = pending.pop() {
            if well_known::is_platform(iface_ty.name()) {
                continue;
            }
            let Some(iface) = self.index.get_type(&iface_ty) else {
                continue;
            };
            if out.iter().any(|(c, _)| c.name == iface.name) {
                continue;
            }
            let mut iface_stack = base;
            if let TypeRef::Parameterized { arguments, .. } = &iface_ty {
                iface_stack.push(build_frame(&iface.name, iface.type_variables(), arguments));
            }
            pending.extend(iface.interfaces.iter().map(|i| (i.clone(), iface_stack.clone())));
            out.push((iface, iface_stack));
        }
        out
    }

    fn naming_for(&self, declaring: &ClassInfo) -> NamingStrategy {
        match self.index.annotation(declaring, names::JSON_NAMING) {
            Some(annotation) => annotation
                .string("value")
                .and_then(NamingStrategy::from_identifier)
                .unwrap_or(NamingStrategy::Identity),
            None => self.config.property_naming_strategy,
        }
    }

    fn scan_field(
        &self,
        properties: &mut IndexMap<String, Property<'a>>,
        declaring: &'a ClassInfo,
        field: &'a FieldInfo,
        level: usize,
        stack: &SubstitutionStack,
    ) {
        let site = Site::Field { declaring, field };
        let property = match properties.entry(field.name.clone()) {
            Entry::Occupied(entry) => {
                let property = entry.into_mut();
                // a superclass field backing accessors found lower in the chain
                let inheritable = field.modifiers.public || field.modifiers.protected;
                if property.field.is_none() && inheritable {
                    property.field = Some(site);
                }
                property
            }
            Entry::Vacant(entry) => entry.insert(Property::new(
                field.name.clone(),
                SiteSlot::Field,
                site,
                field.ty.clone(),
                stack.clone(),
                level,
                self.naming_for(declaring),
            )),
        };
        self.apply_visibility(property, SiteSlot::Field, &site);
    }

    fn scan_method(
        &self,
        properties: &mut IndexMap<String, Property<'a>>,
        declaring: &'a ClassInfo,
        method: &'a MethodInfo,
        level: usize,
        stack: &SubstitutionStack,
    ) {
        if method.modifiers.is_static || method.modifiers.synthetic || method.name == "getClass" {
            return;
        }
        let Some((bean_name, slot, site_type)) = classify(declaring, method) else {
            return;
        };
        let site = Site::Method { declaring, method };
        let property = match properties.entry(bean_name.clone()) {
            Entry::Occupied(entry) => {
                let property = entry.into_mut();
                if property.stack.resolve(&property.leaf) != stack.resolve(site_type) {
                    tracing::trace!(property = %bean_name, method = %method.name, "type differs from property, skipped");
                    return;
                }
                let current = property.slot_mut(slot);
                if is_higher_priority(&site, current.as_ref()) {
                    *current = Some(site);
                }
                property
            }
            Entry::Vacant(entry) => entry.insert(Property::new(
                bean_name,
                slot,
                site,
                site_type.clone(),
                stack.clone(),
                level,
                self.naming_for(declaring),
            )),
        };
        self.apply_visibility(property, slot, &site);
    }

    /// Sites are visited most-derived first; the first decision made sticks.
    fn apply_visibility(&self, property: &mut Property<'a>, slot: SiteSlot, site: &Site<'a>) {
        let visibility = &mut property.visibility;
        if visibility.exposed || visibility.ignored {
            return;
        }
        if ignore::is_unhidden(site) {
            visibility.exposed = true;
            return;
        }
        if !self.ignore.is_ignored(self.index, site, &self.path) {
            return;
        }
        match slot {
            SiteSlot::Field => visibility.ignored = true,
            SiteSlot::Accessor => visibility.write_only = true,
            SiteSlot::Mutator => visibility.read_only = true,
        }
        if visibility.read_only && visibility.write_only {
            visibility.ignored = true;
        }
    }

    /// Explicit order lists first (ancestors' lists before the child's), then by declaring level,
    /// ancestors first. The sort is stable, so declaration order holds within a level.
    fn order(&self, chain: &Chain<'a>, mut properties: Vec<Property<'a>>) -> Vec<Property<'a>> {
        let mut explicit: Vec<String> = Vec::new();
        for (class, _) in chain.iter().rev() {
            for name in self.order_list(class) {
                if !explicit.contains(&name) {
                    explicit.push(name);
                }
            }
        }
        let depth = chain.len();
        properties.sort_by_key(|property| {
            let listed = explicit
                .iter()
                .position(|n| n == property.name())
                .or_else(|| explicit.iter().position(|n| n == property.bean_name()));
            match listed {
                Some(position) => (0, position),
                None => {
                    let level = property
                        .best_site()
                        .and_then(|site| chain.iter().position(|(c, _)| c.name == site.declaring_class().name))
                        .unwrap_or(property.level);
                    (1, depth - level)
                }
            }
        });
        properties
    }

    fn order_list(&self, class: &ClassInfo) -> Vec<String> {
        let sources = [
            (names::JSONB_PROPERTY_ORDER, "value"),
            (names::XML_TYPE, "propOrder"),
            (names::JSON_PROPERTY_ORDER, "value"),
        ];
        sources
            .iter()
            .filter_map(|(annotation, key)| self.index.annotation(class, annotation).map(|a| a.strings(key)))
            .find(|list| !list.is_empty())
            .unwrap_or_default()
    }
}

/// Bean name, slot and property type of a method, if it is an accessor or a mutator.
fn classify<'m>(declaring: &ClassInfo, method: &'m MethodInfo) -> Option<(String, SiteSlot, &'m TypeRef)> {
    let annotated = method.has_annotation(names::SCHEMA);
    if method.parameters.is_empty() && method.returns_value() {
        let returned = method.return_type.as_ref()?;
        let boolean = matches!(returned, TypeRef::Primitive(p) if p == "boolean");
        let record_component =
            declaring.kind == ClassKind::Record && declaring.fields.iter().any(|f| f.name == method.name);
        let name = naming::accessor_name(&method.name, boolean)
            .or_else(|| (record_component || annotated).then(|| method.name.clone()))?;
        return Some((name, SiteSlot::Accessor, returned));
    }
    if method.parameters.len() == 1 && !method.returns_value() {
        let name = naming::mutator_name(&method.name).or_else(|| annotated.then(|| method.name.clone()))?;
        return Some((name, SiteSlot::Mutator, &method.parameters[0]));
    }
    None
}

/// A later (more ancestral) method only replaces a slot when it is declared on an interface and
/// carries stronger metadata.
fn is_higher_priority(candidate: &Site<'_>, current: Option<&Site<'_>>) -> bool {
    match current {
        None => true,
        Some(current) => candidate.declaring_class().is_interface() && site_rank(candidate) < site_rank(current),
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ClassIndex;
    use crate::scanner::deque::ObjectDeque;
    use crate::schema::{SchemaArena, SchemaNode};
    use serde_json::{Value, json};

    fn resolve(classes: Value, root: &str, config: &ScanConfig) -> Vec<(String, TypeRef, Visibility)> {
        let index = ClassIndex::from_json_str(&json!({ "classes": classes }).to_string()).unwrap();
        let ty: TypeRef = root.parse().unwrap();
        let class = index.get_type(&ty).unwrap();
        let mut arena = SchemaArena::default();
        let mut deque = ObjectDeque::new();
        let entry = deque.root(class, ty.clone(), arena.alloc(SchemaNode::default()));
        let ignore = IgnoreChain::new();
        let resolver = PropertyResolver::new(&index, config, &ignore, PathView::new(&deque, entry));
        resolver
            .resolve(class, &ty)
            .into_iter()
            .map(|p| (p.name().to_string(), p.resolved_type(), p.visibility()))
            .collect()
    }

    fn names(props: &[(String, TypeRef, Visibility)]) -> Vec<&str> {
        props.iter().map(|(n, _, _)| n.as_str()).collect()
    }

    #[test]
    fn three_level_substitution_follows_the_nearest_declaration() {
        let classes = json!([
            { "name": "t.Level1", "type_parameters": ["T"], "fields": [ { "name": "one", "type": "T" } ] },
            { "name": "t.Level2", "type_parameters": ["T"], "super_class": "t.Level1<String>",
              "fields": [ { "name": "two", "type": "T" } ] },
            { "name": "t.Level3", "super_class": "t.Level2<Integer>" }
        ]);
        let props = resolve(classes, "t.Level3", &ScanConfig::default());
        assert_eq!(names(&props), vec!["one", "two"], "ancestors first");
        assert_eq!(props[0].1, TypeRef::class("java.lang.String"));
        assert_eq!(props[1].1, TypeRef::class("java.lang.Integer"));
    }

    #[test]
    fn accessor_override_names_the_property() {
        let classes = json!([
            { "name": "t.Parent",
              "fields": [ { "name": "name", "type": "String", "modifiers": ["protected"] } ],
              "methods": [ { "name": "getName", "return_type": "String", "modifiers": ["public"] } ] },
            { "name": "t.Child", "super_class": "t.Parent",
              "methods": [ { "name": "getName", "return_type": "String", "modifiers": ["public"],
                             "annotations": [ { "name": "JsonProperty", "values": { "value": "full_name" } } ] } ] }
        ]);
        let props = resolve(classes, "t.Child", &ScanConfig::default());
        assert_eq!(names(&props), vec!["full_name"]);
    }

    #[test]
    fn ignored_accessor_makes_the_property_write_only() {
        let classes = json!([
            { "name": "t.Account",
              "fields": [
                { "name": "password", "type": "String", "modifiers": ["private"] },
                { "name": "token", "type": "String", "modifiers": ["private"] }
              ],
              "methods": [
                { "name": "getPassword", "return_type": "String", "annotations": [ { "name": "JsonIgnore" } ] },
                { "name": "setPassword", "parameters": ["String"] },
                { "name": "getToken", "return_type": "String" },
                { "name": "setToken", "parameters": ["String"], "annotations": [ { "name": "JsonbTransient" } ] }
              ] }
        ]);
        let props = resolve(classes, "t.Account", &ScanConfig::default());
        assert!(props[0].2.write_only && !props[0].2.ignored);
        assert!(props[1].2.read_only && !props[1].2.ignored);
    }

    #[test]
    fn private_properties_can_be_dropped() {
        let classes = json!([
            { "name": "t.Bean",
              "fields": [
                { "name": "hidden", "type": "String", "modifiers": ["private"] },
                { "name": "open", "type": "String", "modifiers": ["public"] },
                { "name": "kept", "type": "String", "modifiers": ["private"],
                  "annotations": [ { "name": "Schema", "values": { "description": "kept anyway" } } ] }
              ] }
        ]);
        let config = ScanConfig::default().with_private_properties(false);
        let props = resolve(classes, "t.Bean", &config);
        let ignored: Vec<bool> = props.iter().map(|(_, _, v)| v.ignored).collect();
        assert_eq!(ignored, vec![true, false, false]);
    }

    #[test]
    fn explicit_order_lists_come_first() {
        let classes = json!([
            { "name": "t.Base", "fields": [ { "name": "id", "type": "long" } ] },
            { "name": "t.Item", "super_class": "t.Base",
              "annotations": [ { "name": "JsonPropertyOrder", "values": { "value": ["title", "price"] } } ],
              "fields": [
                { "name": "price", "type": "double" },
                { "name": "sku", "type": "String" },
                { "name": "title", "type": "String" }
              ] }
        ]);
        let props = resolve(classes, "t.Item", &ScanConfig::default());
        assert_eq!(names(&props), vec!["title", "price", "id", "sku"]);
    }

    #[test]
    fn naming_strategy_from_config_and_class_annotation() {
        let classes = json!([
            { "name": "t.Snake", "fields": [ { "name": "firstName", "type": "String" } ] },
            { "name": "t.Kebab",
              "annotations": [ { "name": "JsonNaming", "values": { "value": "com.fasterxml.jackson.databind.PropertyNamingStrategies$KebabCaseStrategy" } } ],
              "fields": [ { "name": "firstName", "type": "String" } ] }
        ]);
        let config = ScanConfig::default().with_naming_strategy(NamingStrategy::LowerCaseWithUnderscores);
        assert_eq!(names(&resolve(classes.clone(), "t.Snake", &config)), vec!["first_name"]);
        assert_eq!(names(&resolve(classes, "t.Kebab", &config)), vec!["first-name"]);
    }

    #[test]
    fn record_components_and_generic_interfaces() {
        let classes = json!([
            { "name": "t.Point", "kind": "record",
              "fields": [ { "name": "x", "type": "int", "modifiers": ["private"] } ],
              "methods": [ { "name": "x", "return_type": "int", "modifiers": ["public"] },
                           { "name": "norm", "return_type": "double", "modifiers": ["public"] } ] },
            { "name": "t.Named", "kind": "interface", "type_parameters": ["N"],
              "methods": [ { "name": "getLabel", "return_type": "N" } ] },
            { "name": "t.Tag", "interfaces": ["t.Named<String>"] }
        ]);
        assert_eq!(names(&resolve(classes.clone(), "t.Point", &ScanConfig::default())), vec!["x"]);
        let props = resolve(classes, "t.Tag", &ScanConfig::default());
        assert_eq!(names(&props), vec!["label"]);
        assert_eq!(props[0].1, TypeRef::class("java.lang.String"));
    }
}
