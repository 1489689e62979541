use arcstr::ArcStr;
use fnv::FnvHashMap;

use crate::{
    ast::Type,
    value::Value,
};

use super::meta::{InterfaceMeta, MetaType, ObjectMeta, ScalarMeta, UnionMeta};

/// Name of the meta field every composite type implicitly has.
pub const TYPENAME_FIELD: &str = "__typename";

/// Metadata for a schema
///
/// Built-in scalars (`Int`, `Float`, `String`, `Boolean` and `ID`) are
/// always registered.
#[derive(Debug)]
pub struct SchemaType {
    types: FnvHashMap<ArcStr, MetaType>,
    query_type_name: ArcStr,
    mutation_type_name: Option<ArcStr>,
}

impl SchemaType {
    /// Create a new schema whose query root is `query`.
    pub fn new(query: ObjectMeta) -> Self {
        let query_type_name = query.name.clone();
        let mut schema = Self {
            types: FnvHashMap::default(),
            query_type_name,
            mutation_type_name: None,
        };
        for scalar in ScalarMeta::builtins() {
            schema.add_type(scalar);
        }
        schema.add_type(query);
        schema
    }

    /// Registers the mutation root.
    #[must_use]
    pub fn with_mutation(mut self, mutation: ObjectMeta) -> Self {
        self.mutation_type_name = Some(mutation.name.clone());
        self.add_type(mutation);
        self
    }

    /// Registers an additional type, replacing a type of the same name.
    #[must_use]
    pub fn with_type(mut self, meta: impl Into<MetaType>) -> Self {
        self.add_type(meta);
        self
    }

    fn add_type(&mut self, meta: impl Into<MetaType>) {
        let meta = meta.into();
        self.types.insert(meta.name().clone(), meta);
    }

    /// Get a concrete type by name.
    pub fn concrete_type_by_name(&self, name: &str) -> Option<&MetaType> {
        self.types.get(name)
    }

    /// Get the query type name from the schema.
    pub fn query_type_name(&self) -> &ArcStr {
        &self.query_type_name
    }

    /// Get the mutation type name from the schema.
    pub fn mutation_type_name(&self) -> Option<&ArcStr> {
        self.mutation_type_name.as_ref()
    }

    /// Declared type of the field `field_name` on the composite type
    /// `type_name`.
    ///
    /// `__typename` is defined on every composite type.
    pub fn field_type(&self, type_name: &str, field_name: &str) -> Option<Type> {
        let meta = self.concrete_type_by_name(type_name)?;
        if field_name == TYPENAME_FIELD && meta.is_composite() {
            return Some(Type::non_null_named(arcstr::literal!("String")));
        }
        meta.field_by_name(field_name).map(|f| f.field_type.clone())
    }

    /// Object types an abstract type may resolve to.
    ///
    /// Empty for non-abstract types.
    pub fn possible_types(&self, t: &MetaType) -> Vec<&MetaType> {
        match t {
            MetaType::Union(UnionMeta { of_type_names, .. }) => of_type_names
                .iter()
                .filter_map(|t| self.concrete_type_by_name(t))
                .collect(),
            MetaType::Interface(InterfaceMeta { name, .. }) => {
                let mut types = self
                    .types
                    .values()
                    .filter(|t| match t {
                        MetaType::Object(ObjectMeta {
                            interface_names, ..
                        }) => interface_names.iter().any(|iname| iname == name),
                        _ => false,
                    })
                    .collect::<Vec<_>>();
                types.sort_by(|a, b| a.name().cmp(b.name()));
                types
            }
            _ => Vec::new(),
        }
    }

    /// Is `possible_type` one of the object types `abstract_type` resolves
    /// to?
    pub fn is_possible_type(&self, abstract_type: &MetaType, possible_type: &MetaType) -> bool {
        self.possible_types(abstract_type)
            .into_iter()
            .any(|t| t.name() == possible_type.name())
    }

    /// Does a fragment with `type_condition` apply to an object of
    /// `object_type`?
    ///
    /// It does if the names match, or if the condition names an abstract type
    /// the object type belongs to.
    pub fn does_type_condition_apply(&self, type_condition: &str, object_type: &str) -> bool {
        if type_condition == object_type {
            return true;
        }
        match (
            self.concrete_type_by_name(type_condition),
            self.concrete_type_by_name(object_type),
        ) {
            (Some(condition), Some(object)) => {
                condition.is_abstract() && self.is_possible_type(condition, object)
            }
            _ => false,
        }
    }

    /// Determines the object type a value of the abstract type
    /// `abstract_type` belongs to.
    ///
    /// A value carrying a `__typename` entry resolves to that type, as long
    /// as it is a possible type. Otherwise an abstract type with a single
    /// possible type resolves to it.
    pub fn resolve_concrete_type(&self, abstract_type: &str, value: &Value) -> Option<ArcStr> {
        let meta = self.concrete_type_by_name(abstract_type)?;
        let possible = self.possible_types(meta);

        if let Some(name) = value
            .as_object_value()
            .and_then(|o| o.get_field_value(TYPENAME_FIELD))
            .and_then(Value::as_string_value)
        {
            return possible
                .into_iter()
                .find(|t| t.name() == name)
                .map(|t| t.name().clone());
        }

        match possible.as_slice() {
            [only] => Some(only.name().clone()),
            _ => None,
        }
    }
}
