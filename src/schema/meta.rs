//! Types used to describe a `GraphQL` schema

use arcstr::ArcStr;

use crate::{
    FieldError,
    ast::Type,
    executor::FieldResult,
    value::{ScalarValue, Value},
};

/// Shortcut for a function serializing a resolved value into the
/// representation of a leaf type.
pub type SerializeFn = fn(&Value) -> FieldResult<Value>;

/// Scalar type metadata
#[derive(Debug)]
pub struct ScalarMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    pub(crate) serialize_fn: SerializeFn,
}

/// Enum type metadata
#[derive(Debug)]
pub struct EnumMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub values: Vec<ArcStr>,
}

/// Object type metadata
#[derive(Debug)]
pub struct ObjectMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub fields: Vec<Field>,
    #[doc(hidden)]
    pub interface_names: Vec<ArcStr>,
}

/// Interface type metadata
#[derive(Debug)]
pub struct InterfaceMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub fields: Vec<Field>,
}

/// Union type metadata
#[derive(Debug)]
pub struct UnionMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub of_type_names: Vec<ArcStr>,
}

/// Generic type metadata
#[derive(Debug)]
pub enum MetaType {
    #[doc(hidden)]
    Scalar(ScalarMeta),
    #[doc(hidden)]
    Enum(EnumMeta),
    #[doc(hidden)]
    Object(ObjectMeta),
    #[doc(hidden)]
    Interface(InterfaceMeta),
    #[doc(hidden)]
    Union(UnionMeta),
}

/// Metadata for a field
#[derive(Debug, Clone)]
pub struct Field {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub field_type: Type,
}

impl MetaType {
    /// Access the name of the type
    pub fn name(&self) -> &ArcStr {
        match self {
            Self::Scalar(ScalarMeta { name, .. })
            | Self::Enum(EnumMeta { name, .. })
            | Self::Object(ObjectMeta { name, .. })
            | Self::Interface(InterfaceMeta { name, .. })
            | Self::Union(UnionMeta { name, .. }) => name,
        }
    }

    /// Access a field's meta data given its name
    ///
    /// Only objects and interfaces have fields. This method always returns `None` for other types.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        match self {
            Self::Object(ObjectMeta { fields, .. })
            | Self::Interface(InterfaceMeta { fields, .. }) => {
                fields.iter().find(|f| f.name == name)
            }
            _ => None,
        }
    }

    /// Returns true if the type is a composite type
    ///
    /// Objects, interfaces, and unions are composite.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Interface(_) | Self::Union(_))
    }

    /// Returns true if the type can occur in leaf positions in queries
    ///
    /// Only enums and scalars are leaf types.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Enum(_) | Self::Scalar(_))
    }

    /// Returns true if the type is abstract
    ///
    /// Only interfaces and unions are abstract types.
    pub fn is_abstract(&self) -> bool {
        matches!(self, Self::Interface(_) | Self::Union(_))
    }

    /// Serializes a resolved value as this leaf type.
    ///
    /// Composite types can't be serialized and always produce an error.
    pub fn serialize(&self, value: &Value) -> FieldResult<Value> {
        match self {
            Self::Scalar(ScalarMeta { serialize_fn, .. }) => serialize_fn(value),
            Self::Enum(meta) => meta.serialize(value),
            _ => Err(format!("Type \"{}\" is not a leaf type", self.name()).into()),
        }
    }
}

impl ScalarMeta {
    /// Build a new custom scalar type metadata with the specified name.
    ///
    /// Values of custom scalars are passed through unchanged.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self::with_serializer(name, serialize_custom)
    }

    /// Build a new scalar type metadata serializing values with `serialize_fn`.
    pub fn with_serializer(name: impl Into<ArcStr>, serialize_fn: SerializeFn) -> Self {
        Self {
            name: name.into(),
            serialize_fn,
        }
    }

    /// The scalar types every schema has.
    pub fn builtins() -> [Self; 5] {
        [
            Self::with_serializer(arcstr::literal!("Int"), serialize_int),
            Self::with_serializer(arcstr::literal!("Float"), serialize_float),
            Self::with_serializer(arcstr::literal!("String"), serialize_string),
            Self::with_serializer(arcstr::literal!("Boolean"), serialize_boolean),
            Self::with_serializer(arcstr::literal!("ID"), serialize_id),
        ]
    }
}

impl EnumMeta {
    /// Build a new enum type with the specified name and possible values
    pub fn new<V: Into<ArcStr>>(name: impl Into<ArcStr>, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    fn serialize(&self, value: &Value) -> FieldResult<Value> {
        match value.as_string_value() {
            Some(s) if self.values.iter().any(|v| v == s) => Ok(value.clone()),
            _ => Err(FieldError::from(format!(
                "Invalid value for enum \"{}\": {value}",
                self.name,
            ))),
        }
    }
}

impl ObjectMeta {
    /// Build a new object type with the specified name and no fields
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            interface_names: Vec::new(),
        }
    }

    /// Add a field to the object type
    #[must_use]
    pub fn field(mut self, name: impl Into<ArcStr>, field_type: Type) -> Self {
        self.fields.push(Field {
            name: name.into(),
            field_type,
        });
        self
    }

    /// Set the interfaces this type implements
    ///
    /// If a list of interfaces already was provided prior to calling this method, they will be
    /// overwritten.
    #[must_use]
    pub fn interfaces<I: Into<ArcStr>>(mut self, interfaces: impl IntoIterator<Item = I>) -> Self {
        self.interface_names = interfaces.into_iter().map(Into::into).collect();
        self
    }
}

impl InterfaceMeta {
    /// Build a new interface type with the specified name and no fields
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field to the interface type
    #[must_use]
    pub fn field(mut self, name: impl Into<ArcStr>, field_type: Type) -> Self {
        self.fields.push(Field {
            name: name.into(),
            field_type,
        });
        self
    }
}

impl UnionMeta {
    /// Build a new union type with the specified name and possible types
    pub fn new<T: Into<ArcStr>>(name: impl Into<ArcStr>, of_types: impl IntoIterator<Item = T>) -> Self {
        Self {
            name: name.into(),
            of_type_names: of_types.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<ScalarMeta> for MetaType {
    fn from(meta: ScalarMeta) -> Self {
        Self::Scalar(meta)
    }
}

impl From<EnumMeta> for MetaType {
    fn from(meta: EnumMeta) -> Self {
        Self::Enum(meta)
    }
}

impl From<ObjectMeta> for MetaType {
    fn from(meta: ObjectMeta) -> Self {
        Self::Object(meta)
    }
}

impl From<InterfaceMeta> for MetaType {
    fn from(meta: InterfaceMeta) -> Self {
        Self::Interface(meta)
    }
}

impl From<UnionMeta> for MetaType {
    fn from(meta: UnionMeta) -> Self {
        Self::Union(meta)
    }
}

fn serialize_custom(value: &Value) -> FieldResult<Value> {
    Ok(value.clone())
}

fn expect_scalar<'v>(value: &'v Value, type_name: &str) -> FieldResult<&'v ScalarValue> {
    value
        .as_scalar()
        .ok_or_else(|| format!("{type_name} cannot represent a non-scalar value: {value}").into())
}

fn serialize_int(value: &Value) -> FieldResult<Value> {
    match expect_scalar(value, "Int")? {
        ScalarValue::Int(i) => Ok(Value::scalar(*i)),
        ScalarValue::Float(f)
            if f.fract() == 0.0 && *f >= f64::from(i32::MIN) && *f <= f64::from(i32::MAX) =>
        {
            Ok(Value::scalar(*f as i32))
        }
        ScalarValue::String(s) => s
            .parse::<i32>()
            .map(Value::scalar)
            .map_err(|_| format!("Int cannot represent non-integer value: \"{s}\"").into()),
        other => Err(format!("Int cannot represent non-integer value: {other}").into()),
    }
}

fn serialize_float(value: &Value) -> FieldResult<Value> {
    match expect_scalar(value, "Float")? {
        ScalarValue::Int(i) => Ok(Value::scalar(f64::from(*i))),
        ScalarValue::Float(f) if f.is_finite() => Ok(Value::scalar(*f)),
        ScalarValue::String(s) => s
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::scalar)
            .ok_or_else(|| format!("Float cannot represent non-numeric value: \"{s}\"").into()),
        other => Err(format!("Float cannot represent non-numeric value: {other}").into()),
    }
}

fn serialize_string(value: &Value) -> FieldResult<Value> {
    Ok(match expect_scalar(value, "String")? {
        ScalarValue::String(s) => Value::scalar(s.as_str()),
        other => Value::scalar(other.to_string()),
    })
}

fn serialize_boolean(value: &Value) -> FieldResult<Value> {
    match expect_scalar(value, "Boolean")? {
        ScalarValue::Boolean(b) => Ok(Value::scalar(*b)),
        other => Err(format!("Boolean cannot represent a non boolean value: {other}").into()),
    }
}

fn serialize_id(value: &Value) -> FieldResult<Value> {
    match expect_scalar(value, "ID")? {
        ScalarValue::String(s) => Ok(Value::scalar(s.as_str())),
        ScalarValue::Int(i) => Ok(Value::scalar(i.to_string())),
        other => Err(format!("ID cannot represent value: {other}").into()),
    }
}
