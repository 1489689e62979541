//! Already-parsed query document.
//!
//! Parsing and static validation happen elsewhere: the executor only walks
//! these nodes. Every node is immutable once built, and selection nodes are
//! reference counted, so collected fields can outlive the borrow of the
//! document they came from.

use std::{fmt, sync::Arc};

use arcstr::ArcStr;

use crate::{
    executor::Variables,
    position::SourcePosition,
    value::{Object, ScalarValue, Value},
};

/// A type literal in the syntax tree
///
/// This enum carries no semantic information and might refer to types that do
/// not exist.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Type {
    /// A nullable named type, e.g. `String`
    Named(ArcStr),
    /// A nullable list type, e.g. `[String]`
    ///
    /// The list itself is what's nullable, the containing type might be non-null.
    List(Box<Type>),
    /// A non-null named type, e.g. `String!`
    NonNullNamed(ArcStr),
    /// A non-null list type, e.g. `[String]!`.
    ///
    /// The list itself is what's non-null, the containing type might be null.
    NonNullList(Box<Type>),
}

impl Type {
    /// Constructs a nullable named type.
    pub fn named(name: impl Into<ArcStr>) -> Self {
        Self::Named(name.into())
    }

    /// Constructs a non-null named type.
    pub fn non_null_named(name: impl Into<ArcStr>) -> Self {
        Self::NonNullNamed(name.into())
    }

    /// Constructs a nullable list of `of_type`.
    pub fn list(of_type: Self) -> Self {
        Self::List(Box::new(of_type))
    }

    /// Constructs a non-null list of `of_type`.
    pub fn non_null_list(of_type: Self) -> Self {
        Self::NonNullList(Box::new(of_type))
    }

    /// Get the name of a named type.
    ///
    /// Only applies to named types; lists will return `None`.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(n) | Self::NonNullNamed(n) => Some(n),
            _ => None,
        }
    }

    /// Get the innermost name by unpacking lists
    ///
    /// All type literals contain exactly one named type.
    pub fn innermost_name(&self) -> &str {
        match self {
            Self::Named(n) | Self::NonNullNamed(n) => n,
            Self::List(l) | Self::NonNullList(l) => l.innermost_name(),
        }
    }

    /// Determines if a type only can represent non-null values.
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNullNamed(_) | Self::NonNullList(_))
    }

    /// Determines if this is a list type, regardless of its nullability.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_) | Self::NonNullList(_))
    }

    /// Strips the non-null wrapper (if any) and exactly one list layer.
    ///
    /// Returns [`None`] for named types.
    pub fn list_element(&self) -> Option<&Self> {
        match self {
            Self::List(of) | Self::NonNullList(of) => Some(of),
            Self::Named(_) | Self::NonNullNamed(_) => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(n) => write!(f, "{n}"),
            Self::NonNullNamed(n) => write!(f, "{n}!"),
            Self::List(t) => write!(f, "[{t}]"),
            Self::NonNullList(t) => write!(f, "[{t}]!"),
        }
    }
}

/// A JSON-like value that can be passed into the query execution, either
/// out-of-band, or in-band as default variable values. These are _not_ constant
/// and might contain variables.
#[derive(Clone, Debug, PartialEq)]
#[expect(missing_docs, reason = "self-explanatory")]
pub enum InputValue {
    Null,
    Scalar(ScalarValue),
    Enum(String),
    Variable(String),
    List(Vec<InputValue>),
    Object(Vec<(String, InputValue)>),
}

impl InputValue {
    /// Construct a `null` value.
    pub fn null() -> Self {
        Self::Null
    }

    /// Construct a scalar value
    pub fn scalar<T: Into<ScalarValue>>(v: T) -> Self {
        Self::Scalar(v.into())
    }

    /// Construct an enum value.
    pub fn enum_value<T: AsRef<str>>(s: T) -> Self {
        Self::Enum(s.as_ref().into())
    }

    /// Construct a variable value.
    pub fn variable<T: AsRef<str>>(v: T) -> Self {
        Self::Variable(v.as_ref().into())
    }

    /// Construct a list value.
    pub fn list(l: Vec<Self>) -> Self {
        Self::List(l)
    }

    /// Construct an object value, keeping the given field order.
    pub fn object<K: Into<String>>(o: impl IntoIterator<Item = (K, Self)>) -> Self {
        Self::Object(o.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Resolves all variables of this [`InputValue`] to their actual `values`.
    ///
    /// If a variable is not present in the `values`:
    /// - Returns [`None`] in case this is an [`InputValue::Variable`].
    /// - Skips field in case of an [`InputValue::Object`] field.
    /// - Replaces with an [`InputValue::Null`] in case of an
    ///   [`InputValue::List`] element.
    #[must_use]
    pub fn into_const(self, values: &Variables) -> Option<Self> {
        match self {
            Self::Variable(v) => values.get(&v).cloned(),
            Self::List(l) => Some(Self::List(
                l.into_iter()
                    .map(|v| v.into_const(values).unwrap_or_else(Self::null))
                    .collect(),
            )),
            Self::Object(o) => Some(Self::Object(
                o.into_iter()
                    .filter_map(|(k, v)| v.into_const(values).map(|v| (k, v)))
                    .collect(),
            )),
            v => Some(v),
        }
    }

    /// Does the value represent a `null`?
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// View the underlying scalar value, if present.
    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// View the underlying boolean value, if present.
    pub fn as_bool_value(&self) -> Option<bool> {
        self.as_scalar().and_then(ScalarValue::as_bool)
    }

    /// View the underlying int value, if present.
    pub fn as_int_value(&self) -> Option<i32> {
        self.as_scalar().and_then(ScalarValue::as_int)
    }

    /// View the underlying string value, if present.
    pub fn as_string_value(&self) -> Option<&str> {
        self.as_scalar().and_then(ScalarValue::as_str)
    }

    /// Converts a constant [`InputValue`] into a response [`Value`].
    ///
    /// Enum values become strings, unresolved variables become `null`.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null | Self::Variable(_) => Value::null(),
            Self::Scalar(s) => Value::Scalar(s.clone()),
            Self::Enum(e) => Value::scalar(e.as_str()),
            Self::List(l) => Value::list(l.iter().map(Self::to_value).collect()),
            Self::Object(o) => Value::object(
                o.iter()
                    .map(|(k, v)| (k.as_str(), v.to_value()))
                    .collect::<Object>(),
            ),
        }
    }
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Scalar(ScalarValue::String(s)) => write!(f, "\"{s}\""),
            Self::Scalar(s) => write!(f, "{s}"),
            Self::Enum(v) => write!(f, "{v}"),
            Self::Variable(v) => write!(f, "${v}"),
            Self::List(v) => {
                write!(f, "[")?;
                for (i, spanning) in v.iter().enumerate() {
                    spanning.fmt(f)?;
                    if i < v.len() - 1 {
                        write!(f, ", ")?;
                    }
                }
                write!(f, "]")
            }
            Self::Object(o) => {
                write!(f, "{{")?;
                for (i, (k, v)) in o.iter().enumerate() {
                    write!(f, "{k}: ")?;
                    v.fmt(f)?;
                    if i < o.len() - 1 {
                        write!(f, ", ")?;
                    }
                }
                write!(f, "}}")
            }
        }
    }
}

/// A directive applied to a selection, e.g. `@skip(if: $cond)`.
#[derive(Clone, PartialEq, Debug)]
pub struct Directive {
    /// Name of the directive, without the `@`.
    pub name: ArcStr,
    /// Arguments in document order.
    pub arguments: Vec<(ArcStr, InputValue)>,
    /// Where the directive appears in the document.
    pub position: SourcePosition,
}

impl Directive {
    #[doc(hidden)]
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            position: SourcePosition::new_origin(),
        }
    }

    #[doc(hidden)]
    #[must_use]
    pub fn argument(mut self, name: impl Into<ArcStr>, value: InputValue) -> Self {
        self.arguments.push((name.into(), value));
        self
    }

    /// Looks up an argument of this directive by its name.
    pub fn get_argument(&self, name: &str) -> Option<&InputValue> {
        self.arguments
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
    }
}

/// One field occurrence in a selection set.
#[derive(Clone, PartialEq, Debug)]
#[expect(missing_docs, reason = "self-explanatory")]
pub struct Field {
    /// Response key overriding the name, if aliased.
    pub alias: Option<ArcStr>,
    /// Name of the field on its parent type.
    pub name: ArcStr,
    /// Arguments in document order, possibly referencing variables.
    pub arguments: Vec<(ArcStr, InputValue)>,
    pub directives: Vec<Directive>,
    /// Sub-selection, present for fields of composite types.
    pub selection_set: Option<Vec<Selection>>,
    pub position: SourcePosition,
}

impl Field {
    #[doc(hidden)]
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            alias: None,
            name: name.into(),
            arguments: Vec::new(),
            directives: Vec::new(),
            selection_set: None,
            position: SourcePosition::new_origin(),
        }
    }

    #[doc(hidden)]
    #[must_use]
    pub fn alias(mut self, alias: impl Into<ArcStr>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[doc(hidden)]
    #[must_use]
    pub fn argument(mut self, name: impl Into<ArcStr>, value: InputValue) -> Self {
        self.arguments.push((name.into(), value));
        self
    }

    #[doc(hidden)]
    #[must_use]
    pub fn directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    #[doc(hidden)]
    #[must_use]
    pub fn selection_set(mut self, selection_set: Vec<Selection>) -> Self {
        self.selection_set = Some(selection_set);
        self
    }

    #[doc(hidden)]
    #[must_use]
    pub fn at(mut self, position: SourcePosition) -> Self {
        self.position = position;
        self
    }

    /// The key under which this field appears in the response: its alias if
    /// present, its name otherwise.
    pub fn response_key(&self) -> &ArcStr {
        self.alias.as_ref().unwrap_or(&self.name)
    }
}

/// `...Name` reference to a named fragment.
#[derive(Clone, PartialEq, Debug)]
#[expect(missing_docs, reason = "self-explanatory")]
pub struct FragmentSpread {
    pub name: ArcStr,
    pub directives: Vec<Directive>,
    pub position: SourcePosition,
}

/// `... on Type { .. }` fragment, with an optional type condition.
#[derive(Clone, PartialEq, Debug)]
#[expect(missing_docs, reason = "self-explanatory")]
pub struct InlineFragment {
    pub type_condition: Option<ArcStr>,
    pub directives: Vec<Directive>,
    pub selection_set: Vec<Selection>,
    pub position: SourcePosition,
}

/// Entry in a GraphQL selection set
///
/// This enum represents one of the three variants of a selection that exists
/// in GraphQL: a field, a fragment spread, or an inline fragment. Each of the
/// variants references their location in the query source.
///
/// ```text
/// {
///   field(withArg: 123) { subField }
///   ...fragmentSpread
///   ...on User {
///     inlineFragmentField
///   }
/// }
/// ```
#[derive(Clone, PartialEq, Debug)]
#[expect(missing_docs, reason = "self-explanatory")]
pub enum Selection {
    Field(Arc<Field>),
    FragmentSpread(FragmentSpread),
    InlineFragment(InlineFragment),
}

impl Selection {
    #[doc(hidden)]
    pub fn field(field: Field) -> Self {
        Self::Field(Arc::new(field))
    }

    #[doc(hidden)]
    pub fn fragment_spread(name: impl Into<ArcStr>, directives: Vec<Directive>) -> Self {
        Self::FragmentSpread(FragmentSpread {
            name: name.into(),
            directives,
            position: SourcePosition::new_origin(),
        })
    }

    #[doc(hidden)]
    pub fn inline_fragment(
        type_condition: Option<&str>,
        directives: Vec<Directive>,
        selection_set: Vec<Self>,
    ) -> Self {
        Self::InlineFragment(InlineFragment {
            type_condition: type_condition.map(ArcStr::from),
            directives,
            selection_set,
            position: SourcePosition::new_origin(),
        })
    }

    /// Directives applied to this selection node.
    pub fn directives(&self) -> &[Directive] {
        match self {
            Self::Field(f) => &f.directives,
            Self::FragmentSpread(s) => &s.directives,
            Self::InlineFragment(i) => &i.directives,
        }
    }
}

#[expect(missing_docs, reason = "self-explanatory")]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        })
    }
}

#[expect(missing_docs, reason = "self-explanatory")]
#[derive(Clone, PartialEq, Debug)]
pub struct VariableDefinition {
    pub name: ArcStr,
    pub var_type: Type,
    pub default_value: Option<InputValue>,
}

#[expect(missing_docs, reason = "self-explanatory")]
#[derive(Clone, PartialEq, Debug)]
pub struct Operation {
    pub operation_type: OperationType,
    pub name: Option<ArcStr>,
    pub variable_definitions: Vec<VariableDefinition>,
    pub directives: Vec<Directive>,
    pub selection_set: Vec<Selection>,
    pub position: SourcePosition,
}

impl Operation {
    #[doc(hidden)]
    pub fn new(operation_type: OperationType, selection_set: Vec<Selection>) -> Self {
        Self {
            operation_type,
            name: None,
            variable_definitions: Vec::new(),
            directives: Vec::new(),
            selection_set,
            position: SourcePosition::new_origin(),
        }
    }

    #[doc(hidden)]
    #[must_use]
    pub fn named(mut self, name: impl Into<ArcStr>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[doc(hidden)]
    #[must_use]
    pub fn variable(mut self, name: impl Into<ArcStr>, var_type: Type, default: Option<InputValue>) -> Self {
        self.variable_definitions.push(VariableDefinition {
            name: name.into(),
            var_type,
            default_value: default,
        });
        self
    }
}

#[expect(missing_docs, reason = "self-explanatory")]
#[derive(Clone, PartialEq, Debug)]
pub struct Fragment {
    pub name: ArcStr,
    pub type_condition: ArcStr,
    pub directives: Vec<Directive>,
    pub selection_set: Vec<Selection>,
}

impl Fragment {
    #[doc(hidden)]
    pub fn new(
        name: impl Into<ArcStr>,
        type_condition: impl Into<ArcStr>,
        selection_set: Vec<Selection>,
    ) -> Self {
        Self {
            name: name.into(),
            type_condition: type_condition.into(),
            directives: Vec::new(),
            selection_set,
        }
    }
}

#[doc(hidden)]
#[derive(Clone, PartialEq, Debug)]
pub enum Definition {
    Operation(Operation),
    Fragment(Arc<Fragment>),
}

#[doc(hidden)]
pub type Document = [Definition];
#[doc(hidden)]
pub type OwnedDocument = Vec<Definition>;
