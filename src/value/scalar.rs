use derive_more::with_trait::{Display, From};
use serde::{Deserialize, Serialize};

/// Leaf value of a response.
///
/// Covers the built-in GraphQL scalars. Enum values are represented as
/// [`ScalarValue::String`]s once serialized.
#[derive(Clone, Debug, Deserialize, Display, From, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    /// [`i32`] value.
    #[display("{_0}")]
    Int(i32),

    /// [`f64`] value.
    #[display("{_0}")]
    Float(f64),

    /// [`String`] value.
    #[display("{_0}")]
    String(String),

    /// [`bool`] value.
    #[display("{_0}")]
    Boolean(bool),
}

impl ScalarValue {
    /// Views this value as a [`str`], if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Views this value as an [`i32`], if it is an integer.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Views this value as an [`f64`].
    ///
    /// Integers are widened, as GraphQL `Float` accepts them.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(f64::from(*i)),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Views this value as a [`bool`], if it is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}
