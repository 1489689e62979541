use std::{
    fmt,
    hash::{Hash, Hasher},
    iter,
    str::FromStr,
    sync::Arc,
};

use arcstr::ArcStr;
use derive_more::with_trait::{Display, Error};
use serde::{Serialize, Serializer};

use crate::ast::Type;

use super::{Arguments, ExecutionAbort, ExecutionContext, MergedField};

/// Single step of a [`ResultPath`].
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Response key of a field.
    Field(String),
    /// Position inside a list.
    Index(usize),
}

/// Location of a value inside the response.
///
/// Paths are immutable and share their ancestors: extending one allocates a
/// single node pointing back at the original, which stays untouched. A path
/// can thus be shared by concurrently resolving siblings.
///
/// ```rust
/// # use graphql_execution::ResultPath;
/// let path = ResultPath::root().segment("hero").segment("friends").index(2);
///
/// assert_eq!(path.to_string(), "/hero/friends[2]");
/// assert_eq!(path.level(), 2);
/// assert_eq!("/hero/friends[2]".parse::<ResultPath>(), Ok(path));
/// ```
#[derive(Clone, Default)]
pub struct ResultPath(Option<Arc<PathNode>>);

struct PathNode {
    parent: ResultPath,
    segment: PathSegment,
    len: usize,
}

impl ResultPath {
    /// The empty path of the response root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a path from its segments.
    pub fn from_segments(segments: impl IntoIterator<Item = PathSegment>) -> Self {
        segments
            .into_iter()
            .fold(Self::root(), |path, segment| path.extended(segment))
    }

    /// Extends this path with the response key of a field.
    #[must_use]
    pub fn segment(&self, key: impl Into<String>) -> Self {
        self.extended(PathSegment::Field(key.into()))
    }

    /// Extends this path with a list index.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.extended(PathSegment::Index(index))
    }

    fn extended(&self, segment: PathSegment) -> Self {
        Self(Some(Arc::new(PathNode {
            parent: self.clone(),
            segment,
            len: self.len() + 1,
        })))
    }

    /// Path without its last segment, or [`None`] for the root.
    pub fn parent(&self) -> Option<Self> {
        self.0.as_ref().map(|node| node.parent.clone())
    }

    fn len(&self) -> usize {
        self.0.as_ref().map_or(0, |node| node.len)
    }

    /// Number of field segments, ignoring list indices.
    pub fn level(&self) -> usize {
        self.rev_segments()
            .filter(|s| matches!(s, PathSegment::Field(_)))
            .count()
    }

    /// Is this the root path?
    pub fn is_root(&self) -> bool {
        self.0.is_none()
    }

    /// Does this path end with a list index?
    pub fn is_list_segment(&self) -> bool {
        matches!(self.last_segment(), Some(PathSegment::Index(_)))
    }

    /// Strips every trailing list index.
    ///
    /// `/a/b[1][2]` becomes `/a/b`.
    #[must_use]
    pub fn path_without_list_end(&self) -> Self {
        let mut path = self;
        while let Some(node) = &path.0 {
            if !matches!(node.segment, PathSegment::Index(_)) {
                break;
            }
            path = &node.parent;
        }
        path.clone()
    }

    /// Response key of the last field segment.
    pub fn last_field_name(&self) -> Option<&str> {
        self.rev_segments().find_map(|s| match s {
            PathSegment::Field(name) => Some(name.as_str()),
            PathSegment::Index(_) => None,
        })
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    pub fn last_segment(&self) -> Option<&PathSegment> {
        self.0.as_ref().map(|node| &node.segment)
    }

    /// Segments from the root.
    pub fn segments(&self) -> Vec<PathSegment> {
        let mut segments = self.rev_segments().cloned().collect::<Vec<_>>();
        segments.reverse();
        segments
    }

    /// Segments from the last one back to the root.
    fn rev_segments(&self) -> impl Iterator<Item = &PathSegment> {
        iter::successors(self.0.as_deref(), |node| node.parent.0.as_deref())
            .map(|node| &node.segment)
    }
}

impl PartialEq for ResultPath {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) if Arc::ptr_eq(a, b) => true,
            _ => self.len() == other.len() && self.rev_segments().eq(other.rev_segments()),
        }
    }
}

impl Eq for ResultPath {}

impl Hash for ResultPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for segment in self.rev_segments() {
            segment.hash(state);
        }
    }
}

impl fmt::Debug for ResultPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResultPath").field(&self.segments()).finish()
    }
}

impl fmt::Display for ResultPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in self.segments() {
            match segment {
                PathSegment::Field(name) => write!(f, "/{name}")?,
                PathSegment::Index(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for ResultPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.segments())
    }
}

/// Malformed textual [`ResultPath`].
#[derive(Clone, Debug, Display, Error, PartialEq)]
#[display("Invalid result path \"{input}\" at byte {offset}")]
pub struct ResultPathParseError {
    input: String,
    offset: usize,
}

impl FromStr for ResultPath {
    type Err = ResultPathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |offset| ResultPathParseError {
            input: s.into(),
            offset,
        };

        let mut path = Self::root();
        let mut rest = s;
        while !rest.is_empty() {
            let offset = s.len() - rest.len();
            if let Some(tail) = rest.strip_prefix('/') {
                let end = tail.find(['/', '[']).unwrap_or(tail.len());
                if end == 0 {
                    return Err(err(offset));
                }
                path = path.segment(&tail[..end]);
                rest = &tail[end..];
            } else if let Some(tail) = rest.strip_prefix('[') {
                let end = tail.find(']').ok_or_else(|| err(offset))?;
                let index = tail[..end].parse().map_err(|_| err(offset + 1))?;
                path = path.index(index);
                rest = &tail[end + 1..];
            } else {
                return Err(err(offset));
            }
        }
        Ok(path)
    }
}

/// Type, path and field of the value being resolved, linked to the step of
/// its parent value.
#[derive(Debug)]
pub struct ExecutionStepInfo {
    field_type: Type,
    path: ResultPath,
    parent: Option<Arc<ExecutionStepInfo>>,
    field: Option<MergedField>,
    field_container: Option<ArcStr>,
    arguments: Arguments,
}

impl ExecutionStepInfo {
    /// Step of the root object of an operation.
    pub fn root(root_type: Type) -> Arc<Self> {
        Arc::new(Self {
            field_type: root_type,
            path: ResultPath::root(),
            parent: None,
            field: None,
            field_container: None,
            arguments: Arguments::default(),
        })
    }

    /// Step of `field`, requested on an object of type `container`.
    ///
    /// The field's arguments are resolved against the execution variables;
    /// arguments referencing unbound variables are left out.
    pub fn create_for_field(
        ctx: &ExecutionContext,
        parent: &Arc<Self>,
        field: &MergedField,
        field_type: Type,
        container: &ArcStr,
        path: ResultPath,
    ) -> Arc<Self> {
        let arguments = field
            .arguments()
            .iter()
            .filter_map(|(name, value)| {
                Some((name.clone(), value.clone().into_const(ctx.variables())?))
            })
            .collect();

        Arc::new(Self {
            field_type,
            path,
            parent: Some(parent.clone()),
            field: Some(field.clone()),
            field_container: Some(container.clone()),
            arguments,
        })
    }

    /// Step of the list element at `indexed_path`.
    ///
    /// The element type is the parent's list type with its non-null wrapper
    /// and one list layer removed. The field, its container and arguments are
    /// inherited from `parent`.
    ///
    /// # Errors
    ///
    /// If the type of `parent` isn't a list type.
    pub fn step_into_list_element(
        parent: &Arc<Self>,
        indexed_path: ResultPath,
    ) -> Result<Arc<Self>, ExecutionAbort> {
        let field_type = parent
            .field_type
            .list_element()
            .ok_or_else(|| ExecutionAbort::NotAListType(parent.field_type.clone()))?
            .clone();

        Ok(Arc::new(Self {
            field_type,
            path: indexed_path,
            parent: Some(parent.clone()),
            field: parent.field.clone(),
            field_container: parent.field_container.clone(),
            arguments: parent.arguments.clone(),
        }))
    }

    /// Type of the value at this step, including its wrappers.
    pub fn field_type(&self) -> &Type {
        &self.field_type
    }

    /// Response path of this step.
    pub fn path(&self) -> &ResultPath {
        &self.path
    }

    /// Step of the enclosing value.
    pub fn parent(&self) -> Option<&Arc<Self>> {
        self.parent.as_ref()
    }

    /// Whether this isn't the root step.
    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    /// Field being resolved, absent for the root step.
    pub fn field(&self) -> Option<&MergedField> {
        self.field.as_ref()
    }

    /// Object type the field is requested on.
    pub fn field_container(&self) -> Option<&ArcStr> {
        self.field_container.as_ref()
    }

    /// Resolved field arguments.
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    pub fn is_non_null_type(&self) -> bool {
        self.field_type.is_non_null()
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    pub fn is_list_type(&self) -> bool {
        self.field_type.is_list()
    }
}
