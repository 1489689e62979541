use std::sync::Arc;

use arcstr::ArcStr;
use fnv::{FnvHashMap, FnvHashSet};
use indexmap::{IndexMap, map::Entry};

use crate::{
    ast::{Directive, Field, Fragment, InputValue, Selection},
    position::SourcePosition,
    schema::model::SchemaType,
};

use super::{ExecutionAbort, ExecutionContext, SelectionFilter, Variables};

/// All the field nodes sharing one response key, in document order.
///
/// Never empty: the first node names the field and supplies its arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct MergedField {
    fields: Vec<Arc<Field>>,
}

impl MergedField {
    /// Merged field made of a single node.
    pub fn new(field: Arc<Field>) -> Self {
        Self {
            fields: vec![field],
        }
    }

    fn push(&mut self, field: Arc<Field>) {
        self.fields.push(field);
    }

    /// Name of the field in the schema.
    pub fn name(&self) -> &ArcStr {
        &self.single_field().name
    }

    /// Key of the field in the response, i.e. its alias or name.
    pub fn result_key(&self) -> &ArcStr {
        self.single_field().response_key()
    }

    /// First field node.
    pub fn single_field(&self) -> &Arc<Field> {
        &self.fields[0]
    }

    /// Every merged field node.
    pub fn fields(&self) -> &[Arc<Field>] {
        &self.fields
    }

    /// Arguments of the first field node.
    pub fn arguments(&self) -> &[(ArcStr, InputValue)] {
        &self.single_field().arguments
    }

    /// Position of the first field node.
    pub fn position(&self) -> SourcePosition {
        self.single_field().position
    }

    /// Concatenated sub-selections of every merged node.
    pub fn sub_selections(&self) -> impl Iterator<Item = &Selection> {
        self.fields
            .iter()
            .filter_map(|f| f.selection_set.as_deref())
            .flatten()
    }
}

/// Fields of a selection set, grouped by response key.
///
/// Keys iterate in first-occurrence order, which the response keeps.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollectedFields {
    fields: IndexMap<ArcStr, MergedField>,
}

impl CollectedFields {
    /// Response keys in collection order.
    pub fn keys(&self) -> impl Iterator<Item = &ArcStr> {
        self.fields.keys()
    }

    /// Merged field of a response key.
    pub fn get(&self, key: &str) -> Option<&MergedField> {
        self.fields.get(key)
    }

    /// Pairs of response keys and merged fields in collection order.
    pub fn iter(&self) -> impl Iterator<Item = (&ArcStr, &MergedField)> {
        self.fields.iter()
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Where and how a selection set is collected.
pub struct FieldCollectorParameters<'a> {
    schema: &'a SchemaType,
    fragments: &'a FnvHashMap<ArcStr, Arc<Fragment>>,
    object_type: &'a str,
    filter: SelectionFilter,
}

impl<'a> FieldCollectorParameters<'a> {
    /// Collects for objects of `object_type` using the schema and fragments
    /// of `ctx`.
    pub fn new(ctx: &'a ExecutionContext, object_type: &'a str, filter: SelectionFilter) -> Self {
        Self {
            schema: ctx.schema(),
            fragments: ctx.fragments(),
            object_type,
            filter,
        }
    }

    /// Concrete object type the selections are collected for.
    pub fn object_type(&self) -> &str {
        self.object_type
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    pub fn filter(&self) -> SelectionFilter {
        self.filter
    }
}

/// Flattens `selections` into the fields to resolve on an object of
/// `params.object_type()`.
///
/// Fragments whose type condition doesn't apply to the object type are
/// skipped, as are selections rejected by the parameters' filter. A named
/// fragment is expanded at most once per call, even if spread repeatedly.
/// Field nodes sharing a response key are merged in document order.
pub fn collect_fields<'s>(
    selections: impl IntoIterator<Item = &'s Selection>,
    variables: &Variables,
    params: &FieldCollectorParameters<'_>,
) -> Result<CollectedFields, ExecutionAbort> {
    let mut collector = Collector {
        params,
        variables,
        fields: IndexMap::new(),
        visited_fragments: FnvHashSet::default(),
    };
    for selection in selections {
        collector.collect(selection)?;
    }
    Ok(CollectedFields {
        fields: collector.fields,
    })
}

struct Collector<'p, 'v> {
    params: &'p FieldCollectorParameters<'p>,
    variables: &'v Variables,
    fields: IndexMap<ArcStr, MergedField>,
    visited_fragments: FnvHashSet<ArcStr>,
}

impl Collector<'_, '_> {
    fn collect(&mut self, selection: &Selection) -> Result<(), ExecutionAbort> {
        match selection {
            Selection::Field(field) => {
                if !self.includes(&field.directives)? {
                    return Ok(());
                }
                match self.fields.entry(field.response_key().clone()) {
                    Entry::Occupied(mut e) => e.get_mut().push(field.clone()),
                    Entry::Vacant(e) => {
                        e.insert(MergedField::new(field.clone()));
                    }
                }
            }
            Selection::InlineFragment(fragment) => {
                if !self.includes(&fragment.directives)? {
                    return Ok(());
                }
                if let Some(cond) = &fragment.type_condition {
                    if !self.applies(cond) {
                        return Ok(());
                    }
                }
                for selection in &fragment.selection_set {
                    self.collect(selection)?;
                }
            }
            Selection::FragmentSpread(spread) => {
                if self.visited_fragments.contains(&spread.name)
                    || !self.includes(&spread.directives)?
                {
                    return Ok(());
                }
                self.visited_fragments.insert(spread.name.clone());

                let fragments = self.params.fragments;
                let fragment = fragments
                    .get(&spread.name)
                    .ok_or_else(|| ExecutionAbort::UnknownFragment(spread.name.clone()))?;
                if !self.includes(&fragment.directives)? || !self.applies(&fragment.type_condition)
                {
                    return Ok(());
                }
                for selection in &fragment.selection_set {
                    self.collect(selection)?;
                }
            }
        }
        Ok(())
    }

    fn includes(&self, directives: &[Directive]) -> Result<bool, ExecutionAbort> {
        Ok(self.params.filter.include_node(self.variables, directives)?)
    }

    fn applies(&self, type_condition: &str) -> bool {
        self.params
            .schema
            .does_type_condition_apply(type_condition, self.params.object_type)
    }
}
