use async_trait::async_trait;

use crate::{
    executor::{ExecutionAbort, ExecutionContext, SelectionFilter},
    value::Object,
};

use super::{
    ExecutionStrategy, ExecutionStrategyParameters, ParallelExecutionStrategy, assemble,
    resolve_field,
};

/// Resolves top-level fields one after another.
///
/// A field, its sub-selections included, completes before the next one
/// starts. Sub-selections are resolved with a [`ParallelExecutionStrategy`].
/// This is what mutations need.
#[derive(Clone, Copy, Debug)]
pub struct SerialExecutionStrategy {
    filter: SelectionFilter,
    nested: ParallelExecutionStrategy,
}

impl Default for SerialExecutionStrategy {
    fn default() -> Self {
        Self {
            filter: SelectionFilter::NonDeferredOnly,
            nested: ParallelExecutionStrategy::default(),
        }
    }
}

impl SerialExecutionStrategy {
    /// Strategy leaving deferred fragments out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the top-level selection set with `filter` instead.
    #[must_use]
    pub fn with_selection_filter(self, filter: SelectionFilter) -> Self {
        Self {
            filter,
            nested: self.nested.with_selection_filter(filter),
        }
    }
}

#[async_trait]
impl ExecutionStrategy for SerialExecutionStrategy {
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        params: ExecutionStrategyParameters,
    ) -> Result<Option<Object>, ExecutionAbort> {
        let mut values = Vec::with_capacity(params.fields.len());
        for (key, field) in params.fields.iter() {
            tracing::trace!(path = %params.step_info.path(), %key, "resolving serially");
            values.push(resolve_field(&self.nested, ctx, &params, field).await?);
        }

        Ok(assemble(ctx, params.fields.keys().cloned(), values))
    }

    fn selection_filter(&self) -> SelectionFilter {
        self.filter
    }
}
