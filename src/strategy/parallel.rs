use async_trait::async_trait;
use futures::{StreamExt as _, stream::FuturesOrdered};

use crate::{
    executor::{ExecutionAbort, ExecutionContext, SelectionFilter},
    value::Object,
};

use super::{ExecutionStrategy, ExecutionStrategyParameters, assemble, resolve_field};

/// Starts every sibling field at once and awaits them together.
///
/// The response keeps collection order regardless of the order in which
/// fields complete. Sub-selections are resolved the same way.
#[derive(Clone, Copy, Debug)]
pub struct ParallelExecutionStrategy {
    filter: SelectionFilter,
}

impl Default for ParallelExecutionStrategy {
    fn default() -> Self {
        Self {
            filter: SelectionFilter::NonDeferredOnly,
        }
    }
}

impl ParallelExecutionStrategy {
    /// Strategy leaving deferred fragments out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the top-level selection set with `filter` instead.
    ///
    /// With [`SelectionFilter::DeferredOnly`] only the deferred fields are
    /// resolved, sub-selections and all.
    #[must_use]
    pub fn with_selection_filter(mut self, filter: SelectionFilter) -> Self {
        self.filter = filter;
        self
    }
}

#[async_trait]
impl ExecutionStrategy for ParallelExecutionStrategy {
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        params: ExecutionStrategyParameters,
    ) -> Result<Option<Object>, ExecutionAbort> {
        tracing::trace!(
            path = %params.step_info.path(),
            fields = params.fields.len(),
            "resolving fields in parallel",
        );

        let mut pending = params
            .fields
            .iter()
            .map(|(_, field)| resolve_field(self, ctx, &params, field))
            .collect::<FuturesOrdered<_>>();

        let mut values = Vec::with_capacity(params.fields.len());
        while let Some(value) = pending.next().await {
            values.push(value?);
        }

        Ok(assemble(ctx, params.fields.keys().cloned(), values))
    }

    fn selection_filter(&self) -> SelectionFilter {
        self.filter
    }
}
