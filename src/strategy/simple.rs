use async_trait::async_trait;

use crate::{
    executor::{ExecutionAbort, ExecutionContext, SelectionFilter},
    value::Object,
};

use super::{ExecutionStrategy, ExecutionStrategyParameters, assemble, resolve_field};

/// Resolves every field, nested ones included, strictly one after another
/// on the calling task.
///
/// Deferred fragments are resolved inline.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleExecutionStrategy;

impl SimpleExecutionStrategy {
    #[expect(missing_docs, reason = "self-explanatory")]
    pub fn new() -> Self {
        Self
    }

    /// Runs [`ExecutionStrategy::execute`] to completion on the current
    /// thread.
    ///
    /// # Errors
    ///
    /// Same as [`ExecutionStrategy::execute`].
    pub fn execute_blocking(
        &self,
        ctx: &ExecutionContext,
        params: ExecutionStrategyParameters,
    ) -> Result<Option<Object>, ExecutionAbort> {
        futures::executor::block_on(self.execute(ctx, params))
    }
}

#[async_trait]
impl ExecutionStrategy for SimpleExecutionStrategy {
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        params: ExecutionStrategyParameters,
    ) -> Result<Option<Object>, ExecutionAbort> {
        let mut values = Vec::with_capacity(params.fields.len());
        for (_, field) in params.fields.iter() {
            values.push(resolve_field(self, ctx, &params, field).await?);
        }

        Ok(assemble(ctx, params.fields.keys().cloned(), values))
    }

    fn selection_filter(&self) -> SelectionFilter {
        SelectionFilter::AllInclusive
    }
}
