//! Scheduling of sibling field resolution.
//!
//! Every strategy resolves the collected fields of one selection set against
//! a parent value and assembles them into an object in collection order.
//! They differ only in how sibling fields are scheduled.

mod parallel;
mod serial;
mod simple;

use std::sync::Arc;

use arcstr::ArcStr;
use async_trait::async_trait;
use futures::future::{self, BoxFuture};

use crate::{
    executor::{
        CollectedFields, DataFetcherExceptionHandlerParameters, DataFetchingEnvironment,
        ErrorClassification, ExecutionAbort, ExecutionContext, ExecutionError, ExecutionStepInfo,
        FieldCollectorParameters, FieldError, LocalContext, MergedField, SelectionFilter,
        UnboxError, UnboxingContext, collect_fields,
    },
    schema::model::TYPENAME_FIELD,
    value::{Object, Value},
};

pub use self::{
    parallel::ParallelExecutionStrategy, serial::SerialExecutionStrategy,
    simple::SimpleExecutionStrategy,
};

/// What a strategy resolves.
pub struct ExecutionStrategyParameters {
    /// Fields to resolve, in response order.
    pub fields: CollectedFields,
    /// Value of the parent object.
    pub source: Value,
    /// Step of the parent object.
    pub step_info: Arc<ExecutionStepInfo>,
    /// Concrete object type of the parent object.
    pub object_type: ArcStr,
    /// Local context handed down from the parent field.
    pub local_context: Option<LocalContext>,
}

/// Resolves the fields of one selection set.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    /// Resolves `params.fields` on `params.source`.
    ///
    /// Field failures are recorded on `ctx` and don't fail this call.
    /// Returns [`None`] if a non-null field resolved to `null`, which makes
    /// the whole object `null`.
    ///
    /// # Errors
    ///
    /// If resolution can't continue: a validation-class failure, a contract
    /// violation, or cancellation.
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        params: ExecutionStrategyParameters,
    ) -> Result<Option<Object>, ExecutionAbort>;

    /// Filter the top-level selection set is collected with.
    ///
    /// Nested selection sets are collected with its
    /// [`nested`](SelectionFilter::nested) variant.
    fn selection_filter(&self) -> SelectionFilter;
}

/// Resolves a single field of `params.source`.
///
/// Sub-selections are resolved with `nested`. Returns [`None`] if `null`
/// ended up at a non-null position.
pub(crate) async fn resolve_field(
    nested: &dyn ExecutionStrategy,
    ctx: &ExecutionContext,
    params: &ExecutionStrategyParameters,
    field: &MergedField,
) -> Result<Option<Value>, ExecutionAbort> {
    if ctx.cancellation().is_cancelled() {
        return Err(ExecutionAbort::Cancelled);
    }

    if field.name().as_str() == TYPENAME_FIELD {
        return Ok(Some(Value::scalar(params.object_type.as_str())));
    }

    let field_type = ctx
        .schema()
        .field_type(&params.object_type, field.name())
        .ok_or_else(|| ExecutionAbort::UnknownField {
            parent_type: params.object_type.clone(),
            field: field.name().clone(),
        })?;
    let step = ExecutionStepInfo::create_for_field(
        ctx,
        &params.step_info,
        field,
        field_type,
        &params.object_type,
        params.step_info.path().segment(field.result_key().as_str()),
    );

    match fetch_field(ctx, params, field, &step).await? {
        Ok((value, local_context)) => {
            complete_value(nested, ctx, &step, field, value, local_context).await
        }
        Err(exception) => {
            ctx.exception_handler()
                .accept(DataFetcherExceptionHandlerParameters {
                    exception: &exception,
                    field,
                    step_info: &step,
                    execution_context: ctx,
                });
            Ok(nullable(&step))
        }
    }
}

/// Fetches and unboxes the value of `field`.
///
/// The inner result carries failures the exception handler takes care of.
async fn fetch_field(
    ctx: &ExecutionContext,
    params: &ExecutionStrategyParameters,
    field: &MergedField,
    step: &Arc<ExecutionStepInfo>,
) -> Result<Result<(Value, Option<LocalContext>), FieldError>, ExecutionAbort> {
    let fetcher = ctx.code_registry().get(&params.object_type, field.name());
    ctx.instrumentation().begin_field_fetch(step);

    let env = DataFetchingEnvironment {
        source: &params.source,
        step_info: step,
        field,
        local_context: params.local_context.as_ref(),
        execution_context: ctx,
    };
    let (fetch, abort) = future::abortable(fetcher.fetch(env));
    let fetched = {
        let _registration = ctx
            .cancellation()
            .scoped_cancellation_callback(move || abort.abort());
        fetch.await
    };
    let outcome = match fetched {
        Err(future::Aborted) => {
            tracing::debug!(path = %step.path(), "interrupted while fetching");
            Err(ExecutionAbort::Interrupted(step.path().clone()))
        }
        Ok(Err(e)) => Ok(Err(e)),
        Ok(Ok(raw)) => {
            let raw = raw.register_cancellation(ctx.cancellation());
            let mut unboxing =
                UnboxingContext::new(ctx, step, field.position(), params.local_context.clone());
            match unboxing.unbox(raw).await {
                Ok(value) => Ok(Ok((value, unboxing.into_local_context()))),
                Err(UnboxError::Failed(e)) => Ok(Err(e)),
                Err(UnboxError::Interrupted) => {
                    Err(ExecutionAbort::Interrupted(step.path().clone()))
                }
                Err(UnboxError::DepthExceeded(max_depth)) => {
                    Err(ExecutionAbort::UnboxDepthExceeded {
                        path: step.path().clone(),
                        max_depth,
                    })
                }
                Err(UnboxError::Unresolved(_)) => {
                    Err(ExecutionAbort::Unresolved(step.path().clone()))
                }
            }
        }
    };

    ctx.instrumentation()
        .end_field_fetch(step, !matches!(outcome, Ok(Ok(_))));
    outcome
}

// Boxed, as completing lists and objects recurses.
fn complete_value<'a>(
    nested: &'a dyn ExecutionStrategy,
    ctx: &'a ExecutionContext,
    step: &'a Arc<ExecutionStepInfo>,
    field: &'a MergedField,
    value: Value,
    local_context: Option<LocalContext>,
) -> BoxFuture<'a, Result<Option<Value>, ExecutionAbort>> {
    Box::pin(async move {
        if value.is_null() {
            return Ok(null_value(ctx, step, field));
        }
        if step.is_list_type() {
            return complete_list(nested, ctx, step, field, value, local_context).await;
        }

        let type_name = step.field_type().innermost_name();
        let meta = ctx
            .schema()
            .concrete_type_by_name(type_name)
            .ok_or_else(|| ExecutionAbort::UnknownType(type_name.into()))?;

        if meta.is_leaf() {
            return Ok(match meta.serialize(&value) {
                Ok(v) => Some(v),
                Err(e) => {
                    ctx.add_error(ExecutionError::new(
                        field.position(),
                        step.path().clone(),
                        e,
                        ErrorClassification::ValidationError,
                    ));
                    nullable(step)
                }
            });
        }

        let object_type = if meta.is_abstract() {
            ctx.schema()
                .resolve_concrete_type(type_name, &value)
                .ok_or_else(|| ExecutionAbort::UnresolvedAbstractType(type_name.into()))?
        } else {
            meta.name().clone()
        };
        let fields = {
            let filter = nested.selection_filter().nested();
            let params = FieldCollectorParameters::new(ctx, &object_type, filter);
            collect_fields(field.sub_selections(), ctx.variables(), &params)?
        };

        tracing::trace!(path = %step.path(), %object_type, "completing object");
        let object = nested
            .execute(
                ctx,
                ExecutionStrategyParameters {
                    fields,
                    source: value,
                    step_info: step.clone(),
                    object_type,
                    local_context,
                },
            )
            .await?;

        Ok(object.map_or_else(|| nullable(step), |o| Some(Value::Object(o))))
    })
}

async fn complete_list(
    nested: &dyn ExecutionStrategy,
    ctx: &ExecutionContext,
    step: &Arc<ExecutionStepInfo>,
    field: &MergedField,
    value: Value,
    local_context: Option<LocalContext>,
) -> Result<Option<Value>, ExecutionAbort> {
    let Value::List(items) = value else {
        ctx.add_error(ExecutionError::new(
            field.position(),
            step.path().clone(),
            FieldError::from(format!(
                "Expected a list for field of type \"{}\", found: {value}",
                step.field_type(),
            )),
            ErrorClassification::ValidationError,
        ));
        return Ok(nullable(step));
    };

    let mut completed = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let element = ExecutionStepInfo::step_into_list_element(step, step.path().index(index))?;
        match complete_value(nested, ctx, &element, field, item, local_context.clone()).await? {
            Some(v) => completed.push(v),
            None => return Ok(nullable(step)),
        }
    }
    Ok(Some(Value::List(completed)))
}

/// `null` at `step`, recording a violation if its type is non-null.
fn null_value(ctx: &ExecutionContext, step: &ExecutionStepInfo, field: &MergedField) -> Option<Value> {
    if step.is_non_null_type() {
        ctx.add_error(ExecutionError::non_null_violation(
            field.position(),
            step.path().clone(),
            step.field_type(),
            step.field_container().map(ArcStr::as_str),
        ));
    }
    nullable(step)
}

/// `null` at `step` if allowed, [`None`] to null the enclosing object
/// otherwise.
fn nullable(step: &ExecutionStepInfo) -> Option<Value> {
    (!step.is_non_null_type()).then(Value::null)
}

/// Pairs `keys` with the resolved `values`, or [`None`] if any value nulls
/// the object.
fn assemble(
    ctx: &ExecutionContext,
    keys: impl IntoIterator<Item = ArcStr>,
    values: Vec<Option<Value>>,
) -> Option<Object> {
    let values = values.into_iter().collect::<Option<Vec<_>>>()?;
    Some(
        ctx.response_map_factory()
            .create_insertion_ordered(keys.into_iter().collect(), values),
    )
}
