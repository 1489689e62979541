//! Unwrapping of fetched values.
//!
//! A [`DataFetcher`] may hand back its value wrapped in a result envelope,
//! an asynchronous handle, or an optional, in any combination. Before a field
//! is completed, its raw value is fed through a chain of [`ValueUnboxer`]s
//! until none of them changes it anymore.
//!
//! [`DataFetcher`]: super::DataFetcher

use std::{any::Any, fmt, future::Future, sync::Arc};

use async_trait::async_trait;
use derive_more::with_trait::{Display, Error};
use futures::future::{self, BoxFuture, FutureExt as _};

use crate::{position::SourcePosition, value::Value};

use super::{
    CancellationNode, ErrorClassification, ExecutionContext, ExecutionError, ExecutionStepInfo,
    FieldError, FieldResult,
};

/// Arbitrary value a field hands down to the fetchers of its sub-fields.
pub type LocalContext = Arc<dyn Any + Send + Sync>;

/// Raw value returned by a data fetcher.
pub enum FetchedValue {
    /// Plain value, nothing to unwrap.
    Value(Value),
    /// Value together with errors and a local context.
    Result(DataFetcherResult),
    /// Value that becomes available later.
    Async(FetchHandle),
    /// Value that may be absent.
    Optional(Option<Box<FetchedValue>>),
}

impl FetchedValue {
    /// Plain value.
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    /// Value resolved by `future`.
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = FieldResult<FetchedValue>> + Send + 'static,
    {
        Self::Async(FetchHandle::new(future))
    }

    /// Optional-like value.
    pub fn optional(value: Option<FetchedValue>) -> Self {
        Self::Optional(value.map(Box::new))
    }

    /// Makes every asynchronous handle nested in this value abort once
    /// `node` is cancelled.
    ///
    /// Handles only become visible once their enclosing handle settled, so
    /// the [`AsyncValueUnboxer`] registers what a handle settles with again.
    #[must_use]
    pub fn register_cancellation(self, node: &Arc<CancellationNode>) -> Self {
        match self {
            Self::Async(handle) => Self::Async(handle.register_cancellation(node)),
            Self::Result(mut result) => {
                result.data = Box::new(result.data.register_cancellation(node));
                Self::Result(result)
            }
            Self::Optional(Some(inner)) => {
                Self::Optional(Some(Box::new(inner.register_cancellation(node))))
            }
            v @ (Self::Value(_) | Self::Optional(None)) => v,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Result(_) => "result",
            Self::Async(_) => "async",
            Self::Optional(_) => "optional",
        }
    }
}

impl fmt::Debug for FetchedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Result(r) => f.debug_tuple("Result").field(r).finish(),
            Self::Async(_) => f.write_str("Async(..)"),
            Self::Optional(o) => f.debug_tuple("Optional").field(o).finish(),
        }
    }
}

impl From<Value> for FetchedValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<DataFetcherResult> for FetchedValue {
    fn from(result: DataFetcherResult) -> Self {
        Self::Result(result)
    }
}

impl From<FetchHandle> for FetchedValue {
    fn from(handle: FetchHandle) -> Self {
        Self::Async(handle)
    }
}

/// Result envelope of a data fetcher: the data plus errors to report and an
/// optional local context for the sub-fields.
///
/// ```rust
/// # use graphql_execution::{DataFetcherResult, FieldError, Value};
/// let result = DataFetcherResult::new(Value::scalar("partial"))
///     .error(FieldError::from("first source unavailable"))
///     .local_context(42_u64);
///
/// assert!(result.has_errors());
/// ```
#[derive(Debug)]
pub struct DataFetcherResult {
    data: Box<FetchedValue>,
    errors: Vec<FieldError>,
    local_context: Option<LocalContext>,
}

impl DataFetcherResult {
    /// Envelope of `data` without errors.
    pub fn new(data: impl Into<FetchedValue>) -> Self {
        Self {
            data: Box::new(data.into()),
            errors: Vec::new(),
            local_context: None,
        }
    }

    /// Adds an error to report.
    #[must_use]
    pub fn error(mut self, error: impl Into<FieldError>) -> Self {
        self.errors.push(error.into());
        self
    }

    /// Adds errors to report.
    #[must_use]
    pub fn errors(mut self, errors: impl IntoIterator<Item = FieldError>) -> Self {
        self.errors.extend(errors);
        self
    }

    /// Sets the local context handed to the sub-fields.
    #[must_use]
    pub fn local_context<T: Any + Send + Sync>(mut self, context: T) -> Self {
        self.local_context = Some(Arc::new(context));
        self
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    pub fn data(&self) -> &FetchedValue {
        &self.data
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Outcome of waiting on a [`FetchHandle`].
#[derive(Debug)]
pub enum Settled {
    /// The value became available.
    Success(FetchedValue),
    /// Producing the value failed.
    Failure(FieldError),
    /// Waiting was cancelled.
    Interrupted,
}

/// Handle of a value that becomes available later.
pub struct FetchHandle(BoxFuture<'static, Settled>);

impl FetchHandle {
    /// Handle settling with the output of `future`.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = FieldResult<FetchedValue>> + Send + 'static,
    {
        Self(
            future
                .map(|res| match res {
                    Ok(v) => Settled::Success(v),
                    Err(e) => Settled::Failure(e),
                })
                .boxed(),
        )
    }

    /// Makes this handle settle as [`Settled::Interrupted`] once `node` is
    /// cancelled. Already cancelled nodes interrupt it straight away.
    ///
    /// The registration on `node` ends as soon as the handle settles.
    #[must_use]
    pub fn register_cancellation(self, node: &Arc<CancellationNode>) -> Self {
        let (fut, abort) = future::abortable(self.0);
        let registration = node.scoped_cancellation_callback(move || abort.abort());
        Self(
            async move {
                let _registration = registration;
                fut.await.unwrap_or(Settled::Interrupted)
            }
            .boxed(),
        )
    }

    /// Waits for this handle to settle.
    pub async fn settle(self) -> Settled {
        self.0.await
    }
}

/// Failure to unbox a fetched value.
#[derive(Debug, Display, Error)]
pub enum UnboxError {
    /// An asynchronous value settled with a failure.
    #[display("{}", _0.message())]
    Failed(#[error(not(source))] FieldError),

    /// Waiting on an asynchronous value was cancelled.
    #[display("Interrupted while waiting on an asynchronous value")]
    Interrupted,

    /// More wrapper layers than allowed.
    #[display("Exceeded the maximum unboxing depth of {_0}")]
    DepthExceeded(#[error(not(source))] usize),

    /// No unboxer accepts the wrapper.
    #[display("No unboxer accepts a value of kind `{_0}`")]
    Unresolved(#[error(not(source))] &'static str),
}

/// Output of a single [`ValueUnboxer`].
#[derive(Debug)]
pub enum Unboxed {
    /// The unboxer unwrapped the value.
    Matched(FetchedValue),
    /// The unboxer doesn't handle this value, which is returned untouched.
    Unmatched(FetchedValue),
}

/// Single link of the unboxing chain.
///
/// Implementations must return values they don't handle as
/// [`Unboxed::Unmatched`] without modifying them.
#[async_trait]
pub trait ValueUnboxer: Send + Sync {
    /// Unwraps one layer of `value`, if this unboxer handles it.
    ///
    /// Implementations may feed the unwrapped content back through the whole
    /// chain with [`UnboxingContext::unbox`].
    async fn unbox(
        &self,
        value: FetchedValue,
        ctx: &mut UnboxingContext<'_>,
    ) -> Result<Unboxed, UnboxError>;
}

/// State of unboxing the value of one field.
pub struct UnboxingContext<'a> {
    execution: &'a ExecutionContext,
    step_info: &'a ExecutionStepInfo,
    position: SourcePosition,
    local_context: Option<LocalContext>,
    unboxers: &'a [Arc<dyn ValueUnboxer>],
    unwrapped: usize,
}

impl<'a> UnboxingContext<'a> {
    /// Unboxes with the chain configured on `execution`, starting with the
    /// local context inherited from the parent field.
    pub fn new(
        execution: &'a ExecutionContext,
        step_info: &'a ExecutionStepInfo,
        position: SourcePosition,
        local_context: Option<LocalContext>,
    ) -> Self {
        Self {
            execution,
            step_info,
            position,
            local_context,
            unboxers: execution.value_unboxers(),
            unwrapped: 0,
        }
    }

    /// Records an error at the field being unboxed.
    pub fn add_error(&self, error: FieldError) {
        self.execution.add_error(ExecutionError::new(
            self.position,
            self.step_info.path().clone(),
            error,
            ErrorClassification::DataFetchingException,
        ));
    }

    /// Replaces the local context handed to the sub-fields.
    pub fn set_local_context(&mut self, context: LocalContext) {
        self.local_context = Some(context);
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    pub fn local_context(&self) -> Option<&LocalContext> {
        self.local_context.as_ref()
    }

    /// Consumes this context, returning the local context for the sub-fields.
    pub fn into_local_context(self) -> Option<LocalContext> {
        self.local_context
    }

    /// Cancellation registry node of the execution.
    pub fn cancellation(&self) -> &Arc<CancellationNode> {
        self.execution.cancellation()
    }

    /// Step of the field being unboxed.
    pub fn step_info(&self) -> &ExecutionStepInfo {
        self.step_info
    }

    /// Feeds `value` through the chain until no unboxer changes it.
    ///
    /// Plain values come back as they are.
    ///
    /// # Errors
    ///
    /// If an unboxer fails, if more wrapper layers than the configured
    /// maximum are unwrapped in total, or if a wrapper remains that no
    /// unboxer accepts.
    pub async fn unbox(&mut self, mut value: FetchedValue) -> Result<Value, UnboxError> {
        let unboxers = self.unboxers;
        loop {
            let mut changed = false;
            for unboxer in unboxers {
                value = match unboxer.unbox(value, self).await? {
                    Unboxed::Matched(v) => {
                        self.unwrapped += 1;
                        let max_depth = self.execution.options().max_unbox_depth;
                        if self.unwrapped > max_depth {
                            return Err(UnboxError::DepthExceeded(max_depth));
                        }
                        changed = true;
                        v
                    }
                    Unboxed::Unmatched(v) => v,
                };
            }
            if !changed {
                break;
            }
        }

        match value {
            FetchedValue::Value(v) => Ok(v),
            other => Err(UnboxError::Unresolved(other.kind())),
        }
    }
}

/// Unwraps [`DataFetcherResult`]s: reports their errors, installs their
/// local context, and unboxes their data.
#[derive(Clone, Copy, Debug, Default)]
pub struct DataFetcherResultUnboxer;

#[async_trait]
impl ValueUnboxer for DataFetcherResultUnboxer {
    async fn unbox(
        &self,
        value: FetchedValue,
        ctx: &mut UnboxingContext<'_>,
    ) -> Result<Unboxed, UnboxError> {
        let FetchedValue::Result(result) = value else {
            return Ok(Unboxed::Unmatched(value));
        };
        let DataFetcherResult {
            data,
            errors,
            local_context,
        } = result;

        for error in errors {
            ctx.add_error(error);
        }
        if let Some(local_context) = local_context {
            ctx.set_local_context(local_context);
        }
        let data = ctx.unbox(*data).await?;
        Ok(Unboxed::Matched(FetchedValue::Value(data)))
    }
}

/// Waits on [`FetchHandle`]s.
///
/// A failure of the handle is passed on unchanged as
/// [`UnboxError::Failed`].
#[derive(Clone, Copy, Debug, Default)]
pub struct AsyncValueUnboxer;

#[async_trait]
impl ValueUnboxer for AsyncValueUnboxer {
    async fn unbox(
        &self,
        value: FetchedValue,
        ctx: &mut UnboxingContext<'_>,
    ) -> Result<Unboxed, UnboxError> {
        let FetchedValue::Async(handle) = value else {
            return Ok(Unboxed::Unmatched(value));
        };
        match handle.settle().await {
            Settled::Success(v) => {
                let v = v.register_cancellation(ctx.cancellation());
                Ok(Unboxed::Matched(FetchedValue::Value(ctx.unbox(v).await?)))
            }
            Settled::Failure(e) => Err(UnboxError::Failed(e)),
            Settled::Interrupted => {
                tracing::debug!(path = %ctx.step_info().path(), "interrupted while waiting for value");
                Err(UnboxError::Interrupted)
            }
        }
    }
}

/// Unwraps optional-like values, passing everything else through.
///
/// Used both for fetched values and wherever a possibly optional value must
/// be normalized.
pub trait PossibleOptionalUnboxer: Send + Sync {
    /// Returns the content of `value` if it is optional-like (`null` when
    /// absent), or `value` unchanged otherwise.
    fn unbox_possible_optional(&self, value: FetchedValue) -> FetchedValue;
}

/// Unwraps [`FetchedValue::Optional`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultOptionalUnboxer;

impl PossibleOptionalUnboxer for DefaultOptionalUnboxer {
    fn unbox_possible_optional(&self, value: FetchedValue) -> FetchedValue {
        match value {
            FetchedValue::Optional(Some(inner)) => *inner,
            FetchedValue::Optional(None) => FetchedValue::Value(Value::null()),
            other => other,
        }
    }
}

/// Plugs a [`PossibleOptionalUnboxer`] into the unboxing chain.
#[derive(Clone, Copy, Debug, Default)]
pub struct OptionalValueUnboxer<U = DefaultOptionalUnboxer>(pub U);

#[async_trait]
impl<U: PossibleOptionalUnboxer> ValueUnboxer for OptionalValueUnboxer<U> {
    async fn unbox(
        &self,
        value: FetchedValue,
        _: &mut UnboxingContext<'_>,
    ) -> Result<Unboxed, UnboxError> {
        if !matches!(value, FetchedValue::Optional(_)) {
            return Ok(Unboxed::Unmatched(value));
        }
        Ok(Unboxed::Matched(self.0.unbox_possible_optional(value)))
    }
}

/// Envelope, then asynchronous handle, then optional.
pub fn default_value_unboxers() -> Vec<Arc<dyn ValueUnboxer>> {
    vec![
        Arc::new(DataFetcherResultUnboxer),
        Arc::new(AsyncValueUnboxer),
        Arc::new(OptionalValueUnboxer(DefaultOptionalUnboxer)),
    ]
}
