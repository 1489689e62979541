use super::{ExecutionContext, ExecutionError, ExecutionStepInfo, FieldError, MergedField, ResultPath};

/// Failure of a single field, as handed to a [`DataFetcherExceptionHandler`].
#[derive(Clone, Copy)]
pub struct DataFetcherExceptionHandlerParameters<'a> {
    pub(crate) exception: &'a FieldError,
    pub(crate) field: &'a MergedField,
    pub(crate) step_info: &'a ExecutionStepInfo,
    pub(crate) execution_context: &'a ExecutionContext,
}

impl<'a> DataFetcherExceptionHandlerParameters<'a> {
    /// The failure.
    pub fn exception(&self) -> &'a FieldError {
        self.exception
    }

    /// Field whose fetch failed.
    pub fn field(&self) -> &'a MergedField {
        self.field
    }

    /// Response path of the failed field.
    pub fn path(&self) -> &'a ResultPath {
        self.step_info.path()
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    pub fn step_info(&self) -> &'a ExecutionStepInfo {
        self.step_info
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    pub fn execution_context(&self) -> &'a ExecutionContext {
        self.execution_context
    }
}

/// Policy deciding what a failed field fetch leaves behind.
///
/// Whatever the policy does, the failed field resolves to `null`.
pub trait DataFetcherExceptionHandler: Send + Sync {
    /// Handles one failure.
    fn accept(&self, params: DataFetcherExceptionHandlerParameters<'_>);
}

/// Records an "exception while fetching data" error at the failed field's
/// path and location, and logs it.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleDataFetcherExceptionHandler;

impl DataFetcherExceptionHandler for SimpleDataFetcherExceptionHandler {
    fn accept(&self, params: DataFetcherExceptionHandlerParameters<'_>) {
        let error = ExecutionError::exception_while_fetching(
            params.field().position(),
            params.path().clone(),
            params.exception().clone(),
        );
        tracing::warn!(
            path = %params.path(),
            field = %params.field().name(),
            error = params.exception().message(),
            "{}",
            error.message(),
        );
        params.execution_context().add_error(error);
    }
}
