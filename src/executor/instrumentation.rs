use super::ExecutionStepInfo;

/// Observer of an execution.
///
/// Every hook defaults to doing nothing.
pub trait Instrumentation: Send + Sync {
    /// An operation starts executing.
    fn begin_execution(&self, _operation_name: Option<&str>) {}

    /// An operation finished executing with `_error_count` errors.
    fn end_execution(&self, _error_count: usize) {}

    /// A field's data fetcher is about to run.
    fn begin_field_fetch(&self, _step_info: &ExecutionStepInfo) {}

    /// A field's raw value was fetched and unboxed, or failed to.
    fn end_field_fetch(&self, _step_info: &ExecutionStepInfo, _failed: bool) {}
}

/// Observes nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopInstrumentation;

impl Instrumentation for NoopInstrumentation {}

/// Emits `tracing` events for every hook.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingInstrumentation;

impl Instrumentation for TracingInstrumentation {
    fn begin_execution(&self, operation_name: Option<&str>) {
        tracing::info!(operation = operation_name.unwrap_or_default(), "execution started");
    }

    fn end_execution(&self, error_count: usize) {
        tracing::info!(errors = error_count, "execution finished");
    }

    fn begin_field_fetch(&self, step_info: &ExecutionStepInfo) {
        tracing::trace!(path = %step_info.path(), field_type = %step_info.field_type(), "fetching field");
    }

    fn end_field_fetch(&self, step_info: &ExecutionStepInfo, failed: bool) {
        tracing::trace!(path = %step_info.path(), failed, "fetched field");
    }
}
