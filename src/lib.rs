#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

use std::fmt;

#[doc(inline)]
pub use futures::future::BoxFuture;

#[macro_use]
mod value;

pub mod ast;
mod executor;
mod position;
pub mod schema;
mod strategy;

#[cfg(test)]
mod executor_tests;

use crate::ast::{Document, OperationType};

pub use crate::{
    executor::{
        Arguments, AsyncValueUnboxer, CancellationGuard, CancellationNode, CodeRegistry,
        CollectedFields, DEFER, DataFetcher, DataFetcherExceptionHandler,
        DataFetcherExceptionHandlerParameters,
        DataFetcherResult, DataFetcherResultUnboxer, DataFetchingEnvironment,
        DefaultOptionalUnboxer, DefaultResponseMapFactory, DirectiveError, ErrorClassification,
        Execution, ExecutionAbort, ExecutionContext, ExecutionContextBuilder, ExecutionError,
        ExecutionOptions, ExecutionOutput, ExecutionStepInfo, FetchHandle, FetchedValue,
        FieldCollectorParameters, FieldError, FieldResult, FnDataFetcher, INCLUDE,
        Instrumentation, LocalContext, MergedField, NoopInstrumentation, OptionalValueUnboxer,
        PathSegment, PossibleOptionalUnboxer, PropertyDataFetcher, ResponseMapFactory,
        ResultPath, ResultPathParseError, SKIP, SelectionFilter, Settled,
        SimpleDataFetcherExceptionHandler, TracingInstrumentation, UnboxError, Unboxed,
        UnboxingContext, ValueUnboxer, Variables, collect_fields, default_value_unboxers,
        get_operation, is_deferred, should_include,
    },
    position::SourcePosition,
    strategy::{
        ExecutionStrategy, ExecutionStrategyParameters, ParallelExecutionStrategy,
        SerialExecutionStrategy, SimpleExecutionStrategy,
    },
    value::{Object, ScalarValue, Value},
};

/// An error that prevented query execution
#[derive(Clone, Debug, PartialEq)]
#[expect(missing_docs, reason = "self-explanatory")]
pub enum GraphQLError {
    NoOperationProvided,
    MultipleOperationsProvided,
    UnknownOperationName,
    OperationNotSupported(OperationType),
    Aborted(ExecutionAbort),
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOperationProvided => write!(f, "No operation provided"),
            Self::MultipleOperationsProvided => write!(f, "Multiple operations provided"),
            Self::UnknownOperationName => write!(f, "Unknown operation name"),
            Self::OperationNotSupported(ty) => {
                write!(f, "Operation type \"{ty}\" is not supported by the schema")
            }
            Self::Aborted(e) => write!(f, "Execution aborted: {e}"),
        }
    }
}

impl std::error::Error for GraphQLError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Aborted(e) => Some(e),
            Self::NoOperationProvided
            | Self::MultipleOperationsProvided
            | Self::UnknownOperationName
            | Self::OperationNotSupported(_) => None,
        }
    }
}

impl From<ExecutionAbort> for GraphQLError {
    fn from(e: ExecutionAbort) -> Self {
        Self::Aborted(e)
    }
}

/// Execute an already validated document with the default strategies
///
/// Queries resolve their fields in parallel, mutations serially.
pub async fn execute(
    document: &Document,
    operation_name: Option<&str>,
    variables: &Variables,
    root_value: Value,
    context: ExecutionContextBuilder,
) -> Result<ExecutionOutput, GraphQLError> {
    Execution::new()
        .execute(document, operation_name, variables, root_value, context)
        .await
}

/// Execute an already validated document synchronously
///
/// Every field, nested ones included, is resolved one after another on the
/// calling thread with a [`SimpleExecutionStrategy`]. Asynchronous fetched
/// values are driven to completion on that thread too.
pub fn execute_sync(
    document: &Document,
    operation_name: Option<&str>,
    variables: &Variables,
    root_value: Value,
    context: ExecutionContextBuilder,
) -> Result<ExecutionOutput, GraphQLError> {
    let execution = Execution::new()
        .query_strategy(SimpleExecutionStrategy)
        .mutation_strategy(SimpleExecutionStrategy);
    futures::executor::block_on(execution.execute(
        document,
        operation_name,
        variables,
        root_value,
        context,
    ))
}
