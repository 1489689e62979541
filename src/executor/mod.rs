//! Resolve the document to values

use std::{
    cmp::Ordering,
    collections::HashMap,
    fmt::Display,
    sync::{Arc, Mutex, PoisonError},
};

use arcstr::ArcStr;
use derive_more::with_trait::{Display as DeriveDisplay, Error, From};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    GraphQLError,
    ast::{Definition, Document, Fragment, InputValue, Operation, OperationType, Type},
    position::SourcePosition,
    schema::model::SchemaType,
    strategy::{
        ExecutionStrategy, ExecutionStrategyParameters, ParallelExecutionStrategy,
        SerialExecutionStrategy,
    },
    value::Value,
};

mod cancellation;
mod directives;
mod exception_handler;
mod fetcher;
mod field_collector;
mod instrumentation;
mod response_map;
mod step_info;
mod unboxing;

pub use self::{
    cancellation::{CancellationGuard, CancellationNode},
    directives::{DEFER, DirectiveError, INCLUDE, SKIP, SelectionFilter, is_deferred, should_include},
    exception_handler::{
        DataFetcherExceptionHandler, DataFetcherExceptionHandlerParameters,
        SimpleDataFetcherExceptionHandler,
    },
    fetcher::{
        Arguments, CodeRegistry, DataFetcher, DataFetchingEnvironment, FnDataFetcher,
        PropertyDataFetcher,
    },
    field_collector::{CollectedFields, FieldCollectorParameters, MergedField, collect_fields},
    instrumentation::{Instrumentation, NoopInstrumentation, TracingInstrumentation},
    response_map::{DefaultResponseMapFactory, ResponseMapFactory},
    step_info::{ExecutionStepInfo, PathSegment, ResultPath, ResultPathParseError},
    unboxing::{
        AsyncValueUnboxer, DataFetcherResult, DataFetcherResultUnboxer, DefaultOptionalUnboxer,
        FetchHandle, FetchedValue, LocalContext, OptionalValueUnboxer, PossibleOptionalUnboxer,
        Settled, UnboxError, Unboxed, UnboxingContext, ValueUnboxer, default_value_unboxers,
    },
};

/// The map of variables used for substitution during query execution
pub type Variables = HashMap<String, InputValue>;

/// Error type for errors that occur during field resolution
///
/// Field errors are represented by a human-readable error message and an
/// optional `Value` structure containing additional information.
///
/// They can be converted to from any type that implements `std::fmt::Display`,
/// which makes error chaining with the `?` operator a breeze:
///
/// ```rust
/// # use graphql_execution::FieldError;
/// fn get_string(data: Vec<u8>) -> Result<String, FieldError> {
///     let s = String::from_utf8(data)?;
///     Ok(s)
/// }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    message: String,
    extensions: Value,
}

impl<T: Display> From<T> for FieldError {
    fn from(e: T) -> Self {
        Self {
            message: e.to_string(),
            extensions: Value::null(),
        }
    }
}

impl FieldError {
    /// Construct a new [`FieldError`] with additional data.
    ///
    /// The `extensions` are kept alongside the message so transports can
    /// expose them; pass `Value::null()` for none.
    pub fn new<T: Display>(e: T, extensions: Value) -> Self {
        Self {
            message: e.to_string(),
            extensions,
        }
    }

    /// Returns the `"message"` field of this [`FieldError`].
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the `"extensions"` field of this [`FieldError`].
    ///
    /// If there is no `"extensions"`, then [`Value::Null`] will be returned.
    pub fn extensions(&self) -> &Value {
        &self.extensions
    }
}

/// The result of resolving the value of a field of type `T`
pub type FieldResult<T> = Result<T, FieldError>;

/// Kind of an [`ExecutionError`].
#[derive(Clone, Copy, Debug, DeriveDisplay, Eq, Hash, PartialEq, Serialize)]
pub enum ErrorClassification {
    /// A data fetcher failed, or its result envelope carried errors.
    DataFetchingException,
    /// `null` was produced at a non-null position.
    NullValueInNonNullableField,
    /// The value produced for a field does not fit its type.
    ValidationError,
}

/// Error type for errors that occur during query execution
///
/// All execution errors contain the source position in the query of the field
/// that failed to resolve. It also contains the response path.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionError {
    location: SourcePosition,
    path: ResultPath,
    message: String,
    error: FieldError,
    classification: ErrorClassification,
}

impl ExecutionError {
    #[doc(hidden)]
    pub fn new(
        location: SourcePosition,
        path: ResultPath,
        error: FieldError,
        classification: ErrorClassification,
    ) -> Self {
        Self {
            location,
            path,
            message: error.message().to_owned(),
            error,
            classification,
        }
    }

    /// Wraps a data fetcher failure, referencing the failure in the message.
    pub fn exception_while_fetching(
        location: SourcePosition,
        path: ResultPath,
        error: FieldError,
    ) -> Self {
        Self {
            message: format!("Exception while fetching data ({path}) : {}", error.message()),
            location,
            path,
            error,
            classification: ErrorClassification::DataFetchingException,
        }
    }

    /// Records that `null` reached a position whose type forbids it.
    pub fn non_null_violation(
        location: SourcePosition,
        path: ResultPath,
        field_type: &Type,
        parent_type: Option<&str>,
    ) -> Self {
        let message = format!(
            "Cannot return null for non-nullable type: '{}' within parent '{}' ({path})",
            field_type.innermost_name(),
            parent_type.unwrap_or_default(),
        );
        Self {
            error: FieldError::from(&message),
            message,
            location,
            path,
            classification: ErrorClassification::NullValueInNonNullableField,
        }
    }

    /// The error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The underlying failure
    pub fn error(&self) -> &FieldError {
        &self.error
    }

    /// The source location _in the query_ of the field that failed to resolve
    pub fn location(&self) -> &SourcePosition {
        &self.location
    }

    /// The path of fields leading to the field that generated this error
    pub fn path(&self) -> &ResultPath {
        &self.path
    }

    /// The kind of this error
    pub fn classification(&self) -> ErrorClassification {
        self.classification
    }

    fn sort_key_cmp(&self, other: &Self) -> Ordering {
        (&self.location, self.path.segments(), &self.message).cmp(&(
            &other.location,
            other.path.segments(),
            &other.message,
        ))
    }
}

/// Failure that escapes an execution strategy.
///
/// Field-level failures are converted to [`ExecutionError`]s instead; this
/// covers validation-class failures, contract violations, and interruption.
#[derive(Clone, Debug, DeriveDisplay, Error, From, PartialEq)]
pub enum ExecutionAbort {
    /// A `@skip`/`@include` condition could not be evaluated.
    #[display("{_0}")]
    #[from]
    Directive(DirectiveError),

    /// A fragment spread references an undefined fragment.
    #[display("Unknown fragment \"{_0}\"")]
    UnknownFragment(#[error(not(source))] ArcStr),

    /// A field is requested on a type that doesn't define it.
    #[display("Field \"{field}\" not found on type \"{parent_type}\"")]
    UnknownField {
        /// Type the field was requested on.
        parent_type: ArcStr,
        /// Requested field name.
        field: ArcStr,
    },

    /// A type name doesn't exist in the schema.
    #[display("Unknown type \"{_0}\"")]
    UnknownType(#[error(not(source))] ArcStr),

    /// The concrete object type of an abstract type could not be determined.
    #[display("Cannot resolve concrete type of abstract type \"{_0}\"")]
    UnresolvedAbstractType(#[error(not(source))] ArcStr),

    /// A list element step was requested on a type that isn't a list.
    #[display("Cannot step into list element of non-list type \"{_0}\"")]
    NotAListType(#[error(not(source))] Type),

    /// The executing task was cancelled while waiting on an asynchronous
    /// value.
    #[display("Interrupted while waiting for the value of {_0}")]
    Interrupted(#[error(not(source))] ResultPath),

    /// Resolution was requested after the cancellation registry dispatched.
    #[display("Execution was cancelled")]
    Cancelled,

    /// Fetched value nesting exceeded the configured unboxing depth.
    #[display("Fetched value at {path} exceeded the maximum unboxing depth of {max_depth}")]
    UnboxDepthExceeded {
        /// Field whose value was being unboxed.
        path: ResultPath,
        /// Configured bound.
        max_depth: usize,
    },

    /// No unboxer was able to unwrap a fetched value.
    #[display("Fetched value at {_0} could not be unboxed")]
    Unresolved(#[error(not(source))] ResultPath),
}

/// Execution-wide settings.
///
/// ```rust
/// # use graphql_execution::ExecutionOptions;
/// let options: ExecutionOptions = serde_json::from_str(r#"{"maxUnboxDepth": 8}"#).unwrap();
/// assert_eq!(options.max_unbox_depth, 8);
/// assert!(!options.sort_errors);
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecutionOptions {
    /// Maximum number of wrapper layers unwrapped from a single fetched value.
    pub max_unbox_depth: usize,

    /// Sort the final errors by location and path instead of keeping the
    /// order they were recorded in.
    pub sort_errors: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            max_unbox_depth: 32,
            sort_errors: false,
        }
    }
}

/// Per-query shared state.
///
/// Created once per execution and torn down (via [`into_errors`]) when the
/// top-level result is finalized.
///
/// [`into_errors`]: ExecutionContext::into_errors
pub struct ExecutionContext {
    schema: Arc<SchemaType>,
    fragments: FnvHashMap<ArcStr, Arc<Fragment>>,
    variables: Variables,
    errors: Mutex<Vec<ExecutionError>>,
    cancellation: Arc<CancellationNode>,
    code_registry: Arc<CodeRegistry>,
    exception_handler: Arc<dyn DataFetcherExceptionHandler>,
    unboxers: Vec<Arc<dyn ValueUnboxer>>,
    response_map_factory: Arc<dyn ResponseMapFactory>,
    instrumentation: Arc<dyn Instrumentation>,
    options: ExecutionOptions,
}

static_assertions::assert_impl_all!(ExecutionContext: Send, Sync);

impl ExecutionContext {
    /// Starts building a context executing against `schema`.
    pub fn builder(schema: Arc<SchemaType>) -> ExecutionContextBuilder {
        ExecutionContextBuilder::new(schema)
    }

    /// The currently executing schema
    pub fn schema(&self) -> &SchemaType {
        &self.schema
    }

    /// Coerced variables of the executing operation.
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    #[doc(hidden)]
    pub fn fragments(&self) -> &FnvHashMap<ArcStr, Arc<Fragment>> {
        &self.fragments
    }

    /// Looks up a fragment definition of the executing document.
    pub fn fragment_by_name(&self, name: &str) -> Option<&Arc<Fragment>> {
        self.fragments.get(name)
    }

    /// Cancellation registry node of this execution.
    pub fn cancellation(&self) -> &Arc<CancellationNode> {
        &self.cancellation
    }

    /// Registry of data fetchers.
    pub fn code_registry(&self) -> &CodeRegistry {
        &self.code_registry
    }

    /// Policy turning fetcher failures into errors.
    pub fn exception_handler(&self) -> &dyn DataFetcherExceptionHandler {
        &*self.exception_handler
    }

    /// Chain applied to every fetched value.
    pub fn value_unboxers(&self) -> &[Arc<dyn ValueUnboxer>] {
        &self.unboxers
    }

    /// Factory of response objects.
    pub fn response_map_factory(&self) -> &dyn ResponseMapFactory {
        &*self.response_map_factory
    }

    /// Execution observer.
    pub fn instrumentation(&self) -> &dyn Instrumentation {
        &*self.instrumentation
    }

    /// Execution-wide settings.
    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    /// Appends an error to the shared error collection.
    pub fn add_error(&self, error: ExecutionError) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error);
    }

    /// Snapshot of the errors recorded so far, in recording order.
    pub fn errors(&self) -> Vec<ExecutionError> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of errors recorded so far.
    pub fn error_count(&self) -> usize {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Tears this context down, returning the recorded errors.
    pub fn into_errors(self) -> Vec<ExecutionError> {
        let mut errors = self
            .errors
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        if self.options.sort_errors {
            errors.sort_by(ExecutionError::sort_key_cmp);
        }
        errors
    }
}

/// Builder of an [`ExecutionContext`].
///
/// Every pluggable policy defaults to the implementation shipped with this
/// crate.
pub struct ExecutionContextBuilder {
    schema: Arc<SchemaType>,
    fragments: FnvHashMap<ArcStr, Arc<Fragment>>,
    variables: Variables,
    cancellation: Option<Arc<CancellationNode>>,
    code_registry: Arc<CodeRegistry>,
    exception_handler: Arc<dyn DataFetcherExceptionHandler>,
    unboxers: Vec<Arc<dyn ValueUnboxer>>,
    response_map_factory: Arc<dyn ResponseMapFactory>,
    instrumentation: Arc<dyn Instrumentation>,
    options: ExecutionOptions,
}

impl ExecutionContextBuilder {
    fn new(schema: Arc<SchemaType>) -> Self {
        Self {
            schema,
            fragments: FnvHashMap::default(),
            variables: Variables::new(),
            cancellation: None,
            code_registry: Arc::new(CodeRegistry::new()),
            exception_handler: Arc::new(SimpleDataFetcherExceptionHandler),
            unboxers: default_value_unboxers(),
            response_map_factory: Arc::new(DefaultResponseMapFactory),
            instrumentation: Arc::new(NoopInstrumentation),
            options: ExecutionOptions::default(),
        }
    }

    /// Fragment definitions spreads are resolved against.
    #[must_use]
    pub fn fragments(mut self, fragments: impl IntoIterator<Item = Arc<Fragment>>) -> Self {
        self.fragments = fragments
            .into_iter()
            .map(|f| (f.name.clone(), f))
            .collect();
        self
    }

    /// Already coerced variables.
    #[must_use]
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    /// Makes the execution a child of `parent`, so dispatching `parent`
    /// cancels it.
    #[must_use]
    pub fn cancellation_parent(mut self, parent: &Arc<CancellationNode>) -> Self {
        self.cancellation = Some(CancellationNode::new_child(parent));
        self
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    #[must_use]
    pub fn code_registry(mut self, registry: CodeRegistry) -> Self {
        self.code_registry = Arc::new(registry);
        self
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    #[must_use]
    pub fn exception_handler(mut self, handler: impl DataFetcherExceptionHandler + 'static) -> Self {
        self.exception_handler = Arc::new(handler);
        self
    }

    /// Replaces the whole unboxer chain.
    #[must_use]
    pub fn value_unboxers(mut self, unboxers: Vec<Arc<dyn ValueUnboxer>>) -> Self {
        self.unboxers = unboxers;
        self
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    #[must_use]
    pub fn response_map_factory(mut self, factory: impl ResponseMapFactory + 'static) -> Self {
        self.response_map_factory = Arc::new(factory);
        self
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    #[must_use]
    pub fn instrumentation(mut self, instrumentation: impl Instrumentation + 'static) -> Self {
        self.instrumentation = Arc::new(instrumentation);
        self
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    #[must_use]
    pub fn options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    /// Finishes the context.
    pub fn build(self) -> ExecutionContext {
        ExecutionContext {
            schema: self.schema,
            fragments: self.fragments,
            variables: self.variables,
            errors: Mutex::new(Vec::new()),
            cancellation: self.cancellation.unwrap_or_else(CancellationNode::new_root),
            code_registry: self.code_registry,
            exception_handler: self.exception_handler,
            unboxers: self.unboxers,
            response_map_factory: self.response_map_factory,
            instrumentation: self.instrumentation,
            options: self.options,
        }
    }
}

/// Data and errors of a finished execution.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionOutput {
    /// Response data; `null` if a non-null root field failed.
    pub data: Value,
    /// Every error recorded while executing.
    pub errors: Vec<ExecutionError>,
}

/// Runs whole operations: picks the operation, prepares the context, and
/// hands the root selection set to the strategy matching the operation type.
pub struct Execution {
    query_strategy: Arc<dyn ExecutionStrategy>,
    mutation_strategy: Arc<dyn ExecutionStrategy>,
}

impl Default for Execution {
    fn default() -> Self {
        Self {
            query_strategy: Arc::new(ParallelExecutionStrategy::new()),
            mutation_strategy: Arc::new(SerialExecutionStrategy::new()),
        }
    }
}

impl Execution {
    /// Queries resolve in parallel, mutations serially.
    pub fn new() -> Self {
        Self::default()
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    #[must_use]
    pub fn query_strategy(mut self, strategy: impl ExecutionStrategy + 'static) -> Self {
        self.query_strategy = Arc::new(strategy);
        self
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    #[must_use]
    pub fn mutation_strategy(mut self, strategy: impl ExecutionStrategy + 'static) -> Self {
        self.mutation_strategy = Arc::new(strategy);
        self
    }

    /// Executes the selected operation of an already validated `document`.
    ///
    /// The `context` builder supplies the schema and policies; fragments and
    /// variables (with the operation's defaults merged in) are installed here.
    pub async fn execute(
        &self,
        document: &Document,
        operation_name: Option<&str>,
        variables: &Variables,
        root_value: Value,
        context: ExecutionContextBuilder,
    ) -> Result<ExecutionOutput, GraphQLError> {
        let operation = get_operation(document, operation_name)?;

        let (strategy, root_type) = match operation.operation_type {
            OperationType::Query => (
                &self.query_strategy,
                Some(context.schema.query_type_name().clone()),
            ),
            OperationType::Mutation => (
                &self.mutation_strategy,
                context.schema.mutation_type_name().cloned(),
            ),
            OperationType::Subscription => (&self.query_strategy, None),
        };
        let root_type =
            root_type.ok_or(GraphQLError::OperationNotSupported(operation.operation_type))?;

        let fragments = document.iter().filter_map(|def| match def {
            Definition::Fragment(f) => Some(f.clone()),
            Definition::Operation(_) => None,
        });
        let ctx = context
            .fragments(fragments)
            .variables(merge_default_variables(operation, variables))
            .build();

        ctx.instrumentation()
            .begin_execution(operation.name.as_deref());
        tracing::debug!(
            operation = operation.name.as_deref().unwrap_or_default(),
            kind = %operation.operation_type,
            "executing operation",
        );

        let data = execute_root(&**strategy, &ctx, operation, root_type, root_value).await;

        ctx.instrumentation().end_execution(ctx.error_count());
        let data = data?;
        Ok(ExecutionOutput {
            data,
            errors: ctx.into_errors(),
        })
    }
}

async fn execute_root(
    strategy: &dyn ExecutionStrategy,
    ctx: &ExecutionContext,
    operation: &Operation,
    root_type: ArcStr,
    root_value: Value,
) -> Result<Value, GraphQLError> {
    let params = FieldCollectorParameters::new(ctx, &root_type, strategy.selection_filter());
    let fields = collect_fields(&operation.selection_set, ctx.variables(), &params)?;

    let step_info = ExecutionStepInfo::root(Type::NonNullNamed(root_type.clone()));
    let data = strategy
        .execute(
            ctx,
            ExecutionStrategyParameters {
                fields,
                source: root_value,
                step_info,
                object_type: root_type,
                local_context: None,
            },
        )
        .await?;

    Ok(data.map_or_else(Value::null, Value::Object))
}

/// Selects the operation to execute.
///
/// Without an `operation_name` the document must contain exactly one
/// operation.
pub fn get_operation<'d>(
    document: &'d Document,
    operation_name: Option<&str>,
) -> Result<&'d Operation, GraphQLError> {
    let mut operation = None;
    for def in document {
        if let Definition::Operation(op) = def {
            if operation_name.is_none() && operation.is_some() {
                return Err(GraphQLError::MultipleOperationsProvided);
            }

            let move_op =
                operation_name.is_none() || op.name.as_deref() == operation_name;

            if move_op {
                operation = Some(op);
            }
        }
    }

    match operation {
        Some(op) => Ok(op),
        None if operation_name.is_some() => Err(GraphQLError::UnknownOperationName),
        None => Err(GraphQLError::NoOperationProvided),
    }
}

fn merge_default_variables(operation: &Operation, variables: &Variables) -> Variables {
    let mut all_vars = variables.clone();
    for def in &operation.variable_definitions {
        if let Some(default) = &def.default_value {
            all_vars
                .entry(def.name.to_string())
                .or_insert_with(|| default.clone());
        }
    }
    all_vars
}
