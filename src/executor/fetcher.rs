use std::{any::Any, fmt, sync::Arc};

use arcstr::ArcStr;
use async_trait::async_trait;
use fnv::FnvHashMap;
use indexmap::IndexMap;

use crate::{ast::InputValue, value::Value};

use super::{
    ExecutionContext, ExecutionStepInfo, FetchedValue, FieldResult, LocalContext, MergedField,
    Variables,
};

/// Field arguments after variable substitution.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Arguments {
    args: IndexMap<ArcStr, InputValue>,
}

impl Arguments {
    /// Value of the argument `name`, if provided.
    pub fn get(&self, name: &str) -> Option<&InputValue> {
        self.args.get(name)
    }

    /// Arguments in the order they are written in the document.
    pub fn iter(&self) -> impl Iterator<Item = (&ArcStr, &InputValue)> {
        self.args.iter()
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    #[expect(missing_docs, reason = "self-explanatory")]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

impl FromIterator<(ArcStr, InputValue)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (ArcStr, InputValue)>>(iter: I) -> Self {
        Self {
            args: iter.into_iter().collect(),
        }
    }
}

/// Everything a [`DataFetcher`] may look at.
pub struct DataFetchingEnvironment<'a> {
    pub(crate) source: &'a Value,
    pub(crate) step_info: &'a Arc<ExecutionStepInfo>,
    pub(crate) field: &'a MergedField,
    pub(crate) local_context: Option<&'a LocalContext>,
    pub(crate) execution_context: &'a ExecutionContext,
}

impl<'a> DataFetchingEnvironment<'a> {
    /// Value of the parent object.
    pub fn source(&self) -> &'a Value {
        self.source
    }

    /// Resolved arguments of the field.
    pub fn arguments(&self) -> &'a Arguments {
        self.step_info.arguments()
    }

    /// Resolved argument `name`.
    pub fn argument(&self, name: &str) -> Option<&'a InputValue> {
        self.arguments().get(name)
    }

    /// Step of the field being fetched.
    pub fn step_info(&self) -> &'a Arc<ExecutionStepInfo> {
        self.step_info
    }

    /// Field being fetched.
    pub fn field(&self) -> &'a MergedField {
        self.field
    }

    /// Local context propagated from the parent field.
    pub fn local_context(&self) -> Option<&'a LocalContext> {
        self.local_context
    }

    /// Local context propagated from the parent field, if it is a `T`.
    pub fn local_context_as<T: Any>(&self) -> Option<&'a T> {
        self.local_context?.downcast_ref()
    }

    /// Coerced variables of the executing operation.
    pub fn variables(&self) -> &'a Variables {
        self.execution_context.variables()
    }

    /// Shared state of the execution.
    pub fn execution_context(&self) -> &'a ExecutionContext {
        self.execution_context
    }
}

/// Produces the raw value of a field.
///
/// The returned value may be wrapped any number of times, in result
/// envelopes, asynchronous handles, or optionals. The execution unwraps it
/// before completing the field. Failing makes the field `null` and reports
/// the failure through the exception handler.
#[async_trait]
pub trait DataFetcher: Send + Sync {
    /// Fetches the value of `env.field()` on `env.source()`.
    async fn fetch(&self, env: DataFetchingEnvironment<'_>) -> FieldResult<FetchedValue>;
}

/// Reads the field's name from the parent object value.
///
/// Missing entries and non-object parents fetch `null`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PropertyDataFetcher;

#[async_trait]
impl DataFetcher for PropertyDataFetcher {
    async fn fetch(&self, env: DataFetchingEnvironment<'_>) -> FieldResult<FetchedValue> {
        let value = env
            .source()
            .as_object_value()
            .and_then(|o| o.get_field_value(env.field().name()))
            .cloned()
            .unwrap_or_else(Value::null);
        Ok(FetchedValue::Value(value))
    }
}

/// [`DataFetcher`] calling a closure.
///
/// ```rust
/// # use graphql_execution::{FetchedValue, FnDataFetcher};
/// let fetcher = FnDataFetcher::new(|env| {
///     let name = env.argument("name").and_then(|v| v.as_string_value()).unwrap_or("World");
///     Ok(FetchedValue::value(format!("Hello, {name}!")))
/// });
/// ```
pub struct FnDataFetcher<F>(F);

impl<F> FnDataFetcher<F>
where
    F: Fn(&DataFetchingEnvironment<'_>) -> FieldResult<FetchedValue> + Send + Sync,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> fmt::Debug for FnDataFetcher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FnDataFetcher").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> DataFetcher for FnDataFetcher<F>
where
    F: Fn(&DataFetchingEnvironment<'_>) -> FieldResult<FetchedValue> + Send + Sync,
{
    async fn fetch(&self, env: DataFetchingEnvironment<'_>) -> FieldResult<FetchedValue> {
        (self.0)(&env)
    }
}

/// Data fetchers of a schema, keyed by type and field name.
///
/// Fields without a registered fetcher use [`PropertyDataFetcher`].
pub struct CodeRegistry {
    fetchers: FnvHashMap<ArcStr, FnvHashMap<ArcStr, Arc<dyn DataFetcher>>>,
    default_fetcher: Arc<dyn DataFetcher>,
}

impl Default for CodeRegistry {
    fn default() -> Self {
        Self {
            fetchers: FnvHashMap::default(),
            default_fetcher: Arc::new(PropertyDataFetcher),
        }
    }
}

impl fmt::Debug for CodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys = self
            .fetchers
            .iter()
            .flat_map(|(ty, fields)| fields.keys().map(move |field| format!("{ty}.{field}")))
            .collect::<Vec<_>>();
        keys.sort();
        f.debug_struct("CodeRegistry")
            .field("fetchers", &keys)
            .finish_non_exhaustive()
    }
}

impl CodeRegistry {
    /// Registry fetching every field with [`PropertyDataFetcher`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the fetcher of `type_name.field_name`.
    #[must_use]
    pub fn data_fetcher(
        mut self,
        type_name: impl Into<ArcStr>,
        field_name: impl Into<ArcStr>,
        fetcher: impl DataFetcher + 'static,
    ) -> Self {
        self.fetchers
            .entry(type_name.into())
            .or_default()
            .insert(field_name.into(), Arc::new(fetcher));
        self
    }

    /// Replaces the fetcher used for unregistered fields.
    #[must_use]
    pub fn default_data_fetcher(mut self, fetcher: impl DataFetcher + 'static) -> Self {
        self.default_fetcher = Arc::new(fetcher);
        self
    }

    /// Fetcher of `type_name.field_name`.
    pub fn get(&self, type_name: &str, field_name: &str) -> &dyn DataFetcher {
        match self
            .fetchers
            .get(type_name)
            .and_then(|fields| fields.get(field_name))
        {
            Some(fetcher) => &**fetcher,
            None => &*self.default_fetcher,
        }
    }
}
