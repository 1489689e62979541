use arcstr::ArcStr;
use derive_more::with_trait::{Display, Error};

use crate::ast::{Directive, InputValue};

use super::Variables;

/// Name of the `@skip(if:)` directive.
pub const SKIP: &str = "skip";
/// Name of the `@include(if:)` directive.
pub const INCLUDE: &str = "include";
/// Name of the `@defer` directive.
pub const DEFER: &str = "defer";

/// Failure to evaluate the condition of a `@skip` or `@include` directive.
#[derive(Clone, Debug, Display, Error, PartialEq)]
pub enum DirectiveError {
    /// The directive has no `if` argument.
    #[display("Directive \"@{_0}\" is missing its \"if\" argument")]
    MissingCondition(#[error(not(source))] ArcStr),

    /// The `if` argument references a variable that has no value.
    #[display("Variable \"${variable}\" used by directive \"@{directive}\" is not provided")]
    UnboundVariable {
        /// Name of the directive.
        directive: ArcStr,
        /// Name of the unbound variable.
        variable: String,
    },

    /// The `if` argument is not a Boolean.
    #[display("Argument \"if\" of directive \"@{directive}\" must be a Boolean, found {value}")]
    NonBooleanCondition {
        /// Name of the directive.
        directive: ArcStr,
        /// Offending value.
        value: InputValue,
    },
}

/// Decides whether a selection carrying `directives` takes part in
/// execution.
///
/// A selection is included iff `@skip` is absent or false AND `@include` is
/// absent or true. Directives other than these two are ignored.
pub fn should_include(variables: &Variables, directives: &[Directive]) -> Result<bool, DirectiveError> {
    for directive in directives {
        match directive.name.as_str() {
            SKIP if condition(directive, variables)? => return Ok(false),
            INCLUDE if !condition(directive, variables)? => return Ok(false),
            _ => {}
        }
    }
    Ok(true)
}

/// Tells whether `directives` contain `@defer`.
pub fn is_deferred(directives: &[Directive]) -> bool {
    directives.iter().any(|d| d.name.as_str() == DEFER)
}

fn condition(directive: &Directive, variables: &Variables) -> Result<bool, DirectiveError> {
    let arg = directive
        .get_argument("if")
        .ok_or_else(|| DirectiveError::MissingCondition(directive.name.clone()))?;

    let value = match arg {
        InputValue::Variable(name) => variables.get(name).ok_or_else(|| {
            DirectiveError::UnboundVariable {
                directive: directive.name.clone(),
                variable: name.clone(),
            }
        })?,
        v => v,
    };

    value
        .as_bool_value()
        .ok_or_else(|| DirectiveError::NonBooleanCondition {
            directive: directive.name.clone(),
            value: value.clone(),
        })
}

/// Restricts which selections a field collection pass admits.
///
/// Every filter first requires [`should_include`] to pass.
#[derive(Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq)]
pub enum SelectionFilter {
    /// Any included selection.
    #[default]
    AllInclusive,
    /// Included selections without `@defer`.
    NonDeferredOnly,
    /// Included selections carrying `@defer`.
    DeferredOnly,
}

impl SelectionFilter {
    /// Applies this filter to a selection carrying `directives`.
    pub fn include_node(
        self,
        variables: &Variables,
        directives: &[Directive],
    ) -> Result<bool, DirectiveError> {
        if !should_include(variables, directives)? {
            return Ok(false);
        }
        Ok(match self {
            Self::AllInclusive => true,
            Self::NonDeferredOnly => !is_deferred(directives),
            Self::DeferredOnly => is_deferred(directives),
        })
    }

    /// Filter for the selection sets below a selection this filter admitted.
    ///
    /// Below a deferred selection, everything but further deferred parts
    /// belongs to the same payload.
    #[must_use]
    pub fn nested(self) -> Self {
        match self {
            Self::DeferredOnly => Self::NonDeferredOnly,
            other => other,
        }
    }
}
