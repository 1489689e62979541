/// Construct JSON-like [`Value`]s by using JSON syntax.
///
/// [`Value`] objects are used mostly to describe expected responses in tests
/// and to attach extensions to [`FieldError`]s.
///
/// Every element and object value must be a single token tree, so wrap
/// compound expressions (e.g. negative numbers) in parentheses.
///
/// ```rust
/// # use graphql_execution::{graphql_value, Value};
/// # let _: Value =
/// graphql_value!(null);
/// # let _: Value =
/// graphql_value!(1234);
/// # let _: Value =
/// graphql_value!([1234, "test", true, (-1)]);
/// # let _: Value =
/// graphql_value!({"key": "value", "foo": {"bar": null}});
/// ```
///
/// [`FieldError`]: crate::FieldError
/// [`Value`]: crate::Value
#[macro_export]
macro_rules! graphql_value {
    (null) => ($crate::Value::null());

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::list(vec![ $( $crate::graphql_value!($elem) ),* ])
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        #[allow(unused_mut, reason = "empty objects")]
        let mut object = $crate::Object::with_capacity(0);
        $( let _ = object.add_field($key, $crate::graphql_value!($value)); )*
        $crate::Value::object(object)
    }};

    ($e:expr) => ($crate::Value::from($e));
}
