use arcstr::ArcStr;

use crate::value::{Object, Value};

/// Builds the response object of a selection set.
pub trait ResponseMapFactory: Send + Sync {
    /// Pairs `keys` with `values` into an object iterating in `keys` order.
    ///
    /// Both sides have the same length.
    fn create_insertion_ordered(&self, keys: Vec<ArcStr>, values: Vec<Value>) -> Object;
}

/// Keeps strict insertion order.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultResponseMapFactory;

impl ResponseMapFactory for DefaultResponseMapFactory {
    fn create_insertion_ordered(&self, keys: Vec<ArcStr>, values: Vec<Value>) -> Object {
        debug_assert_eq!(keys.len(), values.len(), "keys and values differ in length");

        let mut object = Object::with_capacity(keys.len());
        for (key, value) in keys.into_iter().zip(values) {
            object.add_field(key.as_str(), value);
        }
        object
    }
}
