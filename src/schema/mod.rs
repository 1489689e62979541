//! Read-only view of the type system the executor resolves against.

pub mod meta;
/// Schema lookup: root types, possible types and field types.
pub mod model;
