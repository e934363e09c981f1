//! Expression builder: predicate chains, ordering terms and SQL literals.
//!
//! Expressions are dialect-agnostic until rendered. A [`Where`] renders against the operator
//! table of a [`Dialect`](crate::Dialect); an [`Order`] renders through its identifier quoting.

mod clause;
mod order;
pub mod value;

pub use clause::{Clause, Conjunction, Operator, Where};
pub use order::{Direction, Order};
pub use value::Value;
