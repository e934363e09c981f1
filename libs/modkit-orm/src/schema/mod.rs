//! Entity schema: field descriptors, column mapping, bookkeeping and DDL.
//!
//! Field tables are produced at compile time by `#[derive(Entity)]` / `#[derive(Fields)]`; the
//! engine asks for [`Entity::descriptors`] once per table and caches the result.

pub mod column;
pub mod ddl;
mod entity;
pub mod field;
mod model;

pub use column::Column;
pub use entity::{ColumnSet, Entity, Fields, Restorable, StandingData, Updatable};
pub(crate) use entity::populate;
pub use field::{FieldDescriptor, FieldSize, FieldType, reserved_fields};
pub use model::Model;
pub(crate) use model::now;
