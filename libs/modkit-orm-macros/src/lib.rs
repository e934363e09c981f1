// Proc-macro crate for modkit-orm entity derives
//
//! # modkit-orm-macros
//!
//! Procedural macros for the `modkit-orm` entity layer.
//!
//! ## `#[derive(Entity)]`
//!
//! Implements `Fields` and `Entity` for a struct: the table name, access to the bookkeeping
//! `Model`, the mapped columns and the optional capability hooks.
//!
//! ### Example
//!
//! ```ignore
//! use modkit_orm::{Entity, Fields, Model};
//!
//! #[derive(Debug, Default, Fields)]
//! pub struct Address {
//!     #[orm("size:128")]
//!     pub street: String,
//!     #[orm]
//!     pub zip: Option<String>,
//! }
//!
//! #[derive(Debug, Default, Entity)]
//! #[entity(table = "people", restorable)]
//! pub struct Person {
//!     #[orm(model)]
//!     pub model: Model,
//!     #[orm("size:64,key:true")]
//!     pub name: String,
//!     #[orm(column = "Age")]
//!     pub age: u32,
//!     #[orm(embed)]
//!     pub address: Address,
//!     // not persisted
//!     pub display_name: String,
//! }
//! ```
//!
//! ### Attributes
//!
//! Struct level, `#[entity(...)]`:
//! - `table = "name"`: table name, defaults to the struct name
//! - `updatable`, `restorable`, `standing_data`: route the matching `Entity` hook to the
//!   struct's `Updatable`, `Restorable` or `StandingData` implementation
//!
//! Field level, `#[orm(...)]`:
//! - `model`: the bookkeeping `Model` field (exactly one per entity)
//! - `embed`: a nested `#[derive(Fields)]` struct whose columns are flattened in
//! - `"key:value,..."`: a mapped column with an annotation (`type`, `size`, `identity`, `key`,
//!   `unsigned`); a bare `#[orm]` maps the column with the inferred shape
//! - `column = "Name"`: column name, defaults to the field name

use proc_macro::TokenStream;
use proc_macro_error2::proc_macro_error;
use syn::{DeriveInput, parse_macro_input};

mod entity;

/// Derive macro implementing `Fields` and `Entity`.
///
/// Requires exactly one `#[orm(model)]` field of type `modkit_orm::Model`. Fields without an
/// `#[orm]` attribute are not persisted.
#[proc_macro_derive(Entity, attributes(entity, orm))]
#[proc_macro_error]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand_derive_entity(input).into()
}

/// Derive macro implementing `Fields` for a group of columns embedded into entities.
#[proc_macro_derive(Fields, attributes(orm))]
#[proc_macro_error]
pub fn derive_fields(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand_derive_fields(input).into()
}
