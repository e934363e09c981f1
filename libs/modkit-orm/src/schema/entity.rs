use super::field::{FieldDescriptor, reserved_fields};
use super::model::Model;
use crate::Result;
use crate::dialect::Dialect;
use crate::expr::Value;

/// A group of mapped fields, usually generated by `#[derive(Fields)]`.
///
/// Entities implement it too; nested `#[orm(embed)]` structs are flattened into the owning
/// entity's columns.
pub trait Fields {
    /// Column names of this group and of the groups embedded in it.
    const COLUMNS: ColumnSet;

    /// Append descriptors of the mapped fields in declaration order.
    fn describe(out: &mut Vec<FieldDescriptor>)
    where
        Self: Sized;

    /// Append `(column, value)` pairs in the same order as [`describe`](Fields::describe).
    fn values(&self, out: &mut Vec<(&'static str, Value)>);

    /// Assign a result cell to the field named `column` (case-insensitive).
    ///
    /// Returns `true` when a field with that name exists, even if the cell did not parse.
    fn assign(&mut self, column: &str, cell: Option<&str>) -> bool;
}

/// Column names of a [`Fields`] implementation, embedded groups included.
///
/// The derives build it in const context and every entity checks it with
/// [`assert_distinct`](ColumnSet::assert_distinct), so a column declared both on an entity and
/// on one of its embedded structs fails to compile:
///
/// ```compile_fail
/// use modkit_orm::{Entity, Fields, Model};
///
/// #[derive(Default, Fields)]
/// struct Audit {
///     #[orm(column = "Name")]
///     author: String,
/// }
///
/// #[derive(Default, Entity)]
/// struct Person {
///     #[orm(model)]
///     model: Model,
///     #[orm(column = "name")]
///     name: String,
///     #[orm(embed)]
///     audit: Audit,
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ColumnSet {
    pub own: &'static [&'static str],
    pub embedded: &'static [&'static ColumnSet],
}

impl ColumnSet {
    /// Number of columns, embedded groups included.
    #[must_use]
    pub const fn len(&self) -> usize {
        let mut n = self.own.len();
        let mut i = 0;
        while i < self.embedded.len() {
            n += self.embedded[i].len();
            i += 1;
        }
        n
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `index`-th column: own columns first, then each embedded group in order.
    #[must_use]
    pub const fn get(&self, index: usize) -> Option<&'static str> {
        if index < self.own.len() {
            return Some(self.own[index]);
        }
        let mut rest = index - self.own.len();
        let mut i = 0;
        while i < self.embedded.len() {
            let group = self.embedded[i];
            if rest < group.len() {
                return group.get(rest);
            }
            rest -= group.len();
            i += 1;
        }
        None
    }

    /// First column repeating an earlier one or naming a bookkeeping column, ignoring ASCII case.
    #[must_use]
    pub const fn first_conflict(&self) -> Option<&'static str> {
        let reserved = reserved_fields();
        let mut i = 0;
        while let Some(name) = self.get(i) {
            let mut r = 0;
            while r < reserved.len() {
                if same_column(name, reserved[r].name) {
                    return Some(name);
                }
                r += 1;
            }
            let mut j = 0;
            while j < i {
                if let Some(earlier) = self.get(j) {
                    if same_column(name, earlier) {
                        return Some(name);
                    }
                }
                j += 1;
            }
            i += 1;
        }
        None
    }

    /// Evaluated in const context by `#[derive(Entity)]`.
    ///
    /// # Panics
    /// Panics when [`first_conflict`](Self::first_conflict) finds a column.
    pub const fn assert_distinct(&self) {
        assert!(
            self.first_conflict().is_none(),
            "duplicate or reserved column name across the entity and its embedded fields"
        );
    }
}

const fn same_column(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i].to_ascii_lowercase() != b[i].to_ascii_lowercase() {
            return false;
        }
        i += 1;
    }
    true
}

/// A persistable record type, usually generated by `#[derive(Entity)]`.
///
/// ```
/// use modkit_orm::{Entity, Model};
///
/// #[derive(Debug, Default, Entity)]
/// #[entity(table = "people")]
/// struct Person {
///     #[orm(model)]
///     model: Model,
///     #[orm("size:64")]
///     name: String,
///     #[orm]
///     nickname: Option<String>,
/// }
///
/// assert_eq!(Person::TABLE, "people");
/// let names: Vec<_> = Person::descriptors().iter().map(|d| d.name).collect();
/// assert_eq!(names, ["ID", "CreateDate", "LastUpdate", "DeleteDate", "name", "nickname"]);
/// ```
pub trait Entity: Fields + Default + Send + Sync + Sized + 'static {
    /// Table name.
    const TABLE: &'static str;

    fn model(&self) -> &Model;
    fn model_mut(&mut self) -> &mut Model;

    /// Custom save command, when the entity implements [`Updatable`].
    fn as_updatable(&self) -> Option<&dyn Updatable> {
        None
    }

    /// Post-load hook, when the entity implements [`Restorable`].
    fn as_restorable(&mut self) -> Option<&mut dyn Restorable> {
        None
    }

    /// Rows inserted right after the table is created, when the entity implements
    /// [`StandingData`].
    #[must_use]
    fn standing_data() -> Vec<Self> {
        Vec::new()
    }

    /// Reserved descriptors followed by the mapped fields.
    #[must_use]
    fn descriptors() -> Vec<FieldDescriptor> {
        const { Self::COLUMNS.assert_distinct() };
        let mut out = reserved_fields().to_vec();
        Self::describe(&mut out);
        out
    }
}

/// Entities that produce their own save statement.
pub trait Updatable {
    /// SQL executed by `save` instead of the generated INSERT/UPDATE.
    ///
    /// # Errors
    /// Any error aborts the save.
    fn update_command(&self, dialect: &dyn Dialect) -> Result<String>;
}

/// Entities that rebuild derived state after being loaded.
pub trait Restorable {
    fn restore(&mut self, dialect: &dyn Dialect);
}

/// Entities whose table is seeded when first created.
pub trait StandingData: Sized {
    fn standing_data() -> Vec<Self>;
}

/// Assign every cell of a row, bookkeeping columns first.
pub fn populate<'a, E: Entity>(
    entity: &mut E,
    cells: impl IntoIterator<Item = (&'a str, Option<&'a str>)>,
) {
    for (column, cell) in cells {
        if !entity.model_mut().assign(column, cell) && !entity.assign(column, cell) {
            tracing::trace!(table = E::TABLE, column, "no field for result column");
        }
    }
}
