//! SQL text of the generated engine statements.

use crate::criteria::Criteria;
use crate::dialect::{Dialect, join_fragments};
use crate::expr::Value;
use crate::expr::value::{format_timestamp, quote};
use crate::schema::field::{CREATE_DATE, DELETE_DATE, ID, LAST_UPDATE};
use crate::schema::{FieldDescriptor, Model};

/// `SELECT * FROM <table><criteria>`.
pub fn select(dialect: &dyn Dialect, table: &str, criteria: &Criteria) -> String {
    format!("SELECT * FROM {}{}", dialect.identity(table), criteria.render(dialect))
}

/// `SELECT COUNT(*) FROM <table> <where>`.
pub fn count(dialect: &dyn Dialect, table: &str, criteria: &Criteria) -> String {
    format!(
        "SELECT COUNT(*) FROM {}{}",
        dialect.identity(table),
        join_fragments(&[&criteria.where_string(dialect)])
    )
}

/// INSERT of a new row. `model` must already carry its ID and timestamps.
///
/// Columns whose value has no literal form are left out.
pub fn insert(
    dialect: &dyn Dialect,
    table: &str,
    model: &Model,
    values: &[(&'static str, Value)],
) -> String {
    let mut columns = vec![
        dialect.identity(ID),
        dialect.identity(CREATE_DATE),
        dialect.identity(LAST_UPDATE),
    ];
    let mut literals = vec![
        quote(model.id().unwrap_or_default()),
        quote(&format_timestamp(&model.create_date)),
        quote(&format_timestamp(&model.last_update)),
    ];
    for (name, value) in values {
        match value.to_literal() {
            Some(literal) => {
                columns.push(dialect.identity(name));
                literals.push(literal);
            }
            None => tracing::trace!(table, column = name, "no literal for value, column skipped"),
        }
    }
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.identity(table),
        columns.join(", "),
        literals.join(", ")
    )
}

/// UPDATE of every column but `ID` and `CreateDate`, keyed by the model's ID.
///
/// Null values of nullable fields are written as `null`; other values without a literal form
/// are left out.
pub fn update(
    dialect: &dyn Dialect,
    table: &str,
    fields: &[FieldDescriptor],
    model: &Model,
    values: &[(&'static str, Value)],
) -> String {
    let nullable = |name: &str| {
        fields
            .iter()
            .any(|f| f.nullable && f.name.eq_ignore_ascii_case(name))
    };

    let assignments = model
        .update_values()
        .iter()
        .chain(values)
        .filter_map(|(name, value)| {
            let literal = match value.to_literal() {
                Some(literal) => literal,
                None if value.is_null() && nullable(name) => "null".to_owned(),
                None => {
                    tracing::trace!(table, column = name, "no literal for value, column skipped");
                    return None;
                }
            };
            Some(format!("{} = {literal}", dialect.identity(name)))
        })
        .collect::<Vec<_>>();

    format!(
        "UPDATE {} SET {} WHERE {} = {}",
        dialect.identity(table),
        assignments.join(", "),
        dialect.identity(ID),
        quote(model.id().unwrap_or_default())
    )
}

/// Physical DELETE, or a soft delete stamping `DeleteDate`, of the live row with `id`.
pub fn remove(dialect: &dyn Dialect, table: &str, id: &str, delete_date: Option<&Value>) -> String {
    let guard = format!(
        "WHERE {} = {} AND {} IS NULL",
        dialect.identity(ID),
        quote(id),
        dialect.identity(DELETE_DATE)
    );
    match delete_date.and_then(Value::to_literal) {
        Some(ts) => format!(
            "UPDATE {} SET {} = {ts} {guard}",
            dialect.identity(table),
            dialect.identity(DELETE_DATE)
        ),
        None => format!("DELETE FROM {} {guard}", dialect.identity(table)),
    }
}

/// Mass DELETE or soft delete of the live rows matching `criteria`.
pub fn remove_many(
    dialect: &dyn Dialect,
    table: &str,
    criteria: &Criteria,
    delete_date: Option<&Value>,
) -> String {
    let live = criteria.clone().with_deleted(false);
    let where_sql = join_fragments(&[&live.where_string(dialect)]);
    match delete_date.and_then(Value::to_literal) {
        Some(ts) => format!(
            "UPDATE {} SET {} = {ts}{where_sql}",
            dialect.identity(table),
            dialect.identity(DELETE_DATE)
        ),
        None => format!("DELETE FROM {}{where_sql}", dialect.identity(table)),
    }
}
