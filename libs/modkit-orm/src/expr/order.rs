//! Ordering terms (`ORDER BY` bodies).

use std::fmt;

use crate::dialect::Dialect;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        })
    }
}

/// An ordered list of sort keys.
///
/// ```
/// use modkit_orm::Order;
///
/// let o = Order::asc("name").then_desc("age");
/// assert_eq!(o.render(|f| format!("`{f}`")), "`name` asc, `age` desc");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct Order {
    terms: Vec<(String, Direction)>,
}

impl Order {
    pub fn by(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            terms: vec![(field.into(), direction)],
        }
    }

    /// Ascending sort on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self::by(field, Direction::Asc)
    }

    /// Descending sort on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self::by(field, Direction::Desc)
    }

    pub fn then(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.terms.push((field.into(), direction));
        self
    }

    pub fn then_asc(self, field: impl Into<String>) -> Self {
        self.then(field, Direction::Asc)
    }

    pub fn then_desc(self, field: impl Into<String>) -> Self {
        self.then(field, Direction::Desc)
    }

    #[must_use]
    pub fn terms(&self) -> &[(String, Direction)] {
        &self.terms
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Render with a caller-supplied identifier quoting function.
    #[must_use]
    pub fn render(&self, quote: impl Fn(&str) -> String) -> String {
        self.terms
            .iter()
            .map(|(field, dir)| format!("{} {dir}", quote(field)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Render with the identifier quoting of `dialect`.
    #[must_use]
    pub fn to_sql(&self, dialect: &dyn Dialect) -> String {
        self.render(|f| dialect.identity(f))
    }
}
