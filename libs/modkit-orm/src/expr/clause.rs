//! Predicate chains (`WHERE` bodies).

use std::fmt;

use super::value::Value;
use crate::dialect::Dialect;

/// Base comparison operators.
///
/// The discriminant is the index of the positive template in a dialect operator table; the
/// negated template sits `len / 2` entries further.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal = 0,
    Greater = 1,
    Less = 2,
    Like = 3,
    In = 4,
    Between = 5,
    IsNull = 6,
}

impl Operator {
    /// Position of the template in an operator table of `table_len` entries.
    #[must_use]
    pub fn code(self, negated: bool, table_len: usize) -> usize {
        let base = self as usize;
        if negated { base + table_len / 2 } else { base }
    }

    /// Number of values the operator consumes; `None` means "all supplied values".
    #[must_use]
    pub fn arity(self) -> Option<usize> {
        match self {
            Operator::Between => Some(2),
            Operator::In => None,
            Operator::IsNull => Some(0),
            Operator::Equal | Operator::Greater | Operator::Less | Operator::Like => Some(1),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Equal => "eq",
            Operator::Greater => "gt",
            Operator::Less => "lt",
            Operator::Like => "like",
            Operator::In => "in",
            Operator::Between => "between",
            Operator::IsNull => "is_null",
        };
        f.write_str(s)
    }
}

/// How a clause is joined to the clause that follows it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Conjunction::And => " AND ",
            Conjunction::Or => " OR ",
        }
    }
}

/// One predicate node.
#[derive(Clone, Debug, PartialEq)]
pub struct Clause {
    pub field: String,
    pub op: Operator,
    pub negated: bool,
    pub values: Vec<Value>,
    /// Conjunction to the next clause in the chain.
    pub conjunction: Conjunction,
}

impl Clause {
    #[must_use]
    pub fn new(field: impl Into<String>, op: Operator, negated: bool, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            negated,
            values,
            conjunction: Conjunction::And,
        }
    }

    /// Render against an operator table.
    ///
    /// Returns an empty string when the clause cannot be rendered: wrong number of values,
    /// an empty IN list, a value with no literal form or a table without the needed entry.
    #[must_use]
    pub fn render(&self, operators: &[&str]) -> String {
        let Some(template) = operators.get(self.op.code(self.negated, operators.len())) else {
            return String::new();
        };

        let needed = self.op.arity().unwrap_or(self.values.len());
        if (self.op == Operator::In && needed == 0) || self.values.len() < needed {
            tracing::trace!(field = %self.field, op = %self.op, "dropping clause with wrong arity");
            return String::new();
        }

        let mut literals = Vec::with_capacity(needed);
        for value in &self.values[..needed] {
            let Some(lit) = value.to_literal() else {
                tracing::trace!(field = %self.field, op = %self.op, ?value, "dropping clause with unconvertible value");
                return String::new();
            };
            literals.push(lit);
        }

        match self.op {
            Operator::In => fill(template, &[&self.field, &literals.join(",")]),
            Operator::Between => {
                let (low, high) = if literals[0] > literals[1] {
                    (&literals[1], &literals[0])
                } else {
                    (&literals[0], &literals[1])
                };
                fill(template, &[&self.field, low, high])
            }
            Operator::IsNull => fill(template, &[&self.field]),
            Operator::Equal | Operator::Greater | Operator::Less | Operator::Like => {
                fill(template, &[&self.field, &literals[0]])
            }
        }
    }
}

/// Substitute `{}` placeholders in order.
#[must_use]
pub fn fill(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len() + args.iter().map(|a| a.len()).sum::<usize>());
    let mut rest = template;
    let mut args = args.iter();
    while let Some(pos) = rest.find("{}") {
        out.push_str(&rest[..pos]);
        if let Some(arg) = args.next() {
            out.push_str(arg);
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

/// A chain of predicates joined by `AND` / `OR`.
///
/// ```
/// use modkit_orm::Where;
///
/// let w = Where::equal("Age", 12).and_equal("Name", "Alex");
/// let ops = ["`{}` = {}", "`{}` > {}", "`{}` < {}", "`{}` LIKE {}", "`{}` IN ({})",
///     "`{}` BETWEEN {} AND {}", "`{}` IS NULL", "`{}` <> {}", "`{}` <= {}", "`{}` >= {}",
///     "`{}` NOT LIKE {}", "`{}` NOT IN ({})", "`{}` NOT BETWEEN {} AND {}", "`{}` IS NOT NULL"];
/// assert_eq!(w.render(&ops), "`Age` = 12 AND `Name` = 'Alex'");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[must_use]
pub struct Where {
    clauses: Vec<Clause>,
}

macro_rules! single_value_ops {
    ($( $start:ident, $and:ident, $or:ident => $op:ident, $negated:expr; )+) => {
        $(
            pub fn $start(field: impl Into<String>, value: impl Into<Value>) -> Self {
                Self::start(Clause::new(field, Operator::$op, $negated, vec![value.into()]))
            }

            pub fn $and(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
                self.push(
                    Conjunction::And,
                    Clause::new(field, Operator::$op, $negated, vec![value.into()]),
                )
            }

            pub fn $or(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
                self.push(
                    Conjunction::Or,
                    Clause::new(field, Operator::$op, $negated, vec![value.into()]),
                )
            }
        )+
    };
}

macro_rules! pattern_ops {
    ($( $start:ident, $and:ident, $or:ident => $negated:expr, $pattern:expr; )+) => {
        $(
            pub fn $start(field: impl Into<String>, text: &str) -> Self {
                Self::start(Clause::new(field, Operator::Like, $negated, vec![Value::Text($pattern(text))]))
            }

            pub fn $and(self, field: impl Into<String>, text: &str) -> Self {
                self.push(
                    Conjunction::And,
                    Clause::new(field, Operator::Like, $negated, vec![Value::Text($pattern(text))]),
                )
            }

            pub fn $or(self, field: impl Into<String>, text: &str) -> Self {
                self.push(
                    Conjunction::Or,
                    Clause::new(field, Operator::Like, $negated, vec![Value::Text($pattern(text))]),
                )
            }
        )+
    };
}

macro_rules! list_ops {
    ($( $start:ident, $and:ident, $or:ident => $negated:expr; )+) => {
        $(
            pub fn $start<I, V>(field: impl Into<String>, values: I) -> Self
            where
                I: IntoIterator<Item = V>,
                V: Into<Value>,
            {
                Self::start(Clause::new(field, Operator::In, $negated, collect(values)))
            }

            pub fn $and<I, V>(self, field: impl Into<String>, values: I) -> Self
            where
                I: IntoIterator<Item = V>,
                V: Into<Value>,
            {
                self.push(Conjunction::And, Clause::new(field, Operator::In, $negated, collect(values)))
            }

            pub fn $or<I, V>(self, field: impl Into<String>, values: I) -> Self
            where
                I: IntoIterator<Item = V>,
                V: Into<Value>,
            {
                self.push(Conjunction::Or, Clause::new(field, Operator::In, $negated, collect(values)))
            }
        )+
    };
}

macro_rules! range_ops {
    ($( $start:ident, $and:ident, $or:ident => $negated:expr; )+) => {
        $(
            pub fn $start(field: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
                Self::start(Clause::new(field, Operator::Between, $negated, vec![low.into(), high.into()]))
            }

            pub fn $and(self, field: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
                self.push(
                    Conjunction::And,
                    Clause::new(field, Operator::Between, $negated, vec![low.into(), high.into()]),
                )
            }

            pub fn $or(self, field: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
                self.push(
                    Conjunction::Or,
                    Clause::new(field, Operator::Between, $negated, vec![low.into(), high.into()]),
                )
            }
        )+
    };
}

macro_rules! null_ops {
    ($( $start:ident, $and:ident, $or:ident => $negated:expr; )+) => {
        $(
            pub fn $start(field: impl Into<String>) -> Self {
                Self::start(Clause::new(field, Operator::IsNull, $negated, Vec::new()))
            }

            pub fn $and(self, field: impl Into<String>) -> Self {
                self.push(Conjunction::And, Clause::new(field, Operator::IsNull, $negated, Vec::new()))
            }

            pub fn $or(self, field: impl Into<String>) -> Self {
                self.push(Conjunction::Or, Clause::new(field, Operator::IsNull, $negated, Vec::new()))
            }
        )+
    };
}

fn collect<I, V>(values: I) -> Vec<Value>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    values.into_iter().map(Into::into).collect()
}

impl Where {
    fn start(clause: Clause) -> Self {
        Self {
            clauses: vec![clause],
        }
    }

    fn push(mut self, conjunction: Conjunction, clause: Clause) -> Self {
        if let Some(last) = self.clauses.last_mut() {
            last.conjunction = conjunction;
        }
        self.clauses.push(clause);
        self
    }

    single_value_ops! {
        equal, and_equal, or_equal => Equal, false;
        not_equal, and_not_equal, or_not_equal => Equal, true;
        greater, and_greater, or_greater => Greater, false;
        not_greater, and_not_greater, or_not_greater => Greater, true;
        less, and_less, or_less => Less, false;
        not_less, and_not_less, or_not_less => Less, true;
    }

    pattern_ops! {
        like, and_like, or_like => false, str::to_owned;
        not_like, and_not_like, or_not_like => true, str::to_owned;
        starts_with, and_starts_with, or_starts_with => false, |t: &str| format!("{t}%");
        not_starts_with, and_not_starts_with, or_not_starts_with => true, |t: &str| format!("{t}%");
        ends_with, and_ends_with, or_ends_with => false, |t: &str| format!("%{t}");
        not_ends_with, and_not_ends_with, or_not_ends_with => true, |t: &str| format!("%{t}");
        contains, and_contains, or_contains => false, |t: &str| format!("%{t}%");
        not_contains, and_not_contains, or_not_contains => true, |t: &str| format!("%{t}%");
    }

    list_ops! {
        in_list, and_in_list, or_in_list => false;
        not_in, and_not_in, or_not_in => true;
    }

    range_ops! {
        between, and_between, or_between => false;
        not_between, and_not_between, or_not_between => true;
    }

    null_ops! {
        is_null, and_is_null, or_is_null => false;
        is_not_null, and_is_not_null, or_is_not_null => true;
    }

    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Render the chain against an operator table, skipping clauses that render empty.
    #[must_use]
    pub fn render(&self, operators: &[&str]) -> String {
        let mut out = String::new();
        let mut pending: Option<Conjunction> = None;
        for clause in &self.clauses {
            let sql = clause.render(operators);
            if sql.is_empty() {
                continue;
            }
            if let Some(conj) = pending {
                out.push_str(conj.as_sql());
            }
            out.push_str(&sql);
            pending = Some(clause.conjunction);
        }
        out
    }

    /// Render with the operator table of `dialect`.
    #[must_use]
    pub fn to_sql(&self, dialect: &dyn Dialect) -> String {
        self.render(dialect.operators())
    }
}
