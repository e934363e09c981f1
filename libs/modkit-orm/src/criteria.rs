//! Query criteria and normalization of caller-supplied criteria arguments.
//!
//! Engine operations accept anything convertible into [`CriteriaArgs`]: a full [`Criteria`],
//! a bare [`Where`] or [`Order`], an entity ID, a raw SQL predicate or nothing at all. The first
//! argument that is not `None` decides the criteria.

use std::any::Any;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::dialect::Dialect;
use crate::expr::{Order, Where};
use crate::schema::field::{DELETE_DATE, ID};
use crate::{DbError, Result};

#[allow(clippy::expect_used)] // good regex, it doesn't panic
static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*[0-9A-F]{8}-[0-9A-F]{4}-[0-9A-F]{4}-[0-9A-F]{4}-[0-9A-F]{12}\s*$")
        .expect("static regex should not panic")
});

/// Row filter: a predicate tree or a raw SQL fragment.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Expr(Where),
    Raw(String),
}

/// Row ordering: an order list or a raw SQL fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sort {
    Expr(Order),
    Raw(String),
}

/// Filter, ordering and pagination of a query.
///
/// ```
/// use modkit_orm::{Criteria, Order, Where};
///
/// let c = Criteria::new()
///     .with_filter(Where::greater("Age", 17))
///     .with_order(Order::desc("Age"))
///     .with_limit(10);
/// assert_eq!(c.limit(), 10);
/// assert!(c.has_order());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[must_use]
pub struct Criteria {
    filter: Option<Filter>,
    order: Option<Sort>,
    limit: u64,
    offset: u64,
    include_deleted: bool,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: Where) -> Self {
        self.filter = Some(Filter::Expr(filter));
        self
    }

    /// Use a raw SQL predicate as the filter.
    pub fn with_raw_filter(mut self, sql: impl Into<String>) -> Self {
        self.filter = Some(Filter::Raw(sql.into()));
        self
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = Some(Sort::Expr(order));
        self
    }

    /// Use a raw SQL ordering list, e.g. `"Age DESC"`.
    pub fn with_raw_order(mut self, sql: impl Into<String>) -> Self {
        self.order = Some(Sort::Raw(sql.into()));
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Include soft-deleted rows.
    pub fn with_deleted(mut self, include: bool) -> Self {
        self.include_deleted = include;
        self
    }

    #[must_use]
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    #[must_use]
    pub fn order(&self) -> Option<&Sort> {
        self.order.as_ref()
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub fn include_deleted(&self) -> bool {
        self.include_deleted
    }

    /// True when an ordering that renders non-empty is set.
    #[must_use]
    pub fn has_order(&self) -> bool {
        match &self.order {
            Some(Sort::Expr(o)) => !o.is_empty(),
            Some(Sort::Raw(s)) => !s.trim().is_empty(),
            None => false,
        }
    }

    /// `WHERE` clause, including the soft-delete guard unless deleted rows are included.
    ///
    /// Without a filter the guard is rendered as `WHERE <DeleteDate> IS NULL` with no leading
    /// space; with a filter it is appended as ` AND <DeleteDate> IS NULL`.
    #[must_use]
    pub fn where_string(&self, dialect: &dyn Dialect) -> String {
        let filter = match &self.filter {
            Some(Filter::Expr(w)) => w.to_sql(dialect),
            Some(Filter::Raw(s)) => s.trim().to_owned(),
            None => String::new(),
        };

        let mut out = String::new();
        if !filter.is_empty() {
            out.push_str(" WHERE ");
            out.push_str(&filter);
        }
        if !self.include_deleted {
            out.push_str(if filter.is_empty() { "WHERE" } else { " AND" });
            out.push(' ');
            out.push_str(&dialect.identity(DELETE_DATE));
            out.push_str(" IS NULL");
        }
        out
    }

    /// ` ORDER BY ...` or empty.
    #[must_use]
    pub fn order_string(&self, dialect: &dyn Dialect) -> String {
        let order = match &self.order {
            Some(Sort::Expr(o)) => o.to_sql(dialect),
            Some(Sort::Raw(s)) => s.trim().to_owned(),
            None => String::new(),
        };
        if order.is_empty() {
            order
        } else {
            format!(" ORDER BY {order}")
        }
    }

    #[must_use]
    pub fn limit_string(&self, dialect: &dyn Dialect) -> String {
        dialect.limit_string(self)
    }

    #[must_use]
    pub fn offset_string(&self, dialect: &dyn Dialect) -> String {
        dialect.offset_string(self)
    }

    /// Full criteria suffix appended to a `SELECT`.
    #[must_use]
    pub fn render(&self, dialect: &dyn Dialect) -> String {
        dialect.build_query(
            &self.where_string(dialect),
            &self.order_string(dialect),
            &self.limit_string(dialect),
            &self.offset_string(dialect),
        )
    }
}

/// One caller-supplied criteria argument.
#[derive(Clone, Debug, PartialEq)]
pub enum CriteriaArg {
    Criteria(Criteria),
    Where(Where),
    Order(Order),
    /// An entity ID (when it looks like a UUID) or a raw SQL predicate.
    Text(String),
    None,
    /// A runtime value of an unrecognized shape; assembling it fails.
    Invalid(&'static str),
}

impl CriteriaArg {
    /// Use the `Display` rendering of `value` as text.
    #[must_use]
    pub fn display(value: &impl fmt::Display) -> Self {
        CriteriaArg::Text(value.to_string())
    }

    /// Classify a value whose type is only known at runtime.
    ///
    /// Unrecognized shapes become [`CriteriaArg::Invalid`].
    #[must_use]
    pub fn dynamic(value: &dyn Any) -> Self {
        if let Some(c) = value.downcast_ref::<Criteria>() {
            CriteriaArg::Criteria(c.clone())
        } else if let Some(w) = value.downcast_ref::<Where>() {
            CriteriaArg::Where(w.clone())
        } else if let Some(o) = value.downcast_ref::<Order>() {
            CriteriaArg::Order(o.clone())
        } else if let Some(s) = value.downcast_ref::<String>() {
            CriteriaArg::Text(s.clone())
        } else if let Some(s) = value.downcast_ref::<&str>() {
            CriteriaArg::Text((*s).to_owned())
        } else if let Some(u) = value.downcast_ref::<uuid::Uuid>() {
            CriteriaArg::Text(u.to_string())
        } else if value.is::<()>() {
            CriteriaArg::None
        } else {
            CriteriaArg::Invalid("invalid criteria format")
        }
    }

    fn into_criteria(self) -> Option<Result<Criteria>> {
        Some(Ok(match self {
            CriteriaArg::Criteria(c) => c,
            CriteriaArg::Where(w) => Criteria::new().with_filter(w),
            CriteriaArg::Order(o) => Criteria::new().with_order(o),
            CriteriaArg::Text(s) if UUID_RE.is_match(&s) => {
                Criteria::new().with_filter(Where::equal(ID, s.trim()))
            }
            CriteriaArg::Text(s) => Criteria::new().with_raw_filter(s),
            CriteriaArg::Invalid(reason) => {
                return Some(Err(DbError::InvalidCriteria(reason.to_owned())));
            }
            CriteriaArg::None => return None,
        }))
    }
}

impl From<Criteria> for CriteriaArg {
    fn from(c: Criteria) -> Self {
        CriteriaArg::Criteria(c)
    }
}

impl From<&Criteria> for CriteriaArg {
    fn from(c: &Criteria) -> Self {
        CriteriaArg::Criteria(c.clone())
    }
}

impl From<Where> for CriteriaArg {
    fn from(w: Where) -> Self {
        CriteriaArg::Where(w)
    }
}

impl From<Order> for CriteriaArg {
    fn from(o: Order) -> Self {
        CriteriaArg::Order(o)
    }
}

impl From<&str> for CriteriaArg {
    fn from(s: &str) -> Self {
        CriteriaArg::Text(s.to_owned())
    }
}

impl From<String> for CriteriaArg {
    fn from(s: String) -> Self {
        CriteriaArg::Text(s)
    }
}

impl From<&String> for CriteriaArg {
    fn from(s: &String) -> Self {
        CriteriaArg::Text(s.clone())
    }
}

impl From<uuid::Uuid> for CriteriaArg {
    fn from(u: uuid::Uuid) -> Self {
        CriteriaArg::Text(u.to_string())
    }
}

impl From<()> for CriteriaArg {
    fn from((): ()) -> Self {
        CriteriaArg::None
    }
}

impl<T: Into<CriteriaArg>> From<Option<T>> for CriteriaArg {
    fn from(v: Option<T>) -> Self {
        v.map_or(CriteriaArg::None, Into::into)
    }
}

/// Ordered list of criteria arguments as accepted by engine operations.
#[derive(Clone, Debug, Default, PartialEq)]
#[must_use]
pub struct CriteriaArgs(Vec<CriteriaArg>);

impl CriteriaArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, arg: impl Into<CriteriaArg>) -> Self {
        self.0.push(arg.into());
        self
    }

    /// Normalize into a single [`Criteria`].
    ///
    /// The first argument that is not `None` decides; with none the result is an empty
    /// criteria.
    ///
    /// # Errors
    /// Returns `DbError::InvalidCriteria` when the deciding argument is
    /// [`CriteriaArg::Invalid`].
    pub fn assemble(self) -> Result<Criteria> {
        self.0
            .into_iter()
            .find_map(CriteriaArg::into_criteria)
            .unwrap_or_else(|| Ok(Criteria::new()))
    }
}

macro_rules! single_arg {
    ($($t:ty),+ $(,)?) => {
        $(
            impl From<$t> for CriteriaArgs {
                fn from(v: $t) -> Self {
                    Self(vec![v.into()])
                }
            }
        )+
    };
}

single_arg!(CriteriaArg, Criteria, &Criteria, Where, Order, &str, String, &String, uuid::Uuid);

impl From<()> for CriteriaArgs {
    fn from((): ()) -> Self {
        Self::default()
    }
}

impl<T: Into<CriteriaArg>> From<Option<T>> for CriteriaArgs {
    fn from(v: Option<T>) -> Self {
        Self(vec![v.into()])
    }
}

impl From<Vec<CriteriaArg>> for CriteriaArgs {
    fn from(v: Vec<CriteriaArg>) -> Self {
        Self(v)
    }
}

impl<A: Into<CriteriaArg>, B: Into<CriteriaArg>> From<(A, B)> for CriteriaArgs {
    fn from((a, b): (A, B)) -> Self {
        Self(vec![a.into(), b.into()])
    }
}
