use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::column::Column;
use super::field::{CREATE_DATE, DELETE_DATE, ID, LAST_UPDATE};
use crate::expr::Value;

/// Bookkeeping columns carried by every entity.
///
/// `id` is `None` until the entity is first saved.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: Option<String>,
    pub create_date: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub delete_date: Option<DateTime<Utc>>,
}

impl Model {
    /// A new, unsaved model stamped with the current time.
    #[must_use]
    pub fn new() -> Self {
        let now = now();
        Self {
            id: None,
            create_date: now,
            last_update: now,
            delete_date: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// True until the entity has been persisted.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// True when soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.delete_date.is_some()
    }

    /// Mark as soft-deleted now. Persisted on the next save.
    pub fn disable(&mut self) {
        self.delete_date = Some(now());
    }

    /// Values of `LastUpdate` and `DeleteDate`, the bookkeeping columns an update writes.
    pub(crate) fn update_values(&self) -> [(&'static str, Value); 2] {
        [
            (LAST_UPDATE, self.last_update.to_value()),
            (DELETE_DATE, self.delete_date.to_value()),
        ]
    }

    /// Assign a bookkeeping column from a result cell. Returns `false` for other columns.
    pub(crate) fn assign(&mut self, column: &str, cell: Option<&str>) -> bool {
        let matches = |name: &str| column.eq_ignore_ascii_case(name);
        if matches(ID) {
            if let Some(v) = <Option<String>>::from_cell(cell) {
                self.id = v;
            }
        } else if matches(CREATE_DATE) {
            if let Some(v) = <DateTime<Utc>>::from_cell(cell) {
                self.create_date = v;
            }
        } else if matches(LAST_UPDATE) {
            if let Some(v) = <DateTime<Utc>>::from_cell(cell) {
                self.last_update = v;
            }
        } else if matches(DELETE_DATE) {
            if let Some(v) = <Option<DateTime<Utc>>>::from_cell(cell) {
                self.delete_date = v;
            }
        } else {
            return false;
        }
        true
    }
}

/// Current time at the millisecond precision timestamps are stored with.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
