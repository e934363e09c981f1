/// One result row: named cells as optional text, in select order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RowData {
    cells: Vec<(String, Option<String>)>,
}

impl RowData {
    pub(crate) fn new(cells: Vec<(String, Option<String>)>) -> Self {
        Self { cells }
    }

    /// Cell of `column` (case-insensitive). `None` for a NULL cell or an unknown column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .and_then(|(_, cell)| cell.as_deref())
    }

    /// True when the row has a column named `column`, NULL or not.
    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.cells.iter().any(|(name, _)| name.eq_ignore_ascii_case(column))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    /// `(column, cell)` pairs in select order.
    pub fn cells(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.cells
            .iter()
            .map(|(name, cell)| (name.as_str(), cell.as_deref()))
    }

    /// First cell of the row.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.cells.first().and_then(|(_, cell)| cell.as_deref())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
