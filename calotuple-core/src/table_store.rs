//! The set of output tables of one run.

use crate::error::{Error, Result};
use crate::row::RowBuffer;
use crate::schema::FieldDef;
use crate::table::Table;

/// Named tables in creation order.
///
/// A run books its tables once and then fills them event by event. All
/// mutation goes through `&mut self`, so there is exactly one writer per
/// store at any time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableStore {
    tables: Vec<Table>,
}

impl TableStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table declaring `fields` and returns it.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateTable`] if the name is taken, or any error of
    /// [`Table::create`].
    pub fn create_table(&mut self, name: &str, fields: &[FieldDef]) -> Result<&mut Table> {
        let table = Table::create(name, fields)?;
        self.insert(table)
    }

    /// Adds an already built table, e.g. one read back from disk.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateTable`] if the name is taken.
    pub fn insert(&mut self, table: Table) -> Result<&mut Table> {
        if self.table(table.name()).is_some() {
            return Err(Error::DuplicateTable(table.name().to_string()));
        }
        self.tables.push(table);
        let last = self.tables.len() - 1;
        Ok(&mut self.tables[last])
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name() == name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name() == name)
    }

    /// Commits `row` to the table `name`.
    ///
    /// # Errors
    /// Returns [`Error::UnknownTable`] or any error of [`Table::fill`].
    pub fn fill(&mut self, name: &str, row: &RowBuffer) -> Result<()> {
        self.table_mut(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))?
            .fill(row)
    }

    /// Tables in creation order.
    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_fill_by_name() {
        let mut store = TableStore::new();
        let table = store
            .create_table("physics", &[FieldDef::float("seed_et", 0.0)])
            .unwrap();
        let et = table.bind_scalar::<f32>("seed_et");
        let mut row = table.row_buffer();
        row.set(et, 5.0);

        store.fill("physics", &row).unwrap();
        store.fill("physics", &row).unwrap();
        assert_eq!(store.table("physics").unwrap().entries(), 2);

        assert!(matches!(
            store.fill("raw", &row),
            Err(Error::UnknownTable(name)) if name == "raw"
        ));
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let mut store = TableStore::new();
        store.create_table("physics", &[]).unwrap();
        assert!(matches!(
            store.create_table("physics", &[]),
            Err(Error::DuplicateTable(_))
        ));
        assert_eq!(store.len(), 1);
    }
}
