//! Columnar tables and the field binding registry.
//!
//! A [`Table`] stores committed rows column by column. Scalar fields map to
//! flat vectors and variable-length fields to [`Jagged`] columns (flattened
//! values plus row offsets).
//!
//! Fields are reached through typed slot handles. [`Table::bind_scalar`] and
//! [`Table::bind_array`] resolve a name first through the alias map and then
//! directly. An unknown name is reported with a warning and yields a
//! disconnected handle; it never fails the whole bind.

use crate::error::{Error, Result};
use crate::row::RowBuffer;
use crate::schema::{ArrayElement, ArraySlot, FieldDef, FieldKind, ScalarField, ScalarSlot, Value};
use log::warn;
use std::collections::HashMap;

/// Variable-length rows stored as one flat vector plus row offsets.
///
/// `offsets` always has `rows + 1` entries and starts at 0; row `i` spans
/// `values[offsets[i]..offsets[i + 1]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Jagged<T> {
    values: Vec<T>,
    offsets: Vec<usize>,
}

impl<T> Default for Jagged<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            offsets: vec![0],
        }
    }
}

impl<T: Copy> Jagged<T> {
    /// Rebuilds a column from flattened values and offsets.
    ///
    /// Returns `None` if the offsets do not describe `values`.
    #[must_use]
    pub fn from_parts(values: Vec<T>, offsets: Vec<usize>) -> Option<Self> {
        let starts_at_zero = offsets.first() == Some(&0);
        let ends_at_len = offsets.last() == Some(&values.len());
        let monotonic = offsets.windows(2).all(|w| w[0] <= w[1]);
        (starts_at_zero && ends_at_len && monotonic).then_some(Self { values, offsets })
    }

    /// Appends one row.
    pub fn push_row(&mut self, row: &[T]) {
        self.values.extend_from_slice(row);
        self.offsets.push(self.values.len());
    }

    /// Borrows row `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[T]> {
        let start = *self.offsets.get(index)?;
        let end = *self.offsets.get(index + 1)?;
        self.values.get(start..end)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All values, row after row.
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Row start offsets, `len() + 1` entries.
    #[must_use]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }
}

/// Storage for one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int(Vec<i32>),
    Float(Vec<f32>),
    Bool(Vec<bool>),
    FloatArray(Jagged<f32>),
    IntArray(Jagged<i32>),
}

impl Column {
    /// Creates an empty column of `kind`.
    #[must_use]
    pub fn new(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Int => Self::Int(Vec::new()),
            FieldKind::Float => Self::Float(Vec::new()),
            FieldKind::Bool => Self::Bool(Vec::new()),
            FieldKind::FloatArray => Self::FloatArray(Jagged::default()),
            FieldKind::IntArray => Self::IntArray(Jagged::default()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Int(_) => FieldKind::Int,
            Self::Float(_) => FieldKind::Float,
            Self::Bool(_) => FieldKind::Bool,
            Self::FloatArray(_) => FieldKind::FloatArray,
            Self::IntArray(_) => FieldKind::IntArray,
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::FloatArray(v) => v.len(),
            Self::IntArray(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends one entry.
    ///
    /// # Errors
    /// Returns [`Error::KindMismatch`] if `value` has a different kind.
    pub fn push(&mut self, value: &Value) -> Result<()> {
        match (self, value) {
            (Self::Int(c), Value::Int(v)) => c.push(*v),
            (Self::Float(c), Value::Float(v)) => c.push(*v),
            (Self::Bool(c), Value::Bool(v)) => c.push(*v),
            (Self::FloatArray(c), Value::FloatArray(v)) => c.push_row(v),
            (Self::IntArray(c), Value::IntArray(v)) => c.push_row(v),
            (column, value) => {
                return Err(Error::KindMismatch {
                    expected: column.kind(),
                    found: value.kind(),
                })
            }
        }
        Ok(())
    }

    /// Copies entry `index` into `slot`, reusing the slot's allocation.
    ///
    /// Returns false if the entry does not exist or the kinds differ.
    pub fn load(&self, index: usize, slot: &mut Value) -> bool {
        match (self, slot) {
            (Self::Int(c), Value::Int(v)) => c.get(index).map(|x| *v = *x).is_some(),
            (Self::Float(c), Value::Float(v)) => c.get(index).map(|x| *v = *x).is_some(),
            (Self::Bool(c), Value::Bool(v)) => c.get(index).map(|x| *v = *x).is_some(),
            (Self::FloatArray(c), Value::FloatArray(v)) => load_row(c, index, v),
            (Self::IntArray(c), Value::IntArray(v)) => load_row(c, index, v),
            _ => false,
        }
    }
}

fn load_row<T: Copy>(column: &Jagged<T>, index: usize, slot: &mut Vec<T>) -> bool {
    match column.row(index) {
        Some(row) => {
            slot.clear();
            slot.extend_from_slice(row);
            true
        }
        None => false,
    }
}

/// A named table: ordered fields, aliases and committed rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    fields: Vec<FieldDef>,
    index: HashMap<String, usize>,
    aliases: HashMap<String, String>,
    columns: Vec<Column>,
    entries: usize,
}

impl Table {
    /// Creates an empty table declaring every field in `fields`.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateField`] if a name appears twice.
    pub fn create(name: impl Into<String>, fields: &[FieldDef]) -> Result<Self> {
        let columns = fields.iter().map(|f| Column::new(f.kind())).collect();
        Self::from_columns(name, fields.to_vec(), columns)
    }

    /// Rebuilds a table from stored columns.
    ///
    /// # Errors
    /// Returns an error if names repeat, if a column kind differs from its
    /// field, or if the columns have different lengths.
    pub fn from_columns(
        name: impl Into<String>,
        fields: Vec<FieldDef>,
        columns: Vec<Column>,
    ) -> Result<Self> {
        let name = name.into();
        if fields.len() != columns.len() {
            return Err(Error::SchemaMismatch {
                table: name,
                reason: format!("{} fields but {} columns", fields.len(), columns.len()),
            });
        }

        let mut index = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            if index.insert(field.name.clone(), i).is_some() {
                return Err(Error::DuplicateField {
                    table: name,
                    field: field.name.clone(),
                });
            }
            if columns[i].kind() != field.kind() {
                return Err(Error::SchemaMismatch {
                    table: name,
                    reason: format!(
                        "field '{}' is {} but its column holds {}",
                        field.name,
                        field.kind(),
                        columns[i].kind()
                    ),
                });
            }
        }

        let entries = columns.first().map_or(0, Column::len);
        if let Some(field) = fields
            .iter()
            .zip(&columns)
            .find(|(_, c)| c.len() != entries)
            .map(|(f, _)| f)
        {
            return Err(Error::SchemaMismatch {
                table: name,
                reason: format!("column '{}' length differs from {entries}", field.name),
            });
        }

        Ok(Self {
            name,
            fields,
            index,
            aliases: HashMap::new(),
            columns,
            entries,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field declarations in schema order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Looks up a field declaration by exact name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// Columns in schema order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Looks up a column by exact name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    /// Number of committed rows.
    #[must_use]
    pub fn entries(&self) -> usize {
        self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Registers `alias` as another name for the field `target`.
    ///
    /// # Errors
    /// Returns [`Error::UnknownAliasTarget`] if `target` is not a field.
    pub fn add_alias(&mut self, alias: impl Into<String>, target: impl Into<String>) -> Result<()> {
        let alias = alias.into();
        let target = target.into();
        if !self.index.contains_key(&target) {
            return Err(Error::UnknownAliasTarget {
                table: self.name.clone(),
                alias,
                target,
            });
        }
        self.aliases.insert(alias, target);
        Ok(())
    }

    /// Registered aliases as `(alias, target)` pairs.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, t)| (a.as_str(), t.as_str()))
    }

    /// Resolves a name to a column index, through the alias map first.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<usize> {
        let name = self.aliases.get(name).map_or(name, String::as_str);
        self.index.get(name).copied()
    }

    fn resolve_kind(&self, name: &str, kind: FieldKind) -> Option<usize> {
        let Some(i) = self.resolve(name) else {
            warn!("unknown field '{name}' in table '{}'", self.name);
            return None;
        };
        let found = self.fields[i].kind();
        if found == kind {
            Some(i)
        } else {
            warn!(
                "field '{name}' in table '{}' is {found}, requested {kind}",
                self.name
            );
            None
        }
    }

    /// Binds a scalar field by name.
    ///
    /// Unknown names and kind mismatches are logged and give a disconnected
    /// handle.
    #[must_use]
    pub fn bind_scalar<T: ScalarField>(&self, name: &str) -> ScalarSlot<T> {
        self.resolve_kind(name, T::KIND)
            .map_or_else(ScalarSlot::disconnected, ScalarSlot::connected)
    }

    /// Binds a variable-length field by name.
    #[must_use]
    pub fn bind_array<T: ArrayElement>(&self, name: &str) -> ArraySlot<T> {
        self.resolve_kind(name, T::KIND)
            .map_or_else(ArraySlot::disconnected, ArraySlot::connected)
    }

    /// Allocates a fresh row buffer with every slot at its default.
    #[must_use]
    pub fn row_buffer(&self) -> RowBuffer {
        RowBuffer::from_fields(&self.fields)
    }

    /// Commits the current contents of `row` as a new entry.
    ///
    /// The row is validated against the schema before anything is written, so
    /// a rejected row leaves the table untouched.
    ///
    /// # Errors
    /// Returns [`Error::SchemaMismatch`] if `row` was not built for this
    /// table's schema.
    pub fn fill(&mut self, row: &RowBuffer) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::SchemaMismatch {
                table: self.name.clone(),
                reason: format!(
                    "row has {} slots, table has {} fields",
                    row.len(),
                    self.columns.len()
                ),
            });
        }
        if let Some((field, value)) = self
            .fields
            .iter()
            .zip(row.values())
            .find(|(f, v)| f.kind() != v.kind())
        {
            return Err(Error::SchemaMismatch {
                table: self.name.clone(),
                reason: format!(
                    "slot '{}' holds {} instead of {}",
                    field.name,
                    value.kind(),
                    field.kind()
                ),
            });
        }

        for (column, value) in self.columns.iter_mut().zip(row.values()) {
            column.push(value)?;
        }
        self.entries += 1;
        Ok(())
    }

    /// Opens the table for reading with no field active.
    #[must_use]
    pub fn reader(&self) -> TableReader<'_> {
        TableReader {
            table: self,
            row: self.row_buffer(),
            active: vec![false; self.fields.len()],
        }
    }
}

/// Read access to a table through rebound field handles.
///
/// Only fields bound through the reader are activated and loaded; every
/// other slot keeps its default.
#[derive(Debug)]
pub struct TableReader<'a> {
    table: &'a Table,
    row: RowBuffer,
    active: Vec<bool>,
}

impl TableReader<'_> {
    /// Binds and activates a scalar field.
    pub fn bind_scalar<T: ScalarField>(&mut self, name: &str) -> ScalarSlot<T> {
        let slot = self.table.bind_scalar(name);
        self.activate(slot.index());
        slot
    }

    /// Binds and activates a variable-length field.
    pub fn bind_array<T: ArrayElement>(&mut self, name: &str) -> ArraySlot<T> {
        let slot = self.table.bind_array(name);
        self.activate(slot.index());
        slot
    }

    fn activate(&mut self, index: Option<usize>) {
        if let Some(i) = index {
            self.active[i] = true;
        }
    }

    /// Returns true if the field at `index` was bound.
    #[must_use]
    pub fn is_active(&self, index: usize) -> bool {
        self.active.get(index).copied().unwrap_or(false)
    }

    /// The table being read.
    #[must_use]
    pub fn table(&self) -> &Table {
        self.table
    }

    /// Number of entries available.
    #[must_use]
    pub fn entries(&self) -> usize {
        self.table.entries()
    }

    /// Loads entry `entry` into the row buffer and returns it.
    ///
    /// # Errors
    /// Returns [`Error::EntryOutOfRange`] past the last entry.
    pub fn read_entry(&mut self, entry: usize) -> Result<&RowBuffer> {
        if entry >= self.table.entries() {
            return Err(Error::EntryOutOfRange {
                table: self.table.name.clone(),
                entry,
                entries: self.table.entries(),
            });
        }
        for (i, column) in self.table.columns.iter().enumerate() {
            if !self.active[i] {
                continue;
            }
            if let Some(slot) = self.row.value_mut(i) {
                column.load(entry, slot);
            }
        }
        Ok(&self.row)
    }

    /// The most recently loaded row.
    #[must_use]
    pub fn row(&self) -> &RowBuffer {
        &self.row
    }
}
