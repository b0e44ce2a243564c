//! Per-row value slots.

use crate::schema::{ArrayElement, ArraySlot, FieldDef, ScalarField, ScalarSlot, Value};

/// The slots of one row being assembled or read back.
///
/// A buffer is created from a table schema and owns one [`Value`] per field
/// together with the default that field resets to. It is a plain value:
/// whoever assembles a row owns its buffer for the duration of the call.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBuffer {
    slots: Vec<Value>,
    defaults: Vec<Value>,
}

impl RowBuffer {
    pub(crate) fn from_fields(fields: &[FieldDef]) -> Self {
        let defaults: Vec<Value> = fields.iter().map(|f| f.default.clone()).collect();
        Self {
            slots: defaults.clone(),
            defaults,
        }
    }

    /// Restores every slot to its registered default and empties every array.
    pub fn reset(&mut self) {
        for (slot, default) in self.slots.iter_mut().zip(&self.defaults) {
            slot.reset_to(default);
        }
    }

    /// Writes a scalar. Ignored for disconnected handles.
    #[inline]
    pub fn set<T: ScalarField>(&mut self, slot: ScalarSlot<T>, value: T) {
        if let Some(current) = slot.index().and_then(|i| self.slots.get_mut(i)) {
            if current.kind() == T::KIND {
                *current = value.into_value();
            }
        }
    }

    /// Reads a scalar. `None` for disconnected handles.
    #[inline]
    #[must_use]
    pub fn get<T: ScalarField>(&self, slot: ScalarSlot<T>) -> Option<T> {
        slot.index()
            .and_then(|i| self.slots.get(i))
            .and_then(T::from_value)
    }

    /// Borrows an array slot. `None` for disconnected handles.
    #[inline]
    #[must_use]
    pub fn array<T: ArrayElement>(&self, slot: ArraySlot<T>) -> Option<&[T]> {
        slot.index()
            .and_then(|i| self.slots.get(i))
            .and_then(T::slice)
    }

    /// Mutably borrows an array slot. `None` for disconnected handles.
    #[inline]
    pub fn array_mut<T: ArrayElement>(&mut self, slot: ArraySlot<T>) -> Option<&mut Vec<T>> {
        slot.index()
            .and_then(|i| self.slots.get_mut(i))
            .and_then(T::vec_mut)
    }

    /// Appends one element to an array slot.
    #[inline]
    pub fn push<T: ArrayElement>(&mut self, slot: ArraySlot<T>, value: T) {
        if let Some(values) = self.array_mut(slot) {
            values.push(value);
        }
    }

    /// Replaces the contents of an array slot.
    pub fn assign<T: ArrayElement>(&mut self, slot: ArraySlot<T>, values: &[T]) {
        if let Some(current) = self.array_mut(slot) {
            current.clear();
            current.extend_from_slice(values);
        }
    }

    /// Raw slot values in schema order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.slots
    }

    /// Slot value at a column index.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.slots.get(index)
    }

    pub(crate) fn value_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.slots.get_mut(index)
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true for a buffer without fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
