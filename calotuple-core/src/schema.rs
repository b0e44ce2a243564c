//! Field schema and typed binding handles.
//!
//! A table schema is an ordered list of [`FieldDef`]s. Every field carries
//! its default value, which also fixes its [`FieldKind`]. Callers never look
//! fields up by name per row: names are resolved once into
//! [`ScalarSlot`]/[`ArraySlot`] handles, which are plain indices.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

/// Storage kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Int,
    Float,
    Bool,
    FloatArray,
    IntArray,
}

impl FieldKind {
    /// Returns true for variable-length kinds.
    #[must_use]
    pub fn is_array(self) -> bool {
        matches!(self, Self::FloatArray | Self::IntArray)
    }

    /// Short type name used in file headers.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::FloatArray => "float[]",
            Self::IntArray => "int[]",
        }
    }

    /// The zero value of this kind (`0`, `false`, or an empty array).
    #[must_use]
    pub fn zero(self) -> Value {
        match self {
            Self::Int => Value::Int(0),
            Self::Float => Value::Float(0.0),
            Self::Bool => Value::Bool(false),
            Self::FloatArray => Value::FloatArray(Vec::new()),
            Self::IntArray => Value::IntArray(Vec::new()),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "bool" => Ok(Self::Bool),
            "float[]" => Ok(Self::FloatArray),
            "int[]" => Ok(Self::IntArray),
            other => Err(format!("unknown field kind '{other}'")),
        }
    }
}

/// The value held by one slot of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    Bool(bool),
    FloatArray(Vec<f32>),
    IntArray(Vec<i32>),
}

impl Value {
    /// Returns the kind of this value.
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

    /// Restores this slot to `default`.
    ///
    /// Arrays are cleared in place so their allocation is reused by the next
    /// row. `default` must have the same kind.
    pub(crate) fn reset_to(&mut self, default: &Value) {
        match (self, default) {
            (Self::FloatArray(values), _) => values.clear(),
            (Self::IntArray(values), _) => values.clear(),
            (slot, default) => slot.clone_from(default),
        }
    }
}

/// Declaration of one field: its name and its default value.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub default: Value,
}

impl FieldDef {
    /// Declares a field with an explicit default.
    ///
    /// Array fields always reset to empty, whatever `default` holds.
    pub fn new(name: impl Into<String>, default: Value) -> Self {
        let default = match default {
            Value::FloatArray(_) => Value::FloatArray(Vec::new()),
            Value::IntArray(_) => Value::IntArray(Vec::new()),
            scalar => scalar,
        };
        Self {
            name: name.into(),
            default,
        }
    }

    pub fn int(name: impl Into<String>, default: i32) -> Self {
        Self::new(name, Value::Int(default))
    }

    pub fn float(name: impl Into<String>, default: f32) -> Self {
        Self::new(name, Value::Float(default))
    }

    pub fn bool(name: impl Into<String>, default: bool) -> Self {
        Self::new(name, Value::Bool(default))
    }

    pub fn float_array(name: impl Into<String>) -> Self {
        Self::new(name, Value::FloatArray(Vec::new()))
    }

    pub fn int_array(name: impl Into<String>) -> Self {
        Self::new(name, Value::IntArray(Vec::new()))
    }

    /// Returns the field kind.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.default.kind()
    }
}

/// Rust types that can live in a scalar slot.
pub trait ScalarField: Copy + fmt::Debug {
    /// The slot kind this type maps to.
    const KIND: FieldKind;

    /// Wraps the value.
    fn into_value(self) -> Value;

    /// Unwraps a value of the matching kind.
    fn from_value(value: &Value) -> Option<Self>;
}

impl ScalarField for i32 {
    const KIND: FieldKind = FieldKind::Int;

    fn into_value(self) -> Value {
        Value::Int(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl ScalarField for f32 {
    const KIND: FieldKind = FieldKind::Float;

    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl ScalarField for bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

/// Element types of variable-length slots.
pub trait ArrayElement: Copy + fmt::Debug {
    /// The slot kind an array of this type maps to.
    const KIND: FieldKind;

    /// Borrows the elements of a value of the matching kind.
    fn slice(value: &Value) -> Option<&[Self]>;

    /// Mutably borrows the elements of a value of the matching kind.
    fn vec_mut(value: &mut Value) -> Option<&mut Vec<Self>>;
}

impl ArrayElement for f32 {
    const KIND: FieldKind = FieldKind::FloatArray;

    fn slice(value: &Value) -> Option<&[Self]> {
        match value {
            Value::FloatArray(v) => Some(v),
            _ => None,
        }
    }

    fn vec_mut(value: &mut Value) -> Option<&mut Vec<Self>> {
        match value {
            Value::FloatArray(v) => Some(v),
            _ => None,
        }
    }
}

impl ArrayElement for i32 {
    const KIND: FieldKind = FieldKind::IntArray;

    fn slice(value: &Value) -> Option<&[Self]> {
        match value {
            Value::IntArray(v) => Some(v),
            _ => None,
        }
    }

    fn vec_mut(value: &mut Value) -> Option<&mut Vec<Self>> {
        match value {
            Value::IntArray(v) => Some(v),
            _ => None,
        }
    }
}

/// Handle to a scalar slot, resolved once from a field name.
///
/// A disconnected handle (unknown field) never yields data: reads return
/// `None` and writes are dropped.
#[derive(Debug, PartialEq, Eq)]
pub struct ScalarSlot<T> {
    index: Option<usize>,
    _marker: PhantomData<T>,
}

/// Handle to a variable-length slot, resolved once from a field name.
#[derive(Debug, PartialEq, Eq)]
pub struct ArraySlot<T> {
    index: Option<usize>,
    _marker: PhantomData<T>,
}

macro_rules! impl_slot {
    ($slot:ident) => {
        impl<T> $slot<T> {
            pub(crate) fn connected(index: usize) -> Self {
                Self {
                    index: Some(index),
                    _marker: PhantomData,
                }
            }

            /// A handle bound to nothing.
            #[must_use]
            pub fn disconnected() -> Self {
                Self {
                    index: None,
                    _marker: PhantomData,
                }
            }

            /// Returns true if the handle resolved to a field.
            #[must_use]
            pub fn is_connected(&self) -> bool {
                self.index.is_some()
            }

            /// Column index of the bound field.
            #[must_use]
            pub fn index(&self) -> Option<usize> {
                self.index
            }
        }

        impl<T> Clone for $slot<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T> Copy for $slot<T> {}
    };
}

impl_slot!(ScalarSlot);
impl_slot!(ArraySlot);
