//! Value codec
//!
//! Converts leaf values to and from the string form stored remotely.
//! Scalars use their canonical textual form, annotated sub-structures are
//! folded into a JSON object.

use crate::error::CodecError;
use crate::field::{Field, FieldMut, FieldRef};
use std::collections::{BTreeMap, HashMap};

/// Kind of scalar value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// UTF-8 string, passed through unchanged
    String,
    /// Signed integer of any width
    Signed,
    /// Unsigned integer of any width
    Unsigned,
    /// `true` / `false`
    Bool,
    /// Floating point
    Float,
    /// Collections and other kinds without a wire form
    Unsupported,
}

/// Rejected wire value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarParseError(pub String);

/// A leaf value with a textual wire form
pub trait Scalar {
    /// Kind of the value
    fn kind(&self) -> ScalarKind;

    /// Wire form of the value
    fn encode(&self) -> String;

    /// Replace the value with the parsed wire form
    ///
    /// # Errors
    /// Returns [`ScalarParseError`] when the input is rejected. Only integer
    /// kinds reject input; other kinds ignore what they cannot parse.
    fn decode(&mut self, raw: &str) -> Result<(), ScalarParseError>;
}

macro_rules! impl_scalar_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Field for $ty {
                fn as_field(&self) -> FieldRef<'_> {
                    FieldRef::Scalar(self)
                }

                fn as_field_mut(&mut self) -> FieldMut<'_> {
                    FieldMut::Scalar(self)
                }
            }
        )*
    };
}

macro_rules! impl_integer {
    ($kind:expr => $($ty:ty),* $(,)?) => {
        $(
            impl Scalar for $ty {
                fn kind(&self) -> ScalarKind {
                    $kind
                }

                fn encode(&self) -> String {
                    self.to_string()
                }

                fn decode(&mut self, raw: &str) -> Result<(), ScalarParseError> {
                    *self = raw
                        .trim()
                        .parse()
                        .map_err(|e: std::num::ParseIntError| ScalarParseError(e.to_string()))?;
                    Ok(())
                }
            }

            impl_scalar_field!($ty);
        )*
    };
}

impl_integer!(ScalarKind::Signed => i8, i16, i32, i64, i128, isize);
impl_integer!(ScalarKind::Unsigned => u8, u16, u32, u64, u128, usize);

macro_rules! impl_float {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Scalar for $ty {
                fn kind(&self) -> ScalarKind {
                    ScalarKind::Float
                }

                // Display is the shortest representation that round-trips
                fn encode(&self) -> String {
                    self.to_string()
                }

                fn decode(&mut self, raw: &str) -> Result<(), ScalarParseError> {
                    if let Ok(value) = raw.trim().parse() {
                        *self = value;
                    }
                    Ok(())
                }
            }

            impl_scalar_field!($ty);
        )*
    };
}

impl_float!(f32, f64);

impl Scalar for String {
    fn kind(&self) -> ScalarKind {
        ScalarKind::String
    }

    fn encode(&self) -> String {
        self.clone()
    }

    fn decode(&mut self, raw: &str) -> Result<(), ScalarParseError> {
        raw.clone_into(self);
        Ok(())
    }
}

impl Scalar for bool {
    fn kind(&self) -> ScalarKind {
        ScalarKind::Bool
    }

    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(&mut self, raw: &str) -> Result<(), ScalarParseError> {
        if let Ok(value) = raw.trim().parse() {
            *self = value;
        }
        Ok(())
    }
}

impl_scalar_field!(String, bool);

macro_rules! impl_unsupported {
    ($([$($generics:tt)*] $ty:ty),* $(,)?) => {
        $(
            impl<$($generics)*> Scalar for $ty {
                fn kind(&self) -> ScalarKind {
                    ScalarKind::Unsupported
                }

                fn encode(&self) -> String {
                    String::new()
                }

                fn decode(&mut self, _raw: &str) -> Result<(), ScalarParseError> {
                    Ok(())
                }
            }

            impl<$($generics)*> Field for $ty {
                fn as_field(&self) -> FieldRef<'_> {
                    FieldRef::Scalar(self)
                }

                fn as_field_mut(&mut self) -> FieldMut<'_> {
                    FieldMut::Scalar(self)
                }
            }
        )*
    };
}

impl_unsupported!(
    [T] Vec<T>,
    [K, V, S] HashMap<K, V, S>,
    [K, V] BTreeMap<K, V>,
);

/// Wire form of a field
///
/// Sub-structures are serialized as JSON, absent optionals as an empty
/// string.
///
/// # Errors
/// Returns [`CodecError::Json`] when a sub-structure cannot be serialized.
pub fn to_wire(name: &str, field: &dyn Field) -> Result<String, CodecError> {
    match field.as_field() {
        FieldRef::Scalar(scalar) => Ok(scalar.encode()),
        FieldRef::Struct(structure) => structure
            .to_json()
            .map_err(|source| CodecError::json(name, source)),
        FieldRef::Absent => Ok(String::new()),
    }
}

/// Apply a wire value to a field
///
/// An absent optional is materialized first.
///
/// # Errors
/// Returns [`CodecError::InvalidValue`] for rejected integers and
/// [`CodecError::Json`] for malformed sub-structure JSON.
pub fn from_wire(name: &str, field: &mut dyn Field, raw: &str) -> Result<(), CodecError> {
    if matches!(field.as_field_mut(), FieldMut::Absent) {
        field.materialize();
    }

    match field.as_field_mut() {
        FieldMut::Scalar(scalar) => scalar
            .decode(raw)
            .map_err(|e| CodecError::invalid_value(name, raw, e.0)),
        FieldMut::Struct(structure) => structure
            .merge_json(raw)
            .map_err(|source| CodecError::json(name, source)),
        FieldMut::Absent => Ok(()),
    }
}
