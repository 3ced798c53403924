//! Field access traits
//!
//! [`Structure`] is implemented by `#[derive(Structure)]` and exposes a
//! static field table plus index based accessors. [`Field`] is implemented
//! by every type that may appear as a field: scalars, derived structures,
//! `Option<T>` and `Box<T>`.

use crate::codec::Scalar;

/// One annotation literal attached to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Annotation {
    /// Namespace the literal belongs to (`pms`, `asm`, ...)
    pub namespace: &'static str,
    /// Raw annotation literal
    pub literal: &'static str,
}

/// Static description of one field of a structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field identifier
    pub name: &'static str,
    /// Annotations in declaration order
    pub annotations: &'static [Annotation],
}

impl FieldDescriptor {
    /// Create a descriptor
    #[inline]
    #[must_use]
    pub const fn new(name: &'static str, annotations: &'static [Annotation]) -> Self {
        Self { name, annotations }
    }

    /// Annotation literal for `namespace`
    #[must_use]
    pub fn annotation(&self, namespace: &str) -> Option<&'static str> {
        self.annotations
            .iter()
            .find(|a| a.namespace == namespace)
            .map(|a| a.literal)
    }
}

/// Shared view of a field
pub enum FieldRef<'a> {
    /// Scalar leaf
    Scalar(&'a dyn Scalar),
    /// Nested structure
    Struct(&'a dyn Structure),
    /// Optional field that currently holds nothing
    Absent,
}

/// Mutable view of a field
pub enum FieldMut<'a> {
    /// Scalar leaf
    Scalar(&'a mut dyn Scalar),
    /// Nested structure
    Struct(&'a mut dyn Structure),
    /// Optional field that currently holds nothing
    Absent,
}

/// A value that may be a field of a [`Structure`]
pub trait Field {
    /// Shared view
    fn as_field(&self) -> FieldRef<'_>;

    /// Mutable view
    fn as_field_mut(&mut self) -> FieldMut<'_>;

    /// Instantiate an absent optional value with its default
    ///
    /// Returns `true` if a value was created.
    fn materialize(&mut self) -> bool {
        false
    }

    /// Default stand-in for an absent optional value
    ///
    /// The walker describes the fields of the stand-in instead of the
    /// value, which stays absent.
    fn prototype(&self) -> Option<Box<dyn Field>> {
        None
    }
}

/// A structure with a static field table
///
/// Derive it with `#[derive(Structure)]`; the type must also be serde
/// serializable so annotated sub-structures can be folded into JSON.
pub trait Structure {
    /// Name of the Rust type
    fn type_name(&self) -> &'static str;

    /// Field table in declaration order
    fn fields(&self) -> &'static [FieldDescriptor];

    /// Field at `index` of the table
    fn field(&self, index: usize) -> Option<&dyn Field>;

    /// Mutable field at `index` of the table
    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Field>;

    /// Serialize the whole structure as a JSON object
    ///
    /// # Errors
    /// Returns the serializer error.
    fn to_json(&self) -> Result<String, serde_json::Error>;

    /// Replace the structure with the JSON object in `raw`
    ///
    /// # Errors
    /// Returns the deserializer error; the structure is unchanged then.
    fn merge_json(&mut self, raw: &str) -> Result<(), serde_json::Error>;
}

impl<T: Field + Default + 'static> Field for Option<T> {
    fn as_field(&self) -> FieldRef<'_> {
        match self {
            Some(value) => value.as_field(),
            None => FieldRef::Absent,
        }
    }

    fn as_field_mut(&mut self) -> FieldMut<'_> {
        match self {
            Some(value) => value.as_field_mut(),
            None => FieldMut::Absent,
        }
    }

    fn materialize(&mut self) -> bool {
        if self.is_some() {
            return false;
        }
        *self = Some(T::default());
        true
    }

    fn prototype(&self) -> Option<Box<dyn Field>> {
        match self {
            Some(value) => value.prototype(),
            None => Some(Box::new(T::default())),
        }
    }
}

impl<T: Field + ?Sized> Field for Box<T> {
    fn as_field(&self) -> FieldRef<'_> {
        (**self).as_field()
    }

    fn as_field_mut(&mut self) -> FieldMut<'_> {
        (**self).as_field_mut()
    }

    fn materialize(&mut self) -> bool {
        (**self).materialize()
    }

    fn prototype(&self) -> Option<Box<dyn Field>> {
        (**self).prototype()
    }
}

/// Follow an index path from `root` to a field
#[must_use]
pub fn resolve<'a>(root: &'a dyn Field, path: &[usize]) -> Option<&'a dyn Field> {
    let mut current = root;
    for &index in path {
        current = match current.as_field() {
            FieldRef::Struct(structure) => structure.field(index)?,
            FieldRef::Scalar(_) | FieldRef::Absent => return None,
        };
    }
    Some(current)
}

/// Follow an index path from `root` to a mutable field
///
/// Absent optionals on the way are materialized when `materialize` is set,
/// otherwise they end the walk.
pub fn resolve_mut<'a>(
    root: &'a mut dyn Field,
    path: &[usize],
    materialize: bool,
) -> Option<&'a mut dyn Field> {
    let mut current = root;
    for &index in path {
        if materialize {
            current.materialize();
        }
        current = match current.as_field_mut() {
            FieldMut::Struct(structure) => structure.field_mut(index)?,
            FieldMut::Scalar(_) | FieldMut::Absent => return None,
        };
    }
    Some(current)
}
