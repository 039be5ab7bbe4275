//! Value encoders: the strategy objects that turn strongly-typed operands
//! into BSON with the representation declared for their field.
//!
//! A filter like `qty.gt(5)` stores the literal `5` as-is; only when the
//! filter is rendered is the field resolved to an encoder, which then
//! produces the BSON form of the operand. This keeps construction pure and
//! lets a [`EncoderRegistry`] swap representations (e.g. store a date as a
//! string) without touching the filter itself.

use std::any::{ Any, TypeId, type_name };
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use bson::Bson;
use serde::Serialize;
use crate::error::{ Error, ErrorKind, Result };
use crate::schema::DocumentSchema;
use crate::writer::DocumentWriter;

/// An erased, clonable host value captured by a typed filter constructor.
pub trait AnyValue: fmt::Debug + Send + Sync {
    /// The value as `Any`, for downcasting by the encoder.
    fn as_any(&self) -> &dyn Any;

    /// Clones the value behind a fresh box.
    fn clone_boxed(&self) -> Box<dyn AnyValue>;
}

impl<T> AnyValue for T
    where T: Any + Clone + fmt::Debug + Send + Sync
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_boxed(&self) -> Box<dyn AnyValue> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn AnyValue> {
    fn clone(&self) -> Self {
        self.clone_boxed()
    }
}

/// Strategy for writing one field type into a filter document.
///
/// Implementors are consulted at render time with the erased operand the
/// builder captured. Array-typed fields additionally expose the encoder of
/// a single element, and embedded-document fields may expose the member
/// metadata of the embedded type.
pub trait ValueEncoder: fmt::Debug + Send + Sync {
    /// Encodes an erased operand into BSON.
    fn encode(&self, value: &dyn Any) -> Result<Bson>;

    /// Streams an encoded operand into the current slot of `writer`.
    fn write(&self, writer: &mut DocumentWriter, value: &dyn Any) -> Result<()> {
        writer.write_bson(self.encode(value)?)
    }

    /// The encoder of a single array element, if this encoder describes
    /// an array-typed field.
    fn element_encoder(&self) -> Option<Arc<dyn ValueEncoder>> {
        None
    }

    /// The member metadata of the encoded type, if this encoder describes
    /// an embedded document.
    fn as_schema(&self) -> Option<Arc<dyn DocumentSchema>> {
        None
    }
}

/// Types that have a canonical [`ValueEncoder`], i.e. types that may appear
/// as the declared type of a filterable field.
///
/// The default encoder simply defers to the type's `Serialize`
/// implementation; `Vec<T>` overrides it with an array-capable encoder.
/// Implementing the trait for a custom field type is a one-liner:
///
/// ```
/// # use serde::{ Serialize, Deserialize };
/// # use mango::encode::Encode;
/// #
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// enum Color { Red, Green, Blue }
///
/// impl Encode for Color {}
/// ```
pub trait Encode: Serialize + Clone + fmt::Debug + Send + Sync + 'static {
    /// The canonical encoder for values of this type.
    fn encoder() -> Arc<dyn ValueEncoder> {
        Arc::new(SerdeEncoder::<Self>::new())
    }
}

/// Implements `Encode` with the default serde-backed encoder.
macro_rules! impl_encode {
    ($($ty:ty,)*) => {
        $(impl Encode for $ty {})*
    }
}

impl_encode! {
    bool,
    i32,
    i64,
    u32,
    u64,
    f32,
    f64,
    String,
    bson::Binary,
    bson::DateTime,
    bson::Decimal128,
    bson::Timestamp,
    bson::oid::ObjectId,
}

impl<T: Encode> Encode for Option<T> {}

impl<T: Encode> Encode for Vec<T> {
    fn encoder() -> Arc<dyn ValueEncoder> {
        Arc::new(VecEncoder::<T>::new())
    }
}

/// The default encoder: encodes `F` through its `Serialize` implementation.
pub struct SerdeEncoder<F> {
    /// Anchors the encoded type without requiring ownership of a value.
    marker: PhantomData<fn(F) -> F>,
}

impl<F> SerdeEncoder<F> {
    /// Creates the encoder.
    pub fn new() -> Self {
        SerdeEncoder { marker: PhantomData }
    }
}

impl<F> Default for SerdeEncoder<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> fmt::Debug for SerdeEncoder<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SerdeEncoder<{}>", type_name::<F>())
    }
}

impl<F: Encode> ValueEncoder for SerdeEncoder<F> {
    fn encode(&self, value: &dyn Any) -> Result<Bson> {
        let value = downcast::<F>(value)?;
        bson::to_bson(value).map_err(Into::into)
    }
}

/// Array-capable encoder for `Vec<T>` fields: encodes every element through
/// the element encoder and exposes that encoder to array operators.
pub struct VecEncoder<T> {
    /// The encoder applied to each element.
    element: Arc<dyn ValueEncoder>,
    /// Anchors the element type.
    marker: PhantomData<fn(T) -> T>,
}

impl<T: Encode> VecEncoder<T> {
    /// Creates the encoder with the canonical element encoder of `T`.
    pub fn new() -> Self {
        Self::with_element(T::encoder())
    }

    /// Creates the encoder around an explicit element encoder, e.g. an
    /// embedded-document encoder carrying the element type's schema.
    pub fn with_element(element: Arc<dyn ValueEncoder>) -> Self {
        VecEncoder { element, marker: PhantomData }
    }
}

impl<T: Encode> Default for VecEncoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for VecEncoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VecEncoder<{}>({:?})", type_name::<T>(), self.element)
    }
}

impl<T: Encode> ValueEncoder for VecEncoder<T> {
    fn encode(&self, value: &dyn Any) -> Result<Bson> {
        let items = downcast::<Vec<T>>(value)?;
        let mut array = Vec::with_capacity(items.len());

        for item in items {
            array.push(self.element.encode(item)?);
        }

        Ok(Bson::Array(array))
    }

    fn element_encoder(&self) -> Option<Arc<dyn ValueEncoder>> {
        Some(Arc::clone(&self.element))
    }
}

/// The identity encoder for operands that are already BSON. Untyped string
/// paths resolve to this encoder; it is array-capable with itself as the
/// element encoder, since pre-encoded array items need no further treatment.
#[derive(Debug, Clone, Copy, Default)]
pub struct BsonEncoder;

impl ValueEncoder for BsonEncoder {
    fn encode(&self, value: &dyn Any) -> Result<Bson> {
        downcast::<Bson>(value).map(Clone::clone)
    }

    fn element_encoder(&self) -> Option<Arc<dyn ValueEncoder>> {
        Some(Arc::new(BsonEncoder))
    }
}

/// Downcasts an erased operand, reporting a mismatch with the expected type.
fn downcast<T: Any>(value: &dyn Any) -> Result<&T> {
    value.downcast_ref::<T>().ok_or_else(|| Error::new(
        ErrorKind::SerializerMismatch,
        format!("operand is not of the declared field type `{}`", type_name::<T>()),
    ))
}

/// Maps field types to encoder overrides, consulted before the canonical
/// encoder captured at filter construction.
#[derive(Debug, Default)]
pub struct EncoderRegistry {
    /// Overrides by the `TypeId` of the declared field type.
    encoders: HashMap<TypeId, Arc<dyn ValueEncoder>>,
}

impl EncoderRegistry {
    /// Creates an empty registry: every field uses its canonical encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an encoder override for the field type `F`.
    pub fn register<F: Encode>(&mut self, encoder: Arc<dyn ValueEncoder>) {
        self.encoders.insert(TypeId::of::<F>(), encoder);
    }

    /// Looks up the override for a declared field type, if any.
    pub fn get(&self, ty: TypeId) -> Option<Arc<dyn ValueEncoder>> {
        self.encoders.get(&ty).map(Arc::clone)
    }

    /// The number of registered overrides.
    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    /// Returns `true` if no overrides have been registered.
    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use bson::Bson;
    use crate::error::{ ErrorKind, Result };
    use super::*;

    #[test]
    fn serde_encoder_encodes_declared_type() -> Result<()> {
        let encoder = SerdeEncoder::<i64>::new();

        assert_eq!(encoder.encode(&42_i64)?, Bson::Int64(42));
        assert_eq!(encoder.encode(&String::from("oops")).unwrap_err().kind(),
                   ErrorKind::SerializerMismatch);

        Ok(())
    }

    #[test]
    fn vec_encoder_exposes_element_encoder() -> Result<()> {
        let encoder = VecEncoder::<i32>::new();
        let element = encoder.element_encoder().ok_or_else(|| {
            crate::error::Error::new(ErrorKind::SerializerMismatch, "no element encoder")
        })?;

        assert_eq!(element.encode(&7_i32)?, Bson::Int32(7));
        assert_eq!(encoder.encode(&vec![1_i32, 2, 3])?,
                   Bson::Array(vec![Bson::Int32(1), Bson::Int32(2), Bson::Int32(3)]));

        Ok(())
    }

    #[test]
    fn scalar_encoders_are_not_array_capable() {
        assert!(SerdeEncoder::<i32>::new().element_encoder().is_none());
        assert!(VecEncoder::<i32>::new().element_encoder().is_some());
        assert!(BsonEncoder.element_encoder().is_some());
    }

    #[test]
    fn registry_overrides_win() -> Result<()> {
        use std::any::TypeId;

        let mut registry = EncoderRegistry::new();
        assert!(registry.is_empty());

        registry.register::<i64>(Arc::new(BsonEncoder));

        assert_eq!(registry.len(), 1);
        assert!(registry.get(TypeId::of::<i64>()).is_some());
        assert!(registry.get(TypeId::of::<i32>()).is_none());

        Ok(())
    }
}
