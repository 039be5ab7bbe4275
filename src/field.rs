//! Field handles: references to a path inside a document type, resolved at
//! render time to a server-side dotted path plus the encoder of the field's
//! declared type.
//!
//! Handles come in four flavors:
//!
//! 1. **Untyped path** ([`Field::path`]): a raw dotted string; operands must
//!    already be BSON values.
//! 2. **Typed path** ([`TypedField::new`]): a dotted string plus a declared
//!    field type; the encoder comes from the registry, falling back to the
//!    type's canonical encoder.
//! 3. **Member chain** ([`TypedField::members`]): host-side member names,
//!    resolved by walking the document schema; segments are translated to
//!    wire names and numeric segments index into array members.
//! 4. **Pre-resolved** ([`TypedField::precompiled`]): a ready-made
//!    `(path, encoder)` pair, e.g. the output of an external expression
//!    compiler.

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use crate::encode::{ BsonEncoder, Encode, EncoderRegistry, ValueEncoder };
use crate::error::{ Error, ErrorKind, Result };
use crate::schema::DocumentSchema;

/// An erased field handle, as stored inside filter terms.
#[derive(Debug, Clone)]
pub struct Field {
    /// The flavor of the handle.
    kind: FieldKind,
}

/// The flavors of a field handle.
#[derive(Debug, Clone)]
enum FieldKind {
    /// Raw dotted path; operands are pre-encoded BSON.
    Path(Cow<'static, str>),
    /// Dotted path with a declared field type.
    Typed {
        /// The dotted path, used verbatim.
        path: Cow<'static, str>,
        /// `TypeId` of the declared type, for registry lookup.
        ty: TypeId,
        /// The canonical encoder captured at construction.
        fallback: Arc<dyn ValueEncoder>,
    },
    /// Host-side member names, resolved against the document schema.
    Members(Vec<Cow<'static, str>>),
    /// A ready-made resolution.
    Resolved(ResolvedField),
}

/// The output of field resolution.
#[derive(Debug, Clone)]
pub struct ResolvedField {
    /// Dot-separated server-side path.
    pub path: String,
    /// Encoder for the field's declared value type.
    pub encoder: Arc<dyn ValueEncoder>,
}

impl ResolvedField {
    /// The encoder of a single array element of this field.
    /// Fails if the field's encoder is not array-capable.
    pub fn element_encoder(&self) -> Result<Arc<dyn ValueEncoder>> {
        self.encoder.element_encoder().ok_or_else(|| Error::new(
            ErrorKind::SerializerMismatch,
            format!("serializer for field `{}` is not array-capable", self.path),
        ))
    }
}

impl Field {
    /// Creates an untyped handle from a raw dotted path.
    pub fn path<P: Into<Cow<'static, str>>>(path: P) -> Self {
        Field { kind: FieldKind::Path(path.into()) }
    }

    /// Creates a typed-path handle for the declared field type `F`.
    pub(crate) fn typed<F: Encode, P: Into<Cow<'static, str>>>(path: P) -> Self {
        Field {
            kind: FieldKind::Typed {
                path: path.into(),
                ty: TypeId::of::<F>(),
                fallback: F::encoder(),
            },
        }
    }

    /// Creates a member-chain handle.
    pub(crate) fn members(names: Vec<Cow<'static, str>>) -> Self {
        Field { kind: FieldKind::Members(names) }
    }

    /// Creates a pre-resolved handle.
    pub(crate) fn resolved(path: String, encoder: Arc<dyn ValueEncoder>) -> Self {
        Field { kind: FieldKind::Resolved(ResolvedField { path, encoder }) }
    }

    /// Resolves the handle against a document schema and encoder registry.
    pub fn resolve(
        &self,
        schema: &dyn DocumentSchema,
        registry: &EncoderRegistry,
    ) -> Result<ResolvedField> {
        match &self.kind {
            FieldKind::Path(path) => Ok(ResolvedField {
                path: path.clone().into_owned(),
                encoder: Arc::new(BsonEncoder),
            }),
            FieldKind::Typed { path, ty, fallback } => Ok(ResolvedField {
                path: path.clone().into_owned(),
                encoder: registry.get(*ty).unwrap_or_else(|| Arc::clone(fallback)),
            }),
            FieldKind::Members(names) => resolve_members(names, schema),
            FieldKind::Resolved(resolved) => Ok(resolved.clone()),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FieldKind::Path(path) => f.write_str(path),
            FieldKind::Typed { path, .. } => f.write_str(path),
            FieldKind::Members(names) => f.write_str(&names.join(".")),
            FieldKind::Resolved(resolved) => f.write_str(&resolved.path),
        }
    }
}

/// Where the member walk currently looks up names.
enum Cursor<'a> {
    /// At the root: the schema passed to `resolve`.
    Root(&'a dyn DocumentSchema),
    /// Inside an embedded document with its own schema.
    Nested(Arc<dyn DocumentSchema>),
    /// Inside a member whose encoder exposes no member metadata.
    Opaque,
}

/// Walks a member chain through the schema, translating host-side names to
/// wire names and collecting the leaf encoder.
fn resolve_members(
    names: &[Cow<'static, str>],
    schema: &dyn DocumentSchema,
) -> Result<ResolvedField> {
    let mut path = String::new();
    let mut encoder: Option<Arc<dyn ValueEncoder>> = None;
    let mut cursor = Cursor::Root(schema);

    for segment in names {
        if let Ok(index) = segment.parse::<usize>() {
            // numeric segment: index into the current array member
            let element = match &encoder {
                Some(encoder) => encoder.element_encoder().ok_or_else(|| Error::new(
                    ErrorKind::SerializerMismatch,
                    format!("serializer for field `{}` is not array-capable", path),
                ))?,
                None => return Err(Error::new(
                    ErrorKind::InvalidFilter,
                    format!("member chain `{}` starts with an array index", names.join(".")),
                )),
            };

            push_segment(&mut path, &index.to_string());
            cursor = match element.as_schema() {
                Some(schema) => Cursor::Nested(schema),
                None => Cursor::Opaque,
            };
            encoder = Some(element);
        } else {
            let current: &dyn DocumentSchema = match &cursor {
                Cursor::Root(schema) => *schema,
                Cursor::Nested(schema) => schema.as_ref(),
                Cursor::Opaque => return Err(Error::new(
                    ErrorKind::InvalidFilter,
                    format!(
                        "member `{}` cannot be resolved: `{}` is not an embedded document",
                        segment, path,
                    ),
                )),
            };
            let info = current.member(segment).ok_or_else(|| Error::new(
                ErrorKind::InvalidFilter,
                format!("unknown member `{}` in chain `{}`", segment, names.join(".")),
            ))?;

            push_segment(&mut path, &info.wire_name);
            cursor = match info.encoder.as_schema() {
                Some(schema) => Cursor::Nested(schema),
                None => Cursor::Opaque,
            };
            encoder = Some(info.encoder);
        }
    }

    match encoder {
        Some(encoder) => Ok(ResolvedField { path, encoder }),
        None => Err(Error::new(ErrorKind::InvalidFilter, "empty member chain")),
    }
}

/// Appends one dotted path segment.
fn push_segment(path: &mut String, segment: &str) {
    if !path.is_empty() {
        path.push('.');
    }
    path.push_str(segment);
}

/// A field handle carrying both the document type `D` and the declared
/// field type `F`, so that operator constructors can accept host-language
/// literals of the right type.
pub struct TypedField<D, F> {
    /// The erased handle.
    field: Field,
    /// Anchors the document and field types.
    marker: PhantomData<fn(D, F) -> (D, F)>,
}

impl<D, F: Encode> TypedField<D, F> {
    /// Creates a typed handle from a dotted path.
    pub fn new<P: Into<Cow<'static, str>>>(path: P) -> Self {
        Self::wrap(Field::typed::<F, P>(path))
    }

    /// Creates a handle from a chain of host-side member names; the chain is
    /// resolved against the document schema when the filter is rendered.
    pub fn members<I>(names: I) -> Self
        where I: IntoIterator,
              I::Item: Into<Cow<'static, str>>,
    {
        Self::wrap(Field::members(names.into_iter().map(Into::into).collect()))
    }

    /// Creates a handle from a resolution performed elsewhere, e.g. by an
    /// expression compiler that has already walked the document schema.
    pub fn precompiled<P: Into<String>>(path: P, encoder: Arc<dyn ValueEncoder>) -> Self {
        Self::wrap(Field::resolved(path.into(), encoder))
    }

    /// Wraps an erased handle.
    fn wrap(field: Field) -> Self {
        TypedField { field, marker: PhantomData }
    }

    /// Discards the type information, yielding the erased handle.
    pub fn into_erased(self) -> Field {
        self.field
    }
}

impl<D, F> fmt::Debug for TypedField<D, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedField({:?})", self.field)
    }
}

impl<D, F> Clone for TypedField<D, F> {
    fn clone(&self) -> Self {
        TypedField { field: self.field.clone(), marker: PhantomData }
    }
}

/// Shorthand for [`TypedField::new`].
pub fn field<D, F: Encode>(path: impl Into<Cow<'static, str>>) -> TypedField<D, F> {
    TypedField::new(path)
}

/// The array element itself, for element-match filters over scalar arrays.
/// Resolves to the empty path, the renderer's convention for "the element".
pub fn elem<T: Encode>() -> TypedField<T, T> {
    TypedField::new("")
}

/// Conversion of the various field representations into an erased handle,
/// bounded by the document type so that handles of one document type can't
/// silently wander into another's filter.
pub trait IntoField<D> {
    /// Converts into an erased field handle.
    fn into_field(self) -> Field;
}

impl<D> IntoField<D> for Field {
    fn into_field(self) -> Field {
        self
    }
}

impl<D> IntoField<D> for &'static str {
    fn into_field(self) -> Field {
        Field::path(self)
    }
}

impl<D> IntoField<D> for String {
    fn into_field(self) -> Field {
        Field::path(self)
    }
}

impl<D, F: Encode> IntoField<D> for TypedField<D, F> {
    fn into_field(self) -> Field {
        self.field
    }
}
