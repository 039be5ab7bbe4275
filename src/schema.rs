//! Member metadata of document types, used for resolving typed member
//! chains to server-side dotted paths.
//!
//! A [`DocumentSchema`] answers one question: given the host-side name of a
//! member, what is its wire name and which encoder does its declared type
//! use? The field resolver walks this metadata segment by segment, following
//! embedded documents through [`ValueEncoder::as_schema`] and array members
//! through [`ValueEncoder::element_encoder`].

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::any::{ Any, type_name };
use bson::Bson;
use crate::encode::{ Encode, ValueEncoder };
use crate::error::Result;

/// Member lookup over a document type.
pub trait DocumentSchema: fmt::Debug + Send + Sync {
    /// Looks up a member by its host-side (field) name.
    fn member(&self, name: &str) -> Option<MemberInfo>;
}

/// The resolved metadata of a single document member.
#[derive(Debug, Clone)]
pub struct MemberInfo {
    /// The serialized (wire) name of the member.
    pub wire_name: Cow<'static, str>,
    /// Encoder for the member's declared value type.
    pub encoder: Arc<dyn ValueEncoder>,
}

/// The schema of a document type with no known members. Used for documents
/// addressed only through raw dotted paths, and as the element schema of
/// scalar arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySchema;

impl DocumentSchema for EmptySchema {
    fn member(&self, _name: &str) -> Option<MemberInfo> {
        None
    }
}

/// A hand-built member table.
///
/// ```
/// # use mango::schema::{ DocumentSchema, Members };
/// #
/// let schema = Members::new()
///     .field::<String>("name")
///     .renamed::<i64>("quantity", "qty");
///
/// assert_eq!(schema.member("quantity").map(|m| m.wire_name.into_owned()),
///            Some(String::from("qty")));
/// assert!(schema.member("bogus").is_none());
/// ```
#[derive(Debug, Default)]
pub struct Members {
    /// Member metadata by host-side name.
    members: HashMap<&'static str, MemberInfo>,
}

impl Members {
    /// Creates an empty member table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a member whose wire name matches the host-side name.
    pub fn field<F: Encode>(self, name: &'static str) -> Self {
        self.renamed::<F>(name, name)
    }

    /// Adds a member serialized under a different name.
    pub fn renamed<F: Encode>(self, name: &'static str, wire_name: &'static str) -> Self {
        self.with_encoder(name, wire_name, F::encoder())
    }

    /// Adds a member with an explicit encoder.
    pub fn with_encoder(
        mut self,
        name: &'static str,
        wire_name: &'static str,
        encoder: Arc<dyn ValueEncoder>,
    ) -> Self {
        let wire_name = Cow::Borrowed(wire_name);
        self.members.insert(name, MemberInfo { wire_name, encoder });
        self
    }

    /// Adds an embedded-document member with its own member table, so that
    /// member chains can descend into it.
    pub fn embedded<F: Encode>(self, name: &'static str, schema: Members) -> Self {
        let encoder = Arc::new(EmbeddedEncoder::<F>::new(schema));
        self.with_encoder(name, name, encoder)
    }

    /// The number of known members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the table has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl DocumentSchema for Members {
    fn member(&self, name: &str) -> Option<MemberInfo> {
        self.members.get(name).cloned()
    }
}

/// Encoder for an embedded-document member: encodes through serde like the
/// default encoder, but carries the embedded type's member table so that
/// member chains can resolve past it.
pub struct EmbeddedEncoder<F> {
    /// The embedded type's member table.
    schema: Arc<Members>,
    /// Anchors the embedded document type.
    marker: PhantomData<fn(F) -> F>,
}

impl<F: Encode> EmbeddedEncoder<F> {
    /// Creates the encoder around the embedded type's member table.
    pub fn new(schema: Members) -> Self {
        EmbeddedEncoder { schema: Arc::new(schema), marker: PhantomData }
    }
}

impl<F> fmt::Debug for EmbeddedEncoder<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EmbeddedEncoder<{}>({:?})", type_name::<F>(), self.schema)
    }
}

impl<F: Encode> ValueEncoder for EmbeddedEncoder<F> {
    fn encode(&self, value: &dyn Any) -> Result<Bson> {
        crate::encode::SerdeEncoder::<F>::new().encode(value)
    }

    fn as_schema(&self) -> Option<Arc<dyn DocumentSchema>> {
        let schema: Arc<Members> = Arc::clone(&self.schema);
        Some(schema as Arc<dyn DocumentSchema>)
    }
}
