//! # Mango: the strongly-typed MongoDB filter builder
//!
//! This library lets application code compose MongoDB query filters in a
//! strongly-typed, host-language-native way, and lowers them to the exact
//! BSON documents the server understands, including the non-trivial
//! rewrites the server's semantics call for: conjunction merging, negation
//! lowering, nested-operator flattening and the scalar `$elemMatch` fixup.
//!
//! ### The Prelude
//!
//! Let's get this one out of the way quickly. The most useful and most
//! frequently utilized types, traits and functions, as well as the macros
//! of the `bson` crate, are publicly re-exported under the module
//! [`prelude`](prelude/index.html). Therefore, for most purposes, it's
//! enough to import the library in your code like this:
//!
//! ```
//! use mango::prelude::*;
//! ```
//!
//! ### Building and rendering filters
//!
//! A [`Filter<D>`](filter/struct.Filter.html) is an immutable tree of
//! filter terms over the document type `D`. Constructors come in two
//! parallel forms: associated functions on `Filter` take raw dotted paths
//! and pre-encoded BSON operands, while the operator methods of
//! [`TypedField<D, F>`](field/struct.TypedField.html) take host-language
//! literals of the field's declared type `F` and defer their encoding to
//! render time.
//!
//! Rendering is a pure function of the filter and two collaborators: a
//! [`DocumentSchema`](schema/trait.DocumentSchema.html) describing the
//! document type's members, and an
//! [`EncoderRegistry`](encode/struct.EncoderRegistry.html) of per-type
//! encoder overrides. For filters built from raw paths and typed paths,
//! the empty schema suffices:
//!
//! ```
//! use mango::prelude::*;
//!
//! #[derive(Debug, Clone, serde::Serialize)]
//! struct Inventory {
//!     item: String,
//!     qty: i64,
//!     tags: Vec<String>,
//! }
//!
//! let qty = field::<Inventory, i64>("qty");
//! let tags = field::<Inventory, Vec<String>>("tags");
//!
//! let filter = Filter::and(vec![
//!     qty.gt(25),
//!     tags.is_in(vec![String::from("sale"), String::from("new")]),
//! ]);
//!
//! let rendered = filter.render(&EmptySchema, &EncoderRegistry::new())?;
//!
//! assert_eq!(rendered, doc!{
//!     "qty": { "$gt": 25_i64 },
//!     "tags": { "$in": ["sale", "new"] },
//! });
//! # Ok::<(), MangoError>(())
//! ```
//!
//! The renderer keeps the flat form for independent predicates and
//! escalates to `$and` only where the flat form can't express the
//! semantics; negation is pushed through each operator family rather than
//! emitted as a bare `$not`:
//!
//! ```
//! use mango::prelude::*;
//!
//! let conflict = Filter::<()>::and(vec![
//!     Filter::gt("x", 1),
//!     Filter::gt("x", 2),
//! ]);
//! assert_eq!(conflict.render(&EmptySchema, &EncoderRegistry::new())?,
//!            doc!{ "$and": [{ "x": { "$gt": 1 } }, { "x": { "$gt": 2 } }] });
//!
//! let negated = Filter::<()>::not(Filter::is_in("status", vec!["A", "D"]));
//! assert_eq!(negated.render(&EmptySchema, &EncoderRegistry::new())?,
//!            doc!{ "status": { "$nin": ["A", "D"] } });
//! # Ok::<(), MangoError>(())
//! ```
//!
//! ### Member chains and schemas
//!
//! Besides raw and typed dotted paths, a field handle can be a chain of
//! host-side member names that is resolved against the document schema at
//! render time, translating renamed members to their wire names and
//! following embedded documents:
//!
//! ```
//! use mango::members;
//! use mango::prelude::*;
//!
//! #[derive(Debug, Clone, serde::Serialize)]
//! struct Order {
//!     quantity: i64,
//! }
//!
//! let schema = Members::new().renamed::<i64>("quantity", "qty");
//! let quantity = TypedField::<Order, i64>::members(members!(quantity));
//!
//! let rendered = quantity.gte(10).render(&schema, &EncoderRegistry::new())?;
//! assert_eq!(rendered, doc!{ "qty": { "$gte": 10_i64 } });
//! # Ok::<(), MangoError>(())
//! ```
//!
//! ### Preventing NoSQL injection
//!
//! MongoDB's structured query interface gets rid of most textual injection
//! hazards, but in a loosely-typed setting, untrusted input can still
//! smuggle an operator document into a slot where the programmer expected
//! a plain value. Mango counters this the same way it counters typos in
//! field names: by encouraging **static types in queries**. A typed field
//! only accepts literals of its declared type, and those literals are
//! encoded by the field's encoder and never interpreted as operators.
//!
//! ### Scope
//!
//! This crate builds and renders filters; it does not talk to servers.
//! The [`wire`](wire/index.html) module knows how to pair a write message
//! with its optional `getLastError` acknowledgement probe and how to
//! decode the probe's reply, but the transport behind its
//! [`Connection`](wire/trait.Connection.html) seam is the caller's.

#![doc(html_root_url = "https://docs.rs/mango/0.1.2")]
#![deny(missing_docs, missing_debug_implementations,
        unsafe_code,
        bare_trait_objects,
        unused_import_braces)]
#![allow(clippy::single_match, clippy::match_same_arms, clippy::match_ref_pats,
         clippy::clone_on_ref_ptr, clippy::needless_pass_by_value)]

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate bson;

pub mod error;
pub mod writer;
pub mod encode;
pub mod schema;
pub mod field;
pub mod literal;
pub mod geo;
pub mod filter;
pub mod wire;
pub mod prelude;

mod render;

/// Builds a dotted path string from a bare member chain.
///
/// ```
/// use mango::path;
///
/// assert_eq!(path!(author), "author");
/// assert_eq!(path!(author.name), "author.name");
/// ```
#[macro_export]
macro_rules! path {
    ($first:ident $(. $rest:ident)*) => {
        concat!(stringify!($first) $(, ".", stringify!($rest))*)
    };
}

/// Builds the member-name list of a typed member chain from a bare member
/// chain, for use with
/// [`TypedField::members`](field/struct.TypedField.html#method.members).
///
/// ```
/// use mango::members;
///
/// assert_eq!(members!(author.name), ["author", "name"]);
/// ```
#[macro_export]
macro_rules! members {
    ($first:ident $(. $rest:ident)*) => {
        [ stringify!($first) $(, stringify!($rest))* ]
    };
}
