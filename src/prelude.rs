//! The Mango prelude provides re-exports of the most commonly used traits
//! and types for convenience, including ones from the `bson` crate.

pub use crate::{
    encode::{ Encode, EncoderRegistry, ValueEncoder },
    error::{ ErrorKind, ResultExt },
    error::Error as MangoError,
    error::Result as MangoResult,
    field::{ elem, field, Field, IntoField, TypedField },
    filter::{ CompileFilter, Filter, TextOptions },
    geo::Geometry,
    literal::{ BsonType, RegexOpts },
    schema::{ DocumentSchema, EmptySchema, Members },
    wire::{ Connection, WriteConcern, WriteRequest, W },
};
pub use bson::{ Bson, Document, oid::ObjectId, doc, bson };
