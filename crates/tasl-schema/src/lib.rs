//! The tasl type / value / schema / mapping AST.
//!
//! This crate plays the role of the "tasl schema/mapping/value library"
//! that `spec.md` treats as an external collaborator: parsing schemas and
//! constructing type/value/expression trees is out of scope for the `core`
//! (see `tasl-db`), which only consumes this crate's types and its
//! canonical schema-blob encoder.

mod datatype;
mod mapping;
mod schema;
mod types;
mod value;

pub use datatype::{Datatype, SqlKind};
pub use mapping::{ClassRule, Expr, Mapping, MatchCase, PathSegment};
pub use schema::Schema;
pub use types::Type;
pub use value::Value;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unknown literal datatype: {0}")]
    UnknownDatatype(String),
    #[error("duplicate class key: {0}")]
    DuplicateClass(String),
    #[error("unknown class: {0}")]
    UnknownClass(String),
    #[error("malformed schema blob")]
    Malformed(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
