//! `tasl-db`: an embedded, schema-typed database core.
//!
//! A `tasl` instance stores elements of a fixed set of classes, each
//! shaped by an algebraic [`tasl_schema::Type`], inside a single SQLite
//! file compiled deterministically from that schema (spec.md §1–§4).
//! Reading and writing goes through [`Database`]'s point operations; bulk
//! movement goes through the streaming [`codec`] and [`db::Database::import`]
//! /[`db::Database::export`]; schema evolution goes through [`migrate`].

pub mod codec;
pub mod compile;
mod error;
pub mod db;
pub mod mapping;
pub mod migrate;
pub mod path;
pub mod shred;

pub use db::{Database, Export, ExportOptions, Keys, Values, Entries, OpenOptions, CODEC_VERSION};
pub use error::{Error, Result};
pub use shred::{Cell, Row};
