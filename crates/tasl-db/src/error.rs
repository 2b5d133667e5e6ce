//! `tasl-db`'s error type: one variant per error kind spec.md §7 names,
//! following the same `thiserror`-derived, from-conversion-heavy shape as
//! the teacher's `derive-sqlite::Error` (`crates/derive-sqlite/src/lib.rs`).

/// Every fallible public operation in `tasl-db` returns this.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A byte stream didn't conform to the wire format (spec.md §4.3/§4.4).
    #[error("decode error: {0}")]
    Decode(String),

    /// A value's shape disagreed with its declared type, or a mapping
    /// expression was evaluated against the wrong type (spec.md §4.4/§4.6).
    #[error("type error: {0}")]
    Type(String),

    /// A numeric value fell outside the range tasl can represent losslessly.
    #[error("range error: {0}")]
    Range(String),

    /// `get`/`has`/`count`/... against a class key the schema doesn't have.
    #[error("unknown class: {0}")]
    UnknownClass(String),

    /// `get` found no element with the given id in the given class.
    #[error("no element in class '{class}' with id {id}")]
    NoSuchElement { class: String, id: u64 },

    /// A migration's mapping source schema didn't structurally match the
    /// database being migrated (spec.md §4.7).
    #[error("schema mismatch: the mapping's source schema does not match the database being migrated")]
    SchemaMismatch,

    /// Propagated verbatim from the embedded SQL engine, matching the
    /// teacher's `catalog::Error::Rusqlite(#[from] rusqlite::Error)` pattern.
    #[error(transparent)]
    Storage(#[from] rusqlite::Error),

    #[error(transparent)]
    Schema(#[from] tasl_schema::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
