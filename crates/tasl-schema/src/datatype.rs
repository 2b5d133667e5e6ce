use crate::Error;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;

/// A literal datatype, drawn from the closed XSD/RDF set that `spec.md`
/// §3 describes. Fixed-width datatypes carry their byte width inline;
/// everything else is variable-width and stored as UTF-8 text, with
/// `HexBinary` and `Json` receiving bespoke wire encodings (spec.md §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Datatype {
    Boolean,
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    Float,
    Double,
    HexBinary,
    Json,
    /// Any other XSD/RDF IRI. Treated as a variable-width UTF-8 string.
    Other(String),
}

/// The SQL storage kind a datatype is shredded into (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlKind {
    Integer,
    Real,
    Blob,
    Text,
}

const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
const BYTE: &str = "http://www.w3.org/2001/XMLSchema#byte";
const UNSIGNED_BYTE: &str = "http://www.w3.org/2001/XMLSchema#unsignedByte";
const SHORT: &str = "http://www.w3.org/2001/XMLSchema#short";
const UNSIGNED_SHORT: &str = "http://www.w3.org/2001/XMLSchema#unsignedShort";
const INT: &str = "http://www.w3.org/2001/XMLSchema#int";
const UNSIGNED_INT: &str = "http://www.w3.org/2001/XMLSchema#unsignedInt";
const LONG: &str = "http://www.w3.org/2001/XMLSchema#long";
const UNSIGNED_LONG: &str = "http://www.w3.org/2001/XMLSchema#unsignedLong";
const FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
const HEX_BINARY: &str = "http://www.w3.org/2001/XMLSchema#hexBinary";
const RDF_JSON: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#JSON";

impl Datatype {
    pub fn iri(&self) -> &str {
        match self {
            Datatype::Boolean => BOOLEAN,
            Datatype::Byte => BYTE,
            Datatype::UnsignedByte => UNSIGNED_BYTE,
            Datatype::Short => SHORT,
            Datatype::UnsignedShort => UNSIGNED_SHORT,
            Datatype::Int => INT,
            Datatype::UnsignedInt => UNSIGNED_INT,
            Datatype::Long => LONG,
            Datatype::UnsignedLong => UNSIGNED_LONG,
            Datatype::Float => FLOAT,
            Datatype::Double => DOUBLE,
            Datatype::HexBinary => HEX_BINARY,
            Datatype::Json => RDF_JSON,
            Datatype::Other(iri) => iri.as_str(),
        }
    }

    /// `Some(width)` in bytes for fixed-width datatypes, `None` for
    /// variable-width ones (spec.md §3, §4.2).
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            Datatype::Boolean | Datatype::Byte | Datatype::UnsignedByte => Some(1),
            Datatype::Short | Datatype::UnsignedShort => Some(2),
            Datatype::Int | Datatype::UnsignedInt | Datatype::Float => Some(4),
            Datatype::Long | Datatype::UnsignedLong | Datatype::Double => Some(8),
            Datatype::HexBinary | Datatype::Json | Datatype::Other(_) => None,
        }
    }

    pub fn is_signed_integer(&self) -> bool {
        matches!(self, Datatype::Byte | Datatype::Short | Datatype::Int | Datatype::Long)
    }

    pub fn is_unsigned_integer(&self) -> bool {
        matches!(
            self,
            Datatype::Boolean
                | Datatype::UnsignedByte
                | Datatype::UnsignedShort
                | Datatype::UnsignedInt
                | Datatype::UnsignedLong
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Datatype::Float | Datatype::Double)
    }

    /// The SQL column kind this datatype shreds into (spec.md §4.2 table).
    pub fn sql_kind(&self) -> SqlKind {
        if self.is_float() {
            SqlKind::Real
        } else if self.fixed_width().is_some() {
            SqlKind::Integer
        } else if matches!(self, Datatype::HexBinary) {
            SqlKind::Blob
        } else {
            SqlKind::Text
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.iri())
    }
}

impl TryFrom<&str> for Datatype {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(match value {
            BOOLEAN => Datatype::Boolean,
            BYTE => Datatype::Byte,
            UNSIGNED_BYTE => Datatype::UnsignedByte,
            SHORT => Datatype::Short,
            UNSIGNED_SHORT => Datatype::UnsignedShort,
            INT => Datatype::Int,
            UNSIGNED_INT => Datatype::UnsignedInt,
            LONG => Datatype::Long,
            UNSIGNED_LONG => Datatype::UnsignedLong,
            FLOAT => Datatype::Float,
            DOUBLE => Datatype::Double,
            HEX_BINARY => Datatype::HexBinary,
            RDF_JSON => Datatype::Json,
            other => Datatype::Other(other.to_string()),
        })
    }
}
