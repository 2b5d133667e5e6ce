use crate::Datatype;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An algebraic type, per spec.md §3. Component order within `Product`
/// and option order within `Coproduct` is canonical schema order: the
/// order the IndexMap was built in, which is also pre-order traversal
/// order for the Type-to-Table compiler (spec.md §4.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    Uri,
    Literal(Datatype),
    Product(IndexMap<String, Type>),
    Coproduct(IndexMap<String, Type>),
    Reference(String),
}

impl Type {
    pub fn is_uri(&self) -> bool {
        matches!(self, Type::Uri)
    }

    /// Option or component keys in canonical order, for Product/Coproduct;
    /// `None` for leaf types.
    pub fn keys(&self) -> Option<impl Iterator<Item = &str>> {
        match self {
            Type::Product(fields) | Type::Coproduct(fields) => {
                Some(fields.keys().map(String::as_str))
            }
            _ => None,
        }
    }
}
