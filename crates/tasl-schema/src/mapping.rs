use crate::Schema;
use indexmap::IndexMap;

/// A declarative schema-to-schema transformation (spec.md §4.6, §6.7).
/// `tasl-db::mapping` interprets `Expr` trees against a live source
/// database; this crate only owns the AST shape.
#[derive(Debug, Clone)]
pub struct Mapping {
    pub source: Schema,
    pub target: Schema,
    pub rules: Vec<ClassRule>,
}

/// One `target ⇐ source (id) => expression` rule.
#[derive(Debug, Clone)]
pub struct ClassRule {
    pub target_class: String,
    pub source_class: String,
    /// The identifier the rule's expression binds the source element to.
    pub id_name: String,
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Uri(String),
    Literal(String),
    Product(IndexMap<String, Expr>),
    Coproduct(String, Box<Expr>),
    Term {
        id: String,
        path: Vec<PathSegment>,
    },
    Match {
        id: String,
        path: Vec<PathSegment>,
        cases: IndexMap<String, MatchCase>,
    },
}

#[derive(Debug, Clone)]
pub enum PathSegment {
    /// Drill into a product component by key.
    Projection(String),
    /// Follow a reference value, dereferencing into the named class.
    Dereference(String),
}

#[derive(Debug, Clone)]
pub struct MatchCase {
    pub id: String,
    pub value: Expr,
}
