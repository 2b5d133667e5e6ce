use indexmap::IndexMap;

/// A value conforming to some `Type`, per spec.md §3. Literal values are
/// stored in their canonical lexical form (e.g. `"true"`/`"false"` for
/// booleans), matching what `tasl-db`'s reassembler produces and what its
/// shredder expects on the way in.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Uri(String),
    Literal(String),
    Product(IndexMap<String, Value>),
    Coproduct(String, Box<Value>),
    Reference(u64),
}

impl Value {
    pub fn coproduct(key: impl Into<String>, value: Value) -> Value {
        Value::Coproduct(key.into(), Box::new(value))
    }
}
