//! Shared fixtures for the golden-scenario integration tests in spec.md
//! §8. Kept deliberately small and literal: each helper mirrors one shape
//! from the spec text rather than a general-purpose schema DSL.

use indexmap::IndexMap;
use tasl_schema::{Datatype, Schema, Type, Value};

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

pub fn string_type() -> Type {
    Type::Literal(Datatype::Other(XSD_STRING.to_string()))
}

pub fn string_value(s: &str) -> Value {
    Value::Literal(s.to_string())
}

pub fn product(fields: &[(&str, Type)]) -> Type {
    let mut map = IndexMap::new();
    for (k, v) in fields {
        map.insert(k.to_string(), v.clone());
    }
    Type::Product(map)
}

pub fn coproduct(options: &[(&str, Type)]) -> Type {
    let mut map = IndexMap::new();
    for (k, v) in options {
        map.insert(k.to_string(), v.clone());
    }
    Type::Coproduct(map)
}

pub fn product_value(fields: &[(&str, Value)]) -> Value {
    let mut map = IndexMap::new();
    for (k, v) in fields {
        map.insert(k.to_string(), v.clone());
    }
    Value::Product(map)
}

pub fn schema(classes: &[(&str, Type)]) -> Schema {
    let mut map = IndexMap::new();
    for (k, v) in classes {
        map.insert(k.to_string(), v.clone());
    }
    Schema::new(map)
}
