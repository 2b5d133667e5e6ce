use crate::{Error, Result, Type};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An ordered mapping from class key to class type (spec.md §3). Each
/// class has a stable 0-based class index equal to its insertion order,
/// which is also its `IndexMap` position — the same trick the teacher's
/// `catalog` crate relies on for its `resources`/`resource_urls` tables
/// staying insertion-ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    classes: IndexMap<String, Type>,
}

impl Schema {
    pub fn new(classes: IndexMap<String, Type>) -> Self {
        Schema { classes }
    }

    pub fn class_index(&self, key: &str) -> Option<usize> {
        self.classes.get_index_of(key)
    }

    pub fn class_key(&self, index: usize) -> Option<&str> {
        self.classes.get_index(index).map(|(k, _)| k.as_str())
    }

    pub fn class_type(&self, key: &str) -> Option<&Type> {
        self.classes.get(key)
    }

    pub fn class_type_at(&self, index: usize) -> Option<&Type> {
        self.classes.get_index(index).map(|(_, t)| t)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> impl Iterator<Item = (usize, &str, &Type)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, (k, t))| (i, k.as_str(), t))
    }

    pub fn require(&self, key: &str) -> Result<&Type> {
        self.classes
            .get(key)
            .ok_or_else(|| Error::UnknownClass(key.to_string()))
    }

    /// Canonical byte encoding of the schema. Schemas compare structurally
    /// equal iff their encodings are byte-identical (spec.md §3, §8
    /// property 8): since `IndexMap`'s `Serialize` impl iterates in
    /// insertion order and `serde_json` writes object keys in the order
    /// its `Serialize` impl yields them, the same schema always encodes
    /// to the same bytes.
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("Schema serialization is infallible")
    }

    pub fn decode(bytes: &[u8]) -> Result<Schema> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Datatype;

    #[test]
    fn encode_decode_round_trips_and_is_deterministic() {
        let mut classes = IndexMap::new();
        classes.insert("http://example.com/a".to_string(), Type::Uri);
        classes.insert(
            "http://example.com/b".to_string(),
            Type::Literal(Datatype::Boolean),
        );
        let schema = Schema::new(classes);

        let bytes1 = schema.encode();
        let bytes2 = schema.encode();
        assert_eq!(bytes1, bytes2);

        let decoded = Schema::decode(&bytes1).unwrap();
        assert_eq!(decoded, schema);
        assert_eq!(decoded.encode(), bytes1);
    }

    #[test]
    fn class_index_is_insertion_order() {
        let mut classes = IndexMap::new();
        classes.insert("first".to_string(), Type::Uri);
        classes.insert("second".to_string(), Type::Uri);
        let schema = Schema::new(classes);

        assert_eq!(schema.class_index("first"), Some(0));
        assert_eq!(schema.class_index("second"), Some(1));
        assert_eq!(schema.class_key(0), Some("first"));
        assert_eq!(schema.class_key(1), Some("second"));
    }
}
