//! Deterministic naming for tables and columns (spec.md §4.1).
//!
//! Every class gets a table named `c<k>` where `k` is its 0-based class
//! index. Every leaf (or coproduct discriminant) reachable from a class's
//! root type gets a column named `e` at the root, or `e_i1_..._in` at
//! structural path `[i1, ..., in]` — the sequence of product-component or
//! coproduct-option indices taken to reach it. Column names always begin
//! with `e`, so they can never collide with the reserved `id` column.

/// The table name for class index `k`.
pub fn table_name(class_index: usize) -> String {
    format!("c{class_index}")
}

/// The column name for structural path `path` within a class's root type.
pub fn column_name(path: &[usize]) -> String {
    if path.is_empty() {
        return "e".to_string();
    }
    let mut name = String::from("e");
    for segment in path {
        name.push('_');
        name.push_str(&segment.to_string());
    }
    name
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn column_name_matches_spec_examples() {
        assert_eq!(column_name(&[]), "e");
        assert_eq!(column_name(&[1]), "e_1");
        assert_eq!(column_name(&[0, 2]), "e_0_2");
    }

    #[test]
    fn column_name_never_collides_with_id() {
        assert_ne!(column_name(&[]), "id");
        assert_ne!(column_name(&[0]), "id");
    }

    #[test]
    fn table_name_is_class_index_keyed() {
        assert_eq!(table_name(0), "c0");
        assert_eq!(table_name(7), "c7");
    }
}
