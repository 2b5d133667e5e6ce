//! "Micro" golden scenario (spec.md §8): two classes —
//! `a: product{u8, boolean}` and `b: coproduct{bytes, unit, uri}` — with
//! one element in `a` and four in `b`, exercising per-id `has` across a
//! coproduct's distinct arms and `count` per class.

mod common;

use tasl_db::Database;
use tasl_schema::{Datatype, Type, Value};

const A: &str = "http://example.com/a";
const B: &str = "http://example.com/b";

fn micro_schema() -> tasl_schema::Schema {
    let a = common::product(&[
        ("n", Type::Literal(Datatype::UnsignedByte)),
        ("flag", Type::Literal(Datatype::Boolean)),
    ]);
    let b = common::coproduct(&[
        ("bytes", Type::Literal(Datatype::HexBinary)),
        ("unit", common::product(&[])),
        ("uri", Type::Uri),
    ]);
    common::schema(&[(A, a), (B, b)])
}

#[test]
fn micro_has_matches_spec() {
    let mut db = Database::create(None, micro_schema()).unwrap();

    db.set(
        A,
        0,
        &common::product_value(&[
            ("n", Value::Literal("7".to_string())),
            ("flag", Value::Literal("true".to_string())),
        ]),
    )
    .unwrap();

    db.set(B, 0, &Value::coproduct("bytes", Value::Literal("ab".to_string()))).unwrap();
    db.set(B, 1, &Value::coproduct("unit", Value::Product(Default::default()))).unwrap();
    db.set(B, 2, &Value::coproduct("uri", Value::Uri("http://example.com/x".to_string()))).unwrap();
    db.set(B, 3, &Value::coproduct("bytes", Value::Literal("cd".to_string()))).unwrap();

    assert!(db.has(A, 0).unwrap());
    assert!(!db.has(A, 1).unwrap());
    assert!(!db.has(A, 3).unwrap());

    for id in 0..=3 {
        assert!(db.has(B, id).unwrap(), "expected has(b, {id}) == true");
    }
    assert!(!db.has(B, 4).unwrap());
}

#[test]
fn micro_count_matches_spec() {
    let mut db = Database::create(None, micro_schema()).unwrap();
    db.set(
        A,
        0,
        &common::product_value(&[
            ("n", Value::Literal("7".to_string())),
            ("flag", Value::Literal("true".to_string())),
        ]),
    )
    .unwrap();
    for id in 0..4u64 {
        db.set(B, id, &Value::coproduct("unit", Value::Product(Default::default()))).unwrap();
    }

    assert_eq!(db.count(A).unwrap(), 1);
    assert_eq!(db.count(B).unwrap(), 4);
}

#[test]
fn count_matches_the_number_of_ids_seen_by_keys() {
    let mut db = Database::create(None, micro_schema()).unwrap();
    for id in [0u64, 1, 4, 9] {
        db.set(B, id, &Value::coproduct("unit", Value::Product(Default::default()))).unwrap();
    }

    let seen: Vec<u64> = db.keys(B).unwrap().collect::<Result<_, _>>().unwrap();
    assert_eq!(seen, vec![0, 1, 4, 9]);
    assert_eq!(db.count(B).unwrap() as usize, seen.len());
}

#[test]
fn values_iterates_in_id_order_without_their_ids() {
    let mut db = Database::create(None, micro_schema()).unwrap();
    db.set(B, 0, &Value::coproduct("bytes", Value::Literal("ab".to_string()))).unwrap();
    db.set(B, 5, &Value::coproduct("uri", Value::Uri("http://example.com/z".to_string()))).unwrap();

    let values: Vec<Value> = db.values(B).unwrap().collect::<Result<_, _>>().unwrap();
    assert_eq!(
        values,
        vec![
            Value::coproduct("bytes", Value::Literal("ab".to_string())),
            Value::coproduct("uri", Value::Uri("http://example.com/z".to_string())),
        ]
    );
}

#[test]
fn coproduct_sibling_arms_do_not_leak_into_get() {
    let mut db = Database::create(None, micro_schema()).unwrap();
    let uri_value = Value::coproduct("uri", Value::Uri("http://example.com/y".to_string()));
    db.set(B, 0, &uri_value).unwrap();

    let round_tripped = db.get(B, 0).unwrap();
    assert_eq!(round_tripped, uri_value);
}
