//! "Nano" golden scenario (spec.md §8): a single boolean-literal class,
//! three elements, exercising `count`/`has`/`entries` ordering.

mod common;

use tasl_db::Database;
use tasl_schema::{Datatype, Type, Value};

const FOO: &str = "http://example.com/foo";

#[test]
fn nano_has_count_and_ordered_entries() {
    let schema = common::schema(&[(FOO, Type::Literal(Datatype::Boolean))]);
    let mut db = Database::create(None, schema).unwrap();

    db.set(FOO, 0, &Value::Literal("true".to_string())).unwrap();
    db.set(FOO, 1, &Value::Literal("false".to_string())).unwrap();
    db.set(FOO, 2, &Value::Literal("true".to_string())).unwrap();

    assert_eq!(db.count(FOO).unwrap(), 3);
    assert!(db.has(FOO, 0).unwrap());
    assert!(db.has(FOO, 1).unwrap());
    assert!(db.has(FOO, 2).unwrap());
    assert!(!db.has(FOO, 3).unwrap());

    let entries: Vec<(u64, Value)> = db.entries(FOO).unwrap().collect::<Result<_, _>>().unwrap();
    assert_eq!(
        entries,
        vec![
            (0, Value::Literal("true".to_string())),
            (1, Value::Literal("false".to_string())),
            (2, Value::Literal("true".to_string())),
        ]
    );
}

#[test]
fn get_on_missing_id_reports_class_and_id() {
    let schema = common::schema(&[(FOO, Type::Literal(Datatype::Boolean))]);
    let mut db = Database::create(None, schema).unwrap();
    db.set(FOO, 0, &Value::Literal("true".to_string())).unwrap();

    let err = db.get(FOO, 41).unwrap_err();
    let message = err.to_string();
    assert!(message.contains(FOO), "error should name the class: {message}");
    assert!(message.contains("41"), "error should name the id: {message}");
}

#[test]
fn get_on_unknown_class_is_a_lookup_error() {
    let schema = common::schema(&[(FOO, Type::Literal(Datatype::Boolean))]);
    let mut db = Database::create(None, schema).unwrap();
    assert!(db.get("http://example.com/nonexistent", 0).is_err());
}

#[test]
fn push_ids_are_strictly_increasing() {
    let schema = common::schema(&[(FOO, Type::Literal(Datatype::Boolean))]);
    let mut db = Database::create(None, schema).unwrap();

    let a = db.push(FOO, &Value::Literal("true".to_string())).unwrap();
    let b = db.push(FOO, &Value::Literal("false".to_string())).unwrap();
    let c = db.push(FOO, &Value::Literal("true".to_string())).unwrap();

    assert!(a < b);
    assert!(b < c);
}

#[test]
fn schema_persists_across_close_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nano.tasl");
    let schema = common::schema(&[(FOO, Type::Literal(Datatype::Boolean))]);

    let db = Database::create(Some(&path), schema.clone()).unwrap();
    db.close();

    let reopened = Database::open(&path, tasl_db::OpenOptions::default()).unwrap();
    assert_eq!(reopened.schema(), &schema);
}

#[test]
fn opening_a_missing_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.tasl");
    assert!(Database::open(&path, tasl_db::OpenOptions::default()).is_err());
}
