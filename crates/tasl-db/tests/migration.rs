//! "Migration: gender flattening" golden scenario (spec.md §8): a source
//! `Person{name, gender: coproduct{Male, Female, value: string}}` is
//! migrated to a target `person{name, gender: string}` via a `match`
//! expression, preserving ids and collapsing the coproduct to text.

mod common;

use indexmap::IndexMap;
use tasl_db::{migrate, Database};
use tasl_schema::{ClassRule, Expr, Mapping, MatchCase, PathSegment, Type, Value};

const SOURCE_PERSON: &str = "http://example.com/source/Person";
const TARGET_PERSON: &str = "http://example.com/target/person";

fn source_schema() -> tasl_schema::Schema {
    let gender = common::coproduct(&[
        ("Male", common::product(&[])),
        ("Female", common::product(&[])),
        ("value", common::string_type()),
    ]);
    let person = common::product(&[("name", common::string_type()), ("gender", gender)]);
    common::schema(&[(SOURCE_PERSON, person)])
}

fn target_schema() -> tasl_schema::Schema {
    let person = common::product(&[("name", common::string_type()), ("gender", common::string_type())]);
    common::schema(&[(TARGET_PERSON, person)])
}

fn gender_flattening_mapping() -> Mapping {
    let mut cases = IndexMap::new();
    cases.insert(
        "Male".to_string(),
        MatchCase { id: "_unit".to_string(), value: Expr::Literal("Male".to_string()) },
    );
    cases.insert(
        "Female".to_string(),
        MatchCase { id: "_unit".to_string(), value: Expr::Literal("Female".to_string()) },
    );
    cases.insert(
        "value".to_string(),
        MatchCase {
            id: "v".to_string(),
            value: Expr::Term { id: "v".to_string(), path: vec![] },
        },
    );

    let mut fields = IndexMap::new();
    fields.insert(
        "name".to_string(),
        Expr::Term { id: "p".to_string(), path: vec![PathSegment::Projection("name".to_string())] },
    );
    fields.insert(
        "gender".to_string(),
        Expr::Match { id: "p".to_string(), path: vec![PathSegment::Projection("gender".to_string())], cases },
    );

    Mapping {
        source: source_schema(),
        target: target_schema(),
        rules: vec![ClassRule {
            target_class: TARGET_PERSON.to_string(),
            source_class: SOURCE_PERSON.to_string(),
            id_name: "p".to_string(),
            value: Expr::Product(fields),
        }],
    }
}

#[test]
fn gender_flattening_migration_preserves_ids_and_flattens_the_coproduct() {
    let mut source = Database::create(None, source_schema()).unwrap();

    source
        .set(
            SOURCE_PERSON,
            0,
            &common::product_value(&[
                ("name", common::string_value("Ada")),
                ("gender", Value::coproduct("Female", Value::Product(Default::default()))),
            ]),
        )
        .unwrap();
    source
        .set(
            SOURCE_PERSON,
            1,
            &common::product_value(&[
                ("name", common::string_value("Alan")),
                ("gender", Value::coproduct("Male", Value::Product(Default::default()))),
            ]),
        )
        .unwrap();

    let mapping = gender_flattening_mapping();
    let mut target = migrate::migrate(&mut source, &mapping, None).unwrap();

    assert_eq!(
        target.get(TARGET_PERSON, 0).unwrap(),
        common::product_value(&[("name", common::string_value("Ada")), ("gender", common::string_value("Female"))]),
    );
    assert_eq!(
        target.get(TARGET_PERSON, 1).unwrap(),
        common::product_value(&[
            ("name", common::string_value("Alan")),
            ("gender", common::string_value("Male")),
        ]),
    );
}

#[test]
fn migrate_rejects_a_mismatched_source_schema() {
    // Source database's schema differs from `mapping.source` (an extra
    // class), so `migrate` must fail with `SchemaMismatch` before writing
    // anything to a target.
    let mut classes_schema = source_schema();
    let extra = common::schema(&[
        (SOURCE_PERSON, classes_schema.class_type_at(0).unwrap().clone()),
        ("http://example.com/source/Extra", Type::Uri),
    ]);
    classes_schema = extra;
    let mut source = Database::create(None, classes_schema).unwrap();

    let mapping = gender_flattening_mapping();
    let err = migrate::migrate(&mut source, &mapping, None).unwrap_err();
    assert!(matches!(err, tasl_db::Error::SchemaMismatch));
}
