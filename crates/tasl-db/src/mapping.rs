//! Mapping Evaluator (spec.md §4.6): interprets a `tasl_schema::Expr` tree
//! against an environment of bound `(Type, Value)` pairs, dereferencing
//! `Reference`s via live `Database::get` calls as the expression demands.

use crate::db::Database;
use crate::{Error, Result};
use indexmap::IndexMap;
use tasl_schema::{Expr, PathSegment, Type, Value};

pub type Env = IndexMap<String, (Type, Value)>;

/// Evaluates `expr` against `expected`, the type the caller needs the
/// result to conform to. `db` backs any `Dereference` path segments.
pub fn evaluate(db: &mut Database, env: &Env, expected: &Type, expr: &Expr) -> Result<Value> {
    match expr {
        Expr::Uri(s) => {
            if !matches!(expected, Type::Uri) {
                return Err(Error::Type("uri literal used where a non-uri value was expected".into()));
            }
            Ok(Value::Uri(s.clone()))
        }
        Expr::Literal(lexical) => match expected {
            Type::Literal(_) => Ok(Value::Literal(lexical.clone())),
            _ => Err(Error::Type("literal used where a non-literal value was expected".into())),
        },
        Expr::Product(fields) => match expected {
            Type::Product(expected_fields) => {
                let mut out = IndexMap::new();
                for (key, child_ty) in expected_fields {
                    let child_expr = fields
                        .get(key)
                        .ok_or_else(|| Error::Type(format!("mapping is missing product component: {key}")))?;
                    out.insert(key.clone(), evaluate(db, env, child_ty, child_expr)?);
                }
                Ok(Value::Product(out))
            }
            _ => Err(Error::Type("product expression used where a non-product value was expected".into())),
        },
        Expr::Coproduct(key, inner) => match expected {
            Type::Coproduct(options) => {
                let child_ty = options
                    .get(key)
                    .ok_or_else(|| Error::Type(format!("unknown coproduct option in mapping: {key}")))?;
                Ok(Value::Coproduct(key.clone(), Box::new(evaluate(db, env, child_ty, inner)?)))
            }
            _ => Err(Error::Type("coproduct expression used where a non-coproduct value was expected".into())),
        },
        Expr::Term { id, path } => {
            let (ty, value) = follow_path(db, env, id, path)?;
            project(&value, &ty, expected)
        }
        Expr::Match { id, path, cases } => {
            let (ty, value) = follow_path(db, env, id, path)?;
            let (key, option_ty, inner) = match (ty, value) {
                (Type::Coproduct(options), Value::Coproduct(key, inner)) => {
                    let option_ty = options
                        .get(&key)
                        .ok_or_else(|| Error::Type(format!("unknown coproduct option: {key}")))?
                        .clone();
                    (key, option_ty, *inner)
                }
                _ => return Err(Error::Type("match target is not a coproduct value".into())),
            };
            let case = cases
                .get(&key)
                .ok_or_else(|| Error::Type(format!("mapping has no match case for option: {key}")))?;
            let mut nested_env = env.clone();
            nested_env.insert(case.id.clone(), (option_ty, inner));
            evaluate(db, &nested_env, expected, &case.value)
        }
    }
}

fn follow_path(db: &mut Database, env: &Env, id: &str, path: &[PathSegment]) -> Result<(Type, Value)> {
    let (mut ty, mut value) = env
        .get(id)
        .cloned()
        .ok_or_else(|| Error::Type(format!("unbound identifier in mapping expression: {id}")))?;

    for segment in path {
        match segment {
            PathSegment::Projection(key) => match (&ty, &value) {
                (Type::Product(fields), Value::Product(values)) => {
                    let child_ty = fields
                        .get(key)
                        .ok_or_else(|| Error::Type(format!("unknown projection key: {key}")))?
                        .clone();
                    let child_value = values
                        .get(key)
                        .ok_or_else(|| Error::Type(format!("missing product component: {key}")))?
                        .clone();
                    ty = child_ty;
                    value = child_value;
                }
                _ => return Err(Error::Type(format!("cannot project '{key}' from a non-product value"))),
            },
            PathSegment::Dereference(class_name) => {
                let target_id = match &value {
                    Value::Reference(target_id) => *target_id,
                    _ => return Err(Error::Type("cannot dereference a non-reference value".into())),
                };
                let target_ty = db.schema().require(class_name)?.clone();
                let target_value = db.get(class_name, target_id)?;
                ty = target_ty;
                value = target_value;
            }
        }
    }
    Ok((ty, value))
}

/// Casts `value` (of type `from`) down onto `to`, failing if their shapes
/// disagree anywhere. Used when a `Term`/`Match` pulls a concrete value out
/// of the source instance that must still conform to the target type.
fn project(value: &Value, from: &Type, to: &Type) -> Result<Value> {
    match (from, to, value) {
        (Type::Uri, Type::Uri, Value::Uri(s)) => Ok(Value::Uri(s.clone())),
        (Type::Literal(a), Type::Literal(b), Value::Literal(s)) if a == b => Ok(Value::Literal(s.clone())),
        (Type::Literal(a), Type::Literal(b), _) => {
            Err(Error::Type(format!("literal datatype mismatch in mapping: {a} vs {b}")))
        }
        (Type::Product(from_fields), Type::Product(to_fields), Value::Product(values)) => {
            let mut out = IndexMap::new();
            for (key, to_ty) in to_fields {
                let from_ty = from_fields
                    .get(key)
                    .ok_or_else(|| Error::Type(format!("source type is missing product component: {key}")))?;
                let v = values
                    .get(key)
                    .ok_or_else(|| Error::Type(format!("missing product component: {key}")))?;
                out.insert(key.clone(), project(v, from_ty, to_ty)?);
            }
            Ok(Value::Product(out))
        }
        (Type::Coproduct(from_opts), Type::Coproduct(to_opts), Value::Coproduct(key, inner)) => {
            let from_ty = from_opts
                .get(key)
                .ok_or_else(|| Error::Type(format!("unknown coproduct option: {key}")))?;
            let to_ty = to_opts
                .get(key)
                .ok_or_else(|| Error::Type(format!("projection target is missing coproduct option: {key}")))?;
            Ok(Value::Coproduct(key.clone(), Box::new(project(inner, from_ty, to_ty)?)))
        }
        (Type::Reference(_), Type::Reference(_), Value::Reference(id)) => Ok(Value::Reference(*id)),
        _ => Err(Error::Type("projection to an incompatible type".into())),
    }
}
