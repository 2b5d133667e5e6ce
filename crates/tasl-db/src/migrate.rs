//! Migration Driver (spec.md §4.7): evaluates a `Mapping`'s per-class
//! rules against every element of a source database, writing the result
//! into a freshly-created target database under the same element ids.

use crate::db::Database;
use crate::mapping;
use crate::{Error, Result};
use indexmap::IndexMap;
use std::path::Path;
use tasl_schema::Mapping;

/// Runs `mapping` against `source`, producing a new database at
/// `target_path` (or in memory) whose schema is `mapping.target`.
///
/// `source`'s schema must be structurally identical to `mapping.source`
/// (spec.md §4.7, §8 property 8: schema equality is byte-identical
/// encoding, not mere type compatibility).
pub fn migrate(source: &mut Database, mapping: &Mapping, target_path: Option<&Path>) -> Result<Database> {
    if source.schema() != &mapping.source {
        return Err(Error::SchemaMismatch);
    }

    let mut target = Database::create(target_path, mapping.target.clone())?;

    for rule in &mapping.rules {
        let source_ty = source.schema().require(&rule.source_class)?.clone();
        let target_ty = target.schema().require(&rule.target_class)?.clone();

        let ids: Vec<u64> = source.keys(&rule.source_class)?.collect::<Result<_>>()?;
        for id in ids {
            let source_value = source.get(&rule.source_class, id)?;
            let mut env = IndexMap::new();
            env.insert(rule.id_name.clone(), (source_ty.clone(), source_value));
            let target_value = mapping::evaluate(source, &env, &target_ty, &rule.value)?;
            target.set(&rule.target_class, id, &target_value)?;
        }

        tracing::info!(
            source_class = %rule.source_class,
            target_class = %rule.target_class,
            "migrated class"
        );
    }

    Ok(target)
}
