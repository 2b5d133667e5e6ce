//! Type-to-Table Compiler (spec.md §4.2): turns a class's algebraic `Type`
//! into a flat SQLite table description — column order, SQL storage kind,
//! nullability, and foreign-key edges for `Reference` leaves.

use crate::path::{column_name, table_name};
use crate::{Error, Result};
use tasl_schema::{Schema, SqlKind, Type};

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    /// The discriminant of a coproduct node: which option is populated.
    OptionIndex,
    Value(SqlKind),
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
}

#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub column: usize,
    pub references_class: usize,
}

/// The column-index ranges owned by each option of one coproduct node,
/// `[start, end)` into `Table::columns`. Shredding/reassembly use these
/// to null-fill or skip sibling arms (spec.md §4.2, §9).
#[derive(Debug, Clone)]
pub struct CoproductNode {
    pub index_column: usize,
    pub arms: Vec<(usize, usize)>,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub class_index: usize,
    pub name: String,
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKey>,
    pub coproduct_nodes: Vec<CoproductNode>,
}

impl Table {
    fn coproduct_node_at(&self, index_column: usize) -> &CoproductNode {
        self.coproduct_nodes
            .iter()
            .find(|n| n.index_column == index_column)
            .expect("compiler and shredder column cursors stay in lock-step")
    }

    pub(crate) fn arm_range(&self, index_column: usize, option: usize) -> (usize, usize) {
        self.coproduct_node_at(index_column).arms[option]
    }
}

pub fn compile_schema(schema: &Schema) -> Result<Vec<Table>> {
    schema
        .classes()
        .map(|(class_index, _key, ty)| compile_class(schema, class_index, ty))
        .collect()
}

fn compile_class(schema: &Schema, class_index: usize, ty: &Type) -> Result<Table> {
    let mut columns = Vec::new();
    let mut foreign_keys = Vec::new();
    let mut coproduct_nodes = Vec::new();
    let mut path = Vec::new();
    walk(
        schema,
        ty,
        &mut path,
        false,
        &mut columns,
        &mut foreign_keys,
        &mut coproduct_nodes,
    )?;
    Ok(Table {
        class_index,
        name: table_name(class_index),
        columns,
        foreign_keys,
        coproduct_nodes,
    })
}

fn walk(
    schema: &Schema,
    ty: &Type,
    path: &mut Vec<usize>,
    nullable: bool,
    columns: &mut Vec<Column>,
    foreign_keys: &mut Vec<ForeignKey>,
    coproduct_nodes: &mut Vec<CoproductNode>,
) -> Result<()> {
    match ty {
        Type::Uri => {
            columns.push(Column {
                name: column_name(path),
                kind: ColumnKind::Value(SqlKind::Text),
                nullable,
            });
            Ok(())
        }
        Type::Literal(dt) => {
            columns.push(Column {
                name: column_name(path),
                kind: ColumnKind::Value(dt.sql_kind()),
                nullable,
            });
            Ok(())
        }
        Type::Product(fields) => {
            for (i, (_key, child)) in fields.iter().enumerate() {
                path.push(i);
                walk(
                    schema,
                    child,
                    path,
                    nullable,
                    columns,
                    foreign_keys,
                    coproduct_nodes,
                )?;
                path.pop();
            }
            Ok(())
        }
        Type::Coproduct(fields) => {
            let index_column = columns.len();
            columns.push(Column {
                name: column_name(path),
                kind: ColumnKind::OptionIndex,
                nullable,
            });
            let mut arms = Vec::with_capacity(fields.len());
            for (i, (_key, child)) in fields.iter().enumerate() {
                path.push(i);
                let start = columns.len();
                // Columns under any coproduct option are always nullable:
                // whichever option isn't selected is null-filled, regardless
                // of whether the coproduct itself sits in a selected branch.
                walk(
                    schema,
                    child,
                    path,
                    true,
                    columns,
                    foreign_keys,
                    coproduct_nodes,
                )?;
                let end = columns.len();
                arms.push((start, end));
                path.pop();
            }
            coproduct_nodes.push(CoproductNode { index_column, arms });
            Ok(())
        }
        Type::Reference(class_key) => {
            let references_class = schema
                .class_index(class_key)
                .ok_or_else(|| Error::Type(format!("unknown class referenced: {class_key}")))?;
            foreign_keys.push(ForeignKey {
                column: columns.len(),
                references_class,
            });
            columns.push(Column {
                name: column_name(path),
                kind: ColumnKind::Value(SqlKind::Integer),
                nullable,
            });
            Ok(())
        }
    }
}

fn sql_type_name(kind: SqlKind) -> &'static str {
    match kind {
        SqlKind::Integer => "INTEGER",
        SqlKind::Real => "REAL",
        SqlKind::Blob => "BLOB",
        SqlKind::Text => "TEXT",
    }
}

/// `SELECT`-ready, comma-joined column name list in table order.
pub fn column_list(table: &Table) -> String {
    table
        .columns
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The `CREATE TABLE` statement for one compiled class, including its
/// `id` primary key and any foreign keys onto other classes' tables.
pub fn table_ddl(table: &Table) -> String {
    let mut lines = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
    for column in &table.columns {
        let sql_type = match &column.kind {
            ColumnKind::OptionIndex => "INTEGER",
            ColumnKind::Value(kind) => sql_type_name(*kind),
        };
        let null = if column.nullable { "" } else { " NOT NULL" };
        lines.push(format!("{} {}{}", column.name, sql_type, null));
    }
    for fk in &table.foreign_keys {
        let column_name = &table.columns[fk.column].name;
        lines.push(format!(
            "FOREIGN KEY ({}) REFERENCES {}(id)",
            column_name,
            table_name(fk.references_class)
        ));
    }
    format!("CREATE TABLE {} (\n  {}\n)", table.name, lines.join(",\n  "))
}
