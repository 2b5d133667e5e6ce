//! Shredder/Reassembler (spec.md §4.4): converts between tree-shaped
//! algebraic `Value`s and the flat `{column -> cell}` rows the compiled
//! tables store, in both directions, and also between raw wire bytes and
//! rows directly (used by the streaming codec, spec.md §4.3/§4.4).

use crate::codec::{push_varint, read_varint_slice};
use crate::compile::{ColumnKind, Table};
use crate::{Error, Result};
use std::num::{IntErrorKind, ParseIntError};
use tasl_schema::{Datatype, Schema, Type, Value};

/// One SQLite cell, in the four storage classes tasl ever uses.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Blob(Vec<u8>),
    Text(String),
}

impl Cell {
    pub fn from_value_ref(v: rusqlite::types::ValueRef<'_>) -> Cell {
        use rusqlite::types::ValueRef;
        match v {
            ValueRef::Null => Cell::Null,
            ValueRef::Integer(i) => Cell::Integer(i),
            ValueRef::Real(f) => Cell::Real(f),
            ValueRef::Text(s) => Cell::Text(String::from_utf8_lossy(s).into_owned()),
            ValueRef::Blob(b) => Cell::Blob(b.to_vec()),
        }
    }
}

impl rusqlite::ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, Value as SqlValue};
        Ok(match self {
            Cell::Null => ToSqlOutput::Owned(SqlValue::Null),
            Cell::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Cell::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Cell::Blob(b) => ToSqlOutput::Owned(SqlValue::Blob(b.clone())),
            Cell::Text(s) => ToSqlOutput::Owned(SqlValue::Text(s.clone())),
        })
    }
}

/// A row's cells, in the same order as its `Table`'s columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

// ---------------------------------------------------------------------
// Value <-> Row
// ---------------------------------------------------------------------

pub fn shred(table: &Table, ty: &Type, value: &Value) -> Result<Row> {
    let mut cells = vec![Cell::Null; table.columns.len()];
    let mut cursor = 0usize;
    shred_walk(table, ty, value, &mut cells, &mut cursor)?;
    Ok(Row { cells })
}

fn shred_walk(table: &Table, ty: &Type, value: &Value, cells: &mut [Cell], cursor: &mut usize) -> Result<()> {
    match (ty, value) {
        (Type::Uri, Value::Uri(s)) => {
            cells[*cursor] = Cell::Text(s.clone());
            *cursor += 1;
            Ok(())
        }
        (Type::Literal(dt), Value::Literal(lexical)) => {
            cells[*cursor] = literal_to_cell(dt, lexical)?;
            *cursor += 1;
            Ok(())
        }
        (Type::Product(fields), Value::Product(values)) => {
            for (key, child_ty) in fields {
                let child_value = values
                    .get(key)
                    .ok_or_else(|| Error::Type(format!("missing product component: {key}")))?;
                shred_walk(table, child_ty, child_value, cells, cursor)?;
            }
            Ok(())
        }
        (Type::Coproduct(fields), Value::Coproduct(key, inner)) => {
            let index_column = *cursor;
            let opt_idx = fields
                .get_index_of(key)
                .ok_or_else(|| Error::Type(format!("unknown coproduct option: {key}")))?;
            cells[index_column] = Cell::Integer(opt_idx as i64);
            *cursor += 1;
            for (i, (_key, child_ty)) in fields.iter().enumerate() {
                let (start, end) = table.arm_range(index_column, i);
                if i == opt_idx {
                    shred_walk(table, child_ty, inner, cells, cursor)?;
                    debug_assert_eq!(*cursor, end);
                } else {
                    *cursor = end;
                    let _ = start;
                }
            }
            Ok(())
        }
        (Type::Reference(_), Value::Reference(id)) => {
            let id = i64::try_from(*id)
                .map_err(|_| Error::Range(format!("reference id {id} exceeds supported range")))?;
            cells[*cursor] = Cell::Integer(id);
            *cursor += 1;
            Ok(())
        }
        _ => Err(Error::Type("value does not match its declared type".into())),
    }
}

pub fn reassemble(table: &Table, ty: &Type, row: &Row, _schema: &Schema) -> Result<Value> {
    let mut cursor = 0usize;
    reassemble_walk(table, ty, row, &mut cursor)
}

fn reassemble_walk(table: &Table, ty: &Type, row: &Row, cursor: &mut usize) -> Result<Value> {
    match ty {
        Type::Uri => {
            let cell = &row.cells[*cursor];
            *cursor += 1;
            match cell {
                Cell::Text(s) => Ok(Value::Uri(s.clone())),
                _ => Err(Error::Decode("expected a text cell for a uri column".into())),
            }
        }
        Type::Literal(dt) => {
            let cell = &row.cells[*cursor];
            *cursor += 1;
            Ok(Value::Literal(cell_to_literal(dt, cell)?))
        }
        Type::Product(fields) => {
            let mut out = indexmap::IndexMap::new();
            for (key, child_ty) in fields {
                out.insert(key.clone(), reassemble_walk(table, child_ty, row, cursor)?);
            }
            Ok(Value::Product(out))
        }
        Type::Coproduct(fields) => {
            let index_column = *cursor;
            let opt_idx = match &row.cells[index_column] {
                Cell::Integer(i) => usize::try_from(*i)
                    .map_err(|_| Error::Decode("negative coproduct option index".into()))?,
                _ => return Err(Error::Decode("expected an integer coproduct discriminant".into())),
            };
            *cursor += 1;
            let (key, child_ty) = fields
                .get_index(opt_idx)
                .ok_or_else(|| Error::Decode(format!("coproduct option index {opt_idx} out of range")))?;
            let mut result = None;
            for (i, (_key, ty)) in fields.iter().enumerate() {
                let (_, end) = table.arm_range(index_column, i);
                if i == opt_idx {
                    result = Some(reassemble_walk(table, ty, row, cursor)?);
                    debug_assert_eq!(*cursor, end);
                } else {
                    *cursor = end;
                }
            }
            Ok(Value::Coproduct(key.clone(), Box::new(result.expect("selected option visited"))))
        }
        Type::Reference(_) => {
            let cell = &row.cells[*cursor];
            *cursor += 1;
            match cell {
                Cell::Integer(i) => Ok(Value::Reference(*i as u64)),
                _ => Err(Error::Decode("expected an integer cell for a reference column".into())),
            }
        }
    }
}

// ---------------------------------------------------------------------
// Wire bytes <-> Row (used by the streaming codec)
// ---------------------------------------------------------------------

/// Parses one element's already-collected value bytes (spec.md §4.3's
/// `decodeElement`) directly into a row, type-directed.
pub fn bytes_to_row(table: &Table, ty: &Type, bytes: &[u8]) -> Result<Row> {
    let mut cells = vec![Cell::Null; table.columns.len()];
    let mut cursor = 0usize;
    let mut pos = 0usize;
    bytes_walk(table, ty, bytes, &mut pos, &mut cells, &mut cursor)?;
    if pos != bytes.len() {
        return Err(Error::Decode("trailing bytes after decoding a value".into()));
    }
    Ok(Row { cells })
}

fn bytes_walk(
    table: &Table,
    ty: &Type,
    bytes: &[u8],
    pos: &mut usize,
    cells: &mut [Cell],
    cursor: &mut usize,
) -> Result<()> {
    match ty {
        Type::Uri => {
            let len = read_varint_slice(bytes, pos)? as usize;
            cells[*cursor] = Cell::Text(read_utf8(bytes, pos, len)?);
            *cursor += 1;
            Ok(())
        }
        Type::Literal(dt) => {
            cells[*cursor] = read_literal_bytes(dt, bytes, pos)?;
            *cursor += 1;
            Ok(())
        }
        Type::Product(fields) => {
            for (_key, child_ty) in fields {
                bytes_walk(table, child_ty, bytes, pos, cells, cursor)?;
            }
            Ok(())
        }
        Type::Coproduct(fields) => {
            let index_column = *cursor;
            let opt_idx = read_varint_slice(bytes, pos)? as usize;
            fields
                .get_index(opt_idx)
                .ok_or_else(|| Error::Decode(format!("coproduct option index {opt_idx} out of range")))?;
            cells[index_column] = Cell::Integer(opt_idx as i64);
            *cursor += 1;
            for (i, (_key, child_ty)) in fields.iter().enumerate() {
                let (_, end) = table.arm_range(index_column, i);
                if i == opt_idx {
                    bytes_walk(table, child_ty, bytes, pos, cells, cursor)?;
                    debug_assert_eq!(*cursor, end);
                } else {
                    *cursor = end;
                }
            }
            Ok(())
        }
        Type::Reference(_) => {
            let id = read_varint_slice(bytes, pos)?;
            let id = i64::try_from(id)
                .map_err(|_| Error::Range(format!("reference id {id} exceeds supported range")))?;
            cells[*cursor] = Cell::Integer(id);
            *cursor += 1;
            Ok(())
        }
    }
}

/// Writes one row's value bytes in wire format (the inverse of
/// [`bytes_to_row`]), used by `Database::export`.
pub fn encode_row_value(table: &Table, ty: &Type, row: &Row, out: &mut Vec<u8>) -> Result<()> {
    let mut cursor = 0usize;
    encode_walk(table, ty, row, out, &mut cursor)
}

fn encode_walk(table: &Table, ty: &Type, row: &Row, out: &mut Vec<u8>, cursor: &mut usize) -> Result<()> {
    match ty {
        Type::Uri => {
            let s = match &row.cells[*cursor] {
                Cell::Text(s) => s,
                _ => return Err(Error::Type("expected a text cell for a uri column".into())),
            };
            push_varint(out, s.len() as u64);
            out.extend_from_slice(s.as_bytes());
            *cursor += 1;
            Ok(())
        }
        Type::Literal(dt) => {
            write_literal_bytes(dt, &row.cells[*cursor], out)?;
            *cursor += 1;
            Ok(())
        }
        Type::Product(fields) => {
            for (_key, child_ty) in fields {
                encode_walk(table, child_ty, row, out, cursor)?;
            }
            Ok(())
        }
        Type::Coproduct(fields) => {
            let index_column = *cursor;
            let opt_idx = match &row.cells[index_column] {
                Cell::Integer(i) => *i as usize,
                _ => return Err(Error::Type("expected an integer coproduct discriminant".into())),
            };
            push_varint(out, opt_idx as u64);
            *cursor += 1;
            for (i, (_key, child_ty)) in fields.iter().enumerate() {
                let (_, end) = table.arm_range(index_column, i);
                if i == opt_idx {
                    encode_walk(table, child_ty, row, out, cursor)?;
                    debug_assert_eq!(*cursor, end);
                } else {
                    *cursor = end;
                }
            }
            Ok(())
        }
        Type::Reference(_) => {
            let id = match &row.cells[*cursor] {
                Cell::Integer(i) => *i,
                _ => return Err(Error::Type("expected an integer cell for a reference column".into())),
            };
            push_varint(out, id as u64);
            *cursor += 1;
            Ok(())
        }
    }
}

fn read_utf8(bytes: &[u8], pos: &mut usize, len: usize) -> Result<String> {
    let end = pos
        .checked_add(len)
        .filter(|e| *e <= bytes.len())
        .ok_or_else(|| Error::Decode("value byte length runs past the end of the element".into()))?;
    let s = std::str::from_utf8(&bytes[*pos..end])
        .map_err(|e| Error::Decode(format!("invalid utf-8 in string value: {e}")))?
        .to_string();
    *pos = end;
    Ok(s)
}

fn read_exact<'a>(bytes: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = pos
        .checked_add(len)
        .filter(|e| *e <= bytes.len())
        .ok_or_else(|| Error::Decode("fixed-width value runs past the end of the element".into()))?;
    let slice = &bytes[*pos..end];
    *pos = end;
    Ok(slice)
}

fn read_literal_bytes(dt: &Datatype, bytes: &[u8], pos: &mut usize) -> Result<Cell> {
    if let Some(width) = dt.fixed_width() {
        let raw = read_exact(bytes, pos, width)?;
        return read_fixed(dt, raw);
    }
    let len = read_varint_slice(bytes, pos)? as usize;
    match dt {
        Datatype::HexBinary => Ok(Cell::Blob(read_exact(bytes, pos, len)?.to_vec())),
        Datatype::Json => {
            let raw = read_exact(bytes, pos, len)?;
            let value: serde_json::Value = ciborium::de::from_reader(raw)
                .map_err(|e| Error::Decode(format!("invalid rdf:JSON cbor payload: {e}")))?;
            Ok(Cell::Text(
                serde_json::to_string(&value).expect("serde_json::Value always serializes"),
            ))
        }
        _ => Ok(Cell::Text(read_utf8(bytes, pos, len)?)),
    }
}

fn write_literal_bytes(dt: &Datatype, cell: &Cell, out: &mut Vec<u8>) -> Result<()> {
    if dt.fixed_width().is_some() {
        return write_fixed(dt, cell, out);
    }
    match dt {
        Datatype::HexBinary => {
            let bytes = match cell {
                Cell::Blob(b) => b,
                _ => return Err(Error::Type("expected a blob cell for hexBinary".into())),
            };
            push_varint(out, bytes.len() as u64);
            out.extend_from_slice(bytes);
        }
        Datatype::Json => {
            let text = match cell {
                Cell::Text(s) => s,
                _ => return Err(Error::Type("expected a text cell for rdf:JSON".into())),
            };
            let value: serde_json::Value = serde_json::from_str(text)
                .map_err(|e| Error::Type(format!("stored rdf:JSON cell is not valid json: {e}")))?;
            let mut payload = Vec::new();
            ciborium::ser::into_writer(&value, &mut payload)
                .map_err(|e| Error::Decode(format!("failed to cbor-encode rdf:JSON value: {e}")))?;
            push_varint(out, payload.len() as u64);
            out.extend_from_slice(&payload);
        }
        _ => {
            let text = match cell {
                Cell::Text(s) => s,
                _ => return Err(Error::Type("expected a text cell for a string-like literal".into())),
            };
            push_varint(out, text.len() as u64);
            out.extend_from_slice(text.as_bytes());
        }
    }
    Ok(())
}

fn read_fixed(dt: &Datatype, raw: &[u8]) -> Result<Cell> {
    Ok(match dt {
        Datatype::Boolean => match raw[0] {
            0 => Cell::Integer(0),
            1 => Cell::Integer(1),
            other => return Err(Error::Decode(format!("invalid boolean byte: {other}"))),
        },
        Datatype::Byte => Cell::Integer(raw[0] as i8 as i64),
        Datatype::UnsignedByte => Cell::Integer(raw[0] as i64),
        Datatype::Short => Cell::Integer(i16::from_be_bytes(raw.try_into().unwrap()) as i64),
        Datatype::UnsignedShort => Cell::Integer(u16::from_be_bytes(raw.try_into().unwrap()) as i64),
        Datatype::Int => Cell::Integer(i32::from_be_bytes(raw.try_into().unwrap()) as i64),
        Datatype::UnsignedInt => Cell::Integer(u32::from_be_bytes(raw.try_into().unwrap()) as i64),
        Datatype::Long => Cell::Integer(i64::from_be_bytes(raw.try_into().unwrap())),
        Datatype::UnsignedLong => {
            let v = u64::from_be_bytes(raw.try_into().unwrap());
            i64::try_from(v)
                .map(Cell::Integer)
                .map_err(|_| Error::Range(format!("unsignedLong value {v} exceeds supported range")))?
        }
        Datatype::Float => Cell::Real(f32::from_be_bytes(raw.try_into().unwrap()) as f64),
        Datatype::Double => Cell::Real(f64::from_be_bytes(raw.try_into().unwrap())),
        _ => unreachable!("caller only calls read_fixed for fixed-width datatypes"),
    })
}

fn write_fixed(dt: &Datatype, cell: &Cell, out: &mut Vec<u8>) -> Result<()> {
    let i = match cell {
        Cell::Integer(i) => *i,
        Cell::Real(f) => {
            match dt {
                Datatype::Float => out.extend_from_slice(&(*f as f32).to_be_bytes()),
                Datatype::Double => out.extend_from_slice(&f.to_be_bytes()),
                _ => return Err(Error::Type("expected an integer cell for a fixed-width literal".into())),
            }
            return Ok(());
        }
        _ => return Err(Error::Type("expected an integer or real cell for a fixed-width literal".into())),
    };
    match dt {
        Datatype::Boolean => out.push(if i == 0 { 0 } else { 1 }),
        Datatype::Byte => out.push(
            i8::try_from(i)
                .map_err(|_| Error::Range(format!("byte value {i} out of range")))?
                .to_be_bytes()[0],
        ),
        Datatype::UnsignedByte => out.push(
            u8::try_from(i).map_err(|_| Error::Range(format!("unsignedByte value {i} out of range")))?,
        ),
        Datatype::Short => out.extend_from_slice(
            &i16::try_from(i)
                .map_err(|_| Error::Range(format!("short value {i} out of range")))?
                .to_be_bytes(),
        ),
        Datatype::UnsignedShort => out.extend_from_slice(
            &u16::try_from(i)
                .map_err(|_| Error::Range(format!("unsignedShort value {i} out of range")))?
                .to_be_bytes(),
        ),
        Datatype::Int => out.extend_from_slice(
            &i32::try_from(i)
                .map_err(|_| Error::Range(format!("int value {i} out of range")))?
                .to_be_bytes(),
        ),
        Datatype::UnsignedInt => out.extend_from_slice(
            &u32::try_from(i)
                .map_err(|_| Error::Range(format!("unsignedInt value {i} out of range")))?
                .to_be_bytes(),
        ),
        Datatype::Long => out.extend_from_slice(&i.to_be_bytes()),
        Datatype::UnsignedLong => out.extend_from_slice(&(i as u64).to_be_bytes()),
        _ => unreachable!("caller only calls write_fixed for fixed-width integer datatypes"),
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Literal <-> Cell (lexical form, used by shred/reassemble)
// ---------------------------------------------------------------------

fn parse_int<T>(lexical: &str) -> Result<T>
where
    T: std::str::FromStr<Err = ParseIntError>,
{
    lexical.parse::<T>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            Error::Range(format!("integer literal '{lexical}' is out of range"))
        }
        _ => Error::Type(format!("invalid integer literal: '{lexical}'")),
    })
}

fn literal_to_cell(dt: &Datatype, lexical: &str) -> Result<Cell> {
    Ok(match dt {
        Datatype::Boolean => match lexical {
            "true" => Cell::Integer(1),
            "false" => Cell::Integer(0),
            _ => return Err(Error::Type(format!("invalid boolean literal: '{lexical}'"))),
        },
        Datatype::Byte => Cell::Integer(parse_int::<i8>(lexical)? as i64),
        Datatype::UnsignedByte => Cell::Integer(parse_int::<u8>(lexical)? as i64),
        Datatype::Short => Cell::Integer(parse_int::<i16>(lexical)? as i64),
        Datatype::UnsignedShort => Cell::Integer(parse_int::<u16>(lexical)? as i64),
        Datatype::Int => Cell::Integer(parse_int::<i32>(lexical)? as i64),
        Datatype::UnsignedInt => Cell::Integer(parse_int::<u32>(lexical)? as i64),
        Datatype::Long => Cell::Integer(parse_int::<i64>(lexical)?),
        Datatype::UnsignedLong => {
            let v = parse_int::<u64>(lexical)?;
            i64::try_from(v)
                .map(Cell::Integer)
                .map_err(|_| Error::Range(format!("unsignedLong literal '{lexical}' is out of range")))?
        }
        Datatype::Float => Cell::Real(
            lexical
                .parse::<f32>()
                .map_err(|_| Error::Type(format!("invalid float literal: '{lexical}'")))? as f64,
        ),
        Datatype::Double => Cell::Real(
            lexical
                .parse::<f64>()
                .map_err(|_| Error::Type(format!("invalid double literal: '{lexical}'")))?,
        ),
        Datatype::HexBinary => Cell::Blob(
            hex::decode(lexical).map_err(|e| Error::Type(format!("invalid hexBinary literal: {e}")))?,
        ),
        Datatype::Json => {
            let value: serde_json::Value = serde_json::from_str(lexical)
                .map_err(|e| Error::Type(format!("invalid rdf:JSON literal: {e}")))?;
            Cell::Text(serde_json::to_string(&value).expect("serde_json::Value always serializes"))
        }
        Datatype::Other(_) => Cell::Text(lexical.to_string()),
    })
}

fn cell_to_literal(dt: &Datatype, cell: &Cell) -> Result<String> {
    Ok(match dt {
        Datatype::Boolean => match cell {
            Cell::Integer(0) => "false".to_string(),
            Cell::Integer(1) => "true".to_string(),
            _ => return Err(Error::Decode("expected a 0/1 integer cell for a boolean".into())),
        },
        Datatype::Byte
        | Datatype::UnsignedByte
        | Datatype::Short
        | Datatype::UnsignedShort
        | Datatype::Int
        | Datatype::UnsignedInt
        | Datatype::Long
        | Datatype::UnsignedLong => match cell {
            Cell::Integer(i) => i.to_string(),
            _ => return Err(Error::Decode("expected an integer cell for an integer literal".into())),
        },
        Datatype::Float => match cell {
            Cell::Real(f) => format!("{}", *f as f32),
            _ => return Err(Error::Decode("expected a real cell for a float literal".into())),
        },
        Datatype::Double => match cell {
            Cell::Real(f) => f.to_string(),
            _ => return Err(Error::Decode("expected a real cell for a double literal".into())),
        },
        Datatype::HexBinary => match cell {
            Cell::Blob(b) => hex::encode(b),
            _ => return Err(Error::Decode("expected a blob cell for hexBinary".into())),
        },
        Datatype::Json | Datatype::Other(_) => match cell {
            Cell::Text(s) => s.clone(),
            _ => return Err(Error::Decode("expected a text cell for a string-like literal".into())),
        },
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compile::compile_schema;
    use indexmap::IndexMap;
    use tasl_schema::Datatype;

    fn person_schema() -> Schema {
        let mut fields = IndexMap::new();
        fields.insert("name".to_string(), Type::Literal(Datatype::Other(
            "http://www.w3.org/2001/XMLSchema#string".to_string(),
        )));
        fields.insert("age".to_string(), Type::Literal(Datatype::UnsignedByte));
        let mut classes = IndexMap::new();
        classes.insert("http://example.com/Person".to_string(), Type::Product(fields));
        Schema::new(classes)
    }

    #[test]
    fn shred_and_reassemble_round_trip_a_product() {
        let schema = person_schema();
        let tables = compile_schema(&schema).unwrap();
        let ty = schema.class_type_at(0).unwrap();

        let mut fields = IndexMap::new();
        fields.insert("name".to_string(), Value::Literal("Ada".to_string()));
        fields.insert("age".to_string(), Value::Literal("36".to_string()));
        let value = Value::Product(fields);

        let row = shred(&tables[0], ty, &value).unwrap();
        assert_eq!(row.cells[0], Cell::Text("Ada".to_string()));
        assert_eq!(row.cells[1], Cell::Integer(36));

        let rebuilt = reassemble(&tables[0], ty, &row, &schema).unwrap();
        assert_eq!(rebuilt, value);
    }

    #[test]
    fn coproduct_shred_null_fills_sibling_arms() {
        let mut options = IndexMap::new();
        options.insert("a".to_string(), Type::Uri);
        options.insert("b".to_string(), Type::Literal(Datatype::Int));
        let mut classes = IndexMap::new();
        classes.insert("http://example.com/Thing".to_string(), Type::Coproduct(options));
        let schema = Schema::new(classes);
        let tables = compile_schema(&schema).unwrap();
        let ty = schema.class_type_at(0).unwrap();

        let value = Value::coproduct("b", Value::Literal("5".to_string()));
        let row = shred(&tables[0], ty, &value).unwrap();
        assert_eq!(row.cells, vec![Cell::Integer(1), Cell::Null, Cell::Integer(5)]);

        let rebuilt = reassemble(&tables[0], ty, &row, &schema).unwrap();
        assert_eq!(rebuilt, value);
    }

    #[test]
    fn wire_bytes_round_trip_through_bytes_to_row_and_encode_row_value() {
        let schema = person_schema();
        let tables = compile_schema(&schema).unwrap();
        let ty = schema.class_type_at(0).unwrap();

        let mut fields = IndexMap::new();
        fields.insert("name".to_string(), Value::Literal("Grace".to_string()));
        fields.insert("age".to_string(), Value::Literal("85".to_string()));
        let value = Value::Product(fields);
        let row = shred(&tables[0], ty, &value).unwrap();

        let mut bytes = Vec::new();
        encode_row_value(&tables[0], ty, &row, &mut bytes).unwrap();
        let decoded = bytes_to_row(&tables[0], ty, &bytes).unwrap();
        assert_eq!(decoded, row);
    }

    #[test]
    fn unsigned_long_overflow_is_a_range_error() {
        let huge = (u64::MAX).to_string();
        let err = literal_to_cell(&Datatype::UnsignedLong, &huge).unwrap_err();
        assert!(matches!(err, Error::Range(_)));
    }
}
