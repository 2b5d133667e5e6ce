//! Database Core (spec.md §4.5): an embedded, schema-typed instance store
//! backed by `rusqlite`'s bundled SQLite, following the same leaked-handle
//! lifetime trick the teacher's `derive-sqlite::connector::Handle` uses to
//! let cached prepared statements and row cursors outlive their borrow of
//! a `Connection` that is, structurally, owned by the very struct caching
//! them (`crates/derive-sqlite/src/connector.rs`).

use crate::codec::{Decoder, Encoder};
use crate::compile::{self, Table};
use crate::shred::{self, Cell, Row};
use crate::{Error, Result};
use bytes::Bytes;
use futures::Stream;
use std::collections::VecDeque;
use std::path::Path;
use tasl_schema::{Schema, Type, Value};

/// Wire format version written at the start of every `export`/expected at
/// the start of every `import` stream (spec.md §4.3).
pub const CODEC_VERSION: u64 = 1;

#[derive(Debug, Clone, Copy)]
pub struct OpenOptions {
    pub read_only: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        OpenOptions { read_only: false }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    pub chunk_size: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions { chunk_size: 1024 }
    }
}

struct ClassStatements<'db> {
    has: rusqlite::Statement<'db>,
    get: rusqlite::Statement<'db>,
    count: rusqlite::Statement<'db>,
    insert_returning_id: rusqlite::Statement<'db>,
    upsert_by_id: rusqlite::Statement<'db>,
}

/// A self-referential `Statement` + `Rows` pair, kept alive together by
/// leaking the `Statement` onto the heap. Mirrors `connector::Handle`'s
/// `Box::leak`/`Box::from_raw` lifecycle, generalized from "one Connection
/// per Handle" to "one Statement per cursor".
struct RowCursor {
    stmt_ptr: *mut rusqlite::Statement<'static>,
    rows: Option<rusqlite::Rows<'static>>,
}

impl RowCursor {
    fn prepare(conn: &'static rusqlite::Connection, sql: &str) -> Result<Self> {
        let stmt = conn.prepare(sql)?;
        let stmt_ptr: *mut rusqlite::Statement<'static> = Box::into_raw(Box::new(stmt));
        // SAFETY: `stmt_ptr` is owned by this `RowCursor` for its whole
        // lifetime and reclaimed in `Drop`, only after `rows` (which
        // borrows it) has already been dropped by taking it out first.
        let stmt_ref: &'static mut rusqlite::Statement<'static> = unsafe { &mut *stmt_ptr };
        let rows = stmt_ref.query([])?;
        Ok(RowCursor { stmt_ptr, rows: Some(rows) })
    }

    fn next_id(&mut self) -> Result<Option<i64>> {
        match self.rows.as_mut().unwrap().next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn next_cells(&mut self, ncols: usize) -> Result<Option<(i64, Vec<Cell>)>> {
        match self.rows.as_mut().unwrap().next()? {
            Some(row) => {
                let id: i64 = row.get(0)?;
                let mut cells = Vec::with_capacity(ncols);
                for i in 0..ncols {
                    cells.push(Cell::from_value_ref(row.get_ref(i + 1)?));
                }
                Ok(Some((id, cells)))
            }
            None => Ok(None),
        }
    }
}

impl Drop for RowCursor {
    fn drop(&mut self) {
        self.rows.take();
        unsafe {
            drop(Box::from_raw(self.stmt_ptr));
        }
    }
}

/// Ascending-by-id iteration over one class's element ids.
pub struct Keys {
    cursor: RowCursor,
}

impl Iterator for Keys {
    type Item = Result<u64>;
    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor.next_id() {
            Ok(Some(id)) => Some(Ok(id as u64)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Ascending-by-id iteration over one class's element values.
pub struct Values {
    cursor: RowCursor,
    table: Table,
    ty: Type,
    schema: Schema,
}

impl Iterator for Values {
    type Item = Result<Value>;
    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor.next_cells(self.table.columns.len()) {
            Ok(Some((_, cells))) => Some(shred::reassemble(&self.table, &self.ty, &Row { cells }, &self.schema)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Ascending-by-id iteration over one class's `(id, value)` pairs.
pub struct Entries {
    cursor: RowCursor,
    table: Table,
    ty: Type,
    schema: Schema,
}

impl Iterator for Entries {
    type Item = Result<(u64, Value)>;
    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor.next_cells(self.table.columns.len()) {
            Ok(Some((id, cells))) => {
                Some(shred::reassemble(&self.table, &self.ty, &Row { cells }, &self.schema).map(|v| (id as u64, v)))
            }
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// An open tasl instance: a schema, its compiled tables, and a SQLite
/// connection holding the data.
pub struct Database {
    conn: &'static rusqlite::Connection,
    schema: Schema,
    tables: Vec<Table>,
    statements: Vec<ClassStatements<'static>>,
}

// SAFETY: `Database` never lets two threads touch `conn` concurrently
// (spec.md §5: single-threaded, cooperative concurrency only); the marker
// is only needed so a `Database` can be moved into an `async` context.
unsafe impl Send for Database {}

impl Database {
    /// Creates a brand-new instance at `path` (or in memory if `None`),
    /// writing the schema blob and compiling + creating every class table.
    pub fn create(path: Option<&Path>, schema: Schema) -> Result<Database> {
        let conn = match path {
            Some(p) => {
                if p.exists() {
                    std::fs::remove_file(p)?;
                }
                rusqlite::Connection::open(p)?
            }
            None => rusqlite::Connection::open_in_memory()?,
        };
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute(
            "CREATE TABLE schemas (id INTEGER PRIMARY KEY, value BLOB NOT NULL)",
            [],
        )?;
        conn.execute(
            "INSERT INTO schemas (id, value) VALUES (0, ?1)",
            rusqlite::params![schema.encode()],
        )?;

        let tables = compile::compile_schema(&schema)?;
        for table in &tables {
            conn.execute_batch(&compile::table_ddl(table))?;
        }

        let conn: &'static rusqlite::Connection = Box::leak(Box::new(conn));
        let statements = build_statements(conn, &tables)?;

        tracing::debug!(classes = tables.len(), "created tasl database");
        Ok(Database { conn, schema, tables, statements })
    }

    /// Opens a previously-created instance, reading its schema blob back
    /// and recompiling it (the compiler is deterministic, so the compiled
    /// tables always agree with what `create` built). Mirrors the teacher's
    /// `catalog::open_unchecked`: `SQLITE_OPEN_READ_ONLY`/`READ_WRITE` without
    /// `SQLITE_OPEN_CREATE`, so opening a path that doesn't exist fails
    /// instead of silently creating an empty database (spec.md §4.5: "open
    /// existing storage (must exist)").
    pub fn open(path: &Path, options: OpenOptions) -> Result<Database> {
        let conn = if options.read_only {
            rusqlite::Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?
        } else {
            let conn = rusqlite::Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            conn
        };

        let blob: Vec<u8> = conn.query_row("SELECT value FROM schemas WHERE id = 0", [], |r| r.get(0))?;
        let schema = Schema::decode(&blob)?;
        let tables = compile::compile_schema(&schema)?;

        let conn: &'static rusqlite::Connection = Box::leak(Box::new(conn));
        let statements = build_statements(conn, &tables)?;

        tracing::debug!(path = %path.display(), classes = tables.len(), "opened tasl database");
        Ok(Database { conn, schema, tables, statements })
    }

    /// Consumes and drops the handle, releasing its connection. Exists as
    /// an explicit counterpart to spec.md's external `close()` operation;
    /// `Drop` alone would already do this.
    pub fn close(self) {}

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn class_index(&self, key: &str) -> Result<usize> {
        self.schema
            .class_index(key)
            .ok_or_else(|| Error::UnknownClass(key.to_string()))
    }

    pub fn has(&mut self, key: &str, id: u64) -> Result<bool> {
        let idx = self.class_index(key)?;
        let id = i64::try_from(id).map_err(|_| Error::Range(format!("id {id} exceeds supported range")))?;
        Ok(self.statements[idx].has.exists(rusqlite::params![id])?)
    }

    pub fn count(&mut self, key: &str) -> Result<u64> {
        let idx = self.class_index(key)?;
        let n: i64 = self.statements[idx].count.query_row([], |r| r.get(0))?;
        Ok(n as u64)
    }

    pub fn get(&mut self, key: &str, id: u64) -> Result<Value> {
        let idx = self.class_index(key)?;
        let table = self.tables[idx].clone();
        let ty = self.schema.class_type_at(idx).expect("class_index implies class_type_at").clone();
        let id_i64 = i64::try_from(id).map_err(|_| Error::Range(format!("id {id} exceeds supported range")))?;

        let ncols = table.columns.len();
        let row = self.statements[idx].get.query_row(rusqlite::params![id_i64], |r| {
            let mut cells = Vec::with_capacity(ncols);
            for i in 0..ncols {
                cells.push(Cell::from_value_ref(r.get_ref(i)?));
            }
            Ok(Row { cells })
        });
        match row {
            Ok(row) => shred::reassemble(&table, &ty, &row, &self.schema),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(Error::NoSuchElement { class: key.to_string(), id })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(&mut self, key: &str, id: u64, value: &Value) -> Result<()> {
        let idx = self.class_index(key)?;
        let table = self.tables[idx].clone();
        let ty = self.schema.class_type_at(idx).expect("class_index implies class_type_at").clone();
        let row = shred::shred(&table, &ty, value)?;
        let id_i64 = i64::try_from(id).map_err(|_| Error::Range(format!("id {id} exceeds supported range")))?;

        let mut params: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(row.cells.len() + 1);
        params.push(&id_i64);
        for cell in &row.cells {
            params.push(cell);
        }
        self.statements[idx].upsert_by_id.execute(params.as_slice())?;
        Ok(())
    }

    pub fn push(&mut self, key: &str, value: &Value) -> Result<u64> {
        let idx = self.class_index(key)?;
        let table = self.tables[idx].clone();
        let ty = self.schema.class_type_at(idx).expect("class_index implies class_type_at").clone();
        let row = shred::shred(&table, &ty, value)?;

        let params: Vec<&dyn rusqlite::ToSql> = row.cells.iter().map(|c| c as &dyn rusqlite::ToSql).collect();
        let id: i64 = self.statements[idx].insert_returning_id.query_row(params.as_slice(), |r| r.get(0))?;
        Ok(id as u64)
    }

    /// Inserts or replaces many elements, possibly across several classes
    /// and with forward references between them, inside one transaction
    /// with foreign-key checking deferred to `COMMIT` (spec.md §4.5's
    /// `merge`; `dbutil.rs`'s `commit_and_begin` toggling pattern for the
    /// surrounding `BEGIN`/`COMMIT` shape). `PRAGMA defer_foreign_keys`
    /// — not `PRAGMA foreign_keys = OFF` — is what lets elements with
    /// mutual forward references resolve within the call while still
    /// failing the whole merge if a reference is left dangling when the
    /// transaction commits (spec.md §8 property 7, "Merge atomicity"); it
    /// also self-resets to off at the end of every transaction, commit or
    /// rollback, so no explicit restore step is needed.
    pub fn merge<I>(&mut self, elements: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, u64, Value)>,
    {
        self.conn.execute_batch("PRAGMA defer_foreign_keys = ON; BEGIN;")?;
        tracing::warn!("foreign key checking deferred to commit for a merge transaction");

        let result = (|| -> Result<()> {
            for (key, id, value) in elements {
                self.set(&key, id, &value)?;
            }
            Ok(())
        })();

        match result.and_then(|()| self.conn.execute_batch("COMMIT;").map_err(Error::from)) {
            Ok(()) => {
                tracing::info!("merge transaction committed");
                Ok(())
            }
            Err(e) => {
                // A deferred foreign key violation surfaces as a failed
                // COMMIT, which (unlike a failed statement) leaves the
                // transaction open in SQLite, so it still needs rolling back.
                let _ = self.conn.execute_batch("ROLLBACK;");
                Err(e)
            }
        }
    }

    pub fn keys(&self, key: &str) -> Result<Keys> {
        let idx = self.class_index(key)?;
        let sql = format!("SELECT id FROM {} ORDER BY id ASC", self.tables[idx].name);
        Ok(Keys { cursor: RowCursor::prepare(self.conn, &sql)? })
    }

    pub fn values(&self, key: &str) -> Result<Values> {
        let idx = self.class_index(key)?;
        let table = self.tables[idx].clone();
        let ty = self.schema.class_type_at(idx).expect("class_index implies class_type_at").clone();
        let sql = format!(
            "SELECT id, {} FROM {} ORDER BY id ASC",
            compile::column_list(&table),
            table.name
        );
        Ok(Values { cursor: RowCursor::prepare(self.conn, &sql)?, table, ty, schema: self.schema.clone() })
    }

    pub fn entries(&self, key: &str) -> Result<Entries> {
        let idx = self.class_index(key)?;
        let table = self.tables[idx].clone();
        let ty = self.schema.class_type_at(idx).expect("class_index implies class_type_at").clone();
        let sql = format!(
            "SELECT id, {} FROM {} ORDER BY id ASC",
            compile::column_list(&table),
            table.name
        );
        Ok(Entries { cursor: RowCursor::prepare(self.conn, &sql)?, table, ty, schema: self.schema.clone() })
    }

    /// Reads a self-delimiting byte stream into a freshly-created instance
    /// (spec.md §4.3/§4.5). The whole load runs under one `defer_foreign_keys`
    /// transaction (same reasoning as `merge`): classes arrive in schema
    /// order and may reference classes not yet loaded, so checks are
    /// deferred to `COMMIT`, at which point a dangling reference anywhere
    /// in the stream fails the entire import.
    pub async fn import<S>(path: Option<&Path>, schema: Schema, stream: S) -> Result<Database>
    where
        S: Stream<Item = std::io::Result<Bytes>> + Unpin,
    {
        let mut db = Database::create(path, schema)?;
        db.conn.execute_batch("PRAGMA defer_foreign_keys = ON; BEGIN;")?;

        let result = import_body(&mut db, stream).await;

        match result.and_then(|()| db.conn.execute_batch("COMMIT;").map_err(Error::from)) {
            Ok(()) => {
                tracing::info!(classes = db.tables.len(), "imported tasl database");
                Ok(db)
            }
            Err(e) => {
                // As in `merge`, a deferred foreign key violation surfaces
                // as a failed COMMIT and still needs an explicit ROLLBACK.
                let _ = db.conn.execute_batch("ROLLBACK;");
                Err(e)
            }
        }
    }

    /// Streams every class's elements out in ascending-id order as a
    /// chunked byte iterator, inside a single `BEGIN DEFERRED` read
    /// transaction held open for the export's whole lifetime so concurrent
    /// writers (there are none under §5's single-writer model, but future
    /// readers of this code shouldn't assume that) can't produce a
    /// half-old, half-new snapshot.
    pub fn export(&self, options: ExportOptions) -> Result<Export> {
        let encoder = Encoder::new(options.chunk_size)?;
        self.conn.execute_batch("BEGIN DEFERRED;")?;
        Ok(Export {
            schema: self.schema.clone(),
            tables: self.tables.clone(),
            conn: self.conn,
            class_index: 0,
            cursor: None,
            remaining: 0,
            prev_id: None,
            encoder,
            pending: VecDeque::new(),
            header_written: false,
            done: false,
        })
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        // Drop every cached prepared statement before reclaiming the
        // Connection they borrow from (mirrors connector::Handle::drop's
        // "force lambdas to drop first" ordering).
        self.statements.clear();
        let ptr = self.conn as *const rusqlite::Connection as *mut rusqlite::Connection;
        unsafe {
            drop(Box::from_raw(ptr));
        }
    }
}

async fn import_body<S>(db: &mut Database, stream: S) -> Result<()>
where
    S: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    let mut decoder = Decoder::new(stream);
    let version = decoder.decode_varint().await?;
    if version != CODEC_VERSION {
        return Err(Error::Decode(format!("unsupported encoding version: {version}")));
    }

    for class_index in 0..db.tables.len() {
        let table = db.tables[class_index].clone();
        let ty = db
            .schema
            .class_type_at(class_index)
            .expect("compiled table implies a class type")
            .clone();
        let count = decoder.decode_varint().await?;
        let mut prev: Option<u64> = None;
        for _ in 0..count {
            let delta = decoder.decode_varint().await?;
            let id = match prev {
                None => delta,
                Some(p) => p.checked_add(1).and_then(|p| p.checked_add(delta)).ok_or_else(|| {
                    Error::Range("element id overflowed while decoding an import stream".into())
                })?,
            };
            prev = Some(id);
            let row = decoder.decode_row(&table, &ty).await?;
            upsert_row(db, class_index, id, row)?;
        }
    }

    decoder.expect_exhausted().await
}

fn upsert_row(db: &mut Database, class_index: usize, id: u64, row: Row) -> Result<()> {
    let id_i64 = i64::try_from(id).map_err(|_| Error::Range(format!("id {id} exceeds supported range")))?;
    let mut params: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(row.cells.len() + 1);
    params.push(&id_i64);
    for cell in &row.cells {
        params.push(cell);
    }
    db.statements[class_index].upsert_by_id.execute(params.as_slice())?;
    Ok(())
}

fn build_statements(conn: &'static rusqlite::Connection, tables: &[Table]) -> Result<Vec<ClassStatements<'static>>> {
    tables
        .iter()
        .map(|table| {
            let cols = compile::column_list(table);
            let placeholders = (1..=table.columns.len())
                .map(|i| format!("?{}", i + 1))
                .collect::<Vec<_>>()
                .join(", ");
            let value_placeholders = (1..=table.columns.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            let assignments = table
                .columns
                .iter()
                .map(|c| format!("{0} = excluded.{0}", c.name))
                .collect::<Vec<_>>()
                .join(", ");

            let has_sql = format!("SELECT 1 FROM {} WHERE id = ?1", table.name);
            let get_sql = format!("SELECT {cols} FROM {} WHERE id = ?1", table.name);
            let count_sql = format!("SELECT COUNT(*) FROM {}", table.name);
            let insert_sql = format!(
                "INSERT INTO {} ({cols}) VALUES ({value_placeholders}) RETURNING id",
                table.name
            );
            let upsert_sql = format!(
                "INSERT INTO {} (id, {cols}) VALUES (?1, {placeholders}) \
                 ON CONFLICT(id) DO UPDATE SET {assignments}",
                table.name
            );

            Ok(ClassStatements {
                has: conn.prepare(&has_sql)?,
                get: conn.prepare(&get_sql)?,
                count: conn.prepare(&count_sql)?,
                insert_returning_id: conn.prepare(&insert_sql)?,
                upsert_by_id: conn.prepare(&upsert_sql)?,
            })
        })
        .collect()
}

/// The iterator returned by [`Database::export`].
pub struct Export {
    schema: Schema,
    tables: Vec<Table>,
    conn: &'static rusqlite::Connection,
    class_index: usize,
    cursor: Option<RowCursor>,
    remaining: u64,
    prev_id: Option<u64>,
    encoder: Encoder,
    pending: VecDeque<Bytes>,
    header_written: bool,
    done: bool,
}

impl Export {
    fn advance(&mut self) -> Result<()> {
        let mut out = Vec::new();

        if !self.header_written {
            self.encoder.write_varint(CODEC_VERSION, &mut out)?;
            self.header_written = true;
            self.pending.extend(out);
            return Ok(());
        }

        loop {
            if self.class_index >= self.tables.len() {
                return self.finish();
            }
            if self.cursor.is_none() {
                let table = &self.tables[self.class_index];
                let count: i64 =
                    self.conn.query_row(&format!("SELECT COUNT(*) FROM {}", table.name), [], |r| r.get(0))?;
                self.remaining = count as u64;
                self.prev_id = None;
                self.encoder.write_varint(self.remaining, &mut out)?;
                let sql = format!(
                    "SELECT id, {} FROM {} ORDER BY id ASC",
                    compile::column_list(table),
                    table.name
                );
                self.cursor = Some(RowCursor::prepare(self.conn, &sql)?);
                if !out.is_empty() {
                    self.pending.extend(out);
                    return Ok(());
                }
            }

            let table = self.tables[self.class_index].clone();
            let ty = self
                .schema
                .class_type_at(self.class_index)
                .expect("compiled table implies a class type")
                .clone();
            let ncols = table.columns.len();
            match self.cursor.as_mut().unwrap().next_cells(ncols)? {
                Some((id, cells)) => {
                    let id = id as u64;
                    let delta = match self.prev_id {
                        None => id,
                        Some(p) => id - p - 1,
                    };
                    self.prev_id = Some(id);
                    self.encoder.write_varint(delta, &mut out)?;
                    let mut value_bytes = Vec::new();
                    shred::encode_row_value(&table, &ty, &Row { cells }, &mut value_bytes)?;
                    self.encoder.write_bytes(&value_bytes, &mut out)?;
                    self.pending.extend(out);
                    return Ok(());
                }
                None => {
                    self.cursor = None;
                    self.class_index += 1;
                    continue;
                }
            }
        }
    }

    fn finish(&mut self) -> Result<()> {
        let mut out = Vec::new();
        self.encoder.close(&mut out)?;
        self.pending.extend(out);
        self.done = true;
        Ok(())
    }
}

impl Iterator for Export {
    type Item = Result<Bytes>;
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                return Some(Ok(chunk));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.advance() {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}

impl Drop for Export {
    fn drop(&mut self) {
        // Release any open row cursor before ending the snapshot
        // transaction it was taken under.
        self.cursor = None;
        let _ = self.conn.execute_batch("COMMIT;");
    }
}
