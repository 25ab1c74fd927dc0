//! Relational (SQLite) artifact extraction
//!
//! The entry bytes are written to a scratch file and opened read-only. Every
//! user table is classified by its column names, and each open category
//! gate runs its own projection query:
//!
//! ```text
//! table "sms" (address, body, date, type)
//!        │
//!        ├── chat gate (content column) ──► SELECT "address","body","date","type" FROM "sms"
//!        ├── call gate (closed)
//!        ├── contact gate (closed)
//!        └── media gate (closed)
//! ```
//!
//! A failing query only drops that category for that table. A file that
//! cannot be opened or listed at all fails the whole artifact.

use std::fs;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::{Number, Value};
use tracing::{debug, trace, warn};

use super::records::{build_call, build_chat, build_contact, build_media, RoleRow};
use super::ArtifactOutcome;
use crate::classify::{classify_columns, ColumnRole, ColumnRoles};
use crate::config::EngineConfig;
use crate::error::ArtifactError;
use crate::types::{Provenance, RecordBatch};

/// Extractor label for relational records
pub const RELATIONAL_EXTRACTOR: &str = "relational";

/// File extensions treated as SQLite even without the header signature
pub const SQLITE_EXTENSIONS: &[&str] = &["db", "sqlite", "sqlite3", "db3", "sqlitedb"];

/// SQLite header signature
pub const SQLITE_SIGNATURE: &[u8] = b"SQLite format 3\0";

/// Record category with its own gate and projection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Chat,
    Call,
    Contact,
    Media,
}

impl Category {
    pub const ALL: [Category; 4] = [Category::Chat, Category::Call, Category::Contact, Category::Media];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Chat => "chat",
            Category::Call => "call",
            Category::Contact => "contact",
            Category::Media => "media",
        }
    }

    /// Roles worth projecting for this category
    fn roles(&self) -> &'static [ColumnRole] {
        match self {
            Category::Chat => &[
                ColumnRole::Content,
                ColumnRole::Sender,
                ColumnRole::Receiver,
                ColumnRole::Phone,
                ColumnRole::Timestamp,
                ColumnRole::Created,
                ColumnRole::Kind,
                ColumnRole::Deleted,
                ColumnRole::AppName,
            ],
            Category::Call => &[
                ColumnRole::Sender,
                ColumnRole::Receiver,
                ColumnRole::Phone,
                ColumnRole::Duration,
                ColumnRole::Kind,
                ColumnRole::Timestamp,
                ColumnRole::Created,
            ],
            Category::Contact => &[ColumnRole::Name, ColumnRole::Phone, ColumnRole::Email],
            Category::Media => &[
                ColumnRole::Filename,
                ColumnRole::Path,
                ColumnRole::Mime,
                ColumnRole::Size,
                ColumnRole::Created,
                ColumnRole::Modified,
                ColumnRole::HashMd5,
                ColumnRole::HashSha256,
            ],
        }
    }

    fn gate_open(&self, roles: &ColumnRoles) -> bool {
        match self {
            Category::Chat => roles.is_chat_candidate(),
            Category::Call => roles.is_call_candidate(),
            Category::Contact => roles.is_contact_candidate(),
            Category::Media => roles.is_media_candidate(),
        }
    }
}

/// Whether bytes start with the SQLite header
pub fn has_sqlite_signature(header: &[u8]) -> bool {
    header.starts_with(SQLITE_SIGNATURE)
}

/// Extract every recognizable table of an embedded SQLite file
pub fn extract_database(
    bytes: &[u8],
    prov: &Provenance,
    config: &EngineConfig,
) -> Result<ArtifactOutcome, ArtifactError> {
    let scratch = tempfile::TempDir::new()?;
    let db_path = scratch.path().join("artifact.sqlite");
    fs::write(&db_path, bytes)?;

    let conn = Connection::open_with_flags(
        &db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    let tables = list_tables(&conn)?;
    debug!("{}: {} tables", prov.artifact, tables.len());

    let mut outcome = ArtifactOutcome::default();
    for table in &tables {
        let columns = match table_columns(&conn, table) {
            Ok(columns) => columns,
            Err(e) => {
                warn!("{}: cannot read columns of {}: {}", prov.artifact, table, e);
                outcome.skip(&prov.artifact, Some(table.clone()), e);
                continue;
            }
        };

        let roles = classify_columns(&columns);
        let table_prov = prov.for_source(table);

        for category in Category::ALL {
            if !category.gate_open(&roles) {
                continue;
            }
            match extract_category(&conn, table, &roles, category, &table_prov, config) {
                Ok((batch, unreadable)) => {
                    debug!(
                        "{}: {} -> {} {} records",
                        prov.artifact,
                        table,
                        batch.len(),
                        category.as_str()
                    );
                    if unreadable > 0 {
                        outcome.skip(
                            &prov.artifact,
                            Some(format!("{}/{}", table, category.as_str())),
                            format!("{} unreadable rows", unreadable),
                        );
                    }
                    outcome.batch.append(batch);
                }
                Err(e) => {
                    warn!("{}: {} ({}) skipped: {}", prov.artifact, table, category.as_str(), e);
                    outcome.skip(
                        &prov.artifact,
                        Some(format!("{}/{}", table, category.as_str())),
                        e,
                    );
                }
            }
        }
    }

    Ok(outcome)
}

/// User tables in name order
fn list_tables(conn: &Connection) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    rows.collect()
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, rusqlite::Error> {
    let stmt = conn.prepare(&format!("SELECT * FROM {} LIMIT 0", quote_ident(table)))?;
    let columns = stmt.column_names().into_iter().map(str::to_string).collect();
    Ok(columns)
}

fn extract_category(
    conn: &Connection,
    table: &str,
    roles: &ColumnRoles,
    category: Category,
    prov: &Provenance,
    config: &EngineConfig,
) -> Result<(RecordBatch, usize), rusqlite::Error> {
    let projected: Vec<(ColumnRole, &str)> = category
        .roles()
        .iter()
        .filter_map(|role| roles.column(*role).map(|column| (*role, column)))
        .collect();

    let select_list: Vec<String> = projected.iter().map(|(_, column)| quote_ident(column)).collect();
    let mut query = format!("SELECT {} FROM {}", select_list.join(", "), quote_ident(table));
    if let Some(max) = config.max_rows_per_table {
        query.push_str(&format!(" LIMIT {}", max));
    }

    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map([], |row| {
        let mut role_row = RoleRow::new();
        for (i, (role, _)) in projected.iter().enumerate() {
            role_row.insert(*role, value_ref_to_json(row.get_ref(i)?));
        }
        Ok(role_row)
    })?;

    let mut batch = RecordBatch::default();
    let mut unreadable = 0usize;
    for (index, row) in rows.enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                trace!("{}: {} row {} unreadable: {}", prov.artifact, table, index, e);
                unreadable += 1;
                continue;
            }
        };
        let kept = match category {
            Category::Chat => push_some(&mut batch.chat_records, build_chat(&row, prov, config)),
            Category::Call => push_some(&mut batch.call_records, build_call(&row, prov)),
            Category::Contact => push_some(&mut batch.contacts, build_contact(&row, prov)),
            Category::Media => push_some(&mut batch.media_files, build_media(&row, prov)),
        };
        if !kept {
            trace!("{}: {} row {} has no {} fields", prov.artifact, table, index, category.as_str());
        }
    }

    Ok((batch, unreadable))
}

fn push_some<T>(records: &mut Vec<T>, record: Option<T>) -> bool {
    match record {
        Some(record) => {
            records.push(record);
            true
        }
        None => false,
    }
}

/// Double-quoted SQL identifier
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn value_ref_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        // Text stored as BLOB is common in app databases; binary blobs are dropped
        ValueRef::Blob(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => Value::String(text.to_string()),
            Err(_) => Value::Null,
        },
    }
}
