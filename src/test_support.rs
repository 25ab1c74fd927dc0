//! In-memory fixtures shared by unit tests

use std::io::{Cursor, Write};

use rusqlite::Connection;
use tempfile::TempDir;

/// Build a SQLite file from a SQL script and return its bytes
pub fn sqlite_bytes(sql: &str) -> Vec<u8> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fixture.db");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(sql).unwrap();
    }
    std::fs::read(&path).unwrap()
}

/// Build a ZIP archive from (name, content) pairs
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, zip::write::SimpleFileOptions::default()).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
