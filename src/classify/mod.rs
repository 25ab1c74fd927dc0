//! Deciding what a table, object or tree holds
//!
//! ```text
//! columns.rs    column names  -> ColumnRoles (tables, CSV, arrays of objects)
//! aliases.rs    object keys   -> RoleRow     (known JSON shapes)
//! recursive.rs  any JSON tree -> RecordBatch (last-resort key-shape walk)
//! ```

pub mod aliases;
pub mod columns;
pub mod recursive;

pub use aliases::{role_row, KeyView};
pub use columns::{classify_columns, ColumnRole, ColumnRoles};
pub use recursive::{classify_tree, TreeOutcome, RECURSIVE_EXTRACTOR};
