//! Delimited text (CSV / TSV) extraction
//!
//! The header row is classified like a database table; malformed rows are
//! skipped and counted rather than failing the file.

use csv::ReaderBuilder;
use serde_json::Value;
use tracing::{debug, trace};

use super::records::batch_from_table;
use super::ArtifactOutcome;
use crate::classify::classify_columns;
use crate::config::EngineConfig;
use crate::error::ArtifactError;
use crate::types::Provenance;

/// Extractor label for delimited-text records
pub const TABULAR_EXTRACTOR: &str = "tabular";

/// Delimiter for a delimited-text extension, if it is one
pub fn delimiter_for_extension(extension: &str) -> Option<u8> {
    match extension {
        "csv" => Some(b','),
        "tsv" | "tab" => Some(b'\t'),
        _ => None,
    }
}

pub fn extract_delimited(
    bytes: &[u8],
    delimiter: u8,
    prov: &Provenance,
    config: &EngineConfig,
) -> Result<ArtifactOutcome, ArtifactError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ArtifactError::Unrecognized("no header row".to_string()));
    }

    let mut rows: Vec<Vec<Value>> = Vec::new();
    let mut malformed = 0usize;
    for (index, record) in reader.records().enumerate() {
        if config.row_limit_reached(rows.len()) {
            break;
        }
        match record {
            Ok(record) => rows.push(
                record
                    .iter()
                    .map(|cell| {
                        if cell.is_empty() {
                            Value::Null
                        } else {
                            Value::String(cell.to_string())
                        }
                    })
                    .collect(),
            ),
            Err(e) => {
                trace!("{}: row {} malformed: {}", prov.artifact, index + 1, e);
                malformed += 1;
            }
        }
    }

    let roles = classify_columns(&headers);
    let mut outcome = ArtifactOutcome::from_batch(batch_from_table(&roles, &rows, prov, config));
    if malformed > 0 {
        debug!("{}: skipped {} malformed rows", prov.artifact, malformed);
        outcome.skip(&prov.artifact, Some(prov.source.clone()), format!("{} malformed rows", malformed));
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prov() -> Provenance {
        Provenance::new("exports/calls.csv", "exports/calls.csv", TABULAR_EXTRACTOR)
    }

    #[test]
    fn test_call_log_csv() {
        let csv = "Number,Duration,Date,Call Type\n\
                   +15550001111,00:02:05,2023-11-14 22:13:20,Outgoing\n\
                   +15550002222,30,2023-11-14 22:20:00,Incoming\n";
        let outcome = extract_delimited(csv.as_bytes(), b',', &prov(), &EngineConfig::default()).unwrap();
        let calls = &outcome.batch.call_records;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].duration_seconds, 125);
        assert_eq!(calls[0].call_type, "Outgoing");
        assert!(calls[0].timestamp.is_some());
        assert_eq!(calls[1].caller.as_deref(), Some("+15550002222"));
    }

    #[test]
    fn test_tsv_with_ragged_rows() {
        let tsv = "name\tphone\nAlice\t+15550003333\nBob\n";
        let outcome = extract_delimited(tsv.as_bytes(), b'\t', &prov(), &EngineConfig::default()).unwrap();
        let contacts = &outcome.batch.contacts;
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].phone_numbers, vec!["+15550003333"]);
        assert!(contacts[1].phone_numbers.is_empty());
    }

    #[test]
    fn test_malformed_rows_logged_as_skip() {
        let mut csv = b"name,phone\nAlice,+15550001111\n".to_vec();
        csv.extend_from_slice(b"\xff\xfe,+15550002222\nBob,+15550003333\n");
        let outcome = extract_delimited(&csv, b',', &prov(), &EngineConfig::default()).unwrap();
        assert_eq!(outcome.batch.contacts.len(), 2);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].artifact, "exports/calls.csv");
        assert_eq!(outcome.skipped[0].reason, "1 malformed rows");
    }

    #[test]
    fn test_delimiters() {
        assert_eq!(delimiter_for_extension("csv"), Some(b','));
        assert_eq!(delimiter_for_extension("tsv"), Some(b'\t'));
        assert_eq!(delimiter_for_extension("json"), None);
    }
}
