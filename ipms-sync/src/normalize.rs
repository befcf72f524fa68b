//! Record normalization applied on both pull and push.
//!
//! The host reads `name` for every kind while the server stores papers and
//! patents under `title`, so each is filled from the other when missing. The
//! host also calls string methods on a few display fields without null
//! checks; those are blanked rather than left null.

use ipms_types::{is_truthy, Record};
use serde_json::Value;

/// Fields the host assumes are always strings.
pub const DISPLAY_FIELDS: [&str; 3] = ["name", "title", "username"];

/// Normalizes a single record. Idempotent.
pub fn normalize_record(mut record: Record) -> Record {
    alias(&mut record, "title", "name");
    alias(&mut record, "name", "title");

    for field in DISPLAY_FIELDS {
        if record.get(field).is_none_or(Value::is_null) {
            record.insert(field, "");
        }
    }
    record
}

/// Normalizes every record of a list.
pub fn normalize_list(records: impl IntoIterator<Item = Record>) -> Vec<Record> {
    records.into_iter().map(normalize_record).collect()
}

/// Copies `from` into `to` when `to` is falsy and `from` is truthy.
fn alias(record: &mut Record, from: &str, to: &str) {
    if record.has(to) {
        return;
    }
    if let Some(value) = record.get(from).filter(|v| is_truthy(v)).cloned() {
        record.insert(to, value);
    }
}
