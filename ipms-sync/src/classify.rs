//! Structural type classification.
//!
//! The host stores lists under keys we cannot predict, so a list's kind is
//! inferred from the fields of its first record. This is a heuristic: the
//! first record is trusted to represent the whole list.
//!
//! Precedence, first match wins:
//!
//! | Order | Kind         | Signature                              |
//! |-------|--------------|----------------------------------------|
//! | 1     | `Copyrights` | `registration_no` **or** `develop_date` |
//! | 2     | `Papers`     | `journal` **and** `authors`             |
//! | 3     | `Patents`    | `application_no` **and** `inventors`    |
//!
//! A record carrying both a registration number and a journal therefore
//! classifies as a copyright.

use ipms_types::{EntityKind, Record};

/// Infers the entity kind of a record list. Empty lists are `Unknown`.
pub fn classify(records: &[Record]) -> EntityKind {
    records.first().map_or(EntityKind::Unknown, classify_record)
}

/// Infers the entity kind of a single record.
pub fn classify_record(record: &Record) -> EntityKind {
    if record.has("registration_no") || record.has("develop_date") {
        EntityKind::Copyrights
    } else if record.has("journal") && record.has("authors") {
        EntityKind::Papers
    } else if record.has("application_no") && record.has("inventors") {
        EntityKind::Patents
    } else {
        EntityKind::Unknown
    }
}
