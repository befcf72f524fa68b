//! Attachment conversion: inline `data:` payloads to server URLs.
//!
//! Conversion is best-effort and not atomic. A field whose payload cannot be
//! decoded or uploaded keeps its inline value while sibling fields may already
//! have been replaced; nothing is rolled back.

use crate::client::RemoteApi;
use futures::future::join_all;
use ipms_types::{DataUrl, EntityKind, Record};
use std::sync::Arc;
use tracing::{debug, warn};

/// Uploads inline file payloads and swaps in the returned references.
#[derive(Clone)]
pub struct AttachmentConverter {
    remote: Arc<dyn RemoteApi>,
}

impl AttachmentConverter {
    /// Creates a converter uploading through `remote`.
    pub fn new(remote: Arc<dyn RemoteApi>) -> Self {
        Self { remote }
    }

    /// Converts the file-bearing fields of one record, in declared order.
    pub async fn convert(&self, kind: EntityKind, mut record: Record) -> Record {
        for &field in kind.file_fields() {
            let payload = match record.get_str(field) {
                Some(value) if DataUrl::is_data_url(value) => match DataUrl::parse(value) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("[Upload] Skipping {}.{}: {}", kind, field, e);
                        continue;
                    }
                },
                _ => continue,
            };

            debug!("[Upload] Uploading file for {}...", field);
            match self.remote.upload_binary(payload).await {
                Some(url) => {
                    record.insert(field, url);
                }
                None => warn!("[Upload] {}.{} left inline", kind, field),
            }
        }
        record
    }

    /// Converts every record of a list concurrently, preserving order.
    pub async fn convert_all(&self, kind: EntityKind, records: Vec<Record>) -> Vec<Record> {
        join_all(records.into_iter().map(|r| self.convert(kind, r))).await
    }
}
