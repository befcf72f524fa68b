#![allow(dead_code)]

use ipms_sync::{LocalStore, Record, SessionStore, SyncConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::MockServer;

pub const TOKEN: &str = "tok-123";

/// Routes engine logs to the test harness. Set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn record(value: Value) -> Record {
    Record::try_from(value).unwrap()
}

pub fn copyright(name: &str) -> Record {
    record(json!({"name": name, "registration_no": "2024SR0001", "develop_date": "2024-01-01"}))
}

pub fn paper(title: &str) -> Record {
    record(json!({"title": title, "journal": "Nature", "authors": "Li, Wang"}))
}

pub fn patent(title: &str) -> Record {
    record(json!({"title": title, "application_no": "CN2024001", "inventors": "Zhao"}))
}

pub fn papers_json(title: &str) -> String {
    serde_json::to_string(&vec![paper(title)]).unwrap()
}

pub fn mock_config(server: &MockServer) -> SyncConfig {
    SyncConfig {
        quiet_period_ms: 50,
        request_timeout_ms: 5_000,
        ..SyncConfig::with_base_url(server.uri())
    }
}

/// A store plus a session store that is already signed in.
pub fn signed_in() -> (Arc<LocalStore>, Arc<SessionStore>) {
    let store = Arc::new(LocalStore::new());
    let session = Arc::new(SessionStore::new(Arc::clone(&store)));
    session.set_session(TOKEN, "admin");
    (store, session)
}

pub fn signed_out() -> (Arc<LocalStore>, Arc<SessionStore>) {
    let store = Arc::new(LocalStore::new());
    let session = Arc::new(SessionStore::new(Arc::clone(&store)));
    (store, session)
}
