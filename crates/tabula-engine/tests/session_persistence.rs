use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tabula_engine::{Session, SessionConfig, Warning};
use tabula_model::{
    ChartBucket, ColumnSpec, FieldValue, PageSpec, Record, Schema, SortSpec, ViewSettings,
};
use tabula_storage::store::Result as StoreResult;
use tabula_storage::{KvBackend, MemoryBackend, PersistenceStore, StorageError, StoreConfig};

fn carriers() -> Vec<Record> {
    vec![
        Record::from_fields([
            ("legal_name", FieldValue::text("A")),
            ("out_of_service_date", FieldValue::text("2023-01-10")),
        ]),
        Record::from_fields([
            ("legal_name", FieldValue::text("B")),
            ("out_of_service_date", FieldValue::text("2023-01-20")),
        ]),
        Record::from_fields([
            ("legal_name", FieldValue::text("C")),
            ("out_of_service_date", FieldValue::Null),
        ]),
    ]
}

fn schema() -> Schema {
    Schema::new([
        ColumnSpec::text("legal_name", "Legal Name"),
        ColumnSpec::date("out_of_service_date", "Out of Service"),
    ])
    .expect("schema")
}

#[test]
fn edits_and_settings_survive_a_restart() {
    let backend = MemoryBackend::new();
    let store = PersistenceStore::new(backend.clone(), StoreConfig::default());

    let mut session = Session::open(carriers(), schema(), store, SessionConfig::default());
    session.on_cell_commit(1, "legal_name", "Z").expect("commit");
    assert_eq!(session.on_cell_blur(), None);
    session.on_sort_toggle("legal_name");
    session.on_sort_toggle("legal_name");
    assert_eq!(session.on_page_size_change(25), Ok(None));

    let store = PersistenceStore::new(backend, StoreConfig::default());
    let reopened = Session::open(carriers(), schema(), store, SessionConfig::default());

    assert_eq!(reopened.records()[1].value("legal_name"), &FieldValue::text("Z"));
    assert_eq!(
        reopened.records()[1].value("out_of_service_date"),
        &FieldValue::text("2023-01-20")
    );
    assert_eq!(reopened.base(), carriers().as_slice());
    assert_eq!(
        reopened.settings().table.sort,
        Some(SortSpec::desc("legal_name"))
    );
    assert_eq!(reopened.settings().table.page, PageSpec::new(0, 25));

    let names: Vec<String> = reopened
        .current_view()
        .rows
        .iter()
        .map(|row| row.record.value("legal_name").display().into_owned())
        .collect();
    assert_eq!(names, vec!["Z", "C", "A"]);
    assert_eq!(reopened.chart(), vec![ChartBucket::new("Jan 2023", 2)]);
}

#[test]
fn unflushed_edits_are_not_persisted() {
    let backend = MemoryBackend::new();
    let store = PersistenceStore::new(backend.clone(), StoreConfig::default());
    let mut session = Session::open(carriers(), schema(), store, SessionConfig::default());
    session.on_cell_commit(0, "legal_name", "never saved").expect("commit");

    let store = PersistenceStore::new(backend, StoreConfig::default());
    let reopened = Session::open(carriers(), schema(), store, SessionConfig::default());
    assert_eq!(reopened.records(), carriers().as_slice());
}

#[derive(Clone, Default)]
struct FlakyBackend {
    inner: MemoryBackend,
    failing: Arc<AtomicBool>,
}

impl KvBackend for FlakyBackend {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::backend("quota exceeded"));
        }
        self.inner.put(key, value)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::backend("storage unavailable"));
        }
        self.inner.delete(key)
    }
}

#[test]
fn failed_flush_warns_and_retries_on_next_blur() {
    let backend = FlakyBackend::default();
    backend.failing.store(true, Ordering::SeqCst);
    let store = PersistenceStore::new(backend.clone(), StoreConfig::default());
    let mut session = Session::open(carriers(), schema(), store, SessionConfig::default());

    session.on_cell_commit(1, "legal_name", "Z").expect("commit");
    let warning = session.on_cell_blur().expect("warning");
    assert!(matches!(
        &warning,
        Warning::PersistFailed { key, .. } if key == "tableData"
    ));
    // The in-memory edit stays authoritative.
    assert_eq!(session.records()[1].value("legal_name"), &FieldValue::text("Z"));
    assert!(session.overlay().is_dirty());
    assert!(session.is_flush_scheduled());

    // No new commit: the next blur alone retries the pending write.
    backend.failing.store(false, Ordering::SeqCst);
    assert_eq!(session.on_cell_blur(), None);
    assert!(!session.overlay().is_dirty());
    assert!(!session.is_flush_scheduled());

    let reopened = Session::open(
        carriers(),
        schema(),
        PersistenceStore::new(backend, StoreConfig::default()),
        SessionConfig::default(),
    );
    assert_eq!(reopened.records()[1].value("legal_name"), &FieldValue::text("Z"));
    assert_eq!(reopened.records()[2], carriers()[2]);
}

#[test]
fn settings_write_failures_surface_as_warnings() {
    let backend = FlakyBackend::default();
    backend.failing.store(true, Ordering::SeqCst);
    let store = PersistenceStore::new(backend, StoreConfig::default());
    let mut session = Session::open(carriers(), schema(), store, SessionConfig::default());

    let warning = session.on_filter_change("legal_name", "a");
    assert!(matches!(
        warning,
        Some(Warning::PersistFailed { ref key, .. }) if key == "viewSettings"
    ));
    assert_eq!(session.current_view().total_count, 1);
}

#[test]
fn reset_applies_defaults_even_when_clearing_fails() {
    let backend = FlakyBackend::default();
    let store = PersistenceStore::new(backend.clone(), StoreConfig::default());
    let mut session = Session::open(carriers(), schema(), store, SessionConfig::default());
    assert_eq!(session.on_sort_toggle("legal_name"), None);

    backend.failing.store(true, Ordering::SeqCst);
    let warning = session.reset_settings();
    assert!(matches!(
        warning,
        Some(Warning::PersistFailed { ref key, .. }) if key == "viewSettings"
    ));
    assert_eq!(session.settings(), &ViewSettings::default());
}

#[test]
fn custom_keys_are_honoured() {
    let backend = MemoryBackend::new();
    let config = SessionConfig {
        overlay_key: "carrierEdits".into(),
        settings_key: "carrierView".into(),
        ..SessionConfig::default()
    };
    let store = PersistenceStore::new(backend.clone(), StoreConfig::default());
    let mut session = Session::open(carriers(), schema(), store.clone(), config);
    session.on_cell_commit(0, "legal_name", "Q").expect("commit");
    session.on_cell_blur();
    session.on_page_change(0);

    assert!(store.raw("carrierEdits").expect("raw").is_some());
    assert!(store.raw("carrierView").expect("raw").is_some());
    assert!(store.raw("tableData").expect("raw").is_none());
    assert_eq!(backend.len(), 2);
}
