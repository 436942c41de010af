use tabula_model::{SettingsPatch, ViewSettings};
use tabula_storage::{PersistenceStore, SaveOutcome, StorageError};

/// Shallow-merge `patch` into `current`.
///
/// Fields the patch leaves out keep their current value, and top-level branches other than
/// `table` are carried over unchanged.
pub fn merge(current: &ViewSettings, patch: &SettingsPatch) -> ViewSettings {
    let mut next = current.clone();
    let Some(table) = &patch.table else {
        return next;
    };

    if let Some(filter) = &table.filter {
        next.table.filter = filter.clone();
    }
    if let Some(sort) = &table.sort {
        next.table.sort = sort.clone();
    }
    if let Some(page_index) = table.page_index {
        next.table.page.page_index = page_index;
    }
    if let Some(page_size) = table.page_size {
        next.table.page.page_size = page_size;
    }
    next
}

/// Reads and writes [`ViewSettings`] under one store key.
#[derive(Debug, Clone)]
pub struct SettingsController {
    store: PersistenceStore,
    key: String,
}

impl SettingsController {
    pub fn new(store: PersistenceStore, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn persist(&self, settings: &ViewSettings) -> Result<SaveOutcome, StorageError> {
        self.store.save(&self.key, settings)
    }

    /// Persisted settings, or the defaults when nothing usable is stored.
    pub fn restore(&self) -> ViewSettings {
        self.store.load(&self.key).unwrap_or_default()
    }

    /// Forget the persisted settings and return the defaults.
    pub fn reset(&self) -> Result<ViewSettings, StorageError> {
        self.store.clear(&self.key)?;
        Ok(ViewSettings::default())
    }
}
