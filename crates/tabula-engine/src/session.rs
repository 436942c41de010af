//! Presentation-facing state: base data, edits, view settings and their persistence.
//!
//! A [`Session`] is driven by UI callbacks (`on_*`). Every callback leaves the in-memory state
//! authoritative; persistence failures come back as [`Warning`]s for the caller to surface and
//! are never turned into errors. Edits are flushed lazily: a commit only schedules a flush,
//! and the next [`Session::on_cell_blur`] writes the latest overlay once.

use crate::aggregate::{aggregate, BucketOrder};
use crate::error::EditError;
use crate::overlay::{apply_overlay, EditOverlay, FlushOutcome};
use crate::settings::{merge, SettingsController};
use crate::view::{filter_indices, view, Page, ViewSlice};
use tabula_model::{
    ChartBucket, FieldValue, FilterSpec, Granularity, PageSpec, Record, Schema, SettingsPatch,
    SortSpec, TableSettingsPatch, ViewSettings, DEFAULT_PAGE_SIZE, PAGE_SIZE_OPTIONS,
};
use tabula_storage::{PersistenceStore, StorageError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Store key holding the edit overlay.
    pub overlay_key: String,
    /// Store key holding [`ViewSettings`].
    pub settings_key: String,
    /// Field bucketed by the chart.
    pub date_field: String,
    pub page_size_options: Vec<usize>,
    pub default_granularity: Granularity,
    pub bucket_order: BucketOrder,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            overlay_key: "tableData".to_string(),
            settings_key: "viewSettings".to_string(),
            date_field: "out_of_service_date".to_string(),
            page_size_options: PAGE_SIZE_OPTIONS.to_vec(),
            default_granularity: Granularity::default(),
            bucket_order: BucketOrder::default(),
        }
    }
}

/// A non-fatal problem the presentation layer may want to show.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Warning {
    #[error("changes could not be saved to `{key}`: {message}")]
    PersistFailed { key: String, message: String },
}

impl Warning {
    fn persist_failed(key: &str, err: &StorageError) -> Self {
        log::warn!("persisting `{key}` failed: {err}");
        Warning::PersistFailed {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    schema: Schema,
    base: Vec<Record>,
    /// `base` with the overlay applied; the input to every view and aggregate.
    records: Vec<Record>,
    overlay: EditOverlay,
    settings: ViewSettings,
    settings_store: SettingsController,
    store: PersistenceStore,
    granularity: Granularity,
    flush_scheduled: bool,
}

impl Session {
    /// Start a session over `base`, restoring any overlay and settings found in `store`.
    pub fn open(
        base: Vec<Record>,
        schema: Schema,
        store: PersistenceStore,
        config: SessionConfig,
    ) -> Self {
        let overlay = EditOverlay::load(&store, &config.overlay_key);
        let records = apply_overlay(&base, &overlay);
        let settings_store = SettingsController::new(store.clone(), config.settings_key.clone());
        let mut settings = settings_store.restore();

        if !config.page_size_options.contains(&settings.table.page.page_size) {
            log::warn!(
                "ignoring restored page size {}; not one of {:?}",
                settings.table.page.page_size,
                config.page_size_options
            );
            settings.table.page.page_size = config
                .page_size_options
                .first()
                .copied()
                .unwrap_or(DEFAULT_PAGE_SIZE);
        }

        let mut session = Self {
            granularity: config.default_granularity,
            config,
            schema,
            base,
            records,
            overlay,
            settings,
            settings_store,
            store,
            flush_scheduled: false,
        };
        session.settings.table.page = session.clamped_page(session.settings.table.page);
        session
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn base(&self) -> &[Record] {
        &self.base
    }

    /// Current records, edits included.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn overlay(&self) -> &EditOverlay {
        &self.overlay
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn is_flush_scheduled(&self) -> bool {
        self.flush_scheduled
    }

    /// Record an edit of one cell and schedule a flush.
    ///
    /// The value is normalized by the column's kind (dates are stored as ISO-8601 text).
    pub fn on_cell_commit(
        &mut self,
        index: usize,
        column_id: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), EditError> {
        self.check_index(index)?;
        let column = self
            .schema
            .column(column_id)
            .ok_or_else(|| EditError::UnknownColumn(column_id.to_string()))?;
        let value = column
            .normalize(value.into())
            .map_err(|source| EditError::InvalidValue {
                column: column_id.to_string(),
                source,
            })?;

        self.overlay = self.overlay.set_cell(index, column_id, value);
        self.refresh_record(index);
        self.flush_scheduled = true;
        Ok(())
    }

    /// Drop the edit of one cell, restoring the base value.
    pub fn on_cell_revert(&mut self, index: usize, column_id: &str) -> Result<(), EditError> {
        self.check_index(index)?;
        self.overlay = self.overlay.revert_cell(index, column_id);
        self.refresh_record(index);
        self.flush_scheduled = self.overlay.is_dirty();
        Ok(())
    }

    /// The edited cell lost focus: run the scheduled flush, if any.
    ///
    /// A failed flush stays scheduled, so the next blur retries it.
    pub fn on_cell_blur(&mut self) -> Option<Warning> {
        if !self.flush_scheduled {
            return None;
        }
        self.flush_now().err()
    }

    /// Persist pending edits immediately. Edits that could not be written stay scheduled.
    pub fn flush_now(&mut self) -> Result<FlushOutcome, Warning> {
        let key = self.config.overlay_key.as_str();
        let result = self
            .overlay
            .flush(&self.store, key)
            .map_err(|err| Warning::persist_failed(key, &err));
        self.flush_scheduled = self.overlay.is_dirty();
        result
    }

    pub fn on_filter_change(&mut self, column_id: &str, value: &str) -> Option<Warning> {
        let mut filter = self.settings.table.filter.clone();
        filter.set_column(column_id, value);
        self.update_settings(TableSettingsPatch::filter(filter))
    }

    pub fn on_global_filter_change(&mut self, value: &str) -> Option<Warning> {
        let mut filter = self.settings.table.filter.clone();
        filter.set_global(value);
        self.update_settings(TableSettingsPatch::filter(filter))
    }

    /// Header click: ascending, then descending, then unsorted.
    pub fn on_sort_toggle(&mut self, column_id: &str) -> Option<Warning> {
        let sort = SortSpec::toggle(self.settings.table.sort.as_ref(), column_id);
        self.update_settings(TableSettingsPatch::sort(sort))
    }

    pub fn on_page_change(&mut self, page_index: usize) -> Option<Warning> {
        self.update_settings(TableSettingsPatch::page_index(page_index))
    }

    /// Change the rows per page.
    ///
    /// Sizes outside [`SessionConfig::page_size_options`] are rejected with
    /// [`EditError::UnsupportedPageSize`] and leave the settings untouched. Persistence
    /// problems come back as a [`Warning`], as for the other settings callbacks.
    pub fn on_page_size_change(&mut self, page_size: usize) -> Result<Option<Warning>, EditError> {
        if !self.config.page_size_options.contains(&page_size) {
            return Err(EditError::UnsupportedPageSize(page_size));
        }
        Ok(self.update_settings(TableSettingsPatch::page_size(page_size)))
    }

    pub fn on_period_change(&mut self, granularity: Granularity) {
        self.granularity = granularity;
    }

    /// Forget persisted view settings and return to the defaults.
    ///
    /// The in-memory settings are reset even when clearing the stored copy fails.
    pub fn reset_settings(&mut self) -> Option<Warning> {
        self.settings = ViewSettings::default();
        self.settings_store
            .reset()
            .err()
            .map(|err| Warning::persist_failed(self.settings_store.key(), &err))
    }

    /// The visible page under the current filter, sort and pagination.
    pub fn current_view(&self) -> ViewSlice {
        let table = &self.settings.table;
        view(
            &self.records,
            &self.schema,
            &table.filter,
            table.sort.as_ref(),
            table.page,
        )
    }

    /// Chart buckets at the current granularity. Independent of filter and pagination.
    pub fn chart(&self) -> Vec<ChartBucket> {
        aggregate(
            &self.records,
            &self.config.date_field,
            self.granularity,
            self.config.bucket_order,
        )
    }

    /// One page of the chart buckets, for the tabular pivot view.
    pub fn bucket_page(&self, page: PageSpec) -> Page<ChartBucket> {
        let buckets = self.chart();
        Page::of(&buckets, page.clamped(buckets.len()))
    }

    /// Choices for a select column's cell editor.
    pub fn select_options(&self, column_id: &str) -> Vec<FieldValue> {
        self.schema.select_options(column_id, &self.records)
    }

    /// `(label, display value)` pairs for a record's detail dialog.
    pub fn row_details(&self, index: usize) -> Option<Vec<(String, String)>> {
        self.records
            .get(index)
            .map(|record| self.schema.row_details(record))
    }

    fn check_index(&self, index: usize) -> Result<(), EditError> {
        if index >= self.base.len() {
            return Err(EditError::RecordOutOfRange {
                index,
                len: self.base.len(),
            });
        }
        Ok(())
    }

    fn refresh_record(&mut self, index: usize) {
        let record = match self.overlay.get(index) {
            Some(patch) => self.base[index].merged(patch),
            None => self.base[index].clone(),
        };
        self.records[index] = record;
    }

    fn filter(&self) -> &FilterSpec {
        &self.settings.table.filter
    }

    fn clamped_page(&self, page: PageSpec) -> PageSpec {
        let total = filter_indices(&self.records, &self.schema, self.filter()).len();
        page.clamped(total)
    }

    fn update_settings(&mut self, patch: TableSettingsPatch) -> Option<Warning> {
        self.settings = merge(&self.settings, &SettingsPatch::table(patch));
        self.settings.table.page = self.clamped_page(self.settings.table.page);

        match self.settings_store.persist(&self.settings) {
            Ok(_) => None,
            Err(err) => Some(Warning::persist_failed(self.settings_store.key(), &err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabula_model::ColumnSpec;

    fn schema() -> Schema {
        Schema::new([
            ColumnSpec::text("legal_name", "Legal Name"),
            ColumnSpec::select("status", "Status"),
            ColumnSpec::date("out_of_service_date", "Out of Service"),
        ])
        .expect("schema")
    }

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                Record::from_fields([
                    ("legal_name", FieldValue::text(format!("Carrier {i}"))),
                    ("status", FieldValue::text(if i % 2 == 0 { "active" } else { "idle" })),
                    (
                        "out_of_service_date",
                        FieldValue::text(format!("2023-01-{:02}", i % 28 + 1)),
                    ),
                ])
            })
            .collect()
    }

    fn session(n: usize) -> Session {
        Session::open(
            records(n),
            schema(),
            PersistenceStore::in_memory(),
            SessionConfig::default(),
        )
    }

    #[test]
    fn commit_schedules_one_flush_per_blur() {
        let mut session = session(3);
        session.on_cell_commit(1, "legal_name", "Z").expect("commit");
        session.on_cell_commit(2, "legal_name", "Y").expect("commit");
        assert!(session.is_flush_scheduled());
        assert!(session.overlay().is_dirty());

        assert_eq!(session.on_cell_blur(), None);
        assert!(!session.is_flush_scheduled());
        assert!(!session.overlay().is_dirty());
        assert_eq!(session.on_cell_blur(), None);
    }

    #[test]
    fn commit_rejects_bad_input_without_changing_state() {
        let mut session = session(2);
        assert_eq!(
            session.on_cell_commit(5, "legal_name", "Z"),
            Err(EditError::RecordOutOfRange { index: 5, len: 2 })
        );
        assert_eq!(
            session.on_cell_commit(0, "nope", "Z"),
            Err(EditError::UnknownColumn("nope".into()))
        );
        assert!(matches!(
            session.on_cell_commit(0, "out_of_service_date", "someday"),
            Err(EditError::InvalidValue { .. })
        ));
        assert!(session.overlay().is_empty());
        assert!(!session.is_flush_scheduled());
    }

    #[test]
    fn date_edits_are_normalized() {
        let mut session = session(1);
        session
            .on_cell_commit(0, "out_of_service_date", "2024-02-03")
            .expect("commit");
        assert_eq!(
            session.records()[0].value("out_of_service_date"),
            &FieldValue::text("2024-02-03T00:00:00.000Z")
        );
        assert_eq!(session.chart()[0], ChartBucket::new("Feb 2024", 1));
    }

    #[test]
    fn revert_restores_the_base_value() {
        let mut session = session(1);
        session.on_cell_commit(0, "legal_name", "Z").expect("commit");
        session.on_cell_revert(0, "legal_name").expect("revert");
        assert_eq!(session.records(), session.base());
    }

    #[test]
    fn sort_toggle_cycles() {
        let mut session = session(3);
        session.on_sort_toggle("legal_name");
        assert_eq!(session.settings().table.sort, Some(SortSpec::asc("legal_name")));
        session.on_sort_toggle("legal_name");
        assert_eq!(session.settings().table.sort, Some(SortSpec::desc("legal_name")));
        session.on_sort_toggle("legal_name");
        assert_eq!(session.settings().table.sort, None);
    }

    #[test]
    fn filter_change_clamps_out_of_range_page() {
        let mut session = session(30);
        session.on_page_change(2);
        assert_eq!(session.settings().table.page, PageSpec::new(2, 10));
        assert_eq!(session.current_view().rows.len(), 10);

        session.on_filter_change("legal_name", "Carrier 1");
        assert_eq!(session.settings().table.page, PageSpec::new(0, 10));
        assert_eq!(session.current_view().total_count, 11);
    }

    #[test]
    fn page_size_must_be_an_offered_option() {
        let mut session = session(30);
        assert_eq!(
            session.on_page_size_change(7),
            Err(EditError::UnsupportedPageSize(7))
        );
        assert_eq!(session.settings().table.page, PageSpec::new(0, 10));
        session.on_page_change(1);
        assert_eq!(session.on_page_size_change(25), Ok(None));
        assert_eq!(session.settings().table.page, PageSpec::new(1, 25));
        assert_eq!(session.current_view().rows.len(), 5);
    }

    #[test]
    fn select_options_follow_edits() {
        let mut session = session(2);
        session.on_cell_commit(1, "status", "retired").expect("commit");
        assert_eq!(
            session.select_options("status"),
            vec![FieldValue::text("active"), FieldValue::text("retired")]
        );
    }

    #[test]
    fn bucket_page_pages_the_chart() {
        let mut session = session(3);
        session.on_period_change(Granularity::Year);
        let page = session.bucket_page(PageSpec::new(4, 10));
        assert_eq!(page.page, PageSpec::new(0, 10));
        assert_eq!(page.items, vec![ChartBucket::new("2023", 3)]);
    }

    #[test]
    fn reset_settings_returns_to_defaults() {
        let mut session = session(30);
        session.on_page_change(2);
        session.on_global_filter_change("carrier");
        assert_eq!(session.reset_settings(), None);
        assert_eq!(session.settings(), &ViewSettings::default());
    }
}
