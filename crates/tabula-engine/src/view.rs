//! Filter → stable sort → paginate.
//!
//! [`view`] is a pure function of its inputs: no caches, no hidden state. Rows are addressed by
//! their index in the (overlay-applied) record sequence so edits made on a visible row can be
//! routed back to the right base record.

use serde::Serialize;
use std::cmp::Ordering;
use tabula_model::schema::text_contains;
use tabula_model::{
    FilterSpec, PageSpec, Record, ResolvedColumn, Schema, SortDirection, SortKey, SortSpec,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRow {
    /// Position of the record in the base sequence.
    pub index: usize,
    pub record: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSlice {
    pub rows: Vec<ViewRow>,
    /// Number of rows passing the filter, before pagination.
    pub total_count: usize,
}

/// One page of an arbitrary row sequence, with the counts a pagination control needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub page: PageSpec,
    pub page_count: usize,
}

impl<T: Clone> Page<T> {
    pub fn of(items: &[T], page: PageSpec) -> Self {
        Self {
            items: paginate(items, page).to_vec(),
            total_count: items.len(),
            page,
            page_count: page.page_count(items.len()),
        }
    }
}

pub fn view(
    records: &[Record],
    schema: &Schema,
    filter: &FilterSpec,
    sort: Option<&SortSpec>,
    page: PageSpec,
) -> ViewSlice {
    let mut indices = filter_indices(records, schema, filter);
    if let Some(sort) = sort {
        sort_indices(records, schema, sort, &mut indices);
    }

    let total_count = indices.len();
    let rows = paginate(&indices, page)
        .iter()
        .map(|&index| ViewRow {
            index,
            record: records[index].clone(),
        })
        .collect();

    ViewSlice { rows, total_count }
}

/// Indices of records passing every active predicate, in original order.
pub fn filter_indices(records: &[Record], schema: &Schema, filter: &FilterSpec) -> Vec<usize> {
    let predicates: Vec<(ResolvedColumn, &str)> = filter
        .active_columns()
        .map(|(id, predicate)| (schema.column_or_text(id), predicate))
        .collect();
    let global = filter.global();

    records
        .iter()
        .enumerate()
        .filter(|(_, record)| {
            predicates
                .iter()
                .all(|(column, predicate)| column.matches(record.value(column.id()), predicate))
                && global.map_or(true, |needle| matches_global(record, schema, needle))
        })
        .map(|(index, _)| index)
        .collect()
}

/// Free-text search: any shown column contains the needle. Without a schema every field counts.
fn matches_global(record: &Record, schema: &Schema, needle: &str) -> bool {
    if schema.columns().is_empty() {
        return record.iter().any(|(_, value)| text_contains(value, needle));
    }
    schema
        .columns()
        .iter()
        .any(|column| text_contains(record.value(column.id()), needle))
}

/// Stable sort of `indices` by the sort column. Absent values sort last in both directions.
pub fn sort_indices(records: &[Record], schema: &Schema, sort: &SortSpec, indices: &mut Vec<usize>) {
    let column = schema.column_or_text(&sort.column);
    let mut keyed: Vec<(Option<SortKey>, usize)> = indices
        .iter()
        .map(|&index| (column.sort_key(records[index].value(column.id())), index))
        .collect();

    // `sort_by` is stable, so equal keys keep their filtered order.
    keyed.sort_by(|(a, _), (b, _)| compare_keys(a.as_ref(), b.as_ref(), sort.direction));
    *indices = keyed.into_iter().map(|(_, index)| index).collect();
}

fn compare_keys(a: Option<&SortKey>, b: Option<&SortKey>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match direction {
            SortDirection::Asc => a.cmp(b),
            SortDirection::Desc => b.cmp(a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// The `page` window of `items`; empty when the window starts past the end.
pub fn paginate<T>(items: &[T], page: PageSpec) -> &[T] {
    let start = page.offset();
    if page.page_size == 0 || start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page.page_size).min(items.len());
    &items[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabula_model::{ColumnSpec, FieldValue};

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

    fn names(slice: &ViewSlice) -> Vec<String> {
        slice
            .rows
            .iter()
            .map(|row| row.record.value("legal_name").display().into_owned())
            .collect()
    }

    #[test]
    fn substring_filter_matches_exactly_the_records_containing_it() {
        let records = carriers();
        let filter = FilterSpec::new().with_column("legal_name", "a");
        let slice = view(&records, &schema(), &filter, None, PageSpec::default());
        assert_eq!(names(&slice), vec!["A"]);
        assert_eq!(slice.total_count, 1);
        assert_eq!(slice.rows[0].index, 0);
    }

    #[test]
    fn null_fields_fail_non_empty_filters() {
        let records = carriers();
        let filter = FilterSpec::new().with_column("out_of_service_date", "2023");
        let slice = view(&records, &schema(), &filter, None, PageSpec::default());
        assert_eq!(names(&slice), vec!["A", "B"]);
    }

    #[test]
    fn date_sort_is_chronological_with_absent_last() {
        let records = carriers();
        let desc = SortSpec::desc("out_of_service_date");
        let slice = view(&records, &schema(), &FilterSpec::new(), Some(&desc), PageSpec::default());
        assert_eq!(names(&slice), vec!["B", "A", "C"]);

        let asc = SortSpec::asc("out_of_service_date");
        let slice = view(&records, &schema(), &FilterSpec::new(), Some(&asc), PageSpec::default());
        assert_eq!(names(&slice), vec!["A", "B", "C"]);
    }

    #[test]
    fn global_filter_searches_every_column() {
        let records = carriers();
        let mut filter = FilterSpec::new();
        filter.set_global("01-20");
        let slice = view(&records, &schema(), &filter, None, PageSpec::default());
        assert_eq!(names(&slice), vec!["B"]);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let records = carriers();
        let slice = view(&records, &schema(), &FilterSpec::new(), None, PageSpec::new(5, 10));
        assert!(slice.rows.is_empty());
        assert_eq!(slice.total_count, 3);
    }

    #[test]
    fn last_page_is_partial() {
        let items: Vec<u32> = (0..23).collect();
        assert_eq!(paginate(&items, PageSpec::new(2, 10)), &[20, 21, 22]);
        let page = Page::of(&items, PageSpec::new(1, 10));
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.page_count, 3);
        assert_eq!(page.total_count, 23);
    }
}
