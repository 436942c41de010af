//! Date-bucketed record counts for the chart and its pivot table.

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tabula_model::{ChartBucket, Granularity, Record};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Order of the buckets returned by [`aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BucketOrder {
    /// Oldest period first.
    #[default]
    Chronological,
    /// Order in which each period is first met while scanning the records.
    FirstSeen,
}

/// `(year, month or week number)`; the second part is 0 for yearly buckets.
type PeriodKey = (i32, u32);

/// Count records per period of `date_field`.
///
/// Records whose field is absent, null or not a parseable date are left out, so the counts sum
/// to the number of records with a usable date.
///
/// Week buckets number weeks within a month as `ceil(day / 7)` but label them only with the
/// year, so "Week 1 2023" collects days 1-7 of every month of 2023.
pub fn aggregate(
    records: &[Record],
    date_field: &str,
    granularity: Granularity,
    order: BucketOrder,
) -> Vec<ChartBucket> {
    let mut buckets: Vec<(PeriodKey, ChartBucket)> = Vec::new();
    let mut positions: HashMap<PeriodKey, usize> = HashMap::new();
    let mut skipped = 0usize;

    for record in records {
        let Some(date) = record.value(date_field).as_date() else {
            skipped += 1;
            continue;
        };
        let key = period_key(date, granularity);
        match positions.get(&key) {
            Some(&pos) => buckets[pos].1.count += 1,
            None => {
                positions.insert(key, buckets.len());
                buckets.push((key, ChartBucket::new(period_label(date, granularity), 1)));
            }
        }
    }

    if skipped > 0 {
        log::debug!("{skipped} records without a usable `{date_field}` left out of the chart");
    }

    if order == BucketOrder::Chronological {
        buckets.sort_by_key(|(key, _)| *key);
    }
    buckets.into_iter().map(|(_, bucket)| bucket).collect()
}

fn period_key(date: NaiveDateTime, granularity: Granularity) -> PeriodKey {
    match granularity {
        Granularity::Week => (date.year(), week_of_month(date)),
        Granularity::Month => (date.year(), date.month()),
        Granularity::Year => (date.year(), 0),
    }
}

fn week_of_month(date: NaiveDateTime) -> u32 {
    date.day().div_ceil(7)
}

/// Human-readable period label, e.g. `"Jan 2023"`, `"Week 2 2023"` or `"2023"`.
pub fn period_label(date: NaiveDateTime, granularity: Granularity) -> String {
    match granularity {
        Granularity::Week => format!("Week {} {}", week_of_month(date), date.year()),
        Granularity::Month => {
            let month = MONTH_ABBREVIATIONS[date.month0() as usize];
            format!("{month} {}", date.year())
        }
        Granularity::Year => date.year().to_string(),
    }
}
