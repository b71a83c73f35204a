//! Descriptive statistics over enriched records.
//!
//! These are the aggregations behind the study's summary tables: submission
//! counts and mean citation boost grouped by weekday, hour, announcement day,
//! time bucket and listing rank, plus the deadline-split and first-minute
//! subsets.

use crate::records::{weekday_abbrev, EnrichedRecord};
use chrono::Weekday;
use std::collections::BTreeMap;

/// Count and mean citation boost for one group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStat {
    pub key: String,
    pub count: usize,
    pub mean_boost: f64,
}

/// Per-batch summary line (one per year)
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub year: i32,
    pub rows: usize,
    pub mean_citations: f64,
}

/// Summarize one batch.
pub fn summarize_batch(year: i32, records: &[EnrichedRecord]) -> BatchSummary {
    let mean_citations = if records.is_empty() {
        0.0
    } else {
        records.iter().map(|r| f64::from(r.citation_count)).sum::<f64>() / records.len() as f64
    };
    BatchSummary { year, rows: records.len(), mean_citations }
}

fn grouped<'a, K, F>(records: impl Iterator<Item = &'a EnrichedRecord>, key: F) -> BTreeMap<K, (usize, f64)>
where
    K: Ord,
    F: Fn(&EnrichedRecord) -> K,
{
    let mut groups: BTreeMap<K, (usize, f64)> = BTreeMap::new();
    for record in records {
        let entry = groups.entry(key(record)).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += record.citation_boost;
    }
    groups
}

fn stat(key: String, (count, boost_sum): (usize, f64)) -> GroupStat {
    GroupStat { key, count, mean_boost: boost_sum / count as f64 }
}

/// Counts and mean boost per submission weekday, ordered Mon..Sun.
pub fn by_weekday(records: &[EnrichedRecord]) -> Vec<GroupStat> {
    let groups = grouped(records.iter(), |r| r.weekday.num_days_from_monday());
    groups
        .into_iter()
        .map(|(day, agg)| {
            let weekday = weekday_from_monday_offset(day);
            stat(weekday_abbrev(weekday).to_string(), agg)
        })
        .collect()
}

/// Counts and mean boost per local submission hour, 0..24.
pub fn by_hour(records: &[EnrichedRecord]) -> Vec<GroupStat> {
    grouped(records.iter(), |r| r.hour)
        .into_iter()
        .map(|(hour, agg)| stat(hour.to_string(), agg))
        .collect()
}

/// Counts and mean boost per announcement day, ordered Sun, Mon..Thu like the
/// venue's announcement week.
pub fn by_announce_day(records: &[EnrichedRecord]) -> Vec<GroupStat> {
    let groups = grouped(records.iter(), |r| announce_order(r.announced_on));
    groups
        .into_iter()
        .map(|(order, agg)| {
            stat(weekday_abbrev(announce_weekday_from_order(order)).to_string(), agg)
        })
        .collect()
}

/// Counts and mean boost per 10-minute time bucket for weekday submissions
/// within an hour of the deadline.
pub fn by_time_bucket_around_deadline(
    records: &[EnrichedRecord],
    deadline_hour: u32,
) -> Vec<GroupStat> {
    let in_window = records.iter().filter(|r| {
        r.hour + 1 >= deadline_hour
            && r.hour < deadline_hour + 1
            && !matches!(r.weekday, Weekday::Sat | Weekday::Sun)
    });
    grouped(in_window, |r| (r.hour, r.minute / 10))
        .into_iter()
        .map(|((hour, bucket), agg)| stat(format!("{}:{:02}", hour, bucket * 10), agg))
        .collect()
}

/// Counts and mean boost per listing rank, up to `max_rank`.
pub fn by_rank(records: &[EnrichedRecord], max_rank: u32) -> Vec<GroupStat> {
    let ranked = records.iter().filter(|r| r.rank <= max_rank);
    grouped(ranked, |r| r.rank)
        .into_iter()
        .map(|(rank, agg)| stat(rank.to_string(), agg))
        .collect()
}

/// Weekday stats split into before/after-deadline halves.
pub fn by_weekday_split(records: &[EnrichedRecord]) -> (Vec<GroupStat>, Vec<GroupStat>) {
    let before: Vec<EnrichedRecord> =
        records.iter().filter(|r| !r.after_deadline).cloned().collect();
    let after: Vec<EnrichedRecord> =
        records.iter().filter(|r| r.after_deadline).cloned().collect();
    (by_weekday(&before), by_weekday(&after))
}

/// Weekday submissions in the first minute after the deadline opens.
pub fn first_minute(records: &[EnrichedRecord], deadline_hour: u32) -> Vec<&EnrichedRecord> {
    records
        .iter()
        .filter(|r| {
            r.hour == deadline_hour
                && r.minute == 0
                && !matches!(r.weekday, Weekday::Sat | Weekday::Sun)
        })
        .collect()
}

/// Papers that topped a listing without being submitted in the first minute.
pub fn top_rank_latecomers(records: &[EnrichedRecord], deadline_hour: u32) -> Vec<&EnrichedRecord> {
    records
        .iter()
        .filter(|r| {
            r.rank == 1
                && (r.hour != deadline_hour
                    || r.minute != 0
                    || matches!(r.weekday, Weekday::Sat | Weekday::Sun))
        })
        .collect()
}

/// Mean citation boost of a record subset.
pub fn mean_boost(records: &[&EnrichedRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    records.iter().map(|r| r.citation_boost).sum::<f64>() / records.len() as f64
}

/// Pearson correlation coefficient of two equal-length samples.
///
/// Used to check that the flat-mean boost and the curve-based boost agree;
/// returns 0 for degenerate input (length mismatch, short samples or zero
/// variance).
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.len() < 2 {
        return 0.0;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    covariance / (var_x * var_y).sqrt()
}

// Sunday opens the announcement week
fn announce_order(weekday: Weekday) -> u32 {
    match weekday {
        Weekday::Sun => 0,
        other => other.num_days_from_monday() + 1,
    }
}

fn announce_weekday_from_order(order: u32) -> Weekday {
    match order {
        0 => Weekday::Sun,
        other => weekday_from_monday_offset(other - 1),
    }
}

fn weekday_from_monday_offset(offset: u32) -> Weekday {
    match offset {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}
