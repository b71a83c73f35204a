//! Feature enrichment pipeline.
//!
//! Joins the raw submissions and citation-count tables of one batch, drops
//! rows with unknown counts, and derives the timing features: venue-local
//! time components, deadline state, announcement day, 10-minute time bucket,
//! submission-round date, and per-round rank.
//!
//! The join is strictly positional. A length or identifier mismatch between
//! the two tables means the batch files were generated inconsistently and the
//! whole batch is rejected; silently realigning rows would corrupt every
//! derived feature downstream.

use crate::config::AnalysisConfig;
use crate::error::{Result, TimingError};
use crate::records::{CitationRecord, EnrichedRecord, SubmissionRecord};
use chrono::{Duration, NaiveDate, Timelike, Weekday};
use std::collections::HashMap;
use tracing::{debug, info};

/// Enrich one batch.
///
/// Rows with an unknown citation count are dropped (documented behavior, not
/// an error); a batch where every count is unknown yields an empty table.
/// The batch mean used for the boost is computed once over the surviving rows
/// and frozen.
pub fn enrich_batch(
    submissions: &[SubmissionRecord],
    citations: &[CitationRecord],
    config: &AnalysisConfig,
) -> Result<Vec<EnrichedRecord>> {
    if submissions.len() != citations.len() {
        return Err(TimingError::Integrity(format!(
            "table length mismatch: {} submissions vs {} citation rows",
            submissions.len(),
            citations.len()
        )));
    }
    for (row, (submission, citation)) in submissions.iter().zip(citations).enumerate() {
        if submission.id != citation.id {
            return Err(TimingError::Integrity(format!(
                "id mismatch at row {}: submission '{}' vs citation '{}'",
                row, submission.id, citation.id
            )));
        }
    }

    // Positional attach + drop of unknown counts
    let joined: Vec<(&SubmissionRecord, u32)> = submissions
        .iter()
        .zip(citations)
        .filter_map(|(submission, citation)| citation.citation_count.map(|count| (submission, count)))
        .collect();

    let dropped = submissions.len() - joined.len();
    if dropped > 0 {
        debug!(dropped, "rows without citation count excluded");
    }
    if joined.is_empty() {
        info!(rows = 0usize, "batch enriched (no usable rows)");
        return Ok(Vec::new());
    }

    // Frozen batch mean; every boost in this batch is relative to it
    let batch_mean =
        joined.iter().map(|(_, count)| f64::from(*count)).sum::<f64>() / joined.len() as f64;

    info!(rows = joined.len(), mean_citations = batch_mean, "batch enriched");

    let mut enriched = Vec::with_capacity(joined.len());
    for (submission, citation_count) in joined {
        let local_time = submission.submitted_on.with_timezone(&config.timezone);
        let (hour, minute, second) = (local_time.hour(), local_time.minute(), local_time.second());
        let after_deadline = hour >= config.deadline_hour;
        enriched.push(EnrichedRecord {
            id: submission.id.clone(),
            submitter: submission.submitter.clone(),
            weekday: submission.weekday,
            submitted_on: submission.submitted_on,
            num_authors: submission.num_authors,
            citation_count,
            citation_boost: 100.0 * (f64::from(citation_count) / batch_mean - 1.0),
            hour,
            minute,
            second,
            after_deadline,
            announced_on: config.announce_table.announced_on(submission.weekday, after_deadline),
            time_bucket: time_bucket(hour, minute),
            round_date: submission_round_date(
                local_time.date_naive(),
                submission.weekday,
                after_deadline,
            ),
            rank: 0,
            local_time,
        });
    }

    assign_ranks(&mut enriched);
    Ok(enriched)
}

/// Local time truncated down to the nearest 10-minute boundary, "H:MM".
/// The hour is not zero-padded, the minute bin is.
pub fn time_bucket(hour: u32, minute: u32) -> String {
    format!("{}:{:02}", hour, 10 * (minute / 10))
}

/// Local calendar date on which this record's submission window opened.
///
/// A new round opens at the deadline every announcement day. Before the
/// deadline the window opened the previous calendar day; the weekend is one
/// extended round because the venue opens no round on Saturday. The five
/// weekday/deadline special cases below are the venue policy itself and must
/// stay explicit branches, not a derived formula.
pub fn submission_round_date(
    local_date: NaiveDate,
    weekday: Weekday,
    after_deadline: bool,
) -> NaiveDate {
    use Weekday::*;
    let days_back = match (weekday, after_deadline) {
        (Sat, false) => 1, // Friday's round, still open
        (Sat, true) => 1,  // no round opens on Saturday
        (Sun, false) => 2, // still Friday's round
        (Sun, true) => 2,  // weekend round is dated to its Friday opening
        (Mon, false) => 3, // Friday's round runs until Monday's deadline
        (_, false) => 1,
        (_, true) => 0,
    };
    local_date - Duration::days(days_back)
}

/// Assign the 1-based per-round rank by ascending submission instant.
///
/// Dense 1..k per round; the stable sort breaks ties by original input order.
fn assign_ranks(records: &mut [EnrichedRecord]) {
    let mut rounds: HashMap<NaiveDate, Vec<usize>> = HashMap::new();
    for (index, record) in records.iter().enumerate() {
        rounds.entry(record.round_date).or_default().push(index);
    }
    for indices in rounds.values_mut() {
        indices.sort_by_key(|&index| records[index].submitted_on);
        for (position, &index) in indices.iter().enumerate() {
            records[index].rank = position as u32 + 1;
        }
    }
}

/// One-line diagnostic used by the CLI after a batch is enriched.
pub fn batch_diagnostic(label: &str, records: &[EnrichedRecord]) -> String {
    if records.is_empty() {
        return format!("{label}: 0 rows");
    }
    let mean = records.iter().map(|r| f64::from(r.citation_count)).sum::<f64>()
        / records.len() as f64;
    format!(
        "Average number of citations for {} is {:.2} ({} rows)",
        label,
        mean,
        records.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::parse_weekday;
    use chrono::{DateTime, Datelike, Utc};

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).expect("test timestamp").with_timezone(&Utc)
    }

    fn submission(id: &str, instant: &str) -> SubmissionRecord {
        let submitted_on = utc(instant);
        let weekday = submitted_on
            .with_timezone(&crate::config::VENUE_TZ)
            .weekday();
        SubmissionRecord {
            id: id.to_string(),
            submitter: "A. Author".to_string(),
            weekday,
            submitted_on,
            num_authors: 2,
        }
    }

    fn citation(id: &str, count: Option<u32>) -> CitationRecord {
        CitationRecord { id: id.to_string(), citation_count: count }
    }

    #[test]
    fn test_length_mismatch_is_integrity_error() {
        let subs = vec![submission("1", "2019-06-03T12:00:00Z")];
        let result = enrich_batch(&subs, &[], &AnalysisConfig::default());
        assert!(matches!(result, Err(TimingError::Integrity(_))));
    }

    #[test]
    fn test_id_mismatch_is_integrity_error() {
        let subs = vec![submission("1", "2019-06-03T12:00:00Z")];
        let cits = vec![citation("2", Some(3))];
        let result = enrich_batch(&subs, &cits, &AnalysisConfig::default());
        assert!(matches!(result, Err(TimingError::Integrity(_))));
    }

    #[test]
    fn test_unknown_counts_are_dropped_not_errors() {
        let subs = vec![
            submission("1", "2019-06-03T12:00:00Z"),
            submission("2", "2019-06-03T13:00:00Z"),
            submission("3", "2019-06-03T14:00:00Z"),
        ];
        let cits = vec![citation("1", Some(10)), citation("2", None), citation("3", Some(20))];
        let enriched = enrich_batch(&subs, &cits, &AnalysisConfig::default()).expect("enrich");
        assert_eq!(enriched.len(), 2);
        assert!(enriched.len() <= subs.len());
        assert_eq!(enriched[0].id, "1");
        assert_eq!(enriched[1].id, "3");
    }

    #[test]
    fn test_all_unknown_counts_yield_empty_table() {
        let subs = vec![submission("1", "2019-06-03T12:00:00Z")];
        let cits = vec![citation("1", None)];
        let enriched = enrich_batch(&subs, &cits, &AnalysisConfig::default()).expect("enrich");
        assert!(enriched.is_empty());
    }

    #[test]
    fn test_citation_boost_against_frozen_batch_mean() {
        let subs = vec![
            submission("1", "2019-06-03T12:00:00Z"),
            submission("2", "2019-06-03T13:00:00Z"),
        ];
        let cits = vec![citation("1", Some(10)), citation("2", Some(30))];
        let enriched = enrich_batch(&subs, &cits, &AnalysisConfig::default()).expect("enrich");
        // batch mean is 20
        assert_eq!(enriched[0].citation_boost, 100.0 * (10.0 / 20.0 - 1.0));
        assert_eq!(enriched[1].citation_boost, 100.0 * (30.0 / 20.0 - 1.0));
    }

    #[test]
    fn test_deadline_boundary_respects_dst() {
        // June: Eastern is UTC-4, so 17:59Z is 13:59 local
        let summer = vec![
            submission("1", "2019-06-03T17:59:00Z"),
            submission("2", "2019-06-03T18:00:00Z"),
        ];
        let cits = vec![citation("1", Some(1)), citation("2", Some(1))];
        let enriched = enrich_batch(&summer, &cits, &AnalysisConfig::default()).expect("enrich");
        assert!(!enriched[0].after_deadline);
        assert_eq!(enriched[0].hour, 13);
        assert!(enriched[1].after_deadline);
        assert_eq!(enriched[1].hour, 14);

        // December: Eastern is UTC-5, the same wall-clock boundary moves an hour
        let winter = vec![
            submission("1", "2019-12-02T18:59:00Z"),
            submission("2", "2019-12-02T19:00:00Z"),
        ];
        let cits = vec![citation("1", Some(1)), citation("2", Some(1))];
        let enriched = enrich_batch(&winter, &cits, &AnalysisConfig::default()).expect("enrich");
        assert!(!enriched[0].after_deadline);
        assert!(enriched[1].after_deadline);
    }

    #[test]
    fn test_friday_announcement_examples() {
        // Friday 09:00 local -> before deadline -> announced Sunday
        // Friday 15:00 local -> after deadline -> announced Monday
        let subs = vec![
            submission("1", "2019-06-07T13:00:00Z"), // Fri 09:00 EDT
            submission("2", "2019-06-07T19:00:00Z"), // Fri 15:00 EDT
        ];
        let cits = vec![citation("1", Some(1)), citation("2", Some(1))];
        let enriched = enrich_batch(&subs, &cits, &AnalysisConfig::default()).expect("enrich");
        assert_eq!(enriched[0].weekday, Weekday::Fri);
        assert_eq!(enriched[0].announced_on, Weekday::Sun);
        assert_eq!(enriched[1].announced_on, Weekday::Mon);
    }

    #[test]
    fn test_time_bucket_format() {
        assert_eq!(time_bucket(9, 0), "9:00");
        assert_eq!(time_bucket(9, 9), "9:00");
        assert_eq!(time_bucket(14, 0), "14:00");
        assert_eq!(time_bucket(14, 59), "14:50");
        assert_eq!(time_bucket(0, 15), "0:10");
    }

    #[test]
    fn test_round_date_weekday_cases() {
        use Weekday::*;
        let date = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("test date");
        // 2019-06-03 is a Monday
        let mon = date("2019-06-03");
        let tue = date("2019-06-04");
        let fri = date("2019-06-07");
        let sat = date("2019-06-08");
        let sun = date("2019-06-09");

        // Ordinary weekdays: previous day before the deadline, same day after
        assert_eq!(submission_round_date(tue, Tue, false), mon);
        assert_eq!(submission_round_date(tue, Tue, true), tue);
        assert_eq!(submission_round_date(fri, Fri, true), fri);

        // Saturday at any hour belongs to Friday's round
        assert_eq!(submission_round_date(sat, Sat, false), fri);
        assert_eq!(submission_round_date(sat, Sat, true), fri);

        // Sunday at any hour still belongs to Friday's round
        assert_eq!(submission_round_date(sun, Sun, false), fri);
        assert_eq!(submission_round_date(sun, Sun, true), fri);

        // Monday before the deadline closes out the weekend round
        assert_eq!(submission_round_date(date("2019-06-10"), Mon, false), fri);
        // Monday after the deadline opens the week normally
        assert_eq!(submission_round_date(date("2019-06-10"), Mon, true), date("2019-06-10"));
    }

    #[test]
    fn test_rank_is_dense_and_ordered_by_instant() {
        // All three land in the Monday round; input order deliberately shuffled
        let subs = vec![
            submission("late", "2019-06-03T20:00:00Z"),
            submission("early", "2019-06-03T18:00:01Z"),
            submission("middle", "2019-06-03T19:00:00Z"),
        ];
        let cits = vec![
            citation("late", Some(1)),
            citation("early", Some(1)),
            citation("middle", Some(1)),
        ];
        let enriched = enrich_batch(&subs, &cits, &AnalysisConfig::default()).expect("enrich");
        let rank_of = |id: &str| {
            enriched.iter().find(|r| r.id == id).map(|r| r.rank).expect("record present")
        };
        assert_eq!(rank_of("early"), 1);
        assert_eq!(rank_of("middle"), 2);
        assert_eq!(rank_of("late"), 3);

        let mut ranks: Vec<u32> = enriched.iter().map(|r| r.rank).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        let subs = vec![
            submission("first", "2019-06-03T18:30:00Z"),
            submission("second", "2019-06-03T18:30:00Z"),
        ];
        let cits = vec![citation("first", Some(1)), citation("second", Some(1))];
        let enriched = enrich_batch(&subs, &cits, &AnalysisConfig::default()).expect("enrich");
        assert_eq!(enriched[0].rank, 1);
        assert_eq!(enriched[1].rank, 2);
    }

    #[test]
    fn test_enrichment_is_deterministic() {
        let subs = vec![
            submission("1", "2019-06-06T12:34:56Z"),
            submission("2", "2019-06-07T19:30:00Z"),
            submission("3", "2019-06-08T03:00:00Z"),
        ];
        let cits = vec![citation("1", Some(5)), citation("2", Some(8)), citation("3", None)];
        let config = AnalysisConfig::default();
        let first = enrich_batch(&subs, &cits, &config).expect("enrich");
        let second = enrich_batch(&subs, &cits, &config).expect("enrich");
        assert_eq!(first, second);
    }

    #[test]
    fn test_weekday_column_drives_announcement_not_local_date() {
        // The announce table keys on the weekday recorded at the source, which
        // is carried through verbatim even when the local date differs.
        let mut sub = submission("1", "2019-06-08T01:00:00Z"); // Fri 21:00 EDT
        assert_eq!(sub.weekday, Weekday::Fri);
        sub.weekday = parse_weekday("Sat").expect("weekday");
        let cits = vec![citation("1", Some(1))];
        let enriched = enrich_batch(&[sub], &cits, &AnalysisConfig::default()).expect("enrich");
        assert_eq!(enriched[0].announced_on, Weekday::Mon);
    }
}
