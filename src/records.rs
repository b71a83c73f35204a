//! Data model for one (year, category) batch.
//!
//! Raw records mirror the two input CSV files; [`EnrichedRecord`] is the
//! derived feature row the rest of the analysis consumes. Raw records are read
//! once per batch and never mutated, enriched records are immutable once
//! computed.

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};

/// One row of the raw submissions table.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRecord {
    /// arXiv identifier, e.g. "1501.01234"
    pub id: String,
    /// Submitting author
    pub submitter: String,
    /// Weekday of submission as recorded at the source
    pub weekday: Weekday,
    /// Submission instant, UTC
    pub submitted_on: DateTime<Utc>,
    /// Number of authors
    pub num_authors: u32,
}

/// One row of the raw citation-count table.
///
/// Rows must be in the same order as the submissions table; the join is
/// positional, not key-based.
#[derive(Debug, Clone, PartialEq)]
pub struct CitationRecord {
    /// arXiv identifier, must match the submission row at the same index
    pub id: String,
    /// Citation count, `None` when the citation service did not know the paper
    pub citation_count: Option<u32>,
}

/// A submission with citation count and all derived timing features attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub id: String,
    pub submitter: String,
    #[serde(serialize_with = "serialize_weekday")]
    pub weekday: Weekday,
    /// Original submission instant, UTC
    pub submitted_on: DateTime<Utc>,
    pub num_authors: u32,
    pub citation_count: u32,
    /// Percentage deviation from the frozen batch mean citation count
    pub citation_boost: f64,
    /// Submission instant converted to the venue timezone
    pub local_time: DateTime<Tz>,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// Local hour at or past the venue deadline
    pub after_deadline: bool,
    #[serde(serialize_with = "serialize_weekday")]
    pub announced_on: Weekday,
    /// Local time truncated to the 10-minute boundary, "H:MM"
    pub time_bucket: String,
    /// Local calendar date on which this record's submission window opened
    pub round_date: NaiveDate,
    /// 1-based position within the round, by ascending submission instant
    pub rank: u32,
}

/// Three-letter weekday abbreviation used throughout the input files.
pub fn weekday_abbrev(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// Parse a three-letter weekday abbreviation. Returns `None` for anything else;
/// callers treat that as a data-quality error, not a default.
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    match s {
        "Mon" => Some(Weekday::Mon),
        "Tue" => Some(Weekday::Tue),
        "Wed" => Some(Weekday::Wed),
        "Thu" => Some(Weekday::Thu),
        "Fri" => Some(Weekday::Fri),
        "Sat" => Some(Weekday::Sat),
        "Sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn serialize_weekday<S: Serializer>(weekday: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(weekday_abbrev(*weekday))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_round_trip() {
        for abbrev in ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"] {
            let weekday = parse_weekday(abbrev).expect("known abbreviation");
            assert_eq!(weekday_abbrev(weekday), abbrev);
        }
    }

    #[test]
    fn test_parse_weekday_rejects_garbage() {
        assert_eq!(parse_weekday("Monday"), None);
        assert_eq!(parse_weekday("mon"), None);
        assert_eq!(parse_weekday(""), None);
    }
}
