//! Analysis configuration.
//!
//! The venue constants (deadline hour, timezone, announcement table, tracked
//! years) are bundled into one immutable [`AnalysisConfig`] that is passed into
//! the pipeline, so batches can be processed under alternate policies in tests
//! without touching global state.

use chrono::Weekday;
use chrono_tz::Tz;

/// Submission deadline, venue-local hour (2 pm Eastern)
pub const DEADLINE_HOUR: u32 = 14;

/// Venue timezone; DST rules matter, a fixed offset would misclassify
/// submissions near the deadline for half the year
pub const VENUE_TZ: Tz = chrono_tz::US::Eastern;

/// Announcement-day lookup: submitted weekday and deadline state determine the
/// weekday the paper is announced on.
///
/// Rows Mon..Sun, columns [before deadline, after deadline]. The weekend rows
/// are genuine irregularities of the venue policy (no rounds open on Saturday,
/// the weekend is one extended round), so this stays an explicit table rather
/// than anything derived arithmetically.
#[derive(Debug, Clone)]
pub struct AnnounceTable([[Weekday; 2]; 7]);

impl Default for AnnounceTable {
    fn default() -> Self {
        use Weekday::*;
        AnnounceTable([
            [Mon, Tue], // submitted Mon
            [Tue, Wed], // submitted Tue
            [Wed, Thu], // submitted Wed
            [Thu, Sun], // submitted Thu
            [Sun, Mon], // submitted Fri
            [Mon, Mon], // submitted Sat
            [Mon, Mon], // submitted Sun
        ])
    }
}

impl AnnounceTable {
    /// Look up the announcement weekday for a submission.
    pub fn announced_on(&self, submitted: Weekday, after_deadline: bool) -> Weekday {
        self.0[submitted.num_days_from_monday() as usize][usize::from(after_deadline)]
    }
}

/// Immutable per-run configuration for the enrichment pipeline.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Local hour at or after which a submission counts as "after deadline"
    pub deadline_hour: u32,
    /// Civil timezone of the venue
    pub timezone: Tz,
    /// Years with both a metadata export and a citation-count file
    pub tracked_years: Vec<i32>,
    /// Submitted-weekday to announced-weekday mapping
    pub announce_table: AnnounceTable,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            deadline_hour: DEADLINE_HOUR,
            timezone: VENUE_TZ,
            tracked_years: (2015..=2020).collect(),
            announce_table: AnnounceTable::default(),
        }
    }
}
