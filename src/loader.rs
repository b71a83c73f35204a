//! CSV input/output for batch files.
//!
//! A batch `{year}_{category}` consists of two files in the data directory:
//!
//! - `{year}_{category}.csv` - id, submitter, weekday, submitted_on, num_authors
//! - `{year}_{category}_citation_counts.csv` - id, citation_counts (the literal
//!   string "None" marks papers the citation service did not know)
//!
//! Malformed timestamps, weekday codes or counts abort the batch with a
//! data-quality error; propagating a corrupted derived feature would be worse
//! than losing the batch.

use crate::error::{Result, TimingError};
use crate::records::{parse_weekday, CitationRecord, EnrichedRecord, SubmissionRecord};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Sentinel the citation fetcher writes for papers it could not find
pub const UNKNOWN_COUNT: &str = "None";

#[derive(Debug, Deserialize)]
struct RawSubmissionRow {
    id: String,
    submitter: String,
    weekday: String,
    submitted_on: String,
    num_authors: u32,
}

#[derive(Debug, Deserialize)]
struct RawCitationRow {
    id: String,
    citation_counts: String,
}

/// Path of the submissions file for a batch.
pub fn submissions_path(data_dir: &Path, year: i32, category: &str) -> PathBuf {
    data_dir.join(format!("{year}_{category}.csv"))
}

/// Path of the citation-counts file for a batch.
pub fn citations_path(data_dir: &Path, year: i32, category: &str) -> PathBuf {
    data_dir.join(format!("{year}_{category}_citation_counts.csv"))
}

/// Read the submissions table of one batch.
pub fn load_submissions(path: &Path) -> Result<Vec<SubmissionRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for (row, result) in reader.deserialize::<RawSubmissionRow>().enumerate() {
        let raw = result?;
        let weekday = parse_weekday(&raw.weekday).ok_or_else(|| {
            TimingError::DataQuality(format!(
                "row {}: unrecognized weekday '{}' for id {}",
                row, raw.weekday, raw.id
            ))
        })?;
        let submitted_on = parse_instant(&raw.submitted_on).ok_or_else(|| {
            TimingError::DataQuality(format!(
                "row {}: malformed timestamp '{}' for id {}",
                row, raw.submitted_on, raw.id
            ))
        })?;
        records.push(SubmissionRecord {
            id: raw.id,
            submitter: raw.submitter,
            weekday,
            submitted_on,
            num_authors: raw.num_authors,
        });
    }
    info!(rows = records.len(), path = %path.display(), "loaded submissions");
    Ok(records)
}

/// Read the citation-counts table of one batch.
pub fn load_citations(path: &Path) -> Result<Vec<CitationRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for (row, result) in reader.deserialize::<RawCitationRow>().enumerate() {
        let raw = result?;
        let citation_count = if raw.citation_counts == UNKNOWN_COUNT {
            None
        } else {
            Some(raw.citation_counts.parse::<u32>().map_err(|_| {
                TimingError::DataQuality(format!(
                    "row {}: malformed citation count '{}' for id {}",
                    row, raw.citation_counts, raw.id
                ))
            })?)
        };
        records.push(CitationRecord { id: raw.id, citation_count });
    }
    info!(rows = records.len(), path = %path.display(), "loaded citation counts");
    Ok(records)
}

/// Read only the identifier column of a submissions file, for the citation
/// fetcher.
pub fn load_ids(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)?;
    let id_index = reader
        .headers()?
        .iter()
        .position(|h| h == "id")
        .ok_or_else(|| TimingError::DataQuality(format!("{}: no 'id' column", path.display())))?;
    let mut ids = Vec::new();
    for result in reader.records() {
        let row = result?;
        let id = row.get(id_index).ok_or_else(|| {
            TimingError::DataQuality(format!("{}: short row in id column", path.display()))
        })?;
        ids.push(id.to_string());
    }
    Ok(ids)
}

/// Write a citation-counts file in the shape [`load_citations`] reads back.
pub fn save_citations(path: &Path, records: &[CitationRecord]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(["id", "citation_counts"])?;
    for record in records {
        let count = match record.citation_count {
            Some(count) => count.to_string(),
            None => UNKNOWN_COUNT.to_string(),
        };
        writer.write_record([record.id.as_str(), count.as_str()])?;
    }
    writer.flush()?;
    info!(rows = records.len(), path = %path.display(), "saved citation counts");
    Ok(())
}

/// Write the enriched feature table.
pub fn save_enriched(path: &Path, records: &[EnrichedRecord]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(true).from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!(rows = records.len(), path = %path.display(), "saved enriched table");
    Ok(())
}

/// Parse a submission instant. The metadata export writes naive
/// `YYYY-MM-DD HH:MM:SS` strings in UTC; RFC 3339 is accepted as well.
fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
        return Some(instant.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
