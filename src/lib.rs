//! # arxivtiming
//!
//! Does the time of day you submit to arXiv affect how often your paper is
//! cited? This crate joins a submission-metadata export with citation counts
//! fetched from INSPIRE-HEP, derives time-of-submission features under the
//! venue's deadline and announcement rules, and produces the descriptive
//! statistics behind the study.
//!
//! ## Modules
//!
//! - [`config`] - Venue constants (deadline, timezone, announce-day table)
//! - [`records`] - Raw and enriched record types
//! - [`enrich`] - Feature enrichment pipeline
//! - [`growth`] - Baseline citation-growth curve fit
//! - [`loader`] - Batch CSV input/output
//! - [`inspire`] - INSPIRE-HEP citation-count client
//! - [`stats`] - Descriptive aggregations
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use arxivtiming::{config::AnalysisConfig, enrich, loader};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = AnalysisConfig::default();
//!     let data_dir = Path::new("data");
//!     let submissions =
//!         loader::load_submissions(&loader::submissions_path(data_dir, 2019, "hep-th"))?;
//!     let citations = loader::load_citations(&loader::citations_path(data_dir, 2019, "hep-th"))?;
//!     let enriched = enrich::enrich_batch(&submissions, &citations, &config)?;
//!     println!("{} enriched rows", enriched.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod enrich;
pub mod error;
pub mod growth;
pub mod inspire;
pub mod loader;
pub mod records;
pub mod stats;

pub use error::{Result, TimingError};
