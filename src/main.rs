//! arxivtiming - arXiv Submission Timing vs Citations
//!
//! Command-line driver for the analysis pipeline: fetch citation counts from
//! INSPIRE-HEP, enrich a batch with timing features, or run the full set of
//! descriptive statistics across all tracked years.
//!
//! ## Usage
//!
//! ```bash
//! arxivtiming fetch-citations 2019 hep-th
//! arxivtiming enrich 2019 hep-th
//! arxivtiming analyze --category hep-th
//! ```

use anyhow::{Context, Result};
use arxivtiming::config::AnalysisConfig;
use arxivtiming::enrich::{self, batch_diagnostic};
use arxivtiming::growth::{self, GrowthCurve};
use arxivtiming::inspire::CitationClient;
use arxivtiming::records::EnrichedRecord;
use arxivtiming::{loader, stats};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Deadline policy changed in late 2016, so hour-of-day and rank analyses only
/// use batches from this year onwards.
const COMPARABLE_FROM: i32 = 2017;

// ============================================================================
// CLI Definition
// ============================================================================

/// arXiv Submission Timing vs Citations - Analysis Pipeline
#[derive(Parser)]
#[command(name = "arxivtiming")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Directory holding the batch CSV files
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch citation counts from INSPIRE-HEP for one batch
    FetchCitations {
        /// Submission year of the batch
        year: i32,

        /// arXiv category, e.g. hep-th
        category: String,
    },

    /// Enrich one batch and write the feature table
    Enrich {
        /// Submission year of the batch
        year: i32,

        /// arXiv category, e.g. hep-th
        category: String,

        /// Output file (default: <data-dir>/<year>_<category>_enriched.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the descriptive statistics across all tracked years
    Analyze {
        /// arXiv category, e.g. hep-th
        #[arg(long, default_value = "hep-th")]
        category: String,

        /// Initial guess: curve amplitude
        #[arg(long, default_value_t = 29.6)]
        amplitude: f64,

        /// Initial guess: curve rate
        #[arg(long, default_value_t = 10.0)]
        rate: f64,

        /// Initial guess: curve shift (gigaseconds)
        #[arg(long, default_value_t = 1.62)]
        shift: f64,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    match cli.command {
        Commands::FetchCitations { year, category } => {
            run_fetch_citations(&cli.data_dir, year, &category).await
        }
        Commands::Enrich { year, category, output } => {
            run_enrich(&cli.data_dir, year, &category, output)
        }
        Commands::Analyze { category, amplitude, rate, shift } => {
            let guess = GrowthCurve { amplitude, rate, shift };
            run_analyze(&cli.data_dir, &category, guess)
        }
    }
}

// ============================================================================
// Citation Fetch
// ============================================================================

async fn run_fetch_citations(data_dir: &Path, year: i32, category: &str) -> Result<()> {
    let submissions = loader::submissions_path(data_dir, year, category);
    let ids = loader::load_ids(&submissions)
        .with_context(|| format!("Failed to read ids from {}", submissions.display()))?;
    println!("Loaded {} arXiv IDs.", ids.len());

    let client = CitationClient::new()?;
    let records = client
        .fetch_all(&ids)
        .await
        .context("Citation lookup failed")?;

    let output = loader::citations_path(data_dir, year, category);
    loader::save_citations(&output, &records)?;
    println!("Saved: {}", output.display());
    Ok(())
}

// ============================================================================
// Batch Enrichment
// ============================================================================

fn load_and_enrich(
    data_dir: &Path,
    year: i32,
    category: &str,
    config: &AnalysisConfig,
) -> Result<Vec<EnrichedRecord>> {
    let submissions = loader::load_submissions(&loader::submissions_path(data_dir, year, category))?;
    let citations = loader::load_citations(&loader::citations_path(data_dir, year, category))?;
    let enriched = enrich::enrich_batch(&submissions, &citations, config)?;
    Ok(enriched)
}

fn run_enrich(data_dir: &Path, year: i32, category: &str, output: Option<PathBuf>) -> Result<()> {
    let config = AnalysisConfig::default();
    let enriched = load_and_enrich(data_dir, year, category, &config)
        .with_context(|| format!("Batch {year}_{category} failed"))?;

    println!("{}", batch_diagnostic(&format!("{year}_{category}"), &enriched));

    let output =
        output.unwrap_or_else(|| data_dir.join(format!("{year}_{category}_enriched.csv")));
    loader::save_enriched(&output, &enriched)?;
    println!("Saved: {}", output.display());
    Ok(())
}

// ============================================================================
// Analysis
// ============================================================================

fn run_analyze(data_dir: &Path, category: &str, guess: GrowthCurve) -> Result<()> {
    let config = AnalysisConfig::default();

    // Each batch is enriched in isolation; one broken year must not block the
    // others.
    let mut batches: Vec<(i32, Vec<EnrichedRecord>)> = Vec::new();
    for &year in &config.tracked_years {
        match load_and_enrich(data_dir, year, category, &config) {
            Ok(records) => {
                println!("{}", batch_diagnostic(&format!("{year}_{category}"), &records));
                batches.push((year, records));
            }
            Err(e) => {
                error!(year, error = %e, "Batch failed, skipping");
            }
        }
    }
    if batches.is_empty() {
        anyhow::bail!("No batch could be loaded from {}", data_dir.display());
    }

    println!("\n--- Summary per year ---");
    for (year, records) in &batches {
        let summary = stats::summarize_batch(*year, records);
        println!("{}: {} rows, {:.2} citations on average", summary.year, summary.rows, summary.mean_citations);
    }

    let all: Vec<EnrichedRecord> =
        batches.iter().flat_map(|(_, records)| records.iter().cloned()).collect();
    let recent: Vec<EnrichedRecord> = batches
        .iter()
        .filter(|(year, _)| *year >= COMPARABLE_FROM)
        .flat_map(|(_, records)| records.iter().cloned())
        .collect();
    info!(all = all.len(), recent = recent.len(), "batches concatenated");

    print_stats("Day of submission", &stats::by_weekday(&all));
    print_stats("Hour of submission", &stats::by_hour(&recent));
    print_stats("Day of announcement", &stats::by_announce_day(&recent));

    let (before, after) = stats::by_weekday_split(&recent);
    print_stats("Day of submission, before deadline", &before);
    print_stats("Day of submission, after deadline", &after);

    print_stats(
        "Time of submission around the deadline",
        &stats::by_time_bucket_around_deadline(&recent, config.deadline_hour),
    );
    print_stats("Position in the listing", &stats::by_rank(&recent, 20));

    let quick = stats::first_minute(&recent, config.deadline_hour);
    let quick_top: Vec<&EnrichedRecord> =
        quick.iter().copied().filter(|r| r.rank == 1).collect();
    println!(
        "\nFirst-minute submissions: {} ({} at the top of the listing, mean boost {:+.2}%)",
        quick.len(),
        quick_top.len(),
        stats::mean_boost(&quick_top)
    );

    let lucky = stats::top_rank_latecomers(&recent, config.deadline_hour);
    println!(
        "There are {} papers who appeared in the top but were not submitted in the first minute.",
        lucky.len()
    );
    println!("They on average have {:.2}% less citations.", -stats::mean_boost(&lucky));

    // Time-aware baseline: fit the growth curve to the yearly averages and
    // check it agrees with the flat per-batch normalization.
    println!("\n--- Citation growth fit ---");
    let points = growth::yearly_points(&batches)?;
    let curve = growth::fit(&points, guess).context("Citation growth fit failed")?;
    println!(
        "Fitted curve: amplitude {:.3}, rate {:.3}, shift {:.3}",
        curve.amplitude, curve.rate, curve.shift
    );

    let flat: Vec<f64> = recent.iter().map(|r| r.citation_boost).collect();
    let accurate: Vec<f64> = recent
        .iter()
        .map(|r| curve.boost(r.submitted_on.timestamp() as f64, r.citation_count))
        .collect();
    println!(
        "Correlation between flat and curve-based citation boost: {:.4}",
        stats::pearson_correlation(&flat, &accurate)
    );

    Ok(())
}

/// Print one grouped table.
fn print_stats(title: &str, groups: &[stats::GroupStat]) {
    println!("\n--- {title} ---");
    for group in groups {
        println!("{:>6}: {:>6} submissions, mean boost {:+.2}%", group.key, group.count, group.mean_boost);
    }
}
