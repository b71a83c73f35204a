//! INSPIRE-HEP literature API client.
//!
//! Fetches citation counts for arXiv identifiers, one id per request, to build
//! the citation-counts file consumed by the loader.
//!
//! API details:
//! - Endpoint: GET /api/literature?fields=citation_count&q=arxiv:<id>
//! - An empty hit list means the paper is unknown to INSPIRE
//! - Unauthenticated rate limit is low, so requests are spaced out

use crate::error::{Result, TimingError};
use crate::records::CitationRecord;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// INSPIRE-HEP API base URL
const INSPIRE_API_URL: &str = "https://inspirehep.net/api/literature";

/// Delay between consecutive requests
const REQUEST_DELAY: Duration = Duration::from_millis(500);

/// Retries per identifier before the batch is given up
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Deserialize)]
struct InspireResponse {
    hits: InspireHits,
}

#[derive(Debug, Deserialize)]
struct InspireHits {
    #[serde(default)]
    hits: Vec<InspireHit>,
}

#[derive(Debug, Deserialize)]
struct InspireHit {
    metadata: InspireMetadata,
}

#[derive(Debug, Deserialize)]
struct InspireMetadata {
    #[serde(default)]
    citation_count: Option<u32>,
}

/// INSPIRE-HEP client with retry and polite request spacing
pub struct CitationClient {
    client: Client,
}

impl CitationClient {
    /// Create a new CitationClient
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| TimingError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Citation count for one arXiv identifier.
    ///
    /// Returns `Ok(None)` when INSPIRE does not know the paper. Transient
    /// failures are retried with exponential backoff; a persistent failure is
    /// surfaced so the caller can abandon the batch instead of writing a file
    /// with silently missing rows.
    pub async fn citation_count(&self, arxiv_id: &str) -> Result<Option<u32>> {
        let mut backoff = Duration::from_millis(500);
        let mut last_error = TimingError::Api {
            code: 0,
            message: format!("no attempt made for {arxiv_id}"),
        };

        for attempt in 0..MAX_RETRIES {
            match self.do_request(arxiv_id).await {
                Ok(count) => return Ok(count),
                Err(TimingError::RateLimited(secs)) => {
                    let wait = Duration::from_secs(secs).max(backoff);
                    warn!(id = arxiv_id, attempt = attempt + 1, wait_secs = wait.as_secs(), "Rate limited, waiting");
                    tokio::time::sleep(wait).await;
                    backoff *= 2;
                    last_error = TimingError::RateLimited(secs);
                }
                Err(e) => {
                    debug!(id = arxiv_id, attempt = attempt + 1, error = %e, "Lookup failed");
                    last_error = e;
                    if attempt < MAX_RETRIES - 1 {
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }

        Err(last_error)
    }

    /// Fetch counts for a whole identifier list, one request at a time.
    ///
    /// Output rows keep the input order, so the resulting file lines up
    /// positionally with the submissions file it was derived from.
    pub async fn fetch_all(&self, ids: &[String]) -> Result<Vec<CitationRecord>> {
        info!(total = ids.len(), "Starting INSPIRE-HEP citation lookup");

        let mut records = Vec::with_capacity(ids.len());
        for (index, id) in ids.iter().enumerate() {
            if index > 0 && index % 1000 == 0 {
                info!(processed = index, total = ids.len(), "Citation lookup progress");
            }
            let citation_count = self.citation_count(id).await?;
            records.push(CitationRecord { id: id.clone(), citation_count });
            if index + 1 < ids.len() {
                tokio::time::sleep(REQUEST_DELAY).await;
            }
        }

        let known = records.iter().filter(|r| r.citation_count.is_some()).count();
        info!(total = records.len(), known, "Citation lookup complete");
        Ok(records)
    }

    async fn do_request(&self, arxiv_id: &str) -> Result<Option<u32>> {
        let query = format!("arxiv:{arxiv_id}");
        let response = self
            .client
            .get(INSPIRE_API_URL)
            .query(&[("fields", "citation_count"), ("q", query.as_str())])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TimingError::RateLimited(5));
        }
        if !response.status().is_success() {
            return Err(TimingError::Api {
                code: i32::from(response.status().as_u16()),
                message: format!("INSPIRE-HEP API error: {}", response.status()),
            });
        }

        let data: InspireResponse = response.json().await?;
        Ok(extract_count(data))
    }
}

/// Pull the citation count out of a parsed response; an empty hit list means
/// the paper was not found.
fn extract_count(response: InspireResponse) -> Option<u32> {
    response
        .hits
        .hits
        .into_iter()
        .next()
        .and_then(|hit| hit.metadata.citation_count)
}
