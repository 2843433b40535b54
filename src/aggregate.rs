//! Concurrent site aggregation
//!
//! Fans fetch+extract out across every source URL on a bounded pool and
//! folds the results, in completion order, into one deduplicated list.
//!
//! # Flow
//!
//! ```text
//! sources ──▶ split url#fragment ──▶ buffer_unordered(concurrency)
//!                                         │  fetch ─▶ extract ─▶ overlay
//!                                         ▼
//!                          collection loop (single writer)
//!                          first-seen name wins, failures → 0 entries
//!                                         │
//!                                         ▼
//!                                  AggregateReport
//! ```

use crate::error::FetchError;
use crate::extraction::{extract_sites, site_name, split_source_url, FragmentFields, TargetNames};
use crate::fetch::DocumentSource;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default number of sources fetched at once
pub const DEFAULT_CONCURRENCY: usize = 8;

/// A source whose task produced nothing
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailedSource {
    /// Configured URL, fragment included
    pub url: String,
    /// Why it failed
    pub reason: String,
}

/// Outcome of one aggregation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateReport {
    /// Deduplicated entries in completion order
    pub sites: Vec<Value>,
    /// Requested names found in no source, in requested order
    pub missing: Vec<String>,
    /// Sources whose fetch failed
    pub failed_sources: Vec<FailedSource>,
    /// Entries dropped because an earlier source already supplied the name
    pub duplicates_dropped: usize,
}

impl AggregateReport {
    /// Names of the kept entries, in order
    pub fn names(&self) -> Vec<&str> {
        self.sites.iter().filter_map(site_name).collect()
    }
}

/// Runs the fetch+extract fan-out over a [`DocumentSource`]
pub struct Aggregator<'a, S: DocumentSource> {
    source: &'a S,
    concurrency: usize,
    task_timeout: Duration,
}

impl<'a, S: DocumentSource> Aggregator<'a, S> {
    /// Create an aggregator bounded to `concurrency` in-flight tasks
    pub fn new(source: &'a S, concurrency: usize, task_timeout: Duration) -> Self {
        Self {
            source,
            concurrency: concurrency.max(1),
            task_timeout,
        }
    }

    /// Fetch every source, extract the requested entries and dedupe by name
    #[instrument(skip(self, sources, targets), fields(sources = sources.len(), targets = targets.len()))]
    pub async fn aggregate(&self, sources: &[String], targets: &TargetNames) -> AggregateReport {
        info!(
            "Aggregating {} target names from {} sources",
            targets.len(),
            sources.len()
        );

        let mut completed = stream::iter(sources.iter())
            .map(|url| async move { (url, self.fetch_and_extract(url, targets).await) })
            .buffer_unordered(self.concurrency);

        let mut report = AggregateReport::default();
        let mut seen: HashSet<String> = HashSet::new();

        while let Some((url, outcome)) = completed.next().await {
            match outcome {
                Ok(entries) => {
                    debug!("{} yielded {} matching entries", url, entries.len());
                    for entry in entries {
                        let Some(name) = site_name(&entry) else {
                            continue;
                        };
                        if seen.insert(name.to_string()) {
                            report.sites.push(entry);
                        } else {
                            debug!("Dropping duplicate '{}' from {}", name, url);
                            report.duplicates_dropped += 1;
                        }
                    }
                }
                Err(e) => {
                    report.failed_sources.push(FailedSource {
                        url: url.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        for name in targets.iter() {
            if !seen.contains(name) {
                warn!("Site '{}' not found in any source", name);
                report.missing.push(name.to_string());
            }
        }

        info!(
            "Aggregated {} sites ({} missing, {} failed sources)",
            report.sites.len(),
            report.missing.len(),
            report.failed_sources.len()
        );

        report
    }

    async fn fetch_and_extract(
        &self,
        url: &str,
        targets: &TargetNames,
    ) -> Result<Vec<Value>, FetchError> {
        let (base, fragment) = split_source_url(url);
        let fields = fragment.map(FragmentFields::parse).unwrap_or_default();

        let document = tokio::time::timeout(self.task_timeout, self.source.fetch_document(base))
            .await
            .map_err(|_| FetchError::Timeout(self.task_timeout.as_millis() as u64))??;

        Ok(extract_sites(Some(&document), targets, &fields))
    }
}
