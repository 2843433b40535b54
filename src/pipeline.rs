//! Run pipeline
//!
//! Wires the pieces together for one run:
//!
//! ```text
//! load base ──▶ snapshot?
//!     │
//!     ├──▶ aggregate sources ─┐
//!     └──▶ fetch spider doc ──┴──▶ resolve placeholders ──▶ aggregated_output?
//!                                          │
//!                                          ▼
//!          rename spider ──▶ substitute ──▶ insert aggregated + extra ──▶ output
//! ```

use crate::aggregate::{Aggregator, FailedSource};
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::extraction::{split_source_url, TargetNames, SITES_KEY};
use crate::fetch::{is_remote, DocumentSource};
use crate::merge::{insert_site, insert_sites, rename_key, substitute};
use crate::notify::Notifier;
use crate::resolve::{has_placeholder, resolve_placeholders, Resolution, SPIDER_KEY};
use crate::store;
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

/// What a run did
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// When the run started
    pub started_at: DateTime<Local>,
    /// When the merged document was written
    pub finished_at: DateTime<Local>,
    /// Where the merged document went
    pub output: PathBuf,
    /// Entries aggregated from the sources
    pub aggregated: usize,
    /// Aggregated entries inserted into the base document
    pub inserted: usize,
    /// Fixed entries inserted
    pub extra_inserted: usize,
    /// Requested names no source had
    pub missing: Vec<String>,
    /// Sources that could not be fetched
    pub failed_sources: Vec<FailedSource>,
    /// Cross-source duplicates dropped
    pub duplicates_dropped: usize,
    /// Placeholder resolution outcome, if a secondary document is configured
    pub resolution: Option<Resolution>,
    /// Whether the top-level spider was overwritten
    pub spider_renamed: bool,
    /// Strings changed by substitution
    pub substitutions: usize,
    /// Structural insertion failures
    pub insert_errors: Vec<String>,
    /// Length of `sites` in the written document
    pub total_sites: usize,
}

impl RunReport {
    /// Whether anything went less than perfectly
    pub fn is_degraded(&self) -> bool {
        !self.missing.is_empty()
            || !self.failed_sources.is_empty()
            || !self.insert_errors.is_empty()
            || self.resolution.as_ref().is_some_and(Resolution::is_degraded)
    }

    /// Notification title
    pub fn title(&self) -> String {
        if self.is_degraded() {
            format!("site-merger: {} sites merged (with warnings)", self.inserted)
        } else {
            format!("site-merger: {} sites merged", self.inserted)
        }
    }

    /// Notification body
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "finished: {}", self.finished_at.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "output: {}", self.output.display());
        let _ = writeln!(
            out,
            "aggregated: {}, inserted: {}, extra: {}, total: {}",
            self.aggregated, self.inserted, self.extra_inserted, self.total_sites
        );
        if !self.missing.is_empty() {
            let _ = writeln!(out, "not found: {}", self.missing.join(", "));
        }
        for failed in &self.failed_sources {
            let _ = writeln!(out, "failed: {} ({})", failed.url, failed.reason);
        }
        if let Some(Resolution::Skipped { reason }) = &self.resolution {
            let _ = writeln!(out, "placeholders unresolved: {}", reason);
        }
        for err in &self.insert_errors {
            let _ = writeln!(out, "insert failed: {}", err);
        }
        out
    }
}

/// One configured run
pub struct Pipeline<S: DocumentSource> {
    config: RunConfig,
    source: S,
    notifier: Option<Notifier>,
}

impl<S: DocumentSource> Pipeline<S> {
    /// Create a pipeline over a document source
    pub fn new(config: RunConfig, source: S) -> Self {
        Self {
            config,
            source,
            notifier: None,
        }
    }

    /// Send a summary to `notifier` after the run
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// The run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run, then notify about the outcome. Notification failures are only logged.
    pub async fn execute(&self) -> Result<RunReport> {
        let result = self.run().await;

        if let Some(notifier) = &self.notifier {
            let (title, content) = match &result {
                Ok(report) => (report.title(), report.summary()),
                Err(e) => ("site-merger: run failed".to_string(), e.to_string()),
            };
            if let Err(e) = notifier.notify(&title, &content).await {
                warn!("Notification not delivered: {}", e);
            }
        }

        result
    }

    /// Run every stage and write the merged document
    #[instrument(skip(self), fields(base = %self.config.base))]
    pub async fn run(&self) -> Result<RunReport> {
        let started_at = Local::now();
        let config = &self.config;

        let mut base = self.load_base().await?;
        if let Some(path) = &config.snapshot_output {
            store::write_document(path, &base)?;
        }

        let targets = TargetNames::new(config.targets.iter().cloned());
        let aggregator = Aggregator::new(&self.source, config.concurrency, config.task_timeout());

        let (mut aggregate, secondary) = tokio::join!(
            aggregator.aggregate(&config.sources, &targets),
            self.load_secondary()
        );

        // without a secondary document, surviving placeholders still get reported
        let resolution = if config.spider_url.is_some()
            || has_placeholder(&aggregate.sites, &config.placeholder)
        {
            Some(resolve_placeholders(
                secondary.as_ref(),
                &config.placeholder,
                &mut aggregate.sites,
            ))
        } else {
            None
        };
        if let Some(Resolution::Skipped { reason }) = &resolution {
            warn!("Placeholder '{}' left in aggregated sites: {}", config.placeholder, reason);
        }

        if let Some(path) = &config.aggregated_output {
            store::write_document(path, &aggregate.sites)?;
        }

        let spider_renamed = match &config.spider {
            Some(spider) => rename_key(&mut base, SPIDER_KEY, spider),
            None => false,
        };
        let substitutions = substitute(&mut base, &config.replacements);

        let aggregated = aggregate.sites.len();
        let mut insert_errors = Vec::new();

        let inserted = if aggregated == 0 {
            0
        } else {
            match insert_sites(&mut base, aggregate.sites, config.insert_index) {
                Ok(count) => count,
                Err(e) => {
                    warn!("Aggregated sites not inserted: {}", e);
                    insert_errors.push(format!("aggregated sites: {}", e));
                    0
                }
            }
        };

        let mut extra_inserted = 0;
        for (i, site) in config.extra_sites.iter().enumerate() {
            let index = config.insert_index + inserted + extra_inserted;
            match insert_site(&mut base, site.clone(), index) {
                Ok(count) => extra_inserted += count,
                Err(e) => {
                    warn!("Extra site #{} not inserted: {}", i, e);
                    insert_errors.push(format!("extra site #{}: {}", i, e));
                }
            }
        }

        store::write_document(&config.output, &base)?;

        let total_sites = base
            .get(SITES_KEY)
            .and_then(Value::as_array)
            .map_or(0, Vec::len);

        let report = RunReport {
            started_at,
            finished_at: Local::now(),
            output: config.output.clone(),
            aggregated,
            inserted,
            extra_inserted,
            missing: aggregate.missing,
            failed_sources: aggregate.failed_sources,
            duplicates_dropped: aggregate.duplicates_dropped,
            resolution,
            spider_renamed,
            substitutions,
            insert_errors,
            total_sites,
        };

        info!(
            "Run complete: {} inserted, {} extra, {} total sites",
            report.inserted, report.extra_inserted, report.total_sites
        );
        Ok(report)
    }

    async fn load_base(&self) -> Result<Value> {
        let base = self.config.base.trim();

        if is_remote(base) {
            let (url, _) = split_source_url(base);
            self.source.fetch_document(url).await.map_err(|e| {
                error!("Base document {} unavailable: {}", url, e);
                Error::BaseUnavailable(format!("{}: {}", url, e))
            })
        } else {
            store::read_document(Path::new(base))
        }
    }

    async fn load_secondary(&self) -> Option<Value> {
        let (url, _) = split_source_url(self.config.spider_url.as_deref()?.trim());
        match self.source.fetch_document(url).await {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!("Secondary document {} unavailable: {}", url, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RunReport {
        RunReport {
            started_at: Local::now(),
            finished_at: Local::now(),
            output: PathBuf::from("merged.json"),
            aggregated: 2,
            inserted: 2,
            extra_inserted: 1,
            missing: vec![],
            failed_sources: vec![],
            duplicates_dropped: 0,
            resolution: None,
            spider_renamed: false,
            substitutions: 0,
            insert_errors: vec![],
            total_sites: 10,
        }
    }

    #[test]
    fn test_clean_report() {
        let report = report();
        assert!(!report.is_degraded());
        assert_eq!(report.title(), "site-merger: 2 sites merged");
        assert!(report.summary().contains("total: 10"));
    }

    #[test]
    fn test_degraded_report() {
        let mut report = report();
        report.missing.push("Emby".to_string());
        report.failed_sources.push(FailedSource {
            url: "http://a/tv".to_string(),
            reason: "HTTP error 500".to_string(),
        });
        report.resolution = Some(Resolution::Skipped {
            reason: "secondary document unavailable".to_string(),
        });

        assert!(report.is_degraded());
        assert!(report.title().contains("with warnings"));
        let summary = report.summary();
        assert!(summary.contains("not found: Emby"));
        assert!(summary.contains("failed: http://a/tv"));
        assert!(summary.contains("placeholders unresolved"));
    }
}
