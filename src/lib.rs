//! site-merger - Site Config Aggregator
//!
//! This crate assembles one site configuration document out of many: it pulls
//! the wanted `sites` entries from a list of remote JSON documents, resolves
//! placeholder values, rewrites strings, and splices the result into a base
//! document at a fixed position.
//!
//! # Features
//!
//! - **Concurrent aggregation**: bounded fan-out over all sources, first-seen name wins
//! - **Fragment fields**: `url#key:value` annotations overlaid on a source's entries
//! - **Payload decoding**: plain JSON or base64-wrapped/embedded JSON
//! - **Merge engine**: key rename, recursive substitution, positional insertion
//! - **Notifications**: run summary pushed to an HTTP endpoint
//!
//! # Architecture
//!
//! ```text
//! sources ──▶ SiteClient ──▶ Extractor ──▶ Aggregator ──▶ Resolver
//!                                                            │
//!   base ─────────────────────────────────────────────▶ Merge Engine ──▶ store
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use site_merger::{Pipeline, RunConfig, SiteClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::builder("http://ok321.top/tv")
//!         .source("https://example.com/tv.json#jar:custom")
//!         .target("Emby")
//!         .output("merged.json")
//!         .build();
//!
//!     let client = SiteClient::new(&config.fetch_options())?;
//!     let report = Pipeline::new(config, client).run().await?;
//!
//!     println!("Inserted {} sites", report.inserted);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod aggregate;
pub mod config;
pub mod error;
pub mod extraction;
pub mod fetch;
pub mod merge;
pub mod notify;
pub mod pipeline;
pub mod resolve;
pub mod store;

// Re-exports for convenience
pub use aggregate::{AggregateReport, Aggregator};
pub use config::RunConfig;
pub use error::{Error, Result};
pub use extraction::{extract_sites, FragmentFields, TargetNames};
pub use fetch::{DocumentSource, SiteClient};
pub use merge::ReplacementMap;
pub use notify::Notifier;
pub use pipeline::{Pipeline, RunReport};
pub use resolve::Resolution;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
