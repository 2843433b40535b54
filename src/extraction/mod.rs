//! Site extraction module
//!
//! This module turns fetched site documents into the entries a run wants,
//! including the per-source fields carried in URL fragments.

pub mod fragment;
pub mod sites;

pub use fragment::{split_source_url, FragmentFields};
pub use sites::{extract_sites, site_name, TargetNames, NAME_KEY, SITES_KEY};
