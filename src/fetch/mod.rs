//! Remote document fetching module
//!
//! HTTP retrieval of site documents and decoding of their payloads.

pub mod client;
pub mod decode;

pub use client::{
    is_remote, validate_url, DocumentSource, FetchOptions, SiteClient, DEFAULT_TIMEOUT_SECS,
    DEFAULT_USER_AGENT,
};
pub use decode::decode_payload;
