//! Asset crawling for PaperDigest.
//!
//! This crate provides:
//! - [`PageClient`]: HTTP client with retry/backoff
//! - [`PrimaryScan`] + [`fetch_document`]: streamed primary-document scan
//! - [`resolve_frontier`]: bounded two-category linked-page crawl
//! - [`download_all`]: concurrent, validated asset downloads

pub mod client;
pub mod discover;
pub mod download;
pub mod filter;

pub use client::PageClient;
pub use discover::{
    fetch_document, resolve_frontier, CrawlOutcome, CrawlState, Frontier, FrontierSlot,
    LinkCategory, PrimaryScan,
};
pub use download::{download_all, DownloadOptions, DownloadReport};
