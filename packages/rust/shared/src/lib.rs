//! Shared foundation for PaperDigest.
//!
//! Provides:
//! - Core domain types ([`Paper`], [`SectionNode`], [`AssetCandidate`], ...)
//! - The error type ([`PaperdigestError`]) and [`Result`] alias
//! - Application configuration loading ([`AppConfig`])
//! - The [`ProgressReporter`] seam used by the crawler and pipeline

pub mod config;
pub mod error;
pub mod progress;
pub mod types;

pub use config::{init_config, load_config, AppConfig, FetchConfig};
pub use error::{PaperdigestError, Result};
pub use progress::{ProgressReporter, SilentProgress};
pub use types::{
    AssetCandidate, AssetSource, DownloadedAsset, Figure, Paper, PaperLinks, SectionNode, Table,
};
