//! Pipeline orchestration and domain logic for paperdigest.
//!
//! Ties together document fetch, section-tree parsing, keyword-guided
//! extraction, the linked-page crawl and asset downloads into end-to-end
//! workflows (`ingest_paper`, `ingest_batch`).

pub mod keywords;
pub mod pipeline;

pub use keywords::{
    parse_suggestion_reply, DefaultKeywords, KeywordRequest, KeywordSource, KeywordSuggestion,
};
pub use pipeline::{
    ingest_batch, ingest_paper, BatchOutcome, IngestConfig, IngestReport, SectionExtracts,
};
