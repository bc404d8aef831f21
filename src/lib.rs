pub mod config;
pub mod constants;
pub mod dedupe;
pub mod error;
pub mod extract;
pub mod jsonl;
pub mod logging;
pub mod pipeline;

pub use config::Config;
pub use dedupe::{dedupe_file, DedupeSummary, Deduplicator};
pub use error::{Result, ToolError};
pub use extract::{extract_file, ExtractSummary, Extractor, MinimalEntry};
pub use pipeline::{Decision, LineOutcome, RecordStage, RunStats, SkipReason};
