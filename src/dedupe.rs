//! Keep the first record for each key, drop the rest.

use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::config::Config;
use crate::constants::{format_count, CODE_FIELD, DEDUPE_TOOL};
use crate::error::Result;
use crate::jsonl::JsonObject;
use crate::pipeline::{run_files, Decision, RecordStage, RunOptions, RunStats, SkipReason};

/// Seen-set filter over a string key field.
///
/// Keys are compared exactly: `"0123"` and `"123"`, or `"A"` and `" A"`, are
/// different keys.
pub struct Deduplicator {
    key_field: String,
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new(key_field: impl Into<String>) -> Self {
        Self {
            key_field: key_field.into(),
            seen: HashSet::new(),
        }
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(CODE_FIELD)
    }
}

impl RecordStage for Deduplicator {
    type Output = JsonObject;

    fn tool_name(&self) -> &'static str {
        DEDUPE_TOOL
    }

    fn decide(&mut self, record: JsonObject) -> Decision<JsonObject> {
        let key = match record.get(&self.key_field) {
            Some(Value::String(key)) => key,
            _ => return Decision::Skip(SkipReason::MissingKey),
        };
        if self.seen.contains(key) {
            return Decision::Skip(SkipReason::Duplicate);
        }
        self.seen.insert(key.clone());
        Decision::Emit(record)
    }
}

/// Result of a dedupe run. Everything not kept counts as dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupeSummary {
    pub stats: RunStats,
}

impl DedupeSummary {
    pub fn total(&self) -> u64 {
        self.stats.total
    }

    pub fn kept(&self) -> u64 {
        self.stats.written
    }

    pub fn dropped(&self) -> u64 {
        self.stats.total - self.stats.written
    }
}

impl fmt::Display for DedupeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Read {} entries, kept {} unique codes, dropped {} duplicates.",
            format_count(self.total()),
            format_count(self.kept()),
            format_count(self.dropped())
        )
    }
}

/// Deduplicate `input` into `output` by the configured key field.
pub fn dedupe_file(input: &Path, output: &Path, config: &Config) -> Result<DedupeSummary> {
    let mut stage = Deduplicator::new(config.dedupe.key_field.clone());
    let options = RunOptions {
        flush_every: None,
        progress_every: config.run.progress_every,
    };
    let stats = run_files(&mut stage, input, output, &options)?;
    Ok(DedupeSummary { stats })
}
