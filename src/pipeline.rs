use metrics::{counter, histogram};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::constants::{format_count, DEFAULT_PROGRESS_EVERY};
use crate::error::Result;
use crate::jsonl::{parse_line, JsonObject, JsonlSink, JsonlSource};

/// Why an input line produced no output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipReason {
    /// Empty or whitespace-only line
    Blank,
    InvalidUtf8,
    MalformedJson,
    /// Valid JSON that is not an object
    NotAnObject,
    /// Key field absent, not a string, or empty where emptiness matters
    MissingKey,
    /// Key already emitted earlier in the run
    Duplicate,
    MissingName,
    MissingScore,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Blank => "blank",
            SkipReason::InvalidUtf8 => "invalid_utf8",
            SkipReason::MalformedJson => "malformed_json",
            SkipReason::NotAnObject => "not_an_object",
            SkipReason::MissingKey => "missing_key",
            SkipReason::Duplicate => "duplicate",
            SkipReason::MissingName => "missing_name",
            SkipReason::MissingScore => "missing_score",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage decided for one parsed record.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision<T> {
    Emit(T),
    Skip(SkipReason),
}

/// Final outcome of one input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Written,
    Skipped(SkipReason),
}

/// Per-record decision logic plugged into [`run_stage`].
pub trait RecordStage {
    type Output: Serialize;

    /// Short label used in logs and metrics.
    fn tool_name(&self) -> &'static str;

    fn decide(&mut self, record: JsonObject) -> Decision<Self::Output>;
}

/// Counters for one run. Every input line lands in exactly one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: u64,
    pub written: u64,
    skipped: BTreeMap<SkipReason, u64>,
}

impl RunStats {
    pub fn record(&mut self, outcome: LineOutcome) {
        self.total += 1;
        match outcome {
            LineOutcome::Written => self.written += 1,
            LineOutcome::Skipped(reason) => *self.skipped.entry(reason).or_insert(0) += 1,
        }
    }

    pub fn skipped(&self, reason: SkipReason) -> u64 {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    pub fn total_skipped(&self) -> u64 {
        self.skipped.values().sum()
    }

    /// Non-zero skip counts in reason order.
    pub fn skip_breakdown(&self) -> impl Iterator<Item = (SkipReason, u64)> + '_ {
        self.skipped.iter().map(|(reason, count)| (*reason, *count))
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lines={} written={} skipped={}",
            format_count(self.total),
            format_count(self.written),
            format_count(self.total_skipped())
        )?;
        for (reason, count) in self.skip_breakdown() {
            write!(f, "\n  {}: {}", reason, format_count(count))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Flush the sink after every N written records.
    pub flush_every: Option<u64>,
    /// Emit an info-level progress line after every N input lines.
    pub progress_every: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            flush_every: None,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

/// Drive `stage` over every line of `source`, writing emitted records to `sink`.
///
/// Only I/O and serialization failures abort the run; everything else is
/// counted as a skip. The sink is flushed before returning.
pub fn run_stage<R, W, S>(
    source: &mut JsonlSource<R>,
    sink: &mut JsonlSink<W>,
    stage: &mut S,
    options: &RunOptions,
) -> Result<RunStats>
where
    R: BufRead,
    W: Write,
    S: RecordStage,
{
    let tool = stage.tool_name();
    let started = Instant::now();
    let progress_every = options.progress_every.max(1);
    let mut stats = RunStats::default();

    while let Some(raw) = source.next_line()? {
        let outcome = match parse_line(raw) {
            Err(reason) => LineOutcome::Skipped(reason),
            Ok(record) => match stage.decide(record) {
                Decision::Emit(output) => {
                    sink.write_record(&output)?;
                    LineOutcome::Written
                }
                Decision::Skip(reason) => LineOutcome::Skipped(reason),
            },
        };

        if let LineOutcome::Skipped(reason) = outcome {
            debug!(tool, line = source.line_number(), %reason, "Skipping line");
        }
        stats.record(outcome);

        if stats.total % progress_every == 0 {
            info!(
                tool,
                lines = stats.total,
                written = stats.written,
                "Processed {} lines",
                format_count(stats.total)
            );
        }
    }

    sink.flush()?;

    let elapsed = started.elapsed().as_secs_f64();
    counter!("jsonl_lines_total", "tool" => tool).increment(stats.total);
    counter!("jsonl_records_written_total", "tool" => tool).increment(stats.written);
    for (reason, count) in stats.skip_breakdown() {
        counter!("jsonl_records_skipped_total", "tool" => tool, "reason" => reason.as_str())
            .increment(count);
    }
    histogram!("jsonl_run_duration_seconds", "tool" => tool).record(elapsed);

    info!(
        tool,
        lines = stats.total,
        written = stats.written,
        skipped = stats.total_skipped(),
        elapsed_secs = elapsed,
        "Run complete"
    );
    Ok(stats)
}

/// Open `input`, create (truncate) `output`, and run `stage` between them.
///
/// The input is opened first so a missing input never clobbers the output.
#[instrument(skip(stage, options), fields(tool = stage.tool_name()))]
pub fn run_files<S: RecordStage>(
    stage: &mut S,
    input: &Path,
    output: &Path,
    options: &RunOptions,
) -> Result<RunStats> {
    let mut source = JsonlSource::open(input)?;
    let mut sink = JsonlSink::create(output, options.flush_every)?;
    info!("Reading {} -> {}", input.display(), output.display());
    run_stage(&mut source, &mut sink, stage, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::io::Cursor;

    /// Emits the "id" field of records that have one.
    struct IdStage;

    impl RecordStage for IdStage {
        type Output = Value;

        fn tool_name(&self) -> &'static str {
            "test"
        }

        fn decide(&mut self, record: JsonObject) -> Decision<Value> {
            match record.get("id") {
                Some(id) => Decision::Emit(id.clone()),
                None => Decision::Skip(SkipReason::MissingKey),
            }
        }
    }

    fn run(input: &str) -> (RunStats, String) {
        let mut source = JsonlSource::new(Cursor::new(input.to_string()), "mem-in");
        let mut sink = JsonlSink::new(Vec::new(), "mem-out", None);
        let stats =
            run_stage(&mut source, &mut sink, &mut IdStage, &RunOptions::default()).unwrap();
        (stats, String::from_utf8(sink.into_inner()).unwrap())
    }

    #[test]
    fn every_line_lands_in_one_bucket() {
        let (stats, out) = run("{\"id\":1}\n\n{not valid\n[]\n{\"x\":2}\n{\"id\":\"b\"}\n");
        assert_eq!(stats.total, 6);
        assert_eq!(stats.written, 2);
        assert_eq!(stats.skipped(SkipReason::Blank), 1);
        assert_eq!(stats.skipped(SkipReason::MalformedJson), 1);
        assert_eq!(stats.skipped(SkipReason::NotAnObject), 1);
        assert_eq!(stats.skipped(SkipReason::MissingKey), 1);
        assert_eq!(stats.total, stats.written + stats.total_skipped());
        assert_eq!(out, "1\n\"b\"\n");
    }

    #[test]
    fn empty_input_produces_empty_stats() {
        let (stats, out) = run("");
        assert_eq!(stats, RunStats::default());
        assert!(out.is_empty());
    }

    #[test]
    fn stats_display_lists_reasons() {
        let mut stats = RunStats::default();
        stats.record(LineOutcome::Written);
        stats.record(LineOutcome::Skipped(SkipReason::Duplicate));
        stats.record(LineOutcome::Skipped(SkipReason::Duplicate));
        assert_eq!(stats.to_string(), "lines=3 written=1 skipped=2\n  duplicate: 2");
    }
}
