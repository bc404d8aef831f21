//! Slim a product dump down to `{code, score, name}` entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::config::Config;
use crate::constants::{
    format_count, BRANDS_FIELD, CODE_FIELD, EXTRACT_TOOL, LEGACY_SCORE_FIELD, NAME_FIELDS,
    NUTRISCORE_DATA_FIELD, NUTRISCORE_DATA_SCORE_FIELD, NUTRISCORE_FIELD,
};
use crate::error::Result;
use crate::jsonl::JsonObject;
use crate::pipeline::{run_files, Decision, RecordStage, RunOptions, RunStats, SkipReason};

/// One output line of the extractor. Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimalEntry {
    pub code: String,
    pub score: f64,
    pub name: String,
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then_some(trimmed)
        }
        _ => None,
    }
}

// A JSON boolean is an integer score: true is 1.0, false is 0.0
fn number(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Trimmed display name: product and generic names first, then the brand string.
pub fn choose_name(product: &JsonObject) -> Option<String> {
    NAME_FIELDS
        .iter()
        .chain(std::iter::once(&BRANDS_FIELD))
        .find_map(|field| non_empty_str(product.get(*field)))
        .map(str::to_string)
}

/// First numeric score among the direct, nested and legacy score fields.
///
/// Booleans resolve to 1.0 or 0.0; a string or null is passed over, not fatal.
pub fn choose_score(product: &JsonObject) -> Option<f64> {
    number(product.get(NUTRISCORE_FIELD))
        .or_else(|| {
            product
                .get(NUTRISCORE_DATA_FIELD)
                .and_then(Value::as_object)
                .and_then(|data| number(data.get(NUTRISCORE_DATA_SCORE_FIELD)))
        })
        .or_else(|| number(product.get(LEGACY_SCORE_FIELD)))
}

/// Build the minimal entry for one product record.
pub fn extract_entry(product: &JsonObject) -> std::result::Result<MinimalEntry, SkipReason> {
    let code = non_empty_str(product.get(CODE_FIELD)).ok_or(SkipReason::MissingKey)?;
    let score = choose_score(product).ok_or(SkipReason::MissingScore)?;
    let name = choose_name(product).ok_or(SkipReason::MissingName)?;
    Ok(MinimalEntry {
        code: code.to_string(),
        score,
        name,
    })
}

#[derive(Debug, Default)]
pub struct Extractor;

impl RecordStage for Extractor {
    type Output = MinimalEntry;

    fn tool_name(&self) -> &'static str {
        EXTRACT_TOOL
    }

    fn decide(&mut self, record: JsonObject) -> Decision<MinimalEntry> {
        match extract_entry(&record) {
            Ok(entry) => Decision::Emit(entry),
            Err(reason) => Decision::Skip(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    pub stats: RunStats,
}

impl ExtractSummary {
    pub fn total(&self) -> u64 {
        self.stats.total
    }

    pub fn written(&self) -> u64 {
        self.stats.written
    }
}

impl fmt::Display for ExtractSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} products; wrote {} minimal entries.",
            format_count(self.total()),
            format_count(self.written())
        )
    }
}

/// Extract minimal entries from `input` into `output`.
pub fn extract_file(input: &Path, output: &Path, config: &Config) -> Result<ExtractSummary> {
    let options = RunOptions {
        flush_every: Some(config.extract.flush_every),
        progress_every: config.run.progress_every,
    };
    let stats = run_files(&mut Extractor, input, output, &options)?;
    Ok(ExtractSummary { stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn negative_nutriscore_is_kept() {
        let entry = extract_entry(&product(json!({
            "code": "3017620422003",
            "nutriscore_score": -1,
            "product_name": "Test"
        })))
        .unwrap();
        assert_eq!(entry.score, -1.0);
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            r#"{"code":"3017620422003","score":-1.0,"name":"Test"}"#
        );
    }

    #[test]
    fn empty_product_name_falls_back() {
        let p = product(json!({"product_name": "", "generic_name": "Fallback"}));
        assert_eq!(choose_name(&p).as_deref(), Some("Fallback"));
    }

    #[test]
    fn name_priority_order() {
        let p = product(json!({
            "brands": "Brand",
            "generic_name_en": "Generic EN",
            "product_name_en": "  Product EN  ",
            "product_name": "   "
        }));
        assert_eq!(choose_name(&p).as_deref(), Some("Product EN"));

        let p = product(json!({"brands": " Brand ", "product_name": 42}));
        assert_eq!(choose_name(&p).as_deref(), Some("Brand"));

        assert_eq!(choose_name(&product(json!({"brands": ""}))), None);
    }

    #[test]
    fn score_priority_order() {
        let p = product(json!({
            "nutriscore_score": 3,
            "nutriscore_data": {"score": 7},
            "nutrition_score_fr_100g": 9
        }));
        assert_eq!(choose_score(&p), Some(3.0));

        let p = product(json!({
            "nutriscore_score": "3",
            "nutriscore_data": {"score": 7.5},
            "nutrition_score_fr_100g": 9
        }));
        assert_eq!(choose_score(&p), Some(7.5));

        let p = product(json!({
            "nutriscore_data": "not an object",
            "nutrition_score_fr_100g": 9
        }));
        assert_eq!(choose_score(&p), Some(9.0));
    }

    #[test]
    fn booleans_count_as_integer_scores() {
        let p = product(json!({"nutriscore_score": true, "nutrition_score_fr_100g": 9}));
        assert_eq!(choose_score(&p), Some(1.0));

        let p = product(json!({"nutriscore_data": {"score": false}}));
        assert_eq!(choose_score(&p), Some(0.0));

        let entry = extract_entry(&product(json!({
            "code": "A",
            "nutriscore_score": true,
            "product_name": "X"
        })))
        .unwrap();
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            r#"{"code":"A","score":1.0,"name":"X"}"#
        );
    }

    #[test]
    fn nulls_are_not_scores() {
        let p = product(json!({"nutriscore_score": null, "nutriscore_data": {"score": null}}));
        assert_eq!(choose_score(&p), None);
    }

    #[test]
    fn missing_fields_map_to_reasons() {
        assert_eq!(
            extract_entry(&product(json!({"code": "  ", "nutriscore_score": 1, "brands": "B"}))),
            Err(SkipReason::MissingKey)
        );
        assert_eq!(
            extract_entry(&product(json!({"code": 12, "nutriscore_score": 1, "brands": "B"}))),
            Err(SkipReason::MissingKey)
        );
        assert_eq!(
            extract_entry(&product(json!({"code": "1", "nutriscore_score": 1}))),
            Err(SkipReason::MissingName)
        );
        assert_eq!(
            extract_entry(&product(json!({"code": "1", "brands": "B"}))),
            Err(SkipReason::MissingScore)
        );
    }

    #[test]
    fn code_is_trimmed() {
        let entry = extract_entry(&product(json!({
            "code": " 0042 ",
            "nutrition_score_fr_100g": 2.5,
            "brands": "B"
        })))
        .unwrap();
        assert_eq!(entry.code, "0042");
        assert_eq!(entry.score, 2.5);
    }

    #[test]
    fn summary_line() {
        let mut stats = RunStats::default();
        for _ in 0..1_500 {
            stats.record(crate::pipeline::LineOutcome::Written);
        }
        stats.record(crate::pipeline::LineOutcome::Skipped(SkipReason::MissingName));
        assert_eq!(
            ExtractSummary { stats }.to_string(),
            "Processed 1,501 products; wrote 1,500 minimal entries."
        );
    }
}
