//! Field names and defaults shared by both tools.

// Key used for deduplication and emitted as the join key by the extractor
pub const CODE_FIELD: &str = "code";

/// Name candidates in priority order; the brand string is the last resort.
pub const NAME_FIELDS: [&str; 4] = [
    "product_name",
    "product_name_en",
    "generic_name",
    "generic_name_en",
];
pub const BRANDS_FIELD: &str = "brands";

// Score candidates, checked in this order
pub const NUTRISCORE_FIELD: &str = "nutriscore_score";
pub const NUTRISCORE_DATA_FIELD: &str = "nutriscore_data";
pub const NUTRISCORE_DATA_SCORE_FIELD: &str = "score";
pub const LEGACY_SCORE_FIELD: &str = "nutrition_score_fr_100g";

pub const DEFAULT_FLUSH_EVERY: u64 = 100_000;
pub const DEFAULT_PROGRESS_EVERY: u64 = 1_000_000;

// Tool labels used in logs and metrics
pub const DEDUPE_TOOL: &str = "dedupe";
pub const EXTRACT_TOOL: &str = "extract";

/// Format a count with comma thousands separators, e.g. `1234567` -> `1,234,567`.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
