//! Pattern threat scorer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::ScorerConfig;
use crate::normalize::normalize;
use crate::patterns::{
    METHOD_OVERRIDE_HEADER, RESERVED_POLLUTION_KEYS, SCANNED_HEADERS, STRING_PATTERN_SETS,
    ThreatCategory,
};

/// Longest signal detail retained; details are logged, never sent to clients.
const MAX_DETAIL_LEN: usize = 64;

/// One category hit on one extracted string or structural check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatSignal {
    /// The category that matched.
    pub category: ThreatCategory,
    /// Score contributed by this signal.
    pub score: u32,
    /// Truncated evidence, for operator logs only.
    pub detail: String,
}

/// Accumulated verdict for one request.
///
/// The total is an unbounded sum; every matching string contributes its
/// category weight independently, with no cross-string deduplication.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreVerdict {
    /// Sum of all signal scores.
    pub total: u32,
    /// Individual signals.
    pub signals: Vec<ThreatSignal>,
}

impl ScoreVerdict {
    /// Distinct categories present, in first-hit order.
    #[must_use]
    pub fn categories(&self) -> Vec<ThreatCategory> {
        let mut seen = Vec::new();
        for signal in &self.signals {
            if !seen.contains(&signal.category) {
                seen.push(signal.category);
            }
        }
        seen
    }

    /// Resolve the verdict into a disposition under the given thresholds.
    #[must_use]
    pub fn disposition(&self, config: &ScorerConfig) -> Disposition {
        if self.total >= config.block_threshold {
            Disposition::Block
        } else if self.total >= config.warn_threshold {
            Disposition::Warn
        } else if self.total >= config.monitor_threshold {
            Disposition::Monitor
        } else {
            Disposition::Clean
        }
    }
}

/// What the pipeline should do with a scored request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Reject with 403 and the category list.
    Block,
    /// Allow, but attach the score for downstream scrutiny.
    Warn,
    /// Allow and log.
    Monitor,
    /// No action.
    Clean,
}

/// Request material handed to the scorer.
///
/// Query, params and body are arbitrary JSON trees; headers are restricted
/// to the scanner allowlist by the scorer itself.
#[derive(Debug, Clone, Default)]
pub struct ScanTarget {
    /// HTTP method.
    pub method: String,
    /// Raw (un-decoded) request path.
    pub raw_path: String,
    /// Parsed query parameters.
    pub query: Value,
    /// Parsed route parameters.
    pub params: Value,
    /// Parsed body, already run through the pollution guard.
    pub body: Value,
    /// Reserved keys the pollution guard removed from the body.
    ///
    /// The guard strips the keys before the scorer ever sees the tree, so
    /// their presence has to be reported out-of-band to count toward the
    /// pollution score.
    pub removed_keys: Vec<String>,
    /// Request headers (lowercase names).
    pub headers: Vec<(String, String)>,
}

/// Classifies extracted request strings against the category pattern sets.
#[derive(Debug)]
pub struct ThreatScorer {
    config: ScorerConfig,
}

impl ThreatScorer {
    /// Create a scorer with the given configuration.
    #[must_use]
    pub const fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    /// Create a scorer with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ScorerConfig::default())
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Score a request.
    #[must_use]
    pub fn score(&self, target: &ScanTarget) -> ScoreVerdict {
        let weights = &self.config.weights;
        let mut signals = Vec::new();

        // Structural checks, each independent of the pattern sets. Keys
        // the guard already stripped count the same as keys still present.
        let mut reserved = reserved_keys_present(&target.body, self.config.max_extraction_depth);
        for key in &target.removed_keys {
            if !reserved.contains(key) {
                reserved.push(key.clone());
            }
        }
        for key in reserved {
            signals.push(ThreatSignal {
                category: ThreatCategory::PrototypePollution,
                score: weights.prototype_pollution,
                detail: key,
            });
        }

        if target
            .headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(METHOD_OVERRIDE_HEADER))
        {
            signals.push(ThreatSignal {
                category: ThreatCategory::MethodOverride,
                score: weights.method_override,
                detail: METHOD_OVERRIDE_HEADER.to_string(),
            });
        }

        let body_size = serde_json::to_string(&target.body).map_or(0, |s| s.len());
        if body_size > self.config.body_size_threshold {
            signals.push(ThreatSignal {
                category: ThreatCategory::OversizedBody,
                score: weights.oversized_body,
                detail: format!("{body_size} bytes"),
            });
        }

        if target.raw_path.contains('\0') || target.raw_path.contains("%00") {
            signals.push(ThreatSignal {
                category: ThreatCategory::NulInPath,
                score: weights.nul_in_path,
                detail: truncate(&target.raw_path),
            });
        }

        // Pattern checks over every extracted string. A category fires at
        // most once per string; separate strings each contribute.
        for raw in self.extract_all(target) {
            let normalized = normalize(&raw);
            if normalized.is_empty() {
                continue;
            }
            for (category, set) in STRING_PATTERN_SETS.iter() {
                if set.iter().any(|re| re.is_match(&normalized)) {
                    signals.push(ThreatSignal {
                        category: *category,
                        score: weights.weight(*category),
                        detail: truncate(&normalized),
                    });
                }
            }
        }

        if let Some(cap) = self.config.per_category_cap {
            apply_category_cap(&mut signals, cap);
        }

        let total = signals.iter().map(|s| s.score).sum();
        let verdict = ScoreVerdict { total, signals };
        if verdict.total > 0 {
            debug!(
                total = verdict.total,
                categories = ?verdict.categories(),
                path = %target.raw_path,
                "request scored"
            );
        }
        verdict
    }

    /// Flatten the scannable parts of the request into strings.
    fn extract_all(&self, target: &ScanTarget) -> Vec<String> {
        let depth = self.config.max_extraction_depth;
        let mut out = Vec::new();

        out.push(target.raw_path.clone());
        extract_strings(&target.query, depth, &mut out);
        extract_strings(&target.params, depth, &mut out);
        extract_strings(&target.body, depth, &mut out);

        for (name, value) in &target.headers {
            if SCANNED_HEADERS
                .iter()
                .any(|allowed| name.eq_ignore_ascii_case(allowed))
            {
                out.push(value.clone());
            }
        }
        out
    }
}

/// Recursively collect string values (and object keys, which carry NoSQL
/// operator payloads) from a JSON tree, hard-capped at `depth` levels.
pub fn extract_strings(value: &Value, depth: usize, out: &mut Vec<String>) {
    if depth == 0 {
        return;
    }
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                extract_strings(item, depth - 1, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                out.push(key.clone());
                extract_strings(item, depth - 1, out);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Reserved pollution key names present anywhere in the body's key set.
fn reserved_keys_present(body: &Value, depth: usize) -> Vec<String> {
    let mut found = Vec::new();
    collect_reserved(body, depth, &mut found);
    found.dedup();
    found
}

fn collect_reserved(value: &Value, depth: usize, found: &mut Vec<String>) {
    if depth == 0 {
        return;
    }
    match value {
        Value::Object(map) => {
            for (key, item) in map {
                if RESERVED_POLLUTION_KEYS.contains(&key.as_str())
                    && !found.contains(key)
                {
                    found.push(key.clone());
                }
                collect_reserved(item, depth - 1, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_reserved(item, depth - 1, found);
            }
        }
        _ => {}
    }
}

/// Clamp each category's summed contribution to `cap`, dropping the
/// overflowing portion of later signals.
fn apply_category_cap(signals: &mut Vec<ThreatSignal>, cap: u32) {
    let mut running: std::collections::HashMap<ThreatCategory, u32> =
        std::collections::HashMap::new();
    signals.retain_mut(|signal| {
        let used = running.entry(signal.category).or_insert(0);
        let available = cap.saturating_sub(*used);
        if available == 0 {
            return false;
        }
        signal.score = signal.score.min(available);
        *used += signal.score;
        true
    });
}

fn truncate(s: &str) -> String {
    s.chars().take(MAX_DETAIL_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target_with_body(body: Value) -> ScanTarget {
        ScanTarget {
            method: "POST".into(),
            raw_path: "/api/login".into(),
            body,
            ..ScanTarget::default()
        }
    }

    // ==================== Pattern Scoring ====================

    #[test]
    fn test_sql_payload_scores_sql_category() {
        let scorer = ThreatScorer::with_defaults();
        let verdict = scorer.score(&target_with_body(json!({
            "username": "admin",
            "password": "' OR '1'='1",
        })));

        assert!(verdict.categories().contains(&ThreatCategory::SqlInjection));
        assert_eq!(
            verdict
                .signals
                .iter()
                .filter(|s| s.category == ThreatCategory::SqlInjection)
                .map(|s| s.score)
                .next(),
            Some(scorer.config().weights.sql_injection)
        );
    }

    #[test]
    fn test_encoded_payload_still_scores() {
        let scorer = ThreatScorer::with_defaults();
        let verdict = scorer.score(&target_with_body(json!({
            "q": "%3Cscript%3Ealert(1)%3C%2Fscript%3E",
        })));
        assert!(verdict.categories().contains(&ThreatCategory::Xss));
    }

    #[test]
    fn test_repeated_payloads_score_repeatedly() {
        let scorer = ThreatScorer::with_defaults();
        let single = scorer.score(&target_with_body(json!({
            "a": "' OR '1'='1",
        })));
        let double = scorer.score(&target_with_body(json!({
            "a": "' OR '1'='1",
            "b": "' OR '1'='1",
        })));
        assert_eq!(double.total, single.total * 2);
    }

    #[test]
    fn test_per_category_cap_bounds_repeats() {
        let config = ScorerConfig {
            per_category_cap: Some(30),
            ..ScorerConfig::default()
        };
        let scorer = ThreatScorer::new(config);
        let verdict = scorer.score(&target_with_body(json!({
            "a": "' OR '1'='1",
            "b": "' OR '1'='1",
            "c": "' OR '1'='1",
        })));
        assert_eq!(verdict.total, 30);
    }

    #[test]
    fn test_benign_request_is_clean() {
        let scorer = ThreatScorer::with_defaults();
        let verdict = scorer.score(&target_with_body(json!({
            "name": "Alice Smith",
            "email": "alice@example.com",
            "age": 34,
        })));
        assert_eq!(verdict.total, 0);
        assert_eq!(verdict.disposition(scorer.config()), Disposition::Clean);
    }

    #[test]
    fn test_scanned_header_contributes() {
        let scorer = ThreatScorer::with_defaults();
        let target = ScanTarget {
            raw_path: "/".into(),
            headers: vec![("user-agent".into(), "<script>alert(1)</script>".into())],
            ..ScanTarget::default()
        };
        let verdict = scorer.score(&target);
        assert!(verdict.categories().contains(&ThreatCategory::Xss));
    }

    #[test]
    fn test_unlisted_header_ignored() {
        let scorer = ThreatScorer::with_defaults();
        let target = ScanTarget {
            raw_path: "/".into(),
            headers: vec![("x-custom".into(), "<script>alert(1)</script>".into())],
            ..ScanTarget::default()
        };
        assert_eq!(scorer.score(&target).total, 0);
    }

    #[test]
    fn test_depth_limit_bounds_extraction() {
        let scorer = ThreatScorer::new(ScorerConfig {
            max_extraction_depth: 2,
            ..ScorerConfig::default()
        });
        // Payload nested below the cap is not scanned
        let verdict = scorer.score(&target_with_body(json!({
            "a": { "b": { "c": { "d": "' OR '1'='1" } } },
        })));
        assert!(!verdict.categories().contains(&ThreatCategory::SqlInjection));
    }

    // ==================== Structural Checks ====================

    #[test]
    fn test_reserved_key_scores_max_weight() {
        let scorer = ThreatScorer::with_defaults();
        let verdict = scorer.score(&target_with_body(json!({
            "__proto__": { "admin": true },
        })));
        assert!(
            verdict
                .categories()
                .contains(&ThreatCategory::PrototypePollution)
        );
        assert!(verdict.total >= scorer.config().weights.prototype_pollution);
        assert_eq!(verdict.disposition(scorer.config()), Disposition::Block);
    }

    #[test]
    fn test_removed_keys_score_like_present_keys() {
        let scorer = ThreatScorer::with_defaults();
        let target = ScanTarget {
            removed_keys: vec!["__proto__".to_string()],
            ..target_with_body(json!({ "name": "mallory" }))
        };
        let verdict = scorer.score(&target);
        assert!(
            verdict
                .categories()
                .contains(&ThreatCategory::PrototypePollution)
        );
        assert_eq!(verdict.disposition(scorer.config()), Disposition::Block);
    }

    #[test]
    fn test_removed_key_not_double_counted_with_present_key() {
        let scorer = ThreatScorer::with_defaults();
        let target = ScanTarget {
            removed_keys: vec!["__proto__".to_string()],
            ..target_with_body(json!({ "__proto__": { "admin": true } }))
        };
        let verdict = scorer.score(&target);
        let pollution_hits = verdict
            .signals
            .iter()
            .filter(|s| s.category == ThreatCategory::PrototypePollution)
            .count();
        assert_eq!(pollution_hits, 1);
    }

    #[test]
    fn test_method_override_header_scores() {
        let scorer = ThreatScorer::with_defaults();
        let target = ScanTarget {
            raw_path: "/".into(),
            headers: vec![("x-http-method-override".into(), "DELETE".into())],
            ..ScanTarget::default()
        };
        let verdict = scorer.score(&target);
        assert!(verdict.categories().contains(&ThreatCategory::MethodOverride));
    }

    #[test]
    fn test_oversized_body_scores() {
        let scorer = ThreatScorer::new(ScorerConfig {
            body_size_threshold: 64,
            ..ScorerConfig::default()
        });
        let verdict = scorer.score(&target_with_body(json!({
            "blob": "x".repeat(200),
        })));
        assert!(verdict.categories().contains(&ThreatCategory::OversizedBody));
    }

    #[test]
    fn test_nul_in_path_scores() {
        let scorer = ThreatScorer::with_defaults();
        let target = ScanTarget {
            raw_path: "/files/report%00.pdf".into(),
            ..ScanTarget::default()
        };
        let verdict = scorer.score(&target);
        assert!(verdict.categories().contains(&ThreatCategory::NulInPath));
    }

    // ==================== Dispositions ====================

    #[test]
    fn test_disposition_thresholds() {
        let config = ScorerConfig::default();
        let verdict = |total| ScoreVerdict {
            total,
            signals: Vec::new(),
        };
        assert_eq!(verdict(0).disposition(&config), Disposition::Clean);
        assert_eq!(
            verdict(config.monitor_threshold).disposition(&config),
            Disposition::Monitor
        );
        assert_eq!(
            verdict(config.warn_threshold).disposition(&config),
            Disposition::Warn
        );
        assert_eq!(
            verdict(config.block_threshold).disposition(&config),
            Disposition::Block
        );
    }

    #[test]
    fn test_categories_deduplicated_in_order() {
        let verdict = ScoreVerdict {
            total: 90,
            signals: vec![
                ThreatSignal {
                    category: ThreatCategory::Xss,
                    score: 25,
                    detail: String::new(),
                },
                ThreatSignal {
                    category: ThreatCategory::SqlInjection,
                    score: 30,
                    detail: String::new(),
                },
                ThreatSignal {
                    category: ThreatCategory::Xss,
                    score: 25,
                    detail: String::new(),
                },
            ],
        };
        assert_eq!(
            verdict.categories(),
            vec![ThreatCategory::Xss, ThreatCategory::SqlInjection]
        );
    }

    // ==================== Extraction ====================

    #[test]
    fn test_extract_strings_includes_keys() {
        let mut out = Vec::new();
        extract_strings(&json!({ "$ne": "1" }), 4, &mut out);
        assert!(out.contains(&"$ne".to_string()));
        assert!(out.contains(&"1".to_string()));
    }

    #[test]
    fn test_extract_strings_skips_scalars() {
        let mut out = Vec::new();
        extract_strings(&json!({ "n": 42, "b": true, "x": null }), 4, &mut out);
        out.sort();
        assert_eq!(out, vec!["b".to_string(), "n".to_string(), "x".to_string()]);
    }
}
