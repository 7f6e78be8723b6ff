//! Engine tunables.

use serde::{Deserialize, Serialize};

use crate::fold_rules::{FoldRule, FoldRuleSet};

/// Reports needed to fold a comment when no rule table is configured.
pub const DEFAULT_FOLD_REPORT_THRESHOLD: usize = 3;
/// Size of a hot snapshot.
pub const DEFAULT_HOT_TOP_K: usize = 10;
/// Longest accepted comment, in characters.
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 2000;
/// Comments shorter than this are flagged as low risk.
pub const DEFAULT_MIN_CONTENT_CHARS: usize = 5;

/// Tunables of the comment engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Report count of the implicit fold rule.
    pub fold_report_threshold: usize,
    /// Comments kept in a target's hot snapshot.
    pub hot_top_k: usize,
    /// Longer comments are rejected.
    pub max_content_chars: usize,
    /// Shorter comments are accepted but marked low risk.
    pub min_content_chars: usize,
    /// Explicit rule table. When empty, a single report-count rule at
    /// `fold_report_threshold` applies.
    pub fold_rules: Vec<FoldRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fold_report_threshold: DEFAULT_FOLD_REPORT_THRESHOLD,
            hot_top_k: DEFAULT_HOT_TOP_K,
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
            fold_rules: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// The fold rule table in effect.
    pub fn fold_rule_set(&self) -> FoldRuleSet {
        if self.fold_rules.is_empty() {
            FoldRuleSet::with_report_threshold(self.fold_report_threshold)
        } else {
            FoldRuleSet::new(self.fold_rules.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"hot_top_k": 5}"#).expect("partial config parses");
        assert_eq!(config.hot_top_k, 5);
        assert_eq!(config.fold_report_threshold, 3);
        assert_eq!(config.fold_rule_set().report_threshold(), Some(3));
    }
}
