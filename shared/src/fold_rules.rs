//! Configurable table of automatic fold rules.
//!
//! The table deserialises from JSON such as
//! `[{"name":"reports","kind":"report_count","threshold":3}]`. Only the
//! report-count rule has an evaluator; the other kinds are kept as data and
//! answer [`RuleOutcome::NotEvaluated`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// What a rule looks at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    /// Fold comments containing any of these words.
    Keyword {
        /// Words to look for.
        words: Vec<String>,
    },
    /// Fold comments with at most `max_likes` likes and at least
    /// `min_dislikes` dislikes.
    LowLike {
        /// Highest like count still considered low.
        max_likes: i64,
        /// Lowest dislike count that triggers the rule.
        min_dislikes: i64,
    },
    /// Fold a comment once it has collected `threshold` reports.
    ReportCount {
        /// Reports needed to fold.
        threshold: usize,
    },
    /// Fold comments of authors at or below `max_level`.
    UserLevel {
        /// Highest author level the rule applies to.
        max_level: u32,
    },
}

/// A named, switchable fold condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldRule {
    /// Identifier shown in logs.
    pub name: String,
    /// Condition and its parameters.
    #[serde(flatten)]
    pub kind: RuleKind,
    /// Disabled rules never fold.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Facts about a comment available when a rule runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleContext {
    /// Reports filed against the comment, including the current one.
    pub report_count: usize,
}

/// Answer of a single rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Hide the comment.
    Fold,
    /// Leave the comment visible.
    Keep,
    /// The rule kind has no evaluator.
    NotEvaluated,
}

impl FoldRule {
    /// Folds once `threshold` reports have been filed. A zero threshold counts as one.
    pub fn report_count(threshold: usize) -> Self {
        Self {
            name: "report_count".to_string(),
            kind: RuleKind::ReportCount { threshold: threshold.max(1) },
            enabled: true,
        }
    }

    /// Disabled rules answer `Keep`.
    pub fn evaluate(&self, ctx: &RuleContext) -> RuleOutcome {
        if !self.enabled {
            return RuleOutcome::Keep;
        }
        match &self.kind {
            RuleKind::ReportCount { threshold } => {
                if ctx.report_count >= *threshold {
                    RuleOutcome::Fold
                } else {
                    RuleOutcome::Keep
                }
            },
            RuleKind::Keyword { .. } | RuleKind::LowLike { .. } | RuleKind::UserLevel { .. } => {
                RuleOutcome::NotEvaluated
            },
        }
    }
}

/// Ordered rule table; the first rule answering `Fold` wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FoldRuleSet {
    rules: Vec<FoldRule>,
}

impl FoldRuleSet {
    /// Evaluates `rules` in the given order.
    pub fn new(rules: Vec<FoldRule>) -> Self {
        Self { rules }
    }

    /// A table holding only the report-count rule.
    pub fn with_report_threshold(threshold: usize) -> Self {
        Self::new(vec![FoldRule::report_count(threshold)])
    }

    /// Parses a JSON array of rules.
    pub fn from_json(raw: &str) -> Result<Self> {
        let rules: Vec<FoldRule> =
            serde_json::from_str(raw).context("failed to parse fold rule table")?;
        Ok(Self::new(rules))
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[FoldRule] {
        &self.rules
    }

    /// The first enabled rule that folds under `ctx`.
    pub fn first_match(&self, ctx: &RuleContext) -> Option<&FoldRule> {
        self.rules.iter().find(|rule| rule.evaluate(ctx) == RuleOutcome::Fold)
    }

    /// Lowest enabled report-count threshold, if the table has one.
    pub fn report_threshold(&self) -> Option<usize> {
        self.rules
            .iter()
            .filter(|rule| rule.enabled)
            .filter_map(|rule| match rule.kind {
                RuleKind::ReportCount { threshold } => Some(threshold),
                _ => None,
            })
            .min()
    }
}
