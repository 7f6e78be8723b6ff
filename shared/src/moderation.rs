//! Rule-based content risk assessment for new comments.
//!
//! Every check can only raise the risk level; the verdict carries the maximum
//! across all checks that ran.

use serde::Serialize;

use crate::{
    model::{AuditStatus, RiskLevel, WordAction, SEVERITY_SERIOUS},
    word_matcher::{MatchResult, WordMatcher},
};

const DEFAULT_MIN_CHARS: usize = 5;
const DEFAULT_REPEAT_RUN: usize = 3;
const DEFAULT_SHOUT_RATIO: f64 = 0.8;

/// Why the risk level was raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum RiskReason {
    /// Content is shorter than the minimum length.
    TooShort {
        /// Character count of the content.
        chars: usize,
    },
    /// Words from the sensitive list matched.
    SensitiveWords {
        /// Matched surface forms.
        words: Vec<String>,
        /// Highest severity among the matches.
        highest_level: u8,
    },
    /// A serious word matched; the comment is rejected.
    SeriousWord {
        /// The first serious word found.
        word: String,
    },
    /// One character repeated several times in a row.
    RepeatedCharacters {
        /// The repeated character.
        ch: char,
        /// Length of the longest run.
        run: usize,
    },
    /// An `http://` or `https://` literal.
    UrlLiteral,
    /// Mostly upper-case letters.
    Shouting {
        /// Share of upper-case letters among alphabetic characters.
        upper_ratio: f64,
    },
}

/// Result of a moderation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModerationVerdict {
    /// Outcome for the stored comment.
    pub audit_status: AuditStatus,
    /// Highest risk raised by any check.
    pub risk_level: RiskLevel,
    /// Every check that raised the risk.
    pub reasons: Vec<RiskReason>,
    /// Sensitive word hits in text order.
    pub matches: Vec<MatchResult>,
    /// Surface forms of matched block-action words.
    pub blocked_words: Vec<String>,
    /// Set when no word list was available and only heuristics ran.
    pub word_scan_skipped: bool,
}

impl ModerationVerdict {
    /// High-risk comments are hidden at creation time pending review.
    pub fn should_fold(&self) -> bool {
        self.risk_level == RiskLevel::High
    }

    /// Whether the comment must not be stored.
    pub fn is_rejected(&self) -> bool {
        self.audit_status == AuditStatus::Rejected
    }

    fn raise(&mut self, level: RiskLevel, reason: RiskReason) {
        self.risk_level = self.risk_level.max(level);
        self.reasons.push(reason);
    }
}

/// Sequence of content checks with tunable thresholds.
#[derive(Debug, Clone)]
pub struct ModerationPipeline {
    min_chars: usize,
    repeat_run: usize,
    shout_ratio: f64,
}

impl Default for ModerationPipeline {
    fn default() -> Self {
        Self {
            min_chars: DEFAULT_MIN_CHARS,
            repeat_run: DEFAULT_REPEAT_RUN,
            shout_ratio: DEFAULT_SHOUT_RATIO,
        }
    }
}

impl ModerationPipeline {
    /// Default thresholds with a custom minimum length.
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars, ..Self::default() }
    }

    /// Runs every check over `content`. `words` is `None` when the word list
    /// could not be loaded; the heuristics still run in that case.
    pub fn evaluate(
        &self,
        content: &str,
        author_authored: bool,
        words: Option<&WordMatcher>,
    ) -> ModerationVerdict {
        let mut verdict = ModerationVerdict {
            audit_status: AuditStatus::Approved,
            risk_level: RiskLevel::Normal,
            reasons: Vec::new(),
            matches: Vec::new(),
            blocked_words: Vec::new(),
            word_scan_skipped: words.is_none(),
        };

        let char_count = content.chars().count();
        if char_count < self.min_chars {
            verdict.raise(RiskLevel::Low, RiskReason::TooShort { chars: char_count });
        }

        match words {
            Some(matcher) => {
                let matches = matcher.find_all(content);
                verdict.blocked_words = matches
                    .iter()
                    .filter(|hit| hit.action == WordAction::Block)
                    .map(|hit| hit.word.clone())
                    .collect();

                if let Some(serious) = matches.iter().find(|hit| hit.level >= SEVERITY_SERIOUS) {
                    let reason = RiskReason::SeriousWord { word: serious.word.clone() };
                    verdict.raise(RiskLevel::High, reason);
                    verdict.audit_status = AuditStatus::Rejected;
                    verdict.matches = matches;
                    return verdict;
                }

                if !matches.is_empty() {
                    let highest_level = matches.iter().map(|hit| hit.level).max().unwrap_or(0);
                    let words = matches.iter().map(|hit| hit.word.clone()).collect();
                    verdict.raise(
                        RiskLevel::Medium,
                        RiskReason::SensitiveWords { words, highest_level },
                    );
                }
                verdict.matches = matches;
            },
            None => {
                tracing::warn!("moderation running without a word list; word scan skipped");
            },
        }

        let repeat = longest_repeat(content).filter(|(_, run)| *run >= self.repeat_run);
        if let Some((ch, run)) = repeat {
            verdict.raise(RiskLevel::Medium, RiskReason::RepeatedCharacters { ch, run });
        }

        if contains_url_literal(content) {
            verdict.raise(RiskLevel::Medium, RiskReason::UrlLiteral);
        }

        let shouting = uppercase_ratio(content).filter(|ratio| *ratio > self.shout_ratio);
        if let Some(upper_ratio) = shouting {
            verdict.raise(RiskLevel::Low, RiskReason::Shouting { upper_ratio });
        }

        verdict.audit_status = decide_audit(&verdict, author_authored);
        verdict
    }
}

fn decide_audit(verdict: &ModerationVerdict, author_authored: bool) -> AuditStatus {
    if !verdict.blocked_words.is_empty() {
        return AuditStatus::Pending;
    }
    match verdict.risk_level {
        RiskLevel::Normal | RiskLevel::Low => AuditStatus::Approved,
        RiskLevel::Medium if author_authored => AuditStatus::Approved,
        RiskLevel::Medium | RiskLevel::High => AuditStatus::Pending,
    }
}

/// Longest run of one repeated code point.
fn longest_repeat(content: &str) -> Option<(char, usize)> {
    let mut best: Option<(char, usize)> = None;
    let mut current: Option<(char, usize)> = None;
    for ch in content.chars() {
        current = match current {
            Some((prev, run)) if prev == ch => Some((prev, run + 1)),
            _ => Some((ch, 1)),
        };
        if let Some((ch, run)) = current {
            if best.map_or(true, |(_, best_run)| run > best_run) {
                best = Some((ch, run));
            }
        }
    }
    best
}

fn contains_url_literal(content: &str) -> bool {
    let lowered = content.to_lowercase();
    lowered.contains("http://") || lowered.contains("https://")
}

/// Share of uppercase letters among alphabetic characters.
fn uppercase_ratio(content: &str) -> Option<f64> {
    let (alphabetic, upper) = content
        .chars()
        .filter(|ch| ch.is_alphabetic())
        .fold((0usize, 0usize), |(total, upper), ch| {
            (total + 1, upper + usize::from(ch.is_uppercase()))
        });
    if alphabetic == 0 {
        None
    } else {
        Some(upper as f64 / alphabetic as f64)
    }
}
