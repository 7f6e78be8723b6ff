//! Multi-pattern sensitive-word matching over a character trie.
//!
//! Words and scanned text are case-folded per code point before they touch
//! the trie, and every offset reported by the matcher counts `char`s, not
//! bytes, so CJK and other multi-byte text behaves the same as ASCII.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{SensitiveWord, WordAction};

/// One hit of [`WordMatcher::find_all`]. `start..end` is a char range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    /// The matched span exactly as it appears in the scanned text.
    pub word: String,
    /// Byte offset of the first matched byte.
    pub start: usize,
    /// Byte offset just past the match.
    pub end: usize,
    /// Severity of the word.
    pub level: u8,
    /// Effect of the word.
    pub action: WordAction,
    /// Custom mask of replace-action words.
    pub replacement: Option<String>,
}

#[derive(Debug, Clone)]
struct WordEntry {
    level: u8,
    action: WordAction,
    replacement: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct TrieNode {
    children: HashMap<char, usize>,
    entry: Option<WordEntry>,
}

/// Trie automaton; node `0` is the root.
#[derive(Debug, Clone)]
pub struct WordMatcher {
    nodes: Vec<TrieNode>,
    word_count: usize,
}

impl Default for WordMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl WordMatcher {
    /// An empty matcher.
    pub fn new() -> Self {
        Self { nodes: vec![TrieNode::default()], word_count: 0 }
    }

    /// Builds a matcher from the enabled entries of `words`.
    pub fn from_words<'a>(words: impl IntoIterator<Item = &'a SensitiveWord>) -> Self {
        let mut matcher = Self::new();
        matcher.add_words(words.into_iter().filter(|word| word.enabled));
        matcher
    }

    /// Number of distinct registered words.
    pub fn len(&self) -> usize {
        self.word_count
    }

    /// Whether no word is registered.
    pub fn is_empty(&self) -> bool {
        self.word_count == 0
    }

    /// Inserts `word`; re-adding an existing word overwrites its metadata.
    /// Blank words are ignored and reported as `false`.
    pub fn add_word(
        &mut self,
        word: &str,
        level: u8,
        action: WordAction,
        replacement: Option<&str>,
    ) -> bool {
        let word = word.trim();
        if word.is_empty() {
            return false;
        }

        let mut node = 0;
        for ch in word.chars().map(fold_char) {
            node = match self.nodes[node].children.get(&ch) {
                Some(&next) => next,
                None => {
                    self.nodes.push(TrieNode::default());
                    let next = self.nodes.len() - 1;
                    self.nodes[node].children.insert(ch, next);
                    next
                },
            };
        }

        let entry = WordEntry {
            level: level.clamp(1, 3),
            action,
            replacement: replacement.map(str::to_string).filter(|value| !value.is_empty()),
        };
        if self.nodes[node].entry.replace(entry).is_none() {
            self.word_count += 1;
        }
        true
    }

    /// Bulk form of [`WordMatcher::add_word`].
    pub fn add_words<'a>(&mut self, words: impl IntoIterator<Item = &'a SensitiveWord>) {
        for word in words {
            self.add_word(&word.word, word.level, word.action, word.replacement.as_deref());
        }
    }

    /// True iff any registered word occurs as a contiguous substring.
    pub fn contains(&self, text: &str) -> bool {
        let folded: Vec<char> = text.chars().map(fold_char).collect();
        (0..folded.len()).any(|start| self.first_terminal_at(&folded, start))
    }

    /// Non-overlapping, greedy-longest-per-offset scan.
    pub fn find_all(&self, text: &str) -> Vec<MatchResult> {
        let original: Vec<char> = text.chars().collect();
        let folded: Vec<char> = original.iter().copied().map(fold_char).collect();

        let mut matches = Vec::new();
        let mut start = 0;
        while start < folded.len() {
            match self.longest_at(&folded, start) {
                Some((end, entry)) => {
                    matches.push(MatchResult {
                        word: original[start..end].iter().collect(),
                        start,
                        end,
                        level: entry.level,
                        action: entry.action,
                        replacement: entry.replacement.clone(),
                    });
                    start = end;
                },
                None => start += 1,
            }
        }
        matches
    }

    /// Masks spans of replace-action words. A word's own replacement wins over
    /// `fill`; it is padded with `*` or truncated to the span length.
    pub fn replace(&self, text: &str, fill: char) -> String {
        let mut chars: Vec<char> = text.chars().collect();
        for hit in self.find_all(text) {
            if hit.action != WordAction::Replace {
                continue;
            }
            let span = hit.end - hit.start;
            let mask: Vec<char> = match hit.replacement.as_deref() {
                Some(replacement) => {
                    replacement.chars().chain(std::iter::repeat('*')).take(span).collect()
                },
                None => std::iter::repeat(fill).take(span).collect(),
            };
            chars.splice(hit.start..hit.end, mask);
        }
        chars.into_iter().collect()
    }

    /// Returns `(ok, blocked_words)`; `ok` is false iff a block-action word
    /// matched.
    pub fn validate(&self, text: &str) -> (bool, Vec<String>) {
        let blocked: Vec<String> = self
            .find_all(text)
            .into_iter()
            .filter(|hit| hit.action == WordAction::Block)
            .map(|hit| hit.word)
            .collect();
        (blocked.is_empty(), blocked)
    }

    /// Maximum severity across all matches, `0` when nothing matched.
    pub fn highest_risk_level(&self, text: &str) -> u8 {
        self.find_all(text)
            .iter()
            .map(|hit| hit.level)
            .max()
            .unwrap_or(0)
    }

    fn longest_at(&self, folded: &[char], start: usize) -> Option<(usize, &WordEntry)> {
        let mut node = 0;
        let mut best = None;
        for (offset, ch) in folded[start..].iter().enumerate() {
            match self.nodes[node].children.get(ch) {
                Some(&next) => node = next,
                None => break,
            }
            if let Some(entry) = self.nodes[node].entry.as_ref() {
                best = Some((start + offset + 1, entry));
            }
        }
        best
    }

    fn first_terminal_at(&self, folded: &[char], start: usize) -> bool {
        let mut node = 0;
        for ch in &folded[start..] {
            match self.nodes[node].children.get(ch) {
                Some(&next) => node = next,
                None => return false,
            }
            if self.nodes[node].entry.is_some() {
                return true;
            }
        }
        false
    }
}

/// Lower-cases one code point, keeping it unchanged when the lowercase form
/// would expand to several chars so offsets stay aligned with the input.
fn fold_char(ch: char) -> char {
    let mut lower = ch.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(folded), None) => folded,
        _ => ch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(words: &[(&str, u8, WordAction, Option<&str>)]) -> WordMatcher {
        let mut matcher = WordMatcher::new();
        for (word, level, action, replacement) in words {
            matcher.add_word(word, *level, *action, *replacement);
        }
        matcher
    }

    #[test]
    fn empty_text_never_matches() {
        let matcher = matcher(&[("spam", 2, WordAction::Block, None)]);
        assert!(!matcher.contains(""));
        assert!(matcher.find_all("").is_empty());
        assert_eq!(matcher.highest_risk_level(""), 0);
    }

    #[test]
    fn contains_is_case_insensitive() {
        let matcher = matcher(&[("Spam", 2, WordAction::Block, None)]);
        assert!(matcher.contains("spam"));
        assert!(matcher.contains("SPAM"));
        assert!(matcher.contains("this is sPaM content"));
        assert!(!matcher.contains("spa m"));
    }

    #[test]
    fn validate_reports_block_words_with_surface_form() {
        let matcher = matcher(&[("spam", 2, WordAction::Block, None)]);
        assert_eq!(matcher.validate("this is spam content"), (false, vec!["spam".to_string()]));
        assert_eq!(matcher.validate("Buy SPAM now"), (false, vec!["SPAM".to_string()]));
        assert_eq!(matcher.validate("clean"), (true, vec![]));
    }

    #[test]
    fn validate_ignores_non_block_actions() {
        let matcher = matcher(&[
            ("darn", 1, WordAction::Replace, None),
            ("hmm", 1, WordAction::Flag, None),
        ]);
        let (ok, blocked) = matcher.validate("darn hmm");
        assert!(ok);
        assert!(blocked.is_empty());
        assert_eq!(matcher.find_all("darn hmm").len(), 2);
    }

    #[test]
    fn replace_uses_word_replacement() {
        let matcher = matcher(&[("xx", 3, WordAction::Replace, Some("**"))]);
        assert_eq!(matcher.replace("axxb", '#'), "a**b");
    }

    #[test]
    fn replace_pads_and_truncates_replacement() {
        let matcher = matcher(&[
            ("abcd", 1, WordAction::Replace, Some("no")),
            ("ef", 1, WordAction::Replace, Some("long")),
        ]);
        assert_eq!(matcher.replace("abcd-ef", '#'), "no**-lo");
    }

    #[test]
    fn replace_falls_back_to_fill_and_skips_block_words() {
        let matcher = matcher(&[
            ("bad", 1, WordAction::Replace, None),
            ("spam", 2, WordAction::Block, None),
        ]);
        assert_eq!(matcher.replace("bad spam", '*'), "*** spam");
    }

    #[test]
    fn find_all_prefers_longest_word_per_offset() {
        let matcher = matcher(&[
            ("ab", 1, WordAction::Flag, None),
            ("abcd", 2, WordAction::Flag, None),
            ("cd", 3, WordAction::Flag, None),
        ]);
        let hits = matcher.find_all("xabcdcd");
        let spans: Vec<(usize, usize, u8)> =
            hits.iter().map(|hit| (hit.start, hit.end, hit.level)).collect();
        assert_eq!(spans, vec![(1, 5, 2), (5, 7, 3)]);
    }

    #[test]
    fn find_all_falls_back_to_shorter_word_on_dead_end() {
        let matcher = matcher(&[
            ("ab", 1, WordAction::Flag, None),
            ("abcd", 2, WordAction::Flag, None),
        ]);
        let hits = matcher.find_all("abcx");
        assert_eq!(hits.len(), 1);
        assert_eq!((hits[0].start, hits[0].end), (0, 2));
    }

    #[test]
    fn offsets_count_code_points() {
        let matcher = matcher(&[("傻瓜", 2, WordAction::Replace, None)]);
        let hits = matcher.find_all("你是傻瓜吗");
        assert_eq!(hits.len(), 1);
        assert_eq!((hits[0].start, hits[0].end), (2, 4));
        assert_eq!(matcher.replace("你是傻瓜吗", '*'), "你是**吗");
    }

    #[test]
    fn re_adding_overwrites_metadata() {
        let mut matcher = matcher(&[("spam", 1, WordAction::Flag, None)]);
        matcher.add_word("SPAM", 3, WordAction::Block, None);
        assert_eq!(matcher.len(), 1);
        assert_eq!(matcher.highest_risk_level("spam"), 3);
        assert!(!matcher.validate("spam").0);
    }

    #[test]
    fn blank_words_are_ignored() {
        let mut matcher = WordMatcher::new();
        assert!(!matcher.add_word("   ", 2, WordAction::Block, None));
        assert!(matcher.is_empty());
        assert!(!matcher.contains("   "));
    }

    #[test]
    fn highest_risk_level_takes_maximum() {
        let matcher = matcher(&[
            ("low", 1, WordAction::Flag, None),
            ("high", 3, WordAction::Flag, None),
        ]);
        assert_eq!(matcher.highest_risk_level("low then high"), 3);
        assert_eq!(matcher.highest_risk_level("only low"), 1);
    }

    #[test]
    fn from_words_skips_disabled_entries() {
        let mut disabled = SensitiveWord::new("off", 2, WordAction::Block, None);
        disabled.enabled = false;
        let words = vec![SensitiveWord::new("on", 2, WordAction::Block, None), disabled];
        let matcher = WordMatcher::from_words(&words);
        assert!(matcher.contains("on"));
        assert!(!matcher.contains("off"));
    }
}
