//! Process-wide sensitive word list.
//!
//! The list hands out immutable [`WordMatcher`] snapshots to any number of
//! concurrent readers; edits and reloads build a new matcher and swap it in
//! under the write lock, so a reader never observes a half-built trie.

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::{model::SensitiveWord, word_matcher::WordMatcher};

static DEFAULT_WORD_LIST: OnceLock<SensitiveWordList> = OnceLock::new();

/// Shared, reloadable handle around a [`WordMatcher`].
#[derive(Clone, Default)]
pub struct SensitiveWordList {
    current: Arc<RwLock<Arc<WordMatcher>>>,
}

impl SensitiveWordList {
    /// Builds the list from the enabled entries of `words`.
    pub fn new(words: &[SensitiveWord]) -> Self {
        Self { current: Arc::new(RwLock::new(Arc::new(WordMatcher::from_words(words)))) }
    }

    /// Cheap snapshot for a moderation pass.
    pub fn snapshot(&self) -> Arc<WordMatcher> {
        self.current.read().clone()
    }

    /// Replaces the whole word list.
    pub fn reload(&self, words: &[SensitiveWord]) -> usize {
        let matcher = Arc::new(WordMatcher::from_words(words));
        let count = matcher.len();
        *self.current.write() = matcher;
        tracing::info!("sensitive word list reloaded with {count} words");
        count
    }

    /// Adds or overwrites a single word without rebuilding the trie.
    pub fn add_word(&self, word: &SensitiveWord) {
        if !word.enabled {
            return;
        }
        let mut guard = self.current.write();
        Arc::make_mut(&mut *guard).add_word(
            &word.word,
            word.level,
            word.action,
            word.replacement.as_deref(),
        );
    }

    /// Words in the current matcher.
    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    /// Whether the current matcher has no words.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Initialises the process-wide list once; later calls return the existing
/// instance untouched. Use [`SensitiveWordList::reload`] to change it.
pub fn init(words: &[SensitiveWord]) -> &'static SensitiveWordList {
    DEFAULT_WORD_LIST.get_or_init(|| {
        tracing::info!("initialising default sensitive word list with {} words", words.len());
        SensitiveWordList::new(words)
    })
}

/// The process-wide list, if [`init`] has run.
pub fn default_list() -> Option<&'static SensitiveWordList> {
    DEFAULT_WORD_LIST.get()
}
