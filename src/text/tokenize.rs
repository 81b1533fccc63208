//! Word segmentation backends for the text normalizer.
//!
//! Segmentation is a best-effort capability: a missing or unreadable lexicon
//! selects the passthrough segmenter at startup instead of failing the run.

use std::collections::HashSet;
use std::path::Path;

use tracing::warn;

/// Joins multi-word lexical units into single underscore-joined tokens.
pub trait Segmenter: Send + Sync {
    /// Segment already-normalized text (lowercase, single-spaced).
    fn segment(&self, text: &str) -> String;

    /// Identifier used in logs.
    fn name(&self) -> &'static str;
}

/// Identity segmenter used when no lexicon is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughSegmenter;

impl Segmenter for PassthroughSegmenter {
    fn segment(&self, text: &str) -> String {
        text.to_string()
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

/// Greedy longest-match segmenter backed by a multi-word phrase lexicon.
#[derive(Debug, Clone)]
pub struct LexiconSegmenter {
    phrases: HashSet<String>,
    max_words: usize,
}

impl LexiconSegmenter {
    /// Build a segmenter from an iterator of phrases.
    ///
    /// Entries with fewer than two words are ignored; phrases are matched
    /// case-insensitively against normalized text.
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = HashSet::new();
        let mut max_words = 1usize;
        for phrase in phrases {
            let words: Vec<&str> = phrase.as_ref().split_whitespace().collect();
            if words.len() < 2 {
                continue;
            }
            max_words = max_words.max(words.len());
            set.insert(words.join(" ").to_lowercase());
        }
        Self {
            phrases: set,
            max_words,
        }
    }

    /// Load one phrase per line from a UTF-8 lexicon file.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(text.lines()))
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

impl Segmenter for LexiconSegmenter {
    fn segment(&self, text: &str) -> String {
        let words: Vec<&str> = text.split(' ').filter(|word| !word.is_empty()).collect();
        let mut out: Vec<String> = Vec::with_capacity(words.len());
        let mut idx = 0usize;
        while idx < words.len() {
            let longest = self.max_words.min(words.len() - idx);
            let mut matched = 0usize;
            for len in (2..=longest).rev() {
                if self.phrases.contains(&words[idx..idx + len].join(" ")) {
                    matched = len;
                    break;
                }
            }
            if matched >= 2 {
                out.push(words[idx..idx + matched].join("_"));
                idx += matched;
            } else {
                out.push(words[idx].to_string());
                idx += 1;
            }
        }
        out.join(" ")
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

/// Select a segmenter for the configured lexicon path.
///
/// The choice is made once at startup and never re-checked mid-run. An
/// unavailable lexicon is logged and degrades to the passthrough segmenter;
/// it is not an error condition for the pipeline.
pub fn select_segmenter(lexicon_path: Option<&Path>) -> Box<dyn Segmenter> {
    let Some(path) = lexicon_path else {
        return Box::new(PassthroughSegmenter);
    };
    match LexiconSegmenter::from_file(path) {
        Ok(segmenter) if !segmenter.is_empty() => Box::new(segmenter),
        Ok(_) => {
            warn!(
                path = %path.display(),
                "word segmentation lexicon has no multi-word phrases; using passthrough"
            );
            Box::new(PassthroughSegmenter)
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                %err,
                "word segmentation unavailable; using passthrough"
            );
            Box::new(PassthroughSegmenter)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_is_identity() {
        let segmenter = PassthroughSegmenter;
        assert_eq!(segmenter.segment("hà nội đẹp quá"), "hà nội đẹp quá");
    }

    #[test]
    fn lexicon_joins_known_phrases() {
        let segmenter = LexiconSegmenter::new(["hà nội", "thời tiết"]);
        assert_eq!(
            segmenter.segment("hôm nay thời tiết ở hà nội đẹp"),
            "hôm nay thời_tiết ở hà_nội đẹp"
        );
    }

    #[test]
    fn lexicon_prefers_longest_match() {
        let segmenter = LexiconSegmenter::new(["thành phố", "thành phố hồ chí minh"]);
        assert_eq!(
            segmenter.segment("thành phố hồ chí minh rất đông"),
            "thành_phố_hồ_chí_minh rất đông"
        );
    }

    #[test]
    fn lexicon_ignores_single_word_entries() {
        let segmenter = LexiconSegmenter::new(["hello", ""]);
        assert!(segmenter.is_empty());
        assert_eq!(segmenter.segment("hello world"), "hello world");
    }

    #[test]
    fn missing_lexicon_falls_back_to_passthrough() {
        let segmenter = select_segmenter(Some(Path::new("/nonexistent/lexicon.txt")));
        assert_eq!(segmenter.name(), "passthrough");
        assert_eq!(segmenter.segment("hà nội"), "hà nội");
    }
}
