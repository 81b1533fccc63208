//! Deterministic text cleanup shared by training and inference.

use std::sync::LazyLock;

use regex::Regex;

use super::tokenize::{PassthroughSegmenter, Segmenter};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static pattern"));

/// Normalizes raw review text before formatting or classification.
pub struct TextNormalizer {
    segmenter: Box<dyn Segmenter>,
}

impl TextNormalizer {
    pub fn new(segmenter: Box<dyn Segmenter>) -> Self {
        Self { segmenter }
    }

    /// Normalizer without word segmentation.
    pub fn passthrough() -> Self {
        Self::new(Box::new(PassthroughSegmenter))
    }

    /// Name of the active segmenter, for logs.
    pub fn segmenter_name(&self) -> &'static str {
        self.segmenter.name()
    }

    /// Lowercase, collapse whitespace runs to single spaces, trim, then apply
    /// word segmentation.
    ///
    /// Pure: identical input always yields identical output. Never fails; a
    /// degraded segmenter leaves the text untouched.
    pub fn normalize(&self, raw: &str) -> String {
        let lowered = raw.to_lowercase();
        let collapsed = WHITESPACE.replace_all(&lowered, " ");
        self.segmenter.segment(collapsed.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::tokenize::LexiconSegmenter;

    #[test]
    fn lowercases_and_collapses_whitespace() {
        let normalizer = TextNormalizer::passthrough();
        assert_eq!(
            normalizer.normalize("  SẢN phẩm\t RẤT\n\ntốt  "),
            "sản phẩm rất tốt"
        );
    }

    #[test]
    fn no_whitespace_runs_or_padding_survive() {
        let normalizer = TextNormalizer::passthrough();
        for raw in ["a  b", "\t\n x \r\n y \t", "một\u{a0}hai", "   ", ""] {
            let normalized = normalizer.normalize(raw);
            assert!(!normalized.contains("  "), "double space in {normalized:?}");
            assert_eq!(normalized.trim(), normalized);
        }
    }

    #[test]
    fn idempotent_with_passthrough() {
        let normalizer = TextNormalizer::passthrough();
        for raw in ["Hà Nội ĐẸP", "  nhiều   khoảng  trắng ", "đã chuẩn"] {
            let once = normalizer.normalize(raw);
            assert_eq!(normalizer.normalize(&once), once);
        }
    }

    #[test]
    fn idempotent_with_segmentation() {
        let normalizer =
            TextNormalizer::new(Box::new(LexiconSegmenter::new(["hà nội", "thời tiết"])));
        let once = normalizer.normalize("Thời   tiết Hà Nội hôm nay");
        assert_eq!(once, "thời_tiết hà_nội hôm nay");
        assert_eq!(normalizer.normalize(&once), once);
    }
}
