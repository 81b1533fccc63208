//! Line encoding for labeled samples.
//!
//! Each sample is persisted as `__label__<label> <text>`, one per line. The
//! label is assumed to contain neither whitespace nor embedded newlines;
//! values are not escaped, so a label violating that assumption silently
//! corrupts the label/text boundary on parse.

/// Prefix marking the label portion of a formatted line.
pub const LABEL_PREFIX: &str = "__label__";

/// One labeled sample read from the source dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledSample {
    pub text: String,
    pub label: String,
}

/// Encode a label and normalized text as a single training line.
pub fn format_line(label: &str, text: &str) -> String {
    format!("{LABEL_PREFIX}{label} {text}")
}

/// Split a formatted line back into `(label, text)`.
///
/// Returns `None` when the line lacks the label prefix. A line carrying only
/// a label yields empty text.
pub fn parse_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix(LABEL_PREFIX)?;
    Some(match rest.split_once(' ') {
        Some((label, text)) => (label, text),
        None => (rest, ""),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_label_and_text() {
        assert_eq!(format_line("pos", "rất tốt"), "__label__pos rất tốt");
    }

    #[test]
    fn round_trips_label_and_text() {
        for (label, text) in [
            ("pos", "sản phẩm rất tốt"),
            ("neg", ""),
            ("neu", "giá ổn, giao nhanh"),
        ] {
            let line = format_line(label, text);
            assert_eq!(parse_line(&line), Some((label, text)));
        }
    }

    #[test]
    fn rejects_lines_without_prefix() {
        assert_eq!(parse_line("pos rất tốt"), None);
        assert_eq!(parse_line(""), None);
    }

    #[test]
    fn label_only_line_has_empty_text() {
        assert_eq!(parse_line("__label__pos"), Some(("pos", "")));
    }
}
