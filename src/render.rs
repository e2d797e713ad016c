//! Presentation of diff output.
//!
//! Answers mark italics with asterisks (`*Nature, 10*`). When showing a diff,
//! `*text*` runs are unwrapped into italic spans. This is a display concern
//! only and never feeds back into grading.

use std::sync::OnceLock;

use regex::Regex;

use crate::grading::{DiffKind, DiffSegment};

const ANSI_RESET: &str = "\x1b[0m";
const ANSI_ITALIC: &str = "\x1b[3m";
const ANSI_ADDED: &str = "\x1b[32m";
const ANSI_REMOVED: &str = "\x1b[31;9m";

/// A piece of text with or without emphasis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Plain(String),
    Italic(String),
}

/// How diff segments are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Terminal colours: green additions, red struck-through removals
    Ansi,
    /// Text markers: `{+added+}`, `[-removed-]`, `_italic_`
    Plain,
}

fn emphasis_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*([^*]+)\*").unwrap())
}

/// Splits `text` into plain and italic spans, unwrapping `*text*`.
///
/// An unmatched asterisk stays in the plain text.
///
/// # Examples
///
/// ```
/// use apa_daily::{emphasis_spans, Span};
///
/// let spans = emphasis_spans("*Nature, 10*(2)");
/// assert_eq!(
///     spans,
///     vec![
///         Span::Italic("Nature, 10".to_string()),
///         Span::Plain("(2)".to_string()),
///     ]
/// );
/// ```
pub fn emphasis_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;

    for cap in emphasis_regex().captures_iter(text) {
        let (Some(whole), Some(inner)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        if whole.start() > last {
            spans.push(Span::Plain(text[last..whole.start()].to_string()));
        }
        spans.push(Span::Italic(inner.as_str().to_string()));
        last = whole.end();
    }

    if last < text.len() {
        spans.push(Span::Plain(text[last..].to_string()));
    }

    spans
}

fn render_spans(text: &str, mode: RenderMode, out: &mut String, restore: &str) {
    for span in emphasis_spans(text) {
        match (span, mode) {
            (Span::Plain(t), _) => out.push_str(&t),
            (Span::Italic(t), RenderMode::Plain) => {
                out.push('_');
                out.push_str(&t);
                out.push('_');
            }
            (Span::Italic(t), RenderMode::Ansi) => {
                out.push_str(ANSI_ITALIC);
                out.push_str(&t);
                out.push_str(ANSI_RESET);
                out.push_str(restore);
            }
        }
    }
}

/// Renders diff segments as one line of text.
pub fn render_diff<'a>(segments: impl IntoIterator<Item = &'a DiffSegment>, mode: RenderMode) -> String {
    let mut out = String::new();

    for segment in segments {
        match mode {
            RenderMode::Plain => {
                let (open, close) = match segment.kind {
                    DiffKind::Unchanged => ("", ""),
                    DiffKind::Added => ("{+", "+}"),
                    DiffKind::Removed => ("[-", "-]"),
                };
                out.push_str(open);
                render_spans(&segment.text, mode, &mut out, "");
                out.push_str(close);
            }
            RenderMode::Ansi => {
                let colour = match segment.kind {
                    DiffKind::Unchanged => "",
                    DiffKind::Added => ANSI_ADDED,
                    DiffKind::Removed => ANSI_REMOVED,
                };
                out.push_str(colour);
                render_spans(&segment.text, mode, &mut out, colour);
                if !colour.is_empty() {
                    out.push_str(ANSI_RESET);
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::grade;

    fn segment(text: &str, kind: DiffKind) -> DiffSegment {
        DiffSegment {
            text: text.to_string(),
            kind,
        }
    }

    #[test]
    fn test_emphasis_spans_plain_text() {
        assert_eq!(
            emphasis_spans("no italics here"),
            vec![Span::Plain("no italics here".to_string())]
        );
    }

    #[test]
    fn test_emphasis_spans_in_citation() {
        // Given: A canonical citation with one italic run
        let text = "Lee, A. B. (2023). A Short Title. *Nature, 10*(2), 5-9.";

        // When: We split it into spans
        let spans = emphasis_spans(text);

        // Then: The journal and volume become one italic span
        assert_eq!(
            spans,
            vec![
                Span::Plain("Lee, A. B. (2023). A Short Title. ".to_string()),
                Span::Italic("Nature, 10".to_string()),
                Span::Plain("(2), 5-9.".to_string()),
            ]
        );
    }

    #[test]
    fn test_emphasis_spans_lone_asterisk_stays_plain() {
        assert_eq!(emphasis_spans("*"), vec![Span::Plain("*".to_string())]);
        assert_eq!(emphasis_spans("a*b"), vec![Span::Plain("a*b".to_string())]);
    }

    #[test]
    fn test_emphasis_spans_empty() {
        assert!(emphasis_spans("").is_empty());
    }

    #[test]
    fn test_render_diff_plain_markers() {
        let segments = vec![
            segment("Lee, A. ", DiffKind::Unchanged),
            segment("B. ", DiffKind::Added),
            segment("X", DiffKind::Removed),
            segment("*Nature*", DiffKind::Unchanged),
        ];

        assert_eq!(
            render_diff(&segments, RenderMode::Plain),
            "Lee, A. {+B. +}[-X-]_Nature_"
        );
    }

    #[test]
    fn test_render_diff_ansi_colours() {
        let segments = vec![segment("B. ", DiffKind::Added)];

        let out = render_diff(&segments, RenderMode::Ansi);

        assert_eq!(out, format!("{}B. {}", ANSI_ADDED, ANSI_RESET));
    }

    #[test]
    fn test_render_does_not_change_grading() {
        // Unwrapping italics for display must not make a wrong answer right
        let canonical = "*Nature, 10*(2)";
        let result = grade("Nature, 10(2)", canonical);
        let segments: Vec<DiffSegment> = result.diff.segments().collect();

        assert!(!result.is_correct);
        assert!(render_diff(&segments, RenderMode::Plain).contains("{+*+}"));
    }
}
