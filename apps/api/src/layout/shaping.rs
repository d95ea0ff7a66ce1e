//! Deterministic greedy line breaker.
//!
//! This is the headless stand-in for a browser layout pass: same wrapping rules as the
//! rendered page (`white-space: normal; overflow-wrap: anywhere`), glyph widths from
//! `font_metrics`. Whitespace runs collapse to a single space; a word wider than the
//! line is broken between characters.

use crate::layout::font_metrics::FontMetricTable;

/// Text style for one shaping call.
#[derive(Debug, Clone, Copy)]
pub struct ShapeStyle<'a> {
    pub metrics: &'a FontMetricTable,
    pub size_px: f32,
    pub bold: bool,
}

impl ShapeStyle<'_> {
    fn width(&self, s: &str) -> f32 {
        self.metrics.measure_px(s, self.size_px, self.bold)
    }

    fn char_width(&self, c: char) -> f32 {
        let mut buf = [0u8; 4];
        self.width(c.encode_utf8(&mut buf))
    }
}

/// Word-wraps `text` into lines no wider than `max_width_px`.
///
/// Returns the pixel width of every line. Empty or whitespace-only text returns no lines.
pub fn wrap_lines(text: &str, style: ShapeStyle<'_>, max_width_px: f32) -> Vec<f32> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return vec![];
    }

    let space_w = style.width(" ");
    let mut lines: Vec<f32> = Vec::new();
    let mut current_width = 0.0_f32;
    let mut line_has_content = false;

    for word in words {
        let word_w = style.width(word);
        let leading = if line_has_content { space_w } else { 0.0 };

        if line_has_content && current_width + leading + word_w <= max_width_px {
            current_width += leading + word_w;
            continue;
        }

        if line_has_content {
            // Current line is full: close it and start the word on a new line.
            lines.push(current_width);
            current_width = 0.0;
            line_has_content = false;
        }

        if word_w <= max_width_px {
            current_width = word_w;
            line_has_content = true;
            continue;
        }

        // Word alone is wider than the line: break it between characters.
        for c in word.chars() {
            let c_w = style.char_width(c);
            if line_has_content && current_width + c_w > max_width_px {
                lines.push(current_width);
                current_width = 0.0;
            }
            current_width += c_w;
            line_has_content = true;
        }
    }

    if line_has_content {
        lines.push(current_width);
    }
    lines
}

/// Number of lines `text` occupies at `max_width_px`.
pub fn line_count(text: &str, style: ShapeStyle<'_>, max_width_px: f32) -> usize {
    wrap_lines(text, style, max_width_px).len()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::font_metrics::{get_metrics, FontFamily};

    fn make_style() -> ShapeStyle<'static> {
        ShapeStyle {
            metrics: get_metrics(FontFamily::Inter),
            size_px: 10.0,
            bold: false,
        }
    }

    #[test]
    fn test_style_debug_names_font() {
        let shown = format!("{:?}", make_style());
        assert!(shown.contains("Inter"));
        assert!(shown.contains("size_px: 10.0"));
    }

    #[test]
    fn test_empty_text_has_no_lines() {
        assert!(wrap_lines("", make_style(), 500.0).is_empty());
        assert_eq!(line_count("   \n\t ", make_style(), 500.0), 0);
    }

    #[test]
    fn test_single_word_one_line() {
        let lines = wrap_lines("Rust", make_style(), 500.0);
        assert_eq!(lines.len(), 1);
        // "Rust" is 2.00em at 10px
        assert!((lines[0] - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_whitespace_collapses() {
        let a = wrap_lines("Rust   and\n\nGo", make_style(), 500.0);
        let b = wrap_lines("Rust and Go", make_style(), 500.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_long_text_wraps() {
        let text = "word ".repeat(40);
        let lines = wrap_lines(&text, make_style(), 100.0);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|w| *w <= 100.0 + 1e-3));
    }

    #[test]
    fn test_wrap_boundary_at_line_width() {
        // "Rust Rust" = 2.00 + 0.25 + 2.00 = 4.25em = 42.5px at 10px
        assert_eq!(line_count("Rust Rust", make_style(), 42.6), 1);
        assert_eq!(line_count("Rust Rust", make_style(), 42.0), 2);
    }

    #[test]
    fn test_overlong_word_breaks_between_characters() {
        let word = "a".repeat(100); // 100 × 0.56em × 10px = 560px
        let lines = wrap_lines(&word, make_style(), 100.0);
        assert_eq!(lines.len(), 6);
        assert!(lines.iter().all(|w| *w <= 100.0 + 1e-3));
    }

    #[test]
    fn test_bold_text_can_wrap_earlier() {
        let regular = ShapeStyle {
            bold: false,
            ..make_style()
        };
        let bold = ShapeStyle {
            bold: true,
            ..make_style()
        };
        // 42.6px fits regular; bold is 6% wider
        assert_eq!(line_count("Rust Rust", regular, 42.6), 1);
        assert_eq!(line_count("Rust Rust", bold, 42.6), 2);
    }
}
