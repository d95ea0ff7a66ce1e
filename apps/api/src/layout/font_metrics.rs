//! Static glyph-width tables for the résumé font families.
//!
//! Widths are in em units (relative to font size). The base table is Inter; the other
//! families are expressed as a uniform scale of it. That is an approximation of real
//! glyph shapes, but height accuracy only depends on where lines break, and a uniform
//! scale keeps break points within a word or two of a browser's on realistic text.
//!
//! The table covers ASCII 0x20..=0x7E (95 printable characters), index = code - 32.
//! Everything else falls back to the family's average character width.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Font family enum
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontFamily {
    /// Clean humanist sans-serif. The default template font.
    #[default]
    Inter,
    /// Old-style serif, noticeably narrower than Inter.
    EbGaramond,
    /// Geometric humanist sans-serif, slightly wider than Inter.
    Lato,
    /// Condensed display sans-serif.
    Oswald,
    /// Traditional TeX serif.
    ComputerModern,
}

impl FontFamily {
    pub fn from_name(name: &str) -> Option<FontFamily> {
        match name.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "inter" => Some(FontFamily::Inter),
            "eb_garamond" | "garamond" => Some(FontFamily::EbGaramond),
            "lato" => Some(FontFamily::Lato),
            "oswald" => Some(FontFamily::Oswald),
            "computer_modern" | "cm" => Some(FontFamily::ComputerModern),
            _ => None,
        }
    }

    /// CSS `font-family` stack used by the page renderer.
    pub fn css_stack(&self) -> &'static str {
        match self {
            FontFamily::Inter => "'Inter', sans-serif",
            FontFamily::EbGaramond => "'EB Garamond', serif",
            FontFamily::Lato => "'Lato', sans-serif",
            FontFamily::Oswald => "'Oswald', sans-serif",
            FontFamily::ComputerModern => "'CMU Serif', 'Computer Modern', serif",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Font metric table
// ────────────────────────────────────────────────────────────────────────────

/// Character-width table for one font family.
///
/// Width array slot layout:
/// ```text
/// [0]=sp  [1]=!   [2]="   [3]=#   [4]=$   [5]=%   [6]=&   [7]='
/// [8]=(   [9]=)   [10]=*  [11]=+  [12]=,  [13]=-  [14]=.  [15]=/
/// [16..25]=0-9
/// [26]=:  [27]=;  [28]=<  [29]==  [30]=>  [31]=?  [32]=@
/// [33..58]=A-Z
/// [59]=[  [60]=\  [61]=]  [62]=^  [63]=_  [64]=`
/// [65..90]=a-z
/// [91]={  [92]=|  [93]=}  [94]=~
/// ```
#[derive(Debug)]
pub struct FontMetricTable {
    pub font: FontFamily,
    widths: &'static [f32; 95],
    /// Uniform scale applied to the base widths.
    scale: f32,
    /// Bold runs are this much wider than regular ones.
    bold_factor: f32,
    average_char_width: f32,
}

impl FontMetricTable {
    /// Width of a single character in em units.
    pub fn char_width(&self, c: char) -> f32 {
        let code = c as usize;
        if (32..=126).contains(&code) {
            self.widths[code - 32] * self.scale
        } else {
            self.average_char_width()
        }
    }

    /// Rendered width of a string in em units.
    pub fn measure_str(&self, s: &str) -> f32 {
        s.chars().map(|c| self.char_width(c)).sum()
    }

    /// Rendered width of a string in pixels at `size_px`, optionally bold.
    pub fn measure_px(&self, s: &str, size_px: f32, bold: bool) -> f32 {
        let factor = if bold { self.bold_factor } else { 1.0 };
        self.measure_str(s) * size_px * factor
    }

    /// Fallback width for non-ASCII characters, also used by the estimated strategy
    /// to derive characters-per-line.
    pub fn average_char_width(&self) -> f32 {
        self.average_char_width * self.scale
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Static width table (Inter, 95 ASCII printable characters)
// ────────────────────────────────────────────────────────────────────────────

#[rustfmt::skip]
static INTER_WIDTHS: [f32; 95] = [
    // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
    0.25, 0.30, 0.38, 0.56, 0.56, 0.89, 0.67, 0.22, 0.33, 0.33, 0.39, 0.59, 0.28, 0.33, 0.28, 0.31,
    // 0     1     2     3     4     5     6     7     8     9
    0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56,
    // :     ;     <     =     >     ?     @
    0.28, 0.28, 0.59, 0.59, 0.59, 0.50, 1.02,
    // A     B     C     D     E     F     G     H     I     J     K     L     M
    0.67, 0.61, 0.61, 0.67, 0.56, 0.50, 0.67, 0.67, 0.25, 0.39, 0.61, 0.53, 0.78,
    // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
    0.67, 0.72, 0.56, 0.72, 0.61, 0.50, 0.56, 0.67, 0.67, 0.89, 0.61, 0.61, 0.56,
    // [     \     ]     ^     _     `
    0.28, 0.31, 0.28, 0.47, 0.56, 0.34,
    // a     b     c     d     e     f     g     h     i     j     k     l     m
    0.56, 0.56, 0.50, 0.56, 0.56, 0.31, 0.56, 0.56, 0.22, 0.22, 0.53, 0.22, 0.83,
    // n     o     p     q     r     s     t     u     v     w     x     y     z
    0.56, 0.56, 0.56, 0.56, 0.33, 0.44, 0.39, 0.56, 0.50, 0.72, 0.50, 0.50, 0.44,
    // {     |     }     ~
    0.33, 0.26, 0.33, 0.59,
];

static INTER_TABLE: FontMetricTable = FontMetricTable {
    font: FontFamily::Inter,
    widths: &INTER_WIDTHS,
    scale: 1.0,
    bold_factor: 1.06,
    average_char_width: 0.52,
};

/// Approx. 85% of Inter.
static EB_GARAMOND_TABLE: FontMetricTable = FontMetricTable {
    font: FontFamily::EbGaramond,
    widths: &INTER_WIDTHS,
    scale: 0.85,
    bold_factor: 1.05,
    average_char_width: 0.52,
};

/// Approx. 105% of Inter.
static LATO_TABLE: FontMetricTable = FontMetricTable {
    font: FontFamily::Lato,
    widths: &INTER_WIDTHS,
    scale: 1.05,
    bold_factor: 1.06,
    average_char_width: 0.52,
};

/// Approx. 68% of Inter.
static OSWALD_TABLE: FontMetricTable = FontMetricTable {
    font: FontFamily::Oswald,
    widths: &INTER_WIDTHS,
    scale: 0.68,
    bold_factor: 1.08,
    average_char_width: 0.52,
};

/// Approx. 90% of Inter.
static COMPUTER_MODERN_TABLE: FontMetricTable = FontMetricTable {
    font: FontFamily::ComputerModern,
    widths: &INTER_WIDTHS,
    scale: 0.90,
    bold_factor: 1.07,
    average_char_width: 0.52,
};

/// Returns the static metric table for a given font family.
pub fn get_metrics(font: FontFamily) -> &'static FontMetricTable {
    match font {
        FontFamily::Inter => &INTER_TABLE,
        FontFamily::EbGaramond => &EB_GARAMOND_TABLE,
        FontFamily::Lato => &LATO_TABLE,
        FontFamily::Oswald => &OSWALD_TABLE,
        FontFamily::ComputerModern => &COMPUTER_MODERN_TABLE,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
