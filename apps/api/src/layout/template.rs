//! Template and typography configuration for a résumé page.
//!
//! All lengths are CSS pixels at 96 dpi. The page format constant here is the one the
//! external exporter must use as well; if the two ever disagree, preview/export parity
//! breaks.
//!
//! A `TemplateConfig` deserialized from a request is validated by construction
//! (`serde(try_from)`), so configuration errors surface at ingress and never from
//! inside the packing loop.

use serde::{Deserialize, Serialize};

use crate::layout::errors::LayoutError;
use crate::layout::font_metrics::FontFamily;

// ────────────────────────────────────────────────────────────────────────────
// Page format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageFormat {
    pub width_px: f32,
    pub height_px: f32,
}

impl PageFormat {
    /// ISO A4 (210 × 297 mm) at 96 dpi.
    pub const A4_96DPI: PageFormat = PageFormat {
        width_px: 794.0,
        height_px: 1123.0,
    };

    /// US letter (8.5 × 11 in) at 96 dpi.
    pub const LETTER_96DPI: PageFormat = PageFormat {
        width_px: 816.0,
        height_px: 1056.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Padding {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Default for Padding {
    fn default() -> Self {
        Padding {
            top: 76.0,
            right: 60.0,
            bottom: 76.0,
            left: 60.0,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Typography
// ────────────────────────────────────────────────────────────────────────────

/// Visual role of a run of text. Each role maps to one font size and line height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextRole {
    Name,
    Headline,
    Contact,
    SectionTitle,
    Body,
    EntryTitle,
    Meta,
    Bullet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Typography {
    pub font: FontFamily,
    pub name_size_px: f32,
    pub headline_size_px: f32,
    pub section_title_size_px: f32,
    pub entry_title_size_px: f32,
    pub body_size_px: f32,
    pub meta_size_px: f32,
    /// Line-height multiplier for body, meta, contact and bullet text.
    pub line_height: f32,
    /// Line-height multiplier for name, headline and titles.
    pub heading_line_height: f32,
    /// Horizontal indent of bullet text (marker + gap).
    pub bullet_indent_px: f32,
}

impl Default for Typography {
    fn default() -> Self {
        Typography {
            font: FontFamily::Inter,
            name_size_px: 26.0,
            headline_size_px: 15.0,
            section_title_size_px: 15.0,
            entry_title_size_px: 14.0,
            body_size_px: 13.0,
            meta_size_px: 12.0,
            line_height: 1.4,
            heading_line_height: 1.25,
            bullet_indent_px: 16.0,
        }
    }
}

impl Typography {
    pub fn font_size_px(&self, role: TextRole) -> f32 {
        match role {
            TextRole::Name => self.name_size_px,
            TextRole::Headline => self.headline_size_px,
            TextRole::SectionTitle => self.section_title_size_px,
            TextRole::EntryTitle => self.entry_title_size_px,
            TextRole::Body | TextRole::Bullet => self.body_size_px,
            TextRole::Contact | TextRole::Meta => self.meta_size_px,
        }
    }

    pub fn line_height_px(&self, role: TextRole) -> f32 {
        let multiplier = match role {
            TextRole::Name | TextRole::Headline | TextRole::SectionTitle | TextRole::EntryTitle => {
                self.heading_line_height
            }
            _ => self.line_height,
        };
        self.font_size_px(role) * multiplier
    }

    /// Available line width for a role inside a content box of `content_width_px`.
    pub fn line_width_px(&self, role: TextRole, content_width_px: f32) -> f32 {
        match role {
            TextRole::Bullet => content_width_px - self.bullet_indent_px,
            _ => content_width_px,
        }
    }

    pub fn is_bold(role: TextRole) -> bool {
        matches!(
            role,
            TextRole::Name | TextRole::SectionTitle | TextRole::EntryTitle
        )
    }
}

/// Vertical rhythm between blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Spacing {
    /// Space under the header block.
    pub header_gap_px: f32,
    /// Space above a section title (and above the summary).
    pub section_gap_px: f32,
    /// Space between a section title and its first item.
    pub title_gap_px: f32,
    /// Space above every section item (skills row, role, project, degree).
    pub entry_gap_px: f32,
}

impl Default for Spacing {
    fn default() -> Self {
        Spacing {
            header_gap_px: 12.0,
            section_gap_px: 14.0,
            title_gap_px: 4.0,
            entry_gap_px: 8.0,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sections
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Skills,
    Experience,
    Projects,
    Education,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionTitles {
    pub skills: String,
    pub experience: String,
    pub projects: String,
    pub education: String,
}

impl Default for SectionTitles {
    fn default() -> Self {
        SectionTitles {
            skills: "Skills".to_string(),
            experience: "Experience".to_string(),
            projects: "Projects".to_string(),
            education: "Education".to_string(),
        }
    }
}

impl SectionTitles {
    pub fn title_for(&self, section: SectionKind) -> &str {
        match section {
            SectionKind::Skills => &self.skills,
            SectionKind::Experience => &self.experience,
            SectionKind::Projects => &self.projects,
            SectionKind::Education => &self.education,
        }
    }
}

/// How experience items become blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceGrouping {
    /// One block per role. Each role is atomic.
    #[default]
    PerRole,
    /// One section-level block holding every role; may be split between roles.
    Section,
}

// ────────────────────────────────────────────────────────────────────────────
// Template configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TemplateConfigInput")]
pub struct TemplateConfig {
    pub page: PageFormat,
    pub padding: Padding,
    pub typography: Typography,
    pub spacing: Spacing,
    pub max_bullets_per_role: usize,
    /// Skill items assumed to fit on one line by the estimated strategy.
    pub skills_items_per_line: usize,
    pub experience_grouping: ExperienceGrouping,
    pub section_order: Vec<SectionKind>,
    pub section_titles: SectionTitles,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        TemplateConfig {
            page: PageFormat::A4_96DPI,
            padding: Padding::default(),
            typography: Typography::default(),
            spacing: Spacing::default(),
            max_bullets_per_role: 5,
            skills_items_per_line: 4,
            experience_grouping: ExperienceGrouping::default(),
            section_order: vec![
                SectionKind::Skills,
                SectionKind::Experience,
                SectionKind::Projects,
                SectionKind::Education,
            ],
            section_titles: SectionTitles::default(),
        }
    }
}

impl TemplateConfig {
    /// Default template in the given font family.
    pub fn with_font(font: FontFamily) -> Self {
        let mut template = TemplateConfig::default();
        template.typography.font = font;
        template
    }

    /// Vertical pixel budget of one page: page height minus top and bottom padding.
    /// Identical for every page, including the first.
    pub fn capacity(&self) -> f32 {
        self.page.height_px - self.padding.top - self.padding.bottom
    }

    pub fn content_width(&self) -> f32 {
        self.page.width_px - self.padding.left - self.padding.right
    }

    pub fn typography_context(&self) -> TypographyContext {
        TypographyContext {
            content_width_px: self.content_width(),
            typography: self.typography.clone(),
            spacing: self.spacing.clone(),
            max_bullets_per_role: self.max_bullets_per_role,
            skills_items_per_line: self.skills_items_per_line,
        }
    }

    /// Checks every field the engine relies on. Called at startup and request ingress.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let positive = |name: &str, v: f32| -> Result<(), LayoutError> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(LayoutError::Configuration(format!(
                    "{name} must be a positive number, got {v}"
                )))
            }
        };
        let non_negative = |name: &str, v: f32| -> Result<(), LayoutError> {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(LayoutError::Configuration(format!(
                    "{name} must not be negative, got {v}"
                )))
            }
        };

        positive("page.width_px", self.page.width_px)?;
        positive("page.height_px", self.page.height_px)?;
        for (name, v) in [
            ("padding.top", self.padding.top),
            ("padding.right", self.padding.right),
            ("padding.bottom", self.padding.bottom),
            ("padding.left", self.padding.left),
        ] {
            non_negative(name, v)?;
        }
        positive("page capacity (height minus vertical padding)", self.capacity())?;
        positive("content width (width minus horizontal padding)", self.content_width())?;

        let t = &self.typography;
        for (name, v) in [
            ("typography.name_size_px", t.name_size_px),
            ("typography.headline_size_px", t.headline_size_px),
            ("typography.section_title_size_px", t.section_title_size_px),
            ("typography.entry_title_size_px", t.entry_title_size_px),
            ("typography.body_size_px", t.body_size_px),
            ("typography.meta_size_px", t.meta_size_px),
            ("typography.line_height", t.line_height),
            ("typography.heading_line_height", t.heading_line_height),
        ] {
            positive(name, v)?;
        }
        non_negative("typography.bullet_indent_px", t.bullet_indent_px)?;
        positive(
            "bullet line width",
            t.line_width_px(TextRole::Bullet, self.content_width()),
        )?;

        let s = &self.spacing;
        for (name, v) in [
            ("spacing.header_gap_px", s.header_gap_px),
            ("spacing.section_gap_px", s.section_gap_px),
            ("spacing.title_gap_px", s.title_gap_px),
            ("spacing.entry_gap_px", s.entry_gap_px),
        ] {
            non_negative(name, v)?;
        }

        if self.max_bullets_per_role == 0 {
            return Err(LayoutError::Configuration(
                "max_bullets_per_role must be at least 1".to_string(),
            ));
        }
        if self.skills_items_per_line == 0 {
            return Err(LayoutError::Configuration(
                "skills_items_per_line must be at least 1".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for section in &self.section_order {
            if !seen.insert(*section) {
                return Err(LayoutError::Configuration(format!(
                    "section_order lists {section:?} more than once"
                )));
            }
        }

        Ok(())
    }
}

/// Wire form of `TemplateConfig`. Page dimensions and padding have no defaults:
/// a template that omits them is a configuration error, not a silent A4.
#[derive(Debug, Deserialize)]
struct TemplateConfigInput {
    page: Option<PageFormat>,
    padding: Option<Padding>,
    #[serde(default)]
    typography: Typography,
    #[serde(default)]
    spacing: Spacing,
    max_bullets_per_role: Option<usize>,
    skills_items_per_line: Option<usize>,
    #[serde(default)]
    experience_grouping: ExperienceGrouping,
    section_order: Option<Vec<SectionKind>>,
    #[serde(default)]
    section_titles: SectionTitles,
}

impl TryFrom<TemplateConfigInput> for TemplateConfig {
    type Error = LayoutError;

    fn try_from(input: TemplateConfigInput) -> Result<Self, Self::Error> {
        let defaults = TemplateConfig::default();
        let page = input.page.ok_or_else(|| {
            LayoutError::Configuration("template is missing page dimensions".to_string())
        })?;
        let padding = input.padding.ok_or_else(|| {
            LayoutError::Configuration("template is missing page padding".to_string())
        })?;

        let template = TemplateConfig {
            page,
            padding,
            typography: input.typography,
            spacing: input.spacing,
            max_bullets_per_role: input
                .max_bullets_per_role
                .unwrap_or(defaults.max_bullets_per_role),
            skills_items_per_line: input
                .skills_items_per_line
                .unwrap_or(defaults.skills_items_per_line),
            experience_grouping: input.experience_grouping,
            section_order: input.section_order.unwrap_or(defaults.section_order),
            section_titles: input.section_titles,
        };
        template.validate()?;
        Ok(template)
    }
}

/// Everything a height resolver needs to know about the rendering context.
/// Derived from a validated `TemplateConfig`; a change to any field invalidates heights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypographyContext {
    pub content_width_px: f32,
    pub typography: Typography,
    pub spacing: Spacing,
    pub max_bullets_per_role: usize,
    pub skills_items_per_line: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
