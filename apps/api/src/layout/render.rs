//! Page Renderer: the one representation of a computed `PageSet`.
//!
//! Preview and export both consume `RenderedDocument` (and its HTML serialization)
//! unmodified; there is no export-only template. Every block is positioned at an explicit
//! offset inside the padded content box of a fixed-size page, carrying exactly the
//! `BlockContent` its height was measured from.
//!
//! A block whose bottom edge falls below the content box would be clipped by the page
//! container. That is an assignment defect (or an oversized block the validator already
//! flagged), so it is recorded in `clipped` and logged, never accepted silently.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::layout::assign::PageSet;
use crate::layout::blocks::{Block, BlockKind};
use crate::layout::content::BlockContent;
use crate::layout::font_metrics::FontFamily;
use crate::layout::template::{Padding, TemplateConfig, TextRole, Typography};

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedElement {
    pub source_index: usize,
    pub kind: BlockKind,
    /// Offset from the top of the content box.
    pub y_px: f32,
    pub height_px: f32,
    /// Second half of a split experience block.
    pub continued: bool,
    pub content: BlockContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedPage {
    pub index: usize,
    pub elements: Vec<RenderedElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClippedElement {
    pub page_index: usize,
    pub source_index: usize,
    pub overflow_px: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedDocument {
    pub page_width_px: f32,
    pub page_height_px: f32,
    pub padding: Padding,
    pub content_width_px: f32,
    pub content_height_px: f32,
    pub font: FontFamily,
    pub typography: Typography,
    pub page_count: usize,
    pub pages: Vec<RenderedPage>,
    pub clipped: Vec<ClippedElement>,
}

// ────────────────────────────────────────────────────────────────────────────
// Rendering
// ────────────────────────────────────────────────────────────────────────────

pub fn render_page_set(page_set: &PageSet, template: &TemplateConfig) -> RenderedDocument {
    let ctx = template.typography_context();
    let content_height_px = template.capacity();
    let mut clipped = Vec::new();

    let pages: Vec<RenderedPage> = page_set
        .pages
        .iter()
        .enumerate()
        .map(|(index, page)| {
            let mut y_px = 0.0;
            let elements = page
                .blocks
                .iter()
                .map(|placed| {
                    let element = RenderedElement {
                        source_index: placed.source_index,
                        kind: placed.block.kind(),
                        y_px,
                        height_px: placed.height_px,
                        continued: matches!(
                            placed.block,
                            Block::ExperienceEntry {
                                continued: true,
                                ..
                            }
                        ),
                        content: placed.block.content(&ctx),
                    };
                    y_px += placed.height_px;

                    let overflow_px = y_px - content_height_px;
                    if overflow_px > 0.0 {
                        error!(
                            page = index + 1,
                            block = placed.source_index,
                            label = %placed.block.label(),
                            overflow_px,
                            "Rendered block is clipped by the page boundary"
                        );
                        clipped.push(ClippedElement {
                            page_index: index,
                            source_index: placed.source_index,
                            overflow_px,
                        });
                    }
                    element
                })
                .collect();
            RenderedPage { index, elements }
        })
        .collect();

    RenderedDocument {
        page_width_px: template.page.width_px,
        page_height_px: template.page.height_px,
        padding: template.padding,
        content_width_px: template.content_width(),
        content_height_px,
        font: template.typography.font,
        typography: template.typography.clone(),
        page_count: pages.len(),
        pages,
        clipped,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HTML serialization
// ────────────────────────────────────────────────────────────────────────────

const ROLES: [TextRole; 8] = [
    TextRole::Name,
    TextRole::Headline,
    TextRole::Contact,
    TextRole::SectionTitle,
    TextRole::Body,
    TextRole::EntryTitle,
    TextRole::Meta,
    TextRole::Bullet,
];

fn role_class(role: TextRole) -> &'static str {
    match role {
        TextRole::Name => "name",
        TextRole::Headline => "headline",
        TextRole::Contact => "contact",
        TextRole::SectionTitle => "section-title",
        TextRole::Body => "body",
        TextRole::EntryTitle => "entry-title",
        TextRole::Meta => "meta",
        TextRole::Bullet => "bullet",
    }
}

fn kind_class(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Header => "header",
        BlockKind::Summary => "summary",
        BlockKind::SectionTitle => "section-title",
        BlockKind::SkillsCategory => "skills-category",
        BlockKind::ExperienceEntry => "experience-entry",
        BlockKind::ProjectEntry => "project-entry",
        BlockKind::EducationEntry => "education-entry",
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

impl RenderedDocument {
    fn stylesheet(&self) -> String {
        let t = &self.typography;
        let mut css = format!(
            "*{{box-sizing:border-box}}\
             body{{margin:0;background:#e5e5e5}}\
             .page{{position:relative;width:{w}px;height:{h}px;overflow:hidden;background:#fff;\
             margin:0 auto 16px;page-break-after:always;font-family:{font}}}\
             .block{{position:absolute;left:{left}px;width:{cw}px}}\
             .run{{margin:0;white-space:normal;overflow-wrap:anywhere}}\
             .bullet{{padding-left:{indent}px;position:relative}}\
             .bullet::before{{content:'\\2022';position:absolute;left:0}}",
            w = self.page_width_px,
            h = self.page_height_px,
            font = self.font.css_stack(),
            left = self.padding.left,
            cw = self.content_width_px,
            indent = t.bullet_indent_px,
        );
        for role in ROLES {
            css.push_str(&format!(
                ".run.{}{{font-size:{}px;line-height:{}px;font-weight:{}}}",
                role_class(role),
                t.font_size_px(role),
                t.line_height_px(role),
                if Typography::is_bold(role) { 700 } else { 400 },
            ));
        }
        css
    }

    fn element_html(&self, element: &RenderedElement) -> String {
        let content = &element.content;
        let mut html = format!(
            "<div class=\"block {kind}{cont}\" data-source=\"{src}\" \
             style=\"top:{top}px;height:{height}px;padding-top:{mt}px\">",
            kind = kind_class(element.kind),
            cont = if element.continued { " continued" } else { "" },
            src = element.source_index,
            top = self.padding.top + element.y_px,
            height = element.height_px,
            mt = content.margin_top_px,
        );
        for group in &content.groups {
            html.push_str(&format!(
                "<div class=\"group\" style=\"padding-top:{}px\">",
                group.gap_before_px
            ));
            for run in &group.runs {
                html.push_str(&format!(
                    "<p class=\"run {}\">{}</p>",
                    role_class(run.role),
                    escape_html(&run.text)
                ));
            }
            html.push_str("</div>");
        }
        html.push_str("</div>");
        html
    }

    /// Fixed-size HTML page containers, the same markup for preview and export.
    pub fn to_html(&self) -> String {
        let mut html = format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><style>{}</style></head><body>",
            self.stylesheet()
        );
        for page in &self.pages {
            html.push_str(&format!(
                "<section class=\"page\" data-page=\"{}\">",
                page.index + 1
            ));
            for element in &page.elements {
                html.push_str(&self.element_html(element));
            }
            html.push_str("</section>");
        }
        html.push_str("</body></html>");
        html
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::assign::assign_to_pages;
    use crate::layout::blocks::ExperienceRole;
    use crate::layout::height::BlockHeight;

    fn make_header(name: &str) -> Block {
        Block::Header {
            name: name.to_string(),
            title: "Engineer".to_string(),
            contact: vec!["ada@example.com".to_string()],
        }
    }

    fn make_section(roles: usize) -> Block {
        Block::ExperienceEntry {
            roles: (0..roles)
                .map(|n| ExperienceRole {
                    role: format!("Role {n}"),
                    company: "Acme".to_string(),
                    dates: "2020".to_string(),
                    location: None,
                    bullets: vec!["Shipped it".to_string()],
                })
                .collect(),
            continued: false,
        }
    }

    fn make_rendered(blocks: &[Block], heights: Vec<BlockHeight>) -> RenderedDocument {
        let template = TemplateConfig::default();
        let set = assign_to_pages(blocks, &heights, template.capacity()).unwrap();
        render_page_set(&set, &template)
    }

    #[test]
    fn test_elements_stack_from_top_of_content_box() {
        let blocks = vec![make_header("Ada"), make_section(1)];
        let doc = make_rendered(&blocks, vec![BlockHeight::from(90.0), BlockHeight::from(120.0)]);

        assert_eq!(doc.page_count, 1);
        let elements = &doc.pages[0].elements;
        assert_eq!(elements[0].y_px, 0.0);
        assert_eq!(elements[1].y_px, 90.0);
        assert_eq!(elements[1].kind, BlockKind::ExperienceEntry);
        assert!(doc.clipped.is_empty());
    }

    #[test]
    fn test_page_dimensions_come_from_template() {
        let doc = make_rendered(&[make_header("Ada")], vec![BlockHeight::from(90.0)]);
        assert_eq!(doc.page_width_px, 794.0);
        assert_eq!(doc.page_height_px, 1123.0);
        assert_eq!(doc.content_height_px, 971.0);
        assert_eq!(doc.content_width_px, 674.0);
    }

    #[test]
    fn test_oversized_block_is_recorded_as_clipped() {
        let doc = make_rendered(&[make_section(1)], vec![BlockHeight::from(1200.0)]);
        assert_eq!(
            doc.clipped,
            vec![ClippedElement {
                page_index: 0,
                source_index: 0,
                overflow_px: 229.0
            }]
        );
    }

    #[test]
    fn test_continued_fragment_is_marked() {
        let blocks = vec![make_section(2)];
        let doc = make_rendered(
            &blocks,
            vec![BlockHeight::with_entries(vec![600.0, 600.0])],
        );
        assert_eq!(doc.page_count, 2);
        assert!(!doc.pages[0].elements[0].continued);
        assert!(doc.pages[1].elements[0].continued);
        assert!(doc.to_html().contains("experience-entry continued"));
    }

    #[test]
    fn test_html_has_one_fixed_size_section_per_page() {
        let blocks = vec![make_section(2)];
        let doc = make_rendered(
            &blocks,
            vec![BlockHeight::with_entries(vec![600.0, 600.0])],
        );
        let html = doc.to_html();
        assert_eq!(html.matches("<section class=\"page\"").count(), 2);
        assert!(html.contains("width:794px;height:1123px"));
        assert!(html.contains("top:76px"));
    }

    #[test]
    fn test_html_escapes_text() {
        let doc = make_rendered(
            &[make_header("<script>alert('x')</script>")],
            vec![BlockHeight::from(90.0)],
        );
        let html = doc.to_html();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_empty_page_set_renders_no_pages() {
        let doc = make_rendered(&[], vec![]);
        assert_eq!(doc.page_count, 0);
        assert!(!doc.to_html().contains("class=\"page\""));
    }
}
