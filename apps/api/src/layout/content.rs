//! Rendered content of a block.
//!
//! `Block::content` is the single description of what a block looks like on the page:
//! ordered text runs, each with a typographic role, grouped into sub-entries, plus the
//! vertical spacing around them. The measured height strategy lays out exactly this,
//! and the page renderer emits exactly this. There is no second representation.

use serde::{Deserialize, Serialize};

use crate::layout::blocks::{Block, ExperienceRole};
use crate::layout::template::{TextRole, TypographyContext};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub role: TextRole,
    pub text: String,
}

/// A vertically stacked group of runs. Splittable blocks have one group per sub-entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentGroup {
    pub gap_before_px: f32,
    pub runs: Vec<TextRun>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockContent {
    pub margin_top_px: f32,
    pub margin_bottom_px: f32,
    pub groups: Vec<ContentGroup>,
}

impl BlockContent {
    fn single(margin_top_px: f32, margin_bottom_px: f32, runs: Vec<TextRun>) -> Self {
        BlockContent {
            margin_top_px,
            margin_bottom_px,
            groups: vec![ContentGroup {
                gap_before_px: 0.0,
                runs,
            }],
        }
    }
}

fn run(role: TextRole, text: impl Into<String>) -> TextRun {
    TextRun {
        role,
        text: text.into(),
    }
}

/// Joins the non-empty parts with a middle dot, the separator used on every meta line.
fn meta_line<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" · ")
}

fn role_group(role: &ExperienceRole, ctx: &TypographyContext) -> ContentGroup {
    let title = match (role.role.is_empty(), role.company.is_empty()) {
        (false, false) => format!("{}, {}", role.role, role.company),
        (false, true) => role.role.clone(),
        (true, _) => role.company.clone(),
    };

    let mut runs = Vec::new();
    if !title.is_empty() {
        runs.push(run(TextRole::EntryTitle, title));
    }
    let meta = meta_line([role.dates.as_str(), role.location.as_deref().unwrap_or("")]);
    if !meta.is_empty() {
        runs.push(run(TextRole::Meta, meta));
    }
    runs.extend(
        role.bullets
            .iter()
            .take(ctx.max_bullets_per_role)
            .map(|b| run(TextRole::Bullet, b.as_str())),
    );

    ContentGroup {
        gap_before_px: ctx.spacing.entry_gap_px,
        runs,
    }
}

impl Block {
    pub fn content(&self, ctx: &TypographyContext) -> BlockContent {
        let spacing = &ctx.spacing;
        match self {
            Block::Header {
                name,
                title,
                contact,
            } => {
                let mut runs = Vec::new();
                if !name.is_empty() {
                    runs.push(run(TextRole::Name, name.as_str()));
                }
                if !title.is_empty() {
                    runs.push(run(TextRole::Headline, title.as_str()));
                }
                if !contact.is_empty() {
                    runs.push(run(TextRole::Contact, meta_line(contact.iter().map(String::as_str))));
                }
                BlockContent::single(0.0, spacing.header_gap_px, runs)
            }

            Block::Summary { text } => BlockContent::single(
                spacing.section_gap_px,
                0.0,
                vec![run(TextRole::Body, text.as_str())],
            ),

            Block::SectionTitle { title, .. } => BlockContent::single(
                spacing.section_gap_px,
                spacing.title_gap_px,
                vec![run(TextRole::SectionTitle, title.as_str())],
            ),

            Block::SkillsCategory { category, items } => {
                let list = items.join(", ");
                let text = if category.is_empty() {
                    list
                } else {
                    format!("{category}: {list}")
                };
                BlockContent::single(spacing.entry_gap_px, 0.0, vec![run(TextRole::Body, text)])
            }

            // Margins live in the per-role gaps so that a block's height is exactly the
            // sum of its role heights, which is what lets the packer split it.
            Block::ExperienceEntry { roles, .. } => BlockContent {
                margin_top_px: 0.0,
                margin_bottom_px: 0.0,
                groups: roles.iter().map(|r| role_group(r, ctx)).collect(),
            },

            Block::ProjectEntry {
                title,
                tech,
                bullets,
            } => {
                let mut runs = Vec::new();
                if !title.is_empty() {
                    runs.push(run(TextRole::EntryTitle, title.as_str()));
                }
                if !tech.is_empty() {
                    runs.push(run(TextRole::Meta, meta_line(tech.iter().map(String::as_str))));
                }
                runs.extend(bullets.iter().map(|b| run(TextRole::Bullet, b.as_str())));
                BlockContent::single(spacing.entry_gap_px, 0.0, runs)
            }

            Block::EducationEntry {
                degree,
                institute,
                year,
            } => {
                let mut runs = Vec::new();
                if !degree.is_empty() {
                    runs.push(run(TextRole::EntryTitle, degree.as_str()));
                }
                let meta = meta_line([institute.as_str(), year.as_str()]);
                if !meta.is_empty() {
                    runs.push(run(TextRole::Meta, meta));
                }
                BlockContent::single(spacing.entry_gap_px, 0.0, runs)
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::template::TemplateConfig;

    fn make_ctx() -> TypographyContext {
        TemplateConfig::default().typography_context()
    }

    fn make_role(role: &str, company: &str, bullets: usize) -> ExperienceRole {
        ExperienceRole {
            role: role.to_string(),
            company: company.to_string(),
            dates: "2020 – 2023".to_string(),
            location: Some("Berlin".to_string()),
            bullets: (0..bullets).map(|i| format!("Did thing {i}")).collect(),
        }
    }

    fn roles_of(content: &BlockContent) -> Vec<Vec<TextRole>> {
        content
            .groups
            .iter()
            .map(|g| g.runs.iter().map(|r| r.role).collect())
            .collect()
    }

    #[test]
    fn test_header_runs() {
        let block = Block::Header {
            name: "Ada".to_string(),
            title: "Engineer".to_string(),
            contact: vec!["ada@example.com".to_string(), "London".to_string()],
        };
        let content = block.content(&make_ctx());
        assert_eq!(
            roles_of(&content),
            vec![vec![TextRole::Name, TextRole::Headline, TextRole::Contact]]
        );
        assert_eq!(content.groups[0].runs[2].text, "ada@example.com · London");
    }

    #[test]
    fn test_experience_has_one_group_per_role() {
        let block = Block::ExperienceEntry {
            roles: vec![make_role("Engineer", "Acme", 2), make_role("Intern", "", 0)],
            continued: false,
        };
        let content = block.content(&make_ctx());
        assert_eq!(content.margin_top_px, 0.0);
        assert_eq!(content.margin_bottom_px, 0.0);
        assert_eq!(
            roles_of(&content),
            vec![
                vec![
                    TextRole::EntryTitle,
                    TextRole::Meta,
                    TextRole::Bullet,
                    TextRole::Bullet
                ],
                vec![TextRole::EntryTitle, TextRole::Meta],
            ]
        );
        assert_eq!(content.groups[0].runs[0].text, "Engineer, Acme");
        assert_eq!(content.groups[0].runs[1].text, "2020 – 2023 · Berlin");
        assert_eq!(content.groups[1].runs[0].text, "Intern");
    }

    #[test]
    fn test_experience_bullets_capped_by_context() {
        let mut ctx = make_ctx();
        ctx.max_bullets_per_role = 1;
        let block = Block::ExperienceEntry {
            roles: vec![make_role("Engineer", "Acme", 4)],
            continued: false,
        };
        let bullets = block.content(&ctx).groups[0]
            .runs
            .iter()
            .filter(|r| r.role == TextRole::Bullet)
            .count();
        assert_eq!(bullets, 1);
    }

    #[test]
    fn test_skills_line_has_category_prefix() {
        let block = Block::SkillsCategory {
            category: "Languages".to_string(),
            items: vec!["Rust".to_string(), "Go".to_string()],
        };
        let content = block.content(&make_ctx());
        assert_eq!(content.groups[0].runs[0].text, "Languages: Rust, Go");
    }

    #[test]
    fn test_section_title_spacing() {
        let ctx = make_ctx();
        let block = Block::SectionTitle {
            section: crate::layout::template::SectionKind::Skills,
            title: "Skills".to_string(),
        };
        let content = block.content(&ctx);
        assert_eq!(content.margin_top_px, ctx.spacing.section_gap_px);
        assert_eq!(content.margin_bottom_px, ctx.spacing.title_gap_px);
    }
}
