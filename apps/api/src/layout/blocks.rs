//! Block model and the Block Decomposer.
//!
//! A Block is the atomic layout unit. `decompose` turns a normalized résumé into the
//! ordered block sequence the rest of the engine works on:
//!
//! ```text
//! Header, [Summary], { SectionTitle, item, item, ... } per non-empty section
//! ```
//!
//! Blocks are rebuilt from the document on every change and never mutated in place.
//! The only block that can be cut in two is a multi-role `ExperienceEntry`, and only
//! between roles (see `Block::split_roles`).

use serde::{Deserialize, Serialize};

use crate::models::document::{
    EducationItem, ExperienceItem, ProjectItem, ResumeDocument, SkillCategory,
};
use crate::layout::template::{ExperienceGrouping, SectionKind, TemplateConfig};

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Header {
        name: String,
        title: String,
        contact: Vec<String>,
    },
    Summary {
        text: String,
    },
    SectionTitle {
        section: SectionKind,
        title: String,
    },
    SkillsCategory {
        category: String,
        items: Vec<String>,
    },
    /// One or more roles. With more than one role this is a section-level block whose
    /// roles are independent sub-entries and may be split across pages.
    ExperienceEntry {
        roles: Vec<ExperienceRole>,
        /// True for the second half of a split; the renderer uses it to mark continuations.
        #[serde(default)]
        continued: bool,
    },
    ProjectEntry {
        title: String,
        tech: Vec<String>,
        bullets: Vec<String>,
    },
    EducationEntry {
        degree: String,
        institute: String,
        year: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceRole {
    pub role: String,
    pub company: String,
    pub dates: String,
    pub location: Option<String>,
    pub bullets: Vec<String>,
}

/// Discriminant of a `Block`, for logging and validator messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Header,
    Summary,
    SectionTitle,
    SkillsCategory,
    ExperienceEntry,
    ProjectEntry,
    EducationEntry,
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Header { .. } => BlockKind::Header,
            Block::Summary { .. } => BlockKind::Summary,
            Block::SectionTitle { .. } => BlockKind::SectionTitle,
            Block::SkillsCategory { .. } => BlockKind::SkillsCategory,
            Block::ExperienceEntry { .. } => BlockKind::ExperienceEntry,
            Block::ProjectEntry { .. } => BlockKind::ProjectEntry,
            Block::EducationEntry { .. } => BlockKind::EducationEntry,
        }
    }

    pub fn is_section_title(&self) -> bool {
        matches!(self, Block::SectionTitle { .. })
    }

    /// Number of independent sub-entries this block can be split between.
    /// Zero for every block except `ExperienceEntry`.
    pub fn sub_entry_count(&self) -> usize {
        match self {
            Block::ExperienceEntry { roles, .. } => roles.len(),
            _ => 0,
        }
    }

    pub fn is_splittable(&self) -> bool {
        self.sub_entry_count() >= 2
    }

    /// Splits an `ExperienceEntry` so the first `at` roles stay in the first part.
    ///
    /// Returns `None` for any other block or when either part would be empty.
    /// The second part is marked `continued`.
    pub fn split_roles(&self, at: usize) -> Option<(Block, Block)> {
        match self {
            Block::ExperienceEntry { roles, continued } if at > 0 && at < roles.len() => {
                let first = Block::ExperienceEntry {
                    roles: roles[..at].to_vec(),
                    continued: *continued,
                };
                let second = Block::ExperienceEntry {
                    roles: roles[at..].to_vec(),
                    continued: true,
                };
                Some((first, second))
            }
            _ => None,
        }
    }

    /// Appends the roles of a continuation fragment, undoing `split_roles`.
    /// Returns false (and leaves `self` untouched) when the blocks are not fragments
    /// of one experience block.
    pub fn absorb_continuation(&mut self, next: &Block) -> bool {
        match (self, next) {
            (
                Block::ExperienceEntry { roles, .. },
                Block::ExperienceEntry {
                    roles: more,
                    continued: true,
                },
            ) => {
                roles.extend(more.iter().cloned());
                true
            }
            _ => false,
        }
    }

    /// Short human label used in logs and validator messages.
    pub fn label(&self) -> String {
        match self {
            Block::Header { name, .. } => format!("header '{name}'"),
            Block::Summary { .. } => "summary".to_string(),
            Block::SectionTitle { title, .. } => format!("section title '{title}'"),
            Block::SkillsCategory { category, .. } => format!("skills '{category}'"),
            Block::ExperienceEntry { roles, .. } => match roles.as_slice() {
                [only] => format!("experience '{}'", only.role),
                _ => format!("experience ({} roles)", roles.len()),
            },
            Block::ProjectEntry { title, .. } => format!("project '{title}'"),
            Block::EducationEntry { degree, .. } => format!("education '{degree}'"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Decomposer
// ────────────────────────────────────────────────────────────────────────────

/// Converts a document into its ordered block sequence. Deterministic and pure.
///
/// - Header comes first unless it is entirely blank; Summary only when it has text.
/// - A document with no content at all yields no blocks (an empty, valid layout).
/// - Sections follow `template.section_order`; a section with no non-empty items
///   emits nothing at all, so a title is never orphaned by decomposition.
/// - Experience bullets are cut to `max_bullets_per_role` here, so measured and
///   rendered content are the same content.
pub fn decompose(document: &ResumeDocument, template: &TemplateConfig) -> Vec<Block> {
    let mut blocks = Vec::new();

    let header = &document.header;
    let contact: Vec<String> = header
        .contact_fields()
        .into_iter()
        .map(str::to_string)
        .collect();
    let name = header.name.trim();
    let title = header.title.trim();
    if !name.is_empty() || !title.is_empty() || !contact.is_empty() {
        blocks.push(Block::Header {
            name: name.to_string(),
            title: title.to_string(),
            contact,
        });
    }

    let summary = document.summary.trim();
    if !summary.is_empty() {
        blocks.push(Block::Summary {
            text: summary.to_string(),
        });
    }

    for &section in &template.section_order {
        let items = section_blocks(document, template, section);
        if items.is_empty() {
            continue;
        }
        blocks.push(Block::SectionTitle {
            section,
            title: template.section_titles.title_for(section).to_string(),
        });
        blocks.extend(items);
    }

    blocks
}

fn section_blocks(
    document: &ResumeDocument,
    template: &TemplateConfig,
    section: SectionKind,
) -> Vec<Block> {
    match section {
        SectionKind::Skills => document
            .skills
            .iter()
            .filter(|s| !s.is_empty())
            .map(skills_block)
            .collect(),
        SectionKind::Experience => {
            let roles: Vec<ExperienceRole> = document
                .experience
                .iter()
                .filter(|e| !e.is_empty())
                .map(|e| experience_role(e, template.max_bullets_per_role))
                .collect();
            if roles.is_empty() {
                return vec![];
            }
            match template.experience_grouping {
                ExperienceGrouping::PerRole => roles
                    .into_iter()
                    .map(|role| Block::ExperienceEntry {
                        roles: vec![role],
                        continued: false,
                    })
                    .collect(),
                ExperienceGrouping::Section => vec![Block::ExperienceEntry {
                    roles,
                    continued: false,
                }],
            }
        }
        SectionKind::Projects => document
            .projects
            .iter()
            .filter(|p| !p.is_empty())
            .map(project_block)
            .collect(),
        SectionKind::Education => document
            .education
            .iter()
            .filter(|e| !e.is_empty())
            .map(education_block)
            .collect(),
    }
}

fn non_blank(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn skills_block(skills: &SkillCategory) -> Block {
    Block::SkillsCategory {
        category: skills.category.trim().to_string(),
        items: non_blank(&skills.items),
    }
}

fn experience_role(item: &ExperienceItem, max_bullets: usize) -> ExperienceRole {
    let mut bullets = non_blank(&item.bullets);
    bullets.truncate(max_bullets);
    ExperienceRole {
        role: item.role.trim().to_string(),
        company: item.company.trim().to_string(),
        dates: item.dates.trim().to_string(),
        location: item
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string),
        bullets,
    }
}

fn project_block(project: &ProjectItem) -> Block {
    Block::ProjectEntry {
        title: project.title.trim().to_string(),
        tech: non_blank(&project.tech),
        bullets: non_blank(&project.bullets),
    }
}

fn education_block(education: &EducationItem) -> Block {
    Block::EducationEntry {
        degree: education.degree.trim().to_string(),
        institute: education.institute.trim().to_string(),
        year: education.year.trim().to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::ResumeHeader;

    fn make_document() -> ResumeDocument {
        ResumeDocument {
            header: ResumeHeader {
                name: "Ada Lovelace".to_string(),
                title: "Analytical Engineer".to_string(),
                email: Some("ada@example.com".to_string()),
                ..Default::default()
            },
            summary: "Mathematician writing the first published algorithm.".to_string(),
            skills: vec![SkillCategory {
                category: "Languages".to_string(),
                items: vec!["Rust".to_string(), "Go".to_string()],
            }],
            experience: vec![
                ExperienceItem {
                    role: "Engineer".to_string(),
                    company: "Babbage & Co".to_string(),
                    dates: "1842 – 1843".to_string(),
                    location: None,
                    bullets: vec!["Wrote Note G".to_string()],
                },
                ExperienceItem {
                    role: "Translator".to_string(),
                    company: "Taylor's Scientific Memoirs".to_string(),
                    dates: "1842".to_string(),
                    location: Some("London".to_string()),
                    bullets: vec![],
                },
            ],
            projects: vec![],
            education: vec![EducationItem {
                degree: "Private tutoring".to_string(),
                institute: "Augustus De Morgan".to_string(),
                year: "1840".to_string(),
            }],
        }
    }

    fn kinds(blocks: &[Block]) -> Vec<BlockKind> {
        blocks.iter().map(Block::kind).collect()
    }

    #[test]
    fn test_decompose_order() {
        let blocks = decompose(&make_document(), &TemplateConfig::default());
        assert_eq!(
            kinds(&blocks),
            vec![
                BlockKind::Header,
                BlockKind::Summary,
                BlockKind::SectionTitle,
                BlockKind::SkillsCategory,
                BlockKind::SectionTitle,
                BlockKind::ExperienceEntry,
                BlockKind::ExperienceEntry,
                BlockKind::SectionTitle,
                BlockKind::EducationEntry,
            ]
        );
    }

    #[test]
    fn test_empty_section_emits_no_title() {
        let blocks = decompose(&make_document(), &TemplateConfig::default());
        let titles: Vec<&str> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::SectionTitle { title, .. } => Some(title.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(titles, vec!["Skills", "Experience", "Education"]);
    }

    #[test]
    fn test_blank_summary_is_skipped() {
        let mut doc = make_document();
        doc.summary = "   ".to_string();
        let blocks = decompose(&doc, &TemplateConfig::default());
        assert!(!blocks.iter().any(|b| b.kind() == BlockKind::Summary));
    }

    #[test]
    fn test_header_only_document() {
        let doc = ResumeDocument {
            header: ResumeHeader {
                name: "Ada".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let blocks = decompose(&doc, &TemplateConfig::default());
        assert_eq!(kinds(&blocks), vec![BlockKind::Header]);
    }

    #[test]
    fn test_empty_document_has_no_blocks() {
        let blocks = decompose(&ResumeDocument::default(), &TemplateConfig::default());
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_section_of_blank_items_is_dropped() {
        let mut doc = make_document();
        doc.skills = vec![SkillCategory {
            category: "Empty".to_string(),
            items: vec!["".to_string()],
        }];
        let blocks = decompose(&doc, &TemplateConfig::default());
        assert!(!blocks.iter().any(|b| matches!(
            b,
            Block::SectionTitle {
                section: SectionKind::Skills,
                ..
            }
        )));
    }

    #[test]
    fn test_items_keep_original_order() {
        let blocks = decompose(&make_document(), &TemplateConfig::default());
        let roles: Vec<String> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::ExperienceEntry { roles, .. } => Some(roles[0].role.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(roles, vec!["Engineer", "Translator"]);
    }

    #[test]
    fn test_section_order_is_configurable() {
        let mut template = TemplateConfig::default();
        template.section_order = vec![SectionKind::Education, SectionKind::Skills];
        let blocks = decompose(&make_document(), &template);
        assert_eq!(
            kinds(&blocks),
            vec![
                BlockKind::Header,
                BlockKind::Summary,
                BlockKind::SectionTitle,
                BlockKind::EducationEntry,
                BlockKind::SectionTitle,
                BlockKind::SkillsCategory,
            ]
        );
    }

    #[test]
    fn test_bullets_truncated_to_max_per_role() {
        let mut doc = make_document();
        doc.experience[0].bullets = (0..9).map(|i| format!("Bullet {i}")).collect();
        let mut template = TemplateConfig::default();
        template.max_bullets_per_role = 3;
        let blocks = decompose(&doc, &template);
        let first_role = blocks
            .iter()
            .find_map(|b| match b {
                Block::ExperienceEntry { roles, .. } => Some(roles[0].clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(first_role.bullets, vec!["Bullet 0", "Bullet 1", "Bullet 2"]);
    }

    #[test]
    fn test_section_grouping_emits_one_splittable_block() {
        let mut template = TemplateConfig::default();
        template.experience_grouping = ExperienceGrouping::Section;
        let blocks = decompose(&make_document(), &template);
        let experience: Vec<&Block> = blocks
            .iter()
            .filter(|b| b.kind() == BlockKind::ExperienceEntry)
            .collect();
        assert_eq!(experience.len(), 1);
        assert!(experience[0].is_splittable());
    }

    #[test]
    fn test_decompose_is_deterministic() {
        let doc = make_document();
        let template = TemplateConfig::default();
        assert_eq!(decompose(&doc, &template), decompose(&doc, &template));
    }

    #[test]
    fn test_split_and_absorb_round_trip() {
        let mut template = TemplateConfig::default();
        template.experience_grouping = ExperienceGrouping::Section;
        let blocks = decompose(&make_document(), &template);
        let grouped = blocks
            .iter()
            .find(|b| b.is_splittable())
            .cloned()
            .unwrap();

        let (mut first, second) = grouped.split_roles(1).unwrap();
        assert_eq!(first.sub_entry_count(), 1);
        assert!(matches!(second, Block::ExperienceEntry { continued: true, .. }));
        assert!(first.absorb_continuation(&second));
        assert_eq!(first, grouped);
    }

    #[test]
    fn test_split_rejects_empty_parts() {
        let block = Block::Summary {
            text: "x".to_string(),
        };
        assert!(block.split_roles(1).is_none());
        let single = Block::ExperienceEntry {
            roles: vec![ExperienceRole {
                role: "A".to_string(),
                company: String::new(),
                dates: String::new(),
                location: None,
                bullets: vec![],
            }],
            continued: false,
        };
        assert!(single.split_roles(0).is_none());
        assert!(single.split_roles(1).is_none());
    }
}
