//! Normalized résumé document model.
//!
//! This is the shape the content-extraction and editing collaborators hand to the
//! pagination engine. Every field is optional-by-default on the wire so a partially
//! filled résumé still deserializes; emptiness is decided by the decomposer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeDocument {
    pub header: ResumeHeader,
    pub summary: String,
    pub skills: Vec<SkillCategory>,
    pub experience: Vec<ExperienceItem>,
    pub projects: Vec<ProjectItem>,
    pub education: Vec<EducationItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeHeader {
    pub name: String,
    /// Professional headline shown under the name, e.g. "Senior Backend Engineer".
    pub title: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub links: Vec<String>,
}

impl ResumeHeader {
    /// Contact fields in display order, blanks skipped.
    pub fn contact_fields(&self) -> Vec<&str> {
        [&self.email, &self.phone, &self.location]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .chain(self.links.iter().map(String::as_str))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillCategory {
    pub category: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceItem {
    pub role: String,
    pub company: String,
    /// Free-form date range as entered, e.g. "Jan 2021 – Present".
    pub dates: String,
    pub location: Option<String>,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectItem {
    pub title: String,
    pub bullets: Vec<String>,
    pub tech: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationItem {
    pub degree: String,
    pub institute: String,
    pub year: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Emptiness checks used by the decomposer
// ────────────────────────────────────────────────────────────────────────────

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

impl SkillCategory {
    pub fn is_empty(&self) -> bool {
        self.items.iter().all(|i| is_blank(i))
    }
}

impl ExperienceItem {
    pub fn is_empty(&self) -> bool {
        is_blank(&self.role) && is_blank(&self.company) && self.bullets.iter().all(|b| is_blank(b))
    }
}

impl ProjectItem {
    pub fn is_empty(&self) -> bool {
        is_blank(&self.title) && self.bullets.iter().all(|b| is_blank(b))
    }
}

impl EducationItem {
    pub fn is_empty(&self) -> bool {
        is_blank(&self.degree) && is_blank(&self.institute)
    }
}
