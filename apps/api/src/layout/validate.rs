//! Page-Break Validator: advisory post-pass over a computed `PageSet`.
//!
//! Findings are data, never failures: `validate` can't return `Err` and never blocks
//! rendering or export. Errors point at assignment defects or oversized content; warnings
//! are suggestions an editing UI may surface.
//!
//! # Rules
//! - Error: a page's consumed height exceeds capacity (exact overflow in px).
//! - Error: an empty page appears before the last page.
//! - Error: a section title ends a page in the middle of the document.
//! - Warning: a section title is the very last block of the document.
//! - Warning: a page ends with less than `tight_fit_threshold_px` left.
//! - Warning: more than `max_recommended_pages` pages.
//! - Warning: the first page holds only the header.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::layout::assign::PageSet;
use crate::layout::blocks::Block;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    pub tight_fit_threshold_px: f32,
    pub max_recommended_pages: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        ValidationRules {
            tight_fit_threshold_px: 30.0,
            max_recommended_pages: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// One finding. Page indices are 0-based here and 1-based in messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutIssue {
    PageOverflow {
        page_index: usize,
        overflow_px: f32,
    },
    EmptyPage {
        page_index: usize,
    },
    TrailingSectionTitle {
        page_index: usize,
        title: String,
        end_of_document: bool,
    },
    TightFit {
        page_index: usize,
        remaining_px: f32,
    },
    TooManyPages {
        page_count: usize,
        max_recommended: usize,
    },
    HeaderOnlyFirstPage,
}

impl LayoutIssue {
    pub fn severity(&self) -> Severity {
        match self {
            LayoutIssue::PageOverflow { .. } | LayoutIssue::EmptyPage { .. } => Severity::Error,
            LayoutIssue::TrailingSectionTitle {
                end_of_document, ..
            } => {
                if *end_of_document {
                    Severity::Warning
                } else {
                    Severity::Error
                }
            }
            LayoutIssue::TightFit { .. }
            | LayoutIssue::TooManyPages { .. }
            | LayoutIssue::HeaderOnlyFirstPage => Severity::Warning,
        }
    }

    pub fn message(&self) -> String {
        match self {
            LayoutIssue::PageOverflow {
                page_index,
                overflow_px,
            } => format!(
                "Page {} overflows its capacity by {overflow_px}px",
                page_index + 1
            ),
            LayoutIssue::EmptyPage { page_index } => {
                format!("Page {} is empty but more pages follow it", page_index + 1)
            }
            LayoutIssue::TrailingSectionTitle {
                page_index,
                title,
                end_of_document,
            } => {
                if *end_of_document {
                    format!(
                        "Section title '{title}' ends the document on page {} with no content after it",
                        page_index + 1
                    )
                } else {
                    format!(
                        "Section title '{title}' is separated from its content at the bottom of page {}",
                        page_index + 1
                    )
                }
            }
            LayoutIssue::TightFit {
                page_index,
                remaining_px,
            } => format!(
                "Page {} has only {remaining_px}px left: possible orphaned heading/content near page bottom",
                page_index + 1
            ),
            LayoutIssue::TooManyPages { page_count, .. } => {
                format!("Document spans {page_count} pages; consider condensing.")
            }
            LayoutIssue::HeaderOnlyFirstPage => {
                "First page contains only the header; add more content.".to_string()
            }
        }
    }
}

/// Result of a validation pass. `errors` and `warnings` hold the messages of `issues`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub issues: Vec<LayoutIssue>,
    pub page_count: usize,
}

impl ValidationReport {
    fn from_issues(issues: Vec<LayoutIssue>, page_count: usize) -> Self {
        let (errors, warnings): (Vec<_>, Vec<_>) = issues
            .iter()
            .partition(|i| i.severity() == Severity::Error);
        let errors: Vec<String> = errors.into_iter().map(LayoutIssue::message).collect();
        let warnings: Vec<String> = warnings.into_iter().map(LayoutIssue::message).collect();

        ValidationReport {
            valid: errors.is_empty(),
            errors,
            warnings,
            issues,
            page_count,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

pub fn validate(page_set: &PageSet, rules: &ValidationRules) -> ValidationReport {
    let mut issues = Vec::new();
    let page_count = page_set.page_count();
    let capacity = page_set.capacity;

    for (page_index, page) in page_set.pages.iter().enumerate() {
        let is_last_page = page_index + 1 == page_count;

        let Some(last) = page.blocks.last() else {
            if !is_last_page {
                issues.push(LayoutIssue::EmptyPage { page_index });
            }
            continue;
        };

        let consumed = page.consumed_height();
        let remaining = capacity - consumed;
        if remaining < 0.0 {
            issues.push(LayoutIssue::PageOverflow {
                page_index,
                overflow_px: -remaining,
            });
        } else if remaining < rules.tight_fit_threshold_px {
            issues.push(LayoutIssue::TightFit {
                page_index,
                remaining_px: remaining,
            });
        }

        if let Block::SectionTitle { title, .. } = &last.block {
            issues.push(LayoutIssue::TrailingSectionTitle {
                page_index,
                title: title.clone(),
                end_of_document: is_last_page,
            });
        }
    }

    if page_count > rules.max_recommended_pages {
        issues.push(LayoutIssue::TooManyPages {
            page_count,
            max_recommended: rules.max_recommended_pages,
        });
    }

    if let Some(first) = page_set.pages.first() {
        if let [only] = first.blocks.as_slice() {
            if matches!(only.block, Block::Header { .. }) {
                issues.push(LayoutIssue::HeaderOnlyFirstPage);
            }
        }
    }

    let report = ValidationReport::from_issues(issues, page_count);
    for error in &report.errors {
        warn!(page_count, "Layout error: {error}");
    }
    report
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
