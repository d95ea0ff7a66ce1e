// Résumé pagination engine.
// Decompose → resolve heights → assign to pages → validate, with the renderer consuming
// the assigned pages. Measured passes are CPU-bound and run inside spawn_blocking.

pub mod assign;
pub mod blocks;
pub mod content;
pub mod errors;
pub mod font_metrics;
pub mod handlers;
pub mod height;
pub mod preview;
pub mod render;
pub mod shaping;
pub mod template;
pub mod validate;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::document::ResumeDocument;

pub use assign::{assign_to_pages, PageSet};
pub use blocks::{decompose, Block};
pub use errors::LayoutError;
pub use height::{resolve_heights, HeightStrategy, LayoutSurface, MeasureContext, ResolvedHeights};
pub use render::{render_page_set, RenderedDocument};
pub use template::TemplateConfig;
pub use validate::{validate, ValidationReport, ValidationRules};

/// Everything one layout pass produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutOutcome {
    pub blocks: Vec<Block>,
    pub heights: ResolvedHeights,
    pub pages: PageSet,
    pub report: ValidationReport,
    pub rendered: RenderedDocument,
}

impl LayoutOutcome {
    pub fn page_count(&self) -> usize {
        self.pages.page_count()
    }

    /// True when heights came from the estimated strategy.
    pub fn is_provisional(&self) -> bool {
        self.heights.is_provisional()
    }
}

/// Runs the full pipeline over one immutable snapshot of (document, template).
///
/// `surface` is the live layout surface for the measured strategy, if any; without one a
/// measured request falls back to estimated heights.
pub fn paginate(
    document: &ResumeDocument,
    template: &TemplateConfig,
    strategy: HeightStrategy,
    surface: Option<&dyn LayoutSurface>,
    rules: &ValidationRules,
) -> Result<LayoutOutcome, LayoutError> {
    template.validate()?;

    let started = std::time::Instant::now();
    let typography = template.typography_context();
    let blocks = decompose(document, template);
    let heights = resolve_heights(
        &blocks,
        strategy,
        &MeasureContext {
            typography: &typography,
            surface,
        },
    )?;
    let pages = assign_to_pages(&blocks, &heights.heights, template.capacity())?;
    let report = validate(&pages, rules);
    let rendered = render_page_set(&pages, template);

    debug!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Layout pass timings"
    );
    info!(
        blocks = blocks.len(),
        pages = pages.page_count(),
        strategy = ?heights.strategy,
        valid = report.valid,
        warnings = report.warnings.len(),
        "Layout pass complete"
    );

    Ok(LayoutOutcome {
        blocks,
        heights,
        pages,
        report,
        rendered,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
