//! Height Resolver: vertical extent of each block, by one of two strategies.
//!
//! # Strategies
//! - **Measured**: lay the block's content out on a `LayoutSurface` sized to the content
//!   width and read back the resolved extent. Canonical; used whenever a live surface
//!   exists. `ShapedSurface` is the built-in headless surface.
//! - **Estimated**: analytic line-count formulas per block type. A fallback when no
//!   surface is live, or a fast provisional pre-pass. Never the shipped result.
//!
//! Heights are whole pixels (rounded up), so page arithmetic downstream is exact.
//! For experience blocks the height is the sum of per-role heights and those are
//! reported in `BlockHeight::entries`, which is what the packer splits on.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::layout::blocks::Block;
use crate::layout::content::ContentGroup;
use crate::layout::errors::LayoutError;
use crate::layout::font_metrics::get_metrics;
use crate::layout::shaping::{line_count, ShapeStyle};
use crate::layout::template::{TextRole, Typography, TypographyContext};

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightStrategy {
    #[default]
    Measured,
    Estimated,
}

/// Resolved vertical extent of one block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockHeight {
    pub px: f32,
    /// Per-sub-entry heights of an experience block, summing to `px`. Empty otherwise.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<f32>,
}

impl BlockHeight {
    pub fn with_entries(entries: Vec<f32>) -> Self {
        BlockHeight {
            px: entries.iter().sum(),
            entries,
        }
    }
}

impl From<f32> for BlockHeight {
    fn from(px: f32) -> Self {
        BlockHeight {
            px,
            entries: vec![],
        }
    }
}

/// Heights for a whole block sequence, with the strategy that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedHeights {
    pub strategy: HeightStrategy,
    pub heights: Vec<BlockHeight>,
}

impl ResolvedHeights {
    /// Estimate-based heights may be shown while measuring but are never exported.
    pub fn is_provisional(&self) -> bool {
        self.strategy == HeightStrategy::Estimated
    }
}

/// Common contract of both strategies. Returns a non-negative height in pixels.
pub trait HeightResolver {
    fn strategy(&self) -> HeightStrategy;

    fn resolve_height(
        &self,
        block: &Block,
        ctx: &TypographyContext,
    ) -> Result<BlockHeight, LayoutError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Layout surfaces
// ────────────────────────────────────────────────────────────────────────────

/// Result of reading a content group's extent back from a layout surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutReading {
    Resolved(f32),
    /// The surface has not completed a layout pass; the value is not trustworthy yet.
    Pending,
}

/// A disposable layout context the measured strategy renders into.
pub trait LayoutSurface: Send + Sync {
    /// False when the surface cannot lay anything out right now (e.g. a detached
    /// renderer). The measured strategy is unavailable on a non-live surface.
    fn is_live(&self) -> bool {
        true
    }

    /// Lays out one content group at `ctx.content_width_px` and reports its extent.
    fn lay_out(&self, group: &ContentGroup, ctx: &TypographyContext) -> LayoutReading;
}

/// Headless surface: deterministic text shaping with the static font metric tables.
/// Always live, never pending.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapedSurface;

impl ShapedSurface {
    fn run_height(typography: &Typography, role: TextRole, text: &str, width_px: f32) -> f32 {
        let style = ShapeStyle {
            metrics: get_metrics(typography.font),
            size_px: typography.font_size_px(role),
            bold: Typography::is_bold(role),
        };
        let lines = line_count(text, style, typography.line_width_px(role, width_px));
        lines as f32 * typography.line_height_px(role)
    }
}

impl LayoutSurface for ShapedSurface {
    fn lay_out(&self, group: &ContentGroup, ctx: &TypographyContext) -> LayoutReading {
        let runs: f32 = group
            .runs
            .iter()
            .map(|r| Self::run_height(&ctx.typography, r.role, &r.text, ctx.content_width_px))
            .sum();
        LayoutReading::Resolved(group.gap_before_px + runs)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Measured strategy
// ────────────────────────────────────────────────────────────────────────────

pub struct MeasuredResolver<'a> {
    surface: &'a dyn LayoutSurface,
}

impl<'a> MeasuredResolver<'a> {
    pub fn new(surface: &'a dyn LayoutSurface) -> Self {
        MeasuredResolver { surface }
    }

    fn read(&self, group: &ContentGroup, ctx: &TypographyContext) -> Result<f32, LayoutError> {
        match self.surface.lay_out(group, ctx) {
            LayoutReading::Resolved(px) if px.is_finite() && px >= 0.0 => Ok(px),
            LayoutReading::Resolved(px) => Err(LayoutError::InvalidHeight {
                block_index: 0,
                px,
            }),
            LayoutReading::Pending => Err(LayoutError::NotYetMeasured { block_index: 0 }),
        }
    }
}

impl HeightResolver for MeasuredResolver<'_> {
    fn strategy(&self) -> HeightStrategy {
        HeightStrategy::Measured
    }

    fn resolve_height(
        &self,
        block: &Block,
        ctx: &TypographyContext,
    ) -> Result<BlockHeight, LayoutError> {
        if !self.surface.is_live() {
            return Err(LayoutError::MeasurementUnavailable(
                "layout surface is not live".to_string(),
            ));
        }

        let content = block.content(ctx);
        if let Block::ExperienceEntry { .. } = block {
            let entries = content
                .groups
                .iter()
                .map(|g| self.read(g, ctx).map(f32::ceil))
                .collect::<Result<Vec<f32>, _>>()?;
            return Ok(BlockHeight::with_entries(entries));
        }

        let mut total = content.margin_top_px + content.margin_bottom_px;
        for group in &content.groups {
            total += self.read(group, ctx)?;
        }
        Ok(BlockHeight::from(total.ceil()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Estimated strategy
// ────────────────────────────────────────────────────────────────────────────

/// Analytic per-type formulas: font size × line height × estimated line count.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatedResolver;

impl EstimatedResolver {
    /// Characters of body text assumed to fit on one line.
    pub fn chars_per_line(ctx: &TypographyContext, role: TextRole) -> usize {
        let t = &ctx.typography;
        let avg_char_px = get_metrics(t.font).average_char_width() * t.font_size_px(role);
        let width = t.line_width_px(role, ctx.content_width_px);
        ((width / avg_char_px).floor() as usize).max(1)
    }

    fn role_height(
        ctx: &TypographyContext,
        bullets: usize,
    ) -> f32 {
        let t = &ctx.typography;
        // 1 role line + 1 meta line + one line per bullet, capped by the template rule
        let bullet_lines = bullets.min(ctx.max_bullets_per_role) as f32;
        ctx.spacing.entry_gap_px
            + t.line_height_px(TextRole::EntryTitle)
            + t.line_height_px(TextRole::Meta)
            + bullet_lines * t.line_height_px(TextRole::Bullet)
    }
}

impl HeightResolver for EstimatedResolver {
    fn strategy(&self) -> HeightStrategy {
        HeightStrategy::Estimated
    }

    fn resolve_height(
        &self,
        block: &Block,
        ctx: &TypographyContext,
    ) -> Result<BlockHeight, LayoutError> {
        let t = &ctx.typography;
        let s = &ctx.spacing;

        let px = match block {
            Block::Header {
                name,
                title,
                contact,
            } => {
                let mut lines = 0.0;
                if !name.is_empty() {
                    lines += t.line_height_px(TextRole::Name);
                }
                if !title.is_empty() {
                    lines += t.line_height_px(TextRole::Headline);
                }
                if !contact.is_empty() {
                    lines += t.line_height_px(TextRole::Contact);
                }
                lines + s.header_gap_px
            }

            Block::Summary { text } => {
                let chars = text.chars().count();
                let lines = chars.div_ceil(Self::chars_per_line(ctx, TextRole::Body));
                s.section_gap_px + lines as f32 * t.line_height_px(TextRole::Body)
            }

            Block::SectionTitle { .. } => {
                s.section_gap_px + t.line_height_px(TextRole::SectionTitle) + s.title_gap_px
            }

            Block::SkillsCategory { items, .. } => {
                let lines = items.len().div_ceil(ctx.skills_items_per_line).max(1);
                s.entry_gap_px + lines as f32 * t.line_height_px(TextRole::Body)
            }

            Block::ExperienceEntry { roles, .. } => {
                let entries: Vec<f32> = roles
                    .iter()
                    .map(|r| Self::role_height(ctx, r.bullets.len()).ceil())
                    .collect();
                return Ok(BlockHeight::with_entries(entries));
            }

            Block::ProjectEntry { tech, bullets, .. } => {
                let tech_line = if tech.is_empty() {
                    0.0
                } else {
                    t.line_height_px(TextRole::Meta)
                };
                s.entry_gap_px
                    + t.line_height_px(TextRole::EntryTitle)
                    + tech_line
                    + bullets.len() as f32 * t.line_height_px(TextRole::Bullet)
            }

            Block::EducationEntry { .. } => {
                s.entry_gap_px
                    + t.line_height_px(TextRole::EntryTitle)
                    + t.line_height_px(TextRole::Meta)
            }
        };

        Ok(BlockHeight::from(px.ceil()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sequence resolution
// ────────────────────────────────────────────────────────────────────────────

/// What a height pass runs against.
#[derive(Clone, Copy)]
pub struct MeasureContext<'a> {
    pub typography: &'a TypographyContext,
    /// Live layout surface, if any. `None` forces the estimated strategy.
    pub surface: Option<&'a dyn LayoutSurface>,
}

/// Resolves every block's height with the requested strategy.
///
/// A measured request without a live surface falls back to estimation (logged, not an
/// error); the returned `strategy` always says which one actually ran.
pub fn resolve_heights(
    blocks: &[Block],
    strategy: HeightStrategy,
    ctx: &MeasureContext<'_>,
) -> Result<ResolvedHeights, LayoutError> {
    let live_surface = ctx.surface.filter(|s| s.is_live());

    let measured;
    let resolver: &dyn HeightResolver = match (strategy, live_surface) {
        (HeightStrategy::Measured, Some(surface)) => {
            measured = MeasuredResolver::new(surface);
            &measured
        }
        (HeightStrategy::Measured, None) => {
            warn!(
                blocks = blocks.len(),
                "Measurement unavailable: no live layout surface, falling back to estimated heights"
            );
            &EstimatedResolver
        }
        (HeightStrategy::Estimated, _) => &EstimatedResolver,
    };

    let heights = blocks
        .iter()
        .enumerate()
        .map(|(i, block)| {
            resolver
                .resolve_height(block, ctx.typography)
                .map_err(|e| with_block_index(e, i))
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        strategy = ?resolver.strategy(),
        blocks = blocks.len(),
        total_px = heights.iter().map(|h| h.px).sum::<f32>(),
        "Resolved block heights"
    );

    Ok(ResolvedHeights {
        strategy: resolver.strategy(),
        heights,
    })
}

fn with_block_index(err: LayoutError, block_index: usize) -> LayoutError {
    match err {
        LayoutError::NotYetMeasured { .. } => LayoutError::NotYetMeasured { block_index },
        LayoutError::InvalidHeight { px, .. } => LayoutError::InvalidHeight { block_index, px },
        other => other,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
