//! Page Assignment: single-pass, order-preserving greedy packer.
//!
//! # Rules
//! - **Title glue**: a `SectionTitle` followed by any block is placed together with it as
//!   one atomic unit. If the unit doesn't fit and the page isn't empty, the page is flushed.
//! - **Ordinary block**: flushed to a fresh page when it doesn't fit a non-empty page.
//! - **Oversized block**: taller than a full fresh page; placed alone anyway. The
//!   validator reports the overflow. Content is never dropped.
//! - **Splittable experience block**: when a multi-role block doesn't fit, its roles are
//!   partitioned greedily in order. The roles that fit stay on the current page, the rest
//!   start the next page and are examined again (they may split again). A role is never
//!   cut. A title glued to a splittable block travels with the first part.
//!
//! The packer never reorders blocks. It is pure: the same input always gives the same
//! `PageSet`.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::layout::blocks::Block;
use crate::layout::errors::LayoutError;
use crate::layout::height::BlockHeight;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// A block as placed on a page. Both halves of a split share `source_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedBlock {
    pub source_index: usize,
    pub block: Block,
    pub height_px: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub blocks: Vec<PlacedBlock>,
    /// Capacity left after the last block. Negative only on an oversized page.
    pub remaining_capacity: f32,
}

impl Page {
    pub fn consumed_height(&self) -> f32 {
        self.blocks.iter().map(|b| b.height_px).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// The ordered pages of one layout pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSet {
    pub capacity: f32,
    pub pages: Vec<Page>,
}

impl PageSet {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Concatenates every page's blocks, re-merging split experience fragments.
    /// For any packer output this equals the input block sequence.
    pub fn blocks_in_order(&self) -> Vec<Block> {
        let mut out: Vec<(usize, Block)> = Vec::new();
        for placed in self.pages.iter().flat_map(|p| &p.blocks) {
            if let Some((index, last)) = out.last_mut() {
                if *index == placed.source_index && last.absorb_continuation(&placed.block) {
                    continue;
                }
            }
            out.push((placed.source_index, placed.block.clone()));
        }
        out.into_iter().map(|(_, b)| b).collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Packer
// ────────────────────────────────────────────────────────────────────────────

struct Packer {
    capacity: f32,
    pages: Vec<Page>,
    current: Vec<PlacedBlock>,
    remaining: f32,
}

/// One split of an experience block: the part that stays and the part that moves on.
struct Split {
    first: Block,
    first_height: f32,
    second: Block,
    second_height: BlockHeight,
}

impl Packer {
    fn new(capacity: f32) -> Self {
        Packer {
            capacity,
            pages: Vec::new(),
            current: Vec::new(),
            remaining: capacity,
        }
    }

    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }
        debug!(
            page = self.pages.len() + 1,
            blocks = self.current.len(),
            remaining_px = self.remaining,
            "Page flushed"
        );
        self.pages.push(Page {
            blocks: std::mem::take(&mut self.current),
            remaining_capacity: self.remaining,
        });
        self.remaining = self.capacity;
    }

    fn place(&mut self, source_index: usize, block: Block, height_px: f32) {
        self.remaining -= height_px;
        self.current.push(PlacedBlock {
            source_index,
            block,
            height_px,
        });
    }

    fn finish(mut self) -> PageSet {
        self.flush();
        PageSet {
            capacity: self.capacity,
            pages: self.pages,
        }
    }

    /// Places a block that is not glued to anything.
    fn place_unit(&mut self, index: usize, mut block: Block, mut height: BlockHeight) {
        loop {
            if height.px <= self.remaining {
                self.place(index, block, height.px);
                return;
            }

            if let Some(split) = split_to_fit(&block, &height, self.remaining, false) {
                self.place(index, split.first, split.first_height);
                self.flush();
                block = split.second;
                height = split.second_height;
                continue;
            }

            if !self.current.is_empty() {
                self.flush();
                continue;
            }

            // Fresh page and still too tall. A splittable block gives up its first role
            // alone; anything else is an oversized atomic block.
            if let Some(split) = split_to_fit(&block, &height, self.remaining, true) {
                warn!(
                    block = index,
                    height_px = split.first_height,
                    capacity_px = self.capacity,
                    "Experience role taller than a full page, placing it alone"
                );
                self.place(index, split.first, split.first_height);
                self.flush();
                block = split.second;
                height = split.second_height;
                continue;
            }

            warn!(
                block = index,
                label = %block.label(),
                height_px = height.px,
                capacity_px = self.capacity,
                "Oversized block, placing it alone"
            );
            self.place(index, block, height.px);
            self.flush();
            return;
        }
    }

    /// Places a section title together with the block that follows it.
    fn place_glued(
        &mut self,
        title_index: usize,
        title: Block,
        title_px: f32,
        next_index: usize,
        next: Block,
        next_height: BlockHeight,
    ) {
        let unit_px = title_px + next_height.px;
        if unit_px <= self.remaining {
            self.place(title_index, title, title_px);
            self.place(next_index, next, next_height.px);
            return;
        }

        if next.is_splittable() {
            if !self.current.is_empty() {
                if let Some(split) =
                    split_to_fit(&next, &next_height, self.remaining - title_px, false)
                {
                    self.place_title_with_first_part(title_index, title, title_px, next_index, split);
                    return;
                }
                self.flush();
                if unit_px <= self.remaining {
                    self.place(title_index, title, title_px);
                    self.place(next_index, next, next_height.px);
                    return;
                }
            }

            if let Some(split) = split_to_fit(&next, &next_height, self.remaining - title_px, true) {
                self.place_title_with_first_part(title_index, title, title_px, next_index, split);
                return;
            }
        }

        if !self.current.is_empty() {
            self.flush();
        }
        if unit_px > self.remaining {
            warn!(
                block = title_index,
                height_px = unit_px,
                capacity_px = self.capacity,
                "Section title and first block exceed a full page, placing them alone"
            );
        }
        self.place(title_index, title, title_px);
        self.place(next_index, next, next_height.px);
    }

    fn place_title_with_first_part(
        &mut self,
        title_index: usize,
        title: Block,
        title_px: f32,
        next_index: usize,
        split: Split,
    ) {
        self.place(title_index, title, title_px);
        self.place(next_index, split.first, split.first_height);
        self.flush();
        self.place_unit(next_index, split.second, split.second_height);
    }
}

/// Greedily takes roles, in order, while their heights fit in `budget_px`.
///
/// Returns `None` when the block isn't splittable, when no role fits (unless
/// `at_least_one`), or when every role fits. Heights without per-role entries can't be
/// split.
fn split_to_fit(
    block: &Block,
    height: &BlockHeight,
    budget_px: f32,
    at_least_one: bool,
) -> Option<Split> {
    let roles = block.sub_entry_count();
    if !block.is_splittable() || height.entries.len() != roles {
        return None;
    }

    let mut used = 0.0;
    let mut take = 0;
    for entry in &height.entries {
        if used + entry > budget_px {
            break;
        }
        used += entry;
        take += 1;
    }
    if take == 0 && at_least_one {
        take = 1;
        used = height.entries[0];
    }

    let (first, second) = block.split_roles(take)?;
    Some(Split {
        first,
        first_height: used,
        second,
        second_height: BlockHeight::with_entries(height.entries[take..].to_vec()),
    })
}

/// Per-role entries must add up to the block height; JSON floats may drift a little.
const ENTRY_SUM_TOLERANCE_PX: f32 = 0.5;

fn check_input(blocks: &[Block], heights: &[BlockHeight], capacity: f32) -> Result<(), LayoutError> {
    if !capacity.is_finite() || capacity <= 0.0 {
        return Err(LayoutError::Configuration(format!(
            "page capacity must be a positive number, got {capacity}"
        )));
    }
    if heights.len() != blocks.len() {
        return Err(LayoutError::HeightMismatch {
            blocks: blocks.len(),
            heights: heights.len(),
        });
    }
    for (block_index, h) in heights.iter().enumerate() {
        let bad = std::iter::once(&h.px)
            .chain(&h.entries)
            .find(|px| !px.is_finite() || **px < 0.0);
        if let Some(&px) = bad {
            return Err(LayoutError::InvalidHeight { block_index, px });
        }
        if !h.entries.is_empty() {
            let roles = blocks[block_index].sub_entry_count();
            let sum: f32 = h.entries.iter().sum();
            if h.entries.len() != roles || (sum - h.px).abs() > ENTRY_SUM_TOLERANCE_PX {
                return Err(LayoutError::InvalidHeight { block_index, px: h.px });
            }
        }
    }
    Ok(())
}

/// Assigns blocks to pages of `capacity` px. `heights[i]` is the height of `blocks[i]`.
///
/// Errors only on malformed input. An empty block list yields an empty `PageSet`.
pub fn assign_to_pages(
    blocks: &[Block],
    heights: &[BlockHeight],
    capacity: f32,
) -> Result<PageSet, LayoutError> {
    check_input(blocks, heights, capacity)?;

    let mut packer = Packer::new(capacity);
    let mut i = 0;
    while i < blocks.len() {
        if blocks[i].is_section_title() && i + 1 < blocks.len() {
            packer.place_glued(
                i,
                blocks[i].clone(),
                heights[i].px,
                i + 1,
                blocks[i + 1].clone(),
                heights[i + 1].clone(),
            );
            i += 2;
        } else {
            packer.place_unit(i, blocks[i].clone(), heights[i].clone());
            i += 1;
        }
    }

    Ok(packer.finish())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
