//! Grid layout for same-sized cards on a sheet of paper.
//!
//! Everything here is a pure function of its inputs: a [`LayoutConfig`] and a
//! card count go in, a [`LayoutPlan`] of per-card placements comes out.
//! Coordinates follow PDF user space (origin at the lower-left corner of the
//! sheet), so row 0 sits at the top of the sheet and has the largest `y`.

use crate::error::CardMergeError;
use crate::library::CardSource;
use crate::paper::PaperSize;
use crate::types::{Margins, Pt, Size};

/// Poker-sized card, 2.5in x 3.5in.
pub fn nominal_card_size() -> Size {
    Size::from_inches(2.5, 3.5)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub paper: PaperSize,
    pub scale: f32,
    pub card_size: Size,
    /// Unprintable border kept clear before the grid is centered.
    pub min_margins: Margins,
}

impl LayoutConfig {
    pub fn new(paper: PaperSize, scale: f32) -> Self {
        Self {
            paper,
            scale,
            ..Self::default()
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            paper: PaperSize::Letter,
            scale: 1.0,
            card_size: nominal_card_size(),
            min_margins: Margins::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpec {
    pub paper: Size,
    pub columns: usize,
    pub rows: usize,
    pub cell_width: Pt,
    pub cell_height: Pt,
    pub margin_x: Pt,
    pub margin_y: Pt,
}

impl GridSpec {
    pub fn capacity(&self) -> usize {
        self.columns * self.rows
    }
}

/// Where one card lands in the page sequence, before coordinates are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSlot {
    pub page_index: usize,
    pub column: usize,
    pub row: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementInstruction {
    pub source_index: usize,
    pub page_index: usize,
    pub column: usize,
    pub row: usize,
    /// Lower-left corner of the card cell on the output page.
    pub x_offset: Pt,
    pub y_offset: Pt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputPage<'a> {
    pub page_index: usize,
    pub instructions: &'a [PlacementInstruction],
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    pub grid: GridSpec,
    pub scale: f32,
    pub instructions: Vec<PlacementInstruction>,
}

impl LayoutPlan {
    pub fn page_count(&self) -> usize {
        page_count(self.instructions.len(), self.grid.capacity())
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Instructions grouped by output page. Every page but the last is full,
    /// so fixed-size chunks line up with `page_index`.
    pub fn pages(&self) -> impl Iterator<Item = OutputPage<'_>> {
        self.instructions
            .chunks(self.grid.capacity().max(1))
            .enumerate()
            .map(|(page_index, instructions)| OutputPage {
                page_index,
                instructions,
            })
    }
}

pub fn compute_grid(config: &LayoutConfig) -> Result<GridSpec, CardMergeError> {
    let scale = config.scale;
    if !scale.is_finite() || scale <= 0.0 {
        return Err(CardMergeError::InvalidLayout(format!(
            "card scale must be a positive number, got {scale}"
        )));
    }
    if config.min_margins.is_negative() {
        return Err(CardMergeError::InvalidLayout(
            "page margins cannot be negative".to_string(),
        ));
    }

    let paper = config.paper.size();
    let card = config.card_size.scaled(scale);
    if card.width <= Pt::ZERO || card.height <= Pt::ZERO {
        return Err(CardMergeError::InvalidLayout(format!(
            "card size {}x{}pt at scale {scale} is empty",
            config.card_size.width, config.card_size.height
        )));
    }

    let margins = config.min_margins;
    let usable_width = paper.width - margins.left - margins.right;
    let usable_height = paper.height - margins.top - margins.bottom;
    let columns = usable_width.whole_multiples(card.width);
    let rows = usable_height.whole_multiples(card.height);

    if columns < 1 || rows < 1 {
        return Err(CardMergeError::InvalidLayout(format!(
            "paper size {} ({}x{}pt) too small for card size {}x{}pt at scale {}",
            config.paper, paper.width, paper.height, config.card_size.width,
            config.card_size.height, scale
        )));
    }

    let margin_x = margins.left + (usable_width - card.width * columns) / 2;
    let margin_y = margins.bottom + (usable_height - card.height * rows) / 2;

    Ok(GridSpec {
        paper,
        columns,
        rows,
        cell_width: card.width,
        cell_height: card.height,
        margin_x,
        margin_y,
    })
}

pub fn page_count(card_count: usize, capacity: usize) -> usize {
    if capacity == 0 {
        return 0;
    }
    card_count.div_ceil(capacity)
}

/// Row-major slot for the card at `index`: left to right, then top to bottom,
/// then onto the next page.
pub fn slot_for(index: usize, grid: &GridSpec) -> GridSlot {
    let capacity = grid.capacity();
    let position = index % capacity;
    GridSlot {
        page_index: index / capacity,
        column: position % grid.columns,
        row: position / grid.columns,
    }
}

pub fn paginate(card_count: usize, grid: &GridSpec) -> impl Iterator<Item = GridSlot> + '_ {
    (0..card_count).map(move |index| slot_for(index, grid))
}

pub fn place(source_index: usize, slot: GridSlot, grid: &GridSpec) -> PlacementInstruction {
    let rows_below = grid.rows - 1 - slot.row;
    PlacementInstruction {
        source_index,
        page_index: slot.page_index,
        column: slot.column,
        row: slot.row,
        x_offset: grid.margin_x + grid.cell_width * slot.column,
        y_offset: grid.margin_y + grid.cell_height * rows_below,
    }
}

pub fn plan_layout(card_count: usize, config: &LayoutConfig) -> Result<LayoutPlan, CardMergeError> {
    let grid = compute_grid(config)?;
    let instructions = paginate(card_count, &grid)
        .enumerate()
        .map(|(index, slot)| place(index, slot, &grid))
        .collect();
    Ok(LayoutPlan {
        grid,
        scale: config.scale,
        instructions,
    })
}

/// Lays out `cards` with the nominal card size and no extra margins.
pub fn layout(
    cards: &[CardSource],
    paper: PaperSize,
    scale: f32,
) -> Result<Vec<PlacementInstruction>, CardMergeError> {
    plan_layout(cards.len(), &LayoutConfig::new(paper, scale)).map(|plan| plan.instructions)
}
