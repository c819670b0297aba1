mod card_list;
mod compose;
mod error;
mod inspect;
mod layout;
mod library;
mod paper;
mod types;

pub use card_list::{default_output_path, parse_card_list, read_card_list};
pub use compose::{AnnotationMode, ComposeSummary, compose_cards, compose_document};
pub use error::CardMergeError;
pub use inspect::{
    CardInspectError, CardInspectErrorCode, CardInspectReport, card_compatibility_issues,
    inspect_card_bytes, inspect_card_path, require_single_card,
};
pub use layout::{
    GridSlot, GridSpec, LayoutConfig, LayoutPlan, OutputPage, PlacementInstruction,
    compute_grid, layout, nominal_card_size, page_count, paginate, place, plan_layout, slot_for,
};
pub use library::{
    CardKind, CardLibrary, CardSource, NameFilter, Resolution, card_name, monster_name,
    spell_name,
};
pub use paper::PaperSize;
pub use types::{Margins, Pt, Rect, Size};

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolves card lists against one card directory and writes merged sheets.
pub struct CardMerger {
    library: CardLibrary,
    layout: LayoutConfig,
    skip_missing: bool,
    annotation_mode: AnnotationMode,
}

#[derive(Clone)]
pub struct CardMergerBuilder {
    name_filter: NameFilter,
    layout: LayoutConfig,
    skip_missing: bool,
    annotation_mode: AnnotationMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub output: PathBuf,
    pub cards_placed: usize,
    pub pages_written: usize,
    pub columns: usize,
    pub rows: usize,
    /// Names that were skipped because `skip_missing` was set.
    pub unresolved: Vec<String>,
}

impl CardMerger {
    pub fn builder() -> CardMergerBuilder {
        CardMergerBuilder::new()
    }

    pub fn library(&self) -> &CardLibrary {
        &self.library
    }

    pub fn layout_config(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Resolves `names`, failing on any unknown name unless `skip_missing` is set.
    pub fn resolve(&self, names: &[String]) -> Result<Resolution, CardMergeError> {
        let resolution = self.library.resolve(names);
        if !resolution.is_complete() {
            if !self.skip_missing {
                return Err(CardMergeError::UnresolvedNames(resolution.unresolved));
            }
            log::warn!(
                "Could not find the following {} cards: {}",
                resolution.unresolved.len(),
                resolution.unresolved.join(", ")
            );
        }
        Ok(resolution)
    }

    pub fn plan(&self, cards: &[CardSource]) -> Result<LayoutPlan, CardMergeError> {
        let plan = plan_layout(cards.len(), &self.layout)?;
        let expected = self.layout.card_size;
        for card in cards {
            let actual = card.page_box.size();
            let dw = (actual.width - expected.width).abs();
            let dh = (actual.height - expected.height).abs();
            if dw > Pt::from_i32(1) || dh > Pt::from_i32(1) {
                log::warn!(
                    "{} is {}x{}pt, laid out as {}x{}pt",
                    card.path.display(),
                    actual.width,
                    actual.height,
                    expected.width,
                    expected.height
                );
            }
        }
        Ok(plan)
    }

    pub fn merge_names(
        &self,
        names: &[String],
        out_pdf: &Path,
    ) -> Result<MergeSummary, CardMergeError> {
        if names.is_empty() {
            return Err(CardMergeError::EmptyInput);
        }
        let resolution = self.resolve(names)?;
        if resolution.cards.is_empty() {
            return Err(CardMergeError::EmptyInput);
        }

        let plan = self.plan(&resolution.cards)?;
        log::info!(
            "Laying out {} card(s) from {} {}x{} per {} page at scale {}",
            resolution.cards.len(),
            self.library.dir().display(),
            plan.grid.columns,
            plan.grid.rows,
            self.layout.paper,
            self.layout.scale
        );
        let composed = compose_cards(&resolution.cards, &plan, out_pdf, self.annotation_mode)?;

        Ok(MergeSummary {
            output: out_pdf.to_path_buf(),
            cards_placed: composed.cards_placed,
            pages_written: composed.pages_written,
            columns: plan.grid.columns,
            rows: plan.grid.rows,
            unresolved: resolution.unresolved,
        })
    }

    /// Merges the cards named in a `.txt` list. Without `out_pdf` the result
    /// is written next to the list with a `.pdf` extension.
    pub fn merge_list_file(
        &self,
        list_path: &Path,
        out_pdf: Option<&Path>,
    ) -> Result<MergeSummary, CardMergeError> {
        let names = read_card_list(list_path)?;
        let out_pdf = out_pdf
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output_path(list_path));
        log::info!("Merging cards for: {}", list_path.display());
        self.merge_names(&names, &out_pdf)
    }
}

impl CardMergerBuilder {
    pub fn new() -> Self {
        Self {
            name_filter: CardKind::Plain.name_filter(),
            layout: LayoutConfig::default(),
            skip_missing: false,
            annotation_mode: AnnotationMode::default(),
        }
    }

    pub fn card_kind(mut self, kind: CardKind) -> Self {
        self.name_filter = kind.name_filter();
        self
    }

    pub fn name_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Path) -> Option<String> + Send + Sync + 'static,
    {
        self.name_filter = Arc::new(filter);
        self
    }

    pub fn paper_size(mut self, paper: PaperSize) -> Self {
        self.layout.paper = paper;
        self
    }

    pub fn card_scale(mut self, scale: f32) -> Self {
        self.layout.scale = scale;
        self
    }

    pub fn card_size(mut self, size: Size) -> Self {
        self.layout.card_size = size;
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.layout.min_margins = margins;
        self
    }

    pub fn margin_all(mut self, value: f32) -> Self {
        self.layout.min_margins = Margins::all(value);
        self
    }

    /// Warn about unknown names and merge the rest instead of failing.
    pub fn skip_missing(mut self, enabled: bool) -> Self {
        self.skip_missing = enabled;
        self
    }

    pub fn annotation_mode(mut self, mode: AnnotationMode) -> Self {
        self.annotation_mode = mode;
        self
    }

    /// Checks that a card fits the configured paper, then indexes `card_dir`.
    pub fn build(self, card_dir: &Path) -> Result<CardMerger, CardMergeError> {
        compute_grid(&self.layout)?;
        log::info!("Single card pdfs at: {}", card_dir.display());
        let library = CardLibrary::scan(card_dir, &*self.name_filter)?;
        Ok(CardMerger {
            library,
            layout: self.layout,
            skip_missing: self.skip_missing,
            annotation_mode: self.annotation_mode,
        })
    }
}

impl Default for CardMergerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
