//! Reading-order detection.
//!
//! A two-level XY-cut over each page's blocks, figures and shapes. The
//! first level applies *primary* cuts: x-cuts at rotation or writing-mode
//! changes and y-cuts that fence off title, author and marginal blocks (or
//! follow a page-wide horizontal rule). The second level is the generic
//! recursive XY-cut with permissive policies. The terminal groups, sorted
//! top to bottom, yield the new block order of the page.

use log::debug;

use crate::config::Config;
use crate::geometry::{Rotation, WritingMode};
use crate::layout::xy_cut::{self, Cut};
use crate::model::{BlockId, Document, Element, SemanticRole};

/// Re-orders each page's blocks into natural reading order.
pub struct ReadingOrderDetector<'a> {
    config: &'a Config,
}

/// The bounding box of a page's element set, for mid-line computations.
#[derive(Debug, Clone, Copy)]
struct PageExtent {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl PageExtent {
    fn of(elements: &[Element], doc: &Document) -> Self {
        let mut extent = Self {
            min_x: f64::MAX,
            min_y: f64::MAX,
            max_x: f64::MIN,
            max_y: f64::MIN,
        };
        for element in elements {
            let pos = element.pos(doc);
            extent.min_x = extent.min_x.min(pos.left_x);
            extent.min_y = extent.min_y.min(pos.upper_y);
            extent.max_x = extent.max_x.max(pos.right_x);
            extent.max_y = extent.max_y.max(pos.lower_y);
        }
        extent
    }

    fn mid_x(&self) -> f64 {
        self.min_x + (self.max_x - self.min_x) / 2.0
    }

    fn mid_y(&self) -> f64 {
        self.min_y + (self.max_y - self.min_y) / 2.0
    }
}

impl<'a> ReadingOrderDetector<'a> {
    /// Create the stage.
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Run reading-order detection over the whole document.
    pub fn process(&self, doc: &mut Document) {
        for page_idx in 0..doc.pages.len() {
            self.process_page(doc, page_idx);
        }
    }

    fn process_page(&self, doc: &mut Document, page_idx: usize) {
        let page = &doc.pages[page_idx];
        let mut elements: Vec<Element> =
            Vec::with_capacity(page.blocks.len() + page.figures.len() + page.shapes.len());
        elements.extend(page.blocks.iter().map(|&id| Element::Block(id)));
        elements.extend(page.figures.iter().map(|&id| Element::Figure(id)));
        elements.extend(page.shapes.iter().map(|&id| Element::Shape(id)));

        if elements.is_empty() {
            return;
        }

        let extent = PageExtent::of(&elements, doc);
        let min_x_gap = self.config.min_x_cut_gap_width_factor * doc.most_freq_word_distance;
        let min_y_gap = self.config.min_y_cut_gap_height;

        let choose_primary_x = |cuts: &mut [Cut], _: &[Element], doc: &Document, _: bool| {
            self.choose_primary_x_cuts(cuts, doc, extent);
        };
        let choose_primary_y = |cuts: &mut [Cut], _: &[Element], doc: &Document, _: bool| {
            self.choose_primary_y_cuts(cuts, doc, extent);
        };
        let choose_x = |cuts: &mut [Cut], _: &[Element], _: &Document, _: bool| {
            for cut in cuts {
                cut.is_chosen = true;
            }
        };
        let choose_y = |cuts: &mut [Cut], elements: &[Element], doc: &Document, _: bool| {
            let feasible = |slice: &[Element], doc: &Document| {
                xy_cut::x_cut(slice, doc, min_x_gap, 0, &choose_x, true, None, None)
            };
            xy_cut::choose_y_cuts_by_partner_search(cuts, elements, doc, &feasible);
        };

        // Level one: primary x-cuts, then primary y-cuts per column.
        let mut primary_x_groups = Vec::new();
        xy_cut::x_cut(
            &elements,
            doc,
            min_x_gap,
            0,
            &choose_primary_x,
            false,
            Some(&mut primary_x_groups),
            None,
        );

        let mut groups: Vec<Vec<Element>> = Vec::new();
        for x_group in primary_x_groups {
            let mut primary_y_groups = Vec::new();
            xy_cut::y_cut(
                &x_group,
                doc,
                min_y_gap,
                &choose_primary_y,
                false,
                Some(&mut primary_y_groups),
                None,
            );

            // Level two: the generic recursive XY-cut.
            for y_group in primary_y_groups {
                xy_cut::xy_cut(
                    &y_group,
                    doc,
                    min_x_gap,
                    min_y_gap,
                    0,
                    &choose_x,
                    &choose_y,
                    false,
                    &mut groups,
                    None,
                );
            }
        }

        // Within each terminal group, read top to bottom; concatenating
        // the groups yields the page's reading order.
        let mut ordered_blocks: Vec<BlockId> = Vec::new();
        for group in &mut groups {
            group.sort_by(|a, b| a.pos(doc).upper_y.total_cmp(&b.pos(doc).upper_y));
            ordered_blocks.extend(group.iter().filter_map(Element::as_block));
        }

        if self.config.log_page_enabled(doc.pages[page_idx].page_num) {
            debug!(
                "page {}: reading order over {} block(s)",
                doc.pages[page_idx].page_num,
                ordered_blocks.len()
            );
        }
        for (rank, &block_id) in ordered_blocks.iter().enumerate() {
            doc.blocks[block_id.0].rank = rank;
        }
        doc.pages[page_idx].blocks = ordered_blocks;
    }

    fn choose_primary_x_cuts(&self, cuts: &mut [Cut], doc: &Document, extent: PageExtent) {
        for cut in cuts {
            let block_before = cut.element_before.and_then(|e| e.as_block());
            let block_after = cut.element_after.and_then(|e| e.as_block());

            if let Some(id) = block_before {
                if self.is_rotated_or_vertical(doc, id) {
                    cut.is_chosen = true;
                    continue;
                }
            }
            if let Some(id) = block_after {
                if self.is_rotated_or_vertical(doc, id) {
                    cut.is_chosen = true;
                    continue;
                }
            }

            if let (Some(left), Some(right)) = (block_before, block_after) {
                let left_pos = &doc.blocks[left.0].pos;
                let right_pos = &doc.blocks[right.0].pos;
                if left_pos.writing_mode != right_pos.writing_mode
                    || left_pos.rotation != right_pos.rotation
                {
                    cut.is_chosen = true;
                    continue;
                }
            }

            // A tall non-text element spanning the vertical middle of the
            // page elements acts as a visual column separator.
            for element in [cut.element_before, cut.element_after].into_iter().flatten() {
                if !element.is_non_text() {
                    continue;
                }
                let pos = element.pos(doc);
                if pos.height() > 10.0 * doc.avg_char_height
                    && pos.upper_y < extent.mid_y()
                    && pos.lower_y > extent.mid_y()
                {
                    cut.is_chosen = true;
                    break;
                }
            }
        }
    }

    fn choose_primary_y_cuts(&self, cuts: &mut [Cut], doc: &Document, extent: PageExtent) {
        for cut in cuts {
            let role_above = cut
                .element_before
                .and_then(|e| e.as_block())
                .map(|id| doc.blocks[id.0].role);
            let role_below = cut
                .element_after
                .and_then(|e| e.as_block())
                .map(|id| doc.blocks[id.0].role);

            // A boundary where exactly one side is a title, author-info or
            // marginal block separates front matter from body text.
            let asymmetric = [
                SemanticRole::Title,
                SemanticRole::AuthorInfo,
                SemanticRole::Marginal,
            ]
            .iter()
            .any(|&role| (role_above == Some(role)) != (role_below == Some(role)));
            if asymmetric {
                cut.is_chosen = true;
                continue;
            }

            // A wide non-text element spanning the horizontal middle is a
            // rule that visually separates the regions above and below.
            for element in [cut.element_before, cut.element_after].into_iter().flatten() {
                if !element.is_non_text() {
                    continue;
                }
                let pos = element.pos(doc);
                if pos.width() > 10.0 * doc.avg_char_width
                    && pos.left_x < extent.mid_x()
                    && pos.right_x > extent.mid_x()
                {
                    cut.is_chosen = true;
                    break;
                }
            }
        }
    }

    fn is_rotated_or_vertical(&self, doc: &Document, id: BlockId) -> bool {
        let pos = &doc.blocks[id.0].pos;
        pos.rotation != Rotation::None || pos.writing_mode != WritingMode::Horizontal
    }
}
