//! Page segmentation.
//!
//! Divides each page's elements (words, figures, shapes, graphics) into
//! contiguous spatial regions by running the XY-cut engine with a
//! conservative x-cut policy. The policy is a chain of veto rules; the
//! first rule that fires rejects the candidate, and a candidate nobody
//! vetoes is chosen. Y-cuts are chosen by partner search: a y-cut is only
//! worth taking when it bounds a strip that an x-cut can split further.

use log::debug;

use crate::config::Config;
use crate::geometry::max_y_overlap_ratio;
use crate::layout::xy_cut::{self, Cut};
use crate::model::{Document, Element, PageSegment};
use crate::utils::math;
use crate::utils::trool::Trool;

/// Splits pages into segments.
pub struct PageSegmenter<'a> {
    config: &'a Config,
}

impl<'a> PageSegmenter<'a> {
    /// Create the stage.
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Run page segmentation over the whole document.
    pub fn process(&self, doc: &mut Document) {
        for page_idx in 0..doc.pages.len() {
            let page = &doc.pages[page_idx];
            let mut elements: Vec<Element> = Vec::with_capacity(
                page.words.len() + page.figures.len() + page.graphics.len() + page.shapes.len(),
            );
            elements.extend(page.words.iter().map(|&id| Element::Word(id)));
            elements.extend(page.figures.iter().map(|&id| Element::Figure(id)));
            elements.extend(page.graphics.iter().map(|&id| Element::Graphic(id)));
            elements.extend(page.shapes.iter().map(|&id| Element::Shape(id)));

            if elements.is_empty() {
                continue;
            }
            if self.config.log_page_enabled(page.page_num) {
                debug!(
                    "segmenting page {}: {} elements",
                    page.page_num,
                    elements.len()
                );
            }

            let min_x_gap = self.min_x_cut_gap_width(doc);
            let min_y_gap = self.config.min_y_cut_gap_height;
            let max_overlapping = self.config.x_cut_max_num_overlapping_elements;

            let choose_x = |cuts: &mut [Cut], elements: &[Element], doc: &Document, silent: bool| {
                self.choose_x_cuts(cuts, elements, doc, silent);
            };
            let choose_y = |cuts: &mut [Cut], elements: &[Element], doc: &Document, silent: bool| {
                self.choose_y_cuts(cuts, elements, doc, silent);
            };

            let mut groups = Vec::new();
            xy_cut::xy_cut(
                &elements,
                doc,
                min_x_gap,
                min_y_gap,
                max_overlapping,
                &choose_x,
                &choose_y,
                false,
                &mut groups,
                None,
            );

            for group in groups {
                self.create_segment(doc, page_idx, group);
            }
        }
    }

    fn min_x_cut_gap_width(&self, doc: &Document) -> f64 {
        self.config.min_x_cut_gap_width_factor * doc.most_freq_word_distance
    }

    /// The x-cut policy: a veto-rule chain over the candidates, walked
    /// left to right.
    fn choose_x_cuts(&self, cuts: &mut [Cut], elements: &[Element], doc: &Document, silent: bool) {
        if elements.is_empty() {
            return;
        }

        let mut prev_chosen: Option<usize> = None;
        for i in 0..cuts.len() {
            let rules = [
                self.check_overlapping_elements(&cuts[i], elements, doc),
                self.check_small_gap(&cuts[i], doc),
                self.check_contiguous_words(&cuts[i], elements, doc),
                self.check_slim_groups(prev_chosen.map(|j| &cuts[j]), &cuts[i], elements, doc),
            ];

            let decision = rules.iter().find(|r| r.is_decided()).copied();
            match decision {
                Some(Trool::False) => {
                    cuts[i].is_chosen = false;
                    if !silent {
                        debug!("x-cut {} at x={:.1} vetoed", cuts[i].id, cuts[i].x1);
                    }
                }
                _ => {
                    cuts[i].is_chosen = true;
                    prev_chosen = Some(i);
                    if !silent {
                        debug!("x-cut {} at x={:.1} chosen", cuts[i].id, cuts[i].x1);
                    }
                }
            }
        }
    }

    /// Veto a cut that slices through elements sitting close to its top or
    /// bottom end. This protects page headers and footers spanning a
    /// multi-column layout from being divided along with the columns.
    fn check_overlapping_elements(
        &self,
        cut: &Cut,
        elements: &[Element],
        doc: &Document,
    ) -> Trool {
        if cut.overlapping_elements.is_empty() {
            return Trool::None;
        }
        // Slicing through elements is only tolerable on busy pages; on
        // sparse pages an overlapped element is likely a spanning header
        // or footer.
        if elements.len() < self.config.overlapping_min_num_elements {
            return Trool::False;
        }

        let margin_threshold =
            self.config.overlapping_elements_margin_factor * doc.avg_char_height;
        for element in &cut.overlapping_elements {
            let pos = element.pos(doc);
            let top_margin = pos.upper_y - cut.y1;
            let bottom_margin = cut.y2 - pos.lower_y;
            if math::smaller(top_margin, margin_threshold, 0.0)
                || math::smaller(bottom_margin, margin_threshold, 0.0)
            {
                return Trool::False;
            }
        }

        Trool::None
    }

    /// Veto a cut whose gap is small in both dimensions.
    fn check_small_gap(&self, cut: &Cut, doc: &Document) -> Trool {
        let width_threshold = self.config.small_gap_width_factor * doc.avg_char_width;
        let height_threshold = self.config.small_gap_height_factor * doc.avg_char_height;

        if math::smaller(cut.gap_width, width_threshold, 0.0)
            && math::smaller(cut.gap_height, height_threshold, 0.0)
        {
            return Trool::False;
        }

        Trool::None
    }

    /// Veto a cut dividing two words that are adjacent in the extraction
    /// order and share a text line; such a cut would split a single
    /// logical line.
    fn check_contiguous_words(&self, cut: &Cut, elements: &[Element], doc: &Document) -> Trool {
        let left_word = match cut.element_before.and_then(|e| e.as_word()) {
            Some(id) => &doc.words[id.0],
            None => return Trool::None,
        };

        for element in &elements[cut.pos_in_elements..] {
            let right_word = match element.as_word() {
                Some(id) => &doc.words[id.0],
                None => continue,
            };
            if left_word.rank + 1 != right_word.rank {
                continue;
            }
            let overlap = max_y_overlap_ratio(&left_word.pos, &right_word.pos);
            if math::smaller(
                overlap,
                self.config.contiguous_words_y_overlap_ratio_threshold,
                0.0,
            ) {
                continue;
            }
            return Trool::False;
        }

        Trool::None
    }

    /// Veto a cut producing a group too slim to be a column.
    fn check_slim_groups(
        &self,
        prev_chosen: Option<&Cut>,
        cut: &Cut,
        elements: &[Element],
        doc: &Document,
    ) -> Trool {
        if elements.is_empty() {
            return Trool::None;
        }

        let width_threshold = self.config.slim_group_width_factor * doc.avg_char_width;

        let left_first = prev_chosen
            .and_then(|c| c.element_after)
            .unwrap_or(elements[0]);
        let left_last = match cut.element_before {
            Some(e) => e,
            None => return Trool::None,
        };
        let left_width = left_last.pos(doc).right_x - left_first.pos(doc).left_x;
        if math::smaller(left_width, width_threshold, 0.0) {
            return Trool::False;
        }

        let right_first = match cut.element_after {
            Some(e) => e,
            None => return Trool::None,
        };
        let right_last = elements[elements.len() - 1];
        let right_width = right_last.pos(doc).right_x - right_first.pos(doc).left_x;
        if math::smaller(right_width, width_threshold, 0.0) {
            return Trool::False;
        }

        Trool::None
    }

    /// The y-cut policy: partner search, with "can the strip be divided by
    /// an x-cut under this same policy" as the feasibility test.
    fn choose_y_cuts(&self, cuts: &mut [Cut], elements: &[Element], doc: &Document, _silent: bool) {
        if cuts.is_empty() || elements.is_empty() {
            return;
        }

        let min_x_gap = self.min_x_cut_gap_width(doc);
        let max_overlapping = self.config.x_cut_max_num_overlapping_elements;
        let choose_x = |cuts: &mut [Cut], elements: &[Element], doc: &Document, silent: bool| {
            self.choose_x_cuts(cuts, elements, doc, silent);
        };

        let feasible = |slice: &[Element], doc: &Document| {
            xy_cut::x_cut(
                slice,
                doc,
                min_x_gap,
                max_overlapping,
                &choose_x,
                true,
                None,
                None,
            )
        };
        xy_cut::choose_y_cuts_by_partner_search(cuts, elements, doc, &feasible);
    }

    fn create_segment(&self, doc: &mut Document, page_idx: usize, elements: Vec<Element>) {
        if elements.is_empty() {
            return;
        }

        let mut pos = crate::geometry::Position {
            page_num: doc.pages[page_idx].page_num,
            ..Default::default()
        };
        for element in &elements {
            let element_pos = element.pos(doc);
            pos.left_x = pos.left_x.min(element_pos.left_x);
            pos.upper_y = pos.upper_y.min(element_pos.upper_y);
            pos.right_x = pos.right_x.max(element_pos.right_x);
            pos.lower_y = pos.lower_y.max(element_pos.lower_y);
        }

        let segment = PageSegment {
            trim_left_x: pos.left_x,
            trim_upper_y: pos.upper_y,
            trim_right_x: pos.right_x,
            trim_lower_y: pos.lower_y,
            pos,
            elements,
            lines: Vec::new(),
        };
        let id = doc.push_segment(segment);
        doc.pages[page_idx].segments.push(id);
    }
}
