//! Text-block detection.
//!
//! Walks each segment's lines in order and decides, line by line, whether
//! the line begins a new block. The decision is a chain of tri-state
//! rules; the first rule with an opinion wins, and when every rule is
//! silent the line continues the current block. Detected blocks carry
//! layout attributes (trim box, emphasis, centering, hanging indent) that
//! the role classifier and the serializers consume.

use std::collections::HashSet;

use log::debug;

use crate::config::Config;
use crate::geometry::{left_x_offset, max_x_overlap_ratio, right_x_offset, Position};
use crate::model::{BlockId, Document, LineId, TextBlock};
use crate::utils::counter::{DoubleCounter, StringCounter};
use crate::utils::math;
use crate::utils::trool::Trool;

/// Groups the lines of each segment into text blocks.
pub struct TextBlockDetector<'a> {
    config: &'a Config,
}

impl<'a> TextBlockDetector<'a> {
    /// Create the stage.
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Run text-block detection over the whole document.
    pub fn process(&self, doc: &mut Document) {
        let footnote_labels = self.collect_potential_footnote_labels(doc);

        for page_idx in 0..doc.pages.len() {
            let segment_ids = doc.pages[page_idx].segments.clone();
            for segment_id in segment_ids {
                let line_ids = doc.segments[segment_id.0].lines.clone();
                let mut current: Vec<LineId> = Vec::new();

                for i in 0..line_ids.len() {
                    let prev = i.checked_sub(1).map(|j| line_ids[j]);
                    let curr = line_ids[i];
                    let next = line_ids.get(i + 1).copied();

                    if prev.is_some() && self.starts_block(doc, prev, curr, next, &footnote_labels)
                    {
                        self.create_block(doc, page_idx, std::mem::take(&mut current));
                    }
                    current.push(curr);
                }
                self.create_block(doc, page_idx, current);
            }

            self.compute_text_line_margins(doc, page_idx);
            let block_ids = doc.pages[page_idx].blocks.clone();
            for block_id in block_ids {
                doc.blocks[block_id.0].hanging_indent = self.compute_hanging_indent(doc, block_id);
            }
        }
    }

    /// The rule chain: does `curr` begin a new text block?
    fn starts_block(
        &self,
        doc: &Document,
        prev: Option<LineId>,
        curr: LineId,
        next: Option<LineId>,
        footnote_labels: &HashSet<String>,
    ) -> bool {
        let rules = [
            self.rule_line_distance(doc, prev, curr),
            self.rule_font_size(doc, prev, curr),
            self.rule_font_weight(doc, prev, curr),
            self.rule_indented_first_line(doc, prev, curr, next, footnote_labels),
            self.rule_centering_flip(doc, prev, curr),
            self.rule_item_start(doc, prev, curr, footnote_labels),
            self.rule_footnote_start(doc, prev, curr, footnote_labels),
        ];
        match rules.iter().find(|r| r.is_decided()) {
            Some(Trool::True) => true,
            _ => false,
        }
    }

    /// A vertical gap above the usual line distance starts a block.
    fn rule_line_distance(&self, doc: &Document, prev: Option<LineId>, curr: LineId) -> Trool {
        let prev = match prev {
            Some(id) => &doc.lines[id.0],
            None => return Trool::None,
        };
        let curr = &doc.lines[curr.0];

        let distance = curr.base_bbox_upper_y - prev.base_bbox_lower_y;
        let distance = math::round(distance, self.config.line_dist_prec);
        let threshold = self.config.line_distance_factor * doc.most_freq_line_distance;
        if math::larger(distance, threshold, 0.0) {
            return Trool::True;
        }
        Trool::None
    }

    /// A font-size change starts a block.
    fn rule_font_size(&self, doc: &Document, prev: Option<LineId>, curr: LineId) -> Trool {
        let prev = match prev {
            Some(id) => &doc.lines[id.0],
            None => return Trool::None,
        };
        let curr = &doc.lines[curr.0];

        if (curr.font_size - prev.font_size).abs() > self.config.fs_equal_tolerance {
            return Trool::True;
        }
        Trool::None
    }

    /// A jump into a heavier font at the same (or larger) size starts a
    /// block; this catches run-in headings set in bold.
    fn rule_font_weight(&self, doc: &Document, prev: Option<LineId>, curr: LineId) -> Trool {
        let prev = match prev {
            Some(id) => &doc.lines[id.0],
            None => return Trool::None,
        };
        let curr = &doc.lines[curr.0];

        let prev_weight = doc.font_weight(&prev.font_name);
        let curr_weight = doc.font_weight(&curr.font_name);
        if math::equal_or_larger(curr.font_size, prev.font_size, self.config.fs_equal_tolerance)
            && curr_weight - prev_weight > 100.0
        {
            return Trool::True;
        }
        Trool::None
    }

    /// An indented line whose successor returns to the previous margin is
    /// the first line of an indented paragraph. Continuation lines of
    /// enumeration items are exempt; their indentation is the item body,
    /// not a paragraph start.
    fn rule_indented_first_line(
        &self,
        doc: &Document,
        prev: Option<LineId>,
        curr: LineId,
        next: Option<LineId>,
        footnote_labels: &HashSet<String>,
    ) -> Trool {
        let (prev, next) = match (prev, next) {
            (Some(prev), Some(next)) => (prev, next),
            _ => return Trool::None,
        };

        let tolerance = doc.avg_char_width;
        let indented = math::larger(
            doc.lines[curr.0].pos.left_x,
            doc.lines[prev.0].pos.left_x,
            tolerance,
        );
        let next_flush = math::equal(
            doc.lines[next.0].pos.left_x,
            doc.lines[prev.0].pos.left_x,
            tolerance,
        );
        if indented && next_flush && !self.is_continuation_of_item(doc, curr, footnote_labels) {
            return Trool::True;
        }
        Trool::None
    }

    /// A centered line after a non-centered one starts a block (a centered
    /// heading or display formula below body text).
    fn rule_centering_flip(&self, doc: &Document, prev: Option<LineId>, curr: LineId) -> Trool {
        let prev = match prev {
            Some(id) => id,
            None => return Trool::None,
        };
        // Without a line above `prev` there is nothing to compare against.
        let prev_prev = match doc.lines[prev.0].prev_line {
            Some(id) => id,
            None => return Trool::None,
        };

        let curr_centered = self.is_centered_pair(doc, prev, curr);
        let prev_centered = self.is_centered_pair(doc, prev_prev, prev);
        if curr_centered && !prev_centered {
            return Trool::True;
        }
        Trool::None
    }

    /// The first line of an enumeration item starts a block when the
    /// previous line is not one.
    fn rule_item_start(
        &self,
        doc: &Document,
        prev: Option<LineId>,
        curr: LineId,
        footnote_labels: &HashSet<String>,
    ) -> Trool {
        let prev = match prev {
            Some(id) => id,
            None => return Trool::None,
        };

        if self.is_first_line_of_item(doc, curr, footnote_labels)
            && !self.is_first_line_of_item(doc, prev, footnote_labels)
        {
            return Trool::True;
        }
        Trool::None
    }

    /// The first line of a footnote starts a block: its leading text
    /// matches a footnote label collected from the superscript markers
    /// seen in the body text.
    fn rule_footnote_start(
        &self,
        doc: &Document,
        prev: Option<LineId>,
        curr: LineId,
        footnote_labels: &HashSet<String>,
    ) -> Trool {
        let prev = match prev {
            Some(id) => id,
            None => return Trool::None,
        };

        if self.is_first_line_of_footnote(doc, curr, footnote_labels)
            && !self.is_first_line_of_footnote(doc, prev, footnote_labels)
        {
            return Trool::True;
        }
        Trool::None
    }

    /// Whether two stacked lines are centered with respect to each other:
    /// one fully overlaps the other horizontally and the left and right
    /// offsets are equal in magnitude.
    fn is_centered_pair(&self, doc: &Document, upper: LineId, lower: LineId) -> bool {
        let upper = &doc.lines[upper.0];
        let lower = &doc.lines[lower.0];

        let overlap = max_x_overlap_ratio(&upper.pos, &lower.pos);
        if math::smaller(overlap, 1.0, 0.01) {
            return false;
        }

        let left_offset = left_x_offset(&upper.pos, &lower.pos).abs();
        let right_offset = right_x_offset(&upper.pos, &lower.pos).abs();
        let tolerance = self.config.centering_x_offset_threshold_factor * doc.avg_char_width;
        math::equal(left_offset, right_offset, tolerance)
    }

    /// Whether the line is prefixed by an enumeration-item label.
    fn is_prefixed_by_item_label(&self, doc: &Document, line_id: LineId) -> bool {
        let line = &doc.lines[line_id.0];
        let first_word = match line.words.first() {
            Some(&id) => &doc.words[id.0],
            None => return false,
        };
        if let Some(&first_char) = first_word.characters.first() {
            let ch = &doc.chars[first_char.0];
            if ch.is_superscript
                && !ch.text.is_empty()
                && self.config.super_item_label_alphabet.contains(&ch.text)
            {
                return true;
            }
        }

        self.config
            .item_label_regexes
            .iter()
            .any(|re| re.is_match(&line.text))
    }

    /// Whether the line is the first line of an enumeration item: it is
    /// prefixed by an item label and one of its siblings in the
    /// indentation hierarchy is too, in the same font.
    fn is_first_line_of_item(
        &self,
        doc: &Document,
        line_id: LineId,
        footnote_labels: &HashSet<String>,
    ) -> bool {
        let line = &doc.lines[line_id.0];
        if line.words.is_empty() {
            return false;
        }
        if !self.is_prefixed_by_item_label(doc, line_id) {
            return false;
        }

        for sibling in [line.prev_sibling_line, line.next_sibling_line]
            .into_iter()
            .flatten()
        {
            if doc.lines[sibling.0].words.is_empty() {
                continue;
            }
            if !self.is_prefixed_by_item_label(doc, sibling) {
                continue;
            }
            let sibling_line = &doc.lines[sibling.0];
            if sibling_line.font_name == line.font_name
                && math::equal(
                    sibling_line.font_size,
                    line.font_size,
                    self.config.fs_equal_tolerance,
                )
            {
                return true;
            }
        }

        self.is_first_line_of_footnote(doc, line_id, footnote_labels)
    }

    /// Whether the line is a continuation line of an enumeration item: its
    /// ancestor chain in the indentation hierarchy leads to an item's
    /// first line.
    fn is_continuation_of_item(
        &self,
        doc: &Document,
        line_id: LineId,
        footnote_labels: &HashSet<String>,
    ) -> bool {
        let mut parent = doc.lines[line_id.0].parent_line;
        while let Some(parent_id) = parent {
            if self.is_first_line_of_item(doc, parent_id, footnote_labels) {
                return true;
            }
            parent = doc.lines[parent_id.0].parent_line;
        }
        false
    }

    /// Whether the line starts with a footnote label: its leading run of
    /// label characters matches a label collected from the body text's
    /// superscript markers.
    fn is_first_line_of_footnote(
        &self,
        doc: &Document,
        line_id: LineId,
        footnote_labels: &HashSet<String>,
    ) -> bool {
        let line = &doc.lines[line_id.0];
        let first_word = match line.words.first() {
            Some(&id) => &doc.words[id.0],
            None => return false,
        };

        let label: String = first_word
            .text
            .chars()
            .take_while(|&c| {
                c.is_alphanumeric() || self.config.footnote_label_alphabet.contains(c)
            })
            .collect();
        !label.is_empty() && footnote_labels.contains(&label)
    }

    /// Collect the potential footnote labels of the document: runs of
    /// superscripted characters attached to the end of body words.
    fn collect_potential_footnote_labels(&self, doc: &Document) -> HashSet<String> {
        let mut labels = HashSet::new();
        for word in &doc.words {
            let mut base_seen = false;
            let mut label = String::new();
            for &ch_id in &word.characters {
                let ch = &doc.chars[ch_id.0];
                if !base_seen {
                    // Superscripts before the word proper are not footnote
                    // markers; wait for a regular character first.
                    if !ch.is_subscript && !ch.is_superscript {
                        base_seen = true;
                    }
                    continue;
                }

                let is_label_char = (ch.is_superscript
                    && ch.text.chars().next().is_some_and(|c| c.is_alphanumeric()))
                    || ch
                        .text
                        .chars()
                        .next()
                        .is_some_and(|c| self.config.footnote_label_alphabet.contains(c));
                if is_label_char {
                    label.push_str(&ch.text);
                } else if !label.is_empty() {
                    labels.insert(std::mem::take(&mut label));
                }
            }
            if !label.is_empty() {
                labels.insert(label);
            }
        }
        labels
    }

    /// Build a block from the given lines and append it to the page.
    fn create_block(&self, doc: &mut Document, page_idx: usize, line_ids: Vec<LineId>) {
        if line_ids.is_empty() {
            return;
        }

        let segment_id = doc.lines[line_ids[0].0].segment;
        let segment = &doc.segments[segment_id.0];
        let (seg_trim_left, seg_trim_upper, seg_trim_right, seg_trim_lower) = (
            segment.trim_left_x,
            segment.trim_upper_y,
            segment.trim_right_x,
            segment.trim_lower_y,
        );

        let first_line = &doc.lines[line_ids[0].0];
        let mut pos = Position {
            page_num: first_line.pos.page_num,
            rotation: first_line.pos.rotation,
            writing_mode: first_line.pos.writing_mode,
            ..Position::default()
        };

        let mut font_names = StringCounter::new();
        let mut font_sizes = DoubleCounter::new();
        let mut text = String::new();
        for (i, &line_id) in line_ids.iter().enumerate() {
            let line = &doc.lines[line_id.0];
            pos.left_x = pos.left_x.min(line.pos.left_x.min(line.pos.right_x));
            pos.upper_y = pos.upper_y.min(line.pos.upper_y.min(line.pos.lower_y));
            pos.right_x = pos.right_x.max(line.pos.left_x.max(line.pos.right_x));
            pos.lower_y = pos.lower_y.max(line.pos.upper_y.max(line.pos.lower_y));

            font_names.add(&line.font_name);
            font_sizes.add(line.font_size);

            if i > 0 {
                text.push(' ');
            }
            text.push_str(&line.text);
        }

        let block = TextBlock {
            trim_left_x: pos.left_x.max(seg_trim_left),
            trim_upper_y: pos.upper_y.max(seg_trim_upper),
            trim_right_x: pos.right_x.min(seg_trim_right),
            trim_lower_y: pos.lower_y.min(seg_trim_lower),
            pos,
            segment: segment_id,
            lines: line_ids.clone(),
            rank: doc.pages[page_idx].blocks.len(),
            role: Default::default(),
            is_emphasized: false,
            is_lines_centered: false,
            hanging_indent: 0.0,
            prev_block: doc.pages[page_idx].blocks.last().copied(),
            next_block: None,
            font_name: font_names.most_freq().unwrap_or_default().to_string(),
            font_size: font_sizes.most_freq().unwrap_or(0.0),
            text,
        };
        let block_id = doc.push_block(block);

        doc.blocks[block_id.0].is_emphasized = self.compute_is_emphasized(doc, block_id);
        doc.blocks[block_id.0].is_lines_centered = self.compute_is_lines_centered(doc, block_id);

        if let Some(&prev_id) = doc.pages[page_idx].blocks.last() {
            doc.blocks[prev_id.0].next_block = Some(block_id);
        }
        for &line_id in &line_ids {
            doc.lines[line_id.0].block = Some(block_id);
        }
        doc.pages[page_idx].blocks.push(block_id);
        debug!(
            "created block {:?} with {} line(s)",
            block_id,
            line_ids.len()
        );
    }

    /// Whether the block stands out from the body text: larger font, bold
    /// or italic at body size, or all-caps text.
    fn compute_is_emphasized(&self, doc: &Document, block_id: BlockId) -> bool {
        let block = &doc.blocks[block_id.0];
        let tolerance = self.config.fs_equal_tolerance;

        if math::larger(block.font_size, doc.most_freq_font_size, tolerance) {
            return true;
        }

        if math::equal(block.font_size, doc.most_freq_font_size, tolerance) {
            if doc.font_weight(&block.font_name) > 500.0 {
                return true;
            }
            if doc
                .fonts
                .get(&block.font_name)
                .is_some_and(|info| info.is_italic)
            {
                return true;
            }
        }

        let mut has_letters = false;
        for c in block.text.chars() {
            if c.is_alphabetic() {
                has_letters = true;
                if c.is_lowercase() {
                    return false;
                }
            }
        }
        has_letters
    }

    /// Whether the block's lines are centered: every adjacent pair is
    /// centered, at least one non-formula line has a sizeable offset, and
    /// at most a few lines are justified.
    fn compute_is_lines_centered(&self, doc: &Document, block_id: BlockId) -> bool {
        let block = &doc.blocks[block_id.0];
        if block.lines.is_empty() {
            return false;
        }

        let mut has_non_formula_with_large_offset = false;
        let mut num_justified_lines = 0usize;

        for pair in block.lines.windows(2) {
            let (prev_id, curr_id) = (pair[0], pair[1]);
            if !self.is_centered_pair(doc, prev_id, curr_id) {
                return false;
            }

            let prev = &doc.lines[prev_id.0];
            let curr = &doc.lines[curr_id.0];
            let is_formula = self
                .config
                .formula_id_alphabet
                .chars()
                .any(|c| prev.text.contains(c) || curr.text.contains(c));

            let offset_threshold =
                self.config.centering_x_offset_threshold_factor * doc.avg_char_width;
            let left_offset = left_x_offset(&prev.pos, &curr.pos).abs();
            let right_offset = right_x_offset(&prev.pos, &curr.pos).abs();
            let is_large_offset = math::larger(left_offset, offset_threshold, 0.0)
                || math::larger(right_offset, offset_threshold, 0.0);

            if !is_formula && is_large_offset {
                has_non_formula_with_large_offset = true;
            } else {
                num_justified_lines += 1;
            }
        }

        has_non_formula_with_large_offset
            && num_justified_lines <= self.config.centering_max_num_justified_lines
    }

    /// Left and right margins of every line relative to its block's trim
    /// box. Two-line blocks that are not centered borrow the neighbouring
    /// blocks' trim right edge, so that the short second line of a
    /// paragraph ending is not mistaken for an indent pattern.
    fn compute_text_line_margins(&self, doc: &mut Document, page_idx: usize) {
        let block_ids = doc.pages[page_idx].blocks.clone();
        for &block_id in &block_ids {
            let block = &doc.blocks[block_id.0];
            let segment = &doc.segments[block.segment.0];

            let mut trim_right = block.trim_right_x;
            if block.lines.len() == 2 {
                let left_margin = block.pos.left_x - segment.pos.left_x;
                let right_margin = segment.pos.right_x - block.pos.right_x;
                let centered = math::equal(left_margin, right_margin, doc.avg_char_width);
                if !centered {
                    if let Some(prev_id) = block.prev_block {
                        trim_right = trim_right.max(doc.blocks[prev_id.0].trim_right_x);
                    }
                    if let Some(next_id) = block.next_block {
                        trim_right = trim_right.max(doc.blocks[next_id.0].trim_right_x);
                    }
                }
            }

            let trim_left = block.trim_left_x;
            let line_ids = block.lines.clone();
            for line_id in line_ids {
                let line = &mut doc.lines[line_id.0];
                line.left_margin = math::round(line.pos.left_x - trim_left, 0);
                line.right_margin = math::round(trim_right - line.pos.right_x, 0);
            }
        }
    }

    /// The hanging-indent amount of a block, or 0 when the block is not in
    /// hanging-indent format.
    fn compute_hanging_indent(&self, doc: &Document, block_id: BlockId) -> f64 {
        let block = &doc.blocks[block_id.0];
        let margin_threshold = doc.avg_char_width;
        let min_length = self.config.hang_indent_min_length_long_lines;

        let mut num_long_lines = 0usize;
        let mut num_large_left_margin_lines = 0usize;
        let mut large_left_margins = DoubleCounter::new();

        for &line_id in &block.lines {
            let line = &doc.lines[line_id.0];
            if line.text.chars().count() >= min_length {
                num_long_lines += 1;
            }
            let left_margin = math::round(line.left_margin, 0);
            if math::equal_or_larger(left_margin, margin_threshold, 0.0) {
                large_left_margins.add(left_margin);
                num_large_left_margin_lines += 1;
            }
        }

        let (most_freq_margin, most_freq_count) = match large_left_margins.most_freq_and_count() {
            Some(pair) => pair,
            None => return 0.0,
        };

        // Too few lines agree on a common indent.
        if most_freq_count as f64
            <= self.config.hang_indent_min_perc_lines_same_left_margin
                * num_large_left_margin_lines as f64
        {
            return 0.0;
        }

        let mut is_first_line_indented = false;
        let mut has_first_line_capacity = false;
        let mut is_all_other_lines_indented = true;
        let mut num_lowercased_non_indented = 0usize;
        let mut num_lowercased_indented = 0usize;
        let mut num_non_indented = 0usize;
        let mut num_indented = 0usize;

        for (i, &line_id) in block.lines.iter().enumerate() {
            let line = &doc.lines[line_id.0];
            if line.text.chars().count() < min_length {
                continue;
            }

            // Centered lines carry no indentation information.
            let is_equal_margin = math::equal(line.left_margin, line.right_margin, margin_threshold);
            let is_large_margin = math::larger(line.left_margin, margin_threshold, 0.0);
            if is_equal_margin && is_large_margin {
                continue;
            }

            let is_non_indented = math::equal(line.left_margin, 0.0, margin_threshold);
            let is_indented = math::equal(line.left_margin, most_freq_margin, margin_threshold);
            if is_non_indented {
                num_non_indented += 1;
            }
            if is_indented {
                num_indented += 1;
            }

            let first_char_lower = line.text.chars().next().is_some_and(|c| c.is_lowercase());
            if first_char_lower && is_indented {
                num_lowercased_indented += 1;
            }
            let first_word_text = line
                .words
                .first()
                .map(|&id| doc.words[id.0].text.to_lowercase())
                .unwrap_or_default();
            let starts_with_last_name_prefix =
                self.config.last_name_prefixes.contains(&first_word_text);
            if first_char_lower && !starts_with_last_name_prefix && is_non_indented {
                num_lowercased_non_indented += 1;
            }

            if i == 0 {
                is_first_line_indented = is_indented;
            }
            if i == 1 {
                has_first_line_capacity = self.has_prev_line_capacity(doc, line_id);
            }
            if i > 0 {
                is_all_other_lines_indented &= is_indented;
            }
        }

        if num_indented == 0 {
            return 0.0;
        }
        if num_lowercased_non_indented
            > self.config.hang_indent_num_lower_non_indented_lines_threshold
        {
            return 0.0;
        }

        // A single item: first line flush, every other line indented.
        if !is_first_line_indented && !has_first_line_capacity && is_all_other_lines_indented {
            return most_freq_margin;
        }

        // Many flush lines, all starting uppercase (a reference list).
        if num_non_indented >= self.config.hang_indent_num_non_indented_lines_threshold
            && num_lowercased_non_indented
                <= self.config.hang_indent_num_lower_non_indented_lines_threshold
        {
            return most_freq_margin;
        }

        // Indented continuation lines starting lowercase.
        if num_long_lines >= self.config.hang_indent_num_long_lines_threshold
            && num_lowercased_indented
                >= self.config.hang_indent_num_lower_indented_lines_threshold
        {
            return most_freq_margin;
        }

        0.0
    }

    /// Whether the line before this one had room for this line's first
    /// word; if so, the line break was intentional.
    fn has_prev_line_capacity(&self, doc: &Document, line_id: LineId) -> bool {
        let line = &doc.lines[line_id.0];
        let prev = match line.prev_line {
            Some(id) => &doc.lines[id.0],
            None => return false,
        };
        let first_word = match line.words.first() {
            Some(&id) => &doc.words[id.0],
            None => return false,
        };
        math::larger(
            prev.right_margin,
            first_word.pos.width(),
            2.0 * doc.avg_char_width,
        )
    }
}
