//! Word formation from the character stream.
//!
//! Walks each page's characters in extraction order and groups consecutive
//! characters into words. A word boundary is declared when the writing mode
//! or rotation changes, when the character no longer overlaps the in-flight
//! word vertically, or when the horizontal gap on either side exceeds a
//! multiple of the largest font size seen in the word.
//!
//! A second pass merges stacked math symbols (a display operator like ∑
//! with limits drawn above and below it) into one logical unit: the limit
//! fragments are attached to the base word and skipped by line detection.

use log::debug;

use crate::config::Config;
use crate::geometry::{max_x_overlap_ratio, Position, Rotation};
use crate::model::{CharId, Document, Word, WordId};
use crate::utils::counter::{DoubleCounter, StringCounter};
use crate::utils::math;

/// Glyph names of the display math operators that carry stacked limits.
const STACKED_MATH_GLYPH_NAMES: [&str; 8] = [
    "summationdisplay",
    "summationtext",
    "productdisplay",
    "producttext",
    "integraldisplay",
    "integraltext",
    "uniondisplay",
    "intersectiondisplay",
];

/// Texts of the display math operators that carry stacked limits.
const STACKED_MATH_SYMBOLS: [&str; 5] = ["∑", "∏", "∫", "⋃", "⋂"];

/// Groups characters into words.
pub struct WordFormer<'a> {
    config: &'a Config,
}

struct WordInProgress {
    chars: Vec<CharId>,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    max_font_size: f64,
}

impl WordInProgress {
    fn start(doc: &Document, id: CharId) -> Self {
        let ch = &doc.chars[id.0];
        Self {
            chars: vec![id],
            min_x: ch.pos.left_x,
            min_y: ch.pos.upper_y,
            max_x: ch.pos.right_x,
            max_y: ch.pos.lower_y,
            max_font_size: ch.font_size,
        }
    }

    fn extend(&mut self, doc: &Document, id: CharId) {
        let ch = &doc.chars[id.0];
        self.chars.push(id);
        self.min_x = self.min_x.min(ch.pos.left_x);
        self.min_y = self.min_y.min(ch.pos.upper_y);
        self.max_x = self.max_x.max(ch.pos.right_x);
        self.max_y = self.max_y.max(ch.pos.lower_y);
        self.max_font_size = self.max_font_size.max(ch.font_size);
    }
}

impl<'a> WordFormer<'a> {
    /// Create the stage.
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Run word formation over the whole document.
    pub fn process(&self, doc: &mut Document) {
        for page_idx in 0..doc.pages.len() {
            self.process_page(doc, page_idx);
            self.merge_stacked_math_symbols(doc, page_idx);
        }
    }

    fn process_page(&self, doc: &mut Document, page_idx: usize) {
        let char_ids: Vec<CharId> = doc.pages[page_idx].characters.clone();
        let mut current: Option<WordInProgress> = None;

        for id in char_ids {
            // Diacritic marks were merged into their bases; skip them here.
            if doc.chars[id.0].diacritic_mark_of.is_some() {
                continue;
            }

            match current.take() {
                None => current = Some(WordInProgress::start(doc, id)),
                Some(word) => {
                    if self.starts_new_word(doc, &word, id) {
                        self.flush_word(doc, page_idx, word);
                        current = Some(WordInProgress::start(doc, id));
                    } else {
                        let mut word = word;
                        word.extend(doc, id);
                        current = Some(word);
                    }
                }
            }
        }

        if let Some(word) = current {
            self.flush_word(doc, page_idx, word);
        }
    }

    /// Whether there is a word boundary between the in-flight word and the
    /// given character.
    fn starts_new_word(&self, doc: &Document, word: &WordInProgress, id: CharId) -> bool {
        let ch = &doc.chars[id.0];
        let first = &doc.chars[word.chars[0].0];

        if first.pos.writing_mode != ch.pos.writing_mode {
            return true;
        }
        if first.pos.rotation != ch.pos.rotation {
            return true;
        }

        // Rotation-aware geometry: for rotations 1 and 3 the roles of the
        // x- and y-axis swap.
        let (gap_left, gap_right, overlap, word_extent, char_extent) = match ch.pos.rotation {
            Rotation::None => (
                ch.pos.left_x - word.max_x,
                word.min_x - ch.pos.right_x,
                (word.max_y.min(ch.pos.lower_y) - word.min_y.max(ch.pos.upper_y)).max(0.0),
                word.max_y - word.min_y,
                ch.pos.height(),
            ),
            Rotation::Clockwise => (
                ch.pos.upper_y - word.max_y,
                word.min_y - ch.pos.lower_y,
                (word.max_x.min(ch.pos.right_x) - word.min_x.max(ch.pos.left_x)).max(0.0),
                word.max_x - word.min_x,
                ch.pos.width(),
            ),
            Rotation::UpsideDown => (
                word.min_x - ch.pos.right_x,
                ch.pos.left_x - word.max_x,
                (word.max_y.min(ch.pos.lower_y) - word.min_y.max(ch.pos.upper_y)).max(0.0),
                word.max_y - word.min_y,
                ch.pos.height(),
            ),
            Rotation::CounterClockwise => (
                word.min_y - ch.pos.lower_y,
                ch.pos.upper_y - word.max_y,
                (word.max_x.min(ch.pos.right_x) - word.min_x.max(ch.pos.left_x)).max(0.0),
                word.max_x - word.min_x,
                ch.pos.width(),
            ),
        };

        let char_overlap_ratio = if char_extent > 0.0 { overlap / char_extent } else { 0.0 };
        let word_overlap_ratio = if word_extent > 0.0 { overlap / word_extent } else { 0.0 };
        if char_overlap_ratio < 0.5 && word_overlap_ratio < 0.5 {
            return true;
        }

        let break_space = self.config.min_word_break_space * word.max_font_size;
        gap_left > break_space || gap_right > break_space
    }

    fn flush_word(&self, doc: &mut Document, page_idx: usize, word: WordInProgress) {
        if word.chars.is_empty() {
            return;
        }
        let id = create_word(doc, &word.chars);
        doc.pages[page_idx].words.push(id);
    }

    /// Attach the limit fragments of display math operators to their base
    /// word.
    fn merge_stacked_math_symbols(&self, doc: &mut Document, page_idx: usize) {
        let word_ids: Vec<WordId> = doc.pages[page_idx].words.clone();
        for i in 0..word_ids.len() {
            let base_id = word_ids[i];
            if !self.is_stacked_math_base(doc, base_id) {
                continue;
            }

            let base_font_size = doc.words[base_id.0].font_size;
            for &part_id in word_ids.iter().skip(i + 1) {
                let part = &doc.words[part_id.0];
                if part.part_of_stacked_math_symbol.is_some() {
                    continue;
                }
                let overlaps = max_x_overlap_ratio(&doc.words[base_id.0].pos, &part.pos) >= 0.5;
                let is_smaller = math::smaller(
                    part.font_size,
                    base_font_size,
                    self.config.fs_equal_tolerance,
                );
                if !overlaps || !is_smaller {
                    break;
                }

                debug!(
                    "attaching '{}' to stacked math symbol '{}'",
                    doc.words[part_id.0].text, doc.words[base_id.0].text
                );
                let part_pos = doc.words[part_id.0].pos.clone();
                doc.words[part_id.0].part_of_stacked_math_symbol = Some(base_id);
                let base = &mut doc.words[base_id.0];
                base.base_of_stacked_math_symbol.push(part_id);
                base.pos.expand(&part_pos);
            }
        }
    }

    fn is_stacked_math_base(&self, doc: &Document, id: WordId) -> bool {
        let word = &doc.words[id.0];
        if word.part_of_stacked_math_symbol.is_some() {
            return false;
        }
        word.characters.iter().any(|&ch_id| {
            let ch = &doc.chars[ch_id.0];
            ch.glyph_name
                .as_deref()
                .is_some_and(|name| STACKED_MATH_GLYPH_NAMES.contains(&name))
                || STACKED_MATH_SYMBOLS.contains(&ch.text.as_str())
        })
    }
}

/// Build a word from the given characters and append it to the arena.
pub fn create_word(doc: &mut Document, char_ids: &[CharId]) -> WordId {
    let mut pos = Position::default();
    let mut text = String::new();
    let mut font_names = StringCounter::new();
    let mut font_sizes = DoubleCounter::new();

    for &ch_id in char_ids {
        let ch = &doc.chars[ch_id.0];
        pos.left_x = pos.left_x.min(ch.pos.left_x);
        pos.upper_y = pos.upper_y.min(ch.pos.upper_y);
        pos.right_x = pos.right_x.max(ch.pos.right_x);
        pos.lower_y = pos.lower_y.max(ch.pos.lower_y);
        text.push_str(ch.effective_text());
        font_names.add(&ch.font_name);
        font_sizes.add(ch.font_size);
    }

    let first = &doc.chars[char_ids[0].0];
    pos.page_num = first.pos.page_num;
    pos.rotation = first.pos.rotation;
    pos.writing_mode = first.pos.writing_mode;
    let rank = first.rank;

    let word = Word {
        pos,
        text,
        rank,
        font_name: font_names.most_freq().unwrap_or_default().to_string(),
        font_size: font_sizes.most_freq().unwrap_or(0.0),
        characters: char_ids.to_vec(),
        line: None,
        first_part_of_hyphenated_word: None,
        second_part_of_hyphenated_word: false,
        part_of_stacked_math_symbol: None,
        base_of_stacked_math_symbol: Vec::new(),
    };
    let id = doc.push_word(word);
    for &ch_id in char_ids {
        doc.chars[ch_id.0].word = Some(id);
    }
    id
}
