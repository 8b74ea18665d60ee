//! Dehyphenation of words split across line breaks.
//!
//! Walks the blocks in reading order. Whenever a line ends with a hyphen
//! and the next line of the same block continues the word, a virtual merged
//! word is produced: the first part stores the merged text, the second part
//! is marked so that serialization skips it.

use crate::model::Document;

/// Detects hyphenated words and records their merged form.
pub struct Dehyphenator;

impl Dehyphenator {
    /// Create the stage.
    pub fn new() -> Self {
        Self
    }

    /// Run the stage over the whole document.
    pub fn process(&self, doc: &mut Document) {
        for page_idx in 0..doc.pages.len() {
            let block_ids = doc.pages[page_idx].blocks.clone();
            for block_id in block_ids {
                let line_ids = doc.blocks[block_id.0].lines.clone();
                for pair in line_ids.windows(2) {
                    let (prev_line, curr_line) = (pair[0], pair[1]);

                    let prev_last_word = match doc.lines[prev_line.0].words.last() {
                        Some(&id) => id,
                        None => continue,
                    };
                    let curr_first_word = match doc.lines[curr_line.0].words.first() {
                        Some(&id) => id,
                        None => continue,
                    };

                    let prev_text = doc.words[prev_last_word.0].text.clone();
                    if prev_text.chars().count() <= 1 || !prev_text.ends_with('-') {
                        continue;
                    }

                    let merged = format!(
                        "{}{}",
                        &prev_text[..prev_text.len() - 1],
                        doc.words[curr_first_word.0].text
                    );
                    doc.words[prev_last_word.0].first_part_of_hyphenated_word = Some(merged);
                    doc.words[curr_first_word.0].second_part_of_hyphenated_word = true;
                }
            }
        }
    }
}

impl Default for Dehyphenator {
    fn default() -> Self {
        Self::new()
    }
}
