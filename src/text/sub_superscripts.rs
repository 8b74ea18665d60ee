//! Sub- and superscript detection.
//!
//! A character is superscripted when its font size is smaller than the
//! document's most frequent font size and its baseline sits above the
//! baseline of its text line; subscripted when the baseline sits below.
//! All other characters span the line's *base bounding box*, which the
//! line-distance statistics and the hanging-indent checks rely on.

use crate::config::Config;
use crate::model::Document;
use crate::utils::math;

/// Flags sub- and superscripts and computes line base bounding boxes.
pub struct SubSuperscriptDetector<'a> {
    config: &'a Config,
}

impl<'a> SubSuperscriptDetector<'a> {
    /// Create the stage.
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Run the stage over the whole document.
    pub fn process(&self, doc: &mut Document) {
        let fs_tolerance = self.config.fs_equal_tolerance;
        let coords_tolerance = self.config.coords_equal_tolerance;
        let most_freq_font_size = doc.most_freq_font_size;

        for line_idx in 0..doc.lines.len() {
            let line_base = doc.lines[line_idx].base;
            let word_ids = doc.lines[line_idx].words.clone();

            let mut bbox_left = f64::MAX;
            let mut bbox_upper = f64::MAX;
            let mut bbox_right = f64::MIN;
            let mut bbox_lower = f64::MIN;
            let mut has_base_chars = false;

            for word_id in word_ids {
                let char_ids = doc.words[word_id.0].characters.clone();
                for ch_id in char_ids {
                    let ch = &mut doc.chars[ch_id.0];
                    if math::smaller(ch.font_size, most_freq_font_size, fs_tolerance) {
                        if math::smaller(ch.base, line_base, coords_tolerance) {
                            ch.is_superscript = true;
                            continue;
                        }
                        if math::larger(ch.base, line_base, coords_tolerance) {
                            ch.is_subscript = true;
                            continue;
                        }
                    }

                    has_base_chars = true;
                    bbox_left = bbox_left.min(ch.pos.left_x);
                    bbox_upper = bbox_upper.min(ch.pos.upper_y);
                    bbox_right = bbox_right.max(ch.pos.right_x);
                    bbox_lower = bbox_lower.max(ch.pos.lower_y);
                }
            }

            let line = &mut doc.lines[line_idx];
            if has_base_chars {
                line.base_bbox_left_x = bbox_left;
                line.base_bbox_upper_y = bbox_upper;
                line.base_bbox_right_x = bbox_right;
                line.base_bbox_lower_y = bbox_lower;
            } else {
                // A line made up entirely of sub/superscripts keeps its full
                // bounding box as the base box.
                line.base_bbox_left_x = line.pos.left_x;
                line.base_bbox_upper_y = line.pos.upper_y;
                line.base_bbox_right_x = line.pos.right_x;
                line.base_bbox_lower_y = line.pos.lower_y;
            }
        }
    }
}
