//! Document-wide statistics.
//!
//! Three passes feed the layout heuristics: character statistics (run after
//! diacritic merging), word statistics (after word formation) and line
//! statistics (after line detection). Each pass fills frequency counters
//! over rounded values and stores the argmax on the document; ties break by
//! insertion order, which makes every aggregate deterministic.

use log::debug;

use crate::config::Config;
use crate::geometry::{horizontal_gap, max_y_overlap_ratio, vertical_gap};
use crate::model::Document;
use crate::utils::counter::{DoubleCounter, StringCounter};
use crate::utils::math;

/// Computes the document-wide aggregates.
pub struct StatisticsCalculator<'a> {
    config: &'a Config,
}

impl<'a> StatisticsCalculator<'a> {
    /// Create the stage.
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Most frequent font size and name, average character width and
    /// height. Runs after diacritic merging, before word formation.
    pub fn compute_character_statistics(&self, doc: &mut Document) {
        let mut font_sizes = DoubleCounter::new();
        let mut font_names = StringCounter::new();
        let mut sum_widths = 0.0;
        let mut sum_heights = 0.0;
        let mut num_chars = 0usize;

        for page in &doc.pages {
            for &ch_id in &page.characters {
                let ch = &doc.chars[ch_id.0];
                font_sizes.add(math::round(ch.font_size, self.config.font_size_prec));
                font_names.add(&ch.font_name);
                sum_widths += ch.pos.width();
                sum_heights += ch.pos.height();
                num_chars += 1;
            }
        }

        if num_chars == 0 {
            return;
        }

        doc.most_freq_font_size = font_sizes.most_freq().unwrap_or(0.0);
        doc.most_freq_font_name = font_names.most_freq().unwrap_or_default().to_string();
        doc.avg_char_width = sum_widths / num_chars as f64;
        doc.avg_char_height = sum_heights / num_chars as f64;

        debug!(
            "char statistics: mostFreqFontSize={}, mostFreqFontName={}, avgCharWidth={:.2}, avgCharHeight={:.2}",
            doc.most_freq_font_size, doc.most_freq_font_name, doc.avg_char_width, doc.avg_char_height
        );
    }

    /// Most frequent word height, word distance and estimated line
    /// distance. Runs after word formation, before page segmentation.
    pub fn compute_word_statistics(&self, doc: &mut Document) {
        let mut horizontal_gaps = DoubleCounter::new();
        let mut vertical_gaps = DoubleCounter::new();
        let mut word_heights = DoubleCounter::new();

        for page in &doc.pages {
            for i in 0..page.words.len() {
                let curr = &doc.words[page.words[i].0];

                // Only words in the document's dominant font size contribute.
                if math::smaller(
                    curr.font_size,
                    doc.most_freq_font_size,
                    self.config.fs_equal_tolerance,
                ) {
                    continue;
                }

                word_heights.add(math::round(curr.pos.height(), self.config.coords_prec));

                let prev = match i.checked_sub(1) {
                    Some(j) => &doc.words[page.words[j].0],
                    None => continue,
                };
                if prev.pos.rotation != curr.pos.rotation {
                    continue;
                }
                if prev.pos.writing_mode != curr.pos.writing_mode {
                    continue;
                }
                if !math::equal(
                    prev.font_size,
                    doc.most_freq_font_size,
                    self.config.fs_equal_tolerance,
                ) {
                    continue;
                }

                let overlap = max_y_overlap_ratio(&prev.pos, &curr.pos);

                if overlap >= self.config.min_y_overlap_ratio_same_line {
                    let gap = horizontal_gap(&prev.pos, &curr.pos);
                    horizontal_gaps.add(math::round(gap, self.config.coords_prec));
                }
                if overlap <= self.config.max_y_overlap_ratio_different_line {
                    let gap = vertical_gap(&prev.pos, &curr.pos);
                    vertical_gaps.add(math::round(gap, self.config.coords_prec));
                }
            }
        }

        doc.most_freq_word_height = word_heights.most_freq().unwrap_or(0.0);
        doc.most_freq_word_distance = horizontal_gaps.most_freq().unwrap_or(0.0);
        doc.most_freq_estimated_line_distance = vertical_gaps.most_freq().unwrap_or(0.0);

        debug!(
            "word statistics: mostFreqWordHeight={}, mostFreqWordDistance={}, mostFreqEstimatedLineDistance={}",
            doc.most_freq_word_height, doc.most_freq_word_distance, doc.most_freq_estimated_line_distance
        );
    }

    /// Most frequent line distance, overall and per font size. Runs after
    /// line detection and sub/superscript detection.
    pub fn compute_line_statistics(&self, doc: &mut Document) {
        let mut line_distances = DoubleCounter::new();
        let mut per_font_size: indexmap::IndexMap<u64, DoubleCounter> = indexmap::IndexMap::new();

        for page in &doc.pages {
            for &segment_id in &page.segments {
                let lines = &doc.segments[segment_id.0].lines;
                for pair in lines.windows(2) {
                    let prev = &doc.lines[pair[0].0];
                    let curr = &doc.lines[pair[1].0];

                    if prev.pos.rotation != curr.pos.rotation {
                        continue;
                    }
                    if prev.pos.writing_mode != curr.pos.writing_mode {
                        continue;
                    }

                    // Distances are measured between *base* bounding boxes;
                    // sub/superscripts would otherwise shrink the gaps.
                    let dist = curr.base_bbox_upper_y - prev.base_bbox_lower_y;
                    let dist = math::round(dist, self.config.line_dist_prec).max(0.0);
                    line_distances.add(dist);

                    let prev_fs = math::round(prev.font_size, self.config.font_size_prec);
                    let curr_fs = math::round(curr.font_size, self.config.font_size_prec);
                    if math::equal(prev_fs, curr_fs, self.config.fs_equal_tolerance) {
                        per_font_size
                            .entry(curr_fs.to_bits())
                            .or_default()
                            .add(dist);
                    }
                }
            }
        }

        doc.most_freq_line_distance = line_distances.most_freq().unwrap_or(0.0);
        doc.most_freq_line_distance_per_font_size = per_font_size
            .into_iter()
            .filter_map(|(fs, counter)| counter.most_freq().map(|dist| (fs, dist)))
            .collect();

        debug!("line statistics: mostFreqLineDistance={}", doc.most_freq_line_distance);
    }
}
