//! Configuration for the extraction pipeline.
//!
//! One `Config` instance is created per run and passed by reference to every
//! pipeline stage. There is no process-wide mutable state. All length units
//! are typographic points (1/72 inch).

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DEFAULT_ITEM_LABEL_REGEXES: Vec<Regex> = vec![
        Regex::new(r"^\d+\.").unwrap(),
        Regex::new(r"^\(\d+\)").unwrap(),
        Regex::new(r"^[a-z]\)").unwrap(),
        Regex::new(r"^-\s").unwrap(),
    ];
}

/// Pipeline configuration.
///
/// All fields have sensible defaults; use the builder-style `with_*` methods
/// to override individual values.
#[derive(Debug, Clone)]
pub struct Config {
    /// Decimals used when rounding coordinates for frequency counters.
    pub coords_prec: i32,

    /// Decimals used when rounding font sizes for frequency counters.
    pub font_size_prec: i32,

    /// Decimals used when rounding line distances for frequency counters.
    pub line_dist_prec: i32,

    /// Max |Δ| below which two coordinates are deemed equal.
    pub coords_equal_tolerance: f64,

    /// Max |Δ| below which two font sizes are deemed equal.
    pub fs_equal_tolerance: f64,

    /// Minimum y-overlap ratio for two consecutive words to count as members
    /// of the same text line (word statistics).
    pub min_y_overlap_ratio_same_line: f64,

    /// Maximum y-overlap ratio for two consecutive words to count as members
    /// of different text lines (word statistics).
    pub max_y_overlap_ratio_different_line: f64,

    /// Inter-character space, as a multiple of the largest font size in the
    /// current word, that starts a new word.
    pub min_word_break_space: f64,

    /// Minimum number of page elements for the "overlapping elements near the
    /// cut's top or bottom" x-cut veto to apply.
    pub overlapping_min_num_elements: usize,

    /// Margin threshold of that veto, as a multiple of the average character
    /// height.
    pub overlapping_elements_margin_factor: f64,

    /// Gap-width threshold of the "small gap" x-cut veto, as a multiple of
    /// the average character width.
    pub small_gap_width_factor: f64,

    /// Gap-height threshold of the "small gap" x-cut veto, as a multiple of
    /// the average character height.
    pub small_gap_height_factor: f64,

    /// Minimum y-overlap ratio between two words of consecutive extraction
    /// rank for the "contiguous words" x-cut veto.
    pub contiguous_words_y_overlap_ratio_threshold: f64,

    /// Width threshold of the "slim groups" x-cut veto, as a multiple of the
    /// average character width.
    pub slim_group_width_factor: f64,

    /// Minimum gap width of an x-cut candidate, as a multiple of the most
    /// frequent word distance.
    pub min_x_cut_gap_width_factor: f64,

    /// Minimum gap height of a y-cut candidate, in points.
    pub min_y_cut_gap_height: f64,

    /// Maximum number of elements an error-tolerant x-cut may slice through.
    pub x_cut_max_num_overlapping_elements: usize,

    /// Decimals used when rounding line right-x values for the segment trim
    /// box.
    pub trim_box_coords_prec: i32,

    /// Minimum fraction of a segment's lines that must share the most
    /// frequent right-x for the trim box to adopt it.
    pub min_perc_lines_same_right_x: f64,

    /// Multiple of the most frequent line distance above which a line starts
    /// a new text block.
    pub line_distance_factor: f64,

    /// Threshold of the line-centering check, as a multiple of the average
    /// character width.
    pub centering_x_offset_threshold_factor: f64,

    /// Maximum number of justified lines a centered block may contain.
    pub centering_max_num_justified_lines: usize,

    /// Minimum text length for a line to count as "long" in the
    /// hanging-indent analysis.
    pub hang_indent_min_length_long_lines: usize,

    /// Minimum fraction of indented lines sharing the most frequent left
    /// margin for a block to be in hanging-indent format.
    pub hang_indent_min_perc_lines_same_left_margin: f64,

    /// Minimum number of non-indented lines for hanging-indent rule (b).
    pub hang_indent_num_non_indented_lines_threshold: usize,

    /// Maximum number of lowercased non-indented lines before hanging indent
    /// is vetoed.
    pub hang_indent_num_lower_non_indented_lines_threshold: usize,

    /// Minimum number of long lines for hanging-indent rule (c).
    pub hang_indent_num_long_lines_threshold: usize,

    /// Minimum number of lowercased indented lines for hanging-indent
    /// rule (c).
    pub hang_indent_num_lower_indented_lines_threshold: usize,

    /// Lowercase last-name prefixes exempted from the "lowercased
    /// non-indented line" hanging-indent veto.
    pub last_name_prefixes: HashSet<String>,

    /// Characters identifying a line as part of a display formula.
    pub formula_id_alphabet: &'static str,

    /// Characters accepted as superscripted item labels.
    pub super_item_label_alphabet: &'static str,

    /// Characters accepted as footnote labels (in addition to alphanumeric
    /// superscripts).
    pub footnote_label_alphabet: &'static str,

    /// Patterns identifying enumeration-item labels at line starts.
    pub item_label_regexes: Vec<Regex>,

    /// Target length of the BPE token sequence fed to the role classifier.
    pub word_block_tokens: usize,

    /// Parse embedded font files for glyph bounding boxes and font style.
    pub parse_embedded_font_files: bool,

    /// When set, per-page debug logging is restricted to this page number.
    pub log_page_filter: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self {
            coords_prec: 1,
            font_size_prec: 1,
            line_dist_prec: 1,
            coords_equal_tolerance: 0.1,
            fs_equal_tolerance: 1.0,
            min_y_overlap_ratio_same_line: 0.5,
            max_y_overlap_ratio_different_line: 0.0,
            min_word_break_space: 0.15,
            overlapping_min_num_elements: 500,
            overlapping_elements_margin_factor: 5.0,
            small_gap_width_factor: 2.0,
            small_gap_height_factor: 2.0,
            contiguous_words_y_overlap_ratio_threshold: 0.1,
            slim_group_width_factor: 10.0,
            min_x_cut_gap_width_factor: 2.0,
            min_y_cut_gap_height: 2.0,
            x_cut_max_num_overlapping_elements: 1,
            trim_box_coords_prec: 0,
            min_perc_lines_same_right_x: 0.5,
            line_distance_factor: 1.1,
            centering_x_offset_threshold_factor: 2.0,
            centering_max_num_justified_lines: 5,
            hang_indent_min_length_long_lines: 3,
            hang_indent_min_perc_lines_same_left_margin: 0.5,
            hang_indent_num_non_indented_lines_threshold: 10,
            hang_indent_num_lower_non_indented_lines_threshold: 0,
            hang_indent_num_long_lines_threshold: 4,
            hang_indent_num_lower_indented_lines_threshold: 1,
            last_name_prefixes: ["van", "von", "de"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            formula_id_alphabet: "=+",
            super_item_label_alphabet: "*∗†‡§‖¶?0123456789",
            footnote_label_alphabet: "*∗†‡§‖¶?",
            item_label_regexes: DEFAULT_ITEM_LABEL_REGEXES.clone(),
            word_block_tokens: 100,
            parse_embedded_font_files: true,
            log_page_filter: None,
        }
    }

    /// Set the decimals used when rounding coordinates.
    pub fn with_coords_prec(mut self, prec: i32) -> Self {
        self.coords_prec = prec;
        self
    }

    /// Set the word-break space factor.
    pub fn with_min_word_break_space(mut self, factor: f64) -> Self {
        self.min_word_break_space = factor;
        self
    }

    /// Set the font-size equality tolerance.
    pub fn with_fs_equal_tolerance(mut self, tolerance: f64) -> Self {
        self.fs_equal_tolerance = tolerance;
        self
    }

    /// Restrict per-page debug logging to a single page.
    pub fn with_log_page_filter(mut self, page: Option<u32>) -> Self {
        self.log_page_filter = page;
        self
    }

    /// Whether per-page debug output should be emitted for the given page.
    pub fn log_page_enabled(&self, page_num: u32) -> bool {
        match self.log_page_filter {
            Some(filter) => filter == page_num,
            None => true,
        }
    }
}
