//! Merging of diacritic marks with their base characters.
//!
//! PDF generators frequently draw an accented character as two glyphs: the
//! base letter and a standalone accent placed above or below it. This stage
//! walks the characters of each page in extraction order, finds the accent
//! glyphs, and merges each with the horizontally-overlapping neighbour,
//! composing the combined text via NFC normalization. The mark keeps its
//! own `text`; later stages read `text_with_diacritic_mark` from the base.

use log::debug;
use unicode_normalization::UnicodeNormalization;

use crate::config::Config;
use crate::model::{CharId, Document};
use crate::utils::math;

/// Map the standalone form of an accent to its combining equivalent.
///
/// Returns the input unchanged when no mapping applies.
fn to_combining(unicode: u32) -> u32 {
    match unicode {
        0x0027 => 0x0301, // apostrophe -> combining acute
        0x005E => 0x0302, // circumflex accent -> combining circumflex
        0x0060 => 0x0300, // grave accent -> combining grave
        0x007E => 0x0303, // tilde -> combining tilde
        0x00A8 => 0x0308, // diaeresis -> combining diaeresis
        0x00AF => 0x0304, // macron -> combining macron
        0x00B0 => 0x030A, // degree sign -> combining ring above
        0x00B4 => 0x0301, // acute accent -> combining acute
        0x00B8 => 0x0327, // cedilla -> combining cedilla
        0x02C6 => 0x0302, // modifier circumflex -> combining circumflex
        0x02C7 => 0x030C, // caron -> combining caron
        0x02D8 => 0x0306, // breve -> combining breve
        0x02D9 => 0x0307, // dot above -> combining dot above
        0x02DA => 0x030A, // ring above -> combining ring above
        0x02DB => 0x0328, // ogonek -> combining ogonek
        0x02DC => 0x0303, // small tilde -> combining tilde
        0x02DD => 0x030B, // double acute -> combining double acute
        other => other,
    }
}

/// Whether the code point (after mapping to its combining form) falls into
/// "Spacing Modifier Letters" or "Combining Diacritical Marks".
fn is_diacritic_unicode(unicode: u32) -> bool {
    (0x02B0..=0x02FF).contains(&unicode) || (0x0300..=0x036F).contains(&unicode)
}

/// Merges diacritic marks into their base characters, page by page.
pub struct DiacriticMerger<'a> {
    config: &'a Config,
}

impl<'a> DiacriticMerger<'a> {
    /// Create the stage.
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Run the stage over the whole document.
    pub fn merge(&self, doc: &mut Document) {
        for page_idx in 0..doc.pages.len() {
            let char_ids: Vec<CharId> = doc.pages[page_idx].characters.clone();
            for i in 0..char_ids.len() {
                let curr = char_ids[i];

                // The character is a diacritic mark when it maps to exactly
                // one code point inside the diacritic ranges.
                let unicode = {
                    let ch = &doc.chars[curr.0];
                    if ch.unicodes.len() != 1 {
                        continue;
                    }
                    let mapped = to_combining(ch.unicodes[0]);
                    if !is_diacritic_unicode(mapped) {
                        continue;
                    }
                    mapped
                };

                let prev = if i > 0 { Some(char_ids[i - 1]) } else { None };
                let next = if i + 1 < char_ids.len() {
                    Some(char_ids[i + 1])
                } else {
                    None
                };

                let prev_overlap = prev.map_or(0.0, |id| self.x_overlap(doc, curr, id));
                let next_overlap = next.map_or(0.0, |id| self.x_overlap(doc, curr, id));

                // An accent overlapping neither neighbour stays an orphan;
                // its text survives as its own single-character word.
                let tolerance = self.config.coords_equal_tolerance;
                if math::equal(prev_overlap, 0.0, tolerance)
                    && math::equal(next_overlap, 0.0, tolerance)
                {
                    debug!("orphan diacritic mark at rank {}", doc.chars[curr.0].rank);
                    continue;
                }

                let base = if prev_overlap > next_overlap { prev } else { next };
                let base = match base {
                    Some(id) => id,
                    None => continue,
                };
                self.merge_mark(doc, curr, base, unicode);
            }
        }
    }

    fn x_overlap(&self, doc: &Document, a: CharId, b: CharId) -> f64 {
        let pa = &doc.chars[a.0].pos;
        let pb = &doc.chars[b.0].pos;
        let min_max = pa.right_x.min(pb.right_x);
        let max_min = pa.left_x.max(pb.left_x);
        (min_max - max_min).max(0.0)
    }

    fn merge_mark(&self, doc: &mut Document, mark: CharId, base: CharId, mark_unicode: u32) {
        let composed: String = {
            let base_ch = &doc.chars[base.0];
            base_ch
                .unicodes
                .iter()
                .copied()
                .chain(std::iter::once(mark_unicode))
                .filter_map(char::from_u32)
                .collect::<String>()
                .nfc()
                .collect()
        };

        let mark_pos = doc.chars[mark.0].pos.clone();
        doc.chars[mark.0].diacritic_mark_of = Some(base);

        let base_ch = &mut doc.chars[base.0];
        base_ch.base_char_of = Some(mark);
        base_ch.text_with_diacritic_mark = Some(composed);
        base_ch.pos.expand(&mark_pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Position;
    use crate::model::{Character, Page};
    use crate::geometry::Rect;

    fn make_char(doc: &mut Document, text: &str, unicodes: &[u32], left: f64, right: f64) -> CharId {
        let rank = doc.chars.len();
        let id = doc.push_char(Character {
            pos: Position {
                page_num: 1,
                left_x: left,
                upper_y: 712.0,
                right_x: right,
                lower_y: 722.0,
                ..Position::default()
            },
            base: 720.0,
            text: text.to_string(),
            unicodes: unicodes.to_vec(),
            glyph_name: None,
            font_name: "Times".to_string(),
            font_size: 10.0,
            color: [0.0; 3],
            opacity: 1.0,
            rank,
            is_subscript: false,
            is_superscript: false,
            diacritic_mark_of: None,
            base_char_of: None,
            text_with_diacritic_mark: None,
            word: None,
        });
        doc.pages[0].characters.push(id);
        id
    }

    fn doc_with_page() -> Document {
        let mut doc = Document::new();
        doc.pages.push(Page::new(1, Rect::new(0.0, 0.0, 612.0, 792.0)));
        doc
    }

    #[test]
    fn test_combining_map() {
        assert_eq!(to_combining(0x00B4), 0x0301);
        assert_eq!(to_combining(0x02C7), 0x030C);
        assert_eq!(to_combining(0x0301), 0x0301); // already combining
        assert_eq!(to_combining('a' as u32), 'a' as u32);
    }

    #[test]
    fn test_merge_with_overlapping_base() {
        let mut doc = doc_with_page();
        let base = make_char(&mut doc, "a", &[0x61], 72.0, 78.0);
        let mark = make_char(&mut doc, "\u{0301}", &[0x0301], 73.0, 77.0);

        let config = Config::new();
        DiacriticMerger::new(&config).merge(&mut doc);

        assert_eq!(doc.chars[mark.0].diacritic_mark_of, Some(base));
        assert_eq!(doc.chars[base.0].base_char_of, Some(mark));
        // NFC composes a + combining acute into U+00E1.
        assert_eq!(doc.chars[base.0].text_with_diacritic_mark.as_deref(), Some("á"));
        // The base text itself is untouched.
        assert_eq!(doc.chars[base.0].text, "a");
    }

    #[test]
    fn test_standalone_accent_mapped_before_merge() {
        let mut doc = doc_with_page();
        let base = make_char(&mut doc, "e", &[0x65], 72.0, 78.0);
        make_char(&mut doc, "´", &[0x00B4], 72.5, 77.5);

        let config = Config::new();
        DiacriticMerger::new(&config).merge(&mut doc);

        assert_eq!(doc.chars[base.0].text_with_diacritic_mark.as_deref(), Some("é"));
    }

    #[test]
    fn test_orphan_mark_not_merged() {
        let mut doc = doc_with_page();
        let base = make_char(&mut doc, "a", &[0x61], 72.0, 78.0);
        let mark = make_char(&mut doc, "\u{0301}", &[0x0301], 200.0, 204.0);

        let config = Config::new();
        DiacriticMerger::new(&config).merge(&mut doc);

        assert!(doc.chars[mark.0].diacritic_mark_of.is_none());
        assert!(doc.chars[base.0].base_char_of.is_none());
    }

    #[test]
    fn test_merge_enlarges_base_bbox() {
        let mut doc = doc_with_page();
        let base = make_char(&mut doc, "a", &[0x61], 72.0, 78.0);
        let mark = make_char(&mut doc, "\u{0302}", &[0x0302], 71.0, 79.0);
        doc.chars[mark.0].pos.upper_y = 708.0;

        let config = Config::new();
        DiacriticMerger::new(&config).merge(&mut doc);

        let base_pos = &doc.chars[base.0].pos;
        assert_eq!(base_pos.left_x, 71.0);
        assert_eq!(base_pos.right_x, 79.0);
        assert_eq!(base_pos.upper_y, 708.0);
    }

    #[test]
    fn test_mark_merges_with_larger_overlap_side() {
        let mut doc = doc_with_page();
        make_char(&mut doc, "a", &[0x61], 72.0, 76.0);
        let mark = make_char(&mut doc, "\u{0301}", &[0x0301], 75.0, 81.0);
        let next = make_char(&mut doc, "b", &[0x62], 76.0, 82.0);

        let config = Config::new();
        DiacriticMerger::new(&config).merge(&mut doc);

        // Overlap with "a" is 1pt, with "b" 5pt: the mark belongs to "b".
        assert_eq!(doc.chars[mark.0].diacritic_mark_of, Some(next));
    }
}
