//! Plain-text serialization.
//!
//! Emits the document's blocks in reading order, separated by blank lines.
//! Optionally each block is prefixed with its semantic role in brackets,
//! emphasized blocks with U+0001 and page breaks marked with U+000C.
//! Hyphenated words print their merged text once; sub- and superscripts
//! can be excluded.

use std::io::Write;

use crate::error::Result;
use crate::model::Document;

/// Serializes a document as plain text.
#[derive(Debug, Clone, Default)]
pub struct TextSerializer {
    add_control_characters: bool,
    add_semantic_roles: bool,
    exclude_sub_superscripts: bool,
}

impl TextSerializer {
    /// Create a serializer with all options off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark emphasized blocks with U+0001 and page breaks with U+000C.
    pub fn with_control_characters(mut self, enable: bool) -> Self {
        self.add_control_characters = enable;
        self
    }

    /// Prefix each block with its uppercased role in brackets.
    pub fn with_semantic_roles(mut self, enable: bool) -> Self {
        self.add_semantic_roles = enable;
        self
    }

    /// Skip sub- and superscripted characters.
    pub fn with_sub_superscripts_excluded(mut self, enable: bool) -> Self {
        self.exclude_sub_superscripts = enable;
        self
    }

    /// Write the document to `writer`.
    pub fn serialize(&self, doc: &Document, writer: &mut dyn Write) -> Result<()> {
        let mut any_block_written = false;

        for page in &doc.pages {
            for &block_id in &page.blocks {
                let block = &doc.blocks[block_id.0];

                if any_block_written {
                    writer.write_all(b"\n\n")?;
                }
                any_block_written = true;

                if self.add_semantic_roles {
                    write!(writer, "[{}] ", block.role.name().to_uppercase())?;
                }
                if self.add_control_characters && block.is_emphasized {
                    writer.write_all(&[0x01])?;
                }

                let mut any_word_written = false;
                for &line_id in &block.lines {
                    for &word_id in &doc.lines[line_id.0].words {
                        let word = &doc.words[word_id.0];
                        if word.second_part_of_hyphenated_word {
                            continue;
                        }

                        if any_word_written {
                            writer.write_all(b" ")?;
                        }
                        any_word_written = true;

                        if let Some(merged) = &word.first_part_of_hyphenated_word {
                            writer.write_all(merged.as_bytes())?;
                        } else if word.characters.is_empty() {
                            writer.write_all(word.text.as_bytes())?;
                        } else {
                            for &ch_id in &word.characters {
                                let ch = &doc.chars[ch_id.0];
                                if self.exclude_sub_superscripts
                                    && (ch.is_subscript || ch.is_superscript)
                                {
                                    continue;
                                }
                                writer.write_all(ch.effective_text().as_bytes())?;
                            }
                        }
                    }
                }
            }

            if self.add_control_characters {
                writer.write_all(b"\n\x0C")?;
            }
        }

        writer.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Position, Rect};
    use crate::model::{
        Page, PageSegment, SegmentId, SemanticRole, TextBlock, TextLine, Word, WordId,
    };

    fn add_word(doc: &mut Document, text: &str) -> WordId {
        let rank = doc.words.len();
        doc.push_word(Word {
            pos: Position::default(),
            text: text.to_string(),
            rank,
            font_name: "Times".to_string(),
            font_size: 10.0,
            characters: Vec::new(),
            line: None,
            first_part_of_hyphenated_word: None,
            second_part_of_hyphenated_word: false,
            part_of_stacked_math_symbol: None,
            base_of_stacked_math_symbol: Vec::new(),
        })
    }

    fn add_block(doc: &mut Document, lines_of_words: Vec<Vec<WordId>>) -> crate::model::BlockId {
        if doc.segments.is_empty() {
            doc.push_segment(PageSegment {
                pos: Position::default(),
                trim_left_x: 0.0,
                trim_upper_y: 0.0,
                trim_right_x: 612.0,
                trim_lower_y: 792.0,
                elements: Vec::new(),
                lines: Vec::new(),
            });
        }

        let mut line_ids = Vec::new();
        let mut text = String::new();
        for words in lines_of_words {
            let line_text: Vec<String> = words
                .iter()
                .map(|&id| doc.words[id.0].text.clone())
                .collect();
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&line_text.join(" "));
            let rank = doc.lines.len();
            line_ids.push(doc.push_line(TextLine {
                pos: Position::default(),
                base: 0.0,
                text: line_text.join(" "),
                words,
                rank,
                font_name: "Times".to_string(),
                font_size: 10.0,
                max_font_size: 10.0,
                base_bbox_left_x: 0.0,
                base_bbox_upper_y: 0.0,
                base_bbox_right_x: 0.0,
                base_bbox_lower_y: 0.0,
                left_margin: 0.0,
                right_margin: 0.0,
                prev_line: None,
                next_line: None,
                prev_sibling_line: None,
                next_sibling_line: None,
                parent_line: None,
                segment: SegmentId(0),
                block: None,
            }));
        }

        let rank = doc.blocks.len();
        let id = doc.push_block(TextBlock {
            pos: Position::default(),
            trim_left_x: 0.0,
            trim_upper_y: 0.0,
            trim_right_x: 612.0,
            trim_lower_y: 792.0,
            segment: SegmentId(0),
            lines: line_ids,
            rank,
            role: SemanticRole::Paragraph,
            is_emphasized: false,
            is_lines_centered: false,
            hanging_indent: 0.0,
            prev_block: None,
            next_block: None,
            font_name: "Times".to_string(),
            font_size: 10.0,
            text,
        });
        let page_idx = doc.pages.len() - 1;
        doc.pages[page_idx].blocks.push(id);
        id
    }

    fn serialize(doc: &Document, serializer: &TextSerializer) -> String {
        let mut out = Vec::new();
        serializer.serialize(doc, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn doc_with_page() -> Document {
        let mut doc = Document::new();
        doc.pages.push(Page::new(1, Rect::new(0.0, 0.0, 612.0, 792.0)));
        doc
    }

    #[test]
    fn test_single_block() {
        let mut doc = doc_with_page();
        let w1 = add_word(&mut doc, "Lorem");
        let w2 = add_word(&mut doc, "ipsum.");
        add_block(&mut doc, vec![vec![w1, w2]]);

        let out = serialize(&doc, &TextSerializer::new());
        assert_eq!(out, "Lorem ipsum.\n");
    }

    #[test]
    fn test_blocks_separated_by_blank_line() {
        let mut doc = doc_with_page();
        let w1 = add_word(&mut doc, "first");
        add_block(&mut doc, vec![vec![w1]]);
        let w2 = add_word(&mut doc, "second");
        add_block(&mut doc, vec![vec![w2]]);

        let out = serialize(&doc, &TextSerializer::new());
        assert_eq!(out, "first\n\nsecond\n");
    }

    #[test]
    fn test_role_prefix() {
        let mut doc = doc_with_page();
        let w = add_word(&mut doc, "Heading");
        let block = add_block(&mut doc, vec![vec![w]]);
        doc.blocks[block.0].role = SemanticRole::Heading;

        let out = serialize(&doc, &TextSerializer::new().with_semantic_roles(true));
        assert_eq!(out, "[HEADING] Heading\n");
    }

    #[test]
    fn test_control_characters() {
        let mut doc = doc_with_page();
        let w = add_word(&mut doc, "shout");
        let block = add_block(&mut doc, vec![vec![w]]);
        doc.blocks[block.0].is_emphasized = true;

        let out = serialize(&doc, &TextSerializer::new().with_control_characters(true));
        assert_eq!(out, "\u{1}shout\n\u{c}\n");
    }

    #[test]
    fn test_hyphenated_word_printed_merged() {
        let mut doc = doc_with_page();
        let w1 = add_word(&mut doc, "experi-");
        let w2 = add_word(&mut doc, "mental");
        let w3 = add_word(&mut doc, "setup");
        doc.words[w1.0].first_part_of_hyphenated_word = Some("experimental".to_string());
        doc.words[w2.0].second_part_of_hyphenated_word = true;
        add_block(&mut doc, vec![vec![w1], vec![w2, w3]]);

        let out = serialize(&doc, &TextSerializer::new());
        assert_eq!(out, "experimental setup\n");
    }

    #[test]
    fn test_empty_document() {
        let doc = doc_with_page();
        let out = serialize(&doc, &TextSerializer::new());
        assert_eq!(out, "\n");
    }

    #[test]
    fn test_page_break_between_pages() {
        let mut doc = doc_with_page();
        let w1 = add_word(&mut doc, "page1");
        add_block(&mut doc, vec![vec![w1]]);
        doc.pages.push(Page::new(2, Rect::new(0.0, 0.0, 612.0, 792.0)));
        let w2 = add_word(&mut doc, "page2");
        add_block(&mut doc, vec![vec![w2]]);

        let out = serialize(&doc, &TextSerializer::new().with_control_characters(true));
        assert_eq!(out, "page1\n\u{c}\n\npage2\n\u{c}\n");
    }
}
