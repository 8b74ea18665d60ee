//! JSON Lines serialization.
//!
//! One JSON object per element, one element per line. The caller selects
//! which element units to emit; characters, words and lines are emitted in
//! reading order (via the blocks), figures and shapes in extraction order.
//! Coordinates are rounded to the configured precision and roles serialize
//! as their lowercase tags.

use std::io::Write;

use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::model::Document;
use crate::serializers::Unit;
use crate::utils::math;

/// Serializes a document as JSON Lines.
#[derive(Debug, Clone)]
pub struct JsonlSerializer {
    units: Vec<Unit>,
    coords_prec: i32,
}

#[derive(Serialize)]
struct PageRecord {
    r#type: &'static str,
    page: u32,
    width: f64,
    height: f64,
}

#[derive(Serialize)]
struct CharacterRecord<'a> {
    r#type: &'static str,
    rank: usize,
    page: u32,
    #[serde(rename = "minX")]
    min_x: f64,
    #[serde(rename = "minY")]
    min_y: f64,
    #[serde(rename = "maxX")]
    max_x: f64,
    #[serde(rename = "maxY")]
    max_y: f64,
    font: &'a str,
    #[serde(rename = "fontSize")]
    font_size: f64,
    text: &'a str,
    word: usize,
}

#[derive(Serialize)]
struct WordRecord<'a> {
    r#type: &'static str,
    rank: usize,
    page: u32,
    #[serde(rename = "minX")]
    min_x: f64,
    #[serde(rename = "minY")]
    min_y: f64,
    #[serde(rename = "maxX")]
    max_x: f64,
    #[serde(rename = "maxY")]
    max_y: f64,
    font: &'a str,
    #[serde(rename = "fontSize")]
    font_size: f64,
    text: &'a str,
    block: usize,
}

#[derive(Serialize)]
struct LineRecord<'a> {
    r#type: &'static str,
    rank: usize,
    page: u32,
    #[serde(rename = "minX")]
    min_x: f64,
    #[serde(rename = "minY")]
    min_y: f64,
    #[serde(rename = "maxX")]
    max_x: f64,
    #[serde(rename = "maxY")]
    max_y: f64,
    text: &'a str,
    block: usize,
}

#[derive(Serialize)]
struct BlockRecord<'a> {
    r#type: &'static str,
    rank: usize,
    page: u32,
    #[serde(rename = "minX")]
    min_x: f64,
    #[serde(rename = "minY")]
    min_y: f64,
    #[serde(rename = "maxX")]
    max_x: f64,
    #[serde(rename = "maxY")]
    max_y: f64,
    font: &'a str,
    #[serde(rename = "fontSize")]
    font_size: f64,
    text: &'a str,
    role: &'a str,
}

#[derive(Serialize)]
struct NonTextRecord {
    r#type: &'static str,
    rank: usize,
    page: u32,
    #[serde(rename = "minX")]
    min_x: f64,
    #[serde(rename = "minY")]
    min_y: f64,
    #[serde(rename = "maxX")]
    max_x: f64,
    #[serde(rename = "maxY")]
    max_y: f64,
}

impl JsonlSerializer {
    /// Create a serializer emitting the given units.
    pub fn new(config: &Config, units: Vec<Unit>) -> Self {
        Self {
            units,
            coords_prec: config.coords_prec,
        }
    }

    fn round(&self, value: f64) -> f64 {
        math::round(value, self.coords_prec)
    }

    /// Write the document to `writer`.
    pub fn serialize(&self, doc: &Document, writer: &mut dyn Write) -> Result<()> {
        for &unit in &self.units {
            match unit {
                Unit::Pages => self.serialize_pages(doc, writer)?,
                Unit::Characters => self.serialize_characters(doc, writer)?,
                Unit::Words => self.serialize_words(doc, writer)?,
                Unit::Lines => self.serialize_lines(doc, writer)?,
                Unit::Blocks => self.serialize_blocks(doc, writer)?,
                Unit::Figures => self.serialize_figures(doc, writer)?,
                Unit::Shapes => self.serialize_shapes(doc, writer)?,
            }
        }
        Ok(())
    }

    fn write_record<T: Serialize>(&self, writer: &mut dyn Write, record: &T) -> Result<()> {
        serde_json::to_writer(&mut *writer, record)
            .map_err(|err| crate::error::Error::Serialize(err.to_string()))?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn serialize_pages(&self, doc: &Document, writer: &mut dyn Write) -> Result<()> {
        for page in &doc.pages {
            self.write_record(
                writer,
                &PageRecord {
                    r#type: "page",
                    page: page.page_num,
                    width: self.round(page.width),
                    height: self.round(page.height),
                },
            )?;
        }
        Ok(())
    }

    fn serialize_characters(&self, doc: &Document, writer: &mut dyn Write) -> Result<()> {
        let mut rank = 0usize;
        for page in &doc.pages {
            for &block_id in &page.blocks {
                for &line_id in &doc.blocks[block_id.0].lines {
                    for &word_id in &doc.lines[line_id.0].words {
                        for &ch_id in &doc.words[word_id.0].characters {
                            let ch = &doc.chars[ch_id.0];
                            self.write_record(
                                writer,
                                &CharacterRecord {
                                    r#type: "character",
                                    rank,
                                    page: ch.pos.page_num,
                                    min_x: self.round(ch.pos.left_x),
                                    min_y: self.round(ch.pos.upper_y),
                                    max_x: self.round(ch.pos.right_x),
                                    max_y: self.round(ch.pos.lower_y),
                                    font: &ch.font_name,
                                    font_size: ch.font_size,
                                    text: ch.effective_text(),
                                    word: word_id.0,
                                },
                            )?;
                            rank += 1;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn serialize_words(&self, doc: &Document, writer: &mut dyn Write) -> Result<()> {
        for page in &doc.pages {
            for &block_id in &page.blocks {
                for &line_id in &doc.blocks[block_id.0].lines {
                    for &word_id in &doc.lines[line_id.0].words {
                        let word = &doc.words[word_id.0];
                        self.write_record(
                            writer,
                            &WordRecord {
                                r#type: "word",
                                rank: word.rank,
                                page: word.pos.page_num,
                                min_x: self.round(word.pos.left_x),
                                min_y: self.round(word.pos.upper_y),
                                max_x: self.round(word.pos.right_x),
                                max_y: self.round(word.pos.lower_y),
                                font: &word.font_name,
                                font_size: word.font_size,
                                text: &word.text,
                                block: block_id.0,
                            },
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    fn serialize_lines(&self, doc: &Document, writer: &mut dyn Write) -> Result<()> {
        for page in &doc.pages {
            for &block_id in &page.blocks {
                for &line_id in &doc.blocks[block_id.0].lines {
                    let line = &doc.lines[line_id.0];
                    self.write_record(
                        writer,
                        &LineRecord {
                            r#type: "line",
                            rank: line.rank,
                            page: line.pos.page_num,
                            min_x: self.round(line.pos.left_x),
                            min_y: self.round(line.pos.upper_y),
                            max_x: self.round(line.pos.right_x),
                            max_y: self.round(line.pos.lower_y),
                            text: &line.text,
                            block: block_id.0,
                        },
                    )?;
                }
            }
        }
        Ok(())
    }

    fn serialize_blocks(&self, doc: &Document, writer: &mut dyn Write) -> Result<()> {
        for page in &doc.pages {
            for &block_id in &page.blocks {
                let block = &doc.blocks[block_id.0];
                self.write_record(
                    writer,
                    &BlockRecord {
                        r#type: "block",
                        rank: block.rank,
                        page: block.pos.page_num,
                        min_x: self.round(block.pos.left_x),
                        min_y: self.round(block.pos.upper_y),
                        max_x: self.round(block.pos.right_x),
                        max_y: self.round(block.pos.lower_y),
                        font: &block.font_name,
                        font_size: block.font_size,
                        text: &block.text,
                        role: block.role.name(),
                    },
                )?;
            }
        }
        Ok(())
    }

    fn serialize_figures(&self, doc: &Document, writer: &mut dyn Write) -> Result<()> {
        for page in &doc.pages {
            for &figure_id in &page.figures {
                let figure = &doc.figures[figure_id.0];
                self.write_record(
                    writer,
                    &NonTextRecord {
                        r#type: "figure",
                        rank: figure.rank,
                        page: figure.pos.page_num,
                        min_x: self.round(figure.pos.left_x),
                        min_y: self.round(figure.pos.upper_y),
                        max_x: self.round(figure.pos.right_x),
                        max_y: self.round(figure.pos.lower_y),
                    },
                )?;
            }
        }
        Ok(())
    }

    fn serialize_shapes(&self, doc: &Document, writer: &mut dyn Write) -> Result<()> {
        for page in &doc.pages {
            for &shape_id in &page.shapes {
                let shape = &doc.shapes[shape_id.0];
                self.write_record(
                    writer,
                    &NonTextRecord {
                        r#type: "shape",
                        rank: shape.rank,
                        page: shape.pos.page_num,
                        min_x: self.round(shape.pos.left_x),
                        min_y: self.round(shape.pos.upper_y),
                        max_x: self.round(shape.pos.right_x),
                        max_y: self.round(shape.pos.lower_y),
                    },
                )?;
            }
        }
        Ok(())
    }
}
