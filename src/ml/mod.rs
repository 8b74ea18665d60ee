//! Semantic-role classification interface.
//!
//! The neural model itself is an external collaborator; this module
//! prepares its inputs (a 15-feature layout row and a BPE-encoded token
//! row per text block) and applies its output (per-role probabilities) to
//! the document. Without a model, every block keeps the default
//! `Paragraph` role.

pub mod bpe;

use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{Document, SemanticRole};
use bpe::BytePairEncoder;

/// Number of layout features per block.
pub const NUM_LAYOUT_FEATURES: usize = 15;

/// The classifier backend: maps per-block features to per-role
/// probabilities.
pub trait RoleModel {
    /// Predict role probabilities for each block.
    ///
    /// `layout` is one 15-float row per block; `words` one token-id row
    /// per block. The result must contain one probability row per block.
    fn predict(
        &self,
        layout: &[[f32; NUM_LAYOUT_FEATURES]],
        words: &[Vec<i32>],
    ) -> Result<Vec<Vec<f32>>>;
}

/// Prepares classifier inputs and applies its predictions.
pub struct SemanticRoleClassifier<'a> {
    config: &'a Config,
    backend: Option<(Box<dyn RoleModel>, BytePairEncoder)>,
}

impl<'a> SemanticRoleClassifier<'a> {
    /// Create a classifier without a backend: all blocks keep the default
    /// role.
    pub fn disabled(config: &'a Config) -> Self {
        Self {
            config,
            backend: None,
        }
    }

    /// Create a classifier around the given backend and BPE vocabulary.
    pub fn new(
        config: &'a Config,
        model: Box<dyn RoleModel>,
        vocabulary: HashMap<String, i32>,
    ) -> Self {
        Self {
            config,
            backend: Some((model, BytePairEncoder::new(vocabulary))),
        }
    }

    /// Classify every block of the document.
    pub fn classify(&mut self, doc: &mut Document) -> Result<()> {
        let (model, encoder) = match &mut self.backend {
            Some((model, encoder)) => (model, encoder),
            None => {
                info!("no role model supplied; keeping default roles");
                return Ok(());
            }
        };

        let block_ids: Vec<crate::model::BlockId> = doc
            .pages
            .iter()
            .flat_map(|page| page.blocks.iter().copied())
            .collect();
        if block_ids.is_empty() {
            return Ok(());
        }

        let layout = layout_features(doc, &block_ids);
        let words: Vec<Vec<i32>> = block_ids
            .iter()
            .map(|&id| encoder.encode(&doc.blocks[id.0].text, self.config.word_block_tokens))
            .collect();

        let probabilities = model.predict(&layout, &words)?;
        if probabilities.len() != block_ids.len() {
            return Err(Error::ModelLoad {
                path: "<role model>".to_string(),
                reason: format!(
                    "expected {} prediction rows, got {}",
                    block_ids.len(),
                    probabilities.len()
                ),
            });
        }

        for (&block_id, row) in block_ids.iter().zip(&probabilities) {
            let mut best = 0usize;
            let mut best_prob = f32::MIN;
            for (ordinal, &prob) in row.iter().enumerate() {
                if prob > best_prob {
                    best = ordinal;
                    best_prob = prob;
                }
            }
            doc.blocks[block_id.0].role = SemanticRole::from_ordinal(best);
            debug!(
                "block {:?}: role {}",
                block_id,
                doc.blocks[block_id.0].role.name()
            );
        }
        Ok(())
    }
}

/// The 15 normalized layout features of each block.
fn layout_features(
    doc: &Document,
    block_ids: &[crate::model::BlockId],
) -> Vec<[f32; NUM_LAYOUT_FEATURES]> {
    // Document-wide font-size range, for min-max normalization.
    let mut min_font_size = f64::MAX;
    let mut max_font_size = f64::MIN;
    for &id in block_ids {
        let font_size = doc.blocks[id.0].font_size;
        min_font_size = min_font_size.min(font_size);
        max_font_size = max_font_size.max(font_size);
    }
    let font_size_range = max_font_size - min_font_size;
    let num_pages = doc.pages.len();

    block_ids
        .iter()
        .map(|&id| {
            let block = &doc.blocks[id.0];
            let page = &doc.pages[(block.pos.page_num as usize).saturating_sub(1)];
            let text = &block.text;

            let page_num_encoded = if num_pages > 1 {
                (block.pos.page_num as f32 - 1.0) / (num_pages as f32 - 1.0)
            } else {
                0.0
            };
            let font_size_encoded = if font_size_range > 0.0 {
                ((block.font_size - min_font_size) / font_size_range) as f32
            } else {
                0.0
            };
            let font_info = doc.fonts.get(&block.font_name);
            let is_bold = font_info.is_some_and(|f| f.weight > 500.0);
            let is_italic = font_info.is_some_and(|f| f.is_italic);

            let non_ws: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
            let num_non_ws = non_ws.len().max(1) as f32;
            let pct_digits =
                non_ws.iter().filter(|c| c.is_ascii_digit()).count() as f32 / num_non_ws;
            let pct_non_ascii = non_ws.iter().filter(|c| !c.is_ascii()).count() as f32 / num_non_ws;
            let pct_punct =
                non_ws.iter().filter(|c| c.is_ascii_punctuation()).count() as f32 / num_non_ws;
            let pct_upper = non_ws.iter().filter(|c| c.is_uppercase()).count() as f32 / num_non_ws;

            let words: Vec<&str> = text.split_whitespace().collect();
            let num_words = words.len().max(1) as f32;
            let pct_words_upper = words
                .iter()
                .filter(|w| w.chars().next().is_some_and(|c| c.is_uppercase()))
                .count() as f32
                / num_words;

            [
                page_num_encoded,
                (block.pos.left_x / page.width) as f32,
                ((page.height - block.pos.lower_y) / page.height) as f32,
                (block.pos.right_x / page.width) as f32,
                ((page.height - block.pos.upper_y) / page.height) as f32,
                font_size_encoded,
                if is_bold { 1.0 } else { 0.0 },
                if is_italic { 1.0 } else { 0.0 },
                if text.contains('@') { 1.0 } else { 0.0 },
                if text.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                    1.0
                } else {
                    0.0
                },
                pct_digits,
                pct_non_ascii,
                pct_punct,
                pct_words_upper,
                pct_upper,
            ]
        })
        .collect()
}

/// Load a BPE vocabulary from a TSV file (one `token<TAB>id` entry per
/// line).
pub fn load_bpe_vocabulary(path: &Path) -> Result<HashMap<String, i32>> {
    let content = std::fs::read_to_string(path).map_err(|err| Error::ModelLoad {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;

    let mut vocabulary = HashMap::new();
    for line in content.lines() {
        let (token, id) = match line.split_once('\t') {
            Some(parts) => parts,
            None => continue,
        };
        let id: i32 = id.trim().parse().map_err(|_| Error::ModelLoad {
            path: path.display().to_string(),
            reason: format!("malformed vocabulary entry: {line:?}"),
        })?;
        vocabulary.insert(token.to_string(), id);
    }
    Ok(vocabulary)
}
