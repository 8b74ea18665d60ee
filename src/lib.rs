// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::match_like_matches_macro)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # pdftotext++
//!
//! Layout-aware text extraction core for PDF documents.
//!
//! The crate turns a raw, unordered character stream (one record per
//! glyph-draw operation) into a layered reading of the document:
//! characters are grouped into words, words into text lines, lines into
//! page segments, and segments into text blocks, with a reading order
//! over the blocks and a semantic role per block.
//!
//! ## Pipeline
//!
//! - **Character ingestion** from an external content-stream interpreter
//!   via the [`ingest::ContentHandler`] event sink
//! - **Diacritic merging** of standalone accent glyphs into their bases
//! - **Statistics**: most frequent font size, word gap, line distance, …
//! - **Word formation** with rotation-aware boundary rules
//! - **Page segmentation** by a recursive XY-cut with veto rules
//! - **Text-line detection** by baseline clustering and merge rounds
//! - **Sub/superscript detection**
//! - **Text-block detection** with a tri-state rule chain
//! - **Semantic-role classification** behind the [`ml::RoleModel`] trait
//! - **Reading-order detection** by a role-aware two-level XY-cut
//! - **Dehyphenation** of words split across line breaks
//!
//! The PDF parser, the font-file parser and the neural role model are
//! external collaborators; this crate specifies their interfaces and
//! everything in between.
//!
//! ## Quick start
//!
//! ```
//! use pdftotext_pp::config::Config;
//! use pdftotext_pp::geometry::Rect;
//! use pdftotext_pp::ingest::{CharEvent, CharacterIngestor, ContentHandler, FontState};
//! use pdftotext_pp::model::FontInfo;
//! use pdftotext_pp::pipeline::Pipeline;
//! use pdftotext_pp::serializers::TextSerializer;
//!
//! # fn main() -> pdftotext_pp::error::Result<()> {
//! let config = Config::new();
//!
//! // Feed character events (normally emitted by the PDF interpreter).
//! let mut ingestor = CharacterIngestor::new(&config);
//! let page_box = Rect::new(0.0, 0.0, 612.0, 792.0);
//! ingestor.start_page(1, page_box);
//! ingestor.update_font(FontState {
//!     font_name: "Times".to_string(),
//!     writing_mode: Default::default(),
//!     info: Some(FontInfo::new("Times")),
//! });
//! let unicodes = ['H' as u32];
//! ingestor.draw_char(CharEvent::upright(72.0, 720.0, 6.0, 12.0, &unicodes, page_box));
//! ingestor.end_page();
//! let mut doc = ingestor.into_document();
//!
//! // Run the layout-analysis pipeline and serialize.
//! Pipeline::new(&config).run(&mut doc)?;
//! let mut out = Vec::new();
//! TextSerializer::new().serialize(&doc, &mut out)?;
//! assert_eq!(out, b"H\n");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Configuration
pub mod config;

// Geometric primitives
pub mod geometry;

// The document model
pub mod model;

// Character ingestion
pub mod ingest;

// Document statistics
pub mod statistics;

// Character- and word-level processing
pub mod text;

// Layout analysis
pub mod layout;

// Semantic-role classification interface
pub mod ml;

// Output serialization
pub mod serializers;

// The stage orchestrator
pub mod pipeline;

// Shared utilities
pub mod utils;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use model::{Document, SemanticRole, SerializationFormat};
pub use pipeline::Pipeline;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
