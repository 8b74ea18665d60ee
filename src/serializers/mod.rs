//! Output serialization of the finished document.
//!
//! Two surfaces: plain text (one blank line between blocks, optional role
//! prefixes and control characters) and JSON Lines (one object per
//! element, with selectable element units).

pub mod jsonl;
pub mod text;

pub use jsonl::JsonlSerializer;
pub use text::TextSerializer;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// The element units the JSONL serializer can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    /// One record per character.
    Characters,
    /// One record per word.
    Words,
    /// One record per text line.
    Lines,
    /// One record per text block.
    Blocks,
    /// One record per page.
    Pages,
    /// One record per figure.
    Figures,
    /// One record per shape.
    Shapes,
}

impl Unit {
    /// Parse a unit from its lowercase name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "characters" => Some(Unit::Characters),
            "words" => Some(Unit::Words),
            "lines" => Some(Unit::Lines),
            "blocks" => Some(Unit::Blocks),
            "pages" => Some(Unit::Pages),
            "figures" => Some(Unit::Figures),
            "shapes" => Some(Unit::Shapes),
            _ => None,
        }
    }
}

/// Open `path` for writing, creating missing parent directories. `-`
/// denotes stdout.
pub fn create_writer(path: &str) -> Result<Box<dyn Write>> {
    if path == "-" {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|err| {
                Error::Serialize(format!(
                    "could not create directory '{}': {}",
                    parent.display(),
                    err
                ))
            })?;
        }
    }
    let file = File::create(path).map_err(|err| {
        Error::Serialize(format!("could not create file '{}': {}", path.display(), err))
    })?;
    Ok(Box::new(BufWriter::new(file)))
}
