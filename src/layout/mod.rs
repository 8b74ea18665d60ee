//! Layout analysis: page segmentation, text-line detection, text-block
//! detection and reading-order detection, all built on a shared XY-cut
//! engine with pluggable cut-acceptance policies.

pub mod reading_order;
pub mod segmentation;
pub mod text_blocks;
pub mod text_lines;
pub mod xy_cut;

pub use reading_order::ReadingOrderDetector;
pub use segmentation::PageSegmenter;
pub use text_blocks::TextBlockDetector;
pub use text_lines::TextLineDetector;
pub use xy_cut::{Cut, CutDir};
