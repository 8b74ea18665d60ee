//! The document model produced by the extraction pipeline.
//!
//! A [`Document`] owns flat arenas for characters, words, text lines, page
//! segments and text blocks; pages (and all cross-references between
//! entities) hold typed indices into those arenas. Using indices instead of
//! owning pointers breaks the reference cycles between blocks and lines and
//! between neighbouring lines, and keeps every entity freely mutable during
//! the pipeline stages.

use std::collections::HashMap;

use crate::geometry::{Position, Rect};

/// Index of a [`Character`] in [`Document::chars`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharId(pub usize);

/// Index of a [`Word`] in [`Document::words`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WordId(pub usize);

/// Index of a [`TextLine`] in [`Document::lines`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineId(pub usize);

/// Index of a [`PageSegment`] in [`Document::segments`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentId(pub usize);

/// Index of a [`TextBlock`] in [`Document::blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

/// Index of a [`Figure`] in [`Document::figures`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FigureId(pub usize);

/// Index of a [`Shape`] in [`Document::shapes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeId(pub usize);

/// Index of a [`Graphic`] in [`Document::graphics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphicId(pub usize);

/// Font metadata shared by all characters drawn with the same font.
///
/// Populated from the external font-file parser; one entry per unique font
/// name, owned by the document.
#[derive(Debug, Clone)]
pub struct FontInfo {
    /// The (PDF-internal) font name.
    pub font_name: String,
    /// Ascent, in glyph space units scaled to text space.
    pub ascent: f64,
    /// Descent (negative), in glyph space units scaled to text space.
    pub descent: f64,
    /// Numeric font weight (400 regular, 700 bold).
    pub weight: f64,
    /// Whether the font is italic.
    pub is_italic: bool,
    /// Whether the font is a serif font.
    pub is_serif: bool,
    /// Whether the font is a Type3 font.
    pub is_type3: bool,
    /// Whether the font is symbolic.
    pub is_symbolic: bool,
    /// The font matrix mapping glyph space to text space.
    pub font_matrix: [f64; 6],
    /// Tight per-glyph bounding boxes keyed by glyph name, in glyph space.
    pub glyph_bboxes: HashMap<String, (f64, f64, f64, f64)>,
}

impl FontInfo {
    /// Create a font-info record with neutral defaults for the given name.
    pub fn new(font_name: &str) -> Self {
        Self {
            font_name: font_name.to_string(),
            ascent: 0.75,
            descent: -0.25,
            weight: 400.0,
            is_italic: false,
            is_serif: false,
            is_type3: false,
            is_symbolic: false,
            font_matrix: [0.001, 0.0, 0.0, 0.001, 0.0, 0.0],
            glyph_bboxes: HashMap::new(),
        }
    }
}

/// A single glyph-draw event, enriched by the pipeline.
#[derive(Debug, Clone)]
pub struct Character {
    /// Position on the page.
    pub pos: Position,
    /// Baseline coordinate (y for horizontal text, x for 90°-rotated text).
    pub base: f64,
    /// The character's text in UTF-8.
    pub text: String,
    /// The underlying Unicode code points.
    pub unicodes: Vec<u32>,
    /// The glyph name from the font program, when known.
    pub glyph_name: Option<String>,
    /// Name of the font the character is drawn with.
    pub font_name: String,
    /// Effective font size in points.
    pub font_size: f64,
    /// Fill color as RGB in [0, 1].
    pub color: [f64; 3],
    /// Fill opacity in [0, 1].
    pub opacity: f64,
    /// Extraction rank (sequential index in content-stream order).
    pub rank: usize,
    /// Whether the character was detected as a subscript.
    pub is_subscript: bool,
    /// Whether the character was detected as a superscript.
    pub is_superscript: bool,
    /// When this character is a diacritic mark merged into a base character,
    /// the base character.
    pub diacritic_mark_of: Option<CharId>,
    /// When a diacritic mark was merged into this character, the mark.
    pub base_char_of: Option<CharId>,
    /// The NFC-composed text of base character plus mark.
    pub text_with_diacritic_mark: Option<String>,
    /// The word this character was assigned to.
    pub word: Option<WordId>,
}

impl Character {
    /// The text later stages should use: the composed text when a diacritic
    /// mark was merged into this character, the plain text otherwise.
    pub fn effective_text(&self) -> &str {
        self.text_with_diacritic_mark.as_deref().unwrap_or(&self.text)
    }
}

/// A word formed from consecutive characters.
#[derive(Debug, Clone)]
pub struct Word {
    /// Position on the page.
    pub pos: Position,
    /// The word text.
    pub text: String,
    /// Extraction rank (the rank of the word's first character).
    pub rank: usize,
    /// Most frequent font name among the word's characters.
    pub font_name: String,
    /// Most frequent font size among the word's characters.
    pub font_size: f64,
    /// The characters of the word, in extraction order.
    pub characters: Vec<CharId>,
    /// The text line this word was assigned to.
    pub line: Option<LineId>,
    /// When this word ends in a hyphen continued on the next line, the text
    /// of the virtual merged word.
    pub first_part_of_hyphenated_word: Option<String>,
    /// Whether this word is the continuation of a hyphenated word.
    pub second_part_of_hyphenated_word: bool,
    /// When this word is an attachment of a stacked math symbol, the base
    /// word.
    pub part_of_stacked_math_symbol: Option<WordId>,
    /// When this word is the base of a stacked math symbol, its attachments.
    pub base_of_stacked_math_symbol: Vec<WordId>,
}

/// A text line within a page segment.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// Position on the page.
    pub pos: Position,
    /// The most frequent baseline among the line's characters.
    pub base: f64,
    /// The line text (words joined by single spaces).
    pub text: String,
    /// The words of the line, in reading order.
    pub words: Vec<WordId>,
    /// Rank of the line within its segment.
    pub rank: usize,
    /// Most frequent font name among the line's characters.
    pub font_name: String,
    /// Most frequent font size among the line's characters.
    pub font_size: f64,
    /// Maximum font size among the line's characters.
    pub max_font_size: f64,
    /// Left edge of the base bounding box (sub/superscripts excluded).
    pub base_bbox_left_x: f64,
    /// Upper edge of the base bounding box.
    pub base_bbox_upper_y: f64,
    /// Right edge of the base bounding box.
    pub base_bbox_right_x: f64,
    /// Lower edge of the base bounding box.
    pub base_bbox_lower_y: f64,
    /// Left margin relative to the containing block's trim box.
    pub left_margin: f64,
    /// Right margin relative to the containing block's trim box.
    pub right_margin: f64,
    /// The previous line in document order.
    pub prev_line: Option<LineId>,
    /// The next line in document order.
    pub next_line: Option<LineId>,
    /// The previous sibling in the indentation hierarchy.
    pub prev_sibling_line: Option<LineId>,
    /// The next sibling in the indentation hierarchy.
    pub next_sibling_line: Option<LineId>,
    /// The parent in the indentation hierarchy.
    pub parent_line: Option<LineId>,
    /// The segment containing this line.
    pub segment: SegmentId,
    /// The block this line was assigned to.
    pub block: Option<BlockId>,
}

/// A contiguous spatial region of a page obtained from the XY-cut.
#[derive(Debug, Clone)]
pub struct PageSegment {
    /// Position on the page (bounding box over the elements).
    pub pos: Position,
    /// Left edge of the trim box.
    pub trim_left_x: f64,
    /// Upper edge of the trim box.
    pub trim_upper_y: f64,
    /// Right edge of the trim box (tightened to the most frequent line
    /// right-x).
    pub trim_right_x: f64,
    /// Lower edge of the trim box.
    pub trim_lower_y: f64,
    /// The elements of the segment.
    pub elements: Vec<Element>,
    /// The text lines of the segment, in reading order.
    pub lines: Vec<LineId>,
}

/// A text block: a contiguous run of lines within one segment.
#[derive(Debug, Clone)]
pub struct TextBlock {
    /// Position on the page.
    pub pos: Position,
    /// Left edge of the trim box (clamped to the segment trim box).
    pub trim_left_x: f64,
    /// Upper edge of the trim box.
    pub trim_upper_y: f64,
    /// Right edge of the trim box.
    pub trim_right_x: f64,
    /// Lower edge of the trim box.
    pub trim_lower_y: f64,
    /// The segment containing this block.
    pub segment: SegmentId,
    /// The lines of the block.
    pub lines: Vec<LineId>,
    /// Rank of the block (re-assigned by reading-order detection).
    pub rank: usize,
    /// The semantic role of the block.
    pub role: SemanticRole,
    /// Whether the block is emphasized (larger, bold, italic or uppercase).
    pub is_emphasized: bool,
    /// Whether the block's lines are centered.
    pub is_lines_centered: bool,
    /// The hanging-indent amount, or 0 when the block is not in
    /// hanging-indent format.
    pub hanging_indent: f64,
    /// The previous block on the page.
    pub prev_block: Option<BlockId>,
    /// The next block on the page.
    pub next_block: Option<BlockId>,
    /// Most frequent font name among the block's lines.
    pub font_name: String,
    /// Most frequent font size among the block's lines.
    pub font_size: f64,
    /// The block text (lines joined by single spaces).
    pub text: String,
}

/// A figure: non-text content captured inside one clip box.
#[derive(Debug, Clone)]
pub struct Figure {
    /// The clip box that identifies this figure.
    pub clip_box: Rect,
    /// Position (bounding box over the captured content).
    pub pos: Position,
    /// Extraction rank.
    pub rank: usize,
    /// Characters captured inside the figure's clip box.
    pub characters: Vec<CharId>,
    /// Shapes captured inside the figure's clip box.
    pub shapes: Vec<ShapeId>,
    /// Graphics captured inside the figure's clip box.
    pub graphics: Vec<GraphicId>,
}

/// A vector path drawn by a stroke or fill operator.
#[derive(Debug, Clone)]
pub struct Shape {
    /// Position on the page.
    pub pos: Position,
    /// Extraction rank.
    pub rank: usize,
}

/// A raster image drawn by an image operator.
#[derive(Debug, Clone)]
pub struct Graphic {
    /// Position on the page.
    pub pos: Position,
    /// Extraction rank.
    pub rank: usize,
}

/// One of the element kinds handled uniformly by the XY-cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    /// A word.
    Word(WordId),
    /// A figure.
    Figure(FigureId),
    /// A shape.
    Shape(ShapeId),
    /// A graphic.
    Graphic(GraphicId),
    /// A text block.
    Block(BlockId),
}

impl Element {
    /// The position of the underlying entity.
    pub fn pos<'a>(&self, doc: &'a Document) -> &'a Position {
        match *self {
            Element::Word(id) => &doc.words[id.0].pos,
            Element::Figure(id) => &doc.figures[id.0].pos,
            Element::Shape(id) => &doc.shapes[id.0].pos,
            Element::Graphic(id) => &doc.graphics[id.0].pos,
            Element::Block(id) => &doc.blocks[id.0].pos,
        }
    }

    /// Whether the element is a non-text element (figure, shape, graphic).
    pub fn is_non_text(&self) -> bool {
        matches!(self, Element::Figure(_) | Element::Shape(_) | Element::Graphic(_))
    }

    /// The underlying word id, when the element is a word.
    pub fn as_word(&self) -> Option<WordId> {
        match *self {
            Element::Word(id) => Some(id),
            _ => None,
        }
    }

    /// The underlying block id, when the element is a text block.
    pub fn as_block(&self) -> Option<BlockId> {
        match *self {
            Element::Block(id) => Some(id),
            _ => None,
        }
    }
}

/// The semantic role of a text block.
///
/// The ordinal values double as the output indices of the role classifier;
/// the serialized tags are the lowercase names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SemanticRole {
    /// Document title.
    Title,
    /// Section heading.
    Heading,
    /// Body paragraph.
    #[default]
    Paragraph,
    /// Author information.
    AuthorInfo,
    /// Abstract.
    Abstract,
    /// Footnote.
    Footnote,
    /// Figure or table caption.
    Caption,
    /// Display formula.
    Formula,
    /// Enumeration item.
    ItemizeItem,
    /// Marginal content (page header or footer).
    Marginal,
    /// Table content.
    Table,
    /// Anything else.
    Other,
}

/// The fixed list of semantic-role names; index = ordinal.
pub const SEMANTIC_ROLE_NAMES: [&str; 12] = [
    "title",
    "heading",
    "paragraph",
    "author_info",
    "abstract",
    "footnote",
    "caption",
    "formula",
    "itemize_item",
    "marginal",
    "table",
    "other",
];

impl SemanticRole {
    /// Construct from an ordinal, falling back to `Paragraph` for values
    /// outside the role list.
    pub fn from_ordinal(ordinal: usize) -> Self {
        match ordinal {
            0 => SemanticRole::Title,
            1 => SemanticRole::Heading,
            2 => SemanticRole::Paragraph,
            3 => SemanticRole::AuthorInfo,
            4 => SemanticRole::Abstract,
            5 => SemanticRole::Footnote,
            6 => SemanticRole::Caption,
            7 => SemanticRole::Formula,
            8 => SemanticRole::ItemizeItem,
            9 => SemanticRole::Marginal,
            10 => SemanticRole::Table,
            11 => SemanticRole::Other,
            _ => SemanticRole::Paragraph,
        }
    }

    /// The ordinal value.
    pub fn ordinal(self) -> usize {
        match self {
            SemanticRole::Title => 0,
            SemanticRole::Heading => 1,
            SemanticRole::Paragraph => 2,
            SemanticRole::AuthorInfo => 3,
            SemanticRole::Abstract => 4,
            SemanticRole::Footnote => 5,
            SemanticRole::Caption => 6,
            SemanticRole::Formula => 7,
            SemanticRole::ItemizeItem => 8,
            SemanticRole::Marginal => 9,
            SemanticRole::Table => 10,
            SemanticRole::Other => 11,
        }
    }

    /// The lowercase tag used in serialized output.
    pub fn name(self) -> &'static str {
        SEMANTIC_ROLE_NAMES[self.ordinal()]
    }
}

/// The supported serialization formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationFormat {
    /// Plain text.
    Txt,
    /// JSON Lines.
    Jsonl,
}

/// The fixed list of serialization-format names; index = ordinal.
pub const SERIALIZATION_FORMAT_NAMES: [&str; 2] = ["txt", "jsonl"];

/// A single page of the document.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number.
    pub page_num: u32,
    /// The page clip box.
    pub clip_box: Rect,
    /// Page width in points.
    pub width: f64,
    /// Page height in points.
    pub height: f64,
    /// Characters owned by the page (not captured by a figure), in
    /// extraction order.
    pub characters: Vec<CharId>,
    /// Figures on the page.
    pub figures: Vec<FigureId>,
    /// Shapes owned by the page.
    pub shapes: Vec<ShapeId>,
    /// Graphics owned by the page.
    pub graphics: Vec<GraphicId>,
    /// Words of the page (after word formation), in extraction order.
    pub words: Vec<WordId>,
    /// Segments of the page (after page segmentation).
    pub segments: Vec<SegmentId>,
    /// Blocks of the page; ordered by reading order after reading-order
    /// detection.
    pub blocks: Vec<BlockId>,
}

impl Page {
    /// Create an empty page.
    pub fn new(page_num: u32, clip_box: Rect) -> Self {
        Self {
            page_num,
            width: clip_box.width(),
            height: clip_box.height(),
            clip_box,
            characters: Vec::new(),
            figures: Vec::new(),
            shapes: Vec::new(),
            graphics: Vec::new(),
            words: Vec::new(),
            segments: Vec::new(),
            blocks: Vec::new(),
        }
    }
}

/// The root of the document model.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// The pages, in document order.
    pub pages: Vec<Page>,
    /// Font-info entries keyed by font name.
    pub fonts: HashMap<String, FontInfo>,
    /// Character arena.
    pub chars: Vec<Character>,
    /// Word arena.
    pub words: Vec<Word>,
    /// Text-line arena.
    pub lines: Vec<TextLine>,
    /// Segment arena.
    pub segments: Vec<PageSegment>,
    /// Block arena.
    pub blocks: Vec<TextBlock>,
    /// Figure arena.
    pub figures: Vec<Figure>,
    /// Shape arena.
    pub shapes: Vec<Shape>,
    /// Graphic arena.
    pub graphics: Vec<Graphic>,

    /// The most frequent font size among the characters.
    pub most_freq_font_size: f64,
    /// The most frequent font name among the characters.
    pub most_freq_font_name: String,
    /// The average character width.
    pub avg_char_width: f64,
    /// The average character height.
    pub avg_char_height: f64,
    /// The most frequent word height.
    pub most_freq_word_height: f64,
    /// The most frequent horizontal gap between consecutive same-line words.
    pub most_freq_word_distance: f64,
    /// The most frequent vertical gap between consecutive words on
    /// different lines (estimated before line detection).
    pub most_freq_estimated_line_distance: f64,
    /// The most frequent line distance (from base bounding boxes).
    pub most_freq_line_distance: f64,
    /// The most frequent line distance broken down by font size.
    pub most_freq_line_distance_per_font_size: HashMap<u64, f64>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a character to the arena.
    pub fn push_char(&mut self, ch: Character) -> CharId {
        self.chars.push(ch);
        CharId(self.chars.len() - 1)
    }

    /// Append a word to the arena.
    pub fn push_word(&mut self, word: Word) -> WordId {
        self.words.push(word);
        WordId(self.words.len() - 1)
    }

    /// Append a text line to the arena.
    pub fn push_line(&mut self, line: TextLine) -> LineId {
        self.lines.push(line);
        LineId(self.lines.len() - 1)
    }

    /// Append a segment to the arena.
    pub fn push_segment(&mut self, segment: PageSegment) -> SegmentId {
        self.segments.push(segment);
        SegmentId(self.segments.len() - 1)
    }

    /// Append a block to the arena.
    pub fn push_block(&mut self, block: TextBlock) -> BlockId {
        self.blocks.push(block);
        BlockId(self.blocks.len() - 1)
    }

    /// Append a figure to the arena.
    pub fn push_figure(&mut self, figure: Figure) -> FigureId {
        self.figures.push(figure);
        FigureId(self.figures.len() - 1)
    }

    /// Append a shape to the arena.
    pub fn push_shape(&mut self, shape: Shape) -> ShapeId {
        self.shapes.push(shape);
        ShapeId(self.shapes.len() - 1)
    }

    /// Append a graphic to the arena.
    pub fn push_graphic(&mut self, graphic: Graphic) -> GraphicId {
        self.graphics.push(graphic);
        GraphicId(self.graphics.len() - 1)
    }

    /// The font weight of the given font name, or 400 when unknown.
    pub fn font_weight(&self, font_name: &str) -> f64 {
        self.fonts.get(font_name).map(|f| f.weight).unwrap_or(400.0)
    }

    /// Look up the per-font-size most frequent line distance.
    pub fn line_distance_for_font_size(&self, font_size: f64) -> Option<f64> {
        self.most_freq_line_distance_per_font_size
            .get(&font_size.to_bits())
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_role_round_trip() {
        for ordinal in 0..SEMANTIC_ROLE_NAMES.len() {
            let role = SemanticRole::from_ordinal(ordinal);
            assert_eq!(role.ordinal(), ordinal);
            assert_eq!(role.name(), SEMANTIC_ROLE_NAMES[ordinal]);
        }
        // Out-of-range ordinals fall back to the default role.
        assert_eq!(SemanticRole::from_ordinal(99), SemanticRole::Paragraph);
    }

    #[test]
    fn test_default_role_is_paragraph() {
        assert_eq!(SemanticRole::default(), SemanticRole::Paragraph);
    }

    #[test]
    fn test_document_push_returns_sequential_ids() {
        let mut doc = Document::new();
        let s0 = doc.push_shape(Shape {
            pos: Position::default(),
            rank: 0,
        });
        let s1 = doc.push_shape(Shape {
            pos: Position::default(),
            rank: 1,
        });
        assert_eq!(s0, ShapeId(0));
        assert_eq!(s1, ShapeId(1));
    }

    #[test]
    fn test_font_weight_fallback() {
        let mut doc = Document::new();
        assert_eq!(doc.font_weight("Unknown"), 400.0);
        let mut info = FontInfo::new("Times-Bold");
        info.weight = 700.0;
        doc.fonts.insert("Times-Bold".to_string(), info);
        assert_eq!(doc.font_weight("Times-Bold"), 700.0);
    }

    #[test]
    fn test_effective_text() {
        let mut ch = Character {
            pos: Position::default(),
            base: 0.0,
            text: "a".to_string(),
            unicodes: vec![0x61],
            glyph_name: None,
            font_name: "F1".to_string(),
            font_size: 10.0,
            color: [0.0; 3],
            opacity: 1.0,
            rank: 0,
            is_subscript: false,
            is_superscript: false,
            diacritic_mark_of: None,
            base_char_of: None,
            text_with_diacritic_mark: None,
            word: None,
        };
        assert_eq!(ch.effective_text(), "a");
        ch.text_with_diacritic_mark = Some("á".to_string());
        assert_eq!(ch.effective_text(), "á");
    }
}
