//! Character ingestion from the external content-stream interpreter.
//!
//! The interpreter drives a [`ContentHandler`] with one event per page
//! start/end, font change, glyph draw, path paint and image draw. The
//! [`CharacterIngestor`] implementation turns that event stream into the
//! raw layer of the document model: pages, characters, figures, shapes and
//! graphics, each with precise geometry, rotation and color.
//!
//! Coordinate contract: all event coordinates are page-local with the
//! origin at the top-left and y increasing downward. The text rendering
//! matrix `trm` maps text space (y up) to that page space, so upright text
//! of size `s` at `(x, y)` has `trm = [s, 0, 0, -s, x, y]`.

pub mod glyph_names;

use log::{debug, warn};

use crate::config::Config;
use crate::geometry::{Position, Rect, Rotation, WritingMode};
use crate::model::{Character, Document, Figure, FigureId, FontInfo, Graphic, Page, Shape};

/// The font state announced by an `update_font` event.
#[derive(Debug, Clone)]
pub struct FontState {
    /// The font name.
    pub font_name: String,
    /// The writing mode of the font.
    pub writing_mode: WritingMode,
    /// Font metadata from the external font-file parser, when available.
    pub info: Option<FontInfo>,
}

/// A glyph-draw event.
#[derive(Debug, Clone)]
pub struct CharEvent<'a> {
    /// Text rendering matrix at draw time (text space → page space).
    pub trm: [f64; 6],
    /// Baseline origin of the glyph, in page coordinates.
    pub x: f64,
    /// Baseline origin of the glyph, in page coordinates.
    pub y: f64,
    /// Glyph advance, in page coordinates.
    pub adv_x: f64,
    /// Glyph advance, in page coordinates.
    pub adv_y: f64,
    /// The raw character code.
    pub char_code: u32,
    /// The glyph name from the font program, when known.
    pub glyph_name: Option<&'a str>,
    /// The Unicode code points the interpreter mapped the code to.
    pub unicodes: &'a [u32],
    /// The nominal font size.
    pub font_size: f64,
    /// Fill color as RGB in [0, 1].
    pub color: [f64; 3],
    /// Fill opacity in [0, 1].
    pub opacity: f64,
    /// The clip box active at draw time.
    pub clip_box: Rect,
}

impl<'a> CharEvent<'a> {
    /// Convenience constructor for upright horizontal text.
    pub fn upright(
        x: f64,
        y: f64,
        adv_x: f64,
        font_size: f64,
        unicodes: &'a [u32],
        clip_box: Rect,
    ) -> Self {
        Self {
            trm: [font_size, 0.0, 0.0, -font_size, x, y],
            x,
            y,
            adv_x,
            adv_y: 0.0,
            char_code: unicodes.first().copied().unwrap_or(0),
            glyph_name: None,
            unicodes,
            font_size,
            color: [0.0, 0.0, 0.0],
            opacity: 1.0,
            clip_box,
        }
    }
}

/// A path-paint event (stroke or fill).
#[derive(Debug, Clone)]
pub struct PathEvent {
    /// The extent of the painted path, in page coordinates.
    pub path_box: Rect,
    /// The clip box active at paint time.
    pub clip_box: Rect,
}

/// An image-draw event.
#[derive(Debug, Clone)]
pub struct ImageEvent {
    /// The CTM-derived rectangle covered by the image.
    pub image_box: Rect,
    /// The clip box active at draw time.
    pub clip_box: Rect,
}

/// The event sink driven by the external content-stream interpreter.
pub trait ContentHandler {
    /// A new page begins.
    fn start_page(&mut self, page_num: u32, clip_box: Rect);
    /// The text font changed.
    fn update_font(&mut self, font: FontState);
    /// A glyph was drawn.
    fn draw_char(&mut self, event: CharEvent<'_>);
    /// A path was stroked.
    fn stroke(&mut self, event: PathEvent);
    /// A path was filled.
    fn fill(&mut self, event: PathEvent);
    /// An image was drawn.
    fn draw_image(&mut self, event: ImageEvent);
    /// The current page ends.
    fn end_page(&mut self);
}

/// Builds the raw document layer from interpreter events.
pub struct CharacterIngestor<'a> {
    config: &'a Config,
    doc: Document,
    current_page: Option<usize>,
    current_font: Option<FontState>,
    next_rank: usize,
}

impl<'a> CharacterIngestor<'a> {
    /// Create an ingestor for a new document.
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            doc: Document::new(),
            current_page: None,
            current_font: None,
            next_rank: 0,
        }
    }

    /// Finish ingestion and hand over the document.
    pub fn into_document(self) -> Document {
        self.doc
    }

    fn take_rank(&mut self) -> usize {
        let rank = self.next_rank;
        self.next_rank += 1;
        rank
    }

    /// The rotation class of a glyph, derived from the signs and relative
    /// magnitudes of the text rendering matrix, plus one quarter turn in
    /// vertical writing mode.
    fn compute_rotation(trm: &[f64; 6], writing_mode: WritingMode) -> Rotation {
        let rotation = if (trm[0] * trm[3]).abs() >= (trm[1] * trm[2]).abs() {
            if trm[0] > 0.0 || trm[3] < 0.0 {
                Rotation::None
            } else {
                Rotation::UpsideDown
            }
        } else if trm[2] > 0.0 {
            Rotation::Clockwise
        } else {
            Rotation::CounterClockwise
        };
        match writing_mode {
            WritingMode::Horizontal => rotation,
            WritingMode::Vertical => rotation.rotated_once(),
        }
    }

    /// The glyph bounding box from the text rendering matrix and the font's
    /// ascent and descent.
    fn metrics_bbox(event: &CharEvent<'_>, ascent: f64, descent: f64) -> Rect {
        // Corners: baseline start/end, each offset by the ascent and the
        // descent along the trm's vertical axis.
        let (dx_asc, dy_asc) = (event.trm[2] * ascent, event.trm[3] * ascent);
        let (dx_desc, dy_desc) = (event.trm[2] * descent, event.trm[3] * descent);
        let xs = [
            event.x + dx_asc,
            event.x + dx_desc,
            event.x + event.adv_x + dx_asc,
            event.x + event.adv_x + dx_desc,
        ];
        let ys = [
            event.y + dy_asc,
            event.y + dy_desc,
            event.y + event.adv_y + dy_asc,
            event.y + event.adv_y + dy_desc,
        ];
        Rect::new(
            xs.iter().cloned().fold(f64::MAX, f64::min),
            ys.iter().cloned().fold(f64::MAX, f64::min),
            xs.iter().cloned().fold(f64::MIN, f64::max),
            ys.iter().cloned().fold(f64::MIN, f64::max),
        )
    }

    /// The glyph bounding box from the parsed glyph outline, transformed
    /// through the font matrix and the text rendering matrix.
    fn glyph_bbox(event: &CharEvent<'_>, font: &FontInfo) -> Option<Rect> {
        let glyph_name = event.glyph_name?;
        let &(gx0, gy0, gx1, gy1) = font.glyph_bboxes.get(glyph_name)?;
        let fm = &font.font_matrix;
        let trm = &event.trm;

        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for &(gx, gy) in &[(gx0, gy0), (gx1, gy0), (gx0, gy1), (gx1, gy1)] {
            // Glyph space → text space.
            let tx = fm[0] * gx + fm[2] * gy + fm[4];
            let ty = fm[1] * gx + fm[3] * gy + fm[5];
            // Text space → page space, relative to the glyph origin.
            let px = event.x + trm[0] * tx + trm[2] * ty;
            let py = event.y + trm[1] * tx + trm[3] * ty;
            min_x = min_x.min(px);
            min_y = min_y.min(py);
            max_x = max_x.max(px);
            max_y = max_y.max(py);
        }
        Some(Rect::new(min_x, min_y, max_x, max_y))
    }

    /// Translate the event's Unicode data (or, failing that, its glyph
    /// name) to UTF-8 text. Unmappable code points are dropped.
    fn resolve_text(event: &CharEvent<'_>) -> (String, Vec<u32>) {
        let mut unicodes: Vec<u32> = Vec::new();
        let mut text = String::new();
        for &u in event.unicodes {
            match char::from_u32(u) {
                Some(c) => {
                    unicodes.push(u);
                    text.push(c);
                }
                None => warn!("dropping unmappable code point U+{:X}", u),
            }
        }

        if text.is_empty() {
            if let Some(u) = event.glyph_name.and_then(glyph_names::to_unicode) {
                if let Some(c) = char::from_u32(u) {
                    unicodes.push(u);
                    text.push(c);
                }
            }
        }

        (text, unicodes)
    }

    /// Route a character either to the current page or to the figure whose
    /// clip box equals the event's clip box, creating the figure on demand.
    fn route_char(&mut self, ch: Character, clip_box: Rect) {
        let page_idx = match self.current_page {
            Some(idx) => idx,
            None => return,
        };
        let tolerance = self.config.coords_equal_tolerance;

        if self.doc.pages[page_idx].clip_box.equals(&clip_box, tolerance) {
            let id = self.doc.push_char(ch);
            self.doc.pages[page_idx].characters.push(id);
            return;
        }

        let figure_id = self.find_or_create_figure(page_idx, clip_box, &ch.pos);
        let pos = ch.pos.clone();
        let id = self.doc.push_char(ch);
        let figure = &mut self.doc.figures[figure_id.0];
        figure.pos.expand(&pos);
        figure.characters.push(id);
    }

    fn find_or_create_figure(
        &mut self,
        page_idx: usize,
        clip_box: Rect,
        initial_pos: &Position,
    ) -> FigureId {
        let tolerance = self.config.coords_equal_tolerance;
        for &figure_id in &self.doc.pages[page_idx].figures {
            if self.doc.figures[figure_id.0].clip_box.equals(&clip_box, tolerance) {
                return figure_id;
            }
        }

        let page_num = self.doc.pages[page_idx].page_num;
        let rank = self.take_rank();
        let figure_id = self.doc.push_figure(Figure {
            clip_box,
            pos: Position {
                page_num,
                ..initial_pos.clone()
            },
            rank,
            characters: Vec::new(),
            shapes: Vec::new(),
            graphics: Vec::new(),
        });
        self.doc.pages[page_idx].figures.push(figure_id);
        debug!("created figure for clip box {:?} on page {}", clip_box, page_num);
        figure_id
    }

    fn route_path(&mut self, event: PathEvent) {
        let page_idx = match self.current_page {
            Some(idx) => idx,
            None => return,
        };
        let shape_box = event.path_box.intersect(&event.clip_box);
        if shape_box.width() < 0.0 || shape_box.height() < 0.0 {
            return;
        }

        let page_num = self.doc.pages[page_idx].page_num;
        let pos = Position {
            page_num,
            left_x: shape_box.left,
            upper_y: shape_box.upper,
            right_x: shape_box.right,
            lower_y: shape_box.lower,
            ..Position::default()
        };
        let rank = self.take_rank();
        let tolerance = self.config.coords_equal_tolerance;

        if self.doc.pages[page_idx].clip_box.equals(&event.clip_box, tolerance) {
            let id = self.doc.push_shape(Shape { pos, rank });
            self.doc.pages[page_idx].shapes.push(id);
        } else {
            let figure_id = self.find_or_create_figure(page_idx, event.clip_box, &pos);
            let id = self.doc.push_shape(Shape {
                pos: pos.clone(),
                rank,
            });
            let figure = &mut self.doc.figures[figure_id.0];
            figure.pos.expand(&pos);
            figure.shapes.push(id);
        }
    }
}

impl ContentHandler for CharacterIngestor<'_> {
    fn start_page(&mut self, page_num: u32, clip_box: Rect) {
        self.doc.pages.push(Page::new(page_num, clip_box));
        self.current_page = Some(self.doc.pages.len() - 1);
    }

    fn update_font(&mut self, font: FontState) {
        if let Some(info) = &font.info {
            if self.config.parse_embedded_font_files
                && !self.doc.fonts.contains_key(&font.font_name)
            {
                self.doc.fonts.insert(font.font_name.clone(), info.clone());
            }
        }
        if !self.doc.fonts.contains_key(&font.font_name) {
            self.doc
                .fonts
                .insert(font.font_name.clone(), FontInfo::new(&font.font_name));
        }
        self.current_font = Some(font);
    }

    fn draw_char(&mut self, event: CharEvent<'_>) {
        let page_idx = match self.current_page {
            Some(idx) => idx,
            None => return,
        };
        let font = match &self.current_font {
            Some(font) => font.clone(),
            None => {
                warn!("glyph drawn before any font update; dropping");
                return;
            }
        };

        let (text, unicodes) = Self::resolve_text(&event);
        if text.is_empty() {
            debug!("dropping glyph with unresolvable text (code {})", event.char_code);
            return;
        }
        // Whitespace draws no visible content; skip (U+00A0 included).
        if text.chars().all(|c| c.is_whitespace() || c == '\u{00A0}') {
            return;
        }

        let font_info = self.doc.fonts[&font.font_name].clone();
        let rotation = Self::compute_rotation(&event.trm, font.writing_mode);

        // Compute the bounding box two ways and keep the variant with the
        // larger vertical extent. The glyph-outline box fixes the shifted
        // boxes that ascent/descent metrics produce for math symbols.
        let metrics_box = Self::metrics_bbox(&event, font_info.ascent, font_info.descent);
        let bbox = match Self::glyph_bbox(&event, &font_info) {
            Some(outline_box) if outline_box.height() > metrics_box.height() => outline_box,
            _ => metrics_box,
        };

        let base = match rotation {
            Rotation::None | Rotation::UpsideDown => event.y,
            _ => event.x,
        };

        let page_num = self.doc.pages[page_idx].page_num;
        let rank = self.take_rank();
        let ch = Character {
            pos: Position {
                page_num,
                left_x: bbox.left,
                upper_y: bbox.upper,
                right_x: bbox.right,
                lower_y: bbox.lower,
                rotation,
                writing_mode: font.writing_mode,
            },
            base,
            text,
            unicodes,
            glyph_name: event.glyph_name.map(|s| s.to_string()),
            font_name: font.font_name.clone(),
            font_size: event.font_size,
            color: event.color,
            opacity: event.opacity,
            rank,
            is_subscript: false,
            is_superscript: false,
            diacritic_mark_of: None,
            base_char_of: None,
            text_with_diacritic_mark: None,
            word: None,
        };
        self.route_char(ch, event.clip_box);
    }

    fn stroke(&mut self, event: PathEvent) {
        self.route_path(event);
    }

    fn fill(&mut self, event: PathEvent) {
        self.route_path(event);
    }

    fn draw_image(&mut self, event: ImageEvent) {
        let page_idx = match self.current_page {
            Some(idx) => idx,
            None => return,
        };
        let image_box = event.image_box.intersect(&event.clip_box);
        if image_box.width() < 0.0 || image_box.height() < 0.0 {
            return;
        }

        let page_num = self.doc.pages[page_idx].page_num;
        let pos = Position {
            page_num,
            left_x: image_box.left,
            upper_y: image_box.upper,
            right_x: image_box.right,
            lower_y: image_box.lower,
            ..Position::default()
        };
        let rank = self.take_rank();
        let tolerance = self.config.coords_equal_tolerance;

        if self.doc.pages[page_idx].clip_box.equals(&event.clip_box, tolerance) {
            let id = self.doc.push_graphic(Graphic { pos, rank });
            self.doc.pages[page_idx].graphics.push(id);
        } else {
            let figure_id = self.find_or_create_figure(page_idx, event.clip_box, &pos);
            let id = self.doc.push_graphic(Graphic {
                pos: pos.clone(),
                rank,
            });
            let figure = &mut self.doc.figures[figure_id.0];
            figure.pos.expand(&pos);
            figure.graphics.push(id);
        }
    }

    fn end_page(&mut self) {
        self.current_page = None;
    }
}
