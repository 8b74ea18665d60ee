//! End-to-end tests of the extraction pipeline, driven through the public
//! ingestion API with synthetic character events.

use pdftotext_pp::config::Config;
use pdftotext_pp::geometry::Rect;
use pdftotext_pp::ingest::{CharEvent, CharacterIngestor, ContentHandler, FontState};
use pdftotext_pp::ml::{RoleModel, SemanticRoleClassifier, NUM_LAYOUT_FEATURES};
use pdftotext_pp::model::{Document, FontInfo, SemanticRole};
use pdftotext_pp::pipeline::Pipeline;
use pdftotext_pp::serializers::TextSerializer;
use pdftotext_pp::Result;

fn page_box() -> Rect {
    Rect::new(0.0, 0.0, 612.0, 792.0)
}

fn font(name: &str, weight: f64) -> FontState {
    let mut info = FontInfo::new(name);
    info.weight = weight;
    FontState {
        font_name: name.to_string(),
        writing_mode: Default::default(),
        info: Some(info),
    }
}

/// Draw `text` at the given baseline; characters advance by half the font
/// size, spaces by 0.4 of it. Returns the x coordinate after the text.
fn draw_text(
    ingestor: &mut CharacterIngestor<'_>,
    text: &str,
    x: f64,
    baseline: f64,
    size: f64,
) -> f64 {
    let mut cursor = x;
    for c in text.chars() {
        if c == ' ' {
            cursor += size * 0.4;
            continue;
        }
        let unicodes = [c as u32];
        ingestor.draw_char(CharEvent::upright(
            cursor,
            baseline,
            size * 0.5,
            size,
            &unicodes,
            page_box(),
        ));
        cursor += size * 0.5;
    }
    cursor
}

fn serialize_text(doc: &Document) -> String {
    let mut out = Vec::new();
    TextSerializer::new().serialize(doc, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

/// Scenario: a simple one-column paragraph.
#[test]
fn test_simple_one_column_paragraph() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = Config::new();
    let mut ingestor = CharacterIngestor::new(&config);
    ingestor.start_page(1, page_box());
    ingestor.update_font(font("Times", 400.0));
    draw_text(
        &mut ingestor,
        "Lorem ipsum dolor sit amet, consetetur.",
        72.0,
        720.0,
        11.0,
    );
    ingestor.end_page();
    let mut doc = ingestor.into_document();

    Pipeline::new(&config).run(&mut doc).unwrap();

    assert_eq!(doc.pages[0].words.len(), 6);
    assert_eq!(doc.pages[0].segments.len(), 1);
    let segment = &doc.segments[doc.pages[0].segments[0].0];
    assert_eq!(segment.lines.len(), 1);
    assert_eq!(doc.pages[0].blocks.len(), 1);
    let block = &doc.blocks[doc.pages[0].blocks[0].0];
    assert_eq!(block.role, SemanticRole::Paragraph);
    assert_eq!(
        serialize_text(&doc),
        "Lorem ipsum dolor sit amet, consetetur.\n"
    );
}

/// A role model that calls the block with the largest font size a title.
struct TitleByFontSize;

impl RoleModel for TitleByFontSize {
    fn predict(
        &self,
        layout: &[[f32; NUM_LAYOUT_FEATURES]],
        _words: &[Vec<i32>],
    ) -> Result<Vec<Vec<f32>>> {
        Ok(layout
            .iter()
            .map(|row| {
                let mut probs = vec![0.0; 12];
                // Feature 5 is the min-max-normalized font size.
                if row[5] >= 1.0 {
                    probs[SemanticRole::Title.ordinal()] = 1.0;
                } else {
                    probs[SemanticRole::Paragraph.ordinal()] = 1.0;
                }
                probs
            })
            .collect())
    }
}

/// Scenario: a two-column article with a column-spanning header. The
/// header must survive segmentation intact and be read first, before the
/// left and the right column.
#[test]
fn test_two_column_article_with_header() {
    let config = Config::new();
    let mut ingestor = CharacterIngestor::new(&config);
    ingestor.start_page(1, page_box());

    // The header spans the column gutter: it starts inside the left
    // column's x-range and ends inside the right column's.
    ingestor.update_font(font("Times-Bold", 700.0));
    draw_text(&mut ingestor, "1 Introduction", 150.0, 100.0, 14.0);

    ingestor.update_font(font("Times", 400.0));
    let body = "justified body text here";
    for row in 0..3 {
        draw_text(&mut ingestor, body, 72.0, 140.0 + row as f64 * 14.0, 11.0);
    }
    for row in 0..3 {
        draw_text(&mut ingestor, body, 240.0, 140.0 + row as f64 * 14.0, 11.0);
    }
    ingestor.end_page();
    let mut doc = ingestor.into_document();

    let mut classifier =
        SemanticRoleClassifier::new(&config, Box::new(TitleByFontSize), Default::default());
    Pipeline::new(&config)
        .run_with_classifier(&mut doc, &mut classifier)
        .unwrap();

    // The spanning header is not divided by the column cut.
    assert_eq!(doc.pages[0].segments.len(), 3);
    assert_eq!(doc.pages[0].blocks.len(), 3);

    // Reading order: header first, left column second, right column third.
    let texts: Vec<&str> = doc.pages[0]
        .blocks
        .iter()
        .map(|&id| doc.blocks[id.0].text.as_str())
        .collect();
    assert_eq!(texts[0], "1 Introduction");
    assert_eq!(texts[1], format!("{0} {0} {0}", body));
    assert_eq!(texts[2], format!("{0} {0} {0}", body));
    assert_eq!(doc.blocks[doc.pages[0].blocks[0].0].role, SemanticRole::Title);

    let left = &doc.blocks[doc.pages[0].blocks[1].0];
    let right = &doc.blocks[doc.pages[0].blocks[2].0];
    assert!(left.pos.right_x < right.pos.left_x);
}

/// Scenario: a hanging-indent list. Each item becomes its own block with
/// the common indent amount detected.
#[test]
fn test_hanging_indent_list() {
    let config = Config::new();
    let mut ingestor = CharacterIngestor::new(&config);
    ingestor.start_page(1, page_box());
    ingestor.update_font(font("Times", 400.0));

    // Two items at x=72, continuations indented to x=90. The
    // continuations run almost to the item lines' right edge.
    draw_text(&mut ingestor, "1. First item text.", 72.0, 700.0, 10.0);
    draw_text(&mut ingestor, "the item goes on", 90.0, 714.0, 10.0);
    draw_text(&mut ingestor, "2. Second item txt.", 72.0, 728.0, 10.0);
    draw_text(&mut ingestor, "also continued.", 90.0, 742.0, 10.0);
    ingestor.end_page();
    let mut doc = ingestor.into_document();

    Pipeline::new(&config).run(&mut doc).unwrap();

    assert_eq!(doc.pages[0].blocks.len(), 2);
    for &block_id in &doc.pages[0].blocks {
        let block = &doc.blocks[block_id.0];
        assert_eq!(block.lines.len(), 2);
        assert!(
            (block.hanging_indent - 18.0).abs() < 1.0,
            "expected a hanging indent of about 18, got {}",
            block.hanging_indent
        );
    }
}

/// Scenario: a footnote at the bottom. The footnote line is split into its
/// own block although font size and spacing match the body, because its
/// leading "1" matches the superscript marker seen in the body.
#[test]
fn test_footnote_block_detected_by_label() {
    let config = Config::new();
    let mut ingestor = CharacterIngestor::new(&config);
    ingestor.start_page(1, page_box());
    ingestor.update_font(font("Times", 400.0));

    // Body line with a superscripted marker "1" right after "claim".
    let after_claim = draw_text(&mut ingestor, "the claim", 72.0, 700.0, 10.0);
    let marker = ['1' as u32];
    ingestor.draw_char(CharEvent::upright(
        after_claim,
        696.0,
        3.5,
        7.0,
        &marker,
        page_box(),
    ));
    draw_text(&mut ingestor, " holds", after_claim + 3.5, 700.0, 10.0);
    draw_text(&mut ingestor, "more body text", 72.0, 714.0, 10.0);
    // The footnote line: a plain "1" followed by the footnote text.
    draw_text(&mut ingestor, "1 The footnote text", 72.0, 728.0, 10.0);
    ingestor.end_page();
    let mut doc = ingestor.into_document();

    Pipeline::new(&config).run(&mut doc).unwrap();

    assert_eq!(doc.pages[0].blocks.len(), 2);
    let footnote = &doc.blocks[doc.pages[0].blocks[1].0];
    assert!(footnote.text.starts_with("1 The footnote"));
    // Same font size as the body: the split came from the label rule.
    assert_eq!(footnote.font_size, doc.blocks[doc.pages[0].blocks[0].0].font_size);
}

/// Scenario: diacritic composition. A base "a" and a combining acute
/// compose to "á"; the mark itself is skipped during word formation.
#[test]
fn test_diacritic_composition() {
    let config = Config::new();
    let mut ingestor = CharacterIngestor::new(&config);
    ingestor.start_page(1, page_box());
    ingestor.update_font(font("Times", 400.0));

    let base_unicodes = ['a' as u32];
    ingestor.draw_char(CharEvent::upright(72.0, 720.0, 6.0, 10.0, &base_unicodes, page_box()));
    let mark_unicodes = [0x0301];
    ingestor.draw_char(CharEvent::upright(73.0, 720.0, 3.0, 10.0, &mark_unicodes, page_box()));
    ingestor.end_page();
    let mut doc = ingestor.into_document();

    Pipeline::new(&config).run(&mut doc).unwrap();

    assert_eq!(doc.pages[0].words.len(), 1);
    let word = &doc.words[doc.pages[0].words[0].0];
    assert_eq!(word.text, "á");
    assert_eq!(word.characters.len(), 1);

    // The mark is merged, not lost: it points at its base.
    let mark = &doc.chars[doc.pages[0].characters[1].0];
    assert!(mark.diacritic_mark_of.is_some());
    let base = &doc.chars[doc.pages[0].characters[0].0];
    assert_eq!(base.text_with_diacritic_mark.as_deref(), Some("á"));
    // The characters of all words are exactly the page characters minus
    // the merged mark.
    let chars_in_words: usize = doc.pages[0]
        .words
        .iter()
        .map(|&id| doc.words[id.0].characters.len())
        .sum();
    assert_eq!(chars_in_words, doc.pages[0].characters.len() - 1);

    assert_eq!(serialize_text(&doc), "á\n");
}

/// Scenario: hyphenation across lines. "experi-" and "mental" produce the
/// virtual merged word "experimental" in the plain-text output.
#[test]
fn test_hyphenation_across_lines() {
    let config = Config::new();
    let mut ingestor = CharacterIngestor::new(&config);
    ingestor.start_page(1, page_box());
    ingestor.update_font(font("Times", 400.0));
    draw_text(&mut ingestor, "an experi-", 72.0, 700.0, 10.0);
    draw_text(&mut ingestor, "mental run", 72.0, 714.0, 10.0);
    ingestor.end_page();
    let mut doc = ingestor.into_document();

    Pipeline::new(&config).run(&mut doc).unwrap();

    assert_eq!(doc.pages[0].blocks.len(), 1);
    let hyphenated: Vec<&pdftotext_pp::model::Word> = doc
        .words
        .iter()
        .filter(|w| w.first_part_of_hyphenated_word.is_some())
        .collect();
    assert_eq!(hyphenated.len(), 1);
    assert_eq!(
        hyphenated[0].first_part_of_hyphenated_word.as_deref(),
        Some("experimental")
    );

    assert_eq!(serialize_text(&doc), "an experimental run\n");
}

/// A page with zero characters produces zero words, segments and blocks,
/// and serialization emits nothing beyond the final newline.
#[test]
fn test_empty_page_produces_nothing() {
    let config = Config::new();
    let mut ingestor = CharacterIngestor::new(&config);
    ingestor.start_page(1, page_box());
    ingestor.end_page();
    let mut doc = ingestor.into_document();

    Pipeline::new(&config).run(&mut doc).unwrap();

    assert!(doc.pages[0].words.is_empty());
    assert!(doc.pages[0].segments.is_empty());
    assert!(doc.pages[0].blocks.is_empty());
    assert_eq!(serialize_text(&doc), "\n");
}

/// Running the statistics stages twice yields identical aggregates.
#[test]
fn test_statistics_idempotent_end_to_end() {
    let config = Config::new();
    let mut ingestor = CharacterIngestor::new(&config);
    ingestor.start_page(1, page_box());
    ingestor.update_font(font("Times", 400.0));
    draw_text(&mut ingestor, "some words for the statistics", 72.0, 700.0, 10.0);
    draw_text(&mut ingestor, "and another line of them", 72.0, 714.0, 10.0);
    ingestor.end_page();
    let mut doc = ingestor.into_document();

    Pipeline::new(&config).run(&mut doc).unwrap();
    let first = (
        doc.most_freq_font_size,
        doc.avg_char_width,
        doc.most_freq_word_distance,
        doc.most_freq_line_distance,
    );

    use pdftotext_pp::statistics::StatisticsCalculator;
    let statistics = StatisticsCalculator::new(&config);
    statistics.compute_character_statistics(&mut doc);
    statistics.compute_word_statistics(&mut doc);
    statistics.compute_line_statistics(&mut doc);
    let second = (
        doc.most_freq_font_size,
        doc.avg_char_width,
        doc.most_freq_word_distance,
        doc.most_freq_line_distance,
    );
    assert_eq!(first, second);
}
