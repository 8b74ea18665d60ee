//! The extraction pipeline.
//!
//! Runs the layout-analysis stages in their fixed order over one document.
//! Every stage fully completes before the next begins; the pipeline is
//! single-threaded and deterministic per document.

use log::info;

use crate::config::Config;
use crate::error::Result;
use crate::layout::{PageSegmenter, ReadingOrderDetector, TextBlockDetector, TextLineDetector};
use crate::ml::SemanticRoleClassifier;
use crate::model::Document;
use crate::statistics::StatisticsCalculator;
use crate::text::dehyphenation::Dehyphenator;
use crate::text::diacritics::DiacriticMerger;
use crate::text::sub_superscripts::SubSuperscriptDetector;
use crate::text::words::WordFormer;

/// Orchestrates the pipeline stages over a document.
pub struct Pipeline<'a> {
    config: &'a Config,
    detect_sub_superscripts: bool,
    dehyphenate_words: bool,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline with all optional stages enabled.
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            detect_sub_superscripts: true,
            dehyphenate_words: true,
        }
    }

    /// Enable or disable sub/superscript detection.
    pub fn with_sub_superscripts_detection(mut self, enable: bool) -> Self {
        self.detect_sub_superscripts = enable;
        self
    }

    /// Enable or disable word dehyphenation.
    pub fn with_words_dehyphenation(mut self, enable: bool) -> Self {
        self.dehyphenate_words = enable;
        self
    }

    /// Run the pipeline without semantic-role classification; every block
    /// keeps the default role.
    pub fn run(&self, doc: &mut Document) -> Result<()> {
        let mut classifier = SemanticRoleClassifier::disabled(self.config);
        self.run_with_classifier(doc, &mut classifier)
    }

    /// Run the pipeline, classifying block roles with the given
    /// classifier.
    pub fn run_with_classifier(
        &self,
        doc: &mut Document,
        classifier: &mut SemanticRoleClassifier<'_>,
    ) -> Result<()> {
        info!("merging diacritic marks");
        DiacriticMerger::new(self.config).merge(doc);

        info!("computing character statistics");
        let statistics = StatisticsCalculator::new(self.config);
        statistics.compute_character_statistics(doc);

        info!("forming words");
        WordFormer::new(self.config).process(doc);

        info!("computing word statistics");
        statistics.compute_word_statistics(doc);

        info!("segmenting pages");
        PageSegmenter::new(self.config).process(doc);

        info!("detecting text lines");
        TextLineDetector::new(self.config).process(doc);

        if self.detect_sub_superscripts {
            info!("detecting sub- and superscripts");
            SubSuperscriptDetector::new(self.config).process(doc);
        }

        info!("computing text line statistics");
        statistics.compute_line_statistics(doc);

        info!("detecting text blocks");
        TextBlockDetector::new(self.config).process(doc);

        info!("classifying semantic roles");
        classifier.classify(doc)?;

        info!("detecting reading order");
        ReadingOrderDetector::new(self.config).process(doc);

        if self.dehyphenate_words {
            info!("dehyphenating words");
            Dehyphenator::new().process(doc);
        }

        Ok(())
    }
}
