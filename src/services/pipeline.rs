use crate::error::{ImportError, Result};
use crate::services::decoder::TextDecoder;
use crate::services::segmenter::ChapterSegmenter;
use crate::types::{RawDocument, SegmentationResult};
use tracing::info;

/// Decoder followed by segmenter.
pub struct ManuscriptPipeline {
    decoder: TextDecoder,
    segmenter: ChapterSegmenter,
}

impl ManuscriptPipeline {
    pub fn new(decoder: TextDecoder, segmenter: ChapterSegmenter) -> Self {
        Self { decoder, segmenter }
    }

    pub fn segmenter(&self) -> &ChapterSegmenter {
        &self.segmenter
    }

    /// Consumes the raw document. Fails only when there is nothing to import.
    pub fn prepare(&self, document: RawDocument) -> Result<SegmentationResult> {
        let decoded = self.decoder.decode(&document.bytes);
        info!(
            "Decoded '{}' as {} ({} characters)",
            document.file_name,
            decoded.encoding,
            decoded.text.chars().count()
        );

        if decoded.text.trim().is_empty() {
            return Err(ImportError::EmptyDocument {
                name: document.file_name,
            });
        }

        let result = self
            .segmenter
            .segment(&decoded.text, Some(&document.file_name));
        if result.chapters.is_empty() {
            return Err(ImportError::EmptyDocument {
                name: document.file_name,
            });
        }

        Ok(result)
    }
}

impl Default for ManuscriptPipeline {
    fn default() -> Self {
        Self::new(TextDecoder::default(), ChapterSegmenter::default())
    }
}
