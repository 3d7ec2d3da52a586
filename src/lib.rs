//! # Plain-text Manuscript Import
//!
//! Turns an uploaded `.txt` manuscript of unknown encoding into a book title
//! and numbered chapters, then reconciles those chapters with a remote
//! content API.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use txt_import::{
//!     ApiConfig, AutoConfirm, ChapterStore, DocumentLoader, HttpChapterStore, ImportConfig,
//!     ImportOrchestrator, ManuscriptPipeline,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load and segment
//!     let document = DocumentLoader::load("novel.txt").await?;
//!     let segmentation = ManuscriptPipeline::default().prepare(document)?;
//!
//!     // Reconcile with the book's current chapters
//!     let store = HttpChapterStore::new(ApiConfig::new("http://localhost:3000")?)?;
//!     let existing = store.list_chapters(7).await?;
//!     let config = ImportConfig {
//!         book_id: 7,
//!         current_title: None,
//!         credential: None,
//!     };
//!
//!     let mut orchestrator = ImportOrchestrator::new(store);
//!     let outcome = orchestrator
//!         .run(segmentation, &existing, &config, &AutoConfirm(true))
//!         .await?;
//!
//!     println!("{}", outcome);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod services;
pub mod types;

// Re-export main types and services for easier usage
pub use config::{ApiConfig, ImportConfig, SegmenterConfig};
pub use error::{ImportError, RemoteError, Result};
pub use services::{
    AutoConfirm, ChapterSegmenter, ChapterStore, Confirm, DocumentLoader, HttpChapterStore,
    ImportOrchestrator, ManuscriptPipeline, TextDecoder,
};
pub use types::{
    AbortReason, ChapterDraft, ContentData, Credential, DecodedText, ExistingChapter,
    ImportDecision, ImportOutcome, ImportState, RawDocument, ReplaceFailure, ReplaceStep,
    SegmentationResult, StagedDraft,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_workflow() {
        let content = "《远方的船》\n\
                       \n\
                       第一章 启航\n\
                       风从海上来。\n\
                       \n\
                       第二章 归来\n\
                       船回到了港口。";

        let document = RawDocument::new("ship.txt", content.as_bytes().to_vec());
        let segmentation = ManuscriptPipeline::default().prepare(document).unwrap();

        assert_eq!(segmentation.detected_title.as_deref(), Some("远方的船"));
        assert_eq!(segmentation.chapters.len(), 2);

        match ImportOrchestrator::<HttpChapterStore>::decide(segmentation, None) {
            ImportDecision::ReplaceAll(drafts) => {
                let numbers: Vec<u32> = drafts.iter().map(|d| d.chapter_number).collect();
                assert_eq!(numbers, vec![1, 2]);
                assert_eq!(drafts[0].content_data.text, "风从海上来。");
            }
            other => panic!("expected a full replace, got {:?}", other),
        }
    }

    #[test]
    fn test_draft_wire_shape() {
        let draft = ChapterDraft::new(3, "第三章", "正文");
        let value = serde_json::to_value(&draft).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "chapter_number": 3,
                "title": "第三章",
                "content_data": { "text": "正文" },
                "metadata": {}
            })
        );
    }

    #[test]
    fn test_credential_is_not_printed() {
        let credential = Credential::new("hunter2").unwrap();
        assert_eq!(format!("{:?}", credential), "Credential(***)");
        assert!(Credential::new("   ").is_none());
    }
}
