pub mod decoder;
pub mod loader;
pub mod orchestrator;
pub mod pipeline;
pub mod segmenter;
pub mod store;

pub use decoder::TextDecoder;
pub use loader::DocumentLoader;
pub use orchestrator::{AutoConfirm, Confirm, ImportOrchestrator};
pub use pipeline::ManuscriptPipeline;
pub use segmenter::ChapterSegmenter;
pub use store::{ChapterStore, HttpChapterStore};
