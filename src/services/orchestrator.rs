use crate::config::ImportConfig;
use crate::error::{ImportError, Result};
use crate::services::store::ChapterStore;
use crate::types::{
    AbortReason, ChapterDraft, Credential, ExistingChapter, ImportDecision, ImportOutcome,
    ImportState, ReplaceFailure, ReplaceStep, SegmentationResult,
};
use tracing::{debug, error, info, warn};

/// Operator gate in front of the destructive replace.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Answers every prompt the same way.
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        debug!("Auto-answering {:?} to: {}", self.0, prompt);
        self.0
    }
}

pub fn confirmation_prompt(book_id: i64, detected: usize, existing: usize) -> String {
    format!(
        "Detected {} chapters. This will permanently delete all {} existing chapters of book {} \
         and create the {} detected chapters in their place. This cannot be undone. Continue?",
        detected, existing, book_id, detected
    )
}

/// Reconciles a segmented manuscript with a book's chapters.
///
/// One import action runs at a time per orchestrator; `run` borrows it mutably
/// for the whole action.
pub struct ImportOrchestrator<S> {
    store: S,
    state: ImportState,
}

impl<S: ChapterStore> ImportOrchestrator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            state: ImportState::Idle,
        }
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Single chapter results are staged; anything longer replaces the book.
    pub fn decide(segmentation: SegmentationResult, current_title: Option<&str>) -> ImportDecision {
        let has_title = current_title.map_or(false, |t| !t.trim().is_empty());
        let mut chapters = segmentation.chapters;

        if chapters.len() <= 1 {
            let draft = chapters
                .pop()
                .unwrap_or_else(|| ChapterDraft::new(1, "第1章", ""));
            let proposed_title = if has_title {
                None
            } else {
                segmentation.detected_title
            };
            ImportDecision::StageSingle {
                draft,
                proposed_title,
            }
        } else {
            ImportDecision::ReplaceAll(chapters)
        }
    }

    /// Drives one import action to a terminal state.
    ///
    /// `existing` is the chapter list the caller currently shows for the book.
    /// Returns `Err` only for `EmptyDocument`; every other ending, including a
    /// half-finished replace, is an `ImportOutcome`.
    pub async fn run(
        &mut self,
        segmentation: SegmentationResult,
        existing: &[ExistingChapter],
        config: &ImportConfig,
        confirm: &dyn Confirm,
    ) -> Result<ImportOutcome> {
        self.state = ImportState::Idle;

        if segmentation.chapters.is_empty() {
            return Err(ImportError::EmptyDocument {
                name: segmentation
                    .detected_title
                    .unwrap_or_else(|| "document".to_string()),
            });
        }
        self.state = ImportState::Segmented;

        let drafts = match Self::decide(segmentation, config.current_title.as_deref()) {
            ImportDecision::StageSingle {
                draft,
                proposed_title,
            } => {
                info!("Staging single chapter \"{}\" for manual save", draft.title);
                self.state = ImportState::Staged;
                return Ok(ImportOutcome::Staged {
                    draft,
                    proposed_title,
                });
            }
            ImportDecision::ReplaceAll(drafts) => drafts,
        };

        self.state = ImportState::AwaitingConfirmation;
        let prompt = confirmation_prompt(config.book_id, drafts.len(), existing.len());
        if !confirm.confirm(&prompt) {
            info!("Operator declined replacing book {}", config.book_id);
            return Ok(self.finish(ImportOutcome::Aborted(AbortReason::ConfirmationDeclined)));
        }

        if !existing.is_empty() && config.credential.is_none() {
            warn!(
                "Refusing to delete {} chapters of book {} without a credential",
                existing.len(),
                config.book_id
            );
            return Ok(self.finish(ImportOutcome::Aborted(AbortReason::MissingCredential)));
        }

        self.state = ImportState::Replacing;
        let outcome = self
            .replace_all(config.book_id, existing, &drafts, config.credential.as_ref())
            .await;
        Ok(self.finish(outcome))
    }

    fn finish(&mut self, outcome: ImportOutcome) -> ImportOutcome {
        self.state = outcome.state();
        debug_assert!(self.state.is_terminal());
        outcome
    }

    /// Deletes every existing chapter, then creates every draft. Stops at the
    /// first failure and leaves the store as the completed steps left it.
    ///
    /// `credential` must be present whenever `existing` is non-empty.
    async fn replace_all(
        &self,
        book_id: i64,
        existing: &[ExistingChapter],
        drafts: &[ChapterDraft],
        credential: Option<&Credential>,
    ) -> ImportOutcome {
        let to_delete = existing.len();
        let to_create = drafts.len();
        let partial = |step, index, deleted, created, error| {
            ImportOutcome::PartiallyFailed(ReplaceFailure {
                step,
                index,
                deleted,
                created,
                to_delete,
                to_create,
                error,
            })
        };

        info!(
            "Replacing {} chapters of book {} with {} new chapters",
            to_delete, book_id, to_create
        );

        let mut deleted = 0;
        if let Some(credential) = credential {
            for (index, chapter) in existing.iter().enumerate() {
                if let Err(e) = self
                    .store
                    .delete_chapter(book_id, chapter.id, credential)
                    .await
                {
                    error!("Deleting chapter {} (id {}) failed: {}", chapter.chapter_number, chapter.id, e);
                    return partial(ReplaceStep::Delete, index, deleted, 0, e);
                }
                deleted += 1;
                debug!("Deleted chapter {}/{} (id {})", deleted, to_delete, chapter.id);
            }
        }

        let mut ordered: Vec<&ChapterDraft> = drafts.iter().collect();
        ordered.sort_by_key(|draft| draft.chapter_number);

        let mut created = 0;
        for (index, draft) in ordered.into_iter().enumerate() {
            if let Err(e) = self.store.create_chapter(book_id, draft).await {
                error!("Creating chapter {} \"{}\" failed: {}", draft.chapter_number, draft.title, e);
                return partial(ReplaceStep::Create, index, deleted, created, e);
            }
            created += 1;
            debug!("Created chapter {}/{}: {}", created, to_create, draft.title);
        }

        info!("Book {} now has {} chapters", book_id, created);
        ImportOutcome::Completed { deleted, created }
    }
}
