use crate::error::RemoteError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Uploaded bytes plus the name they arrived under.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl RawDocument {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// File name without directory or extension.
    pub fn stem(&self) -> &str {
        file_stem(&self.file_name)
    }
}

pub(crate) fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    /// Name of the encoding that won, e.g. "UTF-8" or "GBK".
    pub encoding: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentData {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterDraft {
    pub chapter_number: u32,
    pub title: String,
    pub content_data: ContentData,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ChapterDraft {
    pub fn new(chapter_number: u32, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chapter_number,
            title: title.into(),
            content_data: ContentData { text: text.into() },
            metadata: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationResult {
    pub detected_title: Option<String>,
    pub chapters: Vec<ChapterDraft>,
}

/// A chapter as the content API returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingChapter {
    pub id: i64,
    pub chapter_number: u32,
    pub title: String,
    #[serde(default)]
    pub content_data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<i64>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Admin credential required for destructive calls. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for blank input.
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            None
        } else {
            Some(Self(secret))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportDecision {
    StageSingle {
        draft: ChapterDraft,
        /// Book title to suggest when the caller has none yet.
        proposed_title: Option<String>,
    },
    ReplaceAll(Vec<ChapterDraft>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    Idle,
    Segmented,
    Staged,
    AwaitingConfirmation,
    Aborted,
    Replacing,
    Completed,
    PartiallyFailed,
}

impl ImportState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Staged | Self::Aborted | Self::Completed | Self::PartiallyFailed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    ConfirmationDeclined,
    MissingCredential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplaceStep {
    Delete,
    Create,
}

impl fmt::Display for ReplaceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete => f.write_str("delete"),
            Self::Create => f.write_str("create"),
        }
    }
}

/// Where a replace-all stopped and what it had already done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceFailure {
    pub step: ReplaceStep,
    /// Zero-based position within the failing step's sequence.
    pub index: usize,
    pub deleted: usize,
    pub created: usize,
    pub to_delete: usize,
    pub to_create: usize,
    pub error: RemoteError,
}

/// Terminal state of one import action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Staged {
        draft: ChapterDraft,
        proposed_title: Option<String>,
    },
    Aborted(AbortReason),
    Completed {
        deleted: usize,
        created: usize,
    },
    PartiallyFailed(ReplaceFailure),
}

impl ImportOutcome {
    pub fn state(&self) -> ImportState {
        match self {
            Self::Staged { .. } => ImportState::Staged,
            Self::Aborted(_) => ImportState::Aborted,
            Self::Completed { .. } => ImportState::Completed,
            Self::PartiallyFailed(_) => ImportState::PartiallyFailed,
        }
    }
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Staged { draft, .. } => write!(
                f,
                "Staged chapter {} \"{}\" ({} characters) for review; nothing was written yet, save it explicitly",
                draft.chapter_number,
                draft.title,
                draft.content_data.text.chars().count()
            ),
            Self::Aborted(AbortReason::ConfirmationDeclined) => {
                write!(f, "Import cancelled; no chapters were changed")
            }
            Self::Aborted(AbortReason::MissingCredential) => write!(
                f,
                "Import aborted: replacing existing chapters requires the admin password; no chapters were changed"
            ),
            Self::Completed { deleted, created } => write!(
                f,
                "Import complete: removed {} old chapters and created {} new chapters",
                deleted, created
            ),
            Self::PartiallyFailed(failure) => write!(
                f,
                "Import stopped partway while trying to {} item #{}: {}. {} of {} old chapters were already deleted and {} of {} new chapters were already created; the book must be repaired by hand",
                failure.step,
                failure.index + 1,
                failure.error,
                failure.deleted,
                failure.to_delete,
                failure.created,
                failure.to_create
            ),
        }
    }
}

/// A single-chapter import waiting for an explicit save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedDraft {
    pub source: String,
    pub book_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_title: Option<String>,
    pub draft: ChapterDraft,
    pub staged_at: DateTime<Utc>,
}
