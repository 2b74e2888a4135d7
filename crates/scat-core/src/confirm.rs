//! User confirmation seam

use scat_record::ProjectId;
use std::fmt;

/// Question put to the user before an irreversible step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationRequest {
    /// Remove one trashed project for good
    PermanentDelete {
        /// Project id
        project_id: ProjectId,
        /// Display name
        name: String,
    },
    /// Remove every trashed project for good
    EmptyTrash {
        /// Number of projects in the trash
        count: usize,
    },
    /// Leave the editor with unsaved edits
    DiscardUnsavedChanges {
        /// Project being edited
        project_id: ProjectId,
    },
}

impl fmt::Display for ConfirmationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermanentDelete { name, .. } => {
                write!(f, "Permanently delete \"{name}\"? This cannot be undone.")
            }
            Self::EmptyTrash { count } => {
                write!(f, "Permanently delete all {count} projects in the trash?")
            }
            Self::DiscardUnsavedChanges { .. } => {
                write!(f, "There are unsaved changes. Leave anyway?")
            }
        }
    }
}

/// Asks the user to approve a request
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Confirmation: Send + Sync {
    /// `true` if the user approved
    async fn confirm(&self, request: ConfirmationRequest) -> bool;
}

/// Confirmation with a fixed answer (`--yes` on the command line)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedConfirmation(pub bool);

#[async_trait::async_trait]
impl Confirmation for FixedConfirmation {
    async fn confirm(&self, request: ConfirmationRequest) -> bool {
        tracing::debug!(%request, answer = self.0, "fixed confirmation");
        self.0
    }
}

/// Result of an operation guarded by a confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Confirmed and applied to this many projects
    Applied(usize),
    /// The user said no; nothing changed
    Declined,
    /// Nothing to do; no question was asked
    NoOp,
}

impl Outcome {
    /// Whether anything changed
    #[inline]
    #[must_use]
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied(_))
    }
}
