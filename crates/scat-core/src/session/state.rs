//! Session status machine

use crate::error::SessionError;
use scat_record::{ProjectId, RecordHash};
use serde::Serialize;
use std::fmt;

/// Editing session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    /// No project open
    Idle,
    /// Fetching the project from the gateway
    Loading,
    /// Project open for edits
    Editing,
    /// A save is in flight
    Saving,
    /// A save just succeeded (pulse before returning to Editing)
    Saved,
    /// The last load or save failed
    Error,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Editing => "editing",
            Self::Saving => "saving",
            Self::Saved => "saved",
            Self::Error => "error",
        })
    }
}

/// Validates a status transition
///
/// # Errors
/// [`SessionError::IllegalTransition`] for pairs outside the table
pub fn validate_transition(from: SessionStatus, to: SessionStatus) -> Result<(), SessionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(SessionError::IllegalTransition { from, to })
    }
}

/// Statuses reachable in one step from `from`
#[must_use]
pub fn allowed_transitions(from: SessionStatus) -> &'static [SessionStatus] {
    use SessionStatus::*;
    match from {
        Idle => &[Loading],
        Loading => &[Editing, Error, Idle],
        Editing => &[Saving, Idle],
        Saving => &[Saved, Error],
        Saved => &[Editing],
        Error => &[Loading, Saving, Editing, Idle],
    }
}

/// Which step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// Loading the project
    Load,
    /// Saving the record
    Save,
}

/// Last failure recorded by the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    /// Failed step
    pub kind: FailureKind,
    /// Human-readable cause
    pub message: String,
    /// Whether retrying may help
    pub retryable: bool,
}

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditingSessionInfo {
    /// Project being edited
    pub project_id: Option<ProjectId>,
    /// Current status
    pub current_status: SessionStatus,
    /// Hash of the last record the gateway acknowledged
    pub last_synced_hash: Option<RecordHash>,
    /// Last failure, cleared by the next success
    pub error_info: Option<ErrorInfo>,
    /// Whether the store differs from the last synced record
    pub has_unsaved_changes: bool,
}

/// What caused a save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveTrigger {
    /// `save_now`
    Explicit,
    /// Autosave tick
    Autosave,
    /// `retry` after a failed save
    Retry,
    /// Final flush in `stop_editing`
    Stop,
}

/// Result of a save request that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The gateway acknowledged a record with this hash
    Saved(RecordHash),
    /// Nothing changed since the last sync
    Clean,
    /// Another save is already in flight; nothing was sent
    InFlight,
}

/// Notifications published by a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Status moved
    StatusChanged {
        /// Previous status
        from: SessionStatus,
        /// New status
        to: SessionStatus,
    },
    /// Project loaded into the store
    Loaded {
        /// Project id
        project_id: ProjectId,
        /// Hash of the loaded record
        hash: RecordHash,
    },
    /// Load failed
    LoadFailed {
        /// Project id
        project_id: ProjectId,
        /// Failure description
        message: String,
    },
    /// Save acknowledged
    Saved {
        /// Project id
        project_id: ProjectId,
        /// Hash of the record that was sent
        hash: RecordHash,
        /// Why the save ran
        trigger: SaveTrigger,
    },
    /// Save failed
    SaveFailed {
        /// Project id
        project_id: ProjectId,
        /// Failure description
        message: String,
        /// Why the save ran
        trigger: SaveTrigger,
    },
    /// Session returned to Idle
    Stopped {
        /// Project that was open
        project_id: Option<ProjectId>,
        /// Whether unsaved edits were dropped
        discarded: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionStatus::*;

    const ALL: [SessionStatus; 6] = [Idle, Loading, Editing, Saving, Saved, Error];

    #[test]
    fn table_matches_lifecycle() {
        assert!(validate_transition(Idle, Loading).is_ok());
        assert!(validate_transition(Loading, Editing).is_ok());
        assert!(validate_transition(Editing, Saving).is_ok());
        assert!(validate_transition(Saving, Saved).is_ok());
        assert!(validate_transition(Saved, Editing).is_ok());
        assert!(validate_transition(Error, Saving).is_ok());
    }

    #[test]
    fn saving_is_never_reentered() {
        for from in ALL {
            if from == Saving {
                assert!(validate_transition(from, Saving).is_err());
            }
        }
        assert!(validate_transition(Saved, Saving).is_err());
    }

    #[test]
    fn no_self_transitions() {
        for status in ALL {
            assert!(matches!(
                validate_transition(status, status),
                Err(SessionError::IllegalTransition { .. })
            ));
        }
    }

    #[test]
    fn idle_only_reachable_from_stoppable_states() {
        let sources: Vec<_> = ALL
            .into_iter()
            .filter(|s| allowed_transitions(*s).contains(&Idle))
            .collect();
        assert_eq!(sources, vec![Loading, Editing, Error]);
    }
}
