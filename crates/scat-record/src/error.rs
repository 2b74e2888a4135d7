//! Error types for the record model and store

use crate::ids::ItemId;
use crate::section::SectionKey;

/// Record store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// Item-level operation on a section without catalog items
    #[error("section {0} has no selectable items")]
    NotASelectionSection(SectionKey),

    /// Replacement value does not match the section kind
    #[error("section {key} cannot be replaced with a {given} value")]
    SectionKindMismatch {
        /// Target section
        key: SectionKey,
        /// Kind of the value supplied
        given: &'static str,
    },

    /// P/E/C tags supplied outside ControlNeeds
    #[error("section {0} does not accept P/E/C tags")]
    TagsNotAllowed(SectionKey),

    /// Persisted selection whose selected set and detail map disagree
    #[error(
        "selection out of sync: selected without detail {without_detail:?}, detail without selection {unselected_detail:?}"
    )]
    SelectionOutOfSync {
        /// Ids listed as selected but lacking a detail entry
        without_detail: Vec<ItemId>,
        /// Ids with a detail entry but not listed as selected
        unselected_detail: Vec<ItemId>,
    },
}
