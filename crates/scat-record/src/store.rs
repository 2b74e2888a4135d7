//! Analysis record store
//!
//! The only path through which an [`AnalysisRecord`] is mutated. Every
//! mutation re-hashes just the touched section and recombines the five
//! cached section hashes, so [`AnalysisRecordStore::current_hash`] stays
//! O(1) regardless of record size.

use crate::detail::{is_empty_detail, ItemDetail};
use crate::error::RecordError;
use crate::hash::RecordHash;
use crate::ids::{BlobRef, ItemId};
use crate::record::AnalysisRecord;
use crate::section::{SectionKey, SectionValue};
use parking_lot::Mutex;
use std::sync::Arc;

/// What a commit did to the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Item was not selected and now is
    Selected,
    /// Item was selected and its detail changed
    Updated,
    /// Item was selected and the empty detail removed it
    Deselected,
    /// Nothing changed
    Unchanged,
}

/// Transient buffer of an opened item detail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDetail {
    /// Section being edited
    pub key: SectionKey,
    /// Item being edited
    pub item: ItemId,
    /// Detail as it was when opened
    pub original: ItemDetail,
}

/// Mutable holder of one analysis record
#[derive(Debug)]
pub struct AnalysisRecordStore {
    record: AnalysisRecord,
    section_hashes: [RecordHash; 5],
    current: RecordHash,
    pending: Option<PendingDetail>,
    revision: u64,
}

impl Default for AnalysisRecordStore {
    fn default() -> Self {
        Self::new(AnalysisRecord::default())
    }
}

impl AnalysisRecordStore {
    /// Create a store holding `record`
    #[must_use]
    pub fn new(record: AnalysisRecord) -> Self {
        let section_hashes = SectionKey::ALL.map(|key| record.section_hash(key));
        Self {
            current: RecordHash::combine(&section_hashes),
            record,
            section_hashes,
            pending: None,
            revision: 0,
        }
    }

    /// Current record
    #[inline]
    #[must_use]
    pub fn record(&self) -> &AnalysisRecord {
        &self.record
    }

    /// Rolling hash of the current record
    #[inline]
    #[must_use]
    pub fn current_hash(&self) -> RecordHash {
        self.current
    }

    /// Number of committed mutations since creation
    #[inline]
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Currently opened item detail, if any
    #[inline]
    #[must_use]
    pub fn pending(&self) -> Option<&PendingDetail> {
        self.pending.as_ref()
    }

    /// Replace the whole record (used when loading a saved project)
    ///
    /// Discards any opened item detail.
    pub fn load(&mut self, record: AnalysisRecord) {
        let revision = self.revision + 1;
        *self = Self::new(record);
        self.revision = revision;
    }

    /// Total replace of one section
    ///
    /// # Errors
    /// - [`RecordError::SectionKindMismatch`] if `value` does not fit `key`
    /// - [`RecordError::TagsNotAllowed`] for tagged items outside ControlNeeds
    pub fn replace_section(
        &mut self,
        key: SectionKey,
        value: impl Into<SectionValue>,
    ) -> Result<(), RecordError> {
        self.record.set_section(key, value.into())?;
        self.touch(key);
        Ok(())
    }

    /// Open an item for editing
    ///
    /// Returns the existing detail or a fresh empty one. The record is not
    /// modified.
    ///
    /// # Errors
    /// [`RecordError::NotASelectionSection`] for Evaluation
    pub fn open_item_detail(
        &mut self,
        key: SectionKey,
        item: ItemId,
    ) -> Result<ItemDetail, RecordError> {
        let section = self
            .record
            .selection(key)
            .ok_or(RecordError::NotASelectionSection(key))?;
        let detail = section.detail(item).cloned().unwrap_or_default();
        self.pending = Some(PendingDetail {
            key,
            item,
            original: detail.clone(),
        });
        Ok(detail)
    }

    /// Commit an edited detail
    ///
    /// An empty detail (see [`is_empty_detail`]) deselects the item; any
    /// other detail selects or updates it. Selection and detail change
    /// together. Clears the opened-detail buffer.
    ///
    /// # Errors
    /// - [`RecordError::NotASelectionSection`] for Evaluation
    /// - [`RecordError::TagsNotAllowed`] for tags outside ControlNeeds
    pub fn commit_item_detail(
        &mut self,
        key: SectionKey,
        item: ItemId,
        edited: ItemDetail,
    ) -> Result<CommitOutcome, RecordError> {
        if !key.allows_tags() && edited.has_tags() {
            return Err(RecordError::TagsNotAllowed(key));
        }
        let section = self.record.selection_mut(key)?;
        self.pending = None;

        let was_selected = section.is_selected(item);
        let empty = is_empty_detail(&edited);
        let outcome = match (was_selected, empty) {
            (false, true) => CommitOutcome::Unchanged,
            (true, true) => CommitOutcome::Deselected,
            (false, false) => CommitOutcome::Selected,
            (true, false) => {
                if section.detail(item) == Some(&edited.clone().normalized()) {
                    CommitOutcome::Unchanged
                } else {
                    CommitOutcome::Updated
                }
            }
        };
        if outcome != CommitOutcome::Unchanged {
            section.apply(item, edited);
            self.touch(key);
        }
        Ok(outcome)
    }

    /// Discard the opened item detail; the record is unchanged
    pub fn cancel_item_detail(&mut self) -> Option<PendingDetail> {
        self.pending.take()
    }

    /// Set the observation of a selection stage
    ///
    /// # Errors
    /// [`RecordError::NotASelectionSection`] for Evaluation
    pub fn set_section_observation(
        &mut self,
        key: SectionKey,
        observation: impl Into<String>,
    ) -> Result<(), RecordError> {
        self.record
            .selection_mut(key)?
            .set_observation(observation.into());
        self.touch(key);
        Ok(())
    }

    /// Set or clear the image of a selection stage
    ///
    /// # Errors
    /// [`RecordError::NotASelectionSection`] for Evaluation
    pub fn set_section_image(
        &mut self,
        key: SectionKey,
        image: Option<BlobRef>,
    ) -> Result<(), RecordError> {
        self.record.selection_mut(key)?.set_image(image);
        self.touch(key);
        Ok(())
    }

    fn touch(&mut self, key: SectionKey) {
        self.section_hashes[key.index()] = self.record.section_hash(key);
        self.current = RecordHash::combine(&self.section_hashes);
        self.revision += 1;
    }
}

/// Shared handle to a record store
///
/// Handed explicitly to every component that reads or edits the record.
/// Closures run under a short lock; never hold data borrowed from the store
/// across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct RecordHandle {
    inner: Arc<Mutex<AnalysisRecordStore>>,
}

impl RecordHandle {
    /// Wrap a store
    #[must_use]
    pub fn new(store: AnalysisRecordStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Run a read-only closure against the store
    pub fn read<R>(&self, f: impl FnOnce(&AnalysisRecordStore) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Run a mutating closure against the store
    pub fn write<R>(&self, f: impl FnOnce(&mut AnalysisRecordStore) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Rolling hash of the current record
    #[must_use]
    pub fn current_hash(&self) -> RecordHash {
        self.inner.lock().current_hash()
    }

    /// Clone of the record together with its hash, taken atomically
    #[must_use]
    pub fn snapshot(&self) -> (AnalysisRecord, RecordHash) {
        let store = self.inner.lock();
        (store.record().clone(), store.current_hash())
    }
}
