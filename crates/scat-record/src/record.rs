//! The five-section analysis record

use crate::error::RecordError;
use crate::hash::{HashInto, RecordHash};
use crate::section::{EvaluationSection, SectionKey, SectionValue, SelectionSection};
use serde::{Deserialize, Serialize};

/// One incident investigation: five stages in wizard order
///
/// Fields are read through accessors; mutation goes through
/// [`crate::AnalysisRecordStore`] so the store's hashes stay current.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisRecord {
    evaluation: EvaluationSection,
    contact: SelectionSection,
    immediate_causes: SelectionSection,
    basic_causes: SelectionSection,
    control_needs: SelectionSection,
}

impl AnalysisRecord {
    /// Create an empty record
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: replace one section
    ///
    /// # Errors
    /// Same rules as [`crate::AnalysisRecordStore::replace_section`]
    pub fn with_section(
        mut self,
        key: SectionKey,
        value: impl Into<SectionValue>,
    ) -> Result<Self, RecordError> {
        self.set_section(key, value.into())?;
        Ok(self)
    }

    /// Evaluation stage
    #[inline]
    #[must_use]
    pub fn evaluation(&self) -> &EvaluationSection {
        &self.evaluation
    }

    /// Contact stage
    #[inline]
    #[must_use]
    pub fn contact(&self) -> &SelectionSection {
        &self.contact
    }

    /// Immediate causes stage
    #[inline]
    #[must_use]
    pub fn immediate_causes(&self) -> &SelectionSection {
        &self.immediate_causes
    }

    /// Basic causes stage
    #[inline]
    #[must_use]
    pub fn basic_causes(&self) -> &SelectionSection {
        &self.basic_causes
    }

    /// Control needs stage
    #[inline]
    #[must_use]
    pub fn control_needs(&self) -> &SelectionSection {
        &self.control_needs
    }

    /// Selection stage by key (`None` for Evaluation)
    #[must_use]
    pub fn selection(&self, key: SectionKey) -> Option<&SelectionSection> {
        match key {
            SectionKey::Evaluation => None,
            SectionKey::Contact => Some(&self.contact),
            SectionKey::ImmediateCauses => Some(&self.immediate_causes),
            SectionKey::BasicCauses => Some(&self.basic_causes),
            SectionKey::ControlNeeds => Some(&self.control_needs),
        }
    }

    pub(crate) fn selection_mut(
        &mut self,
        key: SectionKey,
    ) -> Result<&mut SelectionSection, RecordError> {
        match key {
            SectionKey::Evaluation => Err(RecordError::NotASelectionSection(key)),
            SectionKey::Contact => Ok(&mut self.contact),
            SectionKey::ImmediateCauses => Ok(&mut self.immediate_causes),
            SectionKey::BasicCauses => Ok(&mut self.basic_causes),
            SectionKey::ControlNeeds => Ok(&mut self.control_needs),
        }
    }

    pub(crate) fn set_section(
        &mut self,
        key: SectionKey,
        value: SectionValue,
    ) -> Result<(), RecordError> {
        match (key, value) {
            (SectionKey::Evaluation, SectionValue::Evaluation(evaluation)) => {
                self.evaluation = evaluation;
                Ok(())
            }
            (SectionKey::Evaluation, SectionValue::Selection(_)) => {
                Err(RecordError::SectionKindMismatch {
                    key,
                    given: "selection",
                })
            }
            (_, SectionValue::Evaluation(_)) => Err(RecordError::SectionKindMismatch {
                key,
                given: "evaluation",
            }),
            (_, SectionValue::Selection(selection)) => {
                if !key.allows_tags() && selection.has_tags() {
                    return Err(RecordError::TagsNotAllowed(key));
                }
                *self.selection_mut(key)? = selection;
                Ok(())
            }
        }
    }

    /// Hash of one section
    #[must_use]
    pub fn section_hash(&self, key: SectionKey) -> RecordHash {
        match self.selection(key) {
            Some(selection) => RecordHash::of(selection),
            None => RecordHash::of(&self.evaluation),
        }
    }

    /// Full hash computed from scratch
    ///
    /// Always equal to the rolling hash the store maintains for the same
    /// content.
    #[must_use]
    pub fn content_hash(&self) -> RecordHash {
        let parts = SectionKey::ALL.map(|key| self.section_hash(key));
        RecordHash::combine(&parts)
    }

    /// Per-stage completion summary
    #[must_use]
    pub fn progress(&self) -> RecordProgress {
        let stages = SectionKey::ALL.map(|key| StageProgress {
            key,
            complete: match self.selection(key) {
                Some(selection) => !selection.is_empty(),
                None => self.evaluation.is_complete(),
            },
        });
        RecordProgress { stages }
    }
}

/// Completion of one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    /// Stage
    pub key: SectionKey,
    /// Evaluation: all ratings set; selection stages: at least one item
    pub complete: bool,
}

/// Completion summary of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordProgress {
    /// Stages in wizard order
    pub stages: [StageProgress; 5],
}

impl RecordProgress {
    /// Number of complete stages
    #[must_use]
    pub fn completed(&self) -> usize {
        self.stages.iter().filter(|s| s.complete).count()
    }

    /// Overall completion, 0..=100
    #[must_use]
    pub fn percent(&self) -> u8 {
        // At most 5 stages, so the quotient always fits in a u8.
        u8::try_from(self.completed() * 100 / self.stages.len()).unwrap_or(100)
    }

    /// Whether every stage is complete
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed() == self.stages.len()
    }
}
