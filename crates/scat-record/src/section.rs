//! Record sections
//!
//! - [`EvaluationSection`]: potential-loss ratings
//! - [`SelectionSection`]: catalog selections with per-item detail
//!
//! A [`SelectionSection`] stores only the detail map and derives the selected
//! set from its keys, so the two can never drift apart.

use crate::detail::{is_empty_detail, ItemDetail};
use crate::error::RecordError;
use crate::hash::{HashInto, RecordHasher};
use crate::ids::{BlobRef, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The five stages of a SCAT analysis, in wizard order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionKey {
    /// Potential loss if not controlled
    Evaluation,
    /// Type of contact with energy or substance
    Contact,
    /// Immediate (direct) causes: substandard acts and conditions
    ImmediateCauses,
    /// Basic (underlying) causes: personal and job factors
    BasicCauses,
    /// Control action needs
    ControlNeeds,
}

impl SectionKey {
    /// All sections in wizard order
    pub const ALL: [SectionKey; 5] = [
        SectionKey::Evaluation,
        SectionKey::Contact,
        SectionKey::ImmediateCauses,
        SectionKey::BasicCauses,
        SectionKey::ControlNeeds,
    ];

    /// Position in [`SectionKey::ALL`]
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            SectionKey::Evaluation => 0,
            SectionKey::Contact => 1,
            SectionKey::ImmediateCauses => 2,
            SectionKey::BasicCauses => 3,
            SectionKey::ControlNeeds => 4,
        }
    }

    /// Whether this stage is a catalog selection
    #[inline]
    #[must_use]
    pub const fn is_selection(self) -> bool {
        !matches!(self, SectionKey::Evaluation)
    }

    /// Whether items in this stage may carry P/E/C tags
    #[inline]
    #[must_use]
    pub const fn allows_tags(self) -> bool {
        matches!(self, SectionKey::ControlNeeds)
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SectionKey::Evaluation => "evaluation",
            SectionKey::Contact => "contact",
            SectionKey::ImmediateCauses => "immediate-causes",
            SectionKey::BasicCauses => "basic-causes",
            SectionKey::ControlNeeds => "control-needs",
        };
        f.write_str(name)
    }
}

/// A/B/C rating used by the evaluation stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rating {
    /// Major / high / large
    A,
    /// Serious / moderate
    B,
    /// Minor / rare / low
    C,
}

impl Rating {
    #[inline]
    const fn code(self) -> u8 {
        match self {
            Rating::A => b'A',
            Rating::B => b'B',
            Rating::C => b'C',
        }
    }
}

/// Potential loss evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluationSection {
    /// Loss severity
    pub severity: Option<Rating>,
    /// Probability of recurrence
    pub probability: Option<Rating>,
    /// Exposure frequency
    pub frequency: Option<Rating>,
    /// Free-text observation
    pub observation: String,
}

impl EvaluationSection {
    /// True once all three ratings are set
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.severity.is_some() && self.probability.is_some() && self.frequency.is_some()
    }
}

impl HashInto for EvaluationSection {
    fn hash_into(&self, hasher: &mut RecordHasher) {
        for rating in [self.severity, self.probability, self.frequency] {
            hasher.byte(rating.map_or(0, Rating::code));
        }
        hasher.str(&self.observation);
    }
}

/// Catalog selections of one stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SelectionSectionRepr", into = "SelectionSectionRepr")]
pub struct SelectionSection {
    details: BTreeMap<ItemId, ItemDetail>,
    image: Option<BlobRef>,
    observation: String,
}

impl SelectionSection {
    /// Create an empty section
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain selection: every id selected with an empty detail
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = ItemId>) -> Self {
        Self {
            details: ids.into_iter().map(|id| (id, ItemDetail::new())).collect(),
            ..Self::default()
        }
    }

    /// Select an item with the given detail
    #[must_use]
    pub fn with_item(mut self, id: ItemId, detail: ItemDetail) -> Self {
        self.details.insert(id, detail.normalized());
        self
    }

    /// Set the section image
    #[must_use]
    pub fn with_image(mut self, image: BlobRef) -> Self {
        self.image = Some(image);
        self
    }

    /// Set the section observation
    #[must_use]
    pub fn with_observation(mut self, observation: impl Into<String>) -> Self {
        self.observation = observation.into();
        self
    }

    /// Selected item ids in ascending order
    pub fn selected_item_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.details.keys().copied()
    }

    /// Selected item ids as a set
    #[must_use]
    pub fn selected_set(&self) -> BTreeSet<ItemId> {
        self.details.keys().copied().collect()
    }

    /// Whether an item is selected
    #[inline]
    #[must_use]
    pub fn is_selected(&self, id: ItemId) -> bool {
        self.details.contains_key(&id)
    }

    /// Detail of a selected item
    #[inline]
    #[must_use]
    pub fn detail(&self, id: ItemId) -> Option<&ItemDetail> {
        self.details.get(&id)
    }

    /// Iterate `(id, detail)` pairs in id order
    pub fn details(&self) -> impl Iterator<Item = (ItemId, &ItemDetail)> + '_ {
        self.details.iter().map(|(id, d)| (*id, d))
    }

    /// Number of selected items
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.details.len()
    }

    /// True if nothing is selected
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    /// Section image
    #[inline]
    #[must_use]
    pub fn image(&self) -> Option<&BlobRef> {
        self.image.as_ref()
    }

    /// Section observation
    #[inline]
    #[must_use]
    pub fn observation(&self) -> &str {
        &self.observation
    }

    /// True if the section holds no selections, image or observation
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.details.is_empty() || self.image.is_some() || !self.observation.trim().is_empty()
    }

    /// True if any item carries P/E/C tags
    #[must_use]
    pub fn has_tags(&self) -> bool {
        self.details.values().any(ItemDetail::has_tags)
    }

    /// Insert or remove according to the empty-detail rule
    ///
    /// Returns the previous detail, if any.
    pub(crate) fn apply(&mut self, id: ItemId, detail: ItemDetail) -> Option<ItemDetail> {
        if is_empty_detail(&detail) {
            self.details.remove(&id)
        } else {
            self.details.insert(id, detail.normalized())
        }
    }

    pub(crate) fn set_image(&mut self, image: Option<BlobRef>) {
        self.image = image;
    }

    pub(crate) fn set_observation(&mut self, observation: String) {
        self.observation = observation;
    }
}

impl HashInto for SelectionSection {
    fn hash_into(&self, hasher: &mut RecordHasher) {
        hasher.u64(self.details.len() as u64);
        for (id, detail) in &self.details {
            hasher.u32(id.get());
            detail.hash_into(hasher);
        }
        hasher
            .opt_str(self.image.as_ref().map(BlobRef::as_str))
            .str(&self.observation);
    }
}

/// Wire form: both the selected set and the detail map, as persisted
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SelectionSectionRepr {
    selected_item_ids: BTreeSet<ItemId>,
    detail_by_item: BTreeMap<ItemId, ItemDetail>,
    image: Option<BlobRef>,
    observation: String,
}

impl TryFrom<SelectionSectionRepr> for SelectionSection {
    type Error = RecordError;

    fn try_from(repr: SelectionSectionRepr) -> Result<Self, Self::Error> {
        let detail_keys: BTreeSet<ItemId> = repr.detail_by_item.keys().copied().collect();
        if detail_keys != repr.selected_item_ids {
            return Err(RecordError::SelectionOutOfSync {
                without_detail: repr
                    .selected_item_ids
                    .difference(&detail_keys)
                    .copied()
                    .collect(),
                unselected_detail: detail_keys
                    .difference(&repr.selected_item_ids)
                    .copied()
                    .collect(),
            });
        }
        Ok(Self {
            details: repr
                .detail_by_item
                .into_iter()
                .map(|(id, d)| (id, d.normalized()))
                .collect(),
            image: repr.image,
            observation: repr.observation,
        })
    }
}

impl From<SelectionSection> for SelectionSectionRepr {
    fn from(section: SelectionSection) -> Self {
        Self {
            selected_item_ids: section.details.keys().copied().collect(),
            detail_by_item: section.details,
            image: section.image,
            observation: section.observation,
        }
    }
}

/// Replacement value for [`crate::AnalysisRecordStore::replace_section`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionValue {
    /// Value for [`SectionKey::Evaluation`]
    Evaluation(EvaluationSection),
    /// Value for any selection stage
    Selection(SelectionSection),
}

impl From<EvaluationSection> for SectionValue {
    fn from(value: EvaluationSection) -> Self {
        Self::Evaluation(value)
    }
}

impl From<SelectionSection> for SectionValue {
    fn from(value: SelectionSection) -> Self {
        Self::Selection(value)
    }
}
