//! Per-item detail captured when a catalog entry is opened for editing

use crate::hash::{HashInto, RecordHasher};
use crate::ids::BlobRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Control-need classification tag
///
/// Only meaningful on ControlNeeds items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// Inadequate program
    P,
    /// Inadequate program standards
    E,
    /// Inadequate compliance with standards
    C,
}

impl Tag {
    /// All tags in canonical order
    pub const ALL: [Tag; 3] = [Tag::P, Tag::E, Tag::C];

    #[inline]
    const fn code(self) -> u8 {
        match self {
            Tag::P => b'P',
            Tag::E => b'E',
            Tag::C => b'C',
        }
    }
}

/// Edit state of one selected catalog item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemDetail {
    /// Indices into the catalog item's sub-option list
    pub selected_sub_option_indices: BTreeSet<u32>,
    /// P/E/C tags per sub-option (ControlNeeds only)
    pub tags_by_sub_option: BTreeMap<u32, BTreeSet<Tag>>,
    /// Evidence image
    pub image: Option<BlobRef>,
    /// Free-text comments
    pub comments: String,
}

impl ItemDetail {
    /// Create an empty detail
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a sub-option
    #[must_use]
    pub fn with_sub_option(mut self, index: u32) -> Self {
        self.selected_sub_option_indices.insert(index);
        self
    }

    /// Tag a sub-option
    #[must_use]
    pub fn with_tag(mut self, index: u32, tag: Tag) -> Self {
        self.tags_by_sub_option.entry(index).or_default().insert(tag);
        self
    }

    /// Attach an image
    #[must_use]
    pub fn with_image(mut self, image: BlobRef) -> Self {
        self.image = Some(image);
        self
    }

    /// Set comments
    #[must_use]
    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    /// True if any sub-option carries at least one tag
    #[must_use]
    pub fn has_tags(&self) -> bool {
        self.tags_by_sub_option.values().any(|tags| !tags.is_empty())
    }

    /// Drop tag entries whose tag set is empty
    ///
    /// Two details that differ only by empty tag sets hash identically
    /// after normalization.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.tags_by_sub_option.retain(|_, tags| !tags.is_empty());
        self
    }
}

/// The single "is this detail empty" predicate
///
/// A detail is empty when it has no selected sub-options, no tags, no image
/// and no comment text (whitespace-only comments count as none). Committing
/// an empty detail deselects the item.
#[must_use]
pub fn is_empty_detail(detail: &ItemDetail) -> bool {
    detail.selected_sub_option_indices.is_empty()
        && !detail.has_tags()
        && detail.image.is_none()
        && detail.comments.trim().is_empty()
}

impl HashInto for ItemDetail {
    fn hash_into(&self, hasher: &mut RecordHasher) {
        hasher.u64(self.selected_sub_option_indices.len() as u64);
        for index in &self.selected_sub_option_indices {
            hasher.u32(*index);
        }
        hasher.u64(self.tags_by_sub_option.len() as u64);
        for (index, tags) in &self.tags_by_sub_option {
            hasher.u32(*index).u64(tags.len() as u64);
            for tag in tags {
                hasher.byte(tag.code());
            }
        }
        hasher
            .opt_str(self.image.as_ref().map(BlobRef::as_str))
            .str(&self.comments);
    }
}
