//! Causal filter: which control needs a basic-cause selection makes eligible

use crate::catalog::{Catalog, CatalogItem};
use crate::link::CausalLink;
use indexmap::IndexMap;
use scat_record::{AnalysisRecord, ItemId};
use serde::Serialize;
use std::collections::BTreeSet;

/// Why the eligible list looks the way it does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EligibilityState {
    /// No basic cause selected yet
    AwaitingBasicCauses,
    /// Causes selected, but none of them link to a catalog control need
    NoLinkedControls,
    /// At least one control need is eligible
    Available,
}

/// Eligible control needs sharing a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlNeedGroup {
    /// Category label
    pub category: String,
    /// Items in catalog order
    pub items: Vec<CatalogItem>,
}

/// Result of [`compute_eligible_control_needs`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EligibleControlNeeds {
    state: EligibilityState,
    groups: Vec<ControlNeedGroup>,
}

impl EligibleControlNeeds {
    /// Groups in first-seen category order; empty categories are omitted
    #[inline]
    #[must_use]
    pub fn groups(&self) -> &[ControlNeedGroup] {
        &self.groups
    }

    /// Eligibility state
    #[inline]
    #[must_use]
    pub fn state(&self) -> EligibilityState {
        self.state
    }

    /// Flat list, group by group, catalog order within each group
    pub fn items(&self) -> impl Iterator<Item = &CatalogItem> + '_ {
        self.groups.iter().flat_map(|group| group.items.iter())
    }

    /// Eligible ids
    #[must_use]
    pub fn ids(&self) -> BTreeSet<ItemId> {
        self.items().map(|item| item.id).collect()
    }

    /// Whether `id` is eligible
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.items().any(|item| item.id == id)
    }

    /// Number of eligible items
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.iter().map(|group| group.items.len()).sum()
    }

    /// True if nothing is eligible
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Compute the control needs made eligible by `selected_basic_causes`
///
/// Pure: the union of the link rows of every selected cause, filtered to
/// `control_needs` in canonical order and grouped by category. Causes with
/// no row contribute nothing.
#[must_use]
pub fn compute_eligible_control_needs<I>(
    selected_basic_causes: I,
    causal_link: &CausalLink,
    control_needs: &Catalog,
) -> EligibleControlNeeds
where
    I: IntoIterator<Item = ItemId>,
{
    let mut any_selected = false;
    let mut eligible: BTreeSet<ItemId> = BTreeSet::new();
    for cause in selected_basic_causes {
        any_selected = true;
        if let Some(controls) = causal_link.get(cause) {
            eligible.extend(controls.iter().copied());
        }
    }

    if !any_selected {
        return EligibleControlNeeds {
            state: EligibilityState::AwaitingBasicCauses,
            groups: Vec::new(),
        };
    }

    let mut grouped: IndexMap<&str, Vec<CatalogItem>> = IndexMap::new();
    for item in control_needs
        .items()
        .iter()
        .filter(|item| eligible.contains(&item.id))
    {
        grouped
            .entry(item.category.as_str())
            .or_default()
            .push(item.clone());
    }

    let groups: Vec<ControlNeedGroup> = grouped
        .into_iter()
        .map(|(category, items)| ControlNeedGroup {
            category: category.to_owned(),
            items,
        })
        .collect();
    let state = if groups.is_empty() {
        EligibilityState::NoLinkedControls
    } else {
        EligibilityState::Available
    };
    EligibleControlNeeds { state, groups }
}

/// [`compute_eligible_control_needs`] over a record's BasicCauses selection
#[must_use]
pub fn eligible_for_record(
    record: &AnalysisRecord,
    causal_link: &CausalLink,
    control_needs: &Catalog,
) -> EligibleControlNeeds {
    compute_eligible_control_needs(
        record.basic_causes().selected_item_ids(),
        causal_link,
        control_needs,
    )
}
