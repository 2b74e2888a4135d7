//! Dropping control needs that lost their eligibility

use crate::filter::EligibleControlNeeds;
use scat_record::{AnalysisRecordStore, ItemDetail, ItemId, RecordError, SectionKey};

/// Deselect every ControlNeeds item not in `eligible`
///
/// Runs through [`AnalysisRecordStore::commit_item_detail`] with an empty
/// detail, so selection and detail stay in step and the rolling hash moves.
/// Returns the removed ids in ascending order.
///
/// # Errors
/// Propagates store errors; none are expected for ControlNeeds
pub fn prune_ineligible_control_needs(
    store: &mut AnalysisRecordStore,
    eligible: &EligibleControlNeeds,
) -> Result<Vec<ItemId>, RecordError> {
    let stale: Vec<ItemId> = store
        .record()
        .control_needs()
        .selected_item_ids()
        .filter(|id| !eligible.contains(*id))
        .collect();

    for id in &stale {
        store.commit_item_detail(SectionKey::ControlNeeds, *id, ItemDetail::new())?;
    }
    if !stale.is_empty() {
        tracing::debug!(removed = ?stale, "pruned ineligible control needs");
    }
    Ok(stale)
}
