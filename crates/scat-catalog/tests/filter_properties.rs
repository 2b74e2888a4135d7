use proptest::prelude::*;
use scat_catalog::{
    compute_eligible_control_needs, Catalog, CatalogItem, CatalogKind, CausalLink,
    EligibilityCache, EligibilityState,
};
use scat_record::ItemId;
use std::collections::BTreeSet;

fn link_table() -> impl Strategy<Value = CausalLink> {
    proptest::collection::btree_map(
        1..16u32,
        proptest::collection::btree_set(1..25u32, 0..6),
        0..15,
    )
    .prop_map(|rows| {
        CausalLink::new(
            1,
            rows.into_iter()
                .map(|(basic, controls)| (ItemId(basic), controls.into_iter().map(ItemId))),
        )
    })
}

fn selection() -> impl Strategy<Value = BTreeSet<ItemId>> {
    proptest::collection::btree_set((1..16u32).prop_map(ItemId), 0..8)
}

fn control_needs() -> &'static Catalog {
    Catalog::builtin(CatalogKind::ControlNeeds).unwrap()
}

proptest! {
    #[test]
    fn prop_eligibility_is_monotonic(
        link in link_table(),
        base in selection(),
        extra in selection(),
    ) {
        let grown: BTreeSet<ItemId> = base.union(&extra).copied().collect();
        let small = compute_eligible_control_needs(base.iter().copied(), &link, control_needs());
        let large = compute_eligible_control_needs(grown.iter().copied(), &link, control_needs());
        prop_assert!(small.ids().is_subset(&large.ids()));
    }

    #[test]
    fn prop_eligible_ids_are_the_union_of_links(
        link in link_table(),
        selected in selection(),
    ) {
        let catalog = control_needs();
        let expected: BTreeSet<ItemId> = selected
            .iter()
            .filter_map(|id| link.get(*id))
            .flatten()
            .copied()
            .filter(|id| catalog.contains(*id))
            .collect();
        let eligible = compute_eligible_control_needs(selected.iter().copied(), &link, catalog);
        prop_assert_eq!(eligible.ids(), expected);
        prop_assert_eq!(eligible.len(), eligible.ids().len());
    }

    #[test]
    fn prop_groups_follow_catalog_order(
        link in link_table(),
        selected in selection(),
    ) {
        let catalog = control_needs();
        let eligible = compute_eligible_control_needs(selected.iter().copied(), &link, catalog);
        for group in eligible.groups() {
            prop_assert!(!group.items.is_empty());
            let positions: Vec<usize> = group
                .items
                .iter()
                .map(|item| catalog.position(item.id).unwrap())
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn prop_cache_agrees_with_pure_filter(
        link in link_table(),
        selected in selection(),
    ) {
        let cache = EligibilityCache::new(8);
        let cached = cache.get_or_compute(selected.iter().copied(), &link, control_needs());
        let pure = compute_eligible_control_needs(selected.iter().copied(), &link, control_needs());
        prop_assert_eq!(&*cached, &pure);
    }
}

#[test]
fn test_two_causes_yield_union_grouped_by_category() {
    let item = |id: u32, category: &str| CatalogItem {
        id: ItemId(id),
        category: category.to_string(),
        title: format!("need {id}"),
        sub_options: vec![],
    };
    let catalog = Catalog::new(
        CatalogKind::ControlNeeds,
        1,
        vec![
            item(1, "Liderazgo"),
            item(2, "Liderazgo"),
            item(3, "Equipos"),
            item(4, "Liderazgo"),
            item(5, "Equipos"),
        ],
    )
    .unwrap();
    let link = CausalLink::new(
        1,
        [
            (ItemId(3), vec![ItemId(1), ItemId(4)]),
            (ItemId(9), vec![ItemId(4), ItemId(5)]),
        ],
    );

    let eligible = compute_eligible_control_needs([ItemId(3), ItemId(9)], &link, &catalog);

    assert_eq!(eligible.state(), EligibilityState::Available);
    assert_eq!(eligible.groups().len(), 2);
    assert_eq!(eligible.groups()[0].category, "Liderazgo");
    assert_eq!(
        eligible.groups()[0]
            .items
            .iter()
            .map(|i| i.id)
            .collect::<Vec<_>>(),
        vec![ItemId(1), ItemId(4)]
    );
    assert_eq!(eligible.groups()[1].category, "Equipos");
    assert_eq!(
        eligible.groups()[1]
            .items
            .iter()
            .map(|i| i.id)
            .collect::<Vec<_>>(),
        vec![ItemId(5)]
    );
}

#[test]
fn test_all_builtin_basic_causes_are_linked() {
    let basic = Catalog::builtin(CatalogKind::BasicCauses).unwrap();
    let link = CausalLink::builtin().unwrap();
    for item in basic.items() {
        let eligible = compute_eligible_control_needs([item.id], link, control_needs());
        assert_eq!(
            eligible.state(),
            EligibilityState::Available,
            "basic cause {} has no control needs",
            item.id
        );
    }
}
