//! Content catalogs
//!
//! Static, ordered lists of selectable SCAT items. The default Spanish
//! catalogs ship as JSON under `data/` and are parsed once on first use.

use crate::error::CatalogError;
use once_cell::sync::OnceCell;
use scat_record::{ItemId, SectionKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

const BUILTIN_IMMEDIATE_CAUSES: &str = include_str!("../data/immediate_causes.json");
const BUILTIN_BASIC_CAUSES: &str = include_str!("../data/basic_causes.json");
const BUILTIN_CONTROL_NEEDS: &str = include_str!("../data/control_needs.json");

static IMMEDIATE_CAUSES: OnceCell<Catalog> = OnceCell::new();
static BASIC_CAUSES: OnceCell<Catalog> = OnceCell::new();
static CONTROL_NEEDS: OnceCell<Catalog> = OnceCell::new();

/// Which stage a catalog feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CatalogKind {
    /// Substandard acts and conditions
    ImmediateCauses,
    /// Personal and job factors
    BasicCauses,
    /// Administrative control needs
    ControlNeeds,
}

impl CatalogKind {
    /// All kinds
    pub const ALL: [CatalogKind; 3] = [
        CatalogKind::ImmediateCauses,
        CatalogKind::BasicCauses,
        CatalogKind::ControlNeeds,
    ];

    /// Catalog backing a record section, if it has one
    #[must_use]
    pub const fn for_section(key: SectionKey) -> Option<Self> {
        match key {
            SectionKey::ImmediateCauses => Some(Self::ImmediateCauses),
            SectionKey::BasicCauses => Some(Self::BasicCauses),
            SectionKey::ControlNeeds => Some(Self::ControlNeeds),
            SectionKey::Evaluation | SectionKey::Contact => None,
        }
    }

    fn builtin_source(self) -> &'static str {
        match self {
            Self::ImmediateCauses => BUILTIN_IMMEDIATE_CAUSES,
            Self::BasicCauses => BUILTIN_BASIC_CAUSES,
            Self::ControlNeeds => BUILTIN_CONTROL_NEEDS,
        }
    }

    fn builtin_cell(self) -> &'static OnceCell<Catalog> {
        match self {
            Self::ImmediateCauses => &IMMEDIATE_CAUSES,
            Self::BasicCauses => &BASIC_CAUSES,
            Self::ControlNeeds => &CONTROL_NEEDS,
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ImmediateCauses => "immediate-causes",
            Self::BasicCauses => "basic-causes",
            Self::ControlNeeds => "control-needs",
        })
    }
}

/// One selectable catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Stable id, unique within its catalog
    pub id: ItemId,
    /// Display group
    pub category: String,
    /// Display title
    pub title: String,
    /// Optional finer-grained choices, addressed by index
    #[serde(default)]
    pub sub_options: Vec<String>,
}

impl CatalogItem {
    fn matches(&self, needle: &str) -> bool {
        self.id.to_string() == needle
            || self.title.to_lowercase().contains(needle)
            || self
                .sub_options
                .iter()
                .any(|option| option.to_lowercase().contains(needle))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogRepr {
    kind: CatalogKind,
    version: u32,
    items: Vec<CatalogItem>,
}

/// Ordered catalog of one kind
#[derive(Debug, Clone)]
pub struct Catalog {
    kind: CatalogKind,
    version: u32,
    items: Vec<CatalogItem>,
    index: HashMap<ItemId, usize>,
}

impl Catalog {
    /// Build a catalog, keeping `items` in the given order
    ///
    /// # Errors
    /// [`CatalogError::DuplicateId`] if two items share an id
    pub fn new(
        kind: CatalogKind,
        version: u32,
        items: Vec<CatalogItem>,
    ) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            if index.insert(item.id, position).is_some() {
                return Err(CatalogError::DuplicateId { kind, id: item.id });
            }
        }
        Ok(Self {
            kind,
            version,
            items,
            index,
        })
    }

    /// Parse a catalog from JSON and check its declared kind
    ///
    /// # Errors
    /// Parse failures, kind mismatches and duplicate ids
    pub fn from_json(expected: CatalogKind, json: &str) -> Result<Self, CatalogError> {
        let repr: CatalogRepr = serde_json::from_str(json).map_err(CatalogError::parse("catalog"))?;
        if repr.kind != expected {
            return Err(CatalogError::KindMismatch {
                expected,
                found: repr.kind,
            });
        }
        Self::new(repr.kind, repr.version, repr.items)
    }

    /// Bundled default catalog of `kind`
    ///
    /// # Errors
    /// Only if the bundled data is malformed
    pub fn builtin(kind: CatalogKind) -> Result<&'static Self, CatalogError> {
        kind.builtin_cell().get_or_try_init(|| {
            let catalog = Self::from_json(kind, kind.builtin_source())?;
            tracing::debug!(%kind, items = catalog.len(), "loaded bundled catalog");
            Ok(catalog)
        })
    }

    /// Catalog kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> CatalogKind {
        self.kind
    }

    /// Data version, part of the eligibility cache key
    #[inline]
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Items in canonical order
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    /// Look up an item by id
    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&CatalogItem> {
        self.index.get(&id).map(|&position| &self.items[position])
    }

    /// Whether `id` belongs to this catalog
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.index.contains_key(&id)
    }

    /// Canonical position of `id`
    #[inline]
    #[must_use]
    pub fn position(&self, id: ItemId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Number of items
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the catalog has no items
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Distinct categories in first-seen order
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for item in &self.items {
            if !seen.contains(&item.category.as_str()) {
                seen.push(&item.category);
            }
        }
        seen
    }

    /// Items whose title or a sub-option contains `term` (case-insensitive)
    /// or whose id equals it
    ///
    /// A blank term returns every item.
    #[must_use]
    pub fn search(&self, term: &str) -> Vec<&CatalogItem> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self.items.iter().collect();
        }
        self.items.iter().filter(|item| item.matches(&needle)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u32, category: &str, title: &str) -> CatalogItem {
        CatalogItem {
            id: ItemId(id),
            category: category.into(),
            title: title.into(),
            sub_options: vec![],
        }
    }

    #[test]
    fn builtin_catalogs_load() {
        let immediate = Catalog::builtin(CatalogKind::ImmediateCauses).unwrap();
        let basic = Catalog::builtin(CatalogKind::BasicCauses).unwrap();
        let control = Catalog::builtin(CatalogKind::ControlNeeds).unwrap();
        assert_eq!(immediate.len(), 28);
        assert_eq!(basic.len(), 15);
        assert_eq!(control.len(), 20);
        assert!(basic.items().iter().all(|i| !i.sub_options.is_empty()));
        assert_eq!(basic.categories().len(), 2);
    }

    #[test]
    fn builtin_is_parsed_once() {
        let a = Catalog::builtin(CatalogKind::ControlNeeds).unwrap();
        let b = Catalog::builtin(CatalogKind::ControlNeeds).unwrap();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = Catalog::new(
            CatalogKind::BasicCauses,
            1,
            vec![item(1, "a", "x"), item(1, "b", "y")],
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId { id: ItemId(1), .. }));
    }

    #[test]
    fn kind_must_match() {
        let json = r#"{"kind":"basicCauses","version":1,"items":[]}"#;
        let err = Catalog::from_json(CatalogKind::ControlNeeds, json).unwrap_err();
        assert!(matches!(err, CatalogError::KindMismatch { .. }));
    }

    #[test]
    fn categories_keep_first_seen_order() {
        let catalog = Catalog::new(
            CatalogKind::ControlNeeds,
            1,
            vec![item(1, "Z", "a"), item(2, "A", "b"), item(3, "Z", "c")],
        )
        .unwrap();
        assert_eq!(catalog.categories(), vec!["Z", "A"]);
    }

    #[test]
    fn search_matches_title_sub_option_and_id() {
        let mut with_subs = item(7, "A", "Housekeeping");
        with_subs.sub_options = vec!["Orden y limpieza".into()];
        let catalog = Catalog::new(
            CatalogKind::ImmediateCauses,
            1,
            vec![item(1, "A", "Guarding"), with_subs],
        )
        .unwrap();

        let ids = |term| {
            catalog
                .search(term)
                .into_iter()
                .map(|i| i.id)
                .collect::<Vec<_>>()
        };
        assert_eq!(ids("guard"), vec![ItemId(1)]);
        assert_eq!(ids("LIMPIEZA"), vec![ItemId(7)]);
        assert_eq!(ids("7"), vec![ItemId(7)]);
        assert_eq!(ids(" "), vec![ItemId(1), ItemId(7)]);
    }

    #[test]
    fn section_mapping() {
        assert_eq!(
            CatalogKind::for_section(SectionKey::ControlNeeds),
            Some(CatalogKind::ControlNeeds)
        );
        assert_eq!(CatalogKind::for_section(SectionKey::Evaluation), None);
    }
}
