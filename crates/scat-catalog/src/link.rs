//! Causal link table: basic cause → control needs

use crate::catalog::{Catalog, CatalogKind};
use crate::error::CatalogError;
use once_cell::sync::OnceCell;
use scat_record::{HashInto, ItemId, RecordHash, RecordHasher};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const BUILTIN_LINKS: &str = include_str!("../data/causal_links.json");

static BUILTIN: OnceCell<CausalLink> = OnceCell::new();

#[derive(Serialize, Deserialize)]
struct CausalLinkRepr {
    #[serde(default)]
    version: u32,
    links: BTreeMap<String, Vec<u32>>,
}

/// Static many-to-many map from basic cause ids to control need ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CausalLink {
    version: u32,
    links: BTreeMap<ItemId, BTreeSet<ItemId>>,
    fingerprint: RecordHash,
}

struct LinkRows<'a>(&'a BTreeMap<ItemId, BTreeSet<ItemId>>);

impl HashInto for LinkRows<'_> {
    fn hash_into(&self, hasher: &mut RecordHasher) {
        hasher.u64(self.0.len() as u64);
        for (basic, controls) in self.0 {
            hasher.u32(basic.get()).u64(controls.len() as u64);
            for control in controls {
                hasher.u32(control.get());
            }
        }
    }
}

impl Default for CausalLink {
    fn default() -> Self {
        Self::from_table(0, BTreeMap::new())
    }
}

impl CausalLink {
    fn from_table(version: u32, links: BTreeMap<ItemId, BTreeSet<ItemId>>) -> Self {
        let fingerprint = RecordHash::of(&LinkRows(&links));
        Self {
            version,
            links,
            fingerprint,
        }
    }

    /// Build a table from explicit pairs
    #[must_use]
    pub fn new<L, C>(version: u32, links: L) -> Self
    where
        L: IntoIterator<Item = (ItemId, C)>,
        C: IntoIterator<Item = ItemId>,
    {
        let mut table: BTreeMap<ItemId, BTreeSet<ItemId>> = BTreeMap::new();
        for (basic, controls) in links {
            table.entry(basic).or_default().extend(controls);
        }
        Self::from_table(version, table)
    }

    /// Every basic cause linked to every control need
    ///
    /// Placeholder table for deployments without curated link data.
    #[must_use]
    pub fn uniform(basic_causes: &Catalog, control_needs: &Catalog) -> Self {
        let all: BTreeSet<ItemId> = control_needs.items().iter().map(|item| item.id).collect();
        let links = basic_causes
            .items()
            .iter()
            .map(|item| (item.id, all.clone()))
            .collect();
        Self::from_table(0, links)
    }

    /// Parse `{ "version": n, "links": { "<basicId>": [controlIds…] } }`
    ///
    /// # Errors
    /// Malformed JSON or non-numeric keys
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let repr: CausalLinkRepr =
            serde_json::from_str(json).map_err(CatalogError::parse("link table"))?;
        let mut links = BTreeMap::new();
        for (key, controls) in repr.links {
            let basic = key
                .trim()
                .parse::<u32>()
                .map_err(|_| CatalogError::InvalidLinkKey(key.clone()))?;
            links.insert(ItemId(basic), controls.into_iter().map(ItemId).collect());
        }
        Ok(Self::from_table(repr.version, links))
    }

    /// Serialize back to the JSON form accepted by [`CausalLink::from_json`]
    ///
    /// # Errors
    /// Only on serializer failure
    pub fn to_json(&self) -> Result<String, CatalogError> {
        let repr = CausalLinkRepr {
            version: self.version,
            links: self
                .links
                .iter()
                .map(|(basic, controls)| {
                    (basic.to_string(), controls.iter().map(|c| c.get()).collect())
                })
                .collect(),
        };
        serde_json::to_string_pretty(&repr).map_err(|source| CatalogError::Encode {
            what: "link table",
            source,
        })
    }

    /// Bundled default table
    ///
    /// # Errors
    /// Only if the bundled data is malformed
    pub fn builtin() -> Result<&'static Self, CatalogError> {
        BUILTIN.get_or_try_init(|| {
            let table = Self::from_json(BUILTIN_LINKS)?;
            tracing::debug!(causes = table.len(), "loaded bundled causal links");
            Ok(table)
        })
    }

    /// Data version, part of the eligibility cache key
    #[inline]
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Blake3 digest of the rows, independent of [`CausalLink::version`]
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> RecordHash {
        self.fingerprint
    }

    /// Control needs linked to `basic_cause`; `None` if the cause has no row
    #[must_use]
    pub fn get(&self, basic_cause: ItemId) -> Option<&BTreeSet<ItemId>> {
        self.links.get(&basic_cause)
    }

    /// Number of basic causes with a row
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// True if the table has no rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Check that every id in the table exists in the given catalogs
    ///
    /// # Errors
    /// [`CatalogError::UnknownLinkTarget`] naming the first unknown id
    pub fn validate(
        &self,
        basic_causes: &Catalog,
        control_needs: &Catalog,
    ) -> Result<(), CatalogError> {
        for (basic, controls) in &self.links {
            if !basic_causes.contains(*basic) {
                return Err(CatalogError::UnknownLinkTarget {
                    kind: CatalogKind::BasicCauses,
                    id: *basic,
                });
            }
            if let Some(id) = controls.iter().find(|id| !control_needs.contains(**id)) {
                return Err(CatalogError::UnknownLinkTarget {
                    kind: CatalogKind::ControlNeeds,
                    id: *id,
                });
            }
        }
        Ok(())
    }
}
