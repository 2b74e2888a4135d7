//! Memoized eligibility lookups using moka

use crate::catalog::Catalog;
use crate::filter::{compute_eligible_control_needs, EligibleControlNeeds};
use crate::link::CausalLink;
use moka::sync::Cache;
use scat_record::{ItemId, RecordHash};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Cache key: normalized selection plus the data it was computed with
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EligibilityKey {
    selection: Vec<ItemId>,
    catalog_version: u32,
    link_version: u32,
    link_fingerprint: RecordHash,
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// Memoizing front for [`compute_eligible_control_needs`]
///
/// Link tables are told apart by content as well as version. Catalogs are
/// keyed by version only, so a caller swapping in a catalog with the same
/// version must call [`EligibilityCache::clear`].
#[derive(Debug, Clone)]
pub struct EligibilityCache {
    inner: Cache<EligibilityKey, Arc<EligibleControlNeeds>>,
}

impl Default for EligibilityCache {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EligibilityCache {
    /// Create a cache holding at most `max_capacity` selections
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Eligible control needs for `selected_basic_causes`, computed on miss
    pub fn get_or_compute<I>(
        &self,
        selected_basic_causes: I,
        causal_link: &CausalLink,
        control_needs: &Catalog,
    ) -> Arc<EligibleControlNeeds>
    where
        I: IntoIterator<Item = ItemId>,
    {
        let selection: BTreeSet<ItemId> = selected_basic_causes.into_iter().collect();
        let key = EligibilityKey {
            selection: selection.iter().copied().collect(),
            catalog_version: control_needs.version(),
            link_version: causal_link.version(),
            link_fingerprint: causal_link.fingerprint(),
        };
        self.inner.get_with(key, || {
            tracing::trace!(causes = selection.len(), "eligibility cache miss");
            Arc::new(compute_eligible_control_needs(
                selection.iter().copied(),
                causal_link,
                control_needs,
            ))
        })
    }

    /// Drop every entry
    #[inline]
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// Get cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.run_pending_tasks();
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }
}
