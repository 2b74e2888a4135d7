//! Catalog and link-table errors

use crate::catalog::CatalogKind;
use scat_record::ItemId;

/// Errors raised while loading catalogs or link tables
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// JSON could not be parsed
    #[error("failed to parse {what}: {source}")]
    Parse {
        /// What was being parsed
        what: &'static str,
        /// Underlying parser error
        #[source]
        source: serde_json::Error,
    },

    /// JSON could not be produced
    #[error("failed to encode {what}: {source}")]
    Encode {
        /// What was being encoded
        what: &'static str,
        /// Underlying serializer error
        #[source]
        source: serde_json::Error,
    },

    /// Catalog file declares a different kind than requested
    #[error("expected a {expected} catalog, found {found}")]
    KindMismatch {
        /// Requested kind
        expected: CatalogKind,
        /// Kind declared in the data
        found: CatalogKind,
    },

    /// The same id appears twice in one catalog
    #[error("duplicate item id {id} in {kind} catalog")]
    DuplicateId {
        /// Catalog kind
        kind: CatalogKind,
        /// Repeated id
        id: ItemId,
    },

    /// A link-table key is not a decimal item id
    #[error("invalid basic cause id {0:?} in link table")]
    InvalidLinkKey(String),

    /// A link table refers to ids missing from the catalogs
    #[error("link table refers to unknown {kind} item {id}")]
    UnknownLinkTarget {
        /// Catalog the id was expected in
        kind: CatalogKind,
        /// Unknown id
        id: ItemId,
    },
}

impl CatalogError {
    pub(crate) fn parse(what: &'static str) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| Self::Parse { what, source }
    }
}
