//! SCAT Catalog
//!
//! Static SCAT content and the causal filter built on it.
//!
//! - [`Catalog`]: ordered items of one [`CatalogKind`], bundled as JSON
//! - [`CausalLink`]: basic cause → control need table
//! - [`compute_eligible_control_needs`]: pure eligibility filter
//! - [`EligibilityCache`]: moka-backed memoization of the filter
//! - [`prune_ineligible_control_needs`]: drop control needs a shrunken
//!   selection no longer supports
//!
//! # Example
//!
//! ```rust
//! use scat_catalog::{compute_eligible_control_needs, Catalog, CatalogKind, CausalLink};
//! use scat_record::ItemId;
//!
//! let control_needs = Catalog::builtin(CatalogKind::ControlNeeds)?;
//! let links = CausalLink::builtin()?;
//! let eligible = compute_eligible_control_needs([ItemId(3)], links, control_needs);
//! assert!(!eligible.is_empty());
//! # Ok::<(), scat_catalog::CatalogError>(())
//! ```

#![warn(unreachable_pub)]

mod cache;
mod catalog;
mod error;
mod filter;
mod link;
mod prune;

pub use cache::{CacheStats, EligibilityCache};
pub use catalog::{Catalog, CatalogItem, CatalogKind};
pub use error::CatalogError;
pub use filter::{
    compute_eligible_control_needs, eligible_for_record, ControlNeedGroup, EligibilityState,
    EligibleControlNeeds,
};
pub use link::CausalLink;
pub use prune::prune_ineligible_control_needs;
