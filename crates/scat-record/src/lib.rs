//! SCAT Record
//!
//! The five-stage causation record of an incident investigation and the
//! store that owns it.
//!
//! # Core Concepts
//!
//! - [`AnalysisRecord`]: Evaluation, Contact, Immediate Causes, Basic Causes
//!   and Control Needs, in wizard order
//! - [`SelectionSection`]: catalog items chosen in a stage, each with an
//!   [`ItemDetail`]
//! - [`AnalysisRecordStore`]: the single mutation path, keeping a rolling
//!   [`RecordHash`] of the current content
//! - [`RecordHandle`]: shared handle passed to the session and the UI layer
//! - [`Project`]: an investigation with metadata and its record
//!
//! # Example
//!
//! ```rust
//! use scat_record::prelude::*;
//!
//! let mut store = AnalysisRecordStore::default();
//! let clean = store.current_hash();
//!
//! let detail = ItemDetail::new().with_comments("guard removed");
//! store.commit_item_detail(SectionKey::ImmediateCauses, ItemId(4), detail)?;
//! assert_ne!(store.current_hash(), clean);
//! # Ok::<(), scat_record::RecordError>(())
//! ```

#![warn(unreachable_pub)]

mod detail;
mod error;
mod hash;
mod ids;
mod project;
mod record;
mod section;
mod store;

pub use detail::{is_empty_detail, ItemDetail, Tag};
pub use error::RecordError;
pub use hash::{HashError, HashInto, RecordHash, RecordHasher};
pub use ids::{BlobRef, ItemId, ProjectId};
pub use project::{IncidentDetails, Project, ProjectStatus};
pub use record::{AnalysisRecord, RecordProgress, StageProgress};
pub use section::{EvaluationSection, Rating, SectionKey, SectionValue, SelectionSection};
pub use store::{AnalysisRecordStore, CommitOutcome, PendingDetail, RecordHandle};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commonly used types
pub mod prelude {
    pub use crate::{
        is_empty_detail, AnalysisRecord, AnalysisRecordStore, CommitOutcome, EvaluationSection,
        ItemDetail, ItemId, Project, ProjectId, Rating, RecordError, RecordHandle, RecordHash,
        SectionKey, SelectionSection, Tag,
    };
}
