//! Project list queries

use scat_record::Project;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sort order for project listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectSort {
    /// Name, case-insensitive, A to Z
    Name,
    /// Last modification, newest first
    #[default]
    Modified,
    /// Record completion, most complete first
    Progress,
}

/// Filter and order for [`super::ProjectLifecycleStore::query`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectQuery {
    /// Case-insensitive substring of name, event or area
    pub search: Option<String>,
    /// Sort order
    pub sort: ProjectSort,
}

impl ProjectQuery {
    /// Query with a search term
    #[must_use]
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Query with a sort order
    #[must_use]
    pub fn sorted_by(mut self, sort: ProjectSort) -> Self {
        self.sort = sort;
        self
    }

    pub(crate) fn apply(&self, projects: &[Project]) -> Vec<Project> {
        let mut hits: Vec<Project> = projects
            .iter()
            .filter(|p| self.search.as_deref().map_or(true, |term| p.matches(term)))
            .cloned()
            .collect();
        hits.sort_by(|a, b| self.compare(a, b));
        hits
    }

    fn compare(&self, a: &Project, b: &Project) -> Ordering {
        let newest_first = || b.last_modified.cmp(&a.last_modified);
        match self.sort {
            ProjectSort::Name => a
                .name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(newest_first),
            ProjectSort::Modified => newest_first(),
            ProjectSort::Progress => b
                .record
                .progress()
                .completed()
                .cmp(&a.record.progress().completed())
                .then_with(newest_first),
        }
    }
}
