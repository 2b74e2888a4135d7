//! Investigation projects

use crate::ids::ProjectId;
use crate::record::AnalysisRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a project currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectStatus {
    /// Listed in the active catalog
    Active,
    /// Soft-deleted, waiting in the trash
    Trashed,
}

/// Incident facts captured by the creation wizard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IncidentDetails {
    /// What happened
    pub event: String,
    /// People or equipment involved
    pub involved: String,
    /// Area or site
    pub area: String,
    /// When it happened, as entered
    pub occurred_at: String,
    /// Lead investigator
    pub investigator: String,
    /// Anything else worth recording
    pub other_data: String,
}

/// An incident investigation and its analysis record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    id: ProjectId,
    /// Display name
    pub name: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Wizard-captured incident facts
    #[serde(default)]
    pub details: IncidentDetails,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Active or trashed
    pub status: ProjectStatus,
    /// Set while trashed
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    /// The five-stage record
    #[serde(default)]
    pub record: AnalysisRecord,
    /// Last time the record or metadata changed
    pub last_modified: DateTime<Utc>,
}

impl Project {
    /// Create a new active project with a freshly generated id
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(ProjectId::generate(), name)
    }

    /// Create a new active project with a known id (used when rehydrating)
    #[must_use]
    pub fn with_id(id: ProjectId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            description: String::new(),
            details: IncidentDetails::default(),
            created_at: now,
            status: ProjectStatus::Active,
            deleted_at: None,
            record: AnalysisRecord::default(),
            last_modified: now,
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the incident details
    #[must_use]
    pub fn with_details(mut self, details: IncidentDetails) -> Self {
        self.details = details;
        self
    }

    /// Set the analysis record
    #[must_use]
    pub fn with_record(mut self, record: AnalysisRecord) -> Self {
        self.record = record;
        self
    }

    /// Immutable project id
    #[inline]
    #[must_use]
    pub fn id(&self) -> ProjectId {
        self.id
    }

    /// Whether the project is in the trash
    #[inline]
    #[must_use]
    pub fn is_trashed(&self) -> bool {
        self.status == ProjectStatus::Trashed
    }

    /// Case-insensitive match against name, event and area
    #[must_use]
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || [&self.name, &self.details.event, &self.details.area]
                .iter()
                .any(|field| field.to_lowercase().contains(&term))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_project_is_active() {
        let project = Project::new("Fall from scaffold");
        assert_eq!(project.status, ProjectStatus::Active);
        assert!(project.deleted_at.is_none());
        assert_eq!(project.created_at, project.last_modified);
    }

    #[test]
    fn search_covers_name_event_and_area() {
        let project = Project::new("Plant 2 review").with_details(IncidentDetails {
            event: "Forklift collision".into(),
            area: "Warehouse".into(),
            ..IncidentDetails::default()
        });
        assert!(project.matches("forklift"));
        assert!(project.matches("WAREHOUSE"));
        assert!(project.matches("plant"));
        assert!(project.matches("  "));
        assert!(!project.matches("kitchen"));
    }

    #[test]
    fn json_keeps_id() {
        let project = Project::new("Spill");
        let json = serde_json::to_string(&project).unwrap();
        let back: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), project.id());
        assert_eq!(back, project);
    }
}
