//! Persistence gateway seam

use crate::error::GatewayError;
use scat_record::{AnalysisRecord, Project, ProjectId};

/// Acknowledgement of a successful save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveAck {
    /// Project that was saved
    pub project_id: ProjectId,
}

/// Backend that stores projects and their analysis records
///
/// Implement this trait to plug in a remote API or a local cache. Every call
/// may fail and may take arbitrarily long.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Fetch a project with its record
    async fn load(&self, project_id: ProjectId) -> Result<Project, GatewayError>;

    /// Store a project's analysis record
    async fn save(
        &self,
        project_id: ProjectId,
        record: &AnalysisRecord,
    ) -> Result<SaveAck, GatewayError>;

    /// Register a newly created project
    async fn create_project(&self, project: &Project) -> Result<SaveAck, GatewayError>;

    /// Active projects
    async fn list_active(&self) -> Result<Vec<Project>, GatewayError>;

    /// Trashed projects
    async fn list_trash(&self) -> Result<Vec<Project>, GatewayError>;
}
