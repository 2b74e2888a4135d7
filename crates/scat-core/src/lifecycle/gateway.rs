//! Offline gateway backed by the lifecycle store

use super::ProjectLifecycleStore;
use crate::error::{GatewayError, LifecycleError};
use crate::gateway::{PersistenceGateway, SaveAck};
use scat_record::{AnalysisRecord, Project, ProjectId};
use std::sync::Arc;

/// [`PersistenceGateway`] that reads and writes the local project cache
///
/// Lets an editing session run without a remote backend; saves land in the
/// cached project through [`ProjectLifecycleStore::update_record`].
#[derive(Debug, Clone)]
pub struct LocalGateway {
    projects: Arc<ProjectLifecycleStore>,
}

impl LocalGateway {
    /// Gateway over `projects`
    #[must_use]
    pub fn new(projects: Arc<ProjectLifecycleStore>) -> Self {
        Self { projects }
    }
}

fn to_gateway(err: LifecycleError) -> GatewayError {
    match err {
        LifecycleError::NotFound(id) | LifecycleError::NotActive(id) => GatewayError::NotFound(id),
        LifecycleError::AlreadyExists(id) => {
            GatewayError::Rejected(format!("project {id} already exists"))
        }
        LifecycleError::Gateway(inner) => inner,
        other => GatewayError::Unavailable(other.to_string()),
    }
}

#[async_trait::async_trait]
impl PersistenceGateway for LocalGateway {
    async fn load(&self, project_id: ProjectId) -> Result<Project, GatewayError> {
        self.projects
            .get(project_id)
            .ok_or(GatewayError::NotFound(project_id))
    }

    async fn save(
        &self,
        project_id: ProjectId,
        record: &AnalysisRecord,
    ) -> Result<SaveAck, GatewayError> {
        self.projects
            .update_record(project_id, record.clone())
            .map_err(to_gateway)?;
        Ok(SaveAck { project_id })
    }

    async fn create_project(&self, project: &Project) -> Result<SaveAck, GatewayError> {
        let project_id = self.projects.create(project.clone()).map_err(to_gateway)?;
        Ok(SaveAck { project_id })
    }

    async fn list_active(&self) -> Result<Vec<Project>, GatewayError> {
        Ok(self.projects.active())
    }

    async fn list_trash(&self) -> Result<Vec<Project>, GatewayError> {
        Ok(self.projects.trash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{MemoryKeyValueStore, StorageKeys};
    use scat_record::{ItemId, SectionKey, SelectionSection};

    #[tokio::test]
    async fn saves_land_in_the_cache() {
        let projects = Arc::new(
            ProjectLifecycleStore::open(
                Arc::new(MemoryKeyValueStore::new()),
                StorageKeys::default(),
                vec![],
            )
            .unwrap(),
        );
        let gateway = LocalGateway::new(projects.clone());
        let project = Project::new("Ladder fall");
        gateway.create_project(&project).await.unwrap();

        let record = AnalysisRecord::new()
            .with_section(SectionKey::ImmediateCauses, SelectionSection::from_ids([ItemId(2)]))
            .unwrap();
        gateway.save(project.id(), &record).await.unwrap();

        assert_eq!(gateway.load(project.id()).await.unwrap().record, record);
        assert_eq!(gateway.list_active().await.unwrap().len(), 1);
        assert!(matches!(
            gateway.load(ProjectId::generate()).await,
            Err(GatewayError::NotFound(_))
        ));
    }
}
