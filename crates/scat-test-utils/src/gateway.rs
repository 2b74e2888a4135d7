//! In-memory persistence gateway with failure and latency injection

use async_trait::async_trait;
use parking_lot::Mutex;
use scat_core::{GatewayError, PersistenceGateway, SaveAck};
use scat_record::{AnalysisRecord, Project, ProjectId, ProjectStatus, RecordHash};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// One save the gateway acknowledged
#[derive(Debug, Clone)]
pub struct SavedRecord {
    pub project_id: ProjectId,
    pub hash: RecordHash,
    pub record: AnalysisRecord,
}

#[derive(Debug, Default)]
pub struct InMemoryGateway {
    projects: Mutex<HashMap<ProjectId, Project>>,
    saved: Mutex<Vec<SavedRecord>>,
    fail_loads: AtomicUsize,
    fail_saves: AtomicUsize,
    loads: AtomicUsize,
    save_attempts: AtomicUsize,
    latency: Mutex<Option<Duration>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(self, project: Project) -> Self {
        self.insert(project);
        self
    }

    pub fn insert(&self, project: Project) {
        self.projects.lock().insert(project.id(), project);
    }

    pub fn project(&self, id: ProjectId) -> Option<Project> {
        self.projects.lock().get(&id).cloned()
    }

    /// Fail the next `n` loads with `Unavailable`
    pub fn fail_next_loads(&self, n: usize) {
        self.fail_loads.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` saves with `Unavailable`
    pub fn fail_next_saves(&self, n: usize) {
        self.fail_saves.store(n, Ordering::SeqCst);
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Block saves until [`InMemoryGateway::release_saves`] is called
    pub fn hold_saves(&self) {
        *self.gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `n` held saves through
    pub fn release_saves(&self, n: usize) {
        if let Some(gate) = self.gate.lock().as_ref() {
            gate.add_permits(n);
        }
    }

    /// Stop holding saves and release every waiting one
    pub fn open_saves(&self) {
        if let Some(gate) = self.gate.lock().take() {
            gate.close();
        }
    }

    /// Acknowledged saves, oldest first
    pub fn saves(&self) -> Vec<SavedRecord> {
        self.saved.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saved.lock().len()
    }

    pub fn save_attempts(&self) -> usize {
        self.save_attempts.load(Ordering::SeqCst)
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn load(&self, project_id: ProjectId) -> Result<Project, GatewayError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if Self::take_failure(&self.fail_loads) {
            return Err(GatewayError::Unavailable("injected load failure".into()));
        }
        self.project(project_id)
            .ok_or(GatewayError::NotFound(project_id))
    }

    async fn save(
        &self,
        project_id: ProjectId,
        record: &AnalysisRecord,
    ) -> Result<SaveAck, GatewayError> {
        self.save_attempts.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            // A closed gate means saves were opened for good.
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.delay().await;
        if Self::take_failure(&self.fail_saves) {
            return Err(GatewayError::Unavailable("injected save failure".into()));
        }
        let mut projects = self.projects.lock();
        let project = projects
            .get_mut(&project_id)
            .ok_or(GatewayError::NotFound(project_id))?;
        project.record = record.clone();
        drop(projects);

        self.saved.lock().push(SavedRecord {
            project_id,
            hash: record.content_hash(),
            record: record.clone(),
        });
        Ok(SaveAck { project_id })
    }

    async fn create_project(&self, project: &Project) -> Result<SaveAck, GatewayError> {
        self.delay().await;
        let mut projects = self.projects.lock();
        if projects.contains_key(&project.id()) {
            return Err(GatewayError::Rejected(format!(
                "project {} already exists",
                project.id()
            )));
        }
        projects.insert(project.id(), project.clone());
        Ok(SaveAck {
            project_id: project.id(),
        })
    }

    async fn list_active(&self) -> Result<Vec<Project>, GatewayError> {
        self.delay().await;
        Ok(self
            .projects
            .lock()
            .values()
            .filter(|p| p.status == ProjectStatus::Active)
            .cloned()
            .collect())
    }

    async fn list_trash(&self) -> Result<Vec<Project>, GatewayError> {
        self.delay().await;
        Ok(self
            .projects
            .lock()
            .values()
            .filter(|p| p.status == ProjectStatus::Trashed)
            .cloned()
            .collect())
    }
}
