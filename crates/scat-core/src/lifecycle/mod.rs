//! Project Lifecycle Store
//!
//! Owns the active and trash lists. Both lists are mirrored to two keys of
//! a [`KeyValueStore`] and rewritten in full on every mutation. Mutations
//! are applied to a staged copy first and only committed in memory once the
//! write succeeded.

mod gateway;
mod kv;
mod query;

pub use gateway::LocalGateway;
pub use kv::{JsonFileStore, KeyValueStore, MemoryKeyValueStore};
pub use query::{ProjectQuery, ProjectSort};

use crate::confirm::{Confirmation, ConfirmationRequest, Outcome};
use crate::error::LifecycleError;
use crate::gateway::PersistenceGateway;
use chrono::Utc;
use parking_lot::Mutex;
use scat_record::{AnalysisRecord, Project, ProjectId, ProjectStatus};
use std::collections::HashSet;
use std::sync::Arc;

/// Storage keys of the two lists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    /// Active list key
    pub active: String,
    /// Trash list key
    pub trash: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            active: "scat.projects.active".to_string(),
            trash: "scat.projects.trash".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ProjectLists {
    active: Vec<Project>,
    trash: Vec<Project>,
}

impl ProjectLists {
    /// Keep one entry per id
    ///
    /// Within a list the first occurrence wins; an id in both lists stays
    /// in the trash. Returns the lists and the number of entries dropped.
    fn reconcile(active: Vec<Project>, trash: Vec<Project>) -> (Self, usize) {
        let total = active.len() + trash.len();
        let mut seen = HashSet::new();
        let trash: Vec<Project> = trash
            .into_iter()
            .filter(|p| seen.insert(p.id()))
            .map(|mut p| {
                p.status = ProjectStatus::Trashed;
                p
            })
            .collect();
        let active: Vec<Project> = active
            .into_iter()
            .filter(|p| seen.insert(p.id()))
            .map(|mut p| {
                p.status = ProjectStatus::Active;
                p.deleted_at = None;
                p
            })
            .collect();
        let dropped = total - active.len() - trash.len();
        if dropped > 0 {
            tracing::warn!(dropped, "dropped duplicate project entries");
        }
        (Self { active, trash }, dropped)
    }

    fn contains(&self, id: ProjectId) -> bool {
        self.active.iter().chain(&self.trash).any(|p| p.id() == id)
    }

    fn take_active(&mut self, id: ProjectId) -> Option<Project> {
        let position = self.active.iter().position(|p| p.id() == id)?;
        Some(self.active.remove(position))
    }

    fn take_trashed(&mut self, id: ProjectId) -> Option<Project> {
        let position = self.trash.iter().position(|p| p.id() == id)?;
        Some(self.trash.remove(position))
    }
}

/// Active/trash project catalog with durable mirroring
pub struct ProjectLifecycleStore {
    kv: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
    lists: Mutex<ProjectLists>,
}

impl std::fmt::Debug for ProjectLifecycleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lists = self.lists.lock();
        f.debug_struct("ProjectLifecycleStore")
            .field("keys", &self.keys)
            .field("active", &lists.active.len())
            .field("trash", &lists.trash.len())
            .finish_non_exhaustive()
    }
}

impl ProjectLifecycleStore {
    /// Load both lists once
    ///
    /// `seed` is used only when the active key has never been written; it
    /// is then persisted so later runs read it back instead. Duplicate ids
    /// in the stored lists are dropped (trash wins) and the repaired lists
    /// written back.
    ///
    /// # Errors
    /// Storage failures and undecodable stored lists
    pub fn open(
        kv: Arc<dyn KeyValueStore>,
        keys: StorageKeys,
        seed: Vec<Project>,
    ) -> Result<Self, LifecycleError> {
        let stored_active = read_list(kv.as_ref(), &keys.active)?;
        let trash = read_list(kv.as_ref(), &keys.trash)?.unwrap_or_default();
        let seeded = stored_active.is_none();
        let (lists, dropped) = ProjectLists::reconcile(stored_active.unwrap_or(seed), trash);

        let store = Self {
            kv,
            keys,
            lists: Mutex::new(ProjectLists::default()),
        };
        if seeded {
            tracing::info!(projects = lists.active.len(), "seeding project list");
        }
        if seeded || dropped > 0 {
            store.persist(&lists, None)?;
        }
        tracing::debug!(
            active = lists.active.len(),
            trash = lists.trash.len(),
            "project lists loaded"
        );
        *store.lists.lock() = lists;
        Ok(store)
    }

    /// Active projects, most recently created or restored first
    #[must_use]
    pub fn active(&self) -> Vec<Project> {
        self.lists.lock().active.clone()
    }

    /// Trashed projects, most recently deleted first
    #[must_use]
    pub fn trash(&self) -> Vec<Project> {
        self.lists.lock().trash.clone()
    }

    /// Look up a project in either list
    #[must_use]
    pub fn get(&self, id: ProjectId) -> Option<Project> {
        let lists = self.lists.lock();
        lists.active.iter().chain(&lists.trash).find(|p| p.id() == id).cloned()
    }

    /// Which list holds `id`
    #[must_use]
    pub fn location(&self, id: ProjectId) -> Option<ProjectStatus> {
        let lists = self.lists.lock();
        if lists.active.iter().any(|p| p.id() == id) {
            Some(ProjectStatus::Active)
        } else if lists.trash.iter().any(|p| p.id() == id) {
            Some(ProjectStatus::Trashed)
        } else {
            None
        }
    }

    /// Filtered, sorted view of the active list
    #[must_use]
    pub fn query(&self, query: &ProjectQuery) -> Vec<Project> {
        query.apply(&self.lists.lock().active)
    }

    /// Add a project at the head of the active list
    ///
    /// # Errors
    /// [`LifecycleError::AlreadyExists`] if the id is in either list, plus
    /// storage failures
    pub fn create(&self, mut project: Project) -> Result<ProjectId, LifecycleError> {
        let id = project.id();
        project.status = ProjectStatus::Active;
        project.deleted_at = None;
        self.mutate(|lists| {
            if lists.contains(id) {
                return Err(LifecycleError::AlreadyExists(id));
            }
            lists.active.insert(0, project);
            Ok(())
        })?;
        tracing::info!(project_id = %id, "project created");
        Ok(id)
    }

    /// Move an active project to the trash
    ///
    /// # Errors
    /// [`LifecycleError::NotActive`] plus storage failures
    pub fn soft_delete(&self, id: ProjectId) -> Result<(), LifecycleError> {
        self.mutate(|lists| {
            let mut project = lists.take_active(id).ok_or(LifecycleError::NotActive(id))?;
            project.status = ProjectStatus::Trashed;
            project.deleted_at = Some(Utc::now());
            lists.trash.insert(0, project);
            Ok(())
        })?;
        tracing::info!(project_id = %id, "project moved to trash");
        Ok(())
    }

    /// Move a trashed project back to the head of the active list
    ///
    /// # Errors
    /// [`LifecycleError::NotInTrash`] plus storage failures
    pub fn restore(&self, id: ProjectId) -> Result<(), LifecycleError> {
        self.mutate(|lists| {
            let mut project = lists.take_trashed(id).ok_or(LifecycleError::NotInTrash(id))?;
            project.status = ProjectStatus::Active;
            project.deleted_at = None;
            lists.active.insert(0, project);
            Ok(())
        })?;
        tracing::info!(project_id = %id, "project restored");
        Ok(())
    }

    /// Remove a trashed project for good, after confirmation
    ///
    /// Ids not in the trash are a no-op: no question, no error.
    ///
    /// # Errors
    /// Storage failures
    pub async fn permanently_delete(
        &self,
        id: ProjectId,
        confirm: &dyn Confirmation,
    ) -> Result<Outcome, LifecycleError> {
        let name = {
            let lists = self.lists.lock();
            lists.trash.iter().find(|p| p.id() == id).map(|p| p.name.clone())
        };
        let Some(name) = name else {
            tracing::debug!(project_id = %id, "permanent delete of absent project ignored");
            return Ok(Outcome::NoOp);
        };

        if !confirm
            .confirm(ConfirmationRequest::PermanentDelete {
                project_id: id,
                name,
            })
            .await
        {
            tracing::debug!(project_id = %id, "permanent delete declined");
            return Ok(Outcome::Declined);
        }

        let removed = self.mutate(|lists| Ok(lists.take_trashed(id).is_some()))?;
        if removed {
            tracing::info!(project_id = %id, "project permanently deleted");
            Ok(Outcome::Applied(1))
        } else {
            Ok(Outcome::NoOp)
        }
    }

    /// Remove every trashed project behind one confirmation
    ///
    /// An empty trash is a no-op. Only projects that were in the trash when
    /// the question was asked are removed.
    ///
    /// # Errors
    /// Storage failures
    pub async fn empty_trash(
        &self,
        confirm: &dyn Confirmation,
    ) -> Result<Outcome, LifecycleError> {
        let doomed: HashSet<ProjectId> = {
            let lists = self.lists.lock();
            lists.trash.iter().map(Project::id).collect()
        };
        if doomed.is_empty() {
            return Ok(Outcome::NoOp);
        }
        if !confirm
            .confirm(ConfirmationRequest::EmptyTrash {
                count: doomed.len(),
            })
            .await
        {
            tracing::debug!(count = doomed.len(), "empty trash declined");
            return Ok(Outcome::Declined);
        }

        let removed = self.mutate(|lists| {
            let before = lists.trash.len();
            lists.trash.retain(|p| !doomed.contains(&p.id()));
            Ok(before - lists.trash.len())
        })?;
        tracing::info!(removed, "trash emptied");
        Ok(Outcome::Applied(removed))
    }

    /// Store a saved record in the cached project and bump `last_modified`
    ///
    /// # Errors
    /// [`LifecycleError::NotFound`] plus storage failures
    pub fn update_record(
        &self,
        id: ProjectId,
        record: AnalysisRecord,
    ) -> Result<(), LifecycleError> {
        self.mutate(|lists| {
            let project = lists
                .active
                .iter_mut()
                .chain(lists.trash.iter_mut())
                .find(|p| p.id() == id)
                .ok_or(LifecycleError::NotFound(id))?;
            project.record = record;
            project.last_modified = Utc::now();
            Ok(())
        })
    }

    /// Replace both lists with the gateway's view
    ///
    /// Duplicates are dropped the same way [`Self::open`] drops them.
    ///
    /// # Errors
    /// Gateway and storage failures; the cache is unchanged on error
    pub async fn hydrate(&self, gateway: &dyn PersistenceGateway) -> Result<(), LifecycleError> {
        let active = gateway.list_active().await?;
        let trash = gateway.list_trash().await?;
        let (fresh, _) = ProjectLists::reconcile(active, trash);

        self.mutate(|lists| {
            *lists = fresh;
            Ok(())
        })?;
        let lists = self.lists.lock();
        tracing::info!(
            active = lists.active.len(),
            trash = lists.trash.len(),
            "project lists hydrated"
        );
        Ok(())
    }

    /// Register a project with the gateway, then add it locally
    ///
    /// # Errors
    /// Gateway failures (nothing is added locally) plus [`Self::create`]'s
    pub async fn create_remote(
        &self,
        gateway: &dyn PersistenceGateway,
        project: Project,
    ) -> Result<ProjectId, LifecycleError> {
        gateway.create_project(&project).await?;
        self.create(project)
    }

    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut ProjectLists) -> Result<R, LifecycleError>,
    ) -> Result<R, LifecycleError> {
        let mut lists = self.lists.lock();
        let mut staged = lists.clone();
        let result = f(&mut staged)?;
        self.persist(&staged, Some(lists.active.as_slice()))?;
        *lists = staged;
        Ok(result)
    }

    /// Write both keys, active first
    ///
    /// If the trash write fails after the active write succeeded, the
    /// active key is put back to `previous_active` so the stored pair
    /// stays consistent.
    fn persist(
        &self,
        lists: &ProjectLists,
        previous_active: Option<&[Project]>,
    ) -> Result<(), LifecycleError> {
        let active = serde_json::to_string(&lists.active).map_err(LifecycleError::Encode)?;
        let trash = serde_json::to_string(&lists.trash).map_err(LifecycleError::Encode)?;
        self.kv.put(&self.keys.active, &active)?;
        if let Err(err) = self.kv.put(&self.keys.trash, &trash) {
            if let Some(previous) = previous_active {
                self.restore_active(previous);
            }
            return Err(err.into());
        }
        Ok(())
    }

    fn restore_active(&self, previous: &[Project]) {
        let restored = serde_json::to_string(previous)
            .map_err(LifecycleError::Encode)
            .and_then(|raw| Ok(self.kv.put(&self.keys.active, &raw)?));
        if let Err(error) = restored {
            tracing::warn!(
                key = %self.keys.active,
                %error,
                "could not roll back active list after failed trash write"
            );
        }
    }
}

fn read_list(kv: &dyn KeyValueStore, key: &str) -> Result<Option<Vec<Project>>, LifecycleError> {
    kv.get(key)?
        .map(|raw| {
            serde_json::from_str(&raw).map_err(|source| LifecycleError::Corrupt {
                key: key.to_owned(),
                source,
            })
        })
        .transpose()
}
