//! Editing Session Manager
//!
//! Wraps a [`RecordHandle`] while a saved project is being edited: loads it
//! through the [`PersistenceGateway`], autosaves on a timer when the rolling
//! hash moves, and flushes or discards on exit.
//!
//! # Status machine
//!
//! ```text
//! Idle -> Loading -> Editing <-> Saving -> Saved -> Editing
//!            |          |           |
//!            +-> Error <+-----------+
//! ```
//!
//! Transitions are checked by [`validate_transition`]. State lives behind a
//! short `parking_lot` lock that is never held across an `.await`; gateway
//! calls run on spawned tasks so a dropped caller cannot strand the session
//! in Loading or Saving.

mod autosave;
mod state;

pub use state::{
    allowed_transitions, validate_transition, EditingSessionInfo, ErrorInfo, FailureKind,
    SaveOutcome, SaveTrigger, SessionEvent, SessionStatus,
};

use crate::confirm::{Confirmation, ConfirmationRequest};
use crate::error::{GatewayError, SessionError};
use crate::gateway::PersistenceGateway;
use autosave::AutosaveTask;
use parking_lot::Mutex;
use scat_record::{AnalysisRecord, Project, ProjectId, RecordHandle, RecordHash};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

const EVENT_CAPACITY: usize = 64;

/// Session timings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Time between autosave ticks
    pub autosave_interval: Duration,
    /// Bound on each gateway call
    pub gateway_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave_interval: Duration::from_secs(30),
            gateway_timeout: Some(Duration::from_secs(10)),
        }
    }
}

#[derive(Debug)]
struct SessionState {
    status: SessionStatus,
    project_id: Option<ProjectId>,
    last_synced_hash: Option<RecordHash>,
    error: Option<ErrorInfo>,
    loaded: bool,
    /// Bumped whenever the session returns to Idle; stale loads compare it
    generation: u64,
    autosave: Option<AutosaveTask>,
}

impl SessionState {
    fn is_dirty(&self, store: &RecordHandle) -> bool {
        self.loaded && self.last_synced_hash != Some(store.current_hash())
    }
}

pub(crate) struct SessionInner {
    store: RecordHandle,
    gateway: Arc<dyn PersistenceGateway>,
    config: SessionConfig,
    state: Mutex<SessionState>,
    status_tx: watch::Sender<SessionStatus>,
    events: broadcast::Sender<SessionEvent>,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(task) = self.state.get_mut().autosave.take() {
            task.cancel();
        }
    }
}

/// Resumable, autosaving edit of one saved project
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct EditingSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for EditingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditingSession")
            .field("status", &self.status())
            .field("project_id", &self.project_id())
            .finish_non_exhaustive()
    }
}

impl EditingSession {
    /// Create an idle session over `store`
    #[must_use]
    pub fn new(
        store: RecordHandle,
        gateway: Arc<dyn PersistenceGateway>,
        config: SessionConfig,
    ) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::Idle);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(SessionInner {
                store,
                gateway,
                config,
                state: Mutex::new(SessionState {
                    status: SessionStatus::Idle,
                    project_id: None,
                    last_synced_hash: None,
                    error: None,
                    loaded: false,
                    generation: 0,
                    autosave: None,
                }),
                status_tx,
                events,
            }),
        }
    }

    /// Record store this session edits
    #[inline]
    #[must_use]
    pub fn store(&self) -> &RecordHandle {
        &self.inner.store
    }

    /// Current status
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.inner.state.lock().status
    }

    /// Project being edited, kept through failures for [`Self::retry`]
    #[must_use]
    pub fn project_id(&self) -> Option<ProjectId> {
        self.inner.state.lock().project_id
    }

    /// Whether the store differs from the last record the gateway acknowledged
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.inner.state.lock().is_dirty(&self.inner.store)
    }

    /// Point-in-time view of the session
    #[must_use]
    pub fn snapshot(&self) -> EditingSessionInfo {
        let state = self.inner.state.lock();
        EditingSessionInfo {
            project_id: state.project_id,
            current_status: state.status,
            last_synced_hash: state.last_synced_hash,
            error_info: state.error.clone(),
            has_unsaved_changes: state.is_dirty(&self.inner.store),
        }
    }

    /// Receive session events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Watch the status
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Load `project_id` into the store and start editing
    ///
    /// On failure the session moves to Error, keeps the id for
    /// [`Self::retry`] and leaves the store untouched.
    ///
    /// # Errors
    /// - [`SessionError::InvalidState`] unless Idle
    /// - [`SessionError::Load`] if the gateway fails
    /// - [`SessionError::Cancelled`] if the session was stopped meanwhile
    pub async fn start_editing(&self, project_id: ProjectId) -> Result<Project, SessionError> {
        let generation = {
            let mut state = self.inner.state.lock();
            if state.status != SessionStatus::Idle {
                return Err(SessionError::InvalidState {
                    operation: "start editing",
                    status: state.status,
                });
            }
            state.project_id = Some(project_id);
            state.loaded = false;
            state.last_synced_hash = None;
            state.error = None;
            self.inner.transition(&mut state, SessionStatus::Loading)?;
            state.generation
        };
        tracing::info!(%project_id, "loading project");
        SessionInner::run_detached(&self.inner, move |inner| async move {
            inner.finish_load(project_id, generation).await
        })
        .await
    }

    /// Save now if there are unsaved changes
    ///
    /// Allowed from Editing, and from Error after a failed save.
    ///
    /// # Errors
    /// - [`SessionError::InvalidState`] when no record is loaded
    /// - [`SessionError::Save`] if the gateway fails
    pub async fn save_now(&self) -> Result<SaveOutcome, SessionError> {
        SessionInner::save(&self.inner, SaveTrigger::Explicit).await
    }

    /// Recover from Error
    ///
    /// Re-loads when the failure happened before anything was loaded,
    /// otherwise re-sends the record (or returns to Editing if it is clean).
    ///
    /// # Errors
    /// [`SessionError::InvalidState`] unless in Error, plus load/save errors
    pub async fn retry(&self) -> Result<(), SessionError> {
        let reload = {
            let mut state = self.inner.state.lock();
            if state.status != SessionStatus::Error {
                return Err(SessionError::InvalidState {
                    operation: "retry",
                    status: state.status,
                });
            }
            match (state.loaded, state.project_id) {
                (false, Some(project_id)) => {
                    state.error = None;
                    self.inner.transition(&mut state, SessionStatus::Loading)?;
                    Some((project_id, state.generation))
                }
                (false, None) => {
                    return Err(SessionError::InvalidState {
                        operation: "retry without a project",
                        status: state.status,
                    })
                }
                (true, _) => None,
            }
        };

        match reload {
            Some((project_id, generation)) => {
                tracing::info!(%project_id, "retrying load");
                SessionInner::run_detached(&self.inner, move |inner| async move {
                    inner.finish_load(project_id, generation).await
                })
                .await
                .map(|_| ())
            }
            None => SessionInner::save(&self.inner, SaveTrigger::Retry)
                .await
                .map(|_| ()),
        }
    }

    /// Leave the editor
    ///
    /// Cancels autosave, waits for an in-flight save to settle, then (unless
    /// `discard`) makes one final save of unsaved changes before returning
    /// to Idle. If that final save fails the session stays in Error with the
    /// record intact and the error is returned.
    ///
    /// # Errors
    /// [`SessionError::Save`] from the final save
    pub async fn stop_editing(&self, discard: bool) -> Result<(), SessionError> {
        {
            let mut state = self.inner.state.lock();
            if state.status == SessionStatus::Idle {
                return Ok(());
            }
            if let Some(task) = state.autosave.take() {
                task.cancel();
            }
        }

        loop {
            self.wait_until_settled().await;
            if discard || !self.has_unsaved_changes() {
                break;
            }
            match SessionInner::save(&self.inner, SaveTrigger::Stop).await? {
                SaveOutcome::InFlight => continue,
                SaveOutcome::Saved(_) | SaveOutcome::Clean => break,
            }
        }

        let mut state = self.inner.state.lock();
        if state.status == SessionStatus::Idle {
            return Ok(());
        }
        if state.status == SessionStatus::Saving {
            // A save slipped in after the final check; let the caller retry.
            return Err(SessionError::InvalidState {
                operation: "stop editing",
                status: state.status,
            });
        }
        let project_id = state.project_id;
        let discarded = discard && state.is_dirty(&self.inner.store);
        if state.status == SessionStatus::Saved {
            self.inner.transition(&mut state, SessionStatus::Editing)?;
        }
        self.inner.transition(&mut state, SessionStatus::Idle)?;
        state.project_id = None;
        state.last_synced_hash = None;
        state.error = None;
        state.loaded = false;
        state.generation += 1;
        drop(state);

        tracing::info!(?project_id, discarded, "editing stopped");
        self.inner.publish(SessionEvent::Stopped {
            project_id,
            discarded,
        });
        Ok(())
    }

    /// Whether the user may leave the editor now
    ///
    /// `true` when there is nothing unsaved; otherwise the answer of
    /// `confirm`. Never changes session state.
    pub async fn can_exit(&self, confirm: &dyn Confirmation) -> bool {
        let pending = {
            let state = self.inner.state.lock();
            state
                .is_dirty(&self.inner.store)
                .then_some(state.project_id)
                .flatten()
        };
        match pending {
            None => true,
            Some(project_id) => {
                let approved = confirm
                    .confirm(ConfirmationRequest::DiscardUnsavedChanges { project_id })
                    .await;
                if !approved {
                    tracing::debug!(%project_id, "exit declined with unsaved changes");
                }
                approved
            }
        }
    }

    async fn wait_until_settled(&self) {
        let mut status = self.inner.status_tx.subscribe();
        // The sender lives in `inner`, which we hold, so this cannot fail.
        let _ = status.wait_for(|s| *s != SessionStatus::Saving).await;
    }
}

impl SessionInner {
    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Validate and apply a status change, then manage the autosave loop:
    /// running in Editing, kept through Saving and Saved, cancelled otherwise
    fn transition(
        self: &Arc<Self>,
        state: &mut SessionState,
        to: SessionStatus,
    ) -> Result<(), SessionError> {
        let from = state.status;
        validate_transition(from, to)?;
        state.status = to;
        self.status_tx.send_replace(to);
        tracing::debug!(%from, %to, "session status changed");
        self.publish(SessionEvent::StatusChanged { from, to });

        match to {
            SessionStatus::Editing => {
                if state.autosave.is_none() {
                    state.autosave = Some(AutosaveTask::spawn(
                        Arc::downgrade(self),
                        self.config.autosave_interval,
                    ));
                }
            }
            SessionStatus::Saving | SessionStatus::Saved => {}
            SessionStatus::Idle | SessionStatus::Loading | SessionStatus::Error => {
                if let Some(task) = state.autosave.take() {
                    task.cancel();
                }
            }
        }
        Ok(())
    }

    async fn run_detached<F, Fut, T>(self: &Arc<Self>, f: F) -> Result<T, SessionError>
    where
        F: FnOnce(Arc<Self>) -> Fut,
        Fut: Future<Output = Result<T, SessionError>> + Send + 'static,
        T: Send + 'static,
    {
        tokio::spawn(f(Arc::clone(self)))
            .await
            .map_err(|_| SessionError::Cancelled)?
    }

    async fn call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        match self.config.gateway_timeout {
            Some(after) => tokio::time::timeout(after, fut)
                .await
                .map_err(|_| GatewayError::Timeout { operation, after })?,
            None => fut.await,
        }
    }

    async fn finish_load(
        self: Arc<Self>,
        project_id: ProjectId,
        generation: u64,
    ) -> Result<Project, SessionError> {
        let result = self.call("load", self.gateway.load(project_id)).await;

        let mut state = self.state.lock();
        if state.generation != generation || state.status != SessionStatus::Loading {
            tracing::debug!(%project_id, "discarding load for stopped session");
            return Err(SessionError::Cancelled);
        }
        match result {
            Ok(project) => {
                self.store.write(|store| store.load(project.record.clone()));
                let hash = self.store.current_hash();
                state.last_synced_hash = Some(hash);
                state.loaded = true;
                state.error = None;
                self.transition(&mut state, SessionStatus::Editing)?;
                drop(state);
                tracing::info!(%project_id, hash = %hash.short(), "project loaded");
                self.publish(SessionEvent::Loaded { project_id, hash });
                Ok(project)
            }
            Err(err) => {
                state.error = Some(ErrorInfo {
                    kind: FailureKind::Load,
                    message: err.to_string(),
                    retryable: err.is_retryable(),
                });
                self.transition(&mut state, SessionStatus::Error)?;
                drop(state);
                tracing::warn!(%project_id, error = %err, "failed to load project");
                self.publish(SessionEvent::LoadFailed {
                    project_id,
                    message: err.to_string(),
                });
                Err(SessionError::Load(err))
            }
        }
    }

    async fn autosave_tick(self: Arc<Self>) {
        {
            let state = self.state.lock();
            if state.status != SessionStatus::Editing {
                tracing::debug!(status = %state.status, "autosave tick skipped");
                return;
            }
            if !state.is_dirty(&self.store) {
                tracing::debug!("autosave tick: nothing to save");
                return;
            }
        }
        // Failures are logged and published by the save itself.
        let _ = Self::save(&self, SaveTrigger::Autosave).await;
    }

    async fn save(
        self: &Arc<Self>,
        trigger: SaveTrigger,
    ) -> Result<SaveOutcome, SessionError> {
        let (project_id, record, hash) = {
            let mut state = self.state.lock();
            match state.status {
                SessionStatus::Saving => {
                    tracing::debug!(?trigger, "save requested while another is in flight");
                    return Ok(SaveOutcome::InFlight);
                }
                SessionStatus::Editing | SessionStatus::Saved => {}
                SessionStatus::Error if state.loaded && trigger != SaveTrigger::Autosave => {}
                status => {
                    return Err(SessionError::InvalidState {
                        operation: "save",
                        status,
                    })
                }
            }
            let Some(project_id) = state.project_id else {
                return Err(SessionError::InvalidState {
                    operation: "save",
                    status: state.status,
                });
            };
            if !state.is_dirty(&self.store) {
                if state.status == SessionStatus::Error {
                    state.error = None;
                    self.transition(&mut state, SessionStatus::Editing)?;
                }
                return Ok(SaveOutcome::Clean);
            }
            if state.status == SessionStatus::Saved {
                self.transition(&mut state, SessionStatus::Editing)?;
            }
            let (record, hash) = self.store.snapshot();
            self.transition(&mut state, SessionStatus::Saving)?;
            (project_id, record, hash)
        };
        tracing::debug!(%project_id, ?trigger, hash = %hash.short(), "saving record");

        Self::run_detached(self, move |inner| async move {
            inner.finish_save(project_id, record, hash, trigger).await
        })
        .await
    }

    async fn finish_save(
        self: Arc<Self>,
        project_id: ProjectId,
        record: AnalysisRecord,
        hash: RecordHash,
        trigger: SaveTrigger,
    ) -> Result<SaveOutcome, SessionError> {
        let result = self.call("save", self.gateway.save(project_id, &record)).await;

        let mut state = self.state.lock();
        match result {
            Ok(_) => {
                state.last_synced_hash = Some(hash);
                state.error = None;
                self.transition(&mut state, SessionStatus::Saved)?;
                self.transition(&mut state, SessionStatus::Editing)?;
                drop(state);
                tracing::info!(%project_id, ?trigger, hash = %hash.short(), "record saved");
                self.publish(SessionEvent::Saved {
                    project_id,
                    hash,
                    trigger,
                });
                Ok(SaveOutcome::Saved(hash))
            }
            Err(err) => {
                state.error = Some(ErrorInfo {
                    kind: FailureKind::Save,
                    message: err.to_string(),
                    retryable: err.is_retryable(),
                });
                self.transition(&mut state, SessionStatus::Error)?;
                drop(state);
                tracing::warn!(%project_id, ?trigger, error = %err, "failed to save record");
                self.publish(SessionEvent::SaveFailed {
                    project_id,
                    message: err.to_string(),
                    trigger,
                });
                Err(SessionError::Save(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::MockConfirmation;
    use crate::gateway::{MockPersistenceGateway, SaveAck};
    use scat_record::{ItemDetail, ItemId, SectionKey};

    fn project() -> Project {
        Project::new("Conveyor pinch")
    }

    fn gateway_loading(project: Project) -> MockPersistenceGateway {
        let mut gateway = MockPersistenceGateway::new();
        gateway
            .expect_load()
            .returning(move |_| Ok(project.clone()));
        gateway
    }

    fn session(gateway: MockPersistenceGateway) -> EditingSession {
        EditingSession::new(
            RecordHandle::default(),
            Arc::new(gateway),
            SessionConfig {
                autosave_interval: Duration::from_secs(30),
                gateway_timeout: None,
            },
        )
    }

    fn edit(session: &EditingSession) {
        session
            .store()
            .write(|s| {
                s.commit_item_detail(
                    SectionKey::BasicCauses,
                    ItemId(2),
                    ItemDetail::new().with_comments("fatigue"),
                )
            })
            .unwrap();
    }

    #[tokio::test]
    async fn load_enters_editing_clean() {
        let project = project();
        let session = session(gateway_loading(project.clone()));
        session.start_editing(project.id()).await.unwrap();
        assert_eq!(session.status(), SessionStatus::Editing);
        assert!(!session.has_unsaved_changes());
        assert_eq!(session.project_id(), Some(project.id()));
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let project = project();
        let session = session(gateway_loading(project.clone()));
        session.start_editing(project.id()).await.unwrap();
        assert!(matches!(
            session.start_editing(project.id()).await,
            Err(SessionError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn clean_save_sends_nothing() {
        let project = project();
        let mut gateway = gateway_loading(project.clone());
        gateway.expect_save().never();
        let session = session(gateway);
        session.start_editing(project.id()).await.unwrap();
        assert_eq!(session.save_now().await.unwrap(), SaveOutcome::Clean);
    }

    #[tokio::test]
    async fn failed_save_keeps_record_and_sync_point() {
        let project = project();
        let mut gateway = gateway_loading(project.clone());
        gateway
            .expect_save()
            .times(1)
            .returning(|_, _| Err(GatewayError::Unavailable("offline".into())));
        let session = session(gateway);
        session.start_editing(project.id()).await.unwrap();
        let synced = session.snapshot().last_synced_hash;
        edit(&session);
        let edited = session.store().current_hash();

        let err = session.save_now().await.unwrap_err();
        assert!(matches!(err, SessionError::Save(_)));
        let info = session.snapshot();
        assert_eq!(info.current_status, SessionStatus::Error);
        assert_eq!(info.last_synced_hash, synced);
        assert_eq!(info.error_info.unwrap().kind, FailureKind::Save);
        assert_eq!(session.store().current_hash(), edited);
    }

    #[tokio::test]
    async fn retry_after_failed_save_resends() {
        let project = project();
        let mut gateway = gateway_loading(project.clone());
        let mut seq = mockall::Sequence::new();
        gateway
            .expect_save()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(GatewayError::Unavailable("offline".into())));
        gateway
            .expect_save()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|id, _| Ok(SaveAck { project_id: id }));
        let session = session(gateway);
        session.start_editing(project.id()).await.unwrap();
        edit(&session);
        assert!(session.save_now().await.is_err());

        session.retry().await.unwrap();
        assert_eq!(session.status(), SessionStatus::Editing);
        assert!(!session.has_unsaved_changes());
    }

    #[tokio::test]
    async fn can_exit_asks_only_when_dirty() {
        let project = project();
        let session = session(gateway_loading(project.clone()));
        session.start_editing(project.id()).await.unwrap();

        let mut never = MockConfirmation::new();
        never.expect_confirm().never();
        assert!(session.can_exit(&never).await);

        edit(&session);
        let mut decline = MockConfirmation::new();
        decline
            .expect_confirm()
            .withf(|request| matches!(request, ConfirmationRequest::DiscardUnsavedChanges { .. }))
            .times(1)
            .returning(|_| false);
        let before = session.snapshot();
        assert!(!session.can_exit(&decline).await);
        assert_eq!(session.snapshot(), before);
    }

    #[tokio::test]
    async fn discard_stop_skips_final_save() {
        let project = project();
        let mut gateway = gateway_loading(project.clone());
        gateway.expect_save().never();
        let session = session(gateway);
        let mut events = session.subscribe();
        session.start_editing(project.id()).await.unwrap();
        edit(&session);

        session.stop_editing(true).await.unwrap();
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.project_id(), None);

        let mut stopped = None;
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::Stopped { discarded, .. } = event {
                stopped = Some(discarded);
            }
        }
        assert_eq!(stopped, Some(true));
    }

    #[tokio::test]
    async fn autosave_stops_when_leaving_editing() {
        let project = project();
        let session = session(gateway_loading(project.clone()));
        session.start_editing(project.id()).await.unwrap();
        assert!(session.inner.state.lock().autosave.is_some());

        session.stop_editing(false).await.unwrap();
        assert!(session.inner.state.lock().autosave.is_none());
    }

    #[tokio::test]
    async fn failed_load_keeps_project_for_retry() {
        let project = project();
        let id = project.id();
        let mut gateway = MockPersistenceGateway::new();
        let mut seq = mockall::Sequence::new();
        gateway
            .expect_load()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|id| Err(GatewayError::NotFound(id)));
        gateway
            .expect_load()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(project.clone()));
        let session = session(gateway);
        let untouched = session.store().current_hash();

        assert!(matches!(
            session.start_editing(id).await,
            Err(SessionError::Load(GatewayError::NotFound(_)))
        ));
        assert_eq!(session.status(), SessionStatus::Error);
        assert_eq!(session.project_id(), Some(id));
        assert_eq!(session.store().current_hash(), untouched);
        assert!(session.inner.state.lock().autosave.is_none());

        session.retry().await.unwrap();
        assert_eq!(session.status(), SessionStatus::Editing);
    }
}
