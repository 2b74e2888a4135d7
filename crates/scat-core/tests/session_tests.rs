//! Editing session behavior against an in-memory gateway

use scat_core::{
    EditingSession, GatewayError, SaveOutcome, SaveTrigger, SessionConfig, SessionError,
    SessionEvent, SessionStatus,
};
use scat_record::RecordHandle;
use scat_test_utils::{
    edit_basic_cause, init_tracing, sample_project, sample_record, test_session, InMemoryGateway,
    ScriptedConfirmation,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

const AUTOSAVE: Duration = Duration::from_secs(5);

async fn editing(record_name: &str) -> (Arc<InMemoryGateway>, EditingSession) {
    init_tracing();
    let project = sample_project(record_name).with_record(sample_record());
    let id = project.id();
    let gateway = Arc::new(InMemoryGateway::new().with_project(project));
    let session = test_session(gateway.clone(), AUTOSAVE);
    session.start_editing(id).await.unwrap();
    (gateway, session)
}

async fn next_saved(events: &mut broadcast::Receiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            match events.recv().await.unwrap() {
                event @ (SessionEvent::Saved { .. } | SessionEvent::SaveFailed { .. }) => {
                    return event
                }
                _ => continue,
            }
        }
    })
    .await
    .expect("no save event")
}

async fn wait_for_status(session: &EditingSession, status: SessionStatus) {
    let mut rx = session.watch_status();
    tokio::time::timeout(Duration::from_secs(60), rx.wait_for(|s| *s == status))
        .await
        .expect("status not reached")
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn loaded_record_matches_gateway() {
    let (gateway, session) = editing("Ladder fall").await;
    let id = session.project_id().unwrap();
    let stored = gateway.project(id).unwrap().record;

    assert_eq!(session.store().read(|s| s.record().clone()), stored);
    let info = session.snapshot();
    assert_eq!(info.current_status, SessionStatus::Editing);
    assert_eq!(info.last_synced_hash, Some(stored.content_hash()));
    assert!(!info.has_unsaved_changes);
}

#[tokio::test(start_paused = true)]
async fn autosave_only_sends_dirty_records() {
    let (gateway, session) = editing("Forklift").await;
    let mut events = session.subscribe();

    tokio::time::sleep(AUTOSAVE * 3).await;
    assert_eq!(gateway.save_attempts(), 0);

    edit_basic_cause(&session, 7, "poor supervision");
    let edited = session.store().current_hash();
    match next_saved(&mut events).await {
        SessionEvent::Saved { hash, trigger, .. } => {
            assert_eq!(hash, edited);
            assert_eq!(trigger, SaveTrigger::Autosave);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(gateway.save_count(), 1);
    assert!(!session.has_unsaved_changes());

    tokio::time::sleep(AUTOSAVE * 3).await;
    assert_eq!(gateway.save_attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn explicit_save_during_save_reports_in_flight() {
    let (gateway, session) = editing("Spill").await;
    gateway.hold_saves();
    edit_basic_cause(&session, 2, "rushed");
    let first_hash = session.store().current_hash();

    let first = tokio::spawn({
        let session = session.clone();
        async move { session.save_now().await }
    });
    wait_for_status(&session, SessionStatus::Saving).await;

    assert_eq!(session.save_now().await.unwrap(), SaveOutcome::InFlight);

    // Edits made while saving are not covered by the save in flight.
    edit_basic_cause(&session, 4, "no training");
    gateway.release_saves(1);

    assert_eq!(first.await.unwrap().unwrap(), SaveOutcome::Saved(first_hash));
    assert_eq!(session.status(), SessionStatus::Editing);
    assert_eq!(session.snapshot().last_synced_hash, Some(first_hash));
    assert!(session.has_unsaved_changes());
    assert_eq!(gateway.save_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_waits_for_in_flight_save_then_flushes() {
    let (gateway, session) = editing("Conveyor").await;
    gateway.hold_saves();
    edit_basic_cause(&session, 2, "first");

    let saving = tokio::spawn({
        let session = session.clone();
        async move { session.save_now().await }
    });
    wait_for_status(&session, SessionStatus::Saving).await;
    edit_basic_cause(&session, 3, "second");
    let final_hash = session.store().current_hash();

    let stopping = tokio::spawn({
        let session = session.clone();
        async move { session.stop_editing(false).await }
    });
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(!stopping.is_finished());

    gateway.release_saves(2);
    saving.await.unwrap().unwrap();
    stopping.await.unwrap().unwrap();

    assert_eq!(session.status(), SessionStatus::Idle);
    let saves = gateway.saves();
    assert_eq!(saves.len(), 2);
    assert_eq!(saves[1].hash, final_hash);
    assert_eq!(saves[1].record.content_hash(), final_hash);
}

#[tokio::test(start_paused = true)]
async fn stop_makes_one_final_save() {
    let (gateway, session) = editing("Scaffold").await;
    let mut events = session.subscribe();
    edit_basic_cause(&session, 9, "fatigue");
    let edited = session.store().read(|s| s.record().clone());

    session.stop_editing(false).await.unwrap();

    assert_eq!(session.status(), SessionStatus::Idle);
    assert_eq!(session.project_id(), None);
    assert_eq!(gateway.save_count(), 1);
    let id = gateway.saves()[0].project_id;
    assert_eq!(gateway.project(id).unwrap().record, edited);

    let mut triggers = Vec::new();
    let mut stopped = None;
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::Saved { trigger, .. } => triggers.push(trigger),
            SessionEvent::Stopped { discarded, .. } => stopped = Some(discarded),
            _ => {}
        }
    }
    assert_eq!(triggers, vec![SaveTrigger::Stop]);
    assert_eq!(stopped, Some(false));

    // No autosave after stopping.
    edit_basic_cause(&session, 10, "after stop");
    tokio::time::sleep(AUTOSAVE * 4).await;
    assert_eq!(gateway.save_attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_final_save_keeps_session_in_error() {
    let (gateway, session) = editing("Crane").await;
    edit_basic_cause(&session, 5, "worn cable");
    let edited = session.store().current_hash();
    gateway.fail_next_saves(1);

    let err = session.stop_editing(false).await.unwrap_err();
    assert!(matches!(err, SessionError::Save(GatewayError::Unavailable(_))));
    assert!(err.is_retryable());
    assert_eq!(session.status(), SessionStatus::Error);
    assert_eq!(session.store().current_hash(), edited);
    assert!(session.has_unsaved_changes());

    session.retry().await.unwrap();
    assert_eq!(session.status(), SessionStatus::Editing);
    session.stop_editing(false).await.unwrap();
    assert_eq!(session.status(), SessionStatus::Idle);
    assert_eq!(gateway.save_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_from_error_sends_the_latest_edit() {
    let (gateway, session) = editing("Mezzanine").await;
    let mut events = session.subscribe();

    edit_basic_cause(&session, 3, "missing rail");
    let autosaved = session.store().current_hash();
    assert!(matches!(
        next_saved(&mut events).await,
        SessionEvent::Saved { hash, trigger: SaveTrigger::Autosave, .. } if hash == autosaved
    ));

    edit_basic_cause(&session, 8, "no permit");
    let latest = session.store().current_hash();
    assert_ne!(latest, autosaved);
    gateway.fail_next_saves(1);
    assert!(session.save_now().await.is_err());
    let info = session.snapshot();
    assert_eq!(info.current_status, SessionStatus::Error);
    assert_eq!(info.last_synced_hash, Some(autosaved));
    assert!(info.has_unsaved_changes);

    session.stop_editing(false).await.unwrap();
    assert_eq!(session.status(), SessionStatus::Idle);
    let saves = gateway.saves();
    assert_eq!(saves.len(), 2);
    assert_eq!(saves[1].hash, latest);
    let id = saves[1].project_id;
    assert_eq!(gateway.project(id).unwrap().record.content_hash(), latest);
}

#[tokio::test(start_paused = true)]
async fn autosave_failure_moves_to_error_and_pauses_autosave() {
    let (gateway, session) = editing("Press").await;
    let mut events = session.subscribe();
    gateway.fail_next_saves(1);
    edit_basic_cause(&session, 1, "guard removed");

    assert!(matches!(
        next_saved(&mut events).await,
        SessionEvent::SaveFailed {
            trigger: SaveTrigger::Autosave,
            ..
        }
    ));
    assert_eq!(session.status(), SessionStatus::Error);

    tokio::time::sleep(AUTOSAVE * 4).await;
    assert_eq!(gateway.save_attempts(), 1);

    session.retry().await.unwrap();
    assert_eq!(gateway.save_count(), 1);
    assert!(!session.has_unsaved_changes());
}

#[tokio::test(start_paused = true)]
async fn slow_gateway_times_out() {
    init_tracing();
    let project = sample_project("Silo");
    let id = project.id();
    let gateway = Arc::new(InMemoryGateway::new().with_project(project));
    let session = EditingSession::new(
        RecordHandle::default(),
        gateway.clone(),
        SessionConfig {
            autosave_interval: Duration::from_secs(600),
            gateway_timeout: Some(Duration::from_secs(2)),
        },
    );
    session.start_editing(id).await.unwrap();

    gateway.set_latency(Some(Duration::from_secs(30)));
    edit_basic_cause(&session, 6, "confined space");
    let err = session.save_now().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Save(GatewayError::Timeout {
            operation: "save",
            ..
        })
    ));
    let info = session.snapshot();
    assert_eq!(info.current_status, SessionStatus::Error);
    assert!(info.error_info.unwrap().retryable);
    assert!(info.has_unsaved_changes);
}

#[tokio::test(start_paused = true)]
async fn declined_exit_changes_nothing() {
    let (gateway, session) = editing("Grinder").await;
    edit_basic_cause(&session, 8, "no goggles");
    let before = session.snapshot();

    let confirm = ScriptedConfirmation::new([false]);
    assert!(!session.can_exit(&confirm).await);
    assert_eq!(confirm.asked().len(), 1);
    assert_eq!(session.snapshot(), before);
    assert_eq!(gateway.save_attempts(), 0);

    let approve = ScriptedConfirmation::always(true);
    assert!(session.can_exit(&approve).await);
    assert_eq!(session.status(), SessionStatus::Editing);
}

#[tokio::test(start_paused = true)]
async fn load_finishing_after_stop_is_discarded() {
    init_tracing();
    let project = sample_project("Boiler").with_record(sample_record());
    let id = project.id();
    let gateway = Arc::new(InMemoryGateway::new().with_project(project));
    gateway.set_latency(Some(Duration::from_secs(5)));
    let session = test_session(gateway.clone(), AUTOSAVE);
    let untouched = session.store().current_hash();

    let loading = tokio::spawn({
        let session = session.clone();
        async move { session.start_editing(id).await }
    });
    wait_for_status(&session, SessionStatus::Loading).await;
    session.stop_editing(true).await.unwrap();
    assert_eq!(session.status(), SessionStatus::Idle);

    assert!(matches!(
        loading.await.unwrap(),
        Err(SessionError::Cancelled)
    ));
    assert_eq!(session.status(), SessionStatus::Idle);
    assert_eq!(session.store().current_hash(), untouched);
    assert_eq!(gateway.load_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_load_can_be_retried() {
    init_tracing();
    let project = sample_project("Trench").with_record(sample_record());
    let id = project.id();
    let gateway = Arc::new(InMemoryGateway::new().with_project(project));
    gateway.fail_next_loads(1);
    let session = test_session(gateway.clone(), AUTOSAVE);

    assert!(matches!(
        session.start_editing(id).await,
        Err(SessionError::Load(GatewayError::Unavailable(_)))
    ));
    assert_eq!(session.status(), SessionStatus::Error);
    assert!(matches!(
        session.save_now().await,
        Err(SessionError::InvalidState { .. })
    ));

    session.retry().await.unwrap();
    assert_eq!(session.status(), SessionStatus::Editing);
    assert_eq!(gateway.load_count(), 2);
    assert_eq!(
        session.snapshot().last_synced_hash,
        Some(sample_record().content_hash())
    );
}
