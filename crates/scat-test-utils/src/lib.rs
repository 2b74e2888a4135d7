//! Test utilities for SCAT crates

#![allow(missing_docs)]

mod gateway;

pub use gateway::{InMemoryGateway, SavedRecord};

use async_trait::async_trait;
use parking_lot::Mutex;
use scat_core::{
    Confirmation, ConfirmationRequest, EditingSession, KeyValueStore, MemoryKeyValueStore,
    SessionConfig, StorageError,
};
use scat_record::{
    AnalysisRecord, EvaluationSection, IncidentDetails, ItemDetail, ItemId, Project, Rating,
    RecordHandle, SectionKey, SelectionSection, Tag,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Confirmation that answers from a script and records every question
#[derive(Debug, Default)]
pub struct ScriptedConfirmation {
    answers: Mutex<VecDeque<bool>>,
    fallback: bool,
    asked: Mutex<Vec<ConfirmationRequest>>,
}

impl ScriptedConfirmation {
    /// Answer with `answers` in order, then `false`
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            fallback: false,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn always(answer: bool) -> Self {
        Self {
            fallback: answer,
            ..Self::default()
        }
    }

    pub fn asked(&self) -> Vec<ConfirmationRequest> {
        self.asked.lock().clone()
    }
}

#[async_trait]
impl Confirmation for ScriptedConfirmation {
    async fn confirm(&self, request: ConfirmationRequest) -> bool {
        self.asked.lock().push(request);
        self.answers.lock().pop_front().unwrap_or(self.fallback)
    }
}

/// Key-value store whose writes can be made to fail
#[derive(Debug, Default)]
pub struct FlakyKeyValueStore {
    inner: MemoryKeyValueStore,
    failing: AtomicBool,
    refused_key: Mutex<Option<String>>,
    writes: AtomicUsize,
}

impl FlakyKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Refuse writes to `key` only; `None` lifts the restriction
    pub fn fail_writes_to(&self, key: Option<&str>) {
        *self.refused_key.lock() = key.map(str::to_owned);
    }

    /// Successful writes so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for FlakyKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let refused = self.refused_key.lock().as_deref() == Some(key);
        if refused || self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("write to {key} refused")));
        }
        self.inner.put(key, value)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Route `tracing` output to the test harness; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn sample_project(name: &str) -> Project {
    Project::new(name)
        .with_description("Test incident")
        .with_details(IncidentDetails {
            event: "Fall from height".into(),
            involved: "Maintenance technician".into(),
            area: "Warehouse B".into(),
            occurred_at: "2024-03-14 09:30".into(),
            investigator: "Safety officer".into(),
            other_data: String::new(),
        })
}

/// A record with every stage filled in
pub fn sample_record() -> AnalysisRecord {
    AnalysisRecord::new()
        .with_section(
            SectionKey::Evaluation,
            EvaluationSection {
                severity: Some(Rating::A),
                probability: Some(Rating::B),
                frequency: Some(Rating::C),
                observation: "Ladder without anti-slip feet".into(),
            },
        )
        .and_then(|r| r.with_section(SectionKey::Contact, SelectionSection::from_ids([ItemId(2)])))
        .and_then(|r| {
            r.with_section(
                SectionKey::ImmediateCauses,
                SelectionSection::new()
                    .with_item(ItemId(3), ItemDetail::new().with_comments("no harness")),
            )
        })
        .and_then(|r| {
            r.with_section(SectionKey::BasicCauses, SelectionSection::from_ids([ItemId(3)]))
        })
        .and_then(|r| {
            r.with_section(
                SectionKey::ControlNeeds,
                SelectionSection::new()
                    .with_item(ItemId(1), ItemDetail::new().with_sub_option(0).with_tag(0, Tag::P)),
            )
        })
        .unwrap()
}

pub fn session_config(autosave: Duration) -> SessionConfig {
    SessionConfig {
        autosave_interval: autosave,
        gateway_timeout: None,
    }
}

pub fn test_session(gateway: Arc<InMemoryGateway>, autosave: Duration) -> EditingSession {
    EditingSession::new(RecordHandle::default(), gateway, session_config(autosave))
}

/// Make a real edit in the basic causes stage
pub fn edit_basic_cause(session: &EditingSession, item: u32, comments: &str) {
    session
        .store()
        .write(|s| {
            s.commit_item_detail(
                SectionKey::BasicCauses,
                ItemId(item),
                ItemDetail::new().with_comments(comments),
            )
        })
        .unwrap();
}
