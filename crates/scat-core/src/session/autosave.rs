//! Autosave timer owned by a session

use super::SessionInner;
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Handle to a running autosave loop
///
/// Cancelling never interrupts a tick that is already saving; the loop
/// exits before the next tick.
#[derive(Debug)]
pub(crate) struct AutosaveTask {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl AutosaveTask {
    /// Spawn the loop; the first tick fires one `period` from now
    pub(crate) fn spawn(session: Weak<SessionInner>, period: Duration) -> Self {
        let (cancel, mut cancelled) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.changed() => break,
                    _ = ticker.tick() => {}
                }
                if *cancelled.borrow() {
                    break;
                }
                let Some(session) = session.upgrade() else {
                    break;
                };
                session.autosave_tick().await;
            }
            tracing::trace!("autosave loop exited");
        });
        Self { cancel, handle }
    }

    /// Stop the loop
    pub(crate) fn cancel(self) {
        self.cancel.send_replace(true);
        drop(self.handle);
    }
}
