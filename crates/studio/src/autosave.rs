//! Periodic background save of the studio session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::state::StudioState;

/// Running autosave task.
pub struct AutosaveHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    /// Stop the task and wait for an in-progress cycle to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            log::warn!("Autosave task ended abnormally: {}", e);
        }
    }
}

/// Start autosave at the configured interval.
///
/// Returns `None` in read-only mode, where there is nothing to save.
pub fn spawn_autosave(state: Arc<StudioState>) -> Option<AutosaveHandle> {
    let period = state.autosave_interval();
    spawn_with_period(state, period)
}

pub(crate) fn spawn_with_period(state: Arc<StudioState>, period: Duration) -> Option<AutosaveHandle> {
    if state.is_read_only() {
        log::debug!("Read-only studio; autosave disabled");
        return None;
    }

    let (shutdown, mut rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => run_cycle(&state).await,
                changed = rx.changed() => {
                    if changed.is_err() || *rx.borrow() {
                        break;
                    }
                }
            }
        }
        log::debug!("Autosave stopped");
    });

    log::debug!("Autosave every {:?}", period);
    Some(AutosaveHandle { shutdown, task })
}

/// One autosave attempt. Skipped while another save is in flight; a failed
/// save keeps the session dirty so the next cycle retries.
pub(crate) async fn run_cycle(state: &Arc<StudioState>) {
    let Some(guard) = state.try_begin_save() else {
        log::debug!("Autosave skipped; a save is already in flight");
        return;
    };

    let state = Arc::clone(state);
    let result = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        state.autosave()
    })
    .await;

    match result {
        Ok(Ok(Some(outcome))) => log::debug!("Autosaved session: {:?}", outcome),
        Ok(Ok(None)) => {}
        Ok(Err(e)) => log::warn!("Autosave failed, will retry: {}", e),
        Err(e) => log::warn!("Autosave worker failed: {}", e),
    }
}
