//! StatusTracker - actor that owns the GenerationStateMachine
//!
//! Every transition is persisted to the snapshot store and published on a
//! watch channel before the reply is sent, so a subscriber that reconnects
//! after a reload always sees the latest state.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info};

use super::machine::GenerationStateMachine;
use super::messages::{StateError, StateResponse, StatusCommand};
use super::snapshot::SnapshotStore;
use crate::domain::{GenerationRequest, GenerationStatus, StatusView, SurveyAnswers};

/// Handle to send commands to the StatusTracker
#[derive(Clone)]
pub struct StatusHandle {
    tx: mpsc::Sender<StatusCommand>,
    view_rx: watch::Receiver<StatusView>,
}

impl StatusHandle {
    /// Restore state from `store` and spawn the actor
    ///
    /// A restored request still `generating` after `budget` is failed here.
    pub fn spawn(store: Box<dyn SnapshotStore>, budget: Duration) -> StateResponse<Self> {
        debug!(budget_secs = budget.as_secs(), "StatusHandle::spawn: called");
        let mut machine = GenerationStateMachine::restore(store.load()?);
        if machine.expire_if_stale(budget, Utc::now()) {
            persist(store.as_ref(), &machine);
        }
        if let Some(request) = machine.request() {
            info!(request_id = %request.id, status = %request.status, "Restored generation snapshot");
        }

        let (tx, rx) = mpsc::channel(64);
        let (view_tx, view_rx) = watch::channel(machine.view());

        tokio::spawn(actor_loop(machine, store, rx, view_tx));

        Ok(Self { tx, view_rx })
    }

    async fn call<T>(&self, cmd: impl FnOnce(oneshot::Sender<T>) -> StatusCommand) -> StateResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(cmd(reply_tx))
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)
    }

    /// Begin a generation; legal only when idle
    pub async fn start(&self, survey: SurveyAnswers) -> StateResponse<GenerationRequest> {
        debug!("start: called");
        self.call(|reply| StatusCommand::Start { survey, reply }).await?
    }

    /// Apply a progress estimate, returning the status it was applied against
    pub async fn update_progress(&self, progress: u32) -> StateResponse<GenerationStatus> {
        self.call(|reply| StatusCommand::UpdateProgress { progress, reply })
            .await
    }

    pub async fn complete(&self, plan_id: impl Into<String>) -> StateResponse<()> {
        let plan_id = plan_id.into();
        debug!(%plan_id, "complete: called");
        self.call(|reply| StatusCommand::Complete { plan_id, reply }).await?
    }

    pub async fn fail(&self, message: impl Into<String>) -> StateResponse<()> {
        let message = message.into();
        debug!(%message, "fail: called");
        self.call(|reply| StatusCommand::Fail { message, reply }).await?
    }

    pub async fn reset(&self) -> StateResponse<()> {
        debug!("reset: called");
        self.call(|reply| StatusCommand::Reset { reply }).await
    }

    pub async fn view(&self) -> StateResponse<StatusView> {
        self.call(|reply| StatusCommand::View { reply }).await
    }

    /// The full persisted request, if any
    pub async fn snapshot(&self) -> StateResponse<Option<GenerationRequest>> {
        self.call(|reply| StatusCommand::Snapshot { reply }).await
    }

    /// Watch the status surface; dropping the receiver never affects generation
    pub fn subscribe(&self) -> watch::Receiver<StatusView> {
        self.view_rx.clone()
    }
}

fn persist(store: &dyn SnapshotStore, machine: &GenerationStateMachine) {
    let result = match machine.request() {
        Some(request) => store.save(request),
        None => store.clear(),
    };
    if let Err(e) = result {
        error!(error = %e, "Failed to persist generation snapshot");
    }
}

async fn actor_loop(
    mut machine: GenerationStateMachine,
    store: Box<dyn SnapshotStore>,
    mut rx: mpsc::Receiver<StatusCommand>,
    view_tx: watch::Sender<StatusView>,
) {
    debug!("StatusTracker actor started");

    while let Some(cmd) = rx.recv().await {
        let before = machine.clone();

        match cmd {
            StatusCommand::Start { survey, reply } => {
                debug!("actor_loop: Start command");
                let result = machine.start_generation(survey).cloned();
                let _ = reply.send(result);
            }

            StatusCommand::UpdateProgress { progress, reply } => {
                machine.update_progress(progress);
                let _ = reply.send(machine.status());
            }

            StatusCommand::Complete { plan_id, reply } => {
                debug!(%plan_id, "actor_loop: Complete command");
                let _ = reply.send(machine.complete(plan_id));
            }

            StatusCommand::Fail { message, reply } => {
                debug!("actor_loop: Fail command");
                let _ = reply.send(machine.fail(message));
            }

            StatusCommand::Reset { reply } => {
                debug!("actor_loop: Reset command");
                machine.reset();
                let _ = reply.send(());
            }

            StatusCommand::View { reply } => {
                let _ = reply.send(machine.view());
            }

            StatusCommand::Snapshot { reply } => {
                let _ = reply.send(machine.request().cloned());
            }
        }

        if machine != before {
            persist(store.as_ref(), &machine);
            view_tx.send_replace(machine.view());
        }
    }

    debug!("StatusTracker actor stopped");
}
