//! Per-group rebuild workers.
//!
//! Each watched group owns one worker fed by a channel of capacity one.
//! Runs of a group never overlap; triggers arriving during a run fill the
//! single slot and collapse into one follow-up run.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::core::{AssetGroup, ReloadPolicy};
use crate::logger::{status_error, status_success};
use crate::pipeline::{PipelineError, RunReport};
use crate::reload::{ReloadHub, ReloadMessage};
use crate::{debug, log};

/// Rebuilds one group; runs on the blocking pool.
pub type RebuildFn = Arc<dyn Fn(AssetGroup) -> Result<RunReport, PipelineError> + Send + Sync>;

/// Sending side of a worker.
pub struct WorkerHandle {
    group: AssetGroup,
    tx: mpsc::Sender<()>,
}

impl WorkerHandle {
    /// Request a rebuild. Returns `false` when the request was folded into
    /// one already pending.
    pub fn trigger(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                debug!(self.group.name(); "rebuild already pending");
                false
            }
            Err(TrySendError::Closed(())) => false,
        }
    }
}

/// Start the worker for `group`. It exits when its handle is dropped.
pub fn spawn(
    group: AssetGroup,
    rebuild: RebuildFn,
    hub: ReloadHub,
) -> (WorkerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(1);
    let task = tokio::spawn(run(group, rx, rebuild, hub));
    (WorkerHandle { group, tx }, task)
}

async fn run(group: AssetGroup, mut rx: mpsc::Receiver<()>, rebuild: RebuildFn, hub: ReloadHub) {
    let mut failing = false;

    while rx.recv().await.is_some() {
        let rebuild = Arc::clone(&rebuild);
        let messages = match tokio::task::spawn_blocking(move || rebuild(group)).await {
            Ok(Ok(report)) => {
                match report.error_message() {
                    None => status_success(&format!("{group} rebuilt")),
                    Some(detail) => status_error(&format!("{group} failed"), &detail),
                }
                messages_for(&report, &mut failing)
            }
            Ok(Err(e)) => {
                let message = format!("{:#}", anyhow::Error::from(e));
                log!("error"; "{}: {}", group, message);
                status_error(&format!("{group} failed"), &message);
                failing = true;
                vec![ReloadMessage::error(group.name(), message)]
            }
            Err(e) => {
                log!("error"; "{} rebuild panicked: {}", group, e);
                continue;
            }
        };

        for msg in &messages {
            hub.broadcast(msg);
        }
    }
    debug!(group.name(); "worker stopped");
}

/// Browser messages after a finished run.
///
/// Failures show the overlay and suppress the reload. The first success
/// after a failure clears the overlay before the group's usual update.
pub fn messages_for(report: &RunReport, failing: &mut bool) -> Vec<ReloadMessage> {
    if let Some(message) = report.error_message() {
        *failing = true;
        return vec![ReloadMessage::error(report.group.name(), message)];
    }

    let mut messages = Vec::new();
    if std::mem::take(failing) {
        messages.push(ReloadMessage::ClearError);
    }

    match report.group.reload_policy() {
        ReloadPolicy::Full => messages.push(ReloadMessage::reload(report.group.name())),
        ReloadPolicy::Inject => {
            // No stylesheet when the group has no sources left
            if let Some(css) = &report.injected {
                messages.push(ReloadMessage::css(&css.path, &css.content));
            }
        }
        ReloadPolicy::None => {}
    }
    messages
}
