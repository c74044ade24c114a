//! Watch mode: dev server, live reload and incremental rebuilds.
//!
//! ```text
//! notify → Debouncer (300 ms quiet) → GroupRouter → worker per group → ReloadHub
//! ```
//!
//! Startup binds the HTTP and WebSocket servers and attaches the watches;
//! any failure there is fatal. Afterwards the loop runs until the shutdown
//! token fires, then stops the workers and servers.

mod debouncer;
mod error;
mod router;
mod types;
mod worker;

#[cfg(test)]
mod tests;

pub use error::WatchError;

use std::sync::Arc;

use notify::{RecursiveMode, Watcher};
use rustc_hash::FxHashMap;

use crate::config::AssetflowConfig;
use crate::core::{AssetGroup, ShutdownToken, set_watching};
use crate::reload::{self, ReloadHub};
use crate::serve::DevServer;
use crate::utils::path::display_slash;
use crate::{debug, log};
use debouncer::Debouncer;
use router::GroupRouter;
use worker::{RebuildFn, WorkerHandle};

/// Run watch mode until `shutdown` fires.
pub async fn run(config: Arc<AssetflowConfig>, shutdown: ShutdownToken) -> anyhow::Result<()> {
    // Local token so a failed startup can stop the threads it already began
    let local = ShutdownToken::new();
    {
        let (shutdown, local) = (shutdown.clone(), local.clone());
        tokio::spawn(async move {
            shutdown.cancelled().await;
            local.trigger();
        });
    }

    let result = watch(&config, &local).await;
    local.trigger();
    result
}

async fn watch(config: &Arc<AssetflowConfig>, shutdown: &ShutdownToken) -> anyhow::Result<()> {
    let router = GroupRouter::new(config).map_err(WatchError::from)?;

    let hub = ReloadHub::new();
    let ws_port = reload::server::start(
        config.serve.interface,
        config.serve.ws_port,
        hub.clone(),
        shutdown.clone(),
    )?;
    debug!("reload"; "ws://{}:{}", config.serve.interface, ws_port);
    let server = DevServer::start(config, ws_port)?;

    // Watcher-first: events buffer in the channel while workers start
    let (notify_tx, notify_rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = notify_tx.send(res);
    })
    .map_err(WatchError::Notify)?;

    for root in router.watch_roots() {
        if !root.is_dir() {
            debug!("watch"; "skipping missing {}", display_slash(&config.root_relative(&root)));
            continue;
        }
        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Watch {
                path: root.clone(),
                source,
            })?;
        debug!("watch"; "watching {}", display_slash(&config.root_relative(&root)));
    }

    let rebuild: RebuildFn = {
        let config = Arc::clone(config);
        Arc::new(move |group| crate::pipeline::run_group(group, &config))
    };
    let mut workers: FxHashMap<AssetGroup, WorkerHandle> = FxHashMap::default();
    let mut tasks = Vec::with_capacity(AssetGroup::WATCHED.len());
    for group in AssetGroup::WATCHED {
        let (handle, task) = worker::spawn(group, Arc::clone(&rebuild), hub.clone());
        workers.insert(group, handle);
        tasks.push(task);
    }

    // notify delivers on a std channel; bridge it into the async loop
    let (event_tx, mut event_rx) = tokio::sync::mpsc::channel::<notify::Event>(64);
    std::thread::spawn(move || {
        while let Ok(result) = notify_rx.recv() {
            match result {
                Ok(event) => {
                    if event_tx.blocking_send(event).is_err() {
                        break;
                    }
                }
                Err(e) => log!("watch"; "notify error: {}", e),
            }
        }
    });

    set_watching(true);
    log!("watch"; "watching for changes, press Ctrl+C to stop");

    let mut debouncer = Debouncer::new();
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            Some(event) = event_rx.recv() => debouncer.add_event(&event),
            _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                let Some(changes) = debouncer.take_if_ready() else { continue };
                for group in router.route(&changes) {
                    if let Some(worker) = workers.get(&group) {
                        worker.trigger();
                    }
                }
            }
        }
    }

    set_watching(false);
    drop(watcher);
    drop(workers);
    for task in tasks {
        let _ = task.await;
    }
    let _ = tokio::task::spawn_blocking(move || server.stop()).await;
    log!("watch"; "stopped");
    Ok(())
}
