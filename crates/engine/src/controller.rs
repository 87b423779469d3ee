// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller — the core of the core. Owns both slots, the port pool,
//! and the canary lifecycle state machine. Every mutating command is
//! enqueued on a single bounded channel and handled by one task, so the
//! state machine never needs to lock across a mutation; other tasks read
//! slot snapshots through an `Arc<parking_lot::Mutex<..>>` that only this
//! task ever writes to (spec §4.5, §9).
//!
//! The single-actor-over-one-channel shape follows the teacher's
//! `Runtime<S, A, N, C>` — one task owns all mutable state, commands
//! arrive on a channel, and each carries an optional reply so callers can
//! await an outcome without the actor blocking on them.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use vili_adapters::{Archiver, NotifyAdapter};
use vili_core::{Clock, FileSystem, InstanceId, PortPool, Slot, SlotKind};

use crate::error::ControllerError;
use crate::instance::{Instance, InstanceConfig, InstanceLauncher};
use crate::layout::{self, PropertiesOptions};

/// Minimum elapsed running-slot window before a comparison is evaluated.
pub const RUNNING_MIN_WINDOW: Duration = Duration::from_secs(60);
/// Minimum elapsed testing-slot window before a comparison is evaluated.
pub const TESTING_MIN_WINDOW: Duration = Duration::from_secs(5 * 60);
/// Promotion gate: testing is promoted once `Δ ≥` this value.
pub const PROMOTION_GATE: f64 = -0.25;
/// If testing reaches this age without promotion, its counters are reset
/// so a stale outlier measurement doesn't permanently block promotion.
pub const RESET_CEILING: Duration = Duration::from_secs(15 * 60);

/// What a slot holds beyond the bare `Instance`: the version directory
/// it was started from, needed to locate the properties file, the
/// archiver target, and the next `StartExisting` call's source.
pub struct SlotOccupant {
    pub instance: Arc<Instance>,
    pub version_dir: PathBuf,
}

/// Tagged command union processed one at a time by the controller's
/// event loop (spec §4.5).
#[derive(Debug)]
pub enum Command {
    AdoptNewVersion { artifact_path: PathBuf },
    StartExisting { slot: SlotKind, version_dir: PathBuf },
    Deploy,
    Restart { slot: SlotKind },
    /// Expansion: the proxy enqueues this after every mirrored response
    /// (and on an idle timer) instead of calling into controller state
    /// directly, so the comparison protocol stays on the same
    /// serialisation point as every other slot mutation.
    EvaluateReliability,
    Shutdown,
}

struct CommandEnvelope {
    command: Command,
    reply: oneshot::Sender<Result<(), ControllerError>>,
}

/// Static configuration for one controller instance.
pub struct ControllerConfig {
    pub working_dir: PathBuf,
    pub identifier: String,
    pub port_identifier: Option<String>,
    pub properties_file_name: Option<String>,
}

/// A cheap, cloneable front for the controller task: send commands and
/// await their outcome, or read a slot snapshot without going through
/// the channel at all.
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<CommandEnvelope>,
    running: Arc<Mutex<Slot<SlotOccupant>>>,
    testing: Arc<Mutex<Slot<SlotOccupant>>>,
}

impl ControllerHandle {
    async fn send(&self, command: Command) -> Result<(), ControllerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(CommandEnvelope { command, reply: reply_tx })
            .await
            .map_err(|_| ControllerError::Closed)?;
        reply_rx.await.map_err(|_| ControllerError::Closed)?
    }

    pub async fn adopt_new_version(&self, artifact_path: PathBuf) -> Result<(), ControllerError> {
        self.send(Command::AdoptNewVersion { artifact_path }).await
    }

    pub async fn start_existing(&self, slot: SlotKind, version_dir: PathBuf) -> Result<(), ControllerError> {
        self.send(Command::StartExisting { slot, version_dir }).await
    }

    pub async fn deploy(&self) -> Result<(), ControllerError> {
        self.send(Command::Deploy).await
    }

    pub async fn restart(&self, slot: SlotKind) -> Result<(), ControllerError> {
        self.send(Command::Restart { slot }).await
    }

    pub async fn evaluate_reliability(&self) -> Result<(), ControllerError> {
        self.send(Command::EvaluateReliability).await
    }

    pub async fn shutdown(&self) -> Result<(), ControllerError> {
        self.send(Command::Shutdown).await
    }

    /// Snapshot of the running instance, if any. Read under the per-slot
    /// mutex; never blocks on the controller's command queue.
    pub fn running_instance(&self) -> Option<Arc<Instance>> {
        self.running.lock().get().map(|occ| occ.instance.clone())
    }

    pub fn testing_instance(&self) -> Option<Arc<Instance>> {
        self.testing.lock().get().map(|occ| occ.instance.clone())
    }

    pub fn running_version_name(&self) -> Option<String> {
        self.running
            .lock()
            .get()
            .and_then(|occ| occ.version_dir.file_name().map(|n| n.to_string_lossy().into_owned()))
    }
}

/// The controller task itself. Not `Clone`; only reachable from its own
/// event loop and the [`ControllerHandle`]s that talk to it.
pub struct Controller<FS, N, C, L> {
    fs: Arc<FS>,
    notifier: Arc<N>,
    clock: C,
    launcher: Arc<L>,
    config: ControllerConfig,
    port_pool: Arc<PortPool>,
    running: Arc<Mutex<Slot<SlotOccupant>>>,
    testing: Arc<Mutex<Slot<SlotOccupant>>>,
    archiver_tx: mpsc::Sender<ArchiveJob>,
    cancel: CancellationToken,
}

struct ArchiveJob {
    version_dir: PathBuf,
    version_name: String,
}

/// Spawn the controller's event loop and its dedicated archiver task,
/// returning a handle other components use to submit commands.
#[allow(clippy::too_many_arguments)]
pub fn spawn<FS, N, C, L>(
    config: ControllerConfig,
    fs: Arc<FS>,
    notifier: Arc<N>,
    clock: C,
    launcher: Arc<L>,
    port_pool: Arc<PortPool>,
    archiver: Arc<Archiver>,
    cancel: CancellationToken,
) -> ControllerHandle
where
    FS: FileSystem + 'static,
    N: NotifyAdapter + 'static,
    C: Clock + 'static,
    L: InstanceLauncher + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (archive_tx, archive_rx) = mpsc::channel(16);

    spawn_archiver_task(archiver, archive_rx, cancel.clone());

    let running = Arc::new(Mutex::new(Slot::empty()));
    let testing = Arc::new(Mutex::new(Slot::empty()));

    let controller = Controller {
        fs,
        notifier,
        clock,
        launcher,
        config,
        port_pool,
        running: running.clone(),
        testing: testing.clone(),
        archiver_tx: archive_tx,
        cancel,
    };

    tokio::spawn(controller.run(cmd_rx));

    ControllerHandle { tx: cmd_tx, running, testing }
}

fn spawn_archiver_task(archiver: Arc<Archiver>, mut rx: mpsc::Receiver<ArchiveJob>, cancel: CancellationToken) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                job = rx.recv() => {
                    let Some(job) = job else { return };
                    let archiver = archiver.clone();
                    let result = tokio::task::spawn_blocking(move || archiver.archive(&job.version_dir, &job.version_name)).await;
                    match result {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => tracing::warn!(error = %e, "archive failed, retired directory preserved on disk"),
                        Err(e) => tracing::warn!(error = %e, "archiver task panicked"),
                    }
                }
            }
        }
    });
}

impl<FS, N, C, L> Controller<FS, N, C, L>
where
    FS: FileSystem,
    N: NotifyAdapter,
    C: Clock,
    L: InstanceLauncher,
{
    async fn run(mut self, mut rx: mpsc::Receiver<CommandEnvelope>) {
        while let Some(envelope) = rx.recv().await {
            let is_shutdown = matches!(envelope.command, Command::Shutdown);
            let result = self.handle(envelope.command).await;
            if let Err(e) = &result {
                tracing::warn!(error = %e, "controller command failed");
            }
            let _ = envelope.reply.send(result);
            if is_shutdown {
                return;
            }
        }
    }

    async fn handle(&mut self, command: Command) -> Result<(), ControllerError> {
        match command {
            Command::AdoptNewVersion { artifact_path } => self.handle_adopt_new_version(&artifact_path).await,
            Command::StartExisting { slot, version_dir } => self.handle_start_existing(slot, version_dir).await.map(drop),
            Command::Deploy => self.handle_deploy().await,
            Command::Restart { slot } => self.handle_restart(slot).await,
            Command::EvaluateReliability => self.handle_evaluate_reliability().await,
            Command::Shutdown => self.handle_shutdown().await,
        }
    }

    fn slot_mutex(&self, slot: SlotKind) -> &Arc<Mutex<Slot<SlotOccupant>>> {
        match slot {
            SlotKind::Running => &self.running,
            SlotKind::Testing => &self.testing,
        }
    }

    async fn publish_to_archiver(&self, version_dir: PathBuf) {
        let version_name = version_dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if self.archiver_tx.send(ArchiveJob { version_dir, version_name }).await.is_err() {
            tracing::warn!("archiver task unavailable, retired directory left on disk");
        }
    }

    /// spec §4.5 "AdoptNewVersion": materialise a version directory for
    /// the new artifact, start it as testing, and archive whatever
    /// testing previously held.
    async fn handle_adopt_new_version(&mut self, artifact_path: &std::path::Path) -> Result<(), ControllerError> {
        let version_name = layout::version_name_from_artifact(artifact_path)?;
        let version_dir =
            layout::materialise_version(self.fs.as_ref(), &self.config.working_dir, &self.config.identifier, artifact_path, &version_name)?;

        let evicted = self.handle_start_existing(SlotKind::Testing, version_dir).await?;
        if let Some(old_folder) = evicted {
            self.publish_to_archiver(old_folder).await;
        }
        Ok(())
    }

    /// spec §4.5 "StartExisting": acquire a port, materialise the
    /// instance, launch it, swap it into the slot, repoint the slot
    /// symlink, and tear down whatever the slot held before. Returns the
    /// version directory of the instance that was just evicted, if any,
    /// so callers can forward it to the archiver.
    async fn handle_start_existing(&mut self, slot: SlotKind, version_dir: PathBuf) -> Result<Option<PathBuf>, ControllerError> {
        let port = self.port_pool.acquire()?;

        let has_properties_file = self.config.properties_file_name.is_some();
        let instance_id = InstanceId::for_slot((self.clock.epoch_ms() / 1000) as i64, slot);

        let props = PropertiesOptions {
            properties_file_name: self.config.properties_file_name.as_deref(),
            port_identifier: self.config.port_identifier.as_deref(),
        };

        let instance_dir = match layout::materialise_instance(
            self.fs.as_ref(),
            &version_dir,
            &self.config.identifier,
            &instance_id,
            slot,
            port,
            &props,
        ) {
            Ok(dir) => dir,
            Err(e) => {
                let _ = self.port_pool.release(port);
                return Err(e.into());
            }
        };

        let instance_config = InstanceConfig {
            id: instance_id,
            slot,
            instance_dir,
            identifier: self.config.identifier.clone(),
            port,
            port_identifier: self.config.port_identifier.clone(),
            has_properties_file,
        };

        let instance = match self.launcher.launch(instance_config).await {
            Ok(instance) => Arc::new(instance),
            Err(e) => {
                let _ = self.port_pool.release(port);
                return Err(e.into());
            }
        };

        let previous = {
            let mut guard = self.slot_mutex(slot).lock();
            guard.replace(SlotOccupant { instance: instance.clone(), version_dir: version_dir.clone() })
        };

        layout::point_slot_symlink(self.fs.as_ref(), &self.config.working_dir, &self.config.identifier, slot, &version_dir)?;

        let evicted_version_dir = if let Some(previous) = previous {
            previous.instance.kill().await;
            let _ = self.port_pool.release(previous.instance.port);
            Some(previous.version_dir)
        } else {
            None
        };

        self.reset_both_counters();
        Ok(evicted_version_dir)
    }

    /// spec §4.5 "Deploy": promote testing into running.
    async fn handle_deploy(&mut self) -> Result<(), ControllerError> {
        let taken = {
            let mut guard = self.testing.lock();
            if guard.is_empty() {
                return Ok(());
            }
            guard.take()
        };

        let Some(occupant) = taken else { return Ok(()) };
        occupant.instance.kill().await;
        self.port_pool.release(occupant.instance.port)?;

        let evicted = self.handle_start_existing(SlotKind::Running, occupant.version_dir).await?;
        if let Some(old_folder) = evicted {
            self.publish_to_archiver(old_folder).await;
        }
        Ok(())
    }

    /// spec §4.5 "Restart": relaunch a slot's Instance in place, unless
    /// the slot is already mid-supersession (`isDying`).
    async fn handle_restart(&mut self, slot: SlotKind) -> Result<(), ControllerError> {
        let version_dir = {
            let guard = self.slot_mutex(slot).lock();
            if guard.is_dying() {
                return Ok(());
            }
            match guard.get() {
                Some(occupant) => occupant.version_dir.clone(),
                None => return Err(ControllerError::SlotEmpty(slot)),
            }
        };
        self.handle_start_existing(slot, version_dir).await?;
        Ok(())
    }

    /// spec §4.5 "Reliability evaluation": promote when the comparison
    /// score clears the gate, or reset testing's counters once its
    /// window reaches the reset ceiling without promotion.
    async fn handle_evaluate_reliability(&mut self) -> Result<(), ControllerError> {
        let now = self.clock.now();

        let running_snapshot = self.running.lock().get().map(|occ| occ.instance.clone());
        let testing_snapshot = self.testing.lock().get().map(|occ| occ.instance.clone());

        let (Some(running), Some(testing)) = (running_snapshot, testing_snapshot) else {
            return Ok(());
        };

        let Some(testing_elapsed) = testing.measurement_elapsed(now) else {
            return Ok(());
        };
        let running_elapsed = running.measurement_elapsed(now);

        let already_dying = self.testing.lock().is_dying();

        if let Some(running_elapsed) = running_elapsed {
            if running_elapsed >= RUNNING_MIN_WINDOW && testing_elapsed >= TESTING_MIN_WINDOW && !already_dying {
                let delta = testing.counters.score() - running.counters.score();
                if delta >= PROMOTION_GATE {
                    self.testing.lock().mark_dying();
                    let _ = self.notifier.notify(&format!("promoting testing (delta={delta:.3})")).await;
                    return self.handle_deploy().await;
                }
            }
        }

        if testing_elapsed >= RESET_CEILING && !already_dying {
            testing.counters.reset();
            running.counters.reset();
            testing.reset_measurement(now);
            running.reset_measurement(now);
        }

        Ok(())
    }

    async fn handle_shutdown(&mut self) -> Result<(), ControllerError> {
        self.cancel.cancel();
        for slot in [SlotKind::Running, SlotKind::Testing] {
            let taken = self.slot_mutex(slot).lock().take();
            if let Some(occupant) = taken {
                occupant.instance.kill().await;
                let _ = self.port_pool.release(occupant.instance.port);
            }
        }
        Ok(())
    }

    /// Reset counters on both slots and stamp a fresh measurement window
    /// simultaneously (spec §4.5 step 7, §4.2 `ResetTest`).
    fn reset_both_counters(&self) {
        let now = self.clock.now();
        if let Some(occupant) = self.running.lock().get() {
            occupant.instance.counters.reset();
            occupant.instance.reset_measurement(now);
        }
        if let Some(occupant) = self.testing.lock().get() {
            occupant.instance.counters.reset();
            occupant.instance.reset_measurement(now);
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
