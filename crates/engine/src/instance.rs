// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance — one live execution of a version. Owns the child process,
//! its stdio sinks, its counters, and the log tailer feeding them.
//! Grounded on `original_source/server/servlet/servlet.go`: stdout/stderr
//! opened append-create, pid recorded before the warm-up sleep, liveness
//! probed with a signal-0 `kill`.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use vili_adapters::{parse_level, tail_file, LogLevel};
use vili_core::{Counters, InstanceId, LifecycleState, SlotKind};

use crate::error::InstanceError;

/// Fixed warm-up window between spawn and Ready, to avoid racing traffic
/// against a listener the child hasn't bound yet (spec §4.3 step 4).
pub const WARMUP: Duration = Duration::from_secs(2);

/// Inputs needed to launch one instance. `has_properties_file` controls
/// whether the port is passed as a `-D<port_identifier>=<port>` system
/// property — when an external properties file is configured, the port
/// override is written into that file instead (see `crate::layout`).
pub struct InstanceConfig {
    pub id: InstanceId,
    pub slot: SlotKind,
    pub instance_dir: PathBuf,
    pub identifier: String,
    pub port: u16,
    pub port_identifier: Option<String>,
    pub has_properties_file: bool,
}

pub struct Instance {
    pub id: InstanceId,
    pub slot: SlotKind,
    pub port: u16,
    pub instance_dir: PathBuf,
    pub counters: Arc<Counters>,
    pid: i32,
    child: tokio::sync::Mutex<Option<Child>>,
    tailer_cancel: CancellationToken,
    killed: AtomicBool,
    state: Mutex<LifecycleState>,
    measurement_start: Mutex<Option<Instant>>,
}

impl Instance {
    /// Spawn the child, record its pid, wait out the warm-up window, and
    /// start the log tailer. Returns only once the instance is Ready.
    pub async fn spawn(config: InstanceConfig) -> Result<Self, InstanceError> {
        let jar_path = config.instance_dir.join(format!("{}.jar", config.identifier));
        let mut args = vec!["-jar".to_string(), jar_path.to_string_lossy().into_owned()];
        if !config.has_properties_file {
            if let Some(port_identifier) = &config.port_identifier {
                args.push(format!("-D{port_identifier}={}", config.port));
            }
        }
        Self::spawn_inner(config, "java", args).await
    }

    /// Same as [`Self::spawn`] but launches an arbitrary `program`/`args`
    /// pair instead of `java -jar ...`, so tests can stand in a
    /// short-lived process without requiring a JVM on the test host.
    #[cfg(any(test, feature = "test-support"))]
    pub async fn spawn_with_program(config: InstanceConfig, program: &str, args: Vec<String>) -> Result<Self, InstanceError> {
        Self::spawn_inner(config, program, args).await
    }

    async fn spawn_inner(config: InstanceConfig, program: &str, args: Vec<String>) -> Result<Self, InstanceError> {
        let stdout = open_append_create(&config.instance_dir.join("stdOut"))?;
        let stderr = open_append_create(&config.instance_dir.join("stdErr"))?;

        let mut cmd = Command::new(program);
        cmd.args(&args);
        cmd.current_dir(&config.instance_dir);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::from(stdout));
        cmd.stderr(Stdio::from(stderr));
        cmd.kill_on_drop(false);

        let child = cmd
            .spawn()
            .map_err(|source| InstanceError::Spawn { path: config.instance_dir.join(program), source })?;
        let pid = child.id().ok_or(InstanceError::NoPid)? as i32;

        let pid_path = config.instance_dir.join("pid");
        std::fs::write(&pid_path, pid.to_string())
            .map_err(|source| InstanceError::Io { path: pid_path, source })?;

        tokio::time::sleep(WARMUP).await;

        let tailer_cancel = CancellationToken::new();
        let log_path = config.instance_dir.join("logs").join("json").join(format!("{}.log", config.identifier));
        let counters = Arc::new(Counters::new());

        match tail_file(log_path.clone(), tailer_cancel.clone()) {
            Ok(mut lines) => {
                let counters = counters.clone();
                tokio::spawn(async move {
                    while let Some(line) = lines.recv().await {
                        match parse_level(&line) {
                            LogLevel::Warn => counters.record_warning(),
                            LogLevel::Error => counters.record_error(),
                            LogLevel::Other => {}
                        }
                    }
                });
            }
            Err(source) => {
                tracing::warn!(error = %source, path = %log_path.display(), "failed to start log tailer");
            }
        }

        Ok(Self {
            id: config.id,
            slot: config.slot,
            port: config.port,
            instance_dir: config.instance_dir,
            counters,
            pid,
            child: tokio::sync::Mutex::new(Some(child)),
            tailer_cancel,
            killed: AtomicBool::new(false),
            state: Mutex::new(LifecycleState::Ready),
            measurement_start: Mutex::new(None),
        })
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    /// Signal-0 liveness probe: true iff the child has not exited.
    pub fn is_running(&self) -> bool {
        signal::kill(Pid::from_raw(self.pid), None).is_ok()
    }

    /// Forceful terminate, then reap, then cancel the tailer and close
    /// stdio. Idempotent: a second call is a no-op.
    pub async fn kill(&self) {
        if self.killed.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.state.lock() = LifecycleState::Dying;
        self.tailer_cancel.cancel();
        let _ = signal::kill(Pid::from_raw(self.pid), Signal::SIGKILL);
        if let Some(mut child) = self.child.lock().await.take() {
            let _ = child.wait().await;
        }
        *self.state.lock() = LifecycleState::Dead;
    }

    /// Stamp a fresh measurement-start. Called on both slots together
    /// whenever `StartExisting` resets counters (spec §4.5 step 7).
    pub fn reset_measurement(&self, now: Instant) {
        *self.measurement_start.lock() = Some(now);
    }

    /// Elapsed time since the measurement window began, or `None` if the
    /// window has never been stamped (measurement-start == 0, spec §3).
    pub fn measurement_elapsed(&self, now: Instant) -> Option<Duration> {
        self.measurement_start.lock().map(|start| now.saturating_duration_since(start))
    }
}

fn open_append_create(path: &std::path::Path) -> Result<std::fs::File, InstanceError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| InstanceError::Io { path: path.to_path_buf(), source })
}

/// How the controller actually gets a new [`Instance`] onto disk and
/// into a process. Abstracted behind a trait, the way the adapters
/// crate abstracts the notifier, so the controller's state-machine
/// tests can swap in a short-lived stand-in process instead of a real
/// JVM.
#[async_trait::async_trait]
pub trait InstanceLauncher: Send + Sync {
    async fn launch(&self, config: InstanceConfig) -> Result<Instance, InstanceError>;
}

/// Production launcher: `java -jar <instance>/<id>.jar`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaLauncher;

#[async_trait::async_trait]
impl InstanceLauncher for JavaLauncher {
    async fn launch(&self, config: InstanceConfig) -> Result<Instance, InstanceError> {
        Instance::spawn(config).await
    }
}

/// Test launcher: runs `program`/`args` in place of `java -jar ...`.
#[cfg(any(test, feature = "test-support"))]
pub struct TestLauncher {
    pub program: String,
    pub args: Vec<String>,
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait::async_trait]
impl InstanceLauncher for TestLauncher {
    async fn launch(&self, config: InstanceConfig) -> Result<Instance, InstanceError> {
        Instance::spawn_with_program(config, &self.program, self.args.clone()).await
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
