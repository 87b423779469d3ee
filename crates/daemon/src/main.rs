// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Vili Daemon (vilid)
//!
//! Wires the config loader, the filesystem/port-pool/clock backends,
//! the controller, the watcher, the archiver, the notifier, the
//! optional remote control poller, and the proxy together, then runs
//! until a shutdown signal arrives (spec §1, §6).

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use vili_adapters::{
    poll_remote_control, watch_artifacts, Archiver, NoOpNotifyAdapter, NotifyAdapter, RemoteDirective, RemoteSlot, SlackNotifyAdapter,
    WhydahClient, WhydahCredential,
};
use vili_core::{PortPool, RealFs, SlotKind, SystemClock};
use vili_engine::{resolve_startup_source, ControllerConfig, JavaLauncher, VersionSelect};
use vili_proxy::{Proxy, ProxyConfig};

use vili_daemon::error::StartupError;
use vili_daemon::Config;

fn main() {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("vilid {}", env!("CARGO_PKG_VERSION"));
                return;
            }
            "--help" | "-h" | "help" => {
                print_help();
                return;
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: vilid [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start the tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run()) {
        eprintln!("vilid: {e}");
        std::process::exit(1);
    }
}

fn print_help() {
    println!("vilid {}", env!("CARGO_PKG_VERSION"));
    println!("Vili — canary supervisor and reverse proxy for a co-resident JVM application.");
    println!();
    println!("USAGE:");
    println!("    vilid");
    println!();
    println!("Configuration is read from the process environment (optionally loaded from");
    println!("a `.env` file in the working directory) — see the project README for the");
    println!("full list of recognised keys (scheme, endpoint, port, port_range, identifier, ...).");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
}

async fn run() -> Result<(), StartupError> {
    let _ = dotenvy::dotenv();

    let config = Config::load()?;
    let _log_guard = setup_logging(&config).map_err(StartupError::Logging)?;

    info!(working_dir = %config.working_dir.display(), identifier = %config.identifier, "starting vili daemon");

    let fs = Arc::new(RealFs);
    let port_pool = Arc::new(PortPool::new(config.port_range_low, config.port_range_high));
    let clock = SystemClock;
    let launcher = Arc::new(JavaLauncher);
    let archiver = Arc::new(Archiver::new(config.working_dir.join("archive")));
    let cancel = CancellationToken::new();

    let notifier = build_notifier(&config);

    let controller_config = ControllerConfig {
        working_dir: config.working_dir.clone(),
        identifier: config.identifier.clone(),
        port_identifier: config.port_identifier.clone(),
        properties_file_name: config.properties_file_name.clone(),
    };

    let controller = vili_engine::spawn(controller_config, fs.clone(), notifier, clock, launcher, port_pool.clone(), archiver, cancel.clone());

    // The running slot must be populated before the proxy starts
    // accepting traffic (spec §3 Slot invariants).
    let running_version_dir = match resolve_startup_source(fs.as_ref(), &config.working_dir, &config.identifier, SlotKind::Running, VersionSelect::Mtime)? {
        Some(version_dir) => {
            info!(version_dir = %version_dir.display(), "starting running slot from working directory");
            controller.start_existing(SlotKind::Running, version_dir.clone()).await?;
            version_dir
        }
        None => return Err(StartupError::NoRunningInstance),
    };

    // Only start a testing instance if it would come from a distinct
    // version directory than the one running just started from — a true
    // single-version cold start leaves testing empty (spec §8 scenario 1).
    match resolve_startup_source(fs.as_ref(), &config.working_dir, &config.identifier, SlotKind::Testing, VersionSelect::Mtime)? {
        Some(version_dir) if version_dir != running_version_dir => {
            info!(version_dir = %version_dir.display(), "starting testing slot from working directory");
            controller.start_existing(SlotKind::Testing, version_dir).await?;
        }
        Some(_) => {
            info!("testing candidate resolves to the same version as running; leaving testing empty");
        }
        None => {
            info!("no candidate found for testing slot at boot; leaving it empty");
        }
    }

    spawn_watcher(&config, controller.clone(), cancel.clone())?;

    if config.manual_control {
        spawn_remote_control(&config, controller.clone(), cancel.clone());
    }

    let proxy = Proxy::new(
        ProxyConfig { scheme: config.scheme.clone(), endpoint: config.endpoint.clone(), listen_port: config.listen_port },
        controller.clone(),
        cancel.clone(),
    );

    let mut sigterm = signal(SignalKind::terminate()).map_err(StartupError::Logging)?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(StartupError::Logging)?;

    let serve_cancel = cancel.clone();
    let serve_task = tokio::spawn(async move { proxy.serve(serve_cancel).await });

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    cancel.cancel();
    if let Err(e) = controller.shutdown().await {
        warn!(error = %e, "controller reported an error during shutdown");
    }
    match serve_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "proxy exited with an error"),
        Err(e) => warn!(error = %e, "proxy task panicked"),
    }

    info!("vili daemon stopped");
    Ok(())
}

/// Build the notifier the controller reports canary decisions to:
/// Slack (via whydah auth) when both `slack`/`whydah` config are
/// present, a silent no-op otherwise (spec §6 optional keys).
fn build_notifier(config: &Config) -> Arc<dyn NotifyAdapter> {
    match (&config.slack, &config.whydah) {
        (Some(slack), Some(whydah)) => {
            let whydah_client = Arc::new(WhydahClient::new(
                reqwest::Client::new(),
                WhydahCredential {
                    whydah_uri: whydah.whydah_uri.clone(),
                    application_id: whydah.application_id.clone(),
                    application_name: whydah.application_name.clone(),
                    application_secret: whydah.application_secret.clone(),
                },
            ));
            Arc::new(SlackNotifyAdapter::new(
                whydah_client,
                slack.entraos_api_uri.clone(),
                slack.slack_channel.clone(),
                slack.app_icon.clone(),
                slack.env_icon.clone(),
                slack.env.clone(),
                config.identifier.clone(),
            ))
        }
        _ => Arc::new(NoOpNotifyAdapter::new()),
    }
}

fn spawn_watcher(config: &Config, controller: vili_engine::ControllerHandle, cancel: CancellationToken) -> Result<(), StartupError> {
    let running_name = {
        let controller = controller.clone();
        move || controller.running_version_name()
    };
    let mut artifacts = watch_artifacts(config.working_dir.clone(), config.identifier.clone(), running_name, cancel.clone())?;

    tokio::spawn(async move {
        while let Some(path) = artifacts.recv().await {
            info!(path = %path.display(), "adopting new artifact");
            if let Err(e) = controller.adopt_new_version(path).await {
                warn!(error = %e, "failed to adopt new artifact");
            }
        }
    });
    Ok(())
}

/// When `manualcontrol=true`, poll a remote endpoint for queued
/// deploy/restart directives and dispatch them as ordinary controller
/// commands (spec §1 "Remote control client", §6). Boundary-only: the
/// controller has no notion that a command originated remotely.
fn spawn_remote_control(config: &Config, controller: vili_engine::ControllerHandle, cancel: CancellationToken) {
    let Some(whydah) = &config.whydah else {
        warn!("manualcontrol=true but no whydah_* credential is configured; remote control disabled");
        return;
    };
    let Some(slack) = &config.slack else {
        warn!("manualcontrol=true but entraos_api_uri is not configured; remote control disabled");
        return;
    };

    let client = Arc::new(WhydahClient::new(
        reqwest::Client::new(),
        WhydahCredential {
            whydah_uri: whydah.whydah_uri.clone(),
            application_id: whydah.application_id.clone(),
            application_name: whydah.application_name.clone(),
            application_secret: whydah.application_secret.clone(),
        },
    ));
    let poll_uri = format!("{}/vili/remote/poll", slack.entraos_api_uri);
    let mut directives = poll_remote_control(client, poll_uri, cancel.clone());

    tokio::spawn(async move {
        while let Some(directive) = directives.recv().await {
            let result = match directive {
                RemoteDirective::Deploy => controller.deploy().await,
                RemoteDirective::Restart { target: RemoteSlot::Running } => controller.restart(SlotKind::Running).await,
                RemoteDirective::Restart { target: RemoteSlot::Testing } => controller.restart(SlotKind::Testing).await,
            };
            if let Err(e) = result {
                error!(error = %e, "remote control directive failed");
            }
        }
    });
}

fn setup_logging(config: &Config) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, format!("{}.log", config.identifier));
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
            Ok(None)
        }
    }
}
