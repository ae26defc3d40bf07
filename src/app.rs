//! Wires preferences, transport, monitor and refresh loop together for the
//! command-line front end.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::monitor::{CurrentStatus, MonitorEvent, NoDataReason, UsageMonitor};
use crate::preferences::{Preferences, PreferencesStore};
use crate::quota::MetricKind;
use crate::render;
use crate::scheduler::spawn_refresh_loop;
use crate::service::{spawn_monitor, MonitorHandle, QuotaSource};

/// Interactive commands read from stdin in watch mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    Refresh,
    Select(MetricKind),
    Menu,
    Quit,
}

pub fn parse_command(line: &str) -> Option<UserCommand> {
    match line.trim() {
        "" => None,
        "r" | "refresh" => Some(UserCommand::Refresh),
        "m" | "menu" => Some(UserCommand::Menu),
        "q" | "quit" => Some(UserCommand::Quit),
        other => other.parse::<MetricKind>().ok().map(UserCommand::Select),
    }
}

/// Fetch a single snapshot and print the status line and menu.
///
/// Errors after printing if the fetch failed, so the process exits non-zero.
pub async fn run_once(source: Arc<dyn QuotaSource>, selected: MetricKind) -> anyhow::Result<()> {
    let (events, _rx) = mpsc::unbounded_channel();
    let mut monitor = UsageMonitor::new(selected, events);
    let fetched = source.fetch().await;
    if let Ok(snapshot) = &fetched {
        monitor.snapshot_received(snapshot.clone());
    }

    let now = Utc::now();
    let status = monitor.current_status(now);
    let mut out = std::io::stdout();
    writeln!(out, "{}", render::status_line(&status))?;
    if let CurrentStatus::NoData {
        reason: NoDataReason::MetricAbsent,
    } = status
    {
        writeln!(out, "{} not reported", monitor.selected_metric().label())?;
    }
    for line in render::menu_lines(&monitor.slots(now), monitor.latest_snapshot().is_some()) {
        writeln!(out, "{}", line)?;
    }
    out.flush()?;

    fetched.map(|_| ()).context("usage fetch failed")
}

/// Keep refreshing until the user quits; print the status line whenever it may
/// have changed.
pub async fn run_watch(
    cfg: &Config,
    store: PreferencesStore,
    mut prefs: Preferences,
    source: Arc<dyn QuotaSource>,
    period: Duration,
) -> anyhow::Result<()> {
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let monitor = UsageMonitor::new(prefs.selected_metric(), events_tx);
    let (handle, _task) = spawn_monitor(monitor, source);
    let refresher = spawn_refresh_loop(handle.clone(), period);
    info!(
        "watching usage at {} (r=refresh, m=menu, 5h/7d/sonnet=select, q=quit)",
        cfg.api_url
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    // Shows ❌ until the first snapshot lands.
    print_status(&handle).await?;

    loop {
        tokio::select! {
            ev = events.recv() => match ev {
                Some(MonitorEvent::StatusChanged) => print_status(&handle).await?,
                Some(MonitorEvent::MetricChanged(kind)) => {
                    prefs.set_selected_metric(kind);
                    if let Err(e) = store.save(&prefs) {
                        warn!("could not persist metric selection: {}", e);
                    }
                }
                None => break,
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match parse_command(&line) {
                    Some(UserCommand::Quit) => break,
                    Some(cmd) => handle_command(&handle, cmd).await?,
                    None => {
                        if !line.trim().is_empty() {
                            warn!("unknown command: {}", line.trim());
                        }
                    }
                },
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!("stdin closed: {}", e);
                    stdin_open = false;
                }
            },
            _ = &mut ctrl_c => break,
        }
    }

    refresher.cancel();
    Ok(())
}

async fn handle_command(handle: &MonitorHandle, cmd: UserCommand) -> anyhow::Result<()> {
    match cmd {
        UserCommand::Refresh => handle.refresh()?,
        UserCommand::Select(kind) => {
            if let Err(e) = handle.select_metric(kind).await {
                warn!("{}", e);
            }
        }
        UserCommand::Menu => {
            let loaded = !matches!(
                handle.current_status().await?,
                CurrentStatus::NoData {
                    reason: NoDataReason::NoSnapshot
                }
            );
            for line in render::menu_lines(&handle.slots().await?, loaded) {
                println!("{}", line);
            }
        }
        UserCommand::Quit => {}
    }
    Ok(())
}

async fn print_status(handle: &MonitorHandle) -> anyhow::Result<()> {
    let status = handle.current_status().await?;
    println!("{}", render::status_line(&status));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("r"), Some(UserCommand::Refresh));
        assert_eq!(parse_command(" menu "), Some(UserCommand::Menu));
        assert_eq!(parse_command("q"), Some(UserCommand::Quit));
        assert_eq!(
            parse_command("5h"),
            Some(UserCommand::Select(MetricKind::FiveHour))
        );
        assert_eq!(
            parse_command("sonnet"),
            Some(UserCommand::Select(MetricKind::SevenDaySonnet))
        );
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("bogus"), None);
    }
}
