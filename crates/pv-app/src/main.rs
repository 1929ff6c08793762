//! Headless shell for the parquet paging viewer
//!
//! A line-driven loop that exercises the core: open files, page through
//! them, and answer the reload prompt when the backing file changes on
//! disk. Rendering is arrow's pretty printer; everything stateful lives
//! in `pv-core`.

use std::io::{BufRead, Write as _};
use std::path::PathBuf;

use anyhow::Result;
use arrow::util::pretty::pretty_format_batches;
use tracing::info;

use pv_core::{ChangeMonitor, JsonFileBackend, SessionStore, Viewer, ViewerEvent, ViewerStatus};

fn settings_path() -> PathBuf {
    std::env::var_os("PVIEW_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("pview-settings.json"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let session = SessionStore::load(Box::new(JsonFileBackend::open(settings_path())));
    let mut viewer = Viewer::new(ChangeMonitor::new(), session);

    if let Some(path) = std::env::args().nth(1) {
        report(viewer.open_new_file(path).await);
        print_window(&viewer);
    } else if let Some(last) = viewer.session().last_file() {
        println!("last session: {} (type 'reopen' to restore)", last.display());
    }

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        pump_monitor(&mut viewer).await;

        print!("pview> ");
        std::io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else { continue };
        let arg = parts.next();

        match (command, arg) {
            ("open", Some(path)) => {
                report(viewer.open_new_file(path).await);
                print_window(&viewer);
            }
            ("next", _) => {
                viewer.handle_event(ViewerEvent::NextPage);
                print_window(&viewer);
            }
            ("prev", _) => {
                viewer.handle_event(ViewerEvent::PrevPage);
                print_window(&viewer);
            }
            ("reopen", _) => {
                report(viewer.reopen_last().await);
                print_window(&viewer);
            }
            ("recent", _) => {
                for (i, path) in viewer.session().recent_files().into_iter().enumerate() {
                    println!("{:2}. {}", i + 1, path.display());
                }
            }
            ("clear-recent", _) => viewer.session_mut().clear_recent(),
            ("goto-col", Some(name)) => {
                match viewer.dataset().and_then(|d| d.column_ordinal(name)) {
                    Some(ordinal) => println!("column '{name}' is at ordinal {ordinal}"),
                    None => println!("no such column: {name}"),
                }
            }
            ("counts", Some(column)) => match viewer.value_counts(column) {
                Ok(counts) => {
                    for entry in counts {
                        match entry.value {
                            Some(v) => println!("{:>8}  {v}", entry.count),
                            None => println!("{:>8}  <null>", entry.count),
                        }
                    }
                }
                Err(e) => println!("error: {e}"),
            },
            ("quit" | "q", _) => break,
            _ => println!(
                "commands: open <path> | next | prev | reopen | recent | \
                 clear-recent | goto-col <name> | counts <col> | quit"
            ),
        }
    }

    viewer.shutdown();
    info!("session saved");
    Ok(())
}

/// Surface queued change notifications and prompt for a reload decision.
async fn pump_monitor(viewer: &mut Viewer) {
    for event in viewer.poll_events() {
        match event {
            ViewerEvent::ReloadCandidate(path) => {
                println!("{} changed on disk. Reload? [y/N]", path.display());
                let mut answer = String::new();
                if std::io::stdin().read_line(&mut answer).is_ok()
                    && answer.trim().eq_ignore_ascii_case("y")
                {
                    report(viewer.confirm_reload().await);
                    print_window(viewer);
                } else {
                    viewer.decline_reload();
                }
            }
            ViewerEvent::WatchLost(path) => {
                println!("watched file vanished: {}", path.display());
                viewer.handle_event(ViewerEvent::WatchLost(path));
            }
            other => viewer.handle_event(other),
        }
    }
}

fn report(status: ViewerStatus) {
    match status {
        ViewerStatus::Empty => println!("no file loaded"),
        ViewerStatus::Loaded { path, watching } => {
            if watching {
                println!("loaded {}", path.display());
            } else {
                println!("loaded {} (live reload unavailable)", path.display());
            }
        }
        ViewerStatus::LoadFailed(message) => println!("error: {message}"),
        ViewerStatus::WatchLost(path) => println!("stopped watching {}", path.display()),
        ViewerStatus::Superseded => {}
    }
}

fn print_window(viewer: &Viewer) {
    let Some(window) = viewer.window() else { return };
    match pretty_format_batches(window.batches()) {
        Ok(table) => println!("{table}"),
        Err(e) => println!("render error: {e}"),
    }
    match viewer
        .pager()
        .display_bounds(window.offset(), window.total_height())
    {
        Some((start, end)) => {
            println!("Showing rows {start} - {end} of {}", window.total_height());
        }
        None => println!("0 rows"),
    }
}
