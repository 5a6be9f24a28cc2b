//! `rulecheck watch`: re-validate whenever the module image is rebuilt.

use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rulecheck_rules::Validator;
use tracing::{debug, info, warn};

use crate::report::Report;

/// Whether `event` rewrote `binary` or another module image next to it.
///
/// Dependencies resolve from the same directory, so a rebuilt sibling image
/// can change the result too. Compared by file name and extension because
/// the watcher may report the directory through a different path than the
/// canonical one.
pub fn touches(event: &Event, binary: &Path) -> bool {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return false;
    }
    let Some(name) = binary.file_name() else {
        return false;
    };
    let extension = binary.extension();
    event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(name) || (extension.is_some() && p.extension() == extension))
}

pub fn run(validator: &Validator, binary: &Path, debounce: Duration, json: bool) -> Result<()> {
    let binary = binary
        .canonicalize()
        .with_context(|| format!("cannot watch {}", binary.display()))?;
    let dir = binary
        .parent()
        .context("module image has no parent directory")?
        .to_path_buf();

    print_report(&Report::run(validator, &binary), json)?;

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        // The receiver only goes away when `run` returns.
        let _ = tx.send(res);
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!(path = %binary.display(), "watching module image for rebuilds");

    while let Ok(res) = rx.recv() {
        match res {
            Ok(event) if touches(&event, &binary) => {}
            Ok(event) => {
                debug!(kind = ?event.kind, "ignoring unrelated filesystem event");
                continue;
            }
            Err(e) => {
                warn!(error = %e, "filesystem watcher error");
                continue;
            }
        }

        // Wait for the build to go quiet before reloading.
        while rx.recv_timeout(debounce).is_ok() {}

        if !binary.exists() {
            warn!(path = %binary.display(), "module image removed, waiting for rebuild");
            continue;
        }
        validator.invalidate(&binary);
        info!(path = %binary.display(), "module image changed, re-validating");
        print_report(&Report::run(validator, &binary), json)?;
    }
    Ok(())
}

pub fn print_report(report: &Report, json: bool) -> Result<()> {
    if json {
        println!("{}", report.to_json().context("failed to serialize report")?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}
