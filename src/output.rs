//! CLI output formatting.
//!
//! Output is **per photo, then per run**. While workers are busy every photo
//! gets one line as it finishes; the run closes with what happened to the
//! manifest and a one-line tally.
//!
//! # Output Format
//!
//! ## Sync
//!
//! ```text
//! Syncing 3 photos (3 workers)
//!     new       DSC_0042.jpg → 2024-05-01
//!     reused    DSC_0041.jpg
//!     failed    broken.jpg: permission denied
//!     removed   old.jpg
//! Manifest written: web/photography/photos.json (published)
//!     Backup: web/photography/photos.json.20240501_101500.bak
//! Changes: 1 added, 1 removed, 0 updated
//! 1 reused, 1 processed, 1 failed (3 total)
//! ```
//!
//! ## Check
//!
//! ```text
//! 12 photos: 1 new, 2 modified, 9 unchanged
//!     new       DSC_0050.jpg
//!     modified  DSC_0042.jpg
//!     modified  DSC_0043.jpg
//! 1 orphaned
//!     orphaned  old.jpg
//! ```
//!
//! # Architecture
//!
//! Each piece has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::change::ChangeKind;
use crate::sync::{SyncEvent, SyncPlan, SyncReport};

/// Width of the status column.
const STATUS_WIDTH: usize = 9;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// An indented `status  subject` line with the status column aligned.
fn status_line(status: &str, subject: &str) -> String {
    format!(
        "{}{:<width$} {}",
        indent(1),
        status,
        subject,
        width = STATUS_WIDTH
    )
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Sync
// ============================================================================

pub fn format_sync_event(event: &SyncEvent) -> Vec<String> {
    match event {
        SyncEvent::Started { files, workers } => vec![format!(
            "Syncing {} ({})",
            plural(*files, "photo"),
            plural(*workers, "worker")
        )],
        SyncEvent::Reused { filename } => vec![status_line("reused", filename)],
        SyncEvent::Processed {
            filename,
            change,
            date,
        } => vec![status_line(change.label(), &format!("{filename} → {date}"))],
        SyncEvent::Failed { filename, error } => {
            vec![status_line("failed", &format!("{filename}: {error}"))]
        }
        SyncEvent::OrphanRemoved { filename } => vec![status_line("removed", filename)],
        SyncEvent::ManifestUnchanged => vec!["Manifest unchanged".to_string()],
        SyncEvent::ManifestWritten {
            path,
            backup,
            published,
        } => {
            let mut lines = vec![format!(
                "Manifest written: {}{}",
                path.display(),
                if *published { " (published)" } else { "" }
            )];
            if let Some(backup) = backup {
                lines.push(format!("{}Backup: {}", indent(1), backup.display()));
            }
            lines
        }
    }
}

/// Closing lines of a run: the change summary and the tally.
pub fn format_sync_summary(report: &SyncReport) -> Vec<String> {
    let mut lines = Vec::new();
    if !report.diff.is_empty() {
        lines.push(format!(
            "Changes: {} added, {} removed, {} updated",
            report.diff.added.len(),
            report.diff.removed.len(),
            report.diff.updated.len()
        ));
    }
    for (key, error) in &report.deletes.failed {
        lines.push(format!("{}Not deleted: {key} ({error})", indent(1)));
    }
    lines.push(report.stats.to_string());
    lines
}

pub fn print_sync_summary(report: &SyncReport) {
    for line in format_sync_summary(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_plan(plan: &SyncPlan) -> Vec<String> {
    let counts = [
        ChangeKind::New,
        ChangeKind::Modified,
        ChangeKind::MissingRemote,
        ChangeKind::Unchanged,
    ]
    .into_iter()
    .map(|kind| (kind, plan.count(kind)))
    .filter(|&(kind, n)| n > 0 || matches!(kind, ChangeKind::New | ChangeKind::Unchanged))
    .map(|(kind, n)| format!("{n} {}", kind.label()))
    .collect::<Vec<_>>()
    .join(", ");

    let mut lines = vec![format!(
        "{}: {}",
        plural(plan.changes.len() + plan.failed.len(), "photo"),
        counts
    )];
    for (filename, kind) in &plan.changes {
        if kind.needs_processing() {
            lines.push(status_line(kind.label(), filename));
        }
    }
    for (filename, error) in &plan.failed {
        lines.push(status_line("failed", &format!("{filename}: {error}")));
    }

    if !plan.orphaned.is_empty() {
        lines.push(format!("{} orphaned", plan.orphaned.len()));
        for filename in &plan.orphaned {
            lines.push(status_line("orphaned", filename));
        }
    }
    lines
}

pub fn print_plan(plan: &SyncPlan) {
    for line in format_plan(plan) {
        println!("{}", line);
    }
}
