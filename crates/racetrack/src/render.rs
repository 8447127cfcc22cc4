//! Text rendering of the race board.

use racetrack_core::{RaceReport, Track};
use std::fmt::Write;
use std::sync::Arc;

/// Width of a progress bar in characters.
pub const BAR_WIDTH: usize = 40;

/// Draws `[####....]  3/10`.
#[must_use]
pub fn progress_bar(current: usize, total: usize, width: usize) -> String {
    let current = current.min(total);
    let filled = if total == 0 { width } else { current * width / total };
    let digits = total.to_string().len();
    format!(
        "[{}{}] {current:>digits$}/{total}",
        "#".repeat(filled),
        ".".repeat(width - filled),
    )
}

/// Draws one line per lane, reading progress straight from the tracks.
#[must_use]
pub fn board(tracks: &[Arc<Track>], paused: bool) -> String {
    let mut out = String::new();
    let label = tracks.len().saturating_sub(1).to_string().len();
    for (lane, track) in tracks.iter().enumerate() {
        let _ = writeln!(
            out,
            "lane {lane:>label$} {}{}",
            progress_bar(track.current_progress(), track.size(), BAR_WIDTH),
            if track.is_complete() { "  done" } else { "" },
        );
    }
    if paused {
        out.push_str("-- paused --\n");
    }
    out
}

/// Summarizes a finished race.
#[must_use]
pub fn results(report: &RaceReport) -> String {
    let mut out = String::new();
    match report.winner {
        Some(lane) => {
            let _ = writeln!(out, "race {} winner: runner-{lane}", report.race_id);
        }
        None => {
            let _ = writeln!(out, "race {} ended with no winner", report.race_id);
        }
    }
    for (place, lane) in report.podium().into_iter().enumerate() {
        let _ = writeln!(out, "  {:>3}. runner-{lane}", place + 1);
    }
    if !report.cancelled.is_empty() {
        let lanes: Vec<String> = report.cancelled.iter().map(ToString::to_string).collect();
        let _ = writeln!(out, "  cancelled: {}", lanes.join(", "));
    }
    let _ = writeln!(
        out,
        "  {} of {} finished in {:.2}s",
        report.finishers(),
        report.ranks.len(),
        report.elapsed.as_secs_f64()
    );
    out
}
