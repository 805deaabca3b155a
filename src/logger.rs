//! Terminal output: module-prefixed log lines, composite step traces and
//! one progress bar per entity kind.
//!
//! ```text
//! [data] linked 352 things from 14 files
//! [composite] Album.tracks step 3: with_flattened_list
//! [Album]  ████████████████████████ 12/12
//! [Track]  ████████████░░░░░░░░░░░░ 170/340
//! [ArtTag] ░░░░░░░░░░░░░░░░░░░░░░░░ 0/41
//! ```
//!
//! Log lines are written above the bar area while bars are active.

use colored::{ColoredString, Colorize};
use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType, size},
};
use std::{
    borrow::Cow,
    io::{Write, stdout},
    sync::{
        Mutex, OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
};

static TERMINAL_WIDTH: OnceLock<usize> = OnceLock::new();

/// Rows currently reserved by a `ProgressBars`.
static ACTIVE_ROWS: AtomicUsize = AtomicUsize::new(0);

const BAR_MIN: usize = 10;
const BAR_MAX: usize = 40;

fn terminal_width() -> usize {
    *TERMINAL_WIDTH.get_or_init(|| size().map_or(120, |(w, _)| usize::from(w)))
}

/// Log a message with a colored module prefix.
///
/// ```ignore
/// log!("data"; "linked {} things", total);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

// ============================================================================
// Lines
// ============================================================================

/// Print `message` under `module`, above any active progress bars.
///
/// Single-line messages are cut to the terminal width; multi-line ones
/// (aggregated error reports) are printed whole.
#[allow(clippy::cast_possible_truncation)] // rows is the number of kinds
pub fn log(module: &str, message: &str) {
    let prefix = paint(module);
    let room = terminal_width().saturating_sub(module.len() + 3);
    let message = if message.contains('\n') { Cow::Borrowed(message) } else { fit(message, room) };

    let rows = ACTIVE_ROWS.load(Ordering::SeqCst);
    let mut out = stdout().lock();
    if rows > 0 {
        execute!(out, cursor::MoveUp(rows as u16), Clear(ClearType::FromCursorDown)).ok();
    }
    writeln!(out, "{prefix} {message}").ok();
    for _ in 0..rows {
        writeln!(out).ok();
    }
    out.flush().ok();
}

/// Log one composite step as it runs.
pub fn trace_step(context: &str, index: usize, annotation: &str) {
    log("composite", &step_line(context, index, annotation));
}

fn step_line(context: &str, index: usize, annotation: &str) -> String {
    format!("{context} step {}: {annotation}", index + 1)
}

/// Cut `message` to `room` characters, marking the cut with `…`.
fn fit(message: &str, room: usize) -> Cow<'_, str> {
    if message.chars().count() <= room {
        return Cow::Borrowed(message);
    }
    let kept: String = message.chars().take(room.saturating_sub(1)).collect();
    Cow::Owned(if room == 0 { kept } else { kept + "…" })
}

/// Entity kinds are capitalized (`Album`, `ArtTag`); everything else is a
/// module name.
fn paint(module: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module {
        "check" => prefix.bright_green().bold(),
        "data" => prefix.bright_blue().bold(),
        "composite" => prefix.bright_cyan().bold(),
        "error" => prefix.bright_red().bold(),
        kind if kind.starts_with(char::is_uppercase) => prefix.bright_magenta().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}

// ============================================================================
// Progress Bars
// ============================================================================

/// One bar per entity kind, redrawn in place as things are evaluated.
///
/// Safe to tick from rayon workers; redraws are serialized.
pub struct ProgressBars {
    bars: Vec<KindBar>,
    label_width: usize,
    draw: Mutex<()>,
}

struct KindBar {
    kind: &'static str,
    total: usize,
    done: AtomicUsize,
}

impl ProgressBars {
    /// Bars for every kind with at least one thing, or `None` when there is
    /// at most one thing to evaluate.
    pub fn for_kinds(counts: &[(&'static str, usize)]) -> Option<Self> {
        let bars: Vec<KindBar> = counts
            .iter()
            .filter(|(_, total)| *total > 0)
            .map(|&(kind, total)| KindBar { kind, total, done: AtomicUsize::new(0) })
            .collect();
        if bars.iter().map(|bar| bar.total).sum::<usize>() <= 1 {
            return None;
        }

        let mut out = stdout().lock();
        for _ in &bars {
            writeln!(out).ok();
        }
        out.flush().ok();
        ACTIVE_ROWS.store(bars.len(), Ordering::SeqCst);

        let label_width = bars.iter().map(|bar| bar.kind.len() + 2).max().unwrap_or_default();
        Some(Self { bars, label_width, draw: Mutex::new(()) })
    }

    /// Count one evaluated thing of `kind`.
    pub fn tick(&self, kind: &str) {
        let Some(row) = self.bars.iter().position(|bar| bar.kind == kind) else {
            return;
        };
        let done = self.bars[row].done.fetch_add(1, Ordering::Relaxed) + 1;
        self.redraw(row, done);
    }

    #[allow(clippy::cast_possible_truncation)] // rows is the number of kinds
    fn redraw(&self, row: usize, done: usize) {
        let _guard = self.draw.lock().ok();
        let bar = &self.bars[row];
        let columns = terminal_width().saturating_sub(self.label_width + 1);

        let label = format!("{:width$}", "", width = self.label_width - bar.kind.len() - 2);
        let up = (self.bars.len() - row) as u16;
        let mut out = stdout().lock();
        execute!(out, cursor::MoveUp(up), Clear(ClearType::CurrentLine)).ok();
        write!(out, "{}{label} {}", paint(bar.kind), bar_body(done, bar.total, columns)).ok();
        execute!(out, cursor::MoveDown(up)).ok();
        write!(out, "\r").ok();
        out.flush().ok();
    }

    /// Clear the bar area and hand the terminal back to plain log lines.
    #[allow(clippy::cast_possible_truncation)] // rows is the number of kinds
    pub fn finish(&self) {
        if ACTIVE_ROWS.swap(0, Ordering::SeqCst) == 0 {
            return;
        }
        let _guard = self.draw.lock().ok();
        let rows = self.bars.len() as u16;
        let mut out = stdout().lock();
        execute!(out, cursor::MoveUp(rows), Clear(ClearType::FromCursorDown)).ok();
        out.flush().ok();
    }
}

impl Drop for ProgressBars {
    fn drop(&mut self) {
        self.finish();
    }
}

/// `████░░░░ done/total`, the bar sized to fit `columns`.
fn bar_body(done: usize, total: usize, columns: usize) -> String {
    let count = format!("{done}/{total}");
    let width = columns.saturating_sub(count.len() + 1).clamp(BAR_MIN, BAR_MAX);
    let filled = if total == 0 { 0 } else { (done.min(total) * width) / total };
    format!("{}{} {count}", "█".repeat(filled), "░".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_line_numbers_from_one() {
        assert_eq!(
            step_line("Album.tracks", 2, "with_flattened_list"),
            "Album.tracks step 3: with_flattened_list"
        );
    }

    #[test]
    fn test_fit_marks_cut_messages() {
        assert_eq!(fit("linked 3 things", 40), "linked 3 things");
        assert_eq!(fit("Déjà Vu (Remix)", 6), "Déjà …");
        assert_eq!(fit("anything", 0), "");
    }

    #[test]
    fn test_bar_body_fills_in_proportion() {
        assert_eq!(bar_body(5, 10, 0), format!("{}{} 5/10", "█".repeat(5), "░".repeat(5)));
        assert_eq!(bar_body(340, 340, 200), format!("{} 340/340", "█".repeat(BAR_MAX)));
        assert_eq!(bar_body(0, 0, 30), format!("{} 0/0", "░".repeat(26)));
    }

    #[test]
    fn test_kinds_and_modules_keep_their_names() {
        for name in ["check", "data", "composite", "error", "dump", "ArtTag"] {
            assert_eq!(&*paint(name), format!("[{name}]"));
        }
    }

    #[test]
    fn test_no_bars_for_a_single_thing() {
        assert!(ProgressBars::for_kinds(&[("Album", 1), ("Track", 0)]).is_none());
        assert!(ProgressBars::for_kinds(&[]).is_none());
    }
}
