//! Logging utilities with colored output and batch progress display.
//!
//! Provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `debug!` macro gated on the global `--verbose` flag
//! - `ProgressLine` single-line counter display for batch runs
//!
//! # Example
//!
//! ```ignore
//! log!("fetch"; "resolved {} from {}", code, url);
//!
//! let progress = ProgressLine::new(&["done", "failed"], 120);
//! progress.inc("done");
//! progress.finish();
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Active progress bar count (for log coordination)
static BAR_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Log a message with a colored module prefix
#[inline]
#[allow(clippy::cast_possible_truncation)] // bar count is 0 or 1
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);

    let mut stdout = stdout().lock();

    let bar_count = BAR_COUNT.load(Ordering::SeqCst);
    if bar_count > 0 {
        execute!(stdout, cursor::MoveToColumn(0)).ok();
        execute!(stdout, Clear(ClearType::CurrentLine)).ok();
    }

    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str) -> String {
    let prefix = format!("[{module}]");
    match module {
        "fetch" | "cache" => prefix.bright_blue().bold().to_string(),
        "index" => prefix.bright_green().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        "warning" => prefix.yellow().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Progress Line (single-line counters)
// ============================================================================

/// Single-line progress display with multiple counters
///
/// Displays: `[batch] done(42/120) skipped(3/120) failed(1/120)`
///
/// All counters update in place on the same line. Uses `try_lock` to avoid
/// blocking worker tasks - if the display is busy, the refresh is skipped.
pub struct ProgressLine {
    counters: Vec<Counter>,
    total: usize,
    lock: Mutex<()>,
}

struct Counter {
    name: &'static str,
    current: AtomicUsize,
}

impl ProgressLine {
    /// Create a new progress display with the given counter names and the
    /// shared total (number of codes in the batch).
    pub fn new(names: &[&'static str], total: usize) -> Self {
        let counters = names
            .iter()
            .map(|name| Counter {
                name,
                current: AtomicUsize::new(0),
            })
            .collect();

        BAR_COUNT.store(1, Ordering::SeqCst);

        let progress = Self {
            counters,
            total,
            lock: Mutex::new(()),
        };
        progress.display();
        progress
    }

    /// Increment the counter with the given name.
    ///
    /// Non-blocking: if the display lock is held, skips the refresh.
    #[inline]
    pub fn inc(&self, name: &str) {
        for counter in &self.counters {
            if counter.name == name {
                counter.current.fetch_add(1, Ordering::Relaxed);
                if self.lock.try_lock().is_some() {
                    self.display();
                }
                return;
            }
        }
    }

    fn render_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.counters.len());
        for counter in &self.counters {
            let current = counter.current.load(Ordering::Relaxed);
            parts.push(format!("{}({}/{})", counter.name, current, self.total));
        }
        parts.join(" ")
    }

    /// Display the current progress line (overwrites current line with \r).
    fn display(&self) {
        let line = self.render_line();
        let prefix = colorize_prefix("batch");

        let mut stdout = stdout().lock();
        execute!(
            stdout,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine)
        )
        .ok();
        write!(stdout, "{prefix} {line}").ok();
        stdout.flush().ok();
    }

    /// Finish progress display, preserve the line and move to next line.
    pub fn finish(self) {
        BAR_COUNT.store(0, Ordering::SeqCst);

        {
            let _guard = self.lock.lock(); // Wait for any pending display
            let line = self.render_line();
            let prefix = colorize_prefix("batch");

            let mut stdout = stdout().lock();
            execute!(
                stdout,
                cursor::MoveToColumn(0),
                Clear(ClearType::CurrentLine)
            )
            .ok();
            writeln!(stdout, "{prefix} {line}").ok();
            stdout.flush().ok();
        }

        std::mem::forget(self); // Prevent Drop from clearing
    }
}

impl Drop for ProgressLine {
    fn drop(&mut self) {
        BAR_COUNT.store(0, Ordering::SeqCst);

        // Clear the line on drop (if not finished properly)
        let mut stdout = stdout().lock();
        execute!(
            stdout,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine)
        )
        .ok();
        stdout.flush().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_counters() {
        let progress = ProgressLine::new(&["done", "failed"], 3);
        progress.inc("done");
        progress.inc("done");
        progress.inc("failed");
        progress.inc("unknown"); // silently ignored
        assert_eq!(progress.render_line(), "done(2/3) failed(1/3)");
        progress.finish();
    }

    #[test]
    fn test_verbose_flag() {
        set_verbose(true);
        assert!(is_verbose());
        set_verbose(false);
        assert!(!is_verbose());
    }
}
