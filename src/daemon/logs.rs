use anyhow::{Context, Result};
use log::debug;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Manages the per-program log files: opening them for append before a
/// spawn, and rotating them without disturbing an active writer (§4.4).
pub struct LogManager {
    log_dir: PathBuf,
    max_size_bytes: u64,
}

/// A page of log lines plus enough bookkeeping for the client to page
/// further or detect a rotation that happened between reads.
pub struct LogPage {
    pub lines: Vec<String>,
    pub offset: usize,
    pub total_lines: usize,
    pub total_bytes: u64,
    pub rotated: bool,
}

impl LogManager {
    pub fn new(log_dir: PathBuf, max_size_mb: u64) -> Self {
        LogManager {
            log_dir,
            max_size_bytes: max_size_mb * 1024 * 1024,
        }
    }

    fn log_path(&self, slug: &str) -> PathBuf {
        self.log_dir.join(format!("{}.log", slug))
    }

    fn rotated_path(&self, slug: &str) -> PathBuf {
        self.log_dir.join(format!("{}.log.1", slug))
    }

    /// Opens (creating if needed) the program's log file in append mode.
    /// The returned handle is meant to be given directly to the child as
    /// its combined stdout/stderr.
    pub fn open_for_append(&self, slug: &str) -> Result<File> {
        fs::create_dir_all(&self.log_dir)
            .with_context(|| format!("failed to create log directory {}", self.log_dir.display()))?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(slug))
            .with_context(|| format!("failed to open log file for '{}'", slug))
    }

    /// Appends a single banner line to the program's log, used by the
    /// Installer to narrate pipeline progress and by the supervisor to
    /// record lifecycle events (spawn failures, stop/restart).
    pub fn append_banner(&self, slug: &str, line: &str) -> Result<()> {
        use std::io::Write;
        let mut file = self.open_for_append(slug)?;
        writeln!(file, "--- {} ---", line)?;
        Ok(())
    }

    /// Checks the live log file's size and rotates it if it exceeds the
    /// configured threshold. Rotation copies the current file to
    /// `{slug}.log.1` (overwriting any prior rotation) then truncates the
    /// live file to zero length. Because the child holds an append-mode
    /// file descriptor, it keeps writing at the new offset 0 without ever
    /// needing to reopen -- this is what makes copy-then-truncate safe
    /// under an active writer.
    pub fn rotate_if_needed(&self, slug: &str) -> Result<bool> {
        let path = self.log_path(slug);
        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(_) => return Ok(false),
        };
        if metadata.len() <= self.max_size_bytes {
            return Ok(false);
        }
        debug!(
            "Rotating log for '{}' ({} bytes > {} byte threshold)",
            slug,
            metadata.len(),
            self.max_size_bytes
        );
        fs::copy(&path, self.rotated_path(slug))
            .with_context(|| format!("failed to copy log for '{}' during rotation", slug))?;
        let file = OpenOptions::new()
            .write(true)
            .open(&path)
            .with_context(|| format!("failed to truncate log for '{}'", slug))?;
        file.set_len(0)?;
        Ok(true)
    }

    /// Reads a page of lines from the live log, starting at `offset_lines`
    /// (0-based) and returning at most `max_lines`. Tolerant of rotation:
    /// if `offset_lines` is past the end, the final page is returned
    /// instead of an empty one.
    pub fn read(&self, slug: &str, offset_lines: usize, max_lines: usize) -> Result<LogPage> {
        let path = self.log_path(slug);
        let total_bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(_) => {
                return Ok(LogPage {
                    lines: Vec::new(),
                    offset: 0,
                    total_lines: 0,
                    total_bytes: 0,
                    rotated: false,
                })
            }
        };
        let reader = BufReader::new(file);
        let all_lines: Vec<String> = reader
            .lines()
            .collect::<std::io::Result<Vec<String>>>()
            .with_context(|| format!("failed to read log for '{}'", slug))?;

        let total_lines = all_lines.len();
        let offset_past_end = offset_lines >= total_lines;
        let start = if offset_past_end {
            total_lines.saturating_sub(max_lines.min(total_lines))
        } else {
            offset_lines
        };
        let end = (start + max_lines).min(total_lines);
        let lines = all_lines[start..end].to_vec();

        // A client's `offset_lines` only runs past the live file's current
        // line count if the file was truncated out from under it -- i.e. a
        // rotation happened since that offset was handed out. A companion
        // `.log.1` is the evidence that a rotation has actually occurred,
        // as opposed to the client simply being caught up to a short log.
        let rotated = offset_past_end && self.rotated_path(slug).exists();

        Ok(LogPage {
            lines,
            offset: start,
            total_lines,
            total_bytes,
            rotated,
        })
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}
