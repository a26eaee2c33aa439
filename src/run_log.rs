//! The run narrative written next to the result tables.
//!
//! Every stage receives the same `RunLog` and appends advisory lines to it;
//! each line is also forwarded to the `log` facade so `RUST_LOG` users see the
//! same notes on stderr. The log is flushed once, when the run finishes.

use anyhow::{Context, Result};
use log::Level;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

const RULE: &str = "##############################";

pub struct RunLog<W: Write> {
    out: BufWriter<W>,
    write_failed: bool,
}

impl RunLog<File> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;
        Ok(RunLog::new(file))
    }
}

impl<W: Write> RunLog<W> {
    pub fn new(writer: W) -> Self {
        RunLog {
            out: BufWriter::new(writer),
            write_failed: false,
        }
    }

    pub fn note(&mut self, level: Level, message: impl AsRef<str>) {
        let message = message.as_ref();
        log::log!(level, "{}", message);
        let line = format!("[{}] {}", level, message);
        self.write_line(&line);
    }

    pub fn info(&mut self, message: impl AsRef<str>) {
        self.note(Level::Info, message);
    }

    pub fn warn(&mut self, message: impl AsRef<str>) {
        self.note(Level::Warn, message);
    }

    pub fn error(&mut self, message: impl AsRef<str>) {
        self.note(Level::Error, message);
    }

    /// Unlevelled section heading, not mirrored to the `log` facade.
    pub fn section(&mut self, title: &str) {
        self.write_line("");
        self.write_line(title);
        self.write_line("");
    }

    pub fn banner(&mut self, lines: &[&str]) {
        self.write_line("");
        self.write_line(RULE);
        for line in lines {
            self.write_line(line);
        }
        self.write_line(RULE);
        self.write_line("");
    }

    /// Flushes buffered lines and hands back the underlying writer.
    pub fn finish(self) -> io::Result<W> {
        self.out.into_inner().map_err(|e| e.into_error())
    }

    fn write_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line) {
            // One warning is enough; the run continues without its log file.
            if !self.write_failed {
                log::warn!("Failed to write run log: {}", e);
                self.write_failed = true;
            }
        }
    }
}
