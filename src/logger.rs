//! Kernel logging backend: `log` records to the debug console.
//!
//! M-mode only. The logger and its lock live in kernel RAM, so the U-mode
//! task cannot use `log` at all (it would fault on the first access); the
//! task writes its diagnostics to the console UART directly.

use core::fmt::{self, Write};

use heapless::String as HeaplessString;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

const MAX_LINE: usize = 160;

pub struct ConsoleLogger<W> {
    sink: Mutex<W>,
    level: LevelFilter,
}

impl<W: Write + Send> ConsoleLogger<W> {
    pub const fn new(sink: W, level: LevelFilter) -> Self {
        Self {
            sink: Mutex::new(sink),
            level,
        }
    }

    /// Route the `log` facade here. Succeeds once per boot.
    pub fn install(&'static self) -> Result<(), SetLoggerError>
    where
        W: 'static,
    {
        log::set_logger(self)?;
        log::set_max_level(self.level);
        Ok(())
    }

    /// Direct access to the console, bypassing level filtering.
    pub fn with_sink<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        f(&mut self.sink.lock())
    }
}

impl<W: Write + Send> Log for ConsoleLogger<W> {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut line = Line::default();
        let _ = write!(line, "[{} {}] {}", record.level(), record.target(), record.args());
        line.terminate();
        let _ = self.sink.lock().write_str(line.as_str());
    }

    fn flush(&self) {}
}

/// Fixed-capacity line that truncates instead of dropping the whole record.
#[derive(Default)]
struct Line {
    text: HeaplessString<MAX_LINE>,
}

impl Line {
    const TERMINATOR: &'static str = "\r\n";

    fn terminate(&mut self) {
        let _ = self.text.push_str(Self::TERMINATOR);
    }

    fn as_str(&self) -> &str {
        self.text.as_str()
    }
}

impl Write for Line {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        // Keep room for the terminator.
        let room = MAX_LINE - Line::TERMINATOR.len();
        for c in s.chars() {
            if self.text.len() + c.len_utf8() > room {
                return Err(fmt::Error);
            }
            let _ = self.text.push(c);
        }
        Ok(())
    }
}
