use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;

/// Browser console method an event of a given level is written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleMethod {
    Debug,
    Log,
    Warn,
    Error,
}

impl ConsoleMethod {
    pub fn for_level(level: &Level) -> Self {
        match *level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO => Self::Log,
            _ => Self::Debug,
        }
    }
}

struct Console;

/// Buffers one formatted event and hands it to the console when dropped.
pub struct ConsoleWriter {
    method: ConsoleMethod,
    buffer: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let line = String::from_utf8_lossy(&self.buffer);
        let line = line.trim_end();
        if line.is_empty() {
            return;
        }
        match self.method {
            ConsoleMethod::Debug => gloo::console::debug!(line),
            ConsoleMethod::Log => gloo::console::log!(line),
            ConsoleMethod::Warn => gloo::console::warn!(line),
            ConsoleMethod::Error => gloo::console::error!(line),
        }
    }
}

impl<'a> MakeWriter<'a> for Console {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter {
            method: ConsoleMethod::Log,
            buffer: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter {
            method: ConsoleMethod::for_level(meta.level()),
            buffer: Vec::new(),
        }
    }
}

/// Routes `tracing` events from the client core to the browser console.
/// Timestamps are left out; the console stamps lines itself and the system
/// clock is unavailable here. Calling it again is a no-op.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_writer(Console)
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .without_time()
        .try_init();
}
