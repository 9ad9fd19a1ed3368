//! User-facing output sinks.
//!
//! A [`Logger`] is a writable stream. The view owns two of them, one for
//! progress messages and one for debug output. How text is formatted is up to
//! whoever writes to the stream.
//!
//! These are distinct from the `tracing` diagnostics the crate emits
//! internally: loggers carry output the application chose to print.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};

enum Sink {
    Stdout(io::Stdout),
    Stderr(io::Stderr),
    File(BufWriter<File>),
    Writer(Box<dyn Write + Send>),
    Null(io::Sink),
}

/// A writable output sink.
///
/// ```rust
/// use std::io::Write;
/// use zoneview_runtime::Logger;
///
/// let mut logger = Logger::null();
/// writeln!(logger.stream(), "discarded").unwrap();
/// assert!(logger.is_null());
/// ```
pub struct Logger {
    sink: Sink,
}

impl Logger {
    pub fn stdout() -> Self {
        Self {
            sink: Sink::Stdout(io::stdout()),
        }
    }

    pub fn stderr() -> Self {
        Self {
            sink: Sink::Stderr(io::stderr()),
        }
    }

    /// A logger that discards everything.
    pub fn null() -> Self {
        Self {
            sink: Sink::Null(io::sink()),
        }
    }

    /// A logger writing to `path`, truncating it.
    pub fn file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            sink: Sink::File(BufWriter::new(file)),
        })
    }

    /// A logger writing to an arbitrary writer.
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Sink::Writer(Box::new(writer)),
        }
    }

    /// The stream to write to.
    pub fn stream(&mut self) -> &mut dyn Write {
        match &mut self.sink {
            Sink::Stdout(s) => s,
            Sink::Stderr(s) => s,
            Sink::File(s) => s,
            Sink::Writer(s) => s.as_mut(),
            Sink::Null(s) => s,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.sink, Sink::Null(_))
    }

    /// Name of the sink kind.
    pub fn kind(&self) -> &'static str {
        match self.sink {
            Sink::Stdout(_) => "stdout",
            Sink::Stderr(_) => "stderr",
            Sink::File(_) => "file",
            Sink::Writer(_) => "writer",
            Sink::Null(_) => "null",
        }
    }

    /// Duplicate the logger.
    ///
    /// Loggers that own a file or writer cannot be duplicated, since two
    /// handles would interleave writes to the same destination.
    pub fn try_clone(&self) -> Result<Logger> {
        match self.sink {
            Sink::Stdout(_) => Ok(Logger::stdout()),
            Sink::Stderr(_) => Ok(Logger::stderr()),
            Sink::Null(_) => Ok(Logger::null()),
            Sink::File(_) | Sink::Writer(_) => {
                Err(Error::NotSupported("cloning a file or writer logger"))
            }
        }
    }
}

impl Write for Logger {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream().flush()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("kind", &self.kind()).finish()
    }
}

/// Default progress and debug loggers for a participant.
///
/// Only the root participant writes; every other rank, and a process outside
/// the communicator, gets null loggers.
pub(crate) fn root_only(rank: Option<usize>) -> (Logger, Logger) {
    if rank == Some(0) {
        (Logger::stdout(), Logger::stderr())
    } else {
        (Logger::null(), Logger::null())
    }
}
