use std::io;

use indicatif::ProgressBar;
use tracing_subscriber::filter::LevelFilter;

use crate::options::LogLevel;

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            // tracing has nothing above ERROR
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }
}

/// Writes log lines with `progress` cleared from the terminal, so events and
/// the bar never share a line.
pub struct SuspendingWriter<W> {
    progress: ProgressBar,
    inner: W,
}

impl<W: io::Write> io::Write for SuspendingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = &mut self.inner;
        self.progress.suspend(|| inner.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        let inner = &mut self.inner;
        self.progress.suspend(|| inner.flush())
    }
}

/// Installs the stderr subscriber for the whole run. Later calls are ignored.
///
/// `progress` is the bar the run will draw, also on stderr.
pub fn init(level: LogLevel, progress: &ProgressBar) {
    let progress = progress.clone();
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from(level))
        .with_target(false)
        .without_time()
        .with_writer(move || SuspendingWriter {
            progress: progress.clone(),
            inner: io::stderr(),
        })
        .try_init();
}
