//! Fan-out logging: every line goes to the debug log file and to stdout.

use anyhow::{Context, Result};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

/// Writer that duplicates every write into each of its sinks.
pub struct Tee {
    sinks: Vec<Box<dyn Write + Send>>,
}

impl Tee {
    pub fn new(sinks: Vec<Box<dyn Write + Send>>) -> Self {
        Self { sinks }
    }
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for sink in &mut self.sinks {
            sink.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }
}

/// Cheap-to-clone handle over the process logger.
///
/// Records are formatted as the bare message and handed to env_logger's pipe
/// target in a single write, so lines from concurrent pipelines interleave
/// but never tear.
#[derive(Clone)]
pub struct DebugLog {
    inner: Arc<env_logger::Logger>,
}

impl DebugLog {
    /// Truncate `path` and log to it and to stdout.
    pub fn open(path: &Path, verbose: bool) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        Ok(Self::with_sinks(
            vec![Box::new(file), Box::new(io::stdout())],
            verbose,
        ))
    }

    pub fn with_sinks(sinks: Vec<Box<dyn Write + Send>>, verbose: bool) -> Self {
        let level = if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };

        let logger = env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .write_style(env_logger::WriteStyle::Never)
            .format(|buf, record| writeln!(buf, "{}", record.args()))
            .target(env_logger::Target::Pipe(Box::new(Tee::new(sinks))))
            .build();

        Self {
            inner: Arc::new(logger),
        }
    }

    /// Route the `log` macros to this handle as well.
    pub fn install(&self) -> Result<()> {
        log::set_boxed_logger(Box::new(self.clone()))
            .context("A global logger is already installed")?;
        log::set_max_level(self.inner.filter());
        Ok(())
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Info, args);
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Error, args);
    }

    fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        self.inner.log(
            &Record::builder()
                .args(args)
                .level(level)
                .target(module_path!())
                .build(),
        );
    }
}

impl Log for DebugLog {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        self.inner.log(record);
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// In-memory sink shared between a `DebugLog` and a test.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl Captured {
    pub fn log(&self) -> DebugLog {
        DebugLog::with_sinks(vec![Box::new(self.clone())], false)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[cfg(test)]
impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_sink_receives_the_same_line() {
        let first = Captured::default();
        let second = Captured::default();
        let log = DebugLog::with_sinks(
            vec![Box::new(first.clone()), Box::new(second.clone())],
            false,
        );

        log.info(format_args!("Report #{} cover converted.", "annual"));

        assert_eq!(first.text(), "Report #annual cover converted.\n");
        assert_eq!(first.text(), second.text());
    }

    #[test]
    fn concurrent_lines_are_never_torn() {
        const THREADS: usize = 12;
        const LINES: usize = 150;

        let captured = Captured::default();
        let log = captured.log();

        std::thread::scope(|scope| {
            for t in 0..THREADS {
                let log = log.clone();
                scope.spawn(move || {
                    let fill = char::from(b'a' + t as u8).to_string().repeat(400);
                    for n in 0..LINES {
                        log.info(format_args!("t{t:02} n{n:03} {fill}"));
                    }
                });
            }
        });

        let text = captured.text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), THREADS * LINES);
        for line in lines {
            let (head, fill) = line.split_at(9);
            let t: usize = head[1..3].parse().unwrap();
            let expected = char::from(b'a' + t as u8);
            assert_eq!(fill.len(), 400, "torn line: {line}");
            assert!(fill.chars().all(|c| c == expected), "torn line: {line}");
        }
    }

    #[test]
    fn debug_lines_need_verbose() {
        let quiet = Captured::default();
        let log = quiet.log();
        log.log(
            &Record::builder()
                .args(format_args!("hidden"))
                .level(Level::Debug)
                .build(),
        );
        log.error(format_args!("exec error: boom"));
        assert_eq!(quiet.text(), "exec error: boom\n");
    }

    #[test]
    fn open_truncates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debug.log");
        std::fs::write(&path, "stale contents\n").unwrap();

        let log = DebugLog::open(&path, false).unwrap();
        log.info(format_args!("fresh"));
        log.flush();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh\n");
    }
}
