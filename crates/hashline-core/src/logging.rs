//! Logging setup with indicatif integration
//!
//! Stages run on named threads (`SingleHash`, `MultiHash-12`, ...). At debug
//! verbosity every line is tagged with the emitting thread so interleaved
//! stage output stays readable.

use indicatif::MultiProgress;

/// How chatty the logger should be when `RUST_LOG` is unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Debug,
}

impl Verbosity {
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if debug {
            Self::Debug
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    fn default_filter(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "info",
            Self::Debug => "debug",
        }
    }
}

/// ANSI color code and padded label for a log level.
fn level_style(level: log::Level, color: bool) -> (&'static str, &'static str, &'static str) {
    let label = match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    };
    if !color {
        return ("", label, "");
    }
    let ansi = match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    };
    (ansi, label, "\x1b[0m")
}

/// Render one log line, tagging it with the current thread name when asked.
fn render(record: &log::Record, color: bool, with_thread: bool) -> String {
    let (pre, label, post) = level_style(record.level(), color);
    if with_thread {
        let current = std::thread::current();
        let thread = current.name().unwrap_or("?");
        format!("[{pre}{label}{post}] ({thread}) {}", record.args())
    } else {
        format!("[{pre}{label}{post}] {}", record.args())
    }
}

/// Logger that prints through indicatif MultiProgress to avoid mixing with stage lines.
pub struct IndicatifLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
    with_thread: bool,
}

impl IndicatifLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress, with_thread: bool) -> Self {
        Self {
            inner,
            multi,
            with_thread,
        }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if self.inner.enabled(record.metadata()) {
            // TTY path, always colored
            let line = render(record, true, self.with_thread);
            self.multi.suspend(|| eprintln!("{line}"));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Initialize logging, routing through `multi` when stage lines are on screen.
pub fn init_logging(
    verbosity: Verbosity,
    multi: Option<&MultiProgress>,
) -> Result<(), log::SetLoggerError> {
    use std::io::Write;

    let with_thread = verbosity == Verbosity::Debug;
    let env = env_logger::Env::default().default_filter_or(verbosity.default_filter());

    if let Some(multi) = multi {
        let logger = env_logger::Builder::from_env(env).build();
        let max_level = logger.filter();
        log::set_boxed_logger(Box::new(IndicatifLogger::new(
            logger,
            multi.clone(),
            with_thread,
        )))?;
        log::set_max_level(max_level);
    } else {
        // Non-TTY: no ANSI colors
        env_logger::Builder::from_env(env)
            .format(move |buf, record| writeln!(buf, "{}", render(record, false, with_thread)))
            .try_init()?;
    }
    Ok(())
}
