//! Diagnostic Events and Reporters
//!
//! Engines emit [`DiagnosticEvent`]s while the optimizer runs. A
//! [`DiagnosticSink`] receives each event and decides whether it is fatal.
//!
//! - [`LogReporter`] forwards events to the `log` facade (the host's sink)
//! - [`RecordingSink`] keeps events in memory

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Severity of a diagnostic event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational output (optimizer progress, engine fallback)
    Info,
    /// Something the user should look at
    Warning,
    /// Script evaluation or runtime error
    Error,
}

impl Severity {
    /// Get display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Where a diagnostic originated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl SourceLocation {
    /// Location covering a whole file
    pub fn file(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
            if let Some(column) = self.column {
                write!(f, ":{}", column)?;
            }
        }
        Ok(())
    }
}

/// A single message produced by an engine during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub severity: Severity,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl DiagnosticEvent {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            location: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Attach a source location
    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {}", location, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Receiver for diagnostic events
pub trait DiagnosticSink {
    /// Record one event. Returns `true` if the sink treats it as fatal.
    fn report(&mut self, event: DiagnosticEvent) -> bool;
}

/// Forwards diagnostics to the `log` facade
#[derive(Debug, Clone, Copy)]
pub struct LogReporter {
    errors_fatal: bool,
    warnings_fatal: bool,
}

impl Default for LogReporter {
    fn default() -> Self {
        Self {
            errors_fatal: true,
            warnings_fatal: false,
        }
    }
}

impl LogReporter {
    pub fn new(errors_fatal: bool) -> Self {
        Self {
            errors_fatal,
            ..Self::default()
        }
    }

    /// Treat warnings as fatal too
    pub fn warnings_fatal(mut self, fatal: bool) -> Self {
        self.warnings_fatal = fatal;
        self
    }

    /// Whether an event of this severity fails the run
    pub fn is_fatal(&self, severity: Severity) -> bool {
        match severity {
            Severity::Info => false,
            Severity::Warning => self.warnings_fatal,
            Severity::Error => self.errors_fatal,
        }
    }
}

impl DiagnosticSink for LogReporter {
    fn report(&mut self, event: DiagnosticEvent) -> bool {
        match event.severity {
            Severity::Info => log::info!("{}", event),
            Severity::Warning => log::warn!("{}", event),
            Severity::Error => log::error!("{}", event),
        }
        self.is_fatal(event.severity)
    }
}

/// Keeps every event in memory, in arrival order
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Vec<DiagnosticEvent>,
    fatal_at: Option<Severity>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat events at or above `severity` as fatal
    pub fn fatal_at(severity: Severity) -> Self {
        Self {
            events: Vec::new(),
            fatal_at: Some(severity),
        }
    }

    pub fn events(&self) -> &[DiagnosticEvent] {
        &self.events
    }

    /// Events with exactly this severity
    pub fn with_severity(&self, severity: Severity) -> Vec<&DiagnosticEvent> {
        self.events
            .iter()
            .filter(|e| e.severity == severity)
            .collect()
    }

    /// Messages in arrival order
    pub fn messages(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.message.as_str()).collect()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&mut self, event: DiagnosticEvent) -> bool {
        let fatal = self.fatal_at.is_some_and(|min| event.severity >= min);
        self.events.push(event);
        fatal
    }
}
