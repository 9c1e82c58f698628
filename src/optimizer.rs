//! Optimizer Orchestration
//!
//! Runs one optimizer invocation on an engine and translates the engine's
//! failure into the stable [`OptimizeError`] taxonomy. Failures are never
//! retried: a bad build profile or script fails the same way every time.

use crate::diagnostics::DiagnosticSink;
use crate::engine::{Engine, EngineError};
use crate::filter::FilterError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures surfaced to the host build step
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("Failed to read {}", .path.display())]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to execute r.js: {message}")]
    Evaluation { message: String },
    #[error("r.js exited with an error{}", status_suffix(.status))]
    Optimization { status: Option<i32> },
    #[error("Failed to launch {}", .executable.display())]
    Launch {
        executable: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Error preparing build profile")]
    ConfigPreparation {
        #[source]
        source: FilterError,
    },
    #[error("No build profile configured (set config_file)")]
    MissingConfigFile,
}

fn status_suffix(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!(" (status {})", code),
        None => String::new(),
    }
}

impl OptimizeError {
    /// Short category name for logs and exit reporting
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ScriptRead { .. } => "script-read",
            Self::Evaluation { .. } => "evaluation",
            Self::Optimization { .. } => "optimization",
            Self::Launch { .. } => "launch",
            Self::ConfigPreparation { .. } => "config-preparation",
            Self::MissingConfigFile => "missing-config",
        }
    }
}

/// Inputs to one optimizer run. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizerInvocation {
    config_file: PathBuf,
    script: Option<PathBuf>,
    parameters: Vec<String>,
}

impl OptimizerInvocation {
    /// Invocation with the engine's default script and no extra parameters
    pub fn new(config_file: impl Into<PathBuf>) -> Self {
        Self {
            config_file: config_file.into(),
            script: None,
            parameters: Vec::new(),
        }
    }

    /// Use an explicit optimizer script
    pub fn with_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// Append parameters after the configuration path, in order
    pub fn with_parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters = parameters.into_iter().map(Into::into).collect();
        self
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn script(&self) -> Option<&Path> {
        self.script.as_deref()
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }
}

/// Sequences a single optimizer run
#[derive(Debug, Default, Clone, Copy)]
pub struct Optimizer;

impl Optimizer {
    pub fn new() -> Self {
        Self
    }

    /// Run `invocation` on `engine`, forwarding diagnostics to `reporter`
    pub fn optimize(
        &self,
        invocation: &OptimizerInvocation,
        reporter: &mut dyn DiagnosticSink,
        engine: &dyn Engine,
    ) -> Result<(), OptimizeError> {
        log::debug!(
            "Optimizing {} with {}",
            invocation.config_file().display(),
            engine.describe()
        );
        engine
            .run(invocation.script(), invocation, reporter)
            .map_err(Self::classify)
    }

    /// Map an engine failure onto the optimizer taxonomy
    pub fn classify(err: EngineError) -> OptimizeError {
        match err {
            EngineError::ScriptRead { path, source } => OptimizeError::ScriptRead { path, source },
            EngineError::ScriptNotFound { engine, searched } => {
                let path = searched
                    .first()
                    .cloned()
                    .unwrap_or_else(|| PathBuf::from("r.js"));
                OptimizeError::ScriptRead {
                    path,
                    source: io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("no default optimizer script for the {} engine", engine),
                    ),
                }
            }
            EngineError::Evaluation { message } => OptimizeError::Evaluation { message },
            EngineError::Exited { status } => OptimizeError::Optimization { status },
            EngineError::FatalDiagnostics { .. } => OptimizeError::Optimization { status: None },
            EngineError::Launch { executable, source } => {
                OptimizeError::Launch { executable, source }
            }
            err @ EngineError::EngineNotAvailable(..) => OptimizeError::Evaluation {
                message: err.to_string(),
            },
        }
    }
}
