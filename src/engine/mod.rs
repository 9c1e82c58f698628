//! Optimizer Execution Engines
//!
//! Provides a unified interface for running the optimizer script:
//!
//! - **nodejs**: spawns an external Node.js process (default)
//! - **rhino**: embedded Boa interpreter, runs in-process (fallback)
//!
//! # Usage
//!
//! ```rust,ignore
//! use rjs_optimize::engine::{Engine, EngineKind, EngineResolver};
//! use rjs_optimize::diagnostics::LogReporter;
//!
//! let mut reporter = LogReporter::default();
//! let engine = EngineResolver::from_env().resolve(EngineKind::ExternalProcess, None, &mut reporter);
//! engine.run(None, &invocation, &mut reporter)?;
//! ```

pub mod embedded;
pub mod node;
pub mod resolver;

pub use embedded::EmbeddedEngine;
pub use node::NodeEngine;
pub use resolver::{discover_executable, EngineResolver, NODE_CANDIDATES};

use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::optimizer::OptimizerInvocation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors from execution engines
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to read {}: {source}", .path.display())]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("No default optimizer script for the {engine} engine (searched: {})", join_paths(.searched))]
    ScriptNotFound {
        engine: EngineKind,
        searched: Vec<PathBuf>,
    },
    #[error("Script evaluation failed: {message}")]
    Evaluation { message: String },
    #[error("Optimizer exited with {}", describe_status(.status))]
    Exited { status: Option<i32> },
    #[error("{count} fatal diagnostic(s) reported")]
    FatalDiagnostics { count: usize },
    #[error("Failed to launch {}: {source}", .executable.display())]
    Launch {
        executable: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Engine not compiled in: {0}. Rebuild with --features {1}")]
    EngineNotAvailable(String, String),
}

fn join_paths(paths: &[PathBuf]) -> String {
    let names: Vec<_> = paths.iter().map(|p| p.display().to_string()).collect();
    names.join(", ")
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Available engine types, also used as the configured runner preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum EngineKind {
    /// In-process interpreter
    #[serde(rename = "rhino")]
    Embedded,
    /// External Node.js process
    #[default]
    #[serde(rename = "nodejs")]
    ExternalProcess,
}

impl EngineKind {
    /// Configuration name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Embedded => "rhino",
            Self::ExternalProcess => "nodejs",
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Embedded => "Embedded (Boa)",
            Self::ExternalProcess => "Node.js",
        }
    }

    /// Get the feature flag name for this engine
    pub fn feature_name(&self) -> &'static str {
        match self {
            Self::Embedded => "embedded-engine",
            Self::ExternalProcess => "default",
        }
    }

    /// Check if this engine is compiled in
    pub fn is_available(&self) -> bool {
        match self {
            #[cfg(feature = "embedded-engine")]
            Self::Embedded => true,
            #[cfg(not(feature = "embedded-engine"))]
            Self::Embedded => false,
            Self::ExternalProcess => true,
        }
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nodejs" | "node" | "external" => Ok(Self::ExternalProcess),
            "rhino" | "embedded" | "boa" => Ok(Self::Embedded),
            other => Err(format!(
                "unknown runner '{}' (expected nodejs or rhino)",
                other
            )),
        }
    }
}

impl TryFrom<String> for EngineKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Trait for optimizer execution engines
pub trait Engine {
    /// Get the engine type
    fn kind(&self) -> EngineKind;

    /// Human-readable description, e.g. the executable in use
    fn describe(&self) -> String;

    /// Run `script` (or the engine's default script) against the invocation.
    ///
    /// Every diagnostic is forwarded to `reporter` before this returns.
    fn run(
        &self,
        script: Option<&Path>,
        invocation: &OptimizerInvocation,
        reporter: &mut dyn DiagnosticSink,
    ) -> Result<(), EngineError>;
}

/// The closed set of engines the resolver can produce
#[derive(Debug, Clone)]
pub enum ResolvedEngine {
    Embedded(EmbeddedEngine),
    Node(NodeEngine),
}

impl ResolvedEngine {
    /// Executable path when an external process will be spawned
    pub fn executable(&self) -> Option<&Path> {
        match self {
            Self::Embedded(_) => None,
            Self::Node(node) => Some(node.executable()),
        }
    }
}

impl Engine for ResolvedEngine {
    fn kind(&self) -> EngineKind {
        match self {
            Self::Embedded(engine) => engine.kind(),
            Self::Node(engine) => engine.kind(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Embedded(engine) => engine.describe(),
            Self::Node(engine) => engine.describe(),
        }
    }

    fn run(
        &self,
        script: Option<&Path>,
        invocation: &OptimizerInvocation,
        reporter: &mut dyn DiagnosticSink,
    ) -> Result<(), EngineError> {
        match self {
            Self::Embedded(engine) => engine.run(script, invocation, reporter),
            Self::Node(engine) => engine.run(script, invocation, reporter),
        }
    }
}

/// Forwards events to the caller's sink and counts the fatal ones
pub(crate) struct Forwarder<'a> {
    sink: &'a mut dyn DiagnosticSink,
    fatal: usize,
}

impl<'a> Forwarder<'a> {
    pub(crate) fn new(sink: &'a mut dyn DiagnosticSink) -> Self {
        Self { sink, fatal: 0 }
    }

    pub(crate) fn emit(&mut self, event: DiagnosticEvent) {
        if self.sink.report(event) {
            self.fatal += 1;
        }
    }

    /// Fail if any forwarded event was fatal
    pub(crate) fn finish(self) -> Result<(), EngineError> {
        if self.fatal > 0 {
            return Err(EngineError::FatalDiagnostics { count: self.fatal });
        }
        Ok(())
    }
}

/// Make sure a file the engine needs can be opened
pub(crate) fn check_readable(path: &Path) -> Result<(), EngineError> {
    File::open(path)
        .map(drop)
        .map_err(|source| EngineError::ScriptRead {
            path: path.to_path_buf(),
            source,
        })
}

/// Pick the explicit script, or the first existing default candidate
pub(crate) fn select_script(
    engine: EngineKind,
    explicit: Option<&Path>,
    candidates: Vec<PathBuf>,
) -> Result<PathBuf, EngineError> {
    if let Some(script) = explicit {
        return Ok(script.to_path_buf());
    }
    match candidates.iter().find(|p| p.is_file()) {
        Some(found) => Ok(found.clone()),
        None => Err(EngineError::ScriptNotFound {
            engine,
            searched: candidates,
        }),
    }
}
