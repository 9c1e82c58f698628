//! Engine Detection and Selection
//!
//! Picks the engine for a run from the runner preference and an optional
//! explicit executable. A missing Node.js is a routing decision, not an
//! error: resolution falls back to the embedded engine.

use super::{EmbeddedEngine, EngineKind, NodeEngine, ResolvedEngine};
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Executable names tried in order during discovery
pub const NODE_CANDIDATES: &[&str] = &["node", "nodejs"];

/// Directories searched after `PATH`
const WELL_KNOWN_DIRS: &[&str] = &[
    "/usr/local/bin",
    "/usr/bin",
    "/opt/homebrew/bin",
    "/opt/local/bin",
];

/// Find the first candidate executable on `search_path`.
///
/// `search_path` uses the platform's `PATH` syntax. Relative entries are
/// taken relative to `working_dir`; empty entries are ignored.
pub fn discover_executable<S: AsRef<str>>(
    candidates: &[S],
    search_path: &OsStr,
    working_dir: &Path,
) -> Option<PathBuf> {
    let dirs = std::env::split_paths(search_path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| {
            if dir.is_relative() {
                working_dir.join(dir)
            } else {
                dir
            }
        })
        .collect::<Vec<_>>();
    if dirs.is_empty() {
        return None;
    }
    let search_path = std::env::join_paths(dirs).ok()?;
    candidates
        .iter()
        .find_map(|name| which::which_in(name.as_ref(), Some(&search_path), working_dir).ok())
}

/// Resolves the runner preference into a concrete engine
#[derive(Debug, Clone)]
pub struct EngineResolver {
    search_path: OsString,
    working_dir: PathBuf,
    candidates: Vec<String>,
}

impl EngineResolver {
    /// Search `PATH`, then the well-known install directories
    pub fn from_env() -> Self {
        let mut dirs: Vec<PathBuf> = std::env::var_os("PATH")
            .map(|path| std::env::split_paths(&path).collect())
            .unwrap_or_default();
        dirs.extend(WELL_KNOWN_DIRS.iter().map(PathBuf::from));

        let search_path = std::env::join_paths(&dirs).unwrap_or_else(|_| {
            std::env::var_os("PATH").unwrap_or_default()
        });
        let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_search_path(search_path).with_working_dir(working_dir)
    }

    /// Search only `search_path`
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: search_path.into(),
            working_dir: PathBuf::from("."),
            candidates: NODE_CANDIDATES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Directory that relative search path entries are resolved against
    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = working_dir.into();
        self
    }

    /// Replace the executable names tried during discovery
    pub fn with_candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    pub fn search_path(&self) -> &OsStr {
        &self.search_path
    }

    /// Look for a Node.js executable. Not cached between calls.
    pub fn discover(&self) -> Option<PathBuf> {
        discover_executable(&self.candidates, &self.search_path, &self.working_dir)
    }

    /// Select the engine for one run.
    ///
    /// An explicit executable is used as given and checked only when the
    /// engine runs. When discovery finds nothing, one informational
    /// diagnostic announces the fallback.
    pub fn resolve(
        &self,
        preference: EngineKind,
        explicit: Option<&Path>,
        reporter: &mut dyn DiagnosticSink,
    ) -> ResolvedEngine {
        match preference {
            EngineKind::Embedded => ResolvedEngine::Embedded(EmbeddedEngine::new()),

            EngineKind::ExternalProcess => {
                if let Some(path) = explicit {
                    return ResolvedEngine::Node(NodeEngine::new(path));
                }

                match self.discover() {
                    Some(path) => ResolvedEngine::Node(NodeEngine::new(path)),
                    None => {
                        reporter.report(DiagnosticEvent::info(
                            "Node not detected. Falling back to the embedded engine",
                        ));
                        ResolvedEngine::Embedded(EmbeddedEngine::new())
                    }
                }
            }
        }
    }
}

impl Default for EngineResolver {
    fn default() -> Self {
        Self::from_env()
    }
}
