//! Node.js Engine
//!
//! Runs the optimizer as a child process:
//! `<node> <script> <config> [parameters...]`.
//!
//! stdout and stderr are read on two threads and forwarded to the reporter
//! while the child runs; nothing reaches the console uninterpreted. There is
//! no timeout, a hung optimizer blocks the caller until it exits.

use super::{check_readable, select_script, Engine, EngineError, EngineKind, Forwarder};
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink, Severity};
use crate::optimizer::OptimizerInvocation;
use crossbeam_channel::Sender;
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

/// r.js inside a `requirejs` npm package
const REQUIREJS_SCRIPT: &str = "node_modules/requirejs/bin/r.js";

/// External Node.js process engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEngine {
    executable: PathBuf,
}

impl NodeEngine {
    /// Bind to an executable. The path is not checked until `run`.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Get the executable being used
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Full argument vector, executable first
    pub fn command_line(&self, script: &Path, invocation: &OptimizerInvocation) -> Vec<OsString> {
        let mut argv = Vec::with_capacity(3 + invocation.parameters().len());
        argv.push(self.executable.clone().into_os_string());
        argv.push(script.as_os_str().to_os_string());
        argv.push(invocation.config_file().as_os_str().to_os_string());
        argv.extend(invocation.parameters().iter().map(OsString::from));
        argv
    }

    /// Where this engine looks for r.js when none is given.
    ///
    /// Project `node_modules` from the current directory upwards, then the
    /// global npm prefix next to the executable.
    pub fn default_script_candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(cwd) = std::env::current_dir() {
            candidates.extend(cwd.ancestors().map(|dir| dir.join(REQUIREJS_SCRIPT)));
        }

        if let Some(bin_dir) = self.executable.parent().filter(|p| !p.as_os_str().is_empty()) {
            // Unix layout: <prefix>/bin/node + <prefix>/lib/node_modules
            if let Some(prefix) = bin_dir.parent() {
                candidates.push(prefix.join("lib").join(REQUIREJS_SCRIPT));
            }
            // Windows layout: node.exe next to node_modules
            candidates.push(bin_dir.join(REQUIREJS_SCRIPT));
        }

        candidates
    }
}

impl Engine for NodeEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::ExternalProcess
    }

    fn describe(&self) -> String {
        format!("Node @ {}", self.executable.display())
    }

    fn run(
        &self,
        script: Option<&Path>,
        invocation: &OptimizerInvocation,
        reporter: &mut dyn DiagnosticSink,
    ) -> Result<(), EngineError> {
        let script = select_script(self.kind(), script, self.default_script_candidates())?;
        check_readable(&script)?;
        check_readable(invocation.config_file())?;

        let argv = self.command_line(&script, invocation);
        log::debug!(
            "Spawning {}",
            argv.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EngineError::Launch {
                executable: self.executable.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut forwarder = Forwarder::new(reporter);

        thread::scope(|scope| {
            if let Some(out) = stdout {
                let tx = tx.clone();
                scope.spawn(move || pump_lines(out, Severity::Info, &tx));
            }
            if let Some(err) = stderr {
                let tx = tx.clone();
                scope.spawn(move || pump_lines(err, Severity::Warning, &tx));
            }
            // Channel closes once both readers hit EOF
            drop(tx);
            for event in rx.iter() {
                forwarder.emit(event);
            }
        });

        let status = child.wait().map_err(|source| EngineError::Launch {
            executable: self.executable.clone(),
            source,
        })?;

        if !status.success() {
            return Err(EngineError::Exited {
                status: status.code(),
            });
        }

        forwarder.finish()
    }
}

/// Send each non-blank line of `reader` as an event until EOF
fn pump_lines<R: Read>(reader: R, severity: Severity, tx: &Sender<DiagnosticEvent>) {
    for chunk in BufReader::new(reader).split(b'\n') {
        let Ok(bytes) = chunk else { break };
        let line = String::from_utf8_lossy(&bytes);
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        if tx.send(DiagnosticEvent::new(severity, line)).is_err() {
            break;
        }
    }
}
