//! Embedded Engine
//!
//! Runs the optimizer inside the current process on the Boa JavaScript
//! interpreter. Needs no external dependency, but is slower than Node.js and
//! only offers a small shell surface to the script:
//!
//! - `arguments`: the build profile path followed by the extra parameters
//! - `print(...)`, `console.log/info/warn/error(...)`: captured output
//! - `readFile(path)`: file contents as a string
//! - `quit(status)`: stop with an exit status
//!
//! Only reads files; never spawns processes.

use super::{check_readable, select_script, Engine, EngineError, EngineKind, Forwarder};
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink, SourceLocation};
use crate::optimizer::OptimizerInvocation;
use std::fs;
use std::path::{Path, PathBuf};

/// How an evaluated script finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScriptExit {
    Completed,
    Quit(i32),
}

/// In-process JavaScript engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedEngine {
    default_script: Option<PathBuf>,
}

impl EmbeddedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `script` whenever no optimizer script is given
    pub fn with_default_script(script: impl Into<PathBuf>) -> Self {
        Self {
            default_script: Some(script.into()),
        }
    }

    /// Where this engine looks for r.js when none is given.
    ///
    /// An r.js shipped next to the running binary, then the shared data
    /// directory of its install prefix.
    pub fn default_script_candidates(&self) -> Vec<PathBuf> {
        if let Some(script) = &self.default_script {
            return vec![script.clone()];
        }

        let mut candidates = Vec::new();
        if let Some(bin_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            candidates.push(bin_dir.join("r.js"));
            candidates.push(bin_dir.join("../share/rjs-optimize/r.js"));
        }
        candidates
    }

    /// `arguments` as the script sees them
    pub fn script_arguments(invocation: &OptimizerInvocation) -> Vec<String> {
        let mut args = Vec::with_capacity(1 + invocation.parameters().len());
        args.push(invocation.config_file().to_string_lossy().into_owned());
        args.extend(invocation.parameters().iter().cloned());
        args
    }
}

impl Engine for EmbeddedEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Embedded
    }

    fn describe(&self) -> String {
        "embedded JavaScript engine".to_string()
    }

    fn run(
        &self,
        script: Option<&Path>,
        invocation: &OptimizerInvocation,
        reporter: &mut dyn DiagnosticSink,
    ) -> Result<(), EngineError> {
        let script = select_script(self.kind(), script, self.default_script_candidates())?;
        let source = fs::read_to_string(&script).map_err(|source| EngineError::ScriptRead {
            path: script.clone(),
            source,
        })?;
        check_readable(invocation.config_file())?;

        let mut forwarder = Forwarder::new(reporter);
        let arguments = Self::script_arguments(invocation);

        match evaluate(&source, &arguments, &mut forwarder) {
            Ok(ScriptExit::Completed) | Ok(ScriptExit::Quit(0)) => forwarder.finish(),
            Ok(ScriptExit::Quit(code)) => Err(EngineError::Exited { status: Some(code) }),
            Err(EngineError::Evaluation { message }) => {
                forwarder.emit(
                    DiagnosticEvent::error(message.clone()).at(SourceLocation::file(&script)),
                );
                Err(EngineError::Evaluation { message })
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(feature = "embedded-engine")]
fn evaluate(
    source: &str,
    arguments: &[String],
    forwarder: &mut Forwarder<'_>,
) -> Result<ScriptExit, EngineError> {
    boa_host::evaluate(source, arguments, forwarder)
}

#[cfg(not(feature = "embedded-engine"))]
fn evaluate(
    _source: &str,
    _arguments: &[String],
    _forwarder: &mut Forwarder<'_>,
) -> Result<ScriptExit, EngineError> {
    Err(EngineError::EngineNotAvailable(
        EngineKind::Embedded.display_name().to_string(),
        EngineKind::Embedded.feature_name().to_string(),
    ))
}

#[cfg(feature = "embedded-engine")]
mod boa_host {
    use super::{Forwarder, ScriptExit};
    use crate::diagnostics::{DiagnosticEvent, Severity};
    use crate::engine::EngineError;
    use boa_engine::object::builtins::JsArray;
    use boa_engine::property::Attribute;
    use boa_engine::{
        js_string, Context, JsArgs, JsError, JsNativeError, JsResult, JsString, JsValue,
        NativeFunction, Source,
    };

    const PRELUDE: &str = include_str!("prelude.js");

    pub(super) fn evaluate(
        source: &str,
        arguments: &[String],
        forwarder: &mut Forwarder<'_>,
    ) -> Result<ScriptExit, EngineError> {
        let mut context = Context::default();
        install_globals(&mut context, arguments).map_err(|err| EngineError::Evaluation {
            message: format!("failed to set up script globals: {}", err),
        })?;

        let result = context.eval(Source::from_bytes(source));
        // Output produced before a failure still reaches the reporter
        drain_output(&mut context, forwarder);

        // A quit() swallowed by a script-level catch still sets the status
        match result {
            Ok(_) => match exit_status(&mut context) {
                Some(code) => Ok(ScriptExit::Quit(code)),
                None => Ok(ScriptExit::Completed),
            },
            Err(err) => match exit_status(&mut context) {
                Some(code) => Ok(ScriptExit::Quit(code)),
                None => Err(EngineError::Evaluation {
                    message: describe_error(err, &mut context),
                }),
            },
        }
    }

    fn install_globals(context: &mut Context, arguments: &[String]) -> JsResult<()> {
        let args = JsArray::from_iter(
            arguments
                .iter()
                .map(|arg| JsValue::from(JsString::from(arg.as_str()))),
            context,
        );
        context.register_global_property(js_string!("arguments"), args, Attribute::all())?;
        context.register_global_builtin_callable(
            js_string!("readFile"),
            1,
            NativeFunction::from_fn_ptr(read_file),
        )?;
        context.eval(Source::from_bytes(PRELUDE))?;
        Ok(())
    }

    fn read_file(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
        let path = args
            .get_or_undefined(0)
            .to_string(context)?
            .to_std_string_escaped();
        let text = std::fs::read_to_string(&path).map_err(|err| {
            JsNativeError::error().with_message(format!("readFile({}): {}", path, err))
        })?;
        Ok(JsValue::from(JsString::from(text.as_str())))
    }

    fn drain_output(context: &mut Context, forwarder: &mut Forwarder<'_>) {
        let drained = context
            .eval(Source::from_bytes("__rjsDrain()"))
            .ok()
            .and_then(|value| value.as_string().map(|s| s.to_std_string_escaped()));
        let Some(json) = drained else { return };

        let entries: Vec<(Severity, String)> = match serde_json::from_str(&json) {
            Ok(entries) => entries,
            Err(err) => {
                log::debug!("Discarding unreadable script output: {}", err);
                return;
            }
        };
        for (severity, message) in entries {
            forwarder.emit(DiagnosticEvent::new(severity, message));
        }
    }

    fn exit_status(context: &mut Context) -> Option<i32> {
        let value = context
            .global_object()
            .get(js_string!("__rjsExitStatus"), context)
            .ok()?;
        value.as_number().map(|n| n as i32)
    }

    fn describe_error(err: JsError, context: &mut Context) -> String {
        match err.try_native(context) {
            Ok(native) => native.to_string(),
            Err(_) => err.to_string(),
        }
    }
}
