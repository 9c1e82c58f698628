//! The Optimize Build Step
//!
//! Entry point used by the host: honours the skip flag, resolves the engine,
//! prepares the build profile and runs the optimizer once.

use crate::config::OptimizeSettings;
use crate::diagnostics::DiagnosticSink;
use crate::engine::{Engine, EngineKind, EngineResolver};
use crate::filter::TokenFilter;
use crate::optimizer::{OptimizeError, Optimizer, OptimizerInvocation};
use crate::prepare::ConfigPreparer;
use std::path::Path;

/// Supplies the engine for a run
pub trait EngineSource {
    fn engine(
        &self,
        preference: EngineKind,
        explicit: Option<&Path>,
        reporter: &mut dyn DiagnosticSink,
    ) -> Box<dyn Engine>;
}

impl EngineSource for EngineResolver {
    fn engine(
        &self,
        preference: EngineKind,
        explicit: Option<&Path>,
        reporter: &mut dyn DiagnosticSink,
    ) -> Box<dyn Engine> {
        Box::new(self.resolve(preference, explicit, reporter))
    }
}

/// What the step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Skipped,
    Optimized { engine: EngineKind },
}

/// One execution of the optimize step
#[derive(Debug, Clone)]
pub struct OptimizeStep {
    settings: OptimizeSettings,
}

impl OptimizeStep {
    pub fn new(settings: OptimizeSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &OptimizeSettings {
        &self.settings
    }

    /// Run the step
    pub fn execute(
        &self,
        engines: &dyn EngineSource,
        preparer: &ConfigPreparer,
        filter: &dyn TokenFilter,
        reporter: &mut dyn DiagnosticSink,
    ) -> Result<StepOutcome, OptimizeError> {
        if self.settings.skip {
            log::info!("Optimization is skipped.");
            return Ok(StepOutcome::Skipped);
        }

        let engine = engines.engine(
            self.settings.runner,
            self.settings.node_executable.as_deref(),
            reporter,
        );
        log::info!("Running with {}", engine.describe());

        let source = self
            .settings
            .config_file
            .as_deref()
            .ok_or(OptimizeError::MissingConfigFile)?;
        let profile = preparer.prepare(source, self.settings.filter_config, filter)?;

        let mut invocation = OptimizerInvocation::new(profile)
            .with_parameters(self.settings.optimizer_parameters.iter().cloned());
        if let Some(script) = &self.settings.optimizer_file {
            invocation = invocation.with_script(script);
        }

        Optimizer::new().optimize(&invocation, reporter, engine.as_ref())?;

        Ok(StepOutcome::Optimized {
            engine: engine.kind(),
        })
    }
}
