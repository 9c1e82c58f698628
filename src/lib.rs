//! rjs-optimize - r.js Optimizer Build Step
//!
//! Runs the RequireJS optimizer (r.js) against a build profile as part of a
//! build, on one of two interchangeable engines:
//!
//! - **Node.js**: external process, the default when `node` can be found
//! - **Embedded**: in-process Boa interpreter, the fallback
//!
//! # Example
//!
//! ```rust,no_run
//! use rjs_optimize::{
//!     ConfigPreparer, EngineResolver, LogReporter, OptimizeSettings, OptimizeStep,
//!     PropertyFilter,
//! };
//!
//! let settings = OptimizeSettings {
//!     config_file: Some("src/main/js/app.build.js".into()),
//!     ..OptimizeSettings::default()
//! };
//!
//! let outcome = OptimizeStep::new(settings).execute(
//!     &EngineResolver::from_env(),
//!     &ConfigPreparer::new("target"),
//!     &PropertyFilter::default(),
//!     &mut LogReporter::default(),
//! )?;
//! println!("{:?}", outcome);
//! # Ok::<(), rjs_optimize::OptimizeError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐   ┌────────────────┐
//! │ EngineResolver │   │ ConfigPreparer │
//! └───────┬────────┘   └───────┬────────┘
//!         │ Engine             │ build profile
//!         └─────────┬──────────┘
//!                   ▼
//!           ┌───────────────┐      ┌────────────────┐
//!           │   Optimizer   │─────▶│ DiagnosticSink │
//!           └───────────────┘      └────────────────┘
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod filter;
pub mod optimizer;
pub mod prepare;
pub mod step;

// Re-export commonly used types
pub use config::{BuildSettings, ConfigError, OptimizeSettings, ProjectConfig};
pub use diagnostics::{
    DiagnosticEvent, DiagnosticSink, LogReporter, RecordingSink, Severity, SourceLocation,
};
pub use engine::{
    discover_executable, EmbeddedEngine, Engine, EngineError, EngineKind, EngineResolver,
    NodeEngine, ResolvedEngine,
};
pub use filter::{FilterError, PropertyFilter, TokenFilter};
pub use optimizer::{OptimizeError, Optimizer, OptimizerInvocation};
pub use prepare::{ConfigPreparer, FILTERED_CONFIG_DIR, FILTERED_CONFIG_NAME};
pub use step::{EngineSource, OptimizeStep, StepOutcome};
