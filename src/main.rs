//! rjs-optimize - r.js Optimizer Build Step
//!
//! Main CLI entry point for running the optimizer and inspecting engines.

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use rjs_optimize::config::{ProjectConfig, CONFIG_FILE_NAME};
use rjs_optimize::{
    ConfigPreparer, Engine, EngineKind, EngineResolver, LogReporter, OptimizeError, OptimizeStep,
    PropertyFilter, RecordingSink, StepOutcome,
};
use std::path::{Path, PathBuf};

/// Process exit codes
mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const OPTIMIZATION_FAILED: i32 = 1; // r.js rejected the build profile
    pub const CONFIG_ERROR: i32 = 2;
    pub const SCRIPT_READ_FAILED: i32 = 3;
    pub const EVALUATION_FAILED: i32 = 4;
    pub const LAUNCH_FAILED: i32 = 5;
    pub const PREPARATION_FAILED: i32 = 6;
}

#[derive(Parser)]
#[command(name = "rjs-optimize")]
#[command(version)]
#[command(about = "Run the r.js optimizer as a build step", long_about = None)]
struct Cli {
    /// Project file (default: rjs-optimize.toml in this or a parent directory)
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which engine would run the optimizer
    Engines {
        /// Runner preference (nodejs, rhino)
        #[arg(long)]
        runner: Option<EngineKind>,

        /// Explicit Node.js executable
        #[arg(long)]
        node_executable: Option<PathBuf>,
    },

    /// Write a starter project file
    Init {
        /// Where to write the project file
        #[arg(short, long, default_value = CONFIG_FILE_NAME)]
        output: PathBuf,

        /// Build profile to reference
        #[arg(short, long)]
        config_file: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Optimize a build profile
    Optimize(OptimizeArgs),
}

#[derive(Args)]
struct OptimizeArgs {
    /// Build profile (overrides optimize.config_file)
    #[arg(short, long)]
    config_file: Option<PathBuf>,

    /// Optimizer script (default: the engine's bundled r.js)
    #[arg(long)]
    optimizer_file: Option<PathBuf>,

    /// Token-filter the build profile before optimizing
    #[arg(long, overrides_with = "no_filter_config")]
    filter_config: bool,

    /// Use the build profile as is, even when the project file filters it
    #[arg(long, overrides_with = "filter_config")]
    no_filter_config: bool,

    /// Runner preference (nodejs, rhino)
    #[arg(long)]
    runner: Option<EngineKind>,

    /// Explicit Node.js executable
    #[arg(long)]
    node_executable: Option<PathBuf>,

    /// Build output directory (overrides build.directory)
    #[arg(long)]
    build_dir: Option<PathBuf>,

    /// Skip optimization
    #[arg(long, env = "RJS_OPTIMIZE_SKIP", value_parser = clap::builder::FalseyValueParser::new())]
    skip: bool,

    /// Filter property, may be repeated
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE", value_parser = parse_property)]
    define: Vec<(String, String)>,

    /// Fail on warnings as well as errors
    #[arg(long)]
    warnings_fatal: bool,

    /// Parameters passed to the optimizer after the build profile
    #[arg(last = true, value_name = "OPTIMIZER_PARAMETERS")]
    optimizer_parameters: Vec<String>,
}

fn parse_property(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{}'", s)),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            exit_codes::CONFIG_ERROR
        }
    };
    std::process::exit(code);
}

fn init_logging(verbose: u8, quiet: bool) {
    let default_filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_target(false)
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Engines {
            runner,
            node_executable,
        } => {
            let project = load_project(cli.project.as_deref())?;
            cmd_engines(&project, runner, node_executable)
        }
        Commands::Init {
            output,
            config_file,
            force,
        } => cmd_init(&output, config_file, force),
        Commands::Optimize(args) => {
            let project = load_project(cli.project.as_deref())?;
            cmd_optimize(project, args)
        }
    }
}

fn load_project(path: Option<&Path>) -> Result<ProjectConfig> {
    match path {
        Some(path) => ProjectConfig::load(path)
            .with_context(|| format!("Failed to load project file {}", path.display())),
        None => ProjectConfig::load_from_cwd().context("Failed to load project file"),
    }
}

fn cmd_optimize(mut project: ProjectConfig, args: OptimizeArgs) -> Result<i32> {
    let settings = &mut project.optimize;
    if let Some(config_file) = args.config_file {
        settings.config_file = Some(config_file);
    }
    if let Some(optimizer_file) = args.optimizer_file {
        settings.optimizer_file = Some(optimizer_file);
    }
    if let Some(runner) = args.runner {
        settings.runner = runner;
    }
    if let Some(node) = args.node_executable {
        settings.node_executable = Some(node);
    }
    if !args.optimizer_parameters.is_empty() {
        settings.optimizer_parameters = args.optimizer_parameters;
    }
    if args.filter_config {
        settings.filter_config = true;
    } else if args.no_filter_config {
        settings.filter_config = false;
    }
    settings.skip |= args.skip;

    let build_dir = args.build_dir.unwrap_or(project.build.directory);
    let mut filter = PropertyFilter::new(project.properties);
    for (name, value) in args.define {
        filter.set(name, value);
    }

    let mut reporter = LogReporter::default().warnings_fatal(args.warnings_fatal);
    let step = OptimizeStep::new(project.optimize);

    match step.execute(
        &EngineResolver::from_env(),
        &ConfigPreparer::new(build_dir),
        &filter,
        &mut reporter,
    ) {
        Ok(StepOutcome::Skipped) => Ok(exit_codes::SUCCESS),
        Ok(StepOutcome::Optimized { engine }) => {
            log::info!("Optimization finished ({})", engine.display_name());
            Ok(exit_codes::SUCCESS)
        }
        Err(err) => {
            let code = exit_code(&err);
            log::error!("{:#}", anyhow::Error::new(err));
            Ok(code)
        }
    }
}

fn exit_code(err: &OptimizeError) -> i32 {
    match err {
        OptimizeError::ScriptRead { .. } => exit_codes::SCRIPT_READ_FAILED,
        OptimizeError::Evaluation { .. } => exit_codes::EVALUATION_FAILED,
        OptimizeError::Optimization { .. } => exit_codes::OPTIMIZATION_FAILED,
        OptimizeError::Launch { .. } => exit_codes::LAUNCH_FAILED,
        OptimizeError::ConfigPreparation { .. } => exit_codes::PREPARATION_FAILED,
        OptimizeError::MissingConfigFile => exit_codes::CONFIG_ERROR,
    }
}

fn cmd_engines(
    project: &ProjectConfig,
    runner: Option<EngineKind>,
    node_executable: Option<PathBuf>,
) -> Result<i32> {
    let runner = runner.unwrap_or(project.optimize.runner);
    let explicit = node_executable.or_else(|| project.optimize.node_executable.clone());

    let resolver = EngineResolver::from_env();
    let mut notes = RecordingSink::new();
    let engine = resolver.resolve(runner, explicit.as_deref(), &mut notes);

    println!("Runner preference: {}", runner);
    match resolver.discover() {
        Some(path) => println!("Discovered Node.js: {}", path.display()),
        None => println!("Discovered Node.js: none"),
    }
    println!(
        "Embedded engine:   {}",
        if EngineKind::Embedded.is_available() {
            "available"
        } else {
            "not compiled in"
        }
    );
    println!("Selected:          {}", engine.describe());
    for note in notes.events() {
        println!("  note: {}", note.message);
    }

    Ok(exit_codes::SUCCESS)
}

fn cmd_init(output: &Path, config_file: Option<PathBuf>, force: bool) -> Result<i32> {
    if output.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }

    let mut project = ProjectConfig::default();
    project.optimize.config_file =
        Some(config_file.unwrap_or_else(|| PathBuf::from("src/main/js/app.build.js")));
    project
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Wrote {}", output.display());
    Ok(exit_codes::SUCCESS)
}
