//! CLI route: single route table and run context. Dispatches to the pipeline and presentation.

use crate::calibration::Calibration;
use crate::cli::help::{command_name, output_format};
use crate::cli::parse::{Commands, RunArgs};
use crate::cli::presentation::{
    format_compiled_json, format_compiled_text, format_index_json, format_index_text,
    format_run_summary_json, format_run_summary_text,
};
use crate::config::{ConfigLoader, OracConfig};
use crate::error::PipelineError;
use crate::instrument::Instrument;
use crate::pipeline::{Pipeline, RunParams};
use crate::recipe::{ActionRegistry, RecipeCompiler};
use crate::report::RunReporter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Rendered command result and the process exit status it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub exit_code: i32,
}

impl CommandOutput {
    fn new(text: String, exit_code: i32) -> Self {
        Self { text, exit_code }
    }
}

/// Runtime context for CLI execution: workspace root and loaded configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: OracConfig,
}

impl RunContext {
    /// Load configuration for the workspace (or from one explicit file) and validate it.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, PipelineError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        config.ensure_valid()?;
        Ok(Self::from_config(workspace_root, config))
    }

    /// Context over an already-built configuration. Relative paths resolve against the workspace.
    pub fn from_config(workspace_root: PathBuf, mut config: OracConfig) -> Self {
        config.paths = config.paths.resolve_against(&workspace_root);
        config.pipeline.badobs_file = config
            .pipeline
            .badobs_file
            .take()
            .map(|p| resolve(&workspace_root, p));
        Self {
            workspace_root,
            config,
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config(&self) -> &OracConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<CommandOutput, PipelineError> {
        let started = Instant::now();
        let name = command_name(command);
        info!(command = name, format = output_format(command), "Command starting");
        let result = match command {
            Commands::Run(args) => self.handle_run(args),
            Commands::Compile {
                recipe,
                instrument,
                format,
            } => self.handle_compile(recipe, instrument.as_deref(), format),
            Commands::Index {
                role,
                instrument,
                format,
            } => self.handle_index(role, instrument.as_deref(), format),
            Commands::Config => self.handle_config(),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(output) => info!(command = name, elapsed_ms, exit_code = output.exit_code, "Command finished"),
            Err(e) => warn!(command = name, elapsed_ms, error = %e, "Command failed"),
        }
        result
    }

    /// Configuration with the instrument name overridden, if requested.
    fn config_for(&self, instrument: Option<&str>) -> OracConfig {
        let mut config = self.config.clone();
        if let Some(name) = instrument {
            config.instrument.name = name.to_string();
        }
        config
    }

    fn handle_run(&self, args: &RunArgs) -> Result<CommandOutput, PipelineError> {
        let config = self.config_for(args.instrument.as_deref());
        let params = RunParams {
            from: args.from,
            to: args.to,
            list: args.list.as_ref().map(|l| l.0.clone()),
            loop_kind: args.loop_kind,
            skip: args.skip,
            batch: args.batch,
            calib: args.calib.clone(),
            utdate: args.utdate,
            recipe: args.recipe.clone(),
        };
        let mut pipeline = Pipeline::new(config);
        let summary = pipeline.run(&params)?;
        let text = if args.format == "json" {
            format_run_summary_json(&summary)?
        } else {
            format_run_summary_text(&summary)
        };
        Ok(CommandOutput::new(text, summary.exit_code()))
    }

    fn handle_compile(
        &self,
        recipe: &str,
        instrument: Option<&str>,
        format: &str,
    ) -> Result<CommandOutput, PipelineError> {
        let config = self.config_for(instrument);
        let name = &config.instrument.name;
        let mut compiler = RecipeCompiler::new(
            config.paths.recipe_search(name),
            config.paths.primitive_search(name),
            Arc::new(ActionRegistry::with_builtins()),
        );
        let compiled = compiler.compile(recipe, &RunReporter::new())?;
        let exit_code = if compiled.is_runnable() { 0 } else { 1 };
        let text = if format == "json" {
            format_compiled_json(&compiled)?
        } else {
            format_compiled_text(&compiled)
        };
        Ok(CommandOutput::new(text, exit_code))
    }

    fn handle_index(
        &self,
        role: &str,
        instrument: Option<&str>,
        format: &str,
    ) -> Result<CommandOutput, PipelineError> {
        let config = self.config_for(instrument);
        let instrument = Instrument::from_config(&config.instrument, &config.paths);
        let calibration = Calibration::open(&instrument, &config.paths.calibration_dir())?;
        let index = calibration.index(role)?;
        let text = if format == "json" {
            format_index_json(index)?
        } else {
            format_index_text(index)
        };
        Ok(CommandOutput::new(text, 0))
    }

    fn handle_config(&self) -> Result<CommandOutput, PipelineError> {
        let text = toml::to_string_pretty(&self.config)
            .map_err(|e| PipelineError::ConfigError(format!("Cannot render configuration: {}", e)))?;
        Ok(CommandOutput::new(text, 0))
    }
}

fn resolve(root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}
