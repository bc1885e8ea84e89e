//! Command-line interface for fm-core.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde_json::json;
use tracing::warn;

use fm_common::{Error, ExportFormat, OutputFormat, Result};
use fm_config::{
    list_presets, load_config_file, load_effective, resolve_config, validate_config,
    AnomalyConfig, ConfigPaths, ConfigSnapshot, ConfigSource, FactoryConfig, PresetName,
    ResolvedConfig,
};
use fm_dataset::pretty;

use crate::exit_codes::ExitCode;
use crate::pipeline::{daily_summary_columns, run_shifts, run_utility, RunOptions, RunReport};
use crate::render::{NullRenderer, Renderer, TextRenderer};

/// Synthetic factory metrics: generate, inject, aggregate, export.
#[derive(Parser, Debug)]
#[command(name = "fm-core", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Config file (JSON or TOML). Falls back to $FM_CONFIG, then the user
    /// config directory, then built-in defaults
    #[arg(long, global = true, value_name = "PATH", conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Built-in preset (default, quick, fault-heavy)
    #[arg(long, global = true, value_name = "NAME")]
    pub preset: Option<PresetName>,

    /// Output format for reports
    #[arg(long, global = true, value_enum, default_value_t, env = "FM_OUTPUT_FORMAT")]
    pub format: OutputFormat,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the per-shift production dataset
    Shifts(ShiftsArgs),
    /// Generate the hourly utility dataset with injected anomalies
    Utility(UtilityArgs),
    /// Inspect and validate configuration
    Config(ConfigArgs),
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options common to both dataset commands.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// RNG seed (overrides the configured seed)
    #[arg(long, conflicts_with = "random_seed")]
    pub seed: Option<u64>,

    /// Draw a fresh seed from the OS; it is reported after the run
    #[arg(long)]
    pub random_seed: bool,

    /// Export path
    #[arg(short, long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Export file format
    #[arg(long, value_enum)]
    pub export_format: Option<ExportFormat>,

    /// Skip chart rendering
    #[arg(long)]
    pub no_render: bool,

    /// Print the first N raw rows before the charts
    #[arg(long, value_name = "N")]
    pub preview: Option<usize>,

    /// Rows shown per chart table (0 shows all)
    #[arg(long, value_name = "N", default_value_t = fm_dataset::DEFAULT_PREVIEW_ROWS)]
    pub chart_rows: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ShiftsArgs {
    /// Number of shift records
    #[arg(long)]
    pub rows: Option<usize>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Args, Debug, Clone)]
pub struct UtilityArgs {
    /// Number of days (24 hourly rows each)
    #[arg(long)]
    pub days: Option<u32>,

    /// Disable anomaly injection
    #[arg(long)]
    pub no_anomalies: bool,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Validate a config file, or the effective configuration
    Validate {
        /// File to validate instead of the resolved configuration
        path: Option<PathBuf>,
    },
    /// Print the JSON Schema of the config file format
    Schema,
    /// List built-in presets
    Presets,
}

/// Parse-independent entry point used by `main`.
pub fn run(cli: Cli) -> ExitCode {
    let format = cli.global.format;
    match dispatch(cli) {
        Ok(code) => code,
        Err(err) => {
            report_error(&err, format);
            ExitCode::from_error(&err)
        }
    }
}

fn dispatch(cli: Cli) -> Result<ExitCode> {
    let global = cli.global;
    match cli.command {
        Commands::Shifts(args) => cmd_shifts(&global, &args),
        Commands::Utility(args) => cmd_utility(&global, &args),
        Commands::Config(args) => match args.command {
            ConfigCommands::Show => cmd_config_show(&global),
            ConfigCommands::Validate { path } => cmd_config_validate(&global, path),
            ConfigCommands::Schema => cmd_config_schema(),
            ConfigCommands::Presets => cmd_config_presets(&global),
        },
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "fm-core", &mut io::stdout());
            Ok(ExitCode::Clean)
        }
    }
}

fn report_error(err: &Error, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let body = json!({
                "status": "error",
                "error": { "code": err.code(), "message": err.to_string() },
            });
            println!("{body}");
        }
        OutputFormat::Text => eprintln!("error: {err}"),
    }
}

fn resolve(global: &GlobalOpts) -> Result<ResolvedConfig> {
    let paths = ConfigPaths::discover(global.config.clone());
    let resolved = resolve_config(&paths, global.preset)?;
    for w in &resolved.warnings {
        warn!(source = %resolved.source, "{w}");
    }
    Ok(resolved)
}

/// Re-validate after command-line overrides.
fn revalidate(config: &FactoryConfig) -> Result<()> {
    let result = validate_config(config);
    if result.is_ok() {
        return Ok(());
    }
    let msgs: Vec<String> = result.errors.iter().map(ToString::to_string).collect();
    Err(Error::Config(msgs.join("; ")))
}

fn run_options(args: &RunArgs) -> RunOptions {
    RunOptions {
        preview_rows: args.preview,
    }
}

fn apply_run_args(
    args: &RunArgs,
    seed: &mut Option<u64>,
    output: &mut PathBuf,
    format: &mut ExportFormat,
) {
    if let Some(s) = args.seed {
        *seed = Some(s);
    }
    if args.random_seed {
        *seed = None;
    }
    if let Some(out) = &args.out {
        *output = out.clone();
    }
    if let Some(f) = args.export_format {
        *format = f;
    }
}

fn run_with_renderer<F>(global: &GlobalOpts, args: &RunArgs, run: F) -> Result<RunReport>
where
    F: FnOnce(&mut dyn Renderer) -> Result<RunReport>,
{
    if args.no_render || global.format == OutputFormat::Json {
        return run(&mut NullRenderer);
    }
    let chart_rows = (args.chart_rows > 0).then_some(args.chart_rows);
    let stdout = io::stdout();
    let mut renderer = TextRenderer::new(stdout.lock()).with_preview(chart_rows);
    run(&mut renderer)
}

fn cmd_shifts(global: &GlobalOpts, args: &ShiftsArgs) -> Result<ExitCode> {
    let resolved = resolve(global)?;
    let mut config = resolved.config;
    {
        let shifts = &mut config.shifts;
        if let Some(rows) = args.rows {
            shifts.rows = rows;
        }
        apply_run_args(
            &args.run,
            &mut shifts.seed,
            &mut shifts.output,
            &mut shifts.format,
        );
    }
    revalidate(&config)?;
    let snapshot = ConfigSnapshot::capture(&config, &resolved.source)?;

    let report = run_with_renderer(global, &args.run, |renderer| {
        run_shifts(&config.shifts, &snapshot, &run_options(&args.run), renderer)
    })?;
    print_report(&report, global.format)?;
    Ok(ExitCode::Clean)
}

fn cmd_utility(global: &GlobalOpts, args: &UtilityArgs) -> Result<ExitCode> {
    let resolved = resolve(global)?;
    let mut config = resolved.config;
    {
        let utility = &mut config.utility;
        if let Some(days) = args.days {
            utility.days = days;
        }
        if args.no_anomalies {
            utility.anomalies = AnomalyConfig::none();
        }
        apply_run_args(
            &args.run,
            &mut utility.seed,
            &mut utility.output,
            &mut utility.format,
        );
    }
    revalidate(&config)?;
    let snapshot = ConfigSnapshot::capture(&config, &resolved.source)?;

    let report = run_with_renderer(global, &args.run, |renderer| {
        run_utility(&config.utility, &snapshot, &run_options(&args.run), renderer)
    })?;
    print_report(&report, global.format)?;
    Ok(ExitCode::Clean)
}

fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, report)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            if !report.daily_summary.is_empty() {
                let batch = daily_summary_columns(&report.daily_summary)?
                    .to_record_batch()
                    .map_err(|e| Error::Render(e.to_string()))?;
                let table = pretty(&batch, None).map_err(|e| Error::Render(e.to_string()))?;
                writeln!(out, "== Daily summary ==")?;
                writeln!(out, "{table}")?;
            }
            if let Some(injection) = &report.injection {
                writeln!(
                    out,
                    "anomalies: {} boiler waste, {} chiller waste, {} scheduling issue ({} rows affected)",
                    injection.boiler_waste.len(),
                    injection.chiller_waste.len(),
                    injection.scheduling_issue.len(),
                    injection.affected_rows()
                )?;
            }
            let seed_note = if report.seed.generated { " (generated)" } else { "" };
            writeln!(out, "run:    {}", report.run_id)?;
            writeln!(out, "seed:   {}{}", report.seed.value, seed_note)?;
            writeln!(
                out,
                "config: {} ({})",
                report.config.short_hash(),
                report.config.source
            )?;
            writeln!(
                out,
                "wrote {} rows to {} ({}, {} bytes)",
                report.export.rows,
                report.export.path.display(),
                report.export.format,
                report.export.bytes
            )?;
        }
    }
    Ok(())
}

fn cmd_config_show(global: &GlobalOpts) -> Result<ExitCode> {
    let resolved = resolve(global)?;
    let snapshot = ConfigSnapshot::capture(&resolved.config, &resolved.source)?;
    match global.format {
        OutputFormat::Json => {
            let body = json!({
                "source": resolved.source,
                "sha256": snapshot.sha256,
                "warnings": resolved.warnings,
                "config": resolved.config,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => {
            println!("# source: {}", resolved.source);
            println!("# sha256: {}", snapshot.sha256);
            for w in &resolved.warnings {
                println!("# warning: {w}");
            }
            println!("{}", serde_json::to_string_pretty(&resolved.config)?);
        }
    }
    Ok(ExitCode::Clean)
}

fn cmd_config_validate(global: &GlobalOpts, path: Option<PathBuf>) -> Result<ExitCode> {
    let (config, source) = match path {
        Some(p) => (load_config_file(&p)?, ConfigSource::File(p)),
        None => load_effective(&ConfigPaths::discover(global.config.clone()), global.preset)?,
    };
    let result = validate_config(&config);
    let code = if result.is_ok() {
        ExitCode::Clean
    } else {
        ExitCode::ConfigError
    };

    match global.format {
        OutputFormat::Json => {
            let body = json!({
                "valid": result.is_ok(),
                "source": source,
                "errors": result.errors,
                "warnings": result.warnings,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => {
            if result.is_ok() {
                println!("{source}: valid");
            } else {
                println!("{source}: {} error(s)", result.errors.len());
            }
            for e in &result.errors {
                println!("  error: {e}");
            }
            for w in &result.warnings {
                println!("  warning: {w}");
            }
        }
    }
    Ok(code)
}

fn cmd_config_schema() -> Result<ExitCode> {
    let schema = schemars::schema_for!(FactoryConfig);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(ExitCode::Clean)
}

fn cmd_config_presets(global: &GlobalOpts) -> Result<ExitCode> {
    let presets = list_presets();
    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&presets)?),
        OutputFormat::Text => {
            for p in &presets {
                println!(
                    "{:<12} {:>5} shifts {:>6} hours {:>4} anomalies  {}",
                    p.name.as_str(),
                    p.shift_rows,
                    p.utility_rows,
                    p.anomaly_rows,
                    p.description
                );
            }
        }
    }
    Ok(ExitCode::Clean)
}
