//! Datapoint Loss CLI
//!
//! The `dpl` binary wires the analysis pipeline to the command line:
//! - Aggregate loss curves for a weight function
//! - Per-datapoint decomposition by peeling, optionally grouped by a feature
//! - Integrated per-datapoint losses and their histogram
//! - Configuration inspection and validation

use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use dpl_common::{Error, FeatureGrouping, Label, OutputFormat, StructuredError, SCHEMA_VERSION};
use dpl_config::{
    load_config, validate_analysis, validate_scoped, AnalysisConfig, ConfigSnapshot, LoadedConfig,
    ValidationScope,
};
use dpl_core::dataset::{load_dataset, LoadedDataset};
use dpl_core::exit_codes::ExitCode;
use dpl_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, Stage,
};
use dpl_core::{Analyzer, Render};
use dpl_math::StandardWeight;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Datapoint Loss - per-datapoint decomposition of proper-scoring-rule loss curves
#[derive(Parser)]
#[command(name = "dpl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Analysis config file (JSON or TOML); falls back to DPL_CONFIG and the
    /// standard locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Silence all logging
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate loss curve with its per-class parts
    Curve(CurveArgs),

    /// Peel the curve into one curve per datapoint
    Decompose(DecomposeArgs),

    /// Integrate each datapoint's loss and bin it by probability
    Bins(BinsArgs),

    /// Validate the resolved configuration
    Check,

    /// Inspect configuration
    Config(ConfigArgs),

    /// Print version information
    Version,
}

/// Overrides shared by the analysis commands.
#[derive(Args, Debug, Default)]
struct AnalysisArgs {
    /// Weight function: uniform, quadratic (brier) or entropy (log loss)
    #[arg(long)]
    weight: Option<StandardWeight>,

    /// Number of evenly spaced thresholds over [0, 1]
    #[arg(long)]
    grid_points: Option<usize>,

    /// Drop the thresholds 0 and 1 (required for entropy curves)
    #[arg(long)]
    exclude_endpoints: bool,
}

impl AnalysisArgs {
    fn apply(&self, config: &mut AnalysisConfig) {
        if let Some(weight) = self.weight {
            config.weight = weight;
        }
        if let Some(points) = self.grid_points {
            config.grid.points = points;
        }
        if self.exclude_endpoints {
            config.grid.include_endpoints = false;
        }
    }
}

#[derive(Args, Debug)]
struct CurveArgs {
    /// Dataset file (JSON)
    #[arg(long, short = 'i')]
    input: PathBuf,

    #[command(flatten)]
    analysis: AnalysisArgs,
}

#[derive(Args, Debug)]
struct DecomposeArgs {
    /// Dataset file (JSON)
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Class to decompose (0 or 1); repeat for both
    #[arg(long = "target", value_parser = parse_label)]
    targets: Vec<Label>,

    /// Group by buckets of a numeric feature column
    #[arg(long, requires = "boundaries", conflicts_with = "categorical")]
    numeric_feature: Option<String>,

    /// Ascending bucket boundaries for --numeric-feature
    #[arg(long, value_delimiter = ',', requires = "numeric_feature")]
    boundaries: Vec<f64>,

    /// Group by one-hot indicator columns, as COLUMN=LABEL; repeat per level
    #[arg(long, value_parser = parse_level)]
    categorical: Vec<(String, String)>,

    #[command(flatten)]
    analysis: AnalysisArgs,
}

impl DecomposeArgs {
    fn grouping(&self) -> Option<FeatureGrouping> {
        if let Some(attribute) = &self.numeric_feature {
            return Some(FeatureGrouping::numeric(
                attribute.clone(),
                self.boundaries.clone(),
            ));
        }
        if !self.categorical.is_empty() {
            return Some(FeatureGrouping::categorical(self.categorical.clone()));
        }
        None
    }
}

#[derive(Args, Debug)]
struct BinsArgs {
    /// Dataset file (JSON)
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Class to integrate (0 or 1); repeat for both
    #[arg(long = "target", value_parser = parse_label)]
    targets: Vec<Label>,

    /// Number of histogram bins
    #[arg(long)]
    bins: Option<usize>,

    #[command(flatten)]
    analysis: AnalysisArgs,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration and its snapshot
    Show,
}

fn parse_label(s: &str) -> Result<Label, String> {
    s.trim()
        .parse::<i64>()
        .ok()
        .and_then(Label::from_value)
        .ok_or_else(|| format!("expected 0 or 1, got {:?}", s))
}

fn parse_level(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((column, label)) if !column.is_empty() && !label.is_empty() => {
            Ok((column.to_string(), label.to_string()))
        }
        _ => Err(format!("expected COLUMN=LABEL, got {:?}", s)),
    }
}

// ============================================================================
// Main entry point
// ============================================================================

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::Clean,
                _ => ExitCode::ArgsError,
            };
            let _ = err.print();
            std::process::exit(code.as_i32());
        }
    };

    let log_config = LogConfig::from_cli(
        cli.global.verbose,
        cli.global.quiet,
        cli.global.log_format,
    );
    init_logging(&log_config);

    let ctx = LogContext::new(generate_run_id());
    info!(
        run_id = %ctx.run_id,
        stage = %Stage::Init,
        event = event_names::RUN_STARTED,
        version = env!("CARGO_PKG_VERSION"),
        "dpl started"
    );

    let result = match &cli.command {
        Commands::Curve(args) => run_curve(&cli.global, &ctx, args),
        Commands::Decompose(args) => run_decompose(&cli.global, &ctx, args),
        Commands::Bins(args) => run_bins(&cli.global, &ctx, args),
        Commands::Check => run_check(&cli.global, &ctx),
        Commands::Config(args) => match args.command {
            ConfigCommands::Show => run_config_show(&cli.global, &ctx),
        },
        Commands::Version => Ok(render_version(cli.global.format)),
    };

    let exit_code = match result {
        Ok(output) => {
            print!("{}", output);
            if !output.ends_with('\n') {
                println!();
            }
            ExitCode::Clean
        }
        Err(err) => output_error(&cli.global, &ctx, &err),
    };

    info!(
        run_id = %ctx.run_id,
        stage = %Stage::Report,
        event = event_names::RUN_FINISHED,
        exit_code = exit_code.as_i32(),
        "dpl finished"
    );
    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Configuration
// ============================================================================

fn load(global: &GlobalOpts, ctx: &LogContext) -> dpl_common::Result<LoadedConfig> {
    let loaded = load_config(global.config.as_deref())?;
    match &loaded.paths.analysis {
        Some(path) => info!(
            run_id = %ctx.run_id,
            stage = %Stage::Init,
            event = event_names::CONFIG_LOADED,
            path = %path.display(),
            source = %loaded.paths.source,
            "config loaded"
        ),
        None => info!(
            run_id = %ctx.run_id,
            stage = %Stage::Init,
            event = event_names::CONFIG_DEFAULT_USED,
            "no config file found, using defaults"
        ),
    }
    Ok(loaded)
}

/// Load the config, apply command-line overrides and re-validate the result
/// for what the command uses.
fn prepare<F>(
    global: &GlobalOpts,
    ctx: &LogContext,
    scope: ValidationScope,
    overrides: F,
) -> dpl_common::Result<Analyzer>
where
    F: FnOnce(&mut AnalysisConfig),
{
    let loaded = load(global, ctx)?;
    let mut config = loaded.config;
    overrides(&mut config);
    validate_scoped(&config, scope)?;

    let snapshot = loaded.snapshot.with_effective(&config);
    debug!(
        run_id = %ctx.run_id,
        stage = %Stage::Init,
        config_hash = snapshot.short_id(),
        "effective config"
    );
    let analyzer = match scope {
        ValidationScope::Full => Analyzer::new(config, ctx.clone())?,
        ValidationScope::Integration => Analyzer::for_integration(config, ctx.clone()),
    };
    Ok(analyzer.with_snapshot(snapshot))
}

fn read_dataset(path: &Path, ctx: &LogContext) -> dpl_common::Result<LoadedDataset> {
    let dataset = load_dataset(path)?;
    info!(
        run_id = %ctx.run_id,
        stage = %Stage::Load,
        event = event_names::DATASET_LOADED,
        path = %path.display(),
        n = dataset.predictions.len(),
        features = dataset.features.names().count(),
        "dataset loaded"
    );
    Ok(dataset)
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_curve(
    global: &GlobalOpts,
    ctx: &LogContext,
    args: &CurveArgs,
) -> dpl_common::Result<String> {
    let analyzer = prepare(global, ctx, ValidationScope::Full, |c| args.analysis.apply(c))?;
    let dataset = read_dataset(&args.input, ctx)?;
    analyzer.curve(&dataset.predictions)?.render(global.format)
}

fn run_decompose(
    global: &GlobalOpts,
    ctx: &LogContext,
    args: &DecomposeArgs,
) -> dpl_common::Result<String> {
    let analyzer = prepare(global, ctx, ValidationScope::Full, |c| {
        args.analysis.apply(c);
        if !args.targets.is_empty() {
            c.targets = args.targets.clone();
        }
        if let Some(grouping) = args.grouping() {
            c.grouping = Some(grouping);
        }
    })?;
    let dataset = read_dataset(&args.input, ctx)?;
    analyzer.decompose(&dataset, None)?.render(global.format)
}

fn run_bins(global: &GlobalOpts, ctx: &LogContext, args: &BinsArgs) -> dpl_common::Result<String> {
    let analyzer = prepare(global, ctx, ValidationScope::Integration, |c| {
        args.analysis.apply(c);
        if !args.targets.is_empty() {
            c.targets = args.targets.clone();
        }
        if let Some(bins) = args.bins {
            c.bins = bins;
        }
    })?;
    let dataset = read_dataset(&args.input, ctx)?;
    analyzer.bins(&dataset.predictions)?.render(global.format)
}

fn run_check(global: &GlobalOpts, ctx: &LogContext) -> dpl_common::Result<String> {
    let loaded = load(global, ctx)?;
    validate_analysis(&loaded.config)?;
    let snapshot = &loaded.snapshot;

    Ok(match global.format {
        OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "run_id": ctx.run_id,
            "status": "ok",
            "config_source": snapshot.config_source,
            "config_path": snapshot.config_path,
            "config_hash": snapshot.config_hash,
        }))?,
        OutputFormat::Md => format!(
            "# Configuration check\n\n- status: ok\n- source: {}\n- path: {}\n- hash: {}\n",
            snapshot.config_source,
            snapshot.config_path.as_deref().unwrap_or("-"),
            snapshot.short_id()
        ),
        OutputFormat::Summary => format!(
            "[{}] config ok ({}) {}",
            ctx.run_id,
            snapshot.config_source,
            snapshot.short_id()
        ),
    })
}

fn run_config_show(global: &GlobalOpts, ctx: &LogContext) -> dpl_common::Result<String> {
    let loaded = load(global, ctx)?;
    let config = &loaded.config;
    let snapshot: &ConfigSnapshot = &loaded.snapshot;

    Ok(match global.format {
        OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "run_id": ctx.run_id,
            "config": config,
            "snapshot": snapshot,
        }))?,
        OutputFormat::Md => {
            let targets: Vec<String> = config.targets.iter().map(|t| t.to_string()).collect();
            let grouping = snapshot.summary.grouping.as_deref().unwrap_or("none");
            format!(
                "# Effective configuration\n\n\
                 | setting | value |\n|---|---|\n\
                 | source | {} |\n| weight | {} |\n| grid points | {} |\n\
                 | include endpoints | {} |\n| targets | {} |\n| bins | {} |\n\
                 | grouping | {} |\n| hash | {} |\n",
                snapshot.config_source,
                config.weight,
                config.grid.points,
                config.grid.include_endpoints,
                targets.join(", "),
                config.bins,
                grouping,
                snapshot.short_id()
            )
        }
        OutputFormat::Summary => format!(
            "[{}] weight={} grid={} endpoints={} bins={} source={}",
            ctx.run_id,
            config.weight,
            config.grid.points,
            config.grid.include_endpoints,
            config.bins,
            snapshot.config_source
        ),
    })
}

fn render_version(format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::json!({
            "name": "dpl",
            "version": env!("CARGO_PKG_VERSION"),
            "schema_version": SCHEMA_VERSION,
        })
        .to_string(),
        _ => format!("dpl {}", env!("CARGO_PKG_VERSION")),
    }
}

/// Report an error on stderr in the requested format.
fn output_error(global: &GlobalOpts, ctx: &LogContext, error: &Error) -> ExitCode {
    let exit_code = ExitCode::from(error);

    match global.format {
        OutputFormat::Json => {
            let response = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "run_id": ctx.run_id,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "status": "error",
                "exit_code": exit_code.as_i32(),
                "error": StructuredError::from(error),
            });
            match serde_json::to_string_pretty(&response) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}", error),
            }
        }
        OutputFormat::Summary => {
            eprintln!("[{}] {}: {}", ctx.run_id, exit_code.code_name(), error);
        }
        OutputFormat::Md => {
            eprintln!("{}", error.human());
        }
    }

    exit_code
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(parse_label("0"), Ok(Label::Negative));
        assert_eq!(parse_label(" 1"), Ok(Label::Positive));
        assert!(parse_label("2").is_err());
        assert!(parse_label("yes").is_err());
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(
            parse_level("is_red=red"),
            Ok(("is_red".to_string(), "red".to_string()))
        );
        assert!(parse_level("is_red").is_err());
        assert!(parse_level("=red").is_err());
    }

    #[test]
    fn test_analysis_overrides() {
        let cli = Cli::try_parse_from([
            "dpl",
            "decompose",
            "--input",
            "data.json",
            "--weight",
            "entropy",
            "--grid-points",
            "11",
            "--exclude-endpoints",
            "--target",
            "1",
            "--numeric-feature",
            "age",
            "--boundaries",
            "0,30,60",
        ])
        .unwrap();
        let Commands::Decompose(args) = cli.command else {
            panic!("expected decompose");
        };

        let mut config = AnalysisConfig::default();
        args.analysis.apply(&mut config);
        assert_eq!(config.weight, StandardWeight::Entropy);
        assert_eq!(config.grid.points, 11);
        assert!(!config.grid.include_endpoints);
        assert_eq!(args.targets, vec![Label::Positive]);
        assert_eq!(
            args.grouping(),
            Some(FeatureGrouping::numeric("age", vec![0.0, 30.0, 60.0]))
        );
    }

    #[test]
    fn test_boundaries_require_feature() {
        assert!(Cli::try_parse_from([
            "dpl",
            "decompose",
            "--input",
            "d.json",
            "--boundaries",
            "0,1"
        ])
        .is_err());
    }
}
