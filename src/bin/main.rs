//! tmdl-migrate CLI - Upgrade TMDL semantic models and stamp out report shells
//!
//! Usage:
//!   tmdl-migrate run [--config <file>] [--input <dir>] [--output <dir>] [--template <dir>] [--partition-name <quoted|bare>]
//!   tmdl-migrate inspect <table.tmdl> --level <1500|1600> [--datasources <file>] [--partition-name <quoted|bare>]
//!   tmdl-migrate level <model-dir>
//!
//! Examples:
//!   tmdl-migrate run --input workspace --output PBIP --template src/Default.Report
//!   tmdl-migrate inspect Sales.SemanticModel/definition/tables/Orders.tmdl --level 1500
//!   tmdl-migrate level PBIP/Sales.SemanticModel

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tmdl_migrate::config::{ConfigOverrides, MigrateConfig, PartitionNameStyle, Settings};
use tmdl_migrate::layout::ModelDir;
use tmdl_migrate::migrate::{self, detect_level};
use tmdl_migrate::rewrite::{rewrite_table, RewriteOptions};
use tmdl_migrate::tmdl::{BindingStrategy, DataSourceCatalog};
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "tmdl-migrate")]
#[command(about = "Upgrade TMDL semantic models to a modern compatibility level")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy, rewrite and bind every semantic model under the input root
    Run {
        /// Path to a TOML config file (default search path otherwise)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Input root containing *.SemanticModel directories
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output root the migrated copies are written to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Template report directory cloned for every model
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Compatibility level written to database.tmdl
        #[arg(long)]
        target_level: Option<u32>,

        /// Database used when a referenced data source names none
        #[arg(long)]
        default_database: Option<String>,

        /// Partition identifier style for level 1500 tables (quoted or bare)
        #[arg(long)]
        partition_name: Option<String>,
    },

    /// Rewrite one table file in memory and print the result
    Inspect {
        /// Path to the table .tmdl file
        file: PathBuf,

        /// Declared compatibility level of the owning model
        #[arg(short, long)]
        level: u32,

        /// Data-sources document used to resolve referenced data sources
        #[arg(long)]
        datasources: Option<PathBuf>,

        /// Database used when a referenced data source names none
        #[arg(long)]
        default_database: Option<String>,

        /// Partition identifier style for level 1500 tables (quoted or bare)
        #[arg(long)]
        partition_name: Option<String>,

        /// Path to a TOML config file supplying defaults for the options above
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the compatibility level and strategy of a model directory
    Level {
        /// Path to a *.SemanticModel directory
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Commands::Run {
            config,
            input,
            output,
            template,
            target_level,
            default_database,
            partition_name,
        } => {
            let overrides = ConfigOverrides {
                input,
                output,
                template,
                target_level,
                default_database,
                ..Default::default()
            };
            cmd_run(config.as_deref(), overrides, partition_name.as_deref())
        }
        Commands::Inspect {
            file,
            level,
            datasources,
            default_database,
            partition_name,
            config,
        } => cmd_inspect(
            file,
            level,
            datasources,
            default_database,
            partition_name.as_deref(),
            config.as_deref(),
        ),
        Commands::Level { dir } => cmd_level(dir),
    }
}

fn load_settings(config: Option<&Path>) -> tmdl_migrate::Result<Settings> {
    let settings = match config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };
    Ok(settings)
}

/// Resolve the file settings first, then apply command-line values verbatim.
fn build_config(
    config: Option<&Path>,
    mut overrides: ConfigOverrides,
    partition_name: Option<&str>,
) -> tmdl_migrate::Result<MigrateConfig> {
    let settings = load_settings(config)?;
    if let Some(style) = partition_name {
        overrides.legacy_partition_name = Some(PartitionNameStyle::from_str(style)?);
    }
    Ok(settings.resolve()?.with_overrides(overrides)?)
}

fn cmd_run(
    config: Option<&Path>,
    overrides: ConfigOverrides,
    partition_name: Option<&str>,
) -> ExitCode {
    let config = match build_config(config, overrides, partition_name) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match migrate::run(&config) {
        Ok(summary) => {
            println!("{}", summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Migration aborted: {}", e);
            eprintln!("Migration aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_inspect(
    file: PathBuf,
    level: u32,
    datasources: Option<PathBuf>,
    default_database: Option<String>,
    partition_name: Option<&str>,
    config: Option<&Path>,
) -> ExitCode {
    let overrides = ConfigOverrides {
        default_database,
        ..Default::default()
    };
    let resolved = match build_config(config, overrides, partition_name) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let Some(strategy) = BindingStrategy::for_level(level) else {
        eprintln!("Unsupported compatibility level {} (expected 1500 or 1600)", level);
        return ExitCode::FAILURE;
    };

    let source = match fs::read_to_string(&file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let catalog = match &datasources {
        Some(path) => match fs::read_to_string(path) {
            Ok(s) => Some(DataSourceCatalog::parse(&s)),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    let options = RewriteOptions::new(strategy)
        .with_catalog(catalog.as_ref())
        .with_default_database(resolved.default_database.as_deref())
        .with_legacy_partition_name(resolved.legacy_partition_name);

    let outcome = match rewrite_table(&source, &options) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Rewrite error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("File: {}", file.display());
    println!("Strategy: {}", strategy);
    println!();

    match &outcome.binding {
        Some(binding) => {
            println!("Binding:");
            println!("  server:   {}", binding.server);
            println!("  database: {}", binding.database);
            println!("  schema:   {}", binding.schema);
            println!("  table:    {}", binding.table);
        }
        None => println!("No partition block; header kept as is."),
    }
    println!();

    if !outcome.mappings.is_empty() {
        println!("Columns:");
        for mapping in &outcome.mappings {
            println!("  - {} <- {}", mapping.column, mapping.source);
        }
        println!();
    }

    if !outcome.fallbacks.is_empty() {
        println!("Fallbacks:");
        for fallback in &outcome.fallbacks {
            println!("  - {}", fallback);
        }
        println!();
    }

    println!("{}", outcome.content);
    ExitCode::SUCCESS
}

fn cmd_level(dir: PathBuf) -> ExitCode {
    let Some(model) = ModelDir::from_path(&dir) else {
        eprintln!("'{}' is not a *.SemanticModel directory", dir.display());
        return ExitCode::FAILURE;
    };

    match detect_level(&model) {
        Ok(Some(level)) => {
            match BindingStrategy::for_level(level) {
                Some(strategy) => println!("{}: level {} ({})", model.base_name(), level, strategy),
                None => println!("{}: level {} (unsupported)", model.base_name(), level),
            }
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!("{}: compatibilityLevel not declared", model.base_name());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
