use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::data::{DataError, Table, TableLoader, TableRegistry, TextTable};
use crate::logging::init_logging;
use crate::param::{ParamResolver, ResolvedParam, RESOLVER_TABLES, RESOLVER_TEXTS};
use crate::reports::output::{to_pretty_json, write_csv_rows, write_csv_records, write_json};
use crate::reports::{character, gem, hitdamage, scan, star_tower, ReportError};

#[derive(Debug, Parser)]
#[command(name = "datamine")]
#[command(about = "Inspect and cross-reference game data exports", long_about = None)]
pub struct Cli {
    /// Directory holding the `<region>/` export folders
    #[arg(long, global = true)]
    pub data_root: Option<PathBuf>,

    /// Region folder name (default JP)
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Locale folder under `<region>/language/` (default ja_JP)
    #[arg(long, global = true)]
    pub locale: Option<String>,

    /// YAML config file (defaults to ./datamine.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve Param expressions and print them as JSON
    Resolve {
        /// Expressions such as "BuffValue,NoLevel,4021,Time,10K"
        #[arg(required = true)]
        exprs: Vec<String>,

        /// Upper bound for LevelUp / DamageNum levels
        #[arg(long)]
        max_level: Option<u32>,
    },

    /// List Param expressions found in Skill, Word, Potential and Talent
    ScanParams {
        /// Keep only expressions targeting this table
        #[arg(long)]
        filter_table: Option<String>,

        /// Drop repeated expression texts
        #[arg(long)]
        unique: bool,

        /// Rows to print to the console
        #[arg(long, default_value_t = 50)]
        print_sample: usize,

        /// Print Container x Table counts
        #[arg(long)]
        summary: bool,

        /// Write every row to this CSV file
        #[arg(long)]
        export_csv: Option<PathBuf>,

        /// Write every row's resolved payload to this JSON file
        #[arg(long)]
        resolve: Option<PathBuf>,
    },

    /// Count levelTypeData x LevelData combinations in HitDamage
    HitdamageCombos {
        /// Sample ids kept per combination
        #[arg(long, default_value_t = 5)]
        top_samples: usize,

        #[arg(long)]
        export_csv: Option<PathBuf>,
    },

    /// Dump one character with skills, materials and related records
    Character {
        #[arg(default_value_t = character::DEFAULT_CHARACTER_ID)]
        id: i64,

        /// Write JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Gem attribute type and value CSV tables
    GemValues {
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Skip the per-attribute CSV files
        #[arg(long)]
        no_split: bool,
    },

    /// Gem parameter availability per slot position and rarity
    GemTable {
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Gem attribute groups with display names
    GemGroups {
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Merge Star Tower events with their lines, options and outcomes
    StarTowerEvents {
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Resolve { .. } => "resolve",
            Command::ScanParams { .. } => "scan-params",
            Command::HitdamageCombos { .. } => "hitdamage-combos",
            Command::Character { .. } => "character",
            Command::GemValues { .. } => "gem-values",
            Command::GemTable { .. } => "gem-table",
            Command::GemGroups { .. } => "gem-groups",
            Command::StarTowerEvents { .. } => "star-tower-events",
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

pub fn parse_command(args: &[String]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(args)
}

/// Exit codes: 0 success, 1 runtime failure, 2 usage error.
pub fn run_with_args(args: &[String]) -> i32 {
    let cli = match parse_command(args) {
        Ok(cli) => cli,
        Err(err) => {
            let code = err.exit_code();
            let _ = err.print();
            return code;
        }
    };
    init_logging(cli.verbose);

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config failed: {err}");
            return 1;
        }
    };
    apply_overrides(&mut config, &cli);

    let name = cli.command.name();
    match dispatch(cli.command, &config) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{name} failed: {err}");
            1
        }
    }
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(root) = &cli.data_root {
        config.data_root = root.clone();
    }
    if let Some(region) = &cli.region {
        config.region = region.clone();
    }
    if let Some(locale) = &cli.locale {
        config.locale = locale.clone();
    }
}

fn load_registry(config: &Config, tables: &[&str], texts: &[&str]) -> Result<TableRegistry, DataError> {
    let mut loader = TableLoader::new(config.layout());
    let registry = TableRegistry::load(&mut loader, tables, texts)?;
    info!(
        files = loader.cached_paths(),
        root = %config.data_root.display(),
        "loaded export tables"
    );
    Ok(registry)
}

fn dispatch(command: Command, config: &Config) -> Result<(), CommandError> {
    match command {
        Command::Resolve { exprs, max_level } => handle_resolve(config, &exprs, max_level),
        Command::ScanParams {
            filter_table,
            unique,
            print_sample,
            summary,
            export_csv,
            resolve,
        } => handle_scan(
            config,
            scan::ScanOptions {
                filter_table,
                unique,
            },
            print_sample,
            summary,
            export_csv.as_deref(),
            resolve.as_deref(),
        ),
        Command::HitdamageCombos {
            top_samples,
            export_csv,
        } => handle_hitdamage(config, top_samples, export_csv.as_deref()),
        Command::Character { id, output } => handle_character(config, id, output.as_deref()),
        Command::GemValues { out_dir, no_split } => {
            let out_dir = out_dir.unwrap_or_else(|| config.output_dir.clone());
            handle_gem_values(config, &out_dir, !no_split)
        }
        Command::GemTable { output } => {
            let output = output.unwrap_or_else(|| config.output_dir.join(gem::PARAMETER_TABLE_CSV));
            handle_gem_table(config, &output)
        }
        Command::GemGroups { out_dir } => {
            let out_dir = out_dir.unwrap_or_else(|| config.output_dir.join(gem::GROUPS_DIR));
            handle_gem_groups(config, &out_dir)
        }
        Command::StarTowerEvents { output } => {
            let output =
                output.unwrap_or_else(|| config.output_dir.join(star_tower::DEFAULT_OUTPUT_FILE));
            handle_star_tower(config, &output)
        }
    }
}

fn handle_resolve(config: &Config, exprs: &[String], max_level: Option<u32>) -> Result<(), CommandError> {
    let registry = load_registry(config, RESOLVER_TABLES, RESOLVER_TEXTS)?;
    let resolver = ParamResolver::new(&registry);
    let resolved: Vec<ResolvedParam> = exprs
        .iter()
        .map(|expr| resolver.resolve(expr, max_level))
        .collect();
    println!("{}", to_pretty_json(&resolved)?);
    Ok(())
}

fn handle_scan(
    config: &Config,
    options: scan::ScanOptions,
    print_sample: usize,
    summary: bool,
    export_csv: Option<&Path>,
    resolve: Option<&Path>,
) -> Result<(), CommandError> {
    // Resolving needs the resolver tables on top of the scanned containers.
    let (tables, texts) = if resolve.is_some() {
        ([scan::SCAN_CONTAINERS, RESOLVER_TABLES].concat(), RESOLVER_TEXTS.to_vec())
    } else {
        (scan::SCAN_CONTAINERS.to_vec(), Vec::new())
    };
    let registry = load_registry(config, &tables, &texts)?;

    let rows = scan::scan_params(&registry, &options);
    print!("{}", scan::render_rows(&rows, Some(print_sample)));
    if let Some(path) = export_csv {
        write_csv_rows(path, &rows)?;
        println!("\nwrote csv: {}", path.display());
    }
    if summary {
        print!("{}", scan::render_summary(&scan::summarize(&rows)));
    }
    if let Some(path) = resolve {
        let resolved = scan::resolve_rows(&registry, &rows);
        write_json(path, &resolved)?;
        println!("wrote resolved params: {}", path.display());
    }
    Ok(())
}

fn handle_hitdamage(config: &Config, top_samples: usize, export_csv: Option<&Path>) -> Result<(), CommandError> {
    let registry = load_registry(config, &[hitdamage::HIT_DAMAGE_TABLE], &[])?;
    let empty = Table::default();
    let table = registry.table(hitdamage::HIT_DAMAGE_TABLE).unwrap_or(&empty);
    let report = hitdamage::analyze_combos(table, top_samples);
    print!("{}", hitdamage::render_report(&report));
    if let Some(path) = export_csv {
        write_csv_records(path, hitdamage::CSV_HEADER, &hitdamage::csv_records(&report))?;
        println!("\nwrote csv: {}", path.display());
    }
    Ok(())
}

fn handle_character(config: &Config, id: i64, output: Option<&Path>) -> Result<(), CommandError> {
    let tables = [character::CHARACTER_TABLES, RESOLVER_TABLES].concat();
    let texts = [character::CHARACTER_TEXTS, RESOLVER_TEXTS].concat();
    let registry = load_registry(config, &tables, &texts)?;
    let Some(details) = character::character_details(&registry, id) else {
        println!("character {id} not found");
        return Ok(());
    };
    match output {
        Some(path) => {
            write_json(path, &details)?;
            println!("wrote character {id}: {}", path.display());
        }
        None => println!("{}", to_pretty_json(&details)?),
    }
    Ok(())
}

fn handle_gem_values(config: &Config, out_dir: &Path, split: bool) -> Result<(), CommandError> {
    let registry = load_registry(config, &[gem::ATTR_TYPE_TABLE, gem::ATTR_VALUE_TABLE], &[])?;
    let empty = Table::default();
    let tables = gem::build_value_tables(
        registry.table(gem::ATTR_TYPE_TABLE).unwrap_or(&empty),
        registry.table(gem::ATTR_VALUE_TABLE).unwrap_or(&empty),
    );
    gem::write_value_tables(&tables, out_dir, split)?;
    println!("attribute types: {}", tables.types.len());
    println!("- {}", out_dir.join(gem::TYPES_CSV).display());
    println!("- {}", out_dir.join(gem::VALUES_CSV).display());
    if split {
        println!("- {}", out_dir.join(gem::SPLIT_DIR).display());
    }
    Ok(())
}

fn handle_gem_table(config: &Config, output: &Path) -> Result<(), CommandError> {
    let names = [
        gem::ATTR_TYPE_TABLE,
        gem::ATTR_GROUP_TABLE,
        gem::ATTR_VALUE_TABLE,
        gem::SLOT_CONTROL_TABLE,
    ];
    let registry = load_registry(config, &names, &[])?;
    let empty = Table::default();
    let table = |name: &str| registry.table(name).unwrap_or(&empty);
    let rows = gem::build_parameter_table(
        table(gem::ATTR_TYPE_TABLE),
        table(gem::ATTR_GROUP_TABLE),
        table(gem::ATTR_VALUE_TABLE),
        table(gem::SLOT_CONTROL_TABLE),
    );
    gem::write_parameter_table(&rows, output)?;
    println!("wrote {} parameters: {}", rows.len(), output.display());
    Ok(())
}

fn handle_gem_groups(config: &Config, out_dir: &Path) -> Result<(), CommandError> {
    let names = [gem::ATTR_TYPE_TABLE, gem::ATTR_GROUP_TABLE, gem::ATTR_VALUE_TABLE];
    let registry = load_registry(config, &names, &[gem::EFFECT_DESC_TEXT])?;
    let empty = Table::default();
    let no_text = TextTable::default();
    let table = |name: &str| registry.table(name).unwrap_or(&empty);
    let groups = gem::build_attr_groups(
        table(gem::ATTR_TYPE_TABLE),
        table(gem::ATTR_GROUP_TABLE),
        table(gem::ATTR_VALUE_TABLE),
        registry.text(gem::EFFECT_DESC_TEXT).unwrap_or(&no_text),
    );
    gem::write_attr_groups(&groups, out_dir)?;
    println!("wrote {} groups: {}", groups.len(), out_dir.display());
    Ok(())
}

fn handle_star_tower(config: &Config, output: &Path) -> Result<(), CommandError> {
    let registry = load_registry(config, star_tower::STAR_TOWER_TABLES, star_tower::STAR_TOWER_TEXTS)?;
    let events = star_tower::merge_events(&registry);
    write_json(output, &events)?;
    println!("wrote {} events: {}", events.len(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn parses_resolve_with_global_flags_after_subcommand() {
        let cli = parse_command(&args(&[
            "datamine",
            "resolve",
            "BuffValue,NoLevel,1,Time,10K",
            "--max-level",
            "3",
            "--region",
            "CN",
        ]))
        .unwrap();
        assert_eq!(cli.region.as_deref(), Some("CN"));
        match cli.command {
            Command::Resolve { exprs, max_level } => {
                assert_eq!(exprs.len(), 1);
                assert_eq!(max_level, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn character_id_defaults() {
        let cli = parse_command(&args(&["datamine", "character"])).unwrap();
        assert!(matches!(
            cli.command,
            Command::Character { id: character::DEFAULT_CHARACTER_ID, output: None }
        ));
        assert_eq!(cli.command.name(), "character");
    }

    #[test]
    fn usage_errors_exit_with_two() {
        assert_eq!(run_with_args(&args(&["datamine"])), 2);
        assert_eq!(run_with_args(&args(&["datamine", "resolve"])), 2);
        assert_eq!(run_with_args(&args(&["datamine", "frobnicate"])), 2);
    }

    #[test]
    fn missing_export_is_a_runtime_failure() {
        let code = run_with_args(&args(&[
            "datamine",
            "--data-root",
            "/nonexistent/datamine-export",
            "resolve",
            "BuffValue,NoLevel,1",
        ]));
        assert_eq!(code, 1);
    }

    #[test]
    fn cli_flags_override_config() {
        let cli = parse_command(&args(&["datamine", "--locale", "en_US", "gem-table"])).unwrap();
        let mut config = Config::default();
        apply_overrides(&mut config, &cli);
        assert_eq!(config.locale, "en_US");
        assert_eq!(config.region, "JP");
    }
}
