use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uf_ledger::config::{Config, ConfigOverrides};
use uf_ledger::consolidate::{national_totals, Granularity, PopulationTable, RevenueTable};
use uf_ledger::output::csv::{population_to_csv, revenue_to_csv, write_csv_file};
use uf_ledger::output::json::render_json;
use uf_ledger::output::table::{
    render_failures_table, render_national_totals_table, render_population_table,
    render_regions_table, render_revenue_table,
};
use uf_ledger::pipeline::{build_fetcher, run_population, run_revenue_sweep, run_wide, sweep_plan};
use uf_ledger::population::YearlyWorkbooks;
use uf_ledger::region::RegionCode;
use uf_ledger::revenue::fetcher::CellFailure;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "uf-ledger",
    about = "Population and tax revenue of the Brazilian states, per year"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[arg(long = "data-dir")]
    data_dir: Option<String>,
    #[arg(long = "output-dir")]
    output_dir: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Normalize the yearly IBGE population sheets into one CSV.
    Population {
        /// Comma-separated years; defaults to [population].years.
        #[arg(long)]
        years: Option<String>,
    },
    /// Sweep the SICONFI RREO API and consolidate state tax revenue.
    Fetch {
        #[arg(long)]
        years: Option<String>,
        /// Comma-separated bimesters (1-6).
        #[arg(long)]
        periods: Option<String>,
        /// Comma-separated UF codes, names or IBGE ids.
        #[arg(long)]
        regions: Option<String>,
        /// Keep one row per bimester instead of summing the year.
        #[arg(long)]
        bimonthly: bool,
    },
    /// Consolidate the wide "arrecadacao por setor" workbook.
    Wide,
    /// List the 27 federative units.
    Regions,
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        data_dir: cli.data_dir.clone(),
        output_dir: cli.output_dir.clone(),
    });

    match &cli.command {
        Commands::Population { years } => {
            if let Some(raw) = years {
                config.population.years = parse_list(raw, "year")?;
            }
            let years = config.population.validated_years()?;
            let source =
                YearlyWorkbooks::new(config.resolved_data_dir(), &config.population.file_pattern);
            let table = run_population(&source, &years, config.population.normalizer_options())?;
            let output_path = config.population_output_path();
            write_csv_file(&output_path, &population_to_csv(&table)?)?;
            info!("wrote {} rows to {}", table.rows().len(), output_path.display());
            print_population(&table, cli.output)?;
        }
        Commands::Fetch {
            years,
            periods,
            regions,
            bimonthly,
        } => {
            if let Some(raw) = years {
                config.revenue.years = parse_list(raw, "year")?;
            }
            if let Some(raw) = periods {
                config.revenue.periods = parse_list(raw, "bimester")?;
            }
            let regions = match regions {
                Some(raw) => parse_list::<RegionCode>(raw, "region")?,
                None => RegionCode::ALL.to_vec(),
            };
            let granularity = if *bimonthly {
                Granularity::Bimonthly
            } else {
                Granularity::Annual
            };
            let plan = sweep_plan(&config.revenue, &regions)?;
            let mut fetcher = build_fetcher(&config.revenue)?;
            let (table, report) = run_revenue_sweep(&mut fetcher, &plan, granularity).await;
            let output_path = config.revenue_output_path();
            write_csv_file(&output_path, &revenue_to_csv(&table)?)?;
            info!("wrote {} rows to {}", table.rows().len(), output_path.display());
            print_revenue(&table, cli.output)?;
            print_failures(&report.failures, cli.output);
        }
        Commands::Wide => {
            let input = config.wide_input_path();
            let table = run_wide(&input, &config.wide.sheet)?;
            let output_path = config.wide_output_path();
            write_csv_file(&output_path, &revenue_to_csv(&table)?)?;
            info!("wrote {} rows to {}", table.rows().len(), output_path.display());
            print_revenue(&table, cli.output)?;
        }
        Commands::Regions => match cli.output {
            OutputFormat::Table => println!("{}", render_regions_table(&RegionCode::ALL)),
            OutputFormat::Json => println!("{}", render_json(&RegionCode::ALL)?),
            OutputFormat::Csv => {
                warn!("CSV output for regions not implemented, using JSON");
                println!("{}", render_json(&RegionCode::ALL)?);
            }
        },
        Commands::Config { .. } => {
            return handle_config_command(&cli.command, &config, &config_path);
        }
    }

    Ok(())
}

fn handle_config_command(command: &Commands, config: &Config, config_path: &Path) -> Result<()> {
    let Commands::Config { init, show } = command else {
        return Ok(());
    };
    if *init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if *show || !*init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

fn parse_list<T>(raw: &str, what: &str) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let mut out = Vec::new();
    for piece in raw.split(',') {
        let trimmed = piece.trim();
        if trimmed.is_empty() {
            continue;
        }
        out.push(
            trimmed
                .parse::<T>()
                .map_err(|e| anyhow!("invalid {what} '{trimmed}': {e}"))?,
        );
    }
    if out.is_empty() {
        return Err(anyhow!("{what} list is empty"));
    }
    Ok(out)
}

fn print_population(table: &PopulationTable, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", render_population_table(table));
            println!("{}", render_national_totals_table(&national_totals(table)));
        }
        OutputFormat::Json => println!("{}", render_json(table.rows())?),
        OutputFormat::Csv => print!("{}", population_to_csv(table)?),
    }
    Ok(())
}

fn print_revenue(table: &RevenueTable, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_revenue_table(table)),
        OutputFormat::Json => println!("{}", render_json(table.rows())?),
        OutputFormat::Csv => print!("{}", revenue_to_csv(table)?),
    }
    Ok(())
}

fn print_failures(failures: &[CellFailure], format: OutputFormat) {
    if failures.is_empty() {
        return;
    }
    warn!("{} cell(s) failed and were counted as zero", failures.len());
    if matches!(format, OutputFormat::Table) {
        println!("{}", render_failures_table(failures));
    }
}
