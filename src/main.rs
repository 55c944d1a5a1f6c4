//! EMS simulator entry point: CLI wiring and config-driven engine construction.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ems_sim::config::ScenarioConfig;
use ems_sim::ems::AllocationStrategy;
use ems_sim::io::export::{RunSummary, export_csv, export_summary};
use ems_sim::sim::engine::Engine;
use ems_sim::sim::kpi::KpiReport;

#[derive(Parser)]
#[command(
    name = "ems-sim",
    about = "Household surplus-electricity energy management simulator"
)]
struct Cli {
    /// Load the scenario from a TOML file.
    #[arg(long, conflicts_with = "preset")]
    scenario: Option<PathBuf>,

    /// Built-in preset: baseline, tie_group, winter.
    #[arg(long)]
    preset: Option<String>,

    /// Override the random seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Override the allocation strategy: sequential, tie-group.
    #[arg(long)]
    strategy: Option<AllocationStrategy>,

    /// Export step results to CSV.
    #[arg(long)]
    telemetry_out: Option<PathBuf>,

    /// Export the KPI summary to JSON.
    #[arg(long)]
    summary_out: Option<PathBuf>,

    /// Print only the KPI report.
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // --scenario takes priority, then --preset, then the baseline default.
    let (label, mut scenario) = if let Some(path) = &cli.scenario {
        let cfg = ScenarioConfig::from_toml_file(path)
            .with_context(|| format!("loading scenario {}", path.display()))?;
        (path.display().to_string(), cfg)
    } else {
        let name = cli.preset.as_deref().unwrap_or("baseline");
        (name.to_string(), ScenarioConfig::from_preset(name)?)
    };

    if let Some(seed) = cli.seed {
        scenario.simulation.seed = seed;
    }
    if let Some(strategy) = cli.strategy {
        scenario.ems.strategy = strategy.to_string();
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        bail!("scenario \"{label}\" has {} invalid field(s)", errors.len());
    }

    let sim_config = scenario.sim_config();
    let ems_config = scenario.ems_config()?;
    let household = scenario.household(&sim_config);
    let battery_capacity_wh = household.battery.as_ref().map_or(0.0, |b| b.capacity_wh);

    info!(
        scenario = %label,
        strategy = %ems_config.strategy,
        steps = sim_config.total_steps(),
        "starting simulation"
    );

    let mut engine = Engine::new(sim_config.clone(), household, scenario.weights(), ems_config)
        .context("wiring the household to the EMS")?;
    let results = engine.run().context("simulation aborted")?;
    let kpi = KpiReport::from_results(&results, sim_config.dt_hours, battery_capacity_wh);

    if !cli.quiet {
        for r in &results {
            println!("{r}");
        }
        println!();
    }
    println!("{kpi}");

    if let Some(path) = &cli.telemetry_out {
        export_csv(&results, path)
            .with_context(|| format!("writing telemetry to {}", path.display()))?;
        eprintln!("Telemetry written to {}", path.display());
    }

    if let Some(path) = &cli.summary_out {
        let summary = RunSummary {
            scenario: &label,
            seed: sim_config.seed,
            steps: results.len(),
            ems: ems_config,
            kpi: &kpi,
        };
        export_summary(&summary, path)
            .with_context(|| format!("writing summary to {}", path.display()))?;
        eprintln!("Summary written to {}", path.display());
    }

    Ok(())
}
