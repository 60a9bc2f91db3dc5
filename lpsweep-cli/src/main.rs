//! Command-line driver for supply-network models and scenario sweeps.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lpsweep_core::{MicrolpSolver, SolveStatus, Solver};
use lpsweep_model::network::{self, NetworkOptions};
use lpsweep_model::{sweep, ModelBuilder, ModelInputs, Report, ScenarioDelta, Variation};

#[derive(Parser)]
#[command(
    name = "lpsweep",
    version,
    about = "Assemble and solve supply-network optimization models"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Solve one scenario and print the routing report.
    Solve {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        rules: RuleArgs,

        /// Omit assignments with |value| at or below this threshold.
        #[arg(long, default_value_t = lpsweep_model::DEFAULT_THRESHOLD)]
        threshold: f64,

        /// Emit the report as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Sweep the facility share cap downward and report where the model
    /// turns infeasible.
    Sweep {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        rules: RuleArgs,

        /// Starting share cap, percent of total source capacity.
        #[arg(long, default_value_t = 3.0)]
        from: f64,

        /// Final share cap, percent.
        #[arg(long, default_value_t = 2.0)]
        to: f64,

        /// Step size, percent.
        #[arg(long, default_value_t = 0.1)]
        step: f64,

        /// Keep sweeping past the first infeasible scenario.
        #[arg(long)]
        no_halt: bool,
    },
}

#[derive(Args)]
struct DataArgs {
    /// Sources CSV (Source_ID, Capacity_Tons, Cost_Per_Ton, Quality,
    /// Freight_To_<facility> columns).
    #[arg(long)]
    sources: PathBuf,

    /// Facilities CSV (Facility_ID, Region, Capacity_Tons,
    /// Processing_Cost_Per_Ton, Freight_To_<center> columns).
    #[arg(long)]
    facilities: PathBuf,

    /// Centers CSV (Center_ID, Region, Demand_Tons).
    #[arg(long)]
    centers: PathBuf,
}

#[derive(Args)]
struct RuleArgs {
    /// Facilities may only deliver within their own region.
    #[arg(long)]
    same_region: bool,

    /// Exclude sources below this quality grade.
    #[arg(long)]
    quality_floor: Option<f64>,

    /// Cap each facility at this percent of total source capacity.
    #[arg(long)]
    share_cap: Option<f64>,

    /// Cap each facility at this percent of any single center's demand.
    #[arg(long)]
    pair_share: Option<f64>,
}

impl RuleArgs {
    fn to_options(&self) -> NetworkOptions {
        NetworkOptions {
            same_region: self.same_region,
            quality_floor: self.quality_floor,
            share_cap: self.share_cap.map(|pct| pct / 100.0),
            pair_share: self.pair_share.map(|pct| pct / 100.0),
        }
    }
}

fn load_inputs(data: &DataArgs) -> Result<ModelInputs> {
    network::load_network(&data.sources, &data.facilities, &data.centers)
        .context("failed to load network tables")
}

fn run_solve(data: &DataArgs, rules: &RuleArgs, threshold: f64, json: bool) -> Result<()> {
    let inputs = load_inputs(data)?;
    let spec = network::network_spec(&rules.to_options());
    let model = ModelBuilder::new(&inputs)
        .build(&spec)
        .context("failed to assemble model")?;

    log::info!(
        "assembled {:?}: {} variables, {} constraints",
        model.name,
        model.num_vars(),
        model.num_constraints()
    );

    let result = MicrolpSolver::new()
        .solve(&model)
        .context("solver failed")?;
    let report = Report::with_threshold(&model, &result, threshold);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }

    if !result.status.has_solution() {
        std::process::exit(2);
    }
    Ok(())
}

fn run_sweep(
    data: &DataArgs,
    rules: &RuleArgs,
    from: f64,
    to: f64,
    step: f64,
    no_halt: bool,
) -> Result<()> {
    anyhow::ensure!(step > 0.0, "--step must be positive");
    anyhow::ensure!(from >= to, "--from must not be below --to");

    let inputs = load_inputs(data)?;
    let mut options = rules.to_options();
    // The swept rule must exist in the base spec; seed it with the
    // starting threshold unless one was given explicitly.
    if options.share_cap.is_none() {
        options.share_cap = Some(from / 100.0);
    }
    let base = network::network_spec(&options);

    let steps = ((from - to) / step).round() as i64;
    let variations: Vec<Variation> = (0..=steps)
        .map(|i| {
            let pct = from - i as f64 * step;
            let mut variation = Variation::new(format!("{pct:.1}%")).with_delta(
                ScenarioDelta::SetParam {
                    label: network::SHARE_CAP_LABEL.into(),
                    value: pct / 100.0,
                },
            );
            if !no_halt {
                variation = variation.stop_on_infeasible();
            }
            variation
        })
        .collect();

    let outcomes = sweep(&inputs, &base, &variations, &MicrolpSolver::new())?;

    println!("{}", "=".repeat(60));
    println!("Share-cap sweep: {from:.1}% down to {to:.1}% in {step:.1}% steps");
    println!("{}", "=".repeat(60));

    let mut last_feasible = None;
    for outcome in &outcomes {
        match outcome.result.status {
            SolveStatus::Optimal => {
                println!(
                    "share cap {:>6}  cost = {:>14.2}",
                    outcome.config.label, outcome.result.obj_val
                );
                last_feasible = Some(outcome.config.label.clone());
            }
            status => {
                println!("share cap {:>6}  {status}", outcome.config.label);
            }
        }
    }

    match last_feasible {
        Some(pct) if outcomes.iter().any(|o| !o.result.status.has_solution()) => {
            println!("\nThe model becomes infeasible below {pct}.");
        }
        Some(_) => {
            println!("\nEvery scenario in the sweep is feasible.");
        }
        None => {
            println!("\nNo feasible scenario at or below {from:.1}%.");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match &cli.command {
        Command::Solve {
            data,
            rules,
            threshold,
            json,
        } => run_solve(data, rules, *threshold, *json),
        Command::Sweep {
            data,
            rules,
            from,
            to,
            step,
            no_halt,
        } => run_sweep(data, rules, *from, *to, *step, *no_halt),
    }
}
