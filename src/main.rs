mod cg;
mod cli;
mod error;
mod instance;
mod logging;
mod master;
mod pricing;
mod sigint;
mod tcg;

use clap::Parser;
use cli::Cli;
use error::SolverError;
use instance::Instance;
use master::scip_backend::ScipMaster;
use master::{MasterInterface, SimplexAlgo};
use pricing::PricingAlgo;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use tracing::info;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(exit_code(&err));
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<SolverError>() {
        Some(SolverError::Config(_)) => 2,
        _ => 1,
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.validate()?;
    logging::init();
    sigint::install_handler();

    let file = File::open(&cli.instance)
        .map_err(|e| SolverError::Config(format!("cannot open instance file {}: {e}", cli.instance.display())))?;
    let inst = Instance::read_from(BufReader::new(file), cli.sort_deadhead_arcs())?;
    let inst = Arc::new(inst);
    info!(
        num_depots = inst.num_depots(),
        num_trips = inst.num_trips(),
        "loaded instance"
    );

    let mut master = ScipMaster::new(&inst);
    if let Some(path) = &cli.import_cols {
        let added = master.import_columns(path)?;
        info!(added, path = %path.display(), "imported columns");
    }

    let algo: PricingAlgo = cli.pricing.into();
    let single_path = cli.max_paths == 1;
    let mut pricings = pricing::build_pricings(&inst, algo, single_path, cli.max_paths);
    for p in pricings.iter_mut() {
        p.set_max_label_expansions_per_node(cli.max_label_expansions);
    }

    let cg_report = cg::run(&mut master, &mut pricings, inst.num_trips(), inst.num_depots())?;
    info!(
        final_phase = ?cg_report.final_phase,
        iterations = cg_report.iterations,
        final_obj = cg_report.final_obj,
        interrupted = cg_report.interrupted,
        "column generation converged"
    );

    for p in pricings.iter_mut() {
        p.set_max_label_expansions_per_node(cli.max_label_expansions_tcg);
    }

    let tcg_cfg = tcg::TcgConfig {
        max_sub_iter: cli.tcg_max_sub_iterations,
        var_sel: cli.tcg_var_sel.into(),
        grasp_strategy: cli.tcg_grasp_strategy.into(),
        grasp_alpha: cli.tcg_grasp_alpha,
        ..tcg::TcgConfig::default()
    };
    let mut rng = StdRng::seed_from_u64(cli.seed);
    let tcg_report = tcg::run(&mut master, &mut pricings, inst.num_trips(), inst.num_depots(), tcg_cfg, &mut rng)?;
    info!(
        outer_iterations = tcg_report.outer_iterations,
        all_covered = tcg_report.all_covered,
        interrupted = tcg_report.interrupted,
        "truncated column generation finished"
    );

    master.convert_to_binary();
    let binary_obj = master.solve(SimplexAlgo::Primal)?;
    master.convert_to_relaxed();
    let relaxed_obj = master.solve(SimplexAlgo::Primal)?;

    println!("depots\t{}", inst.num_depots());
    println!("trips\t{}", inst.num_trips());
    println!("columns\t{}", master.num_columns());
    println!("binary_obj\t{binary_obj:.6}");
    println!("relaxed_obj\t{relaxed_obj:.6}");
    println!("all_trips_covered\t{}", tcg_report.all_covered);

    if let Some(path) = &cli.export_cols {
        master.export_columns(path)?;
        info!(path = %path.display(), "exported columns");
    }

    Ok(())
}
