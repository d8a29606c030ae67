// ekfslam_sim/src/main.rs

use std::process::ExitCode;

use clap::Parser;
use ekfslam_sim::cli::Cli;
use ekfslam_sim::config::ScenarioConfig;
use ekfslam_sim::logging::init_tracing;
use ekfslam_sim::{Result, RunSummary, Simulation};
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(&cli) {
        Ok(Some(summary)) if summary.error.is_none() => ExitCode::SUCCESS,
        Ok(Some(_)) => ExitCode::FAILURE,
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "simulation aborted");
            ExitCode::FAILURE
        }
    }
}

/// Returns `None` when only the configuration was requested.
fn run(cli: &Cli) -> Result<Option<RunSummary>> {
    // --- 1. Load Simulation Configuration ---
    info!("Loading scenario from: {}", cli.scenario.display());
    let mut config = ScenarioConfig::load(&cli.scenario)?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    if cli.print_config {
        println!("{}", config.to_toml_string()?);
        return Ok(None);
    }

    // --- 2. Run ---
    let summary = Simulation::new(&config)?.run();

    // --- 3. Report ---
    let pose = summary.final_state.pose();
    let truth = summary.final_true_pose;
    info!(
        seed = summary.seed,
        steps = summary.steps_completed,
        requested = summary.steps_requested,
        landmarks = summary.final_state.num_landmarks(),
        "run finished"
    );
    info!(
        "final pose [{:.3}, {:.3}, {:.3}], truth [{:.3}, {:.3}, {:.3}]",
        pose[0], pose[1], pose[2], truth[0], truth[1], truth[2]
    );
    if let Some(rms) = summary.map_rms_error {
        info!("map RMS error: {rms:.3} m");
    }

    let c = &summary.consistency;
    for (k, component) in ["all", "position", "heading"].into_iter().enumerate() {
        match (c.anees[k], c.nees_inside[k]) {
            (Some(anees), Some(inside)) => info!(
                component,
                samples = c.nees_samples[k],
                "ANEES = {anees:.3}, inside {:.0}% band: {inside:.2}",
                100.0 * c.confidence
            ),
            _ => warn!(component, "no usable NEES sample"),
        }
    }
    match (c.anis, c.nis_inside) {
        (Some(anis), Some(inside)) => info!("ANIS = {anis:.3}, inside band: {inside:.2}"),
        _ => warn!("no step produced a NIS sample"),
    }
    if let Some(err) = &summary.error {
        error!(%err, "run stopped early");
    }

    Ok(Some(summary))
}
