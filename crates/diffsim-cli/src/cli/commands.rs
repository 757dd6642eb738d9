use super::CliError;
use anyhow::Context;
use diffsim_core::common::ElementTables;
use diffsim_core::domain::{Configuration, SIMULATION_SECTION, SimError};
use diffsim_core::modules::{Input, Output, ShotPulse};
use diffsim_core::numerics::EulerAngles;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(clap::Args)]
pub(super) struct RunArgs {
    /// Simulation configuration (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Random seed, overrides simulation.random_seed
    #[arg(long)]
    seed: Option<u64>,

    /// Element tables (JSON) replacing the built-in set
    #[arg(long)]
    element_tables: Option<PathBuf>,

    /// JSON run report output path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(long, short)]
    pub(super) verbose: bool,
}

#[derive(Debug, Serialize)]
struct RunReport {
    seed: u64,
    sample_type: String,
    number_of_images: usize,
    detector_shape: [usize; 2],
    linear_sampling_ratio: Option<f64>,
    full_period_edge_resolution: f64,
    shots: Vec<ShotReport>,
}

#[derive(Debug, Serialize)]
struct ShotReport {
    index: usize,
    pulse: ShotPulse,
    euler_angles: Option<EulerAngles>,
    sample_diameter: Option<f64>,
    total_photons: f64,
    sanitized_pixels: usize,
}

pub(super) fn run_simulation_command(args: RunArgs) -> Result<i32, CliError> {
    let mut configuration = Configuration::load(&args.config)?;
    if let Some(seed) = args.seed {
        configuration.set(SIMULATION_SECTION, "random_seed", seed);
    }

    let loaded_tables = args
        .element_tables
        .as_deref()
        .map(ElementTables::load)
        .transpose()
        .map_err(SimError::from)?;
    let tables: &ElementTables = match loaded_tables.as_ref() {
        Some(tables) => tables,
        None => ElementTables::builtin(),
    };

    let mut input = Input::new(&configuration, tables)?;
    let output = Output::new(&mut input)?;
    let report = build_report(&output)?;

    println!("{}", render_human_summary(&report));
    if let Some(path) = &args.report {
        write_report(path, &report)?;
        println!("JSON report: {}", path.display());
    }
    Ok(0)
}

pub(super) fn run_defaults_command() -> Result<i32, CliError> {
    println!("{}", Configuration::defaults().to_json_pretty()?);
    Ok(0)
}

fn build_report(output: &Output<'_>) -> Result<RunReport, CliError> {
    let input = output.input();
    let (ny, nx) = input.detector().binned_shape();
    let shots = output
        .shots()
        .iter()
        .enumerate()
        .map(|(index, shot)| {
            Ok(ShotReport {
                index,
                pulse: shot.pulse,
                euler_angles: shot.euler_angles,
                sample_diameter: shot.sample_diameter,
                total_photons: output.total_photons(index)?,
                sanitized_pixels: shot.sanitized_pixels,
            })
        })
        .collect::<Result<Vec<_>, SimError>>()?;

    Ok(RunReport {
        seed: input.seed(),
        sample_type: input.sample().sample_type().to_string(),
        number_of_images: output.number_of_images(),
        detector_shape: [ny, nx],
        linear_sampling_ratio: output.linear_sampling_ratio(),
        full_period_edge_resolution: output.full_period_edge_resolution(),
        shots,
    })
}

fn render_human_summary(report: &RunReport) -> String {
    let mut lines = vec![
        format!(
            "Simulated {} image(s) of a {} sample on a {}x{} detector (seed {})",
            report.number_of_images,
            report.sample_type,
            report.detector_shape[1],
            report.detector_shape[0],
            report.seed
        ),
        match report.linear_sampling_ratio {
            Some(ratio) => format!("Linear sampling ratio: {:.3}", ratio),
            None => "Linear sampling ratio: n/a".to_string(),
        },
        format!(
            "Full-period edge resolution: {:.3e} m",
            report.full_period_edge_resolution
        ),
    ];
    for shot in &report.shots {
        lines.push(format!(
            "  shot {:>3}: pulse {:.3e} J, {:.3e} photons{}",
            shot.index,
            shot.pulse.pulse_energy,
            shot.total_photons,
            if shot.sanitized_pixels > 0 {
                format!(", {} pixel(s) zeroed", shot.sanitized_pixels)
            } else {
                String::new()
            }
        ));
    }
    lines.join("\n")
}

fn write_report(path: &Path, report: &RunReport) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).context("failed to serialize run report")?;
    fs::write(path, json)
        .with_context(|| format!("failed to write run report '{}'", path.display()))?;
    Ok(())
}
