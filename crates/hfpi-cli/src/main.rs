use std::process::ExitCode;

use anyhow::{Context, Result};
use hfpi_io::{ResultStore, load_case_result, write_directional_report, write_manifest};
use hfpi_model::CaseResult;
use hfpi_solver::{
    HfpiCaseRunner, Signal, Sweep, SweepConfig, SweepError, directional_table, load_completed,
    pooled_extremes,
};
use log::{error, info};

fn usage() {
    eprintln!("usage: hfpi run <sweep.json>");
    eprintln!("       hfpi report <sweep.json>");
    eprintln!("       hfpi inspect <result.bin>");
}

/// Runs every case, writes the manifest and the directional report.
/// Returns the number of failed cases.
fn run(config_path: &str) -> Result<usize> {
    let config = SweepConfig::from_file(config_path)?;
    let plan = config.plan()?;
    let runner = config.runner().context("failed to load structural model")?;
    let store = config.store()?;
    let pool = config.pool()?;

    let report = match Sweep::new(plan).run(&pool, &runner, &store, config.failure_policy()) {
        Ok(report) => report,
        Err(SweepError::AllCasesFailed { report }) => {
            write_manifest(store.root(), &report.to_manifest())?;
            for (params, message) in report.failed() {
                error!("{}: {message}", params.key());
            }
            anyhow::bail!("all {} cases failed", report.outcomes.len());
        }
        Err(err) => return Err(err.into()),
    };
    write_manifest(store.root(), &report.to_manifest())?;

    for (params, message) in report.failed() {
        println!("FAILED {}: {message}", params.key());
    }
    println!(
        "completed: {}  failed: {}  pending: {}",
        report.completed().count(),
        report.failed().count(),
        report.pending().count()
    );

    write_report(&config, &runner, &store)?;
    Ok(report.failed().count())
}

fn write_report(config: &SweepConfig, runner: &HfpiCaseRunner, store: &ResultStore) -> Result<()> {
    let plan = config.plan()?;
    let cases = load_completed(store, plan.cases())?;
    if cases.is_empty() {
        anyhow::bail!("no completed cases in {}", store.root().display());
    }
    let floors = runner.structure().floors();
    let rows = directional_table(&cases, floors, |p| runner.scaled_forces(p))?;

    let path = config.report_path();
    write_directional_report(&path, &rows)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("{} cases aggregated into {}", cases.len(), path.display());
    println!("report: {}", path.display());
    Ok(())
}

fn report(config_path: &str) -> Result<()> {
    let config = SweepConfig::from_file(config_path)?;
    let runner = config.runner().context("failed to load structural model")?;
    let store = config.store()?;
    write_report(&config, &runner, &store)
}

/// Floor-independent signals only.
fn print_extremes(label: &str, result: &CaseResult, signal: Signal) -> Result<()> {
    let series = signal.series(result, &[])?;
    if let Some(extremes) = pooled_extremes(&[series]) {
        for (axis, e) in extremes.iter() {
            println!(
                "{label}_{}: min {:.6e}  mean {:.6e}  max {:.6e}",
                axis.as_str(),
                e.min,
                e.mean,
                e.max
            );
        }
    }
    Ok(())
}

fn inspect(path: &str) -> Result<()> {
    let result = load_case_result(path).with_context(|| format!("failed to read {path}"))?;
    println!("samples: {}", result.num_samples());
    println!("floors: {}", result.num_floors());
    print_extremes("displacement", &result, Signal::Displacement)?;
    print_extremes("sef_base_shear", &result, Signal::StaticEquivalentForce)?;
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        usage();
        return ExitCode::from(2);
    }

    let outcome = match args[1].as_str() {
        "run" => run(&args[2]).map(|failed| failed == 0),
        "report" => report(&args[2]).map(|()| true),
        "inspect" => inspect(&args[2]).map(|()| true),
        _ => {
            usage();
            return ExitCode::from(2);
        }
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}
