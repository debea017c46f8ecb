mod cli;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use fw_harness::{FixtureLoader, MultiBackendRunner, RunReport};
use fw_runtime::{BackendRegistry, Config, ModelHandle};
use fw_tensor::ByteOrder;
use fw_vision::ForwardService;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log))
        .with_context(|| format!("invalid log filter '{}'", cli.log))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Verify {
            model,
            fixtures,
            input_name,
            output_name,
            backends,
            tolerance,
            byte_order,
            debug,
            json,
        } => verify(VerifyArgs {
            model,
            fixtures,
            input_name,
            output_name,
            backends,
            tolerance,
            byte_order,
            debug,
            json,
        }),
        Command::Predict {
            model,
            image,
            base64,
            backend,
            input_name,
            output_name,
            width,
            height,
        } => {
            let service = ForwardService::load(
                &model,
                Config::default(),
                BackendRegistry::with_defaults(),
                input_name,
                output_name,
            )
            .with_context(|| format!("failed to set up model {}", model.display()))?
            .with_resolution(width, height);
            predict(&service, image, base64, &backend)
        }
    }
}

struct VerifyArgs {
    model: PathBuf,
    fixtures: PathBuf,
    input_name: String,
    output_name: String,
    backends: Vec<String>,
    tolerance: f64,
    byte_order: ByteOrder,
    debug: bool,
    json: bool,
}

fn verify(args: VerifyArgs) -> Result<()> {
    let config = Config::builder()
        .memory_byte_order(args.byte_order)
        .debug(args.debug)
        .build();
    let model = ModelHandle::load(&args.model, config)
        .with_context(|| format!("failed to load model {}", args.model.display()))?;

    let pairs = FixtureLoader::new(args.byte_order)
        .discover_pairs(&args.fixtures, &args.input_name, &args.output_name)
        .with_context(|| format!("failed to read fixtures in {}", args.fixtures.display()))?;
    if pairs.is_empty() {
        bail!("no test_data_set_<n> directories in {}", args.fixtures.display());
    }
    info!(fixtures = pairs.len(), backends = args.backends.len(), "starting golden run");

    let registry = BackendRegistry::with_defaults();
    let report = MultiBackendRunner::new(&registry).run(&model, &args.backends, &pairs, args.tolerance);

    let summary = Summary::new(&report, &args.backends, pairs.len(), args.tolerance);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        summary.print();
    }

    let failed = report.failures().count();
    if failed > 0 {
        bail!("{} of {} cells failed", failed, report.len());
    }
    Ok(())
}

fn predict(service: &ForwardService, image: PathBuf, base64: bool, backend: &str) -> Result<()> {
    let result = if base64 {
        let text = std::fs::read_to_string(&image)
            .with_context(|| format!("failed to read {}", image.display()))?;
        service.forward(&text, backend)
    } else {
        let bytes = std::fs::read(&image).with_context(|| format!("failed to read {}", image.display()))?;
        service.forward_bytes(&bytes, backend)
    };
    let output = result.with_context(|| format!("forward on backend '{}' failed", backend))?;

    let prediction = Prediction {
        backend,
        class: argmax(&output),
        output,
    };
    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}

/// Index of the largest score; NaN scores never win.
fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_nan())
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
}

#[derive(Serialize)]
struct Prediction<'a> {
    backend: &'a str,
    class: Option<usize>,
    output: Vec<f32>,
}

#[derive(Serialize)]
struct CellSummary {
    backend: String,
    fixture: usize,
    passed: bool,
    max_abs_diff: Option<f64>,
    detail: Option<String>,
}

#[derive(Serialize)]
struct Agreement {
    baseline: String,
    backend: String,
    fixture: usize,
    passed: bool,
    max_abs_diff: f64,
}

#[derive(Serialize)]
struct Summary {
    tolerance: f64,
    cells: Vec<CellSummary>,
    /// Each further backend against the first one, per fixture.
    agreement: Vec<Agreement>,
}

impl Summary {
    fn new(report: &RunReport, backends: &[String], fixtures: usize, tolerance: f64) -> Self {
        let cells = report
            .cells()
            .iter()
            .map(|cell| match &cell.outcome {
                Ok(result) => CellSummary {
                    backend: cell.backend.clone(),
                    fixture: cell.fixture,
                    passed: result.passed,
                    max_abs_diff: Some(result.max_abs_diff),
                    detail: result.mismatch.as_ref().map(ToString::to_string),
                },
                Err(err) => CellSummary {
                    backend: cell.backend.clone(),
                    fixture: cell.fixture,
                    passed: false,
                    max_abs_diff: None,
                    detail: Some(err.to_string()),
                },
            })
            .collect();

        let mut agreement = Vec::new();
        if let Some((baseline, others)) = backends.split_first() {
            for other in others {
                for fixture in 0..fixtures {
                    if let Some(result) = report.cross_backend(baseline, other, fixture, tolerance) {
                        agreement.push(Agreement {
                            baseline: baseline.clone(),
                            backend: other.clone(),
                            fixture,
                            passed: result.passed,
                            max_abs_diff: result.max_abs_diff,
                        });
                    }
                }
            }
        }

        Summary {
            tolerance,
            cells,
            agreement,
        }
    }

    fn print(&self) {
        for cell in &self.cells {
            let status = if cell.passed { "ok" } else { "FAIL" };
            match (&cell.max_abs_diff, &cell.detail) {
                (Some(diff), None) => println!(
                    "{:<12} test_data_set_{:<4} {:<5} max_abs_diff={:e}",
                    cell.backend, cell.fixture, status, diff
                ),
                (Some(diff), Some(detail)) => println!(
                    "{:<12} test_data_set_{:<4} {:<5} max_abs_diff={:e} {}",
                    cell.backend, cell.fixture, status, diff, detail
                ),
                (None, detail) => println!(
                    "{:<12} test_data_set_{:<4} {:<5} {}",
                    cell.backend,
                    cell.fixture,
                    status,
                    detail.as_deref().unwrap_or("")
                ),
            }
        }
        for a in &self.agreement {
            println!(
                "{} vs {} on test_data_set_{}: {} (max_abs_diff={:e})",
                a.backend,
                a.baseline,
                a.fixture,
                if a.passed { "agree" } else { "DIFFER" },
                a.max_abs_diff
            );
        }
    }
}
