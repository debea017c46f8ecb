use fw_runtime::{Backend, BackendRegistry, ModelHandle, Session};
use fw_tensor::Tensor;
use tracing::{info, info_span, warn};

use crate::compare::{compare, ComparisonResult};
use crate::error::CellError;
use crate::fixture::FixturePair;

/// The result of running one fixture through one backend.
#[derive(Debug)]
pub struct Cell {
    pub backend: String,
    pub fixture: usize,
    pub outcome: Result<ComparisonResult, CellError>,
    /// The tensor the backend produced, when it produced one.
    pub actual: Option<Tensor>,
}

impl Cell {
    pub fn passed(&self) -> bool {
        matches!(&self.outcome, Ok(r) if r.passed)
    }
}

/// Every (backend, fixture) cell of a run, ordered by backend then fixture
/// in the order they were requested.
#[derive(Debug, Default)]
pub struct RunReport {
    cells: Vec<Cell>,
}

impl RunReport {
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, backend: &str, fixture: usize) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|c| c.backend == backend && c.fixture == fixture)
    }

    /// The output tensor `backend` produced for `fixture`.
    pub fn output(&self, backend: &str, fixture: usize) -> Option<&Tensor> {
        self.get(backend, fixture)?.actual.as_ref()
    }

    pub fn all_passed(&self) -> bool {
        self.cells.iter().all(Cell::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| !c.passed())
    }

    /// Compare what two backends produced for the same fixture. `None` if
    /// either cell has no output.
    pub fn cross_backend(
        &self,
        a: &str,
        b: &str,
        fixture: usize,
        tolerance: f64,
    ) -> Option<ComparisonResult> {
        Some(compare(
            self.output(a, fixture)?,
            self.output(b, fixture)?,
            tolerance,
        ))
    }
}

/// Runs golden fixtures through every requested backend.
///
/// Cells are evaluated sequentially. A backend that fails on one fixture is
/// recorded as `BackendExecutionFailed` and the run moves on to the next
/// cell.
#[derive(Debug)]
pub struct MultiBackendRunner<'r> {
    registry: &'r BackendRegistry,
}

impl<'r> MultiBackendRunner<'r> {
    pub fn new(registry: &'r BackendRegistry) -> Self {
        MultiBackendRunner { registry }
    }

    pub fn run<S: AsRef<str>>(
        &self,
        model: &ModelHandle,
        backend_ids: &[S],
        fixtures: &[FixturePair],
        tolerance: f64,
    ) -> RunReport {
        let mut cells = Vec::with_capacity(backend_ids.len() * fixtures.len());

        for id in backend_ids {
            let id = id.as_ref();
            let backend = match self.registry.create(id) {
                Ok(backend) => backend,
                Err(err) => {
                    warn!(backend = id, error = %err, "skipping unregistered backend");
                    cells.extend((0..fixtures.len()).map(|fixture| Cell {
                        backend: id.to_string(),
                        fixture,
                        outcome: Err(CellError::UnknownBackend {
                            backend: id.to_string(),
                        }),
                        actual: None,
                    }));
                    continue;
                }
            };

            for (index, pair) in fixtures.iter().enumerate() {
                let _span = info_span!("cell", backend = id, fixture = index).entered();
                cells.push(run_cell(id, backend.as_ref(), model, index, pair, tolerance));
            }
        }

        let report = RunReport { cells };
        info!(
            cells = report.len(),
            failed = report.failures().count(),
            "golden run finished"
        );
        report
    }
}

fn run_cell(
    backend_id: &str,
    backend: &dyn Backend,
    model: &ModelHandle,
    index: usize,
    pair: &FixturePair,
    tolerance: f64,
) -> Cell {
    match execute(backend, model, pair) {
        Ok(actual) => {
            let result = compare(&actual, &pair.expected_output, tolerance);
            match &result.mismatch {
                None => info!(max_abs_diff = result.max_abs_diff, "passed"),
                Some(mismatch) => warn!(%mismatch, "failed"),
            }
            Cell {
                backend: backend_id.to_string(),
                fixture: index,
                outcome: Ok(result),
                actual: Some(actual),
            }
        }
        Err(source) => {
            warn!(error = %source, "backend execution failed");
            Cell {
                backend: backend_id.to_string(),
                fixture: index,
                outcome: Err(CellError::BackendExecutionFailed {
                    backend: backend_id.to_string(),
                    fixture: index,
                    source,
                }),
                actual: None,
            }
        }
    }
}

/// One scoped session: open, feed, forward, fetch. The session is dropped
/// (and so released) on every return path.
fn execute(
    backend: &dyn Backend,
    model: &ModelHandle,
    pair: &FixturePair,
) -> fw_runtime::Result<Tensor> {
    let mut session = Session::open(backend, model)?;
    let output = session
        .feed(&pair.input_name, pair.input.clone())?
        .forward()?
        .output(&pair.output_name)?;
    session.release();
    Ok(output)
}
