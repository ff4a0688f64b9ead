//! Newton-CG driver over a sequence of macroscopic load steps.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::adaptor::{Identity, MatrixAdaptable};
use crate::cell::{Cell, CellError};
use crate::krylov::{KrylovSolverTrustRegionPCG, SolverError, Verbosity};
use crate::metrics::{MetricsEvent, MetricsRecorder};
use crate::projection::Formulation;

fn default_newton_tol() -> f64 {
    1e-6
}

fn default_equil_tol() -> f64 {
    1e-10
}

fn default_newton_maxiter() -> usize {
    20
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewtonOptions {
    /// Stop once `|δF| / |F|` drops to this value.
    #[serde(default = "default_newton_tol")]
    pub newton_tol: f64,
    /// Stop once the projected stress `|G P|` drops below this absolute value.
    #[serde(default = "default_equil_tol")]
    pub equil_tol: f64,
    #[serde(default = "default_newton_maxiter")]
    pub maxiter: usize,
    #[serde(default)]
    pub verbosity: Verbosity,
}

impl Default for NewtonOptions {
    fn default() -> Self {
        Self {
            newton_tol: default_newton_tol(),
            equil_tol: default_equil_tol(),
            maxiter: default_newton_maxiter(),
            verbosity: Verbosity::default(),
        }
    }
}

/// Converged state of one load step.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizeResult {
    /// Strain (small strain) or deformation gradient (finite strain) field.
    pub grad: Vec<f64>,
    /// Cauchy (small strain) or first Piola-Kirchhoff (finite strain) stress field.
    pub stress: Vec<f64>,
    pub success: bool,
    pub status: i32,
    pub message: String,
    pub nb_it: usize,
    pub nb_fev: usize,
    pub cg_iterations: usize,
    pub formulation: Formulation,
}

#[derive(Debug, thiserror::Error)]
pub enum NewtonError {
    #[error("load step {step}: Newton-CG did not converge in {iterations} iterations (|G P| = {residual:.3e}, |δF|/|F| = {increment_ratio:.3e})")]
    NotConverged {
        step: usize,
        iterations: usize,
        residual: f64,
        increment_ratio: f64,
    },

    #[error("load step {step}: {source}")]
    Solver {
        step: usize,
        #[source]
        source: SolverError,
    },

    #[error(transparent)]
    Cell(#[from] CellError),
}

/// Apply each load step to `cell` and iterate Newton-CG to equilibrium.
///
/// Each entry of `load_steps` is a macroscopic strain increment
/// (`dim × dim`, row-major) added uniformly before iterating. When `solver`
/// has no preconditioner, the identity is used.
pub fn newton_cg(
    cell: &Arc<Cell>,
    load_steps: &[Vec<f64>],
    solver: &mut KrylovSolverTrustRegionPCG,
    options: &NewtonOptions,
    metrics: Option<&MetricsRecorder>,
) -> Result<Vec<OptimizeResult>, NewtonError> {
    let pipeline_start = Instant::now();
    let comm = cell.comm().clone();
    let verbose = options.verbosity > Verbosity::Silent && comm.rank() == 0;

    let matrix: Arc<dyn MatrixAdaptable> = cell.clone();
    solver.set_matrix(&matrix);
    if !solver.has_preconditioner() {
        solver.set_preconditioner(Arc::new(Identity::with_communicator(
            cell.nb_dof(),
            comm.clone(),
        )));
    }

    if verbose {
        eprintln!(
            "[setup] solver={} formulation={} dof={} load_steps={} newton_tol={:.1e} equil_tol={:.1e} cg_tol={:.1e}",
            solver.get_name(),
            cell.formulation(),
            cell.nb_dof(),
            load_steps.len(),
            options.newton_tol,
            options.equil_tol,
            solver.config().tol
        );
    }

    if let Some(recorder) = metrics {
        recorder.emit(MetricsEvent::PipelineStart {
            solver: solver.get_name(),
            formulation: cell.formulation(),
            grid: cell.grid().nb_domain_grid_pts(),
            load_steps: load_steps.len(),
            newton_tol: options.newton_tol,
            equil_tol: options.equil_tol,
            cg_tol: solver.config().tol,
            maxiter: options.maxiter,
        });
    }

    let mut results = Vec::with_capacity(load_steps.len());
    let mut total_newton = 0usize;
    let mut total_cg = 0usize;

    for (step, increment) in load_steps.iter().enumerate() {
        let step_start = Instant::now();
        cell.add_uniform_strain(increment)?;

        let mut nb_it = 0usize;
        let mut nb_fev = 0usize;
        let mut cg_iterations = 0usize;
        let mut increment_ratio = f64::INFINITY;
        let message;

        loop {
            let iteration_start = Instant::now();
            cell.evaluate_stress_tangent();
            nb_fev += 1;
            let rhs = cell.residual()?;
            let residual = comm.squared_norm(&rhs).sqrt();

            if residual < options.equil_tol {
                message = "residual tolerance reached";
                break;
            }
            if nb_it >= options.maxiter {
                return Err(NewtonError::NotConverged {
                    step,
                    iterations: nb_it,
                    residual,
                    increment_ratio,
                });
            }

            let delta = solver
                .solve(&rhs)
                .map_err(|source| NewtonError::Solver { step, source })?;
            cg_iterations += solver.last_iterations();
            if solver.is_on_bound() {
                log::warn!(
                    "load step {step}: CG stopped on the trust-region bound ({:?})",
                    solver.convergence()
                );
            }
            cell.add_to_strain(&delta)?;
            nb_it += 1;

            let strain_norm = comm.squared_norm(cell.strain().as_slice()).sqrt();
            let delta_norm = comm.squared_norm(&delta).sqrt();
            increment_ratio = if strain_norm > 0.0 {
                delta_norm / strain_norm
            } else {
                delta_norm
            };

            if verbose {
                eprintln!(
                    "[newton] step {:03} it {:02}: |GP|={:.6e} |dF|/|F|={:.6e} cg_its={} ({:?})",
                    step,
                    nb_it,
                    residual,
                    increment_ratio,
                    solver.last_iterations(),
                    solver.convergence()
                );
            }
            if let Some(recorder) = metrics {
                recorder.emit(MetricsEvent::NewtonIteration {
                    step,
                    iteration: nb_it,
                    residual_norm: residual,
                    increment_ratio,
                    cg_iterations: solver.last_iterations(),
                    cg_convergence: solver.convergence(),
                    duration_ms: iteration_start.elapsed().as_secs_f64() * 1000.0,
                });
            }

            if increment_ratio <= options.newton_tol {
                cell.evaluate_stress();
                nb_fev += 1;
                message = "newton tolerance reached";
                break;
            }
        }

        total_newton += nb_it;
        total_cg += cg_iterations;
        if verbose {
            eprintln!(
                "[step] {:03} converged after {} Newton / {} CG iterations ({}) in {:.2?}",
                step,
                nb_it,
                cg_iterations,
                message,
                step_start.elapsed()
            );
        }
        if let Some(recorder) = metrics {
            recorder.emit(MetricsEvent::LoadStepDone {
                step,
                newton_iterations: nb_it,
                cg_iterations,
                success: true,
                duration_ms: step_start.elapsed().as_secs_f64() * 1000.0,
            });
        }
        results.push(OptimizeResult {
            grad: cell.strain().into(),
            stress: cell.stress().into(),
            success: true,
            status: 0,
            message: message.to_string(),
            nb_it,
            nb_fev,
            cg_iterations,
            formulation: cell.formulation(),
        });
    }

    if verbose {
        eprintln!(
            "[done] {} load steps in {:.2?} (newton_its={} cg_its={})",
            load_steps.len(),
            pipeline_start.elapsed(),
            total_newton,
            total_cg
        );
    }
    if let Some(recorder) = metrics {
        recorder.emit(MetricsEvent::PipelineDone {
            load_steps: load_steps.len(),
            total_newton_iterations: total_newton,
            total_cg_iterations: total_cg,
            duration_ms: pipeline_start.elapsed().as_secs_f64() * 1000.0,
        });
    }
    Ok(results)
}
