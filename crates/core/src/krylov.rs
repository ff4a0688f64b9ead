//! Preconditioned conjugate gradient with a trust-region bound.
//!
//! Solves `A x = b` for the Newton increment (Steihaug-Toint CG, Nocedal &
//! Wright Alg. 5.3 with a preconditioner). The iteration stops early on the
//! trust-region boundary when the step leaves the region or when a direction
//! of non-positive curvature shows up; the boundary point is then chosen as
//! the better of the two intersections of the last search line with the
//! sphere, measured by the quadratic model `m(x) = −bᵀx + ½ xᵀAx`.
//!
//! Every scalar product is a global reduction over the matrix communicator,
//! and all branching happens on reduced values so that every rank takes the
//! same path through the loop. Rank-local failures (bad input sizes, operator
//! errors) are agreed on collectively before anyone leaves, so a failing rank
//! never strands its peers inside a reduction.

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};

use crate::adaptor::{MatrixAdaptable, OperatorError};
use crate::communicator::Communicator;

/// Cosine between consecutive residuals above which conjugacy counts as lost.
const ORTHOGONALITY_THRESHOLD: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    #[default]
    Silent,
    Some,
    Detailed,
    Full,
}

/// Policy for restarting the recurrence from the true residual `A x − b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetCG {
    #[default]
    NoReset,
    /// Every `nb_dof / reset_dof_divisor` iterations (global DOF count).
    FixedIterCount,
    /// Every `reset_iter_count` iterations.
    UserDefinedIterCount,
    /// When consecutive residuals stop being orthogonal.
    GradientOrthogonality,
    /// When the search direction stops being a descent direction.
    ValidDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Convergence {
    DidNotConverge,
    ReachedTolerance,
    ExceededTrustRegionBound,
    HessianNotPositiveDefinite,
}

/// Non-fatal conditions reported by the last solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverWarning {
    /// The right-hand side was exactly zero; the zero vector was returned.
    ZeroRhs,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SolverError {
    #[error("no system matrix set")]
    MatrixNotSet,

    #[error("the system matrix has been dropped; keep an Arc to it alive while solving")]
    MatrixExpired,

    #[error("no preconditioner set")]
    PreconditionerNotSet,

    #[error("preconditioner has {preconditioner} local dof, matrix has {matrix}")]
    DimensionMismatch { matrix: usize, preconditioner: usize },

    #[error("right-hand side has {found} entries, matrix has {expected} local dof")]
    RhsSize { expected: usize, found: usize },

    #[error("invalid solver configuration: {0}")]
    InvalidConfig(String),

    #[error("another rank failed during the collective solve")]
    PeerFailed,

    #[error("conjugate gradient did not converge after {iterations} steps: |r|/|b| = {residual_ratio:.3e}, cg_tol = {tol:.3e}")]
    NotConverged {
        iterations: usize,
        residual_ratio: f64,
        tol: f64,
    },

    #[error(transparent)]
    Operator(#[from] OperatorError),
}

fn default_tol() -> f64 {
    1e-8
}

fn default_maxiter() -> usize {
    1000
}

fn default_trust_region() -> f64 {
    1.0
}

fn default_reset_dof_divisor() -> usize {
    4
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KrylovConfig {
    /// Relative residual tolerance `|r| / |b|`.
    #[serde(default = "default_tol")]
    pub tol: f64,
    #[serde(default = "default_maxiter")]
    pub maxiter: usize,
    #[serde(default = "default_trust_region")]
    pub trust_region: f64,
    #[serde(default)]
    pub verbosity: Verbosity,
    #[serde(default)]
    pub reset: ResetCG,
    /// Period for [`ResetCG::UserDefinedIterCount`]; must be positive then.
    #[serde(default)]
    pub reset_iter_count: usize,
    /// Divisor of the DOF count for [`ResetCG::FixedIterCount`].
    #[serde(default = "default_reset_dof_divisor")]
    pub reset_dof_divisor: usize,
}

impl Default for KrylovConfig {
    fn default() -> Self {
        Self {
            tol: default_tol(),
            maxiter: default_maxiter(),
            trust_region: default_trust_region(),
            verbosity: Verbosity::default(),
            reset: ResetCG::default(),
            reset_iter_count: 0,
            reset_dof_divisor: default_reset_dof_divisor(),
        }
    }
}

impl KrylovConfig {
    pub fn validate(&self) -> Result<(), SolverError> {
        if !(self.tol > 0.0) {
            return Err(SolverError::InvalidConfig(format!(
                "tol must be positive, got {}",
                self.tol
            )));
        }
        if !(self.trust_region > 0.0) {
            return Err(SolverError::InvalidConfig(format!(
                "trust_region must be positive, got {}",
                self.trust_region
            )));
        }
        if self.reset == ResetCG::UserDefinedIterCount && self.reset_iter_count == 0 {
            return Err(SolverError::InvalidConfig(
                "a positive reset_iter_count is needed for user defined iteration count restarts"
                    .to_string(),
            ));
        }
        if self.reset == ResetCG::FixedIterCount && self.reset_dof_divisor == 0 {
            return Err(SolverError::InvalidConfig(
                "reset_dof_divisor must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct KrylovSolverTrustRegionPCG {
    config: KrylovConfig,
    matrix: Option<Weak<dyn MatrixAdaptable>>,
    preconditioner: Option<Arc<dyn MatrixAdaptable>>,
    comm: Communicator,
    x: Vec<f64>,
    r: Vec<f64>,
    y: Vec<f64>,
    p: Vec<f64>,
    ap: Vec<f64>,
    r_prev: Vec<f64>,
    counter: usize,
    last_iterations: usize,
    last_resets: usize,
    convergence: Convergence,
    warning: Option<SolverWarning>,
    is_on_bound: bool,
}

impl KrylovSolverTrustRegionPCG {
    pub fn new(config: KrylovConfig) -> Self {
        Self {
            config,
            matrix: None,
            preconditioner: None,
            comm: Communicator::serial(),
            x: Vec::new(),
            r: Vec::new(),
            y: Vec::new(),
            p: Vec::new(),
            ap: Vec::new(),
            r_prev: Vec::new(),
            counter: 0,
            last_iterations: 0,
            last_resets: 0,
            convergence: Convergence::DidNotConverge,
            warning: None,
            is_on_bound: false,
        }
    }

    pub fn get_name(&self) -> &'static str {
        "PCG"
    }

    pub fn config(&self) -> &KrylovConfig {
        &self.config
    }

    pub fn set_trust_region(&mut self, trust_region: f64) {
        self.config.trust_region = trust_region;
    }

    /// Observe `matrix` without owning it; internal vectors follow its size.
    pub fn set_matrix(&mut self, matrix: &Arc<dyn MatrixAdaptable>) {
        self.comm = matrix.communicator();
        self.resize(matrix.nb_dof());
        self.matrix = Some(Arc::downgrade(matrix));
    }

    pub fn set_preconditioner(&mut self, preconditioner: Arc<dyn MatrixAdaptable>) {
        self.preconditioner = Some(preconditioner);
    }

    pub fn has_preconditioner(&self) -> bool {
        self.preconditioner.is_some()
    }

    /// Total iterations over all solves.
    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn last_iterations(&self) -> usize {
        self.last_iterations
    }

    /// Restarts from the true residual during the last solve.
    pub fn last_resets(&self) -> usize {
        self.last_resets
    }

    pub fn convergence(&self) -> Convergence {
        self.convergence
    }

    pub fn warning(&self) -> Option<SolverWarning> {
        self.warning
    }

    pub fn is_on_bound(&self) -> bool {
        self.is_on_bound
    }

    fn resize(&mut self, nb_dof: usize) {
        for v in [
            &mut self.x,
            &mut self.r,
            &mut self.y,
            &mut self.p,
            &mut self.ap,
            &mut self.r_prev,
        ] {
            v.clear();
            v.resize(nb_dof, 0.0);
        }
    }

    fn matrix(&self) -> Result<Arc<dyn MatrixAdaptable>, SolverError> {
        self.matrix
            .as_ref()
            .ok_or(SolverError::MatrixNotSet)?
            .upgrade()
            .ok_or(SolverError::MatrixExpired)
    }

    fn print_enabled(&self) -> bool {
        self.config.verbosity > Verbosity::Silent && self.comm.rank() == 0
    }

    /// Check the local setup before the first reduction.
    fn prepare(
        &self,
        rhs: &[f64],
    ) -> Result<(Arc<dyn MatrixAdaptable>, Arc<dyn MatrixAdaptable>), SolverError> {
        let matrix = self.matrix()?;
        let preconditioner = self
            .preconditioner
            .clone()
            .ok_or(SolverError::PreconditionerNotSet)?;
        let nb_dof = matrix.nb_dof();
        if preconditioner.nb_dof() != nb_dof {
            return Err(SolverError::DimensionMismatch {
                matrix: nb_dof,
                preconditioner: preconditioner.nb_dof(),
            });
        }
        if rhs.len() != nb_dof {
            return Err(SolverError::RhsSize {
                expected: nb_dof,
                found: rhs.len(),
            });
        }
        self.config.validate()?;
        Ok((matrix, preconditioner))
    }

    /// Solve `A x = rhs`; returns `x` (local part).
    ///
    /// If any rank of the matrix communicator fails, every rank returns an
    /// error: the failing rank its own, the others [`SolverError::PeerFailed`].
    /// A rank that never had a matrix set has no group to notify.
    pub fn solve(&mut self, rhs: &[f64]) -> Result<Vec<f64>, SolverError> {
        let (matrix, preconditioner) = agree(&self.comm, self.prepare(rhs))?;
        let nb_dof = matrix.nb_dof();
        if self.x.len() != nb_dof {
            self.resize(nb_dof);
        }

        self.is_on_bound = false;
        self.warning = None;
        self.last_iterations = 0;
        self.last_resets = 0;
        self.convergence = Convergence::DidNotConverge;
        self.x.fill(0.0);

        let comm = self.comm.clone();
        let rhs_norm2 = comm.squared_norm(rhs);
        if rhs_norm2 == 0.0 {
            log::warn!(
                "conjugate gradient called with an exactly zero right-hand side; \
                 check the load steps or use a positive equilibrium tolerance"
            );
            self.warning = Some(SolverWarning::ZeroRhs);
            self.convergence = Convergence::ReachedTolerance;
            return Ok(self.x.clone());
        }
        if self.print_enabled() {
            eprintln!("[pcg] |b|^2={rhs_norm2:.6e} dof={nb_dof}");
        }

        let trust_region2 = self.config.trust_region * self.config.trust_region;
        let rel_tol2 = self.config.tol * self.config.tol * rhs_norm2;
        let reset_period = self.reset_period(&comm, nb_dof);

        // x₀ = 0, so r₀ = A x₀ − b = −b
        for (r, b) in self.r.iter_mut().zip(rhs) {
            *r = -b;
        }
        agree(&comm, preconditioner.apply(&self.r, &mut self.y))?;
        for (p, y) in self.p.iter_mut().zip(&self.y) {
            *p = -y;
        }
        let mut rdy = comm.dot(&self.r, &self.y);
        let mut rdr = rhs_norm2;
        let mut since_reset = 0usize;

        for iteration in 0..self.config.maxiter {
            self.counter += 1;
            self.last_iterations = iteration + 1;

            agree(&comm, matrix.apply(&self.p, &mut self.ap))?;
            let pap = comm.dot(&self.p, &self.ap);
            if pap <= 0.0 {
                if self.print_enabled() {
                    eprintln!("[pcg] stop: hessian not positive definite (pAp={pap:.3e})");
                }
                self.convergence = Convergence::HessianNotPositiveDefinite;
                self.bound(&*matrix, rhs)?;
                return Ok(self.x.clone());
            }

            let alpha = rdy / pap;
            axpy(alpha, &self.p, &mut self.x);

            if comm.squared_norm(&self.x) >= trust_region2 {
                if self.print_enabled() {
                    eprintln!("[pcg] stop: step exceeded the trust region bound");
                }
                self.convergence = Convergence::ExceededTrustRegionBound;
                self.bound(&*matrix, rhs)?;
                return Ok(self.x.clone());
            }

            let rdr_prev = rdr;
            if self.config.reset == ResetCG::GradientOrthogonality {
                self.r_prev.copy_from_slice(&self.r);
            }
            axpy(alpha, &self.ap, &mut self.r);
            rdr = comm.squared_norm(&self.r);
            if self.print_enabled() {
                eprintln!(
                    "[pcg] step {:>4}: |r|/|b|={:.6e} cg_tol={:.1e}",
                    iteration,
                    (rdr / rhs_norm2).sqrt(),
                    self.config.tol
                );
            }
            if rdr < rel_tol2 {
                self.convergence = Convergence::ReachedTolerance;
                return Ok(self.x.clone());
            }

            agree(&comm, preconditioner.apply(&self.r, &mut self.y))?;
            let mut new_rdy = comm.dot(&self.r, &self.y);
            let mut beta = new_rdy / rdy;

            since_reset += 1;
            let reset = match self.config.reset {
                ResetCG::NoReset => false,
                ResetCG::FixedIterCount | ResetCG::UserDefinedIterCount => since_reset >= reset_period,
                ResetCG::GradientOrthogonality => {
                    let cosine = comm.dot(&self.r, &self.r_prev) / (rdr * rdr_prev).sqrt();
                    cosine > ORTHOGONALITY_THRESHOLD
                }
                ResetCG::ValidDirection => comm.dot(&self.r, &self.p) > 0.0,
            };
            if reset {
                agree(&comm, matrix.apply(&self.x, &mut self.r))?;
                for (r, b) in self.r.iter_mut().zip(rhs) {
                    *r -= b;
                }
                rdr = comm.squared_norm(&self.r);
                agree(&comm, preconditioner.apply(&self.r, &mut self.y))?;
                new_rdy = comm.dot(&self.r, &self.y);
                beta = 0.0;
                since_reset = 0;
                self.last_resets += 1;
                log::debug!(
                    "CG reset ({:?}) at step {}: true |r|/|b| = {:.3e}",
                    self.config.reset,
                    iteration,
                    (rdr / rhs_norm2).sqrt()
                );
            }

            rdy = new_rdy;
            for (p, y) in self.p.iter_mut().zip(&self.y) {
                *p = -y + beta * *p;
            }
        }

        Err(SolverError::NotConverged {
            iterations: self.config.maxiter,
            residual_ratio: (rdr / rhs_norm2).sqrt(),
            tol: self.config.tol,
        })
    }

    fn reset_period(&self, comm: &Communicator, nb_dof: usize) -> usize {
        match self.config.reset {
            ResetCG::FixedIterCount => {
                let global_dof = comm.sum(nb_dof);
                (global_dof / self.config.reset_dof_divisor).max(1)
            }
            ResetCG::UserDefinedIterCount => self.config.reset_iter_count,
            _ => usize::MAX,
        }
    }

    /// Move `x` along `p` onto the trust-region sphere, picking the
    /// intersection with the lower model value.
    fn bound(&mut self, matrix: &dyn MatrixAdaptable, rhs: &[f64]) -> Result<(), SolverError> {
        self.is_on_bound = true;
        let comm = self.comm.clone();
        let trust_region2 = self.config.trust_region * self.config.trust_region;

        let pdp = comm.squared_norm(&self.p);
        if pdp == 0.0 {
            return Ok(());
        }
        let xdx = comm.squared_norm(&self.x);
        let pdx = comm.dot(&self.p, &self.x);
        let discriminant = (pdx * pdx - pdp * (xdx - trust_region2)).max(0.0).sqrt();
        let tau1 = -(pdx + discriminant) / pdp;
        let tau2 = -(pdx - discriminant) / pdp;

        axpy(tau1, &self.p, &mut self.x);
        let m1 = self.model(matrix, rhs)?;
        axpy(tau2 - tau1, &self.p, &mut self.x);
        let m2 = self.model(matrix, rhs)?;
        if m2 >= m1 {
            axpy(tau1 - tau2, &self.p, &mut self.x);
        }
        Ok(())
    }

    /// `−bᵀx + ½ xᵀAx`, using `ap` as scratch.
    fn model(&mut self, matrix: &dyn MatrixAdaptable, rhs: &[f64]) -> Result<f64, SolverError> {
        agree(&self.comm, matrix.apply(&self.x, &mut self.ap))?;
        let bx = self.comm.dot(rhs, &self.x);
        let xax = self.comm.dot(&self.x, &self.ap);
        Ok(-bx + 0.5 * xax)
    }
}

/// Collective error check: every rank fails if one does.
fn agree<T, E>(comm: &Communicator, local: Result<T, E>) -> Result<T, SolverError>
where
    SolverError: From<E>,
{
    let failed = comm.any(local.is_err());
    match local {
        Err(err) => Err(err.into()),
        Ok(_) if failed => Err(SolverError::PeerFailed),
        Ok(value) => Ok(value),
    }
}

#[inline]
fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}
