//! Fourier-space projection operators enforcing strain compatibility.
//!
//! A projection maps an arbitrary second-order tensor field onto the space of
//! compatible fields (gradients of a periodic displacement for finite strain,
//! symmetric gradients for small strain). It is applied as
//! `f ← F⁻¹ · Ĝ(ξ) · F f`, with the zero frequency mapped to zero because the
//! cell average is controlled by the macroscopic load, not by the projection.
//!
//! # Available Projections
//!
//! - [`ProjectionDefault`]: stores the full fourth-order operator `Ĝ` per
//!   Fourier point. Works for both formulations.
//! - [`ProjectionFiniteStrainFast`]: stores only the unit wave vector and
//!   applies the rank-1 contraction `f ← (f·ξ) ⊗ ξ`. Finite strain on odd
//!   grids only.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::communicator::Communicator;
use crate::engine::{EngineError, PlanFlags};
use crate::fft_utils::FrequencyGrid;
use crate::grid::{Ccoord, GridDescriptor, MAX_DIM};

pub mod default;
pub mod fast;

pub use default::ProjectionDefault;
pub use fast::ProjectionFiniteStrainFast;

/// Strain measure of the mechanics problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formulation {
    SmallStrain,
    FiniteStrain,
}

impl std::fmt::Display for Formulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Formulation::SmallStrain => write!(f, "small strain"),
            Formulation::FiniteStrain => write!(f, "finite strain"),
        }
    }
}

/// Discrete derivative along one axis, characterised by its Fourier symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Derivative {
    /// Spectral derivative, symbol `2πi·φ`.
    #[default]
    Fourier,
    /// Two-point centred stencil `(u[x+1] − u[x−1]) / 2`, symbol `i·sin(2πφ)`.
    CentralDifference,
}

impl Derivative {
    /// Fourier symbol for a phase `φ` given in cycles per grid interval.
    pub fn fourier(self, phase: f64) -> Complex64 {
        let two_pi = 2.0 * std::f64::consts::PI;
        match self {
            Derivative::Fourier => Complex64::new(0.0, two_pi * phase),
            Derivative::CentralDifference => Complex64::new(0.0, (two_pi * phase).sin()),
        }
    }
}

/// One derivative per spatial axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gradient {
    derivatives: Vec<Derivative>,
}

impl Gradient {
    pub fn new(derivatives: Vec<Derivative>) -> Self {
        Self { derivatives }
    }

    pub fn uniform(derivative: Derivative, dim: usize) -> Self {
        Self::new(vec![derivative; dim])
    }

    pub fn fourier(dim: usize) -> Self {
        Self::uniform(Derivative::Fourier, dim)
    }

    pub fn dim(&self) -> usize {
        self.derivatives.len()
    }

    pub fn derivatives(&self) -> &[Derivative] {
        &self.derivatives
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProjectionError {
    #[error("projection is already initialised")]
    AlreadyInitialised,

    #[error("projection used before initialise()")]
    NotInitialised,

    #[error("only an odd number of grid points in each direction is supported (axis {axis} has {nb})")]
    EvenGrid { axis: usize, nb: usize },

    #[error("{projection} does not support the {formulation} formulation")]
    UnsupportedFormulation {
        projection: &'static str,
        formulation: Formulation,
    },

    #[error("engine carries {found} components per pixel, expected {expected}")]
    ComponentMismatch { expected: usize, found: usize },

    #[error("gradient has {found} derivatives for a {dim}D grid")]
    GradientMismatch { dim: usize, found: usize },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub trait Projection {
    /// Plan the transform and precompute the Fourier-space operator.
    fn initialise(&mut self, flags: PlanFlags) -> Result<(), ProjectionError>;

    fn is_initialised(&self) -> bool;

    /// Project `field` in place.
    fn apply_projection(&mut self, field: &mut [f64]) -> Result<(), ProjectionError>;

    fn formulation(&self) -> Formulation;

    fn grid(&self) -> &GridDescriptor;

    fn communicator(&self) -> &Communicator;

    /// Precomputed per-Fourier-point operator table.
    fn operator(&self) -> &[f64];

    fn strain_shape(&self) -> [usize; 2] {
        let dim = self.grid().dim();
        [dim, dim]
    }

    /// Local degrees of freedom of a projected field.
    fn nb_dof(&self) -> usize {
        let dim = self.grid().dim();
        self.grid().nb_subdomain_pixels() * dim * dim
    }
}

pub(crate) fn check_gradient(grid: &GridDescriptor, gradient: &Gradient) -> Result<(), ProjectionError> {
    if gradient.dim() != grid.dim() {
        return Err(ProjectionError::GradientMismatch {
            dim: grid.dim(),
            found: gradient.dim(),
        });
    }
    Ok(())
}

/// Unit direction of the discrete wave vector at a Fourier point.
///
/// Both supported derivatives have purely imaginary symbols, so the wave
/// vector is `i·v` with real `v`; this returns `v/|v|`. `None` at the origin
/// and wherever the discrete symbol vanishes.
///
/// The Nyquist component of an even axis is dropped. Its stored mirror point
/// in the half-complex layout carries the same signed frequency, so any
/// nonzero value there would break Hermitian symmetry of the projected
/// spectrum.
pub(crate) fn unit_wave_vector(
    freqs: &FrequencyGrid,
    grid: &GridDescriptor,
    gradient: &Gradient,
    coord: Ccoord,
) -> Option<[f64; MAX_DIM]> {
    if coord == [0; MAX_DIM] {
        return None;
    }
    let dim = grid.dim();
    let phase = freqs.get_phase(coord);
    let mut v = [0.0; MAX_DIM];
    for axis in 0..dim {
        if freqs.is_nyquist(axis, coord[axis]) {
            continue;
        }
        v[axis] = gradient.derivatives()[axis].fourier(phase[axis]).im / grid.grid_spacing(axis);
    }
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm <= f64::EPSILON * 1e3 {
        return None;
    }
    for value in v.iter_mut().take(dim) {
        *value /= norm;
    }
    Some(v)
}
