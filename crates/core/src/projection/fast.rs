//! Rank-1 finite-strain projection: `f ← (f·ξ̂) ⊗ ξ̂`.
//!
//! Stores `dim` reals per Fourier point instead of `dim⁴`. Restricted to odd
//! grids; on even grids the Nyquist modes of the half-complex layout do not
//! carry a well-defined real wave direction.

use num_complex::Complex64;

use crate::communicator::Communicator;
use crate::engine::{FftEngine, PlanFlags};
use crate::fft_utils::FrequencyGrid;
use crate::grid::{GridDescriptor, MAX_DIM};

use super::{check_gradient, unit_wave_vector, Formulation, Gradient, Projection, ProjectionError};

pub struct ProjectionFiniteStrainFast<E: FftEngine> {
    engine: E,
    gradient: Gradient,
    /// Unit wave vector per local Fourier point, zero at the origin.
    xis: Vec<f64>,
    initialised: bool,
}

impl<E: FftEngine> ProjectionFiniteStrainFast<E> {
    pub fn new(engine: E, gradient: Gradient) -> Result<Self, ProjectionError> {
        let grid = *engine.grid();
        check_gradient(&grid, &gradient)?;
        for (axis, &nb) in grid.nb_domain_grid_pts().iter().enumerate() {
            if nb % 2 == 0 {
                return Err(ProjectionError::EvenGrid { axis, nb });
            }
        }
        let expected = grid.dim() * grid.dim();
        if engine.nb_dof_per_pixel() != expected {
            return Err(ProjectionError::ComponentMismatch {
                expected,
                found: engine.nb_dof_per_pixel(),
            });
        }
        Ok(Self {
            engine,
            gradient,
            xis: Vec::new(),
            initialised: false,
        })
    }

    /// Same as [`new`](Self::new) but refuses anything but finite strain.
    pub fn with_formulation(
        engine: E,
        gradient: Gradient,
        formulation: Formulation,
    ) -> Result<Self, ProjectionError> {
        if formulation != Formulation::FiniteStrain {
            return Err(ProjectionError::UnsupportedFormulation {
                projection: "ProjectionFiniteStrainFast",
                formulation,
            });
        }
        Self::new(engine, gradient)
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn gradient(&self) -> &Gradient {
        &self.gradient
    }
}

impl<E: FftEngine> Projection for ProjectionFiniteStrainFast<E> {
    fn initialise(&mut self, flags: PlanFlags) -> Result<(), ProjectionError> {
        if self.initialised {
            return Err(ProjectionError::AlreadyInitialised);
        }
        self.engine.initialise(flags)?;

        let grid = *self.engine.grid();
        let dim = grid.dim();
        let freqs = FrequencyGrid::new(&grid);
        let mut xis = vec![0.0; self.engine.nb_fourier_pixels() * dim];
        for (coord, xi) in self.engine.fourier_pixels().zip(xis.chunks_exact_mut(dim)) {
            if let Some(n) = unit_wave_vector(&freqs, &grid, &self.gradient, coord) {
                xi.copy_from_slice(&n[..dim]);
            }
        }
        self.xis = xis;
        self.initialised = true;
        log::debug!(
            "fast finite strain projection ready on {:?}",
            grid.nb_domain_grid_pts()
        );
        Ok(())
    }

    fn is_initialised(&self) -> bool {
        self.initialised
    }

    fn apply_projection(&mut self, field: &mut [f64]) -> Result<(), ProjectionError> {
        if !self.initialised {
            return Err(ProjectionError::NotInitialised);
        }
        let dim = self.engine.grid().dim();
        let factor = self.engine.normalisation();
        let workspace = self.engine.fft(field)?;

        let mut fxi = [Complex64::new(0.0, 0.0); MAX_DIM];
        for (value, xi) in workspace
            .chunks_exact_mut(dim * dim)
            .zip(self.xis.chunks_exact(dim))
        {
            for (i, row) in value.chunks_exact(dim).enumerate() {
                fxi[i] = row.iter().zip(xi).map(|(f, n)| *f * *n).sum::<Complex64>() * factor;
            }
            for (i, row) in value.chunks_exact_mut(dim).enumerate() {
                for (out, n) in row.iter_mut().zip(xi) {
                    *out = fxi[i] * *n;
                }
            }
        }

        self.engine.ifft(field)?;
        Ok(())
    }

    fn formulation(&self) -> Formulation {
        Formulation::FiniteStrain
    }

    fn grid(&self) -> &GridDescriptor {
        self.engine.grid()
    }

    fn communicator(&self) -> &Communicator {
        self.engine.communicator()
    }

    fn operator(&self) -> &[f64] {
        &self.xis
    }
}
