//! Projection storing the full fourth-order operator per Fourier point.

use num_complex::Complex64;

use crate::communicator::Communicator;
use crate::engine::{FftEngine, PlanFlags};
use crate::fft_utils::FrequencyGrid;
use crate::grid::{GridDescriptor, MAX_DIM};
use crate::tensor::{kronecker, t4_offset};

use super::{check_gradient, unit_wave_vector, Formulation, Gradient, Projection, ProjectionError};

pub struct ProjectionDefault<E: FftEngine> {
    engine: E,
    gradient: Gradient,
    formulation: Formulation,
    /// `dim⁴` reals per local Fourier point, `G_ijkl` at `ij·dim² + kl`.
    ghat: Vec<f64>,
    initialised: bool,
}

impl<E: FftEngine> ProjectionDefault<E> {
    pub fn new(engine: E, gradient: Gradient, formulation: Formulation) -> Result<Self, ProjectionError> {
        let grid = *engine.grid();
        check_gradient(&grid, &gradient)?;
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
            formulation,
            ghat: Vec::new(),
            initialised: false,
        })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn gradient(&self) -> &Gradient {
        &self.gradient
    }

    fn fill_operator(&mut self) {
        let grid = *self.engine.grid();
        let dim = grid.dim();
        let block = dim.pow(4);
        let freqs = FrequencyGrid::new(&grid);
        let mut ghat = vec![0.0; self.engine.nb_fourier_pixels() * block];

        for (coord, g) in self.engine.fourier_pixels().zip(ghat.chunks_exact_mut(block)) {
            // zero frequency and vanishing discrete symbols keep a zero block
            let Some(n) = unit_wave_vector(&freqs, &grid, &self.gradient, coord) else {
                continue;
            };
            match self.formulation {
                Formulation::FiniteStrain => finite_strain_block(dim, &n, g),
                Formulation::SmallStrain => small_strain_block(dim, &n, g),
            }
        }
        self.ghat = ghat;
    }
}

/// `G_ijkl = δ_ik n_j n_l`.
fn finite_strain_block(dim: usize, n: &[f64; MAX_DIM], g: &mut [f64]) {
    for i in 0..dim {
        for j in 0..dim {
            for k in 0..dim {
                for l in 0..dim {
                    g[t4_offset(dim, i, j, k, l)] = kronecker(i, k) * n[j] * n[l];
                }
            }
        }
    }
}

/// Symmetrised gradient projector minus the volumetric-normal correction.
fn small_strain_block(dim: usize, n: &[f64; MAX_DIM], g: &mut [f64]) {
    for i in 0..dim {
        for j in 0..dim {
            for k in 0..dim {
                for l in 0..dim {
                    let sym = kronecker(i, k) * n[j] * n[l]
                        + kronecker(i, l) * n[j] * n[k]
                        + kronecker(j, k) * n[i] * n[l]
                        + kronecker(j, l) * n[i] * n[k];
                    g[t4_offset(dim, i, j, k, l)] = 0.5 * sym - n[i] * n[j] * n[k] * n[l];
                }
            }
        }
    }
}

impl<E: FftEngine> Projection for ProjectionDefault<E> {
    fn initialise(&mut self, flags: PlanFlags) -> Result<(), ProjectionError> {
        if self.initialised {
            return Err(ProjectionError::AlreadyInitialised);
        }
        self.engine.initialise(flags)?;
        self.fill_operator();
        self.initialised = true;
        log::debug!(
            "default {} projection ready on {:?} ({} Fourier points)",
            self.formulation,
            self.engine.grid().nb_domain_grid_pts(),
            self.engine.nb_fourier_pixels()
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
        let d2 = dim * dim;
        let factor = self.engine.normalisation();
        let workspace = self.engine.fft(field)?;

        let mut f = [Complex64::new(0.0, 0.0); MAX_DIM * MAX_DIM];
        for (value, g) in workspace
            .chunks_exact_mut(d2)
            .zip(self.ghat.chunks_exact(d2 * d2))
        {
            f[..d2].copy_from_slice(value);
            for (ij, out) in value.iter_mut().enumerate() {
                let row = &g[ij * d2..(ij + 1) * d2];
                let projected: Complex64 = row.iter().zip(&f[..d2]).map(|(gijkl, fkl)| *fkl * *gijkl).sum();
                *out = projected * factor;
            }
        }

        self.engine.ifft(field)?;
        Ok(())
    }

    fn formulation(&self) -> Formulation {
        self.formulation
    }

    fn grid(&self) -> &GridDescriptor {
        self.engine.grid()
    }

    fn communicator(&self) -> &Communicator {
        self.engine.communicator()
    }

    fn operator(&self) -> &[f64] {
        &self.ghat
    }
}
