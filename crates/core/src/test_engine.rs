#![cfg(test)]

//! Direct-summation DFT engine for exercising projections without a real FFT.

use std::f64::consts::PI;

use num_complex::Complex64;

use super::communicator::Communicator;
use super::engine::{half_complex_grid_pts, EngineError, FftEngine, PlanFlags};
use super::grid::{Ccoord, GridDescriptor};

pub(crate) struct NaiveDftEngine {
    grid: GridDescriptor,
    nb_dof: usize,
    comm: Communicator,
    workspace: Vec<Complex64>,
    initialised: bool,
}

impl NaiveDftEngine {
    pub(crate) fn new(grid: GridDescriptor, nb_dof: usize) -> Self {
        Self {
            grid,
            nb_dof,
            comm: Communicator::serial(),
            workspace: Vec::new(),
            initialised: false,
        }
    }

    fn fourier_index(&self, k: Ccoord) -> usize {
        let nf = self.nb_fourier_grid_pts();
        k[0] + nf[0] * (k[1] + nf[1] * k[2])
    }

    fn check(&self, len: usize) -> Result<(), EngineError> {
        if !self.initialised {
            return Err(EngineError::NotInitialised);
        }
        if len != self.nb_real_entries() {
            return Err(EngineError::SizeMismatch {
                expected: self.nb_real_entries(),
                found: len,
            });
        }
        Ok(())
    }
}

fn phase(n: Ccoord, k: Ccoord, x: Ccoord) -> f64 {
    (0..3)
        .map(|axis| (k[axis] * x[axis]) as f64 / n[axis] as f64)
        .sum::<f64>()
        * 2.0
        * PI
}

impl FftEngine for NaiveDftEngine {
    fn initialise(&mut self, _flags: PlanFlags) -> Result<(), EngineError> {
        if self.initialised {
            return Err(EngineError::AlreadyInitialised);
        }
        self.workspace = vec![Complex64::default(); self.nb_fourier_pixels() * self.nb_dof];
        self.initialised = true;
        Ok(())
    }

    fn is_initialised(&self) -> bool {
        self.initialised
    }

    fn fft(&mut self, field: &[f64]) -> Result<&mut [Complex64], EngineError> {
        self.check(field.len())?;
        let n = self.grid.padded_domain_grid_pts();
        let nb_dof = self.nb_dof;
        let coords: Vec<Ccoord> = self.fourier_pixels().collect();
        for (kidx, k) in coords.into_iter().enumerate() {
            for comp in 0..nb_dof {
                let mut sum = Complex64::default();
                for pixel in 0..self.grid.nb_pixels() {
                    let x = self.grid.pixel_coord(pixel);
                    sum += field[pixel * nb_dof + comp] * Complex64::from_polar(1.0, -phase(n, k, x));
                }
                self.workspace[kidx * nb_dof + comp] = sum;
            }
        }
        Ok(self.workspace.as_mut_slice())
    }

    fn ifft(&mut self, field: &mut [f64]) -> Result<(), EngineError> {
        self.check(field.len())?;
        let n = self.grid.padded_domain_grid_pts();
        let nb_dof = self.nb_dof;
        for pixel in 0..self.grid.nb_pixels() {
            let x = self.grid.pixel_coord(pixel);
            for comp in 0..nb_dof {
                let mut sum = 0.0;
                for k2 in 0..n[2] {
                    for k1 in 0..n[1] {
                        for k0 in 0..n[0] {
                            let k = [k0, k1, k2];
                            let coefficient = if k0 <= n[0] / 2 {
                                self.workspace[self.fourier_index(k) * nb_dof + comp]
                            } else {
                                let mirror = [n[0] - k0, (n[1] - k1) % n[1], (n[2] - k2) % n[2]];
                                self.workspace[self.fourier_index(mirror) * nb_dof + comp].conj()
                            };
                            sum += (coefficient * Complex64::from_polar(1.0, phase(n, k, x))).re;
                        }
                    }
                }
                field[pixel * nb_dof + comp] = sum;
            }
        }
        Ok(())
    }

    fn workspace(&self) -> &[Complex64] {
        &self.workspace
    }

    fn grid(&self) -> &GridDescriptor {
        &self.grid
    }

    fn nb_dof_per_pixel(&self) -> usize {
        self.nb_dof
    }

    fn communicator(&self) -> &Communicator {
        &self.comm
    }

    fn nb_fourier_grid_pts(&self) -> Ccoord {
        half_complex_grid_pts(self.grid.padded_domain_grid_pts())
    }

    fn fourier_locations(&self) -> Ccoord {
        [0; 3]
    }
}
