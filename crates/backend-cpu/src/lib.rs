//! Serial CPU transform engine built on rustfft.
//!
//! Multi-dimensional transforms are done axis by axis on a full complex
//! scratch buffer, one tensor component at a time. Only the half-complex
//! part of the spectrum is kept in the workspace; the inverse rebuilds the
//! redundant half from Hermitian symmetry.

use std::sync::Arc;

use fftcell_core::communicator::Communicator;
use fftcell_core::engine::{half_complex_grid_pts, EngineError, FftEngine, PlanFlags};
use fftcell_core::grid::{Ccoord, GridDescriptor};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

struct AxisPlans {
    forward: Vec<Arc<dyn Fft<f64>>>,
    inverse: Vec<Arc<dyn Fft<f64>>>,
}

pub struct CpuFftEngine {
    grid: GridDescriptor,
    nb_dof: usize,
    comm: Communicator,
    plans: Option<AxisPlans>,
    workspace: Vec<Complex64>,
    scratch: Vec<Complex64>,
    line: Vec<Complex64>,
}

impl CpuFftEngine {
    /// Engine for fields with `nb_dof` components per pixel on `grid`.
    ///
    /// The grid must not be distributed: this engine only transforms whole
    /// domains.
    pub fn new(grid: GridDescriptor, nb_dof: usize) -> Result<Self, EngineError> {
        if nb_dof == 0 {
            return Err(EngineError::NoComponents);
        }
        if grid.is_distributed() {
            return Err(EngineError::UnsupportedDecomposition(format!(
                "subdomain {:?} at {:?} of {:?}; the CPU engine is serial",
                grid.nb_subdomain_grid_pts(),
                grid.subdomain_locations(),
                grid.nb_domain_grid_pts()
            )));
        }
        Ok(Self {
            grid,
            nb_dof,
            comm: Communicator::serial(),
            plans: None,
            workspace: Vec::new(),
            scratch: Vec::new(),
            line: Vec::new(),
        })
    }

    fn check(&self, len: usize) -> Result<(), EngineError> {
        if self.plans.is_none() {
            return Err(EngineError::NotInitialised);
        }
        let expected = self.nb_real_entries();
        if len != expected {
            return Err(EngineError::SizeMismatch {
                expected,
                found: len,
            });
        }
        Ok(())
    }
}

/// In-place transform of every line of `buffer` along each planned axis.
fn transform_axes(
    buffer: &mut [Complex64],
    nb_grid_pts: Ccoord,
    plans: &[Arc<dyn Fft<f64>>],
    line: &mut Vec<Complex64>,
) {
    let total = buffer.len();
    let mut stride = 1;
    for (axis, plan) in plans.iter().enumerate() {
        let len = nb_grid_pts[axis];
        line.resize(len, Complex64::default());
        let nb_outer = total / (stride * len);
        for outer in 0..nb_outer {
            for inner in 0..stride {
                let start = inner + outer * stride * len;
                for (i, value) in line.iter_mut().enumerate() {
                    *value = buffer[start + i * stride];
                }
                plan.process(line);
                for (i, value) in line.iter().enumerate() {
                    buffer[start + i * stride] = *value;
                }
            }
        }
        stride *= len;
    }
}

impl FftEngine for CpuFftEngine {
    fn initialise(&mut self, flags: PlanFlags) -> Result<(), EngineError> {
        if self.plans.is_some() {
            return Err(EngineError::AlreadyInitialised);
        }
        let n = self.grid.padded_domain_grid_pts();
        let mut planner = FftPlanner::<f64>::new();
        let dim = self.grid.dim();
        let plans = AxisPlans {
            forward: (0..dim).map(|axis| planner.plan_fft_forward(n[axis])).collect(),
            inverse: (0..dim).map(|axis| planner.plan_fft_inverse(n[axis])).collect(),
        };
        self.workspace = vec![Complex64::default(); self.nb_fourier_pixels() * self.nb_dof];
        self.scratch = vec![Complex64::default(); self.grid.nb_pixels()];
        self.plans = Some(plans);
        log::debug!(
            "planned rustfft transforms for {:?} x {} components ({:?} requested)",
            self.grid.nb_domain_grid_pts(),
            self.nb_dof,
            flags
        );
        Ok(())
    }

    fn is_initialised(&self) -> bool {
        self.plans.is_some()
    }

    fn fft(&mut self, field: &[f64]) -> Result<&mut [Complex64], EngineError> {
        self.check(field.len())?;
        let Self {
            grid,
            nb_dof,
            plans,
            workspace,
            scratch,
            line,
            ..
        } = self;
        let plans = plans.as_ref().ok_or(EngineError::NotInitialised)?;
        let n = grid.padded_domain_grid_pts();
        let nf = half_complex_grid_pts(n);
        let nb_dof = *nb_dof;

        for comp in 0..nb_dof {
            for (value, pixel) in scratch.iter_mut().zip(field.chunks_exact(nb_dof)) {
                *value = Complex64::new(pixel[comp], 0.0);
            }
            transform_axes(scratch, n, &plans.forward, line);
            for k2 in 0..nf[2] {
                for k1 in 0..nf[1] {
                    for k0 in 0..nf[0] {
                        let kidx = k0 + nf[0] * (k1 + nf[1] * k2);
                        workspace[kidx * nb_dof + comp] = scratch[k0 + n[0] * (k1 + n[1] * k2)];
                    }
                }
            }
        }
        Ok(workspace.as_mut_slice())
    }

    fn ifft(&mut self, field: &mut [f64]) -> Result<(), EngineError> {
        self.check(field.len())?;
        let Self {
            grid,
            nb_dof,
            plans,
            workspace,
            scratch,
            line,
            ..
        } = self;
        let plans = plans.as_ref().ok_or(EngineError::NotInitialised)?;
        let n = grid.padded_domain_grid_pts();
        let nf = half_complex_grid_pts(n);
        let nb_dof = *nb_dof;

        for comp in 0..nb_dof {
            for k2 in 0..n[2] {
                for k1 in 0..n[1] {
                    for k0 in 0..n[0] {
                        let value = if k0 < nf[0] {
                            workspace[(k0 + nf[0] * (k1 + nf[1] * k2)) * nb_dof + comp]
                        } else {
                            let m0 = n[0] - k0;
                            let m1 = (n[1] - k1) % n[1];
                            let m2 = (n[2] - k2) % n[2];
                            workspace[(m0 + nf[0] * (m1 + nf[1] * m2)) * nb_dof + comp].conj()
                        };
                        scratch[k0 + n[0] * (k1 + n[1] * k2)] = value;
                    }
                }
            }
            transform_axes(scratch, n, &plans.inverse, line);
            for (pixel, value) in field.chunks_exact_mut(nb_dof).zip(scratch.iter()) {
                pixel[comp] = value.re;
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
