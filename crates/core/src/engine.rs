//! Transform-engine trait for real-to-complex FFTs of tensor fields.
//!
//! Real-space fields are flat buffers over the local pixels with
//! `nb_dof_per_pixel` contiguous components per pixel (axis 0 fastest). The
//! Fourier workspace uses the half-complex layout of r2c transforms: axis 0
//! only stores the `N0/2 + 1` non-redundant frequencies, the other axes are
//! complete. Transforms are unnormalised; multiply by
//! [`FftEngine::normalisation`] once per round trip.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::communicator::Communicator;
use crate::grid::{Ccoord, GridDescriptor, MAX_DIM};

/// Planning effort requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanFlags {
    #[default]
    Estimate,
    Measure,
    Patient,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EngineError {
    #[error("double initialisation of the FFT engine")]
    AlreadyInitialised,

    #[error("FFT plan not initialised")]
    NotInitialised,

    #[error("field has {found} entries but the (sub)domain handled by the engine needs {expected}")]
    SizeMismatch { expected: usize, found: usize },

    #[error("unsupported domain decomposition: {0}")]
    UnsupportedDecomposition(String),

    #[error("engine needs at least one component per pixel")]
    NoComponents,
}

/// Number of Fourier-space points along each axis of a half-complex layout.
pub fn half_complex_grid_pts(nb_grid_pts: Ccoord) -> Ccoord {
    let mut fourier = nb_grid_pts;
    fourier[0] = nb_grid_pts[0] / 2 + 1;
    fourier
}

pub trait FftEngine {
    /// Plan the transforms. Must be called exactly once before `fft`/`ifft`.
    fn initialise(&mut self, flags: PlanFlags) -> Result<(), EngineError>;

    fn is_initialised(&self) -> bool;

    /// Forward transform of `field` into the workspace, which is returned.
    fn fft(&mut self, field: &[f64]) -> Result<&mut [Complex64], EngineError>;

    /// Inverse transform of the workspace into `field` (unnormalised).
    fn ifft(&mut self, field: &mut [f64]) -> Result<(), EngineError>;

    /// Current Fourier-space workspace.
    fn workspace(&self) -> &[Complex64];

    fn grid(&self) -> &GridDescriptor;

    fn nb_dof_per_pixel(&self) -> usize;

    fn communicator(&self) -> &Communicator;

    /// Local Fourier-space points per axis (padded to three axes).
    fn nb_fourier_grid_pts(&self) -> Ccoord;

    /// Offset of the local Fourier-space points in the global frequency grid.
    fn fourier_locations(&self) -> Ccoord;

    /// Factor turning `ifft(fft(f))` back into `f`.
    fn normalisation(&self) -> f64 {
        1.0 / self.grid().nb_pixels() as f64
    }

    fn nb_fourier_pixels(&self) -> usize {
        self.nb_fourier_grid_pts().iter().product()
    }

    /// Real-space entries of one field handled by this engine.
    fn nb_real_entries(&self) -> usize {
        self.grid().nb_subdomain_pixels() * self.nb_dof_per_pixel()
    }

    /// Global coordinates of the local Fourier points, in workspace order.
    fn fourier_pixels(&self) -> FourierPixels {
        FourierPixels::new(self.nb_fourier_grid_pts(), self.fourier_locations())
    }
}

/// Iterator over the global coordinates of a Fourier-space slab.
#[derive(Debug, Clone)]
pub struct FourierPixels {
    nb: Ccoord,
    offset: Ccoord,
    next: usize,
    total: usize,
}

impl FourierPixels {
    pub fn new(nb: Ccoord, offset: Ccoord) -> Self {
        Self {
            nb,
            offset,
            next: 0,
            total: nb.iter().product(),
        }
    }
}

impl Iterator for FourierPixels {
    type Item = Ccoord;

    fn next(&mut self) -> Option<Ccoord> {
        if self.next >= self.total {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let n = self.nb;
        let local = [index % n[0], (index / n[0]) % n[1], index / (n[0] * n[1])];
        let mut coord = [0; MAX_DIM];
        for axis in 0..MAX_DIM {
            coord[axis] = local[axis] + self.offset[axis];
        }
        Some(coord)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FourierPixels {}
