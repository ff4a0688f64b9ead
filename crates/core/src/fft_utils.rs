//! Wave-vector bookkeeping for discrete Fourier transforms.
//!
//! Frequencies follow the usual DFT ordering: for `n` samples the first
//! `ceil(n/2)` entries are `0, 1, ...` and the remaining ones are the negative
//! frequencies `-floor(n/2), ..., -1`.

use crate::grid::{Ccoord, GridDescriptor, MAX_DIM};

/// Signed integer frequencies of an `n`-point transform in FFT order.
pub fn fft_freq_indices(n: usize) -> Vec<i64> {
    let n_signed = n as i64;
    let nb_non_negative = (n_signed + 1) / 2;
    (0..n_signed)
        .map(|i| if i < nb_non_negative { i } else { i - n_signed })
        .collect()
}

/// Frequencies in units of the sampling period (integers, as `f64`).
pub fn fft_freqs(n: usize) -> Vec<f64> {
    fft_freq_indices(n).into_iter().map(|k| k as f64).collect()
}

/// Frequencies in inverse length units for a domain of the given `length`.
pub fn fft_freqs_with_length(n: usize, length: f64) -> Vec<f64> {
    fft_freq_indices(n)
        .into_iter()
        .map(|k| k as f64 / length)
        .collect()
}

/// Per-axis frequency tables of a grid.
#[derive(Debug, Clone)]
pub struct FrequencyGrid {
    dim: usize,
    nb_grid_pts: Ccoord,
    spacing: [f64; MAX_DIM],
    indices: Vec<Vec<i64>>,
}

impl FrequencyGrid {
    pub fn new(grid: &GridDescriptor) -> Self {
        let dim = grid.dim();
        let nb_grid_pts = grid.padded_domain_grid_pts();
        let mut spacing = [1.0; MAX_DIM];
        for (axis, h) in spacing.iter_mut().enumerate().take(dim) {
            *h = grid.grid_spacing(axis);
        }
        let indices = (0..dim).map(|axis| fft_freq_indices(nb_grid_pts[axis])).collect();
        Self {
            dim,
            nb_grid_pts,
            spacing,
            indices,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Signed frequency table of one axis.
    pub fn frequency_indices(&self, axis: usize) -> &[i64] {
        &self.indices[axis]
    }

    /// Whether `index` along `axis` is the Nyquist frequency of an even axis.
    /// That frequency is its own negative, so its sign is arbitrary.
    pub fn is_nyquist(&self, axis: usize, index: usize) -> bool {
        let n = self.nb_grid_pts[axis];
        n % 2 == 0 && index == n / 2
    }

    /// Integer wave vector of a (global) grid coordinate.
    pub fn get_xi(&self, coord: Ccoord) -> [f64; MAX_DIM] {
        let mut xi = [0.0; MAX_DIM];
        for axis in 0..self.dim {
            xi[axis] = self.indices[axis][coord[axis]] as f64;
        }
        xi
    }

    /// Wave vector in cycles per sampling interval (`k / N` per axis).
    pub fn get_phase(&self, coord: Ccoord) -> [f64; MAX_DIM] {
        let mut phase = self.get_xi(coord);
        for axis in 0..self.dim {
            phase[axis] /= self.nb_grid_pts[axis] as f64;
        }
        phase
    }

    /// Wave vector in inverse physical length units (`k / (N h)`).
    pub fn get_physical_xi(&self, coord: Ccoord) -> [f64; MAX_DIM] {
        let mut xi = self.get_phase(coord);
        for axis in 0..self.dim {
            xi[axis] /= self.spacing[axis];
        }
        xi
    }

    /// Unit direction of the wave vector. The origin yields NaNs; callers
    /// special-case the zero frequency.
    pub fn get_unit_xi(&self, coord: Ccoord) -> [f64; MAX_DIM] {
        let mut xi = self.get_xi(coord);
        let norm = xi.iter().map(|v| v * v).sum::<f64>().sqrt();
        for value in xi.iter_mut().take(self.dim) {
            *value /= norm;
        }
        xi
    }
}
