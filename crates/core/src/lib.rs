//! Core numerics for FFT-based homogenisation of periodic microstructures.

pub mod adaptor;
pub mod cell;
pub mod communicator;
pub mod engine;
pub mod fft_utils;
pub mod field;
pub mod grid;
pub mod io;
pub mod krylov;
pub mod material;
pub mod metrics;
pub mod newton;
pub mod projection;
pub mod tensor;

#[cfg(test)]
mod _tests_adaptor;
#[cfg(test)]
mod _tests_cell;
#[cfg(test)]
mod _tests_communicator;
#[cfg(test)]
mod _tests_fft_utils;
#[cfg(test)]
mod _tests_grid;
#[cfg(test)]
mod _tests_material;
#[cfg(test)]
mod test_engine;
