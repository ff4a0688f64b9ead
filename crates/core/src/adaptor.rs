//! Linear operators as seen by the Krylov solver.
//!
//! Anything implementing [`MatrixAdaptable`] can serve as the system matrix
//! or as the preconditioner: the solver only ever asks for `y = A x`, the
//! local problem size and the communicator to reduce over.

use crate::communicator::Communicator;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum OperatorError {
    #[error("operator expects {expected} local entries, got {found}")]
    SizeMismatch { expected: usize, found: usize },

    #[error("operator application failed: {0}")]
    Apply(String),
}

pub trait MatrixAdaptable {
    /// `y = A x` on the local slice of a distributed vector.
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), OperatorError>;

    /// Local degrees of freedom.
    fn nb_dof(&self) -> usize;

    fn communicator(&self) -> Communicator;
}

pub(crate) fn check_sizes(nb_dof: usize, x: &[f64], y: &[f64]) -> Result<(), OperatorError> {
    for found in [x.len(), y.len()] {
        if found != nb_dof {
            return Err(OperatorError::SizeMismatch {
                expected: nb_dof,
                found,
            });
        }
    }
    Ok(())
}

/// `y = x`; the unpreconditioned choice.
#[derive(Debug, Clone)]
pub struct Identity {
    nb_dof: usize,
    comm: Communicator,
}

impl Identity {
    pub fn new(nb_dof: usize) -> Self {
        Self::with_communicator(nb_dof, Communicator::serial())
    }

    pub fn with_communicator(nb_dof: usize, comm: Communicator) -> Self {
        Self { nb_dof, comm }
    }
}

impl MatrixAdaptable for Identity {
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), OperatorError> {
        check_sizes(self.nb_dof, x, y)?;
        y.copy_from_slice(x);
        Ok(())
    }

    fn nb_dof(&self) -> usize {
        self.nb_dof
    }

    fn communicator(&self) -> Communicator {
        self.comm.clone()
    }
}

/// Dense local block stored row-major.
///
/// With a distributed communicator each rank owns a block-diagonal part of
/// the global matrix; there is no off-rank coupling.
#[derive(Debug, Clone)]
pub struct DenseMatrix {
    nb_dof: usize,
    entries: Vec<f64>,
    comm: Communicator,
}

impl DenseMatrix {
    pub fn new(nb_dof: usize, entries: Vec<f64>) -> Result<Self, OperatorError> {
        Self::with_communicator(nb_dof, entries, Communicator::serial())
    }

    pub fn with_communicator(
        nb_dof: usize,
        entries: Vec<f64>,
        comm: Communicator,
    ) -> Result<Self, OperatorError> {
        if entries.len() != nb_dof * nb_dof {
            return Err(OperatorError::SizeMismatch {
                expected: nb_dof * nb_dof,
                found: entries.len(),
            });
        }
        Ok(Self {
            nb_dof,
            entries,
            comm,
        })
    }

    pub fn identity(nb_dof: usize) -> Self {
        Self::from_diagonal(&vec![1.0; nb_dof])
    }

    pub fn from_diagonal(diagonal: &[f64]) -> Self {
        Self::from_diagonal_with_communicator(diagonal, Communicator::serial())
    }

    pub fn from_diagonal_with_communicator(diagonal: &[f64], comm: Communicator) -> Self {
        let n = diagonal.len();
        let mut entries = vec![0.0; n * n];
        for (i, d) in diagonal.iter().enumerate() {
            entries[i * n + i] = *d;
        }
        Self {
            nb_dof: n,
            entries,
            comm,
        }
    }

    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.nb_dof)
            .map(|i| self.entries[i * self.nb_dof + i])
            .collect()
    }
}

impl MatrixAdaptable for DenseMatrix {
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), OperatorError> {
        check_sizes(self.nb_dof, x, y)?;
        for (row, out) in self.entries.chunks_exact(self.nb_dof).zip(y.iter_mut()) {
            *out = row.iter().zip(x).map(|(a, b)| a * b).sum();
        }
        Ok(())
    }

    fn nb_dof(&self) -> usize {
        self.nb_dof
    }

    fn communicator(&self) -> Communicator {
        self.comm.clone()
    }
}

/// Diagonal preconditioner `y_i = x_i / d_i`.
#[derive(Debug, Clone)]
pub struct Jacobi {
    inv_diagonal: Vec<f64>,
    comm: Communicator,
}

impl Jacobi {
    /// Entries with a zero diagonal are passed through unscaled.
    pub fn from_diagonal(diagonal: &[f64], comm: Communicator) -> Self {
        let inv_diagonal = diagonal
            .iter()
            .map(|d| if *d != 0.0 { 1.0 / d } else { 1.0 })
            .collect();
        Self { inv_diagonal, comm }
    }

    pub fn from_matrix(matrix: &DenseMatrix) -> Self {
        Self::from_diagonal(&matrix.diagonal(), matrix.comm.clone())
    }
}

impl MatrixAdaptable for Jacobi {
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), OperatorError> {
        check_sizes(self.inv_diagonal.len(), x, y)?;
        for ((out, value), scale) in y.iter_mut().zip(x).zip(&self.inv_diagonal) {
            *out = value * scale;
        }
        Ok(())
    }

    fn nb_dof(&self) -> usize {
        self.inv_diagonal.len()
    }

    fn communicator(&self) -> Communicator {
        self.comm.clone()
    }
}
