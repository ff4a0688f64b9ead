#![cfg(test)]

use super::adaptor::{DenseMatrix, Identity, Jacobi, MatrixAdaptable, OperatorError};
use super::communicator::Communicator;

#[test]
fn identity_copies_its_input() {
    let identity = Identity::new(3);
    let mut y = [0.0; 3];
    identity.apply(&[1.0, -2.0, 3.5], &mut y).unwrap();
    assert_eq!(y, [1.0, -2.0, 3.5]);
    assert_eq!(identity.nb_dof(), 3);
    assert_eq!(identity.communicator().size(), 1);
}

#[test]
fn dense_matrix_multiplies_row_major() {
    let matrix = DenseMatrix::new(2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    let mut y = [0.0; 2];
    matrix.apply(&[1.0, 1.0], &mut y).unwrap();
    assert_eq!(y, [3.0, 7.0]);
    assert_eq!(matrix.diagonal(), vec![1.0, 4.0]);
}

#[test]
fn size_mismatches_are_reported() {
    assert_eq!(
        DenseMatrix::new(2, vec![1.0; 3]).err(),
        Some(OperatorError::SizeMismatch {
            expected: 4,
            found: 3,
        })
    );
    let identity = Identity::new(3);
    let mut y = [0.0; 2];
    assert_eq!(
        identity.apply(&[1.0, 2.0, 3.0], &mut y),
        Err(OperatorError::SizeMismatch {
            expected: 3,
            found: 2,
        })
    );
}

#[test]
fn jacobi_inverts_the_diagonal() {
    let matrix = DenseMatrix::from_diagonal(&[2.0, 0.0, 4.0]);
    let jacobi = Jacobi::from_matrix(&matrix);
    let mut y = [0.0; 3];
    jacobi.apply(&[1.0, 1.0, 1.0], &mut y).unwrap();
    assert_eq!(y, [0.5, 1.0, 0.25]);

    let explicit = Jacobi::from_diagonal(&[8.0], Communicator::serial());
    let mut y = [0.0];
    explicit.apply(&[2.0], &mut y).unwrap();
    assert_eq!(y, [0.25]);
}
