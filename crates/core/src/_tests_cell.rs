#![cfg(test)]

use std::sync::Arc;

use super::adaptor::{MatrixAdaptable, OperatorError};
use super::cell::{Cell, CellError};
use super::engine::PlanFlags;
use super::grid::GridDescriptor;
use super::material::{LinearElastic, Material};
use super::projection::{Formulation, Gradient, Projection, ProjectionDefault};
use super::test_engine::NaiveDftEngine;

fn projection(nb_grid_pts: &[usize], formulation: Formulation, initialise: bool) -> Box<dyn Projection + Send> {
    let grid = GridDescriptor::unit(nb_grid_pts).unwrap();
    let dim = grid.dim();
    let mut projection = ProjectionDefault::new(
        NaiveDftEngine::new(grid, dim * dim),
        Gradient::fourier(dim),
        formulation,
    )
    .unwrap();
    if initialise {
        projection.initialise(PlanFlags::Estimate).unwrap();
    }
    Box::new(projection)
}

fn elastic(name: &str, dim: usize, young: f64) -> Box<dyn Material> {
    Box::new(LinearElastic::isotropic(name, dim, young, 0.0).unwrap())
}

#[test]
fn construction_validates_inputs() {
    let err = Cell::new(
        projection(&[3, 3], Formulation::SmallStrain, false),
        vec![elastic("a", 2, 1.0)],
        vec![0; 9],
    )
    .err();
    assert_eq!(err, Some(CellError::ProjectionNotInitialised));

    let err = Cell::new(projection(&[3, 3], Formulation::SmallStrain, true), Vec::new(), vec![0; 9]).err();
    assert_eq!(err, Some(CellError::NoMaterials));

    let err = Cell::new(
        projection(&[3, 3], Formulation::SmallStrain, true),
        vec![elastic("a", 2, 1.0)],
        vec![0; 8],
    )
    .err();
    assert_eq!(err, Some(CellError::PhaseMapSize { expected: 9, found: 8 }));

    let mut phases = vec![0; 9];
    phases[4] = 2;
    let err = Cell::new(
        projection(&[3, 3], Formulation::SmallStrain, true),
        vec![elastic("a", 2, 1.0), elastic("b", 2, 2.0)],
        phases,
    )
    .err();
    assert_eq!(
        err,
        Some(CellError::UnknownPhase {
            pixel: 4,
            phase: 2,
            nb_materials: 2,
        })
    );

    let err = Cell::new(
        projection(&[3, 3], Formulation::SmallStrain, true),
        vec![elastic("a", 3, 1.0)],
        vec![0; 9],
    )
    .err();
    assert!(matches!(err, Some(CellError::MaterialDimension { expected: 2, found: 3, .. })));
}

#[test]
fn initial_strain_depends_on_formulation() {
    let small = Cell::new(
        projection(&[3, 3], Formulation::SmallStrain, true),
        vec![elastic("a", 2, 1.0)],
        vec![0; 9],
    )
    .unwrap();
    assert!(small.strain().as_slice().iter().all(|v| *v == 0.0));

    let finite = Cell::new(
        projection(&[3, 3], Formulation::FiniteStrain, true),
        vec![elastic("a", 2, 1.0)],
        vec![0; 9],
    )
    .unwrap();
    assert_eq!(finite.macroscopic_strain(), vec![1.0, 0.0, 0.0, 1.0]);
    assert_eq!(finite.formulation(), Formulation::FiniteStrain);
    assert_eq!(finite.nb_dof(), 36);
}

#[test]
fn homogeneous_cell_is_in_equilibrium() {
    let cell = Cell::new(
        projection(&[3, 5], Formulation::SmallStrain, true),
        vec![elastic("a", 2, 4.0)],
        vec![0; 15],
    )
    .unwrap();
    cell.add_uniform_strain(&[0.01, 0.0, 0.0, -0.02]).unwrap();
    cell.evaluate_stress_tangent();
    let stress = cell.macroscopic_stress();
    assert!((stress[0] - 0.04).abs() < 1e-15);
    assert!((stress[3] + 0.08).abs() < 1e-15);

    let residual = cell.residual().unwrap();
    assert!(residual.iter().all(|v| v.abs() < 1e-14));
}

#[test]
fn strain_updates_check_their_sizes() {
    let cell = Cell::new(
        projection(&[3, 3], Formulation::SmallStrain, true),
        vec![elastic("a", 2, 1.0)],
        vec![0; 9],
    )
    .unwrap();
    assert_eq!(
        cell.add_uniform_strain(&[0.0; 3]),
        Err(CellError::StrainSize { expected: 4, found: 3 })
    );
    assert_eq!(
        cell.add_to_strain(&[0.0; 35]),
        Err(CellError::StrainSize {
            expected: 36,
            found: 35,
        })
    );
    cell.add_to_strain(&[0.5; 36]).unwrap();
    assert_eq!(cell.macroscopic_strain(), vec![0.5; 4]);
}

#[test]
fn cell_applies_projected_tangent() {
    let mut phases = vec![0; 15];
    phases[..5].fill(1);
    let cell = Arc::new(
        Cell::new(
            projection(&[5, 3], Formulation::SmallStrain, true),
            vec![elastic("soft", 2, 1.0), elastic("hard", 2, 5.0)],
            phases,
        )
        .unwrap(),
    );
    cell.evaluate_stress_tangent();

    let x: Vec<f64> = (0..cell.nb_dof()).map(|i| ((i * 7 % 11) as f64) * 0.1).collect();
    let mut y = vec![0.0; cell.nb_dof()];
    cell.apply(&x, &mut y).unwrap();

    // the output already lies in the range of the projection
    let mut projected = y.clone();
    cell.project(&mut projected).unwrap();
    for (a, b) in projected.iter().zip(&y) {
        assert!((a - b).abs() < 1e-10);
    }

    let matrix: Arc<dyn MatrixAdaptable> = cell.clone();
    assert_eq!(matrix.nb_dof(), 60);
    let mut short = vec![0.0; 10];
    assert_eq!(
        matrix.apply(&x, &mut short),
        Err(OperatorError::SizeMismatch {
            expected: 60,
            found: 10,
        })
    );
}
