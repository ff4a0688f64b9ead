//! Periodic unit cell: material layout, state fields and the projected
//! tangent operator `x ↦ G(K : x)` handed to the Krylov solver.

use parking_lot::Mutex;

use crate::adaptor::{check_sizes, MatrixAdaptable, OperatorError};
use crate::communicator::Communicator;
use crate::field::Field;
use crate::grid::GridDescriptor;
use crate::material::{evaluate_pixel, Material};
use crate::projection::{Formulation, Projection, ProjectionError};
use crate::tensor::{contract_t4_t2, identity_t2};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CellError {
    #[error("the projection must be initialised before building a cell")]
    ProjectionNotInitialised,

    #[error("a cell needs at least one material")]
    NoMaterials,

    #[error("phase map has {found} entries for {expected} local pixels")]
    PhaseMapSize { expected: usize, found: usize },

    #[error("pixel {pixel} refers to material {phase}, only {nb_materials} defined")]
    UnknownPhase {
        pixel: usize,
        phase: usize,
        nb_materials: usize,
    },

    #[error("material '{name}' is {found}D but the grid is {expected}D")]
    MaterialDimension {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("expected {expected} strain components, got {found}")]
    StrainSize { expected: usize, found: usize },

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

struct CellState {
    strain: Field,
    stress: Field,
    tangent: Field,
}

pub struct Cell {
    projection: Mutex<Box<dyn Projection + Send>>,
    materials: Vec<Box<dyn Material>>,
    phases: Vec<usize>,
    state: Mutex<CellState>,
    formulation: Formulation,
    dim: usize,
    nb_pixels: usize,
    grid: GridDescriptor,
    comm: Communicator,
}

impl Cell {
    /// `phases[p]` selects the material of local pixel `p`.
    pub fn new(
        projection: Box<dyn Projection + Send>,
        materials: Vec<Box<dyn Material>>,
        phases: Vec<usize>,
    ) -> Result<Self, CellError> {
        if !projection.is_initialised() {
            return Err(CellError::ProjectionNotInitialised);
        }
        if materials.is_empty() {
            return Err(CellError::NoMaterials);
        }
        let grid = *projection.grid();
        let dim = grid.dim();
        let nb_pixels = grid.nb_subdomain_pixels();
        if phases.len() != nb_pixels {
            return Err(CellError::PhaseMapSize {
                expected: nb_pixels,
                found: phases.len(),
            });
        }
        if let Some(pixel) = phases.iter().position(|&p| p >= materials.len()) {
            return Err(CellError::UnknownPhase {
                pixel,
                phase: phases[pixel],
                nb_materials: materials.len(),
            });
        }
        if let Some(material) = materials.iter().find(|m| m.dim() != dim) {
            return Err(CellError::MaterialDimension {
                name: material.name().to_string(),
                expected: dim,
                found: material.dim(),
            });
        }

        let formulation = projection.formulation();
        let d2 = dim * dim;
        let strain = match formulation {
            Formulation::SmallStrain => Field::zeros(nb_pixels, d2),
            Formulation::FiniteStrain => Field::uniform(nb_pixels, &identity_t2(dim)),
        };
        let comm = projection.communicator().clone();
        log::debug!(
            "cell with {} materials on {:?} ({})",
            materials.len(),
            grid.nb_domain_grid_pts(),
            formulation
        );
        Ok(Self {
            projection: Mutex::new(projection),
            materials,
            phases,
            state: Mutex::new(CellState {
                strain,
                stress: Field::zeros(nb_pixels, d2),
                tangent: Field::zeros(nb_pixels, d2 * d2),
            }),
            formulation,
            dim,
            nb_pixels,
            grid,
            comm,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn formulation(&self) -> Formulation {
        self.formulation
    }

    pub fn grid(&self) -> &GridDescriptor {
        &self.grid
    }

    pub fn nb_pixels(&self) -> usize {
        self.nb_pixels
    }

    pub fn nb_dof(&self) -> usize {
        self.nb_pixels * self.dim * self.dim
    }

    pub fn comm(&self) -> &Communicator {
        &self.comm
    }

    pub fn strain(&self) -> Field {
        self.state.lock().strain.clone()
    }

    pub fn stress(&self) -> Field {
        self.state.lock().stress.clone()
    }

    /// Evaluate stress from the current strain.
    pub fn evaluate_stress(&self) {
        let mut state = self.state.lock();
        let CellState { strain, stress, .. } = &mut *state;
        for ((phase, eps), sigma) in self.phases.iter().zip(strain.pixels()).zip(stress.pixels_mut()) {
            evaluate_pixel(&*self.materials[*phase], self.formulation, eps, sigma, None);
        }
    }

    /// Evaluate stress and tangent from the current strain.
    pub fn evaluate_stress_tangent(&self) {
        let mut state = self.state.lock();
        let CellState {
            strain,
            stress,
            tangent,
        } = &mut *state;
        for (((phase, eps), sigma), k) in self
            .phases
            .iter()
            .zip(strain.pixels())
            .zip(stress.pixels_mut())
            .zip(tangent.pixels_mut())
        {
            evaluate_pixel(&*self.materials[*phase], self.formulation, eps, sigma, Some(k));
        }
    }

    /// Add the same increment to the strain of every pixel.
    pub fn add_uniform_strain(&self, increment: &[f64]) -> Result<(), CellError> {
        let d2 = self.dim * self.dim;
        if increment.len() != d2 {
            return Err(CellError::StrainSize {
                expected: d2,
                found: increment.len(),
            });
        }
        let mut state = self.state.lock();
        for eps in state.strain.pixels_mut() {
            for (value, inc) in eps.iter_mut().zip(increment) {
                *value += inc;
            }
        }
        Ok(())
    }

    /// Add a full strain-shaped field to the strain.
    pub fn add_to_strain(&self, delta: &[f64]) -> Result<(), CellError> {
        let mut state = self.state.lock();
        if delta.len() != state.strain.len() {
            return Err(CellError::StrainSize {
                expected: state.strain.len(),
                found: delta.len(),
            });
        }
        for (value, inc) in state.strain.as_mut_slice().iter_mut().zip(delta) {
            *value += inc;
        }
        Ok(())
    }

    /// Apply the compatibility projection in place.
    pub fn project(&self, field: &mut [f64]) -> Result<(), CellError> {
        self.projection.lock().apply_projection(field)?;
        Ok(())
    }

    /// `−G P`: the equilibrium residual of the current stress.
    pub fn residual(&self) -> Result<Vec<f64>, CellError> {
        let mut rhs: Vec<f64> = self.state.lock().stress.as_slice().iter().map(|v| -v).collect();
        self.project(&mut rhs)?;
        Ok(rhs)
    }

    /// Volume average of the stress over the whole (distributed) domain.
    pub fn macroscopic_stress(&self) -> Vec<f64> {
        let local = self.state.lock().stress.local_sum();
        self.domain_average(local)
    }

    /// Volume average of the strain over the whole (distributed) domain.
    pub fn macroscopic_strain(&self) -> Vec<f64> {
        let local = self.state.lock().strain.local_sum();
        self.domain_average(local)
    }

    fn domain_average(&self, local: Vec<f64>) -> Vec<f64> {
        let nb = self.grid.nb_pixels() as f64;
        local.into_iter().map(|v| self.comm.sum(v) / nb).collect()
    }
}

impl MatrixAdaptable for Cell {
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), OperatorError> {
        check_sizes(self.nb_dof(), x, y)?;
        let d2 = self.dim * self.dim;
        {
            let state = self.state.lock();
            for ((k, xi), yi) in state
                .tangent
                .pixels()
                .zip(x.chunks_exact(d2))
                .zip(y.chunks_exact_mut(d2))
            {
                contract_t4_t2(self.dim, k, xi, yi);
            }
        }
        self.projection
            .lock()
            .apply_projection(y)
            .map_err(|err| OperatorError::Apply(err.to_string()))
    }

    fn nb_dof(&self) -> usize {
        Cell::nb_dof(self)
    }

    fn communicator(&self) -> Communicator {
        self.comm.clone()
    }
}
