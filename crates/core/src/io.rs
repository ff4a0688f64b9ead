//! Homogenisation job configuration (TOML).
//!
//! # File Format
//!
//! ```toml
//! load_steps = [[0.01, 0.0, 0.0, 0.0]]
//!
//! [grid]
//! nb_grid_pts = [5, 3]
//! lengths = [1.0, 1.0]
//!
//! [projection]
//! formulation = "small_strain"
//! kind = "default"
//! derivative = "fourier"
//!
//! [[materials]]
//! type = "linear_elastic"
//! name = "soft"
//! young = 1.0
//! poisson = 0.0
//!
//! [[materials]]
//! type = "linear_elastic"
//! name = "hard"
//! young = 3.0
//! poisson = 0.0
//!
//! [layout]
//! type = "laminate"
//! axis = 0
//! split = 2
//! materials = [0, 1]
//!
//! [solver]
//! tol = 1e-8
//! maxiter = 200
//! trust_region = 10.0
//!
//! [newton]
//! newton_tol = 1e-6
//! equil_tol = 1e-10
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    engine::PlanFlags,
    grid::{GridDescriptor, GridError, MAX_DIM},
    krylov::{KrylovConfig, SolverError},
    material::{LinearElastic, Material, MaterialError},
    metrics::MetricsConfig,
    newton::NewtonOptions,
    projection::{Derivative, Formulation, Gradient},
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Material(#[from] MaterialError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub nb_grid_pts: Vec<usize>,
    /// Physical lengths; unit lengths when omitted.
    #[serde(default)]
    pub lengths: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionKind {
    #[default]
    Default,
    Fast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    pub formulation: Formulation,
    #[serde(default)]
    pub kind: ProjectionKind,
    #[serde(default)]
    pub derivative: Derivative,
    #[serde(default)]
    pub plan: PlanFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaterialConfig {
    LinearElastic {
        name: String,
        young: f64,
        poisson: f64,
    },
    /// Full stiffness tensor, `dim⁴` entries in `C_ijkl` order.
    Generic { name: String, stiffness: Vec<f64> },
}

/// Assignment of materials to pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutConfig {
    /// One material everywhere.
    Uniform {
        #[serde(default)]
        material: usize,
    },
    /// Two layers normal to `axis`: pixels with coordinate `< split` get
    /// `materials[0]`, the others `materials[1]`.
    Laminate {
        axis: usize,
        split: usize,
        materials: [usize; 2],
    },
    /// Spherical (circular in 2D) inclusion in a matrix; `center` and
    /// `radius` are fractions of the domain.
    Inclusion {
        center: Vec<f64>,
        radius: f64,
        matrix: usize,
        inclusion: usize,
    },
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::Uniform { material: 0 }
    }
}

// ============================================================================
// Job Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Macroscopic strain increments, row-major `dim × dim` each.
    pub load_steps: Vec<Vec<f64>>,
    pub grid: GridConfig,
    pub projection: ProjectionConfig,
    pub materials: Vec<MaterialConfig>,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub solver: KrylovConfig,
    #[serde(default)]
    pub newton: NewtonOptions,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl JobConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn dim(&self) -> usize {
        self.grid.nb_grid_pts.len()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let grid = self.build_grid()?;
        let dim = grid.dim();
        if self.load_steps.is_empty() {
            return Err(ConfigError::Invalid("at least one load step is required".into()));
        }
        if let Some((step, values)) = self
            .load_steps
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != dim * dim)
        {
            return Err(ConfigError::Invalid(format!(
                "load step {step} has {} components, expected {}",
                values.len(),
                dim * dim
            )));
        }
        if self.materials.is_empty() {
            return Err(ConfigError::Invalid("at least one material is required".into()));
        }
        self.build_materials()?;
        self.check_layout(dim)?;
        if self.projection.kind == ProjectionKind::Fast
            && self.projection.formulation != Formulation::FiniteStrain
        {
            return Err(ConfigError::Invalid(
                "the fast projection only supports the finite_strain formulation".into(),
            ));
        }
        self.solver.validate()?;
        if !(self.newton.newton_tol > 0.0) || self.newton.equil_tol < 0.0 {
            return Err(ConfigError::Invalid(
                "newton_tol must be positive and equil_tol non-negative".into(),
            ));
        }
        if self.metrics.enabled && self.metrics.output.is_none() {
            return Err(ConfigError::Invalid(
                "metrics.output must be set when metrics are enabled".into(),
            ));
        }
        Ok(())
    }

    fn check_layout(&self, dim: usize) -> Result<(), ConfigError> {
        let nb_materials = self.materials.len();
        let check = |index: usize| {
            if index < nb_materials {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!(
                    "layout refers to material {index}, only {nb_materials} defined"
                )))
            }
        };
        match &self.layout {
            LayoutConfig::Uniform { material } => check(*material),
            LayoutConfig::Laminate { axis, materials, .. } => {
                if *axis >= dim {
                    return Err(ConfigError::Invalid(format!(
                        "laminate axis {axis} out of range for a {dim}D grid"
                    )));
                }
                materials.iter().try_for_each(|m| check(*m))
            }
            LayoutConfig::Inclusion {
                center,
                radius,
                matrix,
                inclusion,
            } => {
                if center.len() != dim {
                    return Err(ConfigError::Invalid(format!(
                        "inclusion center has {} coordinates for a {dim}D grid",
                        center.len()
                    )));
                }
                if !(*radius > 0.0) {
                    return Err(ConfigError::Invalid("inclusion radius must be positive".into()));
                }
                check(*matrix)?;
                check(*inclusion)
            }
        }
    }

    pub fn build_grid(&self) -> Result<GridDescriptor, ConfigError> {
        let grid = match &self.grid.lengths {
            Some(lengths) => GridDescriptor::new(&self.grid.nb_grid_pts, lengths)?,
            None => GridDescriptor::unit(&self.grid.nb_grid_pts)?,
        };
        Ok(grid)
    }

    pub fn gradient(&self) -> Gradient {
        Gradient::uniform(self.projection.derivative, self.dim())
    }

    pub fn build_materials(&self) -> Result<Vec<Box<dyn Material>>, ConfigError> {
        let dim = self.dim();
        self.materials
            .iter()
            .map(|material| {
                let material = match material {
                    MaterialConfig::LinearElastic {
                        name,
                        young,
                        poisson,
                    } => LinearElastic::isotropic(name.clone(), dim, *young, *poisson)?,
                    MaterialConfig::Generic { name, stiffness } => {
                        LinearElastic::generic(name.clone(), dim, stiffness.clone())?
                    }
                };
                Ok(Box::new(material) as Box<dyn Material>)
            })
            .collect()
    }

    /// Material index of every local pixel of `grid`.
    pub fn phase_map(&self, grid: &GridDescriptor) -> Vec<usize> {
        (0..grid.nb_subdomain_pixels())
            .map(|index| {
                let coord = grid.global_pixel_coord(index);
                match &self.layout {
                    LayoutConfig::Uniform { material } => *material,
                    LayoutConfig::Laminate {
                        axis,
                        split,
                        materials,
                    } => {
                        if coord[*axis] < *split {
                            materials[0]
                        } else {
                            materials[1]
                        }
                    }
                    LayoutConfig::Inclusion {
                        center,
                        radius,
                        matrix,
                        inclusion,
                    } => {
                        if inside_inclusion(grid, coord, center, *radius) {
                            *inclusion
                        } else {
                            *matrix
                        }
                    }
                }
            })
            .collect()
    }
}

/// Periodic distance test at the pixel center, in fractional coordinates.
fn inside_inclusion(grid: &GridDescriptor, coord: [usize; MAX_DIM], center: &[f64], radius: f64) -> bool {
    let nb = grid.nb_domain_grid_pts();
    let mut distance2 = 0.0;
    for axis in 0..grid.dim() {
        let position = (coord[axis] as f64 + 0.5) / nb[axis] as f64;
        let mut delta = (position - center[axis]).abs();
        delta = delta.min(1.0 - delta);
        distance2 += delta * delta;
    }
    distance2 <= radius * radius
}
