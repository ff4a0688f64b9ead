//! Constitutive laws evaluated pixel by pixel.
//!
//! Materials are written for a native small-strain measure: they map a
//! symmetric strain to a stress and a fourth-order tangent `∂σ/∂ε`. The
//! finite-strain formulation reuses them as Saint-Venant–Kirchhoff-type laws
//! through [`evaluate_pixel`], which feeds the Green-Lagrange strain in and
//! pushes the second Piola-Kirchhoff stress forward to first Piola-Kirchhoff.

use crate::grid::MAX_DIM;
use crate::projection::Formulation;
use crate::tensor::{
    contract_t4_t2, identity_t2, isotropic_stiffness, kronecker, lame_from_young_poisson, mat_mul,
    t2_offset, t4_offset, transpose_mul,
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MaterialError {
    #[error("material '{name}': Young's modulus must be positive, got {young}")]
    InvalidYoung { name: String, young: f64 },

    #[error("material '{name}': Poisson's ratio must lie in (-1, 0.5), got {poisson}")]
    InvalidPoisson { name: String, poisson: f64 },

    #[error("material '{name}': stiffness needs {expected} entries, got {found}")]
    StiffnessSize {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("only 2D and 3D materials are supported, got {0}")]
    UnsupportedDimension(usize),
}

/// Pure per-point constitutive law; no coupling between pixels.
pub trait Material: Send + Sync {
    fn name(&self) -> &str;

    fn dim(&self) -> usize;

    /// `stress = σ(strain)`, both row-major `dim × dim`.
    fn evaluate_stress(&self, strain: &[f64], stress: &mut [f64]);

    /// Stress and the tangent `∂σ/∂ε` (`dim⁴`, see [`crate::tensor`]).
    fn evaluate_stress_tangent(&self, strain: &[f64], stress: &mut [f64], tangent: &mut [f64]);
}

/// Hooke's law `σ = C : ε`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearElastic {
    name: String,
    dim: usize,
    stiffness: Vec<f64>,
}

impl LinearElastic {
    /// Isotropic law from Young's modulus and Poisson's ratio (plane strain in 2D).
    pub fn isotropic(name: impl Into<String>, dim: usize, young: f64, poisson: f64) -> Result<Self, MaterialError> {
        let name = name.into();
        check_dim(dim)?;
        if !(young > 0.0) {
            return Err(MaterialError::InvalidYoung { name, young });
        }
        if !(poisson > -1.0 && poisson < 0.5) {
            return Err(MaterialError::InvalidPoisson { name, poisson });
        }
        let (lambda, mu) = lame_from_young_poisson(young, poisson);
        Ok(Self {
            name,
            dim,
            stiffness: isotropic_stiffness(dim, lambda, mu),
        })
    }

    /// Law from a full stiffness tensor in flat `C_ijkl` order.
    pub fn generic(name: impl Into<String>, dim: usize, stiffness: Vec<f64>) -> Result<Self, MaterialError> {
        let name = name.into();
        check_dim(dim)?;
        let expected = dim.pow(4);
        if stiffness.len() != expected {
            return Err(MaterialError::StiffnessSize {
                name,
                expected,
                found: stiffness.len(),
            });
        }
        Ok(Self { name, dim, stiffness })
    }

    pub fn stiffness(&self) -> &[f64] {
        &self.stiffness
    }
}

fn check_dim(dim: usize) -> Result<(), MaterialError> {
    if dim == 2 || dim == 3 {
        Ok(())
    } else {
        Err(MaterialError::UnsupportedDimension(dim))
    }
}

impl Material for LinearElastic {
    fn name(&self) -> &str {
        &self.name
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn evaluate_stress(&self, strain: &[f64], stress: &mut [f64]) {
        contract_t4_t2(self.dim, &self.stiffness, strain, stress);
    }

    fn evaluate_stress_tangent(&self, strain: &[f64], stress: &mut [f64], tangent: &mut [f64]) {
        contract_t4_t2(self.dim, &self.stiffness, strain, stress);
        tangent.copy_from_slice(&self.stiffness);
    }
}

/// Evaluate `material` at one pixel in the given formulation.
///
/// For finite strain `strain` is the deformation gradient `F` and `stress`
/// receives `P = F S(E)` with `E = ½(FᵀF − I)`; `tangent` receives
/// `∂P/∂F = δ_ik S_lj + F_im C_mjpl F_kp`.
pub fn evaluate_pixel(
    material: &dyn Material,
    formulation: Formulation,
    strain: &[f64],
    stress: &mut [f64],
    tangent: Option<&mut [f64]>,
) {
    let dim = material.dim();
    match formulation {
        Formulation::SmallStrain => match tangent {
            Some(tangent) => material.evaluate_stress_tangent(strain, stress, tangent),
            None => material.evaluate_stress(strain, stress),
        },
        Formulation::FiniteStrain => {
            let d2 = dim * dim;
            let mut green = [0.0; MAX_DIM * MAX_DIM];
            let mut pk2 = [0.0; MAX_DIM * MAX_DIM];
            transpose_mul(dim, strain, strain, &mut green[..d2]);
            for (e, id) in green.iter_mut().zip(identity_t2(dim)) {
                *e = 0.5 * (*e - id);
            }

            match tangent {
                None => {
                    material.evaluate_stress(&green[..d2], &mut pk2[..d2]);
                    mat_mul(dim, strain, &pk2[..d2], stress);
                }
                Some(tangent) => {
                    let mut c = [0.0; MAX_DIM * MAX_DIM * MAX_DIM * MAX_DIM];
                    material.evaluate_stress_tangent(&green[..d2], &mut pk2[..d2], &mut c[..d2 * d2]);
                    mat_mul(dim, strain, &pk2[..d2], stress);
                    push_forward_tangent(dim, strain, &pk2[..d2], &c[..d2 * d2], tangent);
                }
            }
        }
    }
}

fn push_forward_tangent(dim: usize, f: &[f64], s: &[f64], c: &[f64], k: &mut [f64]) {
    for i in 0..dim {
        for j in 0..dim {
            for kk in 0..dim {
                for l in 0..dim {
                    let mut value = kronecker(i, kk) * s[t2_offset(dim, l, j)];
                    for m in 0..dim {
                        for p in 0..dim {
                            value += f[t2_offset(dim, i, m)]
                                * c[t4_offset(dim, m, j, p, l)]
                                * f[t2_offset(dim, kk, p)];
                        }
                    }
                    k[t4_offset(dim, i, j, kk, l)] = value;
                }
            }
        }
    }
}
