//! Flat storage helpers for second- and fourth-order tensors.
//!
//! A fourth-order tensor of dimension `d` is `d⁴` contiguous reals with
//! `C_ijkl` at `((i·d + j)·d + k)·d + l`, so a fourth-order tensor acts on a
//! row-major second-order tensor as a `d² × d²` row-major matrix.

#[inline]
pub fn t2_offset(dim: usize, i: usize, j: usize) -> usize {
    i * dim + j
}

#[inline]
pub fn t4_offset(dim: usize, i: usize, j: usize, k: usize, l: usize) -> usize {
    ((i * dim + j) * dim + k) * dim + l
}

#[inline]
pub fn kronecker(i: usize, j: usize) -> f64 {
    if i == j {
        1.0
    } else {
        0.0
    }
}

/// Row-major identity of dimension `dim`.
pub fn identity_t2(dim: usize) -> Vec<f64> {
    let mut id = vec![0.0; dim * dim];
    for i in 0..dim {
        id[t2_offset(dim, i, i)] = 1.0;
    }
    id
}

/// `out_ij = C_ijkl a_kl`.
pub fn contract_t4_t2(dim: usize, c: &[f64], a: &[f64], out: &mut [f64]) {
    let d2 = dim * dim;
    for (ij, value) in out.iter_mut().enumerate().take(d2) {
        let row = &c[ij * d2..(ij + 1) * d2];
        *value = row.iter().zip(a).map(|(cij, akl)| cij * akl).sum();
    }
}

/// `out = aᵀ b` for row-major square matrices.
pub fn transpose_mul(dim: usize, a: &[f64], b: &[f64], out: &mut [f64]) {
    for i in 0..dim {
        for j in 0..dim {
            out[t2_offset(dim, i, j)] = (0..dim)
                .map(|m| a[t2_offset(dim, m, i)] * b[t2_offset(dim, m, j)])
                .sum();
        }
    }
}

/// `out = a b` for row-major square matrices.
pub fn mat_mul(dim: usize, a: &[f64], b: &[f64], out: &mut [f64]) {
    for i in 0..dim {
        for j in 0..dim {
            out[t2_offset(dim, i, j)] = (0..dim)
                .map(|m| a[t2_offset(dim, i, m)] * b[t2_offset(dim, m, j)])
                .sum();
        }
    }
}

/// Isotropic stiffness `λ δ_ij δ_kl + μ (δ_ik δ_jl + δ_il δ_jk)`.
pub fn isotropic_stiffness(dim: usize, lambda: f64, mu: f64) -> Vec<f64> {
    let mut c = vec![0.0; dim.pow(4)];
    for i in 0..dim {
        for j in 0..dim {
            for k in 0..dim {
                for l in 0..dim {
                    c[t4_offset(dim, i, j, k, l)] = lambda * kronecker(i, j) * kronecker(k, l)
                        + mu * (kronecker(i, k) * kronecker(j, l)
                            + kronecker(i, l) * kronecker(j, k));
                }
            }
        }
    }
    c
}

/// Lamé constants from Young's modulus and Poisson's ratio.
pub fn lame_from_young_poisson(young: f64, poisson: f64) -> (f64, f64) {
    let lambda = young * poisson / ((1.0 + poisson) * (1.0 - 2.0 * poisson));
    let mu = young / (2.0 * (1.0 + poisson));
    (lambda, mu)
}
