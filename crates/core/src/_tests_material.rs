#![cfg(test)]

use super::material::{evaluate_pixel, LinearElastic, Material, MaterialError};
use super::projection::Formulation;
use super::tensor::{identity_t2, isotropic_stiffness, lame_from_young_poisson, t4_offset};

#[test]
fn lame_constants_from_engineering_moduli() {
    let (lambda, mu) = lame_from_young_poisson(210.0, 0.3);
    assert!((lambda - 121.153_846_153_846_15).abs() < 1e-9);
    assert!((mu - 80.769_230_769_230_77).abs() < 1e-9);
}

#[test]
fn isotropic_law_without_poisson_effect_scales_strain() {
    let material = LinearElastic::isotropic("steel", 2, 2.0, 0.0).unwrap();
    let strain = [0.01, 0.002, 0.002, -0.03];
    let mut stress = [0.0; 4];
    material.evaluate_stress(&strain, &mut stress);
    for (sigma, eps) in stress.iter().zip(&strain) {
        assert!((sigma - 2.0 * eps).abs() < 1e-15);
    }
    assert_eq!(material.name(), "steel");
    assert_eq!(material.dim(), 2);
}

#[test]
fn tangent_of_linear_law_is_its_stiffness() {
    let material = LinearElastic::isotropic("iso", 3, 1.0, 0.25).unwrap();
    let mut stress = [0.0; 9];
    let mut tangent = vec![0.0; 81];
    material.evaluate_stress_tangent(&[0.0; 9], &mut stress, &mut tangent);
    assert_eq!(tangent, material.stiffness());
    assert!(stress.iter().all(|s| *s == 0.0));
}

#[test]
fn invalid_parameters_are_rejected() {
    assert!(matches!(
        LinearElastic::isotropic("a", 2, -1.0, 0.3),
        Err(MaterialError::InvalidYoung { .. })
    ));
    assert!(matches!(
        LinearElastic::isotropic("a", 2, 1.0, 0.5),
        Err(MaterialError::InvalidPoisson { .. })
    ));
    assert_eq!(
        LinearElastic::isotropic("a", 4, 1.0, 0.3),
        Err(MaterialError::UnsupportedDimension(4))
    );
    assert_eq!(
        LinearElastic::generic("a", 2, vec![0.0; 8]),
        Err(MaterialError::StiffnessSize {
            name: "a".to_string(),
            expected: 16,
            found: 8,
        })
    );
}

#[test]
fn finite_strain_reference_configuration_is_stress_free() {
    let material = LinearElastic::isotropic("iso", 2, 3.0, 0.2).unwrap();
    let f = identity_t2(2);
    let mut stress = [1.0; 4];
    let mut tangent = [0.0; 16];
    evaluate_pixel(&material, Formulation::FiniteStrain, &f, &mut stress, Some(&mut tangent[..]));
    assert!(stress.iter().all(|s| s.abs() < 1e-15));
    for (k, c) in tangent.iter().zip(material.stiffness()) {
        assert!((k - c).abs() < 1e-14);
    }
}

#[test]
fn finite_strain_tangent_matches_finite_differences() {
    let (lambda, mu) = lame_from_young_poisson(2.0, 0.3);
    let material = LinearElastic::generic("svk", 2, isotropic_stiffness(2, lambda, mu)).unwrap();
    let f = [1.05, 0.02, -0.01, 0.97];
    let mut stress = [0.0; 4];
    let mut tangent = [0.0; 16];
    evaluate_pixel(&material, Formulation::FiniteStrain, &f, &mut stress, Some(&mut tangent[..]));

    let h = 1e-6;
    for kl in 0..4 {
        let mut plus = f;
        let mut minus = f;
        plus[kl] += h;
        minus[kl] -= h;
        let mut p_plus = [0.0; 4];
        let mut p_minus = [0.0; 4];
        evaluate_pixel(&material, Formulation::FiniteStrain, &plus, &mut p_plus, None);
        evaluate_pixel(&material, Formulation::FiniteStrain, &minus, &mut p_minus, None);
        for ij in 0..4 {
            let numeric = (p_plus[ij] - p_minus[ij]) / (2.0 * h);
            let analytic = tangent[t4_offset(2, ij / 2, ij % 2, kl / 2, kl % 2)];
            assert!(
                (numeric - analytic).abs() < 1e-6,
                "dP[{ij}]/dF[{kl}]: numeric {numeric} analytic {analytic}"
            );
        }
    }
}

#[test]
fn small_strain_pixel_evaluation_is_native() {
    let material = LinearElastic::isotropic("iso", 2, 1.0, 0.3).unwrap();
    let strain = [0.01, 0.0, 0.0, 0.02];
    let mut native = [0.0; 4];
    let mut mapped = [0.0; 4];
    material.evaluate_stress(&strain, &mut native);
    evaluate_pixel(&material, Formulation::SmallStrain, &strain, &mut mapped, None);
    assert_eq!(native, mapped);
}
