#![cfg(test)]

use super::fft_utils::{fft_freq_indices, fft_freqs, fft_freqs_with_length, FrequencyGrid};
use super::grid::GridDescriptor;

#[test]
fn frequencies_follow_dft_ordering() {
    assert_eq!(fft_freq_indices(5), vec![0, 1, 2, -2, -1]);
    assert_eq!(fft_freq_indices(6), vec![0, 1, 2, -3, -2, -1]);
    assert_eq!(fft_freq_indices(1), vec![0]);
    assert_eq!(fft_freqs(4), vec![0.0, 1.0, -2.0, -1.0]);
}

#[test]
fn frequencies_with_length_scale_by_domain() {
    let freqs = fft_freqs_with_length(4, 2.0);
    assert_eq!(freqs, vec![0.0, 0.5, -1.0, -0.5]);
}

#[test]
fn frequency_table_lengths_match_grid() {
    let grid = GridDescriptor::unit(&[5, 4, 3]).unwrap();
    let freqs = FrequencyGrid::new(&grid);
    assert_eq!(freqs.dim(), 3);
    for axis in 0..3 {
        assert_eq!(
            freqs.frequency_indices(axis).len(),
            grid.nb_domain_grid_pts()[axis]
        );
    }
}

#[test]
fn phase_and_physical_wave_vectors() {
    let grid = GridDescriptor::new(&[5, 4], &[10.0, 2.0]).unwrap();
    let freqs = FrequencyGrid::new(&grid);
    let coord = [3, 1, 0];
    assert_eq!(freqs.get_xi(coord), [-2.0, 1.0, 0.0]);

    let phase = freqs.get_phase(coord);
    assert!((phase[0] + 0.4).abs() < 1e-15);
    assert!((phase[1] - 0.25).abs() < 1e-15);

    // spacing is 2.0 and 0.5
    let physical = freqs.get_physical_xi(coord);
    assert!((physical[0] + 0.2).abs() < 1e-15);
    assert!((physical[1] - 0.5).abs() < 1e-15);
}

#[test]
fn unit_wave_vector_has_unit_norm() {
    let grid = GridDescriptor::unit(&[7, 7]).unwrap();
    let freqs = FrequencyGrid::new(&grid);
    let unit = freqs.get_unit_xi([2, 5, 0]);
    let norm: f64 = unit.iter().map(|v| v * v).sum::<f64>().sqrt();
    assert!((norm - 1.0).abs() < 1e-14);
    assert!(freqs.get_unit_xi([0, 0, 0])[0].is_nan());
}

#[test]
fn nyquist_only_exists_on_even_axes() {
    let grid = GridDescriptor::unit(&[4, 5]).unwrap();
    let freqs = FrequencyGrid::new(&grid);
    assert!(freqs.is_nyquist(0, 2));
    assert!(!freqs.is_nyquist(0, 1));
    assert!(!freqs.is_nyquist(0, 3));
    assert!((0..5).all(|index| !freqs.is_nyquist(1, index)));
}
