#![cfg(test)]

use super::grid::{GridDescriptor, GridError};

#[test]
fn new_grid_owns_whole_domain() {
    let grid = GridDescriptor::new(&[4, 3], &[2.0, 1.5]).unwrap();
    assert_eq!(grid.dim(), 2);
    assert_eq!(grid.nb_domain_grid_pts(), &[4, 3]);
    assert_eq!(grid.nb_subdomain_grid_pts(), &[4, 3]);
    assert_eq!(grid.subdomain_locations(), &[0, 0]);
    assert_eq!(grid.nb_pixels(), 12);
    assert!(!grid.is_distributed());
    assert!((grid.grid_spacing(0) - 0.5).abs() < 1e-15);
    assert!((grid.grid_spacing(1) - 0.5).abs() < 1e-15);
    assert_eq!(grid.padded_domain_grid_pts(), [4, 3, 1]);
}

#[test]
fn rejects_unsupported_dimensions_and_bad_lengths() {
    assert_eq!(
        GridDescriptor::new(&[4], &[1.0]),
        Err(GridError::UnsupportedDimension(1))
    );
    assert_eq!(
        GridDescriptor::new(&[4, 4], &[1.0]),
        Err(GridError::LengthMismatch { dim: 2, lengths: 1 })
    );
    assert_eq!(
        GridDescriptor::new(&[4, 0], &[1.0, 1.0]),
        Err(GridError::EmptyAxis { axis: 1 })
    );
    assert!(matches!(
        GridDescriptor::new(&[4, 4, 4], &[1.0, -1.0, 1.0]),
        Err(GridError::NonPositiveLength { axis: 1, .. })
    ));
}

#[test]
fn pixel_index_runs_axis_zero_fastest() {
    let grid = GridDescriptor::unit(&[3, 2, 2]).unwrap();
    assert_eq!(grid.pixel_index([0, 0, 0]), 0);
    assert_eq!(grid.pixel_index([1, 0, 0]), 1);
    assert_eq!(grid.pixel_index([0, 1, 0]), 3);
    assert_eq!(grid.pixel_index([0, 0, 1]), 6);
    for index in 0..grid.nb_pixels() {
        assert_eq!(grid.pixel_index(grid.pixel_coord(index)), index);
    }
}

#[test]
fn subdomain_shifts_global_coordinates() {
    let grid = GridDescriptor::unit(&[4, 6])
        .unwrap()
        .with_subdomain(&[4, 3], &[0, 3])
        .unwrap();
    assert!(grid.is_distributed());
    assert_eq!(grid.nb_subdomain_pixels(), 12);
    assert_eq!(grid.global_pixel_coord(0), [0, 3, 0]);
    assert_eq!(grid.global_pixel_coord(5), [1, 4, 0]);
}

#[test]
fn subdomain_outside_domain_is_rejected() {
    let grid = GridDescriptor::unit(&[4, 6]).unwrap();
    assert_eq!(
        grid.with_subdomain(&[4, 4], &[0, 3]),
        Err(GridError::SubdomainOutOfRange {
            axis: 1,
            location: 3,
            nb: 4,
            domain: 6,
        })
    );
    assert_eq!(
        grid.with_subdomain(&[4], &[0]),
        Err(GridError::SubdomainMismatch { dim: 2, found: 1 })
    );
}
